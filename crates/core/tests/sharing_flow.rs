use std::sync::Arc;

use notehub_core::account::NewAccount;
use notehub_core::document::{DocumentPatch, NewDocument, DEFAULT_TITLE};
use notehub_core::notify::MemoryNotifier;
use notehub_core::patch::FieldPatch;
use notehub_core::permission::AccessLevel;
use notehub_core::{CoreError, MemoryStore, NoteHub, SharedStore};

struct World {
    store: SharedStore,
    hub: NoteHub,
}

async fn world() -> World {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let hub = NoteHub::new(store.clone(), Arc::new(MemoryNotifier::new()));
    hub.register(account("alice", "alice@x.com")).await.unwrap();
    World { store, hub }
}

fn account(id: &str, email: &str) -> NewAccount {
    NewAccount {
        id: id.to_string(),
        email: email.to_string(),
        ..Default::default()
    }
}

fn body_patch(body: &str) -> DocumentPatch {
    DocumentPatch {
        body: FieldPatch::Set(body.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn pending_share_materializes_on_registration() {
    let w = world().await;
    let doc = w
        .hub
        .documents
        .create("alice", NewDocument::default())
        .await
        .unwrap();
    assert_eq!(doc.title, DEFAULT_TITLE);

    let recipient = w
        .hub
        .sharing
        .share(&doc.id, "alice", "bob@x.com", "write")
        .await
        .unwrap();
    assert!(recipient.is_pending);
    assert_eq!(recipient.id, "pending_bob_x_com");

    let listing = w
        .hub
        .sharing
        .list_collaborators(&doc.id, "alice")
        .await
        .unwrap();
    assert_eq!(listing.owner.id, "alice");
    assert_eq!(listing.owner.level, AccessLevel::Admin);
    assert_eq!(listing.collaborators.len(), 1);
    assert_eq!(listing.collaborators[0].id, "pending_bob_x_com");
    assert_eq!(listing.collaborators[0].level, AccessLevel::Write);
    assert!(listing.collaborators[0].is_pending);

    w.hub.register(account("bob123", "bob@x.com")).await.unwrap();
    let permissions = &w.hub.permissions;
    assert!(permissions
        .get(&doc.id, "pending_bob_x_com")
        .await
        .unwrap()
        .is_none());

    let effective = w
        .hub
        .documents
        .get_effective(&doc.id, "bob123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(effective.level, AccessLevel::Write);
    let migrated = permissions.get(&doc.id, "bob123").await.unwrap().unwrap();
    assert_eq!(migrated.level, AccessLevel::Write);
    assert_eq!(migrated.migrated_from.as_deref(), Some("pending_bob_x_com"));

    // Exactly once: a second access finds the direct row.
    let again = w
        .hub
        .documents
        .get_effective(&doc.id, "bob123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.level, AccessLevel::Write);
    assert_eq!(permissions.list_by_document(&doc.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sharing_twice_reuses_the_placeholder() {
    let w = world().await;
    let first = w
        .hub
        .documents
        .create("alice", NewDocument::default())
        .await
        .unwrap();
    let second = w
        .hub
        .documents
        .create("alice", NewDocument::default())
        .await
        .unwrap();

    let a = w
        .hub
        .sharing
        .share(&first.id, "alice", "Bob@X.com", "read")
        .await
        .unwrap();
    let b = w
        .hub
        .sharing
        .share(&second.id, "alice", "bob@x.com", "write")
        .await
        .unwrap();
    assert_eq!(a.id, b.id);

    let found = w.store.scan_account_by_email("bob@x.com").await.unwrap();
    assert_eq!(found.map(|acct| acct.id), Some(a.id));
}

#[tokio::test]
async fn listing_claims_every_pending_share() {
    let w = world().await;
    let mut ids = Vec::new();
    for _ in 0..3 {
        let doc = w
            .hub
            .documents
            .create("alice", NewDocument::default())
            .await
            .unwrap();
        w.hub
            .sharing
            .share(&doc.id, "alice", "bob@x.com", "read")
            .await
            .unwrap();
        ids.push(doc.id);
    }

    w.hub.register(account("bob123", "bob@x.com")).await.unwrap();
    assert!(w
        .hub
        .accounts
        .get_by_email("bob@x.com")
        .await
        .unwrap()
        .is_some_and(|acct| acct.id == "bob123"));

    let listing = w.hub.documents.list_for_account("bob123").await.unwrap();
    assert_eq!(listing.shared.len(), 3);
    assert!(listing
        .shared
        .iter()
        .all(|s| s.owner_name == "alice" && ids.contains(&s.document.id)));
    assert!(w
        .hub
        .permissions
        .list_by_account("pending_bob_x_com")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn owner_is_admin_despite_stale_row() {
    let w = world().await;
    let doc = w
        .hub
        .documents
        .create("alice", NewDocument::default())
        .await
        .unwrap();
    w.hub
        .permissions
        .upsert(&doc.id, "alice", AccessLevel::Read, "alice")
        .await
        .unwrap();

    let effective = w
        .hub
        .documents
        .get_effective(&doc.id, "alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(effective.level, AccessLevel::Admin);
}

#[tokio::test]
async fn owner_access_cannot_be_revoked_by_anyone() {
    let w = world().await;
    w.hub.register(account("carol", "carol@x.com")).await.unwrap();
    let doc = w
        .hub
        .documents
        .create("alice", NewDocument::default())
        .await
        .unwrap();
    w.hub
        .sharing
        .share(&doc.id, "alice", "carol@x.com", "admin")
        .await
        .unwrap();

    for caller in ["alice", "carol"] {
        let err = w
            .hub
            .sharing
            .revoke(&doc.id, caller, "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::OwnerProtected), "caller {caller}");
    }
}

#[tokio::test]
async fn versions_start_at_one_and_increase() {
    let w = world().await;
    let doc = w
        .hub
        .documents
        .create("alice", NewDocument::default())
        .await
        .unwrap();

    for body in ["one", "two", "three"] {
        w.hub
            .documents
            .update(&doc.id, "alice", body_patch(body))
            .await
            .unwrap();
    }

    let versions = w.hub.versions.list(&doc.id, "alice").await.unwrap();
    let numbers: Vec<i64> = versions.iter().map(|v| v.version.version_number).collect();
    assert_eq!(numbers, vec![3, 2, 1]);
    assert_eq!(versions[0].version.body, "three");
    assert_eq!(versions[0].author_name, "alice");
}

#[tokio::test]
async fn collaborator_listing_skips_missing_accounts() {
    let w = world().await;
    w.hub.register(account("carol", "carol@x.com")).await.unwrap();
    let doc = w
        .hub
        .documents
        .create("alice", NewDocument::default())
        .await
        .unwrap();
    w.hub
        .sharing
        .share(&doc.id, "alice", "carol@x.com", "read")
        .await
        .unwrap();
    w.hub
        .permissions
        .upsert(&doc.id, "ghost", AccessLevel::Write, "alice")
        .await
        .unwrap();

    let listing = w
        .hub
        .sharing
        .list_collaborators(&doc.id, "alice")
        .await
        .unwrap();
    let ids: Vec<&str> = listing.collaborators.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["carol"]);
}

#[tokio::test]
async fn archive_is_a_soft_delete() {
    let w = world().await;
    let doc = w
        .hub
        .documents
        .create(
            "alice",
            NewDocument {
                title: Some("Journal".to_string()),
                body: Some("dear diary".to_string()),
            },
        )
        .await
        .unwrap();

    w.hub.documents.archive(&doc.id, "alice").await.unwrap();

    let listing = w.hub.documents.list_for_account("alice").await.unwrap();
    assert!(listing.owned.iter().all(|d| d.id != doc.id));

    let effective = w
        .hub
        .documents
        .get_effective(&doc.id, "alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(effective.document.title, "Journal");
    assert_eq!(effective.document.body, "dear diary");
}

#[tokio::test]
async fn hard_delete_keeps_version_history() {
    let w = world().await;
    w.hub.register(account("carol", "carol@x.com")).await.unwrap();
    let doc = w
        .hub
        .documents
        .create("alice", NewDocument::default())
        .await
        .unwrap();
    w.hub
        .documents
        .update(&doc.id, "alice", body_patch("draft"))
        .await
        .unwrap();
    w.hub
        .sharing
        .share(&doc.id, "alice", "carol@x.com", "write")
        .await
        .unwrap();

    w.hub.documents.hard_delete(&doc.id, "alice").await.unwrap();

    assert!(w
        .hub
        .permissions
        .list_by_document(&doc.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(w.store.list_versions(&doc.id).await.unwrap().len(), 1);
    let err = w.hub.versions.list(&doc.id, "alice").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound("document")));
}

/// Alice shares with bob@x.com at admin before Bob signs up, then Bob registers.
async fn shared_before_registration(w: &World) -> String {
    let doc = w
        .hub
        .documents
        .create("alice", NewDocument::default())
        .await
        .unwrap();
    w.hub
        .sharing
        .share(&doc.id, "alice", "bob@x.com", "admin")
        .await
        .unwrap();
    w.hub.register(account("bob123", "bob@x.com")).await.unwrap();
    doc.id
}

#[tokio::test]
async fn revoke_after_registration_is_final() {
    let w = world().await;
    let doc_id = shared_before_registration(&w).await;

    let bob = w
        .hub
        .sharing
        .share(&doc_id, "alice", "bob@x.com", "read")
        .await
        .unwrap();
    assert_eq!(bob.id, "bob123");
    w.hub.sharing.revoke(&doc_id, "alice", "bob123").await.unwrap();

    assert!(w
        .hub
        .documents
        .get_effective(&doc_id, "bob123")
        .await
        .unwrap()
        .is_none());
    let listing = w.hub.documents.list_for_account("bob123").await.unwrap();
    assert!(listing.shared.is_empty());
    assert!(w
        .hub
        .documents
        .get_effective(&doc_id, "bob123")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn downgrade_after_registration_sticks() {
    let w = world().await;
    let doc_id = shared_before_registration(&w).await;

    w.hub
        .sharing
        .share(&doc_id, "alice", "bob@x.com", "read")
        .await
        .unwrap();

    let listing = w.hub.documents.list_for_account("bob123").await.unwrap();
    assert_eq!(listing.shared.len(), 1);
    assert_eq!(listing.shared[0].level, AccessLevel::Read);

    let effective = w
        .hub
        .documents
        .get_effective(&doc_id, "bob123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(effective.level, AccessLevel::Read);
}

#[tokio::test]
async fn registered_recipient_is_listed_once() {
    let w = world().await;
    let doc_id = shared_before_registration(&w).await;

    let listing = w
        .hub
        .sharing
        .list_collaborators(&doc_id, "alice")
        .await
        .unwrap();
    assert_eq!(listing.collaborators.len(), 1);
    let bob = &listing.collaborators[0];
    assert_eq!(bob.id, "bob123");
    assert_eq!(bob.email, "bob@x.com");
    assert!(!bob.is_pending);
    assert_eq!(bob.level, AccessLevel::Admin);

    w.hub
        .sharing
        .share(&doc_id, "alice", "bob@x.com", "write")
        .await
        .unwrap();
    let listing = w
        .hub
        .sharing
        .list_collaborators(&doc_id, "alice")
        .await
        .unwrap();
    let ids: Vec<&str> = listing.collaborators.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["bob123"]);
    assert_eq!(listing.collaborators[0].level, AccessLevel::Write);
}
