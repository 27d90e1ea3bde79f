pub mod model;
pub mod service;

pub use model::{
    Document, DocumentChanges, DocumentListing, DocumentPatch, EffectiveDocument, NewDocument,
    SharedDocument, DEFAULT_TITLE, NEW_DOCUMENT_ID,
};
pub use service::{DocumentService, UNKNOWN_OWNER};
