//! Tri-state field patches for partial updates.
use serde::{Deserialize, Deserializer};

/// A single field of a partial update.
///
/// In JSON an absent key is `Unchanged` (requires `#[serde(default)]` on the
/// containing struct), `null` is `Clear`, and any other value is `Set`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldPatch<T> {
    #[default]
    Unchanged,
    Clear,
    Set(T),
}

impl<T> FieldPatch<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, FieldPatch::Unchanged)
    }

    /// Resolve into the value to persist: `None` leaves the field alone, `Clear`
    /// becomes the field's default.
    pub fn resolve(self, default: impl FnOnce() -> T) -> Option<T> {
        match self {
            FieldPatch::Unchanged => None,
            FieldPatch::Clear => Some(default()),
            FieldPatch::Set(value) => Some(value),
        }
    }

    /// Resolve a nullable field: `Clear` becomes `Some(None)`.
    pub fn resolve_nullable(self) -> Option<Option<T>> {
        match self {
            FieldPatch::Unchanged => None,
            FieldPatch::Clear => Some(None),
            FieldPatch::Set(value) => Some(Some(value)),
        }
    }
}

impl<T> From<Option<T>> for FieldPatch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => FieldPatch::Set(value),
            None => FieldPatch::Clear,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldPatch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(FieldPatch::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct TitleOnly {
        #[serde(default)]
        title: FieldPatch<String>,
    }

    #[test]
    fn absent_null_and_value() {
        let absent: TitleOnly = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.title, FieldPatch::Unchanged);

        let null: TitleOnly = serde_json::from_str(r#"{"title": null}"#).unwrap();
        assert_eq!(null.title, FieldPatch::Clear);

        let set: TitleOnly = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(set.title, FieldPatch::Set("x".to_string()));
    }

    #[test]
    fn resolve_uses_default_on_clear() {
        let cleared: FieldPatch<String> = FieldPatch::Clear;
        assert_eq!(cleared.resolve(|| "d".to_string()).as_deref(), Some("d"));
        assert_eq!(FieldPatch::<String>::Unchanged.resolve(String::new), None);
        assert_eq!(FieldPatch::<String>::Clear.resolve_nullable(), Some(None));
    }
}
