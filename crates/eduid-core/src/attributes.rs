//! The identity provider's attribute bag and merge patches against it.
//!
//! The provider stores custom fields as `key -> [value, ...]`. Only the
//! first element of each list is meaningful to this crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type AttributeBag = BTreeMap<String, Vec<String>>;

/// Attribute keys shared with the data already stored at the provider.
pub mod keys {
    pub const DOCUMENT_TYPE: &str = "documentType";
    pub const DOCUMENT_NUMBER: &str = "documentNumber";
    pub const PHONE: &str = "phone";
    pub const INSTITUTION_ID: &str = "institutionId";
    pub const STATUS: &str = "status";
    pub const PASSWORD_STATUS: &str = "passwordStatus";
    pub const PASSWORD_CREATED_AT: &str = "passwordCreatedAt";
    pub const PASSWORD_RESET_TOKEN: &str = "passwordResetToken";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Per-field intent of a partial update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldPatch<T> {
    /// Leave whatever is stored.
    Unchanged,
    Set(T),
    /// Remove the stored value.
    Clear,
}

impl<T> Default for FieldPatch<T> {
    fn default() -> Self {
        Self::Unchanged
    }
}

impl<T> FieldPatch<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldPatch<U> {
        match self {
            Self::Unchanged => FieldPatch::Unchanged,
            Self::Set(v) => FieldPatch::Set(f(v)),
            Self::Clear => FieldPatch::Clear,
        }
    }
}

impl FieldPatch<String> {
    /// `Set` for a non-blank value, `Unchanged` otherwise.
    pub fn from_input(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Self::Set(v.to_string()),
            _ => Self::Unchanged,
        }
    }
}

impl<T> From<Option<T>> for FieldPatch<T> {
    /// `Some` sets, `None` leaves the field untouched.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Set(v),
            None => Self::Unchanged,
        }
    }
}

/// A merge patch over an [`AttributeBag`].
///
/// Keys not mentioned are never touched by [`AttributePatch::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttributePatch {
    entries: BTreeMap<String, FieldPatch<String>>,
}

impl AttributePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.entries
            .insert(key.to_string(), FieldPatch::Set(value.into()));
        self
    }

    pub fn clear(&mut self, key: &str) -> &mut Self {
        self.entries.insert(key.to_string(), FieldPatch::Clear);
        self
    }

    /// Record `patch` for `key`; `Unchanged` records nothing.
    pub fn put(&mut self, key: &str, patch: FieldPatch<String>) -> &mut Self {
        match patch {
            FieldPatch::Unchanged => {}
            other => {
                self.entries.insert(key.to_string(), other);
            }
        }
        self
    }

    pub fn get(&self, key: &str) -> &FieldPatch<String> {
        self.entries.get(key).unwrap_or(&FieldPatch::Unchanged)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply the patch in place.
    pub fn apply_to(&self, bag: &mut AttributeBag) {
        for (key, patch) in &self.entries {
            match patch {
                FieldPatch::Set(value) => {
                    bag.insert(key.clone(), vec![value.clone()]);
                }
                FieldPatch::Clear => {
                    bag.remove(key);
                }
                FieldPatch::Unchanged => {}
            }
        }
    }

    /// Return a patched copy of `existing`.
    pub fn apply(&self, existing: &AttributeBag) -> AttributeBag {
        let mut bag = existing.clone();
        self.apply_to(&mut bag);
        bag
    }
}

/// First value stored under `key`, ignoring empty strings.
pub fn first_value<'a>(bag: &'a AttributeBag, key: &str) -> Option<&'a str> {
    bag.get(key)
        .and_then(|values| values.first())
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(pairs: &[(&str, &str)]) -> AttributeBag {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), vec![v.to_string()]))
            .collect()
    }

    #[test]
    fn apply_sets_clears_and_leaves_rest() {
        let existing = bag(&[("phone", "999"), ("documentNumber", "123"), ("x", "y")]);
        let mut patch = AttributePatch::new();
        patch.set("phone", "111").clear("x");

        let out = patch.apply(&existing);
        assert_eq!(first_value(&out, "phone"), Some("111"));
        assert_eq!(first_value(&out, "documentNumber"), Some("123"));
        assert!(!out.contains_key("x"));
    }

    #[test]
    fn put_unchanged_records_nothing() {
        let mut patch = AttributePatch::new();
        patch.put("phone", FieldPatch::Unchanged);
        assert!(patch.is_empty());
        assert_eq!(patch.get("phone"), &FieldPatch::Unchanged);
    }

    #[test]
    fn blank_input_is_unchanged() {
        assert_eq!(FieldPatch::from_input(Some("  ")), FieldPatch::Unchanged);
        assert_eq!(FieldPatch::from_input(None), FieldPatch::Unchanged);
        assert_eq!(
            FieldPatch::from_input(Some(" 987 ")),
            FieldPatch::Set("987".to_string())
        );
    }

    #[test]
    fn first_value_skips_empty_strings() {
        let mut b = bag(&[("phone", "")]);
        assert_eq!(first_value(&b, "phone"), None);
        b.insert("phone".into(), vec![]);
        assert_eq!(first_value(&b, "phone"), None);
        b.insert("phone".into(), vec!["1".into(), "2".into()]);
        assert_eq!(first_value(&b, "phone"), Some("1"));
    }
}
