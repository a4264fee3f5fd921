//! Structured action descriptors
//!
//! The low-level, non-interactive command interface of a host. A descriptor
//! is an ordered set of keyed values; keys are the host's four-character
//! codes (padded with spaces) or string ids.

use std::path::{Path, PathBuf};

/// Value stored under a descriptor key
#[derive(Debug, Clone, PartialEq)]
pub enum ActionValue {
    Bool(bool),
    Integer(i32),
    String(String),
    Enumerated { ty: &'static str, value: &'static str },
    List(Vec<ActionValue>),
    Path(PathBuf),
    Object { class: &'static str, descriptor: ActionDescriptor },
}

/// Ordered keyed parameter record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionDescriptor {
    entries: Vec<(&'static str, ActionValue)>,
}

impl ActionDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any value already under `key` in place.
    pub fn put(&mut self, key: &'static str, value: ActionValue) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn put_bool(&mut self, key: &'static str, value: bool) {
        self.put(key, ActionValue::Bool(value));
    }

    pub fn put_integer(&mut self, key: &'static str, value: i32) {
        self.put(key, ActionValue::Integer(value));
    }

    pub fn put_string(&mut self, key: &'static str, value: impl Into<String>) {
        self.put(key, ActionValue::String(value.into()));
    }

    pub fn put_enumerated(&mut self, key: &'static str, ty: &'static str, value: &'static str) {
        self.put(key, ActionValue::Enumerated { ty, value });
    }

    pub fn put_list(&mut self, key: &'static str, list: Vec<ActionValue>) {
        self.put(key, ActionValue::List(list));
    }

    pub fn put_path(&mut self, key: &'static str, path: &Path) {
        self.put(key, ActionValue::Path(path.to_path_buf()));
    }

    pub fn put_object(&mut self, key: &'static str, class: &'static str, descriptor: ActionDescriptor) {
        self.put(key, ActionValue::Object { class, descriptor });
    }

    pub fn get(&self, key: &str) -> Option<&ActionValue> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            ActionValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_integer(&self, key: &str) -> Option<i32> {
        match self.get(key)? {
            ActionValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            ActionValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// Enumerated value under `key`, as `(type, value)`
    pub fn get_enumerated(&self, key: &str) -> Option<(&'static str, &'static str)> {
        match self.get(key)? {
            ActionValue::Enumerated { ty, value } => Some((*ty, *value)),
            _ => None,
        }
    }

    pub fn get_path(&self, key: &str) -> Option<&Path> {
        match self.get(key)? {
            ActionValue::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Nested object under `key`, as `(class, descriptor)`
    pub fn get_object(&self, key: &str) -> Option<(&'static str, &ActionDescriptor)> {
        match self.get(key)? {
            ActionValue::Object { class, descriptor } => Some((*class, descriptor)),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn put_replaces_in_place() {
        let mut desc = ActionDescriptor::new();
        desc.put_bool("Intr", false);
        desc.put_integer("NCol", 16);
        desc.put_bool("Intr", true);

        assert_eq!(desc.len(), 2);
        assert_eq!(desc.keys().collect::<Vec<_>>(), ["Intr", "NCol"]);
        assert_eq!(desc.get_bool("Intr"), Some(true));
    }

    #[test]
    fn typed_getters_reject_other_kinds() {
        let mut desc = ActionDescriptor::new();
        desc.put_integer("NCol", 16);
        assert_eq!(desc.get_bool("NCol"), None);
        assert_eq!(desc.get_integer("NCol"), Some(16));
        assert_eq!(desc.get_integer("Dthr"), None);
    }

    #[test]
    fn nested_objects() {
        let mut inner = ActionDescriptor::new();
        inner.put_enumerated("Fmt ", "IRFm", "PN24");
        let mut outer = ActionDescriptor::new();
        outer.put_object("Usng", "SaveForWeb", inner);

        let (class, inner) = outer.get_object("Usng").unwrap();
        assert_eq!(class, "SaveForWeb");
        assert_eq!(inner.get_enumerated("Fmt "), Some(("IRFm", "PN24")));
    }
}
