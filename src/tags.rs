use serde::{Deserialize, Serialize};

/// Order-preserving list of unique labels.
///
/// Backs every JSON list column that is edited with add/remove semantics:
/// entity tags, opportunity competitors, product and pricing-tier features.
/// Adding a value that is already present and removing one that is absent
/// are both no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagList(Vec<String>);

impl TagList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends `value` unless it is already present.
    ///
    /// Returns `true` when the list changed.
    pub fn add(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.contains(&value) {
            return false;
        }
        self.0.push(value);
        true
    }

    /// Removes `value` if present. Returns `true` when the list changed.
    pub fn remove(&mut self, value: &str) -> bool {
        match self.0.iter().position(|v| v == value) {
            Some(idx) => {
                self.0.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for TagList {
    /// Builds a list from stored values, dropping later duplicates.
    fn from(values: Vec<String>) -> Self {
        let mut list = TagList::new();
        for value in values {
            list.add(value);
        }
        list
    }
}

impl<'a> FromIterator<&'a str> for TagList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut list = TagList::new();
        for value in iter {
            list.add(value);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let mut tags = TagList::new();
        assert!(tags.add("vip"));
        assert!(!tags.add("vip"));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut tags: TagList = ["vip", "renewal"].into_iter().collect();
        assert!(!tags.remove("churn-risk"));
        assert!(tags.remove("vip"));
        assert!(!tags.remove("vip"));
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["renewal"]);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut tags = TagList::new();
        tags.add("b");
        tags.add("a");
        tags.add("c");
        tags.add("a");
        assert_eq!(tags.into_vec(), vec!["b", "a", "c"]);
    }

    #[test]
    fn stored_duplicates_collapse() {
        let tags = TagList::from(vec!["x".to_string(), "y".to_string(), "x".to_string()]);
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn serializes_as_plain_array() {
        let tags: TagList = ["enterprise", "q4"].into_iter().collect();
        let json = serde_json::to_string(&tags).unwrap();
        assert_eq!(json, r#"["enterprise","q4"]"#);
        let back: TagList = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tags);
    }
}
