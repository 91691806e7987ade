use std::collections::BTreeMap;

use crate::options::Format;
use crate::value::{Data, ValueEntry};

/// A key in complex format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyNode {
    /// Values in output order.
    pub values: Vec<ValueEntry>,
    /// Subkeys by name.
    pub keys: BTreeMap<String, KeyNode>,
}

impl KeyNode {
    fn descend(&mut self, segments: &[String]) -> &mut KeyNode {
        segments
            .iter()
            .fold(self, |node, segment| node.keys.entry(segment.clone()).or_default())
    }

    /// Find a value by exact name.
    pub fn value(&self, name: &str) -> Option<&ValueEntry> {
        self.values.iter().find(|entry| entry.name == name)
    }
}

/// A key in simple format.
///
/// Values lose their type and live in a bucket stored under a reserved name
/// among the subkeys (`$values` unless configured otherwise). Seen as a map,
/// a real subkey with the reserved name hides the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleKeyNode {
    /// Value name to payload.
    pub values: BTreeMap<String, Data>,
    /// Subkeys by name.
    pub keys: BTreeMap<String, SimpleKeyNode>,
    values_key: String,
}

/// One entry of a [`SimpleKeyNode`] seen as a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleEntry<'a> {
    /// A subkey.
    Key(&'a SimpleKeyNode),
    /// The values bucket.
    Values(&'a BTreeMap<String, Data>),
}

impl SimpleKeyNode {
    /// Empty node whose bucket is stored under `values_key`.
    pub fn new(values_key: impl Into<String>) -> Self {
        Self {
            values: BTreeMap::new(),
            keys: BTreeMap::new(),
            values_key: values_key.into(),
        }
    }

    /// Reserved name of the values bucket.
    pub fn values_key(&self) -> &str {
        &self.values_key
    }

    /// Look up an entry the way a map keyed by name would.
    pub fn get(&self, name: &str) -> Option<SimpleEntry<'_>> {
        if let Some(key) = self.keys.get(name) {
            return Some(SimpleEntry::Key(key));
        }
        (name == self.values_key).then_some(SimpleEntry::Values(&self.values))
    }

    /// Every entry name of the map view, the bucket included.
    pub fn entry_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        if !self.keys.contains_key(&self.values_key) {
            names.push(&self.values_key);
            names.sort_unstable();
        }
        names
    }

    fn descend(&mut self, segments: &[String]) -> &mut SimpleKeyNode {
        segments.iter().fold(self, |node, segment| {
            let values_key = node.values_key.clone();
            node.keys
                .entry(segment.clone())
                .or_insert_with(|| SimpleKeyNode::new(values_key))
        })
    }
}

/// A parsed key with all the subkeys the query returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyTree {
    /// Simple format.
    Simple(SimpleKeyNode),
    /// Complex format.
    Complex(KeyNode),
}

impl KeyTree {
    pub(crate) fn new(format: Format, values_key: &str) -> Self {
        match format {
            Format::Simple => KeyTree::Simple(SimpleKeyNode::new(values_key)),
            Format::Complex => KeyTree::Complex(KeyNode::default()),
        }
    }

    pub(crate) fn ensure_key(&mut self, segments: &[String]) {
        match self {
            KeyTree::Simple(root) => {
                root.descend(segments);
            }
            KeyTree::Complex(root) => {
                root.descend(segments);
            }
        }
    }

    pub(crate) fn insert_value(&mut self, segments: &[String], entry: ValueEntry) {
        match self {
            KeyTree::Simple(root) => {
                root.descend(segments).values.insert(entry.name, entry.data);
            }
            KeyTree::Complex(root) => root.descend(segments).values.push(entry),
        }
    }

    /// Simple root, if this tree is in simple format.
    pub fn as_simple(&self) -> Option<&SimpleKeyNode> {
        match self {
            KeyTree::Simple(root) => Some(root),
            KeyTree::Complex(_) => None,
        }
    }

    /// Complex root, if this tree is in complex format.
    pub fn as_complex(&self) -> Option<&KeyNode> {
        match self {
            KeyTree::Complex(root) => Some(root),
            KeyTree::Simple(_) => None,
        }
    }

    /// Names of the direct subkeys of the root.
    pub fn subkey_names(&self) -> Vec<&str> {
        match self {
            KeyTree::Simple(root) => root.keys.keys().map(String::as_str).collect(),
            KeyTree::Complex(root) => root.keys.keys().map(String::as_str).collect(),
        }
    }

    /// Names of the values of the root, sorted.
    pub fn value_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = match self {
            KeyTree::Simple(root) => root.values.keys().map(String::as_str).collect(),
            KeyTree::Complex(root) => root.values.iter().map(|e| e.name.as_str()).collect(),
        };
        names.sort_unstable();
        names.dedup();
        names
    }
}
