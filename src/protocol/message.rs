//! The generic hierarchical message representation.
//!
//! Every protocol payload decodes into a [`Section`]: an ordered mapping
//! from names to scalar values, lists of scalars, or nested sections.
//! Scalars carry no type information on the wire beyond "string", so the
//! tree stores them as text. Insertion order is preserved because some
//! daemon commands are order-sensitive and because round-tripping must be
//! stable.

use std::fmt;

/// A single entry value inside a [`Section`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A scalar value.
    Text(String),
    /// An ordered list of scalar values.
    List(Vec<String>),
    /// A named nested section.
    Section(Section),
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Text(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Text(value.to_string())
    }
}

impl From<Vec<String>> for Node {
    fn from(value: Vec<String>) -> Self {
        Node::List(value)
    }
}

impl From<Vec<&str>> for Node {
    fn from(value: Vec<&str>) -> Self {
        Node::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Section> for Node {
    fn from(value: Section) -> Self {
        Node::Section(value)
    }
}

/// An ordered mapping from names to [`Node`]s.
///
/// Keys are unique within a section; inserting an existing key replaces its
/// value in place, keeping the original position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    entries: Vec<(String, Node)>,
}

impl Section {
    /// Create an empty section.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the section has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry, replacing any existing entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, node: impl Into<Node>) {
        let name = name.into();
        let node = node.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = node,
            None => self.entries.push((name, node)),
        }
    }

    /// Builder-style [`insert`](Self::insert) for request construction.
    pub fn with(mut self, name: impl Into<String>, node: impl Into<Node>) -> Self {
        self.insert(name, node);
        self
    }

    /// Look up an entry by name. Absence is meaningful (optional fields),
    /// so this returns `None` rather than a default.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node)
    }

    /// Look up a scalar entry by name.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Node::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Look up a list entry by name.
    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.get(name) {
            Some(Node::List(items)) => Some(items),
            _ => None,
        }
    }

    /// Look up a nested section by name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        match self.get(name) {
            Some(Node::Section(section)) => Some(section),
            _ => None,
        }
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(n, node)| (n.as_str(), node))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
            for _ in 0..depth {
                write!(f, "  ")?;
            }
            Ok(())
        }

        fn render(section: &Section, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
            for (name, node) in section.iter() {
                indent(f, depth)?;
                match node {
                    Node::Text(value) => writeln!(f, "{name} = {value}")?,
                    Node::List(items) => writeln!(f, "{name} = [{}]", items.join(", "))?,
                    Node::Section(inner) => {
                        writeln!(f, "{name} {{")?;
                        render(inner, f, depth + 1)?;
                        indent(f, depth)?;
                        writeln!(f, "}}")?;
                    }
                }
            }
            Ok(())
        }

        render(self, f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order() {
        let mut section = Section::new();
        section.insert("zebra", "1");
        section.insert("alpha", "2");
        section.insert("mango", "3");

        let names: Vec<&str> = section.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zebra", "alpha", "mango"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut section = Section::new();
        section.insert("a", "1");
        section.insert("b", "2");
        section.insert("a", "3");

        assert_eq!(section.len(), 2);
        assert_eq!(section.text("a"), Some("3"));
        let names: Vec<&str> = section.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_absent_key_is_none() {
        let section = Section::new().with("present", "yes");
        assert!(section.get("absent").is_none());
        assert!(section.text("absent").is_none());
    }

    #[test]
    fn test_typed_accessors_reject_wrong_kind() {
        let section = Section::new()
            .with("value", "text")
            .with("items", vec!["a", "b"]);

        assert!(section.list("value").is_none());
        assert!(section.text("items").is_none());
        assert!(section.section("value").is_none());
    }

    #[test]
    fn test_nested_lookup() {
        let section = Section::new().with(
            "children",
            Section::new().with("c1", Section::new().with("mode", "tunnel")),
        );

        let mode = section
            .section("children")
            .and_then(|c| c.section("c1"))
            .and_then(|c| c.text("mode"));
        assert_eq!(mode, Some("tunnel"));
    }
}
