//! Breadcrumb paths locating a node inside a decoded source tree.
//!
//! A breadcrumb is never mutated: every descent step returns a new, extended
//! path bound to that subtree.

use std::fmt;

/// Label every breadcrumb starts from.
pub const ROOT_LABEL: &str = "$";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Field access, rendered as `.name`.
    Field(String),
    /// Array position, rendered as `[n]`.
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, ".{name}"),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Breadcrumb {
    segments: Vec<Segment>,
}

impl Default for Breadcrumb {
    fn default() -> Self {
        Self::root()
    }
}

impl Breadcrumb {
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Self {
        self.extended(Segment::Field(name.to_owned()))
    }

    #[must_use]
    pub fn index(&self, i: usize) -> Self {
        self.extended(Segment::Index(i))
    }

    fn extended(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for Breadcrumb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROOT_LABEL)?;
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_renders_dollar() {
        assert_eq!(Breadcrumb::root().to_string(), "$");
    }

    #[test]
    fn renders_fields_and_indices_in_order() {
        let path = Breadcrumb::root().field("a").field("b").index(2);
        assert_eq!(path.to_string(), "$.a.b[2]");
        assert_eq!(path.depth(), 3);
    }

    #[test]
    fn extending_leaves_parent_untouched() {
        let parent = Breadcrumb::root().field("items");
        let first = parent.index(0);
        let second = parent.index(1);
        assert_eq!(parent.to_string(), "$.items");
        assert_eq!(first.to_string(), "$.items[0]");
        assert_eq!(second.to_string(), "$.items[1]");
        assert_ne!(first, second);
    }
}
