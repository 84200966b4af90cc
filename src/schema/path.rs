use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// One step in an attribute path.
///
/// A step addresses either a singleton child group/attribute by name, one
/// element of a repeated group by index, or every element of a repeated
/// group at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathEntry {
    pub name: String,

    /// Index into a repeated group, when addressing a single element.
    #[serde(default)]
    pub index: Option<usize>,

    /// Address every element of a repeated group.
    #[serde(default)]
    pub all: bool,
}

impl PathEntry {
    /// A singleton child group or attribute.
    pub fn named(name: impl Into<String>) -> Self {
        PathEntry {
            name: name.into(),
            index: None,
            all: false,
        }
    }

    /// One element of a repeated group.
    pub fn indexed(
        name: impl Into<String>,
        index: usize,
    ) -> Self {
        PathEntry {
            name: name.into(),
            index: Some(index),
            all: false,
        }
    }

    /// Every element of a repeated group.
    pub fn all(name: impl Into<String>) -> Self {
        PathEntry {
            name: name.into(),
            index: None,
            all: true,
        }
    }
}

impl fmt::Display for PathEntry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.all {
            write!(f, "{}[*]", self.name)
        } else if let Some(index) = self.index {
            write!(f, "{}[{}]", self.name, index)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// A path into the attribute tree, e.g. `cards[0]/ports[*]/speed_bps`.
///
/// Paths are resolved against the schema when a query is registered; a path
/// that does not resolve is rejected with `QueryError::InvalidPath`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path(Vec<PathEntry>);

impl Path {
    pub fn new(entries: Vec<PathEntry>) -> Self {
        Path(entries)
    }

    pub fn entries(&self) -> &[PathEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<PathEntry>> for Path {
    fn from(entries: Vec<PathEntry>) -> Self {
        Path(entries)
    }
}

impl fmt::Display for Path {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for (i, entry) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}
