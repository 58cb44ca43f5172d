//! Tag and list segments.

use serde::{Deserialize, Serialize};

/// Which segment table a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Tag,
    List,
}

impl SegmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::List => "list",
        }
    }
}

/// A labeled grouping (tag or list) identified by its slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: i64,
    pub kind: SegmentKind,
    pub slug: String,
    pub title: String,
}
