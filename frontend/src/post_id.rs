use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Separator used inside the page (element ids, session keys): `myheap-11`.
pub const INTERNAL_SEPARATOR: char = '-';
/// Separator used in urls and request parameters: `myheap/11`.
pub const WIRE_SEPARATOR: char = '/';

pub type HeapId = String;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostIdError {
    #[error("post id {0:?} has no separator")]
    MissingSeparator(String),
    #[error("post id {0:?} has an empty heap or index")]
    EmptyComponent(String),
}

/// Identifies a post by the heap it lives in and its index within that heap.
#[derive(Hash, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct PostId {
    pub heap: HeapId,
    pub index: String,
}

impl PostId {
    pub fn new(heap: impl Into<HeapId>, index: impl Into<String>) -> Self {
        PostId {
            heap: heap.into(),
            index: index.into(),
        }
    }

    /// `heap/index`, the form the server understands.
    pub fn to_wire(&self) -> String {
        format!("{}{}{}", self.heap, WIRE_SEPARATOR, self.index)
    }

    /// Parses either form. The index is everything after the last separator,
    /// so heap names may contain `-`.
    pub fn parse(s: &str) -> Result<Self, PostIdError> {
        let (heap, index) = s
            .rsplit_once(|c| c == INTERNAL_SEPARATOR || c == WIRE_SEPARATOR)
            .ok_or_else(|| PostIdError::MissingSeparator(s.to_owned()))?;

        if heap.is_empty() || index.is_empty() {
            return Err(PostIdError::EmptyComponent(s.to_owned()));
        }

        Ok(PostId::new(heap, index))
    }

    /// Root post of a thread page such as `/posts/myheap/11`: the last two
    /// path segments.
    pub fn from_page_path(path: &str) -> Option<Self> {
        let mut segments = path.trim_end_matches('/').rsplit('/');
        let index = segments.next().filter(|s| !s.is_empty())?;
        let heap = segments.next().filter(|s| !s.is_empty())?;
        Some(PostId::new(heap, index))
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.heap, INTERNAL_SEPARATOR, self.index)
    }
}

impl FromStr for PostId {
    type Err = PostIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PostId::parse(s)
    }
}

// String level conversions, replacing the first separator only.
pub fn post_id_to_wire_form(post_id: &str) -> String {
    post_id.replacen(INTERNAL_SEPARATOR, &WIRE_SEPARATOR.to_string(), 1)
}

pub fn wire_form_to_post_id(post_id_str: &str) -> String {
    post_id_str.replacen(WIRE_SEPARATOR, &INTERNAL_SEPARATOR.to_string(), 1)
}
