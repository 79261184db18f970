use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use log::debug;
use thiserror::Error;

use crate::post_id::PostId;

pub const LEAVE_WARNING_PREFIX: &str =
    "You have attempted to leave this page, but there are posts being edited: ";

/// Which representation of a post is open in its editor.
#[derive(Hash, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    Body,
    Raw,
}

/// An unsaved child post. The number is unique within its session.
#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DraftId(pub u64);

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("post {post} is already being edited in {mode:?} mode")]
    AlreadyEditing { post: PostId, mode: EditMode },
    #[error("no draft with number {0}")]
    UnknownDraft(DraftId),
}

/// Edit state of one page. Owned by the controller of that page and never
/// shared between pages.
#[derive(Debug, Default)]
pub struct EditSession {
    edits: HashMap<PostId, EditMode>,
    drafts: BTreeMap<DraftId, PostId>,
    last_draft: u64,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_edit(&mut self, post: PostId, mode: EditMode) -> Result<(), SessionError> {
        if let Some(&current) = self.edits.get(&post) {
            return Err(SessionError::AlreadyEditing {
                post,
                mode: current,
            });
        }

        debug!("begin editing {} ({:?})", post, mode);
        self.edits.insert(post, mode);
        Ok(())
    }

    pub fn end_edit(&mut self, post: &PostId) -> Option<EditMode> {
        let removed = self.edits.remove(post);
        if removed.is_some() {
            debug!("finished editing {}", post);
        }
        removed
    }

    pub fn is_editing(&self, post: &PostId) -> bool {
        self.edits.contains_key(post)
    }

    pub fn mode(&self, post: &PostId) -> Option<EditMode> {
        self.edits.get(post).copied()
    }

    pub fn pending_edits(&self) -> BTreeSet<PostId> {
        self.edits.keys().cloned().collect()
    }

    /// Message for the browser's leave-page confirmation, or `None` if
    /// leaving loses nothing.
    pub fn leave_warning(&self) -> Option<String> {
        if self.edits.is_empty() {
            return None;
        }

        let posts: Vec<String> = self.pending_edits().iter().map(PostId::to_wire).collect();
        Some(format!("{}{}", LEAVE_WARNING_PREFIX, posts.join(", ")))
    }

    pub fn open_draft(&mut self, parent: PostId) -> DraftId {
        self.last_draft += 1;
        let draft = DraftId(self.last_draft);
        debug!("opened draft {} under {}", draft, parent);
        self.drafts.insert(draft, parent);
        draft
    }

    pub fn draft_parent(&self, draft: DraftId) -> Result<&PostId, SessionError> {
        self.drafts
            .get(&draft)
            .ok_or(SessionError::UnknownDraft(draft))
    }

    pub fn close_draft(&mut self, draft: DraftId) -> Option<PostId> {
        self.drafts.remove(&draft)
    }

    pub fn pending_drafts(&self) -> Vec<(DraftId, PostId)> {
        self.drafts
            .iter()
            .map(|(draft, parent)| (*draft, parent.clone()))
            .collect()
    }
}
