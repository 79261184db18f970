// Element ids of the generated post pages.
//
// An existing post uses `post-<kind>-<post id>`, an unsaved child of that post
// uses `new-<draft>-post-<kind>-<parent id>`.

use crate::edit_session::DraftId;
use crate::post_id::PostId;

pub const SUMMARY: &str = "summary";
pub const BOX: &str = "box";
pub const BODY_CONTAINER: &str = "body-container";
pub const BODY_TEXTAREA: &str = "body-textarea";
pub const SHOW_BUTTON: &str = "body-show-button";
pub const HIDE_BUTTON: &str = "body-hide-button";
pub const EDIT_BUTTON: &str = "body-edit-button";
pub const RAW_EDIT_BUTTON: &str = "raw-edit-button";
pub const ADD_CHILD_BUTTON: &str = "body-addchild-button";
pub const SAVE_BUTTON: &str = "body-save-button";
pub const CANCEL_BUTTON: &str = "body-cancel-button";
pub const DELETE_BUTTON: &str = "body-delete-button";

/// Ids renamed when a post summary is cloned into a draft.
pub const DRAFT_RENAMED: [&str; 9] = [
    SHOW_BUTTON,
    BODY_CONTAINER,
    HIDE_BUTTON,
    EDIT_BUTTON,
    RAW_EDIT_BUTTON,
    ADD_CHILD_BUTTON,
    SAVE_BUTTON,
    CANCEL_BUTTON,
    DELETE_BUTTON,
];

/// Buttons that are hidden while a post is being edited.
pub const VIEW_BUTTONS: [&str; 4] = [EDIT_BUTTON, RAW_EDIT_BUTTON, ADD_CHILD_BUTTON, DELETE_BUTTON];
/// Buttons that are shown while a post is being edited.
pub const EDITOR_BUTTONS: [&str; 2] = [SAVE_BUTTON, CANCEL_BUTTON];

pub const BODY_CONTAINER_PREFIX: &str = "post-body-container-";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementIds {
    prefix: String,
    post: String,
}

impl ElementIds {
    pub fn post(post: &PostId) -> Self {
        ElementIds {
            prefix: "post-".into(),
            post: post.to_string(),
        }
    }

    pub fn draft(draft: DraftId, parent: &PostId) -> Self {
        ElementIds {
            prefix: format!("new-{}-post-", draft),
            post: parent.to_string(),
        }
    }

    pub fn of(&self, kind: &str) -> String {
        format!("{}{}-{}", self.prefix, kind, self.post)
    }
}

/// The post whose body container carries `element_id`, if any.
pub fn post_of_body_container(element_id: &str) -> Option<PostId> {
    element_id
        .strip_prefix(BODY_CONTAINER_PREFIX)
        .and_then(|post| PostId::parse(post).ok())
}
