use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use log::{error, warn};

use crate::connection::{SyncClient, SyncError, Transport};
use crate::edit_session::{DraftId, EditMode, EditSession};
use crate::post_id::{HeapId, PostId};
use crate::query_result::{ServerResult, UpdateOutcome};
use crate::wire::ContentUpdate;

pub const DELETE_CONFIRMATION: &str = "Are you sure?";
pub const SAVE_SUCCESSFUL: &str = "Save successful.";
pub const MAJOR_CHANGE_WARNING: &str = "A major change was made on the post that may have \
     affected the thread structure. To see the most current thread structure, please reload \
     the page.";

pub fn error_alert(message: &str) -> String {
    format!("Error occured:\n{}", message)
}

/// Everything the controller needs from the page. Implemented on top of the
/// DOM in the browser and by recorders in tests.
pub trait Ui {
    fn alert(&self, message: &str);
    fn confirm(&self, message: &str) -> bool;

    /// Swaps the rendered body of `post` for an editor holding `text`.
    fn open_editor(&self, post: &PostId, mode: EditMode, text: &str);
    /// Swaps the editor of `post` for rendered body html.
    fn show_body(&self, post: &PostId, body_html: &str);
    /// Replaces the whole summary of `post`, rebinding its buttons.
    fn replace_summary(&self, post: &PostId, summary_html: &str);
    /// Shows the edit/delete buttons again and hides save/cancel.
    fn editing_finished(&self, post: &PostId);
    /// Removes the post's box. Returns how many post boxes remain on the page.
    fn remove_post(&self, post: &PostId) -> usize;

    fn open_draft(&self, draft: DraftId, parent: &PostId);
    fn replace_draft(&self, draft: DraftId, parent: &PostId, new_post: &PostId, summary_html: &str);
    fn discard_draft(&self, draft: DraftId, parent: &PostId);

    fn navigate(&self, path: &str);
    fn reload(&self);
}

/// Reacts to the page's buttons. Owns the edit session of one page.
pub struct EditController<T, U> {
    session: Rc<RefCell<EditSession>>,
    client: SyncClient<T>,
    ui: Rc<U>,
}

impl<T: Transport, U: Ui + 'static> EditController<T, U> {
    pub fn new(client: SyncClient<T>, ui: Rc<U>) -> Self {
        EditController {
            session: Rc::new(RefCell::new(EditSession::new())),
            client,
            ui,
        }
    }

    pub fn client(&self) -> &SyncClient<T> {
        &self.client
    }

    pub fn ui(&self) -> &Rc<U> {
        &self.ui
    }

    pub fn is_editing(&self, post: &PostId) -> bool {
        self.session.borrow().is_editing(post)
    }

    pub fn mode(&self, post: &PostId) -> Option<EditMode> {
        self.session.borrow().mode(post)
    }

    pub fn pending_edits(&self) -> BTreeSet<PostId> {
        self.session.borrow().pending_edits()
    }

    pub fn leave_warning(&self) -> Option<String> {
        self.session.borrow().leave_warning()
    }

    pub fn edit_post(&self, post: &PostId, mode: EditMode) {
        if let Some(current) = self.mode(post) {
            warn!("{} is already being edited ({:?}), ignoring", post, current);
            return;
        }

        let session = self.session.clone();
        let ui = self.ui.clone();
        let post0 = post.clone();

        self.client.fetch_raw_content(post, mode, move |text| {
            let text = match text {
                Ok(text) => text,
                Err(err) => return report(err),
            };

            // a second click may have won the race while we were waiting
            if let Err(err) = session.borrow_mut().begin_edit(post0.clone(), mode) {
                warn!("{}", err);
                return;
            }
            ui.open_editor(&post0, mode, &text);
        });
    }

    pub fn save_post(&self, post: &PostId, text: &str) {
        let mode = match self.mode(post) {
            Some(mode) => mode,
            None => {
                warn!("save requested for {} which is not being edited", post);
                return;
            }
        };

        let session = self.session.clone();
        let ui = self.ui.clone();
        let post0 = post.clone();

        let update = ContentUpdate::for_mode(post.clone(), mode);
        self.client.update_content(update, text, move |result| {
            let outcome = match accept(&*ui, result) {
                Some(outcome) => outcome,
                None => return,
            };

            match outcome {
                UpdateOutcome::BodyUpdated { new_body_html } => {
                    ui.show_body(&post0, &new_body_html);
                }
                UpdateOutcome::RawUpdated {
                    new_post_summary,
                    major_change,
                } => {
                    ui.replace_summary(&post0, &new_post_summary);
                    if major_change {
                        ui.alert(MAJOR_CHANGE_WARNING);
                    }
                }
                other => {
                    error!("unexpected reply to saving {}: {:?}", post0, other);
                    return;
                }
            }

            session.borrow_mut().end_edit(&post0);
            ui.editing_finished(&post0);
        });
    }

    pub fn cancel_edit(&self, post: &PostId) {
        if self.mode(post).is_none() {
            warn!("cancel requested for {} which is not being edited", post);
            return;
        }

        let session = self.session.clone();
        let ui = self.ui.clone();
        let post0 = post.clone();

        self.client.fetch_body(post, move |result| {
            if let Some(body_html) = accept(&*ui, result) {
                ui.show_body(&post0, &body_html);
                session.borrow_mut().end_edit(&post0);
                ui.editing_finished(&post0);
            }
        });
    }

    /// Asks first. Children of the post become thread roots on the server,
    /// the page only drops the stale box. Any edit entry stays with the caller.
    pub fn delete_post(&self, post: &PostId) {
        if !self.ui.confirm(DELETE_CONFIRMATION) {
            return;
        }

        let ui = self.ui.clone();
        let post0 = post.clone();
        let index_path = self.client.config().index_path.clone();

        self.client.delete_post(post, move |result| {
            if accept(&*ui, result).is_some() && ui.remove_post(&post0) == 0 {
                // the thread root itself is gone
                ui.navigate(&index_path);
            }
        });
    }

    pub fn add_child_post(&self, parent: &PostId) -> DraftId {
        let draft = self.session.borrow_mut().open_draft(parent.clone());
        self.ui.open_draft(draft, parent);
        draft
    }

    pub fn save_child_post(&self, draft: DraftId, text: &str) {
        let parent = match self.session.borrow().draft_parent(draft) {
            Ok(parent) => parent.clone(),
            Err(err) => {
                warn!("{}", err);
                return;
            }
        };

        let session = self.session.clone();
        let ui = self.ui.clone();

        let update = ContentUpdate::CreateChild(parent.clone());
        self.client.update_content(update, text, move |result| {
            match accept(&*ui, result) {
                Some(UpdateOutcome::ChildCreated {
                    new_post_id,
                    new_post_summary,
                }) => {
                    session.borrow_mut().close_draft(draft);
                    ui.replace_draft(draft, &parent, &new_post_id, &new_post_summary);
                }
                Some(other) => error!("unexpected reply to draft {}: {:?}", draft, other),
                None => {}
            }
        });
    }

    pub fn cancel_child_post(&self, draft: DraftId) {
        let parent = self.session.borrow_mut().close_draft(draft);
        match parent {
            Some(parent) => self.ui.discard_draft(draft, &parent),
            None => warn!("cancel requested for unknown draft {}", draft),
        }
    }

    pub fn save_new_root(&self, heap: HeapId, text: &str) {
        let ui = self.ui.clone();
        let config = self.client.config().clone();

        self.client
            .update_content(ContentUpdate::CreateRoot(heap), text, move |result| {
                match accept(&*ui, result) {
                    Some(UpdateOutcome::RootCreated { new_post_id }) => {
                        ui.navigate(&config.post_page(&new_post_id.to_wire()));
                    }
                    Some(other) => error!("unexpected reply to new root: {:?}", other),
                    None => {}
                }
            });
    }

    pub fn persist_all(&self) {
        let ui = self.ui.clone();
        self.client.persist_all(move |result| {
            if accept(&*ui, result).is_some() {
                ui.alert(SAVE_SUCCESSFUL);
            }
        });
    }

    pub fn set_thread_reviewed(&self, root: &PostId) {
        let ui = self.ui.clone();
        self.client.set_thread_reviewed(root, move |result| {
            if accept(&*ui, result).is_some() {
                ui.reload();
            }
        });
    }
}

// Server errors are shown to the user, transport and decoding failures only
// logged. Either way the operation stops here.
fn accept<U: Ui + ?Sized, R>(ui: &U, result: Result<ServerResult<R>, SyncError>) -> Option<R> {
    match result {
        Ok(ServerResult::Success(value)) => Some(value),
        Ok(ServerResult::Error(message)) => {
            ui.alert(&error_alert(&message));
            None
        }
        Err(err) => {
            report(err);
            None
        }
    }
}

fn report(err: SyncError) {
    error!("request abandoned: {}", err);
}
