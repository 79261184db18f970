extern crate env_logger;
extern crate heap_editor_frontend;
extern crate serde_json;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use serde_json::json;

use heap_editor_frontend::connection::ResponseCallback;
use heap_editor_frontend::controller::{
    error_alert, MAJOR_CHANGE_WARNING, SAVE_SUCCESSFUL,
};
use heap_editor_frontend::wire::Method;
use heap_editor_frontend::{
    ClientConfig, DraftId, EditController, EditMode, PostId, Request, SyncClient, Transport,
    TransportError, Ui,
};

fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .try_init();
}

/// Answers requests from a table keyed by path. While `hold` is set replies
/// are queued until `release` is called.
#[derive(Default)]
struct StubServer {
    replies: RefCell<HashMap<String, Result<String, TransportError>>>,
    requests: RefCell<Vec<Request>>,
    hold: Cell<bool>,
    held: RefCell<Vec<(ResponseCallback, Result<String, TransportError>)>>,
}

impl StubServer {
    fn reply(&self, path: &str, body: &str) {
        self.replies
            .borrow_mut()
            .insert(path.to_owned(), Ok(body.to_owned()));
    }

    fn fail(&self, path: &str, status: u16) {
        self.replies.borrow_mut().insert(
            path.to_owned(),
            Err(TransportError::Status {
                url: path.to_owned(),
                status,
            }),
        );
    }

    fn release(&self) {
        let held: Vec<_> = self.held.borrow_mut().drain(..).collect();
        for (callback, reply) in held {
            callback(reply);
        }
    }

    fn paths(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|request| request.path.clone())
            .collect()
    }

    fn last_request(&self) -> Request {
        self.requests
            .borrow()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

impl Transport for StubServer {
    fn send(&self, request: Request, on_response: ResponseCallback) {
        let reply = self
            .replies
            .borrow()
            .get(&request.path)
            .cloned()
            .unwrap_or_else(|| {
                Err(TransportError::Status {
                    url: request.path.clone(),
                    status: 404,
                })
            });
        self.requests.borrow_mut().push(request);

        if self.hold.get() {
            self.held.borrow_mut().push((on_response, reply));
        } else {
            on_response(reply);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum UiEvent {
    Alert(String),
    OpenEditor(PostId, EditMode, String),
    ShowBody(PostId, String),
    ReplaceSummary(PostId, String),
    EditingFinished(PostId),
    RemovePost(PostId),
    OpenDraft(DraftId, PostId),
    ReplaceDraft(DraftId, PostId, PostId, String),
    DiscardDraft(DraftId, PostId),
    Navigate(String),
    Reload,
}

struct RecordingUi {
    events: RefCell<Vec<UiEvent>>,
    confirm_answer: Cell<bool>,
    posts_left: Cell<usize>,
}

impl RecordingUi {
    fn new() -> Self {
        RecordingUi {
            events: RefCell::new(Vec::new()),
            confirm_answer: Cell::new(true),
            posts_left: Cell::new(3),
        }
    }

    fn push(&self, event: UiEvent) {
        self.events.borrow_mut().push(event);
    }

    fn events(&self) -> Vec<UiEvent> {
        self.events.borrow().clone()
    }

    fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl Ui for RecordingUi {
    fn alert(&self, message: &str) {
        self.push(UiEvent::Alert(message.to_owned()));
    }

    fn confirm(&self, _message: &str) -> bool {
        self.confirm_answer.get()
    }

    fn open_editor(&self, post: &PostId, mode: EditMode, text: &str) {
        self.push(UiEvent::OpenEditor(post.clone(), mode, text.to_owned()));
    }

    fn show_body(&self, post: &PostId, body_html: &str) {
        self.push(UiEvent::ShowBody(post.clone(), body_html.to_owned()));
    }

    fn replace_summary(&self, post: &PostId, summary_html: &str) {
        self.push(UiEvent::ReplaceSummary(post.clone(), summary_html.to_owned()));
    }

    fn editing_finished(&self, post: &PostId) {
        self.push(UiEvent::EditingFinished(post.clone()));
    }

    fn remove_post(&self, post: &PostId) -> usize {
        self.push(UiEvent::RemovePost(post.clone()));
        self.posts_left.set(self.posts_left.get().saturating_sub(1));
        self.posts_left.get()
    }

    fn open_draft(&self, draft: DraftId, parent: &PostId) {
        self.push(UiEvent::OpenDraft(draft, parent.clone()));
    }

    fn replace_draft(&self, draft: DraftId, parent: &PostId, new_post: &PostId, summary_html: &str) {
        self.push(UiEvent::ReplaceDraft(
            draft,
            parent.clone(),
            new_post.clone(),
            summary_html.to_owned(),
        ));
    }

    fn discard_draft(&self, draft: DraftId, parent: &PostId) {
        self.push(UiEvent::DiscardDraft(draft, parent.clone()));
    }

    fn navigate(&self, path: &str) {
        self.push(UiEvent::Navigate(path.to_owned()));
    }

    fn reload(&self) {
        self.push(UiEvent::Reload);
    }
}

type TestController = EditController<StubServer, RecordingUi>;

fn controller() -> TestController {
    init_logger();
    let client = SyncClient::new(StubServer::default(), ClientConfig::default());
    EditController::new(client, Rc::new(RecordingUi::new()))
}

fn server(controller: &TestController) -> &StubServer {
    controller.client().transport()
}

fn h3() -> PostId {
    PostId::new("h", "3")
}

/// Puts `h-3` into body editing with "old text" loaded.
fn editing_h3(controller: &TestController) {
    server(controller).reply("/raw-post-bodies/h/3", "old text");
    controller.edit_post(&h3(), EditMode::Body);
    assert!(controller.is_editing(&h3()));
    controller.ui().clear();
}

#[test]
fn edit_post_loads_raw_body_into_editor() {
    let controller = controller();
    server(&controller).reply("/raw-post-bodies/h/3", "old text");

    controller.edit_post(&h3(), EditMode::Body);

    assert_eq!(controller.mode(&h3()), Some(EditMode::Body));
    assert_eq!(
        controller.ui().events(),
        vec![UiEvent::OpenEditor(h3(), EditMode::Body, "old text".into())]
    );
    let request = server(&controller).last_request();
    assert_eq!(request.method, Method::Get);
    assert!(request.form.is_empty());
}

#[test]
fn raw_edit_fetches_full_text() {
    let controller = controller();
    server(&controller).reply("/raw-post-text/h/3", "Author: a\n\nbody");

    controller.edit_post(&h3(), EditMode::Raw);

    assert_eq!(controller.mode(&h3()), Some(EditMode::Raw));
    assert_eq!(server(&controller).paths(), vec!["/raw-post-text/h/3"]);
}

#[test]
fn saving_body_ends_edit_and_renders_returned_html() {
    let controller = controller();
    editing_h3(&controller);
    server(&controller).reply("/set-post-body", r#"{"new_body_html":"<div>hello</div>"}"#);

    controller.save_post(&h3(), "hello");

    assert!(!controller.is_editing(&h3()));
    assert_eq!(
        controller.ui().events(),
        vec![
            UiEvent::ShowBody(h3(), "<div>hello</div>".into()),
            UiEvent::EditingFinished(h3()),
        ]
    );

    let request = server(&controller).last_request();
    assert_eq!(request.path, "/set-post-body");
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.param("post_id"), Some(json!("h/3")));
    assert_eq!(request.param("new_body_text"), Some(json!("hello")));
}

#[test]
fn error_reply_keeps_post_in_editing() {
    let controller = controller();
    editing_h3(&controller);
    server(&controller).reply("/set-post-body", r#"{"error":"X"}"#);

    controller.save_post(&h3(), "hello");

    assert_eq!(controller.mode(&h3()), Some(EditMode::Body));
    assert_eq!(
        controller.ui().events(),
        vec![UiEvent::Alert(error_alert("X"))]
    );
    assert_eq!(error_alert("X"), "Error occured:\nX");
}

#[test]
fn raw_save_replaces_summary_and_warns_on_major_change() {
    let controller = controller();
    server(&controller).reply("/raw-post-text/h/3", "raw");
    controller.edit_post(&h3(), EditMode::Raw);
    controller.ui().clear();
    server(&controller).reply(
        "/set-raw-post",
        r#"{"new_post_summary":"<div id=\"post-summary-h-3\"/>","major_change":true}"#,
    );

    controller.save_post(&h3(), "Parent: h/1\n\nraw");

    assert!(!controller.is_editing(&h3()));
    assert_eq!(
        controller.ui().events(),
        vec![
            UiEvent::ReplaceSummary(h3(), r#"<div id="post-summary-h-3"/>"#.into()),
            UiEvent::Alert(MAJOR_CHANGE_WARNING.into()),
            UiEvent::EditingFinished(h3()),
        ]
    );
    assert_eq!(
        server(&controller).last_request().param("new_post_text"),
        Some(json!("Parent: h/1\n\nraw"))
    );
}

#[test]
fn transport_failure_changes_nothing() {
    let controller = controller();
    editing_h3(&controller);
    server(&controller).fail("/set-post-body", 500);

    controller.save_post(&h3(), "hello");

    assert!(controller.is_editing(&h3()));
    assert!(controller.ui().events().is_empty());
}

#[test]
fn editing_an_edited_post_is_ignored() {
    let controller = controller();
    editing_h3(&controller);

    controller.edit_post(&h3(), EditMode::Raw);

    assert_eq!(controller.mode(&h3()), Some(EditMode::Body));
    assert_eq!(server(&controller).paths().len(), 1);
    assert!(controller.ui().events().is_empty());
}

#[test]
fn racing_edit_clicks_open_one_editor() {
    let controller = controller();
    server(&controller).reply("/raw-post-bodies/h/3", "a");
    server(&controller).reply("/raw-post-text/h/3", "b");
    server(&controller).hold.set(true);

    controller.edit_post(&h3(), EditMode::Body);
    controller.edit_post(&h3(), EditMode::Raw);
    server(&controller).release();

    assert_eq!(controller.mode(&h3()), Some(EditMode::Body));
    assert_eq!(
        controller.ui().events(),
        vec![UiEvent::OpenEditor(h3(), EditMode::Body, "a".into())]
    );
}

#[test]
fn save_without_edit_sends_nothing() {
    let controller = controller();
    controller.save_post(&h3(), "hello");
    assert!(server(&controller).paths().is_empty());
}

#[test]
fn cancel_without_edit_sends_nothing() {
    let controller = controller();
    controller.cancel_edit(&h3());
    assert!(server(&controller).paths().is_empty());
    assert!(controller.ui().events().is_empty());
}

#[test]
fn cancel_restores_rendered_body() {
    let controller = controller();
    editing_h3(&controller);
    server(&controller).reply("/get-post-body", r#"{"body_html":"<p>old text</p>"}"#);

    controller.cancel_edit(&h3());

    assert!(!controller.is_editing(&h3()));
    assert_eq!(
        controller.ui().events(),
        vec![
            UiEvent::ShowBody(h3(), "<p>old text</p>".into()),
            UiEvent::EditingFinished(h3()),
        ]
    );
    assert_eq!(
        server(&controller).last_request().param("post_id"),
        Some(json!("h/3"))
    );
}

#[test]
fn declined_delete_sends_nothing() {
    let controller = controller();
    controller.ui().confirm_answer.set(false);

    controller.delete_post(&h3());

    assert!(server(&controller).paths().is_empty());
    assert!(controller.ui().events().is_empty());
}

#[test]
fn delete_removes_node_and_leaves_session_entry() {
    let controller = controller();
    editing_h3(&controller);
    server(&controller).reply("/delete-post", "{}");

    controller.delete_post(&h3());

    assert_eq!(controller.ui().events(), vec![UiEvent::RemovePost(h3())]);
    assert!(controller.is_editing(&h3()));
    assert_eq!(
        server(&controller).last_request().param("post_id"),
        Some(json!("h/3"))
    );
}

#[test]
fn deleting_the_last_post_returns_to_index() {
    let controller = controller();
    controller.ui().posts_left.set(1);
    server(&controller).reply("/delete-post", "{}");

    controller.delete_post(&h3());

    assert_eq!(
        controller.ui().events(),
        vec![UiEvent::RemovePost(h3()), UiEvent::Navigate("/".into())]
    );
}

#[test]
fn failed_delete_keeps_node() {
    let controller = controller();
    server(&controller).reply("/delete-post", r#"{"error":"No such post: \"h/3\""}"#);

    controller.delete_post(&h3());

    assert_eq!(
        controller.ui().events(),
        vec![UiEvent::Alert(error_alert("No such post: \"h/3\""))]
    );
}

#[test]
fn child_drafts_get_fresh_numbers_and_save_as_new_posts() {
    let controller = controller();

    let first = controller.add_child_post(&h3());
    let second = controller.add_child_post(&h3());
    assert_ne!(first, second);
    assert!(server(&controller).paths().is_empty());

    server(&controller).reply(
        "/new-post",
        r#"{"new_post_id":"h-9","new_post_summary":"<div>new</div>"}"#,
    );
    controller.save_child_post(second, "child text");

    assert_eq!(
        controller.ui().events(),
        vec![
            UiEvent::OpenDraft(first, h3()),
            UiEvent::OpenDraft(second, h3()),
            UiEvent::ReplaceDraft(second, h3(), PostId::new("h", "9"), "<div>new</div>".into()),
        ]
    );
    let request = server(&controller).last_request();
    assert_eq!(request.param("post_id"), Some(json!("h/3")));
    assert_eq!(request.param("new_body_text"), Some(json!("child text")));

    // a saved draft cannot be saved twice
    controller.save_child_post(second, "again");
    assert_eq!(server(&controller).paths().len(), 1);
}

#[test]
fn cancelled_draft_is_discarded_locally() {
    let controller = controller();
    let draft = controller.add_child_post(&h3());

    controller.cancel_child_post(draft);
    controller.cancel_child_post(draft);

    assert!(server(&controller).paths().is_empty());
    assert_eq!(
        controller.ui().events(),
        vec![UiEvent::OpenDraft(draft, h3()), UiEvent::DiscardDraft(draft, h3())]
    );
}

#[test]
fn new_root_navigates_to_its_page() {
    let controller = controller();
    server(&controller).reply("/add-new-root", r#"{"new_post_id":"h-12"}"#);

    controller.save_new_root("h".into(), "root text");

    assert_eq!(
        controller.ui().events(),
        vec![UiEvent::Navigate("/posts/h/12".into())]
    );
    let request = server(&controller).last_request();
    assert_eq!(request.param("heap_id"), Some(json!("h")));
    assert_eq!(request.param("post_id"), None);
}

#[test]
fn persist_all_reports_success() {
    let controller = controller();
    server(&controller).reply("/save", "{}");

    controller.persist_all();

    assert_eq!(
        controller.ui().events(),
        vec![UiEvent::Alert(SAVE_SUCCESSFUL.into())]
    );
    assert!(server(&controller).last_request().form.is_empty());
}

#[test]
fn reviewed_thread_reloads_page() {
    let controller = controller();
    server(&controller).reply("/set-post-reviewed", "{}");

    controller.set_thread_reviewed(&PostId::new("h", "1"));

    assert_eq!(controller.ui().events(), vec![UiEvent::Reload]);
    assert_eq!(
        server(&controller).last_request().param("post_id"),
        Some(json!("h/1"))
    );
}

#[test]
fn leave_warning_lists_posts_being_edited() {
    let controller = controller();
    assert_eq!(controller.leave_warning(), None);

    editing_h3(&controller);
    server(&controller).reply("/raw-post-text/h/1", "raw");
    controller.edit_post(&PostId::new("h", "1"), EditMode::Raw);

    assert_eq!(
        controller.leave_warning().unwrap(),
        "You have attempted to leave this page, but there are posts being edited: h/1, h/3"
    );
    assert_eq!(controller.pending_edits().len(), 2);
}
