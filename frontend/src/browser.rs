// Browser side: XmlHttpRequest transport, the DOM implementation of `Ui` and
// the button wiring done when a post page loads.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::{debug, error, warn, LevelFilter, Metadata, Record};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    BeforeUnloadEvent, Document, Element, HtmlElement, HtmlSelectElement, HtmlTextAreaElement,
    KeyboardEvent, UrlSearchParams, Window, XmlHttpRequest,
};

use crate::config::ClientConfig;
use crate::connection::{ResponseCallback, SyncClient, Transport, TransportError};
use crate::controller::{EditController, Ui};
use crate::dom_ids::{self, ElementIds};
use crate::edit_session::{DraftId, EditMode};
use crate::post_id::PostId;
use crate::wire::{Method, Request};

pub const CONFIG_ATTRIBUTE: &str = "data-heap-editor-config";

pub const SAVE_HEAPS_BUTTON: &str = "save-heaps-button";
pub const SAVE_HEAPS_TEXT: &str = "Save";
pub const SET_REVIEWED_BUTTON: &str = "set-to-reviewed-button";
pub const SET_REVIEWED_TEXT: &str = "Set to reviewed";

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    pub fn console_log(contents: &str);
}

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            console_log(&format!("{} {}: {}", record.level(), record.target(), record.args()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

pub fn init_logger() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

fn window() -> Option<Window> {
    web_sys::window()
}

fn document() -> Option<Document> {
    window().and_then(|window| window.document())
}

fn element(id: &str) -> Option<Element> {
    let found = document().and_then(|document| document.get_element_by_id(id));
    if found.is_none() {
        debug!("no element #{}", id);
    }
    found
}

fn set_visible(id: &str, visible: bool) {
    let element = match element(id) {
        Some(element) => element,
        None => return,
    };
    if let Some(element) = element.dyn_ref::<HtmlElement>() {
        let display = if visible { "" } else { "none" };
        if let Err(err) = element.style().set_property("display", display) {
            error!("could not change visibility of #{}: {:?}", id, err);
        }
    }
}

fn on_click(id: &str, handler: impl FnMut() + 'static) {
    let element = match element(id) {
        Some(element) => element,
        None => return,
    };

    let click = Closure::<dyn FnMut()>::new(handler);
    if let Some(element) = element.dyn_ref::<HtmlElement>() {
        element.set_onclick(Some(click.as_ref().unchecked_ref()));
    }
    click.forget();
}

fn textarea_value(id: &str) -> Option<String> {
    element(id)
        .and_then(|element| element.dyn_into::<HtmlTextAreaElement>().ok())
        .map(|textarea| textarea.value())
}

// Transport

/// Sends requests with `XmlHttpRequest`; POST parameters go form encoded.
pub struct XhrTransport;

type PendingCallback = Rc<RefCell<Option<ResponseCallback>>>;

impl Transport for XhrTransport {
    fn send(&self, request: Request, on_response: ResponseCallback) {
        let pending: PendingCallback = Rc::new(RefCell::new(Some(on_response)));

        if let Err(err) = open_and_send(&request, pending.clone()) {
            error!("could not send request to {}: {:?}", request.path, err);
            let callback = pending.borrow_mut().take();
            if let Some(callback) = callback {
                callback(Err(TransportError::Network { url: request.path }));
            }
        }
    }
}

fn open_and_send(request: &Request, pending: PendingCallback) -> Result<(), JsValue> {
    let xhr = XmlHttpRequest::new()?;
    xhr.open_with_async(request.method.as_str(), &request.path, true)?;

    // loadend fires once after load, error or abort, which frees the closure
    let xhr0 = xhr.clone();
    let url = request.path.clone();
    let onloadend = Closure::once_into_js(move || {
        let callback = match pending.borrow_mut().take() {
            Some(callback) => callback,
            None => return,
        };

        let status = xhr0.status().unwrap_or(0);
        let body = xhr0.response_text().ok().flatten();
        callback(TransportError::check_status(&url, status, body));
    });
    xhr.set_onloadend(Some(onloadend.unchecked_ref()));

    match request.method {
        Method::Get => xhr.send(),
        Method::Post => {
            let params = UrlSearchParams::new()?;
            for (key, value) in &request.form {
                params.append(key, value);
            }
            xhr.send_with_opt_url_search_params(Some(&params))
        }
    }
}

// Ui

pub type PageController = EditController<XhrTransport, DomUi>;

/// Implements `Ui` on the post page. Holds a weak handle to its controller to
/// bind the buttons of summaries it inserts.
pub struct DomUi {
    controller: RefCell<Weak<PageController>>,
}

impl DomUi {
    pub fn new() -> Self {
        DomUi {
            controller: RefCell::new(Weak::new()),
        }
    }

    pub fn attach(&self, controller: &Rc<PageController>) {
        *self.controller.borrow_mut() = Rc::downgrade(controller);
    }

    fn controller(&self) -> Option<Rc<PageController>> {
        self.controller.borrow().upgrade()
    }

    fn window(&self) -> Option<Window> {
        let window = window();
        if window.is_none() {
            error!("no window");
        }
        window
    }
}

impl Default for DomUi {
    fn default() -> Self {
        Self::new()
    }
}

fn editing_started(ids: &ElementIds) {
    for kind in dom_ids::VIEW_BUTTONS.iter() {
        set_visible(&ids.of(kind), false);
    }
    for kind in dom_ids::EDITOR_BUTTONS.iter() {
        set_visible(&ids.of(kind), true);
    }
}

/// Replaces the `.post-body-content` node inside `container_id` by an empty
/// textarea and returns it.
fn swap_in_textarea(container_id: &str, textarea_id: &str) -> Option<HtmlTextAreaElement> {
    let document = document()?;
    let container = element(container_id)?;
    let content = container.query_selector(".post-body-content").ok()??;

    let textarea = document
        .create_element("textarea")
        .ok()?
        .dyn_into::<HtmlTextAreaElement>()
        .ok()?;
    textarea.set_id(textarea_id);
    textarea.set_class_name("post-body-content");
    textarea.set_rows(10);
    textarea.set_cols(80);

    if let Err(err) = content.replace_with_with_node_1(&textarea) {
        error!("could not open editor in #{}: {:?}", container_id, err);
        return None;
    }
    Some(textarea)
}

fn focus(textarea: &HtmlTextAreaElement) {
    if let Err(err) = textarea.focus() {
        error!("could not focus #{}: {:?}", textarea.id(), err);
    }
}

fn bind_shift_enter(textarea: &HtmlTextAreaElement, mut save: impl FnMut() + 'static) {
    let keypress = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
        if event.key() == "Enter" && event.shift_key() {
            event.prevent_default();
            save();
        }
    });
    if let Err(err) =
        textarea.add_event_listener_with_callback("keypress", keypress.as_ref().unchecked_ref())
    {
        error!("could not bind shift-enter: {:?}", err);
    }
    keypress.forget();
}

impl Ui for DomUi {
    fn alert(&self, message: &str) {
        if let Some(window) = self.window() {
            if let Err(err) = window.alert_with_message(message) {
                error!("alert failed: {:?}", err);
            }
        }
    }

    fn confirm(&self, message: &str) -> bool {
        self.window()
            .and_then(|window| window.confirm_with_message(message).ok())
            .unwrap_or(false)
    }

    fn open_editor(&self, post: &PostId, _mode: EditMode, text: &str) {
        let ids = ElementIds::post(post);
        let textarea = match swap_in_textarea(
            &ids.of(dom_ids::BODY_CONTAINER),
            &ids.of(dom_ids::BODY_TEXTAREA),
        ) {
            Some(textarea) => textarea,
            None => return,
        };
        textarea.set_value(text);
        focus(&textarea);

        let controller = self.controller.borrow().clone();
        let post0 = post.clone();
        let textarea_id = ids.of(dom_ids::BODY_TEXTAREA);
        bind_shift_enter(&textarea, move || {
            if let (Some(controller), Some(text)) =
                (controller.upgrade(), textarea_value(&textarea_id))
            {
                controller.save_post(&post0, &text);
            }
        });

        editing_started(&ids);
    }

    fn show_body(&self, post: &PostId, body_html: &str) {
        if let Some(textarea) = element(&ElementIds::post(post).of(dom_ids::BODY_TEXTAREA)) {
            textarea.set_outer_html(body_html);
        }
    }

    fn replace_summary(&self, post: &PostId, summary_html: &str) {
        if let Some(summary) = element(&ElementIds::post(post).of(dom_ids::SUMMARY)) {
            summary.set_outer_html(summary_html);
        }
        if let Some(controller) = self.controller() {
            bind_post_summary(&controller, post);
        }
    }

    fn editing_finished(&self, post: &PostId) {
        let ids = ElementIds::post(post);
        for kind in dom_ids::VIEW_BUTTONS.iter() {
            set_visible(&ids.of(kind), true);
        }
        for kind in dom_ids::EDITOR_BUTTONS.iter() {
            set_visible(&ids.of(kind), false);
        }
    }

    fn remove_post(&self, post: &PostId) -> usize {
        let post_box = element(&ElementIds::post(post).of(dom_ids::SUMMARY))
            .and_then(|summary| summary.parent_element());
        if let Some(post_box) = post_box {
            post_box.remove();
        }

        document()
            .and_then(|document| document.query_selector_all(".post-box").ok())
            .map(|boxes| boxes.length() as usize)
            .unwrap_or(0)
    }

    fn open_draft(&self, draft: DraftId, parent: &PostId) {
        let document = match document() {
            Some(document) => document,
            None => return,
        };
        let parent_summary = match element(&ElementIds::post(parent).of(dom_ids::SUMMARY)) {
            Some(summary) => summary,
            None => return,
        };

        let result = (|| -> Result<(), JsValue> {
            let source = ElementIds::post(parent);
            let ids = ElementIds::draft(draft, parent);

            let summary: Element = parent_summary.clone_node_with_deep(true)?.dyn_into()?;
            summary.set_id(&ids.of(dom_ids::SUMMARY));
            for kind in dom_ids::DRAFT_RENAMED.iter() {
                if let Some(renamed) = summary.query_selector(&format!("#{}", source.of(kind)))? {
                    renamed.set_id(&ids.of(kind));
                }
            }
            if let Some(index) = summary.query_selector(".index")? {
                index.set_inner_html("&lt;new&gt;");
            }

            let post_box = document.create_element("div")?;
            post_box.set_class_name("post-box");
            post_box.set_id(&ids.of(dom_ids::BOX));
            post_box.append_child(&summary)?;
            parent_summary.insert_adjacent_element("afterend", &post_box)?;
            Ok(())
        })();
        if let Err(err) = result {
            error!("could not open draft {} under {}: {:?}", draft, parent, err);
            return;
        }

        let ids = ElementIds::draft(draft, parent);
        if let Some(textarea) =
            swap_in_textarea(&ids.of(dom_ids::BODY_CONTAINER), &ids.of(dom_ids::BODY_TEXTAREA))
        {
            focus(&textarea);

            let controller = self.controller.borrow().clone();
            let textarea_id = ids.of(dom_ids::BODY_TEXTAREA);
            bind_shift_enter(&textarea, move || {
                if let (Some(controller), Some(text)) =
                    (controller.upgrade(), textarea_value(&textarea_id))
                {
                    controller.save_child_post(draft, &text);
                }
            });
        }
        editing_started(&ids);

        if let Some(controller) = self.controller() {
            bind_draft(&controller, draft, parent);
        }
    }

    fn replace_draft(&self, draft: DraftId, parent: &PostId, new_post: &PostId, summary_html: &str) {
        if let Some(summary) = element(&ElementIds::draft(draft, parent).of(dom_ids::SUMMARY)) {
            summary.set_outer_html(summary_html);
        }
        if let Some(controller) = self.controller() {
            bind_post_summary(&controller, new_post);
        }
    }

    fn discard_draft(&self, draft: DraftId, parent: &PostId) {
        if let Some(post_box) = element(&ElementIds::draft(draft, parent).of(dom_ids::BOX)) {
            post_box.remove();
        }
    }

    fn navigate(&self, path: &str) {
        if let Some(window) = self.window() {
            if let Err(err) = window.location().set_href(path) {
                error!("could not navigate to {}: {:?}", path, err);
            }
        }
    }

    fn reload(&self) {
        if let Some(window) = self.window() {
            if let Err(err) = window.location().reload() {
                error!("could not reload: {:?}", err);
            }
        }
    }
}

// Button wiring

fn show_post_body(ids: &ElementIds) {
    set_visible(&ids.of(dom_ids::BODY_CONTAINER), true);
    set_visible(&ids.of(dom_ids::SHOW_BUTTON), false);
}

fn hide_post_body(ids: &ElementIds) {
    set_visible(&ids.of(dom_ids::BODY_CONTAINER), false);
    set_visible(&ids.of(dom_ids::SHOW_BUTTON), true);
}

fn set_all_post_bodies(visible: bool) {
    for post in page_posts() {
        let ids = ElementIds::post(&post);
        if visible {
            show_post_body(&ids);
        } else {
            hide_post_body(&ids);
        }
    }
}

/// Posts present on the page, found through their body containers.
pub fn page_posts() -> Vec<PostId> {
    let containers = document().map(|document| document.query_selector_all(".post-body-container"));
    let containers = match containers {
        Some(Ok(containers)) => containers,
        _ => return Vec::new(),
    };

    (0..containers.length())
        .filter_map(|i| containers.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .filter_map(|container| dom_ids::post_of_body_container(&container.id()))
        .collect()
}

pub fn bind_post_summary(controller: &Rc<PageController>, post: &PostId) {
    let ids = ElementIds::post(post);

    let ids0 = ids.clone();
    on_click(&ids.of(dom_ids::HIDE_BUTTON), move || hide_post_body(&ids0));
    let ids0 = ids.clone();
    on_click(&ids.of(dom_ids::SHOW_BUTTON), move || show_post_body(&ids0));

    let (c, p) = (controller.clone(), post.clone());
    on_click(&ids.of(dom_ids::EDIT_BUTTON), move || c.edit_post(&p, EditMode::Body));
    let (c, p) = (controller.clone(), post.clone());
    on_click(&ids.of(dom_ids::RAW_EDIT_BUTTON), move || c.edit_post(&p, EditMode::Raw));
    let (c, p) = (controller.clone(), post.clone());
    on_click(&ids.of(dom_ids::ADD_CHILD_BUTTON), move || {
        c.add_child_post(&p);
    });

    let (c, p) = (controller.clone(), post.clone());
    let textarea_id = ids.of(dom_ids::BODY_TEXTAREA);
    on_click(&ids.of(dom_ids::SAVE_BUTTON), move || match textarea_value(&textarea_id) {
        Some(text) => c.save_post(&p, &text),
        None => warn!("no editor open for {}", p),
    });

    let (c, p) = (controller.clone(), post.clone());
    on_click(&ids.of(dom_ids::CANCEL_BUTTON), move || c.cancel_edit(&p));
    let (c, p) = (controller.clone(), post.clone());
    on_click(&ids.of(dom_ids::DELETE_BUTTON), move || c.delete_post(&p));
}

fn bind_draft(controller: &Rc<PageController>, draft: DraftId, parent: &PostId) {
    let ids = ElementIds::draft(draft, parent);

    let ids0 = ids.clone();
    on_click(&ids.of(dom_ids::HIDE_BUTTON), move || hide_post_body(&ids0));
    let ids0 = ids.clone();
    on_click(&ids.of(dom_ids::SHOW_BUTTON), move || show_post_body(&ids0));

    let c = controller.clone();
    let textarea_id = ids.of(dom_ids::BODY_TEXTAREA);
    on_click(&ids.of(dom_ids::SAVE_BUTTON), move || {
        if let Some(text) = textarea_value(&textarea_id) {
            c.save_child_post(draft, &text);
        }
    });

    let c = controller.clone();
    on_click(&ids.of(dom_ids::CANCEL_BUTTON), move || c.cancel_child_post(draft));
}

/// Appends a button to the page's `.global-buttons` bar and binds it.
pub fn add_global_button(text: &str, id: &str, handler: impl FnMut() + 'static) {
    let document = match document() {
        Some(document) => document,
        None => return,
    };

    let result = (|| -> Result<(), JsValue> {
        let bar = match document.query_selector(".global-buttons")? {
            Some(bar) => bar,
            None => {
                warn!("no .global-buttons bar for #{}", id);
                return Ok(());
            }
        };
        let button = document.create_element("span")?;
        button.set_class_name("button global-button");
        button.set_id(id);
        button.set_text_content(Some(text));
        bar.append_child(&button)?;
        Ok(())
    })();
    if let Err(err) = result {
        error!("could not add #{}: {:?}", id, err);
        return;
    }

    on_click(id, handler);
}

fn bind_page_buttons(controller: &Rc<PageController>) {
    on_click("hide-all-post-bodies", || set_all_post_bodies(false));
    on_click("show-all-post-bodies", || set_all_post_bodies(true));

    let c = controller.clone();
    add_global_button(SAVE_HEAPS_TEXT, SAVE_HEAPS_BUTTON, move || c.persist_all());

    let c = controller.clone();
    on_click("new-root-post-body-save-button-new-root", move || {
        let heap = element("heapselector")
            .and_then(|selector| selector.dyn_into::<HtmlSelectElement>().ok())
            .map(|selector| selector.value());
        let text = element("new-root-post-body-container-new-root")
            .and_then(|container| container.query_selector("textarea").ok().flatten())
            .and_then(|textarea| textarea.dyn_into::<HtmlTextAreaElement>().ok())
            .map(|textarea| textarea.value());

        match (heap, text) {
            (Some(heap), Some(text)) => c.save_new_root(heap, &text),
            _ => warn!("new root form is incomplete"),
        }
    });

    let c = controller.clone();
    add_global_button(SET_REVIEWED_TEXT, SET_REVIEWED_BUTTON, move || {
        let root = window()
            .and_then(|window| window.location().pathname().ok())
            .and_then(|path| PostId::from_page_path(&path));
        match root {
            Some(root) => c.set_thread_reviewed(&root),
            None => warn!("not on a thread page"),
        }
    });
}

fn bind_leave_warning(window: &Window, controller: &Rc<PageController>) {
    let controller = controller.clone();
    let beforeunload = Closure::<dyn FnMut(BeforeUnloadEvent)>::new(move |event: BeforeUnloadEvent| {
        if let Some(warning) = controller.leave_warning() {
            event.prevent_default();
            event.set_return_value(&warning);
        }
    });
    window.set_onbeforeunload(Some(beforeunload.as_ref().unchecked_ref()));
    beforeunload.forget();
}

fn read_config(document: &Document) -> ClientConfig {
    let json = document
        .body()
        .and_then(|body| body.get_attribute(CONFIG_ATTRIBUTE));

    match json.map(|json| ClientConfig::from_json(&json)) {
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            error!("ignoring malformed {}: {}", CONFIG_ATTRIBUTE, err);
            ClientConfig::default()
        }
        None => ClientConfig::default(),
    }
}

#[wasm_bindgen]
pub fn bootstrap() {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    init_logger();

    let (window, document) = match window().and_then(|w| w.document().map(|d| (w, d))) {
        Some(found) => found,
        None => {
            error!("no document to bind to");
            return;
        }
    };

    let ui = Rc::new(DomUi::new());
    let client = SyncClient::new(XhrTransport, read_config(&document));
    let controller = Rc::new(EditController::new(client, ui.clone()));
    ui.attach(&controller);

    let posts = page_posts();
    debug!("binding {} posts", posts.len());
    for post in &posts {
        set_visible(&ElementIds::post(post).of(dom_ids::SHOW_BUTTON), false);
        bind_post_summary(&controller, post);
    }
    bind_page_buttons(&controller);
    bind_leave_warning(&window, &controller);
}
