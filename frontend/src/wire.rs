// Request encoding shared by every call the page makes to the server.
//
// Form values are JSON texts prefixed with JSON_ESCAPE_CHAR so the server can
// tell structured values from plain strings.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::edit_session::EditMode;
use crate::post_id::{HeapId, PostId};

pub const JSON_ESCAPE_CHAR: char = '\x00';

#[derive(Debug, Error)]
#[error("parameter is not a valid JSON object: {value:?}")]
pub struct WireError {
    pub value: String,
    #[source]
    pub source: serde_json::Error,
}

pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut encoded = String::with_capacity(json.len() + 1);
    encoded.push(JSON_ESCAPE_CHAR);
    encoded.push_str(&json);
    Ok(encoded)
}

/// Inverse of [`encode_value`], as the server reads parameters: only a value
/// longer than the escape char itself is treated as JSON.
pub fn decode_value(value: &str) -> Result<Value, WireError> {
    match value.strip_prefix(JSON_ESCAPE_CHAR) {
        Some(json) if !json.is_empty() => {
            serde_json::from_str(json).map_err(|source| WireError {
                value: value.to_owned(),
                source,
            })
        }
        _ => Ok(Value::String(value.to_owned())),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Already escaped with [`encode_value`].
    pub form: Vec<(&'static str, String)>,
}

impl Request {
    pub fn get(path: String) -> Self {
        Request {
            method: Method::Get,
            path,
            form: Vec::new(),
        }
    }

    pub fn post(path: &str) -> Self {
        Request {
            method: Method::Post,
            path: path.to_owned(),
            form: Vec::new(),
        }
    }

    pub fn arg(mut self, key: &'static str, value: &str) -> Result<Self, serde_json::Error> {
        self.form.push((key, encode_value(value)?));
        Ok(self)
    }

    /// Decoded value of a form parameter.
    pub fn param(&self, key: &str) -> Option<Value> {
        self.form
            .iter()
            .find(|(name, _)| *name == key)
            .and_then(|(_, value)| decode_value(value).ok())
    }
}

/// Every server endpoint the editor talks to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    RawPostBody(PostId),
    RawPostText(PostId),
    SetPostBody,
    SetRawPost,
    NewPost,
    AddNewRoot,
    GetPostBody,
    DeletePost,
    Save,
    SetPostReviewed,
}

impl Endpoint {
    pub fn raw_content(post: &PostId, mode: EditMode) -> Self {
        match mode {
            EditMode::Body => Endpoint::RawPostBody(post.clone()),
            EditMode::Raw => Endpoint::RawPostText(post.clone()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Endpoint::RawPostBody(post) => format!("/raw-post-bodies/{}", post.to_wire()),
            Endpoint::RawPostText(post) => format!("/raw-post-text/{}", post.to_wire()),
            Endpoint::SetPostBody => "/set-post-body".into(),
            Endpoint::SetRawPost => "/set-raw-post".into(),
            Endpoint::NewPost => "/new-post".into(),
            Endpoint::AddNewRoot => "/add-new-root".into(),
            Endpoint::GetPostBody => "/get-post-body".into(),
            Endpoint::DeletePost => "/delete-post".into(),
            Endpoint::Save => "/save".into(),
            Endpoint::SetPostReviewed => "/set-post-reviewed".into(),
        }
    }
}

/// How the text of an editor is sent back to the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentUpdate {
    UpdateBody(PostId),
    UpdateRaw(PostId),
    /// The post id is the parent of the new post.
    CreateChild(PostId),
    CreateRoot(HeapId),
}

impl ContentUpdate {
    pub fn for_mode(post: PostId, mode: EditMode) -> Self {
        match mode {
            EditMode::Body => ContentUpdate::UpdateBody(post),
            EditMode::Raw => ContentUpdate::UpdateRaw(post),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            ContentUpdate::UpdateBody(_) => Endpoint::SetPostBody,
            ContentUpdate::UpdateRaw(_) => Endpoint::SetRawPost,
            ContentUpdate::CreateChild(_) => Endpoint::NewPost,
            ContentUpdate::CreateRoot(_) => Endpoint::AddNewRoot,
        }
    }

    pub fn request(&self, text: &str) -> Result<Request, serde_json::Error> {
        let request = Request::post(&self.endpoint().path());
        match self {
            ContentUpdate::UpdateBody(post) | ContentUpdate::CreateChild(post) => request
                .arg("post_id", &post.to_wire())?
                .arg("new_body_text", text),
            ContentUpdate::UpdateRaw(post) => request
                .arg("post_id", &post.to_wire())?
                .arg("new_post_text", text),
            ContentUpdate::CreateRoot(heap) => request
                .arg("heap_id", heap)?
                .arg("new_body_text", text),
        }
    }
}
