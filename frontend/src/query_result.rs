use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::post_id::{PostId, PostIdError};

/// A reply from one of the JSON endpoints. The `error` field is checked
/// before anything else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerResult<T> {
    Error(String),
    Success(T),
}

impl<T> ServerResult<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ServerResult<U> {
        match self {
            ServerResult::Error(message) => ServerResult::Error(message),
            ServerResult::Success(value) => ServerResult::Success(f(value)),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ServerResult::Error(_))
    }
}

impl<T: DeserializeOwned> ServerResult<T> {
    /// An `error` that is missing or falsy (`null`, `false`, `0`, `""`) does
    /// not count.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let reply: Value = serde_json::from_str(json)?;
        match reply.get("error").and_then(error_message) {
            Some(message) => Ok(ServerResult::Error(message)),
            None => Ok(ServerResult::Success(serde_json::from_value(reply)?)),
        }
    }
}

fn error_message(error: &Value) -> Option<String> {
    match error {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) if message.is_empty() => None,
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

// Success payloads, one per endpoint family.

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct BodyUpdated {
    pub new_body_html: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RawUpdated {
    pub new_post_summary: String,
    #[serde(default)]
    pub major_change: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct PostCreated {
    pub new_post_id: String,
    #[serde(default)]
    pub new_post_summary: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct PostBody {
    pub body_html: String,
}

/// Replies that carry nothing besides a possible error.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Ack {}

/// Successful outcome of a content update, one variant per kind of update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    BodyUpdated {
        new_body_html: String,
    },
    RawUpdated {
        new_post_summary: String,
        major_change: bool,
    },
    ChildCreated {
        new_post_id: PostId,
        new_post_summary: String,
    },
    RootCreated {
        new_post_id: PostId,
    },
}

impl From<BodyUpdated> for UpdateOutcome {
    fn from(reply: BodyUpdated) -> Self {
        UpdateOutcome::BodyUpdated {
            new_body_html: reply.new_body_html,
        }
    }
}

impl From<RawUpdated> for UpdateOutcome {
    fn from(reply: RawUpdated) -> Self {
        UpdateOutcome::RawUpdated {
            new_post_summary: reply.new_post_summary,
            major_change: reply.major_change,
        }
    }
}

impl PostCreated {
    pub fn post_id(&self) -> Result<PostId, PostIdError> {
        PostId::parse(&self.new_post_id)
    }
}
