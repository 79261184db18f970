use log::{debug, error};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::edit_session::EditMode;
use crate::post_id::{PostId, PostIdError};
use crate::query_result::{
    Ack, BodyUpdated, PostBody, PostCreated, RawUpdated, ServerResult, UpdateOutcome,
};
use crate::wire::{ContentUpdate, Endpoint, Request};

pub type ResponseCallback = Box<dyn FnOnce(Result<String, TransportError>)>;

/// Carries one request to the server and hands the reply body to the
/// callback. The callback fires exactly once, there is no cancellation and
/// no timeout.
pub trait Transport {
    fn send(&self, request: Request, on_response: ResponseCallback);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request to {url} failed")]
    Network { url: String },
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl TransportError {
    /// Classifies a finished request. Status 0 means the request never got
    /// an answer (network error or abort).
    pub fn check_status(url: &str, status: u16, body: Option<String>) -> Result<String, Self> {
        match status {
            0 => Err(TransportError::Network { url: url.to_owned() }),
            200..=299 => Ok(body.unwrap_or_default()),
            _ => Err(TransportError::Status {
                url: url.to_owned(),
                status,
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("could not encode request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("could not parse reply: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("bad post id in reply: {0}")]
    PostId(#[from] PostIdError),
}

pub type SyncResult<T> = Result<ServerResult<T>, SyncError>;

/// Issues the editor's requests and turns replies into typed results.
pub struct SyncClient<T> {
    transport: T,
    config: ClientConfig,
}

impl<T: Transport> SyncClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        SyncClient { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn send(&self, mut request: Request, on_response: ResponseCallback) {
        debug!("{} {}", request.method.as_str(), request.path);
        request.path = self.config.url(&request.path);
        self.transport.send(request, on_response);
    }

    fn query<R, F>(&self, request: Result<Request, serde_json::Error>, on_result: F)
    where
        R: DeserializeOwned + 'static,
        F: FnOnce(SyncResult<R>) + 'static,
    {
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                error!("could not encode request: {}", err);
                return on_result(Err(SyncError::Encode(err)));
            }
        };

        self.send(
            request,
            Box::new(move |response| {
                let result = response.map_err(SyncError::from).and_then(|body| {
                    ServerResult::from_json(&body).map_err(SyncError::Decode)
                });
                on_result(result);
            }),
        );
    }

    /// Current body or full raw text of a post, as plain text.
    pub fn fetch_raw_content<F>(&self, post: &PostId, mode: EditMode, on_text: F)
    where
        F: FnOnce(Result<String, SyncError>) + 'static,
    {
        let request = Request::get(Endpoint::raw_content(post, mode).path());
        self.send(
            request,
            Box::new(move |response| on_text(response.map_err(SyncError::from))),
        );
    }

    pub fn update_content<F>(&self, update: ContentUpdate, text: &str, on_result: F)
    where
        F: FnOnce(SyncResult<UpdateOutcome>) + 'static,
    {
        let request = update.request(text);

        match update {
            ContentUpdate::UpdateBody(_) => {
                self.query(request, move |result: SyncResult<BodyUpdated>| {
                    on_result(result.map(|reply| reply.map(UpdateOutcome::from)))
                })
            }
            ContentUpdate::UpdateRaw(_) => {
                self.query(request, move |result: SyncResult<RawUpdated>| {
                    on_result(result.map(|reply| reply.map(UpdateOutcome::from)))
                })
            }
            ContentUpdate::CreateChild(_) => {
                self.query(request, move |result: SyncResult<PostCreated>| {
                    on_result(result.and_then(|reply| created(reply, false)))
                })
            }
            ContentUpdate::CreateRoot(_) => {
                self.query(request, move |result: SyncResult<PostCreated>| {
                    on_result(result.and_then(|reply| created(reply, true)))
                })
            }
        }
    }

    /// Rendered body html, used to restore the view after a cancelled edit.
    pub fn fetch_body<F>(&self, post: &PostId, on_result: F)
    where
        F: FnOnce(SyncResult<String>) + 'static,
    {
        let request = Request::post(&Endpoint::GetPostBody.path()).arg("post_id", &post.to_wire());
        self.query(request, move |result: SyncResult<PostBody>| {
            on_result(result.map(|reply| reply.map(|body| body.body_html)))
        });
    }

    /// The server promotes the children of the deleted post to thread roots.
    pub fn delete_post<F>(&self, post: &PostId, on_result: F)
    where
        F: FnOnce(SyncResult<()>) + 'static,
    {
        let request = Request::post(&Endpoint::DeletePost.path()).arg("post_id", &post.to_wire());
        self.query(request, acknowledged(on_result));
    }

    /// Writes every heap held in server memory to disk.
    pub fn persist_all<F>(&self, on_result: F)
    where
        F: FnOnce(SyncResult<()>) + 'static,
    {
        self.query(Ok(Request::post(&Endpoint::Save.path())), acknowledged(on_result));
    }

    pub fn set_thread_reviewed<F>(&self, root: &PostId, on_result: F)
    where
        F: FnOnce(SyncResult<()>) + 'static,
    {
        let request =
            Request::post(&Endpoint::SetPostReviewed.path()).arg("post_id", &root.to_wire());
        self.query(request, acknowledged(on_result));
    }
}

fn acknowledged<F>(on_result: F) -> impl FnOnce(SyncResult<Ack>)
where
    F: FnOnce(SyncResult<()>),
{
    move |result| on_result(result.map(|reply| reply.map(|_| ())))
}

fn created(reply: ServerResult<PostCreated>, root: bool) -> SyncResult<UpdateOutcome> {
    let created = match reply {
        ServerResult::Error(message) => return Ok(ServerResult::Error(message)),
        ServerResult::Success(created) => created,
    };

    let new_post_id = created.post_id()?;
    Ok(ServerResult::Success(if root {
        UpdateOutcome::RootCreated { new_post_id }
    } else {
        UpdateOutcome::ChildCreated {
            new_post_id,
            new_post_summary: created.new_post_summary,
        }
    }))
}
