// Post editing for heap thread pages: which posts are open in an editor and
// the requests that read and change them on the server.
extern crate console_error_panic_hook;
extern crate log;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate thiserror;

pub mod config;
pub mod connection;
pub mod controller;
pub mod dom_ids;
pub mod edit_session;
pub mod post_id;
pub mod query_result;
pub mod wire;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use config::ClientConfig;
pub use connection::{SyncClient, SyncError, Transport, TransportError};
pub use controller::{EditController, Ui};
pub use edit_session::{DraftId, EditMode, EditSession, SessionError};
pub use post_id::{post_id_to_wire_form, wire_form_to_post_id, HeapId, PostId, PostIdError};
pub use query_result::{ServerResult, UpdateOutcome};
pub use wire::{ContentUpdate, Endpoint, Request};
