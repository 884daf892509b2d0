//! minigpt proxy server
//!
//! Forwards `POST /api/chat` to the configured upstream
//! `/v1/chat/completions`, attaching the server-held bearer token, and relays
//! the answer back either as a JSON body or as a normalized event stream.

pub mod error;
pub mod handlers;
pub mod relay;
pub mod server;
pub mod state;

pub use error::ProxyError;
pub use relay::{relay_events, LineRelay};
pub use server::{create_router, run_server};
pub use state::AppState;
