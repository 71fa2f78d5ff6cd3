//! Stream consumer side.
//!
//! ## Contents
//! - [`ReconnectingClient`] connect / stream / reconnect loop with a fixed delay
//! - [`ClientHandle`] current state, transition history and forced reconnect
//! - [`Connector`] / [`Connection`] transport seam, [`WsConnector`] for websockets
//! - [`ClientState`], [`ClientConfig`]
//!
//! ## Quick reference
//! ```text
//! Connector::connect ─► Connection::next_frame ─► decode_frame ─► ReportConsumer::on_report
//! ```

mod config;
mod connector;
mod reconnect;
mod state;

pub use config::{ClientConfig, DEFAULT_RECONNECT_DELAY};
pub use connector::{Connection, Connector, WsConnection, WsConnector};
pub use reconnect::{decode_frame, ClientHandle, ReconnectingClient};
pub use state::ClientState;
