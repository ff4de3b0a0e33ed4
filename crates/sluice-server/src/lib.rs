//! Development server with live reload for sluice.
//!
//! Serves a build target over HTTP, pushes reload messages over a WebSocket
//! when pipelines write new output, and watches the source tree to re-run
//! bound task chains.

pub mod server;
pub mod watcher;
pub mod websocket;

pub use server::{
    inject_script, BoundServer, DevServer, DevServerConfig, ServerError, RELOAD_SCRIPT_PATH,
    RELOAD_WS_PATH,
};
pub use watcher::{TriggerFn, WatchError, Watcher, WatcherHandle};
pub use websocket::{reload_client_script, ReloadHub, ReloadMessage};
