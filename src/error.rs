//! Errors found throughout this crate

use thiserror::Error;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};

/// Errors that occur from interacting with the X-Server
#[derive(Debug, Error)]
pub enum Error {
    /// Failure to connect to the server
    #[error("failed to connect to the X11 server: {0}")]
    Connect(#[from] ConnectError),

    /// Another window manager already holds substructure redirection on the
    /// root window. Only one manager may own a display at a time, so this is
    /// fatal and not retriable.
    #[error("another window manager is already running")]
    AlreadyManaged,

    /// A requested key combination could not be grabbed
    #[error("failed to grab key combination (mask {mask:#06x}, keycode {keycode})")]
    GrabFailed {
        /// Modifier mask of the failed grab
        mask:    u16,
        /// Physical key of the failed grab
        keycode: u8,
    },

    /// A grab was requested for a keysym the keyboard mapping does not carry
    #[error("keysym {0:#x} is not bound to any keycode")]
    UnmappedKeysym(u32),

    /// A request was rejected by the server
    #[error("X11 request failed: {0}")]
    Protocol(#[from] ReplyError),

    /// The connection to the server broke down
    #[error("connection to the X11 server failed: {0}")]
    Connection(#[from] ConnectionError),
}
