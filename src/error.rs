use std::io;
use thiserror::Error;

/// Errors raised inside the wrapper. None of these ever reach the application.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport failure: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed message: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Unknown context {0:#x}")]
    UnknownContext(u64),
    #[error("Unknown object {kind} {name} in context {context:#x}")]
    UnknownObject {
        context: u64,
        kind: String,
        name: u32,
    },
    #[error("Debugger disconnected")]
    Disconnected,
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Debugger requested termination")]
    Terminate,
}

pub type Result<T> = std::result::Result<T, Error>;
