use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the UCI engine process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine `{path}`: {source}")]
    Spawn {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("engine initialization failed: {0}")]
    Init(String),

    #[error("engine command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    #[error("engine i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("engine process closed its output")]
    Exited,

    #[error("engine played an illegal move `{0}`")]
    IllegalMove(String),
}

impl EngineError {
    pub fn command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Command {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

/// Failures on the physical board connection.
#[derive(Debug, Error)]
pub enum BoardLinkError {
    #[error("board connection failed while sending `{command}`: {source}")]
    Write {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("board connection failed while reading: {0}")]
    Read(#[source] io::Error),

    #[error("cannot listen for the board on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
#[error("cannot save pgn file {path}: {source}")]
pub struct PersistenceError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("cannot run audio player `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("audio player exited with {0}")]
    Status(std::process::ExitStatus),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config has no engine path")]
    MissingEngine,
}

/// Errors that end the bridge. There is no way to resynchronise the board or
/// the engine once either is lost.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    BoardLink(#[from] BoardLinkError),
}
