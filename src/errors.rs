use thiserror::Error;

pub type Result<T> = std::result::Result<T, TelloError>;

#[derive(Error, Debug)]
pub enum TelloError {
    #[error("drone replied {reply:?} to {command:?}")]
    CommandFailed { command: String, reply: String },

    #[error("timed out waiting for a reply to {command:?}")]
    Timeout { command: String },

    #[error("failed to parse {msg:?}")]
    ParseError { msg: String },

    #[error("{msg}")]
    Generic { msg: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}
