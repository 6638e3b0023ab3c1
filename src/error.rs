use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error type handed back by action handlers.
pub type ActionError = Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A recursive mapping kept expanding past `maxmapdepth`.
    #[error("E223: recursive mapping (depth {depth})")]
    MappingRecursion { depth: usize },

    #[error("invalid command: {0}")]
    CommandBuild(String),

    /// A motion or text object produced no usable offset.
    #[error("motion failed")]
    MotionFailed,

    #[error("recursive macro playback (depth {depth})")]
    MacroRecursion { depth: usize },

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("buffer is read-only")]
    ReadOnly,

    #[error("E354: invalid register name: '{0}'")]
    InvalidRegister(char),

    #[error("E353: nothing in register {0}")]
    EmptyRegister(char),

    #[error("E774: 'operatorfunc' is empty")]
    NoOperatorFunction,

    #[error("bad key notation: {0}")]
    KeyNotation(String),

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("config: {0}")]
    Config(String),
}

impl Error {
    pub fn build(msg: impl Into<String>) -> Self {
        Error::CommandBuild(msg.into())
    }

    /// Errors after which the session only cancels the pending command,
    /// as opposed to forcing the whole mode stack back to normal.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Error::MotionFailed
                | Error::CommandBuild(_)
                | Error::MappingRecursion { .. }
                | Error::InvalidRegister(_)
                | Error::EmptyRegister(_)
                | Error::ReadOnly
        )
    }
}
