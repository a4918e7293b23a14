use thiserror::Error;

/// Errors raised by the bot runtime itself.
///
/// User mistakes (bad command syntax, missing permissions) are never reported
/// through this type; they become reply messages instead.
#[derive(Debug, Error)]
pub enum BotError {
    /// An event name outside the fixed set was registered or dispatched.
    #[error("no such event: {0}")]
    UnknownEvent(String),

    /// A known event name was dispatched with a payload of another kind.
    #[error("event '{event}' dispatched with a '{payload}' payload")]
    EventMismatch { event: String, payload: String },

    /// A required configuration key was not supplied.
    #[error("{0} is not set in the environment")]
    MissingConfig(String),

    /// A configuration value was present but unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The chat transport failed to connect or deliver a message.
    #[error("transport error: {0}")]
    Transport(String),

    /// A handler failed while the dispatcher was running in fail-fast mode.
    #[error("handler for '{event}' at priority {priority} failed: {message}")]
    Handler {
        event: String,
        priority: i64,
        message: String,
    },

    /// Wrapper around IO errors (config files, console transport).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around TOML parse errors.
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type BotResult<T> = std::result::Result<T, BotError>;
