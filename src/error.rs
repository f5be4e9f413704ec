/// Result alias that carries the crate's [`TonegridError`].
pub type Result<T> = std::result::Result<T, TonegridError>;

#[derive(Debug, thiserror::Error)]
pub enum TonegridError {
    /// Bad numeric input to synthesis, tuning or tempo.
    #[error("invalid parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("unknown pattern: {0}")]
    UnknownPattern(String),

    /// The output device could not be opened or has gone away.
    #[error("audio sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("sequencer is already running")]
    AlreadyRunning,

    #[error("layer limit reached (max {max})")]
    LayerLimit { max: usize },

    #[error("cannot remove the last remaining layer")]
    LastLayer,

    #[error("no layer at index {0}")]
    LayerIndex(usize),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

impl TonegridError {
    pub(crate) fn invalid(name: &'static str, value: impl Into<f64>) -> Self {
        Self::InvalidParameter {
            name,
            value: value.into(),
        }
    }
}
