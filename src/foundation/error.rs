use crate::foundation::core::Tick;

/// Crate-wide result alias.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error type for replay indexing, rendering and export.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Timeline construction or lookup failed.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Map/transform configuration is missing or invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A single frame could not be rendered.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Caller-supplied values were rejected.
    #[error("validation error: {0}")]
    Validation(String),

    /// Output sink or encoder failure.
    #[error("encode error: {0}")]
    Encode(String),

    /// Input could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Any other error, with context.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`ReelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

/// Errors raised while building or querying a `TimelineIndex`.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    /// Tick deltas do not settle on a supported sampling rate.
    #[error(
        "ambiguous tick rate (median delta {median_secs:.6}s, {consistent:.3} of deltas on period)"
    )]
    AmbiguousRate {
        /// Median delta between consecutive tick timestamps, in seconds.
        median_secs: f64,
        /// Fraction of deltas within tolerance of the matched period (0 when none matched).
        consistent: f64,
    },
    /// The tick lies outside every round (warmup, intermission, post-match).
    #[error("no round contains {0}")]
    NoRound(Tick),
    /// The timeline has fewer ticks than required.
    #[error("timeline needs at least {min} ticks, got {got}")]
    Empty {
        /// Minimum required tick count.
        min: usize,
        /// Ticks actually supplied.
        got: usize,
    },
    /// Tick numbers skip or repeat.
    #[error("tick sequence is not contiguous at position {position}: expected {expected}, got {got}")]
    NonContiguous {
        /// Position in the input stream.
        position: usize,
        /// Tick number implied by the first tick.
        expected: Tick,
        /// Tick number found.
        got: Tick,
    },
    /// Timestamps do not strictly increase.
    #[error("tick timestamps must strictly increase ({0})")]
    OutOfOrder(Tick),
    /// Round markers overlap, are unordered, or are empty.
    #[error("invalid rounds: {0}")]
    InvalidRounds(String),
}

/// Configuration errors; fatal at load time.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// No coordinate transform is registered for the map.
    #[error("unknown map '{0}'")]
    UnknownMap(String),
    /// A map profile has unusable calibration values.
    #[error("invalid map profile '{map}': {reason}")]
    InvalidProfile {
        /// Map name.
        map: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A config file could not be read or parsed.
    #[error("failed to load '{path}': {reason}")]
    Load {
        /// File path.
        path: String,
        /// Underlying failure.
        reason: String,
    },
}

/// Failure to render one frame. Recovered locally by playback and export.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Canvas dimensions are zero or exceed the rasterizer limit.
    #[error("invalid canvas {width}x{height}")]
    InvalidCanvas {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// A projected coordinate was NaN or infinite.
    #[error("non-finite coordinate while drawing {what} at {tick}")]
    NonFinite {
        /// Element being drawn.
        what: &'static str,
        /// Tick of the frame.
        tick: Tick,
    },
    /// The radar backdrop could not be loaded or placed.
    #[error("backdrop error: {0}")]
    Backdrop(String),
    /// Failure reported by a caller-supplied backend.
    #[error("backend failure at {tick}: {reason}")]
    Backend {
        /// Tick of the frame.
        tick: Tick,
        /// Backend-provided reason.
        reason: String,
    },
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
