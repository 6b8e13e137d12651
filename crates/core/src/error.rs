use std::fmt;

/// Result alias that carries the custom [`PlayerError`] type.
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Common error type for the core crate.
///
/// Geometry and animation code never produces these; only loading, config
/// and control paths do.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// The chart is malformed: non-finite times, empty slider paths, objects
    /// ending before they start.
    #[error("invalid chart: {0}")]
    InvalidChart(String),
    /// The chart uses a game mode or object variant this engine cannot play.
    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),
    /// The audio backend could not decode the supplied track.
    #[error("audio decode failure: {0}")]
    AudioDecodeFailure(String),
    /// The operation needs a loaded chart.
    #[error("player not ready: {0}")]
    NotReady(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Config file could not be parsed.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

impl PlayerError {
    pub fn invalid_chart<T: Into<String>>(msg: T) -> Self {
        Self::InvalidChart(msg.into())
    }

    pub fn unsupported<T: Into<String>>(msg: T) -> Self {
        Self::UnsupportedVariant(msg.into())
    }

    /// Stable code reported through the `error` notification.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidChart(_) => ErrorCode::InvalidChart,
            Self::UnsupportedVariant(_) => ErrorCode::UnsupportedVariant,
            Self::AudioDecodeFailure(_) => ErrorCode::AudioDecodeFailure,
            Self::NotReady(_) => ErrorCode::NotReady,
            Self::Io(_) | Self::Config(_) => ErrorCode::Io,
        }
    }
}

/// Machine readable error code carried by [`crate::ErrorEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidChart,
    UnsupportedVariant,
    AudioDecodeFailure,
    NotReady,
    Io,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidChart => "invalid_chart",
            Self::UnsupportedVariant => "unsupported_variant",
            Self::AudioDecodeFailure => "audio_decode_failure",
            Self::NotReady => "not_ready",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_variants() {
        assert_eq!(
            PlayerError::invalid_chart("x").code(),
            ErrorCode::InvalidChart
        );
        assert_eq!(
            PlayerError::AudioDecodeFailure("bad header".into()).code(),
            ErrorCode::AudioDecodeFailure
        );
        assert_eq!(PlayerError::NotReady("seek").code().as_str(), "not_ready");
    }

    #[test]
    fn messages_include_reason() {
        let err = PlayerError::unsupported("mode Mania");
        assert_eq!(err.to_string(), "unsupported variant: mode Mania");
    }
}
