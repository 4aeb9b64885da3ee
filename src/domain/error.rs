//! Domain error types.

/// Top-level error type for wavetrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("data source error: {reason}")]
    Data { reason: String },

    #[error("http error: {reason}")]
    Http { reason: String },

    #[error("stream error: {reason}")]
    Stream { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown strategy '{name}'")]
    UnknownStrategy { name: String },

    #[error("invalid interval '{interval}'")]
    InvalidInterval { interval: String },

    #[error("no data for {symbol} ({interval})")]
    NoData { symbol: String, interval: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) | TraderError::Csv(_) | TraderError::Json(_) => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. }
            | TraderError::InvalidInterval { .. } => 2,
            TraderError::Data { .. } | TraderError::Http { .. } | TraderError::Stream { .. } => 3,
            TraderError::UnknownStrategy { .. } => 4,
            TraderError::NoData { .. } | TraderError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::ExitCode;

    #[test]
    fn display_insufficient_data() {
        let err = TraderError::InsufficientData {
            symbol: "BTCUSDT".into(),
            bars: 40,
            minimum: 200,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for BTCUSDT: have 40 bars, need 200"
        );
    }

    #[test]
    fn display_config_invalid() {
        let err = TraderError::invalid("risk", "atr_multiplier_sl", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid config value [risk] atr_multiplier_sl: must be positive"
        );
    }

    #[test]
    fn exit_codes_by_family() {
        let config = TraderError::ConfigMissing {
            section: "data".into(),
            key: "symbols".into(),
        };
        let data = TraderError::Http {
            reason: "timeout".into(),
        };
        let strategy = TraderError::UnknownStrategy {
            name: "martingale".into(),
        };
        let empty = TraderError::NoData {
            symbol: "ETHUSDT".into(),
            interval: "1h".into(),
        };
        let code = |e: &TraderError| format!("{:?}", ExitCode::from(e));
        assert_eq!(code(&config), format!("{:?}", ExitCode::from(2)));
        assert_eq!(code(&data), format!("{:?}", ExitCode::from(3)));
        assert_eq!(code(&strategy), format!("{:?}", ExitCode::from(4)));
        assert_eq!(code(&empty), format!("{:?}", ExitCode::from(5)));
    }
}
