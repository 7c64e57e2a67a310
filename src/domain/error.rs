//! Domain error types.
//!
//! Per-ticker data problems are not errors: screening turns them into skip
//! reasons. Only configuration, IO and collaborator failures surface here.

/// Top-level error type for contscreen.
#[derive(Debug, thiserror::Error)]
pub enum ScreenerError {
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

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error("insufficient data for {ticker}: have {bars} bars, need {minimum}")]
    InsufficientData {
        ticker: String,
        bars: usize,
        minimum: usize,
    },

    #[error("universe provider returned no usable tickers")]
    EmptyUniverse,

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScreenerError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        ScreenerError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&ScreenerError> for std::process::ExitCode {
    fn from(err: &ScreenerError) -> Self {
        let code: u8 = match err {
            ScreenerError::Io(_) | ScreenerError::Csv(_) => 1,
            ScreenerError::ConfigParse { .. }
            | ScreenerError::ConfigMissing { .. }
            | ScreenerError::ConfigInvalid { .. } => 2,
            ScreenerError::DataSource { .. } => 3,
            ScreenerError::NoData { .. }
            | ScreenerError::InsufficientData { .. }
            | ScreenerError::EmptyUniverse => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_message() {
        let err = ScreenerError::invalid("filters", "rsi_low", "must be below rsi_high");
        assert_eq!(
            err.to_string(),
            "invalid config value [filters] rsi_low: must be below rsi_high"
        );
    }

    #[test]
    fn insufficient_data_message() {
        let err = ScreenerError::InsufficientData {
            ticker: "AAPL".into(),
            bars: 12,
            minimum: 15,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for AAPL: have 12 bars, need 15"
        );
    }
}
