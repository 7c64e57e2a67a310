//! Universe providers: a ticker list file, or a fixed list from config.

use crate::domain::error::ScreenerError;
use crate::ports::universe_port::UniversePort;
use std::fs;
use std::path::PathBuf;

/// Reads symbols from a text file. Symbols are separated by commas or
/// whitespace; `#` starts a comment.
pub struct FileUniverseAdapter {
    path: PathBuf,
}

impl FileUniverseAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl UniversePort for FileUniverseAdapter {
    fn list_tickers(&self) -> Result<Vec<String>, ScreenerError> {
        let content = fs::read_to_string(&self.path).map_err(|e| ScreenerError::DataSource {
            reason: format!("failed to read universe {}: {}", self.path.display(), e),
        })?;
        Ok(content
            .lines()
            .map(|line| line.split('#').next().unwrap_or(""))
            .flat_map(|line| line.split(|c: char| c == ',' || c.is_whitespace()))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }
}

pub struct StaticUniverse {
    tickers: Vec<String>,
}

impl StaticUniverse {
    pub fn new(tickers: Vec<String>) -> Self {
        Self { tickers }
    }
}

impl UniversePort for StaticUniverse {
    fn list_tickers(&self) -> Result<Vec<String>, ScreenerError> {
        Ok(self.tickers.clone())
    }
}
