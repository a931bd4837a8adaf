// Reader options, loadable from JSON

use crate::core::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// How strictly record framing is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    /// Leading and trailing length markers must be present and equal.
    #[default]
    Strict,
    /// Trailing markers are not compared and may be missing at end of file.
    Relaxed,
}

/// Whether a file keeps its descriptor open between payload loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
    #[default]
    KeepOpen,
    CloseBetweenAccesses,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    pub framing: FramingMode,
    pub stream_mode: StreamMode,
    /// Follow the RESTART reference of a summary case and prepend its base run.
    pub include_restart: bool,
    /// Defer payload reads of restart steps until they are requested.
    pub lazy_load: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            framing: FramingMode::Strict,
            stream_mode: StreamMode::KeepOpen,
            include_restart: true,
            lazy_load: true,
        }
    }
}

impl ReaderOptions {
    pub fn from_json_str(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref())?;
        let options = Self::from_json_str(&data)?;
        info!("reader options loaded from {}", path.as_ref().display());
        Ok(options)
    }

    pub fn relaxed(mut self) -> Self {
        self.framing = FramingMode::Relaxed;
        self
    }

    pub fn close_between_accesses(mut self) -> Self {
        self.stream_mode = StreamMode::CloseBetweenAccesses;
        self
    }

    pub fn without_restart(mut self) -> Self {
        self.include_restart = false;
        self
    }

    pub fn eager(mut self) -> Self {
        self.lazy_load = false;
        self
    }
}
