// src/config.rs
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, error, LevelFilter};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::drivers::PlotterError;

/// Names accepted by the `log_level` key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
    NotSet,
}

impl LogLevel {
    /// `log` has no critical level; it folds into error. NOTSET lets everything through.
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Critical | LogLevel::Error => LevelFilter::Error,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::NotSet => LevelFilter::Trace,
        }
    }
}

/// Flat display/export options, stored as a JSON object.
///
/// Keys missing from the document take their default; keys this version does not
/// know about are kept in `extra` and written back untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub show_time: bool,
    pub show_fft: bool,
    pub hide_toolbar: bool,
    #[serde(rename = "sampling_rate_MSps")]
    pub sampling_rate_msps: f64,
    pub amplitude_range: f64,
    /// -1 reads the whole file.
    pub n_samples_to_read: i64,
    #[serde(rename = "fft_xlin_min_Hz")]
    pub fft_xlin_min_hz: f64,
    #[serde(rename = "fft_xlin_max_Hz")]
    pub fft_xlin_max_hz: f64,
    pub log_level: LogLevel,
    pub show_figure: bool,
    pub export_png: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_time: true,
            show_fft: true,
            hide_toolbar: false,
            sampling_rate_msps: 100.0,
            amplitude_range: 1.0,
            n_samples_to_read: 2_000_000,
            fft_xlin_min_hz: 1.0,
            fft_xlin_max_hz: 30_000_000.0,
            log_level: LogLevel::Info,
            show_figure: true,
            export_png: true,
            extra: Map::new(),
        }
    }
}

impl DisplayConfig {
    /// Reads the document at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, PlotterError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(PlotterError::ConfigIo {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config: Self =
            serde_json::from_str(&text).map_err(|source| PlotterError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), PlotterError> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)
            .map_err(|err| PlotterError::InvalidConfig(err.to_string()))?;
        fs::write(path, out).map_err(|source| PlotterError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("configuration data has been written to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), PlotterError> {
        if !(self.sampling_rate_msps.is_finite() && self.sampling_rate_msps > 0.0) {
            return Err(PlotterError::InvalidConfig(format!(
                "sampling_rate_MSps must be positive, got {}",
                self.sampling_rate_msps
            )));
        }
        if !self.amplitude_range.is_finite() {
            return Err(PlotterError::InvalidConfig(format!(
                "amplitude_range must be finite, got {}",
                self.amplitude_range
            )));
        }
        if self.n_samples_to_read < -1 {
            return Err(PlotterError::InvalidConfig(format!(
                "n_samples_to_read must be -1 or a count, got {}",
                self.n_samples_to_read
            )));
        }
        Ok(())
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sampling_rate_msps * 1_000_000.0
    }

    /// `None` means no cap on the number of samples read.
    pub fn sample_limit(&self) -> Option<usize> {
        usize::try_from(self.n_samples_to_read).ok()
    }

    pub fn frequency_window(&self) -> (f64, f64) {
        (self.fft_xlin_min_hz, self.fft_xlin_max_hz)
    }
}

/// Owns the process-wide configuration and writes it back exactly once.
///
/// `finish` is the normal exit; dropping an unfinished session saves as well so an
/// early `?` return still persists the document.
pub struct ConfigSession {
    path: PathBuf,
    config: DisplayConfig,
    saved: bool,
}

impl ConfigSession {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PlotterError> {
        let path = path.into();
        let config = DisplayConfig::load(&path)?;
        Ok(Self {
            path,
            config,
            saved: false,
        })
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn finish(mut self) -> Result<(), PlotterError> {
        self.saved = true;
        self.config.save(&self.path)
    }
}

impl Drop for ConfigSession {
    fn drop(&mut self) {
        if self.saved {
            return;
        }
        if let Err(err) = self.config.save(&self.path) {
            error!("{err}");
        }
    }
}
