use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used by the batch driver when reporting failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Load,
    Compute,
    Export,
}

#[derive(Debug, Error)]
pub enum PlotterError {
    #[error("configuration file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("error loading configuration data from {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("no file selected")]
    NoFileSelected,
    #[error("error reading the file {path}: {source}")]
    Load {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("signal needs at least 2 samples, got {0}")]
    NotEnoughSamples(usize),
    #[error("sample rate must be a positive finite number, got {0}")]
    InvalidSampleRate(f64),
    #[error("spectrum has no positive frequency bin")]
    NoPositiveFrequency,
    #[error("no output path: source file unknown and no destination given")]
    NoExportPath,
    #[error("failed to render plot: {0}")]
    Render(String),
    #[error("failed to export {path}: {reason}")]
    Export { path: PathBuf, reason: String },
}

impl PlotterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlotterError::ConfigIo { .. }
            | PlotterError::ConfigParse { .. }
            | PlotterError::InvalidConfig(_) => ErrorKind::Config,
            PlotterError::NoFileSelected | PlotterError::Load { .. } => ErrorKind::Load,
            PlotterError::NotEnoughSamples(_)
            | PlotterError::InvalidSampleRate(_)
            | PlotterError::NoPositiveFrequency => ErrorKind::Compute,
            PlotterError::NoExportPath
            | PlotterError::Render(_)
            | PlotterError::Export { .. } => ErrorKind::Export,
        }
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for PlotterError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        PlotterError::Render(format!("{value:?}"))
    }
}

impl From<image::ImageError> for PlotterError {
    fn from(value: image::ImageError) -> Self {
        PlotterError::Render(value.to_string())
    }
}
