// src/drivers/mod.rs
pub mod capture;
pub mod error;
pub mod fft;
pub mod layout;
pub mod pipeline;
pub mod plot;

pub use capture::{
    DialogSelector, FileSelector, FixedSelector, NormalizedSignal, CAPTURE_EXTENSION,
};
pub use error::PlotterError;
pub use fft::SpectralView;
pub use pipeline::{FigureViewer, PlotPipeline, RunOutcome};
pub use plot::{image_path_for, Figure, Panel};
