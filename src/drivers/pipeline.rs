use std::path::{Path, PathBuf};

use log::info;

use crate::config::DisplayConfig;
use crate::drivers::capture::{CaptureLoader, FileSelector};
use crate::drivers::error::PlotterError;
use crate::drivers::fft::SpectrumAnalyzer;
use crate::drivers::plot::{format_hz, Figure};

/// Something that can put a figure on screen. Blocks until the user is done with it.
pub trait FigureViewer {
    fn show(&mut self, figure: &Figure, hide_toolbar: bool) -> Result<(), PlotterError>;
}

impl<V: FigureViewer + ?Sized> FigureViewer for &mut V {
    fn show(&mut self, figure: &Figure, hide_toolbar: bool) -> Result<(), PlotterError> {
        (**self).show(figure, hide_toolbar)
    }
}

/// What a single run produced.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub source: PathBuf,
    pub samples: usize,
    /// Frequency and level of the strongest bin, when the spectrum was computed.
    pub peak: Option<(f64, f64)>,
    pub exported: Option<PathBuf>,
}

/// Load → analyze → render → show → export, one capture at a time.
pub struct PlotPipeline<'a, S: FileSelector, V: FigureViewer> {
    config: &'a DisplayConfig,
    loader: CaptureLoader,
    analyzer: SpectrumAnalyzer,
    selector: S,
    viewer: V,
}

impl<'a, S: FileSelector, V: FigureViewer> PlotPipeline<'a, S, V> {
    pub fn new(config: &'a DisplayConfig, selector: S, viewer: V) -> Self {
        Self {
            config,
            loader: CaptureLoader::from_config(config),
            analyzer: SpectrumAnalyzer::new(),
            selector,
            viewer,
        }
    }

    /// Runs the whole chain for `input`, or for whatever the selector picks when `None`.
    pub fn run_one(&mut self, input: Option<&Path>) -> Result<RunOutcome, PlotterError> {
        let path = self.loader.resolve_path(input, &mut self.selector)?;
        let signal = self.loader.load(&path)?;
        let spectrum = if self.config.show_fft {
            Some(self.analyzer.compute(&signal)?)
        } else {
            None
        };
        let peak = spectrum.as_ref().and_then(|s| s.peak());
        if let Some((hz, db)) = peak {
            info!(
                "{}: {} samples, peak {} at {db:.1} dB",
                path.display(),
                signal.len(),
                format_hz(hz)
            );
        }

        let mut outcome = RunOutcome {
            source: path,
            samples: signal.len(),
            peak,
            exported: None,
        };
        let Some(figure) = Figure::build(&signal, spectrum.as_ref(), self.config)? else {
            return Ok(outcome);
        };
        if self.config.show_figure {
            self.viewer.show(&figure, self.config.hide_toolbar)?;
        }
        if self.config.export_png {
            outcome.exported = Some(figure.export_png(None)?);
        }
        Ok(outcome)
    }
}
