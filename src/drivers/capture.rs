use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::DisplayConfig;
use crate::drivers::PlotterError;

/// Extension of raw capture files.
pub const CAPTURE_EXTENSION: &str = "bin";
const BYTES_PER_SAMPLE: usize = 2;

/// Something that can pick a capture file when none was given up front.
pub trait FileSelector {
    /// `None` means the user cancelled.
    fn select_capture(&mut self) -> Option<PathBuf>;
}

/// Native open-file dialog filtered on capture files.
#[derive(Default)]
pub struct DialogSelector;

impl FileSelector for DialogSelector {
    fn select_capture(&mut self) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .set_title("Select the binary file")
            .add_filter("Binary files", &[CAPTURE_EXTENSION])
            .pick_file()
    }
}

/// Preset answer, useful for tests and scripted runs.
pub struct FixedSelector {
    answer: Option<PathBuf>,
}

impl FixedSelector {
    pub fn new(answer: Option<PathBuf>) -> Self {
        Self { answer }
    }
}

impl FileSelector for FixedSelector {
    fn select_capture(&mut self) -> Option<PathBuf> {
        self.answer.clone()
    }
}

/// Samples scaled to [-1, 1], times the amplitude-range factor.
#[derive(Clone, Debug)]
pub struct NormalizedSignal {
    pub source: Option<PathBuf>,
    pub sample_rate_hz: f64,
    pub amplitude_range: f64,
    pub samples: Vec<f64>,
}

impl NormalizedSignal {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True when samples are still in normalized units.
    pub fn is_unscaled(&self) -> bool {
        self.amplitude_range == 1.0
    }

    pub fn sample_period(&self) -> f64 {
        1.0 / self.sample_rate_hz
    }

    pub fn duration_ms(&self) -> f64 {
        self.samples.len() as f64 * self.sample_period() * 1000.0
    }
}

/// Maps the full i16 range onto [-1, 1]: -32768 lands on -1 exactly.
pub fn normalize_sample(value: i16) -> f64 {
    (f64::from(value) + 32768.0) / 32767.5 - 1.0
}

/// Decodes little-endian i16 samples; a trailing odd byte is ignored.
pub fn decode_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Reads and normalizes capture files according to the display configuration.
pub struct CaptureLoader {
    sample_limit: Option<usize>,
    sample_rate_hz: f64,
    amplitude_range: f64,
}

impl CaptureLoader {
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self {
            sample_limit: config.sample_limit(),
            sample_rate_hz: config.sample_rate_hz(),
            amplitude_range: config.amplitude_range,
        }
    }

    /// Uses `path` when given, otherwise asks `selector`.
    pub fn resolve_path(
        &self,
        path: Option<&Path>,
        selector: &mut dyn FileSelector,
    ) -> Result<PathBuf, PlotterError> {
        match path {
            Some(path) => Ok(path.to_path_buf()),
            None => selector
                .select_capture()
                .filter(|p| !p.as_os_str().is_empty())
                .ok_or(PlotterError::NoFileSelected),
        }
    }

    pub fn read_raw(&self, path: &Path) -> Result<Vec<i16>, PlotterError> {
        let load_err = |source| PlotterError::Load {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(load_err)?;
        let available = file.metadata().map_err(load_err)?.len() as usize / BYTES_PER_SAMPLE;
        let count = match self.sample_limit {
            Some(limit) => available.min(limit),
            None => available,
        };
        let mut bytes = Vec::with_capacity(count * BYTES_PER_SAMPLE);
        BufReader::new(file)
            .take((count * BYTES_PER_SAMPLE) as u64)
            .read_to_end(&mut bytes)
            .map_err(load_err)?;
        Ok(decode_samples(&bytes))
    }

    pub fn load(&self, path: &Path) -> Result<NormalizedSignal, PlotterError> {
        let raw = self.read_raw(path)?;
        let mut samples: Vec<f64> = raw.into_iter().map(normalize_sample).collect();
        if self.amplitude_range != 1.0 {
            for sample in &mut samples {
                *sample *= self.amplitude_range;
            }
        }
        debug!("read {} samples from {}", samples.len(), path.display());
        Ok(NormalizedSignal {
            source: Some(path.to_path_buf()),
            sample_rate_hz: self.sample_rate_hz,
            amplitude_range: self.amplitude_range,
            samples,
        })
    }
}
