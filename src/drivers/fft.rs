use rustfft::{num_complex::Complex64, FftPlanner};

use crate::drivers::{NormalizedSignal, PlotterError};

/// Added to every magnitude before the log so empty bins stay finite.
pub const MAGNITUDE_FLOOR: f64 = 1e-12;
/// Space left above the highest peak on the dB axis.
pub const DB_HEADROOM: f64 = 10.0;

/// Non-negative half of the spectrum, in dB.
#[derive(Clone, Debug)]
pub struct SpectralView {
    pub frequencies_hz: Vec<f64>,
    pub magnitudes_db: Vec<f64>,
}

impl SpectralView {
    /// Frequency and level of the strongest bin.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.frequencies_hz
            .iter()
            .copied()
            .zip(self.magnitudes_db.iter().copied())
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// X axis range: the requested window when `0 < min < max`, else every positive bin.
    /// A single positive bin is widened by a decade on each side.
    pub fn frequency_range(&self, requested: (f64, f64)) -> Result<(f64, f64), PlotterError> {
        let (min_hz, max_hz) = requested;
        if 0.0 < min_hz && min_hz < max_hz {
            return Ok((min_hz, max_hz));
        }
        let lowest = self
            .frequencies_hz
            .iter()
            .copied()
            .filter(|f| *f > 0.0)
            .fold(f64::INFINITY, f64::min);
        let highest = self
            .frequencies_hz
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if !lowest.is_finite() {
            return Err(PlotterError::NoPositiveFrequency);
        }
        if highest <= lowest {
            return Ok((lowest / 10.0, lowest * 10.0));
        }
        Ok((lowest, highest))
    }

    /// Y axis range: data minimum up to the maximum plus headroom.
    pub fn level_range(&self) -> (f64, f64) {
        let (lo, hi) = self
            .magnitudes_db
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        (lo, hi + DB_HEADROOM)
    }
}

/// Computes the magnitude spectrum of a whole signal.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f64>,
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    pub fn compute(&mut self, signal: &NormalizedSignal) -> Result<SpectralView, PlotterError> {
        let n = signal.len();
        if n < 2 {
            return Err(PlotterError::NotEnoughSamples(n));
        }
        if !(signal.sample_rate_hz.is_finite() && signal.sample_rate_hz > 0.0) {
            return Err(PlotterError::InvalidSampleRate(signal.sample_rate_hz));
        }
        let fft = self.planner.plan_fft_forward(n);
        let mut buffer: Vec<Complex64> = signal
            .samples
            .iter()
            .map(|v| Complex64::new(*v, 0.0))
            .collect();
        fft.process(&mut buffer);

        let half = n / 2;
        // k / (N * T), with 1 / T folded in as the rate
        let bin_width = signal.sample_rate_hz / n as f64;
        let frequencies_hz = (0..=half).map(|k| k as f64 * bin_width).collect();
        let magnitudes_db = buffer
            .iter()
            .take(half + 1)
            .map(|c| 20.0 * (c.norm() + MAGNITUDE_FLOOR).log10())
            .collect();
        Ok(SpectralView {
            frequencies_hz,
            magnitudes_db,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::error::ErrorKind;
    use std::f64::consts::PI;

    fn signal(samples: Vec<f64>, sample_rate_hz: f64) -> NormalizedSignal {
        NormalizedSignal {
            source: None,
            sample_rate_hz,
            amplitude_range: 1.0,
            samples,
        }
    }

    fn sine(freq_hz: f64, sample_rate_hz: f64, n: usize) -> NormalizedSignal {
        let samples = (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / sample_rate_hz).sin())
            .collect();
        signal(samples, sample_rate_hz)
    }

    #[test]
    fn sine_peak_lands_within_one_bin() {
        let mut analyzer = SpectrumAnalyzer::new();
        for (freq, rate, n) in [
            (1_000.0, 48_000.0, 4096),
            (12_345.0, 100_000.0, 8192),
            (3.3e6, 100e6, 1 << 14),
        ] {
            let view = analyzer.compute(&sine(freq, rate, n)).unwrap();
            assert_eq!(view.frequencies_hz.len(), n / 2 + 1);
            let (peak_hz, _) = view.peak().unwrap();
            assert!((peak_hz - freq).abs() <= rate / n as f64, "{peak_hz} vs {freq}");
        }
    }

    #[test]
    fn bins_follow_sample_period() {
        let view = SpectrumAnalyzer::new()
            .compute(&signal(vec![0.0; 8], 800.0))
            .unwrap();
        assert_eq!(view.frequencies_hz, vec![0.0, 100.0, 200.0, 300.0, 400.0]);
        // all-zero input bottoms out at the floor instead of -inf
        assert!(view
            .magnitudes_db
            .iter()
            .all(|db| (db - 20.0 * MAGNITUDE_FLOOR.log10()).abs() < 1e-9));
    }

    #[test]
    fn level_range_has_headroom() {
        let view = SpectrumAnalyzer::new()
            .compute(&sine(50.0, 1_000.0, 256))
            .unwrap();
        let (lo, hi) = view.level_range();
        let data_max = view.magnitudes_db.iter().copied().fold(f64::MIN, f64::max);
        let data_min = view.magnitudes_db.iter().copied().fold(f64::MAX, f64::min);
        assert!(hi >= data_max + DB_HEADROOM);
        assert!(lo <= data_min);
    }

    #[test]
    fn frequency_range_uses_valid_window_only() {
        let view = SpectrumAnalyzer::new()
            .compute(&signal(vec![0.5, -0.5, 0.25, 0.0], 1_000.0))
            .unwrap();
        assert_eq!(view.frequency_range((10.0, 400.0)).unwrap(), (10.0, 400.0));
        // min > max, zero and negative minimums all fall back to the data range
        for requested in [(100.0, 50.0), (0.0, 400.0), (-5.0, 400.0)] {
            assert_eq!(view.frequency_range(requested).unwrap(), (250.0, 500.0));
        }
    }

    #[test]
    fn single_positive_bin_gets_a_decade_each_side() {
        let mut analyzer = SpectrumAnalyzer::new();
        for n in [2, 3] {
            let view = analyzer
                .compute(&signal(vec![0.4; n], 1_200_000.0))
                .unwrap();
            let bin = 1_200_000.0 / n as f64;
            let (lo, hi) = view.frequency_range((100.0, 50.0)).unwrap();
            assert!((lo - bin / 10.0).abs() < 1e-6, "{lo}");
            assert!((hi - bin * 10.0).abs() < 1e-6, "{hi}");
            assert!(hi > lo);
        }
    }

    #[test]
    fn degenerate_signals_are_rejected() {
        let mut analyzer = SpectrumAnalyzer::new();
        for samples in [vec![], vec![0.3]] {
            let err = analyzer.compute(&signal(samples, 1_000.0)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Compute);
        }
        let err = analyzer.compute(&signal(vec![0.0; 4], 0.0)).unwrap_err();
        assert!(matches!(err, PlotterError::InvalidSampleRate(_)));
    }
}
