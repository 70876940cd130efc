use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::config::DisplayConfig;
use crate::drivers::layout::{self, PanelKind, Region, EXPORT_DPI};
use crate::drivers::{NormalizedSignal, PlotterError, SpectralView};

pub const IMAGE_EXTENSION: &str = "png";
pub const TRACE_COLOR: RGBColor = RGBColor(0x00, 0x00, 0x9A);
/// matplotlib's "lightgoldenrodyellow".
pub const PANEL_BACKGROUND: RGBColor = RGBColor(250, 250, 210);
const DEFAULT_TITLE: &str = "Bin plotter";
const TITLE_PT: f64 = 12.0;
const LABEL_PT: f64 = 10.0;
const TICK_PT: f64 = 8.0;

/// Image written next to a capture: same path, png extension.
pub fn image_path_for(source: &Path) -> PathBuf {
    source.with_extension(IMAGE_EXTENSION)
}

/// Formats a frequency with an SI prefix, e.g. `2.5 MHz`.
pub fn format_hz(hz: f64) -> String {
    let (value, unit) = match hz.abs() {
        f if f >= 1e9 => (hz / 1e9, "GHz"),
        f if f >= 1e6 => (hz / 1e6, "MHz"),
        f if f >= 1e3 => (hz / 1e3, "kHz"),
        _ => (hz, "Hz"),
    };
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {unit}")
}

/// One plotting box with its data already reduced to what can be drawn.
#[derive(Clone, Debug)]
pub struct Panel {
    pub kind: PanelKind,
    pub region: Region,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub log_x: bool,
    pub points: Vec<(f64, f64)>,
}

#[derive(Clone, Debug)]
pub struct Figure {
    pub title: String,
    pub source: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub panels: Vec<Panel>,
}

impl Figure {
    /// Lays out the enabled panels. `Ok(None)` when neither view is enabled.
    pub fn build(
        signal: &NormalizedSignal,
        spectrum: Option<&SpectralView>,
        config: &DisplayConfig,
    ) -> Result<Option<Self>, PlotterError> {
        let regions = layout::arrange(config.show_time, config.show_fft);
        if regions.is_empty() {
            return Ok(None);
        }
        let (width, height) = layout::figure_pixels(EXPORT_DPI);
        let mut panels = Vec::with_capacity(regions.len());
        for (kind, region) in regions {
            let columns = region.to_pixels(width, height).width as usize;
            let panel = match kind {
                PanelKind::Time => time_panel(signal, region, columns)?,
                PanelKind::Spectrum => {
                    let spectrum = spectrum.ok_or_else(|| {
                        PlotterError::Render("spectrum view enabled but not computed".into())
                    })?;
                    spectrum_panel(spectrum, config, region, columns)?
                }
            };
            panels.push(panel);
        }
        let title = signal
            .source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| DEFAULT_TITLE.to_owned());
        Ok(Some(Self {
            title,
            source: signal.source.clone(),
            width,
            height,
            panels,
        }))
    }

    /// Point size converted to pixels at the figure's resolution.
    fn font_px(&self, points: f64) -> u32 {
        let dpi = f64::from(self.height) / layout::FIGURE_HEIGHT_IN;
        (points * dpi / 72.0).round() as u32
    }

    /// Draws every panel into an RGB8 buffer of `width * height` pixels.
    pub fn render_rgb(&self) -> Result<Vec<u8>, PlotterError> {
        let mut buffer = vec![0u8; (self.width * self.height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (self.width, self.height))
                .into_drawing_area();
            root.fill(&WHITE)?;
            let (gutter_x, gutter_y) = layout::label_gutters_px(self.width, self.height);
            let caption_px = self.font_px(TITLE_PT) * 3 / 2;
            for panel in &self.panels {
                let rect = panel.region.to_pixels(self.width, self.height);
                let area = root.clone().shrink(
                    (rect.x - gutter_x as i32, rect.y - caption_px as i32),
                    (
                        (rect.width + gutter_x) as i32,
                        (rect.height + gutter_y + caption_px) as i32,
                    ),
                );
                self.draw_panel(&area, panel, gutter_x, gutter_y)?;
            }
            root.present()?;
        }
        Ok(buffer)
    }

    fn draw_panel(
        &self,
        area: &DrawingArea<BitMapBackend<'_>, Shift>,
        panel: &Panel,
        gutter_x: u32,
        gutter_y: u32,
    ) -> Result<(), PlotterError> {
        let caption_font = ("sans-serif", self.font_px(TITLE_PT));
        let label_font = ("sans-serif", self.font_px(LABEL_PT));
        let tick_font = ("sans-serif", self.font_px(TICK_PT));
        let grid = BLACK.mix(0.15);
        let (x0, x1) = panel.x_range;
        let (y0, y1) = panel.y_range;
        let mut builder = ChartBuilder::on(area);
        builder
            .caption(panel.kind.title(), caption_font)
            .x_label_area_size(gutter_y)
            .y_label_area_size(gutter_x);

        if panel.log_x {
            let mut chart = builder.build_cartesian_2d((x0..x1).log_scale(), y0..y1)?;
            chart.plotting_area().fill(&PANEL_BACKGROUND)?;
            chart
                .configure_mesh()
                .x_desc(panel.x_label)
                .y_desc(panel.y_label)
                .x_label_formatter(&|hz| format_hz(*hz))
                .label_style(tick_font)
                .axis_desc_style(label_font)
                .bold_line_style(grid)
                .light_line_style(PANEL_BACKGROUND)
                .draw()?;
            chart.draw_series(LineSeries::new(
                panel.points.iter().copied(),
                TRACE_COLOR.stroke_width(2),
            ))?;
        } else {
            let mut chart = builder.build_cartesian_2d(x0..x1, y0..y1)?;
            chart.plotting_area().fill(&PANEL_BACKGROUND)?;
            chart
                .configure_mesh()
                .x_desc(panel.x_label)
                .y_desc(panel.y_label)
                .label_style(tick_font)
                .axis_desc_style(label_font)
                .bold_line_style(grid)
                .light_line_style(PANEL_BACKGROUND)
                .draw()?;
            chart.draw_series(LineSeries::new(
                panel.points.iter().copied(),
                TRACE_COLOR.stroke_width(2),
            ))?;
        }
        Ok(())
    }

    pub fn to_png(&self) -> Result<Vec<u8>, PlotterError> {
        let buffer = self.render_rgb()?;
        encode_png(&buffer, self.width, self.height)
    }

    /// Writes the PNG to `destination`, or next to the source capture.
    pub fn export_png(&self, destination: Option<&Path>) -> Result<PathBuf, PlotterError> {
        let path = match (destination, self.source.as_deref()) {
            (Some(dest), _) => dest.to_path_buf(),
            (None, Some(source)) => image_path_for(source),
            (None, None) => return Err(PlotterError::NoExportPath),
        };
        let png = self.to_png()?;
        fs::write(&path, png).map_err(|err| PlotterError::Export {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        info!("exported: {}", path.display());
        Ok(path)
    }
}

fn time_panel(
    signal: &NormalizedSignal,
    region: Region,
    columns: usize,
) -> Result<Panel, PlotterError> {
    if signal.is_empty() {
        return Err(PlotterError::NotEnoughSamples(0));
    }
    let step_ms = signal.sample_period() * 1000.0;
    let x_range = (0.0, signal.duration_ms());
    let points = decimate(
        signal
            .samples
            .iter()
            .enumerate()
            .map(|(i, v)| (i as f64 * step_ms, *v)),
        x_range,
        false,
        columns,
    );
    let (lo, hi) = signal
        .samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let y_range = if hi - lo > f64::EPSILON {
        let pad = (hi - lo) * 0.1;
        (lo - pad, hi + pad)
    } else {
        (lo - 1.0, hi + 1.0)
    };
    let y_label = if signal.is_unscaled() {
        "Amplitude (norm.)"
    } else {
        "Amplitude (V)"
    };
    Ok(Panel {
        kind: PanelKind::Time,
        region,
        x_label: "Time (ms)",
        y_label,
        x_range,
        y_range,
        log_x: false,
        points,
    })
}

fn spectrum_panel(
    spectrum: &SpectralView,
    config: &DisplayConfig,
    region: Region,
    columns: usize,
) -> Result<Panel, PlotterError> {
    let x_range = spectrum.frequency_range(config.frequency_window())?;
    let points = decimate(
        spectrum
            .frequencies_hz
            .iter()
            .copied()
            .zip(spectrum.magnitudes_db.iter().copied()),
        x_range,
        true,
        columns,
    );
    Ok(Panel {
        kind: PanelKind::Spectrum,
        region,
        x_label: "Frequency (Hz)",
        y_label: "Magnitude (dB)",
        x_range,
        y_range: spectrum.level_range(),
        log_x: true,
        points,
    })
}

/// Reduces a trace sorted by x to at most a min/max pair per pixel column.
///
/// Points outside `x_range` (and non-positive x on a log axis) are dropped. A column
/// holding a single point keeps it as is, so sparse regions are drawn exactly.
pub fn decimate(
    points: impl IntoIterator<Item = (f64, f64)>,
    x_range: (f64, f64),
    log_x: bool,
    columns: usize,
) -> Vec<(f64, f64)> {
    let map = |x: f64| if log_x { x.log10() } else { x };
    let (x0, x1) = (map(x_range.0), map(x_range.1));
    let span = x1 - x0;
    let columns = columns.max(1);
    let mut out = Vec::with_capacity(columns * 2);
    let mut bucket: Option<(usize, (f64, f64), (f64, f64), usize)> = None;

    let flush = |out: &mut Vec<(f64, f64)>, lo: (f64, f64), hi: (f64, f64), count: usize| {
        if count == 1 {
            out.push(lo);
        } else if lo.0 <= hi.0 {
            out.push(lo);
            out.push(hi);
        } else {
            out.push(hi);
            out.push(lo);
        }
    };

    for (x, y) in points {
        if x < x_range.0 || x > x_range.1 || (log_x && x <= 0.0) {
            continue;
        }
        let column = if span > 0.0 {
            (((map(x) - x0) / span) * columns as f64) as usize
        } else {
            0
        };
        if let Some((current, lo, hi, count)) = bucket.as_mut() {
            if *current == column {
                if y < lo.1 {
                    *lo = (x, y);
                }
                if y > hi.1 {
                    *hi = (x, y);
                }
                *count += 1;
                continue;
            }
        }
        if let Some((_, lo, hi, count)) = bucket.take() {
            flush(&mut out, lo, hi, count);
        }
        bucket = Some((column, (x, y), (x, y), 1));
    }
    if let Some((_, lo, hi, count)) = bucket {
        flush(&mut out, lo, hi, count);
    }
    out
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PlotterError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| PlotterError::Render("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
