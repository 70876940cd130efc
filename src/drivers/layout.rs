//! Placement of the time and spectrum panels inside the figure.
//!
//! Regions are fractions of the figure with the origin at the bottom-left corner.
//! Each region is the plotting box itself; tick labels and axis titles live in the
//! offset between the figure margin and the box.

pub const MARGIN_LEFT: f64 = 0.04;
pub const MARGIN_RIGHT: f64 = 0.03;
pub const MARGIN_TOP: f64 = 0.05;
pub const MARGIN_BOTTOM: f64 = 0.05;

/// Room kept left of / below each box for the axis labels.
const LABEL_OFFSET_X: f64 = 0.05;
const LABEL_OFFSET_Y: f64 = 0.08;
const HEIGHT_SHARE: f64 = 0.87;
const SPLIT_WIDTH_SHARE: f64 = 0.40;
const SINGLE_WIDTH_SHARE: f64 = 0.95;
/// Left edge of the second column, measured from the left margin.
const SECOND_COLUMN_OFFSET: f64 = 0.55;

pub const FIGURE_WIDTH_IN: f64 = 8.0;
pub const FIGURE_HEIGHT_IN: f64 = 4.5;
pub const EXPORT_DPI: f64 = 300.0;

pub fn drawable_width() -> f64 {
    1.0 - MARGIN_LEFT - MARGIN_RIGHT
}

pub fn drawable_height() -> f64 {
    1.0 - MARGIN_TOP - MARGIN_BOTTOM
}

/// Pixel size of the exported image.
pub fn figure_pixels(dpi: f64) -> (u32, u32) {
    (
        (FIGURE_WIDTH_IN * dpi).round() as u32,
        (FIGURE_HEIGHT_IN * dpi).round() as u32,
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelKind {
    Time,
    Spectrum,
}

impl PanelKind {
    pub fn title(self) -> &'static str {
        match self {
            PanelKind::Time => "TIME",
            PanelKind::Spectrum => "FFT",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Region {
    pub left: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
}

/// Rectangle in pixels, origin at the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn top(&self) -> f64 {
        self.bottom + self.height
    }

    pub fn to_pixels(&self, figure_width: u32, figure_height: u32) -> PixelRect {
        let fw = f64::from(figure_width);
        let fh = f64::from(figure_height);
        PixelRect {
            x: (self.left * fw).round() as i32,
            y: ((1.0 - self.top()) * fh).round() as i32,
            width: (self.width * fw).round() as u32,
            height: (self.height * fh).round() as u32,
        }
    }
}

/// Pixels kept left of and below each box for tick labels and axis titles.
pub fn label_gutters_px(figure_width: u32, figure_height: u32) -> (u32, u32) {
    (
        (LABEL_OFFSET_X * f64::from(figure_width)).round() as u32,
        (LABEL_OFFSET_Y * f64::from(figure_height)).round() as u32,
    )
}

/// Regions for the enabled panels, time first. Empty when nothing is shown.
pub fn arrange(show_time: bool, show_fft: bool) -> Vec<(PanelKind, Region)> {
    let bottom = MARGIN_BOTTOM + LABEL_OFFSET_Y;
    let height = drawable_height() * HEIGHT_SHARE;
    let first_left = MARGIN_LEFT + LABEL_OFFSET_X;
    let width_share = if show_time && show_fft {
        SPLIT_WIDTH_SHARE
    } else {
        SINGLE_WIDTH_SHARE
    };
    let width = drawable_width() * width_share;

    let mut regions = Vec::with_capacity(2);
    if show_time {
        regions.push((
            PanelKind::Time,
            Region {
                left: first_left,
                bottom,
                width,
                height,
            },
        ));
    }
    if show_fft {
        let left = if show_time {
            MARGIN_LEFT + SECOND_COLUMN_OFFSET
        } else {
            first_left
        };
        regions.push((
            PanelKind::Spectrum,
            Region {
                left,
                bottom,
                width,
                height,
            },
        ));
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn right(region: &Region) -> f64 {
        region.left + region.width
    }

    fn inside_figure(region: &Region) -> bool {
        region.left >= MARGIN_LEFT
            && region.bottom >= MARGIN_BOTTOM
            && right(region) <= 1.0
            && region.top() <= 1.0 - MARGIN_TOP
    }

    #[test]
    fn both_panels_share_the_width() {
        let regions = arrange(true, true);
        assert_eq!(regions.len(), 2);
        let (time_kind, time) = regions[0];
        let (fft_kind, fft) = regions[1];
        assert_eq!(time_kind, PanelKind::Time);
        assert_eq!(fft_kind, PanelKind::Spectrum);
        assert!(right(&time) < fft.left);
        assert!((time.width - drawable_width() * 0.40).abs() < 1e-12);
        assert_eq!(time.width, fft.width);
        assert!(inside_figure(&time) && inside_figure(&fft));
    }

    #[test]
    fn single_panel_spans_the_drawable_width() {
        for (show_time, show_fft) in [(true, false), (false, true)] {
            let regions = arrange(show_time, show_fft);
            assert_eq!(regions.len(), 1);
            let region = regions[0].1;
            assert!(region.width > drawable_width() * 0.9);
            assert!(inside_figure(&region));
        }
        assert!(arrange(false, false).is_empty());
    }

    #[test]
    fn export_size_and_pixel_mapping() {
        assert_eq!(figure_pixels(EXPORT_DPI), (2400, 1350));
        let region = Region {
            left: 0.25,
            bottom: 0.5,
            width: 0.5,
            height: 0.25,
        };
        let px = region.to_pixels(400, 200);
        assert_eq!(
            px,
            PixelRect {
                x: 100,
                y: 50,
                width: 200,
                height: 50
            }
        );
    }
}
