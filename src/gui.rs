// src/gui.rs
use eframe::egui;
use egui::Color32;
use egui_plot::{Line, Plot, PlotPoints};

use crate::drivers::plot::format_hz;
use crate::drivers::{Figure, FigureViewer, Panel, PlotterError};

const TRACE: Color32 = Color32::from_rgb(0x00, 0x00, 0x9A);
const WINDOW_SIZE: [f32; 2] = [1200.0, 675.0];

/// Native window showing the figure; `show` returns when the window is closed.
#[derive(Default)]
pub struct NativeViewer;

impl FigureViewer for NativeViewer {
    fn show(&mut self, figure: &Figure, hide_toolbar: bool) -> Result<(), PlotterError> {
        let viewport = egui::ViewportBuilder::default()
            .with_inner_size(WINDOW_SIZE)
            .with_title(figure.title.clone());
        let options = eframe::NativeOptions {
            viewport,
            ..Default::default()
        };
        let app = FigureApp {
            figure: figure.clone(),
            hide_toolbar,
            reset_requested: false,
        };
        eframe::run_native(&figure.title, options, Box::new(move |_cc| Box::new(app)))
            .map_err(|err| PlotterError::Render(err.to_string()))
    }
}

struct FigureApp {
    figure: Figure,
    hide_toolbar: bool,
    reset_requested: bool,
}

impl eframe::App for FigureApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let reset = std::mem::take(&mut self.reset_requested);
        if !self.hide_toolbar {
            egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("Reset view").clicked() {
                        self.reset_requested = true;
                    }
                    ui.separator();
                    ui.label(self.figure.title.as_str());
                });
            });
        }
        egui::CentralPanel::default().show(ctx, |ui| {
            let panels = &self.figure.panels;
            ui.columns(panels.len().max(1), |columns| {
                for (ui, panel) in columns.iter_mut().zip(panels) {
                    ui.vertical_centered(|ui| {
                        ui.strong(panel.kind.title());
                    });
                    draw_panel(ui, panel, reset);
                }
            });
        });
    }
}

// egui_plot has no log axis: spectrum x values are plotted as log10(Hz) and relabelled.
fn draw_panel(ui: &mut egui::Ui, panel: &Panel, reset: bool) {
    let log_x = panel.log_x;
    let to_x = move |x: f64| if log_x { x.log10() } else { x };
    let points: PlotPoints = panel.points.iter().map(|(x, y)| [to_x(*x), *y]).collect();
    let (x0, x1) = panel.x_range;
    let (y0, y1) = panel.y_range;
    let mut plot = Plot::new(panel.kind.title())
        .x_axis_label(panel.x_label)
        .y_axis_label(panel.y_label)
        .include_x(to_x(x0))
        .include_x(to_x(x1))
        .include_y(y0)
        .include_y(y1)
        .allow_scroll(false);
    if log_x {
        plot = plot.x_axis_formatter(|x, _digits, _range| format_hz(10f64.powf(x)));
    }
    if reset {
        plot = plot.reset();
    }
    plot.show(ui, |plot_ui| {
        plot_ui.line(Line::new(points).color(TRACE));
    });
}
