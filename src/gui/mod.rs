pub mod theme;

use crate::audio::{capture, SoundMeter};
use crate::meter::{self, SharedLevel};
use eframe::egui;
use std::sync::Arc;

pub struct MeterApp {
    //
    // Sampler lifecycle and the level it publishes.
    //
    sampler: SoundMeter,
    level: Arc<SharedLevel>,

    //
    // Microphone-access state: Some(name) while an input device with a
    // usable config is reachable.
    //
    mic_name: Option<String>,

    is_running: bool,
    last_error: Option<String>,
}

impl MeterApp {
    pub fn new(_cc: &eframe::CreationContext, mic_name: Option<String>) -> Self {
        Self {
            sampler: SoundMeter::new(),
            level: Arc::new(SharedLevel::new()),
            mic_name,
            is_running: false,
            last_error: None,
        }
    }

    fn toggle(&mut self) {
        if self.is_running {
            self.sampler.stop();
            // Reset the readout to 0 while idle.
            self.level.store(0.0);
            self.is_running = false;
            return;
        }

        let level = self.level.clone();
        match self.sampler.start(move |db| level.store(db)) {
            Ok(()) => {
                self.is_running = true;
                self.last_error = None;
            }
            Err(err) => {
                //
                // Capture can fail after the probe succeeded (device yanked,
                // OS privacy setting flipped). Surface it and re-probe so the
                // button falls back to the access check.
                //
                log::error!("Failed to start capture: {}", err);
                self.last_error = Some(err.to_string());
                self.mic_name = capture::probe_input().ok();
            }
        }
    }

    fn recheck_mic(&mut self) {
        match capture::probe_input() {
            Ok(name) => {
                log::info!("Input device available: {}", name);
                self.mic_name = Some(name);
                self.last_error = None;
            }
            Err(err) => {
                log::warn!("Microphone unavailable: {}", err);
                self.last_error = Some(err.to_string());
            }
        }
    }
}

impl eframe::App for MeterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        //
        // Poll the latest published level and keep repainting while visible.
        //
        let level = self.level.load();
        ctx.request_repaint();

        egui::CentralPanel::default().show(ctx, |ui| {
            theme::draw_menu_bar(ui, self.mic_name.as_deref().unwrap_or("no input device"));
            ui.add_space(4.0);

            theme::draw_platinum_window(ui, "Sound Meter", |ui| {
                ui.heading(format!("Current dB: {} dB", meter::display_db(level) as i32));
                ui.add_space(4.0);

                draw_level_bar(ui, level);
                ui.add_space(8.0);

                //
                // One button: either re-check microphone access or toggle
                // the sampler, depending on access state.
                //
                if self.mic_name.is_none() {
                    if ui.button("Allow Microphone").clicked() {
                        self.recheck_mic();
                    }
                } else {
                    let label = if self.is_running { "Stop" } else { "Start" };
                    if ui.button(label).clicked() {
                        self.toggle();
                    }
                }

                //
                // Warning line, shown only while the raw level exceeds the
                // threshold.
                //
                if meter::is_too_loud(level) {
                    ui.add_space(4.0);
                    ui.colored_label(egui::Color32::RED, "Too loud! Lower the volume.");
                }

                if let Some(err) = &self.last_error {
                    ui.add_space(4.0);
                    ui.label(egui::RichText::new(err.as_str()).italics().size(10.0));
                }
            });
        });
    }
}

/// Horizontal level bar: track, proportional fill, thin outline.
fn draw_level_bar(ui: &mut egui::Ui, level: f32) {
    let (rect, _response) = ui.allocate_exact_size(
        egui::vec2(ui.available_width(), 24.0),
        egui::Sense::hover(),
    );

    ui.painter()
        .rect_filled(rect, egui::Rounding::ZERO, theme::BAR_TRACK);

    let fill = meter::bar_fraction(level);
    if fill > 0.0 {
        let mut filled = rect;
        filled.set_width(rect.width() * fill);
        ui.painter()
            .rect_filled(filled, egui::Rounding::ZERO, theme::bar_color(level));
    }

    ui.painter().rect_stroke(
        rect,
        egui::Rounding::ZERO,
        egui::Stroke::new(1.0, theme::PLATINUM_DARK),
    );
}
