mod audio;
mod gui;
mod meter;

use gui::MeterApp;

fn main() -> Result<(), eframe::Error> {
    //
    // Initialize logging with default filter set to "info".
    //
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting sound level meter...");

    //
    // Probe microphone access up front; the GUI offers a re-check button
    // when no input device is reachable.
    //
    let mic_name = match audio::capture::probe_input() {
        Ok(name) => {
            log::info!("Input device: {}", name);
            Some(name)
        }
        Err(err) => {
            log::warn!("Microphone unavailable: {}", err);
            None
        }
    };

    //
    // Initialize GUI configuration.
    //
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([420.0, 320.0])
            .with_min_inner_size([320.0, 260.0])
            .with_title("soundmeter"),
        ..Default::default()
    };

    //
    // Launch GUI application.
    //
    eframe::run_native(
        "soundmeter",
        options,
        Box::new(move |cc| {
            gui::theme::setup_global_style(&cc.egui_ctx);
            Ok(Box::new(MeterApp::new(cc, mic_name)))
        }),
    )
}
