mod app;
mod utils;

use app::App;
use eframe::NativeOptions;

fn main() {
    let native_options = NativeOptions {
        initial_window_size: Some(egui::Vec2::new(900.0, 640.0)),
        resizable: true,
        ..Default::default()
    };
    eframe::run_native(
        "Image Converter to WebP",
        native_options,
        Box::new(|_cc| Box::new(App::default())),
    );
}
