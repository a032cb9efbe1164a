use std::sync::mpsc::channel;
use std::time::Instant;

use crate::app::conversion;
use crate::app::file_dialogs;
use crate::app::App;
use crate::app::ConversionUpdate;
use crate::app::FileDetail;
use egui::{Color32, Frame, ProgressBar, RichText, Rounding, Slider, Stroke};

pub fn render(app: &mut App, ctx: &egui::Context) {
    let frame = Frame {
        fill: Color32::from_rgb(30, 30, 40),
        rounding: Rounding::same(10.0),
        stroke: Stroke::new(1.0, Color32::from_rgb(100, 200, 250)),
        inner_margin: egui::style::Margin::same(20.0),
        ..Default::default()
    };

    egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
        ui.heading(RichText::new("Image Converter to WebP").size(28.0).color(Color32::from_rgb(100, 200, 250)));
        ui.add_space(20.0);

        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                let button_width = 220.0;
                if ui.add_sized([button_width, 30.0], egui::Button::new("Select Source Folder")).clicked() {
                    if let Some(dir) = file_dialogs::select_source_folder() {
                        let files = conversion::collect_image_files(&dir);
                        let details: Vec<FileDetail> = files
                            .iter()
                            .map(|path| FileDetail::pending(&dir, path))
                            .collect();
                        *app.file_details.lock() = details;
                        app.log_messages.lock().push(format!(
                            "[{}] Source folder selected, {} images found.",
                            chrono::Local::now().format("%H:%M:%S"),
                            files.len()
                        ));
                        app.source_directory = Some(dir);
                    }
                }
                ui.add_space(5.0);
                if ui.add_sized([button_width, 30.0], egui::Button::new("Select Destination Folder")).clicked() {
                    if let Some(dir) = file_dialogs::select_destination_folder() {
                        app.log_messages.lock().push(format!(
                            "[{}] Destination folder selected.",
                            chrono::Local::now().format("%H:%M:%S")
                        ));
                        app.destination_directory = Some(dir);
                    }
                }

                ui.add_space(10.0);

                // Chosen folders
                ui.group(|ui| {
                    ui.set_width(button_width);
                    ui.label(RichText::new("Source Folder:").size(16.0).color(Color32::from_rgb(100, 200, 250)));
                    if let Some(dir) = &app.source_directory {
                        ui.label(dir.to_string_lossy());
                    } else {
                        ui.label("Not selected");
                    }
                    ui.add_space(5.0);
                    ui.label(RichText::new("Destination Folder:").size(16.0).color(Color32::from_rgb(100, 200, 250)));
                    if let Some(dir) = &app.destination_directory {
                        ui.label(dir.to_string_lossy());
                    } else {
                        ui.label("Not selected");
                    }
                });

                ui.add_space(10.0);

                // Conversion Settings
                ui.group(|ui| {
                    ui.set_width(button_width);
                    ui.label(RichText::new("Conversion Settings").size(16.0).color(Color32::from_rgb(100, 200, 250)));
                    ui.add(Slider::new(&mut app.quality, 10..=100).text("Quality"));
                    ui.label(RichText::new("High compression = low quality").size(12.0).color(Color32::from_rgb(160, 160, 160)));
                });

                ui.add_space(10.0);

                // Results
                ui.group(|ui| {
                    ui.set_width(button_width);
                    ui.label(RichText::new("Results").size(16.0).color(Color32::from_rgb(100, 200, 250)));

                    let details = app.file_details.lock();
                    let total_files = details.len();
                    let total_original_size: f64 =
                        details.iter().map(|d| d.original_size as f64).sum::<f64>() / (1024.0 * 1024.0);
                    let total_converted_size: f64 =
                        details.iter().filter_map(|d| d.converted_size).sum::<u64>() as f64 / (1024.0 * 1024.0);
                    drop(details);

                    let size_reduction = if total_original_size > 0.0 {
                        (1.0 - (total_converted_size / total_original_size)) * 100.0
                    } else {
                        0.0
                    };

                    ui.label(RichText::new(format!("Files: {}", total_files)).color(Color32::from_rgb(200, 200, 200)));
                    ui.label(RichText::new(format!("Original Size: {:.2} MB", total_original_size)).color(Color32::from_rgb(200, 200, 200)));
                    ui.label(RichText::new(format!("Converted Size: {:.2} MB", total_converted_size)).color(Color32::from_rgb(200, 200, 200)));
                    ui.label(RichText::new(format!("Size Reduction: {:.2}%", size_reduction)).color(Color32::from_rgb(200, 200, 200)));
                });

                ui.add_space(10.0);

                let converting = app.conversion_receiver.is_some();
                ui.add_enabled_ui(!converting, |ui| {
                    if ui.add_sized([button_width, 30.0], egui::Button::new("Convert Images")).clicked() {
                        start_conversion(app);
                    }
                });
            });

            ui.add_space(10.0);

            // Found images (scrollable table)
            ui.vertical(|ui| {
                ui.group(|ui| {
                    ui.set_min_width(ui.available_width());
                    ui.set_min_height(ui.available_height() - 250.0);
                    ui.label(RichText::new("Images:").size(16.0).color(Color32::from_rgb(100, 200, 250)));

                    egui::ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
                        egui::Grid::new("file_details_grid")
                            .num_columns(6)
                            .striped(true)
                            .show(ui, |ui| {
                                ui.label(RichText::new("#").strong());
                                ui.label(RichText::new("Name").strong());
                                ui.label(RichText::new("Folder").strong());
                                ui.label(RichText::new("Original Size").strong());
                                ui.label(RichText::new("Converted Size").strong());
                                ui.label(RichText::new("Status").strong());
                                ui.end_row();

                                let file_details = app.file_details.lock();
                                for (index, detail) in file_details.iter().enumerate() {
                                    ui.label(RichText::new(format!("{}", index + 1)).color(Color32::WHITE));
                                    ui.label(RichText::new(&detail.name).color(Color32::WHITE));
                                    ui.label(RichText::new(&detail.folder).color(Color32::WHITE));
                                    ui.label(RichText::new(format!("{:.2} MB", detail.original_size as f64 / (1024.0 * 1024.0))).color(Color32::WHITE));

                                    if detail.status == "Conversion failed" {
                                        ui.label(RichText::new("-").color(Color32::RED));
                                    } else {
                                        ui.label(RichText::new(match detail.converted_size {
                                            Some(size) => format!("{:.2} MB", size as f64 / (1024.0 * 1024.0)),
                                            None => "-".to_string(),
                                        }).color(Color32::WHITE));
                                    }

                                    let status_color = match detail.status.as_str() {
                                        "Pending" => Color32::from_rgb(200, 200, 200),
                                        "Processing..." => Color32::YELLOW,
                                        "Conversion successful" => Color32::GREEN,
                                        "Conversion failed" => Color32::RED,
                                        _ => Color32::WHITE,
                                    };
                                    let status = ui.label(RichText::new(&detail.status).color(status_color));
                                    if let Some(error) = &detail.error_message {
                                        status.on_hover_text(error);
                                    }
                                    ui.end_row();
                                }
                                drop(file_details);
                            });
                    });
                });
            });
        });

        ui.add_space(20.0);

        // Conversion Log with Progress Bar
        ui.group(|ui| {
            ui.set_min_width(ui.available_width());
            ui.label(RichText::new("Conversion Log").size(16.0).color(Color32::from_rgb(100, 200, 250)));

            let progress = app.conversion_progress.lock();
            if progress.total > 0 {
                let progress_ratio = progress.completed as f32 / progress.total as f32;
                ui.add(ProgressBar::new(progress_ratio).text(format!("{:.0}%", progress_ratio * 100.0)));
            }
            drop(progress);

            egui::ScrollArea::vertical()
                .max_height(200.0)
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    let logs = app.log_messages.lock();
                    for log in logs.iter() {
                        if log.contains("error") || log.contains("Failed") {
                            ui.label(RichText::new(log).color(Color32::RED));
                        } else {
                            ui.label(log);
                        }
                    }
                });
        });
    });

    render_dialogs(app, ctx);
}

fn render_dialogs(app: &mut App, ctx: &egui::Context) {
    if let Some(message) = app.alert.clone() {
        egui::Window::new("Warning")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(10.0);
                if ui.button("OK").clicked() {
                    app.alert = None;
                }
            });
    }

    if let Some(outcome) = app.summary.clone() {
        egui::Window::new("Conversion Complete")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(format!(
                    "Successfully converted {} images to WebP.",
                    outcome.converted
                ));
                ui.label(format!("Saved in: {}", outcome.output_dir.display()));
                if let Some(duration) = app.last_batch_duration {
                    ui.label(format!("Elapsed: {:.1?}", duration));
                }
                ui.add_space(10.0);
                if ui.button("OK").clicked() {
                    app.summary = None;
                }
            });
    }
}

fn start_conversion(app: &mut App) {
    let (source, destination) = match (
        app.source_directory.clone(),
        app.destination_directory.clone(),
    ) {
        (Some(source), Some(destination)) => (source, destination),
        _ => {
            app.alert = Some("Please select both source and destination folders.".to_string());
            return;
        }
    };

    app.log_messages.lock().push(format!(
        "[{}] Starting conversion...",
        chrono::Local::now().format("%H:%M:%S")
    ));

    let quality = app.quality;
    let conversion_progress = app.conversion_progress.clone();
    let log_messages = app.log_messages.clone();
    let file_details = app.file_details.clone();

    let (sender, receiver) = channel();
    app.conversion_receiver = Some(receiver);
    app.conversion_start_time = Some(Instant::now());
    app.last_batch_duration = None;

    std::thread::spawn(move || {
        if let Err(err) = conversion::convert_folder(
            &source,
            &destination,
            quality,
            conversion_progress,
            log_messages,
            file_details,
            &sender,
        ) {
            eprintln!("Conversion aborted: {}", err);
            sender
                .send(ConversionUpdate::Failed(format!("Conversion aborted: {}", err)))
                .ok();
        }
    });
}
