pub mod conversion;
pub mod file_dialogs;
pub mod gui;

use eframe::egui;
use eframe::App as EframeApp;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

use self::conversion::ConversionOutcome;

pub struct App {
    // Application state
    pub source_directory: Option<PathBuf>,
    pub destination_directory: Option<PathBuf>,
    pub quality: u8,
    pub conversion_progress: Arc<Mutex<ConversionProgress>>,
    pub log_messages: Arc<Mutex<Vec<String>>>,
    pub file_details: Arc<Mutex<Vec<FileDetail>>>,
    pub conversion_receiver: Option<Receiver<ConversionUpdate>>,
    pub conversion_start_time: Option<Instant>,
    pub last_batch_duration: Option<Duration>,
    /// Summary dialog contents once a batch finishes.
    pub summary: Option<ConversionOutcome>,
    /// Warning dialog contents (missing input, aborted batch).
    pub alert: Option<String>,
}

pub enum ConversionUpdate {
    Progress(usize, usize), // (completed, total)
    Completed(ConversionOutcome),
    Failed(String),
}

pub struct ConversionProgress {
    pub total: usize,
    pub completed: usize,
    pub status: String,
}

#[derive(Clone, Debug)]
pub struct FileDetail {
    pub name: String,
    pub folder: String,
    pub original_size: u64,
    pub converted_size: Option<u64>,
    pub status: String,
    pub error_message: Option<String>,
}

impl FileDetail {
    pub fn pending(source_root: &Path, path: &Path) -> Self {
        let folder = path
            .parent()
            .and_then(|parent| parent.strip_prefix(source_root).ok())
            .map(|rel| rel.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned(),
            folder,
            original_size: std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            converted_size: None,
            status: "Pending".to_string(),
            error_message: None,
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self {
            source_directory: None,
            destination_directory: None,
            quality: 80,
            conversion_progress: Arc::new(Mutex::new(ConversionProgress {
                total: 0,
                completed: 0,
                status: String::new(),
            })),
            log_messages: Arc::new(Mutex::new(Vec::new())),
            file_details: Arc::new(Mutex::new(Vec::new())),
            conversion_receiver: None,
            conversion_start_time: None,
            last_batch_duration: None,
            summary: None,
            alert: None,
        }
    }
}

impl EframeApp for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut finished = false;
        let mut needs_redraw = false;

        if let Some(receiver) = &self.conversion_receiver {
            while let Ok(update) = receiver.try_recv() {
                match update {
                    ConversionUpdate::Progress(completed, total) => {
                        let mut progress = self.conversion_progress.lock();
                        progress.completed = completed;
                        progress.total = total;
                        drop(progress); // Release the lock as soon as possible
                        needs_redraw = true;
                    }
                    ConversionUpdate::Completed(outcome) => {
                        self.last_batch_duration =
                            self.conversion_start_time.take().map(|t| t.elapsed());
                        self.summary = Some(outcome);
                        finished = true;
                        needs_redraw = true;
                    }
                    ConversionUpdate::Failed(message) => {
                        self.conversion_start_time = None;
                        self.alert = Some(message);
                        finished = true;
                        needs_redraw = true;
                    }
                }
            }
        }

        if finished {
            self.conversion_receiver = None;
        }

        // Render the GUI
        gui::render(self, ctx);

        if needs_redraw {
            ctx.request_repaint();
        }
    }
}
