use rfd::FileDialog;
use std::path::PathBuf;

pub fn select_source_folder() -> Option<PathBuf> {
    FileDialog::new().pick_folder()
}

pub fn select_destination_folder() -> Option<PathBuf> {
    FileDialog::new().pick_folder()
}
