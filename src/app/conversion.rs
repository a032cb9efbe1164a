use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Instant;

use image::io::Reader as ImageReader;
use image::DynamicImage;
use parking_lot::Mutex;
use rayon::prelude::*;
use thiserror::Error;
use walkdir::WalkDir;

use crate::app::{ConversionProgress, ConversionUpdate, FileDetail};
use crate::utils::{get_memory_usage, measure_time, Logger};

/// Input extensions the converter picks up, matched case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["heif", "jpeg", "jpg", "png"];

/// Name of the flat output folder created under the destination directory.
pub const OUTPUT_DIR_NAME: &str = "Converted_Images";

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[cfg(feature = "heif")]
    #[error("heif error: {0}")]
    Heif(#[from] libheif_rs::HeifError),
    #[error("invalid image data: {0}")]
    InvalidData(String),
}

#[derive(Clone, Debug)]
pub struct ConversionOutcome {
    pub converted: usize,
    pub output_dir: PathBuf,
}

/// Recursively collects every regular file under `source` with a supported
/// extension. Symlinks are not followed; unreadable entries are skipped.
pub fn collect_image_files(source: &Path) -> Vec<PathBuf> {
    WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && has_supported_extension(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Converts every supported image under `source` into
/// `destination_base/Converted_Images` as WebP at `quality`.
///
/// Output names are the input file stem plus `.webp`; the output folder is
/// flat, so same-named files from different subfolders overwrite each other.
/// A file that fails to decode or encode is logged and skipped, the rest of
/// the batch continues. Only failure to create the output folder aborts.
pub fn convert_folder(
    source: &Path,
    destination_base: &Path,
    quality: u8,
    progress: Arc<Mutex<ConversionProgress>>,
    log_messages: Arc<Mutex<Vec<String>>>,
    file_details: Arc<Mutex<Vec<FileDetail>>>,
    sender: &Sender<ConversionUpdate>,
) -> Result<ConversionOutcome, ConvertError> {
    let logger = Logger::new(log_messages);
    let output_dir = destination_base.join(OUTPUT_DIR_NAME);
    std::fs::create_dir_all(&output_dir)?;

    let files = collect_image_files(source);
    let total = files.len();
    logger.log(format!(
        "Found {} images under {}",
        total,
        source.display()
    ));
    logger.log(get_memory_usage());

    {
        let mut details = file_details.lock();
        *details = files
            .iter()
            .map(|path| FileDetail::pending(source, path))
            .collect();
    }
    {
        let mut progress = progress.lock();
        progress.total = total;
        progress.completed = 0;
        progress.status = "Starting conversion...".to_string();
    }

    let converted = AtomicUsize::new(0);
    let start_time = Instant::now();

    files.par_iter().enumerate().for_each(|(index, input_path)| {
        set_status(&file_details, index, "Processing...", None);

        let output_name =
            input_path.file_stem().unwrap_or_default().to_string_lossy().to_string() + ".webp";
        let output_path = output_dir.join(output_name);

        let (result, duration) = measure_time(|| convert_file(input_path, &output_path, quality));
        match result {
            Ok(bytes_written) => {
                converted.fetch_add(1, Ordering::Relaxed);
                logger.log(format!(
                    "Converted {} ({} bytes) in {:?}",
                    input_path.display(),
                    bytes_written,
                    duration
                ));
                let mut details = file_details.lock();
                if let Some(detail) = details.get_mut(index) {
                    detail.converted_size = Some(bytes_written);
                    detail.status = "Conversion successful".to_string();
                }
            }
            Err(err) => {
                eprintln!("Error converting {}: {}", input_path.display(), err);
                logger.log(format!(
                    "Failed to convert {}: {}",
                    input_path.display(),
                    err
                ));
                set_status(&file_details, index, "Conversion failed", Some(err.to_string()));
            }
        }

        let mut progress = progress.lock();
        progress.completed += 1;
        progress.status = format!("Converting image {} of {}", progress.completed, total);
        let completed = progress.completed;
        drop(progress);
        sender.send(ConversionUpdate::Progress(completed, total)).ok();
    });

    let outcome = ConversionOutcome {
        converted: converted.load(Ordering::Relaxed),
        output_dir,
    };

    logger.log(format!(
        "Converted {} of {} images in {:?}",
        outcome.converted,
        total,
        start_time.elapsed()
    ));
    logger.log(get_memory_usage());
    {
        let mut progress = progress.lock();
        progress.status = "Conversion complete!".to_string();
    }
    sender.send(ConversionUpdate::Completed(outcome.clone())).ok();

    Ok(outcome)
}

/// Decodes `input`, re-encodes it as WebP at `quality` and writes it to
/// `output`, returning the number of bytes written.
pub fn convert_file(input: &Path, output: &Path, quality: u8) -> Result<u64, ConvertError> {
    let img = load_image(input)?;
    let webp_data = encode_to_webp(img, quality)?;
    save_webp(&webp_data, output)?;
    Ok(webp_data.len() as u64)
}

fn load_image(path: &Path) -> Result<DynamicImage, ConvertError> {
    #[cfg(feature = "heif")]
    {
        if path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("heif"))
        {
            return decode_heif(path);
        }
    }
    Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
}

fn encode_to_webp(img: DynamicImage, quality: u8) -> Result<Vec<u8>, ConvertError> {
    // The WebP encoder only takes 8-bit RGB/RGBA layouts.
    let img = match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other => DynamicImage::ImageRgba8(other.to_rgba8()),
    };
    let encoder =
        webp::Encoder::from_image(&img).map_err(|e| ConvertError::InvalidData(e.to_string()))?;
    Ok(encoder.encode(f32::from(quality)).to_vec())
}

fn save_webp(webp_data: &[u8], output_path: &Path) -> std::io::Result<()> {
    let mut file = File::create(output_path)?;
    file.write_all(webp_data)
}

#[cfg(feature = "heif")]
fn decode_heif(path: &Path) -> Result<DynamicImage, ConvertError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib_heif = LibHeif::new();
    let name = path
        .to_str()
        .ok_or_else(|| ConvertError::InvalidData("non-utf8 path".to_string()))?;
    let ctx = HeifContext::read_from_file(name)?;
    let handle = ctx.primary_image_handle()?;
    let decoded = lib_heif.decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| ConvertError::InvalidData("missing interleaved plane".to_string()))?;
    let width = plane.width as usize;
    let height = plane.height as usize;

    // Rows carry stride padding; copy out the pixel payload.
    let mut rgba = Vec::with_capacity(width * height * 4);
    for row in plane.data.chunks(plane.stride).take(height) {
        rgba.extend_from_slice(&row[..width * 4]);
    }
    let buffer = image::RgbaImage::from_raw(plane.width, plane.height, rgba)
        .ok_or_else(|| ConvertError::InvalidData("heif plane size mismatch".to_string()))?;
    Ok(DynamicImage::ImageRgba8(buffer))
}

fn set_status(
    file_details: &Arc<Mutex<Vec<FileDetail>>>,
    index: usize,
    status: &str,
    error_message: Option<String>,
) {
    let mut details = file_details.lock();
    if let Some(detail) = details.get_mut(index) {
        detail.status = status.to_string();
        detail.error_message = error_message;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::mpsc::channel;
    use tempfile::tempdir;

    fn write_image(path: &Path) {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([120, 30, 200]));
        img.save(path).unwrap();
    }

    fn run_conversion(source: &Path, destination: &Path, quality: u8) -> ConversionOutcome {
        let progress = Arc::new(Mutex::new(ConversionProgress {
            total: 0,
            completed: 0,
            status: String::new(),
        }));
        let log_messages = Arc::new(Mutex::new(Vec::new()));
        let file_details = Arc::new(Mutex::new(Vec::new()));
        let (sender, _receiver) = channel();
        convert_folder(
            source,
            destination,
            quality,
            progress,
            log_messages,
            file_details,
            &sender,
        )
        .unwrap()
    }

    fn output_names(output_dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(output_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn converts_nested_tree_and_skips_unsupported_files() {
        let source = tempdir().unwrap();
        let destination = tempdir().unwrap();
        fs::create_dir_all(source.path().join("sub/deep")).unwrap();

        write_image(&source.path().join("a.png"));
        write_image(&source.path().join("sub/b.jpg"));
        write_image(&source.path().join("sub/deep/c.jpeg"));
        write_image(&source.path().join("sub/D.PNG"));
        fs::write(source.path().join("notes.txt"), b"not an image").unwrap();
        fs::write(source.path().join("clip.gif"), b"GIF89a").unwrap();

        let outcome = run_conversion(source.path(), destination.path(), 80);

        assert_eq!(outcome.converted, 4);
        assert_eq!(outcome.output_dir, destination.path().join(OUTPUT_DIR_NAME));
        assert_eq!(
            output_names(&outcome.output_dir),
            vec!["D.webp", "a.webp", "b.webp", "c.webp"]
        );
    }

    #[test]
    fn output_files_are_webp() {
        let source = tempdir().unwrap();
        let destination = tempdir().unwrap();
        write_image(&source.path().join("photo.png"));

        let outcome = run_conversion(source.path(), destination.path(), 80);

        let bytes = fs::read(outcome.output_dir.join("photo.webp")).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn corrupt_file_is_skipped_and_excluded_from_count() {
        let source = tempdir().unwrap();
        let destination = tempdir().unwrap();
        write_image(&source.path().join("good.png"));
        fs::write(source.path().join("bad.jpg"), b"definitely not a jpeg").unwrap();

        let outcome = run_conversion(source.path(), destination.path(), 80);

        assert_eq!(outcome.converted, 1);
        assert_eq!(output_names(&outcome.output_dir), vec!["good.webp"]);
    }

    #[test]
    fn empty_source_yields_zero_count_and_created_output_dir() {
        let source = tempdir().unwrap();
        let destination = tempdir().unwrap();

        let outcome = run_conversion(source.path(), destination.path(), 80);

        assert_eq!(outcome.converted, 0);
        assert!(outcome.output_dir.is_dir());
        assert!(output_names(&outcome.output_dir).is_empty());
    }

    #[test]
    fn same_stem_in_different_subfolders_overwrites_silently() {
        let source = tempdir().unwrap();
        let destination = tempdir().unwrap();
        fs::create_dir_all(source.path().join("a")).unwrap();
        fs::create_dir_all(source.path().join("b")).unwrap();
        write_image(&source.path().join("a/pic.png"));
        write_image(&source.path().join("b/pic.png"));

        let outcome = run_conversion(source.path(), destination.path(), 80);

        // Both convert, but the flat output folder keeps a single file.
        assert_eq!(outcome.converted, 2);
        assert_eq!(output_names(&outcome.output_dir), vec!["pic.webp"]);
    }

    #[test]
    fn quality_bounds_are_accepted() {
        let source = tempdir().unwrap();
        let destination = tempdir().unwrap();
        let input = source.path().join("photo.png");
        write_image(&input);

        for quality in [10u8, 100] {
            let output = destination.path().join(format!("q{}.webp", quality));
            let written = convert_file(&input, &output, quality).unwrap();
            assert!(written > 0);
            assert_eq!(fs::metadata(&output).unwrap().len(), written);
        }
    }

    #[test]
    fn extension_filter_is_case_insensitive_and_exact() {
        assert!(has_supported_extension(Path::new("x.png")));
        assert!(has_supported_extension(Path::new("x.JPG")));
        assert!(has_supported_extension(Path::new("x.Jpeg")));
        assert!(has_supported_extension(Path::new("x.HEIF")));
        assert!(!has_supported_extension(Path::new("x.webp")));
        assert!(!has_supported_extension(Path::new("x.gif")));
        assert!(!has_supported_extension(Path::new("x.heic")));
        assert!(!has_supported_extension(Path::new("png")));
    }

    #[test]
    fn collect_walks_recursively_and_sorts() {
        let source = tempdir().unwrap();
        fs::create_dir_all(source.path().join("z/inner")).unwrap();
        write_image(&source.path().join("b.png"));
        write_image(&source.path().join("z/inner/a.jpg"));
        fs::write(source.path().join("z/skip.txt"), b"x").unwrap();

        let files = collect_image_files(source.path());
        assert_eq!(
            files,
            vec![
                source.path().join("b.png"),
                source.path().join("z/inner/a.jpg"),
            ]
        );
    }
}
