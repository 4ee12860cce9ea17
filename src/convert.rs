//! End-to-end conversion: collect, stage, lay out, render, print

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{info, warn};

use crate::collect::{collect_images, Collection, InputSelection};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::paginate::{ImageEntry, PageLayout, SkippedImage};
use crate::pdf::{render_pdf, RenderOptions};
use crate::print::print_document;

/// Options for one conversion run
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub inputs: InputSelection,
    /// Destination PDF; defaults to the configured or `~/workout.pdf` path
    pub output_path: Option<PathBuf>,
    pub config: Config,
    /// Send the PDF to the printer after it is written
    pub print: bool,
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct ConvertReport {
    pub output_path: PathBuf,
    pub pages: usize,
    pub images_placed: usize,
    pub skipped: Vec<SkippedImage>,
    /// Set when printing was requested but the command could not start
    pub print_error: Option<String>,
}

/// Convert the selected images into a single PDF
///
/// Fails before creating any output when nothing is collected or when no
/// collected image can be decoded. A partially written file is removed if
/// rendering fails.
///
/// # Example
///
/// ```no_run
/// use img_handouts::collect::InputSelection;
/// use img_handouts::config::Config;
/// use img_handouts::convert::{convert, ConvertOptions};
/// use std::path::PathBuf;
///
/// let options = ConvertOptions {
///     inputs: InputSelection {
///         directories: vec![PathBuf::from("photos")],
///         files: vec![],
///     },
///     output_path: Some(PathBuf::from("photos.pdf")),
///     config: Config::default(),
///     print: false,
/// };
///
/// let report = convert(&options).expect("Failed to convert");
/// println!("{} pages", report.pages);
/// ```
pub fn convert(options: &ConvertOptions) -> Result<ConvertReport> {
    let config = &options.config;
    config.validate()?;

    let collection = collect_images(&options.inputs, &config.collect_options())?;
    if collection.is_empty() {
        return Err(Error::NoImages);
    }
    info!(
        "Found {} image files ({} folder captions)",
        collection.entries.len(),
        collection.captions.len()
    );

    let output_path = options
        .output_path
        .clone()
        .unwrap_or_else(|| config.output_path());

    // Dropping the guard removes the scratch directory on every path out
    let staging = if config.collect.stage_copies {
        Some(TempDir::new()?)
    } else {
        None
    };
    let staged = match &staging {
        Some(dir) => stage_copies(&collection, dir.path()),
        None => Staged::in_place(&collection),
    };

    let policy = config.layout_policy();
    let layout = PageLayout::new(&policy, &collection.captions).layout(&staged.entries);
    if !layout.has_images() {
        return Err(Error::NothingPlaced(collection.entries.len()));
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let render_options = RenderOptions {
        page: policy.page,
        caption_font_size: config.captions.font_size,
        title: config.output.title.clone(),
    };
    let summary = match render_pdf(&layout.blocks, &output_path, &render_options) {
        Ok(summary) => summary,
        Err(e) => {
            discard_output(&output_path);
            return Err(e);
        }
    };

    // Skipped entries are reported by their original path
    let mut skipped = staged.failed.clone();
    skipped.extend(layout.skipped.into_iter().map(|s| SkippedImage {
        path: staged.original_path(&s.path),
        reason: s.reason,
    }));
    drop(staging);

    let print_error = if options.print {
        print_document(&output_path, config.output.print_command.as_deref())
            .err()
            .map(|e| {
                warn!("{}", e);
                e.to_string()
            })
    } else {
        None
    };

    Ok(ConvertReport {
        output_path,
        pages: summary.pages,
        images_placed: layout.placed,
        skipped,
        print_error,
    })
}

/// Entries handed to the layout, with the collected path each one came from
struct Staged {
    entries: Vec<ImageEntry>,
    originals: Vec<PathBuf>,
    /// Files that could not be copied
    failed: Vec<SkippedImage>,
}

impl Staged {
    fn in_place(collection: &Collection) -> Self {
        Self {
            entries: collection.entries.clone(),
            originals: collection.entries.iter().map(|e| e.path.clone()).collect(),
            failed: Vec::new(),
        }
    }

    fn original_path(&self, path: &Path) -> PathBuf {
        self.entries
            .iter()
            .position(|e| e.path == path)
            .map(|i| self.originals[i].clone())
            .unwrap_or_else(|| path.to_path_buf())
    }
}

/// Copy every image into `dir` as `NNNN-<name>`, keeping caption folders
///
/// A file that cannot be copied is skipped, the rest of the batch goes on.
fn stage_copies(collection: &Collection, dir: &Path) -> Staged {
    let mut staged = Staged {
        entries: Vec::with_capacity(collection.entries.len()),
        originals: Vec::with_capacity(collection.entries.len()),
        failed: Vec::new(),
    };
    for (i, entry) in collection.entries.iter().enumerate() {
        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let destination = dir.join(format!("{:04}-{}", i + 1, name));
        if let Err(e) = fs::copy(&entry.path, &destination) {
            warn!("Cannot access a file: {} ({})", entry.path.display(), e);
            staged.failed.push(SkippedImage {
                path: entry.path.clone(),
                reason: e.to_string(),
            });
            continue;
        }
        staged
            .entries
            .push(ImageEntry::with_folder(destination, entry.containing_folder.clone()));
        staged.originals.push(entry.path.clone());
    }
    staged
}

fn discard_output(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("Could not remove partial output {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stage_copies_avoids_name_clashes() {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("a")).unwrap();
        fs::create_dir_all(src.path().join("b")).unwrap();
        fs::write(src.path().join("a/img.png"), b"one").unwrap();
        fs::write(src.path().join("b/img.png"), b"two").unwrap();

        let collection = Collection {
            entries: vec![
                ImageEntry::new(src.path().join("a/img.png")),
                ImageEntry::new(src.path().join("b/img.png")),
            ],
            captions: Default::default(),
        };
        let scratch = TempDir::new().unwrap();
        let staged = stage_copies(&collection, scratch.path());

        assert_eq!(staged.entries[0].path, scratch.path().join("0001-img.png"));
        assert_eq!(staged.entries[1].path, scratch.path().join("0002-img.png"));
        assert_eq!(fs::read(&staged.entries[1].path).unwrap(), b"two");
        assert_eq!(staged.entries[0].containing_folder, src.path().join("a"));
        assert!(staged.failed.is_empty());
    }

    #[test]
    fn test_stage_copies_skips_unreadable_file() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("a.png"), b"one").unwrap();
        fs::write(src.path().join("c.png"), b"three").unwrap();

        // b.png vanished between collection and staging
        let collection = Collection {
            entries: vec![
                ImageEntry::new(src.path().join("a.png")),
                ImageEntry::new(src.path().join("b.png")),
                ImageEntry::new(src.path().join("c.png")),
            ],
            captions: Default::default(),
        };
        let scratch = TempDir::new().unwrap();
        let staged = stage_copies(&collection, scratch.path());

        assert_eq!(staged.entries.len(), 2);
        assert_eq!(staged.entries[1].path, scratch.path().join("0003-c.png"));
        assert_eq!(staged.failed.len(), 1);
        assert_eq!(staged.failed[0].path, src.path().join("b.png"));
        assert_eq!(
            staged.original_path(&scratch.path().join("0003-c.png")),
            src.path().join("c.png")
        );
    }

    #[test]
    fn test_empty_selection_is_no_images() {
        let out = TempDir::new().unwrap();
        let output = out.path().join("out.pdf");
        let options = ConvertOptions {
            inputs: InputSelection::default(),
            output_path: Some(output.clone()),
            config: Config::default(),
            print: false,
        };
        assert!(matches!(convert(&options), Err(Error::NoImages)));
        assert!(!output.exists());
    }

    #[test]
    fn test_invalid_config_rejected_before_collecting() {
        let mut config = Config::default();
        config.page.images_per_page = 0;
        let options = ConvertOptions {
            inputs: InputSelection::default(),
            output_path: None,
            config,
            print: false,
        };
        assert!(matches!(convert(&options), Err(Error::Config(_))));
    }
}
