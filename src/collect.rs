//! Gathering image files and folder captions
//!
//! Directory roots are searched recursively; explicit files (and glob patterns)
//! are taken as given. Everything is filtered by file-name suffix, and every
//! folder that contributes an image is checked for a caption file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::paginate::{FolderCaptions, ImageEntry};

/// Recognized image suffixes
pub const DEFAULT_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".bmp", ".tiff", ".gif"];

/// Caption file looked up directly inside each image folder
pub const DEFAULT_CAPTION_FILE: &str = "description.txt";

/// Where to look for images
#[derive(Debug, Clone, Default)]
pub struct InputSelection {
    /// Searched recursively
    pub directories: Vec<PathBuf>,
    /// Explicit files; entries containing `*`, `?` or `[` are glob patterns
    pub files: Vec<String>,
}

impl InputSelection {
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }
}

/// Filtering and caption lookup settings
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Suffixes such as `.jpg`; a missing leading dot is added
    pub extensions: Vec<String>,
    /// Match suffixes case-insensitively
    pub ignore_case: bool,
    /// Caption file name, or `None` to skip caption lookup
    pub caption_file: Option<String>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            ignore_case: false,
            caption_file: Some(DEFAULT_CAPTION_FILE.to_string()),
        }
    }
}

impl CollectOptions {
    /// Whether the file name of `path` ends with a recognized suffix
    pub fn is_image_path(&self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return false,
        };
        self.extensions.iter().any(|ext| {
            let ext = normalize_extension(ext);
            if self.ignore_case {
                name.to_lowercase().ends_with(&ext.to_lowercase())
            } else {
                name.ends_with(&ext)
            }
        })
    }
}

fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{}", ext)
    }
}

/// Images in processing order plus the captions of their folders
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub entries: Vec<ImageEntry>,
    pub captions: FolderCaptions,
}

impl Collection {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collect images from directory roots first, then explicit files
///
/// Missing roots, missing explicit files, and unmatched glob patterns are
/// errors. Files with unrecognized suffixes are dropped.
pub fn collect_images(selection: &InputSelection, options: &CollectOptions) -> Result<Collection> {
    let mut entries = Vec::new();

    for dir in &selection.directories {
        if !dir.is_dir() {
            return Err(Error::DirectoryNotFound(dir.clone()));
        }
        for path in walk_directory(dir) {
            if options.is_image_path(&path) {
                entries.push(ImageEntry::new(path));
            } else {
                debug!("Ignoring non-image file {}", path.display());
            }
        }
    }

    for path in expand_globs(&selection.files)? {
        if !path.exists() {
            return Err(Error::FileNotFound(path));
        }
        if !path.is_file() {
            return Err(Error::NotAFile(path));
        }
        if options.is_image_path(&path) {
            entries.push(ImageEntry::new(path));
        } else {
            warn!("Skipping {}: not a recognized image extension", path.display());
        }
    }

    let captions = match options.caption_file.as_deref() {
        Some(name) => collect_captions(&entries, name),
        None => FolderCaptions::new(),
    };

    Ok(Collection { entries, captions })
}

/// Regular files under `root`, depth-first, sorted by name within a directory
fn walk_directory(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry under {}: {}", root.display(), e),
        }
    }
    files
}

/// Expand glob patterns, keeping literal paths as they are
pub fn expand_globs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = Vec::new();
            let entries = glob(pattern).map_err(|e| Error::InvalidGlob(format!("{}: {}", pattern, e)))?;
            for entry in entries {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => warn!("glob error for {}: {}", pattern, e),
                }
            }
            if matched.is_empty() {
                return Err(Error::NoFilesMatched(pattern.clone()));
            }
            // Pattern matches are sorted; explicit order is kept between arguments
            matched.sort();
            paths.extend(matched);
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    Ok(paths)
}

/// Read the caption file of every folder that contributed an image
fn collect_captions(entries: &[ImageEntry], caption_file: &str) -> FolderCaptions {
    let mut captions = FolderCaptions::new();
    let mut seen = HashSet::new();

    for entry in entries {
        if !seen.insert(entry.containing_folder.clone()) {
            continue;
        }
        if let Some(text) = read_caption(&entry.containing_folder, caption_file) {
            captions.insert(entry.containing_folder.clone(), text);
        }
    }

    captions
}

/// Caption text from `folder/caption_file`, if present and readable
///
/// Unreadable or empty files yield `None`.
pub fn read_caption(folder: &Path, caption_file: &str) -> Option<String> {
    let path = folder.join(caption_file);
    if !path.is_file() {
        return None;
    }
    match fs::read_to_string(&path) {
        Ok(text) => {
            let text = text.trim_end_matches(['\r', '\n']);
            if text.trim().is_empty() {
                None
            } else {
                Some(text.to_string())
            }
        }
        Err(e) => {
            debug!("Omitting caption {}: {}", path.display(), e);
            None
        }
    }
}
