//! Pagination of an ordered image sequence into layout blocks
//!
//! The [`PageLayout`] engine walks [`ImageEntry`] values in order and emits
//! [`LayoutBlock`]s: an optional folder caption, a spacer, the scaled image,
//! another spacer, and a page break whenever the last slot of a page is
//! filled. Images that cannot be decoded are skipped and do not occupy a slot.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use image::ImageReader;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::layout::LayoutPolicy;

/// One image to place, with the folder it was found in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// File the pixels are read from
    pub path: PathBuf,
    /// Folder used for caption lookup
    pub containing_folder: PathBuf,
}

impl ImageEntry {
    /// Entry whose caption folder is the file's parent directory
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let containing_folder = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self { path, containing_folder }
    }

    /// Entry that reads pixels from `path` but takes its caption from `folder`
    pub fn with_folder(path: impl Into<PathBuf>, folder: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            containing_folder: folder.into(),
        }
    }
}

/// Caption text per folder, at most one per folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderCaptions {
    captions: HashMap<PathBuf, String>,
}

impl FolderCaptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the caption for a folder, replacing any previous one
    pub fn insert(&mut self, folder: impl Into<PathBuf>, caption: impl Into<String>) {
        self.captions.insert(folder.into(), caption.into());
    }

    pub fn get(&self, folder: &Path) -> Option<&str> {
        self.captions.get(folder).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }

    /// Iterate over (folder, caption) pairs sorted by folder
    pub fn iter_sorted(&self) -> Vec<(&Path, &str)> {
        let mut pairs: Vec<(&Path, &str)> = self
            .captions
            .iter()
            .map(|(k, v)| (k.as_path(), v.as_str()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
    }
}

/// One atomic unit of page content, in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutBlock {
    /// Heading text for a folder
    Caption(String),
    /// Vertical white space in inches
    Spacer(f64),
    /// Image drawn at the given size in points
    ScaledImage {
        path: PathBuf,
        width: f64,
        height: f64,
    },
    /// Subsequent content starts on a new page
    PageBreak,
}

/// An entry that was left out of the layout
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedImage {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of a layout pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub blocks: Vec<LayoutBlock>,
    /// Number of images that produced a `ScaledImage` block
    pub placed: usize,
    pub skipped: Vec<SkippedImage>,
}

impl Layout {
    /// True if at least one image was placed
    pub fn has_images(&self) -> bool {
        self.placed > 0
    }

    pub fn page_breaks(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, LayoutBlock::PageBreak))
            .count()
    }
}

/// Reads the pixel dimensions of an image file
pub trait DimensionProbe {
    /// Returns (width, height) in pixels
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)>;
}

/// Probe that fully decodes the file, so truncated or corrupt content is
/// rejected before it reaches the renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodingProbe;

impl DimensionProbe for DecodingProbe {
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok((img.width(), img.height()))
    }
}

/// Pagination engine
///
/// Owns the set of folders whose caption has already been emitted, so a
/// caption appears at most once across every [`PageLayout::layout`] call made
/// on the same engine.
pub struct PageLayout<'a, P: DimensionProbe = DecodingProbe> {
    policy: &'a LayoutPolicy,
    captions: &'a FolderCaptions,
    probe: P,
    emitted: HashSet<PathBuf>,
    next_index: usize,
}

impl<'a> PageLayout<'a, DecodingProbe> {
    pub fn new(policy: &'a LayoutPolicy, captions: &'a FolderCaptions) -> Self {
        Self::with_probe(policy, captions, DecodingProbe)
    }
}

impl<'a, P: DimensionProbe> PageLayout<'a, P> {
    pub fn with_probe(policy: &'a LayoutPolicy, captions: &'a FolderCaptions, probe: P) -> Self {
        Self {
            policy,
            captions,
            probe,
            emitted: HashSet::new(),
            next_index: 1,
        }
    }

    /// Folders whose caption has been emitted so far
    pub fn emitted_captions(&self) -> &HashSet<PathBuf> {
        &self.emitted
    }

    /// Lay out `entries` in order
    pub fn layout(&mut self, entries: &[ImageEntry]) -> Layout {
        let mut layout = Layout::default();
        let target_width = self.policy.target_width();

        for entry in entries {
            let (width, height) = match self.probe_entry(entry) {
                Ok(dims) => dims,
                Err(e) => {
                    warn!("Cannot access a file: {} ({})", entry.path.display(), e);
                    layout.skipped.push(SkippedImage {
                        path: entry.path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let index = self.next_index;
            info!(
                "Adding {} to pdf document ({}x{} px)",
                entry.path.display(),
                width,
                height
            );

            if self.policy.captions_enabled {
                if let Some(caption) = self.take_caption(&entry.containing_folder) {
                    layout.blocks.push(LayoutBlock::Caption(caption));
                }
            }

            let spacers = self.policy.spacing.for_slot(self.policy.slot_for(index));
            layout.blocks.push(LayoutBlock::Spacer(spacers.before));
            layout.blocks.push(LayoutBlock::ScaledImage {
                path: entry.path.clone(),
                width: target_width,
                height: target_width * (height as f64 / width as f64),
            });
            layout.blocks.push(LayoutBlock::Spacer(spacers.after));

            if self.policy.ends_page(index) {
                layout.blocks.push(LayoutBlock::PageBreak);
            }

            self.next_index += 1;
            layout.placed += 1;
        }

        debug!(
            placed = layout.placed,
            skipped = layout.skipped.len(),
            "layout pass finished"
        );
        layout
    }

    fn probe_entry(&self, entry: &ImageEntry) -> Result<(u32, u32)> {
        let (width, height) = self.probe.dimensions(&entry.path)?;
        if width == 0 || height == 0 {
            return Err(Error::General(format!("image has zero size ({}x{})", width, height)));
        }
        Ok((width, height))
    }

    fn take_caption(&mut self, folder: &Path) -> Option<String> {
        if self.emitted.contains(folder) {
            return None;
        }
        let caption = self.captions.get(folder)?.to_string();
        self.emitted.insert(folder.to_path_buf());
        Some(caption)
    }
}

/// Lay out `entries` with a fresh engine
pub fn layout_images(
    entries: &[ImageEntry],
    captions: &FolderCaptions,
    policy: &LayoutPolicy,
) -> Layout {
    PageLayout::new(policy, captions).layout(entries)
}
