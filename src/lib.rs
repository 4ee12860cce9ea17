//! Image Handouts Library
//!
//! A cross-platform library for turning folders of images into a printable PDF.
//! This library provides functionality to:
//! - Collect images recursively from directories or explicit paths
//! - Read per-folder caption files
//! - Paginate images a fixed number per page with consistent spacing
//! - Render the layout into a zero-margin PDF
//! - Send the result to the default printer
//!
//! # Example
//!
//! ```no_run
//! use img_handouts::collect::{collect_images, CollectOptions, InputSelection};
//! use img_handouts::layout::LayoutPolicy;
//! use img_handouts::paginate::layout_images;
//! use img_handouts::pdf::{render_pdf, RenderOptions};
//! use std::path::{Path, PathBuf};
//!
//! let selection = InputSelection {
//!     directories: vec![PathBuf::from("photos")],
//!     files: vec![],
//! };
//! let collection = collect_images(&selection, &CollectOptions::default())
//!     .expect("Failed to collect images");
//!
//! let layout = layout_images(&collection.entries, &collection.captions, &LayoutPolicy::default());
//! if layout.has_images() {
//!     render_pdf(&layout.blocks, Path::new("photos.pdf"), &RenderOptions::default())
//!         .expect("Failed to render PDF");
//! }
//! ```

pub mod error;
pub mod layout;
pub mod paginate;
pub mod collect;
pub mod config;
pub mod pdf;
pub mod print;
pub mod convert;

// Re-export commonly used items
pub use error::{Error, Result};
pub use config::Config;
pub use convert::{convert, ConvertOptions, ConvertReport};
pub use paginate::{FolderCaptions, ImageEntry, Layout, LayoutBlock, PageLayout};
