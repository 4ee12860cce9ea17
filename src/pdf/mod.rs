//! PDF output module

pub mod render;

// Re-export commonly used items
pub use render::{render_pdf, RenderOptions, RenderSummary};
