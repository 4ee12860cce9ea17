//! Configuration file support
//!
//! Every knob of the layout can be set from a TOML file. All keys are
//! optional and unknown keys are rejected:
//!
//! ```toml
//! [page]
//! size = "a4"              # "a4" or "letter"
//! # width_mm = 210.0       # overrides `size` when both are given
//! # height_mm = 297.0
//! scale = "full"           # "full", "spaced" or a number
//! images_per_page = 2
//!
//! [spacing]
//! variant = "uniform"      # or "differentiated" with `first`/`rest` pairs
//! before = 0.45            # inches
//! after = 0.45
//!
//! [captions]
//! enabled = true
//! file_name = "description.txt"
//! font_size = 18.0
//!
//! [collect]
//! extensions = [".jpg", ".jpeg", ".png", ".bmp", ".tiff", ".gif"]
//! ignore_extension_case = false
//! stage_copies = true
//!
//! [output]
//! # path = "~/workout.pdf"
//! # title = "Workout"
//! # print_command = ["lpr", "-P", "office"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::collect::{CollectOptions, DEFAULT_CAPTION_FILE, DEFAULT_EXTENSIONS};
use crate::error::{Error, Result};
use crate::layout::{LayoutPolicy, PageDimensions, Scale, Spacing};

/// Default output file name, placed in the home directory
pub const DEFAULT_OUTPUT_NAME: &str = "workout.pdf";

/// Named page sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    A4,
    Letter,
}

impl PageSize {
    pub fn dimensions(&self) -> PageDimensions {
        match self {
            PageSize::A4 => PageDimensions::a4(),
            PageSize::Letter => PageDimensions::letter(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageConfig {
    pub size: PageSize,
    pub width_mm: Option<f64>,
    pub height_mm: Option<f64>,
    pub scale: Scale,
    pub images_per_page: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            width_mm: None,
            height_mm: None,
            scale: Scale::default(),
            images_per_page: 2,
        }
    }
}

impl PageConfig {
    /// Page size after applying explicit width/height overrides
    pub fn dimensions(&self) -> PageDimensions {
        let base = self.size.dimensions();
        PageDimensions::from_mm(
            self.width_mm.unwrap_or(base.width.mm()),
            self.height_mm.unwrap_or(base.height.mm()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionConfig {
    pub enabled: bool,
    pub file_name: String,
    /// Heading size in points
    pub font_size: f32,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: DEFAULT_CAPTION_FILE.to_string(),
            font_size: 18.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectConfig {
    pub extensions: Vec<String>,
    pub ignore_extension_case: bool,
    /// Copy images into a scratch directory before reading them
    pub stage_copies: bool,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            ignore_extension_case: false,
            stage_copies: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub path: Option<PathBuf>,
    pub title: Option<String>,
    /// Program and leading arguments; the PDF path is appended
    pub print_command: Option<Vec<String>>,
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub page: PageConfig,
    pub spacing: Spacing,
    pub captions: CaptionConfig,
    pub collect: CollectConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the layout cannot work with
    pub fn validate(&self) -> Result<()> {
        let page = self.page.dimensions();
        let (width, height) = (page.width.mm(), page.height.mm());
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(Error::Config(format!(
                "page width and height must be positive, got {}x{} mm",
                width, height
            )));
        }
        let scale = self.page.scale.factor();
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::Config(format!("scale must be positive, got {}", scale)));
        }
        if self.page.images_per_page == 0 {
            return Err(Error::Config("images_per_page must be at least 1".to_string()));
        }
        if self.spacing.has_invalid_values() {
            return Err(Error::Config("spacer values must be non-negative".to_string()));
        }
        if self.collect.extensions.is_empty() {
            return Err(Error::Config("at least one image extension is required".to_string()));
        }
        if self.captions.file_name.trim().is_empty() {
            return Err(Error::Config("caption file name must not be empty".to_string()));
        }
        if !(self.captions.font_size.is_finite() && self.captions.font_size > 0.0) {
            return Err(Error::Config("caption font size must be positive".to_string()));
        }
        Ok(())
    }

    pub fn layout_policy(&self) -> LayoutPolicy {
        LayoutPolicy {
            page: self.page.dimensions(),
            scale: self.page.scale,
            spacing: self.spacing,
            images_per_page: self.page.images_per_page,
            captions_enabled: self.captions.enabled,
        }
    }

    pub fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            extensions: self.collect.extensions.clone(),
            ignore_case: self.collect.ignore_extension_case,
            caption_file: self
                .captions
                .enabled
                .then(|| self.captions.file_name.clone()),
        }
    }

    /// Configured output path, or `~/workout.pdf`
    pub fn output_path(&self) -> PathBuf {
        match &self.output.path {
            Some(path) => expand_home(path),
            None => default_output_path(),
        }
    }
}

/// `~/workout.pdf`, or `./workout.pdf` when there is no home directory
pub fn default_output_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_OUTPUT_NAME)
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map(|home| home.join(rest)).unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ScalePreset, SpacerPair};
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        config.validate().unwrap();
        let policy = config.layout_policy();
        assert_eq!(policy.images_per_page, 2);
        assert!((policy.target_width() - 483.0).abs() < 1e-9);
        assert_eq!(policy.spacing, Spacing::default());
        assert_eq!(
            config.collect_options().caption_file.as_deref(),
            Some("description.txt")
        );
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml(
            r#"
[page]
size = "letter"
scale = "spaced"
images_per_page = 3

[captions]
file_name = "desc.txt"
"#,
        )
        .unwrap();
        assert_eq!(config.page.size, PageSize::Letter);
        assert_eq!(config.page.scale, Scale::Preset(ScalePreset::Spaced));
        assert_eq!(config.layout_policy().images_per_page, 3);
        assert_eq!(config.captions.file_name, "desc.txt");
        // Untouched sections keep defaults
        assert_eq!(config.collect, CollectConfig::default());
    }

    #[test]
    fn test_numeric_scale_and_custom_page() {
        let config = Config::from_toml(
            r#"
[page]
width_mm = 100.0
scale = 1.5
"#,
        )
        .unwrap();
        let policy = config.layout_policy();
        assert_eq!(policy.page.width.mm(), 100.0);
        assert_eq!(policy.page.height.mm(), 297.0);
        assert!((policy.target_width() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_differentiated_spacing() {
        let config = Config::from_toml(
            r#"
[spacing]
variant = "differentiated"
first = { before = 0.45, after = 0.45 }
rest = { before = 0.0, after = 0.3 }
"#,
        )
        .unwrap();
        assert_eq!(
            config.spacing,
            Spacing::Differentiated {
                first: SpacerPair::new(0.45, 0.45),
                rest: SpacerPair::new(0.0, 0.3),
            }
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = Config::from_toml("[page]\ncolour = \"red\"\n");
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for toml in [
            "[page]\nimages_per_page = 0\n",
            "[page]\nscale = -1.0\n",
            "[page]\nwidth_mm = 0.0\n",
            "[page]\nwidth_mm = inf\n",
            "[page]\nheight_mm = nan\n",
            "[captions]\nfont_size = inf\n",
            "[spacing]\nvariant = \"uniform\"\nbefore = -0.1\nafter = 0.0\n",
            "[collect]\nextensions = []\n",
            "[captions]\nfont_size = 0.0\n",
        ] {
            let result = Config::from_toml(toml);
            assert!(matches!(result, Err(Error::Config(_))), "accepted: {}", toml);
        }
    }

    #[test]
    fn test_captions_disabled_skips_lookup() {
        let config = Config::from_toml("[captions]\nenabled = false\n").unwrap();
        assert!(config.collect_options().caption_file.is_none());
        assert!(!config.layout_policy().captions_enabled);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("img-handouts.toml");
        fs::write(&path, "[output]\npath = \"/tmp/out.pdf\"\ntitle = \"Album\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.output_path(), PathBuf::from("/tmp/out.pdf"));
        assert_eq!(config.output.title.as_deref(), Some("Album"));

        let missing = Config::load(&tmp.path().join("nope.toml"));
        assert!(matches!(missing, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_default_output_path() {
        let path = Config::default().output_path();
        assert_eq!(path.file_name().unwrap(), DEFAULT_OUTPUT_NAME);
    }
}
