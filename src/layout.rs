//! Page geometry and the sizing/spacing policy used by the paginator

use serde::{Deserialize, Serialize};

/// Points per inch, the PDF user-space unit
pub const POINTS_PER_INCH: f64 = 72.0;

/// Scale factor that makes an image fill most of an A4 page width
pub const SCALE_FULL_A4: f64 = 2.3;

/// Scale factor that leaves some white space around images on A4
pub const SCALE_SPACED_A4: f64 = 2.0;

/// Default white space before and after each image, in inches
pub const DEFAULT_SPACE_INCHES: f64 = 0.45;

/// Simple length type in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from millimeters
    pub fn from_mm(mm: f64) -> Self {
        Length(mm)
    }

    /// Create a length from inches
    pub fn from_inches(inches: f64) -> Self {
        Length(inches * 25.4)
    }

    /// Create a length from points (1/72 inch)
    pub fn from_pt(pt: f64) -> Self {
        Length(pt * 25.4 / POINTS_PER_INCH)
    }

    /// Get the value in millimeters
    pub fn mm(&self) -> f64 {
        self.0
    }

    /// Get the value in points (1/72 inch)
    pub fn pt(&self) -> f64 {
        self.0 * POINTS_PER_INCH / 25.4
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self {
            width: Length::from_mm(215.9),
            height: Length::from_mm(279.4),
        }
    }

    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self {
            width: Length::from_mm(210.0),
            height: Length::from_mm(297.0),
        }
    }

    /// Custom page size in millimeters
    pub fn from_mm(width: f64, height: f64) -> Self {
        Self {
            width: Length::from_mm(width),
            height: Length::from_mm(height),
        }
    }
}

impl Default for PageDimensions {
    fn default() -> Self {
        Self::a4()
    }
}

/// Named scale presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalePreset {
    /// Images occupy most of the page width
    Full,
    /// Images leave white space at the sides
    Spaced,
}

/// Multiplier applied to the physical page width (mm) to get the target
/// image width in points.
///
/// In a config file this is either `"full"`, `"spaced"` or a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scale {
    Preset(ScalePreset),
    Factor(f64),
}

impl Scale {
    pub fn factor(&self) -> f64 {
        match self {
            Scale::Preset(ScalePreset::Full) => SCALE_FULL_A4,
            Scale::Preset(ScalePreset::Spaced) => SCALE_SPACED_A4,
            Scale::Factor(f) => *f,
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Preset(ScalePreset::Full)
    }
}

/// Space before and after one image, in inches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpacerPair {
    pub before: f64,
    pub after: f64,
}

impl SpacerPair {
    pub fn new(before: f64, after: f64) -> Self {
        Self { before, after }
    }
}

/// Spacing variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum Spacing {
    /// Same spacers around every image regardless of its slot
    Uniform { before: f64, after: f64 },
    /// `first` applies to the first image on a page, `rest` to every other slot
    Differentiated { first: SpacerPair, rest: SpacerPair },
}

impl Spacing {
    /// Spacers for an image in the given 1-based slot on its page
    pub fn for_slot(&self, slot: usize) -> SpacerPair {
        match *self {
            Spacing::Uniform { before, after } => SpacerPair::new(before, after),
            Spacing::Differentiated { first, rest } => {
                if slot == 1 {
                    first
                } else {
                    rest
                }
            }
        }
    }

    /// Differentiated spacing where only the first image on a page gets
    /// space above it
    pub fn leading_only(space: f64) -> Self {
        Spacing::Differentiated {
            first: SpacerPair::new(space, space),
            rest: SpacerPair::new(0.0, space),
        }
    }

    fn pairs(&self) -> Vec<SpacerPair> {
        match *self {
            Spacing::Uniform { before, after } => vec![SpacerPair::new(before, after)],
            Spacing::Differentiated { first, rest } => vec![first, rest],
        }
    }

    /// True if any spacer value is negative or not finite
    pub fn has_invalid_values(&self) -> bool {
        self.pairs().iter().any(|p| {
            !p.before.is_finite() || !p.after.is_finite() || p.before < 0.0 || p.after < 0.0
        })
    }
}

impl Default for Spacing {
    fn default() -> Self {
        Spacing::Uniform {
            before: DEFAULT_SPACE_INCHES,
            after: DEFAULT_SPACE_INCHES,
        }
    }
}

/// Everything the paginator needs to decide block sizes and page breaks
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPolicy {
    pub page: PageDimensions,
    pub scale: Scale,
    pub spacing: Spacing,
    pub images_per_page: usize,
    pub captions_enabled: bool,
}

impl LayoutPolicy {
    /// Width every image is scaled to, in points
    pub fn target_width(&self) -> f64 {
        self.page.width.mm() * self.scale.factor()
    }

    /// 1-based slot on the page for the `index`-th placed image (1-based)
    pub fn slot_for(&self, index: usize) -> usize {
        let per_page = self.images_per_page.max(1);
        (index - 1) % per_page + 1
    }

    /// True if the `index`-th placed image fills the last slot on its page
    pub fn ends_page(&self, index: usize) -> bool {
        index % self.images_per_page.max(1) == 0
    }
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self {
            page: PageDimensions::a4(),
            scale: Scale::default(),
            spacing: Spacing::default(),
            images_per_page: 2,
            captions_enabled: true,
        }
    }
}
