//! Text metrics and bounding boxes
//!
//! Autosizing is cosmetic and best-effort: the width of a one-glyph probe
//! stands in for every character, which is exact only for monospace fonts.

use crate::element::Element;
use serde::{Deserialize, Serialize};

/// Font size assumed when a text element carries none
pub const DEFAULT_FONT_SIZE: f64 = 20.0;

/// Glyph measurement backend
pub trait TextMetrics: Send + Sync {
    /// Rendered width of a single glyph at `font_size`
    fn probe_width(&self, font_size: f64) -> f64;
}

/// Fixed advance per glyph, proportional to the font size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMetrics {
    /// Glyph advance as a fraction of the font size
    pub advance: f64,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMetrics for MonospaceMetrics {
    fn probe_width(&self, font_size: f64) -> f64 {
        font_size * self.advance
    }
}

/// Text reflow settings applied when a macro rewrites a text element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextLayout {
    /// Shrink the font so the longest line fits the element width
    pub autosize: bool,
    /// Line height factor used when the element has none
    pub line_height: f64,
    /// Autosize never goes below this
    pub min_font_size: f64,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            autosize: true,
            line_height: 1.25,
            min_font_size: 8.0,
        }
    }
}

impl TextLayout {
    /// Fit the element's current text inside its width
    ///
    /// Width is never modified. The font only shrinks; height follows the
    /// line count.
    pub fn reflow(&self, element: &mut Element, metrics: &dyn TextMetrics) {
        if !self.autosize {
            return;
        }
        let font_size = element.font_size.unwrap_or(DEFAULT_FONT_SIZE);
        let glyph = metrics.probe_width(font_size);
        if glyph <= 0.0 || !glyph.is_finite() {
            return;
        }

        let text = element.text_str();
        let longest = text.lines().map(|line| line.chars().count()).max().unwrap_or(0);
        let lines = text.lines().count().max(1);

        let needed = glyph * longest as f64;
        let fitted = if element.width > 0.0 && needed > element.width {
            (font_size * element.width / needed).max(self.min_font_size)
        } else {
            font_size
        };

        let factor = element.line_height.unwrap_or(self.line_height);
        element.font_size = Some(fitted);
        element.height = lines as f64 * fitted * factor;
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Box of a single element
    #[must_use]
    pub fn of(element: &Element) -> Self {
        Self {
            min_x: element.x,
            min_y: element.y,
            max_x: element.x + element.width,
            max_y: element.y + element.height,
        }
    }

    /// Union of all element boxes; `None` for an empty set
    pub fn union_of<'e>(elements: impl IntoIterator<Item = &'e Element>) -> Option<Self> {
        elements
            .into_iter()
            .map(Self::of)
            .reduce(|acc, next| Self {
                min_x: acc.min_x.min(next.min_x),
                min_y: acc.min_y.min(next.min_y),
                max_x: acc.max_x.max(next.max_x),
                max_y: acc.max_y.max(next.max_y),
            })
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}
