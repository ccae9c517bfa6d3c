//! Type definitions for the layout data model

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RenderError, RenderResult};

/// Bundled fallback layout, used when a caller has no stored template.
const DEFAULT_LAYOUT: &str = include_str!("../templates/default.json");

/// A complete layout document: ordered sections plus a footer.
///
/// Layouts are immutable inputs. One is loaded per render invocation and
/// never mutated by the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub sections: Vec<Section>,
    pub footer: Footer,
}

impl Layout {
    /// Parse a layout from its JSON representation.
    ///
    /// Missing required keys (`sections`, `footer`) fail here, before
    /// any drawing happens, so an error never yields a partial document.
    pub fn from_json(json: &str) -> RenderResult<Self> {
        serde_json::from_str(json).map_err(|e| RenderError::MalformedLayout(e.to_string()))
    }

    /// The bundled default layout for a generic medical record printout.
    pub fn fallback() -> RenderResult<Self> {
        Self::from_json(DEFAULT_LAYOUT)
    }
}

/// One titled section of a layout, containing a grid of blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub title: LocalizedText,
    pub grid: Grid,
}

/// Grid descriptor: `items` render left-to-right, top-to-bottom,
/// wrapping to a new row every `columns` items.
///
/// Items stay raw JSON here; they are converted to typed blocks at
/// dispatch time so a bad item can be reported with its section and
/// index instead of failing the whole parse anonymously.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub columns: u32,
    pub items: Vec<Value>,
}

/// Layout footer, drawn after the last section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footer {
    pub text: LocalizedText,
}

/// A text field that is either a plain string or a locale → string map.
///
/// The map keeps insertion order (see `preserve_order` on serde_json),
/// so the first-entry fallback is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    ByLocale(serde_json::Map<String, Value>),
}

impl LocalizedText {
    /// Pick the entry for `locale`, falling back to the map's first
    /// entry in insertion order. Plain strings ignore the locale.
    pub fn for_locale(&self, locale: &str) -> &str {
        match self {
            LocalizedText::Plain(s) => s,
            LocalizedText::ByLocale(map) => map
                .get(locale)
                .and_then(|v| v.as_str())
                .or_else(|| map.values().next().and_then(|v| v.as_str()))
                .unwrap_or(""),
        }
    }
}

impl From<&str> for LocalizedText {
    fn from(s: &str) -> Self {
        LocalizedText::Plain(s.to_string())
    }
}

/// RGB color, 0–255 per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    /// Default fill for colored boxes.
    pub const fn light_gray() -> Self {
        Self::rgb(230, 230, 230)
    }

    /// Parse a `[r, g, b]` JSON triple. Channels are clamped to 0–255.
    pub fn from_triple(value: &Value) -> Option<Self> {
        let arr = value.as_array()?;
        if arr.len() != 3 {
            return None;
        }
        let channel = |v: &Value| -> Option<u8> {
            let n = v.as_f64()?;
            Some(n.clamp(0.0, 255.0) as u8)
        };
        Some(Self {
            r: channel(&arr[0])?,
            g: channel(&arr[1])?,
            b: channel(&arr[2])?,
        })
    }
}

/// Page geometry and typography for a render call.
///
/// All lengths are millimeters. The defaults describe an A4 page with a
/// 15 mm margin, which puts the usable content width at 180 mm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageOptions {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    /// Height of one text line in millimeters.
    pub line_height: f64,
    /// Body font size in points.
    pub body_font_size: f64,
    /// Section heading font size in points.
    pub heading_font_size: f64,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 15.0,
            line_height: 6.0,
            body_font_size: 10.0,
            heading_font_size: 12.0,
        }
    }
}

impl PageOptions {
    /// Usable width between the left and right margins.
    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }
}
