//! Caption style and color settings.
//!
//! Styles form a closed enumeration; unknown tags are rejected at the
//! submission boundary rather than at render time.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Available caption style presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptionStyle {
    /// No captions rendered
    #[default]
    None,
    /// White text, black outline
    Classic,
    /// White text on a semi-transparent box
    Boxed,
    /// Yellow text, black outline
    Yellow,
    /// Small light text, no outline
    Minimal,
    /// Large uppercase text, heavy outline
    Bold,
    /// Word-by-word highlight following speech
    Karaoke,
    /// Magenta text with glow
    Neon,
    /// Gradient-tinted text
    Gradient,
}

impl CaptionStyle {
    pub const ALL: &'static [CaptionStyle] = &[
        CaptionStyle::None,
        CaptionStyle::Classic,
        CaptionStyle::Boxed,
        CaptionStyle::Yellow,
        CaptionStyle::Minimal,
        CaptionStyle::Bold,
        CaptionStyle::Karaoke,
        CaptionStyle::Neon,
        CaptionStyle::Gradient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionStyle::None => "none",
            CaptionStyle::Classic => "classic",
            CaptionStyle::Boxed => "boxed",
            CaptionStyle::Yellow => "yellow",
            CaptionStyle::Minimal => "minimal",
            CaptionStyle::Bold => "bold",
            CaptionStyle::Karaoke => "karaoke",
            CaptionStyle::Neon => "neon",
            CaptionStyle::Gradient => "gradient",
        }
    }

    /// Whether this style highlights individual words and therefore wants
    /// word-level timestamps.
    pub fn requires_word_timing(&self) -> bool {
        matches!(self, CaptionStyle::Karaoke)
    }
}

impl fmt::Display for CaptionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CaptionStyle {
    type Err = CaptionStyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(CaptionStyle::None),
            "classic" => Ok(CaptionStyle::Classic),
            "boxed" => Ok(CaptionStyle::Boxed),
            "yellow" => Ok(CaptionStyle::Yellow),
            "minimal" => Ok(CaptionStyle::Minimal),
            "bold" => Ok(CaptionStyle::Bold),
            "karaoke" => Ok(CaptionStyle::Karaoke),
            "neon" => Ok(CaptionStyle::Neon),
            "gradient" => Ok(CaptionStyle::Gradient),
            _ => Err(CaptionStyleParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown caption style: {0}")]
pub struct CaptionStyleParseError(pub String);

/// An RGB color parsed from a `#RRGGBB` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const WHITE: HexColor = HexColor { r: 255, g: 255, b: 255 };
    pub const BLACK: HexColor = HexColor { r: 0, g: 0, b: 0 };
    pub const YELLOW: HexColor = HexColor { r: 255, g: 255, b: 0 };
    pub const MAGENTA: HexColor = HexColor { r: 255, g: 0, b: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#RRGGBB` (or `RRGGBB`) string.
    pub fn parse(s: &str) -> Result<Self, CaptionColorError> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CaptionColorError(s.to_string()));
        }
        let r = u8::from_str_radix(&hex[0..2], 16).map_err(|_| CaptionColorError(s.to_string()))?;
        let g = u8::from_str_radix(&hex[2..4], 16).map_err(|_| CaptionColorError(s.to_string()))?;
        let b = u8::from_str_radix(&hex[4..6], 16).map_err(|_| CaptionColorError(s.to_string()))?;
        Ok(Self { r, g, b })
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for HexColor {
    type Error = CaptionColorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<HexColor> for String {
    fn from(c: HexColor) -> String {
        c.to_string()
    }
}

#[derive(Debug, Error)]
#[error("Malformed hex color: {0}, expected '#RRGGBB'")]
pub struct CaptionColorError(pub String);

/// Caption options attached to a submission.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct CaptionSettings {
    /// Whether captions are rendered at all
    #[serde(default = "default_include_captions")]
    pub include_captions: bool,

    /// Chosen preset
    #[serde(default)]
    pub style: CaptionStyle,

    /// Optional text color override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<HexColor>,

    /// Optional outline color override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline_color: Option<HexColor>,
}

fn default_include_captions() -> bool {
    true
}

impl CaptionSettings {
    /// Whether the pipeline should render captions for this job.
    pub fn enabled(&self) -> bool {
        self.include_captions && self.style != CaptionStyle::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parse() {
        assert_eq!("karaoke".parse::<CaptionStyle>().unwrap(), CaptionStyle::Karaoke);
        assert_eq!("CLASSIC".parse::<CaptionStyle>().unwrap(), CaptionStyle::Classic);
        assert!("sparkle".parse::<CaptionStyle>().is_err());
    }

    #[test]
    fn test_all_nine_styles() {
        assert_eq!(CaptionStyle::ALL.len(), 9);
        for style in CaptionStyle::ALL {
            assert_eq!(style.as_str().parse::<CaptionStyle>().unwrap(), *style);
        }
    }

    #[test]
    fn test_hex_color_parse() {
        assert_eq!(HexColor::parse("#FFFFFF").unwrap(), HexColor::WHITE);
        assert_eq!(HexColor::parse("ff00ff").unwrap(), HexColor::MAGENTA);
        assert!(HexColor::parse("#FFF").is_err());
        assert!(HexColor::parse("#GGHHII").is_err());
        assert!(HexColor::parse("").is_err());
    }

    #[test]
    fn test_hex_color_serde() {
        let c: HexColor = serde_json::from_str("\"#1A2B3C\"").unwrap();
        assert_eq!(c, HexColor::new(0x1A, 0x2B, 0x3C));
        assert!(serde_json::from_str::<HexColor>("\"nope\"").is_err());
    }

    #[test]
    fn test_settings_enabled() {
        let mut settings = CaptionSettings {
            include_captions: true,
            style: CaptionStyle::Classic,
            color: None,
            outline_color: None,
        };
        assert!(settings.enabled());

        settings.style = CaptionStyle::None;
        assert!(!settings.enabled());

        settings.style = CaptionStyle::Bold;
        settings.include_captions = false;
        assert!(!settings.enabled());
    }
}
