//! Per-style rendering presets.
//!
//! The default color, outline, background, and casing tables for each of
//! the nine styles, plus override resolution from a submission's settings.

use serde::{Deserialize, Serialize};

use oshorts_models::{CaptionSettings, CaptionStyle, HexColor};

use crate::error::{CaptionError, CaptionResult};

/// Relative font weight the encoder should select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    Light,
    Normal,
    Bold,
}

/// Text casing transform applied before layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextCase {
    AsIs,
    Upper,
    Lower,
}

/// Fully resolved rendering parameters for one caption track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylePreset {
    pub style: CaptionStyle,
    /// Font scale relative to the base caption size.
    pub font_scale: f64,
    pub color: HexColor,
    pub outline_color: Option<HexColor>,
    pub outline_thickness: u32,
    /// Background fill behind the text block, with alpha (0-255).
    pub background: Option<(HexColor, u8)>,
    /// Active-word color for word-highlight styles.
    pub highlight_color: Option<HexColor>,
    /// Gradient endpoints for tinted styles.
    pub gradient: Option<(HexColor, HexColor)>,
    pub glow: bool,
    pub weight: FontWeight,
    pub case: TextCase,
}

impl StylePreset {
    /// Default preset for a style. `None` has no preset; callers check
    /// [`CaptionSettings::enabled`] first and go through [`Self::resolve`].
    pub fn for_style(style: CaptionStyle) -> Option<StylePreset> {
        let base = StylePreset {
            style,
            font_scale: 1.2,
            color: HexColor::WHITE,
            outline_color: Some(HexColor::BLACK),
            outline_thickness: 3,
            background: None,
            highlight_color: None,
            gradient: None,
            glow: false,
            weight: FontWeight::Normal,
            case: TextCase::AsIs,
        };

        match style {
            CaptionStyle::None => None,
            CaptionStyle::Classic => Some(base),
            CaptionStyle::Boxed => Some(StylePreset {
                font_scale: 1.0,
                outline_color: None,
                outline_thickness: 0,
                background: Some((HexColor::BLACK, 180)),
                ..base
            }),
            CaptionStyle::Yellow => Some(StylePreset {
                color: HexColor::YELLOW,
                ..base
            }),
            CaptionStyle::Minimal => Some(StylePreset {
                font_scale: 0.9,
                outline_color: None,
                outline_thickness: 0,
                weight: FontWeight::Light,
                case: TextCase::Lower,
                ..base
            }),
            CaptionStyle::Bold => Some(StylePreset {
                font_scale: 1.5,
                outline_thickness: 5,
                weight: FontWeight::Bold,
                case: TextCase::Upper,
                ..base
            }),
            CaptionStyle::Karaoke => Some(StylePreset {
                outline_thickness: 2,
                highlight_color: Some(HexColor::YELLOW),
                ..base
            }),
            CaptionStyle::Neon => Some(StylePreset {
                color: HexColor::MAGENTA,
                outline_color: Some(HexColor::new(255, 100, 255)),
                outline_thickness: 4,
                glow: true,
                ..base
            }),
            CaptionStyle::Gradient => Some(StylePreset {
                font_scale: 1.3,
                outline_thickness: 2,
                gradient: Some((HexColor::new(255, 100, 100), HexColor::new(100, 100, 255))),
                ..base
            }),
        }
    }

    /// Resolve a submission's settings into a preset, applying color
    /// overrides on top of the style's defaults.
    pub fn resolve(settings: &CaptionSettings) -> CaptionResult<StylePreset> {
        if !settings.enabled() {
            return Err(CaptionError::Disabled);
        }
        // enabled() rules out the `None` style.
        let mut preset = Self::for_style(settings.style).ok_or(CaptionError::Disabled)?;

        if let Some(color) = settings.color {
            preset.color = color;
        }
        if let Some(outline) = settings.outline_color {
            preset.outline_color = Some(outline);
        }

        Ok(preset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(style: CaptionStyle) -> CaptionSettings {
        CaptionSettings {
            include_captions: true,
            style,
            color: None,
            outline_color: None,
        }
    }

    #[test]
    fn test_every_style_but_none_has_a_preset() {
        for style in CaptionStyle::ALL {
            assert_eq!(
                StylePreset::for_style(*style).is_some(),
                *style != CaptionStyle::None
            );
        }
    }

    #[test]
    fn test_preset_table() {
        let boxed = StylePreset::for_style(CaptionStyle::Boxed).unwrap();
        assert_eq!(boxed.background, Some((HexColor::BLACK, 180)));
        assert!(boxed.outline_color.is_none());

        let minimal = StylePreset::for_style(CaptionStyle::Minimal).unwrap();
        assert_eq!(minimal.weight, FontWeight::Light);
        assert_eq!(minimal.case, TextCase::Lower);

        let bold = StylePreset::for_style(CaptionStyle::Bold).unwrap();
        assert_eq!(bold.case, TextCase::Upper);
        assert_eq!(bold.outline_thickness, 5);

        let karaoke = StylePreset::for_style(CaptionStyle::Karaoke).unwrap();
        assert_eq!(karaoke.highlight_color, Some(HexColor::YELLOW));

        let neon = StylePreset::for_style(CaptionStyle::Neon).unwrap();
        assert!(neon.glow);
        assert_eq!(neon.color, HexColor::MAGENTA);

        let gradient = StylePreset::for_style(CaptionStyle::Gradient).unwrap();
        assert!(gradient.gradient.is_some());
    }

    #[test]
    fn test_resolve_applies_overrides() {
        let mut s = settings(CaptionStyle::Classic);
        s.color = Some(HexColor::new(0x12, 0x34, 0x56));
        s.outline_color = Some(HexColor::YELLOW);

        let preset = StylePreset::resolve(&s).unwrap();
        assert_eq!(preset.color, HexColor::new(0x12, 0x34, 0x56));
        assert_eq!(preset.outline_color, Some(HexColor::YELLOW));
    }

    #[test]
    fn test_resolve_rejects_disabled() {
        assert!(matches!(
            StylePreset::resolve(&settings(CaptionStyle::None)),
            Err(CaptionError::Disabled)
        ));

        let mut off = settings(CaptionStyle::Classic);
        off.include_captions = false;
        assert!(matches!(
            StylePreset::resolve(&off),
            Err(CaptionError::Disabled)
        ));
    }
}
