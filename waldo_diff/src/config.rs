// THEORY:
// `DiffSettings` is the one knob-board for the whole engine. It deserialises
// straight from the camelCase JSON the web front end sends, falling back to
// the front end's slider defaults for anything left out, and it converts
// itself into the small per-stage option structs (`MaskOptions`,
// `AnnotationStyle`, `LayoutOptions`) so each stage only sees what it uses.

use crate::core_modules::annotate::AnnotationStyle;
use crate::core_modules::compositor::LayoutOptions;
use crate::core_modules::label_font::LabelFont;
use crate::core_modules::raster::MaskOptions;
use crate::core_modules::similarity::{SimilarityMode, SimilarityProfile};
use crate::error::{DiffError, Result};
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Detection and rendering parameters for one diff operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiffSettings {
    /// Difference-binarization cutoff; pixels strictly above it count as different.
    pub threshold: u8,
    /// Contours with a smaller polygon area are discarded before grouping.
    pub min_area: f64,
    /// Passes of the 5x5 dilation.
    pub dilation_iter: u32,
    pub circle_thickness: u32,
    pub circle_color: String,
    pub overlay_color: String,
    /// `0..=255`; `0` disables the overlay.
    pub overlay_opacity: u8,
    /// Maximum center-to-center gap (pixels) for the proximity rule.
    pub touch_distance: f64,
    pub image_spacing: u32,
    pub separator_color: String,
    pub separator_thickness: u32,
    pub similarity: SimilarityMode,
}

impl Default for DiffSettings {
    fn default() -> Self {
        Self {
            threshold: 30,
            min_area: 40.0,
            dilation_iter: 2,
            circle_thickness: 2,
            circle_color: "#FF0000".to_string(),
            overlay_color: "#FF0000".to_string(),
            overlay_opacity: 100,
            touch_distance: 10.0,
            image_spacing: 10,
            separator_color: "#87CEEB".to_string(),
            separator_thickness: 2,
            similarity: SimilarityMode::default(),
        }
    }
}

/// Parses `RRGGBB` with an optional leading `#`.
pub fn parse_hex_color(hex: &str) -> Option<Rgb<u8>> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

fn color_field(name: &str, value: &str) -> Result<Rgb<u8>> {
    parse_hex_color(value).ok_or_else(|| DiffError::Config(format!("{name}: `{value}` is not a 6-digit hex colour")))
}

impl DiffSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects settings no stage could honour.
    pub fn validate(&self) -> Result<()> {
        if self.circle_thickness == 0 {
            return Err(DiffError::Config("circleThickness must be at least 1".to_string()));
        }
        if !self.touch_distance.is_finite() || self.touch_distance < 0.0 {
            return Err(DiffError::Config(format!(
                "touchDistance must be a non-negative number, got {}",
                self.touch_distance
            )));
        }
        if !self.min_area.is_finite() {
            return Err(DiffError::Config("minArea must be finite".to_string()));
        }
        color_field("circleColor", &self.circle_color)?;
        color_field("overlayColor", &self.overlay_color)?;
        color_field("separatorColor", &self.separator_color)?;
        Ok(())
    }

    pub fn mask_options(&self) -> MaskOptions {
        MaskOptions {
            threshold: self.threshold,
            dilation_iter: self.dilation_iter,
            min_area: self.min_area,
        }
    }

    pub fn similarity_profile(&self) -> SimilarityProfile {
        self.similarity.into()
    }

    pub fn annotation_style(&self) -> Result<AnnotationStyle> {
        Ok(AnnotationStyle {
            circle_color: color_field("circleColor", &self.circle_color)?,
            circle_thickness: self.circle_thickness,
            overlay_color: color_field("overlayColor", &self.overlay_color)?,
            overlay_opacity: self.overlay_opacity,
            font: LabelFont::embedded()?,
        })
    }

    pub fn layout_options(&self) -> Result<LayoutOptions> {
        Ok(LayoutOptions {
            spacing: self.image_spacing,
            separator_thickness: self.separator_thickness,
            separator_color: color_field("separatorColor", &self.separator_color)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse_with_or_without_hash() {
        assert_eq!(parse_hex_color("#FF0000"), Some(Rgb([255, 0, 0])));
        assert_eq!(parse_hex_color("87ceeb"), Some(Rgb([135, 206, 235])));
        assert_eq!(parse_hex_color("#FFF"), None);
        assert_eq!(parse_hex_color("#GG0000"), None);
        assert_eq!(parse_hex_color("#FF00001"), None);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let settings = DiffSettings::from_json_str(r#"{"threshold": 45, "touchDistance": 4, "similarity": "basic"}"#).unwrap();
        assert_eq!(settings.threshold, 45);
        assert_eq!(settings.touch_distance, 4.0);
        assert_eq!(settings.similarity, SimilarityMode::Basic);
        assert_eq!(settings.min_area, 40.0);
        assert_eq!(settings.separator_color, "#87CEEB");
    }

    #[test]
    fn web_payload_deserialises() {
        let json = r##"{
            "threshold": 30, "minArea": 40, "dilationIter": 2, "circleThickness": 2,
            "circleColor": "#ff0000", "overlayColor": "#00ff00", "overlayOpacity": 100,
            "touchDistance": 10, "imageSpacing": 10, "separatorColor": "#87ceeb",
            "separatorThickness": 2
        }"##;
        let settings = DiffSettings::from_json_str(json).unwrap();
        settings.validate().unwrap();
        assert_eq!(settings.annotation_style().unwrap().overlay_color, Rgb([0, 255, 0]));
        assert_eq!(settings.layout_options().unwrap().gutter(), 22);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let bad_color = DiffSettings {
            circle_color: "red".to_string(),
            ..DiffSettings::default()
        };
        let err = bad_color.validate().unwrap_err();
        assert!(err.to_string().contains("circleColor"));

        let zero_thickness = DiffSettings {
            circle_thickness: 0,
            ..DiffSettings::default()
        };
        assert!(zero_thickness.validate().is_err());

        let negative_touch = DiffSettings {
            touch_distance: -1.0,
            ..DiffSettings::default()
        };
        assert!(negative_touch.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_config_stage_error() {
        let err = DiffSettings::from_json_str("{not json").unwrap_err();
        assert_eq!(err.stage(), crate::error::Stage::Config);
    }
}
