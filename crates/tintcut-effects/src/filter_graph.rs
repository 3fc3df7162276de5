//! Declarative filter graph.
//!
//! The same ordered stage list renders as a CSS `filter` value for the live
//! surface and as an ffmpeg filter chain for export.

use crate::adjustments::AdjustmentParameters;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Blur radius is multiplied by this for `boxblur`, which is visibly weaker
/// than a CSS blur of the same radius.
pub const ENCODER_BLUR_FACTOR: f64 = 3.0;

/// Encoder brightness domain that the `[0, 200]%` slider maps onto.
pub const ENCODER_BRIGHTNESS_RANGE: (f64, f64) = (-0.5, 0.5);

/// One named stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "value", rename_all = "kebab-case")]
pub enum FilterStage {
    /// Pixels
    Blur(f64),
    /// Percent
    Brightness(f64),
    /// Percent
    Contrast(f64),
    Greyscale(bool),
    /// Degrees
    HueRotate(f64),
    Invert(bool),
    /// Percent
    Saturate(f64),
}

impl FilterStage {
    /// CSS filter function for this stage.
    pub fn to_css(&self) -> String {
        match *self {
            Self::Blur(px) => format!("blur({px}px)"),
            Self::Brightness(pct) => format!("brightness({pct}%)"),
            Self::Contrast(pct) => format!("contrast({pct}%)"),
            Self::Greyscale(on) => format!("grayscale({}%)", if on { 100 } else { 0 }),
            Self::HueRotate(deg) => format!("hue-rotate({deg}deg)"),
            Self::Invert(on) => format!("invert({}%)", if on { 100 } else { 0 }),
            Self::Saturate(pct) => format!("saturate({pct}%)"),
        }
    }
}

/// Ordered stages: blur, brightness, contrast, greyscale, hue-rotate, invert,
/// saturate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGraph {
    stages: SmallVec<[FilterStage; 7]>,
}

impl FilterGraph {
    pub fn from_params(params: &AdjustmentParameters) -> Self {
        let stages = [
            FilterStage::Blur(params.blur_radius),
            FilterStage::Brightness(params.brightness),
            FilterStage::Contrast(params.contrast),
            FilterStage::Greyscale(params.greyscale),
            FilterStage::HueRotate(params.hue),
            FilterStage::Invert(params.invert),
            FilterStage::Saturate(params.saturation),
        ];
        Self {
            stages: SmallVec::from_buf(stages),
        }
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    /// Value for the CSS `filter` property.
    pub fn to_css(&self) -> String {
        self.stages
            .iter()
            .map(FilterStage::to_css)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// ffmpeg filter stages: `boxblur`, a combined `eq`, `hue`, then
    /// `negate` and `format=gray` when toggled on.
    pub fn encoder_stages(&self) -> Vec<String> {
        let (mut blur, mut brightness, mut contrast, mut saturation, mut hue) =
            (0.0, 100.0, 100.0, 100.0, 0.0);
        let (mut invert, mut greyscale) = (false, false);
        for stage in &self.stages {
            match *stage {
                FilterStage::Blur(v) => blur = v,
                FilterStage::Brightness(v) => brightness = v,
                FilterStage::Contrast(v) => contrast = v,
                FilterStage::Greyscale(on) => greyscale = on,
                FilterStage::HueRotate(v) => hue = v,
                FilterStage::Invert(on) => invert = on,
                FilterStage::Saturate(v) => saturation = v,
            }
        }

        let (lo, hi) = ENCODER_BRIGHTNESS_RANGE;
        // eq's saturation is applied after contrast, so it is pre-multiplied.
        let mut out = vec![
            format!("boxblur={}:1", blur * ENCODER_BLUR_FACTOR),
            format!(
                "eq=contrast={}:saturation={}:brightness={}",
                contrast / 100.0,
                (contrast / 100.0) * (saturation / 100.0),
                scale_between(brightness, lo, hi, 0.0, 200.0)
            ),
            format!("hue=h={hue}"),
        ];
        if invert {
            out.push("negate".to_string());
        }
        if greyscale {
            out.push("format=gray".to_string());
        }
        out
    }

    /// The comma-joined ffmpeg filter chain.
    pub fn to_encoder_filters(&self) -> String {
        self.encoder_stages().join(",")
    }
}

/// Linearly map `value` from `[min, max]` onto `[min_allowed, max_allowed]`.
pub fn scale_between(value: f64, min_allowed: f64, max_allowed: f64, min: f64, max: f64) -> f64 {
    (max_allowed - min_allowed) * (value - min) / (max - min) + min_allowed
}
