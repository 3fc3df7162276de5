//! User-tunable adjustment parameters and their editing state.
//!
//! Defaults are named constants. A parameter set "is modified" when any field
//! differs from its default. Typed values may sit out of range until the
//! control is committed (loses focus), at which point they are clamped.

use serde::{Deserialize, Serialize};
use tintcut_core::Rgb8;
use tracing::debug;

pub const DEFAULT_CHANNEL_SCALE: f64 = 100.0;
pub const DEFAULT_BRIGHTNESS: f64 = 100.0;
pub const DEFAULT_CONTRAST: f64 = 100.0;
pub const DEFAULT_HUE: f64 = 0.0;
pub const DEFAULT_SATURATION: f64 = 100.0;
pub const DEFAULT_BLUR: f64 = 0.0;
pub const DEFAULT_OPACITY: f64 = 100.0;
pub const DEFAULT_INVERT: bool = false;
pub const DEFAULT_GREYSCALE: bool = false;
pub const DEFAULT_BACKGROUND: Rgb8 = Rgb8::DEFAULT_BACKGROUND;

/// Every visual adjustment that can be applied to a still or a video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentParameters {
    /// Red channel scale, percent (0-200)
    pub red_scale: f64,
    /// Green channel scale, percent (0-200)
    pub green_scale: f64,
    /// Blue channel scale, percent (0-200)
    pub blue_scale: f64,
    /// Percent (0-200)
    pub brightness: f64,
    /// Percent (0-300)
    pub contrast: f64,
    /// Degrees (0-360)
    pub hue: f64,
    /// Percent (0-300)
    pub saturation: f64,
    /// Pixels (0-50)
    pub blur_radius: f64,
    /// Percent (0-100); below 100 the background shows through.
    pub opacity: f64,
    pub background: Rgb8,
    pub invert: bool,
    pub greyscale: bool,
}

impl Default for AdjustmentParameters {
    fn default() -> Self {
        Self {
            red_scale: DEFAULT_CHANNEL_SCALE,
            green_scale: DEFAULT_CHANNEL_SCALE,
            blue_scale: DEFAULT_CHANNEL_SCALE,
            brightness: DEFAULT_BRIGHTNESS,
            contrast: DEFAULT_CONTRAST,
            hue: DEFAULT_HUE,
            saturation: DEFAULT_SATURATION,
            blur_radius: DEFAULT_BLUR,
            opacity: DEFAULT_OPACITY,
            background: DEFAULT_BACKGROUND,
            invert: DEFAULT_INVERT,
            greyscale: DEFAULT_GREYSCALE,
        }
    }
}

impl AdjustmentParameters {
    /// Read a numeric field.
    pub fn get(&self, field: AdjustmentField) -> f64 {
        match field {
            AdjustmentField::RedScale => self.red_scale,
            AdjustmentField::GreenScale => self.green_scale,
            AdjustmentField::BlueScale => self.blue_scale,
            AdjustmentField::Brightness => self.brightness,
            AdjustmentField::Contrast => self.contrast,
            AdjustmentField::Hue => self.hue,
            AdjustmentField::Saturation => self.saturation,
            AdjustmentField::BlurRadius => self.blur_radius,
            AdjustmentField::Opacity => self.opacity,
        }
    }

    fn slot(&mut self, field: AdjustmentField) -> &mut f64 {
        match field {
            AdjustmentField::RedScale => &mut self.red_scale,
            AdjustmentField::GreenScale => &mut self.green_scale,
            AdjustmentField::BlueScale => &mut self.blue_scale,
            AdjustmentField::Brightness => &mut self.brightness,
            AdjustmentField::Contrast => &mut self.contrast,
            AdjustmentField::Hue => &mut self.hue,
            AdjustmentField::Saturation => &mut self.saturation,
            AdjustmentField::BlurRadius => &mut self.blur_radius,
            AdjustmentField::Opacity => &mut self.opacity,
        }
    }

    /// True when any field differs from its default.
    pub fn is_modified(&self) -> bool {
        *self != Self::default()
    }

    /// Copy with every numeric field clamped into its declared range.
    pub fn clamped(mut self) -> Self {
        for field in AdjustmentField::ALL {
            let value = self.get(field);
            *self.slot(field) = field.descriptor().clamp(value);
        }
        self
    }
}

/// Numeric adjustment fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdjustmentField {
    RedScale,
    GreenScale,
    BlueScale,
    Brightness,
    Contrast,
    Hue,
    Saturation,
    BlurRadius,
    Opacity,
}

/// Static description of a numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub display_name: &'static str,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    /// Input adornment (`%`, `°`, or empty).
    pub unit: &'static str,
}

impl FieldDescriptor {
    /// Clamp into `[min, max]`.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl AdjustmentField {
    pub const ALL: [Self; 9] = [
        Self::RedScale,
        Self::GreenScale,
        Self::BlueScale,
        Self::Brightness,
        Self::Contrast,
        Self::Hue,
        Self::Saturation,
        Self::BlurRadius,
        Self::Opacity,
    ];

    pub fn descriptor(self) -> FieldDescriptor {
        let (name, display_name, default, max, unit) = match self {
            Self::RedScale => ("red_scale", "Red Scale", DEFAULT_CHANNEL_SCALE, 200.0, "%"),
            Self::GreenScale => ("green_scale", "Green Scale", DEFAULT_CHANNEL_SCALE, 200.0, "%"),
            Self::BlueScale => ("blue_scale", "Blue Scale", DEFAULT_CHANNEL_SCALE, 200.0, "%"),
            Self::Brightness => ("brightness", "Brightness", DEFAULT_BRIGHTNESS, 200.0, "%"),
            Self::Contrast => ("contrast", "Contrast", DEFAULT_CONTRAST, 300.0, "%"),
            Self::Hue => ("hue", "Hue", DEFAULT_HUE, 360.0, "°"),
            Self::Saturation => ("saturation", "Saturation", DEFAULT_SATURATION, 300.0, "%"),
            Self::BlurRadius => ("blur", "Blur", DEFAULT_BLUR, 50.0, ""),
            Self::Opacity => ("opacity", "Opacity", DEFAULT_OPACITY, 100.0, "%"),
        };
        FieldDescriptor {
            name,
            display_name,
            default,
            min: 0.0,
            max,
            unit,
        }
    }

    /// Look a field up by its `name`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.descriptor().name == name)
    }
}

/// Editable adjustment state behind the sliders and toggles.
///
/// Resets go back to `defaults`, which differ from the named constants only
/// in the background a front end configured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdjustmentState {
    params: AdjustmentParameters,
    defaults: AdjustmentParameters,
}

impl AdjustmentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State whose defaults composite onto `background`.
    pub fn with_background(background: Rgb8) -> Self {
        let defaults = AdjustmentParameters {
            background,
            ..AdjustmentParameters::default()
        };
        Self {
            params: defaults,
            defaults,
        }
    }

    /// What [`reset`](Self::reset) restores.
    pub fn defaults(&self) -> &AdjustmentParameters {
        &self.defaults
    }

    /// Current parameters, possibly holding uncommitted out-of-range values.
    pub fn params(&self) -> &AdjustmentParameters {
        &self.params
    }

    pub fn get(&self, field: AdjustmentField) -> f64 {
        self.params.get(field)
    }

    /// Store a value without clamping (slider drag or keystroke).
    ///
    /// Non-finite values are ignored. Returns whether the value changed.
    pub fn set(&mut self, field: AdjustmentField, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        let slot = self.params.slot(field);
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    /// Store typed text. Non-numeric text leaves the previous value in place.
    pub fn set_from_input(&mut self, field: AdjustmentField, text: &str) -> bool {
        match text.trim().parse::<f64>() {
            Ok(value) => self.set(field, value),
            Err(_) => {
                debug!(field = field.descriptor().name, input = text, "Ignoring non-numeric input");
                false
            }
        }
    }

    /// Clamp a field into range when its control loses focus.
    pub fn commit_field(&mut self, field: AdjustmentField) -> f64 {
        let descriptor = field.descriptor();
        let slot = self.params.slot(field);
        if !descriptor.contains(*slot) {
            let clamped = descriptor.clamp(*slot);
            debug!(field = descriptor.name, from = *slot, to = clamped, "Clamped adjustment");
            *slot = clamped;
        }
        *slot
    }

    /// Commit every numeric field.
    pub fn commit_all(&mut self) {
        for field in AdjustmentField::ALL {
            self.commit_field(field);
        }
    }

    pub fn set_invert(&mut self, invert: bool) {
        self.params.invert = invert;
    }

    pub fn set_greyscale(&mut self, greyscale: bool) {
        self.params.greyscale = greyscale;
    }

    pub fn set_background(&mut self, background: Rgb8) {
        self.params.background = background;
    }

    /// Restore every field to its default.
    pub fn reset(&mut self) {
        self.params = self.defaults;
    }

    /// Restore one field to its default.
    pub fn reset_field(&mut self, field: AdjustmentField) {
        *self.params.slot(field) = self.defaults.get(field);
    }

    pub fn reset_background(&mut self) {
        self.params.background = self.defaults.background;
    }

    pub fn is_modified(&self) -> bool {
        self.params != self.defaults
    }

    /// Drives the per-control reset affordance.
    pub fn is_field_modified(&self, field: AdjustmentField) -> bool {
        self.params.get(field) != self.defaults.get(field)
    }

    /// Replace everything (used when a store snapshot is loaded).
    pub fn replace(&mut self, params: AdjustmentParameters) {
        self.params = params;
    }
}
