//! Label material parameters
//!
//! [`ParameterSet`] is the operator-facing snapshot. Each control is addressed
//! by a [`ParamKey`] whose name is the host binding key (`eticColor`, ...), and
//! mutated through a typed [`ParamChange`].

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::foundation::Color;

/// Label material controls
///
/// Numeric ranges are documented per field and reported by
/// [`ParamKey::range`]. Nothing is clamped; [`ParameterSet::validate`] reports
/// violations for callers that want to enforce them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    /// Base color for both material paths
    #[serde(rename = "eticColor")]
    pub color: Color,
    /// Roughness, [0, 1]
    #[serde(rename = "eticRoughness")]
    pub roughness: f32,
    /// Metalness, [0, 1]
    #[serde(rename = "eticMetalness")]
    pub metalness: f32,
    /// Clearcoat layer strength, [0, 1]
    #[serde(rename = "eticClearcoat")]
    pub clearcoat: f32,
    /// Clearcoat roughness, [0, 1]
    #[serde(rename = "eticClearcoatRoughness")]
    pub clearcoat_roughness: f32,
    /// Reflectivity, [0, 1]
    #[serde(rename = "eticReflectivity")]
    pub reflectivity: f32,
    /// Bump magnitude, [0, 0.01]
    #[serde(rename = "eticBumpScale")]
    pub bump_scale: f32,
    /// Displacement magnitude, [0, 0.1]
    #[serde(rename = "eticDisplacementScale")]
    pub displacement_scale: f32,
    /// Displacement offset, [-0.05, 0.05]
    #[serde(rename = "eticDisplacementBias")]
    pub displacement_bias: f32,
    /// Use the inverted relief texture for bump
    #[serde(rename = "eticInvertBump")]
    pub invert_bump: bool,
    /// Use the inverted relief texture for displacement
    #[serde(rename = "eticInvertDisplacement")]
    pub invert_displacement: bool,
    /// Enable the tangent-space normal map
    #[serde(rename = "eticNormalMap")]
    pub normal_map_enabled: bool,
    /// Normal map strength, [0, 3]
    #[serde(rename = "eticNormalScale")]
    pub normal_scale: f32,
    /// Normal map intensity, [0, 3]
    #[serde(rename = "eticNormalIntensity")]
    pub normal_intensity: f32,
    /// Use the procedural ceramic shader instead of the physical material
    #[serde(rename = "eticUseCustomShader")]
    pub use_custom_shader: bool,
    /// Valley color of the procedural shader
    #[serde(rename = "eticHighlightColor")]
    pub highlight_color: Color,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            color: Color::from_hex(0xa00000),
            roughness: 0.293_352_2,
            metalness: 0.392_927_86,
            clearcoat: 0.438_189_53,
            clearcoat_roughness: 0.112_305_52,
            reflectivity: 1.0,
            bump_scale: 0.0006,
            displacement_scale: 0.04,
            displacement_bias: -0.005,
            invert_bump: true,
            invert_displacement: true,
            normal_map_enabled: true,
            normal_scale: 1.0,
            normal_intensity: 1.0,
            use_custom_shader: true,
            highlight_color: Color::from_hex(0x3a0e02),
        }
    }
}

impl Config for ParameterSet {}

impl ParameterSet {
    /// Apply a change, returning the previous value
    pub fn apply(&mut self, change: ParamChange) -> ParamValue {
        let previous = self.get(change.key());
        match change {
            ParamChange::Color(v) => self.color = v,
            ParamChange::Roughness(v) => self.roughness = v,
            ParamChange::Metalness(v) => self.metalness = v,
            ParamChange::Clearcoat(v) => self.clearcoat = v,
            ParamChange::ClearcoatRoughness(v) => self.clearcoat_roughness = v,
            ParamChange::Reflectivity(v) => self.reflectivity = v,
            ParamChange::BumpScale(v) => self.bump_scale = v,
            ParamChange::DisplacementScale(v) => self.displacement_scale = v,
            ParamChange::DisplacementBias(v) => self.displacement_bias = v,
            ParamChange::InvertBump(v) => self.invert_bump = v,
            ParamChange::InvertDisplacement(v) => self.invert_displacement = v,
            ParamChange::NormalMap(v) => self.normal_map_enabled = v,
            ParamChange::NormalScale(v) => self.normal_scale = v,
            ParamChange::NormalIntensity(v) => self.normal_intensity = v,
            ParamChange::UseCustomShader(v) => self.use_custom_shader = v,
            ParamChange::HighlightColor(v) => self.highlight_color = v,
        }
        previous
    }

    /// Read one control
    pub fn get(&self, key: ParamKey) -> ParamValue {
        match key {
            ParamKey::Color => ParamValue::Color(self.color),
            ParamKey::Roughness => ParamValue::Scalar(self.roughness),
            ParamKey::Metalness => ParamValue::Scalar(self.metalness),
            ParamKey::Clearcoat => ParamValue::Scalar(self.clearcoat),
            ParamKey::ClearcoatRoughness => ParamValue::Scalar(self.clearcoat_roughness),
            ParamKey::Reflectivity => ParamValue::Scalar(self.reflectivity),
            ParamKey::BumpScale => ParamValue::Scalar(self.bump_scale),
            ParamKey::DisplacementScale => ParamValue::Scalar(self.displacement_scale),
            ParamKey::DisplacementBias => ParamValue::Scalar(self.displacement_bias),
            ParamKey::InvertBump => ParamValue::Flag(self.invert_bump),
            ParamKey::InvertDisplacement => ParamValue::Flag(self.invert_displacement),
            ParamKey::NormalMap => ParamValue::Flag(self.normal_map_enabled),
            ParamKey::NormalScale => ParamValue::Scalar(self.normal_scale),
            ParamKey::NormalIntensity => ParamValue::Scalar(self.normal_intensity),
            ParamKey::UseCustomShader => ParamValue::Flag(self.use_custom_shader),
            ParamKey::HighlightColor => ParamValue::Color(self.highlight_color),
        }
    }

    /// Every control in declaration order
    pub fn entries(&self) -> Vec<(ParamKey, ParamValue)> {
        ParamKey::ALL.iter().map(|&key| (key, self.get(key))).collect()
    }

    /// Check every numeric control against its documented range
    pub fn validate(&self) -> Result<(), InvalidParameterError> {
        self.entries()
            .into_iter()
            .try_for_each(|(key, value)| key.check(value))
    }
}

/// Identifies one label control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    /// `eticColor`
    Color,
    /// `eticRoughness`
    Roughness,
    /// `eticMetalness`
    Metalness,
    /// `eticClearcoat`
    Clearcoat,
    /// `eticClearcoatRoughness`
    ClearcoatRoughness,
    /// `eticReflectivity`
    Reflectivity,
    /// `eticBumpScale`
    BumpScale,
    /// `eticDisplacementScale`
    DisplacementScale,
    /// `eticDisplacementBias`
    DisplacementBias,
    /// `eticInvertBump`
    InvertBump,
    /// `eticInvertDisplacement`
    InvertDisplacement,
    /// `eticNormalMap`
    NormalMap,
    /// `eticNormalScale`
    NormalScale,
    /// `eticNormalIntensity`
    NormalIntensity,
    /// `eticUseCustomShader`
    UseCustomShader,
    /// `eticHighlightColor`
    HighlightColor,
}

/// How the synchronizer reacts to a change of a given control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    /// Patch a shader uniform in place when the procedural shader is attached;
    /// otherwise handled like [`ChangeClass::Debounced`]
    UniformPatch,
    /// Rebuild after the quiescence window
    Debounced,
    /// Rebuild synchronously, superseding any pending rebuild
    Structural,
}

impl ParamKey {
    /// All keys in declaration order
    pub const ALL: [Self; 16] = [
        Self::Color,
        Self::Roughness,
        Self::Metalness,
        Self::Clearcoat,
        Self::ClearcoatRoughness,
        Self::Reflectivity,
        Self::BumpScale,
        Self::DisplacementScale,
        Self::DisplacementBias,
        Self::InvertBump,
        Self::InvertDisplacement,
        Self::NormalMap,
        Self::NormalScale,
        Self::NormalIntensity,
        Self::UseCustomShader,
        Self::HighlightColor,
    ];

    /// Host binding name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Color => "eticColor",
            Self::Roughness => "eticRoughness",
            Self::Metalness => "eticMetalness",
            Self::Clearcoat => "eticClearcoat",
            Self::ClearcoatRoughness => "eticClearcoatRoughness",
            Self::Reflectivity => "eticReflectivity",
            Self::BumpScale => "eticBumpScale",
            Self::DisplacementScale => "eticDisplacementScale",
            Self::DisplacementBias => "eticDisplacementBias",
            Self::InvertBump => "eticInvertBump",
            Self::InvertDisplacement => "eticInvertDisplacement",
            Self::NormalMap => "eticNormalMap",
            Self::NormalScale => "eticNormalScale",
            Self::NormalIntensity => "eticNormalIntensity",
            Self::UseCustomShader => "eticUseCustomShader",
            Self::HighlightColor => "eticHighlightColor",
        }
    }

    /// Documented valid range for numeric controls
    pub fn range(self) -> Option<RangeInclusive<f32>> {
        match self {
            Self::Roughness
            | Self::Metalness
            | Self::Clearcoat
            | Self::ClearcoatRoughness
            | Self::Reflectivity => Some(0.0..=1.0),
            Self::BumpScale => Some(0.0..=0.01),
            Self::DisplacementScale => Some(0.0..=0.1),
            Self::DisplacementBias => Some(-0.05..=0.05),
            Self::NormalScale | Self::NormalIntensity => Some(0.0..=3.0),
            _ => None,
        }
    }

    /// Reaction class used by the synchronizer
    pub const fn change_class(self) -> ChangeClass {
        match self {
            Self::HighlightColor
            | Self::BumpScale
            | Self::DisplacementScale
            | Self::DisplacementBias => ChangeClass::UniformPatch,
            Self::InvertBump
            | Self::InvertDisplacement
            | Self::NormalMap
            | Self::UseCustomShader => ChangeClass::Structural,
            Self::Color
            | Self::Roughness
            | Self::Metalness
            | Self::Clearcoat
            | Self::ClearcoatRoughness
            | Self::Reflectivity
            | Self::NormalScale
            | Self::NormalIntensity => ChangeClass::Debounced,
        }
    }

    fn check(self, value: ParamValue) -> Result<(), InvalidParameterError> {
        match (self.range(), value) {
            (Some(range), ParamValue::Scalar(v)) if !range.contains(&v) => {
                Err(InvalidParameterError::OutOfRange { key: self, value: v, range })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamKey {
    type Err = InvalidParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| InvalidParameterError::UnknownName(s.to_string()))
    }
}

/// Untyped control value, as delivered by a generic UI binding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    /// Color control
    Color(Color),
    /// Numeric control
    Scalar(f32),
    /// Toggle control
    Flag(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color(c) => write!(f, "{}", c),
            Self::Scalar(v) => write!(f, "{}", v),
            Self::Flag(b) => write!(f, "{}", b),
        }
    }
}

/// A typed mutation of one control
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamChange {
    /// Set `eticColor`
    Color(Color),
    /// Set `eticRoughness`
    Roughness(f32),
    /// Set `eticMetalness`
    Metalness(f32),
    /// Set `eticClearcoat`
    Clearcoat(f32),
    /// Set `eticClearcoatRoughness`
    ClearcoatRoughness(f32),
    /// Set `eticReflectivity`
    Reflectivity(f32),
    /// Set `eticBumpScale`
    BumpScale(f32),
    /// Set `eticDisplacementScale`
    DisplacementScale(f32),
    /// Set `eticDisplacementBias`
    DisplacementBias(f32),
    /// Set `eticInvertBump`
    InvertBump(bool),
    /// Set `eticInvertDisplacement`
    InvertDisplacement(bool),
    /// Set `eticNormalMap`
    NormalMap(bool),
    /// Set `eticNormalScale`
    NormalScale(f32),
    /// Set `eticNormalIntensity`
    NormalIntensity(f32),
    /// Set `eticUseCustomShader`
    UseCustomShader(bool),
    /// Set `eticHighlightColor`
    HighlightColor(Color),
}

impl ParamChange {
    /// The control this change targets
    pub const fn key(&self) -> ParamKey {
        match self {
            Self::Color(_) => ParamKey::Color,
            Self::Roughness(_) => ParamKey::Roughness,
            Self::Metalness(_) => ParamKey::Metalness,
            Self::Clearcoat(_) => ParamKey::Clearcoat,
            Self::ClearcoatRoughness(_) => ParamKey::ClearcoatRoughness,
            Self::Reflectivity(_) => ParamKey::Reflectivity,
            Self::BumpScale(_) => ParamKey::BumpScale,
            Self::DisplacementScale(_) => ParamKey::DisplacementScale,
            Self::DisplacementBias(_) => ParamKey::DisplacementBias,
            Self::InvertBump(_) => ParamKey::InvertBump,
            Self::InvertDisplacement(_) => ParamKey::InvertDisplacement,
            Self::NormalMap(_) => ParamKey::NormalMap,
            Self::NormalScale(_) => ParamKey::NormalScale,
            Self::NormalIntensity(_) => ParamKey::NormalIntensity,
            Self::UseCustomShader(_) => ParamKey::UseCustomShader,
            Self::HighlightColor(_) => ParamKey::HighlightColor,
        }
    }

    /// The new value carried by this change
    pub const fn value(&self) -> ParamValue {
        match *self {
            Self::Color(c) | Self::HighlightColor(c) => ParamValue::Color(c),
            Self::Roughness(v)
            | Self::Metalness(v)
            | Self::Clearcoat(v)
            | Self::ClearcoatRoughness(v)
            | Self::Reflectivity(v)
            | Self::BumpScale(v)
            | Self::DisplacementScale(v)
            | Self::DisplacementBias(v)
            | Self::NormalScale(v)
            | Self::NormalIntensity(v) => ParamValue::Scalar(v),
            Self::InvertBump(b)
            | Self::InvertDisplacement(b)
            | Self::NormalMap(b)
            | Self::UseCustomShader(b) => ParamValue::Flag(b),
        }
    }

    /// Build a change from a key and an untyped value
    pub fn new(key: ParamKey, value: ParamValue) -> Result<Self, InvalidParameterError> {
        let change = match (key, value) {
            (ParamKey::Color, ParamValue::Color(c)) => Self::Color(c),
            (ParamKey::HighlightColor, ParamValue::Color(c)) => Self::HighlightColor(c),
            (ParamKey::Roughness, ParamValue::Scalar(v)) => Self::Roughness(v),
            (ParamKey::Metalness, ParamValue::Scalar(v)) => Self::Metalness(v),
            (ParamKey::Clearcoat, ParamValue::Scalar(v)) => Self::Clearcoat(v),
            (ParamKey::ClearcoatRoughness, ParamValue::Scalar(v)) => Self::ClearcoatRoughness(v),
            (ParamKey::Reflectivity, ParamValue::Scalar(v)) => Self::Reflectivity(v),
            (ParamKey::BumpScale, ParamValue::Scalar(v)) => Self::BumpScale(v),
            (ParamKey::DisplacementScale, ParamValue::Scalar(v)) => Self::DisplacementScale(v),
            (ParamKey::DisplacementBias, ParamValue::Scalar(v)) => Self::DisplacementBias(v),
            (ParamKey::NormalScale, ParamValue::Scalar(v)) => Self::NormalScale(v),
            (ParamKey::NormalIntensity, ParamValue::Scalar(v)) => Self::NormalIntensity(v),
            (ParamKey::InvertBump, ParamValue::Flag(b)) => Self::InvertBump(b),
            (ParamKey::InvertDisplacement, ParamValue::Flag(b)) => Self::InvertDisplacement(b),
            (ParamKey::NormalMap, ParamValue::Flag(b)) => Self::NormalMap(b),
            (ParamKey::UseCustomShader, ParamValue::Flag(b)) => Self::UseCustomShader(b),
            (key, value) => return Err(InvalidParameterError::TypeMismatch { key, value }),
        };
        Ok(change)
    }

    /// Build a change from a host binding name
    pub fn from_named(name: &str, value: ParamValue) -> Result<Self, InvalidParameterError> {
        Self::new(name.parse()?, value)
    }

    /// Check the value against the key's documented range
    pub fn validate(&self) -> Result<(), InvalidParameterError> {
        self.key().check(self.value())
    }
}

/// A parameter that cannot be applied as given
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidParameterError {
    /// No control has this binding name
    #[error("Unknown parameter '{0}'")]
    UnknownName(String),

    /// The value kind does not match the control
    #[error("Parameter {key} cannot take value {value}")]
    TypeMismatch {
        /// Control being set
        key: ParamKey,
        /// Offending value
        value: ParamValue,
    },

    /// Numeric value outside the documented range
    #[error("Parameter {key} = {value} is outside {range:?}")]
    OutOfRange {
        /// Control being set
        key: ParamKey,
        /// Offending value
        value: f32,
        /// Documented range
        range: RangeInclusive<f32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ParameterSet::default().validate().is_ok());
    }

    #[test]
    fn test_apply_returns_previous_value() {
        let mut params = ParameterSet::default();
        let previous = params.apply(ParamChange::Roughness(0.9));
        assert_eq!(previous, ParamValue::Scalar(0.293_352_2));
        assert_eq!(params.roughness, 0.9);
    }

    #[test]
    fn test_names_round_trip() {
        for key in ParamKey::ALL {
            assert_eq!(key.name().parse::<ParamKey>().unwrap(), key);
        }
        assert!("bottleOpacity".parse::<ParamKey>().is_err());
    }

    #[test]
    fn test_change_classes() {
        assert_eq!(ParamKey::HighlightColor.change_class(), ChangeClass::UniformPatch);
        assert_eq!(ParamKey::Color.change_class(), ChangeClass::Debounced);
        assert_eq!(ParamKey::NormalIntensity.change_class(), ChangeClass::Debounced);
        assert_eq!(ParamKey::UseCustomShader.change_class(), ChangeClass::Structural);
        assert_eq!(ParamKey::InvertDisplacement.change_class(), ChangeClass::Structural);
    }

    #[test]
    fn test_from_named() {
        let change = ParamChange::from_named("eticMetalness", ParamValue::Scalar(0.5)).unwrap();
        assert_eq!(change, ParamChange::Metalness(0.5));

        let mismatch = ParamChange::from_named("eticInvertBump", ParamValue::Scalar(1.0));
        assert!(matches!(mismatch, Err(InvalidParameterError::TypeMismatch { .. })));
    }

    #[test]
    fn test_out_of_range_is_reported_not_clamped() {
        let mut params = ParameterSet::default();
        params.apply(ParamChange::DisplacementBias(0.2));
        assert_eq!(params.displacement_bias, 0.2);

        let err = params.validate().unwrap_err();
        assert!(matches!(
            err,
            InvalidParameterError::OutOfRange { key: ParamKey::DisplacementBias, .. }
        ));
        assert!(ParamChange::DisplacementBias(0.2).validate().is_err());
    }

    #[test]
    fn test_serde_uses_binding_names() {
        let text = ron::to_string(&ParameterSet::default()).unwrap();
        assert!(text.contains("eticHighlightColor:\"#3a0e02\""));

        let parsed: ParameterSet = toml::from_str("eticRoughness = 0.5\neticColor = \"#00ff00\"\n").unwrap();
        assert_eq!(parsed.roughness, 0.5);
        assert_eq!(parsed.color, Color::from_hex(0x00ff00));
        assert_eq!(parsed.metalness, ParameterSet::default().metalness);
    }
}
