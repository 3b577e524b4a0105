use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Height over width, the convention the vertex stage expects.
    pub fn aspect_ratio(&self) -> f32 {
        self.height as f32 / self.width.max(1) as f32
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseDimensionsError {
    #[error("expected WxH format, e.g. 1920x1080")]
    MissingSeparator,
    #[error("invalid width in size specification")]
    InvalidWidth,
    #[error("invalid height in size specification")]
    InvalidHeight,
    #[error("dimensions must be greater than zero")]
    Zero,
}

impl FromStr for Dimensions {
    type Err = ParseDimensionsError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (width, height) = spec
            .trim()
            .split_once(['x', 'X', '×'])
            .ok_or(ParseDimensionsError::MissingSeparator)?;
        let width: u32 = width
            .trim()
            .parse()
            .map_err(|_| ParseDimensionsError::InvalidWidth)?;
        let height: u32 = height
            .trim()
            .parse()
            .map_err(|_| ParseDimensionsError::InvalidHeight)?;
        if width == 0 || height == 0 {
            return Err(ParseDimensionsError::Zero);
        }
        Ok(Self { width, height })
    }
}

/// Quarter-turn orientation applied on top of the crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::from_degrees(value)
            .ok_or_else(|| format!("rotation must be 0, 90, 180 or 270 degrees (got {value})"))
    }
}

impl From<Rotation> for u16 {
    fn from(value: Rotation) -> Self {
        value.degrees()
    }
}

/// Crop and orientation of the source image.
///
/// `(cx, cy)` is the normalised crop centre and `(dx, dy)` the normalised
/// crop extent. `adjust` is the fine rotation correction and is forwarded to
/// the shader untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformParameters {
    pub rotation: Rotation,
    pub adjust: f32,
    pub cx: f32,
    pub cy: f32,
    pub dx: f32,
    pub dy: f32,
}

impl TransformParameters {
    pub fn identity() -> Self {
        Self {
            rotation: Rotation::Deg0,
            adjust: 0.0,
            cx: 0.5,
            cy: 0.5,
            dx: 1.0,
            dy: 1.0,
        }
    }

    /// Crop centre relative to the image centre.
    pub fn translation(&self) -> [f32; 2] {
        [self.cx - 0.5, self.cy - 0.5]
    }

    pub fn desqueeze(&self) -> [f32; 2] {
        [self.dx, self.dy]
    }
}

impl Default for TransformParameters {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tone and colour adjustments, each neutral at `0.0`.
///
/// Values are carried as-is; nothing at this layer clamps them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdjustmentParameters {
    pub brightness: f32,
    pub exposure: f32,
    pub contrast: f32,
    pub highlights: f32,
    pub shadows: f32,
    pub warmth: f32,
    pub tint: f32,
    pub saturation: f32,
    pub sharpness: f32,
    pub grain: f32,
    pub vignette: f32,
}

impl AdjustmentParameters {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    pub fn get(&self, kind: AdjustmentKind) -> f32 {
        match kind {
            AdjustmentKind::Brightness => self.brightness,
            AdjustmentKind::Exposure => self.exposure,
            AdjustmentKind::Contrast => self.contrast,
            AdjustmentKind::Highlights => self.highlights,
            AdjustmentKind::Shadows => self.shadows,
            AdjustmentKind::Warmth => self.warmth,
            AdjustmentKind::Tint => self.tint,
            AdjustmentKind::Saturation => self.saturation,
            AdjustmentKind::Sharpness => self.sharpness,
            AdjustmentKind::Grain => self.grain,
            AdjustmentKind::Vignette => self.vignette,
        }
    }

    /// Returns a copy with a single field replaced.
    pub fn with(mut self, kind: AdjustmentKind, value: f32) -> Self {
        let slot = match kind {
            AdjustmentKind::Brightness => &mut self.brightness,
            AdjustmentKind::Exposure => &mut self.exposure,
            AdjustmentKind::Contrast => &mut self.contrast,
            AdjustmentKind::Highlights => &mut self.highlights,
            AdjustmentKind::Shadows => &mut self.shadows,
            AdjustmentKind::Warmth => &mut self.warmth,
            AdjustmentKind::Tint => &mut self.tint,
            AdjustmentKind::Saturation => &mut self.saturation,
            AdjustmentKind::Sharpness => &mut self.sharpness,
            AdjustmentKind::Grain => &mut self.grain,
            AdjustmentKind::Vignette => &mut self.vignette,
        };
        *slot = value;
        self
    }
}

/// Names the fields of [`AdjustmentParameters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjustmentKind {
    Brightness,
    Exposure,
    Contrast,
    Highlights,
    Shadows,
    Warmth,
    Tint,
    Saturation,
    Sharpness,
    Grain,
    Vignette,
}

impl AdjustmentKind {
    pub const ALL: [AdjustmentKind; 11] = [
        AdjustmentKind::Brightness,
        AdjustmentKind::Exposure,
        AdjustmentKind::Contrast,
        AdjustmentKind::Highlights,
        AdjustmentKind::Shadows,
        AdjustmentKind::Warmth,
        AdjustmentKind::Tint,
        AdjustmentKind::Saturation,
        AdjustmentKind::Sharpness,
        AdjustmentKind::Grain,
        AdjustmentKind::Vignette,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Exposure => "exposure",
            Self::Contrast => "contrast",
            Self::Highlights => "highlights",
            Self::Shadows => "shadows",
            Self::Warmth => "warmth",
            Self::Tint => "tint",
            Self::Saturation => "saturation",
            Self::Sharpness => "sharpness",
            Self::Grain => "grain",
            Self::Vignette => "vignette",
        }
    }
}

impl fmt::Display for AdjustmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown adjustment '{0}'")]
pub struct ParseAdjustmentError(pub String);

impl FromStr for AdjustmentKind {
    type Err = ParseAdjustmentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ParseAdjustmentError(needle.to_string()))
    }
}

/// Lifecycle of a renderer: `Idle` until the first image is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RendererState {
    #[default]
    Idle,
    Ready,
}

impl RendererState {
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn ensure_ready(self) -> Result<(), RenderError> {
        match self {
            Self::Ready => Ok(()),
            Self::Idle => Err(RenderError::NotReady),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dimension_specs() {
        assert_eq!(
            "1920x1080".parse::<Dimensions>(),
            Ok(Dimensions::new(1920, 1080))
        );
        assert_eq!(
            " 640 X 480 ".parse::<Dimensions>(),
            Ok(Dimensions::new(640, 480))
        );
        assert_eq!(
            "1920".parse::<Dimensions>(),
            Err(ParseDimensionsError::MissingSeparator)
        );
        assert_eq!(
            "0x10".parse::<Dimensions>(),
            Err(ParseDimensionsError::Zero)
        );
        assert_eq!(
            "abcx10".parse::<Dimensions>(),
            Err(ParseDimensionsError::InvalidWidth)
        );
    }

    #[test]
    fn aspect_ratio_is_height_over_width() {
        let dims = Dimensions::new(4000, 3000);
        assert!((dims.aspect_ratio() - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn rotation_accepts_quarter_turns_only() {
        assert_eq!(Rotation::from_degrees(270), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_degrees(45), None);
        assert!(Rotation::try_from(360).is_err());
        assert_eq!(u16::from(Rotation::Deg90), 90);
    }

    #[test]
    fn identity_transform_centres_crop() {
        let transform = TransformParameters::identity();
        assert_eq!(transform.translation(), [0.0, 0.0]);
        assert_eq!(transform.desqueeze(), [1.0, 1.0]);
    }

    #[test]
    fn with_replaces_single_field() {
        let base = AdjustmentParameters::identity().with(AdjustmentKind::Contrast, 0.4);
        let next = base.with(AdjustmentKind::Saturation, 5.0);

        assert_eq!(next.contrast, 0.4);
        assert_eq!(next.saturation, 5.0);
        assert_eq!(next.get(AdjustmentKind::Saturation), 5.0);
        assert!(!next.is_identity());
        assert!(AdjustmentParameters::default().is_identity());
    }

    #[test]
    fn adjustment_kind_round_trips_names() {
        for kind in AdjustmentKind::ALL {
            assert_eq!(kind.as_str().parse::<AdjustmentKind>(), Ok(kind));
        }
        assert_eq!(
            "Warmth".parse::<AdjustmentKind>(),
            Ok(AdjustmentKind::Warmth)
        );
        assert!("clarity".parse::<AdjustmentKind>().is_err());
    }

    #[test]
    fn partial_adjustment_records_default_to_neutral() {
        let parsed: AdjustmentParameters =
            serde_json::from_str(r#"{ "exposure": 0.25 }"#).unwrap();
        assert_eq!(parsed.exposure, 0.25);
        assert_eq!(parsed.brightness, 0.0);
        assert_eq!(parsed.vignette, 0.0);
    }

    #[test]
    fn renderer_state_gates_rendering() {
        assert!(matches!(
            RendererState::Idle.ensure_ready(),
            Err(RenderError::NotReady)
        ));
        assert!(RendererState::Ready.ensure_ready().is_ok());
        assert_eq!(RendererState::default(), RendererState::Idle);
    }
}
