use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use renderer::{AdjustmentParameters, Dimensions, GpuPowerPreference, TransformParameters};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToneConfig {
    pub version: u32,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub gpu: GpuConfig,
    #[serde(default)]
    pub adjustments: AdjustmentParameters,
    #[serde(default)]
    pub transform: TransformParameters,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
    /// Device pixels per logical pixel; unset means "ask the display".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixel_ratio: Option<f32>,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub frame_budget: Duration,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            pixel_ratio: None,
            frame_budget: default_frame_budget(),
        }
    }
}

impl PreviewConfig {
    pub fn surface(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpuConfig {
    pub power: PowerSetting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    Low,
    #[default]
    High,
}

impl From<PowerSetting> for GpuPowerPreference {
    fn from(value: PowerSetting) -> Self {
        match value {
            PowerSetting::Low => GpuPowerPreference::Low,
            PowerSetting::High => GpuPowerPreference::High,
        }
    }
}

fn default_frame_budget() -> Duration {
    Duration::from_millis(16)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl de::Visitor<'_> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            preview: PreviewConfig::default(),
            gpu: GpuConfig::default(),
            adjustments: AdjustmentParameters::identity(),
            transform: TransformParameters::identity(),
        }
    }
}

impl ToneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: ToneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        if self.preview.surface().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "preview size {} must be non-zero in both dimensions",
                self.preview.surface()
            )));
        }

        if let Some(ratio) = self.preview.pixel_ratio {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "preview.pixel_ratio must be greater than zero (got {ratio})"
                )));
            }
        }

        if self.preview.frame_budget.is_zero() {
            return Err(ConfigError::Invalid(
                "preview.frame_budget must be greater than zero".into(),
            ));
        }

        let transform = &self.transform;
        for (name, value) in [
            ("adjust", transform.adjust),
            ("cx", transform.cx),
            ("cy", transform.cy),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "transform.{name} must be a finite number"
                )));
            }
        }
        for (name, value) in [("dx", transform.dx), ("dy", transform.dy)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "transform.{name} must be greater than zero (got {value})"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::Rotation;

    const SAMPLE: &str = r#"
version = 1

[preview]
width = 1920
height = 1080
pixel_ratio = 2
frame_budget = "8ms"

[gpu]
power = "low"

[adjustments]
exposure = 0.5
saturation = -0.25

[transform]
rotation = 90
cx = 0.4
dx = 0.8
"#;

    #[test]
    fn parses_sample_config() {
        let config = ToneConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.preview.surface(), Dimensions::new(1920, 1080));
        assert_eq!(config.preview.pixel_ratio, Some(2.0));
        assert_eq!(config.preview.frame_budget, Duration::from_millis(8));
        assert_eq!(config.gpu.power, PowerSetting::Low);
        assert_eq!(config.adjustments.exposure, 0.5);
        assert_eq!(config.adjustments.saturation, -0.25);
        assert_eq!(config.adjustments.contrast, 0.0);
        assert_eq!(config.transform.rotation, Rotation::Deg90);
        assert_eq!(config.transform.cx, 0.4);
        assert_eq!(config.transform.cy, 0.5);
        assert_eq!(config.transform.dy, 1.0);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = ToneConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config, ToneConfig::default());
    }

    #[test]
    fn frame_budget_accepts_seconds() {
        let config = ToneConfig::from_toml_str(
            r#"
version = 1
[preview]
frame_budget = 0.5
"#,
        )
        .unwrap();
        assert_eq!(config.preview.frame_budget, Duration::from_millis(500));
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = ToneConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_empty_preview() {
        let err = ToneConfig::from_toml_str(
            r#"
version = 1
[preview]
width = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_non_positive_pixel_ratio() {
        let err = ToneConfig::from_toml_str(
            r#"
version = 1
[preview]
pixel_ratio = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_odd_rotations() {
        let err = ToneConfig::from_toml_str(
            r#"
version = 1
[transform]
rotation = 45
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_unknown_adjustments() {
        let err = ToneConfig::from_toml_str(
            r#"
version = 1
[adjustments]
clarity = 1.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_crop_scale() {
        let err = ToneConfig::from_toml_str(
            r#"
version = 1
[transform]
dy = 0.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn serialises_back_to_valid_toml() {
        let config = ToneConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = toml::to_string(&config).unwrap();
        assert_eq!(ToneConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn power_maps_onto_gpu_preference() {
        assert_eq!(
            GpuPowerPreference::from(PowerSetting::Low),
            GpuPowerPreference::Low
        );
        assert_eq!(
            GpuPowerPreference::from(PowerSetting::default()),
            GpuPowerPreference::High
        );
    }
}
