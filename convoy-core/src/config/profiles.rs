//! Rate profile definitions.
//!
//! A rate profile is a resolution + frame-rate keyed rule giving the baseline
//! average video bitrate for that class of content. Profiles are grouped into
//! a [`RateLadder`] which is validated once at load time and then shared
//! read-only with the resolver.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// One rung of the bitrate ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateProfile {
    /// Human readable name, e.g. "4K 30fps".
    pub name: String,
    /// Minimum length in pixels of the longer frame edge for this tier.
    pub min_long_edge: u32,
    /// Inclusive lower bound of the frame-rate range.
    pub fps_min: f64,
    /// Inclusive upper bound of the frame-rate range.
    pub fps_max: f64,
    /// Baseline average bitrate in bits per second.
    pub average_bitrate: u64,
}

impl RateProfile {
    pub fn new(name: &str, min_long_edge: u32, fps_min: f64, fps_max: f64, average_bitrate: u64) -> Self {
        Self {
            name: name.to_string(),
            min_long_edge,
            fps_min,
            fps_max,
            average_bitrate,
        }
    }

    /// Returns true when `fps` lies inside this profile's inclusive range.
    #[must_use]
    pub fn contains_fps(&self, fps: f64) -> bool {
        self.fps_min <= fps && fps <= self.fps_max
    }

    /// Distance from `fps` to the nearest edge of the range (0 when inside).
    #[must_use]
    pub fn fps_distance(&self, fps: f64) -> f64 {
        if self.contains_fps(fps) {
            0.0
        } else if fps < self.fps_min {
            self.fps_min - fps
        } else {
            fps - self.fps_max
        }
    }
}

/// Validated, immutable list of rate profiles in declaration order.
///
/// Fps sub-ranges inside one resolution tier may overlap or leave gaps; the
/// resolver handles both. The only structural requirement is that a tier with
/// threshold 0 exists, so every resolution maps to some tier.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLadder {
    profiles: Vec<RateProfile>,
}

impl RateLadder {
    /// Validates and wraps a list of profiles.
    pub fn new(profiles: Vec<RateProfile>) -> CoreResult<Self> {
        if profiles.is_empty() {
            return Err(CoreError::Config("rate ladder must contain at least one profile".to_string()));
        }

        for profile in &profiles {
            if !(profile.fps_min.is_finite() && profile.fps_max.is_finite()) || profile.fps_min > profile.fps_max {
                return Err(CoreError::Config(format!(
                    "rate profile '{}' has an invalid fps range {}..{}",
                    profile.name, profile.fps_min, profile.fps_max
                )));
            }
            if profile.average_bitrate == 0 {
                return Err(CoreError::Config(format!(
                    "rate profile '{}' must have a positive average bitrate",
                    profile.name
                )));
            }
        }

        if !profiles.iter().any(|p| p.min_long_edge == 0) {
            return Err(CoreError::Config(
                "rate ladder needs a lowest tier with min_long_edge = 0".to_string(),
            ));
        }

        Ok(Self { profiles })
    }

    #[must_use]
    pub fn profiles(&self) -> &[RateProfile] {
        &self.profiles
    }

    /// The built-in ladder. Each tier has a low and a high frame-rate band with
    /// a deliberate gap between 30 and 48 fps.
    #[must_use]
    pub fn builtin() -> Self {
        let profiles = vec![
            RateProfile::new("SD 30fps", 0, 0.0, 30.0, 2_500_000),
            RateProfile::new("SD 60fps", 0, 48.0, 120.0, 3_500_000),
            RateProfile::new("720p 30fps", 1280, 0.0, 30.0, 5_000_000),
            RateProfile::new("720p 60fps", 1280, 48.0, 120.0, 7_500_000),
            RateProfile::new("1080p 30fps", 1920, 0.0, 30.0, 8_000_000),
            RateProfile::new("1080p 60fps", 1920, 48.0, 120.0, 12_000_000),
            RateProfile::new("1440p 30fps", 2560, 0.0, 30.0, 14_000_000),
            RateProfile::new("1440p 60fps", 2560, 48.0, 120.0, 20_000_000),
            RateProfile::new("4K 30fps", 3840, 0.0, 30.0, 20_000_000),
            RateProfile::new("4K 60fps", 3840, 48.0, 120.0, 30_000_000),
        ];
        Self { profiles }
    }
}
