//! Rate profile resolution.
//!
//! Resolution is a two-stage match against the [`RateLadder`]: first the
//! resolution tier (by longer edge), then the frame-rate band within that tier.
//! The chosen baseline is scaled by the user's modifier and finally capped so
//! it never exceeds the source's own bitrate.

use serde::Serialize;

use crate::config::{RateLadder, RateProfile};

/// Peak rate relative to the average bitrate.
pub const MAX_RATE_RATIO: f64 = 1.5;

/// VBV buffer size relative to the average bitrate.
pub const BUFFER_SIZE_RATIO: f64 = 2.0;

/// Target rate-control values for one encode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRateParameters {
    pub profile_name: String,
    pub average_bitrate: u64,
    pub max_rate: u64,
    pub buffer_size: u64,
    /// Whether the values were scaled down to the source bitrate.
    pub source_cap_applied: bool,
}

/// Picks the single profile for a frame of `max_dimension` pixels at `fps`.
#[must_use]
pub fn select_profile(ladder: &RateLadder, max_dimension: u32, fps: f64) -> &RateProfile {
    let profiles = ladder.profiles();

    let tier = profiles
        .iter()
        .map(|p| p.min_long_edge)
        .filter(|threshold| *threshold <= max_dimension)
        .max()
        .unwrap_or(0);

    let mut candidates = profiles.iter().filter(|p| p.min_long_edge == tier);

    // The ladder guarantees a zero tier, so the first candidate always exists.
    let Some(first) = candidates.next() else {
        return &profiles[0];
    };

    if first.contains_fps(fps) {
        return first;
    }

    let mut best = first;
    let mut best_distance = first.fps_distance(fps);
    for profile in candidates {
        if profile.contains_fps(fps) {
            return profile;
        }
        let distance = profile.fps_distance(fps);
        if distance < best_distance {
            best = profile;
            best_distance = distance;
        }
    }
    best
}

/// Resolves target bitrate, peak rate and buffer size.
///
/// `source_bitrate` of zero means unknown and never caps.
#[must_use]
pub fn resolve(
    ladder: &RateLadder,
    max_dimension: u32,
    fps: f64,
    bitrate_modifier: f64,
    source_bitrate: u64,
) -> ResolvedRateParameters {
    let profile = select_profile(ladder, max_dimension, fps);

    let mut average = profile.average_bitrate as f64 * bitrate_modifier;
    let mut max_rate = average * MAX_RATE_RATIO;
    let mut buffer_size = average * BUFFER_SIZE_RATIO;

    let source_cap_applied = source_bitrate > 0 && average > source_bitrate as f64;
    if source_cap_applied {
        let ratio = source_bitrate as f64 / average;
        average *= ratio;
        max_rate *= ratio;
        buffer_size *= ratio;
        log::info!(
            "Capping {} bitrate to source bitrate {} b/s (ratio {:.3})",
            profile.name,
            source_bitrate,
            ratio
        );
    }

    ResolvedRateParameters {
        profile_name: profile.name.clone(),
        average_bitrate: average.round() as u64,
        max_rate: max_rate.round() as u64,
        buffer_size: buffer_size.round() as u64,
        source_cap_applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> RateLadder {
        RateLadder::builtin()
    }

    #[test]
    fn test_4k_30fps_base_profile() {
        let params = resolve(&ladder(), 3840, 30.0, 1.0, 0);
        assert_eq!(params.profile_name, "4K 30fps");
        assert_eq!(params.average_bitrate, 20_000_000);
        assert_eq!(params.max_rate, 30_000_000);
        assert_eq!(params.buffer_size, 40_000_000);
        assert!(!params.source_cap_applied);
    }

    #[test]
    fn test_below_every_threshold_uses_zero_tier() {
        assert_eq!(select_profile(&ladder(), 0, 25.0).name, "SD 30fps");
        assert_eq!(select_profile(&ladder(), 640, 25.0).name, "SD 30fps");
    }

    #[test]
    fn test_fps_gap_uses_nearest_edge() {
        // 40 fps: 10 from the 30fps band, 8 from the 60fps band
        assert_eq!(select_profile(&ladder(), 1920, 40.0).name, "1080p 60fps");
        // 35 fps: 5 from the 30fps band, 13 from the 60fps band
        assert_eq!(select_profile(&ladder(), 1920, 35.0).name, "1080p 30fps");
    }

    #[test]
    fn test_fps_tie_first_declared_wins() {
        let ladder = RateLadder::new(vec![
            RateProfile::new("low", 0, 0.0, 30.0, 1_000_000),
            RateProfile::new("high", 0, 40.0, 60.0, 2_000_000),
        ])
        .unwrap();
        assert_eq!(select_profile(&ladder, 100, 35.0).name, "low");
    }

    #[test]
    fn test_overlapping_ranges_first_exact_match_wins() {
        let ladder = RateLadder::new(vec![
            RateProfile::new("a", 0, 0.0, 60.0, 1_000_000),
            RateProfile::new("b", 0, 24.0, 30.0, 2_000_000),
        ])
        .unwrap();
        assert_eq!(select_profile(&ladder, 100, 25.0).name, "a");
    }

    #[test]
    fn test_modifier_applies_before_ratios() {
        let params = resolve(&ladder(), 1920, 24.0, 0.5, 0);
        assert_eq!(params.average_bitrate, 4_000_000);
        assert_eq!(params.max_rate, 6_000_000);
        assert_eq!(params.buffer_size, 8_000_000);
    }

    #[test]
    fn test_source_cap_preserves_ratios() {
        let params = resolve(&ladder(), 1920, 24.0, 1.0, 3_000_001);
        assert!(params.source_cap_applied);
        assert_eq!(params.average_bitrate, 3_000_001);
        let max_ratio = params.max_rate as f64 / params.average_bitrate as f64;
        let buf_ratio = params.buffer_size as f64 / params.average_bitrate as f64;
        assert!((max_ratio - MAX_RATE_RATIO).abs() < 1e-6);
        assert!((buf_ratio - BUFFER_SIZE_RATIO).abs() < 1e-6);
    }

    #[test]
    fn test_zero_source_bitrate_never_caps() {
        let params = resolve(&ladder(), 3840, 60.0, 3.0, 0);
        assert!(!params.source_cap_applied);
        assert_eq!(params.average_bitrate, 90_000_000);
    }

    #[test]
    fn test_source_above_target_does_not_cap() {
        let params = resolve(&ladder(), 1920, 24.0, 1.0, 50_000_000);
        assert!(!params.source_cap_applied);
        assert_eq!(params.average_bitrate, 8_000_000);
    }

    #[test]
    fn test_every_pair_resolves_with_fixed_ratios() {
        let ladder = ladder();
        for dim in [0, 320, 1279, 1280, 1920, 2559, 2560, 3840, 7680] {
            for fps in [0.0, 12.0, 23.976, 30.0, 39.0, 48.0, 59.94, 120.0, 240.0] {
                let params = resolve(&ladder, dim, fps, 1.0, 0);
                assert_eq!(params.max_rate * 2, params.average_bitrate * 3);
                assert_eq!(params.buffer_size, params.average_bitrate * 2);
            }
        }
    }
}
