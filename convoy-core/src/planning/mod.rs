//! Conversion planning.
//!
//! Pure decision logic: rate resolution, container and audio compatibility,
//! and the plan compiler that combines them for one file.

pub mod compatibility;
pub mod plan;
pub mod rate;

pub use compatibility::{
    AudioPlan, AudioPreferences, AudioTarget, ContainerCheck, StreamMapMode, resolve_audio, resolve_video_container,
};
pub use plan::{BatchNames, ConversionPlan, EncoderStrategy, HwAccelMethod, PlanRejection, compile_plan, output_path_for};
pub use rate::{ResolvedRateParameters, resolve, select_profile};
