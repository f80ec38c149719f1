//! Media description.
//!
//! Turns raw prober answers into a normalized [`MediaDescriptor`]: the single
//! view of a source file that planning works from.

pub mod descriptor;

pub use descriptor::{
    AudioStreamDescriptor, BitrateProvenance, ColorMetadata, MediaDescriptor, build_descriptor,
};
