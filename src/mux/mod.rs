//! Combining the captured tracks into the final recording

pub mod muxer;
pub mod pipeline;
pub mod retry;

pub use muxer::{FfmpegMuxer, FileMover, FsMover, MediaMuxer};
pub use pipeline::{CaptureParts, FinalizeStrategy, MuxMixPipeline};
pub use retry::RetryPolicy;
