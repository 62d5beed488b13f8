pub mod ffmpeg;
pub mod logger;

pub use ffmpeg::{probe_duration_ms, DurationProbe, FfprobeDuration};
pub use logger::init_logger;
