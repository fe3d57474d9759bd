pub mod clip;
pub mod clock;

pub use clip::ClipInfo;
pub use clock::{FrameBlend, LoopMode, PlaybackClock, PlaybackState};
