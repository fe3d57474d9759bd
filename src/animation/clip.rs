/// One entry in a rig's animation clip directory.
///
/// Clips are identified by their index in the directory; every node's
/// channel arrays are indexed by the same integer. The directory is the
/// scene-scoped record of clip identity, so per-clip metadata lives here
/// rather than being duplicated on every node.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    pub name: String,
    /// Number of keyframe ticks in the clip.
    pub tick_count: u32,
    /// Clip length in time units.
    pub duration: f32,
    /// Scene-wide playback clamp, kept in sync with the per-node clamps
    /// by the rig's fan-out operations.
    pub max_playable_frame: u32,
}

impl ClipInfo {
    #[must_use]
    pub fn new(name: &str, tick_count: u32, duration: f32) -> Self {
        Self {
            name: name.to_owned(),
            tick_count,
            duration,
            max_playable_frame: tick_count,
        }
    }

    /// The clip-defined time step: duration divided by tick count, or
    /// zero for a clip with no ticks.
    #[must_use]
    pub fn time_step(&self) -> f32 {
        if self.tick_count == 0 {
            0.0
        } else {
            self.duration / self.tick_count as f32
        }
    }
}
