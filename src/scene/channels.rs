use glam::{EulerRot, Mat4, Quat, Vec3};

/// One sampled pose within a clip.
///
/// `euler_angles` is the authoritative editable form of the rotation:
/// [`ClipChannels::recompose`] regenerates `rotation` from it. The
/// reverse derivation (matrix to Euler) happens only in the resize and
/// insert paths, never on ordinary edits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub translation: Mat4,
    pub euler_angles: Vec3,
    pub rotation: Mat4,
    pub scale: Mat4,
}

impl Keyframe {
    pub const IDENTITY: Self = Self {
        translation: Mat4::IDENTITY,
        euler_angles: Vec3::ZERO,
        rotation: Mat4::IDENTITY,
        scale: Mat4::IDENTITY,
    };

    /// A keyframe with `matrix` stuffed into every channel, the fill
    /// used when a clip is first allocated from a node's idle pose.
    #[must_use]
    pub fn from_matrix(matrix: Mat4) -> Self {
        Self {
            translation: matrix,
            euler_angles: euler_from_matrix(&matrix),
            rotation: matrix,
            scale: matrix,
        }
    }
}

impl Default for Keyframe {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Extracts XYZ Euler angles from the rotation part of a matrix.
fn euler_from_matrix(matrix: &Mat4) -> Vec3 {
    let (x, y, z) = Quat::from_mat4(matrix).to_euler(EulerRot::XYZ);
    Vec3::new(x, y, z)
}

/// Keyframe storage for one clip on one node.
///
/// `keys` and `composed` always have the same length, and
/// `max_playable_frame <= keys.len()`; every public operation on the
/// store re-establishes both. `composed` is a stored cache rather than
/// a derived value: the documented fill policies deliberately seed it
/// with matrices that are not `T * R * S` until the next
/// [`recompose`](Self::recompose).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipChannels {
    pub keys: Vec<Keyframe>,
    pub composed: Vec<Mat4>,
    /// Playback clamp: frames at and beyond this index are not played.
    /// Distinct from `keys.len()` so a clip can be trimmed without
    /// truncating storage.
    pub max_playable_frame: u32,
}

impl ClipChannels {
    /// Number of keyframes in this clip.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Regenerates every frame's rotation matrix from its Euler angles,
    /// then rebuilds the composed cache as `translation * rotation *
    /// scale`. This is the single authoritative path that must run after
    /// any direct edit to translation, Euler angles, or scale before the
    /// composed matrices are trusted again.
    pub fn recompose(&mut self) {
        self.composed.resize(self.keys.len(), Mat4::IDENTITY);
        for (key, out) in self.keys.iter_mut().zip(self.composed.iter_mut()) {
            key.rotation = Mat4::from_euler(
                EulerRot::XYZ,
                key.euler_angles.x,
                key.euler_angles.y,
                key.euler_angles.z,
            );
            *out = key.translation * key.rotation * key.scale;
        }
    }

    /// Re-derives the Euler angles of every frame from its rotation
    /// matrix. Only the resize and insert paths call this; editing the
    /// matrix channel directly does not back-derive Euler angles.
    pub(crate) fn rebuild_euler(&mut self) {
        for key in &mut self.keys {
            key.euler_angles = euler_from_matrix(&key.rotation);
        }
    }
}

/// All animation channels of one node, indexed by clip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelStore {
    pub clips: Vec<ClipChannels>,
}

impl ChannelStore {
    /// True if any clip slot exists, even one with zero frames.
    #[must_use]
    pub fn has_animations(&self) -> bool {
        !self.clips.is_empty()
    }

    #[must_use]
    pub fn num_animations(&self) -> usize {
        self.clips.len()
    }

    /// Borrows one clip's channels.
    ///
    /// # Panics
    /// Panics if `clip` is out of range.
    #[must_use]
    pub fn clip(&self, clip: usize) -> &ClipChannels {
        &self.clips[clip]
    }

    /// Mutably borrows one clip's channels. Callers editing keyframes
    /// through this must run [`ClipChannels::recompose`] before the next
    /// transform query.
    ///
    /// # Panics
    /// Panics if `clip` is out of range.
    pub fn clip_mut(&mut self, clip: usize) -> &mut ClipChannels {
        &mut self.clips[clip]
    }

    /// Sets `max_playable_frame` for `clip`. When the clip slot does not
    /// exist yet, empty channel slots are allocated for every clip index
    /// up to `clip` first.
    pub fn update_maximum_frame(&mut self, clip: usize, count: u32) {
        if self.clips.len() <= clip {
            self.clips.resize(clip + 1, ClipChannels::default());
        }
        self.clips[clip].max_playable_frame = count;
    }

    /// Resizes all channels of `clip` to `new_count` frames.
    ///
    /// Growing replicates the last existing frame so an extended clip
    /// holds its final pose; a clip that previously had zero frames is
    /// filled with `idle` in every channel, composed included. Shrinking
    /// truncates storage. Either way `max_playable_frame` moves to
    /// `new_count` and the Euler angles of the whole clip are re-derived
    /// from the rotation matrices. Resizing a non-empty clip to zero is
    /// a no-op.
    ///
    /// The composed cache is carried along by replication/truncation,
    /// not recomputed; run [`ClipChannels::recompose`] if `T * R * S`
    /// consistency is required afterwards.
    pub fn update_animation_size(&mut self, clip: usize, new_count: u32, idle: Mat4) {
        let clip_was_empty = self.clips.get(clip).is_none_or(ClipChannels::is_empty);
        if clip_was_empty {
            self.update_maximum_frame(clip, new_count);
            let channels = &mut self.clips[clip];
            channels.keys.resize(new_count as usize, Keyframe::from_matrix(idle));
            channels.composed.resize(new_count as usize, idle);
            channels.rebuild_euler();
            return;
        }

        if new_count == 0 {
            return;
        }

        self.update_maximum_frame(clip, new_count);
        let channels = &mut self.clips[clip];
        let fill = channels
            .keys
            .last()
            .copied()
            .unwrap_or_else(|| Keyframe::from_matrix(idle));
        let composed_fill = channels.composed.last().copied().unwrap_or(idle);
        channels.keys.resize(new_count as usize, fill);
        channels.composed.resize(new_count as usize, composed_fill);
        channels.rebuild_euler();
    }

    /// Duplicates the pose at `selected_frame` and inserts the copy
    /// directly after it, growing the clip by one frame and moving
    /// `max_playable_frame` to the new length. Does nothing on a store
    /// with no animation data.
    ///
    /// # Panics
    /// Panics if `clip` or `selected_frame` is out of range.
    pub fn insert_frame_after(&mut self, clip: usize, selected_frame: usize) {
        if !self.has_animations() {
            return;
        }

        let new_len = self.clips[clip].keys.len() as u32 + 1;
        self.update_maximum_frame(clip, new_len);

        let channels = &mut self.clips[clip];
        let key = channels.keys[selected_frame];
        let composed = channels.composed[selected_frame];
        channels.keys.insert(selected_frame + 1, key);
        channels.composed.insert(selected_frame + 1, composed);
        channels.rebuild_euler();
    }

    /// Runs [`ClipChannels::recompose`] on every clip.
    pub fn recompose_all(&mut self) {
        for channels in &mut self.clips {
            channels.recompose();
        }
    }
}
