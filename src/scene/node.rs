use glam::Mat4;
use smallvec::SmallVec;

use crate::animation::FrameBlend;
use crate::scene::NodeKey;
use crate::scene::channels::ChannelStore;

/// A named node in the rig hierarchy.
///
/// # Hierarchy
///
/// Nodes form a tree through parent-child relationships:
/// - `parent`: key of the parent node (`None` for the root), used only
///   for upward traversal, never for ownership
/// - `children`: ordered child keys, owned by this node through the
///   [`Rig`](crate::scene::Rig) arena
///
/// # Transforms
///
/// Every node carries an idle transform (its static pose) and, per
/// animation clip, keyframe channels in a [`ChannelStore`]. Every query
/// shape (idle, frame-indexed, time-interpolated) falls back to the
/// idle transform on a node with no animation data.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Identifier; unique only by convention.
    pub name: String,

    /// The idle transformation (no animation).
    pub transformation: Mat4,

    /// Parent node key (`None` for the root).
    pub(crate) parent: Option<NodeKey>,
    /// Child node keys, in order.
    pub(crate) children: Vec<NodeKey>,

    /// Indices into the external mesh table attached to this node.
    pub mesh_indices: SmallVec<[u32; 4]>,

    /// Per-clip keyframe channels.
    pub channels: ChannelStore,
}

impl Node {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            transformation: Mat4::IDENTITY,
            parent: None,
            children: Vec::new(),
            mesh_indices: SmallVec::new(),
            channels: ChannelStore::default(),
        }
    }

    /// Creates a node with the given idle transform.
    #[must_use]
    pub fn with_transformation(name: &str, transformation: Mat4) -> Self {
        let mut node = Self::new(name);
        node.transformation = transformation;
        node
    }

    /// Returns the parent node key, if any.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Returns a read-only slice of child node keys.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn has_animations(&self) -> bool {
        self.channels.has_animations()
    }

    #[inline]
    #[must_use]
    pub fn has_mesh(&self) -> bool {
        !self.mesh_indices.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn num_animations(&self) -> usize {
        self.channels.num_animations()
    }

    /// The idle transformation.
    #[inline]
    #[must_use]
    pub fn idle_transform(&self) -> Mat4 {
        self.transformation
    }

    /// Frame-indexed transformation: the composed matrix of `frame` in
    /// `clip`. A node with no animation data answers with the idle
    /// transform instead.
    ///
    /// # Panics
    /// Panics if the node is animated and `clip` or `frame` is out of
    /// range.
    #[must_use]
    pub fn frame_transform(&self, clip: usize, frame: usize) -> Mat4 {
        if !self.has_animations() {
            return self.idle_transform();
        }
        self.channels.clip(clip).composed[frame]
    }

    /// Time-interpolated transformation: a linear blend of the two
    /// composed matrices bounding the current playback time.
    ///
    /// This is a direct lerp of 4x4 matrices, not a rotation-aware
    /// blend; large angle deltas produce non-orthogonal intermediates.
    /// A node with no animation data answers with the idle transform.
    ///
    /// # Panics
    /// Panics if the node is animated and `clip` or the blend's
    /// floor/ceil frames are out of range.
    #[must_use]
    pub fn blended_transform(&self, clip: usize, blend: &FrameBlend) -> Mat4 {
        if !self.has_animations() {
            return self.idle_transform();
        }

        let composed = &self.channels.clip(clip).composed;
        let ratio = blend.ratio();
        let floor = composed[blend.tick_floor as usize];
        let ceil = composed[blend.tick_ceil as usize];

        ceil * ratio + floor * (1.0 - ratio)
    }

    /// Resizes all channels of `clip` to `count` frames; new frames
    /// replicate the last pose, or this node's idle transform when the
    /// clip was empty. See [`ChannelStore::update_animation_size`].
    pub fn update_animation_size(&mut self, clip: usize, count: u32) {
        let idle = self.transformation;
        self.channels.update_animation_size(clip, count, idle);
    }

    /// Sets the playback clamp for `clip`. See
    /// [`ChannelStore::update_maximum_frame`].
    pub fn update_maximum_frame(&mut self, clip: usize, count: u32) {
        self.channels.update_maximum_frame(clip, count);
    }

    /// Duplicates `selected_frame` of `clip` directly after itself. See
    /// [`ChannelStore::insert_frame_after`].
    pub fn insert_frame_after(&mut self, clip: usize, selected_frame: usize) {
        self.channels.insert_frame_after(clip, selected_frame);
    }

    /// Recomposes every clip's matrices after direct channel edits.
    pub fn recompose(&mut self) {
        self.channels.recompose_all();
    }
}
