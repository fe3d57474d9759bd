use glam::{Mat4, Vec3};
use slotmap::SlotMap;

use crate::animation::{ClipInfo, FrameBlend, PlaybackClock};
use crate::scene::NodeKey;
use crate::scene::node::Node;

/// The node hierarchy of one imported asset, plus its animation clip
/// directory and playback clock.
///
/// # Ownership
///
/// Nodes live in an arena; the tree owns them strictly parent-to-child
/// from a single root. `all_nodes` is the order-stable pre-order
/// enumeration of every reachable node, giving external systems O(1)
/// access by position.
///
/// # Ticking
///
/// One cooperative [`update`](Self::update) per frame advances the
/// clock; transform queries then combine the clock's floor/ceil/fraction
/// with each node's composed matrices. All channel edits are synchronous
/// and complete before the next query.
#[derive(Debug)]
pub struct Rig {
    pub(crate) nodes: SlotMap<NodeKey, Node>,
    root: Option<NodeKey>,
    all_nodes: Vec<NodeKey>,

    /// Per-clip metadata, shared across all nodes of this rig.
    pub clips: Vec<ClipInfo>,
    pub clock: PlaybackClock,
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

impl Rig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
            all_nodes: Vec::new(),
            clips: Vec::new(),
            clock: PlaybackClock::new(),
        }
    }

    // ========================================================================
    // Tree construction & lookup
    // ========================================================================

    /// Installs `node` as the root of an empty rig.
    ///
    /// # Panics
    /// Panics if the rig already has a root.
    pub fn add_root(&mut self, node: Node) -> NodeKey {
        assert!(self.root.is_none(), "rig already has a root node");
        let key = self.nodes.insert(node);
        self.root = Some(key);
        self.rebuild_node_index();
        key
    }

    /// Inserts `node` as the last child of `parent`.
    ///
    /// # Panics
    /// Panics if `parent` is not a node of this rig.
    pub fn add_child(&mut self, parent: NodeKey, mut node: Node) -> NodeKey {
        assert!(
            self.nodes.contains_key(parent),
            "parent key is not in this rig"
        );
        node.parent = Some(parent);
        let key = self.nodes.insert(node);
        self.nodes[parent].children.push(key);
        self.rebuild_node_index();
        key
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeKey> {
        self.root
    }

    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// The order-stable pre-order enumeration of every node.
    #[must_use]
    pub fn all_nodes(&self) -> &[NodeKey] {
        &self.all_nodes
    }

    /// The node at position `index` of the pre-order enumeration.
    #[must_use]
    pub fn node_at(&self, index: usize) -> Option<&Node> {
        self.all_nodes.get(index).and_then(|&key| self.nodes.get(key))
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.all_nodes.len()
    }

    /// Finds the first node (in pre-order) with the given name.
    #[must_use]
    pub fn find_node(&self, name: &str) -> Option<NodeKey> {
        self.all_nodes
            .iter()
            .copied()
            .find(|&key| self.nodes[key].name == name)
    }

    /// Adopts a root that was inserted directly into the arena by the
    /// deserializer.
    pub(crate) fn set_loaded_root(&mut self, key: NodeKey) {
        self.root = Some(key);
    }

    /// Recomputes the pre-order node enumeration. Every structural
    /// mutation calls this; external callers only need it after editing
    /// `children` directly.
    pub fn rebuild_node_index(&mut self) {
        self.all_nodes.clear();
        let Some(root) = self.root else {
            return;
        };

        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            self.all_nodes.push(key);
            if let Some(node) = self.nodes.get(key) {
                for &child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
    }

    /// Logs the hierarchy pre-order at debug level, one line per node.
    pub fn log_hierarchy(&self) {
        let Some(root) = self.root else {
            log::debug!("(empty rig)");
            return;
        };

        let mut stack = vec![(root, 0usize)];
        while let Some((key, depth)) = stack.pop() {
            let node = &self.nodes[key];
            log::debug!(
                "{:indent$}{} (meshes: {}, clips: {})",
                "",
                node.name,
                node.mesh_indices.len(),
                node.num_animations(),
                indent = depth * 2
            );
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
    }

    // ========================================================================
    // Clip directory & playback
    // ========================================================================

    #[must_use]
    pub fn has_animations(&self) -> bool {
        !self.clips.is_empty()
    }

    #[must_use]
    pub fn num_animations(&self) -> usize {
        self.clips.len()
    }

    /// Switches the active clip, resetting the clock and adopting the
    /// clip-defined time step. An out-of-range index is ignored with a
    /// warning.
    pub fn set_active_clip(&mut self, clip: u32) {
        let Some(info) = self.clips.get(clip as usize) else {
            log::warn!("set_active_clip: no clip {clip} in directory");
            return;
        };
        self.clock.set_clip(clip);
        self.clock.set_time_step(info.time_step());
    }

    /// Rewinds playback to frame zero without changing play state.
    pub fn reset_animation(&mut self) {
        self.clock.reset_animation();
    }

    /// One cooperative tick: advances the clock against the active
    /// clip's playable range. No-op on a rig without clips.
    pub fn update(&mut self, dt: f32) {
        let Some(info) = self.clips.get(self.clock.clip_index as usize) else {
            return;
        };
        self.clock.advance(dt, info.max_playable_frame);
    }

    /// The interpolation inputs for the clock's current time.
    #[must_use]
    pub fn blend(&self) -> FrameBlend {
        FrameBlend::from(&self.clock)
    }

    // ========================================================================
    // Scene-wide channel edits
    // ========================================================================

    /// Resizes `clip` to `ticks` keyframes on every node and in the
    /// directory. The playable clamp follows the new length.
    ///
    /// # Panics
    /// Panics if `clip` is not in the directory.
    pub fn set_clip_length(&mut self, clip: usize, ticks: u32) {
        for i in 0..self.all_nodes.len() {
            let key = self.all_nodes[i];
            self.nodes[key].update_animation_size(clip, ticks);
        }
        let info = &mut self.clips[clip];
        info.tick_count = ticks;
        info.max_playable_frame = ticks;
    }

    /// Duplicates `selected_frame` of `clip` on every animated node and
    /// grows the directory entry by one tick.
    ///
    /// # Panics
    /// Panics if `clip` is not in the directory, or if `selected_frame`
    /// is out of range on an animated node.
    pub fn insert_frame(&mut self, clip: usize, selected_frame: usize) {
        for i in 0..self.all_nodes.len() {
            let key = self.all_nodes[i];
            self.nodes[key].insert_frame_after(clip, selected_frame);
        }
        let info = &mut self.clips[clip];
        info.tick_count += 1;
        info.max_playable_frame = info.tick_count;
    }

    /// Sets the playback clamp of `clip` in the directory and on every
    /// animated node. Editing is never gated by the clamp; it bounds
    /// playback only.
    ///
    /// # Panics
    /// Panics if `clip` is not in the directory.
    pub fn set_max_playable_frame(&mut self, clip: usize, count: u32) {
        for i in 0..self.all_nodes.len() {
            let key = self.all_nodes[i];
            if self.nodes[key].has_animations() {
                self.nodes[key].update_maximum_frame(clip, count);
            }
        }
        self.clips[clip].max_playable_frame = count;
    }

    // ========================================================================
    // Global transforms
    // ========================================================================

    /// Idle global transformation: the idle matrices accumulated from
    /// the root down to `key` (root's matrix leftmost).
    ///
    /// # Panics
    /// Panics if `key` is not a node of this rig.
    #[must_use]
    pub fn global_transform(&self, key: NodeKey) -> Mat4 {
        self.fold_to_root(key, Node::idle_transform)
    }

    /// Frame-indexed global transformation.
    ///
    /// # Panics
    /// Panics if `key` is not a node of this rig, or if `clip`/`frame`
    /// is out of range on an animated node in the chain.
    #[must_use]
    pub fn global_frame_transform(&self, key: NodeKey, clip: usize, frame: usize) -> Mat4 {
        self.fold_to_root(key, |node| node.frame_transform(clip, frame))
    }

    /// Time-interpolated global transformation.
    ///
    /// # Panics
    /// Panics if `key` is not a node of this rig, or if `clip` or the
    /// blend's frames are out of range on an animated node in the chain.
    #[must_use]
    pub fn global_blended_transform(&self, key: NodeKey, clip: usize, blend: &FrameBlend) -> Mat4 {
        self.fold_to_root(key, |node| node.blended_transform(clip, blend))
    }

    /// The derived orientation bundle of a node's global transform, as
    /// consumed by spatial-audio geometry.
    ///
    /// # Panics
    /// Panics if `key` is not a node of this rig.
    #[must_use]
    pub fn world_pose(&self, key: NodeKey) -> WorldPose {
        WorldPose::from_matrix(&self.global_transform(key))
    }

    /// Walks from `key` up to the root, multiplying each ancestor's
    /// local matrix on the left. Terminates at the parentless root; the
    /// no-cycle tree invariant guarantees no node is visited twice.
    fn fold_to_root(&self, key: NodeKey, local: impl Fn(&Node) -> Mat4) -> Mat4 {
        let node = &self.nodes[key];
        let mut accumulated = local(node);
        let mut current = node.parent;
        while let Some(parent_key) = current {
            let parent = &self.nodes[parent_key];
            accumulated = local(parent) * accumulated;
            current = parent.parent;
        }
        accumulated
    }
}

/// Position and orientation vectors extracted from a world matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPose {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub scale: Vec3,
}

impl WorldPose {
    #[must_use]
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, _, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            forward: matrix.transform_vector3(-Vec3::Z).normalize_or_zero(),
            up: matrix.transform_vector3(Vec3::Y).normalize_or_zero(),
            scale,
        }
    }
}
