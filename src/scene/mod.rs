//! Scene-graph module
//!
//! Manages the node hierarchy and its animation channels:
//! - Node: a named tree node with an idle transform and keyframe channels
//! - ChannelStore / ClipChannels / Keyframe: per-clip keyframe storage
//! - Rig: the owning container (arena, pre-order index, clip directory)
//! - Serialization: binary encode/decode of the whole tree

pub mod channels;
pub mod node;
pub mod rig;
pub mod serialize;

pub use channels::{ChannelStore, ClipChannels, Keyframe};
pub use node::Node;
pub use rig::{Rig, WorldPose};

use slotmap::new_key_type;

new_key_type! {
    /// Stable, non-owning handle to a node in a [`Rig`]'s arena.
    ///
    /// Keys are how parents are referenced back from children; ownership
    /// flows strictly parent-to-children through the arena.
    pub struct NodeKey;
}
