//! Binary encode/decode of a rig and its node tree.
//!
//! Little-endian throughout, with explicit field widths (u64 lengths,
//! f32 matrix/vector components, u8 flags). The stream starts with a
//! small envelope (magic, format version, clip directory) followed by
//! the root node record; node records nest depth-first pre-order.
//!
//! Malformed streams (bad magic, unknown version, size fields that
//! disagree with each other or with the remaining bytes) are fatal:
//! the load aborts and the caller must discard the destination rig.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::animation::{ClipInfo, PlaybackClock};
use crate::errors::{ArmatureError, Result};
use crate::scene::NodeKey;
use crate::scene::channels::{ChannelStore, ClipChannels, Keyframe};
use crate::scene::node::Node;
use crate::scene::rig::Rig;

const MAGIC: &[u8; 4] = b"ARMA";
const FORMAT_VERSION: u32 = 1;

/// Length fields beyond this are treated as stream corruption.
const LEN_SANITY_LIMIT: u64 = 1 << 24;

impl Rig {
    /// Serializes the whole rig: envelope, clip directory, node tree.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;

        write_len(writer, self.clips.len())?;
        for clip in &self.clips {
            write_string(writer, &clip.name)?;
            writer.write_u32::<LittleEndian>(clip.tick_count)?;
            writer.write_f32::<LittleEndian>(clip.duration)?;
            writer.write_u32::<LittleEndian>(clip.max_playable_frame)?;
        }

        match self.root() {
            Some(root) => {
                writer.write_u8(1)?;
                self.write_node(root, writer)?;
            }
            None => writer.write_u8(0)?,
        }

        Ok(())
    }

    /// Deserializes a rig previously written by [`save`](Self::save).
    ///
    /// Any failure is total: the partially-built rig is dropped and the
    /// error surfaced to the caller.
    pub fn load<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(ArmatureError::InvalidMagic {
                expected: String::from_utf8_lossy(MAGIC).into_owned(),
                actual: String::from_utf8_lossy(&magic).into_owned(),
            });
        }

        let version = reader.read_u32::<LittleEndian>()?;
        if version > FORMAT_VERSION {
            return Err(ArmatureError::UnsupportedVersion(version));
        }

        let mut rig = Rig::new();

        let clip_count = read_len(reader)?;
        rig.clips.reserve(clip_count);
        for _ in 0..clip_count {
            let name = read_string(reader)?;
            let tick_count = reader.read_u32::<LittleEndian>()?;
            let duration = reader.read_f32::<LittleEndian>()?;
            let max_playable_frame = reader.read_u32::<LittleEndian>()?;
            rig.clips.push(ClipInfo {
                name,
                tick_count,
                duration,
                max_playable_frame,
            });
        }

        let has_root = read_flag(reader)?;
        if has_root {
            let root = rig.read_node(reader, None)?;
            rig.set_loaded_root(root);
        }
        rig.rebuild_node_index();

        rig.clock = PlaybackClock::new();
        if let Some(first) = rig.clips.first() {
            rig.clock.set_time_step(first.time_step());
        }

        Ok(rig)
    }

    /// Saves to a file path, buffered.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Loads from a file path, buffered.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::load(&mut reader)
    }

    /// One node record, depth-first pre-order:
    /// name, parent flag, idle transform, mesh indices, children
    /// (recursive), then for each channel in turn (composed,
    /// translation, Euler angles, rotation, scale) the per-clip frame
    /// counts and payloads, and finally the per-clip playable clamps.
    fn write_node<W: Write>(&self, key: NodeKey, writer: &mut W) -> Result<()> {
        let node = &self.nodes[key];

        write_string(writer, &node.name)?;
        writer.write_u8(u8::from(node.parent().is_some()))?;
        write_mat4(writer, &node.transformation)?;

        write_len(writer, node.mesh_indices.len())?;
        for &index in &node.mesh_indices {
            writer.write_u32::<LittleEndian>(index)?;
        }

        write_len(writer, node.children().len())?;
        for &child in node.children() {
            self.write_node(child, writer)?;
        }

        let clips = &node.channels.clips;
        write_len(writer, clips.len())?;
        for clip in clips {
            write_len(writer, clip.composed.len())?;
            for matrix in &clip.composed {
                write_mat4(writer, matrix)?;
            }
        }
        for clip in clips {
            write_len(writer, clip.keys.len())?;
            for frame in &clip.keys {
                write_mat4(writer, &frame.translation)?;
            }
        }
        for clip in clips {
            write_len(writer, clip.keys.len())?;
            for frame in &clip.keys {
                write_vec3(writer, &frame.euler_angles)?;
            }
        }
        for clip in clips {
            write_len(writer, clip.keys.len())?;
            for frame in &clip.keys {
                write_mat4(writer, &frame.rotation)?;
            }
        }
        for clip in clips {
            write_len(writer, clip.keys.len())?;
            for frame in &clip.keys {
                write_mat4(writer, &frame.scale)?;
            }
        }
        if !clips.is_empty() {
            for clip in clips {
                writer.write_u32::<LittleEndian>(clip.max_playable_frame)?;
            }
        }

        Ok(())
    }

    fn read_node<R: Read>(&mut self, reader: &mut R, parent: Option<NodeKey>) -> Result<NodeKey> {
        let name = read_string(reader)?;

        let had_parent = read_flag(reader)?;
        if had_parent != parent.is_some() {
            return Err(ArmatureError::CorruptStream(format!(
                "node '{name}': parent flag disagrees with tree position"
            )));
        }

        let transformation = read_mat4(reader)?;

        let mesh_count = read_len(reader)?;
        let mut mesh_indices = SmallVec::with_capacity(mesh_count);
        for _ in 0..mesh_count {
            mesh_indices.push(reader.read_u32::<LittleEndian>()?);
        }

        let key = self.nodes.insert(Node {
            name,
            transformation,
            parent,
            children: Vec::new(),
            mesh_indices,
            channels: ChannelStore::default(),
        });
        if let Some(parent_key) = parent {
            self.nodes[parent_key].children.push(key);
        }

        let child_count = read_len(reader)?;
        for _ in 0..child_count {
            self.read_node(reader, Some(key))?;
        }

        // Channel arrays are pre-sized from the explicit counts (identity
        // matrices, zero vectors) before the payloads are read, so even a
        // zero-length payload leaves the clip well-formed.
        let clip_count = read_len(reader)?;
        let mut clips = vec![ClipChannels::default(); clip_count];
        for clip in &mut clips {
            let frames = read_len(reader)?;
            clip.composed = vec![Mat4::IDENTITY; frames];
            for matrix in &mut clip.composed {
                *matrix = read_mat4(reader)?;
            }
        }
        for (index, clip) in clips.iter_mut().enumerate() {
            let frames = read_channel_len(reader, index, clip.composed.len())?;
            clip.keys = vec![Keyframe::IDENTITY; frames];
            for frame_key in &mut clip.keys {
                frame_key.translation = read_mat4(reader)?;
            }
        }
        for (index, clip) in clips.iter_mut().enumerate() {
            read_channel_len(reader, index, clip.keys.len())?;
            for frame_key in &mut clip.keys {
                frame_key.euler_angles = read_vec3(reader)?;
            }
        }
        for (index, clip) in clips.iter_mut().enumerate() {
            read_channel_len(reader, index, clip.keys.len())?;
            for frame_key in &mut clip.keys {
                frame_key.rotation = read_mat4(reader)?;
            }
        }
        for (index, clip) in clips.iter_mut().enumerate() {
            read_channel_len(reader, index, clip.keys.len())?;
            for frame_key in &mut clip.keys {
                frame_key.scale = read_mat4(reader)?;
            }
        }
        if clip_count > 0 {
            for clip in &mut clips {
                clip.max_playable_frame = reader.read_u32::<LittleEndian>()?;
            }
        }

        self.nodes[key].channels = ChannelStore { clips };
        Ok(key)
    }
}

// ============================================================================
// Wire primitives
// ============================================================================

fn write_len<W: Write>(writer: &mut W, len: usize) -> Result<()> {
    writer.write_u64::<LittleEndian>(len as u64)?;
    Ok(())
}

fn read_len<R: Read>(reader: &mut R) -> Result<usize> {
    let len = reader.read_u64::<LittleEndian>()?;
    if len > LEN_SANITY_LIMIT {
        return Err(ArmatureError::CorruptStream(format!(
            "length field {len} exceeds sanity limit"
        )));
    }
    Ok(len as usize)
}

/// Reads a channel's frame count and checks it against the lengths
/// already established for the clip: all channels of one clip must
/// agree.
fn read_channel_len<R: Read>(reader: &mut R, clip: usize, expected: usize) -> Result<usize> {
    let frames = read_len(reader)?;
    if frames != expected {
        return Err(ArmatureError::CorruptStream(format!(
            "clip {clip}: channel declares {frames} frames, expected {expected}"
        )));
    }
    Ok(frames)
}

fn read_flag<R: Read>(reader: &mut R) -> Result<bool> {
    match reader.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ArmatureError::CorruptStream(format!(
            "flag byte must be 0 or 1, got {other}"
        ))),
    }
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    write_len(writer, value.len())?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_len(reader)?;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes)
        .map_err(|_| ArmatureError::CorruptStream("string is not valid UTF-8".to_owned()))
}

fn write_mat4<W: Write>(writer: &mut W, matrix: &Mat4) -> Result<()> {
    for component in matrix.to_cols_array() {
        writer.write_f32::<LittleEndian>(component)?;
    }
    Ok(())
}

fn read_mat4<R: Read>(reader: &mut R) -> Result<Mat4> {
    let mut components = [0f32; 16];
    for component in &mut components {
        *component = reader.read_f32::<LittleEndian>()?;
    }
    Ok(Mat4::from_cols_array(&components))
}

fn write_vec3<W: Write>(writer: &mut W, vector: &Vec3) -> Result<()> {
    writer.write_f32::<LittleEndian>(vector.x)?;
    writer.write_f32::<LittleEndian>(vector.y)?;
    writer.write_f32::<LittleEndian>(vector.z)?;
    Ok(())
}

fn read_vec3<R: Read>(reader: &mut R) -> Result<Vec3> {
    let x = reader.read_f32::<LittleEndian>()?;
    let y = reader.read_f32::<LittleEndian>()?;
    let z = reader.read_f32::<LittleEndian>()?;
    Ok(Vec3::new(x, y, z))
}
