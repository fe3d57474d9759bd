//! Transform Query Tests
//!
//! Tests for:
//! - Node: idle, frame-indexed, and time-interpolated local transforms
//! - Rig: global transform accumulation root-to-leaf
//! - FrameBlend ratio guard and interpolation boundaries
//! - No-animation fallback across all query shapes
//! - WorldPose extraction

use glam::{Mat4, Vec3};

use armature::animation::FrameBlend;
use armature::scene::{Keyframe, Node, Rig, WorldPose};

const EPSILON: f32 = 1e-5;

fn approx_mat(a: &Mat4, b: &Mat4) -> bool {
    a.to_cols_array()
        .iter()
        .zip(b.to_cols_array().iter())
        .all(|(x, y)| (x - y).abs() < EPSILON)
}

fn translate(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, y, z))
}

// ============================================================================
// Global Transforms (idle)
// ============================================================================

#[test]
fn global_transform_three_level_chain() {
    let mut rig = Rig::new();
    let root = rig.add_root(Node::with_transformation("root", translate(1.0, 0.0, 0.0)));
    let a = rig.add_child(root, Node::with_transformation("a", translate(0.0, 2.0, 0.0)));
    let b = rig.add_child(a, Node::with_transformation("b", translate(0.0, 0.0, 3.0)));

    let expected = translate(1.0, 0.0, 0.0) * translate(0.0, 2.0, 0.0) * translate(0.0, 0.0, 3.0);
    let global = rig.global_transform(b);
    assert!(
        approx_mat(&global, &expected),
        "root * a * b expected, got {global}"
    );
}

#[test]
fn global_transform_of_root_is_its_idle() {
    let mut rig = Rig::new();
    let root = rig.add_root(Node::with_transformation("root", translate(4.0, 5.0, 6.0)));
    assert!(approx_mat(&rig.global_transform(root), &translate(4.0, 5.0, 6.0)));
}

// ============================================================================
// Scenario: two-node chain, then an animated child
// ============================================================================

#[test]
fn two_node_chain_then_animated_child() {
    let mut rig = Rig::new();
    let root = rig.add_root(Node::with_transformation("root", translate(1.0, 0.0, 0.0)));
    let child = rig.add_child(root, Node::with_transformation("child", translate(0.0, 2.0, 0.0)));

    // No animation: child's global is the composed idle chain.
    assert!(approx_mat(
        &rig.global_transform(child),
        &translate(1.0, 2.0, 0.0)
    ));

    // Give the child a 3-frame clip and author frame 1 by hand.
    let node = rig.node_mut(child).unwrap();
    node.update_animation_size(0, 3);
    node.channels.clip_mut(0).keys[1] = Keyframe {
        translation: translate(0.0, 5.0, 0.0),
        euler_angles: Vec3::ZERO,
        rotation: Mat4::IDENTITY,
        scale: Mat4::IDENTITY,
    };
    node.channels.clip_mut(0).recompose();

    let frame1 = rig.node(child).unwrap().frame_transform(0, 1);
    assert!(
        approx_mat(&frame1, &translate(0.0, 5.0, 0.0)),
        "composed frame 1 should be T * I * I, got {frame1}"
    );
}

// ============================================================================
// Frame-indexed queries
// ============================================================================

#[test]
fn frame_transform_reads_composed() {
    let mut node = Node::new("n");
    node.update_animation_size(0, 2);
    node.channels.clip_mut(0).keys[0].translation = translate(7.0, 0.0, 0.0);
    node.channels.clip_mut(0).recompose();

    assert!(approx_mat(
        &node.frame_transform(0, 0),
        &translate(7.0, 0.0, 0.0)
    ));
}

#[test]
fn global_frame_transform_accumulates_animated_and_static() {
    let mut rig = Rig::new();
    let root = rig.add_root(Node::with_transformation("root", translate(1.0, 0.0, 0.0)));
    let child = rig.add_child(root, Node::new("child"));

    let node = rig.node_mut(child).unwrap();
    node.update_animation_size(0, 2);
    node.channels.clip_mut(0).keys[1] = Keyframe {
        translation: translate(0.0, 9.0, 0.0),
        euler_angles: Vec3::ZERO,
        rotation: Mat4::IDENTITY,
        scale: Mat4::IDENTITY,
    };
    node.channels.clip_mut(0).recompose();

    // The static root contributes its idle transform to the chain.
    let global = rig.global_frame_transform(child, 0, 1);
    assert!(approx_mat(&global, &translate(1.0, 9.0, 0.0)), "got {global}");
}

// ============================================================================
// Time-interpolated queries
// ============================================================================

fn two_frame_node() -> Node {
    let mut node = Node::new("n");
    node.update_animation_size(0, 2);
    node.channels.clip_mut(0).keys[0] = Keyframe {
        translation: translate(0.0, 0.0, 0.0),
        ..Keyframe::IDENTITY
    };
    node.channels.clip_mut(0).keys[1] = Keyframe {
        translation: translate(10.0, 0.0, 0.0),
        ..Keyframe::IDENTITY
    };
    node.channels.clip_mut(0).recompose();
    node
}

#[test]
fn interpolation_boundary_zero_accumulator_returns_floor() {
    let node = two_frame_node();
    let blend = FrameBlend {
        accumulator: 0.0,
        time_step: 0.1,
        tick_floor: 0,
        tick_ceil: 1,
    };

    let result = node.blended_transform(0, &blend);
    let floor = node.frame_transform(0, 0);
    assert_eq!(
        result.to_cols_array(),
        floor.to_cols_array(),
        "ratio forced to 0 must return the floor frame exactly"
    );
}

#[test]
fn interpolation_zero_time_step_returns_floor() {
    let node = two_frame_node();
    let blend = FrameBlend {
        accumulator: 0.05,
        time_step: 0.0,
        tick_floor: 0,
        tick_ceil: 1,
    };
    assert_eq!(
        node.blended_transform(0, &blend).to_cols_array(),
        node.frame_transform(0, 0).to_cols_array()
    );
}

#[test]
fn interpolation_midpoint_is_matrix_average() {
    let node = two_frame_node();
    let blend = FrameBlend {
        accumulator: 0.05,
        time_step: 0.1,
        tick_floor: 0,
        tick_ceil: 1,
    };

    let result = node.blended_transform(0, &blend);
    assert!(
        approx_mat(&result, &translate(5.0, 0.0, 0.0)),
        "midpoint lerp of the two composed matrices, got {result}"
    );
}

#[test]
fn clock_driven_blend_through_rig() {
    use armature::animation::ClipInfo;

    let mut rig = Rig::new();
    let root = rig.add_root(Node::new("root"));
    let child = rig.add_child(root, Node::new("child"));

    rig.clips.push(ClipInfo::new("slide", 2, 0.2));
    {
        let node = rig.node_mut(child).unwrap();
        node.update_animation_size(0, 2);
        node.channels.clip_mut(0).keys[1].translation = translate(10.0, 0.0, 0.0);
        node.channels.clip_mut(0).recompose();
    }

    rig.set_active_clip(0);
    rig.clock.play();
    rig.update(0.05); // half a 0.1s tick into frame 0

    let blend = rig.blend();
    let result = rig.global_blended_transform(child, 0, &blend);
    assert!(
        approx_mat(&result, &translate(5.0, 0.0, 0.0)),
        "half-way between frames 0 and 1, got {result}"
    );
}

// ============================================================================
// No-animation fallback
// ============================================================================

#[test]
fn no_animation_falls_back_to_idle_everywhere() {
    let idle = translate(3.0, 4.0, 5.0);
    let node = Node::with_transformation("static", idle);
    let blend = FrameBlend {
        accumulator: 0.5,
        time_step: 1.0,
        tick_floor: 2,
        tick_ceil: 3,
    };

    assert_eq!(node.idle_transform().to_cols_array(), idle.to_cols_array());
    assert_eq!(node.frame_transform(1, 7).to_cols_array(), idle.to_cols_array());
    assert_eq!(
        node.blended_transform(1, &blend).to_cols_array(),
        idle.to_cols_array()
    );
}

// ============================================================================
// WorldPose
// ============================================================================

#[test]
fn world_pose_extracts_position_and_axes() {
    let mut rig = Rig::new();
    let root = rig.add_root(Node::with_transformation("root", translate(1.0, 2.0, 3.0)));

    let pose = rig.world_pose(root);
    assert!((pose.position - Vec3::new(1.0, 2.0, 3.0)).length() < EPSILON);
    assert!((pose.forward - Vec3::NEG_Z).length() < EPSILON);
    assert!((pose.up - Vec3::Y).length() < EPSILON);
    assert!((pose.scale - Vec3::ONE).length() < EPSILON);
}

#[test]
fn world_pose_follows_rotation() {
    let matrix = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
    let pose = WorldPose::from_matrix(&matrix);
    // Yaw of +90 degrees swings -Z onto -X.
    assert!((pose.forward - Vec3::NEG_X).length() < 1e-4, "got {}", pose.forward);
    assert!((pose.up - Vec3::Y).length() < 1e-4);
}
