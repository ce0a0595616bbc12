// src/geometry.rs - Joint angles and alignment checks
use crate::config::KneeAngleMode;
use crate::pose::{Landmark, MainJointSet};
use nalgebra::Vector3;

pub fn angle_3d(a: &Landmark, b: &Landmark, c: &Landmark) -> f64 {
    angle_between_vectors(&(a.position() - b.position()), &(c.position() - b.position())).to_degrees()
}

/// Angle at `pivot` between the vertical through it and the ray `pivot->other`, in degrees.
///
/// The vertical reference keeps the pivot's x/z and sits at the top of the frame (y = 0),
/// so a joint straight above the pivot measures 0.
pub fn vertical_angle(pivot: &Landmark, other: &Landmark) -> f64 {
    let vertical = Landmark::new(pivot.x, 0.0, pivot.z, pivot.visibility);
    angle_3d(&vertical, pivot, other)
}

pub fn is_level(j1: &Landmark, j2: &Landmark, threshold: f64) -> bool {
    (j1.y - j2.y).abs() <= threshold
}

pub fn is_vertically_aligned(
    left_a: &Landmark,
    right_a: &Landmark,
    left_b: &Landmark,
    right_b: &Landmark,
    threshold: f64,
) -> bool {
    let mid_a = (left_a.x + right_a.x) / 2.0;
    let mid_b = (left_b.x + right_b.x) / 2.0;
    (mid_a - mid_b).abs() <= threshold
}

pub fn confident_enough<'a, I>(threshold: f64, joints: I) -> bool
where
    I: IntoIterator<Item = Option<&'a Landmark>>,
{
    joints
        .into_iter()
        .all(|joint| joint.map_or(false, |lm| lm.visibility >= threshold))
}

pub fn main_joints_confident(threshold: f64, joints: &MainJointSet) -> bool {
    confident_enough(threshold, joints.joints().map(Some))
}

pub fn knee_angle(joints: &MainJointSet, mode: KneeAngleMode) -> f64 {
    match mode {
        KneeAngleMode::ThreePoint => angle_3d(&joints.ankle, &joints.knee, &joints.hip),
        KneeAngleMode::Vertical => vertical_angle(&joints.knee, &joints.hip),
    }
}

pub fn hip_angle(joints: &MainJointSet, mode: KneeAngleMode) -> f64 {
    match mode {
        KneeAngleMode::ThreePoint => angle_3d(&joints.knee, &joints.hip, &joints.shoulder),
        KneeAngleMode::Vertical => vertical_angle(&joints.hip, &joints.shoulder),
    }
}

pub fn max_displacement(previous: &MainJointSet, current: &MainJointSet) -> f64 {
    previous
        .joints()
        .iter()
        .zip(current.joints().iter())
        .map(|(a, b)| a.distance_to(b))
        .fold(0.0, f64::max)
}

// Radians; zero-length vectors yield 0 rather than NaN
fn angle_between_vectors(v1: &Vector3<f64>, v2: &Vector3<f64>) -> f64 {
    let mag1 = v1.norm();
    let mag2 = v2.norm();

    if mag1 == 0.0 || mag2 == 0.0 {
        return 0.0;
    }

    let cos_angle = (v1.dot(v2) / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos_angle.acos()
}
