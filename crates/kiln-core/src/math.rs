//! Quaternion and matrix helpers layered on glam.
//!
//! glam supplies the vector, quaternion and matrix types. The functions here
//! pin down the numerical rules the animation and gizmo code rely on:
//! shortest-path slerp with an nlerp fallback, clamped inverse cosine, and a
//! rotation-between that survives antipodal inputs.

use glam::{EulerRot, Mat4, Quat, Vec3};

/// Threshold above which slerp degrades to normalized lerp
pub const SLERP_NLERP_THRESHOLD: f32 = 0.9995;

/// Lengths below this are treated as zero
pub const EPSILON: f32 = 1e-6;

/// Inverse cosine with the input clamped into [-1, 1]
pub fn safe_acos(x: f32) -> f32 {
    x.clamp(-1.0, 1.0).acos()
}

/// Scalar linear interpolation
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Component-wise linear interpolation
pub fn lerp_vec3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a + (b - a) * t
}

/// Normalize, returning zero for degenerate input
pub fn normalize_or_zero(v: Vec3) -> Vec3 {
    let len = v.length();
    if len > EPSILON {
        v / len
    } else {
        Vec3::ZERO
    }
}

fn normalize_quat(q: Quat) -> Quat {
    let len = q.length();
    if len < 1e-10 {
        Quat::IDENTITY
    } else {
        q * (1.0 / len)
    }
}

/// Normalized linear interpolation along the shortest arc
pub fn nlerp(a: Quat, b: Quat, t: f32) -> Quat {
    let b = if a.dot(b) < 0.0 { -b } else { b };
    normalize_quat(Quat::from_xyzw(
        lerp(a.x, b.x, t),
        lerp(a.y, b.y, t),
        lerp(a.z, b.z, t),
        lerp(a.w, b.w, t),
    ))
}

/// Quaternion slerp with shortest-path correction.
///
/// Negates `b` when the endpoints lie in opposite hemispheres and falls back to
/// nlerp when they are nearly parallel. The result is always renormalized.
pub fn slerp(a: Quat, b: Quat, t: f32) -> Quat {
    let mut dot = a.dot(b);
    let mut b = b;
    if dot < 0.0 {
        b = -b;
        dot = -dot;
    }

    if dot > SLERP_NLERP_THRESHOLD {
        return nlerp(a, b, t);
    }

    let theta = safe_acos(dot);
    let sin_theta = theta.sin();
    let wa = ((1.0 - t) * theta).sin() / sin_theta;
    let wb = (t * theta).sin() / sin_theta;

    normalize_quat(Quat::from_xyzw(
        a.x * wa + b.x * wb,
        a.y * wa + b.y * wb,
        a.z * wa + b.z * wb,
        a.w * wa + b.w * wb,
    ))
}

/// Weighted rotation: slerp from identity toward `q` by `weight`
pub fn weighted_rotation(q: Quat, weight: f32) -> Quat {
    slerp(Quat::IDENTITY, q, weight.clamp(0.0, 1.0))
}

/// Any unit vector perpendicular to `v`
pub fn any_perpendicular(v: Vec3) -> Vec3 {
    let v = normalize_or_zero(v);
    let candidate = v.cross(Vec3::X);
    if candidate.length_squared() > 1e-6 {
        candidate.normalize()
    } else {
        v.cross(Vec3::Y).normalize()
    }
}

/// Shortest rotation taking direction `a` onto direction `b`.
///
/// For antipodal inputs the half-turn axis is a perpendicular fallback.
/// Zero-length inputs yield identity.
pub fn rotation_between(a: Vec3, b: Vec3) -> Quat {
    let a = normalize_or_zero(a);
    let b = normalize_or_zero(b);
    if a == Vec3::ZERO || b == Vec3::ZERO {
        return Quat::IDENTITY;
    }

    let dot = a.dot(b);
    if dot > 1.0 - EPSILON {
        return Quat::IDENTITY;
    }
    if dot < -1.0 + EPSILON {
        return Quat::from_axis_angle(any_perpendicular(a), std::f32::consts::PI);
    }

    let axis = a.cross(b).normalize();
    Quat::from_axis_angle(axis, safe_acos(dot))
}

/// Build a rotation from an axis and angle in radians. A zero axis yields identity.
pub fn quat_from_axis_angle(axis: Vec3, angle: f32) -> Quat {
    let axis = normalize_or_zero(axis);
    if axis == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_axis_angle(axis, angle)
    }
}

/// Decompose into (unit axis, angle in radians)
pub fn quat_to_axis_angle(q: Quat) -> (Vec3, f32) {
    let q = normalize_quat(q);
    let q = if q.w < 0.0 { -q } else { q };
    let angle = 2.0 * safe_acos(q.w);
    let s = (1.0 - q.w * q.w).max(0.0).sqrt();
    if s < EPSILON {
        (Vec3::X, 0.0)
    } else {
        (Vec3::new(q.x / s, q.y / s, q.z / s), angle)
    }
}

/// Euler angles in degrees (pitch about X, yaw about Y, roll about Z), applied yaw-pitch-roll
pub fn quat_from_euler_degrees(euler: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    )
}

/// Inverse of [`quat_from_euler_degrees`]
pub fn quat_to_euler_degrees(q: Quat) -> Vec3 {
    let (yaw, pitch, roll) = q.to_euler(EulerRot::YXZ);
    Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
}

/// Rotation part of an affine matrix
pub fn quat_from_mat4(m: &Mat4) -> Quat {
    let (_, rotation, _) = m.to_scale_rotation_translation();
    normalize_quat(rotation)
}

/// Rotation matrix of a quaternion
pub fn quat_to_mat4(q: Quat) -> Mat4 {
    Mat4::from_quat(q)
}

/// General 4x4 inverse. Returns None for singular matrices.
pub fn invert_mat4(m: &Mat4) -> Option<Mat4> {
    let det = m.determinant();
    if det.abs() < 1e-12 || !det.is_finite() {
        None
    } else {
        Some(m.inverse())
    }
}

/// Translation column of an affine matrix
pub fn mat4_translation(m: &Mat4) -> Vec3 {
    m.w_axis.truncate()
}
