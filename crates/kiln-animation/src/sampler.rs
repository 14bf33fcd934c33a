//! Keyframe sampling with binary search and step/linear/cubic interpolation

use crate::clip::{Interpolation, Keyframe};
use kiln_core::math::{lerp_vec3, slerp};
use kiln_core::{Quat, Vec3, Vec4};

/// A value that can be stored in a keyframe sequence
pub trait KeyValue: Copy {
    fn interpolate(a: Self, b: Self, t: f32) -> Self;

    /// Cubic Hermite between `p0` and `p1`; tangents are per-second and get
    /// scaled by the keyframe span
    fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, t: f32, span: f32) -> Self;
}

fn hermite_basis(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;
    (
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    )
}

impl KeyValue for Vec3 {
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        lerp_vec3(a, b, t)
    }

    fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, t: f32, span: f32) -> Self {
        let (h00, h10, h01, h11) = hermite_basis(t);
        p0 * h00 + m0 * (h10 * span) + p1 * h01 + m1 * (h11 * span)
    }
}

impl KeyValue for Quat {
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        slerp(a, b, t)
    }

    fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, t: f32, span: f32) -> Self {
        let (h00, h10, h01, h11) = hermite_basis(t);
        let v = Vec4::from(p0) * h00
            + Vec4::from(m0) * (h10 * span)
            + Vec4::from(p1) * h01
            + Vec4::from(m1) * (h11 * span);
        let len = v.length();
        if len < 1e-10 {
            p0
        } else {
            Quat::from_vec4(v / len)
        }
    }
}

/// Sample a time-sorted keyframe sequence.
///
/// Times outside the keyed range clamp to the first or last value. The
/// bracketing pair is found by binary search. Returns `None` for an empty
/// sequence so the caller can leave its identity default in place.
pub fn sample_keys<T: KeyValue>(keys: &[Keyframe<T>], interpolation: Interpolation, time: f32) -> Option<T> {
    let first = keys.first()?;
    if keys.len() == 1 || time <= first.time {
        return Some(first.value);
    }
    let last = &keys[keys.len() - 1];
    if time >= last.time {
        return Some(last.value);
    }

    // first.time < time < last.time, so 1 <= idx < len
    let idx = keys.partition_point(|k| k.time <= time);
    let prev = &keys[idx - 1];
    let next = &keys[idx];

    let span = next.time - prev.time;
    if span <= 0.0 {
        return Some(prev.value);
    }
    let t = (time - prev.time) / span;

    let value = match interpolation {
        Interpolation::Step => prev.value,
        Interpolation::Linear => T::interpolate(prev.value, next.value, t),
        Interpolation::CubicSpline => match (prev.out_tangent, next.in_tangent) {
            (Some(m0), Some(m1)) => T::hermite(prev.value, m0, next.value, m1, t, span),
            _ => T::interpolate(prev.value, next.value, t),
        },
    };
    Some(value)
}
