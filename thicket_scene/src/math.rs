// Copyright 2025 the Thicket Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform math: composing node transforms and taking them apart again.
//!
//! A node transform is the 2D restriction of the usual 4x4 model matrix: the
//! z coordinate of a vertex passes through unchanged, so [`Affine`] carries all
//! the information.

use core::f64::consts::{PI, TAU};

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Affine, Point, Vec2};

/// Normalize an angle into `(-π, π]`.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// Whether two angles describe the same rotation (modulo `2π`).
///
/// The tolerance only absorbs the rounding error of wrapping the operands
/// into range, so small but real changes of a rotation still count.
pub fn same_angle(a: f64, b: f64) -> bool {
    let magnitude = a.abs().max(b.abs()).max(TAU);
    normalize_angle(a - b).abs() <= 4.0 * f64::EPSILON * magnitude
}

/// Apply a node's local translate, rotate, and scale after `parent`.
///
/// Rotation and scale act in the node's own axes, not the parent's.
pub fn compose_local(parent: Affine, position: Point, rotation: f64, scale: Vec2) -> Affine {
    parent
        * Affine::translate(position.to_vec2())
        * Affine::rotate(rotation)
        * Affine::scale_non_uniform(scale.x, scale.y)
}

/// Translation, rotation, and scale recovered from an [`Affine`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Decomposed {
    /// Translation component.
    pub translation: Vec2,
    /// Rotation in radians, normalized to `(-π, π]`.
    pub rotation: f64,
    /// Per-axis scale. A mirrored transform reports a negative y scale.
    pub scale: Vec2,
}

impl Decomposed {
    /// Recompose into an [`Affine`].
    pub fn to_affine(self) -> Affine {
        compose_local(
            Affine::IDENTITY,
            self.translation.to_point(),
            self.rotation,
            self.scale,
        )
    }
}

/// Split an [`Affine`] into translation, rotation, and scale.
///
/// Shear is not supported: the input is assumed to be a product of
/// translations, rotations, and axis scales.
pub fn decompose(affine: Affine) -> Decomposed {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    let scale_x = a.hypot(b);
    let determinant = a * d - b * c;
    let (rotation, scale_y) = if scale_x > 0.0 {
        (b.atan2(a), determinant / scale_x)
    } else {
        // Degenerate x axis: read the rotation off the y axis instead.
        ((-c).atan2(d), c.hypot(d))
    };
    Decomposed {
        translation: Vec2::new(e, f),
        rotation: normalize_angle(rotation),
        scale: Vec2::new(scale_x, scale_y),
    }
}

#[cfg(test)]
pub(crate) fn assert_affine_close(actual: Affine, expected: Affine) {
    let pairs = actual.as_coeffs().into_iter().zip(expected.as_coeffs());
    for (a, e) in pairs {
        assert!(
            (a - e).abs() < 1e-9,
            "affine mismatch: {actual:?} != {expected:?}"
        );
    }
}
