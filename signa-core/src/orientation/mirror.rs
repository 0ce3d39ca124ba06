//! Left/right reflection of a feature frame.
//!
//! A signer using the other dominant hand produces the mirror image of the
//! sign the classifier was trained on. Reflecting the frame makes both
//! handednesses look alike to the classifier.

use crate::frame::{
    FeatureFrame, HAND_LEN, HAND_POINTS, HAND_STRIDE, POSE_LEN, POSE_POINTS, POSE_STRIDE,
};

/// Anatomically mirrored pose landmark pairs (eyes, ears, mouth corners,
/// shoulders, elbows, wrists, pinkies, index fingers, thumbs, hips).
pub const MIRROR_PAIRS: [(usize, usize); 12] = [
    (1, 4),
    (2, 5),
    (3, 6),
    (7, 8),
    (9, 10),
    (11, 12),
    (13, 14),
    (15, 16),
    (17, 18),
    (19, 20),
    (21, 22),
    (23, 24),
];

/// Produce the mirrored counterpart of `frame`.
///
/// 1. `x' = 1 - x` for every detected point (absent points stay all-zero).
/// 2. Mirrored pose pairs swap places, visibility included.
/// 3. The right-hand and left-hand blocks swap wholesale.
///
/// Applying it twice restores the input whenever `1 - x` is exact in `f32`,
/// which holds for every x in [0.5, 1] and for dyadic coordinates.
pub fn mirror(frame: &FeatureFrame) -> FeatureFrame {
    let mut out = frame.clone();
    let values = out.values_mut();

    for i in 0..POSE_POINTS {
        reflect_point(&mut values[i * POSE_STRIDE..i * POSE_STRIDE + 3]);
    }
    for i in 0..HAND_POINTS * 2 {
        let base = POSE_LEN + i * HAND_STRIDE;
        reflect_point(&mut values[base..base + 3]);
    }

    for (a, b) in MIRROR_PAIRS {
        for k in 0..POSE_STRIDE {
            values.swap(a * POSE_STRIDE + k, b * POSE_STRIDE + k);
        }
    }

    let (right, left) = values[POSE_LEN..].split_at_mut(HAND_LEN);
    right.swap_with_slice(left);

    out
}

fn reflect_point(xyz: &mut [f32]) {
    if xyz.iter().all(|v| *v == 0.0) {
        return;
    }
    xyz[0] = 1.0 - xyz[0];
}
