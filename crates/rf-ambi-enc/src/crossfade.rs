//! Crossfade encoder
//!
//! Encodes one frame with the current matrix and, on a fading frame, blends
//! it sample by sample with the previous matrix's encoding:
//!
//! `out[:, n] = (1 - ramp[n]) * (previous · x[:, n]) + ramp[n] * (current · x[:, n])`
//!
//! The ramp runs from exactly 0 at the first sample to exactly 1 at the last,
//! so every fade completes within one frame.

use ndarray::{s, ArrayView1, ArrayView2, ArrayViewMut2, Zip};

use crate::matrix::EncodingMatrices;
use crate::FRAME_SIZE;

/// Frame encoder with a precomputed interpolation ramp
pub struct Crossfader {
    ramp: [f32; FRAME_SIZE],
}

impl Crossfader {
    /// Build linear ramp `n / (FRAME_SIZE - 1)`
    pub fn new() -> Self {
        let mut ramp = [0.0f32; FRAME_SIZE];
        let last = (FRAME_SIZE - 1) as f32;
        for (n, r) in ramp.iter_mut().enumerate() {
            *r = n as f32 / last;
        }
        Self { ramp }
    }

    /// Interpolation ramp
    pub fn ramp(&self) -> &[f32; FRAME_SIZE] {
        &self.ramp
    }

    /// Encode a full input frame into `output`.
    ///
    /// `input` is `[MAX_NUM_INPUTS x FRAME_SIZE]`, `output` and `scratch` are
    /// `[MAX_NUM_SH_SIGNALS x FRAME_SIZE]`. Rows of `output` past the encoded
    /// span are zeroed.
    pub fn encode(
        &self,
        matrices: &EncodingMatrices,
        fading: bool,
        input: ArrayView2<'_, f32>,
        mut output: ArrayViewMut2<'_, f32>,
        mut scratch: ArrayViewMut2<'_, f32>,
    ) {
        let dims = if fading {
            matrices.fade_dims()
        } else {
            matrices.dims()
        };
        let (rows, cols) = dims;

        output.slice_mut(s![rows.., ..]).fill(0.0);
        if rows == 0 {
            return;
        }

        let x = input.slice(s![..cols, ..]);
        let mut out = output.slice_mut(s![..rows, ..]);
        if cols == 0 {
            out.fill(0.0);
            return;
        }

        encode_block(matrices.current_block(dims), x, out.view_mut());
        if !fading {
            return;
        }

        let mut faded = scratch.slice_mut(s![..rows, ..]);
        encode_block(matrices.previous_block(dims), x, faded.view_mut());

        let ramp = ArrayView1::from(&self.ramp[..]);
        Zip::from(out.rows_mut())
            .and(faded.rows())
            .for_each(|mut cur, prev| {
                Zip::from(&mut cur)
                    .and(&prev)
                    .and(&ramp)
                    .for_each(|c, &p, &r| *c = (1.0 - r) * p + r * *c);
            });
    }
}

/// `out = weights · x`, accumulated row by row into the fixed frame buffers.
/// Zero weights are skipped.
fn encode_block(weights: ArrayView2<'_, f32>, x: ArrayView2<'_, f32>, mut out: ArrayViewMut2<'_, f32>) {
    out.fill(0.0);
    for (column, source) in weights.columns().into_iter().zip(x.outer_iter()) {
        for (mut row, &w) in out.outer_iter_mut().zip(column.iter()) {
            if w != 0.0 {
                row.scaled_add(w, &source);
            }
        }
    }
}

impl Default for Crossfader {
    fn default() -> Self {
        Self::new()
    }
}
