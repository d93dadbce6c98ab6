//! Encoding matrix manager
//!
//! Keeps the current and previous `[SH channels x sources]` weight matrices in
//! fixed-capacity storage. Dirty slots get their column recomputed at the
//! start of a frame; `previous` keeps the matrix that was in effect before,
//! so the frame can fade between the two. After a fading frame
//! [`commit`](EncodingMatrices::commit) makes both identical again.

use ndarray::{s, Array2, ArrayView1, ArrayView2};

use crate::hoa::encoding_weights;
use crate::params::{ParamState, SlotState};
use crate::{MAX_NUM_INPUTS, MAX_NUM_SH_SIGNALS};

/// Logical matrix size, `(sh_channels, sources)`
pub type MatrixDims = (usize, usize);

/// Current/previous encoding matrix pair
pub struct EncodingMatrices {
    /// [MAX_NUM_SH_SIGNALS x MAX_NUM_INPUTS]
    current: Array2<f32>,
    /// [MAX_NUM_SH_SIGNALS x MAX_NUM_INPUTS]
    previous: Array2<f32>,
    current_dims: MatrixDims,
    previous_dims: MatrixDims,
}

impl EncodingMatrices {
    /// Create with all weights zero
    pub fn new() -> Self {
        Self {
            current: Array2::zeros((MAX_NUM_SH_SIGNALS, MAX_NUM_INPUTS)),
            previous: Array2::zeros((MAX_NUM_SH_SIGNALS, MAX_NUM_INPUTS)),
            current_dims: (0, 0),
            previous_dims: (0, 0),
        }
    }

    /// Recompute the columns of all dirty slots and mark them clean.
    /// Returns whether any column was recomputed, i.e. this frame must fade.
    pub fn update(&mut self, params: &mut ParamState) -> bool {
        let order = params.order;
        let rows = order.channel_count();
        let mut recomputed = false;

        for slot in 0..MAX_NUM_INPUTS {
            if params.slot_state(slot) != SlotState::Dirty {
                continue;
            }

            let mut column = self.current.column_mut(slot);
            if slot < params.num_sources {
                let mut weights = encoding_weights(params.sources[slot].direction, order, params.format);
                weights.scale(params.column_gain(slot));
                column.slice_mut(s![..rows]).assign(&ArrayView1::from(weights.as_slice()));
                column.slice_mut(s![rows..]).fill(0.0);
            } else {
                // Deactivated: silence the column, keep the storage
                column.fill(0.0);
            }

            params.mark_clean(slot);
            recomputed = true;
        }

        self.current_dims = (rows, params.num_sources);
        if !recomputed {
            self.previous_dims = self.current_dims;
        }
        recomputed
    }

    /// End of a fading frame: previous := current
    pub fn commit(&mut self) {
        let (rows, cols) = self.fade_dims();
        self.previous
            .slice_mut(s![..rows, ..cols])
            .assign(&self.current.slice(s![..rows, ..cols]));
        self.previous_dims = self.current_dims;
    }

    /// Zero both matrices
    pub fn reset(&mut self) {
        self.current.fill(0.0);
        self.previous.fill(0.0);
        self.current_dims = (0, 0);
        self.previous_dims = (0, 0);
    }

    /// Logical size of the current matrix
    pub fn dims(&self) -> MatrixDims {
        self.current_dims
    }

    /// Span covering both matrices' logical sizes
    pub fn fade_dims(&self) -> MatrixDims {
        (
            self.current_dims.0.max(self.previous_dims.0),
            self.current_dims.1.max(self.previous_dims.1),
        )
    }

    /// Current matrix, `(order + 1)^2 x num_sources`
    pub fn current(&self) -> ArrayView2<'_, f32> {
        let (rows, cols) = self.current_dims;
        self.current.slice(s![..rows, ..cols])
    }

    /// Previous matrix at its logical size
    pub fn previous(&self) -> ArrayView2<'_, f32> {
        let (rows, cols) = self.previous_dims;
        self.previous.slice(s![..rows, ..cols])
    }

    /// Top-left `rows x cols` of the current matrix
    pub fn current_block(&self, (rows, cols): MatrixDims) -> ArrayView2<'_, f32> {
        self.current.slice(s![..rows, ..cols])
    }

    /// Top-left `rows x cols` of the previous matrix
    pub fn previous_block(&self, (rows, cols): MatrixDims) -> ArrayView2<'_, f32> {
        self.previous.slice(s![..rows, ..cols])
    }

    /// Whether the previous matrix equals the current one
    pub fn is_settled(&self) -> bool {
        self.current_dims == self.previous_dims && self.current == self.previous
    }
}

impl Default for EncodingMatrices {
    fn default() -> Self {
        Self::new()
    }
}
