//! Fixed-frame FIFO staging
//!
//! Reconciles host block sizes with the fixed processing frame. Input and
//! output share one cursor: every sample written into the input FIFO is paired
//! with one sample read out of the output FIFO, which adds exactly
//! `FRAME_SIZE` samples of latency independent of how calls are chunked.

use ndarray::{s, Array2, ArrayView1, ArrayView2, ArrayViewMut2};

use crate::{FRAME_SIZE, MAX_NUM_INPUTS, MAX_NUM_SH_SIGNALS};

/// Input/output frame FIFO
pub struct FrameFifo {
    /// [MAX_NUM_INPUTS x FRAME_SIZE]
    input: Array2<f32>,
    /// [MAX_NUM_SH_SIGNALS x FRAME_SIZE]
    output: Array2<f32>,
    /// Write/read cursor, `0..=FRAME_SIZE`
    index: usize,
}

impl FrameFifo {
    /// Create zeroed FIFO
    pub fn new() -> Self {
        Self {
            input: Array2::zeros((MAX_NUM_INPUTS, FRAME_SIZE)),
            output: Array2::zeros((MAX_NUM_SH_SIGNALS, FRAME_SIZE)),
            index: 0,
        }
    }

    /// Current cursor
    pub fn index(&self) -> usize {
        self.index
    }

    /// Samples until the frame is full
    pub fn space(&self) -> usize {
        FRAME_SIZE - self.index
    }

    /// Whether a complete input frame is staged
    pub fn is_full(&self) -> bool {
        self.index == FRAME_SIZE
    }

    /// Stage `len` input samples starting at `offset` and hand out the same
    /// number of output samples.
    ///
    /// Missing input channels are staged as silence. Output channels past
    /// `MAX_NUM_SH_SIGNALS` receive silence. `len` must not exceed
    /// [`space`](Self::space) and every slice must hold `offset + len` samples.
    pub fn exchange(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], offset: usize, len: usize) {
        debug_assert!(len <= self.space());
        let start = self.index;
        let end = start + len;

        for (ch, mut row) in self.input.outer_iter_mut().enumerate() {
            let mut staged = row.slice_mut(s![start..end]);
            match inputs.get(ch) {
                Some(src) => staged.assign(&ArrayView1::from(&src[offset..offset + len])),
                None => staged.fill(0.0),
            }
        }

        for (ch, out) in outputs.iter_mut().enumerate() {
            let dst = &mut out[offset..offset + len];
            if ch < MAX_NUM_SH_SIGNALS {
                let staged = self.output.slice(s![ch, start..end]);
                for (d, &v) in dst.iter_mut().zip(staged.iter()) {
                    *d = v;
                }
            } else {
                dst.fill(0.0);
            }
        }

        self.index = end;
    }

    /// Full input frame and the output frame to fill
    pub fn frames_mut(&mut self) -> (ArrayView2<'_, f32>, ArrayViewMut2<'_, f32>) {
        (self.input.view(), self.output.view_mut())
    }

    /// Start the next frame
    pub fn rewind(&mut self) {
        self.index = 0;
    }

    /// Zero both FIFOs and rewind
    pub fn clear(&mut self) {
        self.input.fill(0.0);
        self.output.fill(0.0);
        self.index = 0;
    }
}

impl Default for FrameFifo {
    fn default() -> Self {
        Self::new()
    }
}
