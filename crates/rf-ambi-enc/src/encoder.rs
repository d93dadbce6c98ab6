//! Real-time Ambisonic encoder engine
//!
//! One [`AmbiEncoder`] per processing context. It owns its FIFOs, matrices and
//! scratch memory, all allocated at construction; `process` never allocates,
//! never blocks, and never logs.

use ndarray::{Array2, ArrayView2};

use crate::config::EncoderConfig;
use crate::crossfade::Crossfader;
use crate::error::{EncoderError, EncoderResult};
use crate::fifo::FrameFifo;
use crate::matrix::EncodingMatrices;
use crate::params::{EncoderControl, ParamState, SlotState};
use crate::{FRAME_SIZE, MAX_NUM_INPUTS, MAX_NUM_SH_SIGNALS};

/// Point-source to HOA encoder
pub struct AmbiEncoder {
    /// Control handle, cloned out to other threads
    control: EncoderControl,
    /// Parameters applied to the audio path
    params: ParamState,
    /// Shared generation last copied into `params`
    seen_generation: u64,
    fifo: FrameFifo,
    matrices: EncodingMatrices,
    crossfader: Crossfader,
    /// [MAX_NUM_SH_SIGNALS x FRAME_SIZE], previous-matrix encoding
    scratch: Array2<f32>,
    sample_rate: u32,
    frames_processed: u64,
}

impl AmbiEncoder {
    /// Create encoder with default parameters (one source, front, first order, AmbiX)
    pub fn new(sample_rate: u32) -> EncoderResult<Self> {
        let control = EncoderControl::new();
        let (params, seen_generation) = control.shared().take();

        let mut encoder = Self {
            control,
            params,
            seen_generation,
            fifo: FrameFifo::new(),
            matrices: EncodingMatrices::new(),
            crossfader: Crossfader::new(),
            scratch: Array2::zeros((MAX_NUM_SH_SIGNALS, FRAME_SIZE)),
            sample_rate: 0,
            frames_processed: 0,
        };
        encoder.init(sample_rate)?;
        Ok(encoder)
    }

    /// Create encoder and apply `config`
    pub fn with_config(sample_rate: u32, config: &EncoderConfig) -> EncoderResult<Self> {
        let encoder = Self::new(sample_rate)?;
        encoder.control.apply_config(config)?;
        Ok(encoder)
    }

    /// (Re)initialize for `sample_rate`; clears all audio state
    pub fn init(&mut self, sample_rate: u32) -> EncoderResult<()> {
        if sample_rate == 0 {
            return Err(EncoderError::InvalidSampleRate(sample_rate));
        }
        self.sample_rate = sample_rate;
        self.reset();
        log::debug!(
            "[AmbiEnc] Initialized at {} Hz, frame size {}",
            sample_rate,
            FRAME_SIZE
        );
        Ok(())
    }

    /// Zero FIFOs and matrices; every slot is recomputed on the next frame,
    /// fading in from silence
    pub fn reset(&mut self) {
        self.fifo.clear();
        self.matrices.reset();
        self.scratch.fill(0.0);
        self.params.mark_all_dirty();
        self.frames_processed = 0;
    }

    /// Handle for the control path
    pub fn control(&self) -> EncoderControl {
        self.control.clone()
    }

    /// Sample rate given at initialization
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Delay between input and output, in samples
    pub fn processing_delay(&self) -> usize {
        FRAME_SIZE
    }

    /// Output channel count of the parameters applied to the audio path
    pub fn num_sh_channels(&self) -> usize {
        self.params.num_sh_channels()
    }

    /// Parameters applied to the audio path
    pub fn applied_params(&self) -> &ParamState {
        &self.params
    }

    /// Current encoding matrix, `(order + 1)^2 x num_sources`
    pub fn encoding_matrix(&self) -> ArrayView2<'_, f32> {
        self.matrices.current()
    }

    /// Current/previous matrix pair
    pub fn matrices(&self) -> &EncodingMatrices {
        &self.matrices
    }

    /// Frames encoded since the last reset
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Encode `num_samples` samples.
    ///
    /// `inputs` holds one mono signal per source slot; missing channels are
    /// treated as silence and channels past `MAX_NUM_INPUTS` are ignored.
    /// `outputs` receives SH channels in the selected ordering; channels the
    /// encoder does not produce are silenced. Every slice must hold at least
    /// `num_samples` samples, otherwise nothing is written.
    pub fn process(
        &mut self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        num_samples: usize,
    ) -> EncoderResult<()> {
        let shortest_input = inputs.iter().take(MAX_NUM_INPUTS).map(|ch| ch.len()).min();
        let shortest_output = outputs.iter().map(|ch| ch.len()).min();
        for got in [shortest_input, shortest_output].into_iter().flatten() {
            if got < num_samples {
                return Err(EncoderError::BufferSizeMismatch {
                    expected: num_samples,
                    got,
                });
            }
        }

        let mut offset = 0;
        while offset < num_samples {
            let len = self.fifo.space().min(num_samples - offset);
            self.fifo.exchange(inputs, outputs, offset, len);
            offset += len;

            if self.fifo.is_full() {
                self.process_frame();
                self.fifo.rewind();
            }
        }
        Ok(())
    }

    fn process_frame(&mut self) {
        self.sync_params();

        let fading = self.matrices.update(&mut self.params);

        let (input, output) = self.fifo.frames_mut();
        self.crossfader
            .encode(&self.matrices, fading, input, output, self.scratch.view_mut());

        if fading {
            self.matrices.commit();
        }
        self.frames_processed += 1;
    }

    /// Pick up control-path changes without blocking
    fn sync_params(&mut self) {
        let Some((mut next, generation)) = self.control.shared().try_take(self.seen_generation) else {
            return;
        };

        // Keep marks not yet consumed, e.g. after reset
        for slot in 0..MAX_NUM_INPUTS {
            if self.params.slot_state(slot) == SlotState::Dirty {
                next.mark_dirty(slot);
            }
        }
        self.params = next;
        self.seen_generation = generation;
    }
}
