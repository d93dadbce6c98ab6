//! Encoder parameter state shared between control and audio paths
//!
//! The control side ([`EncoderControl`]) holds the parameters behind a short
//! `parking_lot::Mutex` and bumps an atomic generation counter on every
//! accepted change. The audio side polls the counter once per frame and, only
//! when it moved, `try_lock`s and copies the whole fixed-size state. The copy
//! never allocates, and a contended lock just defers the update by one frame,
//! so the audio path never blocks and never sees a half-applied change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EncoderConfig;
use crate::direction::SourceDirection;
use crate::error::{EncoderError, EncoderResult};
use crate::hoa::{AmbisonicFormat, AmbisonicOrder, ChannelOrdering, Normalization};
use crate::presets::{uniform_directions, SourcePreset};
use crate::MAX_NUM_INPUTS;

/// Recalculation state of one source slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    /// Column matches the parameters
    #[default]
    Clean,
    /// Column must be recomputed before the next frame
    Dirty,
}

/// Per-source parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSlot {
    /// Direction of arrival
    pub direction: SourceDirection,
    /// Linear gain
    pub gain: f32,
}

impl Default for SourceSlot {
    fn default() -> Self {
        Self {
            direction: SourceDirection::front(),
            gain: 1.0,
        }
    }
}

/// Complete parameter set, plus per-slot recalculation state
#[derive(Debug, Clone, Copy)]
pub struct ParamState {
    /// Active sources, slots `0..num_sources`
    pub num_sources: usize,
    /// Every slot, active or not
    pub sources: [SourceSlot; MAX_NUM_INPUTS],
    /// Output order
    pub order: AmbisonicOrder,
    /// Output normalization and channel ordering
    pub format: AmbisonicFormat,
    /// Scale weights by `1/sqrt(num_sources)`
    pub post_scaling: bool,
    slot_states: [SlotState; MAX_NUM_INPUTS],
}

impl Default for ParamState {
    fn default() -> Self {
        let mut sources = [SourceSlot::default(); MAX_NUM_INPUTS];
        for (slot, direction) in sources.iter_mut().zip(uniform_directions()).skip(1) {
            slot.direction = direction;
        }
        Self {
            num_sources: 1,
            sources,
            order: AmbisonicOrder::First,
            format: AmbisonicFormat::ambix(),
            post_scaling: true,
            slot_states: [SlotState::Clean; MAX_NUM_INPUTS],
        }
    }
}

impl ParamState {
    /// Output channel count
    pub fn num_sh_channels(&self) -> usize {
        self.order.channel_count()
    }

    /// State of one slot
    pub fn slot_state(&self, slot: usize) -> SlotState {
        self.slot_states[slot]
    }

    /// Number of slots awaiting recomputation
    pub fn pending(&self) -> usize {
        self.slot_states
            .iter()
            .filter(|s| **s == SlotState::Dirty)
            .count()
    }

    pub(crate) fn mark_dirty(&mut self, slot: usize) {
        self.slot_states[slot] = SlotState::Dirty;
    }

    pub(crate) fn mark_all_dirty(&mut self) {
        self.slot_states = [SlotState::Dirty; MAX_NUM_INPUTS];
    }

    pub(crate) fn mark_clean(&mut self, slot: usize) {
        self.slot_states[slot] = SlotState::Clean;
    }

    pub(crate) fn clear_all(&mut self) {
        self.slot_states = [SlotState::Clean; MAX_NUM_INPUTS];
    }

    /// Gain applied to slot's harmonics; zero for inactive slots
    pub fn column_gain(&self, slot: usize) -> f32 {
        if slot >= self.num_sources {
            return 0.0;
        }
        let scale = if self.post_scaling {
            1.0 / (self.num_sources as f32).sqrt()
        } else {
            1.0
        };
        self.sources[slot].gain * scale
    }

    fn same_values(&self, other: &ParamState) -> bool {
        self.num_sources == other.num_sources
            && self.order == other.order
            && self.format == other.format
            && self.post_scaling == other.post_scaling
            && self.sources == other.sources
    }

    /// Move to `next`, marking every slot whose encoding column changes.
    /// Returns whether any value changed.
    fn commit(&mut self, mut next: ParamState) -> bool {
        if self.same_values(&next) {
            return false;
        }

        let global = self.order != next.order
            || self.format != next.format
            || self.post_scaling != next.post_scaling
            || (next.post_scaling && self.num_sources != next.num_sources);
        let span = self.num_sources.max(next.num_sources);

        for slot in 0..span {
            let was_active = slot < self.num_sources;
            let is_active = slot < next.num_sources;
            let column_changed = global
                || was_active != is_active
                || (is_active && self.sources[slot] != next.sources[slot]);
            if column_changed {
                next.mark_dirty(slot);
            }
        }

        next.slot_states
            .iter_mut()
            .zip(self.slot_states.iter())
            .filter(|(_, old)| **old == SlotState::Dirty)
            .for_each(|(new, _)| *new = SlotState::Dirty);

        *self = next;
        true
    }
}

/// Shared parameter cell
#[derive(Debug, Default)]
pub(crate) struct SharedParams {
    state: Mutex<ParamState>,
    generation: AtomicU64,
}

impl SharedParams {
    /// Non-blocking: latest state and its generation, clearing the shared
    /// recalculation marks. `None` when nothing changed since `seen` or the
    /// control side holds the lock.
    pub(crate) fn try_take(&self, seen: u64) -> Option<(ParamState, u64)> {
        if self.generation.load(Ordering::Acquire) == seen {
            return None;
        }
        let mut state = self.state.try_lock()?;
        let snapshot = *state;
        state.clear_all();
        Some((snapshot, self.generation.load(Ordering::Acquire)))
    }

    /// Blocking snapshot for initialization, clearing the shared marks
    pub(crate) fn take(&self) -> (ParamState, u64) {
        let mut state = self.state.lock();
        let snapshot = *state;
        state.clear_all();
        (snapshot, self.generation.load(Ordering::Acquire))
    }

    fn modify<F>(&self, f: F) -> EncoderResult<bool>
    where
        F: FnOnce(&mut ParamState) -> EncoderResult<()>,
    {
        let mut state = self.state.lock();
        let mut next = *state;
        f(&mut next)?;
        let changed = state.commit(next);
        if changed {
            self.generation.fetch_add(1, Ordering::Release);
        }
        Ok(changed)
    }

    fn read<T>(&self, f: impl FnOnce(&ParamState) -> T) -> T {
        f(&self.state.lock())
    }

    /// Hold the lock as the control side does while applying a change
    #[cfg(test)]
    pub(crate) fn lock(&self) -> parking_lot::MutexGuard<'_, ParamState> {
        self.state.lock()
    }
}

/// Control-path handle to an encoder's parameters
///
/// Cheap to clone; every clone addresses the same encoder. Invalid requests
/// are rejected and leave the previous state in place. Setting a value equal
/// to the current one is a no-op and triggers no recomputation.
#[derive(Debug, Clone)]
pub struct EncoderControl {
    shared: Arc<SharedParams>,
}

impl EncoderControl {
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(SharedParams::default()),
        }
    }

    pub(crate) fn shared(&self) -> &SharedParams {
        &self.shared
    }

    fn modify<F>(&self, what: &str, f: F) -> EncoderResult<()>
    where
        F: FnOnce(&mut ParamState) -> EncoderResult<()>,
    {
        match self.shared.modify(f) {
            Ok(true) => {
                log::debug!("[AmbiEnc] {} updated", what);
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => {
                log::warn!("[AmbiEnc] Rejected {}: {}", what, e);
                Err(e)
            }
        }
    }

    /// Copy of the current parameters
    pub fn snapshot(&self) -> ParamState {
        self.shared.read(|s| *s)
    }

    /// Number of slots whose columns have not been recomputed yet
    pub fn pending_recalculations(&self) -> usize {
        self.shared.read(|s| s.pending())
    }

    /// Set number of active sources
    pub fn set_num_sources(&self, num_sources: usize) -> EncoderResult<()> {
        self.modify("source count", |s| {
            if num_sources > MAX_NUM_INPUTS {
                return Err(EncoderError::InvalidSourceCount {
                    got: num_sources,
                    max: MAX_NUM_INPUTS,
                });
            }
            s.num_sources = num_sources;
            Ok(())
        })
    }

    /// Number of active sources
    pub fn num_sources(&self) -> usize {
        self.shared.read(|s| s.num_sources)
    }

    /// Set direction of source `index`; azimuth wrapped, elevation clamped
    pub fn set_source_direction(&self, index: usize, azimuth: f32, elevation: f32) -> EncoderResult<()> {
        self.modify("source direction", |s| {
            let slot = slot_mut(s, index)?;
            slot.direction = SourceDirection::sanitized(azimuth, elevation)?;
            Ok(())
        })
    }

    /// Set azimuth of source `index`, keeping its elevation
    pub fn set_source_azimuth(&self, index: usize, azimuth: f32) -> EncoderResult<()> {
        self.modify("source azimuth", |s| {
            let slot = slot_mut(s, index)?;
            slot.direction = SourceDirection::sanitized(azimuth, slot.direction.elevation)?;
            Ok(())
        })
    }

    /// Set elevation of source `index`, keeping its azimuth
    pub fn set_source_elevation(&self, index: usize, elevation: f32) -> EncoderResult<()> {
        self.modify("source elevation", |s| {
            let slot = slot_mut(s, index)?;
            slot.direction = SourceDirection::sanitized(slot.direction.azimuth, elevation)?;
            Ok(())
        })
    }

    /// Direction of source `index`
    pub fn source_direction(&self, index: usize) -> EncoderResult<SourceDirection> {
        check_index(index)?;
        Ok(self.shared.read(|s| s.sources[index].direction))
    }

    /// Directions of the active sources
    pub fn source_directions(&self) -> Vec<SourceDirection> {
        self.shared.read(|s| {
            s.sources[..s.num_sources]
                .iter()
                .map(|slot| slot.direction)
                .collect()
        })
    }

    /// Set linear gain of source `index`
    pub fn set_source_gain(&self, index: usize, gain: f32) -> EncoderResult<()> {
        self.modify("source gain", |s| {
            if !gain.is_finite() || gain < 0.0 {
                return Err(EncoderError::InvalidGain(gain));
            }
            slot_mut(s, index)?.gain = gain;
            Ok(())
        })
    }

    /// Linear gain of source `index`
    pub fn source_gain(&self, index: usize) -> EncoderResult<f32> {
        check_index(index)?;
        Ok(self.shared.read(|s| s.sources[index].gain))
    }

    /// Replace all directions and the source count with a preset
    pub fn load_preset(&self, preset: SourcePreset) -> EncoderResult<()> {
        let loaded = preset.load();
        self.modify("source preset", |s| {
            for (slot, direction) in s.sources.iter_mut().zip(loaded.directions) {
                slot.direction = direction;
            }
            s.num_sources = loaded.num_sources;
            Ok(())
        })
    }

    /// Set output order. FuMa ordering/normalization fall back to ACN/SN3D
    /// above first order.
    pub fn set_order(&self, order: AmbisonicOrder) -> EncoderResult<()> {
        self.modify("order", |s| {
            if !s.format.ordering.supports(order) {
                log::info!("[AmbiEnc] FuMa ordering needs first order, switching to ACN");
                s.format.ordering = ChannelOrdering::ACN;
            }
            if !s.format.normalization.supports(order) {
                log::info!("[AmbiEnc] FuMa normalization needs first order, switching to SN3D");
                s.format.normalization = Normalization::SN3D;
            }
            s.order = order;
            Ok(())
        })
    }

    /// Output order
    pub fn order(&self) -> AmbisonicOrder {
        self.shared.read(|s| s.order)
    }

    /// Set channel ordering
    pub fn set_channel_ordering(&self, ordering: ChannelOrdering) -> EncoderResult<()> {
        self.modify("channel ordering", |s| {
            let format = AmbisonicFormat { ordering, ..s.format };
            format.validate(s.order)?;
            s.format = format;
            Ok(())
        })
    }

    /// Channel ordering
    pub fn channel_ordering(&self) -> ChannelOrdering {
        self.shared.read(|s| s.format.ordering)
    }

    /// Set normalization
    pub fn set_normalization(&self, normalization: Normalization) -> EncoderResult<()> {
        self.modify("normalization", |s| {
            let format = AmbisonicFormat {
                normalization,
                ..s.format
            };
            format.validate(s.order)?;
            s.format = format;
            Ok(())
        })
    }

    /// Normalization
    pub fn normalization(&self) -> Normalization {
        self.shared.read(|s| s.format.normalization)
    }

    /// Enable `1/sqrt(num_sources)` scaling
    pub fn set_post_scaling(&self, enabled: bool) -> EncoderResult<()> {
        self.modify("post scaling", |s| {
            s.post_scaling = enabled;
            Ok(())
        })
    }

    /// Whether post scaling is enabled
    pub fn post_scaling(&self) -> bool {
        self.shared.read(|s| s.post_scaling)
    }

    /// Output channel count, `(order + 1)^2`
    pub fn num_sh_channels(&self) -> usize {
        self.shared.read(|s| s.num_sh_channels())
    }

    /// Apply a whole configuration at once; nothing changes if any part is invalid
    pub fn apply_config(&self, config: &EncoderConfig) -> EncoderResult<()> {
        self.modify("configuration", |s| config.apply_to(s))
    }

    /// Current parameters as a configuration
    pub fn config(&self) -> EncoderConfig {
        EncoderConfig::from_state(&self.snapshot())
    }
}

fn check_index(index: usize) -> EncoderResult<()> {
    if index >= MAX_NUM_INPUTS {
        return Err(EncoderError::SourceIndexOutOfRange {
            index,
            capacity: MAX_NUM_INPUTS,
        });
    }
    Ok(())
}

fn slot_mut(state: &mut ParamState, index: usize) -> EncoderResult<&mut SourceSlot> {
    check_index(index)?;
    Ok(&mut state.sources[index])
}
