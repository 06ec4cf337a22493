//! Host audio callback adapter.

use crate::handle::EngineHandle;

/// Timing information forwarded with every block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportInfo {
    pub sample_rate: f32,
    pub playing: bool,
    /// Signed on purpose: stopped or looping hosts report negative positions.
    pub position_samples: i64,
}

impl Default for TransportInfo {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            playing: false,
            position_samples: 0,
        }
    }
}

/// Time position as the host reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostTime {
    pub sample_rate: f64,
    pub playing: bool,
    /// Unsigned in most host APIs, yet some hosts wrap it below zero.
    pub frame: u64,
}

impl HostTime {
    pub fn transport(&self) -> TransportInfo {
        TransportInfo {
            sample_rate: self.sample_rate as f32,
            playing: self.playing,
            // Reinterpret, don't saturate: a wrapped position is negative.
            position_samples: self.frame as i64,
        }
    }
}

/// Maps one host audio callback onto one engine call. Holds no state.
pub struct AudioProcessor;

impl AudioProcessor {
    pub fn process(
        engine: &EngineHandle,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        frames: u32,
        time: &HostTime,
    ) {
        engine.process(inputs, outputs, frames as usize, &time.transport());
    }

    /// Host-native variant for shells that receive raw channel tables.
    ///
    /// # Safety
    /// Same contract as [`EngineHandle::process_raw`].
    pub unsafe fn process_host(
        engine: &EngineHandle,
        inputs: *const *const f32,
        num_inputs: u32,
        outputs: *const *mut f32,
        num_outputs: u32,
        frames: u32,
        time: &HostTime,
    ) {
        let num_inputs = if inputs.is_null() { 0 } else { num_inputs };
        let num_outputs = if outputs.is_null() { 0 } else { num_outputs };
        engine.process_raw(
            inputs,
            num_inputs,
            outputs,
            num_outputs,
            frames,
            &time.transport(),
        );
    }
}
