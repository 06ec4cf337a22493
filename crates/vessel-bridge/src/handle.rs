//! Owning wrapper around one engine instance.

use crate::abi::{EntryPoints, MAX_CHANNELS};
use crate::error::{BridgeError, Result};
use crate::library::EngineLibrary;
use crate::processor::TransportInfo;
use crate::state::{StateBlob, StateCodec};
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::Arc;

/// Exclusive owner of one engine instance.
///
/// The instance is destroyed exactly once, when the handle is dropped. The
/// handle also keeps the library mapped, so the engine code stays valid for as
/// long as any instance exists.
pub struct EngineHandle {
    raw: NonNull<c_void>,
    library: Arc<EngineLibrary>,
}

// The engine contract makes every entry point callable from any host thread;
// process/state/UI serialization is the engine's own business.
unsafe impl Send for EngineHandle {}
unsafe impl Sync for EngineHandle {}

impl EngineHandle {
    pub fn create(library: Arc<EngineLibrary>) -> Result<Self> {
        let raw = unsafe { (library.entry_points().plugin_new)() };
        let raw = NonNull::new(raw).ok_or(BridgeError::InstantiationFailed)?;
        tracing::debug!("Engine instance created at {:p}", raw);
        Ok(Self { raw, library })
    }

    pub fn library(&self) -> &Arc<EngineLibrary> {
        &self.library
    }

    pub(crate) fn entry(&self) -> &EntryPoints {
        self.library.entry_points()
    }

    /// Raw instance pointer, for passing back into the engine (e.g. as the
    /// owning instance of a UI). Ownership stays with the handle.
    pub fn as_ptr(&self) -> *mut c_void {
        self.raw.as_ptr()
    }

    /// Real-time entry point.
    ///
    /// `frames` is clamped to the shortest buffer given, so the engine never
    /// touches memory past a slice. Channels beyond [`MAX_CHANNELS`] are not
    /// forwarded; extra outputs are zero-filled. Never blocks, never allocates.
    pub fn process(
        &self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        frames: usize,
        transport: &TransportInfo,
    ) {
        let frames = block_frames(inputs, outputs, frames);
        if frames == 0 {
            return;
        }

        let num_inputs = inputs.len().min(MAX_CHANNELS);
        let num_outputs = outputs.len().min(MAX_CHANNELS);

        let mut input_ptrs = [std::ptr::null::<f32>(); MAX_CHANNELS];
        for (ptr, channel) in input_ptrs.iter_mut().zip(inputs) {
            *ptr = channel.as_ptr();
        }
        let mut output_ptrs = [std::ptr::null_mut::<f32>(); MAX_CHANNELS];
        for (ptr, channel) in output_ptrs.iter_mut().zip(outputs.iter_mut()) {
            *ptr = channel.as_mut_ptr();
        }

        unsafe {
            self.process_raw(
                input_ptrs.as_ptr(),
                num_inputs as u32,
                output_ptrs.as_ptr(),
                num_outputs as u32,
                frames as u32,
                transport,
            );
        }

        for channel in outputs.iter_mut().skip(MAX_CHANNELS) {
            channel[..frames].fill(0.0);
        }
    }

    /// Forwards host-native channel pointer tables straight to the engine.
    ///
    /// # Safety
    /// `inputs`/`outputs` must point to `num_inputs`/`num_outputs` channel
    /// pointers (or be null with a count of zero), each valid for `frames`
    /// samples for the duration of the call. Output channels must not alias
    /// each other.
    pub unsafe fn process_raw(
        &self,
        inputs: *const *const f32,
        num_inputs: u32,
        outputs: *const *mut f32,
        num_outputs: u32,
        frames: u32,
        transport: &TransportInfo,
    ) {
        if frames == 0 {
            return;
        }
        (self.entry().plugin_run)(
            self.raw.as_ptr(),
            inputs,
            num_inputs,
            outputs,
            num_outputs,
            transport.sample_rate,
            frames,
            transport.playing,
            transport.position_samples,
        );
    }

    /// Control thread only; may block.
    pub fn get_state(&self) -> StateBlob {
        StateCodec::save(self)
    }

    /// Control thread only; may block. An empty blob means "keep defaults".
    pub fn set_state(&self, blob: &StateBlob) -> Result<()> {
        StateCodec::restore(self, blob)
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        tracing::debug!("Destroying engine instance at {:p}", self.raw);
        unsafe { (self.entry().plugin_drop)(self.raw.as_ptr()) };
    }
}

/// Frames to hand to the engine: the shortest buffer, capped at what the ABI
/// can carry.
fn block_frames(inputs: &[&[f32]], outputs: &[&mut [f32]], frames: usize) -> usize {
    inputs
        .iter()
        .map(|ch| ch.len())
        .chain(outputs.iter().map(|ch| ch.len()))
        .fold(frames, usize::min)
        .min(u32::MAX as usize)
}
