//! Host-driven state save/restore.
//!
//! The engine hands back a buffer it allocated itself. That buffer has to go
//! back through the engine's `cstring_drop` entry point: the engine may run a
//! different allocator than the shell, so freeing it here is undefined.

use crate::abi::CStringDropFn;
use crate::error::{BridgeError, Result};
use crate::handle::EngineHandle;
use std::ffi::{c_char, CStr, CString};
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Opaque, text-safe encoding of all persistent engine state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StateBlob(String);

impl StateBlob {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// "No persisted state": the engine keeps its defaults.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for StateBlob {
    fn from(encoded: String) -> Self {
        Self(encoded)
    }
}

impl From<&str> for StateBlob {
    fn from(encoded: &str) -> Self {
        Self(encoded.to_string())
    }
}

impl std::fmt::Display for StateBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Engine-allocated buffer, released through the engine on drop.
struct OwnedStateBuffer<'a> {
    ptr: NonNull<c_char>,
    release: CStringDropFn,
    _engine: PhantomData<&'a EngineHandle>,
}

impl<'a> OwnedStateBuffer<'a> {
    fn take(engine: &'a EngineHandle) -> Option<Self> {
        let ptr = unsafe { (engine.entry().plugin_get_state)(engine.as_ptr()) };
        NonNull::new(ptr).map(|ptr| Self {
            ptr,
            release: engine.entry().cstring_drop,
            _engine: PhantomData,
        })
    }

    fn to_blob(&self) -> StateBlob {
        let text = unsafe { CStr::from_ptr(self.ptr.as_ptr()) };
        StateBlob(text.to_string_lossy().into_owned())
    }
}

impl Drop for OwnedStateBuffer<'_> {
    fn drop(&mut self) {
        unsafe { (self.release)(self.ptr.as_ptr()) };
    }
}

pub struct StateCodec;

impl StateCodec {
    /// Copies the engine's current state into a caller-owned blob.
    pub fn save(engine: &EngineHandle) -> StateBlob {
        match OwnedStateBuffer::take(engine) {
            Some(buffer) => buffer.to_blob(),
            None => {
                tracing::warn!("Engine returned no state buffer, saving empty state");
                StateBlob::empty()
            }
        }
    }

    /// Passes `blob` to the engine by reference. Re-applying the same blob is
    /// harmless.
    pub fn restore(engine: &EngineHandle, blob: &StateBlob) -> Result<()> {
        let encoded = CString::new(blob.as_str())
            .map_err(|e| BridgeError::StateRestoreError(e.to_string()))?;
        unsafe { (engine.entry().plugin_set_state)(engine.as_ptr(), encoded.as_ptr()) };
        Ok(())
    }
}
