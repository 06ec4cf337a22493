//! C ABI shared by the bridge and the engine library.
//!
//! Every opaque instance crosses the boundary as an untyped pointer. The engine
//! exports one `extern "C"` function per entry below under the listed symbol
//! name; the bridge resolves them once and keeps the table for the lifetime of
//! the process.

use std::ffi::{c_char, c_void};

/// Upper bound on channels forwarded per block. Pointer tables for the engine
/// call live on the stack, so the audio path never allocates.
pub const MAX_CHANNELS: usize = 16;

/// Engine version as reported by `get_version`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl EngineVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Packs into the single-integer form hosts expect (`0x00MMmmpp`).
    pub fn packed(&self) -> u32 {
        (self.major << 16) | ((self.minor & 0xff) << 8) | (self.patch & 0xff)
    }
}

impl std::fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

pub type PluginNewFn = unsafe extern "C" fn() -> *mut c_void;
pub type PluginDropFn = unsafe extern "C" fn(plugin: *mut c_void);
pub type PluginRunFn = unsafe extern "C" fn(
    plugin: *mut c_void,
    inputs: *const *const f32,
    num_inputs: u32,
    outputs: *const *mut f32,
    num_outputs: u32,
    sample_rate: f32,
    frames: u32,
    is_playing: bool,
    position: i64,
);
pub type PluginGetStateFn = unsafe extern "C" fn(plugin: *mut c_void) -> *mut c_char;
pub type PluginSetStateFn = unsafe extern "C" fn(plugin: *mut c_void, state: *const c_char);
pub type CStringDropFn = unsafe extern "C" fn(s: *mut c_char);
pub type PluginUiNewFn = unsafe extern "C" fn(
    parent: usize,
    plugin: *mut c_void,
    width: u32,
    height: u32,
    scale_factor: f64,
) -> *mut c_void;
pub type PluginUiDropFn = unsafe extern "C" fn(ui: *mut c_void);
pub type PluginUiIdleFn = unsafe extern "C" fn(ui: *mut c_void);
pub type PluginUiSetSizeFn =
    unsafe extern "C" fn(ui: *mut c_void, width: u32, height: u32, scale_factor: f64);
pub type GetVersionFn = unsafe extern "C" fn() -> EngineVersion;

/// Resolved engine entry points.
///
/// Function pointers obtained from a loaded library are only valid while that
/// library stays mapped; [`crate::EngineLibrary`] keeps both together.
#[derive(Clone, Copy)]
pub struct EntryPoints {
    pub plugin_new: PluginNewFn,
    pub plugin_drop: PluginDropFn,
    pub plugin_run: PluginRunFn,
    pub plugin_get_state: PluginGetStateFn,
    pub plugin_set_state: PluginSetStateFn,
    pub cstring_drop: CStringDropFn,
    pub plugin_ui_new: PluginUiNewFn,
    pub plugin_ui_drop: PluginUiDropFn,
    pub plugin_ui_idle: PluginUiIdleFn,
    pub plugin_ui_set_size: PluginUiSetSizeFn,
    pub get_version: GetVersionFn,
}

impl std::fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPoints")
            .field("plugin_new", &(self.plugin_new as *const ()))
            .field("plugin_run", &(self.plugin_run as *const ()))
            .finish_non_exhaustive()
    }
}

/// Exported symbol names, NUL-terminated for `libloading`.
pub(crate) mod symbols {
    pub const PLUGIN_NEW: &[u8] = b"plugin_new\0";
    pub const PLUGIN_DROP: &[u8] = b"plugin_drop\0";
    pub const PLUGIN_RUN: &[u8] = b"plugin_run\0";
    pub const PLUGIN_GET_STATE: &[u8] = b"plugin_get_state\0";
    pub const PLUGIN_SET_STATE: &[u8] = b"plugin_set_state\0";
    pub const CSTRING_DROP: &[u8] = b"cstring_drop\0";
    pub const PLUGIN_UI_NEW: &[u8] = b"plugin_ui_new\0";
    pub const PLUGIN_UI_DROP: &[u8] = b"plugin_ui_drop\0";
    pub const PLUGIN_UI_IDLE: &[u8] = b"plugin_ui_idle\0";
    pub const PLUGIN_UI_SET_SIZE: &[u8] = b"plugin_ui_set_size\0";
    pub const GET_VERSION: &[u8] = b"get_version\0";
}
