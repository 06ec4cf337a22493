//! Reference engine for vessel
//!
//! Built as a shared library placed next to the plugin binary. The bridge
//! resolves the `extern "C"` functions below by name; the same functions are
//! available as an [`EntryPoints`] table through [`entry_points`] for static
//! linking.
//!
//! Panics never unwind into the host: every export catches them and falls back
//! to null, silence or a no-op.

pub mod engine;
pub mod error;
pub mod logging;
pub mod ui;

pub use engine::{ChannelIo, Engine, EngineParams};
pub use error::{EngineError, Result};
pub use ui::{EngineUi, ParentWindow, UiNotification};

use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use vessel_bridge::{EngineVersion, EntryPoints, MAX_CHANNELS};

fn guarded<R>(entry: &str, fallback: R, f: impl FnOnce() -> R) -> R {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            tracing::error!("Panic in {}", entry);
            fallback
        }
    }
}

/// # Safety
/// The returned instance must be released with [`plugin_drop`].
#[no_mangle]
pub unsafe extern "C" fn plugin_new() -> *mut c_void {
    logging::init();
    guarded("plugin_new", std::ptr::null_mut(), || {
        tracing::debug!("Creating engine instance");
        Box::into_raw(Box::new(Engine::new())) as *mut c_void
    })
}

/// # Safety
/// `plugin` must come from [`plugin_new`] and must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn plugin_drop(plugin: *mut c_void) {
    if plugin.is_null() {
        return;
    }
    guarded("plugin_drop", (), || {
        drop(Box::from_raw(plugin as *mut Engine));
    })
}

/// # Safety
/// Each table holds `num_*` pointers to buffers of at least `frames` samples.
#[allow(clippy::too_many_arguments)]
#[no_mangle]
pub unsafe extern "C" fn plugin_run(
    plugin: *mut c_void,
    inputs: *const *const f32,
    num_inputs: u32,
    outputs: *const *mut f32,
    num_outputs: u32,
    sample_rate: f32,
    frames: u32,
    is_playing: bool,
    position: i64,
) {
    if plugin.is_null() || frames == 0 {
        return;
    }
    let engine = &*(plugin as *const Engine);
    let frames = frames as usize;
    let num_inputs = if inputs.is_null() {
        0
    } else {
        (num_inputs as usize).min(MAX_CHANNELS)
    };
    let num_outputs = if outputs.is_null() {
        0
    } else {
        (num_outputs as usize).min(MAX_CHANNELS)
    };

    // Channel views are built one at a time so an input and an output that
    // share memory are never borrowed together.
    let channels = (0..num_outputs).map(|ch| {
        let output = *outputs.add(ch);
        let input = if ch < num_inputs {
            *inputs.add(ch)
        } else {
            std::ptr::null()
        };
        channel_io(input, output, frames)
    });

    guarded("plugin_run", (), || {
        engine.process(channels, sample_rate, is_playing, position);
    })
}

/// Whether two `len`-sample buffers share any memory.
fn overlaps(a: *const f32, b: *const f32, len: usize) -> bool {
    let bytes = len.saturating_mul(std::mem::size_of::<f32>());
    let (a, b) = (a as usize, b as usize);
    a < b.saturating_add(bytes) && b < a.saturating_add(bytes)
}

/// # Safety
/// Non-null pointers must be valid for `frames` samples for `'a`.
unsafe fn channel_io<'a>(input: *const f32, output: *mut f32, frames: usize) -> ChannelIo<'a> {
    if output.is_null() {
        return ChannelIo::Split {
            input: None,
            output: Default::default(),
        };
    }
    let samples = std::slice::from_raw_parts_mut(output, frames);
    if input.is_null() {
        return ChannelIo::Split {
            input: None,
            output: samples,
        };
    }
    if std::ptr::eq(input, output) {
        return ChannelIo::InPlace(samples);
    }
    if overlaps(input, output, frames) {
        // Partially shifted buffers have no sample-exact meaning; render silence.
        return ChannelIo::Split {
            input: None,
            output: samples,
        };
    }
    ChannelIo::Split {
        input: Some(std::slice::from_raw_parts(input, frames)),
        output: samples,
    }
}

/// # Safety
/// The returned string must be released with [`cstring_drop`].
#[no_mangle]
pub unsafe extern "C" fn plugin_get_state(plugin: *mut c_void) -> *mut c_char {
    if plugin.is_null() {
        return std::ptr::null_mut();
    }
    let engine = &*(plugin as *const Engine);
    guarded("plugin_get_state", std::ptr::null_mut(), || {
        match engine.get_state().map(CString::new) {
            Ok(Ok(state)) => state.into_raw(),
            Ok(Err(e)) => {
                tracing::error!("Encoded state contains NUL: {}", e);
                std::ptr::null_mut()
            }
            Err(e) => {
                tracing::error!("Failed to encode state: {}", e);
                std::ptr::null_mut()
            }
        }
    })
}

/// # Safety
/// `state` is null or a NUL-terminated string valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn plugin_set_state(plugin: *mut c_void, state: *const c_char) {
    if plugin.is_null() || state.is_null() {
        return;
    }
    let engine = &*(plugin as *const Engine);
    let state = CStr::from_ptr(state);
    guarded("plugin_set_state", (), || match state.to_str() {
        Ok(encoded) => engine.set_state(encoded),
        Err(e) => tracing::warn!("Ignoring engine state: {}", EngineError::from(e)),
    })
}

/// # Safety
/// `s` is null or was returned by [`plugin_get_state`] and not yet released.
#[no_mangle]
pub unsafe extern "C" fn cstring_drop(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    drop(CString::from_raw(s));
}

/// # Safety
/// `plugin` must be a live instance that outlives the returned UI.
#[no_mangle]
pub unsafe extern "C" fn plugin_ui_new(
    parent: usize,
    plugin: *mut c_void,
    width: u32,
    height: u32,
    scale_factor: f64,
) -> *mut c_void {
    if plugin.is_null() {
        return std::ptr::null_mut();
    }
    let engine = &*(plugin as *const Engine);
    guarded("plugin_ui_new", std::ptr::null_mut(), || {
        match EngineUi::open(ParentWindow(parent), engine, width, height, scale_factor) {
            Ok(ui) => Box::into_raw(Box::new(ui)) as *mut c_void,
            Err(e) => {
                tracing::warn!("Failed to open editor: {}", e);
                std::ptr::null_mut()
            }
        }
    })
}

/// # Safety
/// `ui` must come from [`plugin_ui_new`] and must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn plugin_ui_drop(ui: *mut c_void) {
    if ui.is_null() {
        return;
    }
    guarded("plugin_ui_drop", (), || {
        drop(Box::from_raw(ui as *mut EngineUi));
    })
}

/// # Safety
/// `ui` must be a live editor from [`plugin_ui_new`].
#[no_mangle]
pub unsafe extern "C" fn plugin_ui_idle(ui: *mut c_void) {
    if ui.is_null() {
        return;
    }
    let ui = &mut *(ui as *mut EngineUi);
    guarded("plugin_ui_idle", (), || ui.idle())
}

/// # Safety
/// `ui` must be a live editor from [`plugin_ui_new`].
#[no_mangle]
pub unsafe extern "C" fn plugin_ui_set_size(
    ui: *mut c_void,
    width: u32,
    height: u32,
    scale_factor: f64,
) {
    if ui.is_null() {
        return;
    }
    let ui = &mut *(ui as *mut EngineUi);
    guarded("plugin_ui_set_size", (), || {
        ui.set_size(width, height, scale_factor)
    })
}

/// # Safety
/// Always safe to call.
#[no_mangle]
pub unsafe extern "C" fn get_version() -> EngineVersion {
    version()
}

pub fn version() -> EngineVersion {
    EngineVersion::new(
        env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
        env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
        env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
    )
}

/// The exports above as a table, for linking the engine into the plugin binary.
pub fn entry_points() -> EntryPoints {
    EntryPoints {
        plugin_new,
        plugin_drop,
        plugin_run,
        plugin_get_state,
        plugin_set_state,
        cstring_drop,
        plugin_ui_new,
        plugin_ui_drop,
        plugin_ui_idle,
        plugin_ui_set_size,
        get_version,
    }
}
