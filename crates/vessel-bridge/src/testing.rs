//! In-process mock engine for bridge tests.
//!
//! Every mock instance carries its own counters so tests can run in parallel.
//! Outstanding state buffers are tracked in a global ledger keyed by address
//! that credits each release back to the issuing instance.

use crate::abi::{EngineVersion, EntryPoints};
use crate::library::EngineLibrary;
use crate::ui::UiHost;
use crate::EngineHandle;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CString};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

pub const MOCK_VERSION: EngineVersion = EngineVersion::new(1, 2, 3);
pub const MOCK_DEFAULT_STATE: &str = "ZGVmYXVsdA==";

#[derive(Default)]
pub struct MockCounters {
    pub drops: AtomicUsize,
    pub runs: AtomicUsize,
    pub last_frames: AtomicU32,
    pub last_inputs: AtomicU32,
    pub last_outputs: AtomicU32,
    pub last_position: AtomicI64,
    pub last_playing: AtomicBool,
    pub set_state_calls: AtomicUsize,
    pub null_state: AtomicBool,
    pub issued_buffers: AtomicUsize,
    pub released_buffers: AtomicUsize,
    /// Upcoming UI creations that should return null.
    pub ui_failures: AtomicUsize,
    pub ui_creations: AtomicUsize,
    pub ui_idles: AtomicUsize,
    pub ui_drops: AtomicUsize,
    pub ui_last_size: Mutex<Option<(u32, u32, f64)>>,
}

pub struct MockEngine {
    counters: Arc<MockCounters>,
    state: Mutex<String>,
}

impl MockEngine {
    pub fn counters(handle: &EngineHandle) -> Arc<MockCounters> {
        let engine = unsafe { &*(handle.as_ptr() as *const MockEngine) };
        Arc::clone(&engine.counters)
    }
}

struct MockUi {
    counters: Arc<MockCounters>,
}

fn outstanding_buffers() -> &'static Mutex<HashMap<usize, Arc<MockCounters>>> {
    static LEDGER: OnceLock<Mutex<HashMap<usize, Arc<MockCounters>>>> = OnceLock::new();
    LEDGER.get_or_init(|| Mutex::new(HashMap::new()))
}

static UNKNOWN_RELEASES: AtomicUsize = AtomicUsize::new(0);

/// Releases of pointers that were never issued, or were already released.
pub fn unknown_releases() -> usize {
    UNKNOWN_RELEASES.load(Ordering::SeqCst)
}

unsafe extern "C" fn mock_new() -> *mut c_void {
    Box::into_raw(Box::new(MockEngine {
        counters: Arc::new(MockCounters::default()),
        state: Mutex::new(MOCK_DEFAULT_STATE.to_string()),
    })) as *mut c_void
}

unsafe extern "C" fn mock_new_null() -> *mut c_void {
    std::ptr::null_mut()
}

unsafe extern "C" fn mock_drop(plugin: *mut c_void) {
    let engine = Box::from_raw(plugin as *mut MockEngine);
    engine.counters.drops.fetch_add(1, Ordering::SeqCst);
}

/// Copies input to output channel-by-channel.
unsafe extern "C" fn mock_run(
    plugin: *mut c_void,
    inputs: *const *const f32,
    num_inputs: u32,
    outputs: *const *mut f32,
    num_outputs: u32,
    _sample_rate: f32,
    frames: u32,
    is_playing: bool,
    position: i64,
) {
    let engine = &*(plugin as *const MockEngine);
    let counters = &engine.counters;
    counters.runs.fetch_add(1, Ordering::SeqCst);
    counters.last_frames.store(frames, Ordering::SeqCst);
    counters.last_inputs.store(num_inputs, Ordering::SeqCst);
    counters.last_outputs.store(num_outputs, Ordering::SeqCst);
    counters.last_position.store(position, Ordering::SeqCst);
    counters.last_playing.store(is_playing, Ordering::SeqCst);

    for ch in 0..num_outputs as usize {
        let output = std::slice::from_raw_parts_mut(*outputs.add(ch), frames as usize);
        if ch < num_inputs as usize {
            let input = std::slice::from_raw_parts(*inputs.add(ch), frames as usize);
            output.copy_from_slice(input);
        } else {
            output.fill(0.0);
        }
    }
}

unsafe extern "C" fn mock_get_state(plugin: *mut c_void) -> *mut c_char {
    let engine = &*(plugin as *const MockEngine);
    if engine.counters.null_state.load(Ordering::SeqCst) {
        return std::ptr::null_mut();
    }
    let state = engine.state.lock().clone();
    let ptr = CString::new(state).unwrap().into_raw();
    engine.counters.issued_buffers.fetch_add(1, Ordering::SeqCst);
    outstanding_buffers()
        .lock()
        .insert(ptr as usize, Arc::clone(&engine.counters));
    ptr
}

unsafe extern "C" fn mock_set_state(plugin: *mut c_void, state: *const c_char) {
    let engine = &*(plugin as *const MockEngine);
    engine.counters.set_state_calls.fetch_add(1, Ordering::SeqCst);
    let state = std::ffi::CStr::from_ptr(state).to_string_lossy();
    if !state.is_empty() {
        *engine.state.lock() = state.into_owned();
    }
}

unsafe extern "C" fn mock_cstring_drop(s: *mut c_char) {
    // Unregister before freeing: the allocator may hand the address out again.
    match outstanding_buffers().lock().remove(&(s as usize)) {
        Some(counters) => {
            counters.released_buffers.fetch_add(1, Ordering::SeqCst);
            drop(CString::from_raw(s));
        }
        None => {
            UNKNOWN_RELEASES.fetch_add(1, Ordering::SeqCst);
        }
    }
}

unsafe extern "C" fn mock_ui_new(
    parent: usize,
    plugin: *mut c_void,
    _width: u32,
    _height: u32,
    _scale_factor: f64,
) -> *mut c_void {
    let engine = &*(plugin as *const MockEngine);
    let counters = &engine.counters;
    counters.ui_creations.fetch_add(1, Ordering::SeqCst);
    if parent == 0 {
        return std::ptr::null_mut();
    }
    let pending = counters.ui_failures.load(Ordering::SeqCst);
    if pending > 0 {
        counters.ui_failures.store(pending - 1, Ordering::SeqCst);
        return std::ptr::null_mut();
    }
    Box::into_raw(Box::new(MockUi {
        counters: Arc::clone(counters),
    })) as *mut c_void
}

unsafe extern "C" fn mock_ui_drop(ui: *mut c_void) {
    let ui = Box::from_raw(ui as *mut MockUi);
    ui.counters.ui_drops.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn mock_ui_idle(ui: *mut c_void) {
    let ui = &*(ui as *const MockUi);
    ui.counters.ui_idles.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn mock_ui_set_size(ui: *mut c_void, width: u32, height: u32, scale: f64) {
    let ui = &*(ui as *const MockUi);
    *ui.counters.ui_last_size.lock() = Some((width, height, scale));
}

unsafe extern "C" fn mock_version() -> EngineVersion {
    MOCK_VERSION
}

pub fn mock_entry_points() -> EntryPoints {
    EntryPoints {
        plugin_new: mock_new,
        plugin_drop: mock_drop,
        plugin_run: mock_run,
        plugin_get_state: mock_get_state,
        plugin_set_state: mock_set_state,
        cstring_drop: mock_cstring_drop,
        plugin_ui_new: mock_ui_new,
        plugin_ui_drop: mock_ui_drop,
        plugin_ui_idle: mock_ui_idle,
        plugin_ui_set_size: mock_ui_set_size,
        get_version: mock_version,
    }
}

pub fn mock_library() -> EngineLibrary {
    EngineLibrary::linked(mock_entry_points())
}

/// Engine whose constructor always returns null.
pub fn failing_library() -> EngineLibrary {
    EngineLibrary::linked(EntryPoints {
        plugin_new: mock_new_null,
        ..mock_entry_points()
    })
}

pub struct TestHost {
    pub parent: usize,
    pub width: u32,
    pub height: u32,
    pub scale: f64,
}

impl TestHost {
    pub fn new(parent: usize) -> Self {
        Self {
            parent,
            width: 640,
            height: 480,
            scale: 1.0,
        }
    }
}

impl UiHost for TestHost {
    fn parent_window(&self) -> usize {
        self.parent
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn scale_factor(&self) -> f64 {
        self.scale
    }

    fn size_changed(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}
