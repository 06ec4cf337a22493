//! Process-wide engine library.
//!
//! The engine binary is loaded lazily on first use and then kept mapped until
//! the process exits. Lookups vastly outnumber the single load, so the slot is
//! guarded by a read/write lock with a double-checked slow path instead of a
//! mutex every caller would serialize on.

use crate::abi::{symbols, EngineVersion, EntryPoints};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, LoadStage, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lazily initialized, load-once slot.
///
/// The loader runs at most once per successful initialization: racing callers
/// that all observed an empty slot queue up on the write lock, and every one
/// after the first finds the slot filled on re-check. A failed load leaves the
/// slot empty.
pub struct LibraryCell<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> LibraryCell<T> {
    pub const fn new() -> Self {
        Self {
            slot: parking_lot::const_rwlock(None),
        }
    }

    /// Returns the loaded value, if any, without attempting a load.
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.read().clone()
    }

    pub fn get_or_try_load<E, F>(&self, load: F) -> std::result::Result<Arc<T>, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
    {
        {
            let slot = self.slot.read();
            if let Some(loaded) = slot.as_ref() {
                return Ok(Arc::clone(loaded));
            }
        }

        let mut slot = self.slot.write();
        if let Some(loaded) = slot.as_ref() {
            return Ok(Arc::clone(loaded));
        }
        let loaded = Arc::new(load()?);
        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }
}

impl<T> Default for LibraryCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

static ENGINE: LibraryCell<EngineLibrary> = LibraryCell::new();

/// The loaded engine implementation and its resolved entry points.
pub struct EngineLibrary {
    entry: EntryPoints,
    path: Option<PathBuf>,
    // Declared last: entry points must not outlive the mapping.
    _library: Option<libloading::Library>,
}

impl std::fmt::Debug for EngineLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineLibrary")
            .field("path", &self.path)
            .field("entry", &self.entry)
            .finish()
    }
}

impl EngineLibrary {
    /// Process-wide engine with the default configuration.
    pub fn acquire() -> Result<Arc<Self>> {
        Self::acquire_with(&BridgeConfig::default())
    }

    /// Process-wide engine. The configuration only matters for the call that
    /// performs the load; later callers get the already loaded library.
    pub fn acquire_with(config: &BridgeConfig) -> Result<Arc<Self>> {
        ENGINE.get_or_try_load(|| {
            config.validate()?;
            let path = locate(config)?;
            Self::open(&path)
        })
    }

    /// Process-wide engine produced by a custom loader, e.g. a statically
    /// linked table.
    pub fn acquire_or_init<F>(load: F) -> Result<Arc<Self>>
    where
        F: FnOnce() -> Result<Self>,
    {
        ENGINE.get_or_try_load(load)
    }

    /// Loads the engine binary at `path` and resolves every entry point.
    pub fn open(path: &Path) -> Result<Self> {
        let library = unsafe {
            libloading::Library::new(path).map_err(|e| BridgeError::LoadFailed {
                path: path.to_path_buf(),
                stage: LoadStage::Opening,
                reason: format!("Failed to load library: {}", e),
            })?
        };

        let entry = resolve(&library, path)?;
        let library = Self {
            entry,
            path: Some(path.to_path_buf()),
            _library: Some(library),
        };
        tracing::info!(
            "Engine library loaded from {} (version {})",
            path.display(),
            library.version()
        );
        Ok(library)
    }

    /// Wraps entry points that are linked into the current binary.
    pub fn linked(entry: EntryPoints) -> Self {
        Self {
            entry,
            path: None,
            _library: None,
        }
    }

    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry
    }

    /// `None` for a statically linked engine.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn version(&self) -> EngineVersion {
        unsafe { (self.entry.get_version)() }
    }
}

fn resolve(library: &libloading::Library, path: &Path) -> Result<EntryPoints> {
    fn symbol<T: Copy>(library: &libloading::Library, path: &Path, name: &[u8]) -> Result<T> {
        let symbol: libloading::Symbol<T> =
            unsafe { library.get(name) }.map_err(|e| BridgeError::LoadFailed {
                path: path.to_path_buf(),
                stage: LoadStage::Resolving,
                reason: format!(
                    "No {} symbol: {}",
                    String::from_utf8_lossy(&name[..name.len() - 1]),
                    e
                ),
            })?;
        Ok(*symbol)
    }

    Ok(EntryPoints {
        plugin_new: symbol(library, path, symbols::PLUGIN_NEW)?,
        plugin_drop: symbol(library, path, symbols::PLUGIN_DROP)?,
        plugin_run: symbol(library, path, symbols::PLUGIN_RUN)?,
        plugin_get_state: symbol(library, path, symbols::PLUGIN_GET_STATE)?,
        plugin_set_state: symbol(library, path, symbols::PLUGIN_SET_STATE)?,
        cstring_drop: symbol(library, path, symbols::CSTRING_DROP)?,
        plugin_ui_new: symbol(library, path, symbols::PLUGIN_UI_NEW)?,
        plugin_ui_drop: symbol(library, path, symbols::PLUGIN_UI_DROP)?,
        plugin_ui_idle: symbol(library, path, symbols::PLUGIN_UI_IDLE)?,
        plugin_ui_set_size: symbol(library, path, symbols::PLUGIN_UI_SET_SIZE)?,
        get_version: symbol(library, path, symbols::GET_VERSION)?,
    })
}

/// Full path of the engine binary for `config`.
pub fn locate(config: &BridgeConfig) -> Result<PathBuf> {
    let file_name = config.library_file_name();
    let dir = match &config.library_dir {
        Some(dir) => dir.clone(),
        None => module_dir().ok_or_else(|| BridgeError::LoadFailed {
            path: PathBuf::from(&file_name),
            stage: LoadStage::Locating,
            reason: "Could not determine the directory of the running module".to_string(),
        })?,
    };

    let path = dir.join(&file_name);
    if !path.is_file() {
        tracing::error!("Engine library not found at {}", path.display());
        return Err(BridgeError::LoadFailed {
            path,
            stage: LoadStage::Locating,
            reason: "No such file".to_string(),
        });
    }
    Ok(path)
}

/// Directory of the binary that contains this code (the plugin, not the host
/// executable, when built into a plugin).
pub fn module_dir() -> Option<PathBuf> {
    let path = module_path()?;
    let path = std::fs::canonicalize(&path).unwrap_or(path);
    path.parent().map(Path::to_path_buf)
}

#[cfg(unix)]
fn module_path() -> Option<PathBuf> {
    use std::ffi::{c_void, CStr, OsStr};
    use std::os::unix::ffi::OsStrExt;

    let mut info: libc::Dl_info = unsafe { std::mem::zeroed() };
    let address = module_path as *const () as *const c_void;
    if unsafe { libc::dladdr(address, &mut info) } == 0 || info.dli_fname.is_null() {
        return None;
    }
    let name = unsafe { CStr::from_ptr(info.dli_fname) };
    Some(PathBuf::from(OsStr::from_bytes(name.to_bytes())))
}

#[cfg(windows)]
fn module_path() -> Option<PathBuf> {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::HMODULE;
    use windows::Win32::System::LibraryLoader::{
        GetModuleFileNameW, GetModuleHandleExW, GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS,
        GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
    };

    let mut module = HMODULE::default();
    let address = module_path as *const () as *const u16;
    unsafe {
        GetModuleHandleExW(
            GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
            PCWSTR(address),
            &mut module,
        )
    }
    .ok()?;

    let mut buffer = vec![0u16; 32 * 1024];
    let len = unsafe { GetModuleFileNameW(module, &mut buffer) } as usize;
    if len == 0 {
        return None;
    }
    Some(PathBuf::from(OsString::from_wide(&buffer[..len])))
}

#[cfg(not(any(unix, windows)))]
fn module_path() -> Option<PathBuf> {
    std::env::current_exe().ok()
}
