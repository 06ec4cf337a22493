//! Bridge configuration.

use crate::error::{BridgeError, Result};
use std::path::PathBuf;

/// Naming scheme for the engine binary on each platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryPlatform {
    Windows,
    MacOs,
    Posix,
}

impl LibraryPlatform {
    pub const fn current() -> Self {
        if cfg!(target_os = "windows") {
            LibraryPlatform::Windows
        } else if cfg!(target_os = "macos") {
            LibraryPlatform::MacOs
        } else {
            LibraryPlatform::Posix
        }
    }

    pub fn file_name(&self, stem: &str) -> String {
        match self {
            LibraryPlatform::Windows => format!("{stem}.dll"),
            LibraryPlatform::MacOs => format!("lib{stem}.dylib"),
            LibraryPlatform::Posix => format!("lib{stem}.so"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Engine library name without platform prefix/extension.
    pub library_stem: String,
    /// Overrides the directory of the running module. Hosts pick arbitrary
    /// working directories, so a relative path here is rarely what you want.
    pub library_dir: Option<PathBuf>,
    /// Key the host stores the state blob under.
    pub state_key: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            library_stem: "vessel_engine".to_string(),
            library_dir: None,
            state_key: "state".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.library_stem.is_empty() {
            return Err(BridgeError::InvalidConfig(
                "library_stem must not be empty".to_string(),
            ));
        }
        if self.library_stem.contains(['/', '\\']) {
            return Err(BridgeError::InvalidConfig(format!(
                "library_stem {:?} must be a bare name, not a path",
                self.library_stem
            )));
        }
        if self.state_key.is_empty() {
            return Err(BridgeError::InvalidConfig(
                "state_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn library_file_name(&self) -> String {
        LibraryPlatform::current().file_name(&self.library_stem)
    }
}
