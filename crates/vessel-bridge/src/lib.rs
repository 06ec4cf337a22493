//! Host-shell to engine bridge for vessel
//!
//! This crate sits between a plugin shell driven by an untrusted host (a DAW)
//! and an engine implementation loaded from a shared library next to the
//! plugin binary.
//!
//! ## Threads
//!
//! - **Audio**: [`PluginShell::run`] / [`AudioProcessor`]. Never blocks, never
//!   allocates.
//! - **Control**: state save/restore through [`StateCodec`]. May block.
//! - **UI**: [`UiBridge`] idle/resize. Idle never blocks.
//!
//! ## Usage
//!
//! ```ignore
//! use vessel_bridge::{BridgeConfig, HostTime, PluginShell};
//!
//! // First instance loads the engine library; failure aborts plugin init.
//! let plugin = PluginShell::new(&BridgeConfig::default())?;
//!
//! plugin.set_state("state", saved_blob);
//! plugin.run(&inputs, &mut outputs, frames, &HostTime { sample_rate, playing, frame });
//!
//! let ui = plugin.open_ui(host_ui);
//! ui.idle();
//! ```

pub mod abi;
pub use abi::{EngineVersion, EntryPoints, MAX_CHANNELS};

pub mod error;
pub use error::{BridgeError, LoadStage, Result};

mod config;
pub use config::{BridgeConfig, LibraryPlatform};

mod library;
pub use library::{locate, module_dir, EngineLibrary, LibraryCell};

mod handle;
pub use handle::EngineHandle;

mod processor;
pub use processor::{AudioProcessor, HostTime, TransportInfo};

mod state;
pub use state::{StateBlob, StateCodec};

mod ui;
pub use ui::{IdleOutcome, UiBridge, UiHost, UiPhase};

mod shell;
pub use shell::{PluginShell, StateDescriptor};

#[cfg(test)]
mod testing;
