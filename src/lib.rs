//! # Vessel - plugin shell to engine bridge
//!
//! Hosts an externally built audio engine inside a plugin shell.
//!
//! ## Architecture
//!
//! - **vessel-bridge** - Library loading, engine lifetime, audio forwarding,
//!   state save/restore, UI lifecycle
//! - **vessel-engine** - Reference engine exporting the C ABI the bridge loads
//!
//! ## Quick Start
//!
//! ```ignore
//! use vessel::prelude::*;
//!
//! let plugin = vessel::open_plugin(&BridgeConfig::default())?;
//!
//! plugin.set_state("state", &saved);
//! plugin.run(&inputs, &mut outputs, frames, &HostTime { sample_rate, playing, frame });
//! let saved = plugin.get_state("state");
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Load `vessel_engine` from the plugin's directory at runtime
//! - `static-link` - Link the reference engine into the plugin binary

/// Re-export of vessel-bridge for direct access
pub use vessel_bridge as bridge;

pub use vessel_bridge::{
    AudioProcessor, BridgeConfig, BridgeError, EngineHandle, EngineLibrary, EngineVersion,
    HostTime, IdleOutcome, LoadStage, PluginShell, StateBlob, StateCodec, StateDescriptor,
    TransportInfo, UiBridge, UiHost, UiPhase, MAX_CHANNELS,
};

#[cfg(feature = "static-link")]
pub use vessel_engine as engine;

mod error;
pub use error::{Error, Result};

use std::sync::Arc;

/// Returns the process-wide engine library, loading it on first use.
///
/// With `static-link` the linked-in engine is used and `config` only selects
/// the persisted state key.
pub fn acquire_engine(config: &BridgeConfig) -> Result<Arc<EngineLibrary>> {
    config.validate()?;

    #[cfg(feature = "static-link")]
    let library = EngineLibrary::acquire_or_init(|| {
        Ok(EngineLibrary::linked(vessel_engine::entry_points()))
    })?;

    #[cfg(not(feature = "static-link"))]
    let library = EngineLibrary::acquire_with(config)?;

    tracing::debug!("Engine library ready (version {})", library.version());
    Ok(library)
}

/// Creates one plugin instance against the process-wide engine.
pub fn open_plugin(config: &BridgeConfig) -> Result<PluginShell> {
    let library = acquire_engine(config)?;
    let shell = PluginShell::with_library(library, config).inspect_err(|e| {
        tracing::error!("Failed to open plugin: {}", e);
    })?;
    tracing::info!("Plugin opened (state key '{}')", config.state_key);
    Ok(shell)
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Error, Result};
    pub use vessel_bridge::{
        BridgeConfig, HostTime, IdleOutcome, PluginShell, StateBlob, UiBridge, UiHost, UiPhase,
    };
}
