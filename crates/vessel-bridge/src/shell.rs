//! Host-facing plugin object.
//!
//! One `PluginShell` per plugin instance the host creates. It owns the engine
//! handle; a UI shell borrows it through [`PluginShell::open_ui`].

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::handle::EngineHandle;
use crate::library::EngineLibrary;
use crate::processor::{AudioProcessor, HostTime};
use crate::state::StateBlob;
use crate::ui::{UiBridge, UiHost};
use std::sync::Arc;

/// How the host should persist the state entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDescriptor {
    pub key: String,
    pub default_value: String,
    /// The value is base64 text, safe for text/XML-based host storage.
    pub base64_blob: bool,
}

pub struct PluginShell {
    engine: EngineHandle,
    state_key: String,
}

impl PluginShell {
    /// Loads the engine (first instance only) and creates this instance's
    /// engine state. A failure here must fail plugin initialization.
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let library = EngineLibrary::acquire_with(config)?;
        Self::with_library(library, config)
    }

    pub fn with_library(library: Arc<EngineLibrary>, config: &BridgeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: EngineHandle::create(library)?,
            state_key: config.state_key.clone(),
        })
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn state_descriptor(&self) -> StateDescriptor {
        StateDescriptor {
            key: self.state_key.clone(),
            default_value: String::new(),
            base64_blob: true,
        }
    }

    /// Host restore callback. Unknown keys and malformed values are logged and
    /// dropped; the host has no way to act on an error here.
    pub fn set_state(&self, key: &str, value: &str) {
        if key != self.state_key {
            tracing::warn!("Ignoring state for unknown key {:?}", key);
            return;
        }
        if let Err(e) = self.engine.set_state(&StateBlob::from(value)) {
            tracing::warn!("Dropping state for key {:?}: {}", key, e);
        }
    }

    /// Host save callback.
    pub fn get_state(&self, key: &str) -> String {
        if key != self.state_key {
            tracing::warn!("State requested for unknown key {:?}", key);
            return String::new();
        }
        self.engine.get_state().into_string()
    }

    /// Host audio callback.
    pub fn run(&self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: u32, time: &HostTime) {
        AudioProcessor::process(&self.engine, inputs, outputs, frames, time);
    }

    /// Engine version in the host's packed form.
    pub fn version(&self) -> u32 {
        self.engine.library().version().packed()
    }

    /// Creates the UI shell for this instance.
    pub fn open_ui<H: UiHost>(&self, host: H) -> UiBridge<'_, H> {
        UiBridge::new(&self.engine, host)
    }
}
