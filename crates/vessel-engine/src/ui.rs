//! Headless editor model.
//!
//! Holds what a windowing toolkit would need to draw the editor: the parent
//! window as a `raw-window-handle` value, the current size and scale, and the
//! latest transport state pushed from the audio thread.

use crate::engine::{Engine, EngineCore};
use crate::error::{EngineError, Result};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use raw_window_handle::RawWindowHandle;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiNotification {
    PlayingChanged(bool),
}

/// Native parent window handle as passed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentWindow(pub usize);

impl ParentWindow {
    #[cfg(target_os = "windows")]
    pub fn raw_window_handle(&self) -> Result<RawWindowHandle> {
        use raw_window_handle::Win32WindowHandle;
        use std::num::NonZeroIsize;

        let hwnd = NonZeroIsize::new(self.0 as isize)
            .ok_or(EngineError::InvalidParentWindow(self.0))?;
        Ok(RawWindowHandle::Win32(Win32WindowHandle::new(hwnd)))
    }

    #[cfg(target_os = "macos")]
    pub fn raw_window_handle(&self) -> Result<RawWindowHandle> {
        use raw_window_handle::AppKitWindowHandle;
        use std::ptr::NonNull;

        let ns_view = NonNull::new(self.0 as *mut std::ffi::c_void)
            .ok_or(EngineError::InvalidParentWindow(self.0))?;
        Ok(RawWindowHandle::AppKit(AppKitWindowHandle::new(ns_view)))
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    pub fn raw_window_handle(&self) -> Result<RawWindowHandle> {
        use raw_window_handle::XcbWindowHandle;
        use std::num::NonZeroU32;

        let window = u32::try_from(self.0)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(EngineError::InvalidParentWindow(self.0))?;
        Ok(RawWindowHandle::Xcb(XcbWindowHandle::new(window)))
    }

    #[cfg(not(any(unix, target_os = "windows")))]
    pub fn raw_window_handle(&self) -> Result<RawWindowHandle> {
        Err(EngineError::UnsupportedPlatform)
    }
}

pub struct EngineUi {
    parent: RawWindowHandle,
    core: Arc<Mutex<EngineCore>>,
    sender: Sender<UiNotification>,
    notifications: Receiver<UiNotification>,
    playing: bool,
    position: f32,
    width: u32,
    height: u32,
    scale_factor: f64,
}

impl EngineUi {
    pub fn open(
        parent: ParentWindow,
        engine: &Engine,
        width: u32,
        height: u32,
        scale_factor: f64,
    ) -> Result<Self> {
        let parent = parent.raw_window_handle()?;
        let (sender, notifications) = engine.attach_ui();
        tracing::debug!("Editor opened ({}x{} @ {})", width, height, scale_factor);

        Ok(Self {
            parent,
            core: Arc::clone(engine.core()),
            sender,
            notifications,
            playing: false,
            position: 0.0,
            width,
            height,
            scale_factor,
        })
    }

    /// Applies pending transport updates. Never blocks on the audio thread.
    pub fn idle(&mut self) {
        for notification in self.notifications.try_iter() {
            match notification {
                UiNotification::PlayingChanged(playing) => self.playing = playing,
            }
        }

        if let Some(mut core) = self.core.try_lock() {
            if core.position_updated {
                core.position_updated = false;
                self.position = core.current_position;
            }
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32, scale_factor: f64) {
        self.width = width;
        self.height = height;
        self.scale_factor = scale_factor;
    }

    pub fn parent(&self) -> RawWindowHandle {
        self.parent
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    /// Transport position in seconds as of the last idle.
    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }
}

impl Drop for EngineUi {
    fn drop(&mut self) {
        let detached = self.core.lock().detach_ui(&self.sender);
        drop(detached);
        tracing::debug!("Editor closed");
    }
}
