//! UI attachment, resize and idle protocol.
//!
//! Some hosts hand the plugin an unusable parent window on the very first
//! editor construction. Engine-side creation then returns null, which is an
//! expected outcome: the bridge parks in [`UiPhase::FailedOnce`] and retries
//! exactly once from the next idle tick. A second failure is terminal.
//!
//! Idle ticks never wait. Resize and teardown take the per-instance lock;
//! an idle tick that finds it held skips its work.

use crate::abi::EntryPoints;
use crate::handle::EngineHandle;
use parking_lot::Mutex;
use std::ffi::c_void;
use std::ptr::NonNull;

/// Host-side UI object the bridge is embedded in.
pub trait UiHost: Send {
    /// Native parent window handle (HWND, NSView*, X11 window id).
    fn parent_window(&self) -> usize;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn scale_factor(&self) -> f64;

    /// Updates the host-visible size metadata.
    fn size_changed(&mut self, width: u32, height: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiPhase {
    Unattached,
    Attached,
    /// First creation returned nothing; one retry pending.
    FailedOnce,
    /// Retry failed too. The UI stays non-functional for this instance.
    Failed,
}

/// What a call to [`UiBridge::idle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    /// Forwarded to the attached UI instance.
    Ticked,
    /// Spent on the one-shot creation retry; `true` if it attached.
    Retried(bool),
    /// Lock held by resize/teardown; nothing done.
    Busy,
    /// No UI instance and nothing left to try.
    Inactive,
}

/// One live engine UI instance. Released exactly once on drop.
struct UiInstance {
    raw: NonNull<c_void>,
    entry: EntryPoints,
    size: (u32, u32),
    scale_factor: f64,
}

// Only touched under the bridge's mutex.
unsafe impl Send for UiInstance {}

impl UiInstance {
    fn create(engine: &EngineHandle, host: &dyn UiHost) -> Option<Self> {
        let entry = *engine.entry();
        let size = (host.width(), host.height());
        let scale_factor = host.scale_factor();
        let raw = unsafe {
            (entry.plugin_ui_new)(
                host.parent_window(),
                engine.as_ptr(),
                size.0,
                size.1,
                scale_factor,
            )
        };
        NonNull::new(raw).map(|raw| Self {
            raw,
            entry,
            size,
            scale_factor,
        })
    }

    fn idle(&mut self) {
        unsafe { (self.entry.plugin_ui_idle)(self.raw.as_ptr()) };
    }

    fn set_size(&mut self, width: u32, height: u32, scale_factor: f64) {
        self.size = (width, height);
        self.scale_factor = scale_factor;
        unsafe { (self.entry.plugin_ui_set_size)(self.raw.as_ptr(), width, height, scale_factor) };
    }
}

impl Drop for UiInstance {
    fn drop(&mut self) {
        tracing::debug!("Releasing UI instance at {:p}", self.raw);
        unsafe { (self.entry.plugin_ui_drop)(self.raw.as_ptr()) };
    }
}

enum Attachment {
    Unattached,
    Attached(UiInstance),
    FailedOnce,
    Failed,
}

impl Attachment {
    fn phase(&self) -> UiPhase {
        match self {
            Attachment::Unattached => UiPhase::Unattached,
            Attachment::Attached(_) => UiPhase::Attached,
            Attachment::FailedOnce => UiPhase::FailedOnce,
            Attachment::Failed => UiPhase::Failed,
        }
    }
}

struct UiSlot<H> {
    host: H,
    attachment: Attachment,
}

impl<H: UiHost> UiSlot<H> {
    /// Drives one creation attempt from `Unattached` or `FailedOnce`.
    fn attach(&mut self, engine: &EngineHandle) -> bool {
        let next = match UiInstance::create(engine, &self.host) {
            Some(ui) => Attachment::Attached(ui),
            None => match self.attachment {
                Attachment::Unattached => {
                    tracing::debug!(
                        "UI creation returned no instance (parent {:#x}), retrying on next idle",
                        self.host.parent_window()
                    );
                    Attachment::FailedOnce
                }
                _ => {
                    tracing::warn!("UI creation failed again, editor disabled for this instance");
                    Attachment::Failed
                }
            },
        };
        self.attachment = next;
        matches!(self.attachment, Attachment::Attached(_))
    }
}

/// Zero-or-one engine UI bound to a host window.
///
/// Borrows the engine handle: the UI can never outlive, or free, the engine
/// instance it belongs to.
pub struct UiBridge<'e, H: UiHost> {
    engine: &'e EngineHandle,
    slot: Mutex<UiSlot<H>>,
}

impl<'e, H: UiHost> UiBridge<'e, H> {
    /// Attempts creation right away with the host's current window, size and
    /// scale factor.
    pub fn new(engine: &'e EngineHandle, host: H) -> Self {
        let mut slot = UiSlot {
            host,
            attachment: Attachment::Unattached,
        };
        slot.attach(engine);
        Self {
            engine,
            slot: Mutex::new(slot),
        }
    }

    pub fn phase(&self) -> UiPhase {
        self.slot.lock().attachment.phase()
    }

    /// Non-blocking periodic tick.
    pub fn idle(&self) -> IdleOutcome {
        let Some(mut slot) = self.slot.try_lock() else {
            return IdleOutcome::Busy;
        };
        if let Attachment::Attached(ui) = &mut slot.attachment {
            ui.idle();
            return IdleOutcome::Ticked;
        }
        if matches!(slot.attachment, Attachment::FailedOnce) {
            return IdleOutcome::Retried(slot.attach(self.engine));
        }
        IdleOutcome::Inactive
    }

    /// Updates host size metadata and forwards the new size with the current
    /// scale factor. May block briefly behind an idle tick.
    pub fn resize(&self, width: u32, height: u32) {
        let mut slot = self.slot.lock();
        slot.host.size_changed(width, height);
        let scale_factor = slot.host.scale_factor();
        if let Attachment::Attached(ui) = &mut slot.attachment {
            ui.set_size(width, height, scale_factor);
        }
    }

    /// Last size forwarded to the UI instance, if attached.
    pub fn size(&self) -> Option<(u32, u32)> {
        match &self.slot.lock().attachment {
            Attachment::Attached(ui) => Some(ui.size),
            _ => None,
        }
    }

    pub fn scale_factor(&self) -> Option<f64> {
        match &self.slot.lock().attachment {
            Attachment::Attached(ui) => Some(ui.scale_factor),
            _ => None,
        }
    }

    /// Releases the UI instance, if any. No retry follows.
    pub fn detach(&self) {
        let mut slot = self.slot.lock();
        if let Attachment::Attached(_) = slot.attachment {
            slot.attachment = Attachment::Unattached;
        }
    }

    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.slot.lock().host)
    }
}

impl<H: UiHost> Drop for UiBridge<'_, H> {
    fn drop(&mut self) {
        let slot = self.slot.get_mut();
        tracing::debug!("UI bridge torn down in phase {:?}", slot.attachment.phase());
        slot.attachment = Attachment::Unattached;
    }
}
