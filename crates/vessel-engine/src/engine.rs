//! Engine instance state and audio processing.

use crate::error::Result;
use crate::ui::UiNotification;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Notifications queued for the UI before the audio thread starts dropping.
const NOTIFICATION_CAPACITY: usize = 64;

pub const MAX_GAIN: f32 = 4.0;

/// Everything persisted through `get_state` / `set_state`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineParams {
    /// Linear output gain, `0.0..=MAX_GAIN`.
    pub gain: f32,
    pub bypass: bool,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            bypass: false,
        }
    }
}

impl EngineParams {
    /// Hosts store state as text, so the bincode payload is base64 encoded.
    pub fn encode(&self) -> Result<String> {
        let payload = bincode::serialize(self)?;
        Ok(BASE64.encode(payload))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let payload = BASE64.decode(encoded)?;
        let params: Self = bincode::deserialize(&payload)?;
        Ok(params.sanitized())
    }

    fn sanitized(mut self) -> Self {
        self.gain = if self.gain.is_finite() {
            self.gain.clamp(0.0, MAX_GAIN)
        } else {
            Self::default().gain
        };
        self
    }

    fn effective_gain(&self) -> f32 {
        if self.bypass {
            1.0
        } else {
            self.gain
        }
    }
}

/// Transport tracking shared with the UI.
#[derive(Debug, Default)]
pub struct EngineCore {
    notification_sender: Option<Sender<UiNotification>>,
    prev_position: i64,
    prev_playing: bool,
    /// Seconds, never negative.
    pub current_position: f32,
    pub position_updated: bool,
}

impl EngineCore {
    fn track_transport(&mut self, sample_rate: f32, playing: bool, position: i64) {
        if self.prev_position != position {
            self.prev_position = position;
            self.current_position = if sample_rate > 0.0 {
                (position as f32 / sample_rate).max(0.0)
            } else {
                0.0
            };
            self.position_updated = true;
        }

        if self.prev_playing != playing {
            self.prev_playing = playing;
            self.notify(UiNotification::PlayingChanged(playing));
        }
    }

    fn notify(&mut self, notification: UiNotification) {
        // A full or disconnected channel only loses the notification. The
        // sender is released by the UI on teardown, off the audio thread.
        if let Some(sender) = &self.notification_sender {
            let _ = sender.try_send(notification);
        }
    }

    /// Removes `sender`'s channel if it is still the installed one. The
    /// returned sender should be dropped outside the lock.
    pub(crate) fn detach_ui(
        &mut self,
        sender: &Sender<UiNotification>,
    ) -> Option<Sender<UiNotification>> {
        match &self.notification_sender {
            Some(installed) if installed.same_channel(sender) => self.notification_sender.take(),
            _ => None,
        }
    }

    pub fn has_ui(&self) -> bool {
        self.notification_sender.is_some()
    }
}

/// One output channel and the audio it is rendered from.
#[derive(Debug)]
pub enum ChannelIo<'a> {
    /// Separate buffers. No input renders silence.
    Split {
        input: Option<&'a [f32]>,
        output: &'a mut [f32],
    },
    /// The host passed one buffer as both input and output.
    InPlace(&'a mut [f32]),
}

impl ChannelIo<'_> {
    fn silence(self) {
        match self {
            ChannelIo::Split { output, .. } => output.fill(0.0),
            ChannelIo::InPlace(buffer) => buffer.fill(0.0),
        }
    }

    /// Writes every output sample exactly once.
    fn render(self, gain: f32) {
        match self {
            ChannelIo::Split {
                input: Some(input),
                output,
            } => {
                let len = input.len().min(output.len());
                let (rendered, rest) = output.split_at_mut(len);
                for (out, &sample) in rendered.iter_mut().zip(input) {
                    *out = apply_gain(sample, gain);
                }
                rest.fill(0.0);
            }
            ChannelIo::Split {
                input: None,
                output,
            } => output.fill(0.0),
            ChannelIo::InPlace(buffer) => {
                for sample in buffer.iter_mut() {
                    *sample = apply_gain(*sample, gain);
                }
            }
        }
    }
}

fn apply_gain(sample: f32, gain: f32) -> f32 {
    let value = sample * gain;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[derive(Debug, Default)]
pub struct Engine {
    core: Arc<Mutex<EngineCore>>,
    params: Arc<RwLock<EngineParams>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn core(&self) -> &Arc<Mutex<EngineCore>> {
        &self.core
    }

    pub fn params(&self) -> EngineParams {
        *self.params.read()
    }

    /// Processes one block from separate input and output buffers. Outputs
    /// without a matching input are silent.
    pub fn run(
        &self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        sample_rate: f32,
        playing: bool,
        position: i64,
    ) {
        let channels = outputs
            .iter_mut()
            .enumerate()
            .map(|(ch, output)| ChannelIo::Split {
                input: inputs.get(ch).copied(),
                output: &mut **output,
            });
        self.process(channels, sample_rate, playing, position);
    }

    /// Processes one block channel by channel. A block that cannot take the
    /// engine locks comes out silent.
    pub fn process<'a>(
        &self,
        channels: impl IntoIterator<Item = ChannelIo<'a>>,
        sample_rate: f32,
        playing: bool,
        position: i64,
    ) {
        let locked = self
            .core
            .try_lock()
            .and_then(|core| self.params.try_read().map(|params| (core, *params)));
        let Some((mut core, params)) = locked else {
            for channel in channels {
                channel.silence();
            }
            return;
        };

        core.track_transport(sample_rate, playing, position);

        let gain = params.effective_gain();
        for channel in channels {
            channel.render(gain);
        }
    }

    pub fn get_state(&self) -> Result<String> {
        self.params().encode()
    }

    /// Empty state keeps the current parameters. Invalid state is logged and
    /// leaves them untouched.
    pub fn set_state(&self, encoded: &str) {
        if encoded.is_empty() {
            return;
        }
        match EngineParams::decode(encoded) {
            Ok(params) => *self.params.write() = params,
            Err(e) => tracing::warn!("Ignoring invalid engine state: {}", e),
        }
    }

    /// Routes transport notifications to a newly created UI, replacing any
    /// previous channel. The UI keeps the sender to detach on teardown.
    pub fn attach_ui(&self) -> (Sender<UiNotification>, Receiver<UiNotification>) {
        let (sender, receiver) = crossbeam_channel::bounded(NOTIFICATION_CAPACITY);
        let previous = self
            .core
            .lock()
            .notification_sender
            .replace(sender.clone());
        drop(previous);
        (sender, receiver)
    }
}
