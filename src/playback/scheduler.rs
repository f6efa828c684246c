//! Per-channel playback scheduler.
//!
//! Each channel runs as its own tokio task fed by an unbounded queue, so
//! items on one channel are handled strictly in order by a single
//! consumer. The task parks on absolute instants computed by
//! [`ChannelTimeline`] and never on relative delays.

use crate::defaults;
use crate::error::{MorseError, Result};
use crate::playback::error::{ErrorReporter, LogReporter, SinkError};
use crate::playback::sink::{ChannelSinks, EmissionMode, Emitter, Pulse, SharedEmitter, SinkKind};
use crate::playback::timeline::{ChannelTimeline, ScheduledItem};
use crate::playback::types::{ChannelId, PlaybackItem};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Channel layout and visual timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub channel_count: u8,
    pub main_channel: ChannelId,
    pub visual_frame_ms: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            channel_count: defaults::CHANNEL_COUNT,
            main_channel: defaults::MAIN_CHANNEL,
            visual_frame_ms: defaults::VISUAL_FRAME_MS,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channel_count == 0 {
            return Err(MorseError::ConfigInvalidValue {
                key: "playback.channel_count".to_string(),
                message: "at least one channel is required".to_string(),
            });
        }
        if self.main_channel >= self.channel_count {
            return Err(MorseError::ConfigInvalidValue {
                key: "playback.main_channel".to_string(),
                message: format!(
                    "main channel {} is outside 0..{}",
                    self.main_channel, self.channel_count
                ),
            });
        }
        if self.visual_frame_ms == 0 {
            return Err(MorseError::ConfigInvalidValue {
                key: "playback.visual_frame_ms".to_string(),
                message: "frame interval must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Status updates a channel publishes for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    Started {
        channel: ChannelId,
        item: PlaybackItem,
        target_start: Instant,
    },
    Released {
        channel: ChannelId,
        at: Instant,
    },
    /// The queue ran dry.
    Idle { channel: ChannelId },
    /// A stop cleared the queue and cut the current item.
    Stopped { channel: ChannelId },
}

#[derive(Debug, Clone, Copy)]
enum ChannelCommand {
    Play(PlaybackItem),
    StopAll,
}

enum Wait {
    Elapsed,
    Stopped,
}

struct BoundSink {
    kind: SinkKind,
    name: String,
    emitter: SharedEmitter,
    mode: EmissionMode,
    /// Switched on for the current item.
    engaged: bool,
}

impl BoundSink {
    fn bind(kind: SinkKind, emitter: &SharedEmitter) -> Self {
        let (name, mode) = match emitter.lock() {
            Ok(e) if e.supports_timed() => (e.name().to_string(), EmissionMode::Timed),
            Ok(e) => (e.name().to_string(), EmissionMode::Toggle),
            Err(_) => (format!("{:?}", kind).to_lowercase(), EmissionMode::Toggle),
        };
        Self {
            kind,
            name,
            emitter: SharedEmitter::clone(emitter),
            mode,
            engaged: false,
        }
    }

    fn call(
        &self,
        f: impl FnOnce(&mut dyn Emitter) -> std::result::Result<(), SinkError>,
    ) -> std::result::Result<(), SinkError> {
        let mut emitter = self
            .emitter
            .lock()
            .map_err(|_| SinkError::new(&self.name, "emitter lock poisoned"))?;
        f(&mut *emitter)
    }
}

/// Schedules one channel's items onto its sinks.
pub struct ChannelScheduler {
    id: ChannelId,
    timeline: ChannelTimeline,
    pending: VecDeque<PlaybackItem>,
    sinks: Vec<BoundSink>,
    frame_ms: u32,
    events: Option<crossbeam_channel::Sender<ChannelEvent>>,
    reporter: Arc<dyn ErrorReporter>,
    closed: bool,
}

impl ChannelScheduler {
    /// Binds the sinks, deciding each one's emission mode.
    pub fn new(id: ChannelId, sinks: &ChannelSinks, visual_frame_ms: u32) -> Self {
        let sinks = sinks
            .iter()
            .map(|(kind, emitter)| BoundSink::bind(kind, emitter))
            .collect();
        Self {
            id,
            timeline: ChannelTimeline::new(),
            pending: VecDeque::new(),
            sinks,
            frame_ms: visual_frame_ms.max(1),
            events: None,
            reporter: Arc::new(LogReporter),
            closed: false,
        }
    }

    pub fn with_events(mut self, events: crossbeam_channel::Sender<ChannelEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Emission mode chosen for a sink, if the channel has one of that kind.
    pub fn mode_of(&self, kind: SinkKind) -> Option<EmissionMode> {
        self.sinks.iter().find(|s| s.kind == kind).map(|s| s.mode)
    }

    /// Starts the channel task on `runtime`.
    pub fn spawn(self, runtime: &tokio::runtime::Handle) -> ChannelHandle {
        let (commands, rx) = unbounded_channel();
        let id = self.id;
        let task = runtime.spawn(self.run(rx));
        ChannelHandle { id, commands, task }
    }

    async fn run(mut self, mut commands: UnboundedReceiver<ChannelCommand>) {
        log::debug!(
            "channel {} scheduler started with {} sink(s)",
            self.id,
            self.sinks.len()
        );
        while let Some(command) = commands.recv().await {
            match command {
                ChannelCommand::Play(item) => self.pending.push_back(item),
                ChannelCommand::StopAll => self.stop(),
            }
            self.drain(&mut commands).await;
            if self.closed {
                break;
            }
        }
        log::debug!("channel {} scheduler finished", self.id);
    }

    /// Plays queued items back to back until the queue is empty.
    async fn drain(&mut self, commands: &mut UnboundedReceiver<ChannelCommand>) {
        if self.pending.is_empty() {
            return;
        }
        while let Some(item) = self.pending.pop_front() {
            let scheduled = self.timeline.begin(item, Instant::now());
            log::debug!(
                "channel {} play {} ms after {} ms gap",
                self.id,
                item.play_ms,
                item.gap_before_ms
            );

            if let Wait::Stopped = self.wait_until(scheduled.target_start, commands).await {
                self.stop();
                continue;
            }
            self.start(&scheduled);

            if let Wait::Stopped = self.wait_until(scheduled.release_at, commands).await {
                self.stop();
                continue;
            }
            self.release();
        }
        self.notify(ChannelEvent::Idle { channel: self.id });
    }

    /// Sleeps until `deadline`, queueing items that arrive meanwhile.
    async fn wait_until(
        &mut self,
        deadline: Instant,
        commands: &mut UnboundedReceiver<ChannelCommand>,
    ) -> Wait {
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);
        loop {
            if self.closed {
                (&mut sleep).await;
                return Wait::Elapsed;
            }
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(ChannelCommand::Play(item)) => self.pending.push_back(item),
                    Some(ChannelCommand::StopAll) => return Wait::Stopped,
                    // Queued items still play out.
                    None => self.closed = true,
                },
                _ = &mut sleep => return Wait::Elapsed,
            }
        }
    }

    fn start(&mut self, scheduled: &ScheduledItem) {
        let item = scheduled.item;
        let pulse = Pulse::new(item.play_ms, self.frame_ms);
        let channel = self.id;

        for sink in self.sinks.iter_mut() {
            if sink.kind == SinkKind::Audio && !item.emit_audio {
                continue;
            }
            let result = match sink.mode {
                EmissionMode::Timed => sink.call(|e| e.emit_timed(channel, pulse)),
                EmissionMode::Toggle => sink.call(|e| e.set_active(channel, true)),
            };
            match result {
                Ok(()) => sink.engaged = true,
                Err(e) => self.reporter.report(channel, &e),
            }
        }

        self.notify(ChannelEvent::Started {
            channel,
            item,
            target_start: scheduled.target_start,
        });
    }

    fn release(&mut self) {
        self.switch_off(|mode| mode == EmissionMode::Toggle);
        if let Some(finished) = self.timeline.release() {
            self.notify(ChannelEvent::Released {
                channel: self.id,
                at: finished.release_at,
            });
        }
    }

    /// Clears the queue and cuts the current item. The next item is
    /// treated as the first on a fresh channel.
    fn stop(&mut self) {
        let dropped = self.pending.len();
        self.pending.clear();
        self.switch_off(|_| true);
        self.timeline.reset();
        log::debug!("channel {} stopped, {} queued item(s) dropped", self.id, dropped);
        self.notify(ChannelEvent::Stopped { channel: self.id });
    }

    /// Switches off engaged sinks whose mode matches.
    fn switch_off(&mut self, matches: impl Fn(EmissionMode) -> bool) {
        let channel = self.id;
        for sink in self.sinks.iter_mut().filter(|s| s.engaged) {
            sink.engaged = false;
            if !matches(sink.mode) {
                continue;
            }
            if let Err(e) = sink.call(|e| e.set_active(channel, false)) {
                self.reporter.report(channel, &e);
            }
        }
    }

    fn notify(&self, event: ChannelEvent) {
        if let Some(events) = &self.events {
            events.try_send(event).ok();
        }
    }
}

/// Sending side of a running channel task.
pub struct ChannelHandle {
    id: ChannelId,
    commands: UnboundedSender<ChannelCommand>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Queues an item.
    pub fn play(&self, item: PlaybackItem) -> Result<()> {
        self.send(ChannelCommand::Play(item))
    }

    /// Clears the queue and cuts the current item.
    pub fn stop(&self) -> Result<()> {
        self.send(ChannelCommand::StopAll)
    }

    fn send(&self, command: ChannelCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| MorseError::ChannelClosed {
                channel_id: self.id,
            })
    }

    #[cfg(test)]
    pub(crate) fn abort(&self) {
        self.task.abort();
    }

    /// Closes the queue, lets queued items finish and waits for the task.
    pub async fn join(self) {
        let ChannelHandle { id, commands, task } = self;
        drop(commands);
        if let Err(e) = task.await {
            log::error!("channel {} task failed: {}", id, e);
        }
    }
}
