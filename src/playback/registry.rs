//! Fixed set of channels with routing by channel id.

use crate::error::{MorseError, Result};
use crate::playback::error::{ErrorReporter, LogReporter};
use crate::playback::message::TimingMessage;
use crate::playback::scheduler::{ChannelEvent, ChannelHandle, ChannelScheduler, SchedulerConfig};
use crate::playback::sink::ChannelSinks;
use crate::playback::types::{ChannelId, PlaybackItem};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builder for [`ChannelRegistry`].
pub struct ChannelRegistryBuilder {
    config: SchedulerConfig,
    main_sinks: ChannelSinks,
    side_sinks: ChannelSinks,
    events: Option<crossbeam_channel::Sender<ChannelEvent>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl ChannelRegistryBuilder {
    /// Sinks for the main channel.
    pub fn main_sinks(mut self, sinks: ChannelSinks) -> Self {
        self.main_sinks = sinks;
        self
    }

    /// Sinks shared by every other channel.
    pub fn side_sinks(mut self, sinks: ChannelSinks) -> Self {
        self.side_sinks = sinks;
        self
    }

    /// Channel events from every channel go to `events`.
    pub fn events(mut self, events: crossbeam_channel::Sender<ChannelEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Spawns one task per channel on the current tokio runtime.
    pub fn start(self) -> Result<ChannelRegistry> {
        self.config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            MorseError::Other(format!("channel registry needs a tokio runtime: {}", e))
        })?;

        let mut channels = BTreeMap::new();
        for id in 0..self.config.channel_count {
            let sinks = if id == self.config.main_channel {
                &self.main_sinks
            } else {
                &self.side_sinks
            };
            let mut scheduler = ChannelScheduler::new(id, sinks, self.config.visual_frame_ms)
                .with_reporter(Arc::clone(&self.reporter));
            if let Some(events) = &self.events {
                scheduler = scheduler.with_events(events.clone());
            }
            channels.insert(id, scheduler.spawn(&runtime));
        }

        log::info!(
            "started {} playback channel(s), main channel {}",
            self.config.channel_count,
            self.config.main_channel
        );

        Ok(ChannelRegistry {
            channels,
            main_channel: self.config.main_channel,
        })
    }
}

/// Owns the channel schedulers and routes items to them.
pub struct ChannelRegistry {
    channels: BTreeMap<ChannelId, ChannelHandle>,
    main_channel: ChannelId,
}

impl ChannelRegistry {
    pub fn builder(config: SchedulerConfig) -> ChannelRegistryBuilder {
        ChannelRegistryBuilder {
            config,
            main_sinks: ChannelSinks::default(),
            side_sinks: ChannelSinks::default(),
            events: None,
            reporter: Arc::new(LogReporter),
        }
    }

    /// Starts the channels with the given sink sets and default reporting.
    pub fn new(
        config: SchedulerConfig,
        main_sinks: ChannelSinks,
        side_sinks: ChannelSinks,
    ) -> Result<Self> {
        Self::builder(config)
            .main_sinks(main_sinks)
            .side_sinks(side_sinks)
            .start()
    }

    /// Queues `item` on a channel. Unknown ids are rejected.
    pub fn receive(&self, channel_id: i64, item: PlaybackItem) -> Result<()> {
        self.channel(channel_id)?.play(item)
    }

    /// Queues a decoded timing message, clamping its durations.
    pub fn receive_message(&self, message: &TimingMessage) -> Result<()> {
        self.receive(message.channel_id, message.to_item())
    }

    /// Parses and queues one JSON timing message. Messages without a
    /// channel go to the main channel.
    pub fn receive_json(&self, json: &str) -> Result<()> {
        let message = TimingMessage::parse(json, self.main_channel)?;
        self.receive_message(&message)
    }

    fn channel(&self, channel_id: i64) -> Result<&ChannelHandle> {
        ChannelId::try_from(channel_id)
            .ok()
            .and_then(|id| self.channels.get(&id))
            .ok_or_else(|| {
                log::warn!("dropping item for unknown channel {}", channel_id);
                MorseError::UnknownChannel { channel_id }
            })
    }

    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.channels.keys().copied().collect()
    }

    pub fn main_channel(&self) -> ChannelId {
        self.main_channel
    }

    /// Clears every queue and cuts every current item.
    ///
    /// Every channel is asked to stop even if some have ended; the first
    /// failure is returned afterwards.
    pub fn stop_all(&self) -> Result<()> {
        let mut first_error = None;
        for handle in self.channels.values() {
            if let Err(e) = handle.stop() {
                log::warn!("could not stop channel {}: {}", handle.id(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Stops accepting items, lets queued items play out and waits for
    /// every channel task to end.
    pub async fn shutdown(self) {
        for (_, handle) in self.channels {
            handle.join().await;
        }
        log::info!("playback channels shut down");
    }
}
