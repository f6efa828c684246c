//! Per-channel timing bookkeeping.
//!
//! Gaps are anchored to the previous *computed* release, not to when an
//! item arrived, so delivery jitter does not add up over a message. A
//! target that is already in the past fires immediately.

use crate::playback::types::PlaybackItem;
use tokio::time::Instant;

/// An item with its absolute start and release instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledItem {
    pub item: PlaybackItem,
    pub target_start: Instant,
    pub release_at: Instant,
}

/// Last release instant and the item in flight, if any.
#[derive(Debug, Clone, Default)]
pub struct ChannelTimeline {
    last_release: Option<Instant>,
    current: Option<ScheduledItem>,
}

impl ChannelTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start instant `item` would get at `now`.
    ///
    /// `now` for the first item on a fresh (or reset) channel, otherwise
    /// `max(now, last_release + gap_before)`.
    pub fn target_start(&self, item: &PlaybackItem, now: Instant) -> Instant {
        match self.last_release {
            None => now,
            Some(release) => (release + item.gap_duration()).max(now),
        }
    }

    /// Makes `item` the current item.
    ///
    /// # Panics
    /// If another item is still current. A channel plays one item at a time.
    pub fn begin(&mut self, item: PlaybackItem, now: Instant) -> ScheduledItem {
        assert!(
            self.current.is_none(),
            "channel already has an active item: {:?}",
            self.current
        );
        let target_start = self.target_start(&item, now);
        let scheduled = ScheduledItem {
            item,
            target_start,
            release_at: target_start + item.play_duration(),
        };
        self.current = Some(scheduled);
        scheduled
    }

    /// Releases the current item at its computed release instant.
    pub fn release(&mut self) -> Option<ScheduledItem> {
        let finished = self.current.take()?;
        self.last_release = Some(finished.release_at);
        Some(finished)
    }

    /// Forgets all history; the next item is treated as the first.
    pub fn reset(&mut self) {
        self.current = None;
        self.last_release = None;
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&ScheduledItem> {
        self.current.as_ref()
    }

    pub fn last_release(&self) -> Option<Instant> {
        self.last_release
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn first_item_starts_now() {
        let t0 = Instant::now();
        let mut timeline = ChannelTimeline::new();
        let scheduled = timeline.begin(PlaybackItem::new(50, 300), t0);
        assert_eq!(scheduled.target_start, t0);
        assert_eq!(scheduled.release_at, t0 + ms(50));
    }

    #[test]
    fn back_to_back_items_chain_on_release() {
        let t0 = Instant::now();
        let mut timeline = ChannelTimeline::new();
        let mut starts = Vec::new();
        let mut now = t0;
        for _ in 0..3 {
            let scheduled = timeline.begin(PlaybackItem::new(50, 0), now);
            starts.push(scheduled.target_start);
            now = scheduled.release_at;
            timeline.release();
        }
        assert_eq!(starts, vec![t0, t0 + ms(50), t0 + ms(100)]);
    }

    #[test]
    fn gap_is_anchored_to_previous_release() {
        let t0 = Instant::now();
        let mut timeline = ChannelTimeline::new();
        timeline.begin(PlaybackItem::new(60, 0), t0);
        timeline.release();

        // Arrives 20 ms after the release, asks for a 60 ms gap.
        let scheduled = timeline.begin(PlaybackItem::new(60, 60), t0 + ms(80));
        assert_eq!(scheduled.target_start, t0 + ms(120));
    }

    #[test]
    fn late_item_fires_immediately() {
        let t0 = Instant::now();
        let mut timeline = ChannelTimeline::new();
        timeline.begin(PlaybackItem::new(60, 0), t0);
        timeline.release();

        let late = t0 + ms(500);
        let scheduled = timeline.begin(PlaybackItem::new(60, 60), late);
        assert_eq!(scheduled.target_start, late);
    }

    #[test]
    fn reset_restores_first_item_rule() {
        let t0 = Instant::now();
        let mut timeline = ChannelTimeline::new();
        timeline.begin(PlaybackItem::new(1000, 0), t0);
        timeline.reset();
        assert!(!timeline.is_active());
        assert_eq!(timeline.last_release(), None);

        let scheduled = timeline.begin(PlaybackItem::new(60, 500), t0 + ms(10));
        assert_eq!(scheduled.target_start, t0 + ms(10));
    }

    #[test]
    fn release_without_current_is_none() {
        let mut timeline = ChannelTimeline::new();
        assert!(timeline.release().is_none());
        assert_eq!(timeline.last_release(), None);
    }

    #[test]
    #[should_panic(expected = "already has an active item")]
    fn second_concurrent_item_panics() {
        let t0 = Instant::now();
        let mut timeline = ChannelTimeline::new();
        timeline.begin(PlaybackItem::new(60, 0), t0);
        timeline.begin(PlaybackItem::new(60, 0), t0);
    }
}
