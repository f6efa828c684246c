//! Buffer playback with progress reporting.
//!
//! A worker thread starts the buffer on the output, polls how far it got
//! and sends [`PlaybackEvent`]s over a crossbeam channel. Consumers poll
//! the receiver; nothing is called back from the worker.

use crate::audio::buffer::StereoBuffer;
use crate::audio::output::{PlaybackId, SharedOutput, frames_to_duration};
use crate::defaults;
use crate::error::{MorseError, Result};
use crossbeam_channel::{Receiver, Sender, select, unbounded};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Time past a buffer's own length after which a playback that made no
/// further progress counts as stalled.
const STALL_SLACK: Duration = Duration::from_secs(1);

/// Progress notifications for one playback.
///
/// `Progress` values never decrease. Exactly one of `Finished` or
/// `Stopped` ends the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started { frames: usize },
    Progress(u8),
    Finished,
    Stopped,
}

impl PlaybackEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackEvent::Finished | PlaybackEvent::Stopped)
    }
}

/// Plays buffers on a shared output.
#[derive(Clone)]
pub struct Player {
    output: SharedOutput,
    interval: Duration,
}

impl Player {
    pub fn new(output: SharedOutput) -> Self {
        Self {
            output,
            interval: Duration::from_millis(defaults::PROGRESS_INTERVAL_MS),
        }
    }

    /// Sets the progress tick interval, capped at 100 ms.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.min(Duration::from_millis(100));
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts playing `buffer` on a worker thread.
    pub fn play(&self, buffer: StereoBuffer) -> Result<PlaybackHandle> {
        let (event_tx, event_rx) = unbounded();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let output = SharedOutput::clone(&self.output);
        let interval = self.interval;

        let thread = std::thread::Builder::new()
            .name("morselink-player".to_string())
            .spawn(move || run_playback(output, buffer, interval, event_tx, stop_rx))
            .map_err(|e| MorseError::AudioOutput {
                message: format!("Failed to spawn player thread: {}", e),
            })?;

        Ok(PlaybackHandle {
            events: event_rx,
            stop_tx,
            thread: Some(thread),
        })
    }
}

fn run_playback(
    output: SharedOutput,
    buffer: StereoBuffer,
    interval: Duration,
    events: Sender<PlaybackEvent>,
    stop_rx: Receiver<()>,
) {
    let total = buffer.frames() as u64;
    // Send errors mean the handle is gone; playback still runs to its end.
    let send = |event| {
        events.send(event).ok();
    };

    let started = match output.lock() {
        Ok(mut out) => out.play_buffer(&buffer),
        Err(_) => Err(MorseError::AudioOutput {
            message: "audio output lock poisoned".to_string(),
        }),
    };
    let id = match started {
        Ok(id) => id,
        Err(e) => {
            log::warn!("playback failed to start: {}", e);
            send(PlaybackEvent::Stopped);
            return;
        }
    };
    let deadline = Instant::now() + buffer.duration() + STALL_SLACK;

    send(PlaybackEvent::Started {
        frames: buffer.frames(),
    });
    log::debug!(
        "playing {} frames ({:?})",
        total,
        frames_to_duration(total, buffer.sample_rate())
    );

    if total == 0 {
        send(PlaybackEvent::Progress(100));
        send(PlaybackEvent::Finished);
        return;
    }

    let mut last_percent = 0u8;
    loop {
        select! {
            recv(stop_rx) -> _ => {
                stop_if_current(&output, id);
                send(PlaybackEvent::Stopped);
                return;
            }
            default(interval) => {
                let played = output.lock().ok().and_then(|out| out.frames_played(id));
                let Some(played) = played else {
                    log::debug!("buffer {:?} was stopped or replaced on the output", id);
                    send(PlaybackEvent::Stopped);
                    return;
                };
                let percent = ((played.min(total) * 100) / total) as u8;
                last_percent = last_percent.max(percent);
                send(PlaybackEvent::Progress(last_percent));
                if played >= total {
                    send(PlaybackEvent::Finished);
                    return;
                }
                if Instant::now() >= deadline {
                    log::warn!("playback stalled at {}/{} frames, giving up", played, total);
                    stop_if_current(&output, id);
                    send(PlaybackEvent::Stopped);
                    return;
                }
            }
        }
    }
}

/// Stops the output's buffer unless another playback has taken it over.
fn stop_if_current(output: &SharedOutput, id: PlaybackId) {
    let Ok(mut out) = output.lock() else {
        return;
    };
    if out.frames_played(id).is_some()
        && let Err(e) = out.stop_buffer()
    {
        log::warn!("failed to stop playback: {}", e);
    }
}

/// Handle to a running playback. Dropping it stops playback.
pub struct PlaybackHandle {
    events: Receiver<PlaybackEvent>,
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackHandle {
    pub fn events(&self) -> &Receiver<PlaybackEvent> {
        &self.events
    }

    /// Requests a stop. A no-op once playback has ended.
    pub fn stop(&self) {
        self.stop_tx.try_send(()).ok();
    }

    /// Blocks until playback ends and returns every event it produced.
    pub fn wait(mut self) -> Vec<PlaybackEvent> {
        let mut collected = Vec::new();
        for event in self.events.iter() {
            let terminal = event.is_terminal();
            collected.push(event);
            if terminal {
                break;
            }
        }
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            log::error!("player thread panicked");
        }
        collected
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            thread.join().ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::{VirtualOutput, shared};
    use std::sync::{Arc, Mutex};

    fn player() -> Player {
        Player::new(shared(VirtualOutput::new(48000))).with_interval(Duration::from_millis(10))
    }

    fn assert_well_formed(events: &[PlaybackEvent]) {
        assert!(matches!(events.first(), Some(PlaybackEvent::Started { .. })));
        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1, "{events:?}");
        assert!(events.last().is_some_and(PlaybackEvent::is_terminal));

        let percents: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
        assert!(percents.iter().all(|&p| p <= 100));
    }

    #[test]
    fn plays_to_completion() {
        let handle = player().play(StereoBuffer::silent(4800, 48000)).unwrap();
        let events = handle.wait();
        assert_well_formed(&events);
        assert_eq!(events.last(), Some(&PlaybackEvent::Finished));
        assert!(events.contains(&PlaybackEvent::Progress(100)));
    }

    #[test]
    fn empty_buffer_finishes_immediately() {
        let events = player().play(StereoBuffer::new(48000)).unwrap().wait();
        assert_eq!(
            events,
            vec![
                PlaybackEvent::Started { frames: 0 },
                PlaybackEvent::Progress(100),
                PlaybackEvent::Finished
            ]
        );
    }

    #[test]
    fn stop_replaces_finished() {
        let handle = player().play(StereoBuffer::silent(480_000, 48000)).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        handle.stop();
        let events = handle.wait();
        assert_well_formed(&events);
        assert_eq!(events.last(), Some(&PlaybackEvent::Stopped));
        assert!(!events.contains(&PlaybackEvent::Finished));
    }

    #[test]
    fn failing_output_reports_stopped() {
        let player = Player::new(shared(VirtualOutput::failing(48000)));
        let events = player.play(StereoBuffer::silent(10, 48000)).unwrap().wait();
        assert_eq!(events, vec![PlaybackEvent::Stopped]);
    }

    #[test]
    fn external_stop_on_shared_output_reports_stopped() {
        let output = shared(VirtualOutput::new(48000));
        let player = Player::new(SharedOutput::clone(&output))
            .with_interval(Duration::from_millis(10));

        let handle = player.play(StereoBuffer::silent(48000, 48000)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        output.lock().unwrap().stop_buffer().unwrap();

        let events = handle.wait();
        assert_well_formed(&events);
        assert_eq!(events.last(), Some(&PlaybackEvent::Stopped));
    }

    #[test]
    fn replaced_buffer_ends_first_playback() {
        let first = player();
        let second = first.clone();

        let long = first.play(StereoBuffer::silent(24000, 48000)).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        let short = second.play(StereoBuffer::silent(480, 48000)).unwrap();

        let short_events = short.wait();
        assert_eq!(short_events.last(), Some(&PlaybackEvent::Finished));

        let long_events = long.wait();
        assert_well_formed(&long_events);
        assert_eq!(long_events.last(), Some(&PlaybackEvent::Stopped));
    }

    #[test]
    fn stopping_replaced_playback_leaves_new_buffer_alone() {
        let output = Arc::new(Mutex::new(VirtualOutput::new(48000)));
        let player = Player::new(output.clone()).with_interval(Duration::from_millis(10));

        let first = player.play(StereoBuffer::silent(48000, 48000)).unwrap();
        let second = player.play(StereoBuffer::silent(48000, 48000)).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        first.stop();
        assert_eq!(first.wait().last(), Some(&PlaybackEvent::Stopped));

        assert!(output.lock().unwrap().is_playing());
        second.stop();
        assert_eq!(second.wait().last(), Some(&PlaybackEvent::Stopped));
    }

    #[test]
    fn stalled_output_gives_up_after_deadline() {
        // A zero-rate output never consumes a frame.
        let player = Player::new(shared(VirtualOutput::new(0)))
            .with_interval(Duration::from_millis(10));
        let started = Instant::now();

        let events = player.play(StereoBuffer::silent(480, 48000)).unwrap().wait();

        assert_well_formed(&events);
        assert_eq!(events.last(), Some(&PlaybackEvent::Stopped));
        let elapsed = started.elapsed();
        assert!(elapsed >= STALL_SLACK, "{elapsed:?}");
        assert!(elapsed < STALL_SLACK * 3, "{elapsed:?}");
    }

    #[test]
    fn interval_is_capped() {
        let player = player().with_interval(Duration::from_secs(1));
        assert_eq!(player.interval, Duration::from_millis(100));
    }
}
