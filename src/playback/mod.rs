//! Multi-channel, drift-free playback of keyed timing.
//!
//! Timing messages are routed by [`ChannelRegistry`] to one
//! [`ChannelScheduler`] per channel, which turns `(press, gap)` items into
//! start and release events on audio, visual and lamp sinks.

pub mod error;
pub mod message;
pub mod registry;
pub mod scheduler;
pub mod sink;
pub mod timeline;
pub mod types;

pub use error::{ErrorReporter, LogReporter, SinkError};
pub use message::TimingMessage;
pub use registry::{ChannelRegistry, ChannelRegistryBuilder};
pub use scheduler::{ChannelEvent, ChannelHandle, ChannelScheduler, SchedulerConfig};
pub use sink::{
    ChannelSinks, EmissionMode, Emitter, EmitterAction, EmitterCall, LogEmitter, Pulse,
    RecordingEmitter, SharedEmitter, SinkKind, ToneEmitter, shared_emitter,
};
pub use timeline::{ChannelTimeline, ScheduledItem};
pub use types::{ChannelId, PlaybackItem};
