//! Dot/dash classification of keyed durations.

pub mod adaptive;
pub mod assembler;
pub mod stats;

pub use adaptive::{
    AdaptiveClassifier, Classification, ClassifierConfig, ClassifierMetrics, ClassifierSnapshot,
    SpeedProfile,
};
pub use assembler::{AssembledOutput, ReceiveAssembler};
