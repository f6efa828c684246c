//! Adaptive dot/dash classifier.
//!
//! Classifies key-down durations without assuming a fixed speed. The dot
//! length is re-estimated from a rolling window of recent samples, and the
//! dash threshold follows it with inertia. Outliers are clamped with a
//! median/MAD filter before they reach the window.

use crate::classifier::stats::{
    Normal, mean, median, median_absolute_deviation, recency_weighted_mean, std_dev,
};
use crate::codec::MorseSymbol;
use crate::defaults;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Samples required before the estimates start adapting.
const WARM_UP_SAMPLES: usize = 10;
/// Samples required before outlier filtering kicks in.
const OUTLIER_MIN_SAMPLES: usize = 5;
/// Distance from the median (in MADs) beyond which a sample is an outlier.
const OUTLIER_MAD_LIMIT: f64 = 3.0;
/// Outliers are clamped to the median plus or minus this many MADs.
const OUTLIER_CLAMP_MADS: f64 = 2.0;
/// Share of the previous dot estimate kept on every adaptation step.
const DOT_INERTIA: f64 = 0.7;
/// Dash to dot length ratio.
const DASH_RATIO: f64 = 3.0;
/// Weight of the ratio-derived dash length in the threshold update.
const DASH_BLEND_NEW: f64 = 0.6;
/// Weight of the previous dash threshold in the threshold update.
const DASH_BLEND_OLD: f64 = 0.4;
/// Durations below this many dot lengths classify as a dot.
const DOT_DASH_BOUNDARY: f64 = 2.5;
/// Spread of the dot likelihood, relative to its mean.
const DOT_SPREAD: f64 = 0.3;
/// Spread of the dash likelihood, relative to its mean.
const DASH_SPREAD: f64 = 0.2;
/// Samples required before the accuracy estimate is reported.
const ACCURACY_MIN_SAMPLES: usize = 20;
/// Cap on each group's coefficient of variation in the accuracy estimate.
const CONSISTENCY_CAP: f64 = 0.5;
/// Floor on the dot estimate so it stays strictly positive.
const MIN_DOT_MS: f64 = 1.0;

/// Classifier settings, read at construction and on reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Starting speed in WPM.
    pub initial_wpm: f64,
    /// Capacity of the rolling history window.
    pub learning_window: usize,
    /// Learning-rate sensitivity, clamped to [0.1, 0.9].
    pub sensitivity: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            initial_wpm: defaults::INITIAL_WPM,
            learning_window: defaults::LEARNING_WINDOW,
            sensitivity: defaults::SENSITIVITY,
        }
    }
}

impl ClassifierConfig {
    /// Brings out-of-range values back to something usable.
    fn normalized(mut self) -> Self {
        if !self.initial_wpm.is_finite() || self.initial_wpm <= 0.0 {
            log::warn!(
                "invalid initial WPM {}, using {}",
                self.initial_wpm,
                defaults::INITIAL_WPM
            );
            self.initial_wpm = defaults::INITIAL_WPM;
        }
        self.learning_window = self.learning_window.max(1);
        self.sensitivity = if self.sensitivity.is_nan() {
            defaults::SENSITIVITY
        } else {
            self.sensitivity
                .clamp(defaults::MIN_SENSITIVITY, defaults::MAX_SENSITIVITY)
        };
        self
    }
}

/// Outcome of classifying one duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Always [`MorseSymbol::Dot`] or [`MorseSymbol::Dash`].
    pub symbol: MorseSymbol,
    /// Likelihood share of the winning class, in [0, 1].
    pub confidence: f64,
    /// The duration after outlier filtering.
    pub duration_ms: f64,
}

/// Observed operator speed in WPM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedProfile {
    pub current: f64,
    pub min: f64,
    pub max: f64,
}

impl SpeedProfile {
    fn starting_at(wpm: f64) -> Self {
        Self {
            current: wpm,
            min: wpm * 0.5,
            max: wpm * 2.0,
        }
    }
}

/// Diagnostic figures. Nothing in the classifier reads these back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassifierMetrics {
    /// Fraction of the learning window filled.
    pub learning_progress: f64,
    /// Current speed estimate, rounded to 0.1 WPM.
    pub current_wpm: f64,
    /// Mean absolute sample-to-sample change over the mean duration.
    pub adaptation_rate: f64,
    /// Consistency-based accuracy estimate in [0, 1].
    pub accuracy: f64,
    /// `sensitivity * (1 - e^(-n / window))`.
    pub learning_rate: f64,
}

/// Learned state that can be stored and restored between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSnapshot {
    pub dot_duration_ms: f64,
    pub dash_threshold_ms: f64,
    pub speed: SpeedProfile,
    pub history: Vec<f64>,
}

/// Online dot/dash classifier.
#[derive(Debug, Clone)]
pub struct AdaptiveClassifier {
    config: ClassifierConfig,
    history: VecDeque<f64>,
    dot_duration: f64,
    dash_threshold: f64,
    speed: SpeedProfile,
    dot_dist: Normal,
    dash_dist: Normal,
}

impl Default for AdaptiveClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl AdaptiveClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let config = config.normalized();
        let dot_duration = defaults::DOT_MS_PER_WPM / config.initial_wpm;
        let dash_threshold = DASH_RATIO * dot_duration;
        let mut classifier = Self {
            history: VecDeque::with_capacity(config.learning_window),
            speed: SpeedProfile::starting_at(config.initial_wpm),
            config,
            dot_duration,
            dash_threshold,
            dot_dist: Normal::new(0.0, 0.0),
            dash_dist: Normal::new(0.0, 0.0),
        };
        classifier.refresh_distributions();
        classifier
    }

    /// Classifies one key-down duration (milliseconds).
    ///
    /// Once the window holds enough samples the estimates adapt before the
    /// sample is classified. Negative or non-finite input is treated as 0.
    pub fn classify(&mut self, duration_ms: f64) -> Classification {
        let duration_ms = if duration_ms.is_finite() && duration_ms > 0.0 {
            duration_ms
        } else {
            0.0
        };

        if self.history.len() >= WARM_UP_SAMPLES {
            self.adapt();
            self.update_speed_profile();
        }

        let filtered = self.filter_outlier(duration_ms);
        if self.history.len() == self.config.learning_window {
            self.history.pop_front();
        }
        self.history.push_back(filtered);

        self.decide(filtered)
    }

    /// Clamps `duration_ms` to `median ± 2·MAD` when it lies more than
    /// 3 MADs from the window median. Needs at least 5 samples.
    pub fn filter_outlier(&self, duration_ms: f64) -> f64 {
        if self.history.len() < OUTLIER_MIN_SAMPLES {
            return duration_ms;
        }
        let window: Vec<f64> = self.history.iter().copied().collect();
        let center = median(&window);
        let mad = median_absolute_deviation(&window, center);

        if (duration_ms - center).abs() > OUTLIER_MAD_LIMIT * mad {
            duration_ms.clamp(
                center - OUTLIER_CLAMP_MADS * mad,
                center + OUTLIER_CLAMP_MADS * mad,
            )
        } else {
            duration_ms
        }
    }

    fn adapt(&mut self) {
        let weighted_mean = recency_weighted_mean(self.history.iter());

        self.dot_duration = (DOT_INERTIA * self.dot_duration
            + (1.0 - DOT_INERTIA) * weighted_mean)
            .max(MIN_DOT_MS);
        self.dash_threshold =
            DASH_RATIO * self.dot_duration * DASH_BLEND_NEW + self.dash_threshold * DASH_BLEND_OLD;

        self.refresh_distributions();
    }

    fn update_speed_profile(&mut self) {
        let current = self.current_wpm();
        self.speed.current = current;
        self.speed.min = self.speed.min.min(current);
        self.speed.max = self.speed.max.max(current);
    }

    fn refresh_distributions(&mut self) {
        self.dot_dist = Normal::new(self.dot_duration, self.dot_duration * DOT_SPREAD);
        self.dash_dist = Normal::new(self.dash_threshold, self.dash_threshold * DASH_SPREAD);
    }

    fn decide(&self, duration_ms: f64) -> Classification {
        let p_dot = self.dot_dist.pdf(duration_ms);
        let p_dash = self.dash_dist.pdf(duration_ms);
        let total = p_dot + p_dash;
        let confidence = if total > 0.0 {
            (p_dot.max(p_dash) / total).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let symbol = if duration_ms < DOT_DASH_BOUNDARY * self.dot_duration {
            MorseSymbol::Dot
        } else {
            MorseSymbol::Dash
        };

        Classification {
            symbol,
            confidence,
            duration_ms,
        }
    }

    /// Restores the estimates implied by the configured speed and clears
    /// the history.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Replaces the configuration and resets.
    pub fn reconfigure(&mut self, config: ClassifierConfig) {
        *self = Self::new(config);
    }

    pub fn metrics(&self) -> ClassifierMetrics {
        let n = self.history.len();
        ClassifierMetrics {
            learning_progress: n as f64 / self.config.learning_window as f64,
            current_wpm: (self.current_wpm() * 10.0).round() / 10.0,
            adaptation_rate: self.adaptation_rate(),
            accuracy: self.estimate_accuracy(),
            learning_rate: self.config.sensitivity
                * (1.0 - (-(n as f64) / self.config.learning_window as f64).exp()),
        }
    }

    fn adaptation_rate(&self) -> f64 {
        if self.history.len() < 2 {
            return 0.0;
        }
        let window: Vec<f64> = self.history.iter().copied().collect();
        let avg = mean(&window);
        if avg <= 0.0 {
            return 0.0;
        }
        let deltas: Vec<f64> = window.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        mean(&deltas) / avg
    }

    fn estimate_accuracy(&self) -> f64 {
        if self.history.len() < ACCURACY_MIN_SAMPLES {
            return 0.0;
        }
        let (dots, dashes): (Vec<f64>, Vec<f64>) = self
            .history
            .iter()
            .partition(|&&d| d < self.dash_threshold);

        let dot_cv = coefficient_of_variation(&dots);
        let dash_cv = coefficient_of_variation(&dashes);

        1.0 - (0.7 * dot_cv.min(CONSISTENCY_CAP) + 0.3 * dash_cv.min(CONSISTENCY_CAP))
    }

    /// Current speed estimate in WPM (`1200 / dot_duration`).
    pub fn current_wpm(&self) -> f64 {
        defaults::DOT_MS_PER_WPM / self.dot_duration
    }

    pub fn dot_duration(&self) -> f64 {
        self.dot_duration
    }

    pub fn dash_threshold(&self) -> f64 {
        self.dash_threshold
    }

    pub fn speed_profile(&self) -> SpeedProfile {
        self.speed
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn snapshot(&self) -> ClassifierSnapshot {
        ClassifierSnapshot {
            dot_duration_ms: self.dot_duration,
            dash_threshold_ms: self.dash_threshold,
            speed: self.speed,
            history: self.history.iter().copied().collect(),
        }
    }

    /// Restores learned state. Values that would break the dot/dash
    /// ordering are ignored and the configured defaults kept.
    pub fn restore(&mut self, snapshot: &ClassifierSnapshot) {
        self.reset();
        let dot = snapshot.dot_duration_ms;
        let dash = snapshot.dash_threshold_ms;
        if dot.is_finite() && dash.is_finite() && dot >= MIN_DOT_MS && dash > dot {
            self.dot_duration = dot;
            self.dash_threshold = dash;
            self.speed = snapshot.speed;
        } else {
            log::warn!("ignoring classifier snapshot with dot={dot} dash={dash}");
        }
        let skip = snapshot
            .history
            .len()
            .saturating_sub(self.config.learning_window);
        self.history.extend(
            snapshot
                .history
                .iter()
                .skip(skip)
                .filter(|d| d.is_finite() && **d >= 0.0),
        );
        self.refresh_distributions();
    }
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    let avg = mean(values);
    if values.is_empty() || avg <= 0.0 {
        return 1.0;
    }
    std_dev(values) / avg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier_at(wpm: f64) -> AdaptiveClassifier {
        AdaptiveClassifier::new(ClassifierConfig {
            initial_wpm: wpm,
            ..Default::default()
        })
    }

    #[test]
    fn initial_estimates_follow_wpm() {
        let classifier = classifier_at(20.0);
        assert_eq!(classifier.dot_duration(), 60.0);
        assert_eq!(classifier.dash_threshold(), 180.0);
        assert_eq!(classifier.current_wpm(), 20.0);
    }

    #[test]
    fn classifies_dots_and_dashes_at_20_wpm() {
        let mut classifier = classifier_at(20.0);
        let symbols: Vec<MorseSymbol> = [58.0, 61.0, 59.0, 200.0, 205.0]
            .into_iter()
            .map(|d| classifier.classify(d).symbol)
            .collect();
        assert_eq!(
            symbols,
            vec![
                MorseSymbol::Dot,
                MorseSymbol::Dot,
                MorseSymbol::Dot,
                MorseSymbol::Dash,
                MorseSymbol::Dash
            ]
        );
    }

    #[test]
    fn confidence_is_a_probability() {
        let mut classifier = classifier_at(20.0);
        for d in [0.0, 1.0, 30.0, 60.0, 120.0, 180.0, 500.0, 1.0e7] {
            let c = classifier.classify(d);
            assert!(c.symbol.is_element());
            assert!((0.0..=1.0).contains(&c.confidence), "{d}: {}", c.confidence);
        }
    }

    #[test]
    fn confidence_is_zero_when_both_densities_vanish() {
        let mut classifier = classifier_at(20.0);
        let c = classifier.classify(1.0e9);
        assert_eq!(c.symbol, MorseSymbol::Dash);
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn outlier_is_clamped_into_mad_band() {
        let mut classifier = classifier_at(20.0);
        for _ in 0..5 {
            classifier.classify(100.0);
        }
        let c = classifier.classify(100_000.0);
        // median 100, MAD 0 -> band collapses to [100, 100]
        assert_eq!(c.duration_ms, 100.0);
    }

    #[test]
    fn outlier_filter_waits_for_five_samples() {
        let mut classifier = classifier_at(20.0);
        for _ in 0..4 {
            classifier.classify(100.0);
        }
        assert_eq!(classifier.filter_outlier(100_000.0), 100_000.0);
    }

    #[test]
    fn value_inside_band_passes_through() {
        let mut classifier = classifier_at(20.0);
        for d in [50.0, 60.0, 70.0, 60.0, 55.0] {
            classifier.classify(d);
        }
        // median 60, MAD 5 -> 3 MAD limit 15
        assert_eq!(classifier.filter_outlier(70.0), 70.0);
        assert_eq!(classifier.filter_outlier(90.0), 70.0);
        assert_eq!(classifier.filter_outlier(20.0), 50.0);
    }

    #[test]
    fn cold_start_does_not_adapt() {
        let mut classifier = classifier_at(20.0);
        for _ in 0..10 {
            classifier.classify(120.0);
        }
        assert_eq!(classifier.dot_duration(), 60.0);
        assert_eq!(classifier.dash_threshold(), 180.0);
    }

    #[test]
    fn warm_phase_tracks_slower_operator() {
        let mut classifier = classifier_at(20.0);
        for _ in 0..40 {
            classifier.classify(100.0);
        }
        let dot = classifier.dot_duration();
        assert!(dot > 90.0 && dot <= 100.0, "dot = {dot}");
        assert!(classifier.dash_threshold() > dot);
        assert!(classifier.current_wpm() < 20.0);
        assert!(classifier.speed_profile().min <= 12.5);
    }

    #[test]
    fn first_adaptation_uses_blend_formula() {
        let mut classifier = classifier_at(20.0);
        for _ in 0..10 {
            classifier.classify(100.0);
        }
        classifier.classify(100.0);
        let expected_dot = 0.7 * 60.0 + 0.3 * 100.0;
        let expected_dash = 0.6 * 3.0 * expected_dot + 0.4 * 180.0;
        assert!((classifier.dot_duration() - expected_dot).abs() < 1e-9);
        assert!((classifier.dash_threshold() - expected_dash).abs() < 1e-9);
    }

    #[test]
    fn invariants_hold_for_zero_stream() {
        let mut classifier = classifier_at(20.0);
        for _ in 0..500 {
            let c = classifier.classify(0.0);
            assert_eq!(c.symbol, MorseSymbol::Dot);
            assert!(classifier.dot_duration() > 0.0);
            assert!(classifier.dash_threshold() > classifier.dot_duration());
        }
    }

    #[test]
    fn negative_and_nan_durations_count_as_zero() {
        let mut classifier = classifier_at(20.0);
        assert_eq!(classifier.classify(-5.0).duration_ms, 0.0);
        assert_eq!(classifier.classify(f64::NAN).duration_ms, 0.0);
    }

    #[test]
    fn history_is_bounded_by_window() {
        let mut classifier = AdaptiveClassifier::new(ClassifierConfig {
            learning_window: 12,
            ..Default::default()
        });
        for _ in 0..50 {
            classifier.classify(60.0);
        }
        assert_eq!(classifier.history_len(), 12);
        assert_eq!(classifier.metrics().learning_progress, 1.0);
    }

    #[test]
    fn sensitivity_is_clamped() {
        let low = AdaptiveClassifier::new(ClassifierConfig {
            sensitivity: 0.0,
            ..Default::default()
        });
        let high = AdaptiveClassifier::new(ClassifierConfig {
            sensitivity: 5.0,
            ..Default::default()
        });
        assert_eq!(low.config().sensitivity, 0.1);
        assert_eq!(high.config().sensitivity, 0.9);
    }

    #[test]
    fn invalid_wpm_falls_back_to_default() {
        let classifier = classifier_at(-3.0);
        assert_eq!(classifier.config().initial_wpm, defaults::INITIAL_WPM);
        assert!(classifier.dot_duration() > 0.0);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut classifier = classifier_at(25.0);
        for _ in 0..30 {
            classifier.classify(150.0);
        }
        classifier.reset();
        let once = classifier.snapshot();
        classifier.reset();
        assert_eq!(classifier.snapshot(), once);
        assert_eq!(once.dot_duration_ms, 48.0);
        assert_eq!(once.dash_threshold_ms, 144.0);
        assert!(once.history.is_empty());
        assert_eq!(classifier.speed_profile(), SpeedProfile::starting_at(25.0));
    }

    #[test]
    fn metrics_on_fresh_classifier() {
        let metrics = classifier_at(20.0).metrics();
        assert_eq!(metrics.learning_progress, 0.0);
        assert_eq!(metrics.current_wpm, 20.0);
        assert_eq!(metrics.adaptation_rate, 0.0);
        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.learning_rate, 0.0);
    }

    #[test]
    fn metrics_for_steady_keying() {
        let mut classifier = classifier_at(20.0);
        for i in 0..40 {
            classifier.classify(if i % 2 == 0 { 60.0 } else { 180.0 });
        }
        let metrics = classifier.metrics();
        assert!((metrics.learning_progress - 0.4).abs() < 1e-12);
        assert!(metrics.adaptation_rate > 0.0);
        assert!(metrics.accuracy > 0.0 && metrics.accuracy <= 1.0);
        assert!(metrics.learning_rate > 0.0 && metrics.learning_rate < 0.3);
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let mut trained = classifier_at(20.0);
        for _ in 0..30 {
            trained.classify(80.0);
        }
        let snapshot = trained.snapshot();

        let mut fresh = classifier_at(20.0);
        fresh.restore(&snapshot);
        assert_eq!(fresh.dot_duration(), trained.dot_duration());
        assert_eq!(fresh.dash_threshold(), trained.dash_threshold());
        assert_eq!(fresh.history_len(), 30);
    }

    #[test]
    fn restore_rejects_inverted_thresholds() {
        let mut classifier = classifier_at(20.0);
        classifier.restore(&ClassifierSnapshot {
            dot_duration_ms: 100.0,
            dash_threshold_ms: 50.0,
            speed: SpeedProfile::starting_at(12.0),
            history: vec![],
        });
        assert_eq!(classifier.dot_duration(), 60.0);
        assert_eq!(classifier.dash_threshold(), 180.0);
    }
}
