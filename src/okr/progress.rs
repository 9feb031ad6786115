//! Metric progress calculation
//!
//! Progress is always recomputed from a metric's baseline, current value,
//! target and direction. The result is a raw signed percentage: overshooting
//! the target yields more than 100 and regressing past the baseline yields a
//! negative number. Gauges that need a bounded value clamp at render time.

use super::{KeyResult, Metric, MetricDirection};
use serde::{Deserialize, Serialize};

/// Compute the progress percentage of a metric.
///
/// Returns 0 when the range in the metric's direction is not positive
/// (`target == baseline`, or the target lies on the wrong side of the baseline).
pub fn compute_progress(metric: &Metric) -> i64 {
    let (delta, range) = match metric.direction {
        MetricDirection::Increase => (
            metric.current_value - metric.baseline,
            metric.target - metric.baseline,
        ),
        MetricDirection::Decrease => (
            metric.baseline - metric.current_value,
            metric.baseline - metric.target,
        ),
    };
    if range > 0.0 {
        round_half_up(delta / range * 100.0)
    } else {
        0
    }
}

/// Round to the nearest integer with ties going towards positive infinity
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Per-metric progress for every metric on a key result, in metric order
pub fn key_result_metric_progress(kr: &KeyResult) -> Vec<(&Metric, i64)> {
    kr.metrics.iter().map(|m| (m, compute_progress(m))).collect()
}

/// Colour band used when presenting a progress percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressBand {
    OnTrack,
    Progressing,
    AtRisk,
    Behind,
}

impl ProgressBand {
    /// Classify with the default thresholds (75 / 50 / 25)
    pub fn from_percentage(percentage: i64) -> Self {
        ProgressThresholds::default().classify(percentage)
    }

    pub fn label(self) -> &'static str {
        match self {
            ProgressBand::OnTrack => "on track",
            ProgressBand::Progressing => "progressing",
            ProgressBand::AtRisk => "at risk",
            ProgressBand::Behind => "behind",
        }
    }
}

/// Lower bounds (inclusive) of each progress band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressThresholds {
    #[serde(default = "default_on_track")]
    pub on_track: i64,
    #[serde(default = "default_progressing")]
    pub progressing: i64,
    #[serde(default = "default_at_risk")]
    pub at_risk: i64,
}

impl Default for ProgressThresholds {
    fn default() -> Self {
        Self {
            on_track: default_on_track(),
            progressing: default_progressing(),
            at_risk: default_at_risk(),
        }
    }
}

impl ProgressThresholds {
    pub fn classify(&self, percentage: i64) -> ProgressBand {
        if percentage >= self.on_track {
            ProgressBand::OnTrack
        } else if percentage >= self.progressing {
            ProgressBand::Progressing
        } else if percentage >= self.at_risk {
            ProgressBand::AtRisk
        } else {
            ProgressBand::Behind
        }
    }
}

fn default_on_track() -> i64 {
    75
}

fn default_progressing() -> i64 {
    50
}

fn default_at_risk() -> i64 {
    25
}
