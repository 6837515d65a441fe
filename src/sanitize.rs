//! Spike sanitization for counter samples.
//!
//! Plugs occasionally report a cumulative counter far above the previous
//! cycle's value (counter reset followed by garbage, or a firmware glitch).
//! Rather than shipping the spike to the warehouse, the previous accepted
//! value is kept for one cycle; the counter catches up on its own.

use crate::models::{MetricType, Sample};
use tracing::warn;

/// A counter more than 10% above its predecessor is treated as noise.
const MAX_COUNTER_RATIO: f64 = 1.1;

/// Reconciles the current cycle's samples against the last stored ones.
/// Pure function of its inputs.
///
/// For each current sample with a matching prior (same five-field series
/// key) and a counter metric type: a relative increase above 10% keeps the
/// prior value instead. Everything else passes through unchanged, including
/// samples with no prior, non-counter metrics, and counters whose prior
/// value is zero or negative (no usable baseline for a ratio).
pub fn sanitize_samples(current_samples: Vec<Sample>, last_samples: &[Sample]) -> Vec<Sample> {
    current_samples
        .into_iter()
        .map(|current| {
            let Some(last) = last_samples.iter().find(|l| current.same_series(l)) else {
                return current;
            };

            if current.metric_type == MetricType::Counter
                && last.value > 0.0
                && current.value / last.value > MAX_COUNTER_RATIO
            {
                warn!(
                    "Value {} for {} is more than 10 percent above the last sampled value {}, keeping previous value",
                    current.value, current.sample_name, last.value
                );
                return last.clone();
            }

            current
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityType, SampleType};

    fn counter(name: &str, value: f64) -> Sample {
        Sample {
            entity_type: EntityType::Device,
            entity_name: "TP-Link HS110".to_string(),
            sample_type: SampleType::ElectricityConsumption,
            sample_name: name.to_string(),
            metric_type: MetricType::Counter,
            value,
        }
    }

    fn gauge(name: &str, value: f64) -> Sample {
        Sample {
            metric_type: MetricType::Gauge,
            ..counter(name, value)
        }
    }

    #[test]
    fn suppresses_twenty_percent_counter_jump() {
        let last = vec![counter("Washer", 1000.0)];
        let sanitized = sanitize_samples(vec![counter("Washer", 1200.0)], &last);
        assert_eq!(sanitized, vec![counter("Washer", 1000.0)]);
    }

    #[test]
    fn keeps_five_percent_counter_increase() {
        let last = vec![counter("Washer", 1000.0)];
        let sanitized = sanitize_samples(vec![counter("Washer", 1050.0)], &last);
        assert_eq!(sanitized, vec![counter("Washer", 1050.0)]);
    }

    #[test]
    fn keeps_decreasing_counter() {
        // a genuine device reset reports a smaller value; that is kept
        let last = vec![counter("Washer", 1000.0)];
        let sanitized = sanitize_samples(vec![counter("Washer", 3.0)], &last);
        assert_eq!(sanitized, vec![counter("Washer", 3.0)]);
    }

    #[test]
    fn unmatched_sample_passes_through() {
        let last = vec![counter("Washer", 1.0)];
        let sanitized = sanitize_samples(vec![counter("Dryer", 5000.0)], &last);
        assert_eq!(sanitized, vec![counter("Dryer", 5000.0)]);
    }

    #[test]
    fn gauge_passes_through_regardless_of_delta() {
        let last = vec![gauge("Washer", 1.0)];
        let sanitized = sanitize_samples(vec![gauge("Washer", 2500.0)], &last);
        assert_eq!(sanitized, vec![gauge("Washer", 2500.0)]);
    }

    #[test]
    fn zero_prior_counter_passes_through() {
        // ratio against zero is meaningless; treat as no usable prior
        let last = vec![counter("Washer", 0.0)];
        let sanitized = sanitize_samples(vec![counter("Washer", 800.0)], &last);
        assert_eq!(sanitized, vec![counter("Washer", 800.0)]);
    }

    #[test]
    fn empty_prior_set_passes_everything_through() {
        let current = vec![counter("Washer", 42.0), gauge("Washer", 1.5)];
        let sanitized = sanitize_samples(current.clone(), &[]);
        assert_eq!(sanitized, current);
    }

    #[test]
    fn mixed_batch_only_touches_the_spiking_counter() {
        let last = vec![counter("Washer", 1000.0), counter("Dryer", 500.0)];
        let current = vec![
            counter("Washer", 1500.0),
            counter("Dryer", 510.0),
            gauge("Washer", 3.2),
        ];

        let sanitized = sanitize_samples(current, &last);

        assert_eq!(sanitized[0].value, 1000.0); // spike suppressed
        assert_eq!(sanitized[1].value, 510.0);
        assert_eq!(sanitized[2].value, 3.2);
    }
}
