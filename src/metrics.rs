use crate::lane::LaneKind;
use std::sync::Once;

/// Name of the gauge holding the number of items per lane.
pub const DEPTH_GAUGE: &str = "two_lane_queue_depth";

/// Receives the depth of each lane after the queue changed.
///
/// Reporting is fire-and-forget: implementations must not panic and the queue ignores
/// whatever happens inside.
pub trait DepthObserver: Send + Sync {
    fn set_depth(&self, queue: &str, lane: LaneKind, depth: usize);
}

/// Discards every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl DepthObserver for NoopObserver {
    fn set_depth(&self, _queue: &str, _lane: LaneKind, _depth: usize) {}
}

/// Reports depths through the `metrics` facade as `two_lane_queue_depth{name, lane}`.
///
/// Without an installed recorder the reports go nowhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct GaugeObserver;

impl DepthObserver for GaugeObserver {
    fn set_depth(&self, queue: &str, lane: LaneKind, depth: usize) {
        metrics::gauge!(DEPTH_GAUGE, "name" => queue.to_owned(), "lane" => lane.as_str())
            .set(depth as f64);
    }
}

static REGISTER: Once = Once::new();

/// Describe the depth gauge to the installed recorder. Only the first call has any effect.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        metrics::describe_gauge!(DEPTH_GAUGE, "number of items in the two lane queue");
        log::debug!("Registered {}", DEPTH_GAUGE);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    fn label<'a>(labels: &'a [(String, String)], key: &str) -> Option<&'a str> {
        labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn gauge_observer_sets_labelled_gauges() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            GaugeObserver.set_depth("builds", LaneKind::Fast, 2);
            GaugeObserver.set_depth("builds", LaneKind::Slow, 5);
        });

        let mut seen = Vec::new();
        for (key, _, _, value) in snapshotter.snapshot().into_vec() {
            let key = key.key();
            assert_eq!(key.name(), DEPTH_GAUGE);
            let labels: Vec<(String, String)> = key
                .labels()
                .map(|l| (l.key().to_owned(), l.value().to_owned()))
                .collect();
            let depth = match value {
                DebugValue::Gauge(depth) => depth.into_inner(),
                other => panic!("expected a gauge, got {:?}", other),
            };
            assert_eq!(label(&labels, "name"), Some("builds"));
            seen.push((label(&labels, "lane").map(str::to_owned), depth));
        }
        seen.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(
            seen,
            vec![
                (Some("fast".to_owned()), 2.0),
                (Some("slow".to_owned()), 5.0)
            ]
        );
    }

    #[test]
    fn register_is_idempotent() {
        register_metrics();
        register_metrics();
    }
}
