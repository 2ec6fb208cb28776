//! Load-average extraction strategies.
//!
//! RRD availability and shape vary across PVE versions and storage backends,
//! so load averages are looked up through a fixed chain of named strategies.
//! Each one is tried only if the previous produced nothing usable; the chain
//! ends in the zero triple.

use crate::core::domain::model::node_record::{LoadAverage, LoadSource};
use serde_json::Value;

/// One way of finding load averages in a raw API response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// `GET /nodes/{node}/rrddata?timeframe=hour`
    RrdHour,
    /// `GET /nodes/{node}/rrddata?timeframe=day`
    RrdDay,
    /// The `loadavg` field embedded in `GET /nodes/{node}/status`
    NodeStatus,
}

impl LoadStrategy {
    /// Fallback order.
    pub const ORDER: [LoadStrategy; 3] = [
        LoadStrategy::RrdHour,
        LoadStrategy::RrdDay,
        LoadStrategy::NodeStatus,
    ];

    pub fn source(&self) -> LoadSource {
        match self {
            LoadStrategy::RrdHour => LoadSource::RrdHour,
            LoadStrategy::RrdDay => LoadSource::RrdDay,
            LoadStrategy::NodeStatus => LoadSource::NodeStatus,
        }
    }

    /// RRD timeframe queried by this strategy, if it is an RRD strategy.
    pub fn timeframe(&self) -> Option<&'static str> {
        match self {
            LoadStrategy::RrdHour => Some("hour"),
            LoadStrategy::RrdDay => Some("day"),
            LoadStrategy::NodeStatus => None,
        }
    }

    /// Extracts a usable load triple from the raw response of this strategy.
    pub fn extract(&self, raw: &Value) -> Option<LoadAverage> {
        match self {
            LoadStrategy::RrdHour | LoadStrategy::RrdDay => latest_rrd_load(raw),
            LoadStrategy::NodeStatus => raw.get("loadavg").and_then(load_from_value),
        }
    }
}

/// Walks the fallback chain over already-fetched responses.
///
/// `None` entries stand for failed or skipped calls.
pub fn resolve_load<'a>(
    candidates: impl IntoIterator<Item = (LoadStrategy, Option<&'a Value>)>,
) -> (LoadAverage, LoadSource) {
    candidates
        .into_iter()
        .find_map(|(strategy, raw)| {
            raw.and_then(|raw| strategy.extract(raw))
                .map(|load| (load, strategy.source()))
        })
        .unwrap_or((LoadAverage::ZERO, LoadSource::Fallback))
}

/// The most recent RRD data point carrying a usable `loadavg`.
fn latest_rrd_load(raw: &Value) -> Option<LoadAverage> {
    raw.as_array()?
        .iter()
        .rev()
        .find_map(|point| point.get("loadavg").and_then(load_from_value))
}

/// Accepts a number, a numeric string, or an array of either.
fn load_from_value(value: &Value) -> Option<LoadAverage> {
    let values: Vec<Option<f64>> = match value {
        Value::Array(items) => items.iter().take(3).map(number).collect(),
        other => vec![number(other)],
    };
    if values.iter().all(Option::is_none) {
        return None;
    }
    let values: Vec<f64> = values.into_iter().map(|v| v.unwrap_or(0.0)).collect();
    Some(LoadAverage::from_values(&values))
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (parsed.is_finite() && parsed >= 0.0).then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_loadavg_strings() {
        let status = json!({ "loadavg": ["0.52", "0.41", "0.30"] });
        let load = LoadStrategy::NodeStatus.extract(&status).unwrap();
        assert_eq!(load.as_array(), [0.52, 0.41, 0.30]);
    }

    #[test]
    fn test_rrd_uses_latest_usable_point() {
        let rrd = json!([
            { "time": 1, "loadavg": 0.9 },
            { "time": 2, "loadavg": 1.25 },
            { "time": 3 }
        ]);
        let load = LoadStrategy::RrdHour.extract(&rrd).unwrap();
        assert_eq!(load.as_array(), [1.25, 0.0, 0.0]);
    }

    #[test]
    fn test_rrd_without_loadavg_is_unusable() {
        assert!(LoadStrategy::RrdDay.extract(&json!([])).is_none());
        assert!(LoadStrategy::RrdDay.extract(&json!([{ "time": 1 }])).is_none());
        assert!(LoadStrategy::RrdDay.extract(&json!({})).is_none());
    }

    #[test]
    fn test_short_arrays_pad_with_zero() {
        let status = json!({ "loadavg": [2.0, "1.5"] });
        let load = LoadStrategy::NodeStatus.extract(&status).unwrap();
        assert_eq!(load.as_array(), [2.0, 1.5, 0.0]);
    }

    #[test]
    fn test_fallback_order() {
        let hour = json!([{ "loadavg": 1.0 }]);
        let day = json!([{ "loadavg": 2.0 }]);
        let status = json!({ "loadavg": ["3.0", "3.0", "3.0"] });

        let (load, source) = resolve_load([
            (LoadStrategy::RrdHour, Some(&hour)),
            (LoadStrategy::RrdDay, Some(&day)),
            (LoadStrategy::NodeStatus, Some(&status)),
        ]);
        assert_eq!((load.one, source), (1.0, LoadSource::RrdHour));

        let (load, source) = resolve_load([
            (LoadStrategy::RrdHour, None),
            (LoadStrategy::RrdDay, Some(&day)),
            (LoadStrategy::NodeStatus, Some(&status)),
        ]);
        assert_eq!((load.one, source), (2.0, LoadSource::RrdDay));

        let (load, source) = resolve_load([
            (LoadStrategy::RrdHour, None),
            (LoadStrategy::RrdDay, None),
            (LoadStrategy::NodeStatus, Some(&status)),
        ]);
        assert_eq!((load.as_array(), source), ([3.0, 3.0, 3.0], LoadSource::NodeStatus));

        let (load, source) = resolve_load([
            (LoadStrategy::RrdHour, None),
            (LoadStrategy::RrdDay, None),
            (LoadStrategy::NodeStatus, Some(&json!({ "uptime": 5 }))),
        ]);
        assert_eq!((load, source), (LoadAverage::ZERO, LoadSource::Fallback));
    }
}
