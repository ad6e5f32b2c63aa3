pub mod engine;
pub mod shape;
pub mod window;

/// Round to one decimal place, half away from zero. All client-facing series
/// values (graph, trends, timeseries) pass through this before emission.
pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
