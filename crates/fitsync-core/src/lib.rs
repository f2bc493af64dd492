//! Core types: resource kinds, day series, snapshots, tracing

pub mod fs;
pub mod resource;
pub mod series;
pub mod snapshot;
pub mod time;
pub mod tracing;

pub use resource::ResourceKind;
pub use series::{
    CountSeries, HeartRateEntry, HeartRateSeries, ResourceSeries, SeriesData, filter_to_window,
};
pub use snapshot::{ProfileRecord, Snapshot};
pub use time::{DateWindow, day_label};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
