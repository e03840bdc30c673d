//! Gantt side of the engine: which rows are visible, where their bars go,
//! and how the time axis is bucketed at each zoom level.

pub mod bucketer;
pub mod deriver;

pub use bucketer::{buckets, HeaderBucket, TimeScale, ZoomLevel, ZoomWidths};
pub use deriver::{
    check_dependencies, BarGeometry, DateRange, DependencyViolation, ExpandState, RangeOverride,
    TimelineArrow, TimelineConfig, TimelineDeriver, TimelineFilter, TimelineOptions, TimelineRow,
    TimelineView, ViolationReason,
};
