//! Flow-graph layout and timeline rendering for plan documents.
//!
//! A plan is a goal broken into tasks, sub-steps and action items. Two views
//! are derived from it:
//!
//! * a flow canvas, where the cards of one level are auto-laid-out left to
//!   right by dependency depth ([`layout`]) and joined by S-curve connectors
//!   ([`geometry`]) that can be drawn and deleted with the pointer ([`editor`]);
//! * a Gantt timeline, where the flat schedule is projected onto collapsible
//!   rows, bars and header buckets ([`timeline`]).
//!
//! Everything in here is pure data in, data out. The egui viewer in the
//! binary is only one consumer.

pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod io;
pub mod layout;
pub mod model;
pub mod timeline;

pub use config::EngineConfig;
pub use editor::{ConnectionEditor, GestureOutcome, GestureState};
pub use error::{ConfigError, ImportError};
pub use geometry::{Connector, ConnectorGeometry, ConnectorStyle};
pub use layout::{AutoLayoutEngine, FlowDirection, Layout, LayoutConfig};
pub use model::{GraphModel, Measure, Node, NodeId, Point, Size};
pub use timeline::{TimelineDeriver, TimelineOptions, TimelineView};
