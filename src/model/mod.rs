pub mod graph;
pub mod plan;
pub mod project;
pub mod schedule;

pub use graph::{GraphModel, Measure, Node, NodeId, Point, Size};
pub use plan::{ActionItem, Level, Plan, PlanTask, SubStep};
pub use project::Project;
pub use schedule::{ItemType, ScheduleItem};
