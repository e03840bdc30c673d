pub mod csv_export;
pub mod csv_import;
pub mod file;

pub use file::{load_plan, load_project, load_schedule, parse_plan, parse_schedule, save_project};
