pub mod flow_canvas;
pub mod gantt_chart;
pub mod theme;
pub mod toolbar;
