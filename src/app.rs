use std::path::PathBuf;

use chrono::{Duration, NaiveDate};

use planflow::editor::{ConnectionEditor, GestureOutcome};
use planflow::geometry::ConnectorGeometry;
use planflow::layout::AutoLayoutEngine;
use planflow::model::{
    ActionItem, GraphModel, ItemType, Level, Node, NodeId, Plan, PlanTask, Point, Project,
    ScheduleItem, Size, SubStep,
};
use planflow::timeline::{ExpandState, TimelineDeriver, TimelineOptions};
use planflow::EngineConfig;

use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Flow,
    Timeline,
}

/// Main application state.
pub struct PlannerApp {
    pub project: Project,
    pub file_path: Option<PathBuf>,
    pub view: View,

    // Flow canvas
    pub level: Level,
    pub graph: GraphModel,
    pub editor: ConnectionEditor,
    pub canvas: Size,
    /// Lay out the current level as soon as every card has been measured.
    pub pending_layout: bool,

    // Timeline
    pub expand: ExpandState,
    pub timeline_options: TimelineOptions,

    pub config: EngineConfig,
    layout_engine: AutoLayoutEngine,
    geometry: ConnectorGeometry,
    deriver: TimelineDeriver,

    // Status message
    pub status_message: String,
}

impl PlannerApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);
        ui::theme::apply_theme(&cc.egui_ctx);

        let config = EngineConfig::load_or_default();
        let project = Self::sample_project(chrono::Local::now().date_naive());
        let mut app = Self {
            expand: ExpandState::initial(&project.schedule),
            project,
            file_path: None,
            view: View::Flow,
            level: Level::Tasks,
            graph: GraphModel::new(),
            editor: ConnectionEditor::new(),
            canvas: Size::new(0.0, 0.0),
            pending_layout: false,
            timeline_options: TimelineOptions::default(),
            layout_engine: AutoLayoutEngine::new(config.layout.clone()),
            geometry: ConnectorGeometry::new(config.connector.clone()),
            deriver: TimelineDeriver::new(config.timeline.clone(), config.connector.clone()),
            config,
            status_message: "Ready".to_string(),
        };
        app.load_level(Level::Tasks);
        app
    }

    /// Generate a sample plan and schedule for demonstration.
    fn sample_project(today: NaiveDate) -> Project {
        let mut project = Project::new("Sample Plan");

        let task = |id: &str, title: &str, next: &[&str]| PlanTask {
            id: id.to_string(),
            title: title.to_string(),
            next_task_ids: next.iter().map(|s| s.to_string()).collect(),
            position: None,
            sub_steps: Vec::new(),
        };
        let step = |id: &str, title: &str, next: &[&str]| SubStep {
            id: id.to_string(),
            title: title.to_string(),
            next_sub_step_ids: next.iter().map(|s| s.to_string()).collect(),
            position: None,
            action_items: Vec::new(),
        };

        let mut research = task("t1", "Research the market", &["t2", "t3"]);
        research.sub_steps = vec![
            step("s1", "List competitors", &["s2"]),
            step("s2", "Interview five customers", &["s3"]),
            step("s3", "Summarise findings", &[]),
        ];
        research.sub_steps[1].action_items = vec![
            ActionItem {
                id: "a1".into(),
                title: "Draft interview script".into(),
                done: true,
            },
            ActionItem {
                id: "a2".into(),
                title: "Book calls".into(),
                done: false,
            },
        ];

        project.plan = Plan {
            goal: "Launch the beta".to_string(),
            tasks: vec![
                research,
                task("t2", "Design the product", &["t4"]),
                task("t3", "Set up the build pipeline", &["t4"]),
                task("t4", "Ship the beta to early users", &[]),
            ],
        };

        let day = |n: i64| today + Duration::days(n);
        project.schedule = vec![
            ScheduleItem::new("t1", "Research the market", ItemType::Task, None)
                .with_dates(day(-4), day(6))
                .with_progress(60.0),
            ScheduleItem::new("s1", "List competitors", ItemType::Substep, Some("t1"))
                .with_dates(day(-4), day(-2))
                .with_progress(100.0),
            ScheduleItem::new("s2", "Interview five customers", ItemType::Substep, Some("t1"))
                .with_dates(day(-1), day(4))
                .with_progress(40.0)
                .depends_on("s1"),
            ScheduleItem::new("a1", "Draft interview script", ItemType::Actionitem, Some("s2"))
                .with_dates(day(-1), day(0))
                .with_progress(100.0),
            ScheduleItem::new("a2", "Book calls", ItemType::Actionitem, Some("s2"))
                .with_dates(day(1), day(1))
                .depends_on("a1"),
            ScheduleItem::new("s3", "Summarise findings", ItemType::Substep, Some("t1"))
                .with_dates(day(5), day(6))
                .depends_on("s2"),
            ScheduleItem::new("t2", "Design the product", ItemType::Task, None)
                .with_dates(day(7), day(16))
                .depends_on("t1"),
            ScheduleItem::new("t3", "Set up the build pipeline", ItemType::Task, None)
                .with_dates(day(7), day(12))
                .depends_on("t1"),
            ScheduleItem::new("t4", "Ship the beta to early users", ItemType::Task, None)
                .with_dates(day(17), day(24))
                .depends_on("t2")
                .depends_on("t3"),
        ];
        project
    }

    // --- Flow canvas ---

    /// Show another level of the plan. The current graph is written back first.
    pub fn open_level(&mut self, level: Level) {
        self.commit_graph();
        self.load_level(level);
    }

    fn load_level(&mut self, level: Level) {
        self.editor.cancel();
        self.graph = self.project.plan.graph_for(&level);
        self.level = level;
        self.canvas = Size::new(0.0, 0.0);
        // Cards with saved positions keep them; otherwise lay out once measured.
        self.pending_layout = !self.graph.unplaced().is_empty();
        if !self.pending_layout {
            self.canvas = self.extent_with_margin(Size::new(0.0, 0.0));
        }
    }

    fn commit_graph(&mut self) {
        self.project.plan.apply_graph(&self.level, &self.graph);
        self.project.touch();
    }

    pub fn request_layout(&mut self) {
        self.pending_layout = true;
        self.status_message = "Laying out cards".to_string();
    }

    /// Runs the deferred layout once every card reports a size.
    fn run_pending_layout(&mut self) {
        if !self.pending_layout || self.graph.nodes().iter().any(|n| n.size.is_none()) {
            return;
        }
        let layout = self.layout_engine.compute(&self.graph, &self.graph);
        self.graph.apply_layout(&layout);
        self.canvas = layout.canvas;
        self.pending_layout = false;
        self.commit_graph();
        tracing::info!(
            cards = self.graph.len(),
            columns = layout.columns.len(),
            "laid out {:?}",
            self.level
        );
        self.status_message = if layout.has_cycle() {
            format!(
                "Layout done; {} cards sit in a cycle and were placed last",
                layout.remainder.len()
            )
        } else {
            format!("Laid out {} cards in {} columns", self.graph.len(), layout.columns.len())
        };
    }

    pub fn add_card(&mut self) {
        let id = NodeId::generate();
        let margin = self.config.layout.margin;
        let at = Point::new(margin, self.canvas.height.max(margin));
        self.graph.add_node(Node::new(id.clone(), "New card").with_position(at.x, at.y));
        self.canvas = self.extent_with_margin(self.canvas);
        self.commit_graph();
        self.status_message = "Card added".to_string();
        tracing::debug!(%id, "card added");
    }

    fn extent_with_margin(&self, at_least: Size) -> Size {
        let margin = self.config.layout.margin;
        let default = self.config.layout.default_node_size;
        let mut extent = at_least;
        for node in self.graph.nodes() {
            if let Some(p) = node.position {
                let s = node.size.unwrap_or(default);
                extent.width = extent.width.max(p.x + s.width + margin);
                extent.height = extent.height.max(p.y + s.height + margin);
            }
        }
        extent
    }

    fn title_of(&self, id: &NodeId) -> String {
        self.graph
            .node(id)
            .map(|n| n.title.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn handle_canvas(&mut self, interaction: ui::flow_canvas::CanvasInteraction) {
        let margin = self.config.layout.margin;
        self.canvas.width = self.canvas.width.max(interaction.extent.width + margin);
        self.canvas.height = self.canvas.height.max(interaction.extent.height + margin);

        match interaction.outcome {
            Some(GestureOutcome::EdgeAdded { from, to }) => {
                self.commit_graph();
                self.status_message = format!("Linked '{}' → '{}'", self.title_of(&from), self.title_of(&to));
            }
            Some(GestureOutcome::EdgeExists { from, to }) => {
                self.status_message = format!(
                    "'{}' already leads to '{}'",
                    self.title_of(&from),
                    self.title_of(&to)
                );
            }
            Some(GestureOutcome::NodeMoved { .. }) => self.commit_graph(),
            Some(GestureOutcome::Discarded) | Some(GestureOutcome::None) | None => {}
        }

        if let Some((from, to)) = interaction.removed_edge {
            self.commit_graph();
            self.status_message = format!("Removed link '{}' → '{}'", self.title_of(&from), self.title_of(&to));
        }

        if interaction.renamed {
            self.commit_graph();
        }
        if let Some(title) = interaction.removed_card {
            self.commit_graph();
            self.status_message = format!("Card '{}' deleted", title);
        }

        if let Some(id) = interaction.open_card {
            if self.level == Level::Tasks {
                self.open_level(Level::SubSteps(id.to_string()));
            }
        }
    }

    // --- File operations ---

    pub fn new_project(&mut self) {
        self.project = Project::default();
        self.file_path = None;
        self.expand = ExpandState::default();
        self.load_level(Level::Tasks);
        self.status_message = "New plan created".to_string();
    }

    pub fn open_project(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Plan", &["plan.json", "json"])
            .pick_file()
        {
            match planflow::io::load_project(&path) {
                Ok(project) => {
                    self.expand = ExpandState::initial(&project.schedule);
                    self.project = project;
                    self.file_path = Some(path);
                    self.load_level(Level::Tasks);
                    self.status_message = "Plan loaded".to_string();
                }
                Err(e) => {
                    self.status_message = format!("Error loading: {}", e);
                }
            }
        }
    }

    pub fn save_project(&mut self) {
        if let Some(path) = self.file_path.clone() {
            self.commit_graph();
            match planflow::io::save_project(&self.project, &path) {
                Ok(()) => self.status_message = "Plan saved".to_string(),
                Err(e) => self.status_message = format!("Error saving: {}", e),
            }
        } else {
            self.save_project_as();
        }
    }

    pub fn save_project_as(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Plan", &["plan.json", "json"])
            .set_file_name(format!("{}.plan.json", self.project.name))
            .save_file()
        {
            self.file_path = Some(path);
            self.save_project();
        }
    }

    pub fn import_plan(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Plan JSON", &["json"])
            .pick_file()
        {
            match planflow::io::load_plan(&path) {
                Ok(plan) => {
                    let count = plan.tasks.len();
                    self.project.plan = plan;
                    self.project.touch();
                    self.load_level(Level::Tasks);
                    self.status_message = format!("Imported plan with {} tasks", count);
                }
                Err(e) => self.status_message = format!("Plan import failed: {}", e),
            }
        }
    }

    pub fn import_schedule(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Schedule JSON", &["json"])
            .pick_file()
        {
            match planflow::io::load_schedule(&path) {
                Ok(items) => {
                    let count = items.len();
                    self.set_schedule(items);
                    self.status_message = format!("Imported {} schedule items", count);
                }
                Err(e) => self.status_message = format!("Schedule import failed: {}", e),
            }
        }
    }

    pub fn import_csv(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv", "txt"])
            .pick_file()
        {
            match planflow::io::csv_import::import_csv(&path) {
                Ok((items, skipped)) => {
                    let count = items.len();
                    self.set_schedule(items);
                    if skipped > 0 {
                        self.status_message =
                            format!("Imported {} items ({} rows skipped)", count, skipped);
                    } else {
                        self.status_message = format!("Imported {} items", count);
                    }
                }
                Err(e) => {
                    self.status_message = format!("CSV import failed: {}", e);
                }
            }
        }
    }

    fn set_schedule(&mut self, items: Vec<ScheduleItem>) {
        self.expand = ExpandState::initial(&items);
        self.project.schedule = items;
        self.project.touch();
        self.view = View::Timeline;
    }

    pub fn export_csv(&mut self) {
        if self.project.schedule.is_empty() {
            self.status_message = "Nothing to export: the schedule is empty".to_string();
            return;
        }

        let default_name = format!("{}.csv", self.project.name);
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .set_file_name(default_name)
            .save_file()
        {
            match planflow::io::csv_export::export_csv(&self.project.schedule, &path) {
                Ok(count) => {
                    self.status_message = format!("Exported {} items to CSV", count);
                }
                Err(e) => {
                    self.status_message = format!("CSV export failed: {}", e);
                }
            }
        }
    }

    pub fn save_settings(&mut self) {
        let path = EngineConfig::default_path();
        match self.config.save(&path) {
            Ok(()) => self.status_message = format!("Settings saved to {}", path.display()),
            Err(e) => self.status_message = format!("Error saving settings: {}", e),
        }
    }

    fn status_counts(&self, timeline_rows: usize, violations: usize) -> String {
        match self.view {
            View::Flow => format!("Cards: {} · Links: {}", self.graph.len(), self.graph.edge_count()),
            View::Timeline if violations > 0 => format!(
                "Rows: {} · Zoom: {} · {} invalid dependencies",
                timeline_rows,
                self.timeline_options.zoom.label(),
                violations
            ),
            View::Timeline => format!(
                "Rows: {} · Zoom: {}",
                timeline_rows,
                self.timeline_options.zoom.label()
            ),
        }
    }
}

impl eframe::App for PlannerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Handle keyboard shortcuts outside closures to avoid borrow issues
        let should_save = ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::S));
        let should_layout = ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::L));
        let should_cancel = ctx.input(|i| i.key_pressed(egui::Key::Escape));
        if should_save {
            self.save_project();
        }
        if should_layout && self.view == View::Flow {
            self.request_layout();
        }
        if should_cancel {
            self.editor.cancel();
        }

        // Sizes measured last frame make the deferred layout possible.
        self.run_pending_layout();

        let timeline = self
            .deriver
            .derive(&self.project.schedule, &self.expand, &self.timeline_options);

        // Top panel: toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::toolbar::show_toolbar(self, ui);
        });

        // Bottom panel: status bar
        let counts = self.status_counts(timeline.rows.len(), timeline.violations.len());
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(ui::theme::STATUS_BAR_HEIGHT)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_STATUS)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .size(11.0)
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(
                            egui::RichText::new(counts)
                                .size(10.5)
                                .color(ui::theme::TEXT_DIM),
                        );
                    });
                });
            });

        let frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        egui::CentralPanel::default().frame(frame).show(ctx, |ui| match self.view {
            View::Flow => {
                let interaction = ui::flow_canvas::show_flow_canvas(
                    &mut self.graph,
                    &mut self.editor,
                    &self.geometry,
                    self.canvas,
                    ui,
                );
                if interaction.measured && self.pending_layout {
                    ctx.request_repaint();
                }
                self.handle_canvas(interaction);
            }
            View::Timeline => {
                let interaction = ui::gantt_chart::show_gantt_chart(&timeline, self.timeline_options.zoom, ui);
                if let Some(id) = interaction.toggle {
                    self.expand.toggle(&id);
                }
                if let Some(zoom) = interaction.zoom {
                    self.timeline_options.zoom = zoom;
                }
            }
        });
    }
}
