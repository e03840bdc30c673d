//! Projection of the flat schedule onto rows and a time axis.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::bucketer::{buckets, HeaderBucket, TimeScale, ZoomLevel, ZoomWidths};
use crate::geometry::{Connector, ConnectorGeometry, ConnectorStyle};
use crate::model::graph::Point;
use crate::model::schedule::{ItemType, ScheduleItem};

/// Upper bound for day counts read from settings.
const MAX_CONFIG_DAYS: i64 = 1 << 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub row_height: f32,
    /// Days added before the first and after the last bar.
    pub padding_days: i64,
    /// Bars never get narrower than this, whatever their dates say.
    pub min_bar_width: f32,
    /// Longest axis drawn; a far-off end date is cut here, start kept.
    pub max_span_days: i64,
    pub zoom_widths: ZoomWidths,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            row_height: 32.0,
            padding_days: 2,
            min_bar_width: 6.0,
            max_span_days: 3660,
            zoom_widths: ZoomWidths::default(),
        }
    }
}

/// Which action items to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimelineFilter {
    #[default]
    All,
    /// Hide action items that are 100% complete.
    PendingActionItems,
}

impl TimelineFilter {
    fn accepts(self, item: &ScheduleItem) -> bool {
        match self {
            Self::All => true,
            Self::PendingActionItems => {
                item.item_type != ItemType::Actionitem || !item.is_complete()
            }
        }
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn total_days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1).max(0) as u32
    }
}

/// Client-side bounds the data-derived range is clamped to.
///
/// An override only narrows the range; it stands in for a bound only when no
/// item carries a date on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeOverride {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Which rows are expanded. View state only; never stored in the schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandState {
    expanded: HashSet<String>,
}

impl ExpandState {
    /// Every task expanded, every sub-step collapsed.
    pub fn initial(items: &[ScheduleItem]) -> Self {
        Self {
            expanded: items
                .iter()
                .filter(|i| i.item_type == ItemType::Task)
                .map(|i| i.id.clone())
                .collect(),
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn toggle(&mut self, id: &str) {
        if !self.expanded.remove(id) {
            self.expanded.insert(id.to_string());
        }
    }

    pub fn expand(&mut self, id: &str) {
        self.expanded.insert(id.to_string());
    }

    pub fn collapse(&mut self, id: &str) {
        self.expanded.remove(id);
    }

    pub fn expand_all(&mut self, items: &[ScheduleItem]) {
        self.expanded.extend(
            items
                .iter()
                .filter(|i| i.item_type != ItemType::Actionitem)
                .map(|i| i.id.clone()),
        );
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimelineOptions {
    pub zoom: ZoomLevel,
    pub filter: TimelineFilter,
    pub range_override: RangeOverride,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarGeometry {
    pub offset_x: f32,
    pub width: f32,
}

impl BarGeometry {
    pub fn end_x(&self) -> f32 {
        self.offset_x + self.width
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineRow {
    pub id: String,
    pub name: String,
    pub item_type: ItemType,
    pub row_index: usize,
    pub progress: f32,
    /// Has children that an expand toggle would show.
    pub expandable: bool,
    pub expanded: bool,
    /// `None` when the item has no usable dates.
    pub bar: Option<BarGeometry>,
}

impl TimelineRow {
    pub fn depth(&self) -> usize {
        self.item_type.depth()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineArrow {
    pub from: String,
    pub to: String,
    pub connector: Connector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationReason {
    UnknownItem,
    DifferentType,
    DifferentParent,
}

/// A dependency that will never be drawn because it breaks the
/// same-type/same-parent rule or points nowhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyViolation {
    /// The item listing the dependency.
    pub item: String,
    pub dependency: String,
    pub reason: ViolationReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineView {
    pub rows: Vec<TimelineRow>,
    /// Padded range; `None` when nothing has dates and no override is set.
    pub range: Option<DateRange>,
    pub day_width: f32,
    pub row_height: f32,
    pub headers: Vec<HeaderBucket>,
    pub arrows: Vec<TimelineArrow>,
    pub violations: Vec<DependencyViolation>,
}

impl TimelineView {
    pub fn total_days(&self) -> u32 {
        self.range.map(|r| r.total_days()).unwrap_or(0)
    }

    pub fn width(&self) -> f32 {
        self.total_days() as f32 * self.day_width
    }

    pub fn height(&self) -> f32 {
        self.rows.len() as f32 * self.row_height
    }

    pub fn scale(&self) -> Option<TimeScale> {
        self.range.map(|r| TimeScale::new(r.start, self.day_width))
    }

    pub fn row(&self, id: &str) -> Option<&TimelineRow> {
        self.rows.iter().find(|r| r.id == id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimelineDeriver {
    config: TimelineConfig,
    geometry: ConnectorGeometry,
}

impl TimelineDeriver {
    pub fn new(config: TimelineConfig, style: ConnectorStyle) -> Self {
        Self {
            config,
            geometry: ConnectorGeometry::new(style),
        }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Build the rendered timeline. The item list is never modified.
    pub fn derive(
        &self,
        items: &[ScheduleItem],
        expand: &ExpandState,
        options: &TimelineOptions,
    ) -> TimelineView {
        let day_width = self.config.zoom_widths.day_width(options.zoom);
        let range = self.effective_range(items, options);
        let scale = range.map(|r| TimeScale::new(r.start, day_width));

        let mut rows = Vec::new();
        for item in visible_items(items, expand, options.filter) {
            rows.push(TimelineRow {
                id: item.id.clone(),
                name: item.name.clone(),
                item_type: item.item_type,
                row_index: rows.len(),
                progress: item.progress,
                expandable: has_children(items, item),
                expanded: expand.is_expanded(&item.id),
                bar: scale.and_then(|s| self.bar(item, &s)),
            });
        }

        let violations = check_dependencies(items);
        let arrows = self.arrows(items, &rows);

        TimelineView {
            headers: match range {
                Some(r) => buckets(r.start, r.total_days(), options.zoom, day_width),
                None => Vec::new(),
            },
            rows,
            range,
            day_width,
            row_height: self.config.row_height,
            arrows,
            violations,
        }
    }

    fn effective_range(&self, items: &[ScheduleItem], options: &TimelineOptions) -> Option<DateRange> {
        let mut lo: Option<NaiveDate> = None;
        let mut hi: Option<NaiveDate> = None;
        for item in items.iter().filter(|i| options.filter.accepts(i)) {
            for d in [item.start, item.end].into_iter().flatten() {
                lo = Some(lo.map_or(d, |l| l.min(d)));
                hi = Some(hi.map_or(d, |h| h.max(d)));
            }
        }

        let ov = options.range_override;
        let start = match (lo, ov.start) {
            (Some(l), Some(o)) => l.max(o),
            (l, o) => l.or(o)?,
        };
        let end = match (hi, ov.end) {
            (Some(h), Some(o)) => h.min(o),
            (h, o) => h.or(o).unwrap_or(start),
        }
        .max(start);

        let span = self.config.max_span_days.clamp(0, MAX_CONFIG_DAYS);
        let end = match start.checked_add_signed(Duration::days(span)) {
            Some(limit) if end > limit => {
                tracing::debug!(%start, %end, %limit, "timeline range cut to the span limit");
                limit
            }
            _ => end,
        };

        // Padding that would leave the calendar is dropped.
        let pad = Duration::days(self.config.padding_days.clamp(0, MAX_CONFIG_DAYS));
        Some(DateRange {
            start: start.checked_sub_signed(pad).unwrap_or(start),
            end: end.checked_add_signed(pad).unwrap_or(end),
        })
    }

    fn bar(&self, item: &ScheduleItem, scale: &TimeScale) -> Option<BarGeometry> {
        let (start, end) = item.dates()?;
        let days = (end - start).num_days() + 1;
        Some(BarGeometry {
            offset_x: scale.date_to_x(start),
            width: (days as f32 * scale.day_width).max(self.config.min_bar_width),
        })
    }

    fn arrows(&self, items: &[ScheduleItem], rows: &[TimelineRow]) -> Vec<TimelineArrow> {
        let by_id: HashMap<&str, &ScheduleItem> = items.iter().map(|i| (i.id.as_str(), i)).collect();
        let visible: HashMap<&str, &TimelineRow> = rows.iter().map(|r| (r.id.as_str(), r)).collect();
        let row_center = |row: &TimelineRow| row.row_index as f32 * self.config.row_height + self.config.row_height / 2.0;

        let mut arrows = Vec::new();
        for succ_row in rows {
            let Some(succ) = by_id.get(succ_row.id.as_str()) else {
                continue;
            };
            let Some(succ_bar) = succ_row.bar else {
                continue;
            };
            for dep in &succ.dependencies {
                // Hidden predecessors get no arrow at all.
                let Some(pred_row) = visible.get(dep.as_str()) else {
                    continue;
                };
                let Some(pred) = by_id.get(dep.as_str()) else {
                    continue;
                };
                if violation(succ, pred).is_some() {
                    continue;
                }
                let Some(pred_bar) = pred_row.bar else {
                    continue;
                };
                let from = Point::new(pred_bar.end_x(), row_center(*pred_row));
                let to = Point::new(succ_bar.offset_x, row_center(succ_row));
                arrows.push(TimelineArrow {
                    from: pred.id.clone(),
                    to: succ.id.clone(),
                    connector: self.geometry.connect(from, to),
                });
            }
        }
        arrows
    }
}

/// Depth-first walk: tasks, then the sub-steps of expanded tasks, then the
/// filtered action items of expanded sub-steps.
fn visible_items<'a>(
    items: &'a [ScheduleItem],
    expand: &ExpandState,
    filter: TimelineFilter,
) -> Vec<&'a ScheduleItem> {
    let mut children: HashMap<&str, Vec<&ScheduleItem>> = HashMap::new();
    for item in items {
        if let Some(parent) = item.parent_id.as_deref() {
            children.entry(parent).or_default().push(item);
        }
    }
    let kids = |parent: &ScheduleItem, kind: ItemType| -> Vec<&'a ScheduleItem> {
        children
            .get(parent.id.as_str())
            .map(|v| v.iter().copied().filter(|c| c.item_type == kind).collect())
            .unwrap_or_default()
    };

    let mut out = Vec::new();
    for task in items.iter().filter(|i| i.item_type == ItemType::Task) {
        out.push(task);
        if !expand.is_expanded(&task.id) {
            continue;
        }
        for step in kids(task, ItemType::Substep) {
            out.push(step);
            if !expand.is_expanded(&step.id) {
                continue;
            }
            out.extend(
                kids(step, ItemType::Actionitem)
                    .into_iter()
                    .filter(|a| filter.accepts(a)),
            );
        }
    }
    out
}

fn has_children(items: &[ScheduleItem], item: &ScheduleItem) -> bool {
    let child_type = match item.item_type {
        ItemType::Task => ItemType::Substep,
        ItemType::Substep => ItemType::Actionitem,
        ItemType::Actionitem => return false,
    };
    items
        .iter()
        .any(|c| c.item_type == child_type && c.parent_id.as_deref() == Some(item.id.as_str()))
}

fn violation(item: &ScheduleItem, dep: &ScheduleItem) -> Option<ViolationReason> {
    if item.item_type != dep.item_type {
        Some(ViolationReason::DifferentType)
    } else if item.parent_id != dep.parent_id {
        Some(ViolationReason::DifferentParent)
    } else {
        None
    }
}

/// Every dependency that breaks the same-type/same-parent rule.
pub fn check_dependencies(items: &[ScheduleItem]) -> Vec<DependencyViolation> {
    let by_id: HashMap<&str, &ScheduleItem> = items.iter().map(|i| (i.id.as_str(), i)).collect();
    let mut out = Vec::new();
    for item in items {
        for dep in &item.dependencies {
            let reason = match by_id.get(dep.as_str()) {
                None => Some(ViolationReason::UnknownItem),
                Some(other) => violation(item, other),
            };
            if let Some(reason) = reason {
                tracing::debug!(item = %item.id, dependency = %dep, ?reason, "dependency not drawn");
                out.push(DependencyViolation {
                    item: item.id.clone(),
                    dependency: dep.clone(),
                    reason,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_schedule;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn sample() -> Vec<ScheduleItem> {
        vec![
            ScheduleItem::new("t1", "Plan", ItemType::Task, None).with_dates(d(1, 1), d(1, 10)),
            ScheduleItem::new("s1", "Scope", ItemType::Substep, Some("t1")).with_dates(d(1, 1), d(1, 3)),
            ScheduleItem::new("s2", "Review", ItemType::Substep, Some("t1"))
                .with_dates(d(1, 4), d(1, 6))
                .depends_on("s1"),
            ScheduleItem::new("a1", "Draft", ItemType::Actionitem, Some("s1"))
                .with_dates(d(1, 1), d(1, 1))
                .with_progress(100.0),
            ScheduleItem::new("a2", "Send", ItemType::Actionitem, Some("s1"))
                .with_dates(d(1, 2), d(1, 2))
                .depends_on("a1"),
            ScheduleItem::new("t2", "Build", ItemType::Task, None)
                .with_dates(d(1, 11), d(1, 20))
                .depends_on("t1"),
        ]
    }

    fn ids(view: &TimelineView) -> Vec<&str> {
        view.rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn initial_state_shows_tasks_and_sub_steps() {
        let items = sample();
        let view = TimelineDeriver::default().derive(&items, &ExpandState::initial(&items), &TimelineOptions::default());
        assert_eq!(ids(&view), vec!["t1", "s1", "s2", "t2"]);
        assert!(view.row("t1").unwrap().expandable);
        assert!(view.row("s1").unwrap().expandable);
        assert!(!view.row("s2").unwrap().expandable);
    }

    #[test]
    fn expanding_a_sub_step_reveals_filtered_action_items() {
        let items = sample();
        let mut expand = ExpandState::initial(&items);
        expand.toggle("s1");
        let deriver = TimelineDeriver::default();

        let all = deriver.derive(&items, &expand, &TimelineOptions::default());
        assert_eq!(ids(&all), vec!["t1", "s1", "a1", "a2", "s2", "t2"]);
        assert_eq!(all.arrows.iter().filter(|a| a.to == "a2").count(), 1);

        let pending = deriver.derive(
            &items,
            &expand,
            &TimelineOptions {
                filter: TimelineFilter::PendingActionItems,
                ..Default::default()
            },
        );
        assert_eq!(ids(&pending), vec!["t1", "s1", "a2", "s2", "t2"]);
        // a1 is filtered out, so the arrow into a2 goes too.
        assert!(pending.arrows.iter().all(|a| a.from != "a1"));
    }

    #[test]
    fn collapsing_a_task_hides_descendants_and_their_arrows() {
        let items = sample();
        let before = items.clone();
        let mut expand = ExpandState::initial(&items);
        let deriver = TimelineDeriver::default();
        let open = deriver.derive(&items, &expand, &TimelineOptions::default());
        assert!(open.arrows.iter().any(|a| a.from == "s1" && a.to == "s2"));

        expand.toggle("t1");
        let closed = deriver.derive(&items, &expand, &TimelineOptions::default());
        assert_eq!(ids(&closed), vec!["t1", "t2"]);
        assert!(closed.arrows.iter().all(|a| a.from != "s1" && a.to != "s2"));
        assert!(closed.arrows.iter().any(|a| a.from == "t1" && a.to == "t2"));
        assert_eq!(items, before);
    }

    #[test]
    fn range_spans_all_items_with_padding() {
        let items = sample();
        let mut expand = ExpandState::default();
        expand.collapse_all();
        let view = TimelineDeriver::default().derive(&items, &expand, &TimelineOptions::default());
        assert_eq!(view.range, Some(DateRange { start: d(1, 1) - Duration::days(2), end: d(1, 22) }));
        assert_eq!(view.row("t1").unwrap().bar.unwrap().offset_x, 2.0 * 16.0);
    }

    #[test]
    fn override_narrows_bounds() {
        let items = sample();
        let view = TimelineDeriver::default().derive(
            &items,
            &ExpandState::initial(&items),
            &TimelineOptions {
                range_override: RangeOverride {
                    start: Some(d(1, 5)),
                    end: None,
                },
                ..Default::default()
            },
        );
        assert_eq!(view.range.unwrap().start, d(1, 3));
        // Bars before the override start hang off the left edge.
        assert!(view.row("s1").unwrap().bar.unwrap().offset_x < 0.0);
    }

    #[test]
    fn wider_override_does_not_stretch_the_axis() {
        let items = vec![ScheduleItem::new("t", "Plan", ItemType::Task, None).with_dates(d(1, 1), d(1, 10))];
        let view = TimelineDeriver::default().derive(
            &items,
            &ExpandState::initial(&items),
            &TimelineOptions {
                range_override: RangeOverride {
                    start: NaiveDate::from_ymd_opt(2023, 6, 1),
                    end: Some(d(12, 31)),
                },
                ..Default::default()
            },
        );
        let range = view.range.unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2023, 12, 30).unwrap());
        assert_eq!(range.end, d(1, 12));
        assert_eq!(range.total_days(), 14);
    }

    #[test]
    fn override_alone_sets_the_axis_for_undated_items() {
        let items = vec![ScheduleItem::new("u", "Undated", ItemType::Task, None)];
        let view = TimelineDeriver::default().derive(
            &items,
            &ExpandState::initial(&items),
            &TimelineOptions {
                range_override: RangeOverride {
                    start: Some(d(3, 1)),
                    end: Some(d(3, 5)),
                },
                ..Default::default()
            },
        );
        assert_eq!(view.range, Some(DateRange { start: d(2, 28), end: d(3, 7) }));
    }

    #[test]
    fn dates_at_the_calendar_edge_do_not_panic() {
        let items = vec![
            ScheduleItem::new("t", "Forever", ItemType::Task, None).with_dates(d(1, 1), NaiveDate::MAX),
            ScheduleItem::new("u", "Always", ItemType::Task, None).with_dates(NaiveDate::MIN, d(1, 1)),
        ];
        for zoom in ZoomLevel::ALL {
            let view = TimelineDeriver::default().derive(
                &items,
                &ExpandState::initial(&items),
                &TimelineOptions { zoom, ..Default::default() },
            );
            let range = view.range.unwrap();
            assert_eq!(range.start, NaiveDate::MIN);
            assert!(i64::from(range.total_days()) <= 3660 + 1 + 2 * 2);
        }
    }

    #[test]
    fn sentinel_end_date_keeps_the_header_bounded() {
        let items = parse_schedule(
            r#"[{"id": "t", "name": "Open ended", "type": "task", "start": "2024-01-01", "end": "9999-12-31"},
                {"id": "u", "name": "Far", "type": "task", "start": "2024-01-01", "end": "+262142-12-31"}]"#,
        )
        .unwrap();
        assert!(items.iter().all(|i| i.end.is_none()));

        let far = vec![ScheduleItem::new("t", "Open ended", ItemType::Task, None)
            .with_dates(d(1, 1), NaiveDate::from_ymd_opt(9999, 12, 31).unwrap())];
        let view = TimelineDeriver::default().derive(
            &far,
            &ExpandState::initial(&far),
            &TimelineOptions {
                zoom: ZoomLevel::Day,
                ..Default::default()
            },
        );
        assert!(view.headers.len() <= 3660 + 1 + 2 * 2);
        let sum: f32 = view.headers.iter().map(|h| h.width).sum();
        assert!((sum - view.width()).abs() < 1e-2);
    }

    #[test]
    fn degenerate_bars_keep_a_minimum_width() {
        let items = vec![
            ScheduleItem::new("t", "Inverted", ItemType::Task, None).with_dates(d(1, 5), d(1, 1)),
            ScheduleItem::new("u", "Undated", ItemType::Task, None),
        ];
        let view = TimelineDeriver::default().derive(&items, &ExpandState::initial(&items), &TimelineOptions::default());
        assert_eq!(view.row("t").unwrap().bar.unwrap().width, 6.0);
        assert_eq!(view.row("u").unwrap().bar, None);
        assert_eq!(view.rows.len(), 2);
    }

    #[test]
    fn nothing_dated_means_no_axis() {
        let items = vec![ScheduleItem::new("t", "Undated", ItemType::Task, None)];
        let view = TimelineDeriver::default().derive(&items, &ExpandState::initial(&items), &TimelineOptions::default());
        assert_eq!(view.range, None);
        assert!(view.headers.is_empty());
        assert_eq!(view.width(), 0.0);
    }

    #[test]
    fn cross_parent_and_unknown_dependencies_are_reported_not_drawn() {
        let mut items = sample();
        items.push(ScheduleItem::new("s3", "Other", ItemType::Substep, Some("t2")).with_dates(d(1, 12), d(1, 13)));
        items[1].dependencies.push("s3".into());
        items[1].dependencies.push("ghost".into());
        items[5].dependencies.push("s2".into());

        let mut expand = ExpandState::initial(&items);
        expand.expand_all(&items);
        let view = TimelineDeriver::default().derive(&items, &expand, &TimelineOptions::default());

        let reasons: Vec<ViolationReason> = view.violations.iter().map(|v| v.reason).collect();
        assert_eq!(
            reasons,
            vec![
                ViolationReason::DifferentParent,
                ViolationReason::UnknownItem,
                ViolationReason::DifferentType
            ]
        );
        assert!(view.arrows.iter().all(|a| a.from != "s3"));
        assert!(view.arrows.iter().all(|a| !(a.from == "s2" && a.to == "t2")));
    }

    #[test]
    fn orphans_are_not_rendered() {
        let items = vec![
            ScheduleItem::new("t", "Task", ItemType::Task, None),
            ScheduleItem::new("s", "Lost", ItemType::Substep, Some("missing")),
            ScheduleItem::new("a", "Skips a level", ItemType::Actionitem, Some("t")),
        ];
        let mut expand = ExpandState::default();
        expand.expand_all(&items);
        let view = TimelineDeriver::default().derive(&items, &expand, &TimelineOptions::default());
        assert_eq!(ids(&view), vec!["t"]);
        assert!(!view.row("t").unwrap().expandable);
    }

    #[test]
    fn headers_cover_the_whole_width() {
        let items = sample();
        for zoom in ZoomLevel::ALL {
            let view = TimelineDeriver::default().derive(
                &items,
                &ExpandState::initial(&items),
                &TimelineOptions { zoom, ..Default::default() },
            );
            let sum: f32 = view.headers.iter().map(|h| h.width).sum();
            assert!((sum - view.width()).abs() < 1e-3);
        }
    }
}
