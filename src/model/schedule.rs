use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// Level of a schedulable row in the plan hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Task,
    Substep,
    Actionitem,
}

impl ItemType {
    /// Accepts the spellings collaborators actually send.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-', '_'], "").as_str() {
            "task" => Some(Self::Task),
            "substep" | "step" => Some(Self::Substep),
            "actionitem" | "action" => Some(Self::Actionitem),
            _ => None,
        }
    }

    pub fn depth(self) -> usize {
        match self {
            Self::Task => 0,
            Self::Substep => 1,
            Self::Actionitem => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Substep => "substep",
            Self::Actionitem => "actionitem",
        }
    }
}

/// One row of the timeline.
///
/// Dates are optional: an item whose dates are missing or unparsable is kept
/// in the hierarchy but cannot be placed on the time axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub parent_id: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Percent complete, clamped to `0..=100`.
    pub progress: f32,
    pub dependencies: Vec<String>,
}

impl ScheduleItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        item_type: ItemType,
        parent_id: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            item_type,
            parent_id: parent_id.map(str::to_string),
            start: None,
            end: None,
            progress: 0.0,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_progress(mut self, progress: f32) -> Self {
        self.progress = clamp_progress(progress);
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    pub fn dates(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.start?, self.end?))
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 100.0
    }

    /// Build an item from loosely typed input. Returns `None` when the item
    /// cannot take part in the hierarchy at all (no id, unknown type).
    pub fn from_raw(raw: RawScheduleItem) -> Option<Self> {
        let id = raw.id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let Some(id) = id else {
            tracing::debug!("dropping schedule item without id");
            return None;
        };
        let Some(item_type) = raw.item_type.as_deref().and_then(ItemType::parse) else {
            tracing::debug!(%id, kind = ?raw.item_type, "dropping schedule item with unknown type");
            return None;
        };

        let parent_id = match item_type {
            // Only tasks sit at the root.
            ItemType::Task => None,
            _ => raw.parent_id.filter(|p| !p.trim().is_empty()),
        };

        let start = raw.start.as_deref().and_then(parse_date);
        let end = raw.end.as_deref().and_then(parse_date);
        if (raw.start.is_some() && start.is_none()) || (raw.end.is_some() && end.is_none()) {
            tracing::debug!(%id, "unparsable date; item will not be placed on the timeline");
        }

        let progress = raw
            .progress
            .as_ref()
            .and_then(|v| match v {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
                _ => None,
            })
            .map(|p| clamp_progress(p as f32))
            .unwrap_or(0.0);

        let mut dependencies: Vec<String> = Vec::new();
        for dep in raw.dependencies.unwrap_or_default() {
            let dep = dep.trim().to_string();
            if !dep.is_empty() && dep != id && !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }

        Some(Self {
            name: raw.name.unwrap_or_else(|| id.clone()),
            id,
            item_type,
            parent_id,
            start,
            end,
            progress,
            dependencies,
        })
    }
}

fn clamp_progress(p: f32) -> f32 {
    if p.is_finite() {
        p.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Wire shape of a schedulable item as collaborators send it. Every field is
/// optional so one bad item never rejects the whole list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawScheduleItem {
    pub id: Option<String>,
    pub name: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub progress: Option<serde_json::Value>,
    pub dependencies: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub parent_id: Option<String>,
}

/// Turn arbitrary JSON values into items, skipping anything malformed.
pub fn items_from_values(values: Vec<serde_json::Value>) -> Vec<ScheduleItem> {
    let mut items: Vec<ScheduleItem> = Vec::with_capacity(values.len());
    for value in values {
        let raw = match serde_json::from_value::<RawScheduleItem>(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed schedule item");
                continue;
            }
        };
        if let Some(item) = ScheduleItem::from_raw(raw) {
            if items.iter().any(|i| i.id == item.id) {
                tracing::debug!(id = %item.id, "skipping duplicate schedule item id");
                continue;
            }
            items.push(item);
        }
    }
    items
}

/// `deserialize_with` helper for lists of schedule items.
pub fn deserialize_items<'de, D>(deserializer: D) -> Result<Vec<ScheduleItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Vec<serde_json::Value> = Deserialize::deserialize(deserializer)?;
    Ok(items_from_values(values))
}

/// Years a schedule date may fall in. Anything outside is a placeholder
/// such as `9999-12-31` and is treated as no date.
pub const DATE_YEARS: RangeInclusive<i32> = 1900..=2199;

/// Try parsing a date string with several common formats, ISO first.
///
/// Dates outside [`DATE_YEARS`] are rejected.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // Full timestamps: keep the date part.
    let s = s.split('T').next().unwrap_or(s);
    for fmt in &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return DATE_YEARS.contains(&d.year()).then_some(d);
        }
    }
    None
}
