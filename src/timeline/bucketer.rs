use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// More days than separate the ends of the calendar.
const MAX_DAY_OFFSET: i64 = 1 << 30;

/// Granularity of the timeline header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZoomLevel {
    Day,
    #[default]
    Week,
    Month,
}

impl ZoomLevel {
    pub const ALL: [ZoomLevel; 3] = [ZoomLevel::Day, ZoomLevel::Week, ZoomLevel::Month];

    /// One step towards `Day`; stays put at the finest level.
    pub fn zoom_in(self) -> Self {
        match self {
            Self::Day | Self::Week => Self::Day,
            Self::Month => Self::Week,
        }
    }

    /// One step towards `Month`; stays put at the coarsest level.
    pub fn zoom_out(self) -> Self {
        match self {
            Self::Day => Self::Week,
            Self::Week | Self::Month => Self::Month,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Day => "Days",
            Self::Week => "Weeks",
            Self::Month => "Months",
        }
    }
}

/// Pixels per day at each zoom level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomWidths {
    pub day: f32,
    pub week: f32,
    pub month: f32,
}

impl Default for ZoomWidths {
    fn default() -> Self {
        Self {
            day: 40.0,
            week: 16.0,
            month: 5.0,
        }
    }
}

impl ZoomWidths {
    pub fn day_width(&self, zoom: ZoomLevel) -> f32 {
        match zoom {
            ZoomLevel::Day => self.day,
            ZoomLevel::Week => self.week,
            ZoomLevel::Month => self.month,
        }
    }
}

/// Date ↔ pixel mapping shared by headers, bars and dependency arrows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    pub start: NaiveDate,
    pub day_width: f32,
}

impl TimeScale {
    pub fn new(start: NaiveDate, day_width: f32) -> Self {
        Self { start, day_width }
    }

    /// Convert a date to an x-pixel offset from the scale start.
    pub fn date_to_x(&self, date: NaiveDate) -> f32 {
        (date - self.start).num_days() as f32 * self.day_width
    }

    /// Convert an x-pixel offset back to a date, saturating at the calendar ends.
    pub fn x_to_date(&self, x: f32) -> NaiveDate {
        let days = ((x / self.day_width).floor() as i64).clamp(-MAX_DAY_OFFSET, MAX_DAY_OFFSET);
        let fallback = if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX };
        self.start
            .checked_add_signed(Duration::days(days))
            .unwrap_or(fallback)
    }
}

/// One header segment of the time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderBucket {
    pub label: String,
    pub start: NaiveDate,
    pub days: u32,
    pub offset_x: f32,
    pub width: f32,
}

#[derive(PartialEq)]
enum BucketKey {
    Day(NaiveDate),
    Week(chrono::IsoWeek),
    Month(i32, u32),
}

fn key(date: NaiveDate, zoom: ZoomLevel) -> BucketKey {
    match zoom {
        ZoomLevel::Day => BucketKey::Day(date),
        ZoomLevel::Week => BucketKey::Week(date.iso_week()),
        ZoomLevel::Month => BucketKey::Month(date.year(), date.month()),
    }
}

fn label(date: NaiveDate, zoom: ZoomLevel) -> String {
    match zoom {
        ZoomLevel::Day => date.format("%a %d").to_string(),
        ZoomLevel::Week => date.format("W%V %G").to_string(),
        ZoomLevel::Month => date.format("%b %Y").to_string(),
    }
}

/// Split `total_days` starting at `start` into header buckets.
///
/// Edge buckets may be partial (a range starting on a Wednesday opens with a
/// five-day week); widths always add up to `total_days * day_width`.
pub fn buckets(start: NaiveDate, total_days: u32, zoom: ZoomLevel, day_width: f32) -> Vec<HeaderBucket> {
    let mut out: Vec<HeaderBucket> = Vec::new();
    let mut current: Option<BucketKey> = None;

    for offset in 0..total_days {
        let Some(date) = start.checked_add_signed(Duration::days(i64::from(offset))) else {
            break;
        };
        let k = key(date, zoom);
        if current.as_ref() == Some(&k) {
            if let Some(bucket) = out.last_mut() {
                bucket.days += 1;
                bucket.width = bucket.days as f32 * day_width;
                continue;
            }
        }
        out.push(HeaderBucket {
            label: label(date, zoom),
            start: date,
            days: 1,
            offset_x: offset as f32 * day_width,
            width: day_width,
        });
        current = Some(k);
    }
    out
}
