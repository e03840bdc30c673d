use chrono::{Datelike, Duration, NaiveDate, Weekday};
use planflow::geometry::ConnectorStyle;
use planflow::model::{ItemType, ScheduleItem};
use planflow::timeline::{
    buckets, ExpandState, TimelineConfig, TimelineDeriver, TimelineOptions, ZoomLevel, ZoomWidths,
};
use proptest::prelude::*;

fn zoom_strategy() -> impl Strategy<Value = ZoomLevel> {
    prop_oneof![Just(ZoomLevel::Day), Just(ZoomLevel::Week), Just(ZoomLevel::Month)]
}

fn start_strategy() -> impl Strategy<Value = NaiveDate> {
    // 2020-01-01 plus up to ~8 years.
    (0i64..3000).prop_map(|d| NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(d))
}

fn assert_contiguous(start: NaiveDate, total_days: u32, zoom: ZoomLevel) -> Result<(), TestCaseError> {
    let day_width = ZoomWidths::default().day_width(zoom);
    let b = buckets(start, total_days, zoom, day_width);
    let sum: f32 = b.iter().map(|x| x.width).sum();
    let total = total_days as f32 * day_width;
    prop_assert!((sum - total).abs() < 0.01, "{:?}: {} != {}", zoom, sum, total);
    prop_assert_eq!(b.iter().map(|x| x.days).sum::<u32>(), total_days);

    let mut x = 0.0;
    for bucket in &b {
        prop_assert!((bucket.offset_x - x).abs() < 0.01);
        x += bucket.width;
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_bucket_widths_sum_to_timeline_width(
        start in start_strategy(),
        zoom in zoom_strategy(),
        total_days in 0u32..800,
    ) {
        assert_contiguous(start, total_days, zoom)?;
    }

    #[test]
    fn prop_week_buckets_open_on_monday(start in start_strategy(), total_days in 1u32..120) {
        let b = buckets(start, total_days, ZoomLevel::Week, 16.0);
        for bucket in b.iter().skip(1) {
            prop_assert_eq!(bucket.start.weekday(), Weekday::Mon);
            prop_assert!(bucket.days <= 7);
        }
    }

    #[test]
    fn prop_collapsing_never_reveals_rows(
        task_count in 1usize..5,
        steps_per_task in 0usize..4,
        collapsed in proptest::collection::vec(any::<bool>(), 5),
    ) {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut items = Vec::new();
        for t in 0..task_count {
            let tid = format!("t{t}");
            items.push(ScheduleItem::new(tid.clone(), "task", ItemType::Task, None)
                .with_dates(base, base + Duration::days(5)));
            for s in 0..steps_per_task {
                let sid = format!("t{t}s{s}");
                let mut step = ScheduleItem::new(sid.clone(), "step", ItemType::Substep, Some(tid.as_str()))
                    .with_dates(base, base + Duration::days(2));
                if s > 0 {
                    step = step.depends_on(format!("t{t}s{}", s - 1));
                }
                items.push(step);
                items.push(ScheduleItem::new(format!("{sid}a"), "action", ItemType::Actionitem, Some(sid.as_str())));
            }
        }
        let before = items.clone();

        let deriver = TimelineDeriver::new(TimelineConfig::default(), ConnectorStyle::default());
        let options = TimelineOptions::default();
        let mut expand = ExpandState::initial(&items);
        expand.expand_all(&items);
        let full = deriver.derive(&items, &expand, &options);

        for (t, &hide) in collapsed.iter().enumerate().take(task_count) {
            if hide {
                expand.collapse(&format!("t{t}"));
            }
        }
        let partial = deriver.derive(&items, &expand, &options);

        prop_assert_eq!(items, before);
        prop_assert!(partial.rows.len() <= full.rows.len());
        for (t, &hide) in collapsed.iter().enumerate().take(task_count) {
            let prefix = format!("t{t}s");
            let hidden = partial.rows.iter().all(|r| !r.id.starts_with(&prefix));
            if hide {
                prop_assert!(hidden);
                prop_assert!(partial.arrows.iter().all(|a| !a.from.starts_with(&prefix) && !a.to.starts_with(&prefix)));
            }
        }
        for (i, row) in partial.rows.iter().enumerate() {
            prop_assert_eq!(row.row_index, i);
        }
    }
}

#[test]
fn bucket_sums_for_one_month_and_year_ranges() {
    let start = NaiveDate::from_ymd_opt(2024, 2, 14).unwrap();
    for zoom in ZoomLevel::ALL {
        for days in [1, 30, 365] {
            assert_contiguous(start, days, zoom).unwrap();
        }
    }
}
