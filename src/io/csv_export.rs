use std::path::Path;

use crate::error::ImportError;
use crate::model::ScheduleItem;

/// Export schedule items to a semicolon-delimited CSV file matching the import format.
///
/// Columns: Id ; Name ; Type ; Parent ; Start ; End ; Progress ; Dependencies
/// Dates are ISO (`YYYY-MM-DD`), dependencies are `|`-separated.
/// Returns the number of items written.
pub fn export_csv(items: &[ScheduleItem], path: &Path) -> Result<usize, ImportError> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_path(path)?;

    wtr.write_record([
        "Id",
        "Name",
        "Type",
        "Parent",
        "Start",
        "End",
        "Progress",
        "Dependencies",
    ])?;

    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
    for item in items {
        let record = [
            item.id.clone(),
            item.name.clone(),
            item.item_type.label().to_string(),
            item.parent_id.clone().unwrap_or_default(),
            date(item.start),
            date(item.end),
            format!("{}", item.progress),
            item.dependencies.join("|"),
        ];
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(|source| ImportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), count = items.len(), "schedule exported");
    Ok(items.len())
}
