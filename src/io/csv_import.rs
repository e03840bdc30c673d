use std::path::Path;

use crate::error::ImportError;
use crate::model::schedule::{RawScheduleItem, ScheduleItem};

/// Map a status word to percent complete.
fn status_to_progress(status: &str) -> Option<f64> {
    match status.trim().to_lowercase().as_str() {
        "finished" | "done" | "complete" | "completed" => Some(100.0),
        "in progress" | "in-progress" | "active" | "started" => Some(50.0),
        "released" | "planned" => Some(25.0),
        "not started" | "not-started" | "new" | "todo" => Some(0.0),
        _ => None,
    }
}

/// Detect delimiter by checking the first line for common separators.
fn detect_delimiter(first_line: &str) -> u8 {
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    let tabs = first_line.matches('\t').count();

    if semicolons >= commas && semicolons >= tabs {
        b';'
    } else if tabs >= commas {
        b'\t'
    } else {
        b','
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Id,
    Name,
    Type,
    Parent,
    Start,
    End,
    Progress,
    Dependencies,
}

/// Map a header to a column, accepting the usual spellings.
fn header_to_col(header: &str) -> Option<Column> {
    let normalized = header.trim().to_lowercase().replace([' ', '-', '_'], "");
    match normalized.as_str() {
        "id" | "key" | "itemid" => Some(Column::Id),
        "name" | "title" | "label" | "task" | "taskname" => Some(Column::Name),
        "type" | "kind" | "level" => Some(Column::Type),
        "parent" | "parentid" => Some(Column::Parent),
        "start" | "startdate" | "from" | "begin" => Some(Column::Start),
        "end" | "enddate" | "to" | "finish" | "due" | "duedate" => Some(Column::End),
        "progress" | "status" | "done" | "percent" => Some(Column::Progress),
        "dependencies" | "deps" | "dependson" | "predecessors" => Some(Column::Dependencies),
        _ => None,
    }
}

/// Import schedule items from a CSV file.
///
/// Auto-detects delimiter (comma, semicolon, tab) and matches headers
/// flexibly. Dependencies are separated by `|` or whitespace.
/// Returns `(items, skipped_count)` on success.
pub fn import_csv(path: &Path) -> Result<(Vec<ScheduleItem>, usize), ImportError> {
    let content = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let result = parse_csv(&content)?;
    tracing::info!(path = %path.display(), items = result.0.len(), skipped = result.1, "schedule imported");
    Ok(result)
}

pub fn parse_csv(content: &str) -> Result<(Vec<ScheduleItem>, usize), ImportError> {
    let first_line = content.lines().next().unwrap_or("");
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(first_line))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let col_map: Vec<Option<Column>> = headers.iter().map(header_to_col).collect();

    if !col_map.contains(&Some(Column::Id)) || !col_map.contains(&Some(Column::Type)) {
        return Err(ImportError::MissingColumns {
            found: headers.iter().map(str::to_string).collect(),
        });
    }

    let mut items: Vec<ScheduleItem> = Vec::new();
    let mut skipped = 0usize;

    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(row = i + 2, error = %e, "skipping CSV row");
                skipped += 1;
                continue;
            }
        };

        let mut raw = RawScheduleItem::default();
        for (field, col) in record.iter().zip(col_map.iter()) {
            let value = Some(field.to_string()).filter(|v| !v.is_empty());
            match col {
                Some(Column::Id) => raw.id = value,
                Some(Column::Name) => raw.name = value,
                Some(Column::Type) => raw.item_type = value,
                Some(Column::Parent) => raw.parent_id = value,
                Some(Column::Start) => raw.start = value,
                Some(Column::End) => raw.end = value,
                Some(Column::Progress) => {
                    raw.progress = value
                        .as_deref()
                        .and_then(|v| {
                            v.trim_end_matches('%')
                                .parse::<f64>()
                                .ok()
                                .or_else(|| status_to_progress(v))
                        })
                        .and_then(serde_json::Number::from_f64)
                        .map(serde_json::Value::Number);
                }
                Some(Column::Dependencies) => {
                    raw.dependencies = value.map(|v| {
                        v.split(|c: char| c == '|' || c.is_whitespace())
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect()
                    });
                }
                None => {}
            }
        }

        match ScheduleItem::from_raw(raw) {
            Some(item) if !items.iter().any(|other| other.id == item.id) => items.push(item),
            _ => {
                tracing::debug!(row = i + 2, "skipping CSV row without usable id or type");
                skipped += 1;
            }
        }
    }

    if items.is_empty() {
        return Err(ImportError::NoItems { skipped });
    }
    Ok((items, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemType;

    #[test]
    fn semicolon_file_with_loose_headers() {
        let csv = "Item ID;Title;Kind;Parent ID;Start Date;Due;Status;Depends On\n\
                   t1;Design;task;;2024-01-01;2024-01-05;done;\n\
                   s1;Sketch;substep;t1;01/01/2024;02/01/2024;40%;\n\
                   s2;Review;substep;t1;2024-01-03;2024-01-04;;s1\n\
                   ;No id;task;;;;;\n";
        let (items, skipped) = parse_csv(csv).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(skipped, 1);
        assert_eq!(items[0].progress, 100.0);
        assert_eq!(items[1].progress, 40.0);
        assert_eq!(items[1].parent_id.as_deref(), Some("t1"));
        assert_eq!(items[2].item_type, ItemType::Substep);
        assert_eq!(items[2].dependencies, vec!["s1".to_string()]);
    }

    #[test]
    fn comma_file_with_multiple_dependencies() {
        let csv = "id,name,type,parent,dependencies\n\
                   a,A,task,,\n\
                   b,B,task,,a\n\
                   c,C,task,,a|b\n";
        let (items, _) = parse_csv(csv).unwrap();
        assert_eq!(items[2].dependencies, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn missing_required_columns() {
        let err = parse_csv("name;start;end\nx;2024-01-01;2024-01-02\n").unwrap_err();
        assert!(matches!(err, ImportError::MissingColumns { .. }));
    }

    #[test]
    fn header_only_file_has_no_items() {
        let err = parse_csv("id;type\n").unwrap_err();
        assert!(matches!(err, ImportError::NoItems { skipped: 0 }));
    }

    #[test]
    fn export_then_import() {
        let csv = "id;name;type;parent;start;end;progress;dependencies\n\
                   t1;One;task;;2024-01-01;2024-01-02;10;\n\
                   t2;Two;task;;2024-01-03;2024-01-04;0;t1\n";
        let (items, _) = parse_csv(csv).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        assert_eq!(crate::io::csv_export::export_csv(&items, &path).unwrap(), 2);
        let (back, skipped) = import_csv(&path).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(back, items);
    }
}
