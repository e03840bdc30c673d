use std::path::Path;

use crate::error::ImportError;
use crate::model::schedule::{items_from_values, ScheduleItem};
use crate::model::{Plan, Project};

/// Save a project to a JSON file.
pub fn save_project(project: &Project, path: &Path) -> Result<(), ImportError> {
    let json = serde_json::to_string_pretty(project)?;
    std::fs::write(path, json).map_err(|source| ImportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "project saved");
    Ok(())
}

/// Load a project from a JSON file.
pub fn load_project(path: &Path) -> Result<Project, ImportError> {
    let project: Project = serde_json::from_str(&read(path)?)?;
    tracing::info!(
        path = %path.display(),
        tasks = project.plan.tasks.len(),
        items = project.schedule.len(),
        "project loaded"
    );
    Ok(project)
}

/// Parse a plan hierarchy as produced by the planning service.
pub fn parse_plan(json: &str) -> Result<Plan, ImportError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_plan(path: &Path) -> Result<Plan, ImportError> {
    parse_plan(&read(path)?)
}

/// Parse a schedule: either a bare array of items or `{"items": [...]}`.
/// Individual malformed items are skipped, not fatal.
pub fn parse_schedule(json: &str) -> Result<Vec<ScheduleItem>, ImportError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let values = match value {
        serde_json::Value::Array(values) => values,
        serde_json::Value::Object(mut map) => match map.remove("items") {
            Some(serde_json::Value::Array(values)) => values,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    Ok(items_from_values(values))
}

pub fn load_schedule(path: &Path) -> Result<Vec<ScheduleItem>, ImportError> {
    parse_schedule(&read(path)?)
}

fn read(path: &Path) -> Result<String, ImportError> {
    std::fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemType;

    #[test]
    fn schedule_accepts_both_shapes() {
        let bare = parse_schedule(r#"[{"id": "t", "type": "task"}]"#).unwrap();
        let wrapped = parse_schedule(r#"{"items": [{"id": "t", "type": "task"}]}"#).unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare[0].item_type, ItemType::Task);
        assert!(parse_schedule(r#"{"other": 1}"#).unwrap().is_empty());
        assert!(matches!(parse_schedule("[oops"), Err(ImportError::Json(_))));
    }

    #[test]
    fn project_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.plan.json");

        let mut project = Project::new("Demo");
        project.plan = parse_plan(r#"{"goal": "g", "tasks": [{"id": "t1", "title": "One"}]}"#).unwrap();
        project.schedule = parse_schedule(
            r#"[{"id": "t1", "name": "One", "type": "task", "start": "2024-05-01", "end": "2024-05-02"}]"#,
        )
        .unwrap();
        save_project(&project, &path).unwrap();

        let loaded = load_project(&path).unwrap();
        assert_eq!(loaded.plan, project.plan);
        assert_eq!(loaded.schedule, project.schedule);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_project(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
