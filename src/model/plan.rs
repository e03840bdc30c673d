use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::graph::{GraphModel, Node, NodeId, Point};

/// Smallest unit of work under a sub-step. Not part of any graph level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubStep {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "nextStepIds", alias = "nextIds")]
    pub next_sub_step_ids: Vec<String>,
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTask {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "nextIds")]
    pub next_task_ids: Vec<String>,
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default, alias = "steps")]
    pub sub_steps: Vec<SubStep>,
}

/// Goal decomposed into tasks → sub-steps → action items.
///
/// Tasks form one graph level; the sub-steps of each task form another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub tasks: Vec<PlanTask>,
}

/// Which graph the canvas is showing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Tasks,
    SubSteps(String),
}

impl Plan {
    pub fn task(&self, id: &str) -> Option<&PlanTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// The task level as a graph. Links to unknown ids are dropped.
    pub fn task_graph(&self) -> GraphModel {
        build_graph(
            self.tasks
                .iter()
                .map(|t| (&t.id, &t.title, t.position, &t.next_task_ids)),
        )
    }

    /// The sub-step level of one task. Empty if the task does not exist.
    pub fn sub_step_graph(&self, task_id: &str) -> GraphModel {
        match self.task(task_id) {
            Some(task) => build_graph(
                task.sub_steps
                    .iter()
                    .map(|s| (&s.id, &s.title, s.position, &s.next_sub_step_ids)),
            ),
            None => GraphModel::new(),
        }
    }

    pub fn graph_for(&self, level: &Level) -> GraphModel {
        match level {
            Level::Tasks => self.task_graph(),
            Level::SubSteps(task_id) => self.sub_step_graph(task_id),
        }
    }

    /// Write positions, titles and edge lists from the task graph back.
    /// Tasks missing from the graph are removed from the plan; cards that are
    /// new to the plan are appended.
    pub fn apply_task_graph(&mut self, graph: &GraphModel) {
        self.tasks.retain(|t| graph.contains(&NodeId::from(t.id.as_str())));
        for node in graph.nodes() {
            let next = edge_list(node);
            match self.tasks.iter_mut().find(|t| t.id == node.id.as_str()) {
                Some(task) => {
                    task.title = node.title.clone();
                    task.position = node.position;
                    task.next_task_ids = next;
                }
                None => self.tasks.push(PlanTask {
                    id: node.id.to_string(),
                    title: node.title.clone(),
                    next_task_ids: next,
                    position: node.position,
                    sub_steps: Vec::new(),
                }),
            }
        }
    }

    /// Sub-step counterpart of [`Plan::apply_task_graph`].
    pub fn apply_sub_step_graph(&mut self, task_id: &str, graph: &GraphModel) {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            return;
        };
        task.sub_steps
            .retain(|s| graph.contains(&NodeId::from(s.id.as_str())));
        for node in graph.nodes() {
            let next = edge_list(node);
            match task.sub_steps.iter_mut().find(|s| s.id == node.id.as_str()) {
                Some(step) => {
                    step.title = node.title.clone();
                    step.position = node.position;
                    step.next_sub_step_ids = next;
                }
                None => task.sub_steps.push(SubStep {
                    id: node.id.to_string(),
                    title: node.title.clone(),
                    next_sub_step_ids: next,
                    position: node.position,
                    action_items: Vec::new(),
                }),
            }
        }
    }

    pub fn apply_graph(&mut self, level: &Level, graph: &GraphModel) {
        match level {
            Level::Tasks => self.apply_task_graph(graph),
            Level::SubSteps(task_id) => self.apply_sub_step_graph(task_id, graph),
        }
    }
}

fn edge_list(node: &Node) -> Vec<String> {
    node.outgoing.iter().map(|id| id.to_string()).collect()
}

fn build_graph<'a>(
    entries: impl Iterator<Item = (&'a String, &'a String, Option<Point>, &'a Vec<String>)> + Clone,
) -> GraphModel {
    let mut graph = GraphModel::new();
    for (id, title, position, _) in entries.clone() {
        let mut node = Node::new(id.as_str(), title.as_str());
        node.position = position;
        if !graph.add_node(node) {
            tracing::debug!(%id, "duplicate card id in plan; keeping the first");
        }
    }
    // Edges after all cards exist so forward references resolve.
    let mut seen = BTreeSet::new();
    for (id, _, _, next) in entries {
        if !seen.insert(id) {
            continue;
        }
        let from = NodeId::from(id.as_str());
        for target in next {
            let to = NodeId::from(target.as_str());
            if !graph.add_edge(&from, &to) && !graph.has_edge(&from, &to) {
                tracing::debug!(%from, %to, "dropping link to unknown or same card");
            }
        }
    }
    graph
}
