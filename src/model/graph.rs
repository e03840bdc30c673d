use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::layout::Layout;

/// Stable identifier of a card (task or sub-step) within one graph level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id for a card created in the UI.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A point in canvas (or timeline) space, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Measured size of a card, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// The host's ability to report how large a card is once it has been drawn.
///
/// Layout never guesses sizes: callers provide this before running it.
pub trait Measure {
    fn measure(&self, id: &NodeId) -> Option<Size>;
}

impl<F> Measure for F
where
    F: Fn(&NodeId) -> Option<Size>,
{
    fn measure(&self, id: &NodeId) -> Option<Size> {
        self(id)
    }
}

/// A single card on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub title: String,
    /// Last measured size; `None` until the surface has drawn the card.
    #[serde(default)]
    pub size: Option<Size>,
    /// `None` until the first layout pass (or a drag) places the card.
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub outgoing: BTreeSet<NodeId>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            size: None,
            position: None,
            outgoing: BTreeSet::new(),
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Some(Size::new(width, height));
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Point::new(x, y));
        self
    }
}

/// All cards of one level (the tasks of a plan, or the sub-steps of one task).
///
/// Every operation is total: unknown ids are ignored and self-edges are refused.
/// Node order is insertion order and is what layout uses to break ties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "GraphRecord")]
pub struct GraphModel {
    nodes: Vec<Node>,
    #[serde(skip)]
    index: HashMap<NodeId, usize>,
}

/// Stored form of a graph, replayed through `add_node`/`add_edge` on load so
/// duplicate ids, self-edges and dangling targets never get in.
#[derive(Deserialize)]
struct GraphRecord {
    #[serde(default)]
    nodes: Vec<Node>,
}

impl From<GraphRecord> for GraphModel {
    fn from(record: GraphRecord) -> Self {
        let mut graph = GraphModel::new();
        let mut edges = Vec::new();
        for mut node in record.nodes {
            let outgoing = std::mem::take(&mut node.outgoing);
            let id = node.id.clone();
            if graph.add_node(node) {
                edges.extend(outgoing.into_iter().map(|to| (id.clone(), to)));
            } else {
                tracing::debug!(node = %id, "duplicate card id dropped on load");
            }
        }
        for (from, to) in edges {
            graph.add_edge(&from, &to);
        }
        graph
    }
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.position_of(id).map(|i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Insert a card. Returns `false` (and changes nothing) if the id is taken.
    ///
    /// Outgoing references to cards that are not (yet) in the graph are kept
    /// out, as are self references.
    pub fn add_node(&mut self, mut node: Node) -> bool {
        if self.contains(&node.id) {
            return false;
        }
        let own_id = node.id.clone();
        node.outgoing
            .retain(|target| *target != own_id && self.contains(target));
        self.index.insert(own_id, self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Remove a card and every edge pointing at it.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        let idx = self.position_of(id)?;
        let removed = self.nodes.remove(idx);
        for node in &mut self.nodes {
            node.outgoing.remove(id);
        }
        self.reindex();
        Some(removed)
    }

    /// Add the edge `from → to`. Self-edges, unknown ids and duplicates are no-ops.
    /// Returns `true` only if a new edge was created.
    pub fn add_edge(&mut self, from: &NodeId, to: &NodeId) -> bool {
        if from == to || !self.contains(to) {
            return false;
        }
        match self.position_of(from) {
            Some(idx) => self.nodes[idx].outgoing.insert(to.clone()),
            None => false,
        }
    }

    /// Remove the edge `from → to`. Returns `true` if it existed.
    pub fn remove_edge(&mut self, from: &NodeId, to: &NodeId) -> bool {
        match self.position_of(from) {
            Some(idx) => self.nodes[idx].outgoing.remove(to),
            None => false,
        }
    }

    pub fn has_edge(&self, from: &NodeId, to: &NodeId) -> bool {
        self.node(from)
            .map(|n| n.outgoing.contains(to))
            .unwrap_or(false)
    }

    pub fn set_position(&mut self, id: &NodeId, point: Point) {
        if let Some(idx) = self.position_of(id) {
            self.nodes[idx].position = Some(point);
        }
    }

    pub fn set_size(&mut self, id: &NodeId, size: Size) {
        if let Some(idx) = self.position_of(id) {
            self.nodes[idx].size = Some(size);
        }
    }

    pub fn set_title(&mut self, id: &NodeId, title: impl Into<String>) {
        if let Some(idx) = self.position_of(id) {
            self.nodes[idx].title = title.into();
        }
    }

    /// All edges as `(source, target)` pairs, in node order then target order.
    pub fn edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> + '_ {
        self.nodes
            .iter()
            .flat_map(|n| n.outgoing.iter().map(move |t| (&n.id, t)))
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.outgoing.len()).sum()
    }

    pub fn successors(&self, id: &NodeId) -> Vec<&NodeId> {
        self.node(id)
            .map(|n| n.outgoing.iter().collect())
            .unwrap_or_default()
    }

    pub fn predecessors(&self, id: &NodeId) -> Vec<&NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.outgoing.contains(id))
            .map(|n| &n.id)
            .collect()
    }

    /// Ids of cards that have no position yet.
    pub fn unplaced(&self) -> Vec<&NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.position.is_none())
            .map(|n| &n.id)
            .collect()
    }

    /// Write a layout result back into the graph.
    ///
    /// Cards the layout did not place (e.g. added after the snapshot was taken)
    /// are put in a fallback slot below the laid-out area, one per row in
    /// insertion order, so the canvas never holds an unplaced card.
    pub fn apply_layout(&mut self, layout: &Layout) {
        let mut fallback_y = layout.canvas.height;
        for node in &mut self.nodes {
            match layout.position(&node.id) {
                Some(p) => node.position = Some(p),
                None => {
                    let height = node.size.map(|s| s.height).unwrap_or(0.0);
                    node.position = Some(Point::new(layout.margin, fallback_y));
                    fallback_y += height + layout.margin;
                    tracing::debug!(node = %node.id, "card missing from layout; using fallback slot");
                }
            }
        }
    }

    fn position_of(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
    }
}

impl Measure for GraphModel {
    fn measure(&self, id: &NodeId) -> Option<Size> {
        self.node(id).and_then(|n| n.size)
    }
}
