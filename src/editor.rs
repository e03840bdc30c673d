//! Pointer gestures on the flow canvas.
//!
//! Two gestures exist: dragging from a card's connection handle to draw an
//! edge, and dragging a card body to move it. Only one can be pending at a
//! time and every release resolves exactly the pending one.

use crate::geometry::{Connector, ConnectorGeometry};
use crate::model::graph::{GraphModel, NodeId, Point};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Connecting {
        from: NodeId,
        origin: Point,
        cursor: Point,
    },
    DraggingNode {
        id: NodeId,
        /// Pointer position minus card position at grab time.
        grab_offset: Point,
    },
}

/// What a release did to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Nothing was pending.
    None,
    EdgeAdded { from: NodeId, to: NodeId },
    /// The edge already existed; the model is unchanged.
    EdgeExists { from: NodeId, to: NodeId },
    /// Released on the source card or on empty canvas.
    Discarded,
    NodeMoved { id: NodeId, position: Point },
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionEditor {
    state: GestureState,
}

impl ConnectionEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    /// Start drawing an edge from `from`'s handle. Ignored unless idle and the
    /// card exists.
    pub fn begin_connect(&mut self, graph: &GraphModel, from: &NodeId, origin: Point) -> bool {
        if !self.is_idle() || !graph.contains(from) {
            return false;
        }
        self.state = GestureState::Connecting {
            from: from.clone(),
            origin,
            cursor: origin,
        };
        true
    }

    /// Start moving a card. Ignored unless idle and the card exists.
    pub fn begin_drag(&mut self, graph: &GraphModel, id: &NodeId, pointer: Point) -> bool {
        if !self.is_idle() {
            return false;
        }
        let Some(node) = graph.node(id) else {
            return false;
        };
        let at = node.position.unwrap_or_default();
        self.state = GestureState::DraggingNode {
            id: id.clone(),
            grab_offset: Point::new(pointer.x - at.x, pointer.y - at.y),
        };
        true
    }

    /// Track the pointer. Connecting only moves the preview; dragging moves the card.
    pub fn pointer_move(&mut self, graph: &mut GraphModel, pointer: Point) {
        match &mut self.state {
            GestureState::Idle => {}
            GestureState::Connecting { cursor, .. } => *cursor = pointer,
            GestureState::DraggingNode { id, grab_offset } => {
                let at = Point::new(pointer.x - grab_offset.x, pointer.y - grab_offset.y);
                graph.set_position(id, at);
            }
        }
    }

    /// Resolve the pending gesture. `target` is the card under the pointer, if any.
    pub fn release(&mut self, graph: &mut GraphModel, target: Option<&NodeId>) -> GestureOutcome {
        match std::mem::take(&mut self.state) {
            GestureState::Idle => GestureOutcome::None,
            GestureState::Connecting { from, .. } => match target {
                Some(to) if *to != from && graph.contains(to) => {
                    if graph.add_edge(&from, to) {
                        tracing::debug!(%from, %to, "edge added");
                        GestureOutcome::EdgeAdded { from, to: to.clone() }
                    } else {
                        GestureOutcome::EdgeExists { from, to: to.clone() }
                    }
                }
                _ => GestureOutcome::Discarded,
            },
            GestureState::DraggingNode { id, .. } => {
                match graph.node(&id).and_then(|n| n.position) {
                    Some(position) => GestureOutcome::NodeMoved { id, position },
                    // Card vanished mid-drag.
                    None => GestureOutcome::Discarded,
                }
            }
        }
    }

    /// Abandon whatever is pending without touching the model.
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }

    /// Preview connector while connecting.
    pub fn preview(&self, geometry: &ConnectorGeometry) -> Option<Connector> {
        match &self.state {
            GestureState::Connecting { origin, cursor, .. } => Some(geometry.preview(*origin, *cursor)),
            _ => None,
        }
    }
}

/// Delete an edge by clicking its connector. Independent of any gesture.
pub fn delete_edge(graph: &mut GraphModel, from: &NodeId, to: &NodeId) -> bool {
    let removed = graph.remove_edge(from, to);
    if removed {
        tracing::debug!(%from, %to, "edge removed");
    }
    removed
}

/// The first edge whose hit path contains `point`.
pub fn edge_at<'a>(
    connectors: &'a [((NodeId, NodeId), Connector)],
    point: Point,
) -> Option<&'a (NodeId, NodeId)> {
    connectors
        .iter()
        .find(|(_, c)| c.hit_test(point))
        .map(|(edge, _)| edge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::graph::Node;

    fn two_cards() -> GraphModel {
        let mut g = GraphModel::new();
        g.add_node(Node::new("a", "A").with_position(0.0, 0.0));
        g.add_node(Node::new("b", "B").with_position(300.0, 0.0));
        g
    }

    #[test]
    fn release_on_source_adds_nothing() {
        let mut g = two_cards();
        let mut ed = ConnectionEditor::new();
        assert!(ed.begin_connect(&g, &"a".into(), Point::new(200.0, 40.0)));
        let out = ed.release(&mut g, Some(&"a".into()));
        assert_eq!(out, GestureOutcome::Discarded);
        assert_eq!(g.edge_count(), 0);
        assert!(ed.is_idle());
    }

    #[test]
    fn release_on_target_adds_one_edge_once() {
        let mut g = two_cards();
        let mut ed = ConnectionEditor::new();
        for _ in 0..2 {
            ed.begin_connect(&g, &"a".into(), Point::new(200.0, 40.0));
            ed.pointer_move(&mut g, Point::new(310.0, 20.0));
            ed.release(&mut g, Some(&"b".into()));
        }
        assert_eq!(g.edge_count(), 1);
        assert!(g.has_edge(&"a".into(), &"b".into()));
    }

    #[test]
    fn second_identical_drag_reports_existing_edge() {
        let mut g = two_cards();
        let mut ed = ConnectionEditor::new();
        ed.begin_connect(&g, &"a".into(), Point::default());
        ed.release(&mut g, Some(&"b".into()));
        ed.begin_connect(&g, &"a".into(), Point::default());
        let out = ed.release(&mut g, Some(&"b".into()));
        assert_eq!(
            out,
            GestureOutcome::EdgeExists {
                from: "a".into(),
                to: "b".into()
            }
        );
    }

    #[test]
    fn release_on_empty_canvas_discards() {
        let mut g = two_cards();
        let mut ed = ConnectionEditor::new();
        ed.begin_connect(&g, &"a".into(), Point::default());
        assert_eq!(ed.release(&mut g, None), GestureOutcome::Discarded);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn moving_while_connecting_does_not_touch_the_model() {
        let mut g = two_cards();
        let before = g.nodes().to_vec();
        let mut ed = ConnectionEditor::new();
        ed.begin_connect(&g, &"a".into(), Point::new(1.0, 1.0));
        ed.pointer_move(&mut g, Point::new(99.0, 99.0));
        assert_eq!(g.nodes(), before.as_slice());
        let preview = ed.preview(&ConnectorGeometry::default()).unwrap();
        assert_eq!(preview.target(), Point::new(99.0, 99.0));
    }

    #[test]
    fn drag_and_connect_are_exclusive() {
        let mut g = two_cards();
        let mut ed = ConnectionEditor::new();
        assert!(ed.begin_drag(&g, &"b".into(), Point::new(310.0, 10.0)));
        assert!(!ed.begin_connect(&g, &"a".into(), Point::default()));
        ed.pointer_move(&mut g, Point::new(410.0, 60.0));
        let out = ed.release(&mut g, Some(&"a".into()));
        assert_eq!(
            out,
            GestureOutcome::NodeMoved {
                id: "b".into(),
                position: Point::new(400.0, 50.0)
            }
        );
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn release_when_idle_does_nothing() {
        let mut g = two_cards();
        let mut ed = ConnectionEditor::new();
        assert_eq!(ed.release(&mut g, Some(&"b".into())), GestureOutcome::None);
    }

    #[test]
    fn unknown_source_never_starts_a_gesture() {
        let g = two_cards();
        let mut ed = ConnectionEditor::new();
        assert!(!ed.begin_connect(&g, &"ghost".into(), Point::default()));
        assert!(!ed.begin_drag(&g, &"ghost".into(), Point::default()));
        assert!(ed.is_idle());
    }

    #[test]
    fn clicking_a_connector_finds_its_edge() {
        let geo = ConnectorGeometry::default();
        let connectors = vec![(
            (NodeId::from("a"), NodeId::from("b")),
            geo.connect(Point::new(0.0, 0.0), Point::new(100.0, 0.0)),
        )];
        assert_eq!(
            edge_at(&connectors, Point::new(50.0, 3.0)),
            Some(&(NodeId::from("a"), NodeId::from("b")))
        );
        assert_eq!(edge_at(&connectors, Point::new(50.0, 80.0)), None);

        let mut g = two_cards();
        g.add_edge(&"a".into(), &"b".into());
        assert!(delete_edge(&mut g, &"a".into(), &"b".into()));
        assert!(!delete_edge(&mut g, &"a".into(), &"b".into()));
    }
}
