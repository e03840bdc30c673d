use planflow::layout::{AutoLayoutEngine, FlowDirection, LayoutConfig};
use planflow::model::{GraphModel, Node, NodeId, Size};
use proptest::prelude::*;

fn build(node_count: usize, edges: &[(usize, usize)], acyclic: bool) -> GraphModel {
    let mut g = GraphModel::new();
    for i in 0..node_count {
        let w = 100.0 + (i % 4) as f32 * 30.0;
        let h = 40.0 + (i % 3) as f32 * 20.0;
        g.add_node(Node::new(format!("n{i}"), format!("Card {i}")).with_size(w, h));
    }
    for &(a, b) in edges {
        if a >= node_count || b >= node_count {
            continue;
        }
        // Forward-only edges can never close a cycle.
        if acyclic && a >= b {
            continue;
        }
        g.add_edge(&NodeId::from(format!("n{a}")), &NodeId::from(format!("n{b}")));
    }
    g
}

fn config_strategy() -> impl Strategy<Value = LayoutConfig> {
    (any::<bool>(), proptest::option::of(300.0f32..2000.0)).prop_map(|(vertical, footprint)| {
        LayoutConfig {
            direction: if vertical {
                FlowDirection::Vertical
            } else {
                FlowDirection::Horizontal
            },
            footprint,
            ..LayoutConfig::default()
        }
    })
}

proptest! {
    #[test]
    fn prop_every_node_placed_exactly_once(
        node_count in 0..25usize,
        edges in proptest::collection::vec((0..25usize, 0..25usize), 0..60),
        config in config_strategy(),
    ) {
        let g = build(node_count, &edges, false);
        let layout = AutoLayoutEngine::new(config).compute(&g, &g);

        prop_assert_eq!(layout.positions().len(), g.len());
        for node in g.nodes() {
            let hits = layout.positions().iter().filter(|(id, _)| *id == node.id).count();
            prop_assert_eq!(hits, 1);
        }
        let in_columns: usize = layout.columns.iter().map(Vec::len).sum();
        prop_assert_eq!(in_columns, g.len());
    }

    #[test]
    fn prop_layout_is_deterministic(
        node_count in 1..20usize,
        edges in proptest::collection::vec((0..20usize, 0..20usize), 0..40),
        config in config_strategy(),
    ) {
        let g = build(node_count, &edges, false);
        let engine = AutoLayoutEngine::new(config);
        let first = engine.compute(&g, &g);
        let second = engine.compute(&g, &g);
        prop_assert_eq!(first.positions(), second.positions());
        prop_assert_eq!(first.canvas, second.canvas);

        // Writing positions back does not change the next result.
        let mut applied = g.clone();
        engine.apply(&mut applied);
        let third = engine.compute(&applied, &applied);
        prop_assert_eq!(first.positions(), third.positions());
    }

    #[test]
    fn prop_dag_successors_sit_in_later_columns(
        node_count in 1..20usize,
        edges in proptest::collection::vec((0..20usize, 0..20usize), 0..50),
    ) {
        let g = build(node_count, &edges, true);
        let layout = AutoLayoutEngine::new(LayoutConfig::default()).compute(&g, &g);
        prop_assert!(!layout.has_cycle());
        for (from, to) in g.edges() {
            let a = layout.column_of(from).unwrap();
            let b = layout.column_of(to).unwrap();
            prop_assert!(b > a, "{} in column {} but its predecessor {} in {}", to, b, from, a);
        }
    }

    #[test]
    fn prop_cards_stay_inside_canvas(
        node_count in 1..20usize,
        edges in proptest::collection::vec((0..20usize, 0..20usize), 0..40),
        config in config_strategy(),
    ) {
        let g = build(node_count, &edges, false);
        let layout = AutoLayoutEngine::new(config).compute(&g, &g);
        for (id, p) in layout.positions() {
            let size = g.node(id).and_then(|n| n.size).unwrap_or(Size::new(0.0, 0.0));
            prop_assert!(p.x >= 0.0 && p.y >= 0.0);
            prop_assert!(p.x + size.width <= layout.canvas.width + 0.01);
            prop_assert!(p.y + size.height <= layout.canvas.height + 0.01);
        }
    }
}

#[test]
fn cycle_lands_in_the_remainder_column() {
    let g = build(3, &[(0, 1), (1, 2), (2, 1)], false);
    let layout = AutoLayoutEngine::new(LayoutConfig::default()).compute(&g, &g);
    assert_eq!(layout.column_of(&"n0".into()), Some(0));
    assert_eq!(layout.remainder, vec![NodeId::from("n1"), NodeId::from("n2")]);
    assert_eq!(layout.column_of(&"n1".into()), Some(1));
    assert_eq!(layout.positions().len(), 3);
}
