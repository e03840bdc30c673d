//! Automatic placement of the cards of one graph level.
//!
//! Cards are layered with Kahn's algorithm processed in waves: a card enters
//! the next wave only once all of its predecessors have been placed, so its
//! column is the length of the longest path reaching it. Cards stuck behind a
//! cycle never reach in-degree zero; they are collected into one trailing
//! remainder column instead of failing.
//!
//! Columns are stacked along the primary axis (x for horizontal flows, y for
//! vertical ones). Inside a column, cards follow each other along the secondary
//! axis and the column is centered within the band it belongs to. With a
//! footprint set, a column that would cross it starts a new band below (or to
//! the right of) the tallest column of the current band.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::graph::{GraphModel, Measure, NodeId, Point, Size};

/// Which way dependencies flow on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlowDirection {
    /// Columns go left to right, cards stack top to bottom.
    #[default]
    Horizontal,
    /// Columns go top to bottom, cards stack left to right.
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub direction: FlowDirection,
    /// Gap between consecutive columns along the primary axis.
    pub column_spacing: f32,
    /// Gap between cards of the same column.
    pub node_spacing: f32,
    /// Gap between wrapped bands.
    pub band_spacing: f32,
    pub margin: f32,
    /// Used for cards the host has not measured.
    pub default_node_size: Size,
    /// Maximum primary extent of the canvas; `None` grows unbounded.
    pub footprint: Option<f32>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: FlowDirection::Horizontal,
            column_spacing: 80.0,
            node_spacing: 40.0,
            band_spacing: 80.0,
            margin: 40.0,
            default_node_size: Size::new(200.0, 80.0),
            footprint: None,
        }
    }
}

/// Result of one layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    positions: Vec<(NodeId, Point)>,
    /// Cards per column, in placement order. The last column is the
    /// remainder when `remainder` is non-empty.
    pub columns: Vec<Vec<NodeId>>,
    /// Cards that could not be layered because of a cycle.
    pub remainder: Vec<NodeId>,
    /// Bounding box of every placed card plus the margin.
    pub canvas: Size,
    pub margin: f32,
}

impl Layout {
    pub fn position(&self, id: &NodeId) -> Option<Point> {
        self.positions
            .iter()
            .find(|(n, _)| n == id)
            .map(|(_, p)| *p)
    }

    /// Positions in the graph's insertion order.
    pub fn positions(&self) -> &[(NodeId, Point)] {
        &self.positions
    }

    pub fn column_of(&self, id: &NodeId) -> Option<usize> {
        self.columns.iter().position(|col| col.contains(id))
    }

    pub fn has_cycle(&self) -> bool {
        !self.remainder.is_empty()
    }
}

/// Computes card positions for one graph level.
#[derive(Debug, Clone, Default)]
pub struct AutoLayoutEngine {
    config: LayoutConfig,
}

impl AutoLayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lay out every card of `graph`. Pure: the graph is not modified.
    pub fn compute(&self, graph: &GraphModel, measure: &impl Measure) -> Layout {
        let nodes = graph.nodes();
        let (columns, remainder) = assign_columns(graph);

        let sizes: Vec<Size> = nodes
            .iter()
            .map(|n| {
                measure
                    .measure(&n.id)
                    .filter(|s| s.width.is_finite() && s.height.is_finite())
                    .unwrap_or(self.config.default_node_size)
            })
            .collect();

        let mut placed = self.place(&columns, &sizes);
        // Input order, so the result does not depend on wave order.
        placed.sort_by_key(|(idx, _)| *idx);

        let mut max = Point::new(0.0, 0.0);
        for (idx, p) in &placed {
            max.x = max.x.max(p.x + sizes[*idx].width);
            max.y = max.y.max(p.y + sizes[*idx].height);
        }
        let canvas = if placed.is_empty() {
            Size::new(self.config.margin * 2.0, self.config.margin * 2.0)
        } else {
            Size::new(max.x + self.config.margin, max.y + self.config.margin)
        };

        if !remainder.is_empty() {
            tracing::debug!(
                count = remainder.len(),
                "cycle detected; cards placed in remainder column"
            );
        }

        Layout {
            positions: placed
                .into_iter()
                .map(|(idx, p)| (nodes[idx].id.clone(), p))
                .collect(),
            columns: columns
                .iter()
                .map(|col| col.iter().map(|&i| nodes[i].id.clone()).collect())
                .collect(),
            remainder: remainder.iter().map(|&i| nodes[i].id.clone()).collect(),
            canvas,
            margin: self.config.margin,
        }
    }

    /// Convenience: compute and write the positions back into `graph`.
    pub fn apply(&self, graph: &mut GraphModel) -> Layout {
        let snapshot: &GraphModel = graph;
        let layout = self.compute(snapshot, snapshot);
        graph.apply_layout(&layout);
        layout
    }

    fn place(&self, columns: &[Vec<usize>], sizes: &[Size]) -> Vec<(usize, Point)> {
        let cfg = &self.config;
        let vertical = cfg.direction == FlowDirection::Vertical;
        // (primary, secondary) extents of one card.
        let extent = |i: usize| {
            let s = sizes[i];
            if vertical {
                (s.height, s.width)
            } else {
                (s.width, s.height)
            }
        };

        struct Column<'a> {
            members: &'a [usize],
            primary_offset: f32,
            secondary_extent: f32,
        }

        // Split columns into bands.
        let mut bands: Vec<Vec<Column>> = vec![Vec::new()];
        let mut cursor = cfg.margin;
        for members in columns {
            let primary = members.iter().map(|&i| extent(i).0).fold(0.0, f32::max);
            let secondary = members.iter().map(|&i| extent(i).1).sum::<f32>()
                + cfg.node_spacing * members.len().saturating_sub(1) as f32;

            let current_is_empty = bands.last().map(Vec::is_empty).unwrap_or(true);
            if let Some(limit) = cfg.footprint {
                if !current_is_empty && cursor + primary > limit - cfg.margin {
                    bands.push(Vec::new());
                    cursor = cfg.margin;
                }
            }
            if let Some(band) = bands.last_mut() {
                band.push(Column {
                    members,
                    primary_offset: cursor,
                    secondary_extent: secondary,
                });
            }
            cursor += primary + cfg.column_spacing;
        }

        let mut placed = Vec::with_capacity(sizes.len());
        let mut band_origin = cfg.margin;
        for band in &bands {
            let band_extent = band
                .iter()
                .map(|c| c.secondary_extent)
                .fold(0.0, f32::max);
            for column in band {
                let mut along = band_origin + (band_extent - column.secondary_extent) / 2.0;
                for &i in column.members {
                    let p = if vertical {
                        Point::new(along, column.primary_offset)
                    } else {
                        Point::new(column.primary_offset, along)
                    };
                    placed.push((i, p));
                    along += extent(i).1 + cfg.node_spacing;
                }
            }
            band_origin += band_extent + cfg.band_spacing;
        }
        placed
    }
}

/// Kahn layering in waves. Returns the columns (node indices, each sorted by
/// input index) and the indices left over by cycles. When the remainder is
/// non-empty it is also appended as the final column.
fn assign_columns(graph: &GraphModel) -> (Vec<Vec<usize>>, Vec<usize>) {
    let nodes = graph.nodes();
    let index: HashMap<&NodeId, usize> = nodes.iter().enumerate().map(|(i, n)| (&n.id, i)).collect();

    let successors: Vec<Vec<usize>> = nodes
        .iter()
        .map(|n| {
            n.outgoing
                .iter()
                .filter_map(|t| index.get(t).copied())
                .collect()
        })
        .collect();

    let mut in_degree = vec![0usize; nodes.len()];
    for succs in &successors {
        for &s in succs {
            in_degree[s] += 1;
        }
    }

    let mut visited = vec![false; nodes.len()];
    let mut wave: Vec<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut columns = Vec::new();

    while !wave.is_empty() {
        let mut next = Vec::new();
        for &u in &wave {
            visited[u] = true;
            for &v in &successors[u] {
                in_degree[v] = in_degree[v].saturating_sub(1);
                if in_degree[v] == 0 && !visited[v] {
                    next.push(v);
                }
            }
        }
        next.sort_unstable();
        next.dedup();
        columns.push(wave);
        wave = next;
    }

    let remainder: Vec<usize> = (0..nodes.len()).filter(|&i| !visited[i]).collect();
    if !remainder.is_empty() {
        columns.push(remainder.clone());
    }
    (columns, remainder)
}
