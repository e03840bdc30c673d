use egui::{Color32, Pos2, Rect, Rounding, Sense, Shape, Stroke, Ui, Vec2};

use planflow::editor::{self, ConnectionEditor, GestureOutcome, GestureState};
use planflow::geometry::{source_anchor, target_anchor, Connector, ConnectorGeometry};
use planflow::model::{GraphModel, NodeId, Point, Size};

use crate::ui::theme;

const MIN_CARD_WIDTH: f32 = 140.0;
const MIN_CARD_HEIGHT: f32 = 48.0;
const CURVE_SEGMENTS: usize = 32;

/// Result details from interactions on the flow canvas.
#[derive(Debug, Clone, Default)]
pub struct CanvasInteraction {
    /// At least one card got a new measured size this frame.
    pub measured: bool,
    /// A card moved while being dragged.
    pub moved: bool,
    pub outcome: Option<GestureOutcome>,
    pub removed_edge: Option<(NodeId, NodeId)>,
    /// Double-clicked card, to drill down into.
    pub open_card: Option<NodeId>,
    pub renamed: bool,
    /// Title of a card deleted from its context menu.
    pub removed_card: Option<String>,
    /// Extent of everything drawn, in canvas coordinates.
    pub extent: Size,
}

struct Card {
    id: NodeId,
    rect: Rect,
    galley: std::sync::Arc<egui::Galley>,
}

/// Render the flow canvas: cards, connectors and the pending gesture.
pub fn show_flow_canvas(
    graph: &mut GraphModel,
    editor: &mut ConnectionEditor,
    geometry: &ConnectorGeometry,
    canvas: Size,
    ui: &mut Ui,
) -> CanvasInteraction {
    let mut interaction = CanvasInteraction::default();
    let available = ui.available_size();

    egui::ScrollArea::both()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let (response, painter) = ui.allocate_painter(
                Vec2::new(canvas.width.max(available.x), canvas.height.max(available.y)),
                Sense::click(),
            );
            let origin = response.rect.min;
            let to_screen = |p: Point| Pos2::new(origin.x + p.x, origin.y + p.y);
            let to_model = |p: Pos2| Point::new(p.x - origin.x, p.y - origin.y);
            let pointer = ui.input(|i| i.pointer.hover_pos());

            // Gestures in flight follow the pointer before anything is drawn.
            if let Some(p) = pointer {
                if !editor.is_idle() {
                    editor.pointer_move(graph, to_model(p));
                    if matches!(editor.state(), GestureState::DraggingNode { .. }) {
                        ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
                        interaction.moved = true;
                    }
                }
            }

            // Measure every card from its rendered title.
            let mut cards: Vec<Card> = Vec::with_capacity(graph.len());
            let mut measured: Vec<(NodeId, Size)> = Vec::new();
            for node in graph.nodes() {
                let galley = painter.layout(
                    node.title.clone(),
                    theme::font_card(),
                    theme::TEXT_PRIMARY,
                    theme::CARD_MAX_TEXT_WIDTH,
                );
                let size = Size::new(
                    (galley.size().x + theme::CARD_PADDING * 2.0).max(MIN_CARD_WIDTH),
                    (galley.size().y + theme::CARD_PADDING * 2.0).max(MIN_CARD_HEIGHT),
                );
                if node.size != Some(size) {
                    measured.push((node.id.clone(), size));
                }
                if let Some(at) = node.position {
                    cards.push(Card {
                        id: node.id.clone(),
                        rect: Rect::from_min_size(to_screen(at), Vec2::new(size.width, size.height)),
                        galley,
                    });
                }
            }
            interaction.measured = !measured.is_empty();
            for (id, size) in measured {
                graph.set_size(&id, size);
            }

            let card_at = |p: Pos2| -> Option<NodeId> {
                cards.iter().rev().find(|c| c.rect.contains(p)).map(|c| c.id.clone())
            };

            if ui.input(|i| i.pointer.any_released()) && !editor.is_idle() {
                let target = pointer.and_then(card_at);
                interaction.outcome = Some(editor.release(graph, target.as_ref()));
            }

            // Connectors between placed cards, in canvas coordinates.
            let connectors: Vec<((NodeId, NodeId), Connector)> = graph
                .edges()
                .filter_map(|(from, to)| {
                    let a = graph.node(from)?;
                    let b = graph.node(to)?;
                    let start = source_anchor(a.position?, a.size?);
                    let end = target_anchor(b.position?, b.size?);
                    Some(((from.clone(), to.clone()), geometry.connect(start, end)))
                })
                .collect();

            let hovered_edge = match pointer {
                Some(p) if editor.is_idle() && response.hovered() && card_at(p).is_none() => {
                    editor::edge_at(&connectors, to_model(p)).cloned()
                }
                _ => None,
            };

            // Background grid
            painter.rect_filled(response.rect, 0.0, theme::BG_DARK);
            let step = 40.0;
            let mut x = response.rect.left();
            while x < response.rect.right() {
                painter.line_segment(
                    [Pos2::new(x, response.rect.top()), Pos2::new(x, response.rect.bottom())],
                    Stroke::new(0.5, theme::GRID_LINE),
                );
                x += step;
            }
            let mut y = response.rect.top();
            while y < response.rect.bottom() {
                painter.line_segment(
                    [Pos2::new(response.rect.left(), y), Pos2::new(response.rect.right(), y)],
                    Stroke::new(0.5, theme::GRID_LINE),
                );
                y += step;
            }

            for (edge, connector) in &connectors {
                let color = if hovered_edge.as_ref() == Some(edge) {
                    theme::CONNECTOR_HOVER
                } else {
                    theme::CONNECTOR
                };
                draw_connector(&painter, connector, origin, color);
            }

            let mut start_connect: Option<(NodeId, Point)> = None;
            let mut start_drag: Option<(NodeId, Point)> = None;
            let mut rename: Option<(NodeId, String)> = None;
            let mut remove: Option<NodeId> = None;
            for card in &cards {
                let body = ui.interact(
                    card.rect,
                    ui.make_persistent_id(("card", card.id.as_str())),
                    Sense::click_and_drag(),
                );
                let anchor = Pos2::new(card.rect.right(), card.rect.center().y);
                let handle = ui.interact(
                    Rect::from_center_size(anchor, Vec2::splat(theme::HANDLE_RADIUS * 3.0)),
                    ui.make_persistent_id(("card-handle", card.id.as_str())),
                    Sense::drag(),
                );

                let fill = if body.hovered() {
                    theme::BG_CARD_HOVER
                } else {
                    theme::BG_CARD
                };
                let rounding = Rounding::same(theme::CARD_ROUNDING);
                painter.rect_filled(card.rect.translate(Vec2::new(1.0, 2.0)), rounding, Color32::from_black_alpha(40));
                painter.rect(card.rect, rounding, fill, Stroke::new(1.0, theme::BORDER_SUBTLE));
                painter.galley(
                    card.rect.min + Vec2::splat(theme::CARD_PADDING),
                    card.galley.clone(),
                    theme::TEXT_PRIMARY,
                );

                let handle_color = if handle.hovered() {
                    theme::ACCENT
                } else {
                    theme::HANDLE_COLOR
                };
                painter.circle(
                    anchor,
                    theme::HANDLE_RADIUS,
                    handle_color,
                    Stroke::new(1.5, theme::BORDER_ACCENT),
                );

                if handle.drag_started() {
                    start_connect = Some((card.id.clone(), to_model(anchor)));
                } else if body.drag_started() {
                    let grab = body.interact_pointer_pos().unwrap_or(card.rect.min);
                    start_drag = Some((card.id.clone(), to_model(grab)));
                }
                if body.double_clicked() {
                    interaction.open_card = Some(card.id.clone());
                }
                body.context_menu(|ui| {
                    let mut title = graph
                        .node(&card.id)
                        .map(|n| n.title.clone())
                        .unwrap_or_default();
                    if ui.text_edit_singleline(&mut title).changed() {
                        rename = Some((card.id.clone(), title));
                    }
                    ui.separator();
                    if ui
                        .button(format!("{}  Delete card", egui_phosphor::regular::TRASH))
                        .clicked()
                    {
                        remove = Some(card.id.clone());
                        ui.close_menu();
                    }
                });
                if body.hovered() && editor.is_idle() {
                    ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
                }
            }

            if let Some(preview) = editor.preview(geometry) {
                draw_connector(&painter, &preview, origin, theme::CONNECTOR_PREVIEW);
            }

            if let Some((id, title)) = rename {
                graph.set_title(&id, title);
                interaction.renamed = true;
            }
            if let Some(id) = remove {
                editor.cancel();
                if let Some(node) = graph.remove_node(&id) {
                    interaction.removed_card = Some(node.title);
                }
            }

            if let Some((id, at)) = start_connect {
                editor.begin_connect(graph, &id, at);
            } else if let Some((id, at)) = start_drag {
                editor.begin_drag(graph, &id, at);
            }

            if response.clicked() {
                if let Some((from, to)) = hovered_edge {
                    if editor::delete_edge(graph, &from, &to) {
                        interaction.removed_edge = Some((from, to));
                    }
                }
            } else if hovered_edge.is_some() {
                ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
            }

            let mut extent = Size::new(0.0, 0.0);
            for node in graph.nodes() {
                if let (Some(p), Some(s)) = (node.position, node.size) {
                    extent.width = extent.width.max(p.x + s.width);
                    extent.height = extent.height.max(p.y + s.height);
                }
            }
            interaction.extent = extent;
        });

    interaction
}

fn draw_connector(painter: &egui::Painter, connector: &Connector, origin: Pos2, color: Color32) {
    let offset = origin.to_vec2();
    let points: Vec<Pos2> = connector
        .curve
        .flatten(CURVE_SEGMENTS)
        .into_iter()
        .map(|p| Pos2::new(p.x, p.y) + offset)
        .collect();
    painter.add(Shape::line(points, Stroke::new(connector.stroke_width, color)));
    let arrow: Vec<Pos2> = connector
        .arrow
        .points()
        .iter()
        .map(|p| Pos2::new(p.x, p.y) + offset)
        .collect();
    painter.add(Shape::convex_polygon(arrow, color, Stroke::NONE));
}
