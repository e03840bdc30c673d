use chrono::Datelike;
use egui::{Color32, Pos2, Rect, Rounding, Sense, Shape, Stroke, Ui, Vec2};

use planflow::timeline::{TimelineRow, TimelineView, ZoomLevel};

use crate::ui::theme;

const LABEL_WIDTH: f32 = theme::LABEL_COLUMN_WIDTH;
const HEADER_HEIGHT: f32 = theme::HEADER_HEIGHT;

/// Result details from interactions in the Gantt chart.
#[derive(Debug, Clone, Default)]
pub struct ChartInteraction {
    pub toggle: Option<String>,
    pub zoom: Option<ZoomLevel>,
}

/// Render a derived timeline: label column, header buckets, bars and arrows.
pub fn show_gantt_chart(view: &TimelineView, zoom: ZoomLevel, ui: &mut Ui) -> ChartInteraction {
    let mut interaction = ChartInteraction::default();
    let available = ui.available_size();

    // Ctrl+scroll steps through the zoom levels.
    if ui.rect_contains_pointer(ui.max_rect()) && ui.input(|i| i.modifiers.ctrl) {
        let scroll = ui.input(|i| i.smooth_scroll_delta.y);
        if scroll > 0.0 {
            interaction.zoom = Some(zoom.zoom_in());
        } else if scroll < 0.0 {
            interaction.zoom = Some(zoom.zoom_out());
        }
    }

    if view.rows.is_empty() {
        ui.centered_and_justified(|ui| {
            ui.label(
                egui::RichText::new("No schedule items. Import a schedule from the File menu.")
                    .color(theme::TEXT_DIM),
            );
        });
        return interaction;
    }

    let chart_width = LABEL_WIDTH + view.width();
    let chart_height = HEADER_HEIGHT + view.height() + 40.0;

    egui::ScrollArea::both()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            let (response, painter) = ui.allocate_painter(
                Vec2::new(chart_width.max(available.x), chart_height.max(available.y)),
                Sense::hover(),
            );
            let origin = response.rect.min;
            let body = Pos2::new(origin.x + LABEL_WIDTH, origin.y + HEADER_HEIGHT);

            painter.rect_filled(response.rect, 0.0, theme::BG_DARK);

            draw_header(&painter, view, origin, response.rect.height());
            draw_today_line(&painter, view, body, view.height());

            for row in &view.rows {
                let y = body.y + row.row_index as f32 * view.row_height;
                let row_bg = if row.row_index % 2 == 0 {
                    theme::BG_PANEL
                } else {
                    theme::BG_DARK
                };
                painter.rect_filled(
                    Rect::from_min_size(Pos2::new(origin.x, y), Vec2::new(response.rect.width(), view.row_height)),
                    0.0,
                    row_bg,
                );
                painter.line_segment(
                    [
                        Pos2::new(origin.x, y + view.row_height),
                        Pos2::new(response.rect.right(), y + view.row_height),
                    ],
                    Stroke::new(0.5, theme::BORDER_SUBTLE),
                );

                if let Some(id) = draw_label(ui, &painter, row, Pos2::new(origin.x, y), view.row_height) {
                    interaction.toggle = Some(id);
                }
                draw_bar(&painter, row, body.x, y, view.row_height);
            }

            for arrow in &view.arrows {
                let offset = body.to_vec2();
                let points: Vec<Pos2> = arrow
                    .connector
                    .curve
                    .flatten(24)
                    .into_iter()
                    .map(|p| Pos2::new(p.x, p.y) + offset)
                    .collect();
                painter.add(Shape::line(points, Stroke::new(arrow.connector.stroke_width, theme::CONNECTOR)));
                let head: Vec<Pos2> = arrow
                    .connector
                    .arrow
                    .points()
                    .iter()
                    .map(|p| Pos2::new(p.x, p.y) + offset)
                    .collect();
                painter.add(Shape::convex_polygon(head, theme::CONNECTOR, Stroke::NONE));
            }

            // Label column divider
            painter.line_segment(
                [
                    Pos2::new(body.x, origin.y),
                    Pos2::new(body.x, response.rect.bottom()),
                ],
                Stroke::new(1.0, theme::BORDER_SUBTLE),
            );
        });

    interaction
}

/// Indented name with an expand toggle. Returns the row id when toggled.
fn draw_label(ui: &Ui, painter: &egui::Painter, row: &TimelineRow, at: Pos2, height: f32) -> Option<String> {
    let indent = at.x + 8.0 + row.depth() as f32 * theme::INDENT;
    let center_y = at.y + height / 2.0;
    let mut toggled = None;

    if row.expandable {
        let icon = if row.expanded {
            egui_phosphor::regular::CARET_DOWN
        } else {
            egui_phosphor::regular::CARET_RIGHT
        };
        let rect = Rect::from_center_size(Pos2::new(indent + 6.0, center_y), Vec2::splat(16.0));
        let resp = ui.interact(rect, ui.make_persistent_id(("row-toggle", row.id.as_str())), Sense::click());
        let color = if resp.hovered() {
            theme::TEXT_PRIMARY
        } else {
            theme::TEXT_SECONDARY
        };
        painter.text(rect.center(), egui::Align2::CENTER_CENTER, icon, theme::font_bar(), color);
        if resp.clicked() {
            toggled = Some(row.id.clone());
        }
    }

    let clip = Rect::from_min_max(at, Pos2::new(at.x + LABEL_WIDTH - 4.0, at.y + height));
    painter.with_clip_rect(clip).text(
        Pos2::new(indent + 18.0, center_y),
        egui::Align2::LEFT_CENTER,
        &row.name,
        theme::font_bar(),
        if row.depth() == 0 {
            theme::TEXT_PRIMARY
        } else {
            theme::TEXT_SECONDARY
        },
    );
    toggled
}

fn draw_bar(painter: &egui::Painter, row: &TimelineRow, body_x: f32, y: f32, height: f32) {
    let Some(bar) = row.bar else {
        return;
    };
    let inset = theme::BAR_INSET;
    let bar_rect = Rect::from_min_size(
        Pos2::new(body_x + bar.offset_x, y + inset),
        Vec2::new(bar.width, height - inset * 2.0),
    );
    let rounding = Rounding::same(theme::BAR_ROUNDING);

    painter.rect_filled(bar_rect.translate(Vec2::new(1.0, 2.0)), rounding, Color32::from_black_alpha(35));
    painter.rect_filled(bar_rect, rounding, theme::item_color(row.item_type));

    if row.progress > 0.0 {
        let progress_width = bar.width * (row.progress / 100.0).clamp(0.0, 1.0);
        painter.rect_filled(
            Rect::from_min_size(bar_rect.min, Vec2::new(progress_width, bar_rect.height())),
            rounding,
            theme::PROGRESS_OVERLAY,
        );
    }

    if bar.width > 30.0 {
        let galley = painter.layout_no_wrap(row.name.clone(), theme::font_bar(), theme::TEXT_ON_BAR);
        let text_y = bar_rect.top() + (bar_rect.height() - galley.size().y) / 2.0;
        painter
            .with_clip_rect(bar_rect)
            .galley(Pos2::new(bar_rect.left() + 6.0, text_y), galley, Color32::TRANSPARENT);
    }
}

fn draw_header(painter: &egui::Painter, view: &TimelineView, origin: Pos2, height: f32) {
    painter.rect_filled(
        Rect::from_min_size(origin, Vec2::new(LABEL_WIDTH + view.width(), HEADER_HEIGHT)),
        0.0,
        theme::BG_HEADER,
    );
    painter.line_segment(
        [
            Pos2::new(origin.x, origin.y + HEADER_HEIGHT),
            Pos2::new(origin.x + LABEL_WIDTH + view.width(), origin.y + HEADER_HEIGHT),
        ],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    for bucket in &view.headers {
        let x = origin.x + LABEL_WIDTH + bucket.offset_x;
        painter.line_segment(
            [Pos2::new(x, origin.y), Pos2::new(x, origin.y + height)],
            Stroke::new(0.5, theme::GRID_LINE),
        );
        // Labels only where they fit.
        if bucket.width >= 28.0 {
            let weekend = bucket.days == 1 && bucket.start.weekday().num_days_from_monday() >= 5;
            painter.with_clip_rect(Rect::from_min_size(
                Pos2::new(x, origin.y),
                Vec2::new(bucket.width, HEADER_HEIGHT),
            ))
            .text(
                Pos2::new(x + 4.0, origin.y + HEADER_HEIGHT / 2.0),
                egui::Align2::LEFT_CENTER,
                &bucket.label,
                theme::font_header(),
                if weekend { theme::TEXT_DIM } else { theme::TEXT_SECONDARY },
            );
        }
    }
}

fn draw_today_line(painter: &egui::Painter, view: &TimelineView, body: Pos2, height: f32) {
    let (Some(scale), Some(range)) = (view.scale(), view.range) else {
        return;
    };
    let today = chrono::Local::now().date_naive();
    if today < range.start || today > range.end {
        return;
    }
    let x = body.x + scale.date_to_x(today);
    painter.line_segment(
        [Pos2::new(x, body.y), Pos2::new(x, body.y + height)],
        Stroke::new(1.5, theme::TODAY_LINE),
    );

    let badge_rect = Rect::from_min_size(Pos2::new(x - 21.0, body.y - 1.0), Vec2::new(42.0, 14.0));
    painter.rect_filled(badge_rect, Rounding::same(3.0), theme::TODAY_LINE);
    painter.text(
        badge_rect.center(),
        egui::Align2::CENTER_CENTER,
        "Today",
        theme::font_small(),
        Color32::WHITE,
    );
}
