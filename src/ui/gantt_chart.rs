use std::collections::HashMap;

use chrono::NaiveDate;
use egui::{Color32, Pos2, Rect, Response, Rounding, Sense, Shape, Stroke, Ui, Vec2};
use tracing::debug;

use planner_timeline::interaction::{
    DependencyEdge, DragError, DragKind, DragPhase, HandleHit, HandleSide, LinkEffect,
    PendingCommit,
};
use planner_timeline::model::date::format_date;
use planner_timeline::model::{DateGrid, HeaderSegment, Point, TaskBar, TaskId, TimelineLayout};
use planner_timeline::planner::{PlannerState, READ_ONLY_MESSAGE};
use crate::ui::theme;

const HEADER_HEIGHT: f32 = theme::HEADER_HEIGHT;
const HANDLE_WIDTH: f32 = theme::HANDLE_WIDTH;

/// Requests from the chart that need the store or the rest of the app.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartAction {
    Commit(PendingCommit),
    Link(DependencyEdge),
    Unlink(DependencyEdge),
    Select(Option<TaskId>),
    Notice(String),
}

/// Maps layout coordinates (grid pixels, row offsets) to the screen.
#[derive(Clone, Copy)]
struct Canvas {
    origin: Pos2,
    body_top: f32,
}

impl Canvas {
    fn pos(&self, p: Point) -> Pos2 {
        Pos2::new(self.origin.x + p.x, self.body_top + p.y)
    }

    fn point(&self, p: Pos2) -> Point {
        Point::new(p.x - self.origin.x, p.y - self.body_top)
    }

    fn x(&self, px: f32) -> f32 {
        self.origin.x + px
    }
}

/// Render the timeline (right panel).
pub fn show_gantt_chart(
    planner: &mut PlannerState,
    selected_task: Option<TaskId>,
    today: NaiveDate,
    scroll_to: Option<f32>,
    ui: &mut Ui,
) -> Vec<ChartAction> {
    let mut actions = Vec::new();

    // Zoom with Ctrl + scroll wheel
    let scroll_delta = ui.input(|i| i.smooth_scroll_delta);
    if ui.rect_contains_pointer(ui.max_rect()) && ui.input(|i| i.modifiers.ctrl) {
        if scroll_delta.y > 0.0 {
            planner.zoom_in();
        } else if scroll_delta.y < 0.0 {
            planner.zoom_out();
        }
    }

    let grid = planner.grid();
    let layout = planner.visible_layout();
    let row_height = planner.engine().row_height;
    let titles: HashMap<TaskId, String> = planner
        .tasks()
        .iter()
        .map(|t| (t.id, t.title.clone()))
        .collect();

    let available = ui.available_size();
    let chart_width = grid.total_width().max(available.x);
    let chart_height = HEADER_HEIGHT + layout.rows as f32 * row_height + 40.0;

    let mut scroll = egui::ScrollArea::both().auto_shrink([false, false]);
    if let Some(offset) = scroll_to {
        scroll = scroll.horizontal_scroll_offset(offset);
    }

    scroll.show(ui, |ui| {
        let (response, painter) = ui.allocate_painter(
            Vec2::new(chart_width, chart_height.max(available.y)),
            Sense::click(),
        );
        let canvas = Canvas {
            origin: response.rect.min,
            body_top: response.rect.min.y + HEADER_HEIGHT,
        };
        let bottom = response.rect.max.y;
        let mut consumed_click = false;

        painter.rect_filled(response.rect, 0.0, theme::BG_DARK);
        draw_rows(&painter, canvas, &layout, row_height, chart_width);
        draw_day_columns(&painter, canvas, &grid, bottom);
        draw_header(&painter, canvas, planner, &grid, chart_width);

        if let Some(index) = planner.today_index(today) {
            draw_today_line(&painter, canvas, &grid, index, bottom);
        }

        // ── Task bars ───────────────────────────────────────────
        for bar in &layout.bars {
            let title = titles.get(&bar.task_id).map(String::as_str).unwrap_or("");
            let is_selected = selected_task == Some(bar.task_id);
            let bar_rect = bar_rect(canvas, &grid, bar, row_height);
            draw_task_bar(&painter, bar, bar_rect, title, is_selected);

            let body = ui.interact(
                bar_rect,
                ui.make_persistent_id(("task-bar", bar.task_id)),
                Sense::click_and_drag(),
            );
            let left = ui.interact(
                edge_rect(bar_rect, bar_rect.left()),
                ui.make_persistent_id(("task-resize-start", bar.task_id)),
                Sense::drag(),
            );
            let right = ui.interact(
                edge_rect(bar_rect, bar_rect.right()),
                ui.make_persistent_id(("task-resize-end", bar.task_id)),
                Sense::drag(),
            );
            let knob_center = Pos2::new(
                bar_rect.left() + bar_rect.width() * f32::from(bar.progress) / 100.0,
                bar_rect.bottom(),
            );
            let knob = ui.interact(
                Rect::from_center_size(knob_center, Vec2::splat(10.0)),
                ui.make_persistent_id(("task-progress", bar.task_id)),
                Sense::drag(),
            );

            for (response, kind) in [
                (&body, DragKind::Move),
                (&left, DragKind::ResizeStart),
                (&right, DragKind::ResizeEnd),
                (&knob, DragKind::Progress),
            ] {
                if drive_task_drag(planner, response, bar.task_id, kind, canvas, &mut actions) {
                    consumed_click = true;
                }
            }

            if body.clicked() {
                actions.push(ChartAction::Select(Some(bar.task_id)));
                consumed_click = true;
            }

            let hovered = body.hovered() || left.hovered() || right.hovered() || knob.hovered();
            if left.hovered() || right.hovered() {
                ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
            } else if knob.hovered() {
                ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
            } else if body.hovered() {
                ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
            }

            if is_selected || hovered || knob.dragged() {
                draw_edit_handles(&painter, bar_rect, knob_center);
            }

            // Dependency handles just outside each end of the bar
            for side in [HandleSide::Start, HandleSide::End] {
                let center = match side {
                    HandleSide::Start => Pos2::new(bar_rect.left() - 7.0, bar_rect.center().y),
                    HandleSide::End => Pos2::new(bar_rect.right() + 7.0, bar_rect.center().y),
                };
                let handle = ui.interact(
                    Rect::from_center_size(center, Vec2::splat(theme::LINK_HANDLE_RADIUS * 3.0)),
                    ui.make_persistent_id(("link-handle", bar.task_id, side == HandleSide::End)),
                    Sense::click(),
                );
                let active = hovered || handle.hovered() || planner.is_linking();
                draw_link_handle(&painter, center, side, active, handle.hovered());

                if handle.clicked() {
                    consumed_click = true;
                    if planner.read_only() {
                        actions.push(ChartAction::Notice(READ_ONLY_MESSAGE.into()));
                        continue;
                    }
                    let hit = HandleHit {
                        task_id: bar.task_id,
                        side,
                        anchor: canvas.point(center),
                    };
                    match planner.click_link_handle(hit) {
                        LinkEffect::Commit(edge) => actions.push(ChartAction::Link(edge)),
                        LinkEffect::Started => {
                            actions.push(ChartAction::Notice(format!(
                                "Linking from '{title}': click another task's start handle, Esc to cancel"
                            )));
                        }
                        LinkEffect::Cancelled | LinkEffect::Ignored => {}
                    }
                }
            }

            if hovered {
                egui::show_tooltip_at_pointer(
                    ui.ctx(),
                    ui.layer_id(),
                    egui::Id::new(("task-tip", bar.task_id)),
                    |ui| {
                        ui.strong(title);
                        ui.label(format!(
                            "{} → {}",
                            format_date(grid.index_to_date(bar.start_index)),
                            format_date(grid.index_to_date(bar.end_index)),
                        ));
                        ui.label(format!("Progress: {}%", bar.progress));
                    },
                );
            }
        }

        // ── Dependency arrows ───────────────────────────────────
        for arrow in &layout.arrows {
            let color = if arrow.warning {
                theme::ARROW_WARNING
            } else {
                theme::ARROW
            };
            let points: Vec<Pos2> = arrow.points.iter().map(|p| canvas.pos(*p)).collect();
            painter.add(Shape::line(points.clone(), Stroke::new(1.5, color)));
            draw_arrow_head(&painter, points[2], points[3], color);

            let anchor = canvas.pos(arrow.handle_point());
            let remove = ui.interact(
                Rect::from_center_size(anchor, Vec2::splat(12.0)),
                ui.make_persistent_id(("unlink", arrow.prerequisite, arrow.dependent)),
                Sense::click(),
            );
            if remove.hovered() {
                painter.circle_filled(anchor, 6.0, theme::BG_HEADER);
                painter.circle_stroke(anchor, 6.0, Stroke::new(1.0, color));
                painter.text(
                    anchor,
                    egui::Align2::CENTER_CENTER,
                    "✕",
                    theme::font_small(),
                    theme::TEXT_PRIMARY,
                );
                let tip = if arrow.warning {
                    "Remove dependency (starts before its prerequisite ends)"
                } else {
                    "Remove dependency"
                };
                egui::show_tooltip_at_pointer(
                    ui.ctx(),
                    ui.layer_id(),
                    egui::Id::new(("unlink-tip", arrow.prerequisite, arrow.dependent)),
                    |ui| {
                        ui.label(tip);
                    },
                );
            }
            if remove.clicked() {
                consumed_click = true;
                if planner.read_only() {
                    actions.push(ChartAction::Notice(READ_ONLY_MESSAGE.into()));
                } else {
                    actions.push(ChartAction::Unlink(DependencyEdge {
                        prerequisite: arrow.prerequisite,
                        dependent: arrow.dependent,
                    }));
                }
            }
        }

        // ── Milestones ──────────────────────────────────────────
        for marker in &layout.milestones {
            let Some(milestone) = planner.milestones().get(marker.milestone_id).cloned() else {
                continue;
            };
            let x = canvas.x(marker.x + grid.day_width() / 2.0);
            painter.line_segment(
                [Pos2::new(x, canvas.body_top), Pos2::new(x, bottom)],
                Stroke::new(1.5, theme::MILESTONE),
            );
            let diamond_center = Pos2::new(x, canvas.body_top + 8.0);
            draw_diamond(&painter, diamond_center, 6.0, theme::MILESTONE);
            painter.text(
                Pos2::new(x + 9.0, canvas.body_top + 8.0),
                egui::Align2::LEFT_CENTER,
                &milestone.name,
                theme::font_small(),
                theme::MILESTONE,
            );

            let response = ui.interact(
                Rect::from_center_size(diamond_center, Vec2::splat(16.0)),
                ui.make_persistent_id(("milestone", marker.milestone_id)),
                Sense::click_and_drag(),
            );
            let ptr_x = response.interact_pointer_pos().map(|p| p.x - canvas.origin.x);
            if response.drag_started() {
                if let Some(px) = ptr_x {
                    if let Err(e) = planner.begin_milestone_drag(marker.milestone_id, px) {
                        debug!(%e, "milestone drag refused");
                    }
                }
            }
            if response.dragged() {
                ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
                if let Some(px) = ptr_x {
                    planner.drag_to(px);
                }
            }
            if response.drag_stopped() {
                planner.end_drag();
            }
            if response.clicked() || response.drag_started() {
                consumed_click = true;
            }
            if response.hovered() {
                egui::show_tooltip_at_pointer(
                    ui.ctx(),
                    ui.layer_id(),
                    egui::Id::new(("milestone-tip", marker.milestone_id)),
                    |ui| {
                        ui.strong(&milestone.name);
                        ui.label(&milestone.date);
                    },
                );
            }
        }

        // A gesture whose bar or marker left the layout still ends on release.
        let released = ui.input(|i| i.pointer.any_released() || !i.pointer.any_down());
        if released && planner.drag_phase() == DragPhase::Dragging {
            debug!("drag released away from its target");
            if let Some(commit) = planner.end_drag() {
                actions.push(ChartAction::Commit(commit));
            }
        }

        // ── Rubber band while linking ───────────────────────────
        if planner.is_linking() {
            if let Some(pos) = ui.input(|i| i.pointer.hover_pos()) {
                planner.link_pointer_moved(canvas.point(pos));
            }
            if let Some((from, to)) = planner.rubber_band() {
                painter.extend(Shape::dashed_line(
                    &[canvas.pos(from), canvas.pos(to)],
                    Stroke::new(1.5, theme::LINK_BAND),
                    6.0,
                    4.0,
                ));
            }
            ui.ctx().request_repaint();
        }

        // Empty click on background cancels linking and clears selection
        if response.clicked() && !consumed_click {
            if planner.cancel_linking() {
                actions.push(ChartAction::Notice("Linking cancelled".into()));
            }
            actions.push(ChartAction::Select(None));
        }
    });

    actions
}

/// Feed one bar region's drag state into the planner. Returns whether the
/// pointer interaction belonged to this region.
fn drive_task_drag(
    planner: &mut PlannerState,
    response: &Response,
    task_id: TaskId,
    kind: DragKind,
    canvas: Canvas,
    actions: &mut Vec<ChartAction>,
) -> bool {
    let ptr_x = response.interact_pointer_pos().map(|p| p.x - canvas.origin.x);

    if response.drag_started() {
        if let Some(px) = ptr_x {
            match planner.begin_task_drag(task_id, kind, px) {
                Ok(()) => actions.push(ChartAction::Select(Some(task_id))),
                Err(DragError::NotEditable) => {
                    actions.push(ChartAction::Notice(READ_ONLY_MESSAGE.into()))
                }
                Err(e) => debug!(%e, task = %task_id, "drag refused"),
            }
        }
    }

    let owns_gesture = planner.dragged_task() == Some((task_id, kind));
    if owns_gesture && response.dragged() {
        if let Some(px) = ptr_x {
            planner.drag_to(px);
        }
        let cursor = match kind {
            DragKind::Move | DragKind::Progress => egui::CursorIcon::Grabbing,
            DragKind::ResizeStart | DragKind::ResizeEnd => egui::CursorIcon::ResizeHorizontal,
        };
        response.ctx.set_cursor_icon(cursor);
    }
    if owns_gesture && response.drag_stopped() {
        if let Some(commit) = planner.end_drag() {
            actions.push(ChartAction::Commit(commit));
        }
    }

    response.drag_started() || response.dragged()
}

fn bar_rect(canvas: Canvas, grid: &DateGrid, bar: &TaskBar, row_height: f32) -> Rect {
    let (left, width) = bar.x_extent(grid);
    let top = canvas.body_top + bar.row as f32 * row_height + theme::BAR_INSET;
    Rect::from_min_size(
        Pos2::new(canvas.x(left), top),
        Vec2::new(width.max(4.0), row_height - theme::BAR_INSET * 2.0),
    )
}

fn edge_rect(bar: Rect, x: f32) -> Rect {
    Rect::from_min_max(
        Pos2::new(x - HANDLE_WIDTH * 0.5, bar.top()),
        Pos2::new(x + HANDLE_WIDTH * 0.5, bar.bottom()),
    )
    .expand2(Vec2::new(3.0, 0.0))
}

fn draw_rows(
    painter: &egui::Painter,
    canvas: Canvas,
    layout: &TimelineLayout,
    row_height: f32,
    width: f32,
) {
    for row in 0..layout.rows {
        let y = canvas.body_top + row as f32 * row_height;
        let fill = if row % 2 == 0 {
            theme::BG_PANEL
        } else {
            theme::BG_DARK
        };
        painter.rect_filled(
            Rect::from_min_size(Pos2::new(canvas.origin.x, y), Vec2::new(width, row_height)),
            0.0,
            fill,
        );
        painter.line_segment(
            [
                Pos2::new(canvas.origin.x, y + row_height),
                Pos2::new(canvas.origin.x + width, y + row_height),
            ],
            Stroke::new(0.5, theme::BORDER_SUBTLE),
        );
    }
}

fn draw_day_columns(painter: &egui::Painter, canvas: Canvas, grid: &DateGrid, bottom: f32) {
    let dw = grid.day_width();
    for day in grid.days() {
        let x = canvas.x(grid.index_to_pixel(day.index));
        if day.weekend && dw >= 4.0 {
            painter.rect_filled(
                Rect::from_min_max(Pos2::new(x, canvas.body_top), Pos2::new(x + dw, bottom)),
                0.0,
                theme::BG_WEEKEND,
            );
        }
        if day.month_start {
            painter.line_segment(
                [Pos2::new(x, canvas.body_top), Pos2::new(x, bottom)],
                Stroke::new(1.0, theme::MONTH_LINE),
            );
        } else if dw >= 12.0 {
            painter.line_segment(
                [Pos2::new(x, canvas.body_top), Pos2::new(x, bottom)],
                Stroke::new(0.5, theme::GRID_LINE),
            );
        }
    }
}

fn draw_header(
    painter: &egui::Painter,
    canvas: Canvas,
    planner: &PlannerState,
    grid: &DateGrid,
    width: f32,
) {
    painter.rect_filled(
        Rect::from_min_size(canvas.origin, Vec2::new(width, HEADER_HEIGHT)),
        0.0,
        theme::BG_HEADER,
    );
    painter.line_segment(
        [
            Pos2::new(canvas.origin.x, canvas.body_top),
            Pos2::new(canvas.origin.x + width, canvas.body_top),
        ],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    let header = planner.header();
    let tracks: [(&[HeaderSegment], egui::FontId, Color32); 4] = [
        (&header.years, theme::font_header(), theme::TEXT_PRIMARY),
        (&header.months, theme::font_header(), theme::TEXT_PRIMARY),
        (&header.weeks, theme::font_sub(), theme::TEXT_SECONDARY),
        (&header.days, theme::font_sub(), theme::TEXT_DIM),
    ];
    for (track, (segments, font, color)) in tracks.into_iter().enumerate() {
        let top = canvas.origin.y + track as f32 * theme::HEADER_TRACK;
        for seg in segments {
            let x = canvas.x(grid.index_to_pixel(seg.start_index));
            let w = grid.index_to_pixel(seg.span);
            painter.line_segment(
                [Pos2::new(x, top), Pos2::new(x, top + theme::HEADER_TRACK)],
                Stroke::new(0.5, theme::BORDER_SUBTLE),
            );
            // Skip labels that cannot fit.
            if w < seg.label.chars().count() as f32 * 6.5 {
                continue;
            }
            painter.text(
                Pos2::new(x + 3.0, top + theme::HEADER_TRACK / 2.0),
                egui::Align2::LEFT_CENTER,
                &seg.label,
                font.clone(),
                color,
            );
        }
    }
}

fn draw_today_line(
    painter: &egui::Painter,
    canvas: Canvas,
    grid: &DateGrid,
    index: i64,
    bottom: f32,
) {
    let x = canvas.x(grid.index_to_pixel(index) + grid.day_width() / 2.0);
    painter.line_segment(
        [Pos2::new(x, canvas.body_top), Pos2::new(x, bottom)],
        Stroke::new(1.5, theme::TODAY_LINE),
    );

    let badge_w = 42.0;
    let badge_rect = Rect::from_min_size(
        Pos2::new(x - badge_w / 2.0, canvas.body_top - 1.0),
        Vec2::new(badge_w, 14.0),
    );
    painter.rect_filled(badge_rect, Rounding::same(3.0), theme::TODAY_LINE);
    painter.text(
        badge_rect.center(),
        egui::Align2::CENTER_CENTER,
        "Today",
        theme::font_small(),
        Color32::WHITE,
    );
}

fn draw_task_bar(
    painter: &egui::Painter,
    bar: &TaskBar,
    bar_rect: Rect,
    title: &str,
    is_selected: bool,
) {
    let r = theme::BAR_ROUNDING;
    // Square off ends that continue past the visible range.
    let rounding = Rounding {
        nw: if bar.clipped_start { 0.0 } else { r },
        sw: if bar.clipped_start { 0.0 } else { r },
        ne: if bar.clipped_end { 0.0 } else { r },
        se: if bar.clipped_end { 0.0 } else { r },
    };
    let color = theme::task_color(bar.row);

    painter.rect_filled(
        bar_rect.translate(Vec2::new(1.0, 2.0)),
        rounding,
        Color32::from_black_alpha(35),
    );
    painter.rect_filled(bar_rect, rounding, color);

    if bar.progress > 0 {
        let progress_width = bar_rect.width() * f32::from(bar.progress.min(100)) / 100.0;
        let progress_rect =
            Rect::from_min_size(bar_rect.min, Vec2::new(progress_width, bar_rect.height()));
        painter.rect_filled(progress_rect, rounding, theme::PROGRESS_OVERLAY);
    }

    if is_selected {
        painter.rect_stroke(
            bar_rect.expand(1.5),
            Rounding::same(r + 1.5),
            Stroke::new(2.0, theme::BORDER_ACCENT),
        );
    }

    if bar_rect.width() > 30.0 {
        let galley =
            painter.layout_no_wrap(title.to_string(), theme::font_bar(), theme::TEXT_ON_BAR);
        let clipped = painter.with_clip_rect(bar_rect);
        let text_y = bar_rect.top() + (bar_rect.height() - galley.size().y) / 2.0;
        clipped.galley(
            Pos2::new(bar_rect.left() + 6.0, text_y),
            galley,
            Color32::TRANSPARENT,
        );
    }
}

fn draw_edit_handles(painter: &egui::Painter, bar_rect: Rect, knob: Pos2) {
    let handle_h = bar_rect.height() * 0.55;
    let handle_y = bar_rect.center().y - handle_h / 2.0;
    for x in [bar_rect.left() - 1.5, bar_rect.right() - 2.5] {
        painter.rect_filled(
            Rect::from_min_size(Pos2::new(x, handle_y), Vec2::new(4.0, handle_h)),
            Rounding::same(2.0),
            theme::HANDLE_COLOR,
        );
    }
    painter.circle_filled(knob, 4.0, theme::HANDLE_COLOR);
    painter.circle_stroke(knob, 4.0, Stroke::new(1.0, theme::BG_DARK));
}

fn draw_link_handle(
    painter: &egui::Painter,
    center: Pos2,
    side: HandleSide,
    active: bool,
    hovered: bool,
) {
    let color = match (active, hovered) {
        (_, true) => theme::LINK_BAND,
        (true, false) => theme::ARROW,
        (false, false) => theme::GRID_LINE,
    };
    let radius = theme::LINK_HANDLE_RADIUS;
    match side {
        HandleSide::Start => painter.circle_stroke(center, radius, Stroke::new(1.5, color)),
        HandleSide::End => painter.circle_filled(center, radius, color),
    };
}

fn draw_arrow_head(painter: &egui::Painter, from: Pos2, tip: Pos2, color: Color32) {
    let dir = if tip.x >= from.x { 1.0 } else { -1.0 };
    let back = tip.x - dir * 6.0;
    painter.add(Shape::convex_polygon(
        vec![tip, Pos2::new(back, tip.y - 4.0), Pos2::new(back, tip.y + 4.0)],
        color,
        Stroke::NONE,
    ));
}

fn draw_diamond(painter: &egui::Painter, center: Pos2, size: f32, color: Color32) {
    painter.add(Shape::convex_polygon(
        vec![
            Pos2::new(center.x, center.y - size),
            Pos2::new(center.x + size, center.y),
            Pos2::new(center.x, center.y + size),
            Pos2::new(center.x - size, center.y),
        ],
        color,
        Stroke::NONE,
    ));
}
