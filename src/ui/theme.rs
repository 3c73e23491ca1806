use egui::{Color32, FontId, Rounding, Stroke, Visuals};

// ── Palette ──────────────────────────────────────────────────────────────────

pub const BG_DARK: Color32 = Color32::from_rgb(24, 24, 32);
pub const BG_PANEL: Color32 = Color32::from_rgb(30, 30, 40);
pub const BG_HEADER: Color32 = Color32::from_rgb(34, 37, 48);
pub const BG_WEEKEND: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 40);
pub const BG_SELECTED: Color32 = Color32::from_rgba_premultiplied(80, 140, 220, 45);
pub const BG_STATUS: Color32 = Color32::from_rgb(22, 22, 30);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(50, 52, 64);
pub const BORDER_ACCENT: Color32 = Color32::from_rgb(90, 140, 220);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(230, 232, 240);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(155, 160, 178);
pub const TEXT_DIM: Color32 = Color32::from_rgb(100, 105, 120);
pub const TEXT_ON_BAR: Color32 = Color32::from_rgb(255, 255, 255);

pub const ACCENT: Color32 = Color32::from_rgb(80, 140, 220);
pub const TODAY_LINE: Color32 = Color32::from_rgb(240, 75, 75);
pub const GRID_LINE: Color32 = Color32::from_rgb(44, 46, 58);
pub const MONTH_LINE: Color32 = Color32::from_rgb(70, 74, 92);
pub const HANDLE_COLOR: Color32 = Color32::from_rgb(255, 255, 255);

pub const ARROW: Color32 = Color32::from_rgb(150, 156, 176);
pub const ARROW_WARNING: Color32 = Color32::from_rgb(245, 166, 35);
pub const LINK_BAND: Color32 = Color32::from_rgb(120, 200, 255);
pub const MILESTONE: Color32 = Color32::from_rgb(255, 193, 7);

pub const PROGRESS_OVERLAY: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 55);

// ── Sizes ────────────────────────────────────────────────────────────────────

/// Four header tracks: years, months, weeks, days.
pub const HEADER_TRACK: f32 = 15.0;
pub const HEADER_HEIGHT: f32 = HEADER_TRACK * 4.0;
pub const HANDLE_WIDTH: f32 = 7.0;
pub const LINK_HANDLE_RADIUS: f32 = 4.5;
pub const BAR_ROUNDING: f32 = 5.0;
pub const BAR_INSET: f32 = 5.0; // vertical inset so bars don't touch row edges
pub const SIDE_PANEL_WIDTH: f32 = 300.0;
pub const STATUS_BAR_HEIGHT: f32 = 24.0;

// ── Fonts ────────────────────────────────────────────────────────────────────

pub fn font_header() -> FontId {
    FontId::proportional(11.0)
}

pub fn font_sub() -> FontId {
    FontId::proportional(9.5)
}

pub fn font_bar() -> FontId {
    FontId::proportional(11.5)
}

pub fn font_small() -> FontId {
    FontId::proportional(9.5)
}

pub fn font_menu() -> FontId {
    FontId::proportional(13.0)
}

pub fn font_status() -> FontId {
    FontId::proportional(11.0)
}

// ── Task color palette ───────────────────────────────────────────────────────

pub const TASK_COLORS: &[Color32] = &[
    Color32::from_rgb(84, 140, 230),  // Blue
    Color32::from_rgb(52, 168, 83),   // Green
    Color32::from_rgb(171, 71, 188),  // Purple
    Color32::from_rgb(251, 140, 0),   // Orange
    Color32::from_rgb(3, 169, 244),   // Light blue
    Color32::from_rgb(229, 57, 53),   // Red
    Color32::from_rgb(0, 188, 212),   // Cyan
];

/// Bars are colored by row so neighbours differ.
pub fn task_color(row: usize) -> Color32 {
    TASK_COLORS[row % TASK_COLORS.len()]
}

// ── Apply custom visuals ─────────────────────────────────────────────────────

fn widget_style(
    visuals: &mut egui::style::WidgetVisuals,
    fill: Color32,
    border: Color32,
    text: Stroke,
) {
    visuals.bg_fill = fill;
    visuals.weak_bg_fill = fill;
    visuals.bg_stroke = Stroke::new(1.0, border);
    visuals.fg_stroke = text;
    visuals.rounding = Rounding::same(4.0);
}

pub fn apply_theme(ctx: &egui::Context) {
    let mut visuals = Visuals::dark();
    visuals.override_text_color = Some(TEXT_PRIMARY);
    visuals.panel_fill = BG_PANEL;
    visuals.window_fill = BG_PANEL;
    visuals.faint_bg_color = BG_PANEL;
    visuals.extreme_bg_color = BG_STATUS; // text fields, scroll tracks
    visuals.window_rounding = Rounding::same(6.0);
    visuals.window_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.striped = false;

    let w = &mut visuals.widgets;
    widget_style(&mut w.noninteractive, BG_PANEL, BORDER_SUBTLE, Stroke::new(1.0, TEXT_SECONDARY));
    widget_style(&mut w.inactive, BG_HEADER, BORDER_SUBTLE, Stroke::new(1.0, TEXT_PRIMARY));
    widget_style(&mut w.hovered, GRID_LINE, ACCENT, Stroke::new(1.0, TEXT_PRIMARY));
    widget_style(&mut w.active, MONTH_LINE, ACCENT, Stroke::new(2.0, Color32::WHITE));
    widget_style(&mut w.open, GRID_LINE, ACCENT, Stroke::new(1.0, TEXT_PRIMARY));

    visuals.selection.bg_fill = BG_SELECTED;
    visuals.selection.stroke = Stroke::new(1.0, ACCENT);
    ctx.set_visuals(visuals);

    ctx.style_mut(|style| {
        style.spacing.item_spacing = egui::vec2(8.0, 4.0);
        style.spacing.button_padding = egui::vec2(8.0, 4.0);
    });
}
