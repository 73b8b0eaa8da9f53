use tiny_skia::{Paint, Color, Rect as SkRect, Transform, PixmapMut, PathBuilder, Stroke};
use cosmic_text::{Align, Attrs, Buffer, FontSystem, Metrics, SwashCache};
use crate::state::AppState;
use crate::config::ThemeConfig;
use crate::window::Rect;

fn faded(color: Color, opacity: f32) -> Color {
    let mut color = color;
    color.apply_opacity(opacity);
    color
}

fn sk_rect(rect: Rect) -> Option<SkRect> {
    SkRect::from_xywh(rect.origin.x, rect.origin.y, rect.size.width, rect.size.height)
}

pub struct Renderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
        }
    }

    /// Draws the whole surface: transparent everywhere except the panel.
    pub fn draw(&mut self, pixmap: &mut PixmapMut, state: &AppState) {
        pixmap.fill(Color::TRANSPARENT);

        let window = &state.window;
        if !window.is_visible() {
            return;
        }

        let theme = &state.config.theme;
        let opacity = window.opacity().clamp(0.0, 1.0);
        let color = |hex: &str| faded(ThemeConfig::parse_color(hex), opacity);

        let panel = window.panel();
        let origin = panel.origin;

        if let Some(rect) = sk_rect(panel) {
            self.draw_rounded_rect(pixmap, rect, theme.border_radius, color(&theme.background), Some(color(&theme.border_color)));
        }

        // Title
        let title = window.title_rect().offset(origin);
        self.draw_text(pixmap, &state.config.general.title, title, 28.0, color(&theme.title), Some(Align::Center));

        // Close button
        let close = window.close_button().offset(origin);
        if let Some(rect) = sk_rect(close) {
            self.draw_rounded_rect(pixmap, rect, 3.0, color(&theme.close_background), None);
        }
        let close_label = Rect::new(close.origin.x, close.origin.y + 4.0, close.size.width, close.size.height);
        self.draw_text(pixmap, "X", close_label, 15.0, color(&theme.text), Some(Align::Center));

        // Search box
        let search = window.search_box().offset(origin);
        if let Some(rect) = sk_rect(search) {
            let focus = window.state().query_focused.then(|| color(&theme.border_color));
            self.draw_rounded_rect(pixmap, rect, 4.0, color(&theme.input_background), focus);
        }
        let text_rect = Rect::new(search.origin.x + 8.0, search.origin.y + 6.0, search.size.width - 16.0, 18.0);
        if state.query.is_empty() {
            self.draw_text(pixmap, &state.placeholder(), text_rect, 15.0, color(&theme.placeholder), None);
        } else {
            self.draw_text(pixmap, &state.query, text_rect, 15.0, color(&theme.text), None);
        }

        // Sync status
        if let Some(indicator) = state.load_status.indicator() {
            let status_color = if indicator.is_error { &theme.error_text } else { &theme.placeholder };
            let status = Rect::new(search.origin.x, search.bottom() + 2.0, search.size.width, 14.0);
            self.draw_text(pixmap, &indicator.text, status, 11.0, color(status_color), None);
        }

        // Results
        let Some(area) = window.results_area().map(|r| r.offset(origin)) else {
            return;
        };
        let item_height = window.layout().item_height;
        for (row, (index, entry)) in state.visible_results().enumerate() {
            let y = area.origin.y + row as f32 * item_height;
            let button = Rect::new(area.origin.x, y, area.size.width - 10.0, item_height - 5.0);
            let background = if index == state.selected_index {
                &theme.selection_background
            } else {
                &theme.item_background
            };
            if let Some(rect) = sk_rect(button) {
                self.draw_rounded_rect(pixmap, rect, 3.0, color(background), None);
            }

            let label = Rect::new(button.origin.x, y + (button.size.height - 16.0) / 2.0, button.size.width, 18.0);
            let name = entry.display_name().unwrap_or_default();
            self.draw_text(pixmap, name, label, 15.0, color(&theme.text), Some(Align::Center));
        }
    }

    fn draw_rounded_rect(&self, pixmap: &mut PixmapMut, rect: SkRect, radius: f32, fill: Color, stroke: Option<Color>) {
        let mut pb = PathBuilder::new();
        let x = rect.left();
        let y = rect.top();
        let w = rect.width();
        let h = rect.height();
        let radius = radius.min(w / 2.0).min(h / 2.0);

        pb.move_to(x + radius, y);
        pb.line_to(x + w - radius, y);
        pb.quad_to(x + w, y, x + w, y + radius);
        pb.line_to(x + w, y + h - radius);
        pb.quad_to(x + w, y + h, x + w - radius, y + h);
        pb.line_to(x + radius, y + h);
        pb.quad_to(x, y + h, x, y + h - radius);
        pb.line_to(x, y + radius);
        pb.quad_to(x, y, x + radius, y);
        pb.close();

        if let Some(path) = pb.finish() {
            let mut paint = Paint::default();
            paint.set_color(fill);
            paint.anti_alias = true;
            pixmap.fill_path(&path, &paint, tiny_skia::FillRule::Winding, Transform::identity(), None);

            if let Some(s_color) = stroke {
                let mut s_paint = Paint::default();
                s_paint.set_color(s_color);
                s_paint.anti_alias = true;
                let stroke_obj = Stroke { width: 1.5, ..Default::default() };
                pixmap.stroke_path(&path, &s_paint, &stroke_obj, Transform::identity(), None);
            }
        }
    }

    fn draw_text(&mut self, pixmap: &mut PixmapMut, text: &str, bounds: Rect, size: f32, color: Color, align: Option<Align>) {
        if text.is_empty() || bounds.size.width <= 0.0 {
            return;
        }
        let x = bounds.origin.x;
        let y = bounds.origin.y;

        let mut buffer = Buffer::new(&mut self.font_system, Metrics::new(size, size));
        buffer.set_size(&mut self.font_system, Some(bounds.size.width), None);
        buffer.set_text(&mut self.font_system, text, Attrs::new(), cosmic_text::Shaping::Advanced);
        for line in buffer.lines.iter_mut() {
            line.set_align(align);
        }
        buffer.shape_until_scroll(&mut self.font_system, false);

        let text_color = cosmic_text::Color::rgba(
            (color.red() * 255.0) as u8,
            (color.green() * 255.0) as u8,
            (color.blue() * 255.0) as u8,
            (color.alpha() * 255.0) as u8,
        );

        buffer.draw(&mut self.font_system, &mut self.swash_cache, text_color, |draw_x, draw_y, w, h, color| {
            let draw_x = draw_x + x as i32;
            let draw_y = draw_y + y as i32;
            if w == 0 || h == 0 { return; }
            if draw_x >= 0 && draw_y >= 0 && draw_x < pixmap.width() as i32 && draw_y < pixmap.height() as i32 {
                 let paint = Paint {
                    shader: tiny_skia::Shader::SolidColor(tiny_skia::Color::from_rgba8(color.r(), color.g(), color.b(), color.a())),
                    ..Paint::default()
                };
                let rect = SkRect::from_xywh(draw_x as f32, draw_y as f32, w as f32, h as f32);
                if let Some(r) = rect {
                    pixmap.fill_rect(r, &paint, Transform::identity(), None);
                }
            }
        });
    }
}
