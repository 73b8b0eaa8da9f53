//! Panel lifecycle: visibility, fade, placement, dragging and result-driven
//! resizing. Nothing here touches the display; the Wayland adapter reads the
//! state back every frame.

use std::ops::{Add, Sub};

use log::debug;

use crate::config::{LayoutConfig, WindowPosition};

/// Opacity difference treated as "arrived".
pub const OPACITY_EPSILON: f32 = 0.01;

/// Frame length the fade factor is tuned for.
pub const NOMINAL_FRAME_MS: f32 = 1000.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn right(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.origin.x && p.x < self.right() && p.y >= self.origin.y && p.y < self.bottom()
    }

    /// This rect moved by `offset`, e.g. from panel-local to surface coordinates.
    pub fn offset(&self, offset: Point) -> Rect {
        Rect {
            origin: self.origin + offset,
            size: self.size,
        }
    }
}

/// Where the panel is in its fade cycle, derived from the flags below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closed,
    Opening,
    Open,
    Closing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowState {
    pub is_open: bool,
    pub visible: bool,
    pub current_opacity: f32,
    pub target_opacity: f32,
    /// Pointer offset from the panel origin, present only while dragging.
    pub drag_anchor: Option<Point>,
    pub panel: Rect,
    pub results_visible: bool,
    pub results_height: f32,
    pub query_focused: bool,
}

pub fn lerp(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}

/// Smoothing factor for `frames` nominal frames, so slow frames fade as far
/// as the same number of fast ones would.
pub fn frame_factor(factor: f32, frames: f32) -> f32 {
    let factor = factor.clamp(0.0, 1.0);
    if frames == 1.0 {
        return factor;
    }
    1.0 - (1.0 - factor).powf(frames.max(0.0))
}

/// Panel origin for a placement preference on a screen of the given size.
pub fn position_origin(position: WindowPosition, screen: Size, panel: Size, edge_offset: f32) -> Point {
    let y = screen.height / 2.0 - panel.height / 2.0;
    let x = match position {
        WindowPosition::Left => edge_offset,
        WindowPosition::Right => screen.width - panel.width - edge_offset,
        WindowPosition::Center => screen.width / 2.0 - panel.width / 2.0,
    };
    Point::new(x.floor(), y.floor())
}

/// Height of the results region for `match_count` matches; zero hides it.
pub fn results_height(match_count: usize, layout: &LayoutConfig) -> f32 {
    if match_count == 0 {
        return 0.0;
    }
    let content = match_count as f32 * layout.item_height + layout.margin;
    content.min(layout.max_results_height())
}

pub fn panel_height(match_count: usize, layout: &LayoutConfig) -> f32 {
    if match_count == 0 {
        return layout.header_height;
    }
    layout.header_height + results_height(match_count, layout) + layout.margin
}

pub struct WindowController {
    state: WindowState,
    layout: LayoutConfig,
    position: WindowPosition,
    fade_factor: f32,
    screen: Size,
}

impl WindowController {
    pub fn new(layout: LayoutConfig, position: WindowPosition, fade_factor: f32) -> Self {
        let panel = Rect::new(0.0, 0.0, layout.width, layout.header_height);
        Self {
            state: WindowState {
                is_open: false,
                visible: false,
                current_opacity: 0.0,
                target_opacity: 0.0,
                drag_anchor: None,
                panel,
                results_visible: false,
                results_height: 0.0,
                query_focused: false,
            },
            layout,
            position,
            fade_factor,
            screen: Size::default(),
        }
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    pub fn is_visible(&self) -> bool {
        self.state.visible
    }

    pub fn is_dragging(&self) -> bool {
        self.state.drag_anchor.is_some()
    }

    pub fn opacity(&self) -> f32 {
        self.state.current_opacity
    }

    pub fn panel(&self) -> Rect {
        self.state.panel
    }

    pub fn phase(&self) -> Phase {
        if !self.state.visible {
            Phase::Closed
        } else if self.state.is_open {
            if self.state.target_opacity - self.state.current_opacity < OPACITY_EPSILON {
                Phase::Open
            } else {
                Phase::Opening
            }
        } else {
            Phase::Closing
        }
    }

    /// Whether another frame is needed to make progress.
    pub fn is_animating(&self) -> bool {
        self.state.visible
            && (self.is_dragging()
                || (self.state.current_opacity - self.state.target_opacity).abs() >= OPACITY_EPSILON
                || !self.state.is_open)
    }

    /// Surface area that should receive pointer input. Nothing is accepted
    /// once the panel has been dismissed, even while it is still fading.
    pub fn input_region(&self) -> Option<Rect> {
        (self.state.is_open && self.state.visible).then_some(self.state.panel)
    }

    /// Whether the panel should hold keyboard focus.
    pub fn grabs_keyboard(&self) -> bool {
        self.state.is_open
    }

    /// Screen size used by the next placement.
    pub fn set_screen(&mut self, screen: Size) {
        self.screen = screen;
    }

    pub fn set_position(&mut self, position: WindowPosition) {
        self.position = position;
    }

    pub fn toggle(&mut self) -> bool {
        self.state.is_open = !self.state.is_open;

        if self.state.is_open {
            self.state.visible = true;
            self.state.target_opacity = 1.0;
            self.apply_position();
            self.state.query_focused = true;
            debug!("window: opening at {:?}", self.state.panel.origin);
        } else {
            self.state.target_opacity = 0.0;
            debug!("window: closing");
        }
        self.state.is_open
    }

    fn apply_position(&mut self) {
        self.state.panel.origin =
            position_origin(self.position, self.screen, self.state.panel.size, self.layout.edge_offset);
    }

    /// Advances one rendered frame. `frames` is the elapsed time in nominal
    /// frames (1.0 at 60 Hz); `pointer` is the latest pointer position.
    pub fn tick(&mut self, frames: f32, pointer: Point) {
        if let Some(anchor) = self.state.drag_anchor {
            self.state.panel.origin = pointer - anchor;
        }

        let factor = frame_factor(self.fade_factor, frames);
        self.state.current_opacity = lerp(self.state.current_opacity, self.state.target_opacity, factor);

        if self.state.current_opacity < OPACITY_EPSILON && !self.state.is_open && self.state.visible {
            self.state.visible = false;
            self.state.drag_anchor = None;
            self.state.query_focused = false;
            debug!("window: closed");
        }
    }

    /// Starts a drag if `pointer` is inside the header band.
    pub fn begin_drag(&mut self, pointer: Point) -> bool {
        if !self.state.is_open {
            return false;
        }
        if pointer.y - self.state.panel.origin.y >= self.layout.drag_zone {
            return false;
        }
        self.state.drag_anchor = Some(pointer - self.state.panel.origin);
        debug!("window: drag started");
        true
    }

    pub fn end_drag(&mut self) {
        if self.state.drag_anchor.take().is_some() {
            debug!("window: drag ended at {:?}", self.state.panel.origin);
        }
    }

    pub fn on_results_changed(&mut self, match_count: usize) {
        self.state.results_height = results_height(match_count, &self.layout);
        self.state.results_visible = match_count > 0;
        self.state.panel.size.height = panel_height(match_count, &self.layout);
    }

    // Panel-local geometry, shared by the renderer and hit testing.

    pub fn title_rect(&self) -> Rect {
        Rect::new(0.0, 15.0, self.layout.width, 40.0)
    }

    pub fn close_button(&self) -> Rect {
        Rect::new(self.layout.width - 35.0, 5.0, 25.0, 25.0)
    }

    pub fn search_box(&self) -> Rect {
        Rect::new(20.0, 65.0, self.layout.width - 40.0, 28.0)
    }

    /// Results region, present only while there are results to show.
    pub fn results_area(&self) -> Option<Rect> {
        if !self.state.results_visible {
            return None;
        }
        Some(Rect::new(
            30.0,
            self.layout.header_height,
            self.layout.width - 60.0,
            self.state.results_height,
        ))
    }

    /// Number of result rows that fit in the results region.
    pub fn visible_rows(&self) -> usize {
        if self.layout.item_height <= 0.0 {
            return 0;
        }
        (self.state.results_height / self.layout.item_height).floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Size = Size { width: 1920.0, height: 1080.0 };

    fn controller() -> WindowController {
        let mut c = WindowController::new(LayoutConfig::default(), WindowPosition::Center, 0.05);
        c.set_screen(SCREEN);
        c
    }

    fn tick_n(c: &mut WindowController, n: usize) {
        for _ in 0..n {
            c.tick(1.0, Point::default());
        }
    }

    #[test]
    fn starts_closed_and_transparent() {
        let c = controller();
        assert!(!c.is_open());
        assert!(!c.is_visible());
        assert_eq!(c.opacity(), 0.0);
        assert_eq!(c.phase(), Phase::Closed);
        assert!(!c.is_animating());
    }

    #[test]
    fn lerp_moves_by_factor() {
        assert_eq!(lerp(0.0, 1.0, 0.05), 0.05);
        assert_eq!(lerp(1.0, 0.0, 0.5), 0.5);
        assert_eq!(lerp(0.3, 0.3, 0.05), 0.3);
    }

    #[test]
    fn frame_factor_compounds_over_frames() {
        assert_eq!(frame_factor(0.05, 1.0), 0.05);
        let two = frame_factor(0.05, 2.0);
        assert!((two - (1.0 - 0.95f32 * 0.95)).abs() < 1e-6);
        assert_eq!(frame_factor(0.05, 0.0), 0.0);
    }

    #[test]
    fn toggle_open_shows_focuses_and_places() {
        let mut c = controller();
        assert!(c.toggle());

        assert!(c.is_visible());
        assert_eq!(c.state().target_opacity, 1.0);
        assert!(c.state().query_focused);
        assert_eq!(c.panel().origin, Point::new(790.0, 485.0));
        assert_eq!(c.phase(), Phase::Opening);
    }

    #[test]
    fn position_policy() {
        let panel = Size::new(340.0, 110.0);
        assert_eq!(
            position_origin(WindowPosition::Left, SCREEN, panel, 100.0),
            Point::new(100.0, 485.0)
        );
        assert_eq!(
            position_origin(WindowPosition::Right, SCREEN, panel, 100.0),
            Point::new(1480.0, 485.0)
        );
        assert_eq!(
            position_origin(WindowPosition::Center, SCREEN, panel, 100.0),
            Point::new(790.0, 485.0)
        );
    }

    #[test]
    fn placement_uses_latest_screen_and_preference() {
        let mut c = controller();
        c.set_position(WindowPosition::Right);
        c.set_screen(Size::new(1280.0, 720.0));
        c.toggle();
        assert_eq!(c.panel().origin, Point::new(840.0, 305.0));
    }

    #[test]
    fn fade_in_converges_monotonically() {
        let mut c = controller();
        c.toggle();

        let mut last = c.opacity();
        let mut ticks = 0;
        while 1.0 - c.opacity() >= OPACITY_EPSILON {
            c.tick(1.0, Point::default());
            assert!(c.opacity() > last);
            last = c.opacity();
            ticks += 1;
            assert!(ticks < 200, "fade did not converge");
        }
        assert_eq!(c.phase(), Phase::Open);
        assert!(c.is_visible());
        assert!(!c.is_animating());
    }

    #[test]
    fn closing_stays_visible_until_faded() {
        let mut c = controller();
        c.toggle();
        tick_n(&mut c, 150);

        c.toggle();
        assert_eq!(c.state().target_opacity, 0.0);
        assert!(c.is_visible());
        assert_eq!(c.phase(), Phase::Closing);

        let mut last = c.opacity();
        let mut ticks = 0;
        while c.is_visible() {
            c.tick(1.0, Point::default());
            assert!(c.opacity() < last);
            last = c.opacity();
            if c.is_visible() {
                assert!(c.opacity() >= OPACITY_EPSILON);
            }
            ticks += 1;
            assert!(ticks < 200, "fade out did not converge");
        }
        assert!(c.opacity() < OPACITY_EPSILON);
        assert_eq!(c.phase(), Phase::Closed);
        assert!(!c.is_animating());
    }

    #[test]
    fn open_panel_never_hides_even_when_transparent() {
        let mut c = controller();
        c.toggle();
        // Toggled open while still fully transparent: no hide.
        c.tick(0.0, Point::default());
        assert!(c.opacity() < OPACITY_EPSILON);
        assert!(c.is_visible());
    }

    #[test]
    fn reopening_mid_fade_reverses() {
        let mut c = controller();
        c.toggle();
        tick_n(&mut c, 150);
        c.toggle();
        tick_n(&mut c, 10);
        let mid = c.opacity();

        c.toggle();
        assert!(c.is_open());
        c.tick(1.0, Point::default());
        assert!(c.opacity() > mid);
    }

    #[test]
    fn drag_only_from_header_band() {
        let mut c = controller();
        c.toggle();
        let origin = c.panel().origin;

        assert!(!c.begin_drag(origin + Point::new(50.0, 60.0)));
        assert!(!c.is_dragging());
        assert!(!c.begin_drag(origin + Point::new(50.0, 200.0)));
        assert!(!c.is_dragging());

        assert!(c.begin_drag(origin + Point::new(50.0, 59.0)));
        assert!(c.is_dragging());
        assert_eq!(c.state().drag_anchor, Some(Point::new(50.0, 59.0)));
    }

    #[test]
    fn drag_refused_unless_open() {
        let mut c = controller();
        let origin = c.panel().origin;
        assert!(!c.begin_drag(origin + Point::new(10.0, 10.0)));

        c.toggle();
        tick_n(&mut c, 150);
        c.toggle();
        assert!(c.is_visible());
        let origin = c.panel().origin;
        assert!(!c.begin_drag(origin + Point::new(10.0, 10.0)));
        assert!(!c.is_dragging());
    }

    #[test]
    fn input_released_as_soon_as_dismissed() {
        let mut c = controller();
        assert_eq!(c.input_region(), None);
        assert!(!c.grabs_keyboard());

        c.toggle();
        assert_eq!(c.input_region(), Some(c.panel()));
        assert!(c.grabs_keyboard());

        c.on_results_changed(4);
        assert_eq!(c.input_region().map(|r| r.size.height), Some(c.panel().size.height));

        tick_n(&mut c, 150);
        c.toggle();
        assert!(c.is_visible());
        assert_eq!(c.input_region(), None);
        assert!(!c.grabs_keyboard());

        c.toggle();
        assert_eq!(c.input_region(), Some(c.panel()));
        assert!(c.grabs_keyboard());
    }

    #[test]
    fn zero_item_height_shows_no_rows() {
        let layout = LayoutConfig { item_height: 0.0, ..LayoutConfig::default() };
        let mut c = WindowController::new(layout, WindowPosition::Center, 0.05);
        c.on_results_changed(5);
        assert_eq!(c.visible_rows(), 0);
    }

    #[test]
    fn drag_follows_pointer_until_released() {
        let mut c = controller();
        c.toggle();
        let origin = c.panel().origin;
        c.begin_drag(origin + Point::new(10.0, 20.0));
        assert!(c.is_animating());

        c.tick(1.0, Point::new(300.0, 400.0));
        assert_eq!(c.panel().origin, Point::new(290.0, 380.0));

        c.end_drag();
        assert!(!c.is_dragging());
        c.tick(1.0, Point::new(0.0, 0.0));
        assert_eq!(c.panel().origin, Point::new(290.0, 380.0));
    }

    #[test]
    fn drag_overrides_position_until_reopen() {
        let mut c = controller();
        c.toggle();
        let origin = c.panel().origin;
        c.begin_drag(origin + Point::new(5.0, 5.0));
        c.tick(1.0, Point::new(105.0, 105.0));
        c.end_drag();
        assert_eq!(c.panel().origin, Point::new(100.0, 100.0));

        c.toggle();
        c.toggle();
        assert_eq!(c.panel().origin, Point::new(790.0, 485.0));
    }

    #[test]
    fn resize_follows_result_count() {
        let layout = LayoutConfig::default();
        let mut c = controller();

        c.on_results_changed(0);
        assert_eq!(c.panel().size.height, layout.header_height);
        assert!(!c.state().results_visible);
        assert!(c.results_area().is_none());

        c.on_results_changed(3);
        assert_eq!(c.panel().size.height, 110.0 + 3.0 * 35.0 + 10.0 + 10.0);
        assert!(c.state().results_visible);
        assert_eq!(c.visible_rows(), 3);

        c.on_results_changed(0);
        assert_eq!(c.panel().size.height, layout.header_height);
    }

    #[test]
    fn resize_is_monotonic_and_capped() {
        let layout = LayoutConfig::default();
        let cap = layout.max_results_height() + layout.header_height + layout.margin;

        let mut last = panel_height(1, &layout);
        for n in 1..=200 {
            let h = panel_height(n, &layout);
            assert!(h >= last, "height shrank at {n}");
            assert!(h <= cap, "height exceeded cap at {n}");
            last = h;
        }
        assert_eq!(panel_height(100, &layout), cap);
        assert_eq!(panel_height(0, &layout), layout.header_height);
    }

    #[test]
    fn resize_keeps_origin() {
        let mut c = controller();
        c.toggle();
        let origin = c.panel().origin;
        c.on_results_changed(5);
        assert_eq!(c.panel().origin, origin);
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(!r.contains(Point::new(30.0, 15.0)));
        assert_eq!(r.offset(Point::new(5.0, 5.0)), Rect::new(15.0, 15.0, 20.0, 20.0));
    }
}
