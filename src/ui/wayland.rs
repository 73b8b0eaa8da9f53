use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState, Region},
    delegate_compositor, delegate_keyboard, delegate_output, delegate_pointer, delegate_registry,
    delegate_seat, delegate_shm, delegate_layer,
    output::{OutputHandler, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    seat::{
        keyboard::{KeyEvent, KeyboardHandler, Modifiers},
        pointer::{PointerEvent, PointerEventKind, PointerHandler, BTN_LEFT},
        Capability, SeatHandler, SeatState,
    },
    shell::{
        wlr_layer::{
            Anchor, KeyboardInteractivity, Layer, LayerShell, LayerShellHandler, LayerSurface,
            LayerSurfaceConfigure,
        },
        WaylandSurface,
    },
    shm::{slot::SlotPool, Shm, ShmHandler},
};
use wayland_client::{
    globals::GlobalList,
    protocol::{wl_keyboard, wl_output, wl_pointer, wl_seat, wl_shm, wl_surface},
    Connection, QueueHandle,
};
use xkbcommon::xkb::{self, keysyms};
use log::{debug, warn};
use crate::config::{load_config, WindowPosition};
use crate::executor::{ArboardClipboard, DesktopNotifications, NotificationLevel, Notifications};
use crate::sources::{LoadEvent, LoadOutcome};
use crate::state::{AppState, Hit};
use crate::ui::render::Renderer;
use crate::window::{Point, Size, NOMINAL_FRAME_MS};

/// Scroll distance, in axis units, that moves the result list by one row.
const SCROLL_STEP: f64 = 15.0;

pub struct WaylandApp {
    pub registry_state: RegistryState,
    pub seat_state: SeatState,
    pub output_state: OutputState,
    pub compositor_state: CompositorState,
    pub shm_state: Shm,
    pub layer_shell_state: LayerShell,

    pub layer_surface: Option<LayerSurface>,
    pub pool: Option<SlotPool>,
    pub width: u32,
    pub height: u32,
    pub configured: bool,
    pub open_pending: bool,
    pub should_exit: bool,
    keyboard_grabbed: bool,

    pub position_override: Option<WindowPosition>,
    pointer_position: Point,
    scroll_accum: f64,
    last_frame_time: Option<u32>,

    pub state: AppState,
    pub renderer: Renderer,
    clipboard: ArboardClipboard,
    notifications: DesktopNotifications,
}

impl WaylandApp {
    pub fn new(globals: &GlobalList, qh: &QueueHandle<Self>, state: AppState, renderer: Renderer) -> anyhow::Result<Self> {
        let registry_state = RegistryState::new(globals);
        let seat_state = SeatState::new(globals, qh);
        let output_state = OutputState::new(globals, qh);
        let compositor_state = CompositorState::bind(globals, qh)?;
        let shm_state = Shm::bind(globals, qh)?;
        let layer_shell_state = LayerShell::bind(globals, qh)?;
        let notifications = DesktopNotifications::new(state.config.general.title.clone());

        Ok(Self {
            registry_state,
            seat_state,
            output_state,
            compositor_state,
            shm_state,
            layer_shell_state,
            layer_surface: None,
            pool: None,
            width: 0,
            height: 0,
            configured: false,
            open_pending: false,
            should_exit: false,
            keyboard_grabbed: false,
            position_override: None,
            pointer_position: Point::default(),
            scroll_accum: 0.0,
            last_frame_time: None,
            state,
            renderer,
            clipboard: ArboardClipboard::new(),
            notifications,
        })
    }

    /// Opens or closes the panel. Opening maps a fresh overlay surface when
    /// none exists; the panel is placed once its size is known.
    pub fn request_toggle(&mut self, qh: &QueueHandle<Self>) {
        debug!("Toggle requested while {:?}", self.state.window.phase());
        if !self.state.window.is_open() {
            self.refresh_position();
        }
        if self.state.window.is_open() || self.configured {
            self.state.window.toggle();
            self.sync_input();
            self.schedule_frame(qh);
            return;
        }

        self.open_pending = true;
        if self.layer_surface.is_none() {
            self.create_surface(qh);
        }
    }

    /// Re-reads the placement preference; a command line override wins.
    fn refresh_position(&mut self) {
        let position = match self.position_override {
            Some(position) => position,
            None => match load_config() {
                Ok(config) => config.general.position,
                Err(err) => {
                    warn!("Failed to reload config: {}", err);
                    return;
                }
            },
        };
        self.state.window.set_position(position);
    }

    fn create_surface(&mut self, qh: &QueueHandle<Self>) {
        let surface = self.compositor_state.create_surface(qh);
        let layer_surface = self.layer_shell_state.create_layer_surface(
            qh,
            surface,
            Layer::Overlay,
            Some("wayfinder"),
            None,
        );

        layer_surface.set_anchor(Anchor::TOP | Anchor::BOTTOM | Anchor::LEFT | Anchor::RIGHT);
        layer_surface.set_size(0, 0);
        layer_surface.set_exclusive_zone(-1);
        layer_surface.set_keyboard_interactivity(KeyboardInteractivity::Exclusive);
        layer_surface.commit();
        self.layer_surface = Some(layer_surface);
        self.keyboard_grabbed = true;
        debug!("Overlay surface created");
    }

    fn release_surface(&mut self) {
        self.layer_surface = None;
        self.pool = None;
        self.configured = false;
        self.last_frame_time = None;
        self.keyboard_grabbed = false;
        debug!("Overlay surface released");
    }

    /// Limits pointer input to the panel and drops the keyboard grab once
    /// the panel is dismissed, so the desktop underneath stays usable.
    /// Takes effect on the next commit.
    fn sync_input(&mut self) {
        let Some(layer_surface) = &self.layer_surface else {
            return;
        };

        match Region::new(&self.compositor_state) {
            Ok(region) => {
                if let Some(rect) = self.state.window.input_region() {
                    region.add(
                        rect.origin.x.floor() as i32,
                        rect.origin.y.floor() as i32,
                        rect.size.width.ceil() as i32,
                        rect.size.height.ceil() as i32,
                    );
                }
                layer_surface.wl_surface().set_input_region(Some(region.wl_region()));
            }
            Err(err) => warn!("Failed to create input region: {}", err),
        }

        let grab = self.state.window.grabs_keyboard();
        if grab != self.keyboard_grabbed {
            let interactivity = if grab {
                KeyboardInteractivity::Exclusive
            } else {
                KeyboardInteractivity::None
            };
            layer_surface.set_keyboard_interactivity(interactivity);
            self.keyboard_grabbed = grab;
        }
    }

    fn schedule_frame(&self, qh: &QueueHandle<Self>) {
        if let Some(layer_surface) = &self.layer_surface {
            layer_surface.wl_surface().frame(qh, layer_surface.wl_surface().clone());
            layer_surface.wl_surface().commit();
        }
    }

    pub fn apply_load_event(&mut self, event: LoadEvent, qh: &QueueHandle<Self>) {
        let failed = matches!(event, LoadEvent::Finished(LoadOutcome::Failed(_)));
        if self.state.apply_load_event(event) && self.configured {
            self.schedule_frame(qh);
        }
        if failed {
            if let Err(err) = self.notifications.show("Waypoint sync failed", NotificationLevel::Error) {
                warn!("Failed to show notification: {}", err);
            }
        }
    }

    fn link(&mut self, index: usize, qh: &QueueHandle<Self>) {
        if self.state.link(index, &self.clipboard, &self.notifications) {
            self.schedule_frame(qh);
        }
    }

    fn on_press(&mut self, position: Point, qh: &QueueHandle<Self>) {
        if !self.state.window.is_open() {
            return;
        }
        match self.state.hit_test(position) {
            Hit::Close => self.request_toggle(qh),
            Hit::Header => {
                if self.state.window.begin_drag(position) {
                    self.schedule_frame(qh);
                }
            }
            Hit::Result(index) => self.link(index, qh),
            Hit::SearchBox | Hit::Panel | Hit::Outside => {}
        }
    }

    pub fn draw(&mut self, qh: &QueueHandle<Self>) {
        if !self.configured {
            return;
        }
        self.sync_input();
        if let Some(layer_surface) = &self.layer_surface {
            let width = self.width;
            let height = self.height;
            if width == 0 || height == 0 { return; }

            let Some(pool) = self.pool.as_mut() else { return; };

            let (buffer, canvas) = match pool.create_buffer(
                width as i32,
                height as i32,
                (width * 4) as i32,
                wl_shm::Format::Argb8888,
            ) {
                Ok(created) => created,
                Err(err) => {
                    warn!("Failed to create buffer: {}", err);
                    return;
                }
            };

            if let Some(mut pixmap) = tiny_skia::PixmapMut::from_bytes(canvas, width, height) {
                self.renderer.draw(&mut pixmap, &self.state);

                for chunk in canvas.chunks_exact_mut(4) {
                    chunk.swap(0, 2);
                }

                let surface = layer_surface.wl_surface();
                surface.attach(Some(buffer.wl_buffer()), 0, 0);
                surface.damage_buffer(0, 0, width as i32, height as i32);
                if self.state.window.is_animating() {
                    surface.frame(qh, surface.clone());
                } else {
                    self.last_frame_time = None;
                }
                surface.commit();
            }
        }
    }
}

impl LayerShellHandler for WaylandApp {
    fn closed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _layer: &LayerSurface) {
        self.should_exit = true;
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _layer: &LayerSurface,
        configure: LayerSurfaceConfigure,
        _serial: u32,
    ) {
        if configure.new_size.0 > 0 {
            self.width = configure.new_size.0;
        }
        if configure.new_size.1 > 0 {
            self.height = configure.new_size.1;
        }
        self.state.window.set_screen(Size::new(self.width as f32, self.height as f32));

        let needed = self.width as usize * self.height as usize * 4;
        if self.pool.is_none() {
            match SlotPool::new(needed.max(4), &self.shm_state) {
                Ok(pool) => self.pool = Some(pool),
                Err(err) => {
                    warn!("Failed to create shm pool: {}", err);
                    return;
                }
            }
        }
        if let Some(pool) = &mut self.pool {
            if pool.len() < needed {
                if let Err(err) = pool.resize(needed) {
                    warn!("Failed to resize shm pool: {}", err);
                    return;
                }
            }
        }

        self.configured = true;
        if self.open_pending {
            self.open_pending = false;
            if !self.state.window.is_open() {
                self.state.window.toggle();
            }
        }

        self.draw(qh);
    }
}

impl CompositorHandler for WaylandApp {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_factor: i32,
    ) {}

    fn frame(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        time: u32,
    ) {
        let frames = match self.last_frame_time {
            Some(last) => (time.wrapping_sub(last) as f32 / NOMINAL_FRAME_MS).clamp(0.0, 4.0),
            None => 1.0,
        };
        self.last_frame_time = Some(time);

        self.state.window.tick(frames, self.pointer_position);
        if !self.state.window.is_visible() {
            self.release_surface();
            return;
        }
        self.draw(qh);
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {}

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {}

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {}
}

impl OutputHandler for WaylandApp {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }
    fn new_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}
    fn update_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}
    fn output_destroyed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}
}

impl SeatHandler for WaylandApp {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_seat::WlSeat) {}

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        if capability == Capability::Keyboard && self.seat_state.get_keyboard(qh, &seat, None).is_err() {
            warn!("Failed to bind keyboard");
        }
        if capability == Capability::Pointer && self.seat_state.get_pointer(qh, &seat).is_err() {
            warn!("Failed to bind pointer");
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        _: &QueueHandle<Self>,
        _: wl_seat::WlSeat,
        _capability: Capability,
    ) {}

    fn remove_seat(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_seat::WlSeat) {}
}

impl KeyboardHandler for WaylandApp {
    fn enter(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        _: &wl_keyboard::WlKeyboard,
        _: &wl_surface::WlSurface,
        _: u32,
        _: &[u32],
        _: &[xkb::Keysym],
    ) {}

    fn leave(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        _: &wl_keyboard::WlKeyboard,
        _: &wl_surface::WlSurface,
        _: u32,
    ) {}

    fn press_key(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        event: KeyEvent,
    ) {
         if !self.state.window.is_open() {
             return;
         }

         let raw_sym = u32::from(event.keysym);
         match raw_sym {
            keysyms::KEY_Escape => {
                self.request_toggle(qh);
                return;
            }
            keysyms::KEY_Return | keysyms::KEY_KP_Enter => {
                self.link(self.state.selected_index, qh);
                return;
            }
            keysyms::KEY_Up => self.state.move_selection(-1),
            keysyms::KEY_Down => self.state.move_selection(1),
            keysyms::KEY_BackSpace => {
                let mut query = self.state.query.clone();
                query.pop();
                self.state.update_query(&query);
            }
            _ => {
                if let Some(utf8) = event.utf8 {
                     if !utf8.chars().any(|c| c.is_control()) {
                         let query = format!("{}{}", self.state.query, utf8);
                         self.state.update_query(&query);
                     }
                }
            }
         }

         self.schedule_frame(qh);
    }

    fn release_key(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        _: &wl_keyboard::WlKeyboard,
        _: u32,
        _: KeyEvent,
    ) {}

    fn update_modifiers(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        _: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _modifiers: Modifiers,
        _layout: u32,
    ) {}
}

impl PointerHandler for WaylandApp {
    fn pointer_frame(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _pointer: &wl_pointer::WlPointer,
        events: &[PointerEvent],
    ) {
        let Some(surface) = self.layer_surface.as_ref().map(|l| l.wl_surface().clone()) else {
            return;
        };

        for event in events {
            if event.surface != surface {
                continue;
            }
            let position = Point::new(event.position.0 as f32, event.position.1 as f32);
            self.pointer_position = position;

            match &event.kind {
                PointerEventKind::Press { button, .. } if *button == BTN_LEFT => self.on_press(position, qh),
                PointerEventKind::Release { button, .. } if *button == BTN_LEFT => self.state.window.end_drag(),
                PointerEventKind::Axis { vertical, .. } => {
                    self.scroll_accum += vertical.absolute;
                    let rows = (self.scroll_accum / SCROLL_STEP).trunc();
                    if rows != 0.0 {
                        self.scroll_accum -= rows * SCROLL_STEP;
                        self.state.scroll(rows as i32);
                        self.schedule_frame(qh);
                    }
                }
                _ => {}
            }
        }
    }
}

impl ShmHandler for WaylandApp {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm_state
    }
}

delegate_compositor!(WaylandApp);
delegate_output!(WaylandApp);
delegate_shm!(WaylandApp);
delegate_seat!(WaylandApp);
delegate_keyboard!(WaylandApp);
delegate_pointer!(WaylandApp);
delegate_layer!(WaylandApp);
delegate_registry!(WaylandApp);

impl ProvidesRegistryState for WaylandApp {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    fn runtime_add_global(&mut self, _: &Connection, _: &QueueHandle<Self>, _: u32, _: &str, _: u32) {
    }
    fn runtime_remove_global(&mut self, _: &Connection, _: &QueueHandle<Self>, _: u32, _: &str) {
    }
}
