mod config;
mod error;
mod executor;
mod instance;
mod matcher;
mod model;
mod sources;
mod state;
mod store;
mod ui;
mod window;

use anyhow::{anyhow, Result};
use calloop::EventLoop;
use calloop::signals::{Signal, Signals};
use calloop_wayland_source::WaylandSource;
use wayland_client::{Connection, globals::registry_queue_init};
use crate::config::{load_config, WindowPosition};
use crate::instance::InstanceSocket;
use crate::state::AppState;
use crate::ui::wayland::WaylandApp;
use crate::ui::render::Renderer;
use crate::sources::{catalog, gw2::ApiFetcher, ForwardingSink, LoadEvent, LoadOutcome};
use log::{info, warn};
use std::thread;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Waypoint search overlay", long_about = None)]
struct Args {
    /// Where the panel opens, overriding the config file
    #[arg(short, long, value_enum)]
    position: Option<WindowPosition>,

    /// Continent ids to load, overriding the config file
    #[arg(long = "area", value_delimiter = ',')]
    areas: Vec<u32>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // 1. Hand over to a running instance if there is one
    if instance::signal_running() {
        info!("Toggled running instance");
        return Ok(());
    }

    // 2. Load Config
    let mut config = load_config()?;
    if let Some(position) = args.position {
        config.general.position = position;
    }
    if !args.areas.is_empty() {
        config.catalog.areas = args.areas.clone();
    }

    // 3. Setup event loop & signals. The signal mask must be in place before
    // any thread is spawned so that every thread inherits it.
    let mut event_loop: EventLoop<WaylandApp> = EventLoop::try_new()?;
    let signals = Signals::new(&[Signal::SIGTERM, Signal::SIGINT])?;

    // Toggle requests from later launches
    let (tx_toggle, rx_toggle) = calloop::channel::channel::<()>();
    let _instance_socket = match InstanceSocket::bind() {
        Ok(mut socket) => {
            socket.listen(move || {
                let _ = tx_toggle.send(());
            })?;
            Some(socket)
        }
        Err(err) => {
            warn!("Could not open instance socket, toggling will start new instances: {}", err);
            None
        }
    };

    let conn = Connection::connect_to_env()?;
    let (globals, event_queue) = registry_queue_init::<WaylandApp>(&conn)?;
    let qh = event_queue.handle();

    // 4. Init State & UI, open the panel
    let app_state = AppState::new(config.clone());
    let mut app = WaylandApp::new(&globals, &qh, app_state, Renderer::new())?;
    app.position_override = args.position;
    app.request_toggle(&qh);

    // 5. Spawn catalog loader
    let (tx_events, rx_events) = calloop::channel::channel::<LoadEvent>();
    let catalog_config = config.catalog.clone();

    thread::spawn(move || {
        let outcome = match ApiFetcher::new(&catalog_config.api_base) {
            Ok(fetcher) => {
                let tx = tx_events.clone();
                let mut sink = ForwardingSink::new(move |batch| {
                    let _ = tx.send(LoadEvent::Entries(batch));
                });
                catalog::load(&catalog_config.areas, &fetcher, &mut sink)
            }
            Err(err) => LoadOutcome::Failed(err),
        };
        let _ = tx_events.send(LoadEvent::Finished(outcome));
    });

    // Loader events
    let qh_loader = qh.clone();
    event_loop
        .handle()
        .insert_source(rx_events, move |event, _, app: &mut WaylandApp| {
            if let calloop::channel::Event::Msg(event) = event {
                app.apply_load_event(event, &qh_loader);
            }
        })
        .map_err(|e| anyhow!("failed to register loader channel: {}", e.error))?;

    // Toggle requests
    let qh_toggle = qh.clone();
    event_loop
        .handle()
        .insert_source(rx_toggle, move |event, _, app: &mut WaylandApp| {
            if let calloop::channel::Event::Msg(()) = event {
                app.request_toggle(&qh_toggle);
            }
        })
        .map_err(|e| anyhow!("failed to register toggle channel: {}", e.error))?;

    // Shutdown signals
    event_loop
        .handle()
        .insert_source(signals, |event, _, app: &mut WaylandApp| {
            info!("Received {:?}", event.signal());
            app.should_exit = true;
        })
        .map_err(|e| anyhow!("failed to register signal source: {}", e.error))?;

    event_loop
        .handle()
        .insert_source(WaylandSource::new(conn.clone(), event_queue), |_, queue, app| {
            queue.dispatch_pending(app)
        })
        .map_err(|e| anyhow!("failed to register wayland source: {}", e.error))?;

    // 6. Run Loop
    loop {
        if app.should_exit {
            break;
        }
        event_loop.dispatch(None, &mut app)?;
    }

    app.state.teardown();
    info!("Shutting down");
    Ok(())
}
