//! # Scene Client
//!
//! Fetches the scene package from a server, then follows live parameter
//! updates on the update port. Pings the server once a second to keep its
//! clock in step.
//!
//! ## Usage
//!
//! ```bash
//! scene_client [--config client.toml] [--duration SECS]
//! ```

use std::net::SocketAddr;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use scenelink_networking::{
    request_scene, NetworkResult, ReceiverEvent, SyncConfig, SyncSession, TickLoop,
    TransportError, UdpTransport,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const FETCH_TIMEOUT: Duration = Duration::from_secs(2);
const FETCH_ATTEMPTS: u32 = 10;

struct Args {
    config: Option<String>,
    duration: Option<u64>,
}

fn parse_args() -> Args {
    let mut args = Args { config: None, duration: None };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => args.config = iter.next(),
            "--duration" | "-d" => args.duration = iter.next().and_then(|s| s.parse().ok()),
            other => warn!("Ignoring argument {}", other),
        }
    }
    args
}

/// Retries until the server answers with a package.
fn fetch_scene(config: &SyncConfig) -> Option<Vec<u8>> {
    let addr = config.distribution_addr();
    for attempt in 1..=FETCH_ATTEMPTS {
        match request_scene(addr.as_str(), FETCH_TIMEOUT) {
            Ok(Some(frame)) => return Some(frame),
            Ok(None) => info!("Server at {} has no scene yet ({}/{})", addr, attempt, FETCH_ATTEMPTS),
            Err(e) => warn!("Scene fetch from {} failed ({}/{}): {}", addr, attempt, FETCH_ATTEMPTS, e),
        }
        thread::sleep(Duration::from_millis(500));
    }
    None
}

fn run(args: &Args) -> NetworkResult<()> {
    let config = match &args.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };
    info!("Client id {} connecting to {}", config.client_id, config.distribution_addr());

    let mut transport = UdpTransport::bind(SocketAddr::from(([0, 0, 0, 0], config.update_port)))
        .map_err(TransportError::from)?;
    for target in &config.update_targets {
        match target.parse::<SocketAddr>() {
            Ok(addr) => transport.add_target(addr),
            Err(e) => warn!("Skipping update target {}: {}", target, e),
        }
    }

    let mut session = SyncSession::new(&config, transport);
    let inbound = session.inbound();

    let Some(frame) = fetch_scene(&config) else {
        error!("No scene after {} attempts", FETCH_ATTEMPTS);
        return Err(TransportError::Disconnected.into());
    };
    let scene = session.adopt_scene_frame(&frame)?;
    info!("Scene loaded: {} nodes, {} live objects", scene.nodes.len(), session.registry().len());

    let mut tick_loop = TickLoop::new(config.tick_rate);
    let started = Instant::now();

    loop {
        if args.duration.is_some_and(|d| started.elapsed() >= Duration::from_secs(d)) {
            break;
        }
        tick_loop.wait_for_next_tick();

        while tick_loop.should_tick() {
            let tick_start = tick_loop.begin_tick();
            session.sender_mut().transport_mut().poll_into(&inbound);

            for event in session.tick()? {
                match event {
                    ReceiverEvent::SceneLoaded(scene) => info!(
                        "Scene loaded: {} nodes, {} live objects",
                        scene.nodes.len(),
                        session.registry().len()
                    ),
                    ReceiverEvent::SceneLoadFailed(e) => error!("Scene load failed: {}", e),
                    ReceiverEvent::ParameterApplied { object_id, parameter_id } => {
                        debug!("Applied {}/{}", object_id, parameter_id);
                    }
                    other => debug!("{:?}", other),
                }
            }
            session.sender_mut().advance_clock();
            if tick_loop.tick_count() % u64::from(config.tick_rate) == 0 {
                session.ping()?;
            }
            tick_loop.end_tick(tick_start);
        }
    }

    let stats = session.receiver().stats();
    info!(
        "Client stopped: {} frames, {} updates applied, {} rejected, round trip {} ticks",
        stats.frames,
        stats.updates_applied,
        stats.updates_rejected,
        session.clock().rtt()
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Client failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
