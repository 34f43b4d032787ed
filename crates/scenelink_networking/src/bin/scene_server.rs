//! # Scene Server
//!
//! Authors a demo scene, serves its package over the distribution port and
//! animates the sun, broadcasting parameter updates every tick. Answers
//! client pings and broadcasts its clock once a second.
//!
//! ## Usage
//!
//! ```bash
//! scene_server [--config server.toml] [--duration SECS]
//! ```

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use scenelink_networking::{
    scene_frame, Distributor, NetworkResult, PackageStore, SyncConfig, SyncSession, TickLoop,
    TransportError, UdpTransport,
};
use scenelink_protocol::parameter::{LIGHT_INTENSITY, ROTATION};
use scenelink_protocol::scene::{GeoData, LightData, LightType, MaterialPackage, NodePayload};
use scenelink_protocol::{
    ParameterValue, ReferenceError, SceneDataHandler, SceneGraph, SceneNode, SyncError,
};
use scenelink_shared::{Color, Quat, Vec3};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

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

/// Root group holding a cube and a directional sun.
fn demo_scene() -> Result<SceneGraph, ReferenceError> {
    let mut graph = SceneGraph::new();
    let root = graph.add_root(SceneNode::group("root"));

    let cube = graph.add_child(
        root,
        SceneNode::new(
            "Cube",
            NodePayload::Geo(GeoData { color: Color::rgb(0.8, 0.2, 0.2), ..GeoData::default() }),
        )
        .with_position(Vec3::new(0.0, 0.5, 0.0))
        .editable(),
    )?;
    graph.set_material(cube, Arc::new(MaterialPackage::resource("Standard", "")))?;

    graph.add_child(
        root,
        SceneNode::new(
            "Sun",
            NodePayload::Light(LightData {
                light_type: LightType::Directional,
                intensity: 1.5,
                ..LightData::default()
            }),
        )
        .with_position(Vec3::new(0.0, 10.0, 0.0)),
    )?;
    Ok(graph)
}

fn run(args: &Args) -> NetworkResult<()> {
    let config = match &args.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };
    info!("Server id {}, tick rate {} Hz", config.server_id, config.tick_rate);

    let mut transport = UdpTransport::bind(SocketAddr::from(([0, 0, 0, 0], 0)))
        .map_err(TransportError::from)?;
    for target in &config.update_targets {
        match target.parse::<SocketAddr>() {
            Ok(addr) => transport.add_target(addr),
            Err(e) => warn!("Skipping update target {}: {}", target, e),
        }
    }

    let mut session = SyncSession::server(&config, transport);
    let inbound = session.inbound();

    let graph = demo_scene().map_err(SyncError::from)?;
    let package = SceneDataHandler::new(config.load_settings()).pack(&graph)?;
    session.adopt_scene(&package)?;

    let store = Arc::new(PackageStore::new());
    store.publish(scene_frame(config.server_id, 0, &package));
    let distribution_addr = SocketAddr::from(([0, 0, 0, 0], config.distribution_port));
    let mut distributor = Distributor::spawn(distribution_addr, Arc::clone(&store))
        .map_err(TransportError::from)?;

    // Flat index 2 is the sun: root, cube, sun.
    let sun = session.registry().object_for_node(2);
    let mut tick_loop = TickLoop::new(config.tick_rate);
    let started = Instant::now();
    let stats_interval = u64::from(config.tick_rate) * 5;

    loop {
        if args.duration.is_some_and(|d| started.elapsed() >= Duration::from_secs(d)) {
            break;
        }
        tick_loop.wait_for_next_tick();

        while tick_loop.should_tick() {
            let tick_start = tick_loop.begin_tick();
            session.sender_mut().transport_mut().poll_into(&inbound);

            if let Some(sun) = sun.and_then(|id| session.registry_mut().get_mut(id)) {
                let t = started.elapsed().as_secs_f32();
                let rotation = ParameterValue::Quat(Quat::from_rotation_y(t * 0.5));
                let intensity = ParameterValue::Float(1.5 + 0.5 * (t * 2.0).sin());
                let animated = sun
                    .set(ROTATION, rotation)
                    .and_then(|()| sun.set(LIGHT_INTENSITY, intensity));
                if let Err(e) = animated {
                    warn!("Sun animation failed: {}", e);
                }
            }

            for event in session.tick()? {
                debug!("{:?}", event);
            }
            session.sender_mut().advance_clock();
            if tick_loop.tick_count() % u64::from(config.tick_rate) == 0 {
                session.sender_mut().send_sync()?;
            }
            tick_loop.end_tick(tick_start);
        }

        if tick_loop.tick_count() % stats_interval == 0 {
            let stats = tick_loop.stats();
            info!(
                "Tick {}: avg {}us, max {}us, late {}, packages served {}, updates sent {}",
                tick_loop.tick_count(),
                stats.avg_tick_us,
                stats.max_tick_us,
                stats.late_ticks,
                distributor.served(),
                session.sender().stats().updates_sent
            );
        }
    }

    distributor.stop();
    info!("Server stopped after {} ticks", tick_loop.tick_count());
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
            error!("Server failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
