//! tetvol - Tetrahedral volume mesh renderer
//!
//! Renders a synthetic tetrahedral mesh with every configured method into
//! off-screen images.

use tetvol::camera::OrbitCamera;
use tetvol::config::AppConfig;
use tetvol::scene::MeshBuilder;
use tetvol::systems::{AnimationSystem, RenderError, RenderSystem};

fn run(config: &AppConfig) -> Result<(), RenderError> {
    let mesh = MeshBuilder::new(config.mesh.resolution)
        .with_lut_size(config.mesh.lut_size)
        .build();
    log::info!("Built mesh with {} tetrahedra and {} vertices", mesh.cell_count, mesh.vertex_count);

    let mut system = RenderSystem::new(config.renderer.clone(), &config.output)?;
    system.prepare(&mesh, config)?;

    let mut camera = OrbitCamera::from_config(&config.camera, system.target().aspect_ratio());
    let mut animation = AnimationSystem::new(config.output.frame_interval, config.camera.orbit_step);

    for n in 0..config.output.frames {
        let frame = if n == 0 { animation.current() } else { animation.advance(&mut camera) };
        system.update(&camera, frame.time);
        for &method in &config.methods {
            system.render_to_file(method, frame.index, &config.output)?;
        }
    }
    Ok(())
}

fn main() {
    let (config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.debug.log_level))
        .init();
    if let Some(e) = load_error {
        log::warn!("Failed to load config: {}. Using defaults.", e);
    }
    log::info!("Starting tetvol");

    if let Err(e) = run(&config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
