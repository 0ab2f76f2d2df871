//! GPU rendering system
//!
//! Owns the mesh renderer on a headless wgpu device and renders one method
//! at a time into an off-screen target:
//! - Device acquisition and off-screen target
//! - Renderer initialization, configuration and uploads
//! - Frame rendering and readback

use tetvol_core::{Method, RendererConfig, TetrahedralMeshRenderer};
use tetvol_render::{render_drawables, shader_sources, ContextError, RenderContext, WgpuBackend};

use crate::camera::OrbitCamera;
use crate::config::{AppConfig, OutputConfig};
use crate::scene::SyntheticMesh;
use crate::systems::offscreen::{Image, OffscreenTarget, TARGET_FORMAT};

/// Render error types
#[derive(Debug)]
pub enum RenderError {
    /// No GPU device could be acquired
    Context(ContextError),
    /// The mesh renderer rejected an operation
    Renderer(tetvol_core::RenderError),
    /// Reading the target back failed
    Readback(wgpu::BufferAsyncError),
    /// Creating the output directory failed
    Io(std::io::Error),
    /// Encoding or writing an image failed
    Image(image::ImageError),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Context(err) => write!(f, "GPU unavailable: {}", err),
            RenderError::Renderer(err) => write!(f, "Renderer error: {}", err),
            RenderError::Readback(err) => write!(f, "Readback failed: {}", err),
            RenderError::Io(err) => write!(f, "Failed to create output directory: {}", err),
            RenderError::Image(err) => write!(f, "Failed to write image: {}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Context(err) => Some(err),
            RenderError::Renderer(err) => Some(err),
            RenderError::Readback(err) => Some(err),
            RenderError::Io(err) => Some(err),
            RenderError::Image(err) => Some(err),
        }
    }
}

impl From<ContextError> for RenderError {
    fn from(err: ContextError) -> Self {
        RenderError::Context(err)
    }
}

impl From<tetvol_core::RenderError> for RenderError {
    fn from(err: tetvol_core::RenderError) -> Self {
        RenderError::Renderer(err)
    }
}

impl From<wgpu::BufferAsyncError> for RenderError {
    fn from(err: wgpu::BufferAsyncError) -> Self {
        RenderError::Readback(err)
    }
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        RenderError::Image(err)
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Io(err)
    }
}

/// Manages GPU rendering
pub struct RenderSystem {
    renderer: TetrahedralMeshRenderer<WgpuBackend>,
    target: OffscreenTarget,
    clear_color: wgpu::Color,
}

impl RenderSystem {
    /// Acquire a headless device and create the renderer on it
    pub fn new(renderer_config: RendererConfig, output: &OutputConfig) -> Result<Self, RenderError> {
        let context = pollster::block_on(RenderContext::headless())?;
        Ok(Self::with_context(context, renderer_config, output))
    }

    pub fn with_context(context: RenderContext, renderer_config: RendererConfig, output: &OutputConfig) -> Self {
        let backend = WgpuBackend::from_context(context, TARGET_FORMAT);
        let target = OffscreenTarget::new(&backend.device, output.width, output.height);
        let [r, g, b, a] = output.clear_color.map(f64::from);

        Self {
            renderer: TetrahedralMeshRenderer::new(backend, shader_sources(), renderer_config),
            target,
            clear_color: wgpu::Color { r, g, b, a },
        }
    }

    pub fn renderer(&self) -> &TetrahedralMeshRenderer<WgpuBackend> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut TetrahedralMeshRenderer<WgpuBackend> {
        &mut self.renderer
    }

    pub fn target(&self) -> &OffscreenTarget {
        &self.target
    }

    /// Initialize for `mesh`, then configure and upload every configured method
    pub fn prepare(&mut self, mesh: &SyntheticMesh, config: &AppConfig) -> Result<(), RenderError> {
        self.renderer.init(mesh.cell_count as i64, mesh.vertex_count as i64)?;

        for &method in &config.methods {
            self.renderer.configure(method, config.encoding_for(method))?;
            let report = self.renderer.upload(&mesh.dataset, method)?;
            log::info!(
                "Uploaded {}: {} allocated, {} updated, {} skipped",
                method,
                report.allocated.len(),
                report.updated.len(),
                report.skipped.len()
            );
        }

        self.renderer.update_ranges(&mesh.dataset);
        Ok(())
    }

    /// Push camera and clock state to the renderer
    pub fn update(&mut self, camera: &OrbitCamera, time: f32) {
        self.renderer.update_perspective(camera);
        self.renderer.update_time(time);
    }

    /// Render one method and read the result back
    pub fn render(&mut self, method: Method) -> Result<Image, RenderError> {
        let (backend, registry, drawables) = self.renderer.parts_mut();
        let drawable = drawables
            .get(&method)
            .ok_or(tetvol_core::RenderError::MethodNotConfigured(method))?;

        render_drawables(backend, registry, std::iter::once(drawable), self.target.view(), self.clear_color);
        Ok(self.target.read(&backend.device, &backend.queue)?)
    }

    /// Render `method` and save it as `<directory>/<method>_<frame>.png`
    pub fn render_to_file(&mut self, method: Method, frame: u32, output: &OutputConfig) -> Result<Image, RenderError> {
        let image = self.render(method)?;
        std::fs::create_dir_all(&output.directory)?;
        let path = output.directory.join(frame_file_name(method, frame));
        image.save(&path)?;
        log::info!("Wrote {}", path.display());
        Ok(image)
    }
}

/// File name of one rendered frame
pub fn frame_file_name(method: Method, frame: u32) -> String {
    format!("{}_{:04}.png", method, frame)
}
