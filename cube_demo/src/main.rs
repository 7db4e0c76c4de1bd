//! Rainbow cube on the frame_host runtime
//!
//! ```text
//! cube_demo [CONFIG] [--headless FRAMES]
//! ```
//!
//! `CONFIG` is an optional `.toml` or `.ron` [`RuntimeConfig`]. With
//! `--headless` the cube renders in stereo into offscreen images for the given
//! number of frames and exits. A config with `window.stereo = true` drives a
//! stereo display through a two-layer swapchain. In a window, `P` toggles
//! between triangles and points and `Escape` quits.

mod cube;

use std::f32::consts::FRAC_PI_3;

use frame_host::kit::{
    look_at_camera, stereo_eyes, vulkan_perspective, FrameData, ForwardPass, FramebufferCache, Pipeline,
    PipelineBuilder, ShaderModule, StagingUpload, UniformRing,
};
use frame_host::prelude::*;
use frame_host::{logging, ShaderConfig};
use nalgebra::Point3;

const CLEAR_COLOR: [f32; 4] = [0.02, 0.02, 0.04, 1.0];
const ORBIT_RADIUS: f32 = 5.0;
const ORBIT_SPEED: f32 = 0.6;
const EYE_SEPARATION: f32 = 0.065;
const HEADLESS_EXTENT: Extent = Extent::new(1280, 720);

/// A pipeline and the descriptor set that points it at the uniform ring
struct DrawMode {
    pipeline: Pipeline,
    uniforms: vk::DescriptorSet,
}

impl DrawMode {
    fn new(pipeline: Pipeline, uniforms: &UniformRing<FrameData>) -> RuntimeResult<Self> {
        let set = pipeline.uniform_set(uniforms.buffer(), uniforms.range())?;
        Ok(Self { pipeline, uniforms: set })
    }
}

struct CubeApp {
    // Drop order: pipelines and framebuffers before the pass
    solid: DrawMode,
    points: DrawMode,
    framebuffers: FramebufferCache,
    pass: ForwardPass,
    uniforms: UniformRing<FrameData>,
    vertices: StagingUpload,
    indices: StagingUpload,
    draw_points: bool,
    view_count: u32,
}

impl CubeApp {
    fn frame_data(&self, extent: Extent, time: f32) -> FrameData {
        let projection = vulkan_perspective(FRAC_PI_3, extent.aspect(), 0.1, 100.0);
        let angle = time * ORBIT_SPEED;
        let center = Point3::new(ORBIT_RADIUS * angle.cos(), 2.0, ORBIT_RADIUS * angle.sin());
        let target = Point3::origin();

        if self.view_count > 1 {
            let [left, right] = stereo_eyes(center, target, EYE_SEPARATION);
            FrameData::new(
                [
                    look_at_camera(left, target, &projection),
                    look_at_camera(right, target, &projection),
                ],
                time,
            )
        } else {
            FrameData::mono(look_at_camera(center, target, &projection), time)
        }
    }
}

impl Application for CubeApp {
    fn new(init: &InitContext, core: &Core, _platform: &mut dyn Platform) -> RuntimeResult<Self> {
        let vertex_shader = if init.view_count > 1 { "cube_stereo.vert.spv" } else { "cube.vert.spv" };
        let shaders = ShaderConfig::with_path_resolution(vertex_shader, "cube.frag.spv");
        shaders.validate()?;
        log::info!("Loading shaders {} and {}", shaders.vertex_shader_path, shaders.fragment_shader_path);

        let vertex = ShaderModule::from_file(core, &shaders.vertex_shader_path)?;
        let fragment = ShaderModule::from_file(core, &shaders.fragment_shader_path)?;

        let pass = ForwardPass::new(core, init.color_format, init.present_layout, init.view_count)?;
        let uniforms = UniformRing::<FrameData>::new(core, init.frames_in_flight)?;

        let solid = PipelineBuilder::new(&vertex, &fragment)
            .cull_mode(vk::CullModeFlags::NONE)
            .build(core, pass.handle())?;
        let points = PipelineBuilder::new(&vertex, &fragment)
            .topology(vk::PrimitiveTopology::POINT_LIST)
            .cull_mode(vk::CullModeFlags::NONE)
            .build(core, pass.handle())?;

        let vertices = StagingUpload::record(
            core,
            init.commands,
            bytemuck::cast_slice(&cube::VERTICES),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let indices = StagingUpload::record(
            core,
            init.commands,
            bytemuck::cast_slice(&cube::INDICES),
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;

        log::info!(
            "Cube ready: {} view(s), {}x{}",
            init.view_count,
            init.extent.width,
            init.extent.height
        );

        Ok(Self {
            solid: DrawMode::new(solid, &uniforms)?,
            points: DrawMode::new(points, &uniforms)?,
            framebuffers: FramebufferCache::new(core, &pass),
            pass,
            uniforms,
            vertices,
            indices,
            draw_points: false,
            view_count: init.view_count,
        })
    }

    fn event(&mut self, event: &PlatformEvent, _core: &Core, platform: &mut dyn Platform) -> RuntimeResult<()> {
        if let PlatformEvent::Key { key, state: ElementState::Pressed } = event {
            match key {
                KeyCode::Escape => platform.request_close(),
                KeyCode::Letter('P') => {
                    self.draw_points = !self.draw_points;
                    log::info!("Drawing {}", if self.draw_points { "points" } else { "triangles" });
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn frame(&mut self, frame: Frame<'_>, core: &Core, _platform: &mut dyn Platform) -> RuntimeResult<()> {
        // Init commands have completed before the first frame
        if self.vertices.is_pending() || self.indices.is_pending() {
            self.vertices.finish(core)?;
            self.indices.finish(core)?;
        }

        let data = self.frame_data(frame.extent, frame.time);
        self.uniforms.write(frame.index, &data)?;
        let dynamic_offset = self.uniforms.dynamic_offset(frame.index)?;

        let framebuffer = self.framebuffers.framebuffer(core, &frame)?;
        let commands = frame.commands;
        let mode = if self.draw_points { &self.points } else { &self.solid };

        self.pass.begin(commands, framebuffer, frame.extent, CLEAR_COLOR);
        mode.pipeline.bind(commands, mode.uniforms, dynamic_offset, frame.extent.into());
        unsafe {
            let device = core.device();
            device.cmd_bind_vertex_buffers(commands, 0, &[self.vertices.buffer().handle()], &[0]);
            if self.draw_points {
                // Trailing corners would be discarded by the wipe anyway
                device.cmd_draw(commands, cube::visible_vertices(frame.time), 1, 0, 0);
            } else {
                device.cmd_bind_index_buffer(commands, self.indices.buffer().handle(), 0, vk::IndexType::UINT16);
                device.cmd_draw_indexed(commands, cube::INDICES.len() as u32, 1, 0, 0, 0);
            }
        }
        self.pass.end(commands);

        Ok(())
    }
}

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Options {
    config: Option<String>,
    headless_frames: Option<u64>,
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut options = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            if arg == "--headless" {
                let frames = args.next().ok_or("--headless needs a frame count")?;
                let frames = frames
                    .parse::<u64>()
                    .map_err(|e| format!("invalid frame count {frames:?}: {e}"))?;
                options.headless_frames = Some(frames);
            } else if arg.starts_with("--") {
                return Err(format!("unknown option {arg}"));
            } else if options.config.replace(arg).is_some() {
                return Err("only one config path may be given".to_string());
            }
        }

        Ok(options)
    }
}

fn run(options: &Options) -> RuntimeResult<()> {
    let config = match &options.config {
        Some(path) => RuntimeConfig::load_from_file(path)?,
        None => {
            let mut config = RuntimeConfig::new("cube_demo");
            config.window.title = "Rainbow Cube".to_string();
            config
        }
    };
    logging::init(&config.log_level);

    let stats = if let Some(frames) = options.headless_frames {
        log::info!("Rendering {frames} stereo frames offscreen");
        let mut platform = HeadlessPlatform::stereo(HEADLESS_EXTENT).with_frame_limit(frames);
        frame_host::run::<CubeApp>(&config, &mut platform)?
    } else {
        let mut platform = DesktopPlatform::new(&config.window)?;
        frame_host::run::<CubeApp>(&config, &mut platform)?
    };

    log::info!(
        "Done: {} frames, {} skipped, {} swapchain rebuilds",
        stats.frames,
        stats.skipped,
        stats.recreations
    );
    Ok(())
}

fn main() {
    let options = match Options::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("usage: cube_demo [CONFIG] [--headless FRAMES]");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&options) {
        log::error!("cube_demo failed: {e}");
        eprintln!("cube_demo failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_headless_with_config() {
        let options = Options::parse(args(&["cube.toml", "--headless", "3"])).unwrap();
        assert_eq!(options.config.as_deref(), Some("cube.toml"));
        assert_eq!(options.headless_frames, Some(3));
    }

    #[test]
    fn test_parse_defaults() {
        assert_eq!(Options::parse(args(&[])).unwrap(), Options::default());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Options::parse(args(&["--headless"])).is_err());
        assert!(Options::parse(args(&["--headless", "many"])).is_err());
        assert!(Options::parse(args(&["a.toml", "b.toml"])).is_err());
        assert!(Options::parse(args(&["--fullscreen"])).is_err());
    }
}
