// Gesture-driven particle morph
// winit window + wgpu instanced sprites (one instance per particle, one draw call)
// + egui HUD. The morph engine and gesture logic live in the library.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Mat4;
use log::{error, info, warn};
use wgpu::util::DeviceExt;
use winit::{
    event::{Event as WinitEvent, WindowEvent, ElementState, KeyEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use particle_morph::config::Settings;
use particle_morph::engine::camera::OrbitCamera;
use particle_morph::engine::hud::{Hud, HudState};
use particle_morph::engine::image_sampler::{ImageEvent, ImageJobs, ImageSource};
use particle_morph::engine::input::InputState;
use particle_morph::engine::{GestureSample, ShapeLibrary, Simulation, PARTICLE_COUNT};
use particle_morph::vision::sim::{SimulatedCamera, SimulatedClassifier, SimulatedHand};
use particle_morph::vision::{Sampler, VisionService};

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "particle_morph", version, about = "Gesture-driven particle morph")]
struct Cli {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Image to upload at startup
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Show the stats panel at startup (F3 toggles)
    #[arg(long)]
    stats: bool,
}

// ============================================================================
// VERTEX DEFINITION (sprite corners)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Corner {
    corner: [f32; 2],
}

impl Corner {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Corner>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

const SPRITE_CORNERS: &[Corner] = &[
    Corner { corner: [-1.0, -1.0] },
    Corner { corner: [ 1.0, -1.0] },
    Corner { corner: [ 1.0,  1.0] },
    Corner { corner: [-1.0,  1.0] },
];

const SPRITE_INDICES: &[u16] = &[0, 1, 2, 0, 2, 3];

// ============================================================================
// INSTANCE DATA (per-particle)
// ============================================================================

// The engine's flat position buffer is uploaded as-is: 3 floats per instance.
fn particle_instance_desc() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (3 * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    }
}

// ============================================================================
// UNIFORM DATA
// ============================================================================

const SPRITE_SIZE: f32 = 0.15;
const PARTICLE_OPACITY: f32 = 0.8;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    color: [f32; 4],
    params: [f32; 4],
}

impl Uniforms {
    fn new() -> Self {
        Self {
            view: Mat4::IDENTITY.to_cols_array_2d(),
            proj: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            color: [1.0, 1.0, 1.0, PARTICLE_OPACITY],
            params: [SPRITE_SIZE, 0.0, 0.0, 0.0],
        }
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    num_indices: u32,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    window: Arc<Window>,
    hud: Hud,
    input: InputState,
    camera: OrbitCamera,

    // Morph engine + mode logic
    sim: Simulation,
    image_jobs: ImageJobs,
    image_pending: bool,

    // Gesture input
    hand: SimulatedHand,
    vision: Option<VisionService>,
    gestures: Option<Receiver<GestureSample>>,

    // Frame timing
    last_frame: Instant,
    frame_count: u32,
    last_fps_update: Instant,
    fps: u32,
    frame_time_ms: f32,
}

impl State {
    async fn new(window: Arc<Window>, settings: &Settings, show_stats: bool) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .context("failed to open GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("particles.wgsl").into()),
        });

        let uniforms = Uniforms::new();

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        // Additive blending: overlapping particles glow.
        let additive = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Corner::desc(), particle_instance_desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(additive),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sprite Vertex Buffer"),
            contents: bytemuck::cast_slice(SPRITE_CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sprite Index Buffer"),
            contents: bytemuck::cast_slice(SPRITE_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Instance Buffer"),
            size: (PARTICLE_COUNT * 3 * std::mem::size_of::<f32>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let num_indices = SPRITE_INDICES.len() as u32;

        let mut hud = Hud::new(&window, &device, surface_format, show_stats);

        // Shapes are generated once; the engine starts at rest on the tree.
        let shapes = ShapeLibrary::generate(&mut rand::thread_rng());
        let sim = Simulation::new(shapes, settings.simulation_params(), Instant::now());
        info!("generated {} particles", PARTICLE_COUNT);

        let hand = SimulatedHand::default();
        let (vision, gestures) = match start_vision(settings, &hand) {
            Ok((service, rx)) => (Some(service), Some(rx)),
            Err(err) => {
                error!("gesture input failed to start: {err:#}");
                hud.notice = Some(
                    "Camera access is required for gesture control. Please allow camera permissions."
                        .to_string(),
                );
                (None, None)
            }
        };

        let window_settings = settings.window;
        let camera = OrbitCamera::new(
            window_settings.camera_distance,
            window_settings.fov_degrees,
            window_settings.min_distance,
            window_settings.max_distance,
        );

        let input = InputState::new();

        let now = Instant::now();
        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            num_indices,
            uniform_buffer,
            uniform_bind_group,
            window,
            hud,
            input,
            camera,
            sim,
            image_jobs: ImageJobs::new(settings.image),
            image_pending: false,
            hand,
            vision,
            gestures,
            last_frame: now,
            frame_count: 0,
            last_fps_update: now,
            fps: 0,
            frame_time_ms: 0.0,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// New reference image: derive in the background, preview IMAGE now.
    fn upload(&mut self, path: PathBuf) {
        self.image_jobs.submit(ImageSource::File(path));
        self.image_pending = true;
        self.sim.begin_upload(Instant::now());
    }

    fn update(&mut self) {
        let now = Instant::now();
        self.frame_time_ms = (now - self.last_frame).as_secs_f32() * 1000.0;
        self.last_frame = now;

        self.hand.set(self.input.hand_pose());

        if let Some(rx) = &self.gestures {
            for sample in rx.try_iter() {
                self.sim.push_sample(sample);
            }
        }

        match self.image_jobs.poll() {
            Some(ImageEvent::Ready(points)) => {
                info!("reference image ready");
                self.sim.publish_image(points);
                self.image_pending = false;
            }
            Some(ImageEvent::Failed(err)) => {
                error!("reference image rejected: {err:#}");
                self.sim.reject_image();
                self.image_pending = false;
            }
            None => {}
        }

        self.sim.step(now);
        self.camera.update(&self.input);
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Upload positions and uniforms BEFORE creating the render pass
        self.queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(self.sim.positions()),
        );

        let aspect = self.size.width as f32 / self.size.height.max(1) as f32;
        let mode = self.sim.mode();
        let [r, g, b] = mode.color();
        let uniforms = Uniforms {
            view: self.camera.view_matrix().to_cols_array_2d(),
            proj: self.camera.projection_matrix(aspect).to_cols_array_2d(),
            model: Mat4::from_rotation_y(self.sim.engine().rotation()).to_cols_array_2d(),
            color: [r, g, b, PARTICLE_OPACITY],
            params: [SPRITE_SIZE, 0.0, 0.0, 0.0],
        };

        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Particle Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.008,
                            g: 0.016,
                            b: 0.008,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

            // ONE DRAW CALL for all particles
            render_pass.draw_indexed(0..self.num_indices, 0, 0..PARTICLE_COUNT as u32);
        }

        let control = self.sim.control();
        let hud_state = HudState {
            mode,
            gesture: control.gesture.clone(),
            pinching: control.pinching,
            has_image: control.has_reference_image,
            image_pending: self.image_pending,
            fps: self.fps,
            frame_time_ms: self.frame_time_ms,
            particle_count: PARTICLE_COUNT,
            camera_distance: self.camera.distance(),
            resolution: (self.size.width, self.size.height),
        };
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        self.hud.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &self.window,
            &view,
            &screen_descriptor,
            &hud_state,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn count_frame(&mut self) {
        self.frame_count += 1;
        let now = Instant::now();
        if (now - self.last_fps_update).as_secs_f32() >= 1.0 {
            self.fps = self.frame_count;
            log::debug!("FPS: {} | Mode: {} | Particles: {}", self.fps, self.sim.mode(), PARTICLE_COUNT);
            self.frame_count = 0;
            self.last_fps_update = now;
        }
    }

    /// Stop gesture sampling. Pending image jobs finish on their own and are ignored.
    fn shutdown(&mut self) {
        if let Some(mut vision) = self.vision.take() {
            vision.stop();
        }
        self.gestures = None;
        info!("stopped after {} frames", self.sim.frame());
    }
}

// ============================================================================
// GESTURE INPUT
// ============================================================================

fn start_vision(
    settings: &Settings,
    hand: &SimulatedHand,
) -> Result<(VisionService, Receiver<GestureSample>)> {
    let camera = SimulatedCamera::open(settings.sim.video_fps).context("camera unavailable")?;
    let classifier =
        SimulatedClassifier::initialize(hand.clone()).context("gesture model unavailable")?;
    let sampler = Sampler::new(Box::new(camera), Box::new(classifier));
    Ok(VisionService::start(sampler, settings.sim.poll_interval()))
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let event_loop = EventLoop::new()?;

    let window_attributes = Window::default_attributes()
        .with_title("Particle Morph - fist: tree, open hand: explode, pinch: image")
        .with_inner_size(winit::dpi::LogicalSize::new(settings.window.width, settings.window.height));

    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut state = pollster::block_on(State::new(window.clone(), &settings, cli.stats))?;
    if let Some(path) = cli.image {
        state.upload(path);
    }

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let _ = state.hud.handle_window_event(&window, event);
                state.input.process_event(event);

                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => {
                        state.shutdown();
                        control_flow.exit();
                    }
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::F3),
                                repeat: false,
                                ..
                            },
                        ..
                    } => state.hud.toggle_stats(),
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::DroppedFile(path) => {
                        state.upload(path.clone());
                    }
                    WindowEvent::RedrawRequested => {
                        state.update();
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                error!("GPU out of memory");
                                state.shutdown();
                                control_flow.exit();
                            }
                            Err(e) => warn!("{:?}", e),
                        }
                        state.input.end_frame();
                        state.count_frame();
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
