// egui overlay: title, live status, instructions, mode badge, F3 stats.
// Drawn in its own pass on top of the particles.

use egui::epaint::Shadow;

use super::mode::{status_text, GestureLabel, Mode};

const GOLD: egui::Color32 = egui::Color32::from_rgb(0xD4, 0xAF, 0x37);
const MINT: egui::Color32 = egui::Color32::from_rgb(0xA7, 0xF3, 0xD0);

/// Snapshot of everything the HUD shows for one frame.
pub struct HudState {
    pub mode: Mode,
    pub gesture: GestureLabel,
    pub pinching: bool,
    pub has_image: bool,
    pub image_pending: bool,
    pub fps: u32,
    pub frame_time_ms: f32,
    pub particle_count: usize,
    pub camera_distance: f32,
    pub resolution: (u32, u32),
}

/// Line under the mode badge describing the reference image.
pub fn image_hint(has_image: bool, image_pending: bool) -> &'static str {
    if image_pending {
        "processing image…"
    } else if has_image {
        "image ready"
    } else {
        "Upload a photo to use Pinch mode"
    }
}

pub struct Hud {
    /// Stats panel (F3). Title, status and instructions are always drawn.
    pub stats_visible: bool,
    /// Blocking message, e.g. the gesture input failed to start.
    pub notice: Option<String>,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Hud {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        stats_visible: bool,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);
        visuals.window_stroke = egui::Stroke::new(1.0, GOLD.gamma_multiply(0.3));
        visuals.window_shadow = Shadow::NONE;
        visuals.override_text_color = Some(MINT);
        egui_ctx.set_visuals(visuals);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface_format,
            None,  // no depth
            1,     // msaa samples
            false, // no dithering
        );

        Self {
            stats_visible,
            notice: None,
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle_stats(&mut self) {
        self.stats_visible = !self.stats_visible;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Draw the overlay on top of `view` (loads, never clears).
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        state: &HudState,
    ) {
        let raw_input = self.egui_state.take_egui_input(window);
        let stats_visible = self.stats_visible;
        let notice = self.notice.as_deref();

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            // ── Title ────────────────────────────────────────────────────────
            egui::Area::new(egui::Id::new("title"))
                .anchor(egui::Align2::LEFT_TOP, egui::vec2(24.0, 20.0))
                .show(ctx, |ui| {
                    ui.label(egui::RichText::new("PARTICLE MORPH").size(30.0).strong().color(GOLD));
                    ui.label(egui::RichText::new("GESTURE-DRIVEN POINT CLOUD").size(12.0));
                });

            // ── Centre status, only while a hand gesture is seen ─────────────
            if state.gesture != GestureLabel::None || state.pinching {
                egui::Area::new(egui::Id::new("status"))
                    .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                    .show(ctx, |ui| {
                        let text = format!(
                            "Mode: {}",
                            status_text(&state.gesture, state.pinching, state.has_image)
                        );
                        ui.label(egui::RichText::new(text).size(22.0));
                    });
            }

            // ── Instructions ─────────────────────────────────────────────────
            egui::Area::new(egui::Id::new("instructions"))
                .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(24.0, -24.0))
                .show(ctx, |ui| {
                    egui::Frame::none()
                        .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 140))
                        .inner_margin(egui::Margin::same(12.0))
                        .rounding(8.0)
                        .show(ui, |ui: &mut egui::Ui| {
                            ui.label(egui::RichText::new("INSTRUCTIONS").strong().color(GOLD));
                            ui.label("F  Close fist: assemble tree");
                            ui.label("O  Open hand: explode stars");
                            ui.label("Space  Pinch: reveal your photo");
                            ui.label("Drop an image file on the window to upload");
                            ui.label("Drag to orbit, scroll to zoom, F3 stats");
                        });
                });

            // ── Current mode badge ───────────────────────────────────────────
            egui::Area::new(egui::Id::new("mode"))
                .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-24.0, -24.0))
                .show(ctx, |ui| {
                    let [r, g, b] = state.mode.color();
                    let tint = egui::Rgba::from_rgb(r, g, b);
                    ui.label(egui::RichText::new(state.mode.as_str()).size(20.0).color(tint));
                    ui.label(image_hint(state.has_image, state.image_pending));
                });

            // ── F3: stats panel ──────────────────────────────────────────────
            if stats_visible {
                egui::Area::new(egui::Id::new("stats"))
                    .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
                    .show(ctx, |ui| {
                        egui::Frame::none()
                            .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 180))
                            .inner_margin(egui::Margin::same(8.0))
                            .rounding(4.0)
                            .show(ui, |ui: &mut egui::Ui| {
                                ui.label(format!("FPS: {}", state.fps));
                                ui.label(format!("Frame: {:.2} ms", state.frame_time_ms));
                                ui.label(format!("Particles: {}", state.particle_count));
                                ui.label(format!("Gesture: {}", state.gesture));
                                ui.label(format!("Pinch: {}", if state.pinching { "yes" } else { "no" }));
                                ui.label(format!(
                                    "Resolution: {} x {}",
                                    state.resolution.0, state.resolution.1
                                ));
                                ui.label(format!("Camera dist: {:.1}", state.camera_distance));
                            });
                    });
            }

            // ── Blocking notice ──────────────────────────────────────────────
            if let Some(message) = notice {
                egui::Window::new("Gesture input unavailable")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 80.0))
                    .show(ctx, |ui| {
                        ui.label(message);
                    });
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("HUD Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_hint_prompts_for_upload() {
        assert_eq!(image_hint(false, false), "Upload a photo to use Pinch mode");
        assert_eq!(image_hint(true, false), "image ready");
        assert_eq!(image_hint(true, true), "processing image…");
    }
}
