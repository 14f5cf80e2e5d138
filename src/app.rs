use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use eframe::egui::{self, ColorImage, Key, TextureHandle, TextureOptions};

use crate::nes::ppu::{DISPLAY_HEIGHT, DISPLAY_WIDTH, Video};
use crate::nes::{Button, InputProvider, Nes};

const NTSC_FRAME_RATE_HZ: f64 = 60.098_813_897_440_515;
const MAX_FRAMES_PER_UPDATE: u32 = 2;

/// RGBA surface the PPU draws into; uploaded to an egui texture each update.
pub struct FrameBuffer {
    pixels: Vec<u8>,
}

impl FrameBuffer {
    fn new() -> Self {
        Self {
            pixels: vec![0; DISPLAY_WIDTH * DISPLAY_HEIGHT * 4],
        }
    }

    fn as_rgba(&self) -> &[u8] {
        &self.pixels
    }
}

impl Video for FrameBuffer {
    fn set_pixel(&mut self, x: usize, y: usize, r: u8, g: u8, b: u8) {
        let base = (y * DISPLAY_WIDTH + x) * 4;
        self.pixels[base] = r;
        self.pixels[base + 1] = g;
        self.pixels[base + 2] = b;
        self.pixels[base + 3] = 0xFF;
    }

    fn blit(&mut self) {
        // Presentation happens when the egui texture picks the buffer up.
    }
}

fn button_bit(button: Button) -> u8 {
    match button {
        Button::A => 0x01,
        Button::B => 0x02,
        Button::Select => 0x04,
        Button::Start => 0x08,
        Button::Up => 0x10,
        Button::Down => 0x20,
        Button::Left => 0x40,
        Button::Right => 0x80,
    }
}

/// One keyboard snapshot per emulated frame, answering the joypad queries.
#[derive(Clone, Copy, Default)]
struct KeyboardInput {
    held: u8,
}

impl KeyboardInput {
    fn capture(ctx: &egui::Context) -> Self {
        let mut held = 0u8;

        ctx.input(|input| {
            if input.key_down(Key::W) || input.key_down(Key::ArrowUp) {
                held |= button_bit(Button::Up);
            }
            if input.key_down(Key::S) || input.key_down(Key::ArrowDown) {
                held |= button_bit(Button::Down);
            }
            if input.key_down(Key::A) || input.key_down(Key::ArrowLeft) {
                held |= button_bit(Button::Left);
            }
            if input.key_down(Key::D) || input.key_down(Key::ArrowRight) {
                held |= button_bit(Button::Right);
            }
            if input.key_down(Key::Space) || input.key_down(Key::Z) {
                held |= button_bit(Button::A);
            }
            if input.key_down(Key::X) {
                held |= button_bit(Button::B);
            }
            if input.key_down(Key::Enter) {
                held |= button_bit(Button::Start);
            }
            if input.modifiers.shift {
                held |= button_bit(Button::Select);
            }
        });

        Self { held }
    }
}

impl InputProvider for KeyboardInput {
    fn is_pressed(&self, button: Button) -> bool {
        (self.held & button_bit(button)) != 0
    }
}

pub struct NesApp {
    nes: Nes,
    frame: FrameBuffer,
    frame_texture: Option<TextureHandle>,
    status_line: String,
    loaded_rom: Option<PathBuf>,
    frame_interval: Duration,
    next_frame_at: Option<Instant>,
    paused: bool,
    // A fatal core error (bad opcode and friends); emulation halts on it.
    fault: Option<String>,
}

impl NesApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        Self {
            nes: Nes::new(),
            frame: FrameBuffer::new(),
            frame_texture: None,
            status_line: "Drop a .nes file or click Open ROM".to_string(),
            loaded_rom: None,
            frame_interval: Duration::from_secs_f64(1.0 / NTSC_FRAME_RATE_HZ),
            next_frame_at: None,
            paused: false,
            fault: None,
        }
    }

    fn load_rom(&mut self, path: &Path) {
        match self.nes.load_rom_from_path(path) {
            Ok(()) => {
                self.loaded_rom = Some(path.to_path_buf());
                self.status_line = format!(
                    "Loaded {} using {}",
                    path.file_name().and_then(|f| f.to_str()).unwrap_or("ROM"),
                    self.nes.mapper_name()
                );
                self.frame_texture = None;
                self.next_frame_at = None;
                self.fault = None;
            }
            Err(err) => {
                self.status_line = format!("Failed to load ROM: {err}");
            }
        }
    }

    fn open_rom_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("NES ROM", &["nes"])
            .set_title("Open NES ROM")
            .pick_file()
        {
            self.load_rom(&path);
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|input| input.raw.dropped_files.clone());
        for file in dropped {
            if let Some(path) = file.path {
                let is_nes = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("nes"))
                    .unwrap_or(false);

                if is_nes {
                    self.load_rom(&path);
                } else {
                    self.status_line = format!("Unsupported file: {}", path.display());
                }
            }
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let open_shortcut = ctx.input(|i| i.modifiers.command && i.key_pressed(Key::O));
        if open_shortcut {
            self.open_rom_dialog();
        }

        let reset = ctx.input(|i| i.key_pressed(Key::R));
        if reset && self.nes.has_rom() {
            self.nes.reset();
            self.next_frame_at = None;
            self.fault = None;
            self.status_line = "Reset complete".to_string();
        }

        let pause_toggle = ctx.input(|i| i.key_pressed(Key::P));
        if pause_toggle && self.nes.has_rom() {
            self.paused = !self.paused;
        }
    }

    fn run_emulation(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        let mut next = self.next_frame_at.unwrap_or(now);
        let mut ran_frames = 0u32;

        while Instant::now() >= next && ran_frames < MAX_FRAMES_PER_UPDATE {
            let input = KeyboardInput::capture(ctx);
            if let Err(err) = self.nes.run_frame(&input, &mut self.frame) {
                self.fault = Some(err.to_string());
                self.status_line = format!("Emulation halted: {err}");
                break;
            }
            ran_frames += 1;
            next += self.frame_interval;
        }

        // Too far behind; skip ahead instead of bursting frames.
        if ran_frames == 0 && now > next + self.frame_interval {
            next = now;
        }

        self.next_frame_at = Some(next);
    }

    fn update_texture(&mut self, ctx: &egui::Context) {
        let image = ColorImage::from_rgba_unmultiplied(
            [DISPLAY_WIDTH, DISPLAY_HEIGHT],
            self.frame.as_rgba(),
        );

        if let Some(texture) = self.frame_texture.as_mut() {
            texture.set(image, TextureOptions::NEAREST);
        } else {
            self.frame_texture =
                Some(ctx.load_texture("nes-frame", image, TextureOptions::NEAREST));
        }
    }
}

impl eframe::App for NesApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);
        self.handle_shortcuts(ctx);

        if self.nes.has_rom() && !self.paused && self.fault.is_none() {
            self.run_emulation(ctx);
        }

        self.update_texture(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open ROM").clicked() {
                    self.open_rom_dialog();
                }

                if ui
                    .add_enabled(self.nes.has_rom(), egui::Button::new("Reset (R)"))
                    .clicked()
                {
                    self.nes.reset();
                    self.next_frame_at = None;
                    self.fault = None;
                    self.status_line = "Reset complete".to_string();
                }

                if ui
                    .add_enabled(
                        self.nes.has_rom(),
                        egui::Button::new(if self.paused {
                            "Resume (P)"
                        } else {
                            "Pause (P)"
                        }),
                    )
                    .clicked()
                {
                    self.paused = !self.paused;
                }

                if let Some(path) = &self.loaded_rom {
                    ui.separator();
                    ui.label(path.display().to_string());
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.label(&self.status_line);
                ui.separator();
                ui.label(format!("Mapper: {}", self.nes.mapper_name()));
                ui.separator();
                ui.label("Controls: WASD/arrows move, Space/Z=A, X=B, Enter=Start, Shift=Select, R=Reset, P=Pause");
            });

            let (a, x, y, p, sp, pc) = self.nes.debug_cpu_regs();
            let (ctrl, mask, status) = self.nes.debug_ppu_regs();
            ui.collapsing("Debug", |ui| {
                ui.monospace(format!(
                    "CPU A={a:02X} X={x:02X} Y={y:02X} P={p:02X} SP={sp:02X} PC={pc:04X}"
                ));
                ui.monospace(format!(
                    "PPU ctrl={ctrl:08b} mask={mask:08b} status={status:08b}"
                ));
                if let Some(fault) = &self.fault {
                    ui.monospace(format!("Fault: {fault}"));
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                let available = ui.available_size();
                let scale_x = (available.x / DISPLAY_WIDTH as f32).max(1.0);
                let scale_y = (available.y / DISPLAY_HEIGHT as f32).max(1.0);
                let scale = scale_x.min(scale_y).floor().max(1.0);
                let target = egui::vec2(
                    DISPLAY_WIDTH as f32 * scale,
                    DISPLAY_HEIGHT as f32 * scale,
                );

                if let Some(texture) = &self.frame_texture {
                    ui.add(egui::Image::new(texture).fit_to_exact_size(target));
                }

                ui.add_space(8.0);
                ui.label("Drag and drop a .nes file to play.");
            });
        });

        if let Some(next) = self.next_frame_at {
            let wait = next.saturating_duration_since(Instant::now());
            ctx.request_repaint_after(wait.min(self.frame_interval));
        } else {
            ctx.request_repaint_after(self.frame_interval);
        }
    }
}
