pub mod cartridge;
pub mod cpu;
pub mod mapper;
mod palette;
pub mod ppu;

use anyhow::Result;
use std::path::Path;

use cartridge::Cartridge;
use cpu::{Cpu, CpuBus};
use mapper::{Mapper, create_mapper, mapper_name};
use ppu::{Ppu, Video};

pub const SCANLINES_PER_FRAME: u16 = 262;
const PPU_CYCLES_PER_SCANLINE: u32 = 341;
const PPU_CYCLES_PER_CPU_CYCLE: u32 = 3;
const SPRITE_DMA_CYCLES: u32 = 513;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

/// The order the joypad shifts button bits out of 0x4016.
pub const BUTTON_READ_ORDER: [Button; 8] = [
    Button::A,
    Button::B,
    Button::Select,
    Button::Start,
    Button::Up,
    Button::Down,
    Button::Left,
    Button::Right,
];

/// Host input, queried one logical button at a time.
pub trait InputProvider {
    fn is_pressed(&self, button: Button) -> bool;
}

struct NoInput;

impl InputProvider for NoInput {
    fn is_pressed(&self, _button: Button) -> bool {
        false
    }
}

/// Shift-register protocol of the first controller port: a 1 -> 0 strobe
/// transition latches the pad, then each read hands out one button bit.
struct ControllerPort {
    read_cursor: usize,
    strobe: bool,
}

impl ControllerPort {
    fn new() -> Self {
        Self {
            read_cursor: 0,
            strobe: false,
        }
    }

    fn read(&mut self, input: &dyn InputProvider) -> u8 {
        if self.read_cursor >= BUTTON_READ_ORDER.len() {
            // Exhausted pads report 1 on further reads.
            return 1;
        }
        let pressed = input.is_pressed(BUTTON_READ_ORDER[self.read_cursor]);
        self.read_cursor += 1;
        u8::from(pressed)
    }

    fn write_strobe(&mut self, value: u8) {
        let strobe = (value & 1) != 0;
        if self.strobe && !strobe {
            self.read_cursor = 0;
        }
        self.strobe = strobe;
    }
}

/// The CPU's memory map, assembled from borrows of the console's parts for
/// the duration of one call into the interpreter.
struct SystemBus<'a> {
    ram: &'a mut [u8; 0x800],
    ppu: &'a mut Ppu,
    mapper: &'a mut dyn Mapper,
    controller: &'a mut ControllerPort,
    input: &'a dyn InputProvider,
}

impl CpuBus for SystemBus<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            // 2 KiB of RAM, mirrored every 0x800.
            0x0000..=0x1FFF => self.ram[(addr as usize) & 0x07FF],
            0x2000..=0x3FFF => self.ppu.read_register(addr, &mut *self.mapper),
            0x4016 => self.controller.read(self.input),
            // Audio and the second controller, unimplemented.
            0x4000..=0x4017 => 0,
            _ => self.mapper.read_cpu(addr),
        }
    }

    fn write(&mut self, addr: u16, value: u8) -> u32 {
        match addr {
            0x0000..=0x1FFF => {
                self.ram[(addr as usize) & 0x07FF] = value;
                0
            }
            0x2000..=0x3FFF => {
                self.ppu.write_register(addr, value, &mut *self.mapper);
                0
            }
            0x4014 => {
                // Sprite DMA: 256 bytes from page `value` straight into OAM.
                let base = u16::from(value) << 8;
                let mut data = [0u8; 256];
                for (i, slot) in data.iter_mut().enumerate() {
                    *slot = self.read(base.wrapping_add(i as u16));
                }
                self.ppu.sprite_dma(&data);
                SPRITE_DMA_CYCLES
            }
            0x4016 => {
                self.controller.write_strobe(value);
                0
            }
            0x4000..=0x4017 => 0,
            _ => self.mapper.write_cpu(addr, value),
        }
    }
}

/// The console. Owns every part and drives the scanline scheduler; the CPU
/// sees the rest only through a `SystemBus` view built per call.
pub struct Nes {
    cpu: Cpu,
    ppu: Ppu,
    mapper: Option<Box<dyn Mapper>>,
    ram: [u8; 0x800],
    controller: ControllerPort,
    mapper_label: String,
}

impl Default for Nes {
    fn default() -> Self {
        Self::new()
    }
}

impl Nes {
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            ppu: Ppu::new(),
            mapper: None,
            ram: [0; 0x800],
            controller: ControllerPort::new(),
            mapper_label: "No ROM loaded".to_string(),
        }
    }

    pub fn has_rom(&self) -> bool {
        self.mapper.is_some()
    }

    pub fn mapper_name(&self) -> &str {
        &self.mapper_label
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.cpu.trace = trace;
    }

    pub fn debug_cpu_regs(&self) -> (u8, u8, u8, u8, u8, u16) {
        self.cpu.registers()
    }

    pub fn debug_ppu_regs(&self) -> (u8, u8, u8) {
        self.ppu.debug_registers()
    }

    pub fn load_rom_from_path(&mut self, path: &Path) -> Result<()> {
        let cart = Cartridge::from_file(path)?;
        self.load_cartridge(cart)
    }

    pub fn load_cartridge(&mut self, cart: Cartridge) -> Result<()> {
        let mapper_id = cart.mapper_id;
        self.mapper = Some(create_mapper(cart)?);
        self.mapper_label = format!("{} (mapper {mapper_id})", mapper_name(mapper_id));
        self.power_on();
        Ok(())
    }

    fn power_on(&mut self) {
        self.ram = [0; 0x800];
        self.ppu = Ppu::new();
        self.controller = ControllerPort::new();

        let Some(mapper) = self.mapper.as_mut() else {
            return;
        };
        let trace = self.cpu.trace;
        let mut bus = SystemBus {
            ram: &mut self.ram,
            ppu: &mut self.ppu,
            mapper: mapper.as_mut(),
            controller: &mut self.controller,
            input: &NoInput,
        };
        self.cpu = Cpu::power_on(&mut bus);
        self.cpu.trace = trace;
    }

    /// Hardware reset: reruns the CPU reset sequence, leaving memory and
    /// the PPU alone.
    pub fn reset(&mut self) {
        let Some(mapper) = self.mapper.as_mut() else {
            return;
        };
        let mut bus = SystemBus {
            ram: &mut self.ram,
            ppu: &mut self.ppu,
            mapper: mapper.as_mut(),
            controller: &mut self.controller,
            input: &NoInput,
        };
        self.cpu.reset(&mut bus);
    }

    /// Run one 262-scanline frame. Per scanline the CPU gets a budget of
    /// 341 PPU cycles (one CPU cycle burns three); overshoot carries into
    /// the next scanline's budget. Rendering happens after the scanline's
    /// CPU work so it sees post-CPU register state.
    pub fn run_frame(&mut self, input: &dyn InputProvider, video: &mut dyn Video) -> Result<()> {
        if self.mapper.is_none() {
            return Ok(());
        }

        let mut budget: u32 = 0;
        for scanline in 0..SCANLINES_PER_FRAME {
            match scanline {
                0..=239 => {
                    self.run_cpu_budget(&mut budget, input)?;
                    if let Some(mapper) = self.mapper.as_mut() {
                        self.ppu.render_scan_line(mapper.as_mut(), video);
                    }
                }
                240 => {
                    // Post-render line: CPU only.
                    self.run_cpu_budget(&mut budget, input)?;
                }
                241 => {
                    video.blit();
                    if self.ppu.enter_vblank_should_nmi() {
                        budget += PPU_CYCLES_PER_CPU_CYCLE * self.nmi(input);
                    }
                    self.run_cpu_budget(&mut budget, input)?;
                }
                242..=260 => {
                    self.run_cpu_budget(&mut budget, input)?;
                }
                _ => {
                    // Pre-render line: flags clear before its CPU work.
                    self.ppu.exit_vblank();
                    self.run_cpu_budget(&mut budget, input)?;
                }
            }
        }
        Ok(())
    }

    fn run_cpu_budget(&mut self, budget: &mut u32, input: &dyn InputProvider) -> Result<()> {
        while *budget < PPU_CYCLES_PER_SCANLINE {
            let Some(mapper) = self.mapper.as_mut() else {
                return Ok(());
            };
            let mut bus = SystemBus {
                ram: &mut self.ram,
                ppu: &mut self.ppu,
                mapper: mapper.as_mut(),
                controller: &mut self.controller,
                input,
            };
            *budget += PPU_CYCLES_PER_CPU_CYCLE * self.cpu.interpret(&mut bus)?;
        }
        // Carry the overshoot rather than zeroing it.
        *budget -= PPU_CYCLES_PER_SCANLINE;
        Ok(())
    }

    fn nmi(&mut self, input: &dyn InputProvider) -> u32 {
        let Some(mapper) = self.mapper.as_mut() else {
            return 0;
        };
        let mut bus = SystemBus {
            ram: &mut self.ram,
            ppu: &mut self.ppu,
            mapper: mapper.as_mut(),
            controller: &mut self.controller,
            input,
        };
        self.cpu.nmi(&mut bus)
    }
}
