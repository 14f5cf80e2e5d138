use std::path::PathBuf;

use anyhow::{Context, Result};
use phosphor::nes::ppu::Video;
use phosphor::nes::{Button, InputProvider, Nes};

struct NullVideo;

impl Video for NullVideo {
    fn set_pixel(&mut self, _x: usize, _y: usize, _r: u8, _g: u8, _b: u8) {}
    fn blit(&mut self) {}
}

struct NoInput;

impl InputProvider for NoInput {
    fn is_pressed(&self, _button: Button) -> bool {
        false
    }
}

struct Config {
    rom: PathBuf,
    frames: u32,
}

fn parse_args() -> Result<Config> {
    let mut rom = None;
    let mut frames = 1u32;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--frames" => {
                let value = args
                    .next()
                    .context("--frames requires an integer, e.g. --frames 60")?;
                frames = value
                    .parse::<u32>()
                    .with_context(|| format!("invalid --frames value: {value}"))?;
            }
            _ => rom = Some(PathBuf::from(arg)),
        }
    }

    let rom = rom.context("usage: trace_runner <rom.nes> [--frames N]")?;
    Ok(Config { rom, frames })
}

fn main() -> Result<()> {
    let config = parse_args()?;

    let mut nes = Nes::new();
    nes.load_rom_from_path(&config.rom)?;
    nes.set_trace(true);

    eprintln!(
        "Loaded {} using {}",
        config.rom.display(),
        nes.mapper_name()
    );

    let mut video = NullVideo;
    for _ in 0..config.frames {
        nes.run_frame(&NoInput, &mut video)?;
    }

    let (a, x, y, p, sp, pc) = nes.debug_cpu_regs();
    eprintln!(
        "After {} frame(s): A={a:02X} X={x:02X} Y={y:02X} P={p:02X} SP={sp:02X} PC={pc:04X}",
        config.frames
    );
    Ok(())
}
