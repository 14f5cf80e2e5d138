use anyhow::{Result, bail};

use super::cartridge::{CHR_BANK_SIZE, Cartridge, PRG_BANK_SIZE};

const PATTERN_PAGE_SIZE: usize = 0x1000;
const NAMETABLE_SIZE: usize = 0x400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

/// Cartridge logic: remaps the CPU address space above 0x4018 and the PPU
/// pattern/nametable space. Remapping happens through writes to the upper
/// half of the CPU address space, which is why `write_cpu` is the only
/// method most mappers override meaningfully.
pub trait Mapper {
    fn read_cpu(&mut self, addr: u16) -> u8;
    fn write_cpu(&mut self, addr: u16, value: u8) -> u32;
    fn read_ppu(&mut self, addr: u16) -> u8;
    fn write_ppu(&mut self, addr: u16, value: u8);
}

pub fn mapper_name(mapper_id: u8) -> &'static str {
    match mapper_id {
        0 => "NROM",
        1 => "MMC1",
        2 => "UxROM",
        3 => "CNROM",
        _ => "Unsupported",
    }
}

pub fn create_mapper(cart: Cartridge) -> Result<Box<dyn Mapper>> {
    if cart.mirroring == Mirroring::FourScreen {
        bail!("four-screen mirroring is not supported");
    }
    let mapper: Box<dyn Mapper> = match cart.mapper_id {
        0 => Box::new(Mapper0::new(cart)),
        1 => Box::new(Mapper1::new(cart)),
        2 => Box::new(Mapper2::new(cart)),
        3 => Box::new(Mapper3::new(cart)),
        id => bail!("mapper {id} ({}) is not supported", mapper_name(id)),
    };
    Ok(mapper)
}

/// The address-space plumbing every mapper shares: two 16 KiB CPU pages over
/// PRG-ROM, 8 KiB of SRAM, two 4 KiB pattern pages over CHR, and four
/// nametable slots over two physical 1 KiB banks. Pages are byte offsets
/// into the flat PRG/CHR vectors; remapping a bank is one offset store.
struct AddressSpace {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    sram: Vec<u8>,
    vram: Vec<u8>,

    cpu_pages: [usize; 2],
    pattern_pages: [usize; 2],
    nametables: [usize; 4],
}

impl AddressSpace {
    fn new(cart: Cartridge) -> Self {
        let chr_is_ram = cart.chr_rom.is_empty();
        let chr = if chr_is_ram {
            vec![0; CHR_BANK_SIZE]
        } else {
            cart.chr_rom
        };
        let last_page = cart.prg_rom.len() - PRG_BANK_SIZE;

        let mut space = Self {
            prg_rom: cart.prg_rom,
            chr,
            chr_is_ram,
            sram: vec![0; 0x2000],
            vram: vec![0; 2 * NAMETABLE_SIZE],
            // First PRG bank at 0x8000, last at 0xC000. A single-bank cart
            // sees the same bank in both windows.
            cpu_pages: [0, last_page],
            pattern_pages: [0, PATTERN_PAGE_SIZE],
            nametables: [0; 4],
        };
        space.set_mirroring(cart.mirroring);
        space
    }

    fn prg_bank_count(&self) -> usize {
        self.prg_rom.len() / PRG_BANK_SIZE
    }

    fn pattern_page_count(&self) -> usize {
        self.chr.len() / PATTERN_PAGE_SIZE
    }

    fn map_cpu_page(&mut self, slot: usize, bank: usize) {
        self.cpu_pages[slot] = (bank % self.prg_bank_count()) * PRG_BANK_SIZE;
    }

    /// Banks here are 4 KiB pattern pages, half the iNES CHR bank size.
    fn map_pattern_page(&mut self, slot: usize, bank: usize) {
        self.pattern_pages[slot] = (bank % self.pattern_page_count()) * PATTERN_PAGE_SIZE;
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        match mirroring {
            Mirroring::Horizontal => self.set_nametable_banks([0, 0, 1, 1]),
            Mirroring::Vertical => self.set_nametable_banks([0, 1, 0, 1]),
            // Rejected in create_mapper before any mapper is built.
            Mirroring::FourScreen => unreachable!("four-screen carts are rejected at load"),
        }
    }

    fn set_nametable_banks(&mut self, banks: [usize; 4]) {
        for (slot, bank) in banks.into_iter().enumerate() {
            self.nametables[slot] = (bank & 1) * NAMETABLE_SIZE;
        }
    }

    fn read_cpu(&self, addr: u16) -> u8 {
        match addr {
            // 0x4018-0x5FFF is expansion area, unmapped on these boards.
            0x6000..=0x7FFF => self.sram[(addr as usize) & 0x1FFF],
            0x8000..=0xBFFF => self.prg_rom[self.cpu_pages[0] + ((addr as usize) & 0x3FFF)],
            0xC000..=0xFFFF => self.prg_rom[self.cpu_pages[1] + ((addr as usize) & 0x3FFF)],
            _ => 0,
        }
    }

    fn write_sram(&mut self, addr: u16, value: u8) {
        if (0x6000..=0x7FFF).contains(&addr) {
            self.sram[(addr as usize) & 0x1FFF] = value;
        }
    }

    fn read_ppu(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x0FFF => self.chr[self.pattern_pages[0] + addr as usize],
            0x1000..=0x1FFF => self.chr[self.pattern_pages[1] + ((addr as usize) & 0x0FFF)],
            // 0x2000-0x2FFF nametables, mirrored through 0x3EFF.
            _ => {
                let index = (addr as usize) & 0x0FFF;
                self.vram[self.nametables[index / NAMETABLE_SIZE] + (index & 0x03FF)]
            }
        }
    }

    fn write_ppu(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x0FFF => {
                if self.chr_is_ram {
                    let idx = self.pattern_pages[0] + addr as usize;
                    self.chr[idx] = value;
                }
            }
            0x1000..=0x1FFF => {
                if self.chr_is_ram {
                    let idx = self.pattern_pages[1] + ((addr as usize) & 0x0FFF);
                    self.chr[idx] = value;
                }
            }
            _ => {
                let index = (addr as usize) & 0x0FFF;
                self.vram[self.nametables[index / NAMETABLE_SIZE] + (index & 0x03FF)] = value;
            }
        }
    }
}

/// NROM: the mapping set up at power-on is the whole story.
struct Mapper0 {
    space: AddressSpace,
}

impl Mapper0 {
    fn new(cart: Cartridge) -> Self {
        Self {
            space: AddressSpace::new(cart),
        }
    }
}

impl Mapper for Mapper0 {
    fn read_cpu(&mut self, addr: u16) -> u8 {
        self.space.read_cpu(addr)
    }

    fn write_cpu(&mut self, addr: u16, value: u8) -> u32 {
        self.space.write_sram(addr, value);
        0
    }

    fn read_ppu(&mut self, addr: u16) -> u8 {
        self.space.read_ppu(addr)
    }

    fn write_ppu(&mut self, addr: u16, value: u8) {
        self.space.write_ppu(addr, value);
    }
}

/// MMC1: a 5-bit value is written one bit at a time (LSB first) to anywhere
/// in 0x8000-0xFFFF; the fifth write commits it to the register selected by
/// that write's address range.
///
/// Control byte:
///
/// ```text
/// CPPMM
/// |||++- mirroring (0: one-screen low; 1: one-screen high;
/// |||               2: vertical; 3: horizontal)
/// |++--- PRG mode (0, 1: 32 KiB at 0x8000, low bank bit ignored;
/// |                2: fix first at 0x8000, switch 0xC000;
/// |                3: fix last at 0xC000, switch 0x8000)
/// +----- CHR mode (0: 8 KiB; 1: two 4 KiB pages)
/// ```
struct Mapper1 {
    space: AddressSpace,
    shift: u8,
    shift_count: u8,
    control: u8,
}

impl Mapper1 {
    fn new(cart: Cartridge) -> Self {
        Self {
            space: AddressSpace::new(cart),
            shift: 0,
            shift_count: 0,
            control: 0x0C,
        }
    }

    fn write_register(&mut self, addr: u16, value: u8) {
        // A write with bit 7 set resets the shift register and forces PRG
        // mode 3.
        if (value & 0x80) != 0 {
            self.control |= 0x0C;
            self.apply_control();
            self.shift = 0;
            self.shift_count = 0;
            return;
        }

        self.shift |= (value & 1) << self.shift_count;
        self.shift_count += 1;
        if self.shift_count < 5 {
            return;
        }
        self.shift_count = 0;

        match addr {
            0x8000..=0x9FFF => {
                self.control = self.shift;
                self.apply_control();
            }
            0xA000..=0xBFFF => self.remap_chr0(),
            0xC000..=0xDFFF => self.remap_chr1(),
            _ => self.remap_prg(),
        }
        self.shift = 0;
    }

    fn apply_control(&mut self) {
        match self.control & 3 {
            0 => self.space.set_nametable_banks([0, 0, 0, 0]),
            1 => self.space.set_nametable_banks([1, 1, 1, 1]),
            2 => self.space.set_mirroring(Mirroring::Vertical),
            _ => self.space.set_mirroring(Mirroring::Horizontal),
        }
    }

    fn remap_chr0(&mut self) {
        // CHR-RAM carts have a single fixed 8 KiB page; remaps are no-ops.
        if self.space.chr_is_ram {
            return;
        }

        let bank = self.shift as usize;
        if (self.control & 0x10) == 0 {
            // 8 KiB mode: the low bank bit is dropped and both pattern
            // pages come from the same 8 KiB stretch.
            self.space.map_pattern_page(0, bank & 0x1E);
            self.space.map_pattern_page(1, (bank & 0x1E) | 1);
        } else {
            self.space.map_pattern_page(0, bank);
        }
    }

    fn remap_chr1(&mut self) {
        if self.space.chr_is_ram {
            return;
        }

        // Only meaningful in 4 KiB CHR mode.
        if (self.control & 0x10) != 0 {
            self.space.map_pattern_page(1, self.shift as usize);
        }
    }

    fn remap_prg(&mut self) {
        // Bit 4 is the PRG-RAM chip enable, ignored here.
        let bank = (self.shift & 0x0F) as usize;
        match (self.control >> 2) & 3 {
            0 | 1 => {
                // 32 KiB switch: low bank bit ignored, adjacent 16 KiB
                // banks fill both windows.
                let base = bank & !1;
                self.space.map_cpu_page(0, base);
                self.space.map_cpu_page(1, base | 1);
            }
            2 => {
                self.space.map_cpu_page(0, 0);
                self.space.map_cpu_page(1, bank);
            }
            _ => {
                let last = self.space.prg_bank_count() - 1;
                self.space.map_cpu_page(0, bank);
                self.space.map_cpu_page(1, last);
            }
        }
    }
}

impl Mapper for Mapper1 {
    fn read_cpu(&mut self, addr: u16) -> u8 {
        self.space.read_cpu(addr)
    }

    fn write_cpu(&mut self, addr: u16, value: u8) -> u32 {
        if addr < 0x8000 {
            self.space.write_sram(addr, value);
        } else {
            self.write_register(addr, value);
        }
        0
    }

    fn read_ppu(&mut self, addr: u16) -> u8 {
        self.space.read_ppu(addr)
    }

    fn write_ppu(&mut self, addr: u16, value: u8) {
        self.space.write_ppu(addr, value);
    }
}

/// UxROM: any ROM-range write selects the 16 KiB bank at 0x8000; the last
/// bank stays fixed at 0xC000. These carts carry CHR-RAM.
struct Mapper2 {
    space: AddressSpace,
}

impl Mapper2 {
    fn new(cart: Cartridge) -> Self {
        Self {
            space: AddressSpace::new(cart),
        }
    }
}

impl Mapper for Mapper2 {
    fn read_cpu(&mut self, addr: u16) -> u8 {
        self.space.read_cpu(addr)
    }

    fn write_cpu(&mut self, addr: u16, value: u8) -> u32 {
        if addr >= 0x8000 {
            self.space.map_cpu_page(0, value as usize);
        } else {
            self.space.write_sram(addr, value);
        }
        0
    }

    fn read_ppu(&mut self, addr: u16) -> u8 {
        self.space.read_ppu(addr)
    }

    fn write_ppu(&mut self, addr: u16, value: u8) {
        self.space.write_ppu(addr, value);
    }
}

/// CNROM: any ROM-range write selects an 8 KiB CHR bank (low two bits).
struct Mapper3 {
    space: AddressSpace,
}

impl Mapper3 {
    fn new(cart: Cartridge) -> Self {
        Self {
            space: AddressSpace::new(cart),
        }
    }
}

impl Mapper for Mapper3 {
    fn read_cpu(&mut self, addr: u16) -> u8 {
        self.space.read_cpu(addr)
    }

    fn write_cpu(&mut self, addr: u16, value: u8) -> u32 {
        if addr >= 0x8000 {
            let bank = (value & 3) as usize;
            self.space.map_pattern_page(0, bank * 2);
            self.space.map_pattern_page(1, bank * 2 + 1);
        } else {
            self.space.write_sram(addr, value);
        }
        0
    }

    fn read_ppu(&mut self, addr: u16) -> u8 {
        self.space.read_ppu(addr)
    }

    fn write_ppu(&mut self, addr: u16, value: u8) {
        self.space.write_ppu(addr, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterned_banks(total_size: usize, bank_size: usize) -> Vec<u8> {
        let mut data = vec![0u8; total_size];
        for (bank, chunk) in data.chunks_mut(bank_size).enumerate() {
            chunk.fill((bank as u8).wrapping_add(1));
        }
        data
    }

    fn make_cart(mapper_id: u8, mirroring: Mirroring, prg_rom: Vec<u8>, chr_rom: Vec<u8>) -> Cartridge {
        Cartridge {
            mapper_id,
            mirroring,
            sram_enabled: false,
            prg_rom,
            chr_rom,
        }
    }

    #[test]
    fn unknown_mapper_is_fatal() {
        let cart = make_cart(
            7,
            Mirroring::Horizontal,
            patterned_banks(PRG_BANK_SIZE, PRG_BANK_SIZE),
            Vec::new(),
        );
        assert!(create_mapper(cart).is_err());
    }

    #[test]
    fn four_screen_is_fatal() {
        let cart = make_cart(
            0,
            Mirroring::FourScreen,
            patterned_banks(PRG_BANK_SIZE, PRG_BANK_SIZE),
            Vec::new(),
        );
        assert!(create_mapper(cart).is_err());
    }

    #[test]
    fn nrom_single_bank_appears_in_both_windows() {
        let cart = make_cart(
            0,
            Mirroring::Horizontal,
            patterned_banks(PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(CHR_BANK_SIZE, CHR_BANK_SIZE),
        );
        let mut mapper = create_mapper(cart).unwrap();
        assert_eq!(mapper.read_cpu(0x8000), 1);
        assert_eq!(mapper.read_cpu(0xC000), 1);
    }

    #[test]
    fn nrom_two_banks_map_first_and_last() {
        let cart = make_cart(
            0,
            Mirroring::Horizontal,
            patterned_banks(2 * PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(CHR_BANK_SIZE, CHR_BANK_SIZE),
        );
        let mut mapper = create_mapper(cart).unwrap();
        assert_eq!(mapper.read_cpu(0x8000), 1);
        assert_eq!(mapper.read_cpu(0xC000), 2);
    }

    #[test]
    fn sram_round_trips_through_every_mapper() {
        for id in 0..=3 {
            let cart = make_cart(
                id,
                Mirroring::Horizontal,
                patterned_banks(2 * PRG_BANK_SIZE, PRG_BANK_SIZE),
                patterned_banks(2 * CHR_BANK_SIZE, CHR_BANK_SIZE),
            );
            let mut mapper = create_mapper(cart).unwrap();
            mapper.write_cpu(0x6123, 0x5A);
            assert_eq!(mapper.read_cpu(0x6123), 0x5A, "mapper {id}");
        }
    }

    #[test]
    fn horizontal_mirroring_pairs_nametables() {
        let cart = make_cart(
            0,
            Mirroring::Horizontal,
            patterned_banks(PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(CHR_BANK_SIZE, CHR_BANK_SIZE),
        );
        let mut mapper = create_mapper(cart).unwrap();

        mapper.write_ppu(0x2000, 0x41);
        assert_eq!(mapper.read_ppu(0x2400), 0x41);
        assert_eq!(mapper.read_ppu(0x2800), 0x00);

        mapper.write_ppu(0x2800, 0x42);
        assert_eq!(mapper.read_ppu(0x2C00), 0x42);
    }

    #[test]
    fn vertical_mirroring_pairs_nametables() {
        let cart = make_cart(
            0,
            Mirroring::Vertical,
            patterned_banks(PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(CHR_BANK_SIZE, CHR_BANK_SIZE),
        );
        let mut mapper = create_mapper(cart).unwrap();

        mapper.write_ppu(0x2000, 0x41);
        assert_eq!(mapper.read_ppu(0x2800), 0x41);
        assert_eq!(mapper.read_ppu(0x2400), 0x00);
    }

    #[test]
    fn nametable_space_mirrors_through_0x3eff() {
        let cart = make_cart(
            0,
            Mirroring::Vertical,
            patterned_banks(PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(CHR_BANK_SIZE, CHR_BANK_SIZE),
        );
        let mut mapper = create_mapper(cart).unwrap();
        mapper.write_ppu(0x2005, 0x77);
        assert_eq!(mapper.read_ppu(0x3005), 0x77);
    }

    #[test]
    fn chr_ram_cart_accepts_pattern_writes() {
        let cart = make_cart(
            0,
            Mirroring::Horizontal,
            patterned_banks(PRG_BANK_SIZE, PRG_BANK_SIZE),
            Vec::new(),
        );
        let mut mapper = create_mapper(cart).unwrap();
        mapper.write_ppu(0x0010, 0xAB);
        mapper.write_ppu(0x1010, 0xCD);
        assert_eq!(mapper.read_ppu(0x0010), 0xAB);
        assert_eq!(mapper.read_ppu(0x1010), 0xCD);
    }

    #[test]
    fn chr_rom_cart_ignores_pattern_writes() {
        let cart = make_cart(
            0,
            Mirroring::Horizontal,
            patterned_banks(PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(CHR_BANK_SIZE, CHR_BANK_SIZE),
        );
        let mut mapper = create_mapper(cart).unwrap();
        let before = mapper.read_ppu(0x0010);
        mapper.write_ppu(0x0010, before.wrapping_add(1));
        assert_eq!(mapper.read_ppu(0x0010), before);
    }

    fn mmc1_write_bits(mapper: &mut dyn Mapper, addr: u16, value: u8) {
        for bit in 0..5 {
            mapper.write_cpu(addr, (value >> bit) & 1);
        }
    }

    #[test]
    fn mapper1_prg_mode3_switches_lower_window() {
        let cart = make_cart(
            1,
            Mirroring::Horizontal,
            patterned_banks(4 * PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(CHR_BANK_SIZE, CHR_BANK_SIZE),
        );
        let mut mapper = create_mapper(cart).unwrap();

        // Default control has PRG mode 3: 0x8000 switches, last is fixed.
        mmc1_write_bits(mapper.as_mut(), 0xE000, 0x02);
        assert_eq!(mapper.read_cpu(0x8000), 3);
        assert_eq!(mapper.read_cpu(0xC000), 4);
    }

    #[test]
    fn mapper1_prg_mode2_fixes_first_bank() {
        let cart = make_cart(
            1,
            Mirroring::Horizontal,
            patterned_banks(4 * PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(CHR_BANK_SIZE, CHR_BANK_SIZE),
        );
        let mut mapper = create_mapper(cart).unwrap();

        mmc1_write_bits(mapper.as_mut(), 0x8000, 0x08); // PRG mode 2
        mmc1_write_bits(mapper.as_mut(), 0xE000, 0x02);
        assert_eq!(mapper.read_cpu(0x8000), 1);
        assert_eq!(mapper.read_cpu(0xC000), 3);
    }

    #[test]
    fn mapper1_prg_mode0_switches_32k_ignoring_low_bit() {
        let cart = make_cart(
            1,
            Mirroring::Horizontal,
            patterned_banks(4 * PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(CHR_BANK_SIZE, CHR_BANK_SIZE),
        );
        let mut mapper = create_mapper(cart).unwrap();

        mmc1_write_bits(mapper.as_mut(), 0x8000, 0x00); // PRG mode 0
        mmc1_write_bits(mapper.as_mut(), 0xE000, 0x03); // low bit ignored
        assert_eq!(mapper.read_cpu(0x8000), 3);
        assert_eq!(mapper.read_cpu(0xC000), 4);
    }

    #[test]
    fn mapper1_reset_bit_restores_prg_mode3() {
        let cart = make_cart(
            1,
            Mirroring::Horizontal,
            patterned_banks(4 * PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(CHR_BANK_SIZE, CHR_BANK_SIZE),
        );
        let mut mapper = create_mapper(cart).unwrap();

        mmc1_write_bits(mapper.as_mut(), 0x8000, 0x00);
        // Partial write then a reset; the next full write goes in cleanly.
        mapper.write_cpu(0xE000, 1);
        mapper.write_cpu(0xE000, 0x80);
        mmc1_write_bits(mapper.as_mut(), 0xE000, 0x01);
        assert_eq!(mapper.read_cpu(0x8000), 2);
        assert_eq!(mapper.read_cpu(0xC000), 4);
    }

    #[test]
    fn mapper1_chr_4k_mode_maps_pages_independently() {
        let cart = make_cart(
            1,
            Mirroring::Horizontal,
            patterned_banks(2 * PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(2 * CHR_BANK_SIZE, CHR_BANK_SIZE / 2),
        );
        let mut mapper = create_mapper(cart).unwrap();

        mmc1_write_bits(mapper.as_mut(), 0x8000, 0x1C); // CHR 4K mode
        mmc1_write_bits(mapper.as_mut(), 0xA000, 0x02);
        mmc1_write_bits(mapper.as_mut(), 0xC000, 0x01);
        assert_eq!(mapper.read_ppu(0x0000), 3);
        assert_eq!(mapper.read_ppu(0x1000), 2);
    }

    #[test]
    fn mapper1_chr_8k_mode_drops_low_bank_bit() {
        let cart = make_cart(
            1,
            Mirroring::Horizontal,
            patterned_banks(2 * PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(2 * CHR_BANK_SIZE, CHR_BANK_SIZE / 2),
        );
        let mut mapper = create_mapper(cart).unwrap();

        mmc1_write_bits(mapper.as_mut(), 0x8000, 0x0C); // CHR 8K mode
        mmc1_write_bits(mapper.as_mut(), 0xA000, 0x03);
        assert_eq!(mapper.read_ppu(0x0000), 3);
        assert_eq!(mapper.read_ppu(0x1000), 4);
    }

    #[test]
    fn mapper1_one_screen_mirroring() {
        let cart = make_cart(
            1,
            Mirroring::Horizontal,
            patterned_banks(2 * PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(CHR_BANK_SIZE, CHR_BANK_SIZE),
        );
        let mut mapper = create_mapper(cart).unwrap();

        mmc1_write_bits(mapper.as_mut(), 0x8000, 0x0C); // one-screen low
        mapper.write_ppu(0x2000, 0x99);
        assert_eq!(mapper.read_ppu(0x2400), 0x99);
        assert_eq!(mapper.read_ppu(0x2800), 0x99);
        assert_eq!(mapper.read_ppu(0x2C00), 0x99);
    }

    #[test]
    fn mapper2_switches_lower_window_and_keeps_last_fixed() {
        let cart = make_cart(
            2,
            Mirroring::Horizontal,
            patterned_banks(3 * PRG_BANK_SIZE, PRG_BANK_SIZE),
            Vec::new(),
        );
        let mut mapper = create_mapper(cart).unwrap();

        mapper.write_cpu(0x8000, 1);
        assert_eq!(mapper.read_cpu(0x8000), 2);
        assert_eq!(mapper.read_cpu(0xC000), 3);
    }

    #[test]
    fn mapper3_switches_chr_bank_with_low_two_bits() {
        let cart = make_cart(
            3,
            Mirroring::Horizontal,
            patterned_banks(2 * PRG_BANK_SIZE, PRG_BANK_SIZE),
            patterned_banks(4 * CHR_BANK_SIZE, CHR_BANK_SIZE),
        );
        let mut mapper = create_mapper(cart).unwrap();

        mapper.write_cpu(0x8000, 0x01);
        assert_eq!(mapper.read_ppu(0x0000), 2);
        // Bits above the low two are ignored.
        mapper.write_cpu(0x8000, 0xFE);
        assert_eq!(mapper.read_ppu(0x0000), 3);
    }
}
