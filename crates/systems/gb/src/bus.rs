//! Game Boy memory bus implementation
//!
//! The bus connects every component and is the only place time advances:
//! each timed CPU access first ticks the Timer, APU, PPU (4 dots) and the
//! cartridge clock by one machine cycle, then performs the transfer.
//! `peek`/`poke` are the untimed path for debuggers and save states.
//!
//! # Memory Map
//!
//! ```text
//! $0000-$00FF  Boot ROM (until $FF50 is written)
//! $0000-$3FFF  ROM Bank 0 (via mapper)
//! $4000-$7FFF  ROM Bank 1-N (switchable via mapper)
//! $8000-$9FFF  Video RAM (8KB)
//! $A000-$BFFF  External RAM (via mapper)
//! $C000-$DFFF  Work RAM (8KB)
//! $E000-$FDFF  Echo RAM (mirror of $C000-$DDFF)
//! $FE00-$FE9F  OAM (40 sprites x 4 bytes)
//! $FEA0-$FEFF  Not usable
//! $FF00-$FF7F  I/O Registers
//! $FF80-$FFFE  High RAM (127 bytes)
//! $FFFF        Interrupt Enable Register
//! ```
//!
//! # I/O Registers
//!
//! - `$FF00 (P1)`: Joypad matrix. Bit 5 low selects buttons, bit 4 low
//!   selects directions; pressed keys read as 0 in bits 0-3.
//! - `$FF01/$FF02 (SB/SC)`: Serial. A transfer started with the internal
//!   clock completes at once with no partner attached: the byte sent is
//!   recorded, SB reads back 0xFF and the serial interrupt is raised.
//! - `$FF04-$FF07`: Timer
//! - `$FF0F (IF)`: Interrupt flags, upper 3 bits read as 1
//! - `$FF10-$FF3F`: APU
//! - `$FF40-$FF4B`: PPU, `$FF46` starts OAM DMA
//! - `$FF50`: Boot ROM disable

use emu_core::cpu_sm83::MemorySm83;
use emu_core::logging::{log, LogCategory, LogLevel};

use crate::apu::Apu;
use crate::bootrom::BootRom;
use crate::cartridge::Cartridge;
use crate::ppu::Ppu;
use crate::timer::Timer;

// Interrupt request bits (IF / IE)
pub const INT_VBLANK: u8 = 0x01;
pub const INT_STAT: u8 = 0x02;
pub const INT_TIMER: u8 = 0x04;
pub const INT_SERIAL: u8 = 0x08;
pub const INT_JOYPAD: u8 = 0x10;

/// Game Boy memory bus
pub struct GbBus {
    pub(crate) wram: [u8; 0x2000],
    pub(crate) hram: [u8; 0x7F],
    pub(crate) ie: u8,
    pub(crate) if_reg: u8,
    cartridge: Option<Cartridge>,
    bootrom: Option<BootRom>,
    bootrom_mapped: bool,
    pub ppu: Ppu,
    pub apu: Apu,
    pub timer: Timer,
    /// P1 select bits (4-5)
    joypad_select: u8,
    /// Pressed buttons, active high.
    /// Bits: 0=Right, 1=Left, 2=Up, 3=Down, 4=A, 5=B, 6=Select, 7=Start
    button_state: u8,
    serial_data: u8,
    serial_control: u8,
    serial_out: Vec<u8>,
    dma_source: u8,
}

impl Default for GbBus {
    fn default() -> Self {
        Self::new(Apu::default())
    }
}

impl GbBus {
    pub fn new(apu: Apu) -> Self {
        Self {
            wram: [0; 0x2000],
            hram: [0; 0x7F],
            ie: 0,
            if_reg: 0,
            cartridge: None,
            bootrom: None,
            bootrom_mapped: false,
            ppu: Ppu::new(),
            apu,
            timer: Timer::new(),
            joypad_select: 0x30,
            button_state: 0,
            serial_data: 0,
            serial_control: 0,
            serial_out: Vec::new(),
            dma_source: 0xFF,
        }
    }

    /// Apply power-on state to the bus and every peripheral. The cartridge
    /// keeps its RAM; its mapper registers are reset.
    pub fn init(&mut self, using_bootrom: bool) {
        let using_bootrom = using_bootrom && self.bootrom.is_some();
        self.wram.fill(0);
        self.hram.fill(0);
        self.ie = 0;
        self.if_reg = if using_bootrom { 0 } else { 0x01 };
        self.bootrom_mapped = using_bootrom;
        self.joypad_select = 0x30;
        self.serial_data = 0;
        self.serial_control = 0;
        self.serial_out.clear();
        self.dma_source = 0xFF;
        self.timer.init(using_bootrom);
        self.ppu.init(using_bootrom);
        self.apu.init(using_bootrom);
        if let Some(cart) = self.cartridge.as_mut() {
            cart.reset();
        }
    }

    pub fn insert_cartridge(&mut self, cart: Cartridge) {
        self.cartridge = Some(cart);
    }

    pub fn remove_cartridge(&mut self) -> Option<Cartridge> {
        self.cartridge.take()
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    pub fn cartridge_mut(&mut self) -> Option<&mut Cartridge> {
        self.cartridge.as_mut()
    }

    pub fn set_bootrom(&mut self, rom: Option<BootRom>) {
        self.bootrom = rom;
    }

    pub fn has_bootrom(&self) -> bool {
        self.bootrom.is_some()
    }

    pub fn bootrom_mapped(&self) -> bool {
        self.bootrom_mapped
    }

    /// Set joypad button state (active high)
    /// Bits: 0=Right, 1=Left, 2=Up, 3=Down, 4=A, 5=B, 6=Select, 7=Start
    pub fn set_buttons(&mut self, state: u8) {
        let pressed = state & !self.button_state;
        self.button_state = state;
        if pressed != 0 {
            self.request_interrupt(INT_JOYPAD);
        }
    }

    pub fn request_interrupt(&mut self, bits: u8) {
        self.if_reg |= bits & 0x1F;
    }

    /// Bytes sent over the serial port since power-on
    pub fn serial_output(&self) -> &[u8] {
        &self.serial_out
    }

    /// One machine cycle for every peripheral
    fn tick_components(&mut self) {
        if self.timer.tick() {
            self.if_reg |= INT_TIMER;
        }
        self.apu.tick(self.timer.div());
        self.if_reg |= self.ppu.tick(4);
        if let Some(cart) = self.cartridge.as_mut() {
            cart.tick();
        }
    }

    fn read_joypad(&self) -> u8 {
        let mut low = 0x0F;
        if self.joypad_select & 0x10 == 0 {
            low &= !(self.button_state & 0x0F);
        }
        if self.joypad_select & 0x20 == 0 {
            low &= !(self.button_state >> 4);
        }
        0xC0 | self.joypad_select | low
    }

    /// Address decode. `untimed` bypasses the PPU's Draw-mode lock.
    fn read_internal(&self, addr: u16, untimed: bool) -> u8 {
        match addr {
            0x0000..=0x00FF if self.bootrom_mapped => match &self.bootrom {
                Some(rom) => rom.read(addr),
                None => 0xFF,
            },
            0x0000..=0x7FFF => self.cartridge.as_ref().map_or(0xFF, |c| c.read_rom(addr)),
            0x8000..=0x9FFF => {
                if untimed {
                    self.ppu.peek_vram(addr)
                } else {
                    self.ppu.read_vram(addr)
                }
            }
            0xA000..=0xBFFF => self.cartridge.as_ref().map_or(0xFF, |c| c.read_ram(addr)),
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize],
            0xFE00..=0xFE9F => {
                if untimed {
                    self.ppu.peek_oam(addr - 0xFE00)
                } else {
                    self.ppu.read_oam(addr - 0xFE00)
                }
            }
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00 => self.read_joypad(),
            0xFF01 => self.serial_data,
            0xFF02 => self.serial_control | 0x7E,
            0xFF04..=0xFF07 => self.timer.read_register(addr),
            0xFF0F => 0xE0 | self.if_reg,
            0xFF10..=0xFF3F => self.apu.read_register(addr),
            0xFF46 => self.dma_source,
            0xFF40..=0xFF4B => self.ppu.read_register(addr),
            0xFF00..=0xFF7F => 0xFF,
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ie,
        }
    }

    fn write_internal(&mut self, addr: u16, val: u8, untimed: bool) {
        match addr {
            0x0000..=0x7FFF => {
                if let Some(cart) = self.cartridge.as_mut() {
                    cart.write_rom(addr, val);
                }
            }
            0x8000..=0x9FFF => {
                if untimed {
                    self.ppu.poke_vram(addr, val);
                } else {
                    self.ppu.write_vram(addr, val);
                }
            }
            0xA000..=0xBFFF => {
                if let Some(cart) = self.cartridge.as_mut() {
                    cart.write_ram(addr, val);
                }
            }
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize] = val,
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize] = val,
            0xFE00..=0xFE9F => {
                if untimed {
                    self.ppu.poke_oam(addr - 0xFE00, val);
                } else {
                    self.ppu.write_oam(addr - 0xFE00, val);
                }
            }
            0xFEA0..=0xFEFF => {}
            0xFF00 => self.joypad_select = val & 0x30,
            0xFF01 => self.serial_data = val,
            0xFF02 => {
                self.serial_control = val & 0x81;
                if val & 0x81 == 0x81 {
                    self.serial_out.push(self.serial_data);
                    self.serial_data = 0xFF;
                    self.serial_control &= 0x7F;
                    self.request_interrupt(INT_SERIAL);
                }
            }
            0xFF04 => {
                self.timer.write_register(addr, val);
                self.apu.reset_div_edge();
            }
            0xFF05..=0xFF07 => self.timer.write_register(addr, val),
            0xFF0F => self.if_reg = val & 0x1F,
            0xFF10..=0xFF3F => self.apu.write_register(addr, val),
            0xFF46 => self.oam_dma(val),
            0xFF40..=0xFF4B => self.ppu.write_register(addr, val),
            0xFF50 => {
                if val != 0 && self.bootrom_mapped {
                    self.bootrom_mapped = false;
                    log(LogCategory::Bus, LogLevel::Debug, || {
                        "Boot ROM unmapped".to_string()
                    });
                }
            }
            0xFF00..=0xFF7F => {}
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.ie = val,
        }
    }

    /// Copy 160 bytes from `page << 8` into OAM
    fn oam_dma(&mut self, page: u8) {
        self.dma_source = page;
        let base = (page as u16) << 8;
        for i in 0..0xA0u16 {
            let byte = self.read_internal(base.wrapping_add(i), true);
            self.ppu.poke_oam(i, byte);
        }
        log(LogCategory::Bus, LogLevel::Trace, || {
            format!("OAM DMA from {:#06X}", base)
        });
    }
}

impl MemorySm83 for GbBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.tick_components();
        self.read_internal(addr, false)
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.tick_components();
        self.write_internal(addr, val, false);
    }

    fn tick(&mut self) {
        self.tick_components();
    }

    fn peek(&self, addr: u16) -> u8 {
        self.read_internal(addr, true)
    }

    fn poke(&mut self, addr: u16, val: u8) {
        self.write_internal(addr, val, true);
    }

    fn pending_interrupts(&self) -> u8 {
        self.ie & self.if_reg & 0x1F
    }

    fn acknowledge_interrupt(&mut self, mask: u8) {
        self.if_reg &= !mask;
    }
}
