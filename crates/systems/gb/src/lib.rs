//! Game Boy (DMG) system implementation
//!
//! `GbSystem` owns an SM83 CPU whose memory is the [`GbBus`]; the bus owns
//! every peripheral. Time only moves when the CPU touches the bus, so
//! stepping the CPU is the whole emulation loop.

use std::path::Path;

use emu_core::cpu_sm83::{CpuSm83, MemorySm83, Sm83Registers};
use emu_core::renderer::Renderer;
use emu_core::types::Frame;
use emu_core::{MountPointInfo, System};

pub mod apu;
pub mod bootrom;
pub mod bus;
pub mod cartridge;
pub mod mappers;
pub mod pacer;
pub mod ppu;
pub mod ppu_renderer;
pub mod timer;

use apu::Apu;
use bootrom::{BootRom, BootRomError};
use bus::GbBus;
use cartridge::{Cartridge, CartridgeError};
use pacer::FramePacer;
use ppu::DOTS_PER_FRAME;
use ppu_renderer::{PpuRenderer, SoftwarePpuRenderer};

pub use emu_core::apu::SampleRing;

const CARTRIDGE: &str = "Cartridge";
const BOOTROM: &str = "BootROM";

pub struct GbSystem {
    cpu: CpuSm83<GbBus>,
    renderer: SoftwarePpuRenderer,
    pacer: FramePacer,
}

impl Default for GbSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl GbSystem {
    pub fn new() -> Self {
        Self::from_apu(Apu::default())
    }

    /// Construct with a specific host audio configuration
    pub fn with_audio(sample_rate: u32, capacity: usize, volume: f32) -> Self {
        Self::from_apu(Apu::new(sample_rate, capacity, volume))
    }

    fn from_apu(apu: Apu) -> Self {
        let mut sys = Self {
            cpu: CpuSm83::new(GbBus::new(apu)),
            renderer: SoftwarePpuRenderer::new(),
            pacer: FramePacer::new(),
        };
        sys.init(false);
        sys
    }

    /// Reapply power-on state to every component. `using_bootrom` only takes
    /// effect when a boot ROM is mounted.
    pub fn init(&mut self, using_bootrom: bool) {
        let using_bootrom = using_bootrom && self.cpu.memory.has_bootrom();
        self.cpu.memory.init(using_bootrom);
        self.cpu.init(using_bootrom);
        self.pacer.reset();
        self.renderer.reset();
    }

    pub fn load_cartridge(&mut self, path: impl AsRef<Path>) -> Result<(), GbError> {
        let cart = Cartridge::load(path)?;
        self.insert_cartridge(cart);
        Ok(())
    }

    pub fn load_bootrom(&mut self, path: impl AsRef<Path>) -> Result<(), GbError> {
        let rom = BootRom::load(path)?;
        self.cpu.memory.set_bootrom(Some(rom));
        self.reset();
        Ok(())
    }

    pub fn insert_cartridge(&mut self, cart: Cartridge) {
        self.cpu.memory.insert_cartridge(cart);
        self.reset();
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cpu.memory.cartridge()
    }

    /// Execute one instruction; returns T-cycles consumed
    pub fn step_instruction(&mut self) -> u32 {
        self.cpu.step()
    }

    /// Run one host frame (1/60 s of emulated time). Returns true when the
    /// PPU completed a frame during it.
    pub fn run_host_frame(&mut self) -> Result<bool, GbError> {
        if self.cpu.memory.cartridge().is_none() {
            return Err(GbError::NoCartridge);
        }
        self.pacer.begin_frame();
        let mut presented = false;
        while self.pacer.has_budget() {
            let cycles = self.cpu.step();
            self.pacer.consume(cycles);
            if self.cpu.memory.ppu.take_frame_ready() {
                self.renderer.render_frame(&self.cpu.memory.ppu);
                presented = true;
            }
        }
        self.cpu.memory.apu.flush();
        Ok(presented)
    }

    /// Most recently presented frame
    pub fn frame(&self) -> &Frame {
        self.renderer.get_frame()
    }

    /// Set controller state (Game Boy buttons)
    /// Bits: 0=Right, 1=Left, 2=Up, 3=Down, 4=A, 5=B, 6=Select, 7=Start
    pub fn set_controller(&mut self, state: u8) {
        self.cpu.memory.set_buttons(state);
    }

    /// Drain up to `out.len()` audio samples; never blocks
    pub fn read_samples(&self, out: &mut [f32]) -> usize {
        self.cpu.memory.apu.read_samples(out)
    }

    /// Shared handle to the audio ring for a host audio callback
    pub fn audio_ring(&self) -> SampleRing {
        self.cpu.memory.apu.ring()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.cpu.memory.apu.set_volume(volume);
    }

    /// Bytes written to the serial port
    pub fn serial_output(&self) -> &[u8] {
        self.cpu.memory.serial_output()
    }

    /// Battery-backed cartridge RAM, if the cartridge has any
    pub fn save_ram(&self) -> Option<Vec<u8>> {
        self.cpu
            .memory
            .cartridge()
            .and_then(|c| c.save_ram())
            .map(|ram| ram.to_vec())
    }

    pub fn load_ram(&mut self, data: &[u8]) {
        if let Some(cart) = self.cpu.memory.cartridge_mut() {
            cart.load_ram(data);
        }
    }

    pub fn registers(&self) -> Sm83Registers {
        self.cpu.registers()
    }

    /// Side-effect free read for inspection tooling
    pub fn peek(&self, addr: u16) -> u8 {
        self.cpu.memory.peek(addr)
    }

    /// Called with PC at each instruction boundary
    pub fn set_instruction_hook<F>(&mut self, hook: F)
    where
        F: FnMut(u16) + Send + 'static,
    {
        self.cpu.set_instruction_hook(hook);
    }

    pub fn clear_instruction_hook(&mut self) {
        self.cpu.clear_instruction_hook();
    }

    pub fn cpu(&self) -> &CpuSm83<GbBus> {
        &self.cpu
    }

    pub fn bus(&self) -> &GbBus {
        &self.cpu.memory
    }

    pub fn bus_mut(&mut self) -> &mut GbBus {
        &mut self.cpu.memory
    }
}

#[derive(thiserror::Error, Debug)]
pub enum GbError {
    #[error("No cartridge loaded")]
    NoCartridge,
    #[error("Invalid mount point")]
    InvalidMountPoint,
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
    #[error(transparent)]
    BootRom(#[from] BootRomError),
}

fn load_bytes(state: &serde_json::Value, field: &str, target: &mut [u8]) {
    if let Some(arr) = state.get(field).and_then(|v| v.as_array()) {
        for (dst, src) in target.iter_mut().zip(arr) {
            if let Some(b) = src.as_u64() {
                *dst = b as u8;
            }
        }
    }
}

impl System for GbSystem {
    type Error = GbError;

    fn reset(&mut self) {
        let using_bootrom = self.cpu.memory.has_bootrom();
        self.init(using_bootrom);
    }

    fn step_frame(&mut self) -> Result<Frame, Self::Error> {
        if self.cpu.memory.cartridge().is_none() {
            return Err(GbError::NoCartridge);
        }

        // With the LCD off no frame ever completes; stop after one frame's time
        let mut cycles = 0u32;
        loop {
            cycles += self.cpu.step();
            if self.cpu.memory.ppu.take_frame_ready() {
                self.renderer.render_frame(&self.cpu.memory.ppu);
                break;
            }
            if cycles >= DOTS_PER_FRAME && !self.cpu.memory.ppu.lcd_enabled() {
                break;
            }
        }
        self.cpu.memory.apu.flush();

        Ok(self.renderer.get_frame().clone())
    }

    fn save_state(&self) -> serde_json::Value {
        let bus = &self.cpu.memory;
        let ppu = &bus.ppu;
        let cartridge = bus.cartridge().map(|c| c.save_state());
        serde_json::json!({
            "system": "gb",
            "version": 3,
            "cpu": {
                "a": self.cpu.a,
                "f": self.cpu.f,
                "b": self.cpu.b,
                "c": self.cpu.c,
                "d": self.cpu.d,
                "e": self.cpu.e,
                "h": self.cpu.h,
                "l": self.cpu.l,
                "sp": self.cpu.sp,
                "pc": self.cpu.pc,
                "ime": self.cpu.ime,
                "ime_delay": self.cpu.ime_delay,
                "halted": self.cpu.halted,
                "stopped": self.cpu.stopped,
                "halt_bug": self.cpu.halt_bug,
            },
            "timer": {
                "divider": bus.timer.divider,
                "tima": bus.timer.tima,
                "tma": bus.timer.tma,
                "tac": bus.timer.tac,
                "overflow": bus.timer.overflow,
            },
            "interrupts": {
                "ie": bus.ie,
                "if": bus.if_reg,
            },
            "ppu": {
                "lcdc": ppu.lcdc,
                "stat": ppu.stat,
                "scy": ppu.scy,
                "scx": ppu.scx,
                "ly": ppu.ly,
                "lyc": ppu.lyc,
                "bgp": ppu.bgp,
                "obp0": ppu.obp0,
                "obp1": ppu.obp1,
                "wy": ppu.wy,
                "wx": ppu.wx,
            },
            "cartridge": cartridge,
            "wram": bus.wram.to_vec(),
            "hram": bus.hram.to_vec(),
            "vram": ppu.vram.to_vec(),
            "oam": ppu.oam.to_vec(),
        })
    }

    fn load_state(&mut self, v: &serde_json::Value) -> Result<(), serde_json::Error> {
        macro_rules! load_u8 {
            ($state:expr, $field:literal, $target:expr) => {
                if let Some(val) = $state.get($field).and_then(|v| v.as_u64()) {
                    $target = val as u8;
                }
            };
        }

        macro_rules! load_u16 {
            ($state:expr, $field:literal, $target:expr) => {
                if let Some(val) = $state.get($field).and_then(|v| v.as_u64()) {
                    $target = val as u16;
                }
            };
        }

        macro_rules! load_bool {
            ($state:expr, $field:literal, $target:expr) => {
                if let Some(val) = $state.get($field).and_then(|v| v.as_bool()) {
                    $target = val;
                }
            };
        }

        if let Some(cpu_state) = v.get("cpu") {
            load_u8!(cpu_state, "a", self.cpu.a);
            load_u8!(cpu_state, "f", self.cpu.f);
            self.cpu.f &= 0xF0;
            load_u8!(cpu_state, "b", self.cpu.b);
            load_u8!(cpu_state, "c", self.cpu.c);
            load_u8!(cpu_state, "d", self.cpu.d);
            load_u8!(cpu_state, "e", self.cpu.e);
            load_u8!(cpu_state, "h", self.cpu.h);
            load_u8!(cpu_state, "l", self.cpu.l);
            load_u16!(cpu_state, "sp", self.cpu.sp);
            load_u16!(cpu_state, "pc", self.cpu.pc);
            load_bool!(cpu_state, "ime", self.cpu.ime);
            load_u8!(cpu_state, "ime_delay", self.cpu.ime_delay);
            load_bool!(cpu_state, "halted", self.cpu.halted);
            load_bool!(cpu_state, "stopped", self.cpu.stopped);
            load_bool!(cpu_state, "halt_bug", self.cpu.halt_bug);
        }

        let bus = &mut self.cpu.memory;
        if let Some(timer) = v.get("timer") {
            load_u16!(timer, "divider", bus.timer.divider);
            load_u8!(timer, "tima", bus.timer.tima);
            load_u8!(timer, "tma", bus.timer.tma);
            load_u8!(timer, "tac", bus.timer.tac);
            load_bool!(timer, "overflow", bus.timer.overflow);
            bus.apu.reset_div_edge();
        }

        if let Some(irq) = v.get("interrupts") {
            load_u8!(irq, "ie", bus.ie);
            load_u8!(irq, "if", bus.if_reg);
            bus.if_reg &= 0x1F;
        }

        let ppu = &mut bus.ppu;
        if let Some(regs) = v.get("ppu") {
            load_u8!(regs, "lcdc", ppu.lcdc);
            load_u8!(regs, "stat", ppu.stat);
            ppu.stat &= 0x78;
            load_u8!(regs, "scy", ppu.scy);
            load_u8!(regs, "scx", ppu.scx);
            load_u8!(regs, "ly", ppu.ly);
            load_u8!(regs, "lyc", ppu.lyc);
            load_u8!(regs, "bgp", ppu.bgp);
            load_u8!(regs, "obp0", ppu.obp0);
            load_u8!(regs, "obp1", ppu.obp1);
            load_u8!(regs, "wy", ppu.wy);
            load_u8!(regs, "wx", ppu.wx);
        }
        load_bytes(v, "vram", &mut ppu.vram[..]);
        load_bytes(v, "oam", &mut ppu.oam);
        ppu.resync();

        load_bytes(v, "wram", &mut bus.wram);
        if let Some(cart_state) = v.get("cartridge").filter(|c| !c.is_null()) {
            if let Some(cart) = bus.cartridge_mut() {
                cart.load_state(cart_state)?;
            }
        }
        load_bytes(v, "hram", &mut bus.hram);
        Ok(())
    }

    fn supports_save_states(&self) -> bool {
        true
    }

    fn mount_points(&self) -> Vec<MountPointInfo> {
        vec![
            MountPointInfo {
                id: CARTRIDGE.to_string(),
                name: "Cartridge Slot".to_string(),
                extensions: vec!["gb".to_string()],
                required: true,
            },
            MountPointInfo {
                id: BOOTROM.to_string(),
                name: "Boot ROM".to_string(),
                extensions: vec!["bin".to_string()],
                required: false,
            },
        ]
    }

    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error> {
        match mount_point_id {
            CARTRIDGE => {
                let cart = Cartridge::from_bytes(data)?;
                self.insert_cartridge(cart);
            }
            BOOTROM => {
                let rom = BootRom::from_bytes(data)?;
                self.cpu.memory.set_bootrom(Some(rom));
                self.reset();
            }
            _ => return Err(GbError::InvalidMountPoint),
        }
        Ok(())
    }

    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error> {
        match mount_point_id {
            CARTRIDGE => {
                self.cpu.memory.remove_cartridge();
            }
            BOOTROM => {
                self.cpu.memory.set_bootrom(None);
                self.reset();
            }
            _ => return Err(GbError::InvalidMountPoint),
        }
        Ok(())
    }

    fn is_mounted(&self, mount_point_id: &str) -> bool {
        match mount_point_id {
            CARTRIDGE => self.cpu.memory.cartridge().is_some(),
            BOOTROM => self.cpu.memory.has_bootrom(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::tests::make_rom;
    use emu_core::types::DMG_SHADES;

    /// NoMBC ROM whose entry point is `program`
    fn rom_with_program(program: &[u8]) -> Vec<u8> {
        let mut rom = make_rom(0x00, 0, 0);
        rom[0x100..0x100 + program.len()].copy_from_slice(program);
        rom
    }

    fn mounted(program: &[u8]) -> GbSystem {
        let mut sys = GbSystem::new();
        sys.mount("Cartridge", &rom_with_program(program)).unwrap();
        sys
    }

    #[test]
    fn test_gb_system_creation() {
        let sys = GbSystem::new();
        assert!(!sys.is_mounted("Cartridge"));
        assert!(!sys.is_mounted("BootROM"));
        assert_eq!(sys.registers().pc, 0x0100);
    }

    #[test]
    fn test_gb_mount_points() {
        let sys = GbSystem::new();
        let mount_points = sys.mount_points();
        assert_eq!(mount_points.len(), 2);
        assert_eq!(mount_points[0].id, "Cartridge");
        assert!(mount_points[0].required);
        assert_eq!(mount_points[1].id, "BootROM");
        assert!(!mount_points[1].required);
    }

    #[test]
    fn test_gb_mount_unmount() {
        let mut sys = GbSystem::new();
        assert!(!sys.is_mounted("Cartridge"));

        let rom = make_rom(0x00, 0, 0);
        assert!(sys.mount("Cartridge", &rom).is_ok());
        assert!(sys.is_mounted("Cartridge"));

        assert!(sys.unmount("Cartridge").is_ok());
        assert!(!sys.is_mounted("Cartridge"));
        assert!(matches!(sys.mount("Tape", &rom), Err(GbError::InvalidMountPoint)));
    }

    #[test]
    fn test_gb_unrecognized_mapper() {
        let mut sys = GbSystem::new();
        let rom = make_rom(0xFC, 0, 0);
        let err = sys.mount("Cartridge", &rom).unwrap_err();
        assert!(matches!(
            err,
            GbError::Cartridge(CartridgeError::UnrecognizedMapper(0xFC))
        ));
        assert!(!sys.is_mounted("Cartridge"));
    }

    #[test]
    fn test_gb_bad_bootrom_keeps_defaults() {
        let mut sys = mounted(&[]);
        let err = sys.mount("BootROM", &[0u8; 100]).unwrap_err();
        assert!(matches!(err, GbError::BootRom(BootRomError::WrongSize(100))));
        assert!(!sys.is_mounted("BootROM"));
        assert_eq!(sys.registers().pc, 0x0100);
        assert_eq!(sys.bus().ppu.lcdc, 0x91);
    }

    #[test]
    fn test_gb_bootrom_starts_at_zero() {
        let mut sys = mounted(&[]);
        sys.mount("BootROM", &[0u8; 256]).unwrap();
        assert_eq!(sys.registers().pc, 0x0000);
        assert!(sys.bus().bootrom_mapped());
        assert_eq!(sys.bus().ppu.lcdc, 0x00);
    }

    #[test]
    fn test_gb_step_frame_without_cart() {
        let mut sys = GbSystem::new();
        assert!(matches!(sys.step_frame(), Err(GbError::NoCartridge)));
        assert!(matches!(sys.run_host_frame(), Err(GbError::NoCartridge)));
    }

    #[test]
    fn test_gb_step_frame_with_cart() {
        let mut sys = mounted(&[]);
        let frame = sys.step_frame().unwrap();
        assert_eq!(frame.width, 160);
        assert_eq!(frame.height, 144);
        // Blank VRAM with BGP 0xFC is shade 0 everywhere
        assert!(frame.pixels.iter().all(|&p| p == DMG_SHADES[0]));
    }

    #[test]
    fn test_gb_frame_pixels_follow_vram() {
        let mut sys = mounted(&[0x18, 0xFE]);
        // Top row of tile 0 is colour 3; the map is all tile 0
        sys.bus_mut().ppu.vram[0] = 0xFF;
        sys.bus_mut().ppu.vram[1] = 0xFF;
        sys.step_frame().unwrap();
        let frame = sys.step_frame().unwrap();
        assert_eq!(frame.pixel(0, 0), Some(DMG_SHADES[3]));
        assert_eq!(frame.pixel(159, 8), Some(DMG_SHADES[3]));
        assert_eq!(frame.pixel(0, 1), Some(DMG_SHADES[0]));
        assert_eq!(frame.pixel(160, 0), None);
        assert_eq!(sys.frame(), &frame);
    }

    #[test]
    fn test_gb_step_frame_lcd_off_terminates() {
        // LD A,0; LDH (40),A; JR -2
        let mut sys = mounted(&[0x3E, 0x00, 0xE0, 0x40, 0x18, 0xFE]);
        assert!(sys.step_frame().is_ok());
        assert!(!sys.bus().ppu.lcd_enabled());
        assert!(sys.step_frame().is_ok());
    }

    #[test]
    fn test_gb_run_host_frame_presents() {
        let mut sys = mounted(&[0x18, 0xFE]);
        let presented: usize = (0..3)
            .map(|_| sys.run_host_frame().unwrap() as usize)
            .sum();
        // 3 host frames at 60 Hz cover at least 2 full LCD frames
        assert!(presented >= 2);
    }

    #[test]
    fn test_gb_audio_produced() {
        let mut sys = GbSystem::with_audio(48000, 16384, 1.0);
        sys.mount("Cartridge", &rom_with_program(&[0x18, 0xFE])).unwrap();
        sys.run_host_frame().unwrap();
        let mut buf = vec![0.0f32; 16384];
        let n = sys.read_samples(&mut buf);
        // 1/60 s at 48 kHz
        assert!((795..=805).contains(&n), "got {n} samples");
    }

    #[test]
    fn test_gb_serial_output() {
        // LD A,'K'; LDH (01),A; LD A,81; LDH (02),A; JR -2
        let mut sys = mounted(&[0x3E, b'K', 0xE0, 0x01, 0x3E, 0x81, 0xE0, 0x02, 0x18, 0xFE]);
        for _ in 0..6 {
            sys.step_instruction();
        }
        assert_eq!(sys.serial_output(), b"K");
    }

    #[test]
    fn test_gb_save_load_state() {
        // LD A,42; LD (C000),A; JR -2
        let mut sys = mounted(&[0x3E, 0x42, 0xEA, 0x00, 0xC0, 0x18, 0xFE]);
        for _ in 0..10 {
            sys.step_instruction();
        }
        let state = sys.save_state();
        assert_eq!(state["system"], "gb");
        assert_eq!(state["cpu"]["a"], 0x42);

        let text = serde_json::to_string(&state).unwrap();
        let state: serde_json::Value = serde_json::from_str(&text).unwrap();

        let mut sys2 = mounted(&[]);
        assert!(sys2.load_state(&state).is_ok());
        assert_eq!(sys2.registers(), sys.registers());
        assert_eq!(sys2.peek(0xC000), 0x42);
        assert_eq!(sys2.bus().timer.divider, sys.bus().timer.divider);
        assert_eq!(sys2.bus().ppu.ly, sys.bus().ppu.ly);
    }

    #[test]
    fn test_gb_rtc_in_save_state() {
        let mut sys = GbSystem::new();
        sys.mount("Cartridge", &make_rom(0x10, 0, 0x02)).unwrap();
        sys.bus_mut()
            .cartridge_mut()
            .and_then(|c| c.rtc_mut())
            .unwrap()
            .live
            .minutes = 42;
        let state = sys.save_state();
        assert_eq!(state["cartridge"]["mapper"]["Mbc3"]["rtc"]["live"]["minutes"], 42);

        let mut sys2 = GbSystem::new();
        sys2.mount("Cartridge", &make_rom(0x10, 0, 0x02)).unwrap();
        sys2.load_state(&state).unwrap();
        let rtc = sys2.cartridge().and_then(|c| c.rtc()).unwrap();
        assert_eq!(rtc.live.minutes, 42);
    }

    #[test]
    fn test_gb_save_state_keeps_bank_and_cart_ram() {
        let mut rom = make_rom(0x03, 2, 0x02);
        rom[5 * 0x4000] = 0x55;
        let mut sys = GbSystem::new();
        sys.mount("Cartridge", &rom).unwrap();
        let cart = sys.bus_mut().cartridge_mut().unwrap();
        cart.write_rom(0x0000, 0x0A);
        cart.write_rom(0x2000, 0x05);
        cart.write_ram(0xA000, 0x77);
        let state = sys.save_state();

        let mut sys2 = GbSystem::new();
        sys2.mount("Cartridge", &rom).unwrap();
        assert_eq!(sys2.peek(0x4000), 0x00);
        sys2.load_state(&state).unwrap();
        assert_eq!(sys2.peek(0x4000), 0x55);
        assert_eq!(sys2.peek(0xA000), 0x77);
    }

    #[test]
    fn test_gb_load_state_rejects_other_mapper() {
        let mut sys = GbSystem::new();
        sys.mount("Cartridge", &make_rom(0x01, 0, 0)).unwrap();
        let state = sys.save_state();

        let mut sys2 = GbSystem::new();
        sys2.mount("Cartridge", &make_rom(0x10, 0, 0x02)).unwrap();
        assert!(sys2.load_state(&state).is_err());
    }

    #[test]
    fn test_gb_supports_save_states() {
        let sys = GbSystem::new();
        assert!(sys.supports_save_states());
    }

    #[test]
    fn test_gb_controller_input_raises_joypad() {
        let mut sys = mounted(&[]);
        sys.bus_mut().if_reg = 0;
        sys.set_controller(0x80);
        assert_eq!(sys.peek(0xFF0F) & bus::INT_JOYPAD, bus::INT_JOYPAD);
    }

    #[test]
    fn test_gb_ppu_registers() {
        let sys = GbSystem::new();
        assert_eq!(sys.bus().ppu.lcdc, 0x91);
        assert_eq!(sys.bus().ppu.bgp, 0xFC);
        assert_eq!(sys.bus().ppu.ly, 0);
    }

    #[test]
    fn test_gb_battery_ram_roundtrip() {
        let mut sys = GbSystem::new();
        sys.mount("Cartridge", &make_rom(0x03, 0, 0x02)).unwrap();
        let mut ram = vec![0u8; 0x2000];
        ram[5] = 0x99;
        sys.load_ram(&ram);
        let saved = sys.save_ram().unwrap();
        assert_eq!(saved[5], 0x99);
    }

    #[test]
    fn test_gb_instruction_hook() {
        use std::sync::{Arc, Mutex};
        let mut sys = mounted(&[0x00, 0x00, 0x18, 0xFE]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        sys.set_instruction_hook(move |pc| sink.lock().unwrap().push(pc));
        for _ in 0..3 {
            sys.step_instruction();
        }
        sys.clear_instruction_hook();
        sys.step_instruction();
        assert_eq!(*seen.lock().unwrap(), vec![0x0100, 0x0101, 0x0102]);
    }
}
