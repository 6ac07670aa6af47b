//! Game Boy PPU (LCD Controller)
//!
//! A dot-driven state machine. Each scanline is 456 dots; a frame is 154
//! lines (70224 dots).
//!
//! ```text
//! Mode 2 OamScan  80 dots     select up to 10 sprites for the line
//! Mode 3 Draw     172+ dots   fetcher -> BG shift register -> pixel out
//! Mode 0 HBlank   rest of 456
//! Mode 1 VBlank   lines 144-153
//! ```
//!
//! # Draw
//!
//! The background fetcher runs Tile, Low, High (2 dots each) and then
//! tries to Push its 8 pixels into the BG shift register, which succeeds
//! only once the register has drained. One pixel is shifted out per dot.
//! The first `SCX & 7` pixels of a line are discarded. When the next
//! selected sprite's X reaches the output column the fetcher and shifter
//! stall while the sprite row is fetched, then its pixels are merged into
//! the transparent slots of the object FIFO. When the window starts the
//! BG register is flushed and the fetcher restarts on the window map.
//!
//! The finished frame is a 160x144 buffer of shade indices (0-3 after
//! palette lookup), swapped to the front at the start of VBlank.

use emu_core::logging::{log, LogCategory, LogLevel};

use crate::bus::{INT_STAT, INT_VBLANK};

pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;
pub const DOTS_PER_LINE: u16 = 456;
pub const LINES_PER_FRAME: u8 = 154;
pub const DOTS_PER_FRAME: u32 = DOTS_PER_LINE as u32 * LINES_PER_FRAME as u32;

const OAM_SCAN_DOTS: u16 = 80;
/// Discarded fetch at the start of Draw
const DRAW_STARTUP_DOTS: u8 = 6;
const SPRITE_FETCH_DOTS: u8 = 6;
const MAX_SPRITES_PER_LINE: usize = 10;

// LCDC bits
const LCDC_ENABLE: u8 = 0x80;
const LCDC_WIN_TILEMAP: u8 = 0x40;
const LCDC_WIN_ENABLE: u8 = 0x20;
const LCDC_BG_WIN_TILES: u8 = 0x10;
const LCDC_BG_TILEMAP: u8 = 0x08;
const LCDC_OBJ_SIZE: u8 = 0x04;
const LCDC_OBJ_ENABLE: u8 = 0x02;
const LCDC_BG_WIN_ENABLE: u8 = 0x01;

// STAT interrupt sources
const STAT_HBLANK: u8 = 0x08;
const STAT_VBLANK: u8 = 0x10;
const STAT_OAM: u8 = 0x20;
const STAT_LYC: u8 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    Draw = 3,
}

#[derive(Debug, Clone, Copy, Default)]
struct Sprite {
    y: u8,
    x: u8,
    tile: u8,
    attrs: u8,
}

#[derive(Debug, Clone, Copy, Default)]
struct ObjPixel {
    color: u8,
    palette1: bool,
    behind_bg: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchStep {
    Tile,
    Low,
    High,
    Push,
}

#[derive(Debug, Clone)]
struct Fetcher {
    step: FetchStep,
    /// Second dot of the current step
    half: bool,
    /// Tile column relative to the start of the line (or window)
    tile_x: u8,
    tile_id: u8,
    low: u8,
    high: u8,
    window: bool,
}

impl Fetcher {
    fn new(window: bool) -> Self {
        Self {
            step: FetchStep::Tile,
            half: false,
            tile_x: 0,
            tile_id: 0,
            low: 0,
            high: 0,
            window,
        }
    }
}

/// Game Boy PPU state
pub struct Ppu {
    pub(crate) vram: Box<[u8; 0x2000]>,
    pub(crate) oam: [u8; 0xA0],

    /// LCD Control (0xFF40)
    pub lcdc: u8,
    /// STAT interrupt selects (bits 3-6 of 0xFF41)
    pub stat: u8,
    pub scy: u8,
    pub scx: u8,
    pub ly: u8,
    pub lyc: u8,
    pub bgp: u8,
    pub obp0: u8,
    pub obp1: u8,
    pub wy: u8,
    pub wx: u8,

    pub(crate) mode: Mode,
    pub(crate) dot: u16,

    sprites: [Sprite; MAX_SPRITES_PER_LINE],
    sprite_count: usize,

    // Draw state
    lx: u8,
    discard: u8,
    startup: u8,
    bg_low: u8,
    bg_high: u8,
    bg_count: u8,
    obj_fifo: [ObjPixel; 8],
    fetcher: Fetcher,
    sprites_done: u16,
    sprite_stall: u8,
    stall_sprite: usize,

    // Window
    wy_triggered: bool,
    window_line: u8,
    window_drawn: bool,

    stat_line: bool,
    irq: u8,

    back: Box<[u8]>,
    front: Box<[u8]>,
    frame_ready: bool,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            vram: Box::new([0; 0x2000]),
            oam: [0; 0xA0],
            lcdc: 0,
            stat: 0,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            bgp: 0,
            obp0: 0,
            obp1: 0,
            wy: 0,
            wx: 0,
            mode: Mode::HBlank,
            dot: 0,
            sprites: [Sprite::default(); MAX_SPRITES_PER_LINE],
            sprite_count: 0,
            lx: 0,
            discard: 0,
            startup: 0,
            bg_low: 0,
            bg_high: 0,
            bg_count: 0,
            obj_fifo: [ObjPixel::default(); 8],
            fetcher: Fetcher::new(false),
            sprites_done: 0,
            sprite_stall: 0,
            stall_sprite: 0,
            wy_triggered: false,
            window_line: 0,
            window_drawn: false,
            stat_line: false,
            irq: 0,
            back: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT].into_boxed_slice(),
            front: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT].into_boxed_slice(),
            frame_ready: false,
        }
    }

    /// Power-on state. Without a boot ROM the LCD starts enabled with the
    /// registers the boot ROM leaves behind.
    pub fn init(&mut self, using_bootrom: bool) {
        self.vram.fill(0);
        self.oam.fill(0);
        self.back.fill(0);
        self.front.fill(0);
        self.frame_ready = false;
        self.lcdc = 0;
        self.stat = 0;
        self.scy = 0;
        self.scx = 0;
        self.ly = 0;
        self.lyc = 0;
        self.bgp = 0;
        self.obp0 = 0;
        self.obp1 = 0;
        self.wy = 0;
        self.wx = 0;
        self.mode = Mode::HBlank;
        self.dot = 0;
        self.sprite_count = 0;
        self.start_draw();
        self.mode = Mode::HBlank;
        self.wy_triggered = false;
        self.window_line = 0;
        self.stat_line = false;
        self.irq = 0;
        if !using_bootrom {
            self.lcdc = 0x91;
            self.bgp = 0xFC;
            self.obp0 = 0xFF;
            self.obp1 = 0xFF;
            self.enable_lcd();
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcdc & LCDC_ENABLE != 0
    }

    /// Completed frame, shade indices 0-3, row-major 160x144
    pub fn frame_buffer(&self) -> &[u8] {
        &self.front
    }

    /// True once per frame, after the buffer swap at VBlank entry
    pub fn take_frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    fn vram_locked(&self) -> bool {
        self.lcd_enabled() && self.mode == Mode::Draw
    }

    /// CPU read of 0x8000-0x9FFF
    pub fn read_vram(&self, addr: u16) -> u8 {
        if self.vram_locked() {
            return 0xFF;
        }
        self.vram[(addr & 0x1FFF) as usize]
    }

    /// CPU write of 0x8000-0x9FFF
    pub fn write_vram(&mut self, addr: u16, val: u8) {
        if !self.vram_locked() {
            self.vram[(addr & 0x1FFF) as usize] = val;
        }
    }

    /// CPU read of OAM; `addr` is the offset from 0xFE00
    pub fn read_oam(&self, addr: u16) -> u8 {
        if self.vram_locked() {
            return 0xFF;
        }
        self.oam[(addr as usize) % 0xA0]
    }

    pub fn write_oam(&mut self, addr: u16, val: u8) {
        if !self.vram_locked() {
            self.oam[(addr as usize) % 0xA0] = val;
        }
    }

    /// Untimed VRAM read, ignores the Draw lock
    pub fn peek_vram(&self, addr: u16) -> u8 {
        self.vram[(addr & 0x1FFF) as usize]
    }

    pub fn poke_vram(&mut self, addr: u16, val: u8) {
        self.vram[(addr & 0x1FFF) as usize] = val;
    }

    /// Untimed OAM read, ignores the Draw lock
    pub fn peek_oam(&self, addr: u16) -> u8 {
        self.oam[(addr as usize) % 0xA0]
    }

    /// OAM DMA and debugger writes
    pub fn poke_oam(&mut self, addr: u16, val: u8) {
        self.oam[(addr as usize) % 0xA0] = val;
    }

    pub fn read_register(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => {
                let mode = if self.lcd_enabled() { self.mode as u8 } else { 0 };
                let coincidence = if self.ly == self.lyc { 0x04 } else { 0 };
                0x80 | self.stat | coincidence | mode
            }
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF47 => self.bgp,
            0xFF48 => self.obp0,
            0xFF49 => self.obp1,
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            _ => 0xFF,
        }
    }

    pub fn write_register(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF40 => {
                let was_on = self.lcd_enabled();
                self.lcdc = val;
                match (was_on, self.lcd_enabled()) {
                    (true, false) => self.disable_lcd(),
                    (false, true) => self.enable_lcd(),
                    _ => {}
                }
            }
            0xFF41 => {
                self.stat = val & 0x78;
                self.update_stat_line();
            }
            0xFF42 => self.scy = val,
            0xFF43 => self.scx = val,
            0xFF44 => {} // LY is read-only
            0xFF45 => {
                self.lyc = val;
                self.update_stat_line();
            }
            0xFF47 => self.bgp = val,
            0xFF48 => self.obp0 = val,
            0xFF49 => self.obp1 = val,
            0xFF4A => self.wy = val,
            0xFF4B => self.wx = val,
            _ => {}
        }
    }

    fn disable_lcd(&mut self) {
        log(LogCategory::PPU, LogLevel::Debug, || {
            format!("LCD off at LY={} dot={}", self.ly, self.dot)
        });
        self.ly = 0;
        self.dot = 0;
        self.mode = Mode::HBlank;
        self.stat_line = false;
        self.back.fill(0);
        self.front.fill(0);
    }

    fn enable_lcd(&mut self) {
        log(LogCategory::PPU, LogLevel::Debug, || "LCD on".to_string());
        self.ly = 0;
        self.dot = 0;
        self.wy_triggered = false;
        self.window_line = 0;
        self.start_line();
        self.update_stat_line();
    }

    /// Advance `dots` dots. Returns the interrupt request bits raised
    /// (VBlank and/or STAT) since the last call.
    pub fn tick(&mut self, dots: u32) -> u8 {
        for _ in 0..dots {
            self.step_dot();
        }
        std::mem::take(&mut self.irq)
    }

    fn step_dot(&mut self) {
        if !self.lcd_enabled() {
            return;
        }

        match self.mode {
            Mode::OamScan => {
                if self.dot % 2 == 0 {
                    self.scan_entry((self.dot / 2) as usize);
                }
            }
            Mode::Draw => self.draw_dot(),
            Mode::HBlank | Mode::VBlank => {}
        }

        self.dot += 1;

        if self.mode == Mode::OamScan && self.dot == OAM_SCAN_DOTS {
            self.start_draw();
        } else if self.mode == Mode::Draw && self.lx as usize == SCREEN_WIDTH {
            self.mode = Mode::HBlank;
            if self.window_drawn {
                self.window_line = self.window_line.wrapping_add(1);
            }
        }

        if self.dot == DOTS_PER_LINE {
            self.dot = 0;
            self.ly += 1;
            if self.ly as usize == SCREEN_HEIGHT {
                self.mode = Mode::VBlank;
                self.irq |= INT_VBLANK;
                std::mem::swap(&mut self.front, &mut self.back);
                self.frame_ready = true;
            } else if self.ly == LINES_PER_FRAME {
                self.ly = 0;
                self.wy_triggered = false;
                self.window_line = 0;
                self.start_line();
            } else if (self.ly as usize) < SCREEN_HEIGHT {
                self.start_line();
            }
        }

        self.update_stat_line();
    }

    fn update_stat_line(&mut self) {
        if !self.lcd_enabled() {
            self.stat_line = false;
            return;
        }
        let line = (self.stat & STAT_HBLANK != 0 && self.mode == Mode::HBlank)
            || (self.stat & STAT_VBLANK != 0 && self.mode == Mode::VBlank)
            || (self.stat & STAT_OAM != 0 && self.mode == Mode::OamScan)
            || (self.stat & STAT_LYC != 0 && self.ly == self.lyc);
        if line && !self.stat_line {
            self.irq |= INT_STAT;
        }
        self.stat_line = line;
    }

    fn start_line(&mut self) {
        self.mode = Mode::OamScan;
        self.sprite_count = 0;
        if self.ly == self.wy {
            self.wy_triggered = true;
        }
    }

    fn sprite_height(&self) -> u16 {
        if self.lcdc & LCDC_OBJ_SIZE != 0 {
            16
        } else {
            8
        }
    }

    fn scan_entry(&mut self, index: usize) {
        if self.sprite_count == MAX_SPRITES_PER_LINE {
            return;
        }
        let base = index * 4;
        let y = self.oam[base] as u16;
        let line = self.ly as u16 + 16;
        if line >= y && line < y + self.sprite_height() {
            self.sprites[self.sprite_count] = Sprite {
                y: self.oam[base],
                x: self.oam[base + 1],
                tile: self.oam[base + 2],
                attrs: self.oam[base + 3],
            };
            self.sprite_count += 1;
        }
    }

    fn start_draw(&mut self) {
        self.mode = Mode::Draw;
        self.lx = 0;
        self.discard = self.scx & 7;
        self.startup = DRAW_STARTUP_DOTS;
        self.bg_count = 0;
        self.obj_fifo = [ObjPixel::default(); 8];
        self.fetcher = Fetcher::new(false);
        self.sprites_done = 0;
        self.sprite_stall = 0;
        self.window_drawn = false;
    }

    fn draw_dot(&mut self) {
        if self.startup > 0 {
            self.startup -= 1;
            return;
        }

        if self.sprite_stall > 0 {
            self.sprite_stall -= 1;
            if self.sprite_stall == 0 {
                self.merge_sprite(self.stall_sprite);
            }
            return;
        }

        if self.lcdc & LCDC_OBJ_ENABLE != 0 {
            let column = self.lx as u16 + 8;
            // Lowest X first, OAM order breaks ties
            let next = (0..self.sprite_count)
                .filter(|&i| {
                    self.sprites_done & (1 << i) == 0 && self.sprites[i].x as u16 <= column
                })
                .min_by_key(|&i| (self.sprites[i].x, i));
            if let Some(i) = next {
                self.sprites_done |= 1 << i;
                self.stall_sprite = i;
                self.sprite_stall = SPRITE_FETCH_DOTS - 1;
                return;
            }
        }

        if !self.fetcher.window
            && self.lcdc & LCDC_WIN_ENABLE != 0
            && self.wy_triggered
            && self.lx as u16 + 7 >= self.wx as u16
        {
            self.fetcher = Fetcher::new(true);
            self.bg_count = 0;
            self.window_drawn = true;
        }

        self.fetch_dot();
        self.shift_pixel();
    }

    fn fetch_dot(&mut self) {
        if self.fetcher.step != FetchStep::Push {
            if !self.fetcher.half {
                self.fetcher.half = true;
                return;
            }
            self.fetcher.half = false;
        }

        match self.fetcher.step {
            FetchStep::Tile => {
                let (map, x, y) = if self.fetcher.window {
                    let map = if self.lcdc & LCDC_WIN_TILEMAP != 0 { 0x1C00 } else { 0x1800 };
                    (map, self.fetcher.tile_x & 31, self.window_line)
                } else {
                    let map = if self.lcdc & LCDC_BG_TILEMAP != 0 { 0x1C00 } else { 0x1800 };
                    let x = ((self.scx >> 3).wrapping_add(self.fetcher.tile_x)) & 31;
                    (map, x, self.ly.wrapping_add(self.scy))
                };
                let addr = map + (y as usize / 8) * 32 + x as usize;
                self.fetcher.tile_id = self.vram[addr];
                self.fetcher.step = FetchStep::Low;
            }
            FetchStep::Low => {
                self.fetcher.low = self.vram[self.tile_row_addr()];
                self.fetcher.step = FetchStep::High;
            }
            FetchStep::High => {
                self.fetcher.high = self.vram[self.tile_row_addr() + 1];
                self.fetcher.step = FetchStep::Push;
            }
            FetchStep::Push => {
                if self.bg_count == 0 {
                    self.bg_low = self.fetcher.low;
                    self.bg_high = self.fetcher.high;
                    self.bg_count = 8;
                    self.fetcher.tile_x = self.fetcher.tile_x.wrapping_add(1);
                    self.fetcher.step = FetchStep::Tile;
                }
            }
        }
    }

    /// VRAM offset of the current BG/window tile row
    fn tile_row_addr(&self) -> usize {
        let fine_y = if self.fetcher.window {
            self.window_line & 7
        } else {
            self.ly.wrapping_add(self.scy) & 7
        } as usize;
        let tile = self.fetcher.tile_id;
        let base = if self.lcdc & LCDC_BG_WIN_TILES != 0 {
            tile as usize * 16
        } else {
            (0x1000 + (tile as i8 as i32) * 16) as usize
        };
        base + fine_y * 2
    }

    fn merge_sprite(&mut self, index: usize) {
        let sprite = self.sprites[index];
        let height = self.sprite_height();
        // LCDC.2 may have changed since the scan
        let mut row = (self.ly as u16 + 16).wrapping_sub(sprite.y as u16) % height;
        if sprite.attrs & 0x40 != 0 {
            row = height - 1 - row;
        }
        let tile = if height == 16 { sprite.tile & 0xFE } else { sprite.tile };
        let addr = tile as usize * 16 + row as usize * 2;
        let low = self.vram[addr];
        let high = self.vram[addr + 1];

        // Pixels left of the current column are already gone
        let skip = (self.lx as i16 + 8 - sprite.x as i16).max(0) as usize;
        for i in skip..8 {
            let bit = if sprite.attrs & 0x20 != 0 { i } else { 7 - i };
            let color = (((high >> bit) & 1) << 1) | ((low >> bit) & 1);
            let slot = &mut self.obj_fifo[i - skip];
            if slot.color == 0 && color != 0 {
                *slot = ObjPixel {
                    color,
                    palette1: sprite.attrs & 0x10 != 0,
                    behind_bg: sprite.attrs & 0x80 != 0,
                };
            }
        }
    }

    fn shift_pixel(&mut self) {
        if self.bg_count == 0 {
            return;
        }
        let mut bg = (((self.bg_high >> 7) & 1) << 1) | ((self.bg_low >> 7) & 1);
        self.bg_low <<= 1;
        self.bg_high <<= 1;
        self.bg_count -= 1;

        if self.discard > 0 {
            self.discard -= 1;
            return;
        }

        let obj = self.obj_fifo[0];
        self.obj_fifo.copy_within(1.., 0);
        self.obj_fifo[7] = ObjPixel::default();

        if self.lcdc & LCDC_BG_WIN_ENABLE == 0 {
            bg = 0;
        }
        let mut shade = if self.lcdc & LCDC_BG_WIN_ENABLE != 0 {
            palette_shade(self.bgp, bg)
        } else {
            0
        };
        if obj.color != 0
            && self.lcdc & LCDC_OBJ_ENABLE != 0
            && !(obj.behind_bg && bg != 0)
        {
            let palette = if obj.palette1 { self.obp1 } else { self.obp0 };
            shade = palette_shade(palette, obj.color);
        }

        self.back[self.ly as usize * SCREEN_WIDTH + self.lx as usize] = shade;
        self.lx += 1;
    }

    /// Restore position after a state load; pipeline state restarts at the
    /// beginning of the current mode.
    pub(crate) fn resync(&mut self) {
        if !self.lcd_enabled() {
            self.mode = Mode::HBlank;
            return;
        }
        self.dot = 0;
        if (self.ly as usize) < SCREEN_HEIGHT {
            self.start_line();
        } else {
            self.mode = Mode::VBlank;
        }
        self.stat_line = false;
    }
}

fn palette_shade(palette: u8, color: u8) -> u8 {
    (palette >> (color * 2)) & 0x03
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcd_on(lcdc: u8) -> Ppu {
        let mut ppu = Ppu::new();
        ppu.bgp = 0xE4; // identity: 3,2,1,0
        ppu.obp0 = 0xE4;
        ppu.obp1 = 0x1B; // reversed
        ppu.write_register(0xFF40, lcdc);
        ppu
    }

    fn run_frame(ppu: &mut Ppu) {
        for _ in 0..DOTS_PER_FRAME {
            ppu.tick(1);
        }
    }

    fn pixel(ppu: &Ppu, x: usize, y: usize) -> u8 {
        ppu.frame_buffer()[y * SCREEN_WIDTH + x]
    }

    /// Tile `index` in 0x8000 space filled with colour `color` on every pixel
    fn solid_tile(ppu: &mut Ppu, index: usize, color: u8) {
        let lo = if color & 1 != 0 { 0xFF } else { 0x00 };
        let hi = if color & 2 != 0 { 0xFF } else { 0x00 };
        for row in 0..8 {
            ppu.vram[index * 16 + row * 2] = lo;
            ppu.vram[index * 16 + row * 2 + 1] = hi;
        }
    }

    #[test]
    fn test_frame_timing_single_vblank() {
        let mut ppu = lcd_on(0x91);
        assert_eq!(ppu.mode(), Mode::OamScan);
        assert_eq!((ppu.ly, ppu.dot), (0, 0));

        let mut vblank_dots = Vec::new();
        let mut max_ly = 0;
        for n in 0..DOTS_PER_FRAME {
            let before = ppu.ly;
            if ppu.tick(1) & INT_VBLANK != 0 {
                assert_eq!((before, ppu.ly), (143, 144));
                vblank_dots.push(n);
            }
            max_ly = max_ly.max(ppu.ly);
        }
        assert_eq!(vblank_dots, vec![144 * 456 - 1]);
        assert_eq!(max_ly, 153);
        assert_eq!((ppu.ly, ppu.dot, ppu.mode()), (0, 0, Mode::OamScan));
        assert!(ppu.take_frame_ready());
        assert!(!ppu.take_frame_ready());
    }

    #[test]
    fn test_mode_sequence_in_a_line() {
        let mut ppu = lcd_on(0x91);
        ppu.tick(79);
        assert_eq!(ppu.mode(), Mode::OamScan);
        ppu.tick(1);
        assert_eq!(ppu.mode(), Mode::Draw);

        let mut draw = 0;
        while ppu.mode() == Mode::Draw {
            ppu.tick(1);
            draw += 1;
        }
        assert!(draw >= 172, "draw lasted {} dots", draw);
        assert_eq!(ppu.mode(), Mode::HBlank);
        ppu.tick((DOTS_PER_LINE - 80 - draw) as u32);
        assert_eq!((ppu.ly, ppu.mode()), (1, Mode::OamScan));
    }

    #[test]
    fn test_sprites_lengthen_draw() {
        let mut base = lcd_on(0x93);
        let mut with_sprite = lcd_on(0x93);
        with_sprite.oam[0] = 16;
        with_sprite.oam[1] = 40;

        let draw_len = |ppu: &mut Ppu| {
            ppu.tick(80);
            let mut n = 0;
            while ppu.mode() == Mode::Draw {
                ppu.tick(1);
                n += 1;
            }
            n
        };
        assert_eq!(draw_len(&mut with_sprite), draw_len(&mut base) + 6);
    }

    #[test]
    fn test_lcd_toggle_resets_cleanly() {
        let mut ppu = lcd_on(0x91);
        ppu.tick(456 * 10 + 100);
        assert_eq!(ppu.ly, 10);

        ppu.write_register(0xFF40, 0x11);
        assert_eq!(ppu.read_register(0xFF44), 0);
        assert_eq!(ppu.read_register(0xFF41) & 0x03, 0);
        assert_eq!(ppu.tick(10_000), 0);
        assert_eq!(ppu.ly, 0);

        ppu.write_register(0xFF40, 0x91);
        assert_eq!((ppu.mode(), ppu.dot, ppu.ly), (Mode::OamScan, 0, 0));
        ppu.tick(456);
        assert_eq!(ppu.ly, 1);
    }

    #[test]
    fn test_stat_irq_fires_on_rising_edge_only() {
        let mut ppu = lcd_on(0x91);
        ppu.write_register(0xFF41, STAT_HBLANK);
        let mut count = 0;
        for _ in 0..DOTS_PER_LINE * 3 {
            if ppu.tick(1) & INT_STAT != 0 {
                count += 1;
            }
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn test_stat_blocking_merges_sources() {
        let mut ppu = lcd_on(0x91);
        ppu.write_register(0xFF45, 0x00);
        // LYC already matches line 0; OamScan source is high too
        let irq = ppu.tick(0);
        ppu.write_register(0xFF41, STAT_LYC | STAT_HBLANK);
        let mut count = u32::from(irq & INT_STAT != 0);
        for _ in 0..DOTS_PER_LINE {
            if ppu.tick(1) & INT_STAT != 0 {
                count += 1;
            }
        }
        // One edge for LY=LYC; HBlank on the same line is blocked
        assert_eq!(count, 1);
    }

    #[test]
    fn test_stat_register_reads() {
        let mut ppu = lcd_on(0x91);
        ppu.write_register(0xFF45, 0);
        ppu.write_register(0xFF41, 0xFF);
        assert_eq!(ppu.read_register(0xFF41), 0x80 | 0x78 | 0x04 | 2);
    }

    #[test]
    fn test_vram_locked_during_draw() {
        let mut ppu = lcd_on(0x91);
        ppu.vram[0x10] = 0x42;
        assert_eq!(ppu.read_vram(0x8010), 0x42);
        ppu.tick(81);
        assert_eq!(ppu.mode(), Mode::Draw);
        assert_eq!(ppu.read_vram(0x8010), 0xFF);
        assert_eq!(ppu.read_oam(0xFE00), 0xFF);
        ppu.write_vram(0x8010, 0x00);
        assert_eq!(ppu.peek_vram(0x8010), 0x42);
    }

    #[test]
    fn test_background_unsigned_tiles() {
        let mut ppu = lcd_on(0x91);
        solid_tile(&mut ppu, 1, 3);
        ppu.vram[0x1800] = 1; // map (0,0) -> tile 1
        run_frame(&mut ppu);

        assert_eq!(pixel(&ppu, 0, 0), 3);
        assert_eq!(pixel(&ppu, 7, 7), 3);
        assert_eq!(pixel(&ppu, 8, 0), 0);
        assert_eq!(pixel(&ppu, 0, 8), 0);
    }

    #[test]
    fn test_background_signed_tiles_and_alt_map() {
        // LCDC.4 clear: tile 0xFF lives at 0x8FF0; LCDC.3 set: map at 0x9C00
        let mut ppu = lcd_on(0x89);
        for row in 0..8 {
            ppu.vram[0x0FF0 + row * 2] = 0xFF;
        }
        ppu.vram[0x1C00] = 0xFF;
        run_frame(&mut ppu);
        assert_eq!(pixel(&ppu, 3, 3), 1);
        assert_eq!(pixel(&ppu, 8, 0), 0);
    }

    #[test]
    fn test_scx_fine_scroll() {
        let mut ppu = lcd_on(0x91);
        solid_tile(&mut ppu, 1, 2);
        ppu.vram[0x1801] = 1; // map column 1 = screen x 8..15 unscrolled
        ppu.scx = 3;
        run_frame(&mut ppu);
        assert_eq!(pixel(&ppu, 4, 0), 0);
        assert_eq!(pixel(&ppu, 5, 0), 2);
        assert_eq!(pixel(&ppu, 12, 0), 2);
        assert_eq!(pixel(&ppu, 13, 0), 0);
    }

    #[test]
    fn test_window_overlays_background() {
        let mut ppu = lcd_on(0x91 | LCDC_WIN_ENABLE | LCDC_WIN_TILEMAP);
        solid_tile(&mut ppu, 2, 1);
        for i in 0..32 * 32 {
            ppu.vram[0x1C00 + i] = 2;
        }
        ppu.wy = 10;
        ppu.wx = 7 + 20;
        run_frame(&mut ppu);

        assert_eq!(pixel(&ppu, 25, 9), 0);
        assert_eq!(pixel(&ppu, 19, 10), 0);
        assert_eq!(pixel(&ppu, 20, 10), 1);
        assert_eq!(pixel(&ppu, 159, 143), 1);
    }

    #[test]
    fn test_sprite_over_background_and_priority() {
        let mut ppu = lcd_on(0x93);
        solid_tile(&mut ppu, 1, 1);
        solid_tile(&mut ppu, 2, 3);
        // BG tile 1 at map column 2 (x 16..23)
        ppu.vram[0x1802] = 1;

        // Sprite 0 at screen (0,0), palette 0
        ppu.oam[0..4].copy_from_slice(&[16, 8, 2, 0x00]);
        // Sprite 1 at screen x 16, behind non-zero BG
        ppu.oam[4..8].copy_from_slice(&[16, 24, 2, 0x80]);
        // Sprite 2 at screen x 40, palette 1 (reversed)
        ppu.oam[8..12].copy_from_slice(&[16, 48, 2, 0x10]);
        run_frame(&mut ppu);

        assert_eq!(pixel(&ppu, 0, 0), 3);
        assert_eq!(pixel(&ppu, 16, 0), 1);
        assert_eq!(pixel(&ppu, 40, 0), 0);
        assert_eq!(pixel(&ppu, 0, 8), 0);
    }

    #[test]
    fn test_sprite_partially_off_left_edge() {
        let mut ppu = lcd_on(0x93);
        for row in 0..8 {
            ppu.vram[16 + row * 2] = 0x0F; // right half colour 1
        }
        ppu.oam[0..4].copy_from_slice(&[16, 4, 1, 0x00]);
        run_frame(&mut ppu);
        assert_eq!(pixel(&ppu, 0, 0), 1);
        assert_eq!(pixel(&ppu, 3, 0), 1);
        assert_eq!(pixel(&ppu, 4, 0), 0);
    }

    #[test]
    fn test_overlapping_sprites_lower_x_wins_at_left_edge() {
        let mut ppu = lcd_on(0x93);
        solid_tile(&mut ppu, 1, 1);
        solid_tile(&mut ppu, 2, 3);
        // Lower OAM index but further right
        ppu.oam[0..4].copy_from_slice(&[16, 4, 1, 0x00]);
        ppu.oam[4..8].copy_from_slice(&[16, 2, 2, 0x00]);
        run_frame(&mut ppu);
        assert_eq!(pixel(&ppu, 0, 0), 3);
        assert_eq!(pixel(&ppu, 1, 0), 3);
        assert_eq!(pixel(&ppu, 2, 0), 1);
        assert_eq!(pixel(&ppu, 3, 0), 1);
        assert_eq!(pixel(&ppu, 4, 0), 0);
    }

    #[test]
    fn test_ten_sprite_limit() {
        let mut ppu = lcd_on(0x93);
        solid_tile(&mut ppu, 1, 3);
        for i in 0..12 {
            ppu.oam[i * 4..i * 4 + 4].copy_from_slice(&[16, 8 + 8 * i as u8, 1, 0]);
        }
        run_frame(&mut ppu);
        assert_eq!(pixel(&ppu, 72, 0), 3);
        assert_eq!(pixel(&ppu, 80, 0), 0);
    }

    #[test]
    fn test_bg_disabled_is_white() {
        let mut ppu = lcd_on(0x90);
        solid_tile(&mut ppu, 0, 3);
        run_frame(&mut ppu);
        assert!(ppu.frame_buffer().iter().all(|&s| s == 0));
    }
}
