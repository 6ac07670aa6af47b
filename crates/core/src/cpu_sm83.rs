//! Sharp SM83 CPU core (DMG Game Boy CPU)
//!
//! The SM83 is a Z80-derived 8-bit core. This implementation is M-cycle
//! accurate: every memory access goes through the timed [`MemorySm83`]
//! interface, and every internal delay cycle is issued as an explicit
//! [`MemorySm83::tick`]. The bus behind the trait advances the rest of the
//! machine on each of those calls, so the CPU is the only driver of time.
//!
//! # Timing
//!
//! `step()` returns the number of T-cycles (dots) consumed, always a
//! multiple of 4. Conditional jumps, calls and returns issue their extra
//! internal cycle only on the taken path.
//!
//! # Interrupts
//!
//! Pending interrupts are checked before each fetch. Dispatch takes five
//! machine cycles: two internal cycles, two stack writes (PC high then low)
//! and a final internal cycle. The pending set is re-read after the high
//! byte is pushed, so a push that lands on IE can cancel the dispatch (PC
//! then becomes 0x0000).
//!
//! `EI` enables interrupts only after the following instruction completes.
//! `HALT` executed with IME clear while an interrupt is already pending
//! triggers the HALT bug: the next opcode byte is read twice.

use serde::{Deserialize, Serialize};

use crate::logging::{log, LogCategory, LogLevel};

/// Interrupt enable register address
pub const IE_ADDR: u16 = 0xFFFF;
/// Interrupt flag register address
pub const IF_ADDR: u16 = 0xFF0F;

/// Memory interface for the SM83 CPU.
///
/// `read`, `write` and `tick` each represent one machine cycle on the bus.
/// `peek` and `poke` are the untimed side-effect-free path for debuggers
/// and interrupt bookkeeping.
pub trait MemorySm83 {
    /// Timed read (one machine cycle)
    fn read(&mut self, addr: u16) -> u8;

    /// Timed write (one machine cycle)
    fn write(&mut self, addr: u16, val: u8);

    /// Internal machine cycle with no bus transfer
    fn tick(&mut self) {}

    /// Untimed read
    fn peek(&self, addr: u16) -> u8;

    /// Untimed write
    fn poke(&mut self, addr: u16, val: u8);

    /// Enabled and requested interrupt bits (IE & IF, low 5 bits)
    fn pending_interrupts(&self) -> u8 {
        self.peek(IE_ADDR) & self.peek(IF_ADDR) & 0x1F
    }

    /// Clear a serviced interrupt request bit
    fn acknowledge_interrupt(&mut self, mask: u8) {
        let flags = self.peek(IF_ADDR);
        self.poke(IF_ADDR, flags & !mask);
    }
}

// Flag bit positions (in F register)
pub const FLAG_Z: u8 = 0b1000_0000;
pub const FLAG_N: u8 = 0b0100_0000;
pub const FLAG_H: u8 = 0b0010_0000;
pub const FLAG_C: u8 = 0b0001_0000;

/// Register file snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sm83Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
}

type InstructionHook = Box<dyn FnMut(u16) + Send>;

/// Sharp SM83 CPU state
pub struct CpuSm83<M: MemorySm83> {
    pub a: u8,
    /// Flags; the low nibble always reads as zero
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
    /// Interrupt master enable
    pub ime: bool,
    /// Instructions left before a pending EI takes effect (0 = none pending)
    pub ime_delay: u8,
    pub halted: bool,
    pub stopped: bool,
    /// Next fetch does not advance PC
    pub halt_bug: bool,
    /// Total T-cycles executed
    pub cycles: u64,
    pub memory: M,
    hook: Option<InstructionHook>,
}

impl<M: MemorySm83> std::fmt::Debug for CpuSm83<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuSm83")
            .field("registers", &self.registers())
            .field("ime", &self.ime)
            .field("halted", &self.halted)
            .field("cycles", &self.cycles)
            .finish()
    }
}

impl<M: MemorySm83> CpuSm83<M> {
    pub fn new(memory: M) -> Self {
        Self {
            a: 0,
            f: 0,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            sp: 0,
            pc: 0,
            ime: false,
            ime_delay: 0,
            halted: false,
            stopped: false,
            halt_bug: false,
            cycles: 0,
            memory,
            hook: None,
        }
    }

    /// Reset to power-on state.
    ///
    /// With a boot ROM everything starts at zero and execution begins at
    /// 0x0000. Without one, the register values the DMG boot ROM leaves
    /// behind are applied and execution begins at the cartridge entry point.
    pub fn init(&mut self, using_bootrom: bool) {
        let regs = if using_bootrom {
            Sm83Registers::default()
        } else {
            Sm83Registers {
                a: 0x01,
                f: 0xB0,
                b: 0x00,
                c: 0x13,
                d: 0x00,
                e: 0xD8,
                h: 0x01,
                l: 0x4D,
                sp: 0xFFFE,
                pc: 0x0100,
            }
        };
        self.set_registers(regs);
        self.ime = false;
        self.ime_delay = 0;
        self.halted = false;
        self.stopped = false;
        self.halt_bug = false;
        self.cycles = 0;
    }

    pub fn registers(&self) -> Sm83Registers {
        Sm83Registers {
            a: self.a,
            f: self.f,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            sp: self.sp,
            pc: self.pc,
        }
    }

    pub fn set_registers(&mut self, regs: Sm83Registers) {
        self.a = regs.a;
        self.f = regs.f & 0xF0;
        self.b = regs.b;
        self.c = regs.c;
        self.d = regs.d;
        self.e = regs.e;
        self.h = regs.h;
        self.l = regs.l;
        self.sp = regs.sp;
        self.pc = regs.pc;
    }

    /// Install a callback invoked with PC at every instruction boundary
    pub fn set_instruction_hook<F>(&mut self, hook: F)
    where
        F: FnMut(u16) + Send + 'static,
    {
        self.hook = Some(Box::new(hook));
    }

    pub fn clear_instruction_hook(&mut self) {
        self.hook = None;
    }

    /// Execute one instruction (or one interrupt dispatch, or one idle
    /// HALT cycle). Returns T-cycles consumed.
    pub fn step(&mut self) -> u32 {
        let start = self.cycles;
        let pending = self.memory.pending_interrupts();

        if self.halted || self.stopped {
            if pending == 0 {
                self.idle();
                return (self.cycles - start) as u32;
            }
            self.halted = false;
            self.stopped = false;
        }

        if self.ime && pending != 0 {
            self.service_interrupt();
            return (self.cycles - start) as u32;
        }

        if let Some(hook) = self.hook.as_mut() {
            hook(self.pc);
        }

        let opcode = self.fetch_opcode();
        self.execute(opcode);

        if self.ime_delay > 0 {
            self.ime_delay -= 1;
            if self.ime_delay == 0 {
                self.ime = true;
            }
        }

        (self.cycles - start) as u32
    }

    // --- Bus helpers; each one is exactly one machine cycle ---

    fn bus_read(&mut self, addr: u16) -> u8 {
        self.cycles += 4;
        self.memory.read(addr)
    }

    fn bus_write(&mut self, addr: u16, val: u8) {
        self.cycles += 4;
        self.memory.write(addr, val);
    }

    fn idle(&mut self) {
        self.cycles += 4;
        self.memory.tick();
    }

    fn fetch_opcode(&mut self) -> u8 {
        let opcode = self.bus_read(self.pc);
        if self.halt_bug {
            self.halt_bug = false;
        } else {
            self.pc = self.pc.wrapping_add(1);
        }
        opcode
    }

    fn read_pc(&mut self) -> u8 {
        let val = self.bus_read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        val
    }

    fn read_pc_u16(&mut self) -> u16 {
        let lo = self.read_pc();
        let hi = self.read_pc();
        u16::from_le_bytes([lo, hi])
    }

    fn push_u16(&mut self, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.sp = self.sp.wrapping_sub(1);
        self.bus_write(self.sp, hi);
        self.sp = self.sp.wrapping_sub(1);
        self.bus_write(self.sp, lo);
    }

    fn pop_u16(&mut self) -> u16 {
        let lo = self.bus_read(self.sp);
        self.sp = self.sp.wrapping_add(1);
        let hi = self.bus_read(self.sp);
        self.sp = self.sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }

    fn service_interrupt(&mut self) {
        self.ime = false;
        self.ime_delay = 0;
        self.idle();
        self.idle();

        // EI; HALT with a request already pending returns to the HALT
        let ret = if self.halt_bug {
            self.halt_bug = false;
            self.pc.wrapping_sub(1)
        } else {
            self.pc
        };
        let [lo, hi] = ret.to_le_bytes();
        self.sp = self.sp.wrapping_sub(1);
        self.bus_write(self.sp, hi);
        // The high byte may have landed on IE
        let pending = self.memory.pending_interrupts();
        self.sp = self.sp.wrapping_sub(1);
        self.bus_write(self.sp, lo);

        if pending == 0 {
            self.pc = 0x0000;
        } else {
            let bit = pending.trailing_zeros() as u16;
            self.memory.acknowledge_interrupt(1 << bit);
            self.pc = 0x0040 + bit * 8;
            log(LogCategory::Interrupts, LogLevel::Trace, || {
                format!("SM83: dispatch interrupt {} -> {:04X}", bit, 0x0040 + bit * 8)
            });
        }
        self.idle();
    }

    // --- Register pairs ---

    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.f])
    }

    fn set_af(&mut self, val: u16) {
        let [a, f] = val.to_be_bytes();
        self.a = a;
        self.f = f & 0xF0;
    }

    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    fn set_bc(&mut self, val: u16) {
        [self.b, self.c] = val.to_be_bytes();
    }

    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    fn set_de(&mut self, val: u16) {
        [self.d, self.e] = val.to_be_bytes();
    }

    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    fn set_hl(&mut self, val: u16) {
        [self.h, self.l] = val.to_be_bytes();
    }

    // --- Flags ---

    fn set_flag(&mut self, flag: u8, val: bool) {
        if val {
            self.f |= flag;
        } else {
            self.f &= !flag;
        }
    }

    pub fn get_flag(&self, flag: u8) -> bool {
        (self.f & flag) != 0
    }

    fn set_flags(&mut self, z: bool, n: bool, h: bool, c: bool) {
        self.f = 0;
        self.set_flag(FLAG_Z, z);
        self.set_flag(FLAG_N, n);
        self.set_flag(FLAG_H, h);
        self.set_flag(FLAG_C, c);
    }

    /// Condition codes in opcode order: NZ, Z, NC, C
    fn condition(&self, cc: u8) -> bool {
        match cc & 0x03 {
            0 => !self.get_flag(FLAG_Z),
            1 => self.get_flag(FLAG_Z),
            2 => !self.get_flag(FLAG_C),
            _ => self.get_flag(FLAG_C),
        }
    }

    // --- 8-bit operand decoding (B, C, D, E, H, L, (HL), A) ---

    fn read_r8(&mut self, idx: u8) -> u8 {
        match idx & 0x07 {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            6 => self.bus_read(self.hl()),
            _ => self.a,
        }
    }

    fn write_r8(&mut self, idx: u8, val: u8) {
        match idx & 0x07 {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            6 => self.bus_write(self.hl(), val),
            _ => self.a = val,
        }
    }

    // --- ALU ---

    fn add(&mut self, val: u8, use_carry: bool) {
        let c = u8::from(use_carry && self.get_flag(FLAG_C));
        let result = self.a as u16 + val as u16 + c as u16;
        let half = (self.a & 0x0F) + (val & 0x0F) + c > 0x0F;
        self.a = result as u8;
        self.set_flags(self.a == 0, false, half, result > 0xFF);
    }

    /// Subtraction as A + !val + !borrow; carry and half-carry come out
    /// inverted relative to the borrow the instruction reports.
    fn sub_inner(&mut self, val: u8, use_carry: bool) -> u8 {
        let borrow = use_carry && self.get_flag(FLAG_C);
        let c = u8::from(!borrow);
        let inv = !val;
        let result = self.a as u16 + inv as u16 + c as u16;
        let half = (self.a & 0x0F) + (inv & 0x0F) + c > 0x0F;
        let carry = result > 0xFF;
        let out = result as u8;
        self.set_flags(out == 0, true, !half, !carry);
        out
    }

    fn sub(&mut self, val: u8, use_carry: bool) {
        self.a = self.sub_inner(val, use_carry);
    }

    fn cp(&mut self, val: u8) {
        self.sub_inner(val, false);
    }

    fn and(&mut self, val: u8) {
        self.a &= val;
        self.set_flags(self.a == 0, false, true, false);
    }

    fn xor(&mut self, val: u8) {
        self.a ^= val;
        self.set_flags(self.a == 0, false, false, false);
    }

    fn or(&mut self, val: u8) {
        self.a |= val;
        self.set_flags(self.a == 0, false, false, false);
    }

    fn alu(&mut self, op: u8, val: u8) {
        match op & 0x07 {
            0 => self.add(val, false),
            1 => self.add(val, true),
            2 => self.sub(val, false),
            3 => self.sub(val, true),
            4 => self.and(val),
            5 => self.xor(val),
            6 => self.or(val),
            _ => self.cp(val),
        }
    }

    fn inc(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        let c = self.get_flag(FLAG_C);
        self.set_flags(result == 0, false, (val & 0x0F) == 0x0F, c);
        result
    }

    fn dec(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        let c = self.get_flag(FLAG_C);
        self.set_flags(result == 0, true, (val & 0x0F) == 0, c);
        result
    }

    fn add_hl(&mut self, val: u16) {
        let hl = self.hl();
        let (result, carry) = hl.overflowing_add(val);
        let half = (hl & 0x0FFF) + (val & 0x0FFF) > 0x0FFF;
        let z = self.get_flag(FLAG_Z);
        self.set_flags(z, false, half, carry);
        self.idle();
        self.set_hl(result);
    }

    /// SP + signed immediate; flags from the unsigned low byte
    fn sp_plus_e8(&mut self) -> u16 {
        let e = self.read_pc();
        let sp = self.sp;
        let half = (sp & 0x000F) + (e as u16 & 0x000F) > 0x000F;
        let carry = (sp & 0x00FF) + e as u16 > 0x00FF;
        self.set_flags(false, false, half, carry);
        sp.wrapping_add(e as i8 as i16 as u16)
    }

    fn daa(&mut self) {
        let mut a = self.a;
        let mut carry = self.get_flag(FLAG_C);
        let half = self.get_flag(FLAG_H);
        let subtract = self.get_flag(FLAG_N);

        if !subtract {
            if carry || a > 0x99 {
                a = a.wrapping_add(0x60);
                carry = true;
            }
            if half || (a & 0x0F) > 0x09 {
                a = a.wrapping_add(0x06);
            }
        } else {
            if carry {
                a = a.wrapping_sub(0x60);
            }
            if half {
                a = a.wrapping_sub(0x06);
            }
        }

        self.a = a;
        self.set_flags(a == 0, subtract, false, carry);
    }

    // --- Rotates, shifts and bit ops (CB table) ---

    fn rotate_shift(&mut self, op: u8, val: u8) -> u8 {
        let carry_in = self.get_flag(FLAG_C);
        let (result, carry) = match op & 0x07 {
            0 => (val.rotate_left(1), val & 0x80 != 0),
            1 => (val.rotate_right(1), val & 0x01 != 0),
            2 => ((val << 1) | u8::from(carry_in), val & 0x80 != 0),
            3 => ((val >> 1) | (u8::from(carry_in) << 7), val & 0x01 != 0),
            4 => (val << 1, val & 0x80 != 0),
            5 => ((val >> 1) | (val & 0x80), val & 0x01 != 0),
            6 => (val.rotate_left(4), false),
            _ => (val >> 1, val & 0x01 != 0),
        };
        self.set_flags(result == 0, false, false, carry);
        result
    }

    fn execute_cb(&mut self) {
        let op = self.read_pc();
        let reg = op & 0x07;
        let bit = (op >> 3) & 0x07;

        match op >> 6 {
            0 => {
                let val = self.read_r8(reg);
                let result = self.rotate_shift(bit, val);
                self.write_r8(reg, result);
            }
            1 => {
                let val = self.read_r8(reg);
                let c = self.get_flag(FLAG_C);
                self.set_flags(val & (1 << bit) == 0, false, true, c);
            }
            2 => {
                let val = self.read_r8(reg);
                self.write_r8(reg, val & !(1 << bit));
            }
            _ => {
                let val = self.read_r8(reg);
                self.write_r8(reg, val | (1 << bit));
            }
        }
    }

    // --- Control flow ---

    fn jr(&mut self, taken: bool) {
        let offset = self.read_pc() as i8;
        if taken {
            self.idle();
            self.pc = self.pc.wrapping_add(offset as i16 as u16);
        }
    }

    fn jp(&mut self, taken: bool) {
        let addr = self.read_pc_u16();
        if taken {
            self.idle();
            self.pc = addr;
        }
    }

    fn call(&mut self, taken: bool) {
        let addr = self.read_pc_u16();
        if taken {
            self.idle();
            self.push_u16(self.pc);
            self.pc = addr;
        }
    }

    fn ret(&mut self) {
        self.pc = self.pop_u16();
        self.idle();
    }

    fn ret_cc(&mut self, taken: bool) {
        self.idle();
        if taken {
            self.ret();
        }
    }

    fn rst(&mut self, vector: u16) {
        self.idle();
        self.push_u16(self.pc);
        self.pc = vector;
    }

    fn push_rr(&mut self, val: u16) {
        self.idle();
        self.push_u16(val);
    }

    fn halt(&mut self) {
        if !self.ime && self.memory.pending_interrupts() != 0 {
            self.halt_bug = true;
        } else {
            self.halted = true;
        }
    }

    fn execute(&mut self, opcode: u8) {
        match opcode {
            0x00 => {}

            // LD rr,d16
            0x01 => { let val = self.read_pc_u16(); self.set_bc(val); }
            0x11 => { let val = self.read_pc_u16(); self.set_de(val); }
            0x21 => { let val = self.read_pc_u16(); self.set_hl(val); }
            0x31 => { self.sp = self.read_pc_u16(); }

            // LD (BC),A / LD (DE),A / LD (HL+),A / LD (HL-),A
            0x02 => self.bus_write(self.bc(), self.a),
            0x12 => self.bus_write(self.de(), self.a),
            0x22 => { let addr = self.hl(); self.bus_write(addr, self.a); self.set_hl(addr.wrapping_add(1)); }
            0x32 => { let addr = self.hl(); self.bus_write(addr, self.a); self.set_hl(addr.wrapping_sub(1)); }

            // LD A,(BC) / LD A,(DE) / LD A,(HL+) / LD A,(HL-)
            0x0A => { self.a = self.bus_read(self.bc()); }
            0x1A => { self.a = self.bus_read(self.de()); }
            0x2A => { let addr = self.hl(); self.a = self.bus_read(addr); self.set_hl(addr.wrapping_add(1)); }
            0x3A => { let addr = self.hl(); self.a = self.bus_read(addr); self.set_hl(addr.wrapping_sub(1)); }

            // INC rr / DEC rr
            0x03 => { self.idle(); self.set_bc(self.bc().wrapping_add(1)); }
            0x13 => { self.idle(); self.set_de(self.de().wrapping_add(1)); }
            0x23 => { self.idle(); self.set_hl(self.hl().wrapping_add(1)); }
            0x33 => { self.idle(); self.sp = self.sp.wrapping_add(1); }
            0x0B => { self.idle(); self.set_bc(self.bc().wrapping_sub(1)); }
            0x1B => { self.idle(); self.set_de(self.de().wrapping_sub(1)); }
            0x2B => { self.idle(); self.set_hl(self.hl().wrapping_sub(1)); }
            0x3B => { self.idle(); self.sp = self.sp.wrapping_sub(1); }

            // INC r / DEC r / LD r,d8 (r encoded in bits 3-5)
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let r = opcode >> 3;
                let val = self.read_r8(r);
                let result = self.inc(val);
                self.write_r8(r, result);
            }
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let r = opcode >> 3;
                let val = self.read_r8(r);
                let result = self.dec(val);
                self.write_r8(r, result);
            }
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let val = self.read_pc();
                self.write_r8(opcode >> 3, val);
            }

            // RLCA / RRCA / RLA / RRA (Z always cleared)
            0x07 | 0x0F | 0x17 | 0x1F => {
                self.a = self.rotate_shift(opcode >> 3, self.a);
                self.set_flag(FLAG_Z, false);
            }

            // LD (a16),SP
            0x08 => {
                let addr = self.read_pc_u16();
                let [lo, hi] = self.sp.to_le_bytes();
                self.bus_write(addr, lo);
                self.bus_write(addr.wrapping_add(1), hi);
            }

            // ADD HL,rr
            0x09 => self.add_hl(self.bc()),
            0x19 => self.add_hl(self.de()),
            0x29 => self.add_hl(self.hl()),
            0x39 => self.add_hl(self.sp),

            // STOP
            0x10 => {
                self.read_pc();
                self.stopped = true;
                log(LogCategory::CPU, LogLevel::Debug, || {
                    format!("SM83: STOP at {:04X}", self.pc.wrapping_sub(2))
                });
            }

            // JR
            0x18 => self.jr(true),
            0x20 | 0x28 | 0x30 | 0x38 => { let taken = self.condition(opcode >> 3); self.jr(taken); }

            0x27 => self.daa(),
            0x2F => {
                self.a = !self.a;
                self.set_flag(FLAG_N, true);
                self.set_flag(FLAG_H, true);
            }
            0x37 => {
                self.set_flag(FLAG_N, false);
                self.set_flag(FLAG_H, false);
                self.set_flag(FLAG_C, true);
            }
            0x3F => {
                let c = self.get_flag(FLAG_C);
                self.set_flag(FLAG_N, false);
                self.set_flag(FLAG_H, false);
                self.set_flag(FLAG_C, !c);
            }

            0x76 => self.halt(),

            // LD r,r'
            0x40..=0x7F => {
                let val = self.read_r8(opcode);
                self.write_r8(opcode >> 3, val);
            }

            // ALU A,r
            0x80..=0xBF => {
                let val = self.read_r8(opcode);
                self.alu(opcode >> 3, val);
            }

            // ALU A,d8
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let val = self.read_pc();
                self.alu(opcode >> 3, val);
            }

            // RET cc / RET / RETI
            0xC0 | 0xC8 | 0xD0 | 0xD8 => { let taken = self.condition(opcode >> 3); self.ret_cc(taken); }
            0xC9 => self.ret(),
            0xD9 => { self.ret(); self.ime = true; self.ime_delay = 0; }

            // POP rr / PUSH rr
            0xC1 => { let val = self.pop_u16(); self.set_bc(val); }
            0xD1 => { let val = self.pop_u16(); self.set_de(val); }
            0xE1 => { let val = self.pop_u16(); self.set_hl(val); }
            0xF1 => { let val = self.pop_u16(); self.set_af(val); }
            0xC5 => self.push_rr(self.bc()),
            0xD5 => self.push_rr(self.de()),
            0xE5 => self.push_rr(self.hl()),
            0xF5 => self.push_rr(self.af()),

            // JP cc / JP a16 / JP HL
            0xC2 | 0xCA | 0xD2 | 0xDA => { let taken = self.condition(opcode >> 3); self.jp(taken); }
            0xC3 => self.jp(true),
            0xE9 => { self.pc = self.hl(); }

            // CALL cc / CALL a16
            0xC4 | 0xCC | 0xD4 | 0xDC => { let taken = self.condition(opcode >> 3); self.call(taken); }
            0xCD => self.call(true),

            // RST
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => self.rst((opcode & 0x38) as u16),

            0xCB => self.execute_cb(),

            // LDH (a8),A / LDH A,(a8) / LD (C),A / LD A,(C)
            0xE0 => { let off = self.read_pc(); self.bus_write(0xFF00 | off as u16, self.a); }
            0xF0 => { let off = self.read_pc(); self.a = self.bus_read(0xFF00 | off as u16); }
            0xE2 => self.bus_write(0xFF00 | self.c as u16, self.a),
            0xF2 => { self.a = self.bus_read(0xFF00 | self.c as u16); }

            // LD (a16),A / LD A,(a16)
            0xEA => { let addr = self.read_pc_u16(); self.bus_write(addr, self.a); }
            0xFA => { let addr = self.read_pc_u16(); self.a = self.bus_read(addr); }

            // ADD SP,e8 / LD HL,SP+e8 / LD SP,HL
            0xE8 => {
                let result = self.sp_plus_e8();
                self.idle();
                self.idle();
                self.sp = result;
            }
            0xF8 => {
                let result = self.sp_plus_e8();
                self.idle();
                self.set_hl(result);
            }
            0xF9 => { self.idle(); self.sp = self.hl(); }

            // DI / EI
            0xF3 => { self.ime = false; self.ime_delay = 0; }
            0xFB => {
                if !self.ime && self.ime_delay == 0 {
                    // Decremented once at the end of this step, once after the next
                    self.ime_delay = 2;
                }
            }

            // D3 DB DD E3 E4 EB EC ED F4 FC FD
            _ => {
                log(LogCategory::CPU, LogLevel::Debug, || {
                    format!(
                        "SM83: undefined opcode {:02X} at {:04X}",
                        opcode,
                        self.pc.wrapping_sub(1)
                    )
                });
            }
        }
    }
}
