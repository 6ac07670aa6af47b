//! Single-instruction test vectors for the SM83 core.
//!
//! Reads the published per-opcode JSON format (one file per opcode, each an
//! array of cases with an `initial` and `final` machine snapshot plus the
//! list of bus cycles), runs every case through [`CpuSm83::step`] on a flat
//! 64 KiB memory and compares registers, flags, IME, every listed RAM byte
//! and the cycle count.
//!
//! ```rust,ignore
//! let report = emu_core::sm83_vectors::run_file("v1/00.json")?;
//! assert_eq!(report.failed, 0);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cpu_sm83::{CpuSm83, MemorySm83, Sm83Registers};

#[derive(thiserror::Error, Debug)]
pub enum VectorError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One machine snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineState {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub f: u8,
    pub h: u8,
    pub l: u8,
    #[serde(default)]
    pub ime: u8,
    #[serde(default)]
    pub ie: Option<u8>,
    pub ram: Vec<(u16, u8)>,
}

impl MachineState {
    fn registers(&self) -> Sm83Registers {
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
}

/// One test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorCase {
    pub name: String,
    pub initial: MachineState,
    #[serde(rename = "final")]
    pub expected: MachineState,
    /// Bus activity per machine cycle; only the length is checked
    #[serde(default)]
    pub cycles: Vec<serde_json::Value>,
}

/// Flat RAM with no interrupt sources
pub struct FlatMemory {
    data: Box<[u8]>,
}

impl FlatMemory {
    pub fn new() -> Self {
        Self {
            data: vec![0; 0x10000].into_boxed_slice(),
        }
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySm83 for FlatMemory {
    fn read(&mut self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.data[addr as usize] = val;
    }

    fn peek(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn poke(&mut self, addr: u16, val: u8) {
        self.data[addr as usize] = val;
    }

    fn pending_interrupts(&self) -> u8 {
        0
    }
}

/// Pass/fail tally for one file
#[derive(Debug, Default, Clone)]
pub struct VectorReport {
    pub passed: usize,
    pub failed: usize,
    /// Case name and the differences found, for failing cases
    pub failures: Vec<(String, Vec<String>)>,
}

impl VectorReport {
    pub fn merge(&mut self, other: VectorReport) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.failures.extend(other.failures);
    }
}

/// Run one case, returning the list of differences (empty on success)
pub fn run_case(case: &VectorCase) -> Vec<String> {
    let mut cpu = CpuSm83::new(FlatMemory::new());
    cpu.set_registers(case.initial.registers());
    cpu.ime = case.initial.ime != 0;
    for &(addr, val) in &case.initial.ram {
        cpu.memory.poke(addr, val);
    }

    let cycles = cpu.step();

    let mut diffs = Vec::new();
    let got = cpu.registers();
    let want = case.expected.registers();

    macro_rules! check {
        ($field:ident) => {
            if got.$field != want.$field {
                diffs.push(format!(
                    "{}: got {:#X}, expected {:#X}",
                    stringify!($field),
                    got.$field,
                    want.$field
                ));
            }
        };
    }

    check!(a);
    check!(f);
    check!(b);
    check!(c);
    check!(d);
    check!(e);
    check!(h);
    check!(l);
    check!(sp);
    check!(pc);

    // A pending EI counts as enabled at the instruction boundary
    let ime = u8::from(cpu.ime || cpu.ime_delay > 0);
    if ime != case.expected.ime {
        diffs.push(format!("ime: got {}, expected {}", ime, case.expected.ime));
    }

    for &(addr, val) in &case.expected.ram {
        let actual = cpu.memory.peek(addr);
        if actual != val {
            diffs.push(format!(
                "ram[{:04X}]: got {:02X}, expected {:02X}",
                addr, actual, val
            ));
        }
    }

    if !case.cycles.is_empty() {
        let expected_cycles = case.cycles.len() as u32 * 4;
        if cycles != expected_cycles {
            diffs.push(format!(
                "cycles: got {}, expected {}",
                cycles, expected_cycles
            ));
        }
    }

    diffs
}

pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<VectorCase>, VectorError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| VectorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| VectorError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn run_cases(cases: &[VectorCase]) -> VectorReport {
    let mut report = VectorReport::default();
    for case in cases {
        let diffs = run_case(case);
        if diffs.is_empty() {
            report.passed += 1;
        } else {
            report.failed += 1;
            report.failures.push((case.name.clone(), diffs));
        }
    }
    report
}

pub fn run_file(path: impl AsRef<Path>) -> Result<VectorReport, VectorError> {
    let cases = load_file(path)?;
    Ok(run_cases(&cases))
}

/// Run every `*.json` file in a directory, sorted by name
pub fn run_dir(dir: impl AsRef<Path>) -> Result<Vec<(PathBuf, VectorReport)>, VectorError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|source| VectorError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut results = Vec::with_capacity(files.len());
    for file in files {
        let report = run_file(&file)?;
        results.push((file, report));
    }
    Ok(results)
}
