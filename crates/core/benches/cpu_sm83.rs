use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use emu_core::apu::BoxFilter;
use emu_core::cpu_sm83::{CpuSm83, MemorySm83};

/// Flat memory holding a small arithmetic loop at 0x0100
struct BenchMemory {
    ram: Vec<u8>,
}

impl BenchMemory {
    fn new() -> Self {
        let mut ram = vec![0; 0x10000];
        let program = [
            0x3E, 0x42, // LD A,$42
            0x06, 0x10, // LD B,$10
            0x80, // ADD A,B
            0x90, // SUB B
            0x21, 0x00, 0xC0, // LD HL,$C000
            0x77, // LD (HL),A
            0xCB, 0x37, // SWAP A
            0x05, // DEC B
            0x20, 0xF5, // JR NZ,-11 (back to ADD)
            0xC3, 0x00, 0x01, // JP $0100
        ];
        ram[0x0100..0x0100 + program.len()].copy_from_slice(&program);
        Self { ram }
    }
}

impl MemorySm83 for BenchMemory {
    fn read(&mut self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.ram[addr as usize] = val;
    }

    fn peek(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    fn poke(&mut self, addr: u16, val: u8) {
        self.ram[addr as usize] = val;
    }
}

fn bench_cpu_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_sm83_steps");

    for step_count in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(step_count),
            step_count,
            |b, &count| {
                b.iter(|| {
                    let mut cpu = CpuSm83::new(BenchMemory::new());
                    cpu.init(false);
                    for _ in 0..count {
                        cpu.step();
                    }
                    black_box(cpu.cycles);
                });
            },
        );
    }

    group.finish();
}

fn bench_box_filter(c: &mut Criterion) {
    c.bench_function("box_filter_one_frame", |b| {
        let mut filter = BoxFilter::new(1_048_576, 48_000, 1.0 / 60.0);
        b.iter(|| {
            let mut produced = 0;
            // One video frame worth of machine cycles
            for i in 0..17_556u32 {
                if filter.push((i % 61) as u16).is_some() {
                    produced += 1;
                }
            }
            black_box(produced);
        });
    });
}

criterion_group!(benches, bench_cpu_steps, bench_box_filter);
criterion_main!(benches);
