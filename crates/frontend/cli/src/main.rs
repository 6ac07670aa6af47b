use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use emu_core::logging::{log, LogCategory, LogConfig, LogLevel};
use emu_core::sm83_vectors;
use emu_core::System;
use emu_gb::cartridge::Cartridge;
use emu_gb::GbSystem;

mod config;

use config::Settings;

#[derive(Parser)]
#[command(name = "gbcore", about = "Headless DMG Game Boy runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Settings file (defaults to config.json next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Global log level: off, error, warn, info, debug, trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[arg(long, global = true)]
    log_cpu: Option<String>,

    #[arg(long, global = true)]
    log_ppu: Option<String>,

    #[arg(long, global = true)]
    log_apu: Option<String>,

    #[arg(long, global = true)]
    log_bus: Option<String>,

    /// Write core logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a ROM for a number of host frames
    Run {
        rom: PathBuf,

        /// 256-byte DMG boot ROM
        #[arg(long)]
        bootrom: Option<PathBuf>,

        /// Host frames (60 per second) to run
        #[arg(long, default_value_t = 60)]
        frames: u32,

        /// Write the last frame as a PNG
        #[arg(long)]
        screenshot: Option<PathBuf>,

        /// Dump save-state to this file as JSON
        #[arg(long)]
        save: Option<PathBuf>,

        /// Append raw little-endian f32 mono samples to this file
        #[arg(long)]
        audio_out: Option<PathBuf>,

        /// Log every instruction boundary
        #[arg(long, default_value_t = false)]
        trace: bool,
    },
    /// Print the cartridge header
    Info { rom: PathBuf },
    /// Run a directory of single-step SM83 JSON vectors
    Vectors { dir: PathBuf },
}

fn parse_level(name: &str) -> Result<LogLevel> {
    match LogLevel::from_str(name) {
        Some(level) => Ok(level),
        None => bail!("Unknown log level: {}", name),
    }
}

fn configure_logging(cli: &Cli, settings: &Settings) -> Result<()> {
    let config = LogConfig::global();
    if let Some(level) = cli.log_level.as_ref().or(settings.log_level.as_ref()) {
        config.set_global_level(parse_level(level)?);
    }
    let overrides = [
        (LogCategory::CPU, &cli.log_cpu),
        (LogCategory::PPU, &cli.log_ppu),
        (LogCategory::APU, &cli.log_apu),
        (LogCategory::Bus, &cli.log_bus),
    ];
    for (category, level) in overrides {
        if let Some(level) = level {
            config.set_level(category, parse_level(level)?);
        }
    }
    if let Some(path) = &cli.log_file {
        config
            .set_log_file(path.clone())
            .with_context(|| format!("opening log file {}", path.display()))?;
    }
    Ok(())
}

fn write_png(path: &Path, sys: &GbSystem) -> Result<()> {
    let frame = sys.frame();
    let mut rgb = Vec::with_capacity(frame.pixels.len() * 3);
    for &argb in &frame.pixels {
        rgb.extend_from_slice(&[(argb >> 16) as u8, (argb >> 8) as u8, argb as u8]);
    }

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), frame.width, frame.height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&rgb)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run(
    settings: &Settings,
    rom: &Path,
    bootrom: Option<&Path>,
    frames: u32,
    screenshot: Option<&Path>,
    save: Option<&Path>,
    audio_out: Option<&Path>,
    trace: bool,
) -> Result<()> {
    let mut sys = GbSystem::with_audio(
        settings.sample_rate,
        settings.audio_buffer_capacity,
        settings.volume,
    );

    if let Some(path) = bootrom.or(settings.bootrom_path.as_deref()) {
        // A bad boot ROM is reported, and the run continues without one
        if let Err(e) = sys.load_bootrom(path) {
            log::warn!("Boot ROM {} not used: {}", path.display(), e);
        }
    }
    sys.load_cartridge(rom)
        .with_context(|| format!("loading {}", rom.display()))?;

    if trace {
        if LogConfig::global().get_level(LogCategory::CPU) < LogLevel::Trace {
            LogConfig::global().set_level(LogCategory::CPU, LogLevel::Trace);
        }
        sys.set_instruction_hook(|pc| {
            log(LogCategory::CPU, LogLevel::Trace, || format!("PC={:04X}", pc));
        });
    }

    let mut audio = match audio_out {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => None,
    };
    let mut samples = vec![0.0f32; settings.audio_buffer_capacity.max(1)];

    let mut presented = 0u32;
    for _ in 0..frames {
        if sys.run_host_frame()? {
            presented += 1;
        }
        let n = sys.read_samples(&mut samples);
        if let Some(out) = audio.as_mut() {
            for s in &samples[..n] {
                out.write_all(&s.to_le_bytes())?;
            }
        }
    }
    if let Some(mut out) = audio {
        out.flush()?;
    }

    let regs = sys.registers();
    println!(
        "Ran {} host frames, {} LCD frames; PC={:04X} SP={:04X} A={:02X} F={:02X}",
        frames, presented, regs.pc, regs.sp, regs.a, regs.f
    );

    let serial = sys.serial_output();
    if !serial.is_empty() {
        println!("Serial: {}", String::from_utf8_lossy(serial));
    }

    if let Some(path) = screenshot {
        write_png(path, &sys)?;
        println!("Screenshot: {}", path.display());
    }

    if let Some(path) = save {
        let state = sys.save_state();
        let mut f = File::create(path)?;
        write!(f, "{}", serde_json::to_string_pretty(&state)?)?;
    }

    Ok(())
}

fn info(rom: &Path) -> Result<()> {
    let cart = Cartridge::load(rom).with_context(|| format!("loading {}", rom.display()))?;
    let header = cart.header();
    println!("Title:    {}", header.title);
    println!(
        "Type:     {:#04X} ({})",
        header.cart_type,
        cart.mapper_name()
    );
    println!("ROM:      {} KB", header.rom_size / 1024);
    println!("RAM:      {} bytes", header.ram_size);
    println!("Battery:  {}", if header.has_battery { "yes" } else { "no" });
    println!(
        "Checksum: {:#04X} ({})",
        header.checksum,
        if header.checksum_ok { "ok" } else { "mismatch" }
    );
    Ok(())
}

fn vectors(dir: &Path) -> Result<()> {
    let results = sm83_vectors::run_dir(dir)?;
    let mut passed = 0;
    let mut failed = 0;
    for (file, report) in &results {
        passed += report.passed;
        failed += report.failed;
        if report.failed > 0 {
            println!(
                "{}: {} passed, {} failed",
                file.display(),
                report.passed,
                report.failed
            );
            if let Some((name, diffs)) = report.failures.first() {
                println!("  first failure {}: {}", name, diffs.join("; "));
            }
        }
    }
    println!(
        "{} files, {} passed, {} failed",
        results.len(),
        passed,
        failed
    );
    if failed > 0 {
        bail!("{} vector cases failed", failed);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref());
    configure_logging(&cli, &settings)?;

    match &cli.command {
        Command::Run {
            rom,
            bootrom,
            frames,
            screenshot,
            save,
            audio_out,
            trace,
        } => run(
            &settings,
            rom,
            bootrom.as_deref(),
            *frames,
            screenshot.as_deref(),
            save.as_deref(),
            audio_out.as_deref(),
            *trace,
        ),
        Command::Info { rom } => info(rom),
        Command::Vectors { dir } => vectors(dir),
    }
}
