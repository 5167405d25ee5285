use std::path::{Path, PathBuf};
use std::process::ExitCode;

use agate_core::prelude::*;
use clap::Parser;

mod audio;
mod config;
mod emulator;
mod input;
mod overlay;
mod rom_path;
mod video;

#[derive(Parser)]
#[command(name = "agate", about = "Game Boy Advance emulator", version)]
struct Args {
    /// Cartridge image (.gba, or a .zip containing one)
    rom: PathBuf,

    /// BIOS ROM (16 KiB). Without one, the built-in high-level BIOS is used.
    #[arg(long)]
    bios: Option<PathBuf>,

    /// Window scale factor
    #[arg(long)]
    scale: Option<u32>,

    /// Show the FPS/status overlay from startup
    #[arg(long)]
    fps: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    let config = config::load();

    let rom = match rom_path::load_rom_bytes(&args.rom) {
        Ok(rom) => rom,
        Err(e) => {
            log::error!("cannot load ROM {}: {e}", args.rom.display());
            return ExitCode::FAILURE;
        }
    };

    let mut gba = Box::new(Gba::new());

    match &args.bios {
        Some(path) => match std::fs::read(path) {
            Ok(data) => gba.load_bios(&data),
            Err(e) => {
                log::warn!("cannot load BIOS {}: {e}; falling back to HLE", path.display());
                gba.skip_bios();
            }
        },
        None => gba.skip_bios(),
    }

    if let Err(e) = gba.load_rom(rom) {
        log::error!("ROM rejected: {e}");
        return ExitCode::FAILURE;
    }

    // Restore the save file, if one exists for this game code.
    let save_path = save_path_for(gba.bus.cart.game_code());
    if let Ok(data) = std::fs::read(&save_path) {
        gba.bus.cart.load_backup_data(&data);
        log::info!("save loaded from {}", save_path.display());
    }

    let scale = args.scale.or(config.scale).unwrap_or(3).max(1);
    let key_map = input::build_key_map(&config);

    emulator::run(&mut gba, &key_map, scale, args.fps);

    // Persist the backup memory on clean exit.
    if let Some(data) = gba.bus.cart.backup_data() {
        if let Some(dir) = save_path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        match std::fs::write(&save_path, data) {
            Ok(()) => log::info!("save written to {}", save_path.display()),
            Err(e) => log::error!("failed to write {}: {e}", save_path.display()),
        }
    }

    ExitCode::SUCCESS
}

fn save_path_for(game_code: &str) -> PathBuf {
    let code = if game_code.is_empty() {
        "UNKNOWN"
    } else {
        game_code
    };
    Path::new("saves").join(format!("{code}.sav"))
}
