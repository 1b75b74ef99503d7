use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;

use gb_shell::{
    cart::{header, Cartridge, CartridgeHeader},
    display::{source, Palette, Theme},
    emu::{PatternCore, Session},
    library::{EntryKind, RomLibrary},
};

mod window;

#[derive(Parser, Debug)]
#[command(about = "Inspect Game Boy cartridges and watch a core's output")]
struct Args {
    /// Directory holding imported ROMs
    #[arg(long, global = true, default_value = "roms")]
    library: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List ROMs and folders in the library
    List,

    /// Print the cartridge header of a ROM file
    Info {
        /// Path to a .gb/.gbc file
        rom: PathBuf,
    },

    /// Copy a ROM file into the library
    Import {
        /// Path to a .gb/.gbc file (use your own/homebrew ROM)
        rom: PathBuf,
    },

    /// Run a library ROM and show its frames
    Play {
        /// Library name of the ROM, without extension
        name: String,

        /// Scale factor for the 160x144 screen
        #[arg(long, default_value_t = 4)]
        scale: u32,

        /// Palette used to colour frames
        #[arg(long, value_enum, default_value_t = Theme::Green)]
        theme: Theme,

        /// Don't fade the screen while paused
        #[arg(long)]
        no_fade: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::List => list(&RomLibrary::open(&args.library)?),
        Command::Info { rom } => {
            let cart = Cartridge::load(&rom)?;
            print_header(&cart.header);
            Ok(())
        }
        Command::Import { rom } => {
            let library = RomLibrary::open(&args.library)?;
            let entry = library
                .import(&rom)
                .with_context(|| format!("importing {}", rom.display()))?;
            println!("{}", entry.name);
            Ok(())
        }
        Command::Play {
            name,
            scale,
            theme,
            no_fade,
        } => {
            let library = RomLibrary::open(&args.library)?;
            let title = header::parse_header(&library.read(&name)?).formatted_title;

            let (emitter, source) = source::channel();
            let mut session = Session::new(library, emitter);
            session.setup::<PatternCore>(&name)?;
            info!("Loaded {:?}", title);

            window::run(
                session,
                source,
                window::PlayOptions {
                    title,
                    scale,
                    palette: Palette::for_theme(theme),
                    fade: !no_fade,
                },
            )
        }
    }
}

fn list(library: &RomLibrary) -> Result<()> {
    info!("Library at {}", library.root().display());
    for entry in library.entries()? {
        match entry.kind {
            EntryKind::Directory => println!("{}/", entry.name),
            EntryKind::Rom => {
                let rom = std::fs::read(&entry.path)?;
                let header = header::parse_header(&rom);
                println!(
                    "{:<24} {} ({})",
                    entry.name, header.formatted_title, header.licensee
                );
            }
        }
    }
    Ok(())
}

fn print_header(header: &CartridgeHeader) {
    println!("Title:          {}", header.formatted_title);
    println!("Raw title:      {}", header.title);
    println!("Licensee:       {}", header.licensee);
    println!("Color:          {}", header.color_compatibility);
    println!("Super Game Boy: {}", header.super_gameboy_support);
    println!("Cartridge type: {}", header.cartridge_type);
    println!("ROM size:       {}", header.rom_size);
    println!("RAM size:       {}", header.ram_size);
    println!("Destination:    {:?}", header.destination);
    println!("Version:        {}", header.version);
    let status = match header.header_checksum_valid {
        true => "ok",
        false => "mismatch",
    };
    let checksum = format!("{:#04x} ({})", header.header_checksum, status);
    println!("Checksum:       {}", checksum);
}
