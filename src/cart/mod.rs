// cartridge loading and header metadata
pub mod header;
pub mod tables;

use anyhow::{bail, Context, Result};
use log::debug;
use std::{fs, path::Path};

pub use header::{parse_header, CartridgeHeader, ColorCompatibility, Fallback, Label};

#[derive(Clone)]
pub struct Cartridge {
    pub rom: Vec<u8>,
    pub header: CartridgeHeader,
}

impl Cartridge {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rom = fs::read(path).with_context(|| format!("reading ROM {}", path.display()))?;
        Self::from_rom(rom)
    }

    pub fn from_rom(rom: Vec<u8>) -> Result<Self> {
        if rom.len() < header::HEADER_END {
            bail!("ROM too small / invalid ({} bytes)", rom.len());
        }
        let header = parse_header(&rom);
        debug!(
            "Parsed header for {:?}: {}, {}",
            header.formatted_title, header.cartridge_type, header.rom_size
        );
        Ok(Self { rom, header })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_truncated_header() {
        assert!(Cartridge::from_rom(vec![0; 0x14F]).is_err());
    }

    #[test]
    fn parses_header_on_load() {
        let mut rom = vec![0u8; header::HEADER_END];
        rom[0x134..0x13A].copy_from_slice(b"TETRIS");
        let cart = Cartridge::from_rom(rom).unwrap();
        assert_eq!(cart.header.formatted_title, "Tetris");
        assert_eq!(cart.rom.len(), header::HEADER_END);
    }
}
