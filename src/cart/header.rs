//! Decoding of the cartridge header at 0x0100-0x014F.
//!
//! Parsing never fails. Bytes missing from a short buffer read as zero and
//! every table miss resolves to a [`Fallback`] instead of an error.

use std::fmt;

use super::tables;

pub const TITLE: std::ops::Range<usize> = 0x134..0x144;
pub const CGB_FLAG: usize = 0x143;
pub const NEW_LICENSEE: std::ops::Range<usize> = 0x144..0x146;
pub const SGB_FLAG: usize = 0x146;
pub const CARTRIDGE_TYPE: usize = 0x147;
pub const ROM_SIZE: usize = 0x148;
pub const RAM_SIZE: usize = 0x149;
pub const DESTINATION: usize = 0x14A;
pub const OLD_LICENSEE: usize = 0x14B;
pub const VERSION: usize = 0x14C;
pub const HEADER_CHECKSUM: usize = 0x14D;

/// Old licensee value meaning "look at the two-character code instead".
pub const NEW_LICENSEE_ESCAPE: u8 = 0x33;

/// Smallest buffer that holds the whole header.
pub const HEADER_END: usize = 0x150;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ColorCompatibility {
    DmgOnly,
    CgbOnly,
    Both,
}

impl ColorCompatibility {
    pub fn from_flag(flag: u8) -> Self {
        match flag {
            0x80 => ColorCompatibility::Both,
            0xC0 => ColorCompatibility::CgbOnly,
            _ => ColorCompatibility::DmgOnly,
        }
    }
}

impl fmt::Display for ColorCompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorCompatibility::DmgOnly => "dmg-only",
            ColorCompatibility::CgbOnly => "cgb-only",
            ColorCompatibility::Both => "both",
        };
        f.write_str(name)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Destination {
    Japanese,
    Overseas,
}

/// Result of a table lookup: a known label or the code that missed.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Label {
    Known(&'static str),
    Unknown(Fallback),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Fallback {
    /// Single-byte code, shown as lower-case hex.
    Code(u8),
    /// Two-character code reached through the 0x33 escape.
    NewLicensee(String),
    /// Tables that only report "Unknown".
    Bare,
}

impl Label {
    fn lookup(found: Option<&'static str>, fallback: Fallback) -> Self {
        match found {
            Some(name) => Label::Known(name),
            None => Label::Unknown(fallback),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Label::Known(_))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Known(name) => f.write_str(name),
            Label::Unknown(Fallback::Code(code)) => write!(f, "Unknown - {code:x}"),
            Label::Unknown(Fallback::NewLicensee(code)) => {
                write!(f, "Unknown - {NEW_LICENSEE_ESCAPE:#04x} {code}")
            }
            Label::Unknown(Fallback::Bare) => f.write_str("Unknown"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CartridgeHeader {
    pub title: String,
    pub formatted_title: String,
    pub color_compatibility: ColorCompatibility,
    pub licensee: Label,
    pub super_gameboy_support: bool,
    pub cartridge_type: Label,
    pub rom_size: Label,
    pub ram_size: Label,
    pub destination: Destination,
    pub version: u8,
    pub header_checksum: u8,
    pub header_checksum_valid: bool,
}

pub fn parse_header(rom: &[u8]) -> CartridgeHeader {
    let title = read_title(rom);
    let formatted_title = format_title(&title);

    CartridgeHeader {
        formatted_title,
        title,
        color_compatibility: ColorCompatibility::from_flag(byte(rom, CGB_FLAG)),
        licensee: licensee(rom),
        super_gameboy_support: byte(rom, SGB_FLAG) == 0x03,
        cartridge_type: cartridge_type(byte(rom, CARTRIDGE_TYPE)),
        rom_size: Label::lookup(tables::rom_size(byte(rom, ROM_SIZE)), Fallback::Bare),
        ram_size: Label::lookup(tables::ram_size(byte(rom, RAM_SIZE)), Fallback::Bare),
        destination: match byte(rom, DESTINATION) {
            0x00 => Destination::Japanese,
            _ => Destination::Overseas,
        },
        version: byte(rom, VERSION),
        header_checksum: byte(rom, HEADER_CHECKSUM),
        header_checksum_valid: header_checksum(rom) == byte(rom, HEADER_CHECKSUM),
    }
}

pub fn cartridge_type(code: u8) -> Label {
    Label::lookup(tables::cartridge_type(code), Fallback::Code(code))
}

/// Resolves the publisher. The old table is only consulted when the byte at
/// 0x14B is not the new-licensee escape.
pub fn licensee(rom: &[u8]) -> Label {
    let old = byte(rom, OLD_LICENSEE);
    if old != NEW_LICENSEE_ESCAPE {
        return Label::lookup(tables::old_licensee(old), Fallback::Code(old));
    }

    let code: String = slice(rom, NEW_LICENSEE)
        .iter()
        .map(|&b| b as char)
        .collect();
    match tables::new_licensee(&code) {
        Some(name) => Label::Known(name),
        None => Label::Unknown(Fallback::NewLicensee(code)),
    }
}

/// Boot ROM checksum over 0x134..=0x14C.
pub fn header_checksum(rom: &[u8]) -> u8 {
    (TITLE.start..HEADER_CHECKSUM)
        .map(|i| byte(rom, i))
        .fold(0u8, |x, b| x.wrapping_sub(b).wrapping_sub(1))
}

fn read_title(rom: &[u8]) -> String {
    let title: String = slice(rom, TITLE)
        .iter()
        .take_while(|&&b| b != 0x00)
        .filter(|&&b| (0x20..0x7F).contains(&b))
        .map(|&b| b as char)
        .collect();
    title.trim().to_string()
}

/// Keeps the first character of every word and lower-cases the rest, then
/// applies the override table to the whole result.
pub fn format_title(title: &str) -> String {
    let cased = title
        .trim()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) if word.chars().count() > 1 => {
                    let mut out = String::with_capacity(word.len());
                    out.push(first);
                    out.extend(chars.flat_map(char::to_lowercase));
                    out
                }
                _ => word.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    match tables::title_override(&cased) {
        Some(corrected) => corrected.to_string(),
        None => cased,
    }
}

fn byte(rom: &[u8], offset: usize) -> u8 {
    rom.get(offset).copied().unwrap_or(0)
}

fn slice(rom: &[u8], range: std::ops::Range<usize>) -> &[u8] {
    let end = range.end.min(rom.len());
    let start = range.start.min(end);
    &rom[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_with(title: &[u8]) -> Vec<u8> {
        let mut rom = vec![0u8; HEADER_END];
        rom[TITLE.start..TITLE.start + title.len()].copy_from_slice(title);
        rom
    }

    #[test]
    fn every_cartridge_type_byte_resolves() {
        for b in 0..=u8::MAX {
            let label = cartridge_type(b);
            let text = label.to_string();
            if !label.is_known() {
                assert_eq!(text, format!("Unknown - {:x}", b));
            }
        }
        assert_eq!(cartridge_type(0x13).to_string(), "MBC3+RAM+BATTERY");
        assert_eq!(cartridge_type(0x04).to_string(), "Unknown - 4");
        assert_eq!(cartridge_type(0xAB).to_string(), "Unknown - ab");
    }

    #[test]
    fn licensee_uses_new_table_behind_escape() {
        let mut rom = vec![0u8; HEADER_END];
        rom[OLD_LICENSEE] = 0x33;
        rom[NEW_LICENSEE].copy_from_slice(b"01");
        assert_eq!(
            licensee(&rom).to_string(),
            "Nintendo Research and Development 1"
        );

        rom[NEW_LICENSEE].copy_from_slice(b"ZZ");
        assert_eq!(
            licensee(&rom),
            Label::Unknown(Fallback::NewLicensee("ZZ".to_string()))
        );
        assert_eq!(licensee(&rom).to_string(), "Unknown - 0x33 ZZ");
    }

    #[test]
    fn licensee_uses_old_table_without_escape() {
        let mut rom = vec![0u8; HEADER_END];
        rom[OLD_LICENSEE] = 0x01;
        // New code bytes are ignored when the escape is absent.
        rom[NEW_LICENSEE].copy_from_slice(b"ZZ");
        assert_eq!(licensee(&rom).to_string(), "Nintendo");

        rom[OLD_LICENSEE] = 0x1B;
        assert_eq!(licensee(&rom).to_string(), "Unknown - 1b");
    }

    #[test]
    fn color_flag() {
        let flags = [
            (0x80, ColorCompatibility::Both),
            (0xC0, ColorCompatibility::CgbOnly),
            (0x00, ColorCompatibility::DmgOnly),
            (0x42, ColorCompatibility::DmgOnly),
        ];
        for (flag, expected) in flags {
            assert_eq!(ColorCompatibility::from_flag(flag), expected);
        }
    }

    #[test]
    fn pokemon_red_title() {
        let header = parse_header(&rom_with(b"POKEMON RED\0"));
        assert_eq!(header.title, "POKEMON RED");
        assert_eq!(header.formatted_title, "Pokemon Red");
    }

    #[test]
    fn override_applies_after_casing() {
        assert_eq!(format_title("DR.MARIO"), "Dr. Mario");
        assert_eq!(format_title("dr.MaRiO"), "dr.mario");
        assert_eq!(format_title("Dr.mario"), "Dr. Mario");
        assert_eq!(format_title("TETRIS DX"), "Tetris DX");
    }

    #[test]
    fn short_words_pass_through() {
        assert_eq!(format_title("MEGA MAN V"), "Mega Man V");
        assert_eq!(format_title("a B c"), "a B c");
        assert_eq!(format_title(""), "");
    }

    #[test]
    fn formatting_is_idempotent() {
        let titles = [
            "POKEMON RED",
            "DR.MARIO",
            "TETRIS DX",
            "SUPERMARIOLAND3",
            "MARIOLAND2",
            "ZELDA",
            "PM_CRYSTAL",
            "KIRBY  DREAM LAND",
            "x",
            "  padded title  ",
        ];
        for title in titles {
            let once = format_title(title);
            assert_eq!(format_title(&once), once, "title {title:?}");
        }
    }

    #[test]
    fn title_stops_at_zero_and_skips_cgb_flag() {
        let mut rom = rom_with(b"POKEMON_SLVAAXE");
        rom[CGB_FLAG] = 0x80;
        let header = parse_header(&rom);
        assert_eq!(header.title, "POKEMON_SLVAAXE");
        assert_eq!(header.color_compatibility, ColorCompatibility::Both);

        let header = parse_header(&rom_with(b"TETRIS\0GARBAGE"));
        assert_eq!(header.title, "TETRIS");
    }

    #[test]
    fn title_drops_control_and_high_bytes() {
        let header = parse_header(&rom_with(b"TET\x01RIS\x7F"));
        assert_eq!(header.title, "TETRIS");
        assert_eq!(header.formatted_title, "Tetris");

        // A stray high byte inside the title is dropped, not decoded.
        let header = parse_header(&rom_with(b"ZELDA\xC0 DX"));
        assert_eq!(header.title, "ZELDA DX");

        let header = parse_header(&rom_with(b"\x01\x02\x03"));
        assert_eq!(header.title, "");
        assert_eq!(header.formatted_title, "");
    }

    #[test]
    fn size_tables() {
        let mut rom = vec![0u8; HEADER_END];
        rom[ROM_SIZE] = 0x02;
        rom[RAM_SIZE] = 0x03;
        let header = parse_header(&rom);
        assert_eq!(header.rom_size.to_string(), "128 KiB");
        assert_eq!(header.ram_size.to_string(), "32 KiB");

        rom[ROM_SIZE] = 0x09;
        rom[RAM_SIZE] = 0x06;
        let header = parse_header(&rom);
        assert_eq!(header.rom_size, Label::Unknown(Fallback::Bare));
        assert_eq!(header.rom_size.to_string(), "Unknown");
        assert_eq!(header.ram_size.to_string(), "Unknown");
    }

    #[test]
    fn super_gameboy_flag_needs_exact_value() {
        let mut rom = vec![0u8; HEADER_END];
        rom[SGB_FLAG] = 0x03;
        assert!(parse_header(&rom).super_gameboy_support);
        rom[SGB_FLAG] = 0x02;
        assert!(!parse_header(&rom).super_gameboy_support);
    }

    #[test]
    fn short_buffers_degrade() {
        for len in [0, 1, 0x134, 0x13A, 0x145, 0x14B, 0x14C] {
            let mut rom = vec![0x41u8; len];
            if len > 0x140 {
                rom[0x140] = 0;
            }
            let header = parse_header(&rom);
            if len <= OLD_LICENSEE {
                assert_eq!(header.licensee.to_string(), "None");
            }
        }

        let header = parse_header(&[]);
        assert_eq!(header.title, "");
        assert_eq!(header.color_compatibility, ColorCompatibility::DmgOnly);
        assert_eq!(header.cartridge_type.to_string(), "ROM ONLY");
        assert_eq!(header.rom_size.to_string(), "32 KiB");
        assert!(!header.super_gameboy_support);
    }

    #[test]
    fn escape_with_truncated_code_keeps_marker() {
        // The escape byte sits after the code bytes, so a buffer holding it
        // always holds the full code. Zero bytes still make a two-char code.
        let mut rom = vec![0u8; OLD_LICENSEE + 1];
        rom[OLD_LICENSEE] = 0x33;
        assert_eq!(licensee(&rom).to_string(), "Unknown - 0x33 \0\0");
    }

    #[test]
    fn checksum_matches_boot_rom_rule() {
        let mut rom = rom_with(b"TETRIS");
        rom[HEADER_CHECKSUM] = header_checksum(&rom);
        let header = parse_header(&rom);
        assert!(header.header_checksum_valid);

        rom[VERSION] = 1;
        assert!(!parse_header(&rom).header_checksum_valid);
    }
}
