//! Front-end shell for a Game Boy core: cartridge header inspection, a ROM
//! library, and presentation of the indexed frames a core pushes out.

pub mod cart;
pub mod display;
pub mod emu;
pub mod library;
