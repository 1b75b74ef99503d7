// four-shade palettes
use clap::ValueEnum;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Color(pub u8, pub u8, pub u8, pub u8);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color(r, g, b, 0xFF)
    }

    pub fn rgba(self) -> [u8; 4] {
        [self.0, self.1, self.2, self.3]
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, ValueEnum)]
pub enum Theme {
    /// Classic DMG greens, lightest first
    #[default]
    Green,
    /// Grayscale, lightest first
    Gray,
    /// Grayscale, darkest first
    Inverted,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Palette([Color; 4]);

impl Palette {
    pub const fn new(colors: [Color; 4]) -> Self {
        Palette(colors)
    }

    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Green => Palette([
                Color::rgb(0x9B, 0xBC, 0x0F),
                Color::rgb(0x8B, 0xAC, 0x0F),
                Color::rgb(0x30, 0x62, 0x30),
                Color::rgb(0x0F, 0x38, 0x0F),
            ]),
            Theme::Gray => Palette([
                Color::rgb(0xFF, 0xFF, 0xFF),
                Color::rgb(0xAA, 0xAA, 0xAA),
                Color::rgb(0x55, 0x55, 0x55),
                Color::rgb(0x00, 0x00, 0x00),
            ]),
            Theme::Inverted => {
                let mut colors = Palette::for_theme(Theme::Gray).0;
                colors.reverse();
                Palette(colors)
            }
        }
    }

    /// `None` for indices outside 0..=3.
    pub fn color(&self, index: u8) -> Option<Color> {
        self.0.get(index as usize).copied()
    }

    pub fn colors(&self) -> [Color; 4] {
        self.0
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::for_theme(Theme::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_reverses_gray() {
        let gray = Palette::for_theme(Theme::Gray);
        let inverted = Palette::for_theme(Theme::Inverted);
        assert_eq!(inverted.color(0), gray.color(3));
        assert_eq!(inverted.color(3), Some(Color::rgb(0xFF, 0xFF, 0xFF)));
    }

    #[test]
    fn out_of_range_index_has_no_color() {
        assert_eq!(Palette::default().color(4), None);
    }
}
