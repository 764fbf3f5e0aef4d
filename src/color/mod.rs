use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

mod named;
pub mod scheme;

/// Category name to assigned color.
pub type FamilyColors = BTreeMap<String, Rgb>;

/// Opaque 8-bit RGB color.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from channels in `0.0..=1.0`.
    pub fn from_unit(r: f32, g: f32, b: f32) -> Self {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(channel(r), channel(g), channel(b))
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parse a color specification.
    ///
    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` (alpha is dropped), CSS/X11 names
    /// in any case, the single-letter base colors `r g b c m y k w`, grayscale
    /// levels such as `"0.5"`, and `C0`..`C9` references into the `tab10` cycle.
    pub fn parse(spec: &str) -> Option<Rgb> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }

        if let Some(digits) = spec.strip_prefix('#') {
            return parse_hex_digits(digits);
        }

        if let Some(color) = parse_base_letter(spec) {
            return Some(color);
        }

        if let Some(index) = spec
            .strip_prefix('C')
            .and_then(|rest| rest.parse::<usize>().ok())
        {
            let cycle = scheme::qualitative("tab10")?;
            return cycle.get(index % cycle.len()).copied();
        }

        if let Ok(level) = spec.parse::<f32>() {
            if (0.0..=1.0).contains(&level) {
                return Some(Rgb::from_unit(level, level, level));
            }
            return None;
        }

        named::lookup(spec)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Rgb::parse(s).ok_or_else(|| anyhow!("invalid color: {s:?}"))
    }
}

fn parse_hex_digits(digits: &str) -> Option<Rgb> {
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match digits.len() {
        3 => {
            let value = u16::from_str_radix(digits, 16).ok()?;
            let expand = |nibble: u16| ((nibble & 0xF) * 0x11) as u8;
            Some(Rgb::new(
                expand(value >> 8),
                expand(value >> 4),
                expand(value),
            ))
        }
        6 | 8 => {
            let value = u32::from_str_radix(&digits[..6], 16).ok()?;
            Some(Rgb::new(
                ((value >> 16) & 0xFF) as u8,
                ((value >> 8) & 0xFF) as u8,
                (value & 0xFF) as u8,
            ))
        }
        _ => None,
    }
}

fn parse_base_letter(spec: &str) -> Option<Rgb> {
    let color = match spec {
        "r" => Rgb::new(255, 0, 0),
        "g" => Rgb::new(0, 128, 0),
        "b" => Rgb::new(0, 0, 255),
        "c" => Rgb::new(0, 191, 191),
        "m" => Rgb::new(191, 0, 191),
        "y" => Rgb::new(191, 191, 0),
        "k" => Rgb::BLACK,
        "w" => Rgb::WHITE,
        _ => return None,
    };
    Some(color)
}

/// Where category colors come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Palette {
    /// A named scheme, expanded to as many colors as there are categories.
    Scheme(String),
    /// Category name to color specification, as read from a palette file.
    Explicit(BTreeMap<String, String>),
}

impl Default for Palette {
    fn default() -> Self {
        Palette::Scheme(scheme::DEFAULT_SCHEME.to_owned())
    }
}

/// Assign a color to every category.
///
/// `families` must already be sorted and free of duplicates; scheme colors are
/// paired with it positionally.
pub fn generate_family_colors(
    palette: &Palette,
    families: &[String],
    fallback: Rgb,
) -> Result<FamilyColors> {
    match palette {
        Palette::Explicit(specs) => families
            .iter()
            .map(|family| {
                let color = match specs.get(family) {
                    Some(spec) => spec
                        .parse::<Rgb>()
                        .with_context(|| format!("palette entry for family {family:?}"))?,
                    None => fallback,
                };
                Ok((family.clone(), color))
            })
            .collect(),
        Palette::Scheme(name) => {
            let colors = scheme::color_palette(name, families.len())?;
            Ok(families.iter().cloned().zip(colors).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn families(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn parses_hex_forms() {
        assert_eq!(Rgb::parse("#ff8000"), Some(Rgb::new(255, 128, 0)));
        assert_eq!(Rgb::parse("#FF8000"), Some(Rgb::new(255, 128, 0)));
        assert_eq!(Rgb::parse("#f80"), Some(Rgb::new(255, 136, 0)));
        assert_eq!(Rgb::parse("#ff800080"), Some(Rgb::new(255, 128, 0)));
        assert_eq!(Rgb::parse("#ff80"), None);
        assert_eq!(Rgb::parse("#gg0000"), None);
    }

    #[test]
    fn parses_names_and_shorthands() {
        assert_eq!(Rgb::parse("LightPink"), Some(Rgb::new(255, 182, 193)));
        assert_eq!(Rgb::parse("lightcyan"), Some(Rgb::new(224, 255, 255)));
        assert_eq!(Rgb::parse("grey"), Some(Rgb::new(128, 128, 128)));
        assert_eq!(Rgb::parse("k"), Some(Rgb::BLACK));
        assert_eq!(Rgb::parse("0.5"), Some(Rgb::new(128, 128, 128)));
        assert_eq!(Rgb::parse("C1"), Some(Rgb::new(0xff, 0x7f, 0x0e)));
        assert_eq!(Rgb::parse("1.5"), None);
        assert_eq!(Rgb::parse("not-a-color"), None);
    }

    #[test]
    fn hex_output_is_lowercase() {
        assert_eq!(Rgb::new(0xAB, 0x0C, 0xFF).to_hex(), "#ab0cff");
        assert_eq!(Rgb::new(1, 2, 3).to_string(), "#010203");
    }

    #[test]
    fn explicit_palette_falls_back_for_missing_family() {
        let mut specs = BTreeMap::new();
        specs.insert("Pospiviroidae".to_string(), "LightPink".to_string());
        let palette = Palette::Explicit(specs);
        let fallback = Rgb::parse("grey").unwrap();

        let colors = generate_family_colors(
            &palette,
            &families(&["Avsunviroidae", "Pospiviroidae"]),
            fallback,
        )
        .unwrap();

        assert_eq!(colors.len(), 2);
        assert_eq!(colors["Avsunviroidae"], fallback);
        assert_eq!(colors["Pospiviroidae"].to_hex(), "#ffb6c1");
    }

    #[test]
    fn explicit_palette_rejects_bad_color() {
        let mut specs = BTreeMap::new();
        specs.insert("A".to_string(), "chartreusey".to_string());
        let err = generate_family_colors(&Palette::Explicit(specs), &families(&["A"]), Rgb::BLACK)
            .unwrap_err();
        assert!(format!("{err:#}").contains("chartreusey"));
    }

    #[test]
    fn explicit_palette_ignores_unused_bad_color() {
        let mut specs = BTreeMap::new();
        specs.insert("Unused".to_string(), "???".to_string());
        let colors =
            generate_family_colors(&Palette::Explicit(specs), &families(&["A"]), Rgb::BLACK)
                .unwrap();
        assert_eq!(colors["A"], Rgb::BLACK);
    }

    #[test]
    fn scheme_palette_pairs_positionally() {
        let names = families(&["alpha", "beta", "gamma"]);
        let colors =
            generate_family_colors(&Palette::Scheme("pastel".into()), &names, Rgb::BLACK).unwrap();
        let expected = scheme::color_palette("pastel", 3).unwrap();

        assert_eq!(colors.len(), 3);
        for (name, color) in names.iter().zip(expected) {
            assert_eq!(colors[name], color);
        }
    }

    #[test]
    fn scheme_palette_with_no_families_is_empty() {
        let colors =
            generate_family_colors(&Palette::default(), &[], Rgb::BLACK).unwrap();
        assert!(colors.is_empty());
    }
}
