//! Named color schemes.
//!
//! The qualitative lists follow seaborn and matplotlib so palettes picked for
//! plots elsewhere in an analysis give the same colors here.

use anyhow::{bail, Result};

use super::Rgb;

/// Scheme used when the user does not pick one.
pub const DEFAULT_SCHEME: &str = "pastel";

const DEEP: &[u32] = &[
    0x4C72B0, 0xDD8452, 0x55A868, 0xC44E52, 0x8172B3, 0x937860, 0xDA8BC3, 0x8C8C8C, 0xCCB974,
    0x64B5CD,
];
const MUTED: &[u32] = &[
    0x4878D0, 0xEE854A, 0x6ACC64, 0xD65F5F, 0x956CB4, 0x8C613C, 0xDC7EC0, 0x797979, 0xD5BB67,
    0x82C6E2,
];
const PASTEL: &[u32] = &[
    0xA1C9F4, 0xFFB482, 0x8DE5A1, 0xFF9F9B, 0xD0BBFF, 0xDEBB9B, 0xFAB0E4, 0xCFCFCF, 0xFFFEA3,
    0xB9F2F0,
];
const BRIGHT: &[u32] = &[
    0x023EFF, 0xFF7C00, 0x1AC938, 0xE8000B, 0x8B2BE2, 0x9F4800, 0xF14CC1, 0xA3A3A3, 0xFFC400,
    0x00D7FF,
];
const DARK: &[u32] = &[
    0x001C7F, 0xB1400D, 0x12711C, 0x8C0800, 0x591E71, 0x592F0D, 0xA23582, 0x3C3C3C, 0xB8850A,
    0x006374,
];
const COLORBLIND: &[u32] = &[
    0x0173B2, 0xDE8F05, 0x029E73, 0xD55E00, 0xCC78BC, 0xCA9161, 0xFBAFE4, 0x949494, 0xECE133,
    0x56B4E9,
];
const TAB10: &[u32] = &[
    0x1F77B4, 0xFF7F0E, 0x2CA02C, 0xD62728, 0x9467BD, 0x8C564B, 0xE377C2, 0x7F7F7F, 0xBCBD22,
    0x17BECF,
];
const SET1: &[u32] = &[
    0xE41A1C, 0x377EB8, 0x4DAF4A, 0x984EA3, 0xFF7F00, 0xFFFF33, 0xA65628, 0xF781BF, 0x999999,
];
const SET2: &[u32] = &[
    0x66C2A5, 0xFC8D62, 0x8DA0CB, 0xE78AC3, 0xA6D854, 0xFFD92F, 0xE5C494, 0xB3B3B3,
];
const SET3: &[u32] = &[
    0x8DD3C7, 0xFFFFB3, 0xBEBADA, 0xFB8072, 0x80B1D3, 0xFDB462, 0xB3DE69, 0xFCCDE5, 0xD9D9D9,
    0xBC80BD, 0xCCEBC5, 0xFFED6F,
];
const PASTEL1: &[u32] = &[
    0xFBB4AE, 0xB3CDE3, 0xCCEBC5, 0xDECBE4, 0xFED9A6, 0xFFFFCC, 0xE5D8BD, 0xFDDAEC, 0xF2F2F2,
];
const PASTEL2: &[u32] = &[
    0xB3E2CD, 0xFDCDAC, 0xCBD5E8, 0xF4CAE4, 0xE6F5C9, 0xFFF2AE, 0xF1E2CC, 0xCCCCCC,
];
const DARK2: &[u32] = &[
    0x1B9E77, 0xD95F02, 0x7570B3, 0xE7298A, 0x66A61E, 0xE6AB02, 0xA6761D, 0x666666,
];
const ACCENT: &[u32] = &[
    0x7FC97F, 0xBEAED4, 0xFDC086, 0xFFFF99, 0x386CB0, 0xF0027F, 0xBF5B17, 0x666666,
];
const PAIRED: &[u32] = &[
    0xA6CEE3, 0x1F78B4, 0xB2DF8A, 0x33A02C, 0xFB9A99, 0xE31A1C, 0xFDBF6F, 0xFF7F00, 0xCAB2D6,
    0x6A3D9A, 0xFFFF99, 0xB15928,
];

// Continuous colormaps as evenly spaced stops, interpolated linearly.
const VIRIDIS: &[u32] = &[
    0x440154, 0x472C7A, 0x3B518B, 0x2C718E, 0x21908D, 0x27AD81, 0x5CC863, 0xAADC32, 0xFDE725,
];
const PLASMA: &[u32] = &[
    0x0D0887, 0x4C02A1, 0x7E03A8, 0xA92395, 0xCC4778, 0xE56B5D, 0xF89441, 0xFDC328, 0xF0F921,
];
const MAGMA: &[u32] = &[
    0x000004, 0x1C1044, 0x4F127B, 0x812581, 0xB5367A, 0xE55064, 0xFB8761, 0xFEC287, 0xFCFDBF,
];
const INFERNO: &[u32] = &[
    0x000004, 0x1F0C48, 0x550F6D, 0x88226A, 0xBA3655, 0xE35933, 0xF98E09, 0xF9CB35, 0xFCFFA4,
];
const CIVIDIS: &[u32] = &[
    0x00224E, 0x123570, 0x3B496C, 0x575D6D, 0x707173, 0x8A8779, 0xA69D75, 0xC4B56C, 0xFEE838,
];
const ROCKET: &[u32] = &[
    0x03051A, 0x36193E, 0x701F57, 0xAE1759, 0xE13342, 0xF37651, 0xF6B48F, 0xFAEBDD,
];
const MAKO: &[u32] = &[
    0x0B0405, 0x2E1E3C, 0x413D7B, 0x37659E, 0x348FA7, 0x40B7AD, 0x8AD9B1, 0xDEF5E5,
];

/// Every scheme name accepted by [`color_palette`], without `_r` variants.
pub const SCHEME_NAMES: &[&str] = &[
    "deep",
    "muted",
    "pastel",
    "bright",
    "dark",
    "colorblind",
    "tab10",
    "Set1",
    "Set2",
    "Set3",
    "Pastel1",
    "Pastel2",
    "Dark2",
    "Accent",
    "Paired",
    "hls",
    "husl",
    "viridis",
    "plasma",
    "magma",
    "inferno",
    "cividis",
    "rocket",
    "mako",
];

fn qualitative_table(name: &str) -> Option<&'static [u32]> {
    let table = match name {
        "deep" => DEEP,
        "muted" => MUTED,
        "pastel" => PASTEL,
        "bright" => BRIGHT,
        "dark" => DARK,
        "colorblind" => COLORBLIND,
        "tab10" => TAB10,
        "Set1" => SET1,
        "Set2" => SET2,
        "Set3" => SET3,
        "Pastel1" => PASTEL1,
        "Pastel2" => PASTEL2,
        "Dark2" => DARK2,
        "Accent" => ACCENT,
        "Paired" => PAIRED,
        _ => return None,
    };
    Some(table)
}

fn colormap_table(name: &str) -> Option<&'static [u32]> {
    let table = match name {
        "viridis" => VIRIDIS,
        "plasma" => PLASMA,
        "magma" => MAGMA,
        "inferno" => INFERNO,
        "cividis" => CIVIDIS,
        "rocket" => ROCKET,
        "mako" => MAKO,
        _ => return None,
    };
    Some(table)
}

fn rgb_from_hex(value: u32) -> Rgb {
    Rgb::new((value >> 16) as u8, (value >> 8) as u8, value as u8)
}

/// Base colors of a qualitative scheme, in scheme order.
pub fn qualitative(name: &str) -> Option<Vec<Rgb>> {
    qualitative_table(name).map(|table| {
        table
            .iter()
            .map(|&value| rgb_from_hex(value))
            .collect()
    })
}

/// Expand `name` to exactly `n_colors` colors.
///
/// Qualitative schemes cycle when more colors are requested than they hold.
/// Colormaps are sampled at `n_colors` evenly spaced interior points, so the
/// extreme ends are never used. A `_r` suffix reverses the scheme first.
pub fn color_palette(name: &str, n_colors: usize) -> Result<Vec<Rgb>> {
    let (base, reversed) = match name.strip_suffix("_r") {
        Some(base) => (base, true),
        None => (name, false),
    };

    let mut colors = if base == "hls" {
        hls_palette(n_colors, 0.01, 0.6, 0.65)
    } else if base == "husl" {
        husl_palette(n_colors, 0.01, 0.9, 0.65)
    } else if let Some(stops) = colormap_table(base) {
        sample_colormap(stops, n_colors)
    } else if let Some(colors) = qualitative(base) {
        colors
    } else {
        bail!(
            "unknown palette {name:?}; expected a .txt palette file or one of: {}",
            SCHEME_NAMES.join(", ")
        );
    };

    if reversed {
        colors.reverse();
    }

    Ok(colors.iter().copied().cycle().take(n_colors).collect())
}

/// `n` colors with evenly spaced hues in HLS space.
pub fn hls_palette(n: usize, hue_offset: f32, lightness: f32, saturation: f32) -> Vec<Rgb> {
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32 + hue_offset).rem_euclid(1.0);
            let (r, g, b) = hls_to_rgb(hue, lightness, saturation);
            Rgb::from_unit(r, g, b)
        })
        .collect()
}

/// Sample a colormap at `(i + 1) / (n + 1)` for `i` in `0..n`.
fn sample_colormap(stops: &[u32], n: usize) -> Vec<Rgb> {
    let last = stops.len().saturating_sub(1);
    (0..n)
        .map(|i| {
            let t = (i + 1) as f32 / (n + 1) as f32 * last as f32;
            let lower = (t.floor() as usize).min(last);
            let upper = (lower + 1).min(last);
            let frac = t - lower as f32;
            let (a, b) = (rgb_from_hex(stops[lower]), rgb_from_hex(stops[upper]));
            let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * frac) / 255.0;
            Rgb::from_unit(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b))
        })
        .collect()
}

/// `n` colors with evenly spaced hues in HSLuv space, so they share the same
/// perceived lightness. `saturation` and `lightness` are in `0.0..=1.0`.
pub fn husl_palette(n: usize, hue_offset: f32, saturation: f32, lightness: f32) -> Vec<Rgb> {
    (0..n)
        .map(|i| {
            let hue = (i as f64 / n as f64 + hue_offset as f64).rem_euclid(1.0) * 359.0;
            let (r, g, b) = hsluv::to_rgb(hue, saturation as f64 * 99.0, lightness as f64 * 99.0);
            Rgb::from_unit(r as f32, g as f32, b as f32)
        })
        .collect()
}

mod hsluv {
    const M: [[f64; 3]; 3] = [
        [3.240969941904521, -1.537383177570093, -0.498610760293],
        [-0.96924363628087, 1.87596750150772, 0.041555057407175],
        [0.055630079696993, -0.20397695888897, 1.056971514242878],
    ];
    const REF_U: f64 = 0.19783000664283;
    const REF_V: f64 = 0.46831999493879;
    const KAPPA: f64 = 903.2962962;
    const EPSILON: f64 = 0.0088564516;

    /// HSLuv (hue in degrees, saturation and lightness in `0..=100`) to sRGB.
    pub(super) fn to_rgb(h: f64, s: f64, l: f64) -> (f64, f64, f64) {
        let chroma = if l > 99.9999999 || l < 1e-8 {
            0.0
        } else {
            max_chroma(l, h) / 100.0 * s
        };
        let hrad = h.to_radians();
        let (u, v) = (chroma * hrad.cos(), chroma * hrad.sin());

        if l == 0.0 {
            return (0.0, 0.0, 0.0);
        }
        let var_u = u / (13.0 * l) + REF_U;
        let var_v = v / (13.0 * l) + REF_V;
        let y = if l > 8.0 {
            ((l + 16.0) / 116.0).powi(3)
        } else {
            l / KAPPA
        };
        let x = -(9.0 * y * var_u) / ((var_u - 4.0) * var_v - var_u * var_v);
        let z = (9.0 * y - 15.0 * var_v * y - var_v * x) / (3.0 * var_v);

        let channel = |row: [f64; 3]| from_linear(row[0] * x + row[1] * y + row[2] * z);
        (channel(M[0]), channel(M[1]), channel(M[2]))
    }

    fn from_linear(c: f64) -> f64 {
        let c = if c <= 0.0031308 {
            12.92 * c
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        };
        c.clamp(0.0, 1.0)
    }

    /// Largest chroma inside the sRGB gamut for lightness `l` and hue `h`.
    fn max_chroma(l: f64, h: f64) -> f64 {
        let hrad = h.to_radians();
        let sub1 = (l + 16.0).powi(3) / 1_560_896.0;
        let sub2 = if sub1 > EPSILON { sub1 } else { l / KAPPA };

        let mut min_length = f64::MAX;
        for [m1, m2, m3] in M {
            for t in [0.0, 1.0] {
                let top1 = (284_517.0 * m1 - 94_839.0 * m3) * sub2;
                let top2 = (838_422.0 * m3 + 769_860.0 * m2 + 731_718.0 * m1) * l * sub2
                    - 769_860.0 * t * l;
                let bottom = (632_260.0 * m3 - 126_452.0 * m2) * sub2 + 126_452.0 * t;
                let (slope, intercept) = (top1 / bottom, top2 / bottom);

                let length = intercept / (hrad.sin() - slope * hrad.cos());
                if length >= 0.0 {
                    min_length = min_length.min(length);
                }
            }
        }
        min_length
    }
}

fn hls_to_rgb(h: f32, l: f32, s: f32) -> (f32, f32, f32) {
    if s == 0.0 {
        return (l, l, l);
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    (
        hue_channel(m1, m2, h + 1.0 / 3.0),
        hue_channel(m1, m2, h),
        hue_channel(m1, m2, h - 1.0 / 3.0),
    )
}

fn hue_channel(m1: f32, m2: f32, hue: f32) -> f32 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_exactly_n_colors() {
        for name in SCHEME_NAMES {
            for n in [0, 1, 3, 25] {
                let colors = color_palette(name, n).unwrap();
                assert_eq!(colors.len(), n, "{name} with {n} colors");
            }
        }
    }

    #[test]
    fn pastel_starts_with_seaborn_blue() {
        let colors = color_palette("pastel", 2).unwrap();
        assert_eq!(colors[0].to_hex(), "#a1c9f4");
        assert_eq!(colors[1].to_hex(), "#ffb482");
    }

    #[test]
    fn qualitative_schemes_cycle() {
        let colors = color_palette("Set2", 10).unwrap();
        assert_eq!(colors[8], colors[0]);
        assert_eq!(colors[9], colors[1]);
    }

    #[test]
    fn reversed_suffix_flips_order() {
        let forward = color_palette("tab10", 10).unwrap();
        let mut reversed = color_palette("tab10_r", 10).unwrap();
        reversed.reverse();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn hls_colors_are_distinct() {
        let colors = color_palette("hls", 6).unwrap();
        for (i, a) in colors.iter().enumerate() {
            for b in colors.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn hls_conversion_matches_known_values() {
        let (r, g, b) = hls_to_rgb(0.0, 0.5, 1.0);
        assert_eq!(Rgb::from_unit(r, g, b), Rgb::new(255, 0, 0));

        let (r, g, b) = hls_to_rgb(0.3, 0.4, 0.0);
        assert_eq!((r, g, b), (0.4, 0.4, 0.4));
    }

    #[test]
    fn husl_and_colormaps_give_requested_count() {
        for name in [
            "husl", "viridis", "plasma", "magma", "inferno", "cividis", "rocket", "mako",
        ] {
            for n in [1, 3, 7, 40] {
                let colors = color_palette(name, n).unwrap();
                assert_eq!(colors.len(), n, "{name} with {n} colors");
            }
        }
    }

    #[test]
    fn colormaps_skip_the_extreme_ends() {
        let colors = color_palette("viridis", 1).unwrap();
        assert_eq!(colors[0], Rgb::new(0x21, 0x90, 0x8d));

        let colors = color_palette("viridis", 3).unwrap();
        assert_ne!(colors[0], Rgb::new(0x44, 0x01, 0x54));
        assert_ne!(colors[2], Rgb::new(0xfd, 0xe7, 0x25));
        assert_ne!(colors[0], colors[2]);
    }

    #[test]
    fn husl_colors_are_distinct_and_in_gamut() {
        let colors = color_palette("husl", 6).unwrap();
        for (i, a) in colors.iter().enumerate() {
            for b in colors.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        // Hue 0 in HSLuv is a pink-red: red dominates.
        let (r, g, b) = hsluv::to_rgb(0.0, 100.0, 50.0);
        assert!(r > g && r > b);
        let (r, g, b) = hsluv::to_rgb(120.0, 0.0, 100.0);
        assert!(r > 0.999 && g > 0.999 && b > 0.999);
    }

    #[test]
    fn unknown_scheme_is_an_error() {
        let err = color_palette("not_a_palette", 3).unwrap_err();
        assert!(err.to_string().contains("not_a_palette"));
    }

    #[test]
    fn matplotlib_names_are_case_sensitive() {
        assert!(color_palette("set1", 3).is_err());
        assert!(color_palette("Set1", 3).is_ok());
    }
}
