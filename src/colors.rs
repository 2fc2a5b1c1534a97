//! Region chart colors.
//!
//! Purely cosmetic: a region keeps the same color across indicators and
//! sessions. A few metros have hand-picked colors; every other code gets a
//! hue derived from a stable hash of the code.

/// Hand-picked colors for specific CBSA codes.
pub static COLOR_OVERRIDES: &[(&str, &str)] = &[
    ("35620", "#1f77b4"), // New York
    ("31080", "#ff7f0e"), // Los Angeles
    ("33100", "#17becf"), // Miami
    ("45300", "#2ca02c"), // Tampa
];

const SATURATION: f64 = 0.65;
const LIGHTNESS: f64 = 0.45;

/// Deterministic `#rrggbb` color for a region code.
pub fn region_color(code: &str) -> String {
    if let Some((_, color)) = COLOR_OVERRIDES.iter().find(|(c, _)| *c == code) {
        return color.to_string();
    }
    let hue = (hash_code(code) % 360) as f64;
    let (r, g, b) = hsl_to_rgb(hue, SATURATION, LIGHTNESS);
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// 32-bit FNV-1a. Stable across platforms and releases, unlike
/// `std::hash::DefaultHasher`.
fn hash_code(code: &str) -> u32 {
    code.bytes().fold(0x811c_9dc5u32, |hash, byte| {
        (hash ^ byte as u32).wrapping_mul(0x0100_0193)
    })
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = hue / 60.0;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_byte(r), to_byte(g), to_byte(b))
}
