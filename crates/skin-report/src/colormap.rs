//! Sequential blue colour ramp for count heatmaps.

/// ColorBrewer "Blues" (9 classes), light to dark
const BLUES: [[u8; 3]; 9] = [
    [0xf7, 0xfb, 0xff],
    [0xde, 0xeb, 0xf7],
    [0xc6, 0xdb, 0xef],
    [0x9e, 0xca, 0xe1],
    [0x6b, 0xae, 0xd6],
    [0x42, 0x92, 0xc6],
    [0x21, 0x71, 0xb5],
    [0x08, 0x51, 0x9c],
    [0x08, 0x30, 0x6b],
];

/// Colour at position `t` in `[0, 1]` (clamped), interpolated between stops
pub fn blues(t: f64) -> [u8; 3] {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (BLUES.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(BLUES.len() - 1);
    let frac = scaled - lower as f64;

    let mut rgb = [0u8; 3];
    for (c, out) in rgb.iter_mut().enumerate() {
        let a = BLUES[lower][c] as f64;
        let b = BLUES[upper][c] as f64;
        *out = (a + (b - a) * frac).round() as u8;
    }
    rgb
}

/// Colour of a cell holding `count` out of a maximum of `max`
pub fn count_color(count: usize, max: usize) -> [u8; 3] {
    if max == 0 {
        return blues(0.0);
    }
    blues(count as f64 / max as f64)
}

/// `#rrggbb`
pub fn hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Dark cells get white annotations
pub fn is_dark(rgb: [u8; 3]) -> bool {
    let luminance = 0.299 * rgb[0] as f64 + 0.587 * rgb[1] as f64 + 0.114 * rgb[2] as f64;
    luminance < 140.0
}
