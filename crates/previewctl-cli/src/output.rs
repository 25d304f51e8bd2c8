//! Text helpers for `pvw` command output.

/// Binary units above bytes, smallest first.
const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];

/// Renders a file size in binary units, e.g. `4 B` or `2.0 KiB`.
///
/// Sizes beyond the largest unit stay in GiB.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for &next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

/// Hides all but the last four characters of a secret.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{tail}", "*".repeat(count - 4))
}

/// A horizontal double rule of the given width.
#[must_use]
pub fn rule(width: usize) -> String {
    "\u{2550}".repeat(width)
}
