//! Number formatting for method descriptions.

/// `0.0812` -> `8.1%` at one place.
pub fn pct(fraction: f64, places: usize) -> String {
    format!("{:.*}%", places, fraction * 100.0)
}

/// Like [`pct`] but always signed: `+0.500%`.
pub fn signed_pct(fraction: f64, places: usize) -> String {
    format!("{:+.*}%", places, fraction * 100.0)
}

/// Whole number with comma thousands separators: `1234567.4` -> `1,234,567`.
pub fn thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value);
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };

    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("{sign}{out}")
}
