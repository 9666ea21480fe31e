/// Human-readable formatting of byte and entry counts.
///
/// Sizes stay `u64` everywhere inside the crate; floating point appears
/// only here, at the display boundary.

/// Binary-unit thresholds with the short labels users expect from disk
/// tools. Decimals widen as the unit grows: whole bytes, one decimal for
/// KB/MB, two for GB and above.
const UNITS: [(u64, &str, usize); 4] = [
    (1 << 40, "TB", 2),
    (1 << 30, "GB", 2),
    (1 << 20, "MB", 1),
    (1 << 10, "KB", 1),
];

/// Format a byte count with an appropriate unit.
pub fn format_size(bytes: u64) -> String {
    for &(threshold, label, decimals) in &UNITS {
        if bytes >= threshold {
            let value = bytes as f64 / threshold as f64;
            return format!("{value:.decimals$} {label}");
        }
    }
    format!("{bytes} B")
}

/// Format an entry count with thousand separators.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let lead = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - lead) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
