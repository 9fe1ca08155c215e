/// Formats a byte count with binary units.
///
/// # Example
///
/// ```
/// use tolito_utils::bytes::format_bytes;
///
/// let bytes = 1024_u64.pow(2);
/// let formatted = format_bytes(bytes, 2);
///
/// assert_eq!(formatted, "1.00 MiB");
/// ```
pub fn format_bytes(bytes: u64, precision: usize) -> String {
    const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{value:.precision$} {}", UNITS[unit])
}

/// Formats a duration in whole seconds as `MM:SS`, or `HH:MM:SS` past one hour.
pub fn format_eta(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
