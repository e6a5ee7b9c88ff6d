//! Display formatting for durations and shares

/// Format seconds as `"{h}h {m}m"`, dropping a zero segment.
/// Both segments are floored.
///
/// # Examples
/// ```
/// use wakastats::services::format::format_duration;
///
/// assert_eq!(format_duration(3661), "1h 1m");
/// assert_eq!(format_duration(59), "0m");
/// ```
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;

    if hours == 0 {
        format!("{}m", minutes)
    } else if minutes == 0 {
        format!("{}h", hours)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

/// Share of `value` in `total` with one decimal place. `"0.0%"` when total is 0.
///
/// An exact tie rounds up (`0.25` gives `"0.3%"`); `{:.1}` alone would round
/// it to even.
pub fn format_percentage(value: u64, total: u64) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    let share = (value as f64 / total as f64) * 100.0;

    // Only multiples of 0.25 can sit exactly halfway between two tenths
    let tenths = share * 10.0;
    if (share * 4.0).fract() == 0.0 && tenths.fract() == 0.5 {
        return format!("{:.1}%", tenths.ceil() / 10.0);
    }
    format!("{:.1}%", share)
}
