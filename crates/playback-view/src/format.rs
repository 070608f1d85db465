/// Format seconds as `M:SS` for the time row.
///
/// Non-finite and negative inputs render as `0:00`.
pub fn format_elapsed(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total_secs = seconds.floor() as u64;
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{mins}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_padded_seconds() {
        assert_eq!(format_elapsed(65.0), "1:05");
        assert_eq!(format_elapsed(5.0), "0:05");
        assert_eq!(format_elapsed(600.0), "10:00");
    }

    #[test]
    fn floors_fractional_seconds() {
        assert_eq!(format_elapsed(59.999), "0:59");
        assert_eq!(format_elapsed(0.4), "0:00");
    }

    #[test]
    fn invalid_input_is_zero() {
        assert_eq!(format_elapsed(f64::NAN), "0:00");
        assert_eq!(format_elapsed(-3.0), "0:00");
        assert_eq!(format_elapsed(f64::INFINITY), "0:00");
    }

    #[test]
    fn minutes_are_not_capped_at_an_hour() {
        assert_eq!(format_elapsed(3725.0), "62:05");
    }
}
