//! Human-readable formatting helpers for terminal output

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Meters with no decimals, or `-` when unknown
pub fn format_meters(value: Option<f64>) -> String {
    match value {
        Some(m) => format!("{:.0} m", m),
        None => "-".to_string(),
    }
}

/// `lat, lng` pair with 5 decimals (about a meter), or `-` when unknown
pub fn format_coordinate(lat: Option<f64>, lng: Option<f64>) -> String {
    match (lat, lng) {
        (Some(lat), Some(lng)) => format!("{:.5}, {:.5}", lat, lng),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.00 MB");
    }

    #[test]
    fn test_format_meters() {
        assert_eq!(format_meters(Some(1234.4)), "1234 m");
        assert_eq!(format_meters(None), "-");
    }

    #[test]
    fn test_format_coordinate() {
        assert_eq!(format_coordinate(Some(45.0), Some(6.123456)), "45.00000, 6.12346");
        assert_eq!(format_coordinate(Some(45.0), None), "-");
    }
}
