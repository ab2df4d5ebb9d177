//! Number formatting for cards. Missing values render as "N/A".

pub const NA: &str = "N/A";

pub fn fixed(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", decimals, v),
        _ => NA.to_string(),
    }
}

/// Scale a ratio by 100 and append '%'.
pub fn percent(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}%", decimals, v * 100.0),
        _ => NA.to_string(),
    }
}

pub fn dollars(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("${:.2}", v),
        _ => NA.to_string(),
    }
}

pub fn count(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| NA.to_string())
}

pub fn text(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or(NA).to_string()
}

/// Whole days; fractional values keep one decimal.
pub fn days(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() && v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) if v.is_finite() => format!("{:.1}", v),
        _ => NA.to_string(),
    }
}
