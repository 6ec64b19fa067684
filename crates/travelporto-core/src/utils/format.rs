/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Minutes until an arrival, as shown next to it on a board.
pub fn format_eta(minutes: Option<i64>) -> String {
    match minutes {
        Some(m) if m <= 0 => "now".to_string(),
        Some(m) if m < 60 => format!("{} min", m),
        Some(m) => format!("{}h{:02}", m / 60, m % 60),
        None => "-".to_string(),
    }
}
