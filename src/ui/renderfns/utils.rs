use chrono::TimeDelta;

/// Truncate a string to at most `max_len` characters, ending in "..." if
/// anything was cut
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else if max_len <= 3 {
    s.chars().take(max_len).collect()
  } else {
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{}...", kept)
  }
}

/// Truncate or pad with spaces to exactly `width` characters
pub fn fit(s: &str, width: usize) -> String {
  format!("{:<width$}", truncate(s, width), width = width)
}

/// Short human form of an age, e.g. "5m ago"
pub fn format_age(age: TimeDelta) -> String {
  let minutes = age.num_minutes();
  if minutes < 1 {
    "just now".to_string()
  } else if minutes < 60 {
    format!("{}m ago", minutes)
  } else if age.num_hours() < 24 {
    format!("{}h ago", age.num_hours())
  } else {
    format!("{}d ago", age.num_days())
  }
}
