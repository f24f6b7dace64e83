use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// A key hint shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
  pub key: char,
  pub label: &'static str,
  pub enabled: bool,
}

/// Draw the header bar with title, API domain and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, title: &str, api_url: &str, shortcuts: &[Shortcut]) {
  let domain = extract_domain(api_url);

  let mut spans = vec![
    Span::styled(format!(" {} ", title), Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", domain), Style::default().fg(Color::White)),
    Span::raw(" "),
  ];

  // Keys and brackets highlighted, descriptions dimmed; disabled keys dimmed too
  for shortcut in shortcuts {
    let key_style = if shortcut.enabled {
      Style::default().fg(Color::Cyan)
    } else {
      Style::default().fg(Color::DarkGray)
    };
    spans.push(Span::raw("  "));
    spans.push(Span::styled(format!("<{}>", shortcut.key), key_style));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

/// Host part of an API URL
pub fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_domain() {
    assert_eq!(extract_domain("https://swapi.dev/api/people"), "swapi.dev");
    assert_eq!(extract_domain("http://localhost:8080"), "localhost:8080");
    assert_eq!(extract_domain("swapi.dev"), "swapi.dev");
  }
}
