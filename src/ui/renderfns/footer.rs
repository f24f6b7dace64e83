use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar: pagination controls on the left, a status message on
/// the right side of them
pub fn draw_footer(
  frame: &mut Frame,
  area: Rect,
  has_previous: bool,
  has_next: bool,
  status: Option<Span<'static>>,
) {
  let control = |label: &'static str, enabled: bool| {
    let style = if enabled {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::DarkGray)
    };
    Span::styled(label, style)
  };

  let mut spans = vec![
    Span::raw(" "),
    control("◀ prev", has_previous),
    Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
    control("next ▶", has_next),
  ];

  if let Some(status) = status {
    spans.push(Span::raw("   "));
    spans.push(status);
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}
