use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::{app::App, views::conversation::mood_color, widgets::help_bar::HelpBar};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref entry) = app.detail else {
        let text = if app.loading {
            "Loading..."
        } else {
            "No diary loaded."
        };
        let msg = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(msg, area);
        return;
    };

    let layout = Layout::vertical([
        Constraint::Length(2), // title
        Constraint::Length(1), // meta line
        Constraint::Min(5),    // content (scrollable)
        Constraint::Length(1), // help bar
    ])
    .split(area);

    let title = Paragraph::new(Line::from(Span::styled(
        format!(" {}", entry.title),
        Style::default().add_modifier(Modifier::BOLD),
    )))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(title, layout[0]);

    // Meta line: date | mood | created | id
    let sep = || Span::styled(" │ ", Style::default().fg(Color::DarkGray));
    let mut meta = vec![Span::styled(
        format!(
            " {}",
            entry
                .entry_date
                .map(|d| d.format("%A, %Y-%m-%d").to_string())
                .unwrap_or_else(|| "undated".into())
        ),
        Style::default().fg(Color::Cyan),
    )];
    if let Some(mood) = entry.mood {
        meta.push(sep());
        meta.push(Span::styled(
            mood.to_string(),
            Style::default().fg(mood_color(mood)),
        ));
    }
    if let Some(ref created) = entry.created_at {
        meta.push(sep());
        meta.push(Span::styled(
            format!("written {created}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    meta.push(sep());
    meta.push(Span::styled(
        entry.id.clone(),
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(Line::from(meta)), layout[1]);

    let lines: Vec<Line> = entry
        .content
        .lines()
        .map(|l| Line::from(l.to_string()))
        .collect();
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Diary (j/k to scroll) "),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));
    frame.render_widget(paragraph, layout[2]);

    frame.render_widget(HelpBar::for_app(app), layout[3]);
}
