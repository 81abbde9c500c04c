use diarist_core::model::ALL_MOODS;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::{
    app::{App, EditTarget, FIELD_CONTENT, FIELD_DATE, FIELD_MOOD, FIELD_TITLE},
    views::conversation::mood_color,
    widgets::help_bar::HelpBar,
};

fn border(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref form) = app.edit else {
        return;
    };

    let layout = Layout::vertical([
        Constraint::Length(3), // Title input
        Constraint::Min(5),    // Content input
        Constraint::Length(3), // Mood + date
        Constraint::Length(1), // Help bar
    ])
    .split(area);

    let heading = match form.target {
        EditTarget::Draft => "Draft",
        EditTarget::Diary(_) => "Diary",
    };
    let recording = |field: usize| {
        if app.dictating.is_some() && form.field == field {
            " ● dictating"
        } else {
            ""
        }
    };

    // Title field
    let title_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border(form.field == FIELD_TITLE))
        .title(format!(" {heading} title{} ", recording(FIELD_TITLE)));
    frame.render_widget(
        Paragraph::new(form.title.as_str()).block(title_block),
        layout[0],
    );

    if form.field == FIELD_TITLE {
        let cursor_x = layout[0].x + 1 + form.title.chars().count() as u16;
        let cursor_y = layout[0].y + 1;
        frame.set_cursor_position((cursor_x.min(layout[0].right() - 2), cursor_y));
    }

    // Content field
    let content_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border(form.field == FIELD_CONTENT))
        .title(format!(" Content{} ", recording(FIELD_CONTENT)));
    frame.render_widget(
        Paragraph::new(form.content.as_str())
            .block(content_block)
            .wrap(Wrap { trim: false }),
        layout[1],
    );

    if form.field == FIELD_CONTENT {
        // Approximate cursor position for content (last line)
        let inner_width = layout[1].width.saturating_sub(2) as usize;
        if inner_width > 0 {
            let last_line = form.content.split('\n').next_back().unwrap_or("");
            let line_count = form.content.split('\n').count().max(1);
            let cursor_x = layout[1].x + 1 + (last_line.chars().count() % inner_width) as u16;
            let cursor_y = layout[1].y + 1 + (line_count as u16).saturating_sub(1);
            frame.set_cursor_position((
                cursor_x.min(layout[1].right() - 2),
                cursor_y.min(layout[1].bottom() - 2),
            ));
        }
    }

    let [mood_area, date_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
            .areas(layout[2]);

    // Mood selector
    let mut mood_spans = vec![Span::styled(" < ", Style::default().fg(Color::DarkGray))];
    for mood in ALL_MOODS {
        let style = if *mood == form.mood {
            Style::default()
                .fg(mood_color(*mood))
                .add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        mood_spans.push(Span::styled(format!(" {mood} "), style));
    }
    mood_spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    let mood_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border(form.field == FIELD_MOOD))
        .title(" Mood (↑/↓) ");
    frame.render_widget(
        Paragraph::new(Line::from(mood_spans)).block(mood_block),
        mood_area,
    );

    // Date field
    let date_valid = form.parse_date().is_ok();
    let date_block = Block::default()
        .borders(Borders::ALL)
        .border_style(if date_valid {
            border(form.field == FIELD_DATE)
        } else {
            Style::default().fg(Color::Red)
        })
        .title(" Date (YYYY-MM-DD) ");
    frame.render_widget(
        Paragraph::new(form.date.as_str()).block(date_block),
        date_area,
    );

    if form.field == FIELD_DATE {
        let cursor_x = date_area.x + 1 + form.date.len() as u16;
        frame.set_cursor_position((cursor_x.min(date_area.right() - 2), date_area.y + 1));
    }

    frame.render_widget(HelpBar::for_app(app), layout[3]);
}
