use diarist_core::model::{group_by_date, DiarySummary};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use crate::tui::{
    app::{App, InputMode},
    views::conversation::mood_color,
    widgets::{help_bar::HelpBar, text_input::TextInput},
};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let layout = Layout::vertical([
        Constraint::Length(3), // search bar
        Constraint::Min(5),    // table
        Constraint::Length(1), // help bar
    ])
    .split(area);

    frame.render_widget(
        TextInput {
            text: &app.search.text,
            cursor: app.search.cursor,
            focused: app.input_mode == InputMode::Search,
            label: "Search",
            hint: "press /",
        },
        layout[0],
    );

    render_table(frame, app, layout[1]);

    frame.render_widget(HelpBar::for_app(app), layout[2]);
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    if app.loading && app.page.is_none() {
        let loading = Line::from(vec![Span::styled(
            "  Loading...",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )]);
        frame.render_widget(loading, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from("Date"),
        Cell::from("Mood"),
        Cell::from("Title"),
        Cell::from("Preview"),
    ])
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .bottom_margin(1);

    let rows: Vec<Row> = if app.active_query.is_some() {
        app.search_results
            .iter()
            .map(|row| make_row(row, true))
            .collect()
    } else {
        let diaries = app.page.as_ref().map(|p| p.diaries.as_slice()).unwrap_or(&[]);
        // Date shown once per group
        group_by_date(diaries)
            .iter()
            .flat_map(|(_, rows)| {
                rows.iter()
                    .enumerate()
                    .map(|(i, row)| make_row(row, i == 0))
            })
            .collect()
    };

    let is_empty = rows.is_empty();
    let rows = if is_empty {
        let hint = if app.active_query.is_some() {
            "  No diaries match. Press Esc to clear the search."
        } else {
            "  No diaries yet. Talk about your day in the Conversation tab."
        };
        vec![Row::new(vec![Cell::from(Span::styled(
            hint,
            Style::default().fg(Color::DarkGray),
        ))])]
    } else {
        rows
    };

    let widths = [
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Percentage(35),
        Constraint::Min(20),
    ];

    let title = match (&app.active_query, &app.page) {
        (Some(q), _) => format!(" Results for \"{}\" ({}) ", q, app.search_results.len()),
        (None, Some(page)) => format!(
            " My Diaries ({}) · page {}/{} ",
            page.total,
            page.page,
            page.pages.max(1)
        ),
        (None, None) => " My Diaries ".to_string(),
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(title),
        )
        .row_highlight_style(
            Style::default()
                .bg(Color::Indexed(236)) // subtle dark bg (#303030)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    let mut state = TableState::default();
    if !is_empty {
        state.select(Some(app.selected));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

pub fn make_row(row: &DiarySummary, show_date: bool) -> Row<'static> {
    let date = match (show_date, row.entry_date) {
        (true, Some(d)) => d.format("%Y-%m-%d").to_string(),
        (true, None) => "undated".to_string(),
        (false, _) => String::new(),
    };
    let date_cell = Cell::from(Span::styled(date, Style::default().fg(Color::Cyan)));

    let mood_cell = match row.mood {
        Some(mood) => Cell::from(Span::styled(
            mood.to_string(),
            Style::default().fg(mood_color(mood)),
        )),
        None => Cell::from(Span::styled("—", Style::default().fg(Color::DarkGray))),
    };

    let title_cell = Cell::from(truncate(&row.title, 60));
    let preview_cell = Cell::from(Span::styled(
        truncate(&row.preview, 80),
        Style::default().fg(Color::DarkGray),
    ));

    Row::new(vec![date_cell, mood_cell, title_cell, preview_cell])
}

/// Cut to `max` chars, marking the cut with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max - 1).collect();
        format!("{head}…")
    } else {
        text.to_string()
    }
}
