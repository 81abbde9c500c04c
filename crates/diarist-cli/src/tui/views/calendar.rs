use chrono::{Datelike, NaiveDate};
use diarist_core::collection::shift_month;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::tui::{app::App, views::list::make_row, widgets::help_bar::HelpBar};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let layout = Layout::vertical([
        Constraint::Min(10),   // grid + entries
        Constraint::Length(1), // help bar
    ])
    .split(area);

    let [grid, entries] =
        Layout::horizontal([Constraint::Length(30), Constraint::Min(30)]).areas(layout[0]);

    render_grid(frame, app, grid);
    render_entries(frame, app, entries);

    frame.render_widget(HelpBar::for_app(app), layout[1]);
}

fn month_title(year: i32, month: u32) -> String {
    let name = MONTH_NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("?");
    format!("{name} {year}")
}

/// Day cells for a month, Monday first. `None` pads before the 1st.
fn month_cells(year: i32, month: u32) -> Vec<Option<NaiveDate>> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let (next_year, next_month) = shift_month(year, month, 1);
    let days = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map(|next| (next - first).num_days() as u32)
        .unwrap_or(31);

    let mut cells = vec![None; first.weekday().num_days_from_monday() as usize];
    cells.extend((1..=days).map(|d| NaiveDate::from_ymd_opt(year, month, d)));
    cells
}

fn render_grid(frame: &mut Frame, app: &App, area: Rect) {
    let (year, month) = app.calendar_month;
    let today = chrono::Local::now().date_naive();
    let selected_date = app
        .calendar_rows()
        .get(app.calendar_selected)
        .and_then(|r| r.entry_date);

    let mut lines = vec![Line::from(Span::styled(
        " Mo Tu We Th Fr Sa Su",
        Style::default().fg(Color::DarkGray),
    ))];

    let cells = month_cells(year, month);
    for week in cells.chunks(7) {
        let mut spans = vec![Span::raw(" ")];
        for cell in week {
            let Some(date) = cell else {
                spans.push(Span::raw("   "));
                continue;
            };
            let has_entries = app
                .calendar
                .as_ref()
                .is_some_and(|c| c.diaries_by_date.contains_key(date));
            let mut style = if has_entries {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            if *date == today {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            if Some(*date) == selected_date {
                style = style.bg(Color::Indexed(236)).fg(Color::White);
            }
            spans.push(Span::styled(format!("{:>2}", date.day()), style));
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
    }

    let grid = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" ◀ {} ▶ ", month_title(year, month))),
    );
    frame.render_widget(grid, area);
}

fn render_entries(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let Some(ref calendar) = app.calendar else {
        let text = if app.loading { "  Loading..." } else { "" };
        let msg = Paragraph::new(text)
            .style(Style::default().fg(Color::Yellow))
            .block(block.title(" Entries "));
        frame.render_widget(msg, area);
        return;
    };

    let rows: Vec<Row> = calendar
        .diaries_by_date
        .values()
        .flat_map(|rows| rows.iter().enumerate().map(|(i, row)| make_row(row, i == 0)))
        .collect();

    if rows.is_empty() {
        let msg = Paragraph::new("  No diaries this month.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block.title(" Entries (0) "));
        frame.render_widget(msg, area);
        return;
    }

    let widths = [
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Min(20),
        Constraint::Length(0),
    ];
    let table = Table::new(rows, widths)
        .block(block.title(format!(" Entries ({}) ", calendar.total())))
        .row_highlight_style(
            Style::default()
                .bg(Color::Indexed(236))
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    let mut state = TableState::default();
    state.select(Some(app.calendar_selected));
    frame.render_stateful_widget(table, area, &mut state);
}
