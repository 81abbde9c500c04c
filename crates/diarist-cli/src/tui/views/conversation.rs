use diarist_core::model::{DiaryDraft, Mood, Role};
use diarist_core::workflow::WorkflowState;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::{
    app::{App, InputMode},
    widgets::{help_bar::HelpBar, text_input::TextInput},
};

pub fn render(frame: &mut Frame, app: &App, area: Rect, backend_info: &str, capture_info: &str) {
    let prompt_height = if app.input_mode == InputMode::Instructions {
        3
    } else {
        0
    };
    let layout = Layout::vertical([
        Constraint::Length(3),             // status
        Constraint::Min(5),                // transcript + draft
        Constraint::Length(prompt_height), // regenerate instructions
        Constraint::Length(1),             // help bar
    ])
    .split(area);

    render_status(frame, app, layout[0], backend_info, capture_info);

    match app.conversation.draft {
        Some(ref draft) => {
            let [left, right] =
                Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)])
                    .areas(layout[1]);
            render_transcript(frame, app, left);
            render_draft(frame, draft, right);
        }
        None => render_transcript(frame, app, layout[1]),
    }

    if app.input_mode == InputMode::Instructions {
        frame.render_widget(
            TextInput {
                text: &app.instructions.text,
                cursor: app.instructions.cursor,
                focused: true,
                label: "Extra instructions",
                hint: "g",
            },
            layout[2],
        );
    }

    frame.render_widget(HelpBar::for_app(app), layout[3]);
}

fn state_style(state: WorkflowState) -> (&'static str, Color) {
    match state {
        WorkflowState::Idle => ("○ idle", Color::DarkGray),
        WorkflowState::Started => ("◆ listening", Color::Green),
        WorkflowState::Recording => ("● recording", Color::Red),
        WorkflowState::Uploading => ("⟳ uploading", Color::Yellow),
        WorkflowState::Completing => ("⟳ writing diary", Color::Yellow),
        WorkflowState::Previewing => ("✎ review draft", Color::Cyan),
        WorkflowState::Saved => ("✓ saved", Color::Green),
        WorkflowState::Discarded => ("✗ discarded", Color::DarkGray),
    }
}

fn render_status(frame: &mut Frame, app: &App, area: Rect, backend_info: &str, capture_info: &str) {
    let (label, color) = state_style(app.conversation.state);
    let mut spans = vec![
        Span::styled(
            format!(" {label} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled("│ ", Style::default().fg(Color::DarkGray)),
        Span::raw(app.conversation.status.clone()),
    ];
    if let Some(ref id) = app.last_saved {
        spans.push(Span::styled(
            format!("  (last saved: {id})"),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let status = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" {backend_info} · mic: {capture_info} ")),
    );
    frame.render_widget(status, area);
}

fn render_transcript(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    if app.conversation.transcript.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No conversation yet. Press s to start, then r to talk.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for message in &app.conversation.transcript {
        let (who, color) = match message.role {
            Role::Ai => ("Diarist", Color::Magenta),
            Role::User => ("You", Color::Cyan),
        };
        lines.push(Line::from(Span::styled(
            format!("{who}:"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        for text in message.text.lines() {
            lines.push(Line::from(format!("  {text}")));
        }
        lines.push(Line::from(""));
    }

    // Keep the newest messages in view
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(visible) as u16;

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(format!(
                    " Conversation ({}) ",
                    app.conversation.transcript.len()
                )),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

pub fn mood_color(mood: Mood) -> Color {
    match mood {
        Mood::Positive => Color::Green,
        Mood::Neutral => Color::Yellow,
        Mood::Negative => Color::Red,
    }
}

fn render_draft(frame: &mut Frame, draft: &DiaryDraft, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            draft.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(
                draft.entry_date.format("%Y-%m-%d").to_string(),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(" │ ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                draft.mood.to_string(),
                Style::default().fg(mood_color(draft.mood)),
            ),
        ]),
        Line::from(""),
    ];
    for text in draft.content.lines() {
        lines.push(Line::from(text.to_string()));
    }
    if let Some(ref summary) = draft.summary {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "─── Summary ───",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            summary.clone(),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Draft "),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
