use diarist_core::view::Controls;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::tui::app::{App, InputMode, Screen};

/// Bottom help bar showing context-sensitive key bindings.
pub struct HelpBar<'a> {
    pub screen: &'a Screen,
    pub input_mode: &'a InputMode,
    /// Conversation controls; only keys that are enabled are listed.
    pub controls: Controls,
    pub dictating: bool,
}

impl<'a> HelpBar<'a> {
    pub fn for_app(app: &'a App) -> Self {
        Self {
            screen: &app.screen,
            input_mode: &app.input_mode,
            controls: app.conversation.controls,
            dictating: app.dictating.is_some(),
        }
    }
}

fn keys(pairs: &[(&'static str, &'static str)]) -> Vec<Span<'static>> {
    let style = Style::default().fg(Color::DarkGray);
    let key_style = Style::default().fg(Color::Cyan);
    let mut spans = Vec::with_capacity(pairs.len() * 2);
    for (i, (key, desc)) in pairs.iter().enumerate() {
        spans.push(Span::styled(*key, key_style));
        let sep = if i + 1 < pairs.len() { "  " } else { "" };
        spans.push(Span::styled(format!(" {desc}{sep}"), style));
    }
    spans
}

impl Widget for HelpBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let spans = match (self.screen, self.input_mode) {
            (_, InputMode::Search) => keys(&[("Enter", "search"), ("Esc", "cancel")]),
            (_, InputMode::Instructions) => {
                keys(&[("Enter", "regenerate"), ("Esc", "cancel")])
            }
            (_, InputMode::ConfirmDiscard | InputMode::ConfirmDelete) => {
                keys(&[("y", "confirm"), ("any key", "cancel")])
            }
            (Screen::Conversation, _) => {
                let c = self.controls;
                let mut pairs = Vec::new();
                if c.can_start {
                    pairs.push(("s", "start"));
                }
                if c.can_record {
                    pairs.push(("r", "record"));
                }
                if c.can_stop {
                    pairs.push(("r", "stop"));
                }
                if c.can_complete {
                    pairs.push(("c", "complete"));
                }
                if c.can_save {
                    pairs.push(("e", "edit"));
                    pairs.push(("Ctrl+S", "save"));
                }
                if c.can_regenerate {
                    pairs.push(("g", "regenerate"));
                }
                if c.can_discard {
                    pairs.push(("d", "discard"));
                }
                pairs.push(("Tab", "section"));
                pairs.push(("q", "quit"));
                keys(&pairs)
            }
            (Screen::List, _) => keys(&[
                ("j/k", "navigate"),
                ("Enter", "open"),
                ("/", "search"),
                ("n/p", "page"),
                ("r", "refresh"),
                ("Tab", "section"),
                ("q", "quit"),
            ]),
            (Screen::Calendar, _) => keys(&[
                ("h/l", "month"),
                ("j/k", "navigate"),
                ("Enter", "open"),
                ("Tab", "section"),
                ("q", "quit"),
            ]),
            (Screen::Detail, _) => keys(&[
                ("j/k", "scroll"),
                ("PgUp/PgDn", "page"),
                ("e", "edit"),
                ("D", "delete"),
                ("Esc", "back"),
                ("q", "quit"),
            ]),
            (Screen::Edit, _) => {
                let dictate = if self.dictating {
                    ("Ctrl+R", "stop dictation")
                } else {
                    ("Ctrl+R", "dictate")
                };
                keys(&[
                    ("Tab", "next field"),
                    ("Shift+Tab", "prev field"),
                    dictate,
                    ("Ctrl+S", "save"),
                    ("Esc", "back"),
                ])
            }
        };

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
