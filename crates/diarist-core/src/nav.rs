use serde::Serialize;

/// Top-level sections of the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    #[default]
    Conversation,
    Diaries,
    Calendar,
}

pub const ALL_SECTIONS: &[Section] = &[Section::Conversation, Section::Diaries, Section::Calendar];

impl Section {
    pub fn title(self) -> &'static str {
        match self {
            Self::Conversation => "Conversation",
            Self::Diaries => "My Diaries",
            Self::Calendar => "Calendar",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Conversation => 0,
            Self::Diaries => 1,
            Self::Calendar => 2,
        }
    }
}

/// Data to reload when a section is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    None,
    /// First page of the diary list.
    DiaryList,
    /// The month the calendar shows.
    CalendarMonth,
}

#[derive(Debug, Clone, Default)]
pub struct Navigator {
    current: Section,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Section {
        self.current
    }

    /// Enter `target` and return what it needs reloaded. Re-entering the
    /// current section refreshes it again.
    pub fn switch(&mut self, target: Section) -> Refresh {
        self.current = target;
        match target {
            Section::Conversation => Refresh::None,
            Section::Diaries => Refresh::DiaryList,
            Section::Calendar => Refresh::CalendarMonth,
        }
    }

    /// Cycle to the next tab.
    pub fn next(&mut self) -> Refresh {
        let i = (self.current.index() + 1) % ALL_SECTIONS.len();
        self.switch(ALL_SECTIONS[i])
    }

    pub fn prev(&mut self) -> Refresh {
        let i = (self.current.index() + ALL_SECTIONS.len() - 1) % ALL_SECTIONS.len();
        self.switch(ALL_SECTIONS[i])
    }

    /// A diary was saved: show the list so it appears.
    pub fn after_save(&mut self) -> Refresh {
        self.switch(Section::Diaries)
    }
}
