//! Browsing and editing stored diaries.

use chrono::{Datelike, NaiveDate};

use crate::api::DiaryApi;
use crate::error::{DiaristError, Result};
use crate::model::*;

/// Loaded diary list, calendar month, search results and open entry.
#[derive(Debug)]
pub struct DiaryCollection {
    user_id: Option<String>,
    page_size: usize,
    page: Option<DiaryPage>,
    calendar: Option<CalendarMonth>,
    search_query: String,
    search_results: Vec<DiarySummary>,
    open: Option<DiaryEntry>,
    status: String,
    redirect: Option<String>,
}

/// Move `(year, month)` by `delta` months, wrapping the year.
/// A year that would leave `i32` keeps the input month, clamped to 1..=12.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = i64::from(year) * 12 + i64::from(month) - 1 + i64::from(delta);
    match i32::try_from(index.div_euclid(12)) {
        Ok(shifted) => (shifted, (index.rem_euclid(12) + 1) as u32),
        Err(_) => (year, month.clamp(1, 12)),
    }
}

impl DiaryCollection {
    pub fn new(user_id: Option<String>, page_size: usize) -> Self {
        Self {
            user_id: user_id.filter(|u| !u.trim().is_empty()),
            page_size: page_size.max(1),
            page: None,
            calendar: None,
            search_query: String::new(),
            search_results: Vec::new(),
            open: None,
            status: String::new(),
            redirect: None,
        }
    }

    pub fn page(&self) -> Option<&DiaryPage> {
        self.page.as_ref()
    }

    /// Rows of the loaded page grouped by date, newest first.
    pub fn grouped(&self) -> Vec<(Option<NaiveDate>, Vec<DiarySummary>)> {
        self.page
            .as_ref()
            .map(|p| group_by_date(&p.diaries))
            .unwrap_or_default()
    }

    pub fn calendar(&self) -> Option<&CalendarMonth> {
        self.calendar.as_ref()
    }

    /// Month shown by the calendar, or the current month before any load.
    pub fn calendar_month(&self) -> (i32, u32) {
        match self.calendar {
            Some(ref c) => (c.year, c.month),
            None => {
                let today = chrono::Local::now().date_naive();
                (today.year(), today.month())
            }
        }
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn search_results(&self) -> &[DiarySummary] {
        &self.search_results
    }

    pub fn open_entry(&self) -> Option<&DiaryEntry> {
        self.open.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    fn ensure_live(&self) -> Result<()> {
        match self.redirect {
            Some(ref login_url) => Err(DiaristError::SessionExpired {
                login_url: login_url.clone(),
            }),
            None => Ok(()),
        }
    }

    fn require_user(&mut self) -> Result<String> {
        self.ensure_live()?;
        match self.user_id {
            Some(ref u) => Ok(u.clone()),
            None => {
                self.status = "No user id in session.".to_string();
                Err(DiaristError::Validation("no user id in session".into()))
            }
        }
    }

    fn fail(&mut self, err: DiaristError, status: &str) -> DiaristError {
        if let DiaristError::SessionExpired { ref login_url } = err {
            tracing::warn!(login_url = %login_url, "session expired, redirecting");
            self.redirect = Some(login_url.clone());
        } else {
            tracing::warn!("{status} {err}");
            self.status = status.to_string();
        }
        err
    }

    /// Load one page of the diary list. Pages start at 1.
    pub async fn load_page<A: DiaryApi>(&mut self, api: &A, page: usize) -> Result<&DiaryPage> {
        let user_id = self.require_user()?;
        let page = page.max(1);
        match api.list_diaries(&user_id, page, self.page_size).await {
            Ok(loaded) => {
                tracing::debug!(page, rows = loaded.diaries.len(), "diary page loaded");
                self.status.clear();
                Ok(self.page.insert(loaded))
            }
            Err(e) => Err(self.fail(e, "Failed to load diaries.")),
        }
    }

    /// Reload the current page, or the first one.
    pub async fn reload<A: DiaryApi>(&mut self, api: &A) -> Result<&DiaryPage> {
        let page = self.page.as_ref().map_or(1, |p| p.page);
        self.load_page(api, page).await
    }

    pub async fn load_calendar<A: DiaryApi>(
        &mut self,
        api: &A,
        year: i32,
        month: u32,
    ) -> Result<&CalendarMonth> {
        if !(1..=12).contains(&month) {
            return Err(DiaristError::Validation(format!("invalid month: {month}")));
        }
        let user_id = self.require_user()?;
        match api.calendar(&user_id, year, month).await {
            Ok(loaded) => {
                self.status.clear();
                Ok(self.calendar.insert(loaded))
            }
            Err(e) => Err(self.fail(e, "Failed to load calendar.")),
        }
    }

    /// Load the month `delta` months away from the one shown.
    pub async fn shift_calendar<A: DiaryApi>(
        &mut self,
        api: &A,
        delta: i32,
    ) -> Result<&CalendarMonth> {
        let (year, month) = self.calendar_month();
        let (year, month) = shift_month(year, month, delta);
        self.load_calendar(api, year, month).await
    }

    /// Search diaries. A blank query clears the results without a request.
    pub async fn search<A: DiaryApi>(&mut self, api: &A, query: &str) -> Result<&[DiarySummary]> {
        self.ensure_live()?;
        let query = query.trim();
        if query.is_empty() {
            self.search_query.clear();
            self.search_results.clear();
            return Ok(&self.search_results);
        }
        let user_id = self.require_user()?;
        match api.search(&user_id, query).await {
            Ok(rows) => {
                self.search_query = query.to_string();
                self.search_results = rows;
                self.status.clear();
                Ok(&self.search_results)
            }
            Err(e) => Err(self.fail(e, "Search failed.")),
        }
    }

    pub async fn open<A: DiaryApi>(&mut self, api: &A, id: &str) -> Result<&DiaryEntry> {
        self.ensure_live()?;
        match api.get_diary(id).await {
            Ok(entry) => Ok(self.open.insert(entry)),
            Err(e) => Err(self.fail(e, "Failed to load diary.")),
        }
    }

    /// Update a diary. The input is validated before any request.
    pub async fn update<A: DiaryApi>(
        &mut self,
        api: &A,
        id: &str,
        input: &UpdateDiaryInput,
    ) -> Result<&DiaryEntry> {
        self.ensure_live()?;
        input.validate()?;
        match api.update_diary(id, input).await {
            Ok(entry) => {
                let summary = DiarySummary::from(&entry);
                self.for_each_row(|row| {
                    if row.id == summary.id {
                        *row = summary.clone();
                    }
                });
                self.status = "Diary updated.".to_string();
                tracing::info!(diary = %entry.id, "diary updated");
                Ok(self.open.insert(entry))
            }
            Err(e) => Err(self.fail(e, "Failed to update diary.")),
        }
    }

    /// Delete a diary after confirmation. Returns `false` when not confirmed.
    pub async fn delete<A: DiaryApi>(&mut self, api: &A, id: &str, confirmed: bool) -> Result<bool> {
        self.ensure_live()?;
        if !confirmed {
            return Ok(false);
        }
        match api.delete_diary(id).await {
            Ok(()) => {
                self.remove_rows(id);
                if self.open.as_ref().is_some_and(|e| e.id == id) {
                    self.open = None;
                }
                self.status = "Diary deleted.".to_string();
                tracing::info!(diary = %id, "diary deleted");
                Ok(true)
            }
            Err(e) => Err(self.fail(e, "Failed to delete diary.")),
        }
    }

    fn for_each_row(&mut self, mut f: impl FnMut(&mut DiarySummary)) {
        if let Some(ref mut page) = self.page {
            page.diaries.iter_mut().for_each(&mut f);
        }
        self.search_results.iter_mut().for_each(&mut f);
        if let Some(ref mut cal) = self.calendar {
            cal.diaries_by_date
                .values_mut()
                .flat_map(|rows| rows.iter_mut())
                .for_each(&mut f);
        }
    }

    fn remove_rows(&mut self, id: &str) {
        if let Some(ref mut page) = self.page {
            let before = page.diaries.len();
            page.diaries.retain(|r| r.id != id);
            let removed = before - page.diaries.len();
            page.total = page.total.saturating_sub(removed);
        }
        self.search_results.retain(|r| r.id != id);
        if let Some(ref mut cal) = self.calendar {
            for rows in cal.diaries_by_date.values_mut() {
                rows.retain(|r| r.id != id);
            }
            cal.diaries_by_date.retain(|_, rows| !rows.is_empty());
        }
    }
}
