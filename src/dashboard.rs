//! Admin dashboard state.
//!
//! All list rendering is derived from one `DashboardState`: the last fetched
//! records, the search query, the open modal and any deletes still in flight.
//! Filtering and ordering are recomputed on every render, so the display
//! order does not depend on which store produced the list.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::visitor::timestamp_token;
use crate::models::{HeardVia, Visitor, YesNo};
use crate::store::DeleteOutcome;

/// Delay before re-fetching the list after an optimistic delete.
pub const RECONCILE_DELAY: Duration = Duration::from_secs(2);
/// How long a delete notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

const EXCERPT_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Banner shown above the visitor list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl DeleteOutcome {
    /// Message the client shows once the delete endpoint has answered.
    pub fn notice(self) -> Notice {
        match self {
            DeleteOutcome::HardDelete => Notice::new(NoticeLevel::Success, "記錄已成功刪除"),
            DeleteOutcome::SoftDelete => Notice::new(NoticeLevel::Success, "記錄已標記為刪除"),
            DeleteOutcome::SimulatedDelete => Notice::new(
                NoticeLevel::Warning,
                "刪除操作已記錄，請手動從 Google Sheets 中移除此記錄",
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalMode {
    Add,
    Edit,
}

/// The shared add/edit form.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalForm {
    pub mode: ModalMode,
    pub visitor: Visitor,
}

impl ModalForm {
    /// Blank form with a fresh id and the usual defaults.
    pub fn add(now: DateTime<Utc>) -> Self {
        Self {
            mode: ModalMode::Add,
            visitor: Visitor {
                id: timestamp_token(now),
                how_did_you_hear: HeardVia::FriendFamily,
                is_first_visit: YesNo::Yes,
                wants_contact: YesNo::No,
                ..Visitor::default()
            },
        }
    }

    pub fn edit(visitor: &Visitor) -> Self {
        let mut visitor = visitor.clone();
        if visitor.how_did_you_hear == HeardVia::Unspecified {
            visitor.how_did_you_hear = HeardVia::FriendFamily;
        }
        Self {
            mode: ModalMode::Edit,
            visitor,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            ModalMode::Add => "新增留名紀錄",
            ModalMode::Edit => "編輯留名紀錄",
        }
    }

    /// HTTP verb of the JSON endpoint the form maps onto.
    pub fn submit_method(&self) -> &'static str {
        match self.mode {
            ModalMode::Add => "POST",
            ModalMode::Edit => "PUT",
        }
    }

    /// Dashboard route the form posts to.
    pub fn action(&self) -> &'static str {
        match self.mode {
            ModalMode::Add => "/admin/dashboard/add",
            ModalMode::Edit => "/admin/dashboard/edit",
        }
    }

    pub fn shows_other_field(&self) -> bool {
        self.visitor.how_did_you_hear == HeardVia::Other
    }

    pub fn validate(&self) -> Result<(), Notice> {
        if self.visitor.name.trim().is_empty() {
            return Err(Notice::new(NoticeLevel::Error, "姓名為必填欄位。"));
        }
        Ok(())
    }

    pub fn options(&self) -> Vec<SelectOption> {
        HeardVia::OPTIONS
            .iter()
            .map(|option| SelectOption {
                value: option.as_str(),
                label: option.label(),
                selected: *option == self.visitor.how_did_you_hear,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// One rendered table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub first_visit: &'static str,
    pub wants_contact: bool,
    pub prayer_request: String,
    pub prayer_excerpt: String,
    pub editable: bool,
    pub pending_delete: bool,
}

fn yes_no_label(value: YesNo) -> &'static str {
    if value.is_yes() { "是" } else { "否" }
}

fn excerpt(text: &str) -> String {
    if text.is_empty() {
        return "無".to_string();
    }
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Follow-up the caller should run after an optimistic delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconcile {
    pub after: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    visitors: Vec<Visitor>,
    search: String,
    modal: Option<ModalForm>,
    pending_deletes: HashSet<String>,
    notice: Option<Notice>,
}

impl DashboardState {
    pub fn new(visitors: Vec<Visitor>) -> Self {
        Self {
            visitors,
            ..Self::default()
        }
    }

    pub fn visitors(&self) -> &[Visitor] {
        &self.visitors
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: &str) {
        self.search = query.trim().to_lowercase();
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn modal(&self) -> Option<&ModalForm> {
        self.modal.as_ref()
    }

    /// Records matching the search, newest first. Rows without a name are
    /// never shown.
    pub fn visible(&self) -> Vec<&Visitor> {
        let mut rows: Vec<&Visitor> = self
            .visitors
            .iter()
            .filter(|v| !v.name.is_empty() && v.matches(&self.search))
            .collect();
        rows.sort_by(|a, b| {
            (b.created_at_utc(), b.id.as_str()).cmp(&(a.created_at_utc(), a.id.as_str()))
        });
        rows
    }

    pub fn rows(&self) -> Vec<RowView> {
        self.visible()
            .into_iter()
            .map(|v| RowView {
                id: v.id.clone(),
                name: v.name.clone(),
                phone: v.phone.clone(),
                email: v.email.clone(),
                first_visit: yes_no_label(v.is_first_visit),
                wants_contact: v.wants_contact.is_yes(),
                prayer_request: v.prayer_request.clone(),
                prayer_excerpt: excerpt(&v.prayer_request),
                editable: !v.id.is_empty(),
                pending_delete: self.pending_deletes.contains(&v.id),
            })
            .collect()
    }

    pub fn load_failed(&mut self, message: &str) {
        self.notice = Some(Notice::new(
            NoticeLevel::Error,
            format!("無法讀取訪客紀錄：{message}"),
        ));
    }

    pub fn open_add(&mut self, now: DateTime<Utc>) {
        self.modal = Some(ModalForm::add(now));
    }

    /// Returns false when the id is blank or unknown.
    pub fn open_edit(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        match self.visitors.iter().find(|v| v.id == id) {
            Some(visitor) => {
                self.modal = Some(ModalForm::edit(visitor));
                true
            }
            None => false,
        }
    }

    /// Keeps a rejected submission open with its error.
    pub fn reject_form(&mut self, form: ModalForm, notice: Notice) {
        self.modal = Some(form);
        self.notice = Some(notice);
    }

    /// Dims the row while the delete request is in flight.
    pub fn begin_delete(&mut self, id: &str) -> bool {
        if id.is_empty() || !self.visitors.iter().any(|v| v.id == id) {
            return false;
        }
        self.pending_deletes.insert(id.to_string())
    }

    /// Any reported outcome removes the row locally; the store's real state
    /// is picked up by the reconcile refresh.
    pub fn finish_delete(&mut self, id: &str, outcome: DeleteOutcome) -> Reconcile {
        self.pending_deletes.remove(id);
        self.visitors.retain(|v| v.id != id);
        self.notice = Some(outcome.notice());
        Reconcile {
            after: RECONCILE_DELAY,
        }
    }

    /// Restores the row, if any, and reports the failure.
    pub fn fail_delete(&mut self, id: &str, message: &str) {
        self.pending_deletes.remove(id);
        self.notice = Some(Notice::new(
            NoticeLevel::Error,
            format!("刪除失敗：{message}"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn visitor(id: &str, name: &str, email: &str, created_at: &str) -> Visitor {
        Visitor {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            created_at: created_at.into(),
            ..Visitor::default()
        }
    }

    fn sample() -> DashboardState {
        DashboardState::new(vec![
            visitor("a", "Alice", "alice@example.com", "2026-10-17T09:00:00.000Z"),
            visitor("b", "Bob", "bob@example.com", "2026-10-19T09:00:00.000Z"),
            visitor("c", "Carol", "carol@alice.org", "2026-10-18 09:00:00"),
            visitor("d", "", "ghost@example.com", "2026-10-19T10:00:00.000Z"),
        ])
    }

    fn ids(rows: Vec<&Visitor>) -> Vec<&str> {
        rows.into_iter().map(|v| v.id.as_str()).collect()
    }

    #[test]
    fn visible_is_newest_first_regardless_of_input_order() {
        let state = sample();
        assert_eq!(ids(state.visible()), vec!["b", "c", "a"]);

        let mut reversed = state.visitors().to_vec();
        reversed.reverse();
        assert_eq!(ids(DashboardState::new(reversed).visible()), vec!["b", "c", "a"]);
    }

    #[test]
    fn search_filters_name_or_email() {
        let mut state = sample();
        state.set_search("  ALICE ");
        assert_eq!(ids(state.visible()), vec!["c", "a"]);

        state.set_search("nobody");
        assert!(state.visible().is_empty());
    }

    #[test]
    fn optimistic_delete_success_removes_row() {
        let mut state = sample();
        assert!(state.begin_delete("b"));
        assert!(state.rows().iter().any(|r| r.id == "b" && r.pending_delete));

        let reconcile = state.finish_delete("b", DeleteOutcome::SoftDelete);
        assert_eq!(reconcile.after, RECONCILE_DELAY);
        assert_eq!(ids(state.visible()), vec!["c", "a"]);
        assert_eq!(state.notice().unwrap().level, NoticeLevel::Success);
    }

    #[test]
    fn optimistic_delete_failure_restores_row() {
        let mut state = sample();
        state.begin_delete("a");
        state.fail_delete("a", "HTTP 500");

        let row = state.rows().into_iter().find(|r| r.id == "a").unwrap();
        assert!(!row.pending_delete);
        let notice = state.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.contains("HTTP 500"));
    }

    #[test]
    fn begin_delete_ignores_unknown_ids() {
        let mut state = sample();
        assert!(!state.begin_delete(""));
        assert!(!state.begin_delete("zzz"));
    }

    #[test]
    fn simulated_delete_warns_about_manual_cleanup() {
        let notice = DeleteOutcome::SimulatedDelete.notice();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert!(notice.message.contains("手動"));
        assert_eq!(DeleteOutcome::HardDelete.notice().level, NoticeLevel::Success);
    }

    #[test]
    fn add_modal_defaults() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let modal = ModalForm::add(now);
        assert_eq!(modal.visitor.id, "2026-10-19T09:00:00.000Z");
        assert_eq!(modal.visitor.is_first_visit, YesNo::Yes);
        assert_eq!(modal.visitor.wants_contact, YesNo::No);
        assert_eq!(modal.submit_method(), "POST");
        assert!(modal.validate().is_err());
        assert!(modal.options().iter().any(|o| o.value == "friend_family" && o.selected));
    }

    #[test]
    fn edit_modal_copies_record() {
        let mut state = sample();
        assert!(state.open_edit("c"));
        let modal = state.modal().unwrap();
        assert_eq!(modal.mode, ModalMode::Edit);
        assert_eq!(modal.visitor.name, "Carol");
        assert_eq!(modal.submit_method(), "PUT");
        assert!(!state.open_edit("missing"));
    }

    #[test]
    fn prayer_excerpt_truncates_on_characters() {
        assert_eq!(excerpt(""), "無");
        assert_eq!(excerpt("short"), "short");
        let long = "願主賜福".repeat(6);
        assert_eq!(excerpt(&long), format!("{}...", "願主賜福".repeat(5)));
    }

    #[test]
    fn rejected_form_stays_open_with_error() {
        let mut state = sample();
        let form = ModalForm::add(Utc::now());
        let notice = form.validate().unwrap_err();
        state.reject_form(form, notice);

        assert_eq!(state.modal().unwrap().action(), "/admin/dashboard/add");
        assert_eq!(state.notice().unwrap().level, NoticeLevel::Error);
    }
}
