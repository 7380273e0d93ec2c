//! Filter selections for the cross-entity resolver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// A value that remembers whether the caller supplied it or it was defaulted.
///
/// Some selections change meaning depending on whether a neighbouring
/// selection was set explicitly, so the plain value is not enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Explicit<T> {
    Default(T),
    Provided(T),
}

impl<T: Copy> Explicit<T> {
    pub fn value(&self) -> T {
        match self {
            Self::Default(v) | Self::Provided(v) => *v,
        }
    }

    pub fn is_provided(&self) -> bool {
        matches!(self, Self::Provided(_))
    }
}

impl<T: Default> Default for Explicit<T> {
    fn default() -> Self {
        Self::Default(T::default())
    }
}

/// Due-date window on the parent ticket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DueDateWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Whether tickets with no due date satisfy the window.
    pub include_undated: Explicit<bool>,
}

impl DueDateWindow {
    pub fn between(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self {
            from,
            to,
            include_undated: Explicit::default(),
        }
    }

    pub fn with_include_undated(mut self, include: bool) -> Self {
        self.include_undated = Explicit::Provided(include);
        self
    }

    /// The window filters only when at least one bound is set.
    pub fn is_active(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    /// Undated tickets pass only when the caller explicitly asked for them.
    pub fn admits_undated(&self) -> bool {
        match self.include_undated {
            Explicit::Provided(include) => include,
            Explicit::Default(_) => false,
        }
    }

    /// Checks a ticket due date against the window. Inactive windows admit everything.
    pub fn admits(&self, due: Option<DateTime<Utc>>) -> bool {
        if !self.is_active() {
            return true;
        }
        match due {
            None => self.admits_undated(),
            Some(due) => {
                self.from.map_or(true, |from| due >= from) && self.to.map_or(true, |to| due <= to)
            }
        }
    }
}

/// Optional cross-entity filters. Every absent or empty field skips its stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSelections {
    /// Contract classification of the entry's contract.
    pub contract_type: Option<i64>,
    /// Allowed statuses of the parent ticket.
    pub ticket_statuses: Vec<i64>,
    /// Queue of the parent ticket.
    pub ticket_queue: Option<i64>,
    /// Due-date window of the parent ticket.
    pub ticket_due: DueDateWindow,
    /// Allowed statuses of the parent task.
    pub task_statuses: Vec<i64>,
    /// Resource that owns the company the entry ultimately belongs to.
    pub account_manager: Option<i64>,
}

impl FilterSelections {
    pub fn with_contract_type(mut self, contract_type: i64) -> Self {
        self.contract_type = Some(contract_type);
        self
    }

    pub fn with_ticket_statuses(mut self, statuses: Vec<i64>) -> Self {
        self.ticket_statuses = statuses;
        self
    }

    pub fn with_ticket_queue(mut self, queue: i64) -> Self {
        self.ticket_queue = Some(queue);
        self
    }

    pub fn with_ticket_due(mut self, window: DueDateWindow) -> Self {
        self.ticket_due = window;
        self
    }

    pub fn with_task_statuses(mut self, statuses: Vec<i64>) -> Self {
        self.task_statuses = statuses;
        self
    }

    pub fn with_account_manager(mut self, resource: i64) -> Self {
        self.account_manager = Some(resource);
        self
    }

    pub fn ticket_stage_active(&self) -> bool {
        !self.ticket_statuses.is_empty() || self.ticket_queue.is_some() || self.ticket_due.is_active()
    }

    /// True when no stage would run.
    pub fn is_empty(&self) -> bool {
        self.contract_type.is_none()
            && !self.ticket_stage_active()
            && self.task_statuses.is_empty()
            && self.account_manager.is_none()
    }

    pub fn validate(&self) -> QueryResult<()> {
        if let (Some(from), Some(to)) = (self.ticket_due.from, self.ticket_due.to) {
            if from > to {
                return Err(QueryError::invalid_selection(
                    "ticket_due",
                    format!("window start {from} is after end {to}"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_inactive_window_admits_everything() {
        let window = DueDateWindow::default();
        assert!(window.admits(None));
        assert!(window.admits(Some(day(1))));

        // An explicit "exclude undated" without bounds still filters nothing.
        let window = DueDateWindow::default().with_include_undated(false);
        assert!(window.admits(None));
    }

    #[test]
    fn test_active_window_excludes_undated_unless_explicitly_included() {
        let window = DueDateWindow::between(Some(day(5)), Some(day(10)));
        assert!(!window.admits(None));
        assert!(window.admits(Some(day(5))));
        assert!(window.admits(Some(day(10))));
        assert!(!window.admits(Some(day(11))));

        let window = window.with_include_undated(true);
        assert!(window.admits(None));
        assert!(!window.admits(Some(day(4))));
    }

    #[test]
    fn test_explicit_tracks_provenance() {
        let defaulted: Explicit<bool> = Explicit::default();
        assert!(!defaulted.is_provided());
        assert!(!defaulted.value());
        assert!(Explicit::Provided(false).is_provided());
    }

    #[test]
    fn test_reversed_due_window_is_rejected() {
        let selections = FilterSelections::default()
            .with_ticket_due(DueDateWindow::between(Some(day(9)), Some(day(2))));
        let err = selections.validate().unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_empty_selections_have_no_active_stage() {
        assert!(FilterSelections::default().is_empty());
        assert!(!FilterSelections::default().with_ticket_queue(3).is_empty());
        assert!(!FilterSelections::default()
            .with_ticket_due(DueDateWindow::between(Some(day(1)), None))
            .is_empty());
    }
}
