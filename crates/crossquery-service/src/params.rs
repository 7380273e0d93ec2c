//! Filter parameters as submitted by a caller.
//!
//! A [`FilterParams`] bag holds raw string values keyed by parameter name.
//! [`FilterParams::parse`] turns it into a validated [`QueryRequest`]; every
//! problem is reported as [`QueryError::InvalidSelection`] before any remote
//! request is made.
//!
//! | key               | meaning                                  | format                  |
//! |-------------------|------------------------------------------|-------------------------|
//! | `posting_status`  | required, `posted` or `unposted`         | text                    |
//! | `limit`           | bounded mode target count                | integer ≥ 1             |
//! | `return_all`      | unbounded mode (the default)             | bool                    |
//! | `date_from/to`    | work date range                          | `YYYY-MM-DD`            |
//! | `hours_min/max`   | hours worked range                       | number                  |
//! | `resource_id`     | resource who worked the entry            | integer                 |
//! | `billable_only`   | skip non-billable entries                | bool                    |
//! | `contract_type`   | contract classification                  | integer                 |
//! | `ticket_statuses` | parent ticket status                     | comma-separated integers|
//! | `ticket_queue`    | parent ticket queue                      | integer                 |
//! | `due_from/to`     | parent ticket due date window            | RFC 3339                |
//! | `include_undated` | keep tickets without a due date          | bool                    |
//! | `task_statuses`   | parent task status                       | comma-separated integers|
//! | `account_manager` | owner of the owning company              | integer                 |
//! | `fields`          | extra time entry fields to return        | comma-separated names   |
//!
//! Blank values count as absent.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use crossquery_domain::{
    DueDateWindow, FilterSelections, PageMode, PostingStatus, PrimaryFilters, QueryError,
    QueryRequest, QueryResult,
};

const KNOWN_KEYS: [&str; 18] = [
    "posting_status",
    "limit",
    "return_all",
    "date_from",
    "date_to",
    "hours_min",
    "hours_max",
    "resource_id",
    "billable_only",
    "contract_type",
    "ticket_statuses",
    "ticket_queue",
    "due_from",
    "due_to",
    "include_undated",
    "task_statuses",
    "account_manager",
    "fields",
];

/// Raw filter parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    values: BTreeMap<String, String>,
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns the trimmed value of `key`, or `None` when missing or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Parses and validates every parameter into a query request.
    pub fn parse(&self) -> QueryResult<QueryRequest> {
        if let Some(unknown) = self
            .values
            .keys()
            .find(|key| !KNOWN_KEYS.contains(&key.as_str()))
        {
            return Err(QueryError::invalid_selection(
                unknown.as_str(),
                "unknown parameter",
            ));
        }

        let posting_status: PostingStatus = self
            .get("posting_status")
            .ok_or_else(|| QueryError::invalid_selection("posting_status", "is required"))?
            .parse()?;

        let request = QueryRequest::new(posting_status)
            .with_primary(self.primary()?)
            .with_selections(self.selections()?)
            .with_page_mode(self.page_mode()?)
            .with_extra_fields(self.list("fields"));
        request.validate()?;
        Ok(request)
    }

    fn page_mode(&self) -> QueryResult<PageMode> {
        let return_all = self.flag("return_all")?;
        match (self.number::<i64>("limit")?, return_all) {
            (Some(_), Some(true)) => Err(QueryError::invalid_selection(
                "limit",
                "cannot be combined with return_all",
            )),
            (Some(limit), _) if limit < 1 => Err(QueryError::invalid_selection(
                "limit",
                format!("target count must be at least 1, got {limit}"),
            )),
            (Some(limit), _) => usize::try_from(limit)
                .map(PageMode::Limit)
                .map_err(|e| QueryError::invalid_selection("limit", e.to_string())),
            (None, Some(false)) => Err(QueryError::invalid_selection(
                "limit",
                "required when return_all is false",
            )),
            (None, _) => Ok(PageMode::All),
        }
    }

    fn primary(&self) -> QueryResult<PrimaryFilters> {
        Ok(PrimaryFilters {
            work_date_from: self.date("date_from")?,
            work_date_to: self.date("date_to")?,
            hours_min: self.number("hours_min")?,
            hours_max: self.number("hours_max")?,
            resource_id: self.number("resource_id")?,
            billable_only: self.flag("billable_only")?.unwrap_or(false),
        })
    }

    fn selections(&self) -> QueryResult<FilterSelections> {
        let mut due = DueDateWindow::between(self.timestamp("due_from")?, self.timestamp("due_to")?);
        if let Some(include) = self.flag("include_undated")? {
            due = due.with_include_undated(include);
        }

        Ok(FilterSelections {
            contract_type: self.number("contract_type")?,
            ticket_statuses: self.numbers("ticket_statuses")?,
            ticket_queue: self.number("ticket_queue")?,
            ticket_due: due,
            task_statuses: self.numbers("task_statuses")?,
            account_manager: self.number("account_manager")?,
        })
    }

    fn number<T>(&self, key: &str) -> QueryResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| {
                    QueryError::invalid_selection(key, format!("'{raw}' is not a number: {e}"))
                })
            })
            .transpose()
    }

    fn numbers(&self, key: &str) -> QueryResult<Vec<i64>> {
        let mut values = Vec::new();
        for raw in self.list(key) {
            let value = raw.parse::<i64>().map_err(|e| {
                QueryError::invalid_selection(key, format!("'{raw}' is not an integer: {e}"))
            })?;
            if !values.contains(&value) {
                values.push(value);
            }
        }
        Ok(values)
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn flag(&self, key: &str) -> QueryResult<Option<bool>> {
        self.get(key)
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(QueryError::invalid_selection(
                    key,
                    format!("'{raw}' is not a boolean"),
                )),
            })
            .transpose()
    }

    fn date(&self, key: &str) -> QueryResult<Option<NaiveDate>> {
        self.get(key)
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                    QueryError::invalid_selection(key, format!("'{raw}' is not a YYYY-MM-DD date: {e}"))
                })
            })
            .transpose()
    }

    fn timestamp(&self, key: &str) -> QueryResult<Option<DateTime<Utc>>> {
        self.get(key)
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|parsed| parsed.with_timezone(&Utc))
                    .map_err(|e| {
                        QueryError::invalid_selection(key, format!("'{raw}' is not an RFC 3339 timestamp: {e}"))
                    })
            })
            .transpose()
    }
}

impl<K, V> FromIterator<(K, V)> for FilterParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}
