//! Query request types.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use crossquery_client::FilterCondition;
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::resolver::FilterSelections;
use crate::schema;

/// Conditions evaluated by the remote on the primary entity itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryFilters {
    pub work_date_from: Option<NaiveDate>,
    pub work_date_to: Option<NaiveDate>,
    pub hours_min: Option<f64>,
    pub hours_max: Option<f64>,
    pub resource_id: Option<i64>,
    /// Only entries not flagged as non-billable.
    pub billable_only: bool,
}

impl PrimaryFilters {
    pub fn validate(&self) -> QueryResult<()> {
        if let (Some(from), Some(to)) = (self.work_date_from, self.work_date_to) {
            if from > to {
                return Err(QueryError::invalid_selection(
                    "work_date",
                    format!("start {from} is after end {to}"),
                ));
            }
        }
        for (field, value) in [("hours_min", self.hours_min), ("hours_max", self.hours_max)] {
            if let Some(hours) = value {
                if !hours.is_finite() || hours < 0.0 {
                    return Err(QueryError::invalid_selection(
                        field,
                        format!("expected a non-negative number, got {hours}"),
                    ));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.hours_min, self.hours_max) {
            if min > max {
                return Err(QueryError::invalid_selection(
                    "hours",
                    format!("minimum {min} is above maximum {max}"),
                ));
            }
        }
        Ok(())
    }

    /// Builds the remote conditions; never empty, since the remote rejects unfiltered queries.
    pub fn conditions(&self) -> Vec<FilterCondition> {
        let mut conditions = Vec::new();
        if let Some(from) = self.work_date_from {
            conditions.push(FilterCondition::gte(schema::DATE_WORKED, date_value(from)));
        }
        if let Some(to) = self.work_date_to {
            conditions.push(FilterCondition::lte(schema::DATE_WORKED, date_value(to)));
        }
        if let Some(min) = self.hours_min {
            conditions.push(FilterCondition::gte(schema::HOURS_WORKED, min));
        }
        if let Some(max) = self.hours_max {
            conditions.push(FilterCondition::lte(schema::HOURS_WORKED, max));
        }
        if let Some(resource) = self.resource_id {
            conditions.push(FilterCondition::eq(schema::RESOURCE_ID, resource));
        }
        if self.billable_only {
            conditions.push(FilterCondition::eq(schema::IS_NON_BILLABLE, false));
        }
        if conditions.is_empty() {
            conditions.push(FilterCondition::exists(schema::ID));
        }
        conditions
    }
}

fn date_value(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Which side of the posting partition the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostingStatus {
    Posted,
    Unposted,
}

impl FromStr for PostingStatus {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "posted" => Ok(Self::Posted),
            "unposted" => Ok(Self::Unposted),
            other => Err(QueryError::invalid_selection(
                "posting_status",
                format!("expected 'posted' or 'unposted', got '{other}'"),
            )),
        }
    }
}

impl fmt::Display for PostingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Posted => f.write_str("posted"),
            Self::Unposted => f.write_str("unposted"),
        }
    }
}

/// How much of the primary result set to collect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageMode {
    /// Materialize every primary record, then resolve and reconcile once.
    #[default]
    All,
    /// Stream pages until this many matches are collected.
    Limit(usize),
}

/// A complete cross-entity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub primary: PrimaryFilters,
    pub selections: FilterSelections,
    pub posting_status: PostingStatus,
    pub page_mode: PageMode,
    /// Additional primary fields to return alongside the ones the engine needs.
    pub extra_fields: Vec<String>,
}

impl QueryRequest {
    pub fn new(posting_status: PostingStatus) -> Self {
        Self {
            primary: PrimaryFilters::default(),
            selections: FilterSelections::default(),
            posting_status,
            page_mode: PageMode::All,
            extra_fields: Vec::new(),
        }
    }

    pub fn with_primary(mut self, primary: PrimaryFilters) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_selections(mut self, selections: FilterSelections) -> Self {
        self.selections = selections;
        self
    }

    pub fn with_page_mode(mut self, page_mode: PageMode) -> Self {
        self.page_mode = page_mode;
        self
    }

    pub fn with_extra_fields(mut self, fields: Vec<String>) -> Self {
        self.extra_fields = fields;
        self
    }

    /// Checks every input before any request is sent.
    pub fn validate(&self) -> QueryResult<()> {
        self.primary.validate()?;
        self.selections.validate()?;
        if self.page_mode == PageMode::Limit(0) {
            return Err(QueryError::invalid_selection(
                "limit",
                "target count must be at least 1",
            ));
        }
        Ok(())
    }

    /// Primary fields to project: the engine's own plus any extras, without duplicates.
    pub fn projected_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = schema::TIME_ENTRY_CORE_FIELDS
            .iter()
            .map(|f| (*f).to_string())
            .collect();
        for extra in &self.extra_fields {
            if !fields.contains(extra) {
                fields.push(extra.clone());
            }
        }
        fields
    }
}
