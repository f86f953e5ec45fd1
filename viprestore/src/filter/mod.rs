// File: viprestore/src/filter/mod.rs
//! Service filtering
//!
//! Four dimensions are always conjoined: source expression, destination
//! expression, time range and profile set. Only the text dimensions support
//! `OR`, and only within themselves. See [`expression`] for the text grammar.
//!
//! Filtering never fails. A malformed text expression or an inverted time
//! range disables that one dimension and the pass continues.

pub mod expression;

use std::collections::HashSet;
use tracing::debug;

use crate::model::{Schedule, ServiceRecord};

pub use crate::model::snapshot::profile_options;
pub use expression::{ExpressionError, Operator, TextExpression};

/// Closed interval in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    /// Whether a schedule falls into this range.
    ///
    /// Bounded schedules `[start, end)` match when they overlap the range.
    /// Open-ended schedules match when the range start is at or before the
    /// schedule start and the schedule start lies inside the range.
    pub fn admits(&self, schedule: &Schedule) -> bool {
        match schedule.end_timestamp {
            Some(end) => schedule.start_timestamp <= self.end && end > self.start,
            None => self.start <= schedule.start_timestamp && schedule.start_timestamp <= self.end,
        }
    }
}

/// Immutable filter settings. `FilterCriteria::default()` restricts nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub source_expr: Option<String>,
    pub dest_expr: Option<String>,
    pub time_range: Option<TimeRange>,
    pub time_filter_enabled: bool,
    /// `None` means any profile; `Some(empty)` admits nothing
    pub allowed_profile_ids: Option<HashSet<String>>,
}

impl FilterCriteria {
    /// Criteria with no restriction on any dimension.
    pub fn reset() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, expr: impl Into<String>) -> Self {
        self.source_expr = Some(expr.into());
        self
    }

    pub fn with_destination(mut self, expr: impl Into<String>) -> Self {
        self.dest_expr = Some(expr.into());
        self
    }

    /// Set and enable the time range.
    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self.time_filter_enabled = true;
        self
    }

    pub fn with_profiles<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_profile_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_unrestricted(&self) -> bool {
        self.compile().is_unrestricted()
    }

    fn compile(&self) -> CompiledCriteria<'_> {
        CompiledCriteria {
            source: compile_expression("source", self.source_expr.as_deref()),
            destination: compile_expression("destination", self.dest_expr.as_deref()),
            time_range: self.effective_time_range(),
            profiles: self.allowed_profile_ids.as_ref(),
        }
    }

    fn effective_time_range(&self) -> Option<TimeRange> {
        if !self.time_filter_enabled {
            return None;
        }
        match self.time_range {
            Some(range) if range.is_valid() => Some(range),
            Some(range) => {
                debug!(
                    "Ignoring inverted time range {}..{}",
                    range.start, range.end
                );
                None
            }
            None => None,
        }
    }
}

struct CompiledCriteria<'a> {
    source: Option<TextExpression>,
    destination: Option<TextExpression>,
    time_range: Option<TimeRange>,
    profiles: Option<&'a HashSet<String>>,
}

impl CompiledCriteria<'_> {
    fn is_unrestricted(&self) -> bool {
        self.source.is_none()
            && self.destination.is_none()
            && self.time_range.is_none()
            && self.profiles.is_none()
    }

    fn matches(&self, record: &ServiceRecord) -> bool {
        if let Some(expr) = &self.source {
            if !expr.matches(&[record.from.label.as_str(), record.from.id.as_str()]) {
                return false;
            }
        }
        if let Some(expr) = &self.destination {
            if !expr.matches(&[record.to.label.as_str(), record.to.id.as_str()]) {
                return false;
            }
        }
        if let Some(range) = &self.time_range {
            if !range.admits(&record.schedule) {
                return false;
            }
        }
        if let Some(profiles) = self.profiles {
            if !profiles.contains(&record.profile.id) {
                return false;
            }
        }
        true
    }
}

fn compile_expression(dimension: &str, input: Option<&str>) -> Option<TextExpression> {
    let input = input?;
    match TextExpression::parse(input) {
        Ok(expr) => expr,
        Err(e) => {
            debug!("Ignoring malformed {} filter '{}': {}", dimension, input, e);
            None
        }
    }
}

/// Records matching `criteria`, in input order.
pub fn apply(records: &[ServiceRecord], criteria: &FilterCriteria) -> Vec<ServiceRecord> {
    let compiled = criteria.compile();
    if compiled.is_unrestricted() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|record| compiled.matches(record))
        .cloned()
        .collect()
}

/// Single-record check with the same semantics as [`apply`].
pub fn matches(record: &ServiceRecord, criteria: &FilterCriteria) -> bool {
    criteria.compile().matches(record)
}
