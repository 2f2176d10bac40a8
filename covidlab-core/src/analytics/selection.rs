use crate::data::schema::{DATE, LOCATION};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Locations selected when none are given.
pub const DEFAULT_LOCATIONS: [&str; 3] = ["United States", "India", "Brazil"];

/// Sidebar filter: a set of locations and an inclusive date range.
///
/// Open ends of the range are unbounded. An empty location list selects nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub locations: Vec<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Selection {
    pub fn new<I, S>(locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            locations: locations.into_iter().map(Into::into).collect(),
            start: None,
            end: None,
        }
    }

    pub fn with_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Row predicate for this selection.
    pub fn predicate(&self) -> Expr {
        let mut pred = self
            .locations
            .iter()
            .map(|loc| col(LOCATION).eq(lit(loc.clone())))
            .reduce(|acc, e| acc.or(e))
            .unwrap_or_else(|| lit(false));

        if let Some(start) = self.start {
            pred = pred.and(col(DATE).gt_eq(lit(start)));
        }
        if let Some(end) = self.end {
            pred = pred.and(col(DATE).lt_eq(lit(end)));
        }
        pred
    }
}
