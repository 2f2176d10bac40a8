use super::{latest_per_location, AnalyticsError};
use crate::data::schema::{LOCATION, PEOPLE_FULLY_VACCINATED, TOTAL_CASES, TOTAL_DEATHS};
use crate::Dataset;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

pub const TOP_N_RANGE: RangeInclusive<usize> = 5..=25;
pub const TOP_N_DEFAULT: usize = 10;

/// Metrics offered for ranking and charting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    TotalCases,
    TotalDeaths,
    PeopleFullyVaccinated,
}

impl Metric {
    pub const ALL: [Metric; 3] = [
        Metric::TotalCases,
        Metric::TotalDeaths,
        Metric::PeopleFullyVaccinated,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Metric::TotalCases => TOTAL_CASES,
            Metric::TotalDeaths => TOTAL_DEATHS,
            Metric::PeopleFullyVaccinated => PEOPLE_FULLY_VACCINATED,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Metric {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.column() == s)
            .ok_or_else(|| AnalyticsError::UnknownMetric(s.to_string()))
    }
}

/// The `n` locations with the largest latest value of `metric`, descending.
///
/// Locations whose latest value is null are left out.
pub fn top_locations(
    dataset: &Dataset,
    metric: Metric,
    n: usize,
) -> Result<DataFrame, AnalyticsError> {
    if !TOP_N_RANGE.contains(&n) {
        return Err(AnalyticsError::InvalidTopN {
            n,
            min: *TOP_N_RANGE.start(),
            max: *TOP_N_RANGE.end(),
        });
    }

    let column = metric.column();
    let latest = latest_per_location(dataset, &[column])?;

    let top = latest
        .lazy()
        .filter(col(column).is_not_null())
        .sort(
            [column],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .limit(n as IdxSize)
        .select([col(LOCATION), col(column)])
        .collect()?;

    Ok(top)
}
