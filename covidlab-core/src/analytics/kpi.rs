use super::{latest_per_location, AnalyticsError};
use crate::data::schema::{PEOPLE_FULLY_VACCINATED, TOTAL_CASES, TOTAL_DEATHS};
use crate::Dataset;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Totals across the selected locations, each taken from its latest row.
///
/// A field is `None` when no selected location has a value for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    pub locations: usize,
    pub total_cases: Option<f64>,
    pub total_deaths: Option<f64>,
    pub people_fully_vaccinated: Option<f64>,
}

pub fn kpi_snapshot(view: &Dataset) -> Result<KpiSnapshot, AnalyticsError> {
    let fields = [TOTAL_CASES, TOTAL_DEATHS, PEOPLE_FULLY_VACCINATED];
    let latest = latest_per_location(view, &fields)?;

    Ok(KpiSnapshot {
        locations: latest.height(),
        total_cases: sum_present(&latest, TOTAL_CASES)?,
        total_deaths: sum_present(&latest, TOTAL_DEATHS)?,
        people_fully_vaccinated: sum_present(&latest, PEOPLE_FULLY_VACCINATED)?,
    })
}

/// Sum of non-null values, or `None` if there are none.
fn sum_present(df: &DataFrame, field: &str) -> Result<Option<f64>, AnalyticsError> {
    let values = df.column(field)?.f64()?;
    if values.null_count() == values.len() {
        return Ok(None);
    }
    Ok(values.sum())
}

/// Whole number with thousands separators, or `N/A`.
pub fn format_count(value: Option<f64>) -> String {
    let Some(v) = value else {
        return "N/A".to_string();
    };
    let digits = format!("{}", v.trunc().abs() as u64);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if v < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for KpiSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Locations:                   {}", self.locations)?;
        writeln!(f, "Total Cases (selected):      {}", format_count(self.total_cases))?;
        writeln!(f, "Total Deaths (selected):     {}", format_count(self.total_deaths))?;
        write!(
            f,
            "Fully Vaccinated (selected): {}",
            format_count(self.people_fully_vaccinated)
        )
    }
}
