use crate::analytics::{AnalyticsError, Selection};
use crate::data::schema::{DATE, LOCATION};
use chrono::NaiveDate;
use polars::prelude::*;
use std::ops::{Deref, DerefMut};

/// The in-memory dataset behind every dashboard panel.
///
/// Always country rows only, sorted by (location, date).
#[derive(Debug, Clone)]
pub struct Dataset(pub(crate) DataFrame);

impl Deref for Dataset {
    type Target = DataFrame;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Dataset {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<DataFrame> for Dataset {
    fn from(df: DataFrame) -> Self {
        Self(df)
    }
}

impl Dataset {
    pub fn into_inner(self) -> DataFrame {
        self.0
    }

    /// Sorted distinct locations.
    pub fn locations(&self) -> Result<Vec<String>, AnalyticsError> {
        let unique = self
            .0
            .clone()
            .lazy()
            .select([col(LOCATION).unique().sort(SortOptions::default())])
            .collect()?;

        Ok(unique
            .column(LOCATION)?
            .str()?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect())
    }

    /// Earliest and latest date, or `None` for an empty dataset.
    pub fn date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>, AnalyticsError> {
        let bounds = self
            .0
            .clone()
            .lazy()
            .select([
                col(DATE).min().alias("min"),
                col(DATE).max().alias("max"),
            ])
            .collect()?;

        let min = bounds.column("min")?.date()?.get(0);
        let max = bounds.column("max")?.date()?.get(0);
        Ok(match (min, max) {
            (Some(min), Some(max)) => Some((days_to_date(min), days_to_date(max))),
            _ => None,
        })
    }

    /// Rows matching the selection (sidebar filter).
    pub fn select(&self, selection: &Selection) -> Result<Self, AnalyticsError> {
        let view = self.0.clone().lazy().filter(selection.predicate()).collect()?;
        Ok(Self(view))
    }

    /// Render as CSV text with a header row.
    pub fn to_csv(&self) -> Result<String, AnalyticsError> {
        frame_to_csv(&self.0)
    }
}

/// Render any frame as CSV text with a header row.
pub fn frame_to_csv(df: &DataFrame) -> Result<String, AnalyticsError> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut df.clone())?;
    String::from_utf8(buf).map_err(|e| AnalyticsError::Encoding(e.to_string()))
}

fn days_to_date(days: i32) -> NaiveDate {
    NaiveDate::default() + chrono::Duration::days(days as i64)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::data::ingest::parse_columns;
    use crate::data::schema::OwidSchema;

    /// One row of a hand-built dataset: (location, date, total_cases, total_deaths, fully_vaccinated).
    pub(crate) type Row<'a> = (&'a str, &'a str, Option<f64>, Option<f64>, Option<f64>);

    /// Typed dataset with the full OWID projection; unlisted numeric fields are null.
    pub(crate) fn dataset(rows: &[Row<'_>]) -> Dataset {
        let fmt = |v: Option<f64>| v.map(|x| x.to_string());
        let n = rows.len();
        let none: Vec<Option<String>> = vec![None; n];

        let text = df!(
            "location" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            "date" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            "total_cases" => rows.iter().map(|r| fmt(r.2)).collect::<Vec<_>>(),
            "new_cases" => none.clone(),
            "total_deaths" => rows.iter().map(|r| fmt(r.3)).collect::<Vec<_>>(),
            "new_deaths" => none.clone(),
            "total_vaccinations" => none.clone(),
            "new_vaccinations" => none.clone(),
            "people_vaccinated" => none.clone(),
            "people_fully_vaccinated" => rows.iter().map(|r| fmt(r.4)).collect::<Vec<_>>(),
            "population" => none.clone(),
            "continent" => vec![Some("Somewhere".to_string()); n],
        )
        .unwrap();

        Dataset(parse_columns(text, &OwidSchema::schema()).unwrap())
    }
}
