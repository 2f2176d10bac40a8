use super::{AnalyticsError, Metric};
use crate::data::schema::{DATE, LOCATION};
use crate::Dataset;
use polars::prelude::*;

/// (location, date, metric) rows ordered by location then date; one line per location.
pub fn series(view: &Dataset, metric: Metric) -> Result<DataFrame, AnalyticsError> {
    let out = view
        .0
        .clone()
        .lazy()
        .select([col(LOCATION), col(DATE), col(metric.column())])
        .sort(
            [LOCATION, DATE],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::dataset;

    #[test]
    fn series_keeps_three_columns_in_order() {
        let view = dataset(&[
            ("B", "2021-01-02", None, None, Some(3.0)),
            ("A", "2021-01-02", None, None, Some(2.0)),
            ("A", "2021-01-01", None, None, Some(1.0)),
        ]);

        let out = series(&view, Metric::PeopleFullyVaccinated).unwrap();

        let names: Vec<&str> = out.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["location", "date", "people_fully_vaccinated"]);
        let values: Vec<Option<f64>> = out
            .column("people_fully_vaccinated")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }
}
