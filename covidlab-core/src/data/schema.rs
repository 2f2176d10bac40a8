use polars::prelude::*;

pub const LOCATION: &str = "location";
pub const DATE: &str = "date";
pub const CONTINENT: &str = "continent";

pub const TOTAL_CASES: &str = "total_cases";
pub const TOTAL_DEATHS: &str = "total_deaths";
pub const TOTAL_VACCINATIONS: &str = "total_vaccinations";
pub const PEOPLE_VACCINATED: &str = "people_vaccinated";
pub const PEOPLE_FULLY_VACCINATED: &str = "people_fully_vaccinated";

/// Dates in both artifacts are ISO 8601 calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column projection of the OWID dataset used by every stage
pub struct OwidSchema;

impl OwidSchema {
    /// Projected column names, in artifact order.
    pub const COLUMNS: [&'static str; 12] = [
        LOCATION,
        DATE,
        TOTAL_CASES,
        "new_cases",
        TOTAL_DEATHS,
        "new_deaths",
        TOTAL_VACCINATIONS,
        "new_vaccinations",
        PEOPLE_VACCINATED,
        PEOPLE_FULLY_VACCINATED,
        "population",
        CONTINENT,
    ];

    /// Monotone per-country counters that get forward-filled.
    pub const CUMULATIVE_FIELDS: [&'static str; 5] = [
        TOTAL_CASES,
        TOTAL_DEATHS,
        TOTAL_VACCINATIONS,
        PEOPLE_VACCINATED,
        PEOPLE_FULLY_VACCINATED,
    ];

    /// Typed projection: strings for keys, `Date` for the date, `Float64` for counts.
    pub fn schema() -> Schema {
        Schema::from_iter(Self::COLUMNS.iter().map(|name| {
            let dtype = match *name {
                LOCATION | CONTINENT => DataType::String,
                DATE => DataType::Date,
                _ => DataType::Float64,
            };
            Field::new((*name).into(), dtype)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_all_projected_columns() {
        let schema = OwidSchema::schema();
        assert_eq!(schema.len(), OwidSchema::COLUMNS.len());
        for name in OwidSchema::COLUMNS {
            assert!(schema.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_schema_types() {
        let schema = OwidSchema::schema();
        assert_eq!(schema.get(LOCATION), Some(&DataType::String));
        assert_eq!(schema.get(CONTINENT), Some(&DataType::String));
        assert_eq!(schema.get(DATE), Some(&DataType::Date));
        assert_eq!(schema.get("population"), Some(&DataType::Float64));
    }

    #[test]
    fn test_cumulative_fields_are_projected() {
        for field in OwidSchema::CUMULATIVE_FIELDS {
            assert!(OwidSchema::COLUMNS.contains(&field));
        }
        assert!(!OwidSchema::CUMULATIVE_FIELDS.contains(&"new_cases"));
    }
}
