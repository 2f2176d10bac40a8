//! Ad-hoc SQL over the raw dataset.
//!
//! The raw CSV is registered as a single named table in an embedded polars
//! SQL context; each call runs one statement and collects the result.
//! Statements are parsed and checked first: only a single query is accepted,
//! and every table it reads must be the registered table or one of its own
//! CTEs. Table functions (`read_csv(...)` and friends) and DDL are rejected,
//! so a query can neither reach other files nor change the context.
//! Failures come back as [`QueryError`] for the caller to display.

use polars::prelude::*;
use polars::sql::SQLContext;
use sqlparser::ast::{Query, Statement, TableFactor, Visit, Visitor};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::ops::ControlFlow;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("cannot open dataset {path}: {reason}")]
    Register { path: String, reason: String },

    #[error("empty query")]
    Empty,

    #[error("query rejected: {0}")]
    Rejected(String),

    #[error("{0}")]
    Execute(String),
}

pub struct QueryEngine {
    ctx: SQLContext,
    table: String,
}

impl QueryEngine {
    /// Expose the raw CSV at `path` as `table`, with inferred column types and parsed dates.
    pub fn over_raw(path: &Path, table: &str) -> Result<Self, QueryError> {
        let register_err = |reason: String| QueryError::Register {
            path: path.display().to_string(),
            reason,
        };

        if !path.exists() {
            return Err(register_err("file not found".into()));
        }

        let lf = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10_000))
            .with_try_parse_dates(true)
            .finish()
            .map_err(|e| register_err(e.to_string()))?;

        Ok(Self::from_lazy(lf, table))
    }

    /// Expose an in-memory frame as `table`.
    pub fn from_frame(df: DataFrame, table: &str) -> Self {
        Self::from_lazy(df.lazy(), table)
    }

    fn from_lazy(lf: LazyFrame, table: &str) -> Self {
        let mut ctx = SQLContext::new();
        ctx.register(table, lf);
        Self {
            ctx,
            table: table.to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Run one SQL statement and collect its result.
    pub fn execute(&mut self, sql: &str) -> Result<DataFrame, QueryError> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(QueryError::Empty);
        }

        check_statement(sql, &self.table)?;

        debug!(table = %self.table, sql, "executing query");
        self.ctx
            .execute(sql)
            .and_then(|lf| lf.collect())
            .map_err(|e| QueryError::Execute(e.to_string()))
    }
}

/// Parse `sql` and make sure it is one read-only query over `table`.
fn check_statement(sql: &str, table: &str) -> Result<(), QueryError> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql)
        .map_err(|e| QueryError::Execute(e.to_string()))?;

    let [statement] = statements.as_slice() else {
        return Err(QueryError::Rejected(format!(
            "expected one statement, got {}",
            statements.len()
        )));
    };
    if !matches!(statement, Statement::Query(_)) {
        return Err(QueryError::Rejected("only SELECT queries are allowed".into()));
    }

    let mut guard = TableGuard {
        table,
        ctes: Vec::new(),
    };
    match statement.visit(&mut guard) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(reason) => Err(QueryError::Rejected(reason)),
    }
}

/// Walks every table source in a statement, subqueries included.
struct TableGuard<'a> {
    table: &'a str,
    ctes: Vec<String>,
}

impl TableGuard<'_> {
    fn allows(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(self.table)
            || self.ctes.iter().any(|cte| cte.eq_ignore_ascii_case(name))
    }
}

impl Visitor for TableGuard<'_> {
    type Break = String;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            self.ctes
                .extend(with.cte_tables.iter().map(|cte| cte.alias.name.value.clone()));
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        match factor {
            TableFactor::Table { name, args, .. } => {
                if args.is_some() {
                    return ControlFlow::Break(format!("table function {name} is not allowed"));
                }
                match name.0.as_slice() {
                    [ident] if self.allows(&ident.value) => ControlFlow::Continue(()),
                    _ => ControlFlow::Break(format!(
                        "unknown table {name}; only {} can be queried",
                        self.table
                    )),
                }
            }
            TableFactor::Derived { .. } | TableFactor::NestedJoin { .. } => {
                ControlFlow::Continue(())
            }
            other => ControlFlow::Break(format!("unsupported table source: {other}")),
        }
    }
}

/// Default query: top 10 countries by total cases on their latest reported date.
pub fn example_sql(table: &str) -> String {
    format!(
        "SELECT t.location, t.date, t.total_cases, t.total_deaths
FROM {table} AS t
JOIN (
    SELECT location, MAX(date) AS latest
    FROM {table}
    WHERE continent IS NOT NULL
    GROUP BY location
) AS l ON t.location = l.location AND t.date = l.latest
WHERE t.continent IS NOT NULL AND t.total_cases IS NOT NULL
ORDER BY t.total_cases DESC
LIMIT 10"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn engine() -> QueryEngine {
        let df = df!(
            "location" => &["A", "A", "B", "World"],
            "date" => &["2021-01-01", "2021-01-02", "2021-01-01", "2021-01-01"],
            "total_cases" => &[Some(1.0), Some(5.0), Some(3.0), Some(9.0)],
            "total_deaths" => &[Some(4.0), Some(1.0), Some(2.0), Some(3.0)],
            "continent" => &[Some("Asia"), Some("Asia"), Some("Europe"), None],
        )
        .unwrap();
        QueryEngine::from_frame(df, "owid")
    }

    #[test]
    fn runs_select_with_filter() {
        let out = engine()
            .execute("SELECT location FROM owid WHERE total_cases > 2 AND continent IS NOT NULL")
            .unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn example_query_ranks_countries() {
        let mut engine = engine();
        let out = engine.execute(&example_sql(engine.table())).unwrap();

        assert_eq!(out.height(), 2);
        let locs: Vec<&str> = out.column("location").unwrap().str().unwrap().into_iter().flatten().collect();
        assert_eq!(locs, vec!["A", "B"]);
        // A's figures come from its latest row, not the column maxima.
        let deaths = out.column("total_deaths").unwrap().f64().unwrap();
        assert_eq!(deaths.get(0), Some(1.0));
    }

    #[test]
    fn syntax_error_is_reported_not_raised() {
        let err = engine().execute("SELEC nonsense FROM").unwrap_err();
        assert!(matches!(err, QueryError::Execute(_)));
    }

    #[test]
    fn unknown_table_is_reported() {
        let err = engine().execute("SELECT * FROM vaccinations").unwrap_err();
        assert!(matches!(err, QueryError::Rejected(_)));
    }

    #[test]
    fn table_functions_cannot_read_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("secret.csv");
        fs::write(&other, "a,b\n1,2\n").unwrap();

        let sql = format!("SELECT * FROM read_csv('{}')", other.display());
        let err = engine().execute(&sql).unwrap_err();
        assert!(matches!(err, QueryError::Rejected(_)));

        let nested = format!(
            "SELECT location FROM owid WHERE location IN (SELECT a FROM read_csv('{}'))",
            other.display()
        );
        assert!(matches!(engine().execute(&nested).unwrap_err(), QueryError::Rejected(_)));
    }

    #[test]
    fn only_one_select_statement_is_accepted() {
        let mut engine = engine();
        for sql in [
            "SELECT * FROM owid; SELECT * FROM owid",
            "DROP TABLE owid",
            "CREATE TABLE snapshot AS SELECT * FROM owid",
        ] {
            let err = engine.execute(sql).unwrap_err();
            assert!(matches!(err, QueryError::Rejected(_)), "{sql} was not rejected");
        }
        // The registered table survives the attempts above.
        assert_eq!(engine.execute("SELECT * FROM owid").unwrap().height(), 4);
    }

    #[test]
    fn ctes_and_joins_over_the_table_are_allowed() {
        let out = engine()
            .execute(
                "WITH asia AS (SELECT * FROM owid WHERE continent = 'Asia')
                 SELECT a.location FROM asia a JOIN owid o ON a.location = o.location",
            )
            .unwrap();
        assert_eq!(out.height(), 4);
    }

    #[test]
    fn blank_query_is_rejected() {
        assert!(matches!(engine().execute("   \n").unwrap_err(), QueryError::Empty));
    }

    #[test]
    fn registers_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        fs::write(
            &path,
            "location,date,total_cases,continent\nA,2021-01-01,4,Asia\nA,2021-01-02,6,Asia\n",
        )
        .unwrap();

        let mut engine = QueryEngine::over_raw(&path, "owid").unwrap();
        let out = engine
            .execute("SELECT location, MAX(total_cases) AS m FROM owid GROUP BY location")
            .unwrap();

        assert_eq!(out.height(), 1);
        assert_eq!(out.column("m").unwrap().cast(&DataType::Float64).unwrap().f64().unwrap().get(0), Some(6.0));
    }

    #[test]
    fn missing_file_cannot_register() {
        let err = QueryEngine::over_raw(Path::new("/nonexistent/raw.csv"), "owid").err().unwrap();
        assert!(matches!(err, QueryError::Register { .. }));
    }
}
