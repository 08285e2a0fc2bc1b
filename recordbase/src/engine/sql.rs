//! SQL statement compiler shared by the SQL backends
//!
//! Structured selections compile to parameterized predicates; their values
//! are always bound, never spliced. Raw predicates and raw ordering
//! expressions are spliced verbatim. Identifiers are double-quoted per
//! dot-separated segment.
//!
//! # Example
//!
//! ```rust
//! use recordbase::engine::sql::{self, Dialect};
//! use recordbase::repository::{FilterCondition, Selection};
//! use recordbase::value::{Payload, Value};
//!
//! let selection = Selection::from(FilterCondition::is_in("id", [1_i64, 2]));
//! let payload = Payload::new().set("name", "bob");
//! let stmt = sql::update(Dialect::Postgres, "users", &selection, &payload).unwrap();
//!
//! assert_eq!(stmt.sql, r#"UPDATE "users" SET "name" = $1 WHERE "id" IN ($2, $3)"#);
//! assert_eq!(stmt.params, vec![Value::from("bob"), Value::Integer(1), Value::Integer(2)]);
//! ```

use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::repository::{FilterCondition, FilterOperator, FilterValue, Pagination, Selection};
use crate::value::{Fields, Payload, Value};

use super::{Aggregate, Ordering, SelectQuery};

/// Placeholder and statement flavour of the target engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// SQLite / libsql: `?1, ?2, ...`
    Sqlite,
    /// PostgreSQL: `$1, $2, ...`
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Self::Sqlite => format!("?{}", index),
            Self::Postgres => format!("${}", index),
        }
    }
}

/// SQL text plus the values bound to its placeholders, in order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text
    pub sql: String,
    /// Bound values
    pub params: Vec<Value>,
}

/// Quote an identifier, one segment per `.`
///
/// `*` segments pass through so `t.*` stays a wildcard.
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|segment| {
            let segment = segment.trim();
            if segment == "*" {
                segment.to_string()
            } else {
                format!("\"{}\"", segment.replace('"', "\"\""))
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

struct Builder {
    dialect: Dialect,
    sql: String,
    params: Vec<Value>,
}

impl Builder {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Bind a value and return its placeholder; NULL is written as a literal
    fn bind(&mut self, value: &Value) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        self.params.push(value.clone());
        self.dialect.placeholder(self.params.len())
    }

    /// Render a selection; the flag marks joined groups that need
    /// parentheses when nested
    fn predicate(&mut self, selection: &Selection) -> Result<Option<(String, bool)>> {
        match selection {
            Selection::Condition(condition) => Ok(Some((self.condition(condition)?, false))),
            Selection::All(children) => self.group(children, " AND "),
            Selection::Any(children) => self.group(children, " OR "),
            Selection::Raw(predicate) => {
                let predicate = predicate.trim();
                Ok((!predicate.is_empty()).then(|| (format!("({})", predicate), false)))
            }
        }
    }

    fn group(&mut self, children: &[Selection], joiner: &str) -> Result<Option<(String, bool)>> {
        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            if let Some(part) = self.predicate(child)? {
                parts.push(part);
            }
        }
        if parts.len() <= 1 {
            return Ok(parts.pop());
        }
        let joined = parts
            .into_iter()
            .map(|(sql, compound)| if compound { format!("({})", sql) } else { sql })
            .collect::<Vec<_>>()
            .join(joiner);
        Ok(Some((joined, true)))
    }

    fn condition(&mut self, condition: &FilterCondition) -> Result<String> {
        let column = quote_ident(&condition.field);
        let operator = condition.operator;

        match (operator, &condition.value) {
            (FilterOperator::IsNull, _) => Ok(format!("{} IS NULL", column)),
            (FilterOperator::IsNotNull, _) => Ok(format!("{} IS NOT NULL", column)),
            (FilterOperator::In, FilterValue::List(values)) => {
                if values.is_empty() {
                    // Membership in the empty set matches nothing
                    return Ok("1 = 0".to_string());
                }
                let placeholders: Vec<String> = values.iter().map(|v| self.bind(v)).collect();
                Ok(format!("{} IN ({})", column, placeholders.join(", ")))
            }
            (FilterOperator::In | FilterOperator::Equal, FilterValue::Scalar(Value::Null)) => {
                Ok(format!("{} IS NULL", column))
            }
            (FilterOperator::NotEqual, FilterValue::Scalar(Value::Null)) => {
                Ok(format!("{} IS NOT NULL", column))
            }
            (FilterOperator::In, FilterValue::Scalar(value)) => {
                let placeholder = self.bind(value);
                Ok(format!("{} = {}", column, placeholder))
            }
            (_, FilterValue::Scalar(value)) => {
                let placeholder = self.bind(value);
                Ok(format!("{} {} {}", column, operator, placeholder))
            }
            (_, FilterValue::List(_)) => Err(Error::InvalidInput(format!(
                "operator {} on column {} does not take a list",
                operator, condition.field
            ))),
        }
    }

    /// Append ` WHERE ...` when the selection has criteria
    fn where_clause(&mut self, selection: &Selection) -> Result<bool> {
        match self.predicate(selection)? {
            Some((predicate, _)) => {
                let _ = write!(self.sql, " WHERE {}", predicate);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Like [`where_clause`](Self::where_clause) but refuses to run without criteria
    fn guarded_where_clause(&mut self, selection: &Selection, verb: &str, table: &str) -> Result<()> {
        if self.where_clause(selection)? {
            Ok(())
        } else {
            Err(Error::UnsafeStatement(format!(
                "{} on {} without row criteria",
                verb, table
            )))
        }
    }

    fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Quote one projected column, keeping a `column AS alias` rename
fn projected_column(entry: &str) -> String {
    let lowered = entry.to_ascii_lowercase();
    match lowered.find(" as ") {
        Some(at) => format!(
            "{} AS {}",
            quote_ident(&entry[..at]),
            quote_ident(&entry[at + 4..])
        ),
        None => quote_ident(entry),
    }
}

fn projection(fields: &Fields) -> String {
    match fields {
        Fields::Columns(columns) if !columns.is_empty() => columns
            .iter()
            .map(|c| projected_column(c))
            .collect::<Vec<_>>()
            .join(", "),
        _ => "*".to_string(),
    }
}

/// `SELECT <fields> FROM <table> [WHERE] [ORDER BY] [LIMIT/OFFSET]`
pub fn select(dialect: Dialect, query: &SelectQuery) -> Result<Statement> {
    let mut builder = Builder::new(dialect);
    let _ = write!(
        builder.sql,
        "SELECT {} FROM {}",
        projection(&query.fields),
        quote_ident(&query.table)
    );
    builder.where_clause(&query.selection)?;

    match &query.order {
        Some(Ordering::Raw(expr)) if !expr.trim().is_empty() => {
            let _ = write!(builder.sql, " ORDER BY {}", expr.trim());
        }
        Some(Ordering::Column { column, direction }) if !column.trim().is_empty() => {
            let _ = write!(
                builder.sql,
                " ORDER BY {} {}",
                quote_ident(column),
                direction.to_string().to_uppercase()
            );
        }
        _ => {}
    }

    if let Some(window) = query.window {
        // fields are public, so a hand-built window may exceed the signed range
        let _ = write!(
            builder.sql,
            " LIMIT {} OFFSET {}",
            window.limit.min(Pagination::MAX_ROWS),
            window.offset.min(Pagination::MAX_ROWS)
        );
    }
    Ok(builder.finish())
}

/// Single-row `INSERT`, optionally returning the primary key as BIGINT
pub fn insert(
    dialect: Dialect,
    table: &str,
    payload: &Payload,
    returning: Option<&str>,
) -> Result<Statement> {
    let mut stmt = insert_many(dialect, table, std::slice::from_ref(payload))?;
    if let Some(primary_key) = returning {
        let _ = write!(
            stmt.sql,
            " RETURNING CAST({} AS BIGINT)",
            quote_ident(primary_key)
        );
    }
    Ok(stmt)
}

/// Multi-row `INSERT`; every payload must carry the first payload's columns
pub fn insert_many(dialect: Dialect, table: &str, payloads: &[Payload]) -> Result<Statement> {
    let first = payloads
        .first()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("insert into {} without values", table)))?;
    let columns: Vec<&str> = first.columns().collect();

    let mut builder = Builder::new(dialect);
    let _ = write!(
        builder.sql,
        "INSERT INTO {} ({}) VALUES ",
        quote_ident(table),
        columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut rows = Vec::with_capacity(payloads.len());
    for (row, payload) in payloads.iter().enumerate() {
        if payload.len() != columns.len() {
            return Err(ragged(table, row));
        }
        let mut placeholders = Vec::with_capacity(columns.len());
        for column in &columns {
            let value = payload.get(column).ok_or_else(|| ragged(table, row))?;
            placeholders.push(builder.bind(value));
        }
        rows.push(format!("({})", placeholders.join(", ")));
    }
    builder.sql.push_str(&rows.join(", "));
    Ok(builder.finish())
}

fn ragged(table: &str, row: usize) -> Error {
    Error::InvalidInput(format!(
        "batch insert into {}: row {} does not have the same columns as row 0",
        table, row
    ))
}

/// `UPDATE <table> SET ... WHERE ...`
pub fn update(
    dialect: Dialect,
    table: &str,
    selection: &Selection,
    payload: &Payload,
) -> Result<Statement> {
    if payload.is_empty() {
        return Err(Error::InvalidInput(format!(
            "update of {} without values",
            table
        )));
    }
    let mut builder = Builder::new(dialect);
    let assignments: Vec<String> = payload
        .iter()
        .map(|(column, value)| format!("{} = {}", quote_ident(column), builder.bind(value)))
        .collect();
    let _ = write!(
        builder.sql,
        "UPDATE {} SET {}",
        quote_ident(table),
        assignments.join(", ")
    );
    builder.guarded_where_clause(selection, "UPDATE", table)?;
    Ok(builder.finish())
}

/// `DELETE FROM <table> WHERE ...`
pub fn delete(dialect: Dialect, table: &str, selection: &Selection) -> Result<Statement> {
    let mut builder = Builder::new(dialect);
    let _ = write!(builder.sql, "DELETE FROM {}", quote_ident(table));
    builder.guarded_where_clause(selection, "DELETE", table)?;
    Ok(builder.finish())
}

/// Unconditional clear of `table`
///
/// PostgreSQL restarts owned sequences in the same statement. SQLite needs a
/// follow-up `sqlite_sequence` reset, which [`reset_sequence`] provides.
pub fn truncate(dialect: Dialect, table: &str) -> Statement {
    let sql = match dialect {
        Dialect::Sqlite => format!("DELETE FROM {}", quote_ident(table)),
        Dialect::Postgres => format!("TRUNCATE TABLE {} RESTART IDENTITY", quote_ident(table)),
    };
    Statement {
        sql,
        params: Vec::new(),
    }
}

/// SQLite: forget the AUTOINCREMENT high-water mark of `table`
pub fn reset_sequence(table: &str) -> Statement {
    Statement {
        sql: "DELETE FROM \"sqlite_sequence\" WHERE \"name\" = ?1".to_string(),
        params: vec![Value::from(table)],
    }
}

/// `UPDATE <table> SET col = col + delta WHERE ...`
pub fn adjust(
    dialect: Dialect,
    table: &str,
    selection: &Selection,
    column: &str,
    delta: i64,
) -> Result<Statement> {
    let mut builder = Builder::new(dialect);
    let column = quote_ident(column);
    let placeholder = builder.bind(&Value::Integer(delta));
    let _ = write!(
        builder.sql,
        "UPDATE {} SET {} = {} + {}",
        quote_ident(table),
        column,
        column,
        placeholder
    );
    builder.guarded_where_clause(selection, "UPDATE", table)?;
    Ok(builder.finish())
}

/// `SELECT COUNT(*) | COALESCE(SUM(col), 0) | MAX(col) FROM <table> [WHERE]`
pub fn aggregate(
    dialect: Dialect,
    table: &str,
    selection: &Selection,
    aggregate: &Aggregate,
) -> Result<Statement> {
    let expr = match aggregate {
        Aggregate::Count => "COUNT(*)".to_string(),
        Aggregate::Sum(column) => format!("COALESCE(SUM({}), 0)", quote_ident(column)),
        Aggregate::Max(column) => format!("MAX({})", quote_ident(column)),
    };
    let mut builder = Builder::new(dialect);
    let _ = write!(
        builder.sql,
        "SELECT {} AS \"aggregate\" FROM {}",
        expr,
        quote_ident(table)
    );
    builder.where_clause(selection)?;
    Ok(builder.finish())
}

/// `SELECT col FROM <table> [WHERE]`
pub fn pluck(
    dialect: Dialect,
    table: &str,
    selection: &Selection,
    column: &str,
) -> Result<Statement> {
    let mut builder = Builder::new(dialect);
    let _ = write!(
        builder.sql,
        "SELECT {} FROM {}",
        quote_ident(column),
        quote_ident(table)
    );
    builder.where_clause(selection)?;
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{OrderDirection, Pagination};

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("name"), r#""name""#);
        assert_eq!(quote_ident("u.name"), r#""u"."name""#);
        assert_eq!(quote_ident("u.*"), r#""u".*"#);
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
    }

    #[test]
    fn test_select_by_id_with_window() {
        let query = SelectQuery::new("users")
            .fields(Fields::from(["id", "name"]))
            .filter(FilterCondition::eq("id", 5_i64).into())
            .window(Pagination::single());
        let stmt = select(Dialect::Sqlite, &query).unwrap();

        assert_eq!(
            stmt.sql,
            r#"SELECT "id", "name" FROM "users" WHERE "id" = ?1 LIMIT 1 OFFSET 0"#
        );
        assert_eq!(stmt.params, vec![Value::Integer(5)]);
    }

    #[test]
    fn test_projection_keeps_aliases() {
        let query = SelectQuery::new("users").fields(Fields::from(["u.name AS n", "id as key", "amount"]));
        let stmt = select(Dialect::Postgres, &query).unwrap();

        assert_eq!(
            stmt.sql,
            r#"SELECT "u"."name" AS "n", "id" AS "key", "amount" FROM "users""#
        );
    }

    #[test]
    fn test_hand_built_window_is_clamped() {
        let query = SelectQuery::new("users").window(Pagination {
            offset: u64::MAX,
            limit: u64::MAX,
        });
        let stmt = select(Dialect::Sqlite, &query).unwrap();

        assert!(stmt.sql.ends_with(&format!(
            "LIMIT {max} OFFSET {max}",
            max = i64::MAX
        )));
    }

    #[test]
    fn test_select_page_window() {
        let query = SelectQuery::new("users")
            .filter(Selection::raw("status = 1"))
            .order(Ordering::Raw("id desc".into()))
            .window(Pagination::page(3, 10));
        let stmt = select(Dialect::Sqlite, &query).unwrap();

        assert_eq!(
            stmt.sql,
            r#"SELECT * FROM "users" WHERE (status = 1) ORDER BY id desc LIMIT 10 OFFSET 20"#
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_select_without_criteria_reads_everything() {
        let query = SelectQuery::new("users")
            .order(Ordering::column("created_at", OrderDirection::Descending));
        let stmt = select(Dialect::Postgres, &query).unwrap();
        assert_eq!(
            stmt.sql,
            r#"SELECT * FROM "users" ORDER BY "created_at" DESC"#
        );
    }

    #[test]
    fn test_nested_selection() {
        let selection = Selection::all([
            Selection::from(FilterCondition::eq("team", "red")),
            Selection::any([
                Selection::from(FilterCondition::gt("score", 10_i64)),
                Selection::from(FilterCondition::is_null("score")),
            ]),
            Selection::raw(""),
        ]);
        let stmt = delete(Dialect::Postgres, "players", &selection).unwrap();

        assert_eq!(
            stmt.sql,
            r#"DELETE FROM "players" WHERE "team" = $1 AND ("score" > $2 OR "score" IS NULL)"#
        );
        assert_eq!(stmt.params, vec![Value::from("red"), Value::Integer(10)]);
    }

    #[test]
    fn test_equals_map_with_null_and_list() {
        let selection = Selection::equals([
            ("deleted_at", FilterValue::from(Value::Null)),
            ("id", FilterValue::from(vec![3_i64, 4])),
        ]);
        let stmt = pluck(Dialect::Sqlite, "users", &selection, "name").unwrap();
        assert_eq!(
            stmt.sql,
            r#"SELECT "name" FROM "users" WHERE "deleted_at" IS NULL AND "id" IN (?1, ?2)"#
        );
    }

    #[test]
    fn test_empty_in_list_matches_nothing() {
        let selection = Selection::from(FilterCondition::is_in("id", Vec::<i64>::new()));
        let stmt = aggregate(Dialect::Sqlite, "users", &selection, &Aggregate::Count).unwrap();
        assert_eq!(
            stmt.sql,
            r#"SELECT COUNT(*) AS "aggregate" FROM "users" WHERE 1 = 0"#
        );
    }

    #[test]
    fn test_list_with_comparison_operator_is_invalid() {
        let condition = FilterCondition::new(
            "id",
            FilterOperator::GreaterThan,
            FilterValue::List(vec![Value::Integer(1)]),
        );
        let result = delete(Dialect::Sqlite, "users", &condition.into());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_mutations_refuse_empty_selection() {
        let empty = Selection::raw("  ");
        let payload = Payload::new().set("name", "x");

        assert!(matches!(
            update(Dialect::Sqlite, "users", &empty, &payload),
            Err(Error::UnsafeStatement(_))
        ));
        assert!(matches!(
            delete(Dialect::Sqlite, "users", &Selection::All(vec![])),
            Err(Error::UnsafeStatement(_))
        ));
        assert!(matches!(
            adjust(Dialect::Postgres, "users", &empty, "counter", 1),
            Err(Error::UnsafeStatement(_))
        ));
    }

    #[test]
    fn test_insert_returning() {
        let payload = Payload::new().set("name", "ann").set("nickname", None::<String>);
        let stmt = insert(Dialect::Postgres, "users", &payload, Some("id")).unwrap();
        assert_eq!(
            stmt.sql,
            r#"INSERT INTO "users" ("name", "nickname") VALUES ($1, NULL) RETURNING CAST("id" AS BIGINT)"#
        );
        assert_eq!(stmt.params, vec![Value::from("ann")]);
    }

    #[test]
    fn test_insert_many_reorders_by_first_payload() {
        let payloads = vec![
            Payload::new().set("a", 1_i64).set("b", 2_i64),
            Payload::new().set("b", 4_i64).set("a", 3_i64),
        ];
        let stmt = insert_many(Dialect::Sqlite, "pairs", &payloads).unwrap();
        assert_eq!(
            stmt.sql,
            r#"INSERT INTO "pairs" ("a", "b") VALUES (?1, ?2), (?3, ?4)"#
        );
        assert_eq!(
            stmt.params,
            vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
                Value::Integer(4)
            ]
        );
    }

    #[test]
    fn test_insert_many_rejects_ragged_rows() {
        let payloads = vec![
            Payload::new().set("a", 1_i64).set("b", 2_i64),
            Payload::new().set("a", 3_i64).set("c", 4_i64),
        ];
        assert!(matches!(
            insert_many(Dialect::Sqlite, "pairs", &payloads),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_adjust() {
        let stmt = adjust(
            Dialect::Sqlite,
            "users",
            &Selection::raw("id > 1"),
            "counter",
            -5,
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            r#"UPDATE "users" SET "counter" = "counter" + ?1 WHERE (id > 1)"#
        );
        assert_eq!(stmt.params, vec![Value::Integer(-5)]);
    }

    #[test]
    fn test_sum_coalesces_to_zero() {
        let stmt = aggregate(
            Dialect::Postgres,
            "orders",
            &Selection::raw("status = 'paid'"),
            &Aggregate::Sum("amount".into()),
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            r#"SELECT COALESCE(SUM("amount"), 0) AS "aggregate" FROM "orders" WHERE (status = 'paid')"#
        );
    }

    #[test]
    fn test_truncate_per_dialect() {
        assert_eq!(truncate(Dialect::Sqlite, "users").sql, r#"DELETE FROM "users""#);
        assert_eq!(
            truncate(Dialect::Postgres, "users").sql,
            r#"TRUNCATE TABLE "users" RESTART IDENTITY"#
        );
        assert_eq!(reset_sequence("users").params, vec![Value::from("users")]);
    }
}
