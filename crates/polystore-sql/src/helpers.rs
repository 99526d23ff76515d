//! Statement-building sugar over the SQL capability
//!
//! Small CRUD helpers for callers that hold a `Record`/`Filter` and do not
//! want to assemble SQL by hand. Identifiers are quoted; values always travel
//! as bound parameters, never interpolated.

use polystore_core::error::{AdapterError, AdapterResult};
use polystore_core::traits::{ExecuteResult, SqlAdapter};
use polystore_core::value::{Filter, Record, Value};

use crate::placeholder::quote_identifier;

/// Select all rows from `table`, optionally narrowed by an equality filter.
pub async fn select_all(
    sql: &dyn SqlAdapter,
    table: &str,
    filter: Option<&Filter>,
) -> AdapterResult<Vec<Record>> {
    let (statement, params) = build_select(table, filter);
    sql.query(&statement, &params).await
}

/// Insert one row built from `record`.
pub async fn insert(
    sql: &dyn SqlAdapter,
    table: &str,
    record: &Record,
) -> AdapterResult<ExecuteResult> {
    let (statement, params) = build_insert(table, record)?;
    sql.execute(&statement, &params).await
}

/// Update the columns in `changes` on every row matching `filter`.
///
/// An empty filter updates the whole table.
pub async fn update_where(
    sql: &dyn SqlAdapter,
    table: &str,
    changes: &Record,
    filter: &Filter,
) -> AdapterResult<ExecuteResult> {
    let (statement, params) = build_update(table, changes, filter)?;
    sql.execute(&statement, &params).await
}

/// Delete every row matching `filter`. An empty filter deletes the whole
/// table.
pub async fn delete_where(
    sql: &dyn SqlAdapter,
    table: &str,
    filter: &Filter,
) -> AdapterResult<ExecuteResult> {
    let (statement, params) = build_delete(table, filter);
    sql.execute(&statement, &params).await
}

fn build_select(table: &str, filter: Option<&Filter>) -> (String, Vec<Value>) {
    let mut statement = format!("SELECT * FROM {}", quote_identifier(table));
    let mut params = Vec::new();
    if let Some(filter) = filter {
        append_where(&mut statement, &mut params, filter);
    }
    (statement, params)
}

fn build_insert(table: &str, record: &Record) -> AdapterResult<(String, Vec<Value>)> {
    if record.is_empty() {
        return Err(AdapterError::operation_failed("insert with no columns"));
    }

    let columns: Vec<String> = record.names().map(quote_identifier).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let statement = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns.join(", "),
        placeholders
    );
    let params = record.iter().map(|(_, value)| value.clone()).collect();
    Ok((statement, params))
}

fn build_update(
    table: &str,
    changes: &Record,
    filter: &Filter,
) -> AdapterResult<(String, Vec<Value>)> {
    if changes.is_empty() {
        return Err(AdapterError::operation_failed("update with no columns"));
    }

    let assignments: Vec<String> = changes
        .names()
        .map(|name| format!("{} = ?", quote_identifier(name)))
        .collect();
    let mut statement = format!(
        "UPDATE {} SET {}",
        quote_identifier(table),
        assignments.join(", ")
    );
    let mut params: Vec<Value> = changes.iter().map(|(_, value)| value.clone()).collect();
    append_where(&mut statement, &mut params, filter);
    Ok((statement, params))
}

fn build_delete(table: &str, filter: &Filter) -> (String, Vec<Value>) {
    let mut statement = format!("DELETE FROM {}", quote_identifier(table));
    let mut params = Vec::new();
    append_where(&mut statement, &mut params, filter);
    (statement, params)
}

/// Append a WHERE clause from equality terms. Null terms become `IS NULL`
/// with no bound parameter.
fn append_where(statement: &mut String, params: &mut Vec<Value>, filter: &Filter) {
    if filter.is_empty() {
        return;
    }

    let mut clauses = Vec::with_capacity(filter.len());
    for (field, value) in filter.iter() {
        if value.is_null() {
            clauses.push(format!("{} IS NULL", quote_identifier(field)));
        } else {
            clauses.push(format!("{} = ?", quote_identifier(field)));
            params.push(value.clone());
        }
    }

    statement.push_str(" WHERE ");
    statement.push_str(&clauses.join(" AND "));
}
