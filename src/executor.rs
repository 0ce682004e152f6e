/*
Binds a parsed query plan to the schema catalog and runs it:

  1. Resolve the table.
  2. If a predicate exists and its column is indexed, traverse the index
     for matching rowids and point-look-up each one in the table tree.
  3. Otherwise, full-scan the table with an optional equality filter
     evaluated inline.
  4. Apply the projection and format each row into `|`-joined cells.
*/

use crate::btree::{full_scan, search_by_rowid, Row, ScanFilter};
use crate::error::{EngineError, Result};
use crate::index;
use crate::page::Pager;
use crate::schema::{Catalog, TableSchema};
use crate::serial::Value;
use crate::sql::{Literal, Predicate, Projection, SelectPlan};

/// Runs a `SELECT` plan end to end and returns the rendered output lines,
/// one per row (or a single line for `COUNT(*)`).
pub fn execute(pager: &Pager, catalog: &Catalog, plan: &SelectPlan) -> Result<Vec<String>> {
    let table = catalog.resolve_table(&plan.table)?;
    let rows = gather_rows(pager, catalog, &plan.table, &table, plan.predicate.as_ref())?;
    render(&table, &plan.projection, &rows)
}

fn gather_rows(
    pager: &Pager,
    catalog: &Catalog,
    table_name: &str,
    table: &TableSchema,
    predicate: Option<&Predicate>,
) -> Result<Vec<Row>> {
    let predicate = match predicate {
        Some(p) => p,
        None => return full_scan(pager, table.root_page, table.stored_column_count(), None),
    };

    let column_index = table.column_index(&predicate.column)?;

    // Rule (a): `id` is the rowid alias, so its equality arm compares
    // against the cell's rowid regardless of whether the literal was
    // written quoted or bare.
    if Some(column_index) == table.id_position() {
        let target = literal_as_integer(&predicate.literal)?;
        let filter = ScanFilter::Rowid(target);
        return full_scan(
            pager,
            table.root_page,
            table.stored_column_count(),
            Some(&filter),
        );
    }

    // Rule (b): byte-content equality. An unquoted integer literal has no
    // quotes to strip, so it compares using its decimal text form.
    let literal_bytes = literal_as_bytes(&predicate.literal);

    if let Some(&root) = catalog
        .indexes()
        .get(&(table_name.to_lowercase(), predicate.column.clone()))
    {
        let rowids = index::search_equal(pager, root, &literal_bytes)?;
        let mut rows = Vec::with_capacity(rowids.len());
        for rowid in rowids {
            if let Some(row) =
                search_by_rowid(pager, table.root_page, table.stored_column_count(), rowid)?
            {
                rows.push(row);
            }
        }
        return Ok(rows);
    }

    let stored_index = table
        .stored_index_of(column_index)
        .expect("non-id column always has a stored index");
    let filter = ScanFilter::Column {
        stored_index,
        literal: &literal_bytes,
    };
    full_scan(pager, table.root_page, table.stored_column_count(), Some(&filter))
}

/// Rule (a)'s integer form: a bare integer literal is used as-is; a quoted
/// one is int-parsed, since §4.7 allows either form for `<literal>` and §4.5
/// does not restrict the rowid-equality arm to the unquoted spelling.
fn literal_as_integer(literal: &Literal) -> Result<i64> {
    match literal {
        Literal::Integer(n) => Ok(*n),
        Literal::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| {
                EngineError::ParseError(format!(
                    "id predicate literal {:?} is not an integer",
                    String::from_utf8_lossy(bytes)
                ))
            }),
    }
}

/// Rule (b)'s byte form: a quoted literal is already raw text bytes; a bare
/// integer literal has no quotes to strip, so its decimal text form is the
/// byte content to compare against.
fn literal_as_bytes(literal: &Literal) -> Vec<u8> {
    match literal {
        Literal::Text(bytes) => bytes.clone(),
        Literal::Integer(n) => n.to_string().into_bytes(),
    }
}

fn render(table: &TableSchema, projection: &Projection, rows: &[Row]) -> Result<Vec<String>> {
    match projection {
        Projection::CountStar => Ok(vec![rows.len().to_string()]),
        Projection::Columns(columns) => {
            let indices = columns
                .iter()
                .map(|c| table.column_index(c))
                .collect::<Result<Vec<_>>>()?;

            Ok(rows
                .iter()
                .map(|row| {
                    indices
                        .iter()
                        .map(|&idx| format_cell(&table.value_at(row, idx)))
                        .collect::<Vec<_>>()
                        .join("|")
                })
                .collect())
        }
    }
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(n) => n.to_string(),
        Value::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableSchema {
        TableSchema {
            root_page: 2,
            columns: vec!["id".into(), "name".into(), "color".into()],
        }
    }

    fn row(rowid: i64, name: &str, color: &str) -> Row {
        Row {
            rowid,
            values: vec![
                Value::Text(name.as_bytes().to_vec()),
                Value::Text(color.as_bytes().to_vec()),
            ],
        }
    }

    #[test]
    fn renders_count_star() {
        let rows = vec![row(1, "a", "red"), row(2, "b", "green")];
        let out = render(&table(), &Projection::CountStar, &rows).unwrap();
        assert_eq!(out, vec!["2"]);
    }

    #[test]
    fn renders_column_list_with_pipe_separator() {
        let rows = vec![row(3, "Golden", "Yellow")];
        let out = render(
            &table(),
            &Projection::Columns(vec!["id".into(), "name".into()]),
            &rows,
        )
        .unwrap();
        assert_eq!(out, vec!["3|Golden"]);
    }

    #[test]
    fn renders_null_as_empty_string() {
        let row = Row {
            rowid: 1,
            values: vec![Value::Null, Value::Text(b"x".to_vec())],
        };
        let out = render(&table(), &Projection::Columns(vec!["name".into()]), &[row]).unwrap();
        assert_eq!(out, vec![""]);
    }

    #[test]
    fn id_predicate_accepts_both_literal_forms() {
        assert_eq!(literal_as_integer(&Literal::Integer(5)).unwrap(), 5);
        assert_eq!(
            literal_as_integer(&Literal::Text(b"5".to_vec())).unwrap(),
            5
        );
    }

    #[test]
    fn id_predicate_rejects_non_integer_text() {
        assert!(literal_as_integer(&Literal::Text(b"five".to_vec())).is_err());
    }

    #[test]
    fn column_predicate_formats_both_literal_forms_as_bytes() {
        assert_eq!(literal_as_bytes(&Literal::Text(b"Yellow".to_vec())), b"Yellow");
        assert_eq!(literal_as_bytes(&Literal::Integer(5)), b"5");
    }
}
