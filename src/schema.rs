/*
The database header occupies the first 100 bytes of page 1.

Offset  Size  Description
0       16    header string "SQLite format 3\000"
16      2     page size in bytes, or 1 for 65536
18      1     file format write version
19      1     file format read version
20      1     reserved bytes per page
21-23   3     max/min embedded payload fraction, leaf payload fraction
24      4     file change counter
28      4     database size in pages
32      4     first freelist trunk page
36      4     total freelist pages
40      4     schema cookie
44      4     schema format number
48      4     default page cache size
52      4     largest root b-tree page (vacuum only)
56      4     text encoding
60      4     user version
64      4     incremental-vacuum mode
68      4     application id
92      4     version-valid-for number
96      4     sqlite version number

The schema catalog itself is just the table rooted at page 1: a table
b-tree whose rows are 5-column records (type, name, tbl_name, rootpage,
sql). Table/index column lists are recovered from the stored SQL text with
the same naive parse real tools use for this file format: split the
substring between the outermost parentheses on top-level commas, first
whitespace-delimited token of each piece is the column name.
*/

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

use crate::btree::{full_scan, Row};
use crate::error::{EngineError, Result};
use crate::page::{Pager, DATABASE_HEADER_SIZE};
use crate::serial::Value;

#[derive(Debug, Clone)]
pub struct DatabaseHeader {
    pub page_size: u32,
    pub file_format_write_version: u8,
    pub file_format_read_version: u8,
    pub reserved_bytes_per_page: u8,
    pub file_change_counter: u32,
    pub database_size_pages: u32,
    pub schema_cookie: u32,
    pub schema_format_number: u32,
    pub text_encoding: u32,
    pub user_version: u32,
    pub application_id: u32,
}

impl DatabaseHeader {
    pub fn read(path: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buf = [0u8; DATABASE_HEADER_SIZE];
        file.read_exact(&mut buf)?;

        if &buf[0..16] != b"SQLite format 3\0" {
            return Err(EngineError::Malformed(
                "missing \"SQLite format 3\" header string".into(),
            ));
        }

        let u16_at = |offset: usize| u16::from_be_bytes([buf[offset], buf[offset + 1]]);
        let u32_at = |offset: usize| {
            u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
        };

        let raw_page_size = u16_at(16);
        let page_size = if raw_page_size == 1 {
            65536
        } else {
            raw_page_size as u32
        };

        Ok(DatabaseHeader {
            page_size,
            file_format_write_version: buf[18],
            file_format_read_version: buf[19],
            reserved_bytes_per_page: buf[20],
            file_change_counter: u32_at(24),
            database_size_pages: u32_at(28),
            schema_cookie: u32_at(40),
            schema_format_number: u32_at(44),
            text_encoding: u32_at(56),
            user_version: u32_at(60),
            application_id: u32_at(68),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SchemaEntry {
    pub object_type: String,
    pub name: String,
    pub table_name: String,
    pub root_page: u32,
    pub sql: Option<Vec<u8>>,
}

/// A resolved table: its root page and full declared column list, in
/// declared order, including the synthetic `id` column where present.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub root_page: u32,
    pub columns: Vec<String>,
}

impl TableSchema {
    pub fn id_position(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case("id"))
    }

    /// Columns actually present in each row's record body, i.e. every
    /// declared column except `id`.
    pub fn stored_column_count(&self) -> usize {
        self.columns.len() - self.id_position().map(|_| 1).unwrap_or(0)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::UnknownColumn(name.to_string()))
    }

    /// Maps a declared-column index to its position within a row's decoded
    /// `values` (which excludes `id` entirely), or `None` for the `id`
    /// column itself.
    pub fn stored_index_of(&self, declared_index: usize) -> Option<usize> {
        if Some(declared_index) == self.id_position() {
            return None;
        }
        Some(
            self.columns[..declared_index]
                .iter()
                .filter(|c| !c.eq_ignore_ascii_case("id"))
                .count(),
        )
    }

    pub fn value_at(&self, row: &Row, declared_index: usize) -> Value {
        match self.stored_index_of(declared_index) {
            None => Value::Integer(row.rowid),
            Some(stored) => row
                .values
                .get(stored)
                .cloned()
                .unwrap_or(Value::Null),
        }
    }
}

/// The full `sqlite_schema` catalog, decoded once per command from page 1.
pub struct Catalog {
    entries: Vec<SchemaEntry>,
}

impl Catalog {
    pub fn build(pager: &Pager) -> Result<Self> {
        let rows = full_scan(pager, 1, 5, None)?;
        let mut entries = Vec::with_capacity(rows.len());

        for row in rows {
            let object_type = text_column(&row, 0)?;
            let name = text_column(&row, 1)?;
            let table_name = text_column(&row, 2)?;
            let root_page = match row.values.get(3) {
                Some(Value::Integer(n)) => *n as u32,
                _ => {
                    return Err(EngineError::Malformed(
                        "sqlite_schema rootpage column is not an integer".into(),
                    ))
                }
            };
            let sql = match row.values.get(4) {
                Some(Value::Text(bytes)) => Some(bytes.clone()),
                _ => None,
            };

            entries.push(SchemaEntry {
                object_type,
                name,
                table_name,
                root_page,
                sql,
            });
        }

        Ok(Catalog { entries })
    }

    pub fn count_tables(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.object_type == "table")
            .count()
    }

    /// Table names in catalog order, excluding the internal
    /// `sqlite_sequence` bookkeeping table.
    pub fn list_tables(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.object_type == "table" && e.table_name != "sqlite_sequence")
            .map(|e| e.table_name.as_str())
            .collect()
    }

    pub fn resolve_table(&self, name: &str) -> Result<TableSchema> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.object_type == "table" && e.table_name.eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::UnknownTable(name.to_string()))?;

        let sql = entry
            .sql
            .as_deref()
            .ok_or_else(|| EngineError::Malformed(format!("table {name} has no CREATE TABLE sql")))?;

        Ok(TableSchema {
            root_page: entry.root_page,
            columns: parse_column_list(sql)?,
        })
    }

    /// Maps `(table_name, indexed_column)` to the index's root page, for
    /// every index entry whose indexed column can be naively recovered from
    /// its SQL text.
    pub fn indexes(&self) -> HashMap<(String, String), u32> {
        let mut map = HashMap::new();
        for entry in &self.entries {
            if entry.object_type != "index" {
                continue;
            }
            if let Some(sql) = &entry.sql {
                if let Ok(column) = parse_index_column(sql) {
                    map.insert(
                        (entry.table_name.to_lowercase(), column.to_lowercase()),
                        entry.root_page,
                    );
                }
            }
        }
        map
    }
}

fn text_column(row: &Row, index: usize) -> Result<String> {
    match row.values.get(index) {
        Some(Value::Text(bytes)) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        _ => Err(EngineError::Malformed(
            "sqlite_schema row missing expected text column".into(),
        )),
    }
}

/// Naive column-list extraction: take the substring between the outermost
/// `(` and the last `)`, split on commas, and keep the first
/// whitespace-delimited token of each piece. This does not understand
/// quoted identifiers, nested parentheses in column constraints, or
/// multi-word type names — which matches the fragile, by-design behavior
/// this file format's simplest readers have always had.
pub fn parse_column_list(sql: &[u8]) -> Result<Vec<String>> {
    let sql_str = String::from_utf8_lossy(sql);
    let open = sql_str
        .find('(')
        .ok_or_else(|| EngineError::Malformed("create table statement missing '('".into()))?;
    let close = sql_str
        .rfind(')')
        .ok_or_else(|| EngineError::Malformed("create table statement missing ')'".into()))?;

    if close <= open {
        return Err(EngineError::Malformed(
            "create table statement has no column list between parentheses".into(),
        ));
    }

    let inner = &sql_str[open + 1..close];
    let mut columns = Vec::new();
    for piece in inner.split(',') {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            continue;
        }
        let name = trimmed.split_whitespace().next().unwrap_or("");
        columns.push(name.trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']').to_string());
    }

    Ok(columns)
}

/// Naive indexed-column extraction for `CREATE INDEX ... (col)` statements:
/// whitespace stripped from between the outermost parentheses.
pub fn parse_index_column(sql: &[u8]) -> Result<String> {
    let sql_str = String::from_utf8_lossy(sql);
    let open = sql_str
        .find('(')
        .ok_or_else(|| EngineError::Malformed("create index statement missing '('".into()))?;
    let close = sql_str
        .rfind(')')
        .ok_or_else(|| EngineError::Malformed("create index statement missing ')'".into()))?;
    if close <= open {
        return Err(EngineError::Malformed(
            "create index statement has no column between parentheses".into(),
        ));
    }
    Ok(sql_str[open + 1..close].chars().filter(|c| !c.is_whitespace()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_column_list() {
        let sql = b"CREATE TABLE apples\n(\n\tid integer primary key,\n\tname text,\n\tcolor text\n)";
        let columns = parse_column_list(sql).unwrap();
        assert_eq!(columns, vec!["id", "name", "color"]);
    }

    #[test]
    fn parses_column_list_with_inline_constraints() {
        let sql = b"CREATE TABLE t (a INTEGER, b TEXT NOT NULL, c REAL DEFAULT 0)";
        let columns = parse_column_list(sql).unwrap();
        assert_eq!(columns, vec!["a", "b", "c"]);
    }

    #[test]
    fn parses_index_column() {
        let sql = b"CREATE INDEX idx_color ON apples (color)";
        assert_eq!(parse_index_column(sql).unwrap(), "color");
    }

    #[test]
    fn table_schema_maps_id_to_rowid() {
        let schema = TableSchema {
            root_page: 2,
            columns: vec!["id".into(), "name".into(), "color".into()],
        };
        let row = Row {
            rowid: 9,
            values: vec![Value::Text(b"fuji".to_vec()), Value::Text(b"red".to_vec())],
        };
        assert_eq!(schema.value_at(&row, 0), Value::Integer(9));
        assert_eq!(schema.value_at(&row, 1), Value::Text(b"fuji".to_vec()));
        assert_eq!(schema.stored_column_count(), 2);
    }
}
