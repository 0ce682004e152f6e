/*
Table B-trees are keyed by rowid. An interior page's cell carries a left
child pointer and a rowid upper bound; the spec's invariant is that every
key in the subtree under a cell's left child is <= that cell's key, and
every key under the right-most child is > the last cell's key. A leaf page
carries the actual row payloads.

Traversal is done with an explicit stack rather than native recursion, per
the file-format note that an interior page chain can run arbitrarily deep
(§9: "prefer an explicit stack to bound recursion depth to O(tree_height)").
*/

use log::debug;

use crate::cell::{parse_table_interior_cell, parse_table_leaf_cell};
use crate::error::{EngineError, Result};
use crate::page::{Page, PageType, Pager};
use crate::serial::Value;

/// A single decoded table row: its rowid plus the stored (non-`id`) column
/// values in declared order.
#[derive(Debug, Clone)]
pub struct Row {
    pub rowid: i64,
    pub values: Vec<Value>,
}

/// An optional single equality predicate evaluated during a full scan,
/// expressed against already-decoded rows so the traversal itself stays
/// ignorant of SQL. `column_is_id` picks the rowid-vs-integer branch;
/// otherwise `stored_index` names which decoded column to compare and
/// `literal` is the raw byte content to match (quotes already stripped).
pub enum ScanFilter<'a> {
    Rowid(i64),
    Column { stored_index: usize, literal: &'a [u8] },
}

impl ScanFilter<'_> {
    fn matches(&self, row: &Row) -> bool {
        match self {
            ScanFilter::Rowid(target) => row.rowid == *target,
            ScanFilter::Column { stored_index, literal } => row
                .values
                .get(*stored_index)
                .and_then(Value::as_bytes)
                .map(|bytes| bytes == *literal)
                .unwrap_or(false),
        }
    }
}

/// Full scan of a table B-tree rooted at `root_page`, decoding each leaf
/// cell's record with `column_count` stored columns, in ascending key
/// order. If `filter` is given, only matching rows are returned.
pub fn full_scan(
    pager: &Pager,
    root_page: u32,
    column_count: usize,
    filter: Option<&ScanFilter>,
) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    let mut stack = vec![root_page];

    while let Some(page_number) = stack.pop() {
        let page = pager.read_page(page_number)?;

        match page.header.page_type {
            PageType::LeafTable => {
                for &pointer in &page.cell_pointers {
                    let cell = parse_table_leaf_cell(
                        page.cell_bytes(pointer),
                        pager.page_size(),
                        pager.reserved_bytes(),
                        column_count,
                    )?;
                    let row = Row {
                        rowid: cell.rowid,
                        values: cell.record,
                    };
                    if filter.map(|f| f.matches(&row)).unwrap_or(true) {
                        rows.push(row);
                    }
                }
            }
            PageType::InteriorTable => {
                // Push in reverse order so the leftmost child is processed
                // first despite the stack's LIFO pop order.
                stack.push(right_most_child(&page)?);
                for &pointer in page.cell_pointers.iter().rev() {
                    let cell = parse_table_interior_cell(page.cell_bytes(pointer))?;
                    stack.push(cell.left_child_page);
                }
            }
            other => {
                return Err(EngineError::Malformed(format!(
                    "expected a table b-tree page, found {other:?}"
                )))
            }
        }
    }

    Ok(rows)
}

/// Point lookup for a single rowid. Leaf pages are scanned linearly;
/// interior pages descend into the first child whose key is `>= target`
/// (a cell's key is an upper bound on its left subtree), falling back to
/// the right-most child.
pub fn search_by_rowid(
    pager: &Pager,
    root_page: u32,
    column_count: usize,
    target: i64,
) -> Result<Option<Row>> {
    let mut page_number = root_page;

    loop {
        let page = pager.read_page(page_number)?;

        match page.header.page_type {
            PageType::LeafTable => {
                for &pointer in &page.cell_pointers {
                    let cell = parse_table_leaf_cell(
                        page.cell_bytes(pointer),
                        pager.page_size(),
                        pager.reserved_bytes(),
                        column_count,
                    )?;
                    if cell.rowid == target {
                        return Ok(Some(Row {
                            rowid: cell.rowid,
                            values: cell.record,
                        }));
                    }
                }
                return Ok(None);
            }
            PageType::InteriorTable => {
                let mut next_page = None;
                for &pointer in &page.cell_pointers {
                    let cell = parse_table_interior_cell(page.cell_bytes(pointer))?;
                    if cell.rowid_key >= target {
                        next_page = Some(cell.left_child_page);
                        break;
                    }
                }
                page_number = match next_page {
                    Some(p) => p,
                    None => right_most_child(&page)?,
                };
                debug!("descending to page {page_number} searching for rowid {target}");
            }
            other => {
                return Err(EngineError::Malformed(format!(
                    "expected a table b-tree page, found {other:?}"
                )))
            }
        }
    }
}

fn right_most_child(page: &Page) -> Result<u32> {
    page.header
        .right_most_pointer
        .ok_or_else(|| EngineError::Malformed("interior page missing right-most pointer".into()))
}
