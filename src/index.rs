/*
Equality search over an index b-tree, per the file format's "record on
every index page is two columns: (indexed_value, rowid)" shape. An
interior page carries a left child before each cell's own record; the two
flags below mirror the source's traversal exactly, including its
documented behavior at the boundary where the search value equals an
interior page's largest key: a node whose cells are all matches still
recurses into its right child, since later pages may hold more matches.
*/

use crate::cell::{index_record_rowid, parse_index_interior_cell, parse_index_leaf_cell};
use crate::error::{EngineError, Result};
use crate::page::{Page, PageType, Pager};
use crate::serial::Value;

/// Returns every rowid whose indexed value's raw byte content equals
/// `target`, in tree order.
pub fn search_equal(pager: &Pager, root_page: u32, target: &[u8]) -> Result<Vec<i64>> {
    let mut out = Vec::new();
    search_node(pager, root_page, target, &mut out)?;
    Ok(out)
}

fn compare_to_target(value: &Value, target: &[u8]) -> std::cmp::Ordering {
    match value.as_bytes() {
        Some(bytes) => bytes.cmp(target),
        None => std::cmp::Ordering::Less,
    }
}

fn search_node(pager: &Pager, page_number: u32, target: &[u8], out: &mut Vec<i64>) -> Result<()> {
    let page = pager.read_page(page_number)?;
    let interior = match page.header.page_type {
        PageType::LeafIndex => false,
        PageType::InteriorIndex => true,
        other => {
            return Err(EngineError::Malformed(format!(
                "expected an index b-tree page, found {other:?}"
            )))
        }
    };

    let mut matched_in_node = false;
    let mut trailing_mismatch = false;
    let mut first_cell_exceeded = false;

    for (index, &pointer) in page.cell_pointers.iter().enumerate() {
        let bytes = page.cell_bytes(pointer);
        let (left_child, record) = if interior {
            let cell = parse_index_interior_cell(bytes, pager.page_size(), pager.reserved_bytes())?;
            (Some(cell.left_child_page), cell.record)
        } else {
            let cell = parse_index_leaf_cell(bytes, pager.page_size(), pager.reserved_bytes())?;
            (None, cell.record)
        };

        let value = record
            .first()
            .ok_or_else(|| EngineError::Malformed("index record missing indexed value column".into()))?;
        let ordering = compare_to_target(value, target);

        if matched_in_node && ordering != std::cmp::Ordering::Equal {
            trailing_mismatch = true;
            break;
        }

        if ordering != std::cmp::Ordering::Less {
            if ordering == std::cmp::Ordering::Equal {
                matched_in_node = true;
                if let Some(child) = left_child {
                    search_node(pager, child, target, out)?;
                }
                out.push(index_record_rowid(&record)?);
            } else {
                if index == 0 {
                    first_cell_exceeded = true;
                }
                if let Some(child) = left_child {
                    search_node(pager, child, target, out)?;
                }
                break;
            }
        }
    }

    if interior && !first_cell_exceeded && !(matched_in_node && trailing_mismatch) {
        let right_child = right_most_child(&page)?;
        search_node(pager, right_child, target, out)?;
    }

    Ok(())
}

fn right_most_child(page: &Page) -> Result<u32> {
    page.header
        .right_most_pointer
        .ok_or_else(|| EngineError::Malformed("interior index page missing right-most pointer".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn varint(value: u64) -> Vec<u8> {
        if value < 0x80 {
            vec![value as u8]
        } else {
            vec![0x80 | ((value >> 7) as u8 & 0x7f), (value & 0x7f) as u8]
        }
    }

    fn record_bytes(text: &[u8], rowid: i64) -> Vec<u8> {
        // header: size, serial(text), serial(rowid as small int => use I8 serial type 1)
        let text_serial = (text.len() as i64) * 2 + 13;
        let mut header = vec![0u8]; // placeholder for header size
        header.extend(varint(text_serial as u64));
        header.push(1); // serial type 1 == I8
        header[0] = header.len() as u8;
        let mut body = header;
        body.extend_from_slice(text);
        body.push(rowid as u8);
        body
    }

    fn write_leaf_index_page(entries: &[(&[u8], i64)]) -> Vec<u8> {
        let page_size = 512usize;
        let mut page = vec![0u8; page_size];
        page[0] = 0x0A;
        page[3..5].copy_from_slice(&(entries.len() as u16).to_be_bytes());

        let mut content_cursor = page_size;
        let mut pointers = Vec::new();
        for (text, rowid) in entries.iter().rev() {
            let record = record_bytes(text, *rowid);
            let mut cell = varint(record.len() as u64);
            cell.extend_from_slice(&record);
            content_cursor -= cell.len();
            page[content_cursor..content_cursor + cell.len()].copy_from_slice(&cell);
            pointers.push(content_cursor as u16);
        }
        pointers.reverse();
        page[5..7].copy_from_slice(&(content_cursor as u16).to_be_bytes());

        let mut cursor = std::io::Cursor::new(&mut page[8..8 + pointers.len() * 2]);
        for p in &pointers {
            cursor.write_all(&p.to_be_bytes()).unwrap();
        }
        page
    }

    #[test]
    fn finds_all_matching_rowids_on_single_leaf_page() {
        let page = write_leaf_index_page(&[(b"aa", 1), (b"bb", 2), (b"bb", 3), (b"cc", 4)]);
        let dir = std::env::temp_dir().join(format!("index-test-{}", std::process::id()));
        std::fs::write(&dir, &page).unwrap();
        let pager = Pager::open(dir.to_str().unwrap(), 512).unwrap();

        let mut rowids = search_equal(&pager, 1, b"bb").unwrap();
        rowids.sort();
        assert_eq!(rowids, vec![2, 3]);

        std::fs::remove_file(&dir).ok();
    }

    #[test]
    fn no_match_returns_empty() {
        let page = write_leaf_index_page(&[(b"aa", 1), (b"cc", 4)]);
        let dir = std::env::temp_dir().join(format!("index-test2-{}", std::process::id()));
        std::fs::write(&dir, &page).unwrap();
        let pager = Pager::open(dir.to_str().unwrap(), 512).unwrap();

        let rowids = search_equal(&pager, 1, b"bb").unwrap();
        assert!(rowids.is_empty());

        std::fs::remove_file(&dir).ok();
    }
}
