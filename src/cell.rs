/*
Table B-Tree Leaf Cell (header 0x0D):
  varint payload_size, varint rowid, record

Table B-Tree Interior Cell (header 0x05):
  u32 left_child_page, varint rowid_key

Index B-Tree Leaf Cell (header 0x0A):
  varint payload_size, record (index columns ..., trailing rowid)

Index B-Tree Interior Cell (header 0x02):
  u32 left_child_page, varint payload_size, record (same shape as leaf)
*/

use crate::error::{EngineError, Result};
use crate::record::decode_record;
use crate::serial::Value;
use crate::varint::{read_varint, Cursor};

/// Usable page size per the file-format spec: total page size less the
/// per-page reserved region (usually 0).
fn usable_page_size(page_size: u32, reserved_bytes: u8) -> i64 {
    page_size as i64 - reserved_bytes as i64
}

/// Max payload bytes a table-leaf cell can store inline before spilling to
/// overflow pages. `X = U - 35`.
fn table_leaf_overflow_threshold(usable: i64) -> i64 {
    usable - 35
}

/// Max payload bytes an index cell (leaf or interior) can store inline.
/// `X = ((U-12)*64/255) - 23`.
fn index_overflow_threshold(usable: i64) -> i64 {
    ((usable - 12) * 64 / 255) - 23
}

fn reject_overflow(payload_size: i64, threshold: i64) -> Result<()> {
    if payload_size > threshold {
        Err(EngineError::Malformed(format!(
            "cell payload of {payload_size} bytes spills onto overflow pages (max inline {threshold}); overflow payloads are not supported"
        )))
    } else {
        Ok(())
    }
}

pub struct TableLeafCell {
    pub rowid: i64,
    pub record: Vec<Value>,
}

pub fn parse_table_leaf_cell(
    bytes: &[u8],
    page_size: u32,
    reserved_bytes: u8,
    column_count: usize,
) -> Result<TableLeafCell> {
    let mut cursor = Cursor::new(bytes);
    let payload_size = read_varint(&mut cursor)? as i64;
    let rowid = read_varint(&mut cursor)? as i64;

    reject_overflow(
        payload_size,
        table_leaf_overflow_threshold(usable_page_size(page_size, reserved_bytes)),
    )?;

    let body = &bytes[cursor.position()..];
    let (record, _) = decode_record(body, column_count)?;
    Ok(TableLeafCell { rowid, record })
}

pub struct TableInteriorCell {
    pub left_child_page: u32,
    pub rowid_key: i64,
}

pub fn parse_table_interior_cell(bytes: &[u8]) -> Result<TableInteriorCell> {
    let mut cursor = Cursor::new(bytes);
    let left_child_page = cursor.read_u32_be()?;
    let rowid_key = read_varint(&mut cursor)? as i64;
    Ok(TableInteriorCell {
        left_child_page,
        rowid_key,
    })
}

/// Record columns for both index cell kinds are the indexed column(s)
/// followed by the trailing rowid, per §3.
pub struct IndexLeafCell {
    pub record: Vec<Value>,
}

pub fn parse_index_leaf_cell(
    bytes: &[u8],
    page_size: u32,
    reserved_bytes: u8,
) -> Result<IndexLeafCell> {
    let mut cursor = Cursor::new(bytes);
    let payload_size = read_varint(&mut cursor)? as i64;

    reject_overflow(
        payload_size,
        index_overflow_threshold(usable_page_size(page_size, reserved_bytes)),
    )?;

    let body = &bytes[cursor.position()..];
    let (record, _) = decode_record(body, 2)?;
    Ok(IndexLeafCell { record })
}

pub struct IndexInteriorCell {
    pub left_child_page: u32,
    pub record: Vec<Value>,
}

pub fn parse_index_interior_cell(
    bytes: &[u8],
    page_size: u32,
    reserved_bytes: u8,
) -> Result<IndexInteriorCell> {
    let mut cursor = Cursor::new(bytes);
    let left_child_page = cursor.read_u32_be()?;
    let payload_size = read_varint(&mut cursor)? as i64;

    reject_overflow(
        payload_size,
        index_overflow_threshold(usable_page_size(page_size, reserved_bytes)),
    )?;

    let body = &bytes[cursor.position()..];
    let (record, _) = decode_record(body, 2)?;
    Ok(IndexInteriorCell {
        left_child_page,
        record,
    })
}

/// Extracts the rowid, which is always the last column of an index record.
pub fn index_record_rowid(record: &[Value]) -> Result<i64> {
    record
        .last()
        .and_then(Value::as_integer)
        .ok_or_else(|| EngineError::Malformed("index record missing integer rowid column".into()))
}
