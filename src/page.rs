/*
A b-tree page is divided into regions in the following order:
  the 100-byte database file header (page 1 only)
  the 8- or 12-byte b-tree page header
  the cell pointer array
  unallocated space
  the cell content area

B-tree Page Header Format
Offset  Size  Description
0       1     page type: 0x02 interior-index, 0x05 interior-table,
              0x0A leaf-index, 0x0D leaf-table
1       2     start of the first freeblock, or 0
3       2     number of cells
5       2     start of the cell content area
7       1     number of fragmented free bytes
8       4     right-most child page number (interior pages only)
*/

use std::cell::Cell;
use std::convert::TryInto;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use log::debug;

use crate::error::{EngineError, Result};

pub const DATABASE_HEADER_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    InteriorIndex,
    InteriorTable,
    LeafIndex,
    LeafTable,
}

impl PageType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0x02 => Ok(PageType::InteriorIndex),
            0x05 => Ok(PageType::InteriorTable),
            0x0A => Ok(PageType::LeafIndex),
            0x0D => Ok(PageType::LeafTable),
            other => Err(EngineError::Malformed(format!(
                "invalid b-tree page type 0x{other:02x}"
            ))),
        }
    }

    pub fn is_interior(&self) -> bool {
        matches!(self, PageType::InteriorIndex | PageType::InteriorTable)
    }

    pub fn is_index(&self) -> bool {
        matches!(self, PageType::InteriorIndex | PageType::LeafIndex)
    }
}

#[derive(Debug, Clone)]
pub struct PageHeader {
    pub page_type: PageType,
    pub first_free_block: u16,
    pub cell_count: u16,
    pub content_area_start: u16,
    pub fragmented_free_bytes: u8,
    pub right_most_pointer: Option<u32>,
}

impl PageHeader {
    /// 8 bytes for leaf pages, 12 for interior (the extra right-most
    /// pointer), per §3.
    pub fn len(&self) -> usize {
        if self.right_most_pointer.is_some() {
            12
        } else {
            8
        }
    }
}

/// A fully parsed B-tree page: header, cell pointer array, and the raw page
/// bytes (cell content is read lazily against this buffer by callers, since
/// cell offsets in the pointer array are relative to the start of the
/// page).
#[derive(Debug, Clone)]
pub struct Page {
    pub header: PageHeader,
    pub cell_pointers: Vec<u16>,
    pub bytes: Vec<u8>,
}

impl Page {
    /// Parses a page's header and cell-pointer array out of its raw bytes.
    /// `header_offset` is 100 for page 1 (which carries the database header
    /// in the same page) and 0 for every other page.
    pub fn parse(bytes: Vec<u8>, header_offset: usize) -> Result<Self> {
        let page_type = PageType::from_u8(
            *bytes
                .get(header_offset)
                .ok_or_else(|| EngineError::Malformed("page too short for header".into()))?,
        )?;

        let field = |offset: usize, len: usize| -> Result<&[u8]> {
            bytes
                .get(header_offset + offset..header_offset + offset + len)
                .ok_or_else(|| EngineError::Malformed("page too short for header".into()))
        };

        let first_free_block = u16::from_be_bytes(field(1, 2)?.try_into().unwrap());
        let cell_count = u16::from_be_bytes(field(3, 2)?.try_into().unwrap());
        let content_area_start = u16::from_be_bytes(field(5, 2)?.try_into().unwrap());
        let fragmented_free_bytes = field(7, 1)?[0];

        let right_most_pointer = if page_type.is_interior() {
            Some(u32::from_be_bytes(field(8, 4)?.try_into().unwrap()))
        } else {
            None
        };

        let header = PageHeader {
            page_type,
            first_free_block,
            cell_count,
            content_area_start,
            fragmented_free_bytes,
            right_most_pointer,
        };

        let pointer_array_start = header_offset + header.len();
        let pointer_array_end = pointer_array_start + cell_count as usize * 2;
        let pointer_bytes = bytes
            .get(pointer_array_start..pointer_array_end)
            .ok_or_else(|| EngineError::Malformed("page too short for cell pointer array".into()))?;

        let cell_pointers = pointer_bytes
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes(chunk.try_into().unwrap()))
            .collect();

        Ok(Page {
            header,
            cell_pointers,
            bytes,
        })
    }

    /// Bytes of a single cell, starting at its cell-pointer offset and
    /// running to the end of the page (callers decode only as much as the
    /// cell's own varints/record say they need).
    pub fn cell_bytes(&self, cell_pointer: u16) -> &[u8] {
        &self.bytes[cell_pointer as usize..]
    }
}

/// Resolves page numbers to byte offsets and reads pages off disk. Owns the
/// single file handle for a command's lifetime, mirroring the teacher's
/// `Rc<RefCell<File>>`-backed `TableBtree` but centralized so every
/// traversal (table or index) shares one pager and one page-read counter.
pub struct Pager {
    file: std::cell::RefCell<File>,
    page_size: u32,
    reserved_bytes: u8,
    pages_read: Cell<u64>,
}

impl Pager {
    /// Opens a pager with no per-page reserved region (the common case).
    pub fn open(path: &str, page_size: u32) -> Result<Self> {
        Self::open_with_reserved(path, page_size, 0)
    }

    /// Opens a pager honoring the database header's reserved-bytes-per-page
    /// field, which overflow-threshold math needs to compute the usable
    /// page size correctly.
    pub fn open_with_reserved(path: &str, page_size: u32, reserved_bytes: u8) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Pager {
            file: std::cell::RefCell::new(file),
            page_size,
            reserved_bytes,
            pages_read: Cell::new(0),
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn reserved_bytes(&self) -> u8 {
        self.reserved_bytes
    }

    /// Number of pages read so far this session; used by tests to verify
    /// that an index-driven query touches strictly fewer pages than a full
    /// scan (§8 scenario 6).
    pub fn pages_read(&self) -> u64 {
        self.pages_read.get()
    }

    /// Reads the 1-based page `number`, returning its parsed header and
    /// cell-pointer array. Page 1 has its B-tree header offset by the
    /// 100-byte database header.
    pub fn read_page(&self, number: u32) -> Result<Page> {
        if number == 0 {
            return Err(EngineError::Malformed("page number 0 is never valid".into()));
        }

        let offset = (number as u64 - 1) * self.page_size as u64;
        let mut buffer = vec![0u8; self.page_size as usize];

        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buffer)?;
        drop(file);

        self.pages_read.set(self.pages_read.get() + 1);
        debug!("read page {number} at offset {offset}");

        let header_offset = if number == 1 { DATABASE_HEADER_SIZE } else { 0 };
        Page::parse(buffer, header_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_table_page(cell_count: u16) -> Vec<u8> {
        let mut bytes = vec![0u8; 512];
        bytes[0] = 0x0D;
        bytes[3..5].copy_from_slice(&cell_count.to_be_bytes());
        bytes
    }

    #[test]
    fn parses_leaf_table_header() {
        let page = Page::parse(leaf_table_page(3), 0).unwrap();
        assert_eq!(page.header.page_type, PageType::LeafTable);
        assert_eq!(page.header.cell_count, 3);
        assert_eq!(page.header.len(), 8);
        assert!(page.header.right_most_pointer.is_none());
    }

    #[test]
    fn parses_interior_table_header_with_right_pointer() {
        let mut bytes = vec![0u8; 512];
        bytes[0] = 0x05;
        bytes[3..5].copy_from_slice(&2u16.to_be_bytes());
        bytes[8..12].copy_from_slice(&99u32.to_be_bytes());
        let page = Page::parse(bytes, 0).unwrap();
        assert_eq!(page.header.len(), 12);
        assert_eq!(page.header.right_most_pointer, Some(99));
    }

    #[test]
    fn rejects_unknown_page_type() {
        let mut bytes = vec![0u8; 512];
        bytes[0] = 0x99;
        assert!(Page::parse(bytes, 0).is_err());
    }

    #[test]
    fn page_one_header_is_offset_by_database_header() {
        let mut bytes = vec![0u8; 512];
        bytes[100] = 0x0D;
        bytes[103..105].copy_from_slice(&1u16.to_be_bytes());
        let page = Page::parse(bytes, DATABASE_HEADER_SIZE).unwrap();
        assert_eq!(page.header.cell_count, 1);
    }
}
