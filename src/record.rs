/*
A record contains a header and a body, in that order. The header begins
with a single varint giving the total number of bytes in the header
(including the size varint itself). Following the size varint are one
varint per column giving its serial type. The column bodies follow,
concatenated in order.
*/

use crate::error::Result;
use crate::serial::{SerialType, Value};
use crate::varint::{read_varint, Cursor};

/// Decodes a record of exactly `column_count` columns starting at the
/// beginning of `bytes`. Returns the decoded values and the number of bytes
/// the record occupied (header + body), so the caller can advance past it.
pub fn decode_record(bytes: &[u8], column_count: usize) -> Result<(Vec<Value>, usize)> {
    let mut cursor = Cursor::new(bytes);
    let header_size = read_varint(&mut cursor)? as usize;

    let mut serial_types = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        let code = read_varint(&mut cursor)? as i64;
        serial_types.push(SerialType::from_code(code)?);
    }

    // The header may have padding beyond the last serial type; trust the
    // declared header size rather than where the serial-type scan stopped.
    cursor.set_position(header_size);

    let mut values = Vec::with_capacity(column_count);
    for serial_type in &serial_types {
        values.push(serial_type.decode(&mut cursor)?);
    }

    Ok((values, cursor.position()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_two_column_record() {
        // header_size=4, serial types [1 (i8), 23 (text len 5)], body: 0x2A, "hello"
        let mut bytes = vec![4, 1, 23];
        bytes.push(0x2A);
        bytes.extend_from_slice(b"hello");
        let (values, consumed) = decode_record(&bytes, 2).unwrap();
        assert_eq!(values, vec![Value::Integer(42), Value::Text(b"hello".to_vec())]);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn tolerates_header_slack() {
        // header_size says 5 bytes even though only 2 bytes of serial types
        // (1 header-size byte + 1 serial-type byte) were actually read.
        let bytes = vec![5, 8, 0xAB, 0xAB, 0x2A];
        let (values, consumed) = decode_record(&bytes, 1).unwrap();
        assert_eq!(values, vec![Value::Integer(0)]);
        assert_eq!(consumed, 5);
    }
}
