/*
Serial Type Codes Of The Record Format
Serial Type	Content Size	Meaning
0	0	Value is a NULL.
1	1	Value is an 8-bit twos-complement integer.
2	2	Value is a big-endian 16-bit twos-complement integer.
3	3	Value is a big-endian 24-bit twos-complement integer.
4	4	Value is a big-endian 32-bit twos-complement integer.
5	6	Value is a big-endian 48-bit twos-complement integer.
6	8	Value is a big-endian 64-bit twos-complement integer.
7	8	Value is a big-endian IEEE 754-2008 64-bit floating point number.
8	0	Value is the integer 0.
9	0	Value is the integer 1.
10,11	variable	Reserved for internal use.
N>=12 and even	(N-12)/2	Value is a BLOB that is (N-12)/2 bytes in length.
N>=13 and odd	(N-13)/2	Value is a string, (N-13)/2 bytes, no terminator.
*/

use crate::error::{EngineError, Result};
use crate::varint::Cursor;

#[derive(Debug, Clone, Copy)]
pub enum SerialType {
    Null,
    I8,
    I16,
    I24,
    I32,
    Zero,
    One,
    Blob(usize),
    Text(usize),
    /// Serial types the core subset does not decode: 48/64-bit integers,
    /// floats, and the reserved codes 10/11. Recognizing the code is not a
    /// hard error by itself; decoding its value is (per §3/§7).
    Unsupported(i64),
}

impl SerialType {
    pub fn from_code(code: i64) -> Result<Self> {
        let serial_type = match code {
            0 => SerialType::Null,
            1 => SerialType::I8,
            2 => SerialType::I16,
            3 => SerialType::I24,
            4 => SerialType::I32,
            5 | 6 | 7 | 10 | 11 => SerialType::Unsupported(code),
            8 => SerialType::Zero,
            9 => SerialType::One,
            n if n >= 12 && n % 2 == 0 => SerialType::Blob(((n - 12) / 2) as usize),
            n if n >= 13 && n % 2 == 1 => SerialType::Text(((n - 13) / 2) as usize),
            _ => {
                return Err(EngineError::Malformed(format!(
                    "negative serial type {code}"
                )))
            }
        };
        Ok(serial_type)
    }

    pub fn decode(&self, cursor: &mut Cursor) -> Result<Value> {
        match *self {
            SerialType::Null => Ok(Value::Null),
            SerialType::I8 => {
                let byte = cursor.read_u8()?;
                Ok(Value::Integer(byte as i8 as i64))
            }
            SerialType::I16 => {
                let bytes = cursor.read_bytes(2)?;
                Ok(Value::Integer(
                    i16::from_be_bytes(bytes.try_into().unwrap()) as i64,
                ))
            }
            SerialType::I24 => {
                let bytes = cursor.read_bytes(3)?;
                let mut widened = [0u8; 4];
                widened[1..].copy_from_slice(bytes);
                let mut value = i32::from_be_bytes(widened) as i64;
                if bytes[0] & 0x80 != 0 {
                    value -= 1 << 24;
                }
                Ok(Value::Integer(value))
            }
            SerialType::I32 => {
                let bytes = cursor.read_bytes(4)?;
                Ok(Value::Integer(
                    i32::from_be_bytes(bytes.try_into().unwrap()) as i64,
                ))
            }
            SerialType::Zero => Ok(Value::Integer(0)),
            SerialType::One => Ok(Value::Integer(1)),
            SerialType::Blob(size) => Ok(Value::Blob(cursor.read_bytes(size)?.to_vec())),
            SerialType::Text(size) => Ok(Value::Text(cursor.read_bytes(size)?.to_vec())),
            SerialType::Unsupported(code) => Err(EngineError::UnsupportedSerialType(code)),
        }
    }
}

/// A decoded record column. Comparison against a SQL literal in a `WHERE`
/// clause uses byte-equality for text/blob and decimal parsing for the `id`
/// pseudo-column; richer type affinity is out of scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Integer(i64),
    Text(Vec<u8>),
    Blob(Vec<u8>),
}

impl Value {
    /// Raw byte content of the value, for comparisons against SQL literals
    /// and index keys. `Null` has no byte content.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Text(b) | Value::Blob(b) => Some(b),
            Value::Null | Value::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

/// Ordering used by index traversal's equality search. Values of the same
/// kind compare naturally (numeric for integers, byte-wise for text/blob);
/// mismatched kinds fall back to a fixed type rank (NULL < INTEGER < BLOB <
/// TEXT), which only matters for malformed inputs since every column in a
/// well-formed index is uniformly typed.
pub fn compare(a: &Value, b: &Value) -> std::cmp::Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Integer(_) => 1,
            Value::Blob(_) => 2,
            Value::Text(_) => 3,
        }
    }

    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Blob(x), Value::Blob(y)) => x.cmp(y),
        (Value::Null, Value::Null) => std::cmp::Ordering::Equal,
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_core_integer_types() {
        let mut cursor = Cursor::new(&[0xFF]);
        assert_eq!(
            SerialType::I8.decode(&mut cursor).unwrap(),
            Value::Integer(-1)
        );

        let mut cursor = Cursor::new(&[0x01, 0x00]);
        assert_eq!(
            SerialType::I16.decode(&mut cursor).unwrap(),
            Value::Integer(256)
        );

        // -1 as 24-bit two's complement
        let mut cursor = Cursor::new(&[0xFF, 0xFF, 0xFF]);
        assert_eq!(
            SerialType::I24.decode(&mut cursor).unwrap(),
            Value::Integer(-1)
        );
    }

    #[test]
    fn decodes_zero_one_and_null_without_consuming_bytes() {
        let mut cursor = Cursor::new(&[]);
        assert_eq!(SerialType::Null.decode(&mut cursor).unwrap(), Value::Null);
        assert_eq!(
            SerialType::Zero.decode(&mut cursor).unwrap(),
            Value::Integer(0)
        );
        assert_eq!(
            SerialType::One.decode(&mut cursor).unwrap(),
            Value::Integer(1)
        );
    }

    #[test]
    fn decodes_text() {
        let mut cursor = Cursor::new(b"hello");
        let serial_type = SerialType::from_code(23).unwrap(); // (23-13)/2 = 5
        assert_eq!(
            serial_type.decode(&mut cursor).unwrap(),
            Value::Text(b"hello".to_vec())
        );
    }

    #[test]
    fn unsupported_serial_types_error() {
        for code in [5, 6, 7, 10, 11] {
            let serial_type = SerialType::from_code(code).unwrap();
            let mut cursor = Cursor::new(&[0u8; 16]);
            assert!(matches!(
                serial_type.decode(&mut cursor),
                Err(EngineError::UnsupportedSerialType(c)) if c == code
            ));
        }
    }
}
