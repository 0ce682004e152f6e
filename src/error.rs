use thiserror::Error;

/// Single error taxonomy for the engine, per the §7 error handling design:
/// `Malformed`, `UnsupportedSerialType`, `UnknownTable`, `UnknownColumn`,
/// `ParseError`, `Io`. Every failure in the core propagates as one of these.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed database file: {0}")]
    Malformed(String),

    #[error("unsupported serial type: {0}")]
    UnsupportedSerialType(i64),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("could not parse SQL: {0}")]
    ParseError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
