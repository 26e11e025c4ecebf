use thiserror::Error;

/// Rejection reasons for a three-line element record.
///
/// `line` fields are 1 or 2 (the element lines); column numbers are
/// 1-indexed to match the published format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("expected 3 lines (name, line 1, line 2), found {0}")]
    LineCount(usize),
    #[error("line {line} has {len} characters, expected 69")]
    LineLength { line: u8, len: usize },
    #[error("line {line} contains non-ASCII characters")]
    NonAscii { line: u8 },
    #[error("line {line} must start with '{expected}', found '{found}'")]
    LeadingDigit { line: u8, expected: char, found: char },
    #[error("line {line} column {column} must be blank, found '{found}'")]
    BlankColumn { line: u8, column: usize, found: char },
    #[error("catalog number mismatch: line 1 has {line1}, line 2 has {line2}")]
    CatalogMismatch { line1: u32, line2: u32 },
    #[error("ephemeris type must be 0, found {0}")]
    EphemerisType(u8),
    #[error("checksum mismatch on line {line}: computed {expected}, record has {found}")]
    Checksum { line: u8, expected: u8, found: u8 },
    #[error("line {line}: cannot parse {field} from {value:?}")]
    Field {
        line: u8,
        field: &'static str,
        value: String,
    },
}
