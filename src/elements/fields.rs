use std::str::FromStr;

use super::error::FormatError;

pub const LINE_LENGTH: usize = 69;

pub const LINE1_BLANK_COLUMNS: [usize; 8] = [2, 9, 18, 33, 44, 53, 62, 64];
pub const LINE2_BLANK_COLUMNS: [usize; 7] = [2, 8, 17, 26, 34, 43, 52];

/// Checksum digit of an element line.
///
/// Sums every character except the last: digits count their value, `-`
/// counts one, everything else counts zero. The result is the sum modulo 10.
pub fn checksum(line: &str) -> u8 {
    let count = line.chars().count();
    let sum: u32 = line
        .chars()
        .take(count.saturating_sub(1))
        .map(|c| match c {
            '0'..='9' => c as u32 - '0' as u32,
            '-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}

/// Fixed-column view over one element line. Columns are 1-indexed and
/// inclusive, the way the format is documented.
pub struct Columns<'a> {
    line: u8,
    text: &'a str,
}

impl<'a> Columns<'a> {
    pub fn new(line: u8, raw: &'a str) -> Result<Self, FormatError> {
        let text = raw.trim_end();
        if !text.is_ascii() {
            return Err(FormatError::NonAscii { line });
        }
        if text.len() != LINE_LENGTH {
            return Err(FormatError::LineLength {
                line,
                len: text.len(),
            });
        }
        Ok(Self { line, text })
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn column(&self, column: usize) -> char {
        self.text.as_bytes()[column - 1] as char
    }

    pub fn slice(&self, first: usize, last: usize) -> &'a str {
        &self.text[first - 1..last]
    }

    pub fn expect_leading(&self, expected: char) -> Result<(), FormatError> {
        let found = self.column(1);
        if found != expected {
            return Err(FormatError::LeadingDigit {
                line: self.line,
                expected,
                found,
            });
        }
        Ok(())
    }

    pub fn expect_blank(&self, columns: &[usize]) -> Result<(), FormatError> {
        for &column in columns {
            let found = self.column(column);
            if found != ' ' {
                return Err(FormatError::BlankColumn {
                    line: self.line,
                    column,
                    found,
                });
            }
        }
        Ok(())
    }

    pub fn verify_checksum(&self) -> Result<u8, FormatError> {
        let expected = checksum(self.text);
        let found = self.digit(LINE_LENGTH, "checksum")?;
        if expected != found {
            return Err(FormatError::Checksum {
                line: self.line,
                expected,
                found,
            });
        }
        Ok(found)
    }

    pub fn digit(&self, column: usize, field: &'static str) -> Result<u8, FormatError> {
        self.column(column)
            .to_digit(10)
            .map(|d| d as u8)
            .ok_or_else(|| self.field_error(field, self.slice(column, column)))
    }

    /// Integer or string field, surrounding blanks ignored.
    pub fn parse<T: FromStr>(
        &self,
        first: usize,
        last: usize,
        field: &'static str,
    ) -> Result<T, FormatError> {
        let raw = self.slice(first, last);
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(self.field_error(field, raw));
        }
        trimmed.parse().map_err(|_| self.field_error(field, raw))
    }

    /// Plain decimal, possibly written without the leading zero (`-.00002182`).
    pub fn decimal(&self, first: usize, last: usize, field: &'static str) -> Result<f64, FormatError> {
        let raw = self.slice(first, last);
        let trimmed = raw.trim();
        let well_formed = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'));
        if !well_formed {
            return Err(self.field_error(field, raw));
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(self.field_error(field, raw)),
        }
    }

    /// Digits with an implied leading `0.` (`0002803` is 0.0002803).
    pub fn implied_fraction(
        &self,
        first: usize,
        last: usize,
        field: &'static str,
    ) -> Result<f64, FormatError> {
        let raw = self.slice(first, last);
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.field_error(field, raw));
        }
        format!("0.{raw}")
            .parse()
            .map_err(|_| self.field_error(field, raw))
    }

    /// Signed mantissa with an implied leading `0.` followed by a signed
    /// power-of-ten exponent (` 17665-4` is 0.17665e-4).
    pub fn packed_exponent(
        &self,
        first: usize,
        last: usize,
        field: &'static str,
    ) -> Result<f64, FormatError> {
        let raw = self.slice(first, last);
        let err = || self.field_error(field, raw);

        let (mantissa, exponent) = raw.split_at(raw.len() - 2);
        let mantissa = mantissa.trim_start();
        let (sign, digits) = match mantissa.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", mantissa.strip_prefix('+').unwrap_or(mantissa)),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let exponent_digit = exponent.as_bytes()[1];
        if !exponent_digit.is_ascii_digit() {
            return Err(err());
        }
        let exponent_sign = match exponent.as_bytes()[0] {
            b'-' => "-",
            b'+' | b' ' => "",
            _ => return Err(err()),
        };

        format!(
            "{sign}0.{digits}e{exponent_sign}{}",
            exponent_digit as char
        )
        .parse()
        .map_err(|_| err())
    }

    fn field_error(&self, field: &'static str, value: &str) -> FormatError {
        FormatError::Field {
            line: self.line,
            field,
            value: value.to_string(),
        }
    }
}
