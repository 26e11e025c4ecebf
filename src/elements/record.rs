use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::FormatError;
use super::fields::{Columns, LINE1_BLANK_COLUMNS, LINE2_BLANK_COLUMNS};

const MICROS_PER_DAY: f64 = 86_400_000_000.0;

/// The three text lines of an element record, keyed the way the API and
/// configuration files carry them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RawElements {
    pub line0: String,
    pub line1: String,
    pub line2: String,
}

/// Launch year, launch number of the year, and piece of the launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternationalDesignator {
    pub launch_year: u8,
    pub launch_number: u16,
    pub piece: String,
}

/// One satellite's orbital elements at a reference epoch.
///
/// Built only through the validating constructors; every field is decoded
/// eagerly and the record never changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRecord {
    name: String,
    line1: String,
    line2: String,
    catalog_number: u32,
    classification: char,
    designator: InternationalDesignator,
    epoch: DateTime<Utc>,
    mean_motion_dot: f64,
    mean_motion_ddot: f64,
    bstar: f64,
    ephemeris_type: u8,
    element_set_number: u16,
    inclination_deg: f64,
    raan_deg: f64,
    eccentricity: f64,
    arg_perigee_deg: f64,
    mean_anomaly_deg: f64,
    mean_motion: f64,
    revolution_number: u32,
    checksums: [u8; 2],
}

impl ElementRecord {
    /// Parse `[name, line 1, line 2]`.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<Self, FormatError> {
        match lines {
            [name, line1, line2] => Self::from_lines(name.as_ref(), line1.as_ref(), line2.as_ref()),
            _ => Err(FormatError::LineCount(lines.len())),
        }
    }

    pub fn from_lines(name: &str, line1: &str, line2: &str) -> Result<Self, FormatError> {
        let l1 = Columns::new(1, line1)?;
        let l2 = Columns::new(2, line2)?;

        l1.expect_leading('1')?;
        l2.expect_leading('2')?;
        l1.expect_blank(&LINE1_BLANK_COLUMNS)?;
        l2.expect_blank(&LINE2_BLANK_COLUMNS)?;
        let checksum1 = l1.verify_checksum()?;
        let checksum2 = l2.verify_checksum()?;

        let catalog_number: u32 = l1.parse(3, 7, "catalog number")?;
        let catalog_number2: u32 = l2.parse(3, 7, "catalog number")?;
        if catalog_number != catalog_number2 {
            return Err(FormatError::CatalogMismatch {
                line1: catalog_number,
                line2: catalog_number2,
            });
        }

        let ephemeris_type = l1.digit(63, "ephemeris type")?;
        if ephemeris_type != 0 {
            return Err(FormatError::EphemerisType(ephemeris_type));
        }

        let designator = InternationalDesignator {
            launch_year: l1.parse(10, 11, "launch year")?,
            launch_number: l1.parse(12, 14, "launch number")?,
            piece: l1.parse(15, 17, "launch piece")?,
        };

        let epoch_year: u8 = l1.parse(19, 20, "epoch year")?;
        let epoch_day = l1.decimal(21, 32, "epoch day")?;
        let epoch = epoch_from(epoch_year, epoch_day).ok_or_else(|| FormatError::Field {
            line: 1,
            field: "epoch day",
            value: l1.slice(21, 32).to_string(),
        })?;

        Ok(Self {
            name: name.trim_end_matches(['\r', '\n']).to_string(),
            line1: l1.text().to_string(),
            line2: l2.text().to_string(),
            catalog_number,
            classification: l1.column(8),
            designator,
            epoch,
            mean_motion_dot: l1.decimal(34, 43, "first derivative")?,
            mean_motion_ddot: l1.packed_exponent(45, 52, "second derivative")?,
            bstar: l1.packed_exponent(54, 61, "drag term")?,
            ephemeris_type,
            element_set_number: l1.parse(65, 68, "element set number")?,
            inclination_deg: l2.decimal(9, 16, "inclination")?,
            raan_deg: l2.decimal(18, 25, "right ascension")?,
            eccentricity: l2.implied_fraction(27, 33, "eccentricity")?,
            arg_perigee_deg: l2.decimal(35, 42, "argument of perigee")?,
            mean_anomaly_deg: l2.decimal(44, 51, "mean anomaly")?,
            mean_motion: l2.decimal(53, 63, "mean motion")?,
            revolution_number: l2.parse(64, 68, "revolution number")?,
            checksums: [checksum1, checksum2],
        })
    }

    /// Name line exactly as supplied, padding included. Used as catalog key.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        self.name.trim()
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> &str {
        &self.line2
    }

    pub fn lines(&self) -> [&str; 3] {
        [&self.name, &self.line1, &self.line2]
    }

    pub fn to_raw(&self) -> RawElements {
        RawElements {
            line0: self.name.clone(),
            line1: self.line1.clone(),
            line2: self.line2.clone(),
        }
    }

    pub fn catalog_number(&self) -> u32 {
        self.catalog_number
    }

    pub fn classification(&self) -> char {
        self.classification
    }

    pub fn designator(&self) -> &InternationalDesignator {
        &self.designator
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn mean_motion_dot(&self) -> f64 {
        self.mean_motion_dot
    }

    pub fn mean_motion_ddot(&self) -> f64 {
        self.mean_motion_ddot
    }

    pub fn bstar(&self) -> f64 {
        self.bstar
    }

    pub fn ephemeris_type(&self) -> u8 {
        self.ephemeris_type
    }

    pub fn element_set_number(&self) -> u16 {
        self.element_set_number
    }

    pub fn inclination_deg(&self) -> f64 {
        self.inclination_deg
    }

    pub fn raan_deg(&self) -> f64 {
        self.raan_deg
    }

    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    pub fn arg_perigee_deg(&self) -> f64 {
        self.arg_perigee_deg
    }

    pub fn mean_anomaly_deg(&self) -> f64 {
        self.mean_anomaly_deg
    }

    /// Revolutions per day.
    pub fn mean_motion(&self) -> f64 {
        self.mean_motion
    }

    pub fn revolution_number(&self) -> u32 {
        self.revolution_number
    }

    /// Checksum digits of line 1 and line 2.
    pub fn checksums(&self) -> [u8; 2] {
        self.checksums
    }
}

impl FromStr for ElementRecord {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines: Vec<&str> = s.lines().collect();
        let first = lines.iter().position(|l| !l.trim().is_empty());
        let last = lines.iter().rposition(|l| !l.trim().is_empty());
        match (first, last) {
            (Some(first), Some(last)) => Self::parse(&lines[first..=last]),
            _ => Err(FormatError::LineCount(0)),
        }
    }
}

impl TryFrom<RawElements> for ElementRecord {
    type Error = FormatError;

    fn try_from(raw: RawElements) -> Result<Self, Self::Error> {
        Self::from_lines(&raw.line0, &raw.line1, &raw.line2)
    }
}

impl fmt::Display for ElementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}\n{}", self.name, self.line1, self.line2)
    }
}

// Two-digit years are 2000-based. Day 1.0 is 1 January 00:00 UTC.
fn epoch_from(year: u8, day_of_year: f64) -> Option<DateTime<Utc>> {
    if !(1.0..367.0).contains(&day_of_year) {
        return None;
    }
    let start = NaiveDate::from_yo_opt(2000 + year as i32, 1)?.and_hms_opt(0, 0, 0)?;
    let offset = Duration::microseconds(((day_of_year - 1.0) * MICROS_PER_DAY).round() as i64);
    Some(Utc.from_utc_datetime(&(start + offset)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::checksum;
    use chrono::{Datelike, Timelike};

    const NAME: &str = "ISS (ZARYA)             ";
    const LINE1: &str =
        "1 25544U 98067A   21127.19945859  .00000523  00000-0  17665-4 0  9992";
    const LINE2: &str =
        "2 25544  51.6441 185.4559 0002803 329.9462 127.3881 15.48981972282240";

    fn replace_column(line: &str, column: usize, c: char) -> String {
        let mut chars: Vec<char> = line.chars().collect();
        chars[column - 1] = c;
        chars.into_iter().collect()
    }

    #[test]
    fn test_iss_record() {
        let record = ElementRecord::parse(&[NAME, LINE1, LINE2]).unwrap();
        assert_eq!(record.catalog_number(), 25544);
        assert_eq!(record.classification(), 'U');
        assert_eq!(record.ephemeris_type(), 0);
        assert_eq!(record.element_set_number(), 999);
        assert_eq!(record.inclination_deg(), 51.6441);
        assert_eq!(record.raan_deg(), 185.4559);
        assert!((record.eccentricity() - 0.0002803).abs() < 1e-12);
        assert_eq!(record.arg_perigee_deg(), 329.9462);
        assert_eq!(record.mean_anomaly_deg(), 127.3881);
        assert_eq!(record.mean_motion(), 15.48981972);
        assert_eq!(record.revolution_number(), 28224);
        assert!((record.mean_motion_dot() - 0.00000523).abs() < 1e-15);
        assert!((record.bstar() - 0.17665e-4).abs() < 1e-15);
        assert_eq!(record.checksums(), [2, 0]);
        assert_eq!(
            record.designator(),
            &InternationalDesignator {
                launch_year: 98,
                launch_number: 67,
                piece: "A".to_string(),
            }
        );
        assert_eq!(record.name(), NAME);
        assert_eq!(record.display_name(), "ISS (ZARYA)");
    }

    #[test]
    fn test_epoch_decoding() {
        let record = ElementRecord::parse(&[NAME, LINE1, LINE2]).unwrap();
        let epoch = record.epoch();
        assert_eq!(epoch.year(), 2021);
        assert_eq!(epoch.ordinal(), 127);
        assert_eq!(epoch.hour(), 4);
        assert_eq!(epoch.minute(), 47);
        assert_eq!(epoch.second(), 13);
    }

    #[test]
    fn test_checksum_round_trip() {
        let record = ElementRecord::parse(&[NAME, LINE1, LINE2]).unwrap();
        assert_eq!(checksum(record.line1()), record.checksums()[0]);
        assert_eq!(checksum(record.line2()), record.checksums()[1]);
        let text = record.to_string();
        let reparsed: ElementRecord = text.parse().unwrap();
        assert_eq!(reparsed, record);
    }

    #[test]
    fn test_every_other_checksum_digit_rejected() {
        for digit in '0'..='9' {
            let line1 = replace_column(LINE1, 69, digit);
            let result = ElementRecord::from_lines(NAME, &line1, LINE2);
            if digit == '2' {
                assert!(result.is_ok());
            } else {
                assert!(matches!(
                    result,
                    Err(FormatError::Checksum { line: 1, expected: 2, .. })
                ));
            }

            let line2 = replace_column(LINE2, 69, digit);
            let result = ElementRecord::from_lines(NAME, LINE1, &line2);
            if digit == '0' {
                assert!(result.is_ok());
            } else {
                assert!(matches!(
                    result,
                    Err(FormatError::Checksum { line: 2, expected: 0, .. })
                ));
            }
        }
    }

    #[test]
    fn test_blank_columns_enforced() {
        for column in LINE1_BLANK_COLUMNS {
            let line1 = replace_column(LINE1, column, '7');
            assert_eq!(
                ElementRecord::from_lines(NAME, &line1, LINE2).err(),
                Some(FormatError::BlankColumn {
                    line: 1,
                    column,
                    found: '7'
                })
            );
        }
        for column in LINE2_BLANK_COLUMNS {
            let line2 = replace_column(LINE2, column, 'x');
            assert_eq!(
                ElementRecord::from_lines(NAME, LINE1, &line2).err(),
                Some(FormatError::BlankColumn {
                    line: 2,
                    column,
                    found: 'x'
                })
            );
        }
    }

    #[test]
    fn test_leading_digit() {
        let result = ElementRecord::from_lines(NAME, LINE2, LINE1);
        assert_eq!(
            result.err(),
            Some(FormatError::LeadingDigit {
                line: 1,
                expected: '1',
                found: '2'
            })
        );
    }

    #[test]
    fn test_catalog_number_mismatch() {
        // 25544 -> 25545 on line 2; bump the checksum to keep it valid.
        let line2 = replace_column(&replace_column(LINE2, 7, '5'), 69, '1');
        assert_eq!(
            ElementRecord::from_lines(NAME, LINE1, &line2).err(),
            Some(FormatError::CatalogMismatch {
                line1: 25544,
                line2: 25545
            })
        );
    }

    #[test]
    fn test_nonzero_ephemeris_type() {
        let line1 = replace_column(&replace_column(LINE1, 63, '2'), 69, '4');
        assert_eq!(
            ElementRecord::from_lines(NAME, &line1, LINE2).err(),
            Some(FormatError::EphemerisType(2))
        );
    }

    #[test]
    fn test_unparseable_field() {
        // Column 13 held a '6'; the checksum drops from 0 to 4.
        let line2 = replace_column(&replace_column(LINE2, 13, 'x'), 69, '4');
        assert!(matches!(
            ElementRecord::from_lines(NAME, LINE1, &line2),
            Err(FormatError::Field {
                line: 2,
                field: "inclination",
                ..
            })
        ));
    }

    #[test]
    fn test_line_count() {
        assert_eq!(
            ElementRecord::parse(&[LINE1, LINE2]).err(),
            Some(FormatError::LineCount(2))
        );
        let text = format!("\n{NAME}\n{LINE1}\n{LINE2}\n\n");
        assert!(text.parse::<ElementRecord>().is_ok());
        assert_eq!(
            "".parse::<ElementRecord>().err(),
            Some(FormatError::LineCount(0))
        );
    }

    #[test]
    fn test_keyed_form() {
        let raw = RawElements {
            line0: NAME.to_string(),
            line1: LINE1.to_string(),
            line2: LINE2.to_string(),
        };
        let record = ElementRecord::try_from(raw.clone()).unwrap();
        assert_eq!(record.to_raw(), raw);
    }
}
