use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};

use crate::elements::ElementRecord;
use crate::predict::error::PropagationError;
use crate::predict::ground_station::Site;

/// Topocentric direction to a satellite, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngle {
    pub altitude_deg: f64,
    pub azimuth_deg: f64,
}

/// Turns element records into look angles from a site. Any failure, for
/// one sample or for the record as a whole, fails the record for that run.
pub trait Propagator: Send + Sync {
    fn look_angles(
        &self,
        record: &ElementRecord,
        site: &Site,
        timestamps: &[DateTime<Utc>],
    ) -> Result<Vec<LookAngle>, PropagationError>;
}

/// SGP4/SDP4 through the `sgp4` crate, TEME rotated to ECEF by sidereal
/// time, then projected onto the site's local horizon.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sgp4Propagator;

impl Propagator for Sgp4Propagator {
    fn look_angles(
        &self,
        record: &ElementRecord,
        site: &Site,
        timestamps: &[DateTime<Utc>],
    ) -> Result<Vec<LookAngle>, PropagationError> {
        let fail = |reason: String| PropagationError::new(record, reason);

        let elements = Elements::from_tle(
            Some(record.display_name().to_string()),
            record.line1().as_bytes(),
            record.line2().as_bytes(),
        )
        .map_err(|e| fail(e.to_string()))?;
        let constants = Constants::from_elements(&elements).map_err(|e| fail(e.to_string()))?;

        timestamps
            .iter()
            .map(|t| look_angle(site, &elements, &constants, *t).map_err(fail))
            .collect()
    }
}

fn look_angle(
    site: &Site,
    elements: &Elements,
    constants: &Constants,
    timestamp: DateTime<Utc>,
) -> Result<LookAngle, String> {
    let minutes = elements
        .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
        .map_err(|e| e.to_string())?;
    let prediction = constants.propagate(minutes).map_err(|e| e.to_string())?;

    let sidereal =
        sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&timestamp.naive_utc()));
    let sat = teme_to_ecef(prediction.position, sidereal);
    let station = site.position_ecef_km();
    let dr = [sat[0] - station[0], sat[1] - station[1], sat[2] - station[2]];
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();
    if !range_km.is_finite() || range_km <= 0.0 {
        return Err(format!("degenerate range {range_km} km at {timestamp}"));
    }

    let (east, north, up) = ecef_to_enu(dr, site.lat_rad(), site.lon_rad());
    Ok(LookAngle {
        altitude_deg: (up / range_km).asin().to_degrees(),
        azimuth_deg: east.atan2(north).to_degrees().rem_euclid(360.0),
    })
}

fn teme_to_ecef(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let (sin_gmst, cos_gmst) = gmst.sin_cos();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let (sin_lat, cos_lat) = lat_rad.sin_cos();
    let (sin_lon, cos_lon) = lon_rad.sin_cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const LINE1: &str =
        "1 25544U 98067A   21127.19945859  .00000523  00000-0  17665-4 0  9992";
    const LINE2: &str =
        "2 25544  51.6441 185.4559 0002803 329.9462 127.3881 15.48981972282240";

    #[test]
    fn test_enu_of_zenith_offset() {
        // Straight up from a site on the equator at lon 0 is +x in ECEF.
        let (e, n, u) = ecef_to_enu([1.0, 0.0, 0.0], 0.0, 0.0);
        assert!(e.abs() < 1e-12 && n.abs() < 1e-12);
        assert!((u - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sgp4_look_angles_are_bounded() {
        let record = ElementRecord::from_lines("ISS (ZARYA)", LINE1, LINE2).unwrap();
        let site = Site::new(51.456671, -2.601768, 71.0).unwrap();
        let start = record.epoch();
        let timestamps: Vec<_> = (0..96).map(|i| start + Duration::minutes(i)).collect();

        let angles = Sgp4Propagator
            .look_angles(&record, &site, &timestamps)
            .unwrap();
        assert_eq!(angles.len(), timestamps.len());
        for angle in angles {
            assert!((-90.0..=90.0).contains(&angle.altitude_deg));
            assert!((0.0..360.0).contains(&angle.azimuth_deg));
        }
    }
}
