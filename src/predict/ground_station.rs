use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::error::PredictError;

// WGS-84
const EQUATORIAL_RADIUS_KM: f64 = 6378.137;
const ECCENTRICITY_SQUARED: f64 = 0.00669437999014;

/// Observer location on the WGS-84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Site {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub height_m: f64,
}

impl Site {
    pub fn new(latitude_deg: f64, longitude_deg: f64, height_m: f64) -> Result<Self, PredictError> {
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(PredictError::InvalidSite(format!(
                "latitude {latitude_deg} outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(PredictError::InvalidSite(format!(
                "longitude {longitude_deg} outside [-180, 180]"
            )));
        }
        if !height_m.is_finite() {
            return Err(PredictError::InvalidSite(format!("height {height_m}")));
        }
        Ok(Self {
            latitude_deg,
            longitude_deg,
            height_m,
        })
    }

    /// Parse `"lat, lon"` as written in the station configuration.
    pub fn from_coordinates(coordinates: &str, height_m: f64) -> Result<Self, PredictError> {
        let invalid = || PredictError::InvalidSite(format!("cannot parse {coordinates:?}"));
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        let [lat, lon] = parts.as_slice() else {
            return Err(invalid());
        };
        let lat = lat.parse().map_err(|_| invalid())?;
        let lon = lon.parse().map_err(|_| invalid())?;
        Self::new(lat, lon, height_m)
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let n = EQUATORIAL_RADIUS_KM / (1.0 - ECCENTRICITY_SQUARED * lat.sin().powi(2)).sqrt();
        let h = self.height_m / 1000.0;
        [
            (n + h) * lat.cos() * lon.cos(),
            (n + h) * lat.cos() * lon.sin(),
            (n * (1.0 - ECCENTRICITY_SQUARED) + h) * lat.sin(),
        ]
    }
}
