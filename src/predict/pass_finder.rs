use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::elements::ElementRecord;
use crate::predict::error::{PredictError, PropagationError};
use crate::predict::ground_station::Site;
use crate::predict::propagation::{Propagator, Sgp4Propagator};
use crate::predict::types::{Pass, PassReport, Sample};

const HORIZON_ALTITUDE_DEG: f64 = 0.0;
const MAX_SAMPLES: i64 = 10_000_000;

/// Predicts passes over one site.
pub struct PassFinder<P = Sgp4Propagator> {
    propagator: P,
    site: Option<Site>,
}

impl PassFinder<Sgp4Propagator> {
    pub fn new() -> Self {
        Self::with_propagator(Sgp4Propagator)
    }
}

impl Default for PassFinder<Sgp4Propagator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Propagator> PassFinder<P> {
    pub fn with_propagator(propagator: P) -> Self {
        Self {
            propagator,
            site: None,
        }
    }

    pub fn set_site(
        &mut self,
        latitude_deg: f64,
        longitude_deg: f64,
        height_m: f64,
    ) -> Result<Site, PredictError> {
        let site = Site::new(latitude_deg, longitude_deg, height_m)?;
        log::info!(
            "Site set to lat={}, lon={}, height={} m",
            latitude_deg,
            longitude_deg,
            height_m
        );
        self.site = Some(site);
        Ok(site)
    }

    pub fn site(&self) -> Option<Site> {
        self.site
    }

    /// Propagate every record over `series` and extract its passes.
    ///
    /// A record the propagator rejects is reported in `failures` and the
    /// rest of the batch carries on. Passes come back grouped by record; run
    /// them through [`filter_and_sort`] for chronological order.
    pub fn compute_passes(
        &self,
        records: &[Arc<ElementRecord>],
        series: &[DateTime<Utc>],
        min_peak_altitude: f64,
    ) -> Result<PassReport, PredictError> {
        let site = self.site.ok_or(PredictError::SiteNotSet)?;
        log::info!(
            "Calculating passes for {} element sets over {} samples",
            records.len(),
            series.len()
        );

        let mut report = PassReport::default();
        for record in records {
            log::debug!("Calculating pass data for {}", record.display_name());
            let angles = match self.propagator.look_angles(record, &site, series) {
                Ok(angles) if angles.len() == series.len() => angles,
                Ok(angles) => {
                    let error = PropagationError::new(
                        record,
                        format!("{} look angles for {} timestamps", angles.len(), series.len()),
                    );
                    log::warn!("{}", error);
                    report.failures.push(error);
                    continue;
                }
                Err(error) => {
                    log::warn!("{}. Skipping", error);
                    report.failures.push(error);
                    continue;
                }
            };

            let samples: Vec<Sample> = series
                .iter()
                .zip(angles)
                .map(|(timestamp, angle)| Sample {
                    timestamp: *timestamp,
                    altitude_deg: angle.altitude_deg,
                    azimuth_deg: angle.azimuth_deg,
                })
                .collect();
            report
                .passes
                .extend(extract_passes(record, &samples, min_peak_altitude));
        }

        if !report.failures.is_empty() {
            log::warn!("{} element sets failed to propagate", report.failures.len());
        }
        log::info!(
            "Finished: {} passes from {} element sets",
            report.passes.len(),
            records.len() - report.failures.len()
        );
        Ok(report)
    }
}

/// End of a window of `length` starting at `start`.
pub fn window_stop(start: DateTime<Utc>, length: Duration) -> Result<DateTime<Utc>, PredictError> {
    start.checked_add_signed(length).ok_or_else(|| {
        PredictError::InvalidRange(format!("window of {length} from {start} overflows"))
    })
}

/// Timestamps from `start` to `stop` inclusive, `step_minutes` apart.
pub fn build_time_series(
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    step_minutes: f64,
) -> Result<Vec<DateTime<Utc>>, PredictError> {
    if !step_minutes.is_finite() || step_minutes <= 0.0 {
        return Err(PredictError::InvalidRange(format!(
            "step must be a positive number of minutes, got {step_minutes}"
        )));
    }
    if stop < start {
        return Err(PredictError::InvalidRange(format!(
            "stop {stop} is before start {start}"
        )));
    }

    let step_ns = (step_minutes * 60e9).round() as i64;
    if step_ns <= 0 {
        return Err(PredictError::InvalidRange(format!(
            "step of {step_minutes} minutes is below clock resolution"
        )));
    }
    let span_ns = (stop - start)
        .num_nanoseconds()
        .ok_or_else(|| PredictError::InvalidRange("window too long".into()))?;
    let count = span_ns / step_ns + 1;
    if count > MAX_SAMPLES {
        return Err(PredictError::InvalidRange(format!(
            "{count} samples requested, limit is {MAX_SAMPLES}"
        )));
    }

    log::info!(
        "Time range start={} stop={} step={} min ({} samples)",
        start,
        stop,
        step_minutes,
        count
    );
    Ok((0..count)
        .map(|i| start + Duration::nanoseconds(i * step_ns))
        .collect())
}

/// Split one record's altitude series into passes.
///
/// Every strict local maximum (never the first or last sample) that is
/// above the horizon and above `min_peak_altitude` yields a pass. Its track
/// runs outwards from the peak while altitude stays above 0°, stopping at
/// the window edge when the satellite is still up there. A flat-topped
/// maximum has no strict peak and yields nothing.
pub fn extract_passes(
    record: &Arc<ElementRecord>,
    samples: &[Sample],
    min_peak_altitude: f64,
) -> Vec<Pass> {
    let mut passes = Vec::new();
    if samples.len() < 3 {
        return passes;
    }

    let above = |i: usize| samples[i].altitude_deg > HORIZON_ALTITUDE_DEG;

    for peak in 1..samples.len() - 1 {
        let altitude = samples[peak].altitude_deg;
        let is_peak =
            altitude > samples[peak - 1].altitude_deg && altitude > samples[peak + 1].altitude_deg;
        if !is_peak || altitude <= min_peak_altitude || !above(peak) {
            continue;
        }

        let mut set = peak;
        while set + 1 < samples.len() && above(set + 1) {
            set += 1;
        }
        let mut rise = peak;
        while rise > 0 && above(rise - 1) {
            rise -= 1;
        }

        passes.push(Pass {
            record: record.clone(),
            peak: samples[peak],
            track: samples[rise..=set].to_vec(),
        });
    }
    passes
}

/// Keep passes peaking above `min_peak_altitude`, ordered by peak time.
/// Passes with equal peak times keep their input order.
pub fn filter_and_sort(mut passes: Vec<Pass>, min_peak_altitude: f64) -> Vec<Pass> {
    passes.retain(|p| p.peak.altitude_deg > min_peak_altitude);
    passes.sort_by_key(|p| p.peak.timestamp);
    log::info!(
        "{} passes peak above {} degrees",
        passes.len(),
        min_peak_altitude
    );
    passes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::propagation::LookAngle;
    use chrono::TimeZone;

    const LINE1: &str =
        "1 25544U 98067A   21127.19945859  .00000523  00000-0  17665-4 0  9992";
    const LINE2: &str =
        "2 25544  51.6441 185.4559 0002803 329.9462 127.3881 15.48981972282240";

    /// Serves a fixed altitude profile; azimuth is the sample index.
    struct Scripted {
        altitudes: Vec<f64>,
        failing: &'static str,
    }

    impl Propagator for Scripted {
        fn look_angles(
            &self,
            record: &ElementRecord,
            _site: &Site,
            timestamps: &[DateTime<Utc>],
        ) -> Result<Vec<LookAngle>, PropagationError> {
            if record.display_name() == self.failing {
                return Err(PropagationError::new(record, "error code 1"));
            }
            Ok(timestamps
                .iter()
                .zip(&self.altitudes)
                .enumerate()
                .map(|(i, (_, alt))| LookAngle {
                    altitude_deg: *alt,
                    azimuth_deg: i as f64,
                })
                .collect())
        }
    }

    fn record(name: &str) -> Arc<ElementRecord> {
        Arc::new(ElementRecord::from_lines(name, LINE1, LINE2).unwrap())
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 11, 22, 0, 0).unwrap()
    }

    fn samples(altitudes: &[f64]) -> Vec<Sample> {
        altitudes
            .iter()
            .enumerate()
            .map(|(i, alt)| Sample {
                timestamp: start() + Duration::minutes(i as i64),
                altitude_deg: *alt,
                azimuth_deg: i as f64,
            })
            .collect()
    }

    #[test]
    fn test_time_series_count() {
        let series = build_time_series(start(), start() + Duration::minutes(10), 3.0).unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series[3], start() + Duration::minutes(9));

        let series = build_time_series(start(), start() + Duration::minutes(10), 0.5).unwrap();
        assert_eq!(series.len(), 21);
        assert_eq!(series[1], start() + Duration::seconds(30));
    }

    #[test]
    fn test_time_series_single_instant() {
        let series = build_time_series(start(), start(), 1.0).unwrap();
        assert_eq!(series, vec![start()]);
    }

    #[test]
    fn test_window_stop() {
        let start = Utc::now();
        assert_eq!(window_stop(start, Duration::hours(2)).unwrap(), start + Duration::hours(2));
        assert!(matches!(
            window_stop(DateTime::<Utc>::MAX_UTC - Duration::hours(1), Duration::days(1)),
            Err(PredictError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_time_series_invalid_range() {
        assert!(matches!(
            build_time_series(start(), start() - Duration::seconds(1), 1.0),
            Err(PredictError::InvalidRange(_))
        ));
        assert!(matches!(
            build_time_series(start(), start() + Duration::hours(1), 0.0),
            Err(PredictError::InvalidRange(_))
        ));
        assert!(matches!(
            build_time_series(start(), start() + Duration::hours(1), -1.0),
            Err(PredictError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_single_hump() {
        let series = samples(&[-20.0, -5.0, 3.0, 12.0, 40.0, 12.0, 3.0, -5.0, -20.0]);
        let passes = extract_passes(&record("SAT"), &series, 10.0);
        assert_eq!(passes.len(), 1);
        let pass = &passes[0];
        assert_eq!(pass.peak, series[4]);
        assert_eq!(pass.track, series[2..=6].to_vec());
        assert_eq!(pass.duration(), Duration::minutes(4));
        assert!(!pass.is_degenerate());
    }

    #[test]
    fn test_two_humps_sorted_by_peak() {
        let altitudes = [-10.0, 20.0, 50.0, 20.0, -10.0, -30.0, -10.0, 15.0, 30.0, 5.0, -8.0];
        let mut passes = extract_passes(&record("LATE"), &samples(&altitudes[5..]), 10.0);
        passes.extend(extract_passes(&record("EARLY"), &samples(&altitudes), 10.0));
        let passes = filter_and_sort(passes, 10.0);

        assert_eq!(passes.len(), 3);
        assert!(passes
            .windows(2)
            .all(|w| w[0].peak.timestamp <= w[1].peak.timestamp));
        let early: Vec<_> = passes
            .iter()
            .filter(|p| p.record.name() == "EARLY")
            .collect();
        assert_eq!(early.len(), 2);
        assert_eq!(early[0].peak.altitude_deg, 50.0);
        assert_eq!(early[0].track.len(), 3);
        assert_eq!(early[1].peak.altitude_deg, 30.0);
        assert_eq!(early[1].track.len(), 3);
    }

    #[test]
    fn test_low_hump_filtered() {
        let series = samples(&[-10.0, 2.0, 8.0, 2.0, -10.0]);
        assert!(extract_passes(&record("LOW"), &series, 10.0).is_empty());
    }

    #[test]
    fn test_plateau_yields_no_peak() {
        let series = samples(&[-10.0, 20.0, 45.0, 45.0, 20.0, -10.0]);
        assert!(extract_passes(&record("FLAT"), &series, 0.0).is_empty());
    }

    #[test]
    fn test_pass_clamped_at_window_edges() {
        let series = samples(&[15.0, 30.0, 60.0, 30.0, 15.0]);
        let passes = extract_passes(&record("UP"), &series, 10.0);
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].track.len(), 5);
        assert_eq!(passes[0].rise(), series[0]);
        assert_eq!(passes[0].set(), series[4]);
    }

    #[test]
    fn test_degenerate_pass_is_emitted() {
        let series = samples(&[-3.0, 12.0, -2.0]);
        let passes = extract_passes(&record("BLIP"), &series, 10.0);
        assert_eq!(passes.len(), 1);
        assert!(passes[0].is_degenerate());
    }

    #[test]
    fn test_below_horizon_peak_ignored_for_negative_threshold() {
        let series = samples(&[-30.0, -5.0, -30.0]);
        assert!(extract_passes(&record("DOWN"), &series, -10.0).is_empty());
    }

    #[test]
    fn test_compute_requires_site() {
        let finder = PassFinder::with_propagator(Scripted {
            altitudes: vec![],
            failing: "",
        });
        assert_eq!(
            finder.compute_passes(&[record("SAT")], &[start()], 0.0).err(),
            Some(PredictError::SiteNotSet)
        );
    }

    #[test]
    fn test_compute_collects_failures() {
        let mut finder = PassFinder::with_propagator(Scripted {
            altitudes: vec![-10.0, 5.0, 25.0, 5.0, -10.0],
            failing: "DECAYED",
        });
        finder.set_site(51.456671, -2.601768, 71.0).unwrap();
        let series = build_time_series(start(), start() + Duration::minutes(4), 1.0).unwrap();

        let report = finder
            .compute_passes(&[record("GOOD"), record("DECAYED"), record("ALSO GOOD")], &series, 10.0)
            .unwrap();
        assert_eq!(report.passes.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "DECAYED");
        assert_eq!(report.failures[0].catalog_number, 25544);
        assert_eq!(report.passes[0].peak.timestamp, start() + Duration::minutes(2));
        assert_eq!(report.passes[0].peak.azimuth_deg, 2.0);
    }

    #[test]
    fn test_short_propagation_result_is_a_failure() {
        let mut finder = PassFinder::with_propagator(Scripted {
            altitudes: vec![1.0, 2.0],
            failing: "",
        });
        finder.set_site(0.0, 0.0, 0.0).unwrap();
        let series = build_time_series(start(), start() + Duration::minutes(4), 1.0).unwrap();
        let report = finder.compute_passes(&[record("SAT")], &series, 0.0).unwrap();
        assert!(report.passes.is_empty());
        assert_eq!(report.failures.len(), 1);
    }
}
