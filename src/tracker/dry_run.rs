use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use crate::elements::ElementRecord;
use crate::tracker::error::ActuatorError;
use crate::tracker::mount::{Axis, Frame, Mount, MountActivity, MountStatus};

/// Commands kept for inspection; older ones are dropped.
pub const COMMAND_HISTORY: usize = 256;

const HOME_ALTITUDE_DEG: f64 = 90.0;
const HOME_AZIMUTH_DEG: f64 = 0.0;
const PARK_ALTITUDE_DEG: f64 = 0.0;
const PARK_AZIMUTH_DEG: f64 = 0.0;

/// Commands accepted by a [`DryRunMount`], in the order received.
#[derive(Debug, Clone, PartialEq)]
pub enum MountCommand {
    Connect,
    Disconnect,
    SetAxis { axis: Axis, enabled: bool },
    Follow { name: String, catalog_number: u32 },
    GotoAltAz { altitude_deg: f64, azimuth_deg: f64 },
    GotoRaDec { ra_hours: f64, dec_deg: f64, frame: Frame },
    Stop,
    Park { here: bool },
    Home,
    SetTracking { enabled: bool },
}

#[derive(Debug)]
struct State {
    connected: bool,
    azimuth_enabled: bool,
    altitude_enabled: bool,
    tracking: bool,
    activity: MountActivity,
    altitude_deg: f64,
    azimuth_deg: f64,
    target: Option<String>,
    commands: VecDeque<MountCommand>,
}

impl State {
    fn record(&mut self, command: MountCommand) {
        if self.commands.len() == COMMAND_HISTORY {
            self.commands.pop_front();
        }
        self.commands.push_back(command);
    }

    fn require_connected(&self) -> Result<(), ActuatorError> {
        if self.connected {
            Ok(())
        } else {
            Err(ActuatorError::NotConnected)
        }
    }

    fn require_axes(&self) -> Result<(), ActuatorError> {
        self.require_connected()?;
        if !self.azimuth_enabled {
            return Err(ActuatorError::Rejected(format!("{} axis disabled", Axis::Azimuth)));
        }
        if !self.altitude_enabled {
            return Err(ActuatorError::Rejected(format!("{} axis disabled", Axis::Altitude)));
        }
        Ok(())
    }

    fn point(&mut self, activity: MountActivity, altitude_deg: f64, azimuth_deg: f64) {
        self.activity = activity;
        self.altitude_deg = altitude_deg;
        self.azimuth_deg = azimuth_deg.rem_euclid(360.0);
        self.target = None;
    }
}

/// Mount without hardware: logs and records every command and reports
/// the pointing it would have. Starts disconnected with both axes disabled.
#[derive(Debug)]
pub struct DryRunMount {
    state: Mutex<State>,
}

impl Default for DryRunMount {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunMount {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                connected: false,
                azimuth_enabled: false,
                altitude_enabled: false,
                tracking: false,
                activity: MountActivity::Idle,
                altitude_deg: HOME_ALTITUDE_DEG,
                azimuth_deg: HOME_AZIMUTH_DEG,
                target: None,
                commands: VecDeque::new(),
            }),
        }
    }

    /// Already connected with both axes enabled. Nothing is recorded.
    pub fn connected() -> Self {
        let mount = Self::new();
        {
            let mut state = mount.lock();
            state.connected = true;
            state.azimuth_enabled = true;
            state.altitude_enabled = true;
        }
        mount
    }

    /// The most recent commands, oldest first, at most [`COMMAND_HISTORY`].
    pub fn commands(&self) -> Vec<MountCommand> {
        self.lock().commands.iter().cloned().collect()
    }

    pub fn follow_count(&self) -> usize {
        self.lock()
            .commands
            .iter()
            .filter(|c| matches!(c, MountCommand::Follow { .. }))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Mount for DryRunMount {
    fn connect(&self) -> Result<(), ActuatorError> {
        log::info!("[dry-run] connect");
        let mut state = self.lock();
        state.connected = true;
        state.record(MountCommand::Connect);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), ActuatorError> {
        log::info!("[dry-run] disconnect");
        let mut state = self.lock();
        state.connected = false;
        state.azimuth_enabled = false;
        state.altitude_enabled = false;
        state.tracking = false;
        state.activity = MountActivity::Idle;
        state.target = None;
        state.record(MountCommand::Disconnect);
        Ok(())
    }

    fn set_axis_enabled(&self, axis: Axis, enabled: bool) -> Result<(), ActuatorError> {
        let mut state = self.lock();
        state.require_connected()?;
        log::info!("[dry-run] {} axis enabled={}", axis, enabled);
        match axis {
            Axis::Azimuth => state.azimuth_enabled = enabled,
            Axis::Altitude => state.altitude_enabled = enabled,
        }
        if !enabled {
            state.activity = MountActivity::Idle;
            state.tracking = false;
            state.target = None;
        }
        state.record(MountCommand::SetAxis { axis, enabled });
        Ok(())
    }

    fn follow_elements(&self, record: &ElementRecord) -> Result<(), ActuatorError> {
        let mut state = self.lock();
        state.require_axes()?;
        log::info!("[dry-run] follow {}\n{}", record.display_name(), record);
        state.activity = MountActivity::Following;
        state.target = Some(record.display_name().to_string());
        state.record(MountCommand::Follow {
            name: record.display_name().to_string(),
            catalog_number: record.catalog_number(),
        });
        Ok(())
    }

    fn goto_alt_az(&self, altitude_deg: f64, azimuth_deg: f64) -> Result<(), ActuatorError> {
        if !(0.0..=90.0).contains(&altitude_deg) || !azimuth_deg.is_finite() {
            return Err(ActuatorError::Rejected(format!(
                "alt/az {altitude_deg}, {azimuth_deg} out of range"
            )));
        }
        let mut state = self.lock();
        state.require_axes()?;
        log::info!("[dry-run] goto alt/az {}, {}", altitude_deg, azimuth_deg);
        state.point(MountActivity::Slewing, altitude_deg, azimuth_deg);
        state.record(MountCommand::GotoAltAz {
            altitude_deg,
            azimuth_deg,
        });
        Ok(())
    }

    fn goto_ra_dec(&self, ra_hours: f64, dec_deg: f64, frame: Frame) -> Result<(), ActuatorError> {
        if !(0.0..24.0).contains(&ra_hours) || !(-90.0..=90.0).contains(&dec_deg) {
            return Err(ActuatorError::Rejected(format!(
                "ra/dec {ra_hours}h, {dec_deg} out of range"
            )));
        }
        let mut state = self.lock();
        state.require_axes()?;
        log::info!("[dry-run] goto ra/dec {}h, {} ({})", ra_hours, dec_deg, frame);
        state.activity = MountActivity::Slewing;
        state.target = Some(format!("RA {ra_hours:.4}h Dec {dec_deg:.4} {frame}"));
        state.record(MountCommand::GotoRaDec {
            ra_hours,
            dec_deg,
            frame,
        });
        Ok(())
    }

    fn stop(&self) -> Result<(), ActuatorError> {
        let mut state = self.lock();
        state.require_connected()?;
        log::info!("[dry-run] stop");
        state.activity = MountActivity::Idle;
        state.tracking = false;
        state.target = None;
        state.record(MountCommand::Stop);
        Ok(())
    }

    fn park(&self, here: bool) -> Result<(), ActuatorError> {
        let mut state = self.lock();
        state.require_axes()?;
        log::info!("[dry-run] park (here={})", here);
        let (altitude_deg, azimuth_deg) = if here {
            (state.altitude_deg, state.azimuth_deg)
        } else {
            (PARK_ALTITUDE_DEG, PARK_AZIMUTH_DEG)
        };
        state.point(MountActivity::Parked, altitude_deg, azimuth_deg);
        state.tracking = false;
        state.record(MountCommand::Park { here });
        Ok(())
    }

    fn home(&self) -> Result<(), ActuatorError> {
        let mut state = self.lock();
        state.require_axes()?;
        log::info!("[dry-run] home");
        state.point(MountActivity::Slewing, HOME_ALTITUDE_DEG, HOME_AZIMUTH_DEG);
        state.record(MountCommand::Home);
        Ok(())
    }

    fn set_tracking(&self, enabled: bool) -> Result<(), ActuatorError> {
        let mut state = self.lock();
        state.require_connected()?;
        log::info!("[dry-run] tracking {}", if enabled { "on" } else { "off" });
        state.tracking = enabled;
        state.record(MountCommand::SetTracking { enabled });
        Ok(())
    }

    fn status(&self) -> Result<MountStatus, ActuatorError> {
        let state = self.lock();
        Ok(MountStatus {
            timestamp: Utc::now(),
            connected: state.connected,
            azimuth_axis_enabled: state.azimuth_enabled,
            altitude_axis_enabled: state.altitude_enabled,
            tracking: state.tracking,
            activity: state.activity,
            altitude_deg: state.altitude_deg,
            azimuth_deg: state.azimuth_deg,
            target: state.target.clone(),
        })
    }
}
