//! Per-channel ADC calibration.
//!
//! ```text
//!   Uncalibrated ──attempt──▶ Calibrated { CurveFitting | LineFitting }
//!                      └────▶ Unsupported
//! ```
//!
//! Both outcomes are terminal: a channel is calibrated at most once per
//! boot.  An `Unsupported` channel keeps working on the linear fallback and
//! its readings are flagged [`Quality::Degraded`].

use log::{error, info, warn};

use crate::app::ports::{CalibrationHandle, CalibrationPort, CalibrationScheme};
use crate::error::{CalibrationError, SensorError};
use crate::sensors::{AdcChannel, Quality};

/// Reference voltage for line fitting when the eFuse Vref is absent.
pub const DEFAULT_VREF_MV: u32 = 1100;

/// Full-scale voltage at 12 dB attenuation.
const FALLBACK_FULL_SCALE_MV: i32 = 3300;
const FALLBACK_MAX_RAW: i32 = 4095;

/// Schemes in preference order.
const SCHEMES: [CalibrationScheme; 2] = [
    CalibrationScheme::CurveFitting,
    CalibrationScheme::LineFitting {
        default_vref_mv: DEFAULT_VREF_MV,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Uncalibrated,
    Calibrated {
        handle: CalibrationHandle,
        scheme: CalibrationScheme,
    },
    Unsupported,
}

impl CalibrationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Uncalibrated)
    }

    /// Serialisable summary for events and telemetry.
    pub fn status(&self) -> CalibrationStatus {
        match self {
            Self::Uncalibrated => CalibrationStatus::Uncalibrated,
            Self::Calibrated {
                scheme: CalibrationScheme::CurveFitting,
                ..
            } => CalibrationStatus::CurveFitting,
            Self::Calibrated {
                scheme: CalibrationScheme::LineFitting { .. },
                ..
            } => CalibrationStatus::LineFitting,
            Self::Unsupported => CalibrationStatus::Unsupported,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    Uncalibrated,
    CurveFitting,
    LineFitting,
    Unsupported,
}

/// Uncalibrated linear estimate: raw counts scaled onto 0-3300 mV.
/// Counts outside the 12-bit range are clamped first.
pub const fn fallback_millivolts(raw: i32) -> i32 {
    let raw = if raw < 0 {
        0
    } else if raw > FALLBACK_MAX_RAW {
        FALLBACK_MAX_RAW
    } else {
        raw
    };
    raw * FALLBACK_FULL_SCALE_MV / FALLBACK_MAX_RAW
}

#[derive(Debug, Clone)]
pub struct Calibrator {
    channel: AdcChannel,
    state: CalibrationState,
}

impl Calibrator {
    pub const fn new(channel: AdcChannel) -> Self {
        Self {
            channel,
            state: CalibrationState::Uncalibrated,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Try each scheme once.  A no-op after the first call.
    pub fn attempt(&mut self, port: &mut impl CalibrationPort) -> CalibrationState {
        if self.state.is_terminal() {
            return self.state;
        }

        for scheme in SCHEMES {
            match port.create_scheme(self.channel, scheme) {
                Ok(handle) => {
                    info!("calibration: {} using {:?}", self.channel, scheme);
                    self.state = CalibrationState::Calibrated { handle, scheme };
                    return self.state;
                }
                Err(CalibrationError::NotSupported) => {
                    warn!("calibration: {:?} not supported on {}", scheme, self.channel);
                }
                Err(e) => {
                    error!("calibration: {:?} failed on {}: {}", scheme, self.channel, e);
                }
            }
        }

        warn!(
            "calibration: {} has no usable scheme, readings degraded",
            self.channel
        );
        self.state = CalibrationState::Unsupported;
        self.state
    }

    /// Convert a filtered raw value to millivolts.
    pub fn to_millivolts(
        &self,
        port: &impl CalibrationPort,
        raw: i32,
    ) -> Result<(i32, Quality), SensorError> {
        match self.state {
            CalibrationState::Calibrated { handle, .. } => port
                .raw_to_millivolts(handle, raw)
                .map(|mv| (mv, Quality::Calibrated)),
            CalibrationState::Uncalibrated | CalibrationState::Unsupported => {
                Ok((fallback_millivolts(raw), Quality::Degraded))
            }
        }
    }
}
