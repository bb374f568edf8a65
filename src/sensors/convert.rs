//! Millivolt to physical-unit conversion per sensor kind.

use crate::sensors::SensorKind;

/// Linear map of `x` from `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// Not clamped; inverted ranges are fine.  A zero-width input range gives NaN.
pub fn map_range(x: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    if in_max == in_min {
        return f32::NAN;
    }
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

// ── Soil moisture (capacitive sensor) ─────────────────────────
const SOIL_DRY_MV: f32 = 3000.0;
const SOIL_WET_MV: f32 = 1500.0;

// ── Water level / flow (ratiometric, full scale) ─────────────
const FULL_SCALE_MV: f32 = 3300.0;

// ── NTC thermistor (10 kOhm @ 25 C, B = 3950) ────────────────
const R25: f32 = 10_000.0;
const BETA: f32 = 3950.0;
const T25_K: f32 = 298.15;
const R_DIVIDER: f32 = 10_000.0;
/// Within this many mV of either rail the divider is open or shorted.
const RAIL_MARGIN_MV: f32 = 10.0;

// ── MQ-135 ───────────────────────────────────────────────────
const MQ135_REF_MV: f32 = 1100.0;
const MQ135_INTERCEPT: f32 = 2.013;
const MQ135_SLOPE: f32 = -0.66;

/// Convert a calibrated millivolt value into the kind's unit.
/// NaN marks a value that cannot be trusted.
pub fn to_physical(kind: SensorKind, millivolts: i32) -> f32 {
    let mv = millivolts as f32;
    match kind {
        SensorKind::SoilMoisture => map_range(mv, SOIL_DRY_MV, SOIL_WET_MV, 0.0, 100.0),
        SensorKind::WaterLevel | SensorKind::Flow => {
            map_range(mv, 0.0, FULL_SCALE_MV, 0.0, 100.0)
        }
        SensorKind::Temperature => ntc_celsius(mv),
        SensorKind::AirPollution => mq135_ppm(mv),
    }
}

fn ntc_celsius(mv: f32) -> f32 {
    if mv <= RAIL_MARGIN_MV || mv >= FULL_SCALE_MV - RAIL_MARGIN_MV {
        return f32::NAN;
    }
    let r_ntc = R_DIVIDER * mv / (FULL_SCALE_MV - mv);
    let inv_t = (1.0 / T25_K) + (1.0 / BETA) * (r_ntc / R25).ln();
    if inv_t <= 0.0 {
        return f32::NAN;
    }
    (1.0 / inv_t) - 273.15
}

fn mq135_ppm(mv: f32) -> f32 {
    if mv <= 0.0 {
        return f32::NAN;
    }
    10f32.powf(((mv / MQ135_REF_MV).log10() - MQ135_INTERCEPT) / MQ135_SLOPE)
}
