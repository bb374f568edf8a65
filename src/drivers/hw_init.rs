//! One-shot hardware peripheral initialization and raw register access.
//!
//! Owns the ADC1 oneshot unit, the eFuse calibration handles, the relay
//! output pins, the LEDC channels dimming the lights and the GPIO ISR
//! service.  Everything here is called from the main task only; the ISR
//! handlers just push to the event queue.
//!
//! On host targets every function has a simulation twin backed by atomics
//! so the whole stack can run without hardware.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use embedded_hal::digital::PinState;
use log::info;

use crate::app::ports::{Attenuation, BitWidth, CalibrationHandle, CalibrationScheme};
use crate::board::InputBinding;
use crate::error::{ActuatorError, CalibrationError, InitError, SensorError};
use crate::sensors::{AdcChannel, MAX_SENSORS};

/// ADC1 has channels 0..=7 on the ESP32.
pub const ADC1_CHANNELS: usize = 8;

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the main task.  `ADC1_HANDLE` is
/// written once by `init_adc()` before any channel is configured.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
fn atten(a: Attenuation) -> adc_atten_t {
    match a {
        Attenuation::Db0 => adc_atten_t_ADC_ATTEN_DB_0,
        Attenuation::Db2_5 => adc_atten_t_ADC_ATTEN_DB_2_5,
        Attenuation::Db6 => adc_atten_t_ADC_ATTEN_DB_6,
        Attenuation::Db12 => adc_atten_t_ADC_ATTEN_DB_12,
    }
}

#[cfg(target_os = "espidf")]
fn bitwidth(w: BitWidth) -> adc_bitwidth_t {
    match w {
        BitWidth::Bits9 => adc_bitwidth_t_ADC_BITWIDTH_9,
        BitWidth::Bits10 => adc_bitwidth_t_ADC_BITWIDTH_10,
        BitWidth::Bits11 => adc_bitwidth_t_ADC_BITWIDTH_11,
        BitWidth::Bits12 => adc_bitwidth_t_ADC_BITWIDTH_12,
    }
}

/// Create the ADC1 oneshot unit.  Call once before any channel is used.
#[cfg(target_os = "espidf")]
pub fn init_adc() -> Result<(), InitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(InitError::AdcConfigFailed(ret));
    }
    info!("hw_init: ADC1 oneshot unit created");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_adc() -> Result<(), InitError> {
    info!("hw_init(sim): ADC1 unit simulated");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc_config_channel(
    channel: AdcChannel,
    attenuation: Attenuation,
    width: BitWidth,
) -> Result<(), InitError> {
    let cfg = adc_oneshot_chan_cfg_t {
        atten: atten(attenuation),
        bitwidth: bitwidth(width),
    };
    // SAFETY: adc1_handle() contract; main task only.
    let ret =
        unsafe { adc_oneshot_config_channel(adc1_handle(), u32::from(channel.channel), &cfg) };
    if ret != ESP_OK as i32 {
        return Err(InitError::AdcConfigFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn adc_config_channel(
    channel: AdcChannel,
    _attenuation: Attenuation,
    _width: BitWidth,
) -> Result<(), InitError> {
    if usize::from(channel.channel) >= ADC1_CHANNELS {
        return Err(InitError::AdcConfigFailed(-1));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc_read(channel: AdcChannel) -> Result<i32, SensorError> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract; main task only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), u32::from(channel.channel), &mut raw) };
    if ret == ESP_OK as i32 {
        Ok(raw)
    } else if ret == ESP_ERR_TIMEOUT as i32 {
        Err(SensorError::Timeout)
    } else {
        Err(SensorError::AdcReadFailed)
    }
}

// ── Simulation ADC ────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicI32, AtomicU8, AtomicU64, Ordering};

/// Simulated raw counts per ADC1 channel.  Negative = read failure.
#[cfg(not(target_os = "espidf"))]
static SIM_ADC: [AtomicI32; ADC1_CHANNELS] = [const { AtomicI32::new(2048) }; ADC1_CHANNELS];

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc(channel: u8, raw: i32) {
    if let Some(slot) = SIM_ADC.get(usize::from(channel)) {
        slot.store(raw, Ordering::Relaxed);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn adc_read(channel: AdcChannel) -> Result<i32, SensorError> {
    let raw = SIM_ADC
        .get(usize::from(channel.channel))
        .ok_or(SensorError::AdcReadFailed)?
        .load(Ordering::Relaxed);
    if raw < 0 {
        return Err(SensorError::AdcReadFailed);
    }
    Ok(raw.min(BitWidth::Bits12.max_raw()))
}

// ── eFuse calibration ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut CALI_HANDLES: [adc_cali_handle_t; MAX_SENSORS] = [core::ptr::null_mut(); MAX_SENSORS];
#[cfg(target_os = "espidf")]
static mut CALI_COUNT: usize = 0;

/// Curve fitting is only present on the newer chips.
#[cfg(all(target_os = "espidf", not(any(esp32, esp32s2, esp32c2))))]
unsafe fn create_curve_fitting(
    channel: AdcChannel,
    attenuation: Attenuation,
    width: BitWidth,
    out: *mut adc_cali_handle_t,
) -> esp_err_t {
    let cfg = adc_cali_curve_fitting_config_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        chan: u32::from(channel.channel),
        atten: atten(attenuation),
        bitwidth: bitwidth(width),
    };
    unsafe { adc_cali_create_scheme_curve_fitting(&cfg, out) }
}

#[cfg(all(target_os = "espidf", any(esp32, esp32s2, esp32c2)))]
unsafe fn create_curve_fitting(
    _channel: AdcChannel,
    _attenuation: Attenuation,
    _width: BitWidth,
    _out: *mut adc_cali_handle_t,
) -> esp_err_t {
    ESP_ERR_NOT_SUPPORTED as esp_err_t
}

/// Only the original ESP32 takes a default Vref for chips without one burnt.
#[cfg(all(target_os = "espidf", esp32))]
unsafe fn create_line_fitting(
    attenuation: Attenuation,
    width: BitWidth,
    default_vref_mv: u32,
    out: *mut adc_cali_handle_t,
) -> esp_err_t {
    let cfg = adc_cali_line_fitting_config_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        atten: atten(attenuation),
        bitwidth: bitwidth(width),
        default_vref: default_vref_mv,
    };
    unsafe { adc_cali_create_scheme_line_fitting(&cfg, out) }
}

#[cfg(all(target_os = "espidf", not(esp32)))]
unsafe fn create_line_fitting(
    _attenuation: Attenuation,
    _width: BitWidth,
    _default_vref_mv: u32,
    _out: *mut adc_cali_handle_t,
) -> esp_err_t {
    ESP_ERR_NOT_SUPPORTED as esp_err_t
}

#[cfg(target_os = "espidf")]
pub fn cali_create(
    channel: AdcChannel,
    scheme: CalibrationScheme,
    attenuation: Attenuation,
    width: BitWidth,
) -> Result<CalibrationHandle, CalibrationError> {
    // SAFETY: CALI_HANDLES/CALI_COUNT are touched from the main task only.
    unsafe {
        let index = CALI_COUNT;
        if index >= MAX_SENSORS {
            return Err(CalibrationError::InvalidArg);
        }
        let mut handle: adc_cali_handle_t = core::ptr::null_mut();
        let ret = match scheme {
            CalibrationScheme::CurveFitting => {
                create_curve_fitting(channel, attenuation, width, &mut handle)
            }
            CalibrationScheme::LineFitting { default_vref_mv } => {
                create_line_fitting(attenuation, width, default_vref_mv, &mut handle)
            }
        };
        if ret == ESP_OK as i32 {
            CALI_HANDLES[index] = handle;
            CALI_COUNT = index + 1;
            Ok(CalibrationHandle(index as u32))
        } else if ret == ESP_ERR_NOT_SUPPORTED as i32 {
            Err(CalibrationError::NotSupported)
        } else {
            Err(CalibrationError::InvalidArg)
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn cali_raw_to_mv(handle: CalibrationHandle, raw: i32) -> Result<i32, SensorError> {
    let index = handle.0 as usize;
    // SAFETY: handles below CALI_COUNT were written by cali_create().
    let cali = unsafe {
        if index >= CALI_COUNT {
            return Err(SensorError::ConversionFailed);
        }
        CALI_HANDLES[index]
    };
    let mut mv: i32 = 0;
    // SAFETY: `cali` is a live handle; the call is a table lookup.
    let ret = unsafe { adc_cali_raw_to_voltage(cali, raw, &mut mv) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::ConversionFailed);
    }
    Ok(mv)
}

/// The simulated chip has a line-fitting table but no curve-fitting eFuse.
#[cfg(not(target_os = "espidf"))]
pub fn cali_create(
    channel: AdcChannel,
    scheme: CalibrationScheme,
    _attenuation: Attenuation,
    _width: BitWidth,
) -> Result<CalibrationHandle, CalibrationError> {
    match scheme {
        CalibrationScheme::CurveFitting => Err(CalibrationError::NotSupported),
        CalibrationScheme::LineFitting { default_vref_mv } => {
            if default_vref_mv == 0 {
                return Err(CalibrationError::InvalidArg);
            }
            Ok(CalibrationHandle(u32::from(channel.channel)))
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn cali_raw_to_mv(_handle: CalibrationHandle, raw: i32) -> Result<i32, SensorError> {
    if raw < 0 {
        return Err(SensorError::ConversionFailed);
    }
    Ok(raw * 3300 / BitWidth::Bits12.max_raw())
}

// ── GPIO outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_config_output(pin: i32) -> Result<(), InitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: plain register configuration from the main task.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(InitError::GpioConfigFailed(ret));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, level: PinState) -> Result<(), ActuatorError> {
    // SAFETY: pin was configured as an output by gpio_config_output().
    let ret = unsafe { gpio_set_level(pin, u32::from(level == PinState::High)) };
    if ret != ESP_OK as i32 {
        return Err(ActuatorError::GpioWriteFailed);
    }
    Ok(())
}

/// Simulated output latch, one bit per GPIO.
#[cfg(not(target_os = "espidf"))]
static SIM_GPIO: AtomicU64 = AtomicU64::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn gpio_config_output(pin: i32) -> Result<(), InitError> {
    if !(0..40).contains(&pin) {
        return Err(InitError::GpioConfigFailed(-1));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, level: PinState) -> Result<(), ActuatorError> {
    if !(0..40).contains(&pin) {
        return Err(ActuatorError::GpioWriteFailed);
    }
    match level {
        PinState::High => SIM_GPIO.fetch_or(1 << pin, Ordering::Relaxed),
        PinState::Low => SIM_GPIO.fetch_and(!(1 << pin), Ordering::Relaxed),
    };
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_gpio_level(pin: i32) -> bool {
    (0..40).contains(&pin) && SIM_GPIO.load(Ordering::Relaxed) & (1 << pin) != 0
}

// ── LEDC PWM (lights) ─────────────────────────────────────────

/// Low-speed LEDC channels on the ESP32.
pub const LEDC_CHANNELS: usize = 8;
/// Light driver PWM frequency (1 kHz, driver-compatible).
pub const LIGHT_PWM_FREQ_HZ: u32 = 1_000;

/// Percent (clamped to 100) to an 8-bit duty register value.
pub const fn duty_8bit(duty_pct: u8) -> u8 {
    let pct = if duty_pct > 100 { 100 } else { duty_pct };
    (pct as u16 * 255 / 100) as u8
}

/// Configure the shared LEDC timer.  Call once before any channel.
#[cfg(target_os = "espidf")]
pub fn init_ledc() -> Result<(), InitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: LIGHT_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: called once from the main task before any channel exists.
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK as i32 {
        return Err(InitError::PwmConfigFailed(ret));
    }
    info!("hw_init: LEDC timer 0 at {} Hz, 8-bit", LIGHT_PWM_FREQ_HZ);
    Ok(())
}

/// Bind `gpio` to LEDC `channel` on timer 0, duty 0.
#[cfg(target_os = "espidf")]
pub fn ledc_config_channel(channel: u32, gpio: i32) -> Result<(), InitError> {
    let cfg = ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel,
        timer_sel: ledc_timer_t_LEDC_TIMER_0,
        gpio_num: gpio,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    };
    // SAFETY: plain register configuration from the main task.
    let ret = unsafe { ledc_channel_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(InitError::PwmConfigFailed(ret));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u8) -> Result<(), ActuatorError> {
    // SAFETY: the channel was configured by ledc_config_channel(); duty
    // register writes only come from the main task.
    unsafe {
        if ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, u32::from(duty))
            != ESP_OK as i32
        {
            return Err(ActuatorError::GpioWriteFailed);
        }
        if ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel) != ESP_OK as i32 {
            return Err(ActuatorError::GpioWriteFailed);
        }
    }
    Ok(())
}

/// Simulated duty registers, one per LEDC channel.
#[cfg(not(target_os = "espidf"))]
static SIM_DUTY: [AtomicU8; LEDC_CHANNELS] = [const { AtomicU8::new(0) }; LEDC_CHANNELS];

#[cfg(not(target_os = "espidf"))]
pub fn init_ledc() -> Result<(), InitError> {
    info!("hw_init(sim): LEDC timer at {} Hz", LIGHT_PWM_FREQ_HZ);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_config_channel(channel: u32, gpio: i32) -> Result<(), InitError> {
    let slot = SIM_DUTY
        .get(channel as usize)
        .ok_or(InitError::PwmConfigFailed(-1))?;
    if !(0..40).contains(&gpio) {
        return Err(InitError::PwmConfigFailed(-1));
    }
    slot.store(0, Ordering::Relaxed);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(channel: u32, duty: u8) -> Result<(), ActuatorError> {
    SIM_DUTY
        .get(channel as usize)
        .ok_or(ActuatorError::GpioWriteFailed)?
        .store(duty, Ordering::Relaxed);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_ledc_duty(channel: u32) -> Option<u8> {
    SIM_DUTY
        .get(channel as usize)
        .map(|d| d.load(Ordering::Relaxed))
}

// ── GPIO inputs + ISR service ─────────────────────────────────

#[cfg(target_os = "espidf")]
use crate::events::{Event, push_event};

/// ISR argument: input index in the high byte, GPIO number in the low byte.
#[cfg(target_os = "espidf")]
fn isr_arg(index: usize, gpio: i32) -> *mut core::ffi::c_void {
    ((index << 8) | (gpio as usize & 0xFF)) as *mut core::ffi::c_void
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_gpio_isr(arg: *mut core::ffi::c_void) {
    let index = ((arg as usize) >> 8) as u8;
    // SAFETY: esp_timer_get_time is an RTC counter read; safe in ISR context.
    let now_ms = (unsafe { esp_timer_get_time() } / 1_000) as u16;
    push_event(Event::Button {
        index,
        at_ms: now_ms,
    });
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn motion_gpio_isr(arg: *mut core::ffi::c_void) {
    let index = ((arg as usize) >> 8) as u8;
    let gpio = (arg as usize & 0xFF) as i32;
    // SAFETY: gpio_get_level is a register read; safe in ISR context.
    let active = unsafe { gpio_get_level(gpio) } != 0;
    push_event(Event::Motion { index, active });
}

#[cfg(target_os = "espidf")]
unsafe fn config_input(pin: i32, pull_up: bool, intr: gpio_int_type_t) -> Result<(), InitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: if pull_up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: intr,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(InitError::GpioConfigFailed(ret));
    }
    Ok(())
}

/// Configure button and PIR inputs and register their edge interrupts.
/// Call after the event queue exists and before the event loop.
#[cfg(target_os = "espidf")]
pub fn init_inputs(buttons: &[InputBinding], motion: &[InputBinding]) -> Result<(), InitError> {
    // SAFETY: called once from the main task.  The handlers only read a
    // register and push to the lock-free event queue.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(InitError::IsrInstallFailed(ret));
        }

        // Buttons: active-low, falling edge.
        for (i, b) in buttons.iter().enumerate() {
            config_input(b.gpio, true, gpio_int_type_t_GPIO_INTR_NEGEDGE)?;
            let ret = gpio_isr_handler_add(b.gpio, Some(button_gpio_isr), isr_arg(i, b.gpio));
            if ret != ESP_OK as i32 {
                return Err(InitError::IsrInstallFailed(ret));
            }
        }

        // PIR: push-pull output, both edges.
        for (i, m) in motion.iter().enumerate() {
            config_input(m.gpio, false, gpio_int_type_t_GPIO_INTR_ANYEDGE)?;
            let ret = gpio_isr_handler_add(m.gpio, Some(motion_gpio_isr), isr_arg(i, m.gpio));
            if ret != ESP_OK as i32 {
                return Err(InitError::IsrInstallFailed(ret));
            }
        }
    }
    info!(
        "hw_init: ISR service installed ({} buttons, {} PIR)",
        buttons.len(),
        motion.len()
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_inputs(buttons: &[InputBinding], motion: &[InputBinding]) -> Result<(), InitError> {
    info!(
        "hw_init(sim): {} buttons, {} PIR inputs (no ISRs)",
        buttons.len(),
        motion.len()
    );
    Ok(())
}
