//! Blocking driver for the [VL53L0X](https://www.st.com/en/imaging-and-photonics-solutions/vl53l0x.html)
//! time-of-flight ranging sensor.
//!
//! Written against the `embedded-hal` 1.0 [`I2c`] and [`DelayNs`] traits so
//! it runs on the ESP-IDF I²C master as well as on a fake register file in
//! tests.
//!
//! ```no_run
//! # use embedded_hal::{delay::DelayNs, i2c::I2c};
//! # fn demo<I: I2c, D: DelayNs>(i2c: I, delay: D) -> Result<(), tofstream::sensors::vl53l0x::Vl53l0xError<I::Error>> {
//! use tofstream::sensors::vl53l0x::Vl53l0x;
//!
//! let mut tof = Vl53l0x::new(i2c, delay);
//! tof.set_timeout(500);
//! tof.init(true)?;
//! tof.start_continuous(0)?;
//! loop {
//!     let mm = tof.read_range_continuous_mm()?;
//!     if !tof.timeout_occurred() {
//!         // use mm
//!     }
//! }
//! # }
//! ```

pub mod timing;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{I2c, SevenBitAddress};
use log::{debug, trace, warn};

use timing::{SequenceStepEnables, SequenceStepTimeouts};

/// Default 7-bit I²C address.
pub const DEFAULT_ADDRESS: SevenBitAddress = 0x29;

/// Value of `IDENTIFICATION_MODEL_ID` on a genuine part.
pub const MODEL_ID: u8 = 0xEE;

/// Reading returned when no sample arrived within the timeout.
pub const OUT_OF_RANGE_MM: u16 = 65_535;

/// Interval between data-ready polls.
pub const POLL_INTERVAL_MS: u32 = 1;

/// Register map (named registers only; tuning pokes use raw addresses).
mod reg {
    pub const SYSRANGE_START: u8 = 0x00;
    pub const SYSTEM_SEQUENCE_CONFIG: u8 = 0x01;
    pub const SYSTEM_INTERMEASUREMENT_PERIOD: u8 = 0x04;
    pub const SYSTEM_INTERRUPT_CONFIG_GPIO: u8 = 0x0A;
    pub const SYSTEM_INTERRUPT_CLEAR: u8 = 0x0B;
    pub const RESULT_INTERRUPT_STATUS: u8 = 0x13;
    pub const RESULT_RANGE_STATUS: u8 = 0x14;
    pub const FINAL_RANGE_CONFIG_MIN_COUNT_RATE_RTN_LIMIT: u8 = 0x44;
    pub const MSRC_CONFIG_TIMEOUT_MACROP: u8 = 0x46;
    pub const DYNAMIC_SPAD_NUM_REQUESTED_REF_SPAD: u8 = 0x4E;
    pub const DYNAMIC_SPAD_REF_EN_START_OFFSET: u8 = 0x4F;
    pub const PRE_RANGE_CONFIG_VCSEL_PERIOD: u8 = 0x50;
    pub const PRE_RANGE_CONFIG_TIMEOUT_MACROP_HI: u8 = 0x51;
    pub const MSRC_CONFIG_CONTROL: u8 = 0x60;
    pub const FINAL_RANGE_CONFIG_VCSEL_PERIOD: u8 = 0x70;
    pub const FINAL_RANGE_CONFIG_TIMEOUT_MACROP_HI: u8 = 0x71;
    pub const GPIO_HV_MUX_ACTIVE_HIGH: u8 = 0x84;
    pub const VHV_CONFIG_PAD_SCL_SDA_EXTSUP_HV: u8 = 0x89;
    pub const GLOBAL_CONFIG_SPAD_ENABLES_REF_0: u8 = 0xB0;
    pub const GLOBAL_CONFIG_REF_EN_START_SELECT: u8 = 0xB6;
    pub const OSC_CALIBRATE_VAL: u8 = 0xF8;
    pub const IDENTIFICATION_MODEL_ID: u8 = 0xC0;
}

/// Offset of the 16-bit range result inside the result block.
const RESULT_RANGE_MM_OFFSET: u8 = 10;

/// ST's default tuning settings, applied verbatim during static init.
/// `0xFF` selects the register page for the writes that follow.
const DEFAULT_TUNING: &[(u8, u8)] = &[
    (0xFF, 0x01), (0x00, 0x00),
    (0xFF, 0x00), (0x09, 0x00), (0x10, 0x00), (0x11, 0x00),
    (0x24, 0x01), (0x25, 0xFF), (0x75, 0x00),
    (0xFF, 0x01), (0x4E, 0x2C), (0x48, 0x00), (0x30, 0x20),
    (0xFF, 0x00), (0x30, 0x09), (0x54, 0x00), (0x31, 0x04),
    (0x32, 0x03), (0x40, 0x83), (0x46, 0x25), (0x60, 0x00),
    (0x27, 0x00), (0x50, 0x06), (0x51, 0x00), (0x52, 0x96),
    (0x56, 0x08), (0x57, 0x30), (0x61, 0x00), (0x62, 0x00),
    (0x64, 0x00), (0x65, 0x00), (0x66, 0xA0),
    (0xFF, 0x01), (0x22, 0x32), (0x47, 0x14), (0x49, 0xFF), (0x4A, 0x00),
    (0xFF, 0x00), (0x7A, 0x0A), (0x7B, 0x00), (0x78, 0x21),
    (0xFF, 0x01), (0x23, 0x34), (0x42, 0x00), (0x44, 0xFF), (0x45, 0x26),
    (0x46, 0x05), (0x40, 0x40), (0x0E, 0x06), (0x20, 0x1A), (0x43, 0x40),
    (0xFF, 0x00), (0x34, 0x03), (0x35, 0x44),
    (0xFF, 0x01), (0x31, 0x04), (0x4B, 0x09), (0x4C, 0x05), (0x4D, 0x04),
    (0xFF, 0x00), (0x44, 0x00), (0x45, 0x20), (0x47, 0x08), (0x48, 0x28),
    (0x67, 0x00), (0x70, 0x04), (0x71, 0x01), (0x72, 0xFE),
    (0x76, 0x00), (0x77, 0x00),
    (0xFF, 0x01), (0x0D, 0x01),
    (0xFF, 0x00), (0x80, 0x01), (0x01, 0xF8),
    (0xFF, 0x01), (0x8E, 0x01), (0x00, 0x01), (0xFF, 0x00), (0x80, 0x00),
];

/// Driver errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vl53l0xError<E> {
    /// The underlying bus transfer failed.
    I2c(E),
    /// `IDENTIFICATION_MODEL_ID` did not read [`MODEL_ID`].
    InvalidDevice(u8),
    /// The sensor did not signal completion within the configured timeout.
    Timeout,
    /// A parameter was outside the range the sensor accepts.
    InvalidArgument,
}

impl<E: core::fmt::Debug> core::fmt::Display for Vl53l0xError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::I2c(e) => write!(f, "I2C error: {e:?}"),
            Self::InvalidDevice(id) => write!(f, "unexpected model id 0x{id:02x}"),
            Self::Timeout => write!(f, "sensor timeout"),
            Self::InvalidArgument => write!(f, "invalid argument"),
        }
    }
}

/// A VL53L0X on an I²C bus.
pub struct Vl53l0x<I2C, D> {
    i2c: I2C,
    delay: D,
    address: SevenBitAddress,
    io_timeout_ms: u16,
    did_timeout: bool,
    stop_variable: u8,
    measurement_timing_budget_us: u32,
}

impl<I2C, D, E> Vl53l0x<I2C, D>
where
    I2C: I2c<SevenBitAddress, Error = E>,
    D: DelayNs,
{
    /// Construct a driver at [`DEFAULT_ADDRESS`] without sending anything.
    /// Call [`Self::init`] before ranging.
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: DEFAULT_ADDRESS,
            io_timeout_ms: 0,
            did_timeout: false,
            stop_variable: 0,
            measurement_timing_budget_us: 0,
        }
    }

    /// Talk to a sensor that was already moved to another address.
    pub fn with_address(mut self, address: SevenBitAddress) -> Self {
        self.address = address;
        self
    }

    pub fn address(&self) -> SevenBitAddress {
        self.address
    }

    /// Timeout for every blocking wait, in milliseconds.  `0` waits forever.
    pub fn set_timeout(&mut self, timeout_ms: u16) {
        self.io_timeout_ms = timeout_ms;
    }

    pub fn timeout(&self) -> u16 {
        self.io_timeout_ms
    }

    /// Whether a read timed out since the last call; clears the flag.
    pub fn timeout_occurred(&mut self) -> bool {
        core::mem::take(&mut self.did_timeout)
    }

    /// Release the bus and delay.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    // ── Bring-up ──────────────────────────────────────────────

    /// Data init, static init and reference calibration.
    ///
    /// `io_2v8` switches the I/O pads to 2.8 V, which every common breakout
    /// board needs.
    pub fn init(&mut self, io_2v8: bool) -> Result<(), Vl53l0xError<E>> {
        let id = self.read_reg(reg::IDENTIFICATION_MODEL_ID)?;
        if id != MODEL_ID {
            return Err(Vl53l0xError::InvalidDevice(id));
        }
        debug!("VL53L0X found at 0x{:02x}", self.address);

        // ── data init ──
        if io_2v8 {
            let pad = self.read_reg(reg::VHV_CONFIG_PAD_SCL_SDA_EXTSUP_HV)?;
            self.write_reg(reg::VHV_CONFIG_PAD_SCL_SDA_EXTSUP_HV, pad | 0x01)?;
        }

        // I2C standard mode
        self.write_reg(0x88, 0x00)?;

        self.write_reg(0x80, 0x01)?;
        self.write_reg(0xFF, 0x01)?;
        self.write_reg(0x00, 0x00)?;
        self.stop_variable = self.read_reg(0x91)?;
        self.write_reg(0x00, 0x01)?;
        self.write_reg(0xFF, 0x00)?;
        self.write_reg(0x80, 0x00)?;

        // disable SIGNAL_RATE_MSRC and SIGNAL_RATE_PRE_RANGE limit checks
        let msrc = self.read_reg(reg::MSRC_CONFIG_CONTROL)?;
        self.write_reg(reg::MSRC_CONFIG_CONTROL, msrc | 0x12)?;

        self.set_signal_rate_limit(0.25)?;
        self.write_reg(reg::SYSTEM_SEQUENCE_CONFIG, 0xFF)?;

        // ── static init ──
        let (spad_count, spad_type_is_aperture) = self.spad_info()?;
        debug!("SPAD info: count={} aperture={}", spad_count, spad_type_is_aperture);

        let mut ref_spad_map = [0u8; 6];
        self.read_multi(reg::GLOBAL_CONFIG_SPAD_ENABLES_REF_0, &mut ref_spad_map)?;

        self.write_reg(0xFF, 0x01)?;
        self.write_reg(reg::DYNAMIC_SPAD_REF_EN_START_OFFSET, 0x00)?;
        self.write_reg(reg::DYNAMIC_SPAD_NUM_REQUESTED_REF_SPAD, 0x2C)?;
        self.write_reg(0xFF, 0x00)?;
        self.write_reg(reg::GLOBAL_CONFIG_REF_EN_START_SELECT, 0xB4)?;

        select_reference_spads(&mut ref_spad_map, spad_count, spad_type_is_aperture);
        self.write_multi(reg::GLOBAL_CONFIG_SPAD_ENABLES_REF_0, &ref_spad_map)?;

        for &(addr, value) in DEFAULT_TUNING {
            self.write_reg(addr, value)?;
        }

        // new sample ready interrupt, active low
        self.write_reg(reg::SYSTEM_INTERRUPT_CONFIG_GPIO, 0x04)?;
        let mux = self.read_reg(reg::GPIO_HV_MUX_ACTIVE_HIGH)?;
        self.write_reg(reg::GPIO_HV_MUX_ACTIVE_HIGH, mux & !0x10)?;
        self.write_reg(reg::SYSTEM_INTERRUPT_CLEAR, 0x01)?;

        // Re-fit the final range step now that MSRC and TCC are disabled.
        self.measurement_timing_budget_us = self.measurement_timing_budget_us()?;
        self.write_reg(reg::SYSTEM_SEQUENCE_CONFIG, 0xE8)?;
        match self.set_measurement_timing_budget(self.measurement_timing_budget_us) {
            Ok(()) | Err(Vl53l0xError::InvalidArgument) => {}
            Err(e) => return Err(e),
        }

        // ── reference calibration ──
        self.write_reg(reg::SYSTEM_SEQUENCE_CONFIG, 0x01)?;
        self.single_ref_calibration(0x40)?; // VHV
        self.write_reg(reg::SYSTEM_SEQUENCE_CONFIG, 0x02)?;
        self.single_ref_calibration(0x00)?; // phase
        self.write_reg(reg::SYSTEM_SEQUENCE_CONFIG, 0xE8)?;

        debug!(
            "VL53L0X ready (budget {} us)",
            self.measurement_timing_budget_us
        );
        Ok(())
    }

    /// Return-signal rate limit in mega counts per second.  Lower values
    /// extend range at the cost of accuracy.
    pub fn set_signal_rate_limit(&mut self, limit_mcps: f32) -> Result<(), Vl53l0xError<E>> {
        if !(0.0..=511.99).contains(&limit_mcps) {
            return Err(Vl53l0xError::InvalidArgument);
        }
        // Q9.7 fixed point
        let raw = (limit_mcps * f32::from(1u16 << 7)) as u16;
        self.write_reg16(reg::FINAL_RANGE_CONFIG_MIN_COUNT_RATE_RTN_LIMIT, raw)
    }

    /// Current measurement timing budget in microseconds, read back from the
    /// sequence configuration.
    pub fn measurement_timing_budget_us(&mut self) -> Result<u32, Vl53l0xError<E>> {
        let enables = self.sequence_step_enables()?;
        let timeouts = self.sequence_step_timeouts(enables)?;
        Ok(timing::timing_budget_us(enables, &timeouts))
    }

    /// Fit the final-range step so one measurement takes `budget_us`.
    /// Rejects budgets below [`timing::MIN_TIMING_BUDGET_US`].
    pub fn set_measurement_timing_budget(&mut self, budget_us: u32) -> Result<(), Vl53l0xError<E>> {
        let enables = self.sequence_step_enables()?;
        let timeouts = self.sequence_step_timeouts(enables)?;

        match timing::final_range_timeout_for_budget(budget_us, enables, &timeouts) {
            None => {
                warn!("timing budget {} us rejected", budget_us);
                Err(Vl53l0xError::InvalidArgument)
            }
            Some(None) => {
                self.measurement_timing_budget_us = budget_us;
                Ok(())
            }
            Some(Some(final_timeout)) => {
                self.write_reg16(reg::FINAL_RANGE_CONFIG_TIMEOUT_MACROP_HI, final_timeout)?;
                self.measurement_timing_budget_us = budget_us;
                Ok(())
            }
        }
    }

    // ── Ranging ───────────────────────────────────────────────

    /// Start continuous ranging.  `period_ms == 0` ranges back-to-back;
    /// otherwise the sensor waits `period_ms` between measurements.
    pub fn start_continuous(&mut self, period_ms: u32) -> Result<(), Vl53l0xError<E>> {
        self.restore_stop_variable()?;

        if period_ms == 0 {
            self.write_reg(reg::SYSRANGE_START, 0x02)?; // back-to-back
            return Ok(());
        }

        let osc_calibrate_val = self.read_reg16(reg::OSC_CALIBRATE_VAL)?;
        let period = if osc_calibrate_val == 0 {
            period_ms
        } else {
            period_ms.saturating_mul(u32::from(osc_calibrate_val))
        };
        self.write_reg32(reg::SYSTEM_INTERMEASUREMENT_PERIOD, period)?;
        self.write_reg(reg::SYSRANGE_START, 0x04) // timed
    }

    /// Stop continuous ranging.
    pub fn stop_continuous(&mut self) -> Result<(), Vl53l0xError<E>> {
        self.write_reg(reg::SYSRANGE_START, 0x01)?; // single shot, i.e. stop
        self.write_reg(0xFF, 0x01)?;
        self.write_reg(0x00, 0x00)?;
        self.write_reg(0x91, 0x00)?;
        self.write_reg(0x00, 0x01)?;
        self.write_reg(0xFF, 0x00)
    }

    /// Wait for the next continuous-mode sample and return its range in
    /// millimetres.
    ///
    /// On timeout this returns `Ok(`[`OUT_OF_RANGE_MM`]`)` and latches
    /// [`Self::timeout_occurred`]; only bus failures are errors.
    pub fn read_range_continuous_mm(&mut self) -> Result<u16, Vl53l0xError<E>> {
        match self.wait_for_interrupt() {
            Ok(()) => {}
            Err(Vl53l0xError::Timeout) => {
                self.did_timeout = true;
                return Ok(OUT_OF_RANGE_MM);
            }
            Err(e) => return Err(e),
        }

        let range = self.read_reg16(reg::RESULT_RANGE_STATUS + RESULT_RANGE_MM_OFFSET)?;
        self.write_reg(reg::SYSTEM_INTERRUPT_CLEAR, 0x01)?;
        trace!("range {} mm", range);
        Ok(range)
    }

    // ── Internals ─────────────────────────────────────────────

    fn restore_stop_variable(&mut self) -> Result<(), Vl53l0xError<E>> {
        self.write_reg(0x80, 0x01)?;
        self.write_reg(0xFF, 0x01)?;
        self.write_reg(0x00, 0x00)?;
        self.write_reg(0x91, self.stop_variable)?;
        self.write_reg(0x00, 0x01)?;
        self.write_reg(0xFF, 0x00)?;
        self.write_reg(0x80, 0x00)
    }

    /// Reference SPAD count and type from the NVM.
    fn spad_info(&mut self) -> Result<(u8, bool), Vl53l0xError<E>> {
        self.write_reg(0x80, 0x01)?;
        self.write_reg(0xFF, 0x01)?;
        self.write_reg(0x00, 0x00)?;

        self.write_reg(0xFF, 0x06)?;
        let v = self.read_reg(0x83)?;
        self.write_reg(0x83, v | 0x04)?;
        self.write_reg(0xFF, 0x07)?;
        self.write_reg(0x81, 0x01)?;

        self.write_reg(0x80, 0x01)?;

        self.write_reg(0x94, 0x6B)?;
        self.write_reg(0x83, 0x00)?;

        self.wait_until(|s| Ok(s.read_reg(0x83)? != 0x00))?;

        self.write_reg(0x83, 0x01)?;
        let tmp = self.read_reg(0x92)?;
        let count = tmp & 0x7F;
        let type_is_aperture = (tmp >> 7) & 0x01 == 1;

        self.write_reg(0x81, 0x00)?;
        self.write_reg(0xFF, 0x06)?;
        let v = self.read_reg(0x83)?;
        self.write_reg(0x83, v & !0x04)?;
        self.write_reg(0xFF, 0x01)?;
        self.write_reg(0x00, 0x01)?;

        self.write_reg(0xFF, 0x00)?;
        self.write_reg(0x80, 0x00)?;

        Ok((count, type_is_aperture))
    }

    fn single_ref_calibration(&mut self, vhv_init_byte: u8) -> Result<(), Vl53l0xError<E>> {
        self.write_reg(reg::SYSRANGE_START, 0x01 | vhv_init_byte)?;
        self.wait_for_interrupt()?;
        self.write_reg(reg::SYSTEM_INTERRUPT_CLEAR, 0x01)?;
        self.write_reg(reg::SYSRANGE_START, 0x00)
    }

    fn wait_for_interrupt(&mut self) -> Result<(), Vl53l0xError<E>> {
        self.wait_until(|s| Ok(s.read_reg(reg::RESULT_INTERRUPT_STATUS)? & 0x07 != 0))
    }

    /// Poll `ready` every [`POLL_INTERVAL_MS`] until it holds or the
    /// configured timeout elapses.
    fn wait_until(
        &mut self,
        mut ready: impl FnMut(&mut Self) -> Result<bool, Vl53l0xError<E>>,
    ) -> Result<(), Vl53l0xError<E>> {
        let mut waited_ms: u32 = 0;
        loop {
            if ready(self)? {
                return Ok(());
            }
            if self.io_timeout_ms > 0 && waited_ms >= u32::from(self.io_timeout_ms) {
                return Err(Vl53l0xError::Timeout);
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
            waited_ms = waited_ms.saturating_add(POLL_INTERVAL_MS);
        }
    }

    fn sequence_step_enables(&mut self) -> Result<SequenceStepEnables, Vl53l0xError<E>> {
        let cfg = self.read_reg(reg::SYSTEM_SEQUENCE_CONFIG)?;
        Ok(SequenceStepEnables::from_config(cfg))
    }

    fn sequence_step_timeouts(
        &mut self,
        enables: SequenceStepEnables,
    ) -> Result<SequenceStepTimeouts, Vl53l0xError<E>> {
        let pre_vcsel = self.read_reg(reg::PRE_RANGE_CONFIG_VCSEL_PERIOD)?;
        let final_vcsel = self.read_reg(reg::FINAL_RANGE_CONFIG_VCSEL_PERIOD)?;
        let msrc = self.read_reg(reg::MSRC_CONFIG_TIMEOUT_MACROP)?;
        let pre = self.read_reg16(reg::PRE_RANGE_CONFIG_TIMEOUT_MACROP_HI)?;
        let fin = self.read_reg16(reg::FINAL_RANGE_CONFIG_TIMEOUT_MACROP_HI)?;
        Ok(SequenceStepTimeouts::from_registers(
            enables,
            pre_vcsel,
            final_vcsel,
            msrc,
            pre,
            fin,
        ))
    }

    // ── Register access ───────────────────────────────────────

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Vl53l0xError<E>> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(Vl53l0xError::I2c)
    }

    fn write_reg16(&mut self, reg: u8, value: u16) -> Result<(), Vl53l0xError<E>> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(self.address, &[reg, hi, lo])
            .map_err(Vl53l0xError::I2c)
    }

    fn write_reg32(&mut self, reg: u8, value: u32) -> Result<(), Vl53l0xError<E>> {
        let mut msg = [0u8; 5];
        msg[0] = reg;
        msg[1..].copy_from_slice(&value.to_be_bytes());
        self.i2c.write(self.address, &msg).map_err(Vl53l0xError::I2c)
    }

    fn write_multi(&mut self, reg: u8, data: &[u8; 6]) -> Result<(), Vl53l0xError<E>> {
        let mut msg = [0u8; 7];
        msg[0] = reg;
        msg[1..].copy_from_slice(data);
        self.i2c.write(self.address, &msg).map_err(Vl53l0xError::I2c)
    }

    fn read_multi(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Vl53l0xError<E>> {
        self.i2c
            .write_read(self.address, &[reg], buf)
            .map_err(Vl53l0xError::I2c)
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, Vl53l0xError<E>> {
        let mut buf = [0u8; 1];
        self.read_multi(reg, &mut buf)?;
        Ok(buf[0])
    }

    fn read_reg16(&mut self, reg: u8) -> Result<u16, Vl53l0xError<E>> {
        let mut buf = [0u8; 2];
        self.read_multi(reg, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }
}

/// Keep only the first `spad_count` reference SPADs that are good in the
/// NVM map, skipping the first 12 when the part uses aperture SPADs.
fn select_reference_spads(map: &mut [u8; 6], spad_count: u8, type_is_aperture: bool) {
    let first_spad_to_enable = if type_is_aperture { 12 } else { 0 };
    let mut spads_enabled = 0u8;

    for i in 0..48usize {
        let (byte, bit) = (i / 8, i % 8);
        if i < first_spad_to_enable || spads_enabled == spad_count {
            map[byte] &= !(1 << bit);
        } else if (map[byte] >> bit) & 0x1 == 1 {
            spads_enabled += 1;
        }
    }
}
