//! Sequence-step timeout and timing-budget arithmetic.
//!
//! The VL53L0X stores per-step timeouts in "macro clocks" (MCLKs) whose
//! length depends on the VCSEL pulse period of that step.  Register values
//! use a compact `(LSB << MSB) + 1` encoding.  Everything here is pure so it
//! can be checked without a bus.

// Per-step overheads of one ranging sequence (µs).
const START_OVERHEAD_US: u32 = 1910;
const END_OVERHEAD_US: u32 = 960;
const MSRC_OVERHEAD_US: u32 = 660;
const TCC_OVERHEAD_US: u32 = 590;
const DSS_OVERHEAD_US: u32 = 690;
const PRE_RANGE_OVERHEAD_US: u32 = 660;
const FINAL_RANGE_OVERHEAD_US: u32 = 550;

/// Shortest budget the final-range step can be fitted into.
pub const MIN_TIMING_BUDGET_US: u32 = 20_000;

/// Decode a VCSEL period register value to PCLKs.
pub const fn decode_vcsel_period(reg: u8) -> u8 {
    ((reg as u16 + 1) << 1) as u8
}

/// Macro period in nanoseconds for a VCSEL period in PCLKs.
pub const fn macro_period_ns(vcsel_period_pclks: u8) -> u32 {
    ((2304 * vcsel_period_pclks as u32 * 1655) + 500) / 1000
}

/// Decode a sequence-step timeout register value to MCLKs.
pub const fn decode_timeout(reg: u16) -> u32 {
    let lsb = (reg & 0x00FF) as u32;
    let shift = (reg >> 8) as u32;
    match lsb.checked_shl(shift) {
        Some(v) => v.saturating_add(1),
        None => u32::MAX,
    }
}

/// Encode an MCLK count into the `(LSB << MSB) + 1` register format.
/// Precision is lost for values above 256; the result never decodes to
/// more than the input.
pub const fn encode_timeout(timeout_mclks: u32) -> u16 {
    if timeout_mclks == 0 {
        return 0;
    }
    let mut ls_byte = timeout_mclks - 1;
    let mut ms_byte: u16 = 0;
    while ls_byte & 0xFFFF_FF00 > 0 {
        ls_byte >>= 1;
        ms_byte += 1;
    }
    (ms_byte << 8) | (ls_byte & 0xFF) as u16
}

/// Convert an MCLK timeout to microseconds.
pub const fn timeout_mclks_to_us(timeout_mclks: u32, vcsel_period_pclks: u8) -> u32 {
    let macro_ns = macro_period_ns(vcsel_period_pclks) as u64;
    ((timeout_mclks as u64 * macro_ns + macro_ns / 2) / 1000) as u32
}

/// Convert a microsecond timeout to MCLKs.
pub const fn timeout_us_to_mclks(timeout_us: u32, vcsel_period_pclks: u8) -> u32 {
    let macro_ns = macro_period_ns(vcsel_period_pclks) as u64;
    if macro_ns == 0 {
        return 0;
    }
    ((timeout_us as u64 * 1000 + macro_ns / 2) / macro_ns) as u32
}

/// Which steps of the ranging sequence are enabled
/// (`SYSTEM_SEQUENCE_CONFIG`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceStepEnables {
    pub tcc: bool,
    pub msrc: bool,
    pub dss: bool,
    pub pre_range: bool,
    pub final_range: bool,
}

impl SequenceStepEnables {
    pub const fn from_config(sequence_config: u8) -> Self {
        Self {
            tcc: (sequence_config >> 4) & 1 == 1,
            dss: (sequence_config >> 3) & 1 == 1,
            msrc: (sequence_config >> 2) & 1 == 1,
            pre_range: (sequence_config >> 6) & 1 == 1,
            final_range: (sequence_config >> 7) & 1 == 1,
        }
    }
}

/// Timeouts read back from the sensor, in both MCLKs and µs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceStepTimeouts {
    pub pre_range_vcsel_period_pclks: u8,
    pub final_range_vcsel_period_pclks: u8,
    pub msrc_dss_tcc_mclks: u32,
    pub pre_range_mclks: u32,
    pub final_range_mclks: u32,
    pub msrc_dss_tcc_us: u32,
    pub pre_range_us: u32,
    pub final_range_us: u32,
}

impl SequenceStepTimeouts {
    /// Assemble from raw register values.
    ///
    /// The final-range register counts the pre-range MCLKs too when the
    /// pre-range step is enabled; they are subtracted here.
    pub fn from_registers(
        enables: SequenceStepEnables,
        pre_range_vcsel_reg: u8,
        final_range_vcsel_reg: u8,
        msrc_timeout_reg: u8,
        pre_range_timeout_reg: u16,
        final_range_timeout_reg: u16,
    ) -> Self {
        let pre_range_vcsel_period_pclks = decode_vcsel_period(pre_range_vcsel_reg);
        let final_range_vcsel_period_pclks = decode_vcsel_period(final_range_vcsel_reg);

        let msrc_dss_tcc_mclks = msrc_timeout_reg as u32 + 1;
        let pre_range_mclks = decode_timeout(pre_range_timeout_reg);
        let mut final_range_mclks = decode_timeout(final_range_timeout_reg);
        if enables.pre_range {
            final_range_mclks = final_range_mclks.saturating_sub(pre_range_mclks);
        }

        Self {
            pre_range_vcsel_period_pclks,
            final_range_vcsel_period_pclks,
            msrc_dss_tcc_mclks,
            pre_range_mclks,
            final_range_mclks,
            msrc_dss_tcc_us: timeout_mclks_to_us(msrc_dss_tcc_mclks, pre_range_vcsel_period_pclks),
            pre_range_us: timeout_mclks_to_us(pre_range_mclks, pre_range_vcsel_period_pclks),
            final_range_us: timeout_mclks_to_us(final_range_mclks, final_range_vcsel_period_pclks),
        }
    }
}

/// Budget consumed by every step except the final range.
fn fixed_overhead_us(enables: SequenceStepEnables, timeouts: &SequenceStepTimeouts) -> u32 {
    let mut budget = START_OVERHEAD_US + END_OVERHEAD_US;

    if enables.tcc {
        budget += timeouts.msrc_dss_tcc_us + TCC_OVERHEAD_US;
    }
    if enables.dss {
        budget += 2 * (timeouts.msrc_dss_tcc_us + DSS_OVERHEAD_US);
    } else if enables.msrc {
        budget += timeouts.msrc_dss_tcc_us + MSRC_OVERHEAD_US;
    }
    if enables.pre_range {
        budget += timeouts.pre_range_us + PRE_RANGE_OVERHEAD_US;
    }
    budget
}

/// Total measurement timing budget (µs) for the given configuration.
pub fn timing_budget_us(enables: SequenceStepEnables, timeouts: &SequenceStepTimeouts) -> u32 {
    let mut budget = fixed_overhead_us(enables, timeouts);
    if enables.final_range {
        budget += timeouts.final_range_us + FINAL_RANGE_OVERHEAD_US;
    }
    budget
}

/// Final-range timeout register value that makes the whole sequence fit
/// `budget_us`.
///
/// `None` if the budget is below [`MIN_TIMING_BUDGET_US`] or smaller than
/// the other steps already need.  `Some(None)` when the final-range step is
/// disabled and there is nothing to write.
pub fn final_range_timeout_for_budget(
    budget_us: u32,
    enables: SequenceStepEnables,
    timeouts: &SequenceStepTimeouts,
) -> Option<Option<u16>> {
    if budget_us < MIN_TIMING_BUDGET_US {
        return None;
    }
    if !enables.final_range {
        return Some(None);
    }

    let used_us = fixed_overhead_us(enables, timeouts) + FINAL_RANGE_OVERHEAD_US;
    if used_us > budget_us {
        return None;
    }

    let final_range_timeout_us = budget_us - used_us;
    let mut final_range_mclks =
        timeout_us_to_mclks(final_range_timeout_us, timeouts.final_range_vcsel_period_pclks);
    if enables.pre_range {
        final_range_mclks += timeouts.pre_range_mclks;
    }
    Some(Some(encode_timeout(final_range_mclks)))
}
