//! Fake hardware for integration tests.
//!
//! `FakeVl53l0xBus` is a flat 256-byte register file behind the
//! `embedded-hal` I²C trait.  A handful of registers are pinned to the
//! values a healthy sensor reports so the real driver can run its whole
//! bring-up against it.  The bus is a cheap clone over shared state, so a
//! test keeps a handle after moving one into the driver.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};

use tofstream::app::ports::{ConsolePort, TimePort};
use tofstream::error::{Error, Result};

pub const MODEL_ID_REG: u8 = 0xC0;
pub const SPAD_READY_REG: u8 = 0x83;
pub const SPAD_INFO_REG: u8 = 0x92;
pub const INTERRUPT_STATUS_REG: u8 = 0x13;
pub const RANGE_MM_REG: u8 = 0x1E;
pub const SYSRANGE_START_REG: u8 = 0x00;

// ── Fake bus ──────────────────────────────────────────────────

#[derive(Default)]
struct BusState {
    regs: Vec<u8>,
    /// Registers whose reads ignore what was written.
    forced: HashMap<u8, u8>,
    /// Range values handed out one per range read.
    ranges: VecDeque<u16>,
    writes: Vec<(u8, Vec<u8>)>,
    range_reads: usize,
    nack: bool,
}

#[derive(Clone)]
pub struct FakeVl53l0xBus {
    address: SevenBitAddress,
    state: Rc<RefCell<BusState>>,
}

#[allow(dead_code)]
impl FakeVl53l0xBus {
    /// A sensor that identifies correctly and always has a sample ready.
    pub fn healthy() -> Self {
        let bus = Self {
            address: 0x29,
            state: Rc::new(RefCell::new(BusState {
                regs: vec![0; 256],
                ..Default::default()
            })),
        };
        bus.force(MODEL_ID_REG, 0xEE);
        bus.force(SPAD_READY_REG, 0x01);
        bus.force(SPAD_INFO_REG, 0x85); // 5 aperture SPADs
        bus.force(INTERRUPT_STATUS_REG, 0x07);
        bus.set_range(8190);
        bus
    }

    pub fn force(&self, reg: u8, value: u8) {
        self.state.borrow_mut().forced.insert(reg, value);
    }

    /// Range reported by every read until ranges are scripted.
    pub fn set_range(&self, mm: u16) {
        let [hi, lo] = mm.to_be_bytes();
        self.force(RANGE_MM_REG, hi);
        self.force(RANGE_MM_REG + 1, lo);
    }

    pub fn script_ranges(&self, mm: impl IntoIterator<Item = u16>) {
        self.state.borrow_mut().ranges.extend(mm);
    }

    /// Make every transfer fail with an address NACK.
    pub fn unplug(&self) {
        self.state.borrow_mut().nack = true;
    }

    pub fn reg(&self, reg: u8) -> u8 {
        self.state.borrow().regs[reg as usize]
    }

    /// Every single-byte write of `value` to `reg`.
    pub fn count_writes(&self, reg: u8, value: u8) -> usize {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|(r, data)| *r == reg && data.as_slice() == [value])
            .count()
    }

    pub fn range_reads(&self) -> usize {
        self.state.borrow().range_reads
    }
}

impl ErrorType for FakeVl53l0xBus {
    type Error = ErrorKind;
}

impl I2c for FakeVl53l0xBus {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> core::result::Result<(), Self::Error> {
        let mut st = self.state.borrow_mut();
        if st.nack || address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        let mut pointer = 0u8;
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    let Some((&reg, data)) = bytes.split_first() else {
                        continue;
                    };
                    pointer = reg;
                    st.writes.push((reg, data.to_vec()));
                    for (i, &b) in data.iter().enumerate() {
                        let r = reg.wrapping_add(i as u8) as usize;
                        st.regs[r] = b;
                    }
                }
                Operation::Read(buf) => {
                    if pointer == RANGE_MM_REG {
                        st.range_reads += 1;
                        if let Some(mm) = st.ranges.pop_front() {
                            let [hi, lo] = mm.to_be_bytes();
                            st.regs[RANGE_MM_REG as usize] = hi;
                            st.regs[RANGE_MM_REG as usize + 1] = lo;
                            st.forced.remove(&RANGE_MM_REG);
                            st.forced.remove(&(RANGE_MM_REG + 1));
                        }
                    }
                    for (i, slot) in buf.iter_mut().enumerate() {
                        let r = pointer.wrapping_add(i as u8);
                        *slot = st.forced.get(&r).copied().unwrap_or(st.regs[r as usize]);
                    }
                }
            }
        }
        Ok(())
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Returns immediately; counts the requested milliseconds.
#[derive(Clone, Default)]
pub struct NoopDelay {
    pub elapsed_ms: Rc<Cell<u64>>,
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ms.set(self.elapsed_ms.get() + u64::from(ns) / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms.set(self.elapsed_ms.get() + u64::from(ms));
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Reports `start`, then advances by `step` on every query.
pub struct StepClock {
    now: Cell<u64>,
    step: u64,
}

impl StepClock {
    pub fn new(start_ms: u64, step_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
            step: step_ms,
        }
    }
}

impl TimePort for StepClock {
    fn uptime_ms(&self) -> u64 {
        let t = self.now.get();
        self.now.set(t + self.step);
        t
    }
}

// ── Console ───────────────────────────────────────────────────

/// Captures everything written; can be told to fail after `n` writes.
#[derive(Default)]
pub struct RecordingConsole {
    pub text: String,
    pub writes: usize,
    pub fail_after: Option<usize>,
}

impl RecordingConsole {
    pub fn lines(&self) -> Vec<&str> {
        self.text.lines().collect()
    }
}

impl ConsolePort for RecordingConsole {
    fn write_str(&mut self, text: &str) -> Result<()> {
        if self.fail_after.is_some_and(|n| self.writes >= n) {
            return Err(Error::Console);
        }
        self.writes += 1;
        self.text.push_str(text);
        Ok(())
    }
}
