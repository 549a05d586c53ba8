//! Host-side stand-in for a counter peripheral.

use core::cell::Cell;

use crate::timer::{CounterDir, Error, Instance, Peripheral, Result};

/// Simulated counter instance for driving [`crate::TimerHandle`] off-target.
///
/// The counter moves on demand through [`MockTim::advance`] and, while
/// running, by `auto_step` ticks ahead of every [`Instance::count`] read.
/// The automatic stepping models time passing between polls, which is what
/// lets the blocking delays terminate under test; set it to zero for tests
/// that want full manual control.
#[derive(Debug)]
pub struct MockTim {
    periph: Peripheral,
    clock_hz: u32,
    dir: CounterDir,
    period: u32,
    prescaler: u16,
    count: Cell<u32>,
    reads: Cell<u32>,
    running: bool,
    powered: bool,
    auto_step: u32,
    fail_power_up: bool,
    deny_down: bool,
}

impl MockTim {
    /// A powered-down instance backing `periph`: 1 MHz input clock, counting
    /// up, auto-step 1.
    pub fn new(periph: Peripheral) -> Self {
        MockTim {
            periph,
            clock_hz: 1_000_000,
            dir: CounterDir::Up,
            period: periph.width().max_period(),
            prescaler: 0,
            count: Cell::new(0),
            reads: Cell::new(0),
            running: false,
            powered: false,
            auto_step: 1,
            fail_power_up: false,
            deny_down: false,
        }
    }

    /// Overrides the simulated input clock.
    pub fn with_clock_hz(mut self, hz: u32) -> Self {
        self.clock_hz = hz;
        self
    }

    /// Overrides how far the counter moves ahead of each read while running.
    pub fn with_auto_step(mut self, ticks: u32) -> Self {
        self.auto_step = ticks;
        self
    }

    /// Makes [`Instance::power_up`] fail, as if the instance were already
    /// spoken for.
    pub fn failing_power_up(mut self) -> Self {
        self.fail_power_up = true;
        self
    }

    /// Rejects down-counting configurations.
    pub fn up_only(mut self) -> Self {
        self.deny_down = true;
        self
    }

    /// Moves the counter by `ticks` in the configured direction, wrapping at
    /// the period. Works whether or not the counter is running, so tests can
    /// drive time explicitly.
    pub fn advance(&self, ticks: u32) {
        self.step(ticks);
    }

    /// Current counter value without the auto-step side effect of a read.
    pub fn peek(&self) -> u32 {
        self.count.get()
    }

    /// Number of [`Instance::count`] reads performed so far.
    pub fn reads(&self) -> u32 {
        self.reads.get()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn prescaler(&self) -> u16 {
        self.prescaler
    }

    pub fn dir(&self) -> CounterDir {
        self.dir
    }

    fn step(&self, ticks: u32) {
        let span = u64::from(self.period) + 1;
        let n = u64::from(ticks) % span;
        let cur = u64::from(self.count.get());
        let next = match self.dir {
            CounterDir::Up => (cur + n) % span,
            CounterDir::Down => (cur + span - n) % span,
        };
        self.count.set(next as u32);
    }
}

impl Instance for MockTim {
    fn peripheral(&self) -> Peripheral {
        self.periph
    }

    fn input_clock_hz(&self) -> u32 {
        self.clock_hz
    }

    fn power_up(&mut self) -> Result<()> {
        if self.fail_power_up {
            return Err(Error::Unavailable);
        }
        self.powered = true;
        Ok(())
    }

    fn set_direction(&mut self, dir: CounterDir) -> Result<()> {
        if self.deny_down && dir == CounterDir::Down {
            return Err(Error::Unsupported);
        }
        self.dir = dir;
        Ok(())
    }

    fn set_period(&mut self, ticks: u32) {
        self.period = ticks;
    }

    fn set_prescaler(&mut self, div: u16) {
        self.prescaler = div;
    }

    fn reload(&mut self) {
        self.count.set(match self.dir {
            CounterDir::Up => 0,
            CounterDir::Down => self.period,
        });
    }

    fn set_running(&mut self, run: bool) {
        self.running = run;
    }

    fn count(&self) -> u32 {
        self.reads.set(self.reads.get().wrapping_add(1));
        if self.running && self.auto_step > 0 {
            self.step(self.auto_step);
        }
        self.count.get()
    }
}
