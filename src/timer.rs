//! Hardware timer peripheral support.
//!
//! Covers the general-purpose TIM peripherals TIM2-TIM5. A [`TimerHandle`]
//! binds exactly one instance, exposes its live tick count plus
//! millisecond/microsecond scalings of it, and provides blocking delays
//! expressed in ticks or time units.
//!
//! The raw tick count wraps at the configured period. To avoid wrapping
//! errors when measuring, take tick deltas with [`TimerHandle::ticks_since`]
//! and convert to a time base afterwards using [`TimerHandle::freq_hz`].

use core::fmt;

/// Hardware timer instance to configure and use.
///
/// The counter width is a property of the silicon, not of the configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peripheral {
    /// 32-bit counter.
    Tim2 = 0,
    /// 16-bit counter.
    Tim3,
    /// 16-bit counter.
    Tim4,
    /// 32-bit counter.
    Tim5,
}

impl Peripheral {
    /// Width of this instance's counter register.
    pub const fn width(self) -> CounterWidth {
        match self {
            Peripheral::Tim2 | Peripheral::Tim5 => CounterWidth::Bits32,
            Peripheral::Tim3 | Peripheral::Tim4 => CounterWidth::Bits16,
        }
    }
}

/// Direction of the auto-reload counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CounterDir {
    Up,
    Down,
}

/// Counter register width, fixed per peripheral instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CounterWidth {
    Bits16,
    Bits32,
}

impl CounterWidth {
    /// Largest period (auto-reload value) the counter can hold.
    pub const fn max_period(self) -> u32 {
        match self {
            CounterWidth::Bits16 => 0xFFFF,
            CounterWidth::Bits32 => 0xFFFF_FFFF,
        }
    }
}

/// Timer configuration, supplied once at [`TimerHandle::init`] and read back
/// unchanged through [`TimerHandle::config`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub periph: Peripheral,
    pub dir: CounterDir,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            periph: Peripheral::Tim2,
            dir: CounterDir::Up,
        }
    }
}

/// Errors reported by timer operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The handle has no bound peripheral; call [`TimerHandle::init`] first.
    NotInitialized,
    /// A parameter is outside the legal range for the bound instance.
    InvalidParameter,
    /// The bound instance cannot provide the requested configuration.
    Unsupported,
    /// The peripheral cannot be bound, for example because it is already
    /// claimed by another handle.
    Unavailable,
    /// No countdown is in progress.
    NotStarted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotInitialized => f.write_str("timer not initialized"),
            Error::InvalidParameter => f.write_str("parameter out of range"),
            Error::Unsupported => f.write_str("configuration not supported by this instance"),
            Error::Unavailable => f.write_str("peripheral unavailable"),
            Error::NotStarted => f.write_str("no countdown in progress"),
        }
    }
}

/// Result type for timer operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Lifecycle of a [`TimerHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, ufmt::derive::uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Uninitialized,
    Stopped,
    Running,
}

/// Register-level access to one counter peripheral.
///
/// [`TimerHandle`] holds a backing implementation of this trait instead of
/// poking registers itself. [`crate::mmio::Tim`] binds the on-chip instances;
/// [`crate::mock::MockTim`] stands in on the host. Implementations for other
/// hardware families plug in the same way.
pub trait Instance {
    /// Identity of the backing hardware instance.
    fn peripheral(&self) -> Peripheral;

    /// Tick source frequency ahead of the prescaler, in Hz.
    fn input_clock_hz(&self) -> u32;

    /// One-time enablement the instance requires: clock gating and reset.
    fn power_up(&mut self) -> Result<()>;

    /// Counting direction. Errs when the instance cannot count that way.
    fn set_direction(&mut self, dir: CounterDir) -> Result<()>;

    /// Auto-reload value at which the counter wraps.
    fn set_period(&mut self, ticks: u32);

    /// Clock divisor ahead of the counter; the hardware divides by `div + 1`.
    fn set_prescaler(&mut self, div: u16);

    /// Latch period and prescaler and force the counter to its reload point
    /// (zero when counting up, the period when counting down).
    fn reload(&mut self);

    /// Gate counting on or off without touching the counter value.
    fn set_running(&mut self, run: bool);

    /// Live counter register value.
    fn count(&self) -> u32;
}

/// In-flight countdown bookkeeping for the `embedded-hal` adapter.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Countdown {
    pub(crate) base: u32,
    pub(crate) left: u64,
}

/// Owns the binding to one counter peripheral and derives tick, elapsed-time
/// and delay operations from it.
///
/// A freshly constructed handle is uninitialized: mutating operations return
/// [`Error::NotInitialized`] and the read operations report best-effort
/// values (zero) until [`TimerHandle::init`] succeeds.
pub struct TimerHandle<T> {
    core: Option<T>,
    config: Config,
    period: u32,
    prescaler: u16,
    running: bool,
    pub(crate) countdown: Option<Countdown>,
}

impl<T> TimerHandle<T> {
    /// Creates an unbound handle.
    pub fn new() -> Self {
        TimerHandle {
            core: None,
            config: Config::default(),
            period: 0,
            prescaler: 0,
            running: false,
            countdown: None,
        }
    }

    /// Current point in the `Uninitialized -> Stopped <-> Running` lifecycle.
    pub fn state(&self) -> State {
        if self.core.is_none() {
            State::Uninitialized
        } else if self.running {
            State::Running
        } else {
            State::Stopped
        }
    }

    /// Whether the counter is currently gated on.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), State::Running)
    }

    /// The stored configuration, unchanged since [`TimerHandle::init`].
    /// Before a successful `init` this is the default configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Currently configured auto-reload value.
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Currently configured prescaler divisor.
    pub fn prescaler(&self) -> u32 {
        u32::from(self.prescaler)
    }
}

impl<T> Default for TimerHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Instance> TimerHandle<T> {
    /// Binds `instance` according to `config` and brings it to the
    /// `Stopped` state with the width-appropriate default period (0xFFFF for
    /// the 16-bit instances, 0xFFFFFFFF for the 32-bit ones) and prescaler 0.
    ///
    /// `config.periph` must name the peripheral `instance` actually backs.
    /// That check fails before anything is touched; once it passes, any
    /// previously bound instance is stopped and released, so a failure in a
    /// later step leaves the handle uninitialized rather than half-bound.
    pub fn init(&mut self, instance: T, config: Config) -> Result<()> {
        if instance.peripheral() != config.periph {
            return Err(Error::InvalidParameter);
        }

        if let Some(mut old) = self.core.take() {
            old.set_running(false);
        }
        self.running = false;
        self.countdown = None;

        let mut core = instance;
        core.power_up()?;
        core.set_direction(config.dir)?;

        let period = config.periph.width().max_period();
        core.set_period(period);
        core.set_prescaler(0);
        core.reload();

        self.core = Some(core);
        self.config = config;
        self.period = period;
        self.prescaler = 0;
        Ok(())
    }

    /// Sets the number of ticks it takes before the counter wraps back
    /// around. Legal range is bounded by the instance's counter width; an
    /// out-of-range request errs and leaves the previous period in place.
    /// Can be changed on the fly and never resets the running tick count.
    pub fn set_period(&mut self, ticks: u32) -> Result<()> {
        let core = self.core.as_mut().ok_or(Error::NotInitialized)?;
        if ticks > self.config.periph.width().max_period() {
            return Err(Error::InvalidParameter);
        }
        core.set_period(ticks);
        self.period = ticks;
        Ok(())
    }

    /// Sets the prescaler applied to the instance's input clock. Any value
    /// up to 0xFFFF; the tick rate becomes `input_clock / (div + 1)`. Can be
    /// changed on the fly.
    pub fn set_prescaler(&mut self, div: u32) -> Result<()> {
        let core = self.core.as_mut().ok_or(Error::NotInitialized)?;
        if div > u32::from(crate::config::MAX_PRESCALER) {
            return Err(Error::InvalidParameter);
        }
        core.set_prescaler(div as u16);
        self.prescaler = div as u16;
        Ok(())
    }

    /// Enables counting. Safe to call when already running.
    pub fn start(&mut self) -> Result<()> {
        let core = self.core.as_mut().ok_or(Error::NotInitialized)?;
        if !self.running {
            core.set_running(true);
            self.running = true;
        }
        Ok(())
    }

    /// Disables counting, freezing the counter at its current value. A later
    /// [`TimerHandle::start`] resumes from that value, not from zero.
    pub fn stop(&mut self) -> Result<()> {
        let core = self.core.as_mut().ok_or(Error::NotInitialized)?;
        if self.running {
            core.set_running(false);
            self.running = false;
        }
        Ok(())
    }

    /// Frequency of each tick in Hz: `input_clock / (prescaler + 1)`.
    /// Zero while uninitialized.
    pub fn freq_hz(&self) -> u32 {
        match self.core.as_ref() {
            Some(core) => core.input_clock_hz() / (u32::from(self.prescaler) + 1),
            None => 0,
        }
    }

    /// Current counter value. Advances according to the configured direction
    /// and wraps at the configured period. Zero while uninitialized.
    #[inline]
    pub fn tick(&self) -> u32 {
        match self.core.as_ref() {
            Some(core) => core.count(),
            None => 0,
        }
    }

    /// The tick register value scaled to milliseconds.
    ///
    /// This scales the raw counter value, not a wrap-aware elapsed time: make
    /// sure the configured period covers the longest measurement wanted, or
    /// measure via [`TimerHandle::ticks_since`] instead. Saturates at
    /// `u32::MAX`.
    pub fn millis(&self) -> u32 {
        scale_ticks(self.tick(), self.freq_hz(), 1_000)
    }

    /// The tick register value scaled to microseconds.
    ///
    /// Same wrapping caveat as [`TimerHandle::millis`].
    pub fn micros(&self) -> u32 {
        scale_ticks(self.tick(), self.freq_hz(), 1_000_000)
    }

    /// Ticks elapsed since `baseline` (a previously read [`TimerHandle::tick`]
    /// value), accounting for at most one wrap in the configured direction.
    /// The result is only meaningful if no more than one wrap occurred since
    /// the baseline was taken.
    pub fn ticks_since(&self, baseline: u32) -> u32 {
        match self.core.as_ref() {
            Some(core) => ticks_between(self.config.dir, self.period, baseline, core.count()),
            None => 0,
        }
    }

    /// Stays within this function for `del` ticks.
    ///
    /// The wait accumulates tick deltas across successive counter readings,
    /// so it also works for targets longer than one period as long as the
    /// spin loop polls faster than the counter wraps. The counter must be
    /// running for the wait to make progress. Returns immediately on an
    /// uninitialized handle.
    pub fn delay_ticks(&self, del: u32) {
        self.spin(u64::from(del));
    }

    /// Stays within this function for `del` milliseconds, converted to ticks
    /// at the current frequency (rounded up, so the wait is never short).
    pub fn delay_ms(&self, del: u32) {
        self.spin(ticks_for(del, self.freq_hz(), 1_000));
    }

    /// Stays within this function for `del` microseconds, converted to ticks
    /// at the current frequency (rounded up, so the wait is never short).
    pub fn delay_us(&self, del: u32) {
        self.spin(ticks_for(del, self.freq_hz(), 1_000_000));
    }

    /// Borrows the backing instance.
    pub fn instance(&self) -> Option<&T> {
        self.core.as_ref()
    }

    /// Mutably borrows the backing instance.
    pub fn instance_mut(&mut self) -> Option<&mut T> {
        self.core.as_mut()
    }

    /// Stops the counter and returns the backing instance, leaving the
    /// handle uninitialized.
    pub fn release(&mut self) -> Option<T> {
        let mut core = self.core.take()?;
        core.set_running(false);
        self.running = false;
        self.countdown = None;
        Some(core)
    }

    fn spin(&self, total: u64) {
        let core = match self.core.as_ref() {
            Some(core) => core,
            None => return,
        };
        if total == 0 {
            return;
        }
        let mut base = core.count();
        let mut left = total;
        loop {
            let now = core.count();
            let step = u64::from(ticks_between(self.config.dir, self.period, base, now));
            if step >= left {
                return;
            }
            left -= step;
            base = now;
        }
    }
}

/// Tick delta from `from` to `to`, accounting for at most one wrap at
/// `period` in direction `dir`. Inputs beyond the period give a wrapped,
/// meaningless result rather than a panic.
pub(crate) fn ticks_between(dir: CounterDir, period: u32, from: u32, to: u32) -> u32 {
    match dir {
        CounterDir::Up => {
            if to >= from {
                to - from
            } else {
                period.wrapping_sub(from).wrapping_add(to).wrapping_add(1)
            }
        }
        CounterDir::Down => {
            if to <= from {
                from - to
            } else {
                period.wrapping_sub(to).wrapping_add(from).wrapping_add(1)
            }
        }
    }
}

fn scale_ticks(ticks: u32, freq: u32, units_per_sec: u32) -> u32 {
    if freq == 0 {
        return 0;
    }
    let scaled = u64::from(ticks) * u64::from(units_per_sec) / u64::from(freq);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

fn ticks_for(amount: u32, freq: u32, units_per_sec: u32) -> u64 {
    (u64::from(amount) * u64::from(freq)).div_ceil(u64::from(units_per_sec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTim;

    fn inited(periph: Peripheral, dir: CounterDir, mock: MockTim) -> TimerHandle<MockTim> {
        let mut tim = TimerHandle::new();
        tim.init(mock, Config { periph, dir }).unwrap();
        tim
    }

    #[test]
    fn fresh_handle_is_uninitialized() {
        let tim: TimerHandle<MockTim> = TimerHandle::new();
        assert_eq!(tim.state(), State::Uninitialized);
        assert_eq!(*tim.config(), Config::default());
        assert_eq!(tim.freq_hz(), 0);
        assert_eq!(tim.tick(), 0);
        assert_eq!(tim.millis(), 0);
        assert_eq!(tim.micros(), 0);
        assert_eq!(tim.ticks_since(123), 0);
    }

    #[test]
    fn operations_require_init() {
        let mut tim: TimerHandle<MockTim> = TimerHandle::new();
        assert_eq!(tim.start(), Err(Error::NotInitialized));
        assert_eq!(tim.stop(), Err(Error::NotInitialized));
        assert_eq!(tim.set_period(100), Err(Error::NotInitialized));
        assert_eq!(tim.set_prescaler(100), Err(Error::NotInitialized));
        assert_eq!(tim.state(), State::Uninitialized);
        // Delays degrade to an immediate return instead of spinning on a
        // counter that does not exist.
        tim.delay_ticks(1_000_000);
        tim.delay_ms(1_000_000);
    }

    #[test]
    fn init_applies_width_defaults() {
        let tim = inited(Peripheral::Tim3, CounterDir::Up, MockTim::new(Peripheral::Tim3));
        assert_eq!(tim.state(), State::Stopped);
        assert_eq!(tim.period(), 0xFFFF);
        assert_eq!(tim.prescaler(), 0);
        assert_eq!(tim.config().periph, Peripheral::Tim3);
        assert_eq!(tim.config().dir, CounterDir::Up);

        let tim = inited(Peripheral::Tim5, CounterDir::Up, MockTim::new(Peripheral::Tim5));
        assert_eq!(tim.period(), 0xFFFF_FFFF);
    }

    #[test]
    fn init_rejects_mismatched_peripheral() {
        let mut tim = TimerHandle::new();
        let err = tim.init(
            MockTim::new(Peripheral::Tim3),
            Config {
                periph: Peripheral::Tim2,
                dir: CounterDir::Up,
            },
        );
        assert_eq!(err, Err(Error::InvalidParameter));
        assert_eq!(tim.state(), State::Uninitialized);
    }

    #[test]
    fn init_rejects_unavailable_instance() {
        let mut tim = TimerHandle::new();
        let err = tim.init(
            MockTim::new(Peripheral::Tim2).failing_power_up(),
            Config::default(),
        );
        assert_eq!(err, Err(Error::Unavailable));
        assert_eq!(tim.state(), State::Uninitialized);
        assert_eq!(tim.start(), Err(Error::NotInitialized));
    }

    #[test]
    fn init_rejects_unsupported_direction() {
        let mut tim = TimerHandle::new();
        let err = tim.init(
            MockTim::new(Peripheral::Tim4).up_only(),
            Config {
                periph: Peripheral::Tim4,
                dir: CounterDir::Down,
            },
        );
        assert_eq!(err, Err(Error::Unsupported));
        assert_eq!(tim.state(), State::Uninitialized);
    }

    #[test]
    fn reinit_rebinds_cleanly() {
        let mut tim = inited(Peripheral::Tim2, CounterDir::Up, MockTim::new(Peripheral::Tim2));
        tim.start().unwrap();
        tim.set_prescaler(9).unwrap();

        tim.init(
            MockTim::new(Peripheral::Tim3),
            Config {
                periph: Peripheral::Tim3,
                dir: CounterDir::Up,
            },
        )
        .unwrap();
        assert_eq!(tim.state(), State::Stopped);
        assert_eq!(tim.config().periph, Peripheral::Tim3);
        assert_eq!(tim.period(), 0xFFFF);
        assert_eq!(tim.prescaler(), 0);
    }

    #[test]
    fn freq_follows_prescaler() {
        let mut tim = inited(
            Peripheral::Tim2,
            CounterDir::Up,
            MockTim::new(Peripheral::Tim2).with_clock_hz(8_000_000),
        );
        assert_eq!(tim.freq_hz(), 8_000_000);

        tim.set_prescaler(7).unwrap();
        assert_eq!(tim.freq_hz(), 1_000_000);
        assert_eq!(tim.freq_hz(), 1_000_000);

        tim.set_prescaler(0xFFFF).unwrap();
        assert_eq!(tim.freq_hz(), 8_000_000 / 0x1_0000);

        assert_eq!(tim.set_prescaler(0x1_0000), Err(Error::InvalidParameter));
        assert_eq!(tim.freq_hz(), 8_000_000 / 0x1_0000);
        assert_eq!(tim.prescaler(), 0xFFFF);
    }

    #[test]
    fn period_is_bounded_by_counter_width() {
        let mut tim = inited(Peripheral::Tim4, CounterDir::Up, MockTim::new(Peripheral::Tim4));
        tim.set_period(0).unwrap();
        tim.set_period(0xFFFF).unwrap();
        assert_eq!(tim.set_period(0x1_0000), Err(Error::InvalidParameter));
        assert_eq!(tim.period(), 0xFFFF);

        let mut tim = inited(Peripheral::Tim2, CounterDir::Up, MockTim::new(Peripheral::Tim2));
        tim.set_period(0xFFFF_FFFF).unwrap();
        assert_eq!(tim.period(), 0xFFFF_FFFF);
    }

    #[test]
    fn set_period_keeps_the_running_count() {
        let mut tim = inited(
            Peripheral::Tim2,
            CounterDir::Up,
            MockTim::new(Peripheral::Tim2).with_auto_step(0),
        );
        tim.start().unwrap();
        tim.instance().unwrap().advance(100);
        assert_eq!(tim.tick(), 100);

        tim.set_period(200_000).unwrap();
        assert_eq!(tim.tick(), 100);
    }

    #[test]
    fn start_is_noop_safe_and_stop_freezes() {
        let mut tim = inited(Peripheral::Tim2, CounterDir::Up, MockTim::new(Peripheral::Tim2));
        assert!(!tim.is_running());
        tim.start().unwrap();
        assert_eq!(tim.state(), State::Running);
        assert!(tim.is_running());
        tim.start().unwrap();
        assert_eq!(tim.state(), State::Running);

        // Auto-step 1: every read advances the counter while running.
        let v = tim.tick();
        assert!(tim.tick() > v);

        tim.stop().unwrap();
        assert_eq!(tim.state(), State::Stopped);
        let frozen = tim.tick();
        assert_eq!(tim.tick(), frozen);
        assert_eq!(tim.tick(), frozen);

        tim.stop().unwrap();
        assert_eq!(tim.state(), State::Stopped);

        tim.start().unwrap();
        let resumed = tim.tick();
        assert!(resumed >= frozen);
        assert!(resumed <= frozen + 2);
    }

    #[test]
    fn tick_wraps_at_the_period_counting_up() {
        let mut tim = inited(
            Peripheral::Tim2,
            CounterDir::Up,
            MockTim::new(Peripheral::Tim2).with_auto_step(0),
        );
        tim.set_period(9).unwrap();
        tim.start().unwrap();

        tim.instance().unwrap().advance(7);
        assert_eq!(tim.tick(), 7);
        assert_eq!(tim.ticks_since(0), 7);

        tim.instance().unwrap().advance(5);
        assert_eq!(tim.tick(), 2);
        assert_eq!(tim.ticks_since(7), 5);
    }

    #[test]
    fn tick_counts_down_from_the_period() {
        let mut tim = inited(
            Peripheral::Tim3,
            CounterDir::Down,
            MockTim::new(Peripheral::Tim3).with_auto_step(0),
        );
        assert_eq!(tim.tick(), 0xFFFF);
        tim.start().unwrap();

        tim.instance().unwrap().advance(2);
        assert_eq!(tim.tick(), 0xFFFD);
        assert_eq!(tim.ticks_since(0xFFFF), 2);

        // Across the wrap: 1 -> 0 -> 0xFFFF -> 0xFFFE is three ticks.
        tim.instance().unwrap().advance(0xFFFD - 1);
        assert_eq!(tim.tick(), 1);
        tim.instance().unwrap().advance(3);
        assert_eq!(tim.tick(), 0xFFFE);
        assert_eq!(tim.ticks_since(1), 3);
    }

    #[test]
    fn delay_ticks_blocks_until_the_delta_elapses() {
        let mut tim = inited(
            Peripheral::Tim2,
            CounterDir::Up,
            MockTim::new(Peripheral::Tim2).with_auto_step(3),
        );
        tim.start().unwrap();

        let base = tim.instance().unwrap().peek();
        tim.delay_ticks(10);
        let elapsed = tim.instance().unwrap().peek() - base;
        assert!(elapsed >= 10, "elapsed {elapsed}");
        assert!(elapsed <= 10 + 2 * 3, "elapsed {elapsed}");
    }

    #[test]
    fn delay_spans_multiple_wraps() {
        let mut tim = inited(
            Peripheral::Tim4,
            CounterDir::Up,
            MockTim::new(Peripheral::Tim4).with_auto_step(7),
        );
        tim.set_period(99).unwrap();
        tim.start().unwrap();

        let reads = tim.instance().unwrap().reads();
        tim.delay_ticks(500);
        let polled = tim.instance().unwrap().reads() - reads;
        // 500 ticks at 7 ticks per poll needs at least 72 counter readings.
        assert!(polled >= 72, "polled {polled}");
    }

    #[test]
    fn delay_ms_converts_at_the_current_tick_rate() {
        let mut tim = inited(
            Peripheral::Tim2,
            CounterDir::Up,
            MockTim::new(Peripheral::Tim2).with_clock_hz(1_000),
        );
        tim.start().unwrap();

        let base = tim.instance().unwrap().peek();
        tim.delay_ms(5);
        let elapsed = tim.instance().unwrap().peek() - base;
        assert!(elapsed >= 5, "elapsed {elapsed}");

        // Fractional tick counts round up so the wait is never short:
        // 1 ms at 1500 Hz is 1.5 ticks, so at least 2 must elapse.
        let mut tim = inited(
            Peripheral::Tim2,
            CounterDir::Up,
            MockTim::new(Peripheral::Tim2).with_clock_hz(1_500),
        );
        tim.start().unwrap();
        let base = tim.instance().unwrap().peek();
        tim.delay_ms(1);
        let elapsed = tim.instance().unwrap().peek() - base;
        assert!(elapsed >= 2, "elapsed {elapsed}");
    }

    #[test]
    fn one_millisecond_is_a_thousand_ticks_at_one_megahertz() {
        // 16-bit instance, default period 0xFFFF, prescaler chosen for a
        // 1 MHz tick rate out of an 8 MHz input clock.
        let mut tim = inited(
            Peripheral::Tim3,
            CounterDir::Up,
            MockTim::new(Peripheral::Tim3)
                .with_clock_hz(8_000_000)
                .with_auto_step(5),
        );
        tim.set_prescaler(7).unwrap();
        assert_eq!(tim.freq_hz(), 1_000_000);
        tim.start().unwrap();

        let base = tim.instance().unwrap().peek();
        tim.delay_us(1_000);
        let elapsed = tim.ticks_since(base);
        assert!(elapsed >= 1_000, "elapsed {elapsed}");
        assert!(elapsed <= 1_000 + 3 * 5, "elapsed {elapsed}");
    }

    #[test]
    fn millis_and_micros_scale_the_tick_value() {
        let mut tim = inited(
            Peripheral::Tim2,
            CounterDir::Up,
            MockTim::new(Peripheral::Tim2)
                .with_clock_hz(1_000_000)
                .with_auto_step(0),
        );
        tim.start().unwrap();
        tim.instance().unwrap().advance(1_500);
        assert_eq!(tim.micros(), 1_500);
        assert_eq!(tim.millis(), 1);

        tim.instance().unwrap().advance(2_000_000 - 1_500);
        assert_eq!(tim.micros(), 2_000_000);
        assert_eq!(tim.millis(), 2_000);
    }

    #[test]
    fn scaled_getters_saturate_instead_of_wrapping() {
        let mut tim = inited(
            Peripheral::Tim2,
            CounterDir::Up,
            MockTim::new(Peripheral::Tim2)
                .with_clock_hz(1)
                .with_auto_step(0),
        );
        tim.start().unwrap();
        tim.instance().unwrap().advance(5_000_000);
        // 5e6 seconds worth of ticks at 1 Hz: 5e12 us and 5e9 ms both exceed
        // u32, so the getters clamp.
        assert_eq!(tim.micros(), u32::MAX);
        assert_eq!(tim.millis(), u32::MAX);
    }

    #[test]
    fn release_returns_the_instance_and_unbinds() {
        let mut tim = inited(Peripheral::Tim5, CounterDir::Up, MockTim::new(Peripheral::Tim5));
        tim.start().unwrap();

        let mock = tim.release().expect("instance back");
        assert!(!mock.is_running());
        assert_eq!(tim.state(), State::Uninitialized);
        assert_eq!(tim.tick(), 0);
        assert!(tim.release().is_none());

        // The returned instance can be bound again.
        tim.init(
            mock,
            Config {
                periph: Peripheral::Tim5,
                dir: CounterDir::Up,
            },
        )
        .unwrap();
        assert_eq!(tim.state(), State::Stopped);
    }

    #[test]
    fn errors_render_a_reason() {
        assert_eq!(Error::NotInitialized.to_string(), "timer not initialized");
        assert_eq!(Error::InvalidParameter.to_string(), "parameter out of range");
        assert_eq!(Error::Unavailable.to_string(), "peripheral unavailable");
    }

    #[test]
    fn ticks_between_is_direction_aware() {
        use CounterDir::{Down, Up};

        assert_eq!(ticks_between(Up, 0xFFFF, 10, 14), 4);
        assert_eq!(ticks_between(Up, 0xFFFF, 0xFFFE, 1), 3);
        assert_eq!(ticks_between(Up, 9, 7, 2), 5);
        assert_eq!(ticks_between(Up, 0xFFFF_FFFF, 0xFFFF_FFFF, 0), 1);

        assert_eq!(ticks_between(Down, 0xFFFF, 14, 10), 4);
        assert_eq!(ticks_between(Down, 0xFFFF, 1, 0xFFFE), 3);
        assert_eq!(ticks_between(Down, 9, 2, 7), 5);
        assert_eq!(ticks_between(Down, 0xFFFF_FFFF, 0, 0xFFFF_FFFF), 1);
    }
}
