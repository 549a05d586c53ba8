//! `embedded-hal` 0.2 trait adapters.
//!
//! Implements the blocking delay traits and the `CountDown`/`Cancel` timer
//! traits on top of [`TimerHandle`], so the handle slots into driver crates
//! that take `embedded-hal` bounds. Countdown durations are raw ticks via
//! [`Ticks`]; pick the tick rate with the prescaler first. A countdown only
//! makes progress while the counter runs.
//!
//! The handle's own `start` gates the counter on; the `CountDown` flavor
//! arms a duration. On a concrete handle the inherent name wins, so call the
//! trait method as `CountDown::start(&mut tim, ...)`.

use embedded_hal::blocking::delay::{DelayMs, DelayUs};
use embedded_hal::timer::{Cancel, CountDown};
use void::Void;

use crate::timer::{ticks_between, Countdown, Error, Instance, Result, TimerHandle};

/// Countdown duration in timer ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ticks(pub u32);

impl From<u32> for Ticks {
    fn from(ticks: u32) -> Self {
        Ticks(ticks)
    }
}

impl ufmt::uDebug for Ticks {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> core::result::Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.debug_tuple("Ticks")?.field(&self.0)?.finish()
    }
}

impl<T: Instance> CountDown for TimerHandle<T> {
    type Time = Ticks;

    fn start<D>(&mut self, count: D)
    where
        D: Into<Ticks>,
    {
        self.countdown = Some(Countdown {
            base: self.tick(),
            left: u64::from(count.into().0),
        });
    }

    /// Polls the armed countdown. Without one in flight the wait completes
    /// immediately.
    fn wait(&mut self) -> nb::Result<(), Void> {
        let dir = self.config().dir;
        let period = self.period();
        let now = self.tick();

        let done = match self.countdown.as_mut() {
            Some(cd) => {
                let step = u64::from(ticks_between(dir, period, cd.base, now));
                if step >= cd.left {
                    true
                } else {
                    cd.left -= step;
                    cd.base = now;
                    false
                }
            }
            None => true,
        };

        if done {
            self.countdown = None;
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

impl<T: Instance> Cancel for TimerHandle<T> {
    type Error = Error;

    fn cancel(&mut self) -> Result<()> {
        self.countdown.take().map(|_| ()).ok_or(Error::NotStarted)
    }
}

impl<T: Instance> DelayMs<u32> for TimerHandle<T> {
    fn delay_ms(&mut self, ms: u32) {
        TimerHandle::delay_ms(self, ms);
    }
}

impl<T: Instance> DelayMs<u16> for TimerHandle<T> {
    fn delay_ms(&mut self, ms: u16) {
        TimerHandle::delay_ms(self, u32::from(ms));
    }
}

impl<T: Instance> DelayMs<u8> for TimerHandle<T> {
    fn delay_ms(&mut self, ms: u8) {
        TimerHandle::delay_ms(self, u32::from(ms));
    }
}

impl<T: Instance> DelayUs<u32> for TimerHandle<T> {
    fn delay_us(&mut self, us: u32) {
        TimerHandle::delay_us(self, us);
    }
}

impl<T: Instance> DelayUs<u16> for TimerHandle<T> {
    fn delay_us(&mut self, us: u16) {
        TimerHandle::delay_us(self, u32::from(us));
    }
}

impl<T: Instance> DelayUs<u8> for TimerHandle<T> {
    fn delay_us(&mut self, us: u8) {
        TimerHandle::delay_us(self, u32::from(us));
    }
}
