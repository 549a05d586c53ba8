//! General-purpose hardware timer driver for STM32H7-class parts.
//!
//! Wraps the TIM2-TIM5 counter peripherals (TIM2/TIM5 32-bit, TIM3/TIM4
//! 16-bit) behind [`TimerHandle`]: configure period and prescaler, start and
//! stop counting, read ticks/milliseconds/microseconds, and busy-wait for
//! tick or time deltas. The `embedded-hal` 0.2 timer and delay traits are
//! implemented on the handle.
//!
//! The handle is generic over [`Instance`], the register-level seam:
//! [`mmio::Tim`] binds the on-chip instances and [`mock::MockTim`] runs the
//! same code on the host.
//!
//! ```
//! use gptim::{mock::MockTim, Config, CounterDir, Peripheral, TimerHandle};
//!
//! let mut tim = TimerHandle::new();
//! tim.init(
//!     MockTim::new(Peripheral::Tim3).with_clock_hz(8_000_000),
//!     Config { periph: Peripheral::Tim3, dir: CounterDir::Up },
//! )?;
//! tim.set_prescaler(7)?; // 8 MHz in, 1 MHz ticks
//! tim.start()?;
//!
//! let before = tim.tick();
//! tim.delay_us(100);
//! assert!(tim.ticks_since(before) >= 100);
//! # Ok::<(), gptim::Error>(())
//! ```
//!
//! On hardware the same flow binds a claimed instance:
//!
//! ```no_run
//! use gptim::{mmio::Tim, Config, Peripheral, TimerHandle};
//!
//! let mut tim = TimerHandle::new();
//! tim.init(Tim::claim(Peripheral::Tim2)?, Config::default())?;
//! tim.start()?;
//! tim.delay_ms(250);
//! # Ok::<(), gptim::Error>(())
//! ```
//!
//! Not covered: input capture, output compare and PWM channels, interrupts
//! and DMA requests, the advanced/low-power/high-resolution timer families,
//! and clock-tree setup, which is assumed done (see [`config`]).

#![cfg_attr(not(test), no_std)]

pub mod config;
mod ehal;
pub mod mmio;
pub mod mock;
pub mod timer;

pub use ehal::Ticks;
pub use timer::{
    Config, CounterDir, CounterWidth, Error, Instance, Peripheral, Result, State, TimerHandle,
};
