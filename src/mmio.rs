//! Memory-mapped access to the on-chip TIM2-TIM5 instances.
//!
//! Register layout and the RCC enable/reset plumbing follow the STM32H7
//! reference manual (RM0433). Each instance can be claimed exactly once;
//! the claim is returned when the [`Tim`] value is dropped.

use core::sync::atomic::{AtomicBool, Ordering};

use volatile_register::{RW, WO};

use crate::config::TIM_INPUT_CLOCK_HZ;
use crate::timer::{CounterDir, Error, Instance, Peripheral, Result};

/// TIM2 base address; TIM3-TIM5 follow at [`TIM_STRIDE`] intervals.
const TIM2_BASE: usize = 0x4000_0000;
/// Address stride between consecutive TIM instances.
const TIM_STRIDE: usize = 0x400;

/// RCC base address.
const RCC_BASE: usize = 0x5802_4400;
/// Offset of the APB1 low peripheral reset register.
const RCC_APB1LRSTR: usize = 0x090;
/// Offset of the APB1 low peripheral clock enable register.
const RCC_APB1LENR: usize = 0x0E8;

/// CR1: counter enable.
const CR1_CEN: u32 = 1 << 0;
/// CR1: counter counts down when set.
const CR1_DIR: u32 = 1 << 4;
/// EGR: update generation.
const EGR_UG: u32 = 1 << 0;

/// General-purpose timer register block, TIM2-TIM5 layout.
#[repr(C)]
struct RegisterBlock {
    /// Control register 1.
    cr1: RW<u32>,
    /// Control register 2.
    cr2: RW<u32>,
    /// Slave mode control register.
    smcr: RW<u32>,
    /// DMA/interrupt enable register.
    dier: RW<u32>,
    /// Status register.
    sr: RW<u32>,
    /// Event generation register.
    egr: WO<u32>,
    /// Capture/compare mode register 1.
    ccmr1: RW<u32>,
    /// Capture/compare mode register 2.
    ccmr2: RW<u32>,
    /// Capture/compare enable register.
    ccer: RW<u32>,
    /// Counter.
    cnt: RW<u32>,
    /// Prescaler.
    psc: RW<u32>,
    /// Auto-reload register.
    arr: RW<u32>,
}

const fn base_of(periph: Peripheral) -> usize {
    TIM2_BASE + periph as usize * TIM_STRIDE
}

static CLAIMED: [AtomicBool; 4] = [
    AtomicBool::new(false),
    AtomicBool::new(false),
    AtomicBool::new(false),
    AtomicBool::new(false),
];

/// Exclusive binding to one on-chip TIM instance.
///
/// At most one live `Tim` exists per instance. Feed it to
/// [`crate::TimerHandle::init`]; all register traffic then goes through the
/// [`Instance`] trait.
///
/// TODO: surface the update interrupt (DIER.UIE is mapped but not exposed)
/// once the crate grows callback plumbing.
pub struct Tim {
    periph: Peripheral,
}

impl Tim {
    /// Claims exclusive access to `periph`. Errs with [`Error::Unavailable`]
    /// while a previous claim is still live.
    pub fn claim(periph: Peripheral) -> Result<Tim> {
        if CLAIMED[periph as usize].swap(true, Ordering::AcqRel) {
            return Err(Error::Unavailable);
        }
        Ok(Tim { periph })
    }

    fn regs(&self) -> &RegisterBlock {
        unsafe { &*(base_of(self.periph) as *const RegisterBlock) }
    }

    fn rcc_mask(&self) -> u32 {
        // TIM2EN..TIM5EN occupy bits 0..3 of APB1LENR, and the reset
        // register mirrors the layout.
        1 << (self.periph as u32)
    }

    fn rcc_set(&self, offset: usize, mask: u32, on: bool) {
        let reg = (RCC_BASE + offset) as *mut u32;
        unsafe {
            let v = reg.read_volatile();
            reg.write_volatile(if on { v | mask } else { v & !mask });
        }
    }
}

impl Instance for Tim {
    fn peripheral(&self) -> Peripheral {
        self.periph
    }

    fn input_clock_hz(&self) -> u32 {
        TIM_INPUT_CLOCK_HZ
    }

    fn power_up(&mut self) -> Result<()> {
        // Gate the kernel clock on, then read the enable register back so
        // the write has settled before any timer register is touched.
        self.rcc_set(RCC_APB1LENR, self.rcc_mask(), true);
        unsafe {
            let _ = ((RCC_BASE + RCC_APB1LENR) as *const u32).read_volatile();
        }

        // Pulse the peripheral reset so the block starts from its defaults.
        self.rcc_set(RCC_APB1LRSTR, self.rcc_mask(), true);
        self.rcc_set(RCC_APB1LRSTR, self.rcc_mask(), false);
        Ok(())
    }

    fn set_direction(&mut self, dir: CounterDir) -> Result<()> {
        unsafe {
            self.regs().cr1.modify(|v| match dir {
                CounterDir::Up => v & !CR1_DIR,
                CounterDir::Down => v | CR1_DIR,
            });
        }
        Ok(())
    }

    fn set_period(&mut self, ticks: u32) {
        // ARR is not preloaded (ARPE keeps its reset value of zero), so the
        // new period takes effect immediately and the counter keeps its
        // current value.
        unsafe { self.regs().arr.write(ticks) }
    }

    fn set_prescaler(&mut self, div: u16) {
        // PSC is preloaded in hardware; the divisor is taken over at the
        // next update event.
        unsafe { self.regs().psc.write(u32::from(div)) }
    }

    fn reload(&mut self) {
        let regs = self.regs();
        unsafe {
            // UG latches PSC/ARR and reinitializes the counter. It also
            // raises the update flag, so clear the status register after.
            regs.egr.write(EGR_UG);
            regs.sr.write(0);
        }
    }

    fn set_running(&mut self, run: bool) {
        unsafe {
            self.regs()
                .cr1
                .modify(|v| if run { v | CR1_CEN } else { v & !CR1_CEN });
        }
    }

    #[inline]
    fn count(&self) -> u32 {
        self.regs().cnt.read()
    }
}

/// Dropping releases the claim without touching the hardware; stop the
/// counter first when it should not keep running.
impl Drop for Tim {
    fn drop(&mut self) {
        CLAIMED[self.periph as usize].store(false, Ordering::Release);
    }
}
