//! Clock and limit constants for the timer driver

/// Kernel clock feeding the general-purpose timers, in Hz.
///
/// TIM2-TIM5 hang off APB1 and the timer kernel clock runs at twice the APB1
/// bus clock, 200 MHz with the usual 400 MHz core setup. Adjust if the clock
/// tree is configured differently.
pub const TIM_INPUT_CLOCK_HZ: u32 = 200_000_000;

/// Largest prescaler divisor the 16-bit PSC register can hold
pub const MAX_PRESCALER: u16 = 0xFFFF;
