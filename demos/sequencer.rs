//! Step sequencer timing demo, runnable on the host against the mock timer.
//!
//! Eight steps at 120 BPM: each step takes a tick baseline, busy-waits one
//! sixteenth note on the timer, and reports the measured step length as a
//! tick delta.

use gptim::mock::MockTim;
use gptim::{Config, CounterDir, Peripheral, TimerHandle};

const BPM: u32 = 120;

const STEPS: [(&str, u32); 8] = [
    ("C4", 262),
    ("E4", 330),
    ("G4", 392),
    ("C5", 523),
    ("G4", 392),
    ("E4", 330),
    ("C4", 262),
    ("--", 0),
];

fn main() -> Result<(), gptim::Error> {
    // 1 MHz tick rate out of the simulated 200 MHz kernel clock, so a tick
    // is a microsecond. The auto-step keeps the mock counter moving a few
    // hundred ticks per poll, standing in for real time passing.
    let mut tim = TimerHandle::new();
    tim.init(
        MockTim::new(Peripheral::Tim2)
            .with_clock_hz(200_000_000)
            .with_auto_step(400),
        Config {
            periph: Peripheral::Tim2,
            dir: CounterDir::Up,
        },
    )?;
    tim.set_prescaler(199)?;
    tim.start()?;
    println!("tick rate: {} Hz", tim.freq_hz());

    // A sixteenth note at 120 BPM is 125 ms.
    let step_ms = 60_000 / BPM / 4;

    for (step, (name, freq)) in STEPS.iter().enumerate() {
        let begin = tim.tick();
        tim.delay_ms(step_ms);
        let held_ms = tim.ticks_since(begin) / 1_000;

        if *freq == 0 {
            println!("step {step}: rest, held {held_ms} ms");
        } else {
            println!("step {step}: {name} at {freq} Hz, held {held_ms} ms");
        }
    }

    println!("total: {} ms", tim.millis());
    tim.stop()?;
    Ok(())
}
