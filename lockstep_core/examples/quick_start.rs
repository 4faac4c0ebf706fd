//! Minimal pipeline driven by a manually ticked engine.
//!
//! Run with: cargo run -p lockstep_core --example quick_start

use std::cell::RefCell;
use std::rc::Rc;

use lockstep_core::{Engine, Oscillator, Smoother, Source, SourceExt, Thresholder, Window};

/// Source view of an engine-registered oscillator.
struct SharedOsc(Rc<RefCell<Oscillator>>);

impl Source for SharedOsc {
    fn read(&mut self) -> f32 {
        self.0.borrow_mut().read()
    }
}

fn main() -> lockstep_core::Result<()> {
    let engine = Engine::new();

    let osc = Rc::new(RefCell::new(Oscillator::sine(1_000_000)?));
    osc.borrow_mut().start();
    engine.register(&osc)?;

    let smoother = Smoother::with_window(Window::Samples(4))?.with_engine(engine.clone());
    let mut chain = SharedOsc(Rc::clone(&osc))
        .pipe(smoother)
        .pipe(Thresholder::with_hysteresis(0.6, 0.2));

    // 10 ms ticks for two full oscillator periods.
    let mut on = false;
    for _ in 0..200 {
        engine.tick(10_000)?;
        let level = chain.read() >= 0.5;
        if level != on {
            on = level;
            println!("t={:>7} us: output {}", engine.elapsed_us(), on);
        }
    }
    Ok(())
}
