//! Pipeline assembly from config and the paced run loop.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use eyre::WrapErr;
use tracing::{debug, info};

use lockstep_config::{Config, ScalerKind, WaveformKind, WindowCfg};
use lockstep_core::util::{period_us, seconds_to_us};
use lockstep_core::{
    AnalogIn, Engine, MinMaxScaler, MovingFilter, Normalizer, Oscillator, RobustScaler, Smoother,
    Source, Thresholder, Transform, Waveform, Window,
};
use lockstep_hardware::SimulatedAnalogPin;
use lockstep_traits::{Clock, MonotonicClock};

use crate::cli::SourceKind;

fn window_from(cfg: WindowCfg) -> Window {
    match (cfg.samples, cfg.seconds) {
        (Some(n), _) => Window::Samples(n),
        (None, Some(s)) => Window::Seconds(s),
        (None, None) => Window::Unbounded,
    }
}

/// Source view of an engine-registered oscillator.
struct SharedOsc(Rc<RefCell<Oscillator>>);

impl Source for SharedOsc {
    fn read(&mut self) -> f32 {
        self.0.borrow_mut().read()
    }
}

/// A configured chain: one source, zero or more learning filters, and an
/// optional digital threshold tail.
pub struct Pipeline {
    source: Box<dyn Source>,
    filters: Vec<Box<dyn MovingFilter>>,
    thresholder: Option<Thresholder>,
    // Keeps the registered oscillator alive for the run.
    _osc: Option<Rc<RefCell<Oscillator>>>,
}

impl Pipeline {
    pub fn read(&mut self) -> f32 {
        let mut value = self.source.read();
        for filter in &mut self.filters {
            value = filter.put(value);
        }
        if let Some(thresholder) = &mut self.thresholder {
            value = thresholder.put(value);
        }
        value
    }

    /// Ends the calibration phase of every learning filter.
    pub fn commit_calibration(&mut self) {
        for filter in &mut self.filters {
            filter.pause_calibrating();
        }
    }
}

pub fn build_pipeline(
    cfg: &Config,
    engine: &Engine,
    source_kind: SourceKind,
    tick_hz: u32,
) -> eyre::Result<Pipeline> {
    let (source, osc): (Box<dyn Source>, Option<Rc<RefCell<Oscillator>>>) = match source_kind {
        SourceKind::Sensor => {
            let reads_per_period = (cfg.sensor.period_s * tick_hz as f32).max(1.0) as u32;
            let pin = SimulatedAnalogPin::new(reads_per_period, cfg.sensor.noise, cfg.sensor.seed);
            (Box::new(AnalogIn::new(pin)), None)
        }
        SourceKind::Oscillator => {
            let o = &cfg.oscillator;
            let waveform = match o.waveform {
                WaveformKind::Sine => Waveform::Sine,
                WaveformKind::Triangle => Waveform::triangle(o.shape_param)?,
                WaveformKind::Square => Waveform::square(o.shape_param)?,
            };
            let period = seconds_to_us(f64::from(o.period_s));
            let mut oscillator = Oscillator::new(period, waveform)
                .wrap_err("invalid oscillator configuration")?;
            oscillator.randomize(o.randomness)?;
            oscillator.set_phase_shift(o.phase_shift);
            oscillator.start();
            let oscillator = Rc::new(RefCell::new(oscillator));
            engine.register(&oscillator)?;
            (Box::new(SharedOsc(Rc::clone(&oscillator))), Some(oscillator))
        }
    };

    let mut filters: Vec<Box<dyn MovingFilter>> = Vec::new();
    if cfg.smoother.enabled {
        let smoother = Smoother::with_window(window_from(cfg.smoother.window))?
            .with_engine(engine.clone());
        filters.push(Box::new(smoother));
    }
    match cfg.scaler.kind {
        ScalerKind::None => {}
        ScalerKind::MinMax => {
            let scaler = MinMaxScaler::with_window(window_from(cfg.scaler.window))?
                .with_engine(engine.clone());
            filters.push(Box::new(scaler));
        }
        ScalerKind::Robust => {
            let mut scaler = RobustScaler::with_window(window_from(cfg.scaler.window))?
                .with_engine(engine.clone());
            scaler.set_span(cfg.scaler.span)?;
            filters.push(Box::new(scaler));
        }
        ScalerKind::Normalize => {
            let mut normalizer = Normalizer::with_window(window_from(cfg.scaler.window))?
                .with_engine(engine.clone());
            normalizer.set_targets(0.5, 0.15)?;
            normalizer.set_clamp(Some((0.0, 1.0)));
            filters.push(Box::new(normalizer));
        }
    }

    let thresholder = cfg
        .threshold
        .enabled
        .then(|| Thresholder::with_hysteresis(cfg.threshold.value, cfg.threshold.hysteresis));

    Ok(Pipeline {
        source,
        filters,
        thresholder,
        _osc: osc,
    })
}

pub fn run(
    cfg: &Config,
    source_kind: SourceKind,
    run_s_override: Option<f32>,
    tick_hz_override: Option<u32>,
    print_output: bool,
    shutdown: Receiver<()>,
) -> eyre::Result<()> {
    let tick_hz = tick_hz_override.unwrap_or(cfg.engine.tick_hz);
    if tick_hz == 0 {
        eyre::bail!("tick rate must be > 0");
    }
    let run_s = run_s_override.unwrap_or(cfg.engine.run_s);
    if run_s < 0.0 {
        eyre::bail!("run time must be >= 0");
    }

    let engine = Engine::new();
    // The loop is paced at a known rate; fix it instead of estimating.
    engine.set_sample_rate(tick_hz as f32)?;
    let mut pipeline = build_pipeline(cfg, &engine, source_kind, tick_hz)?;

    let calibrate_us = seconds_to_us(f64::from(cfg.scaler.calibrate_s));
    let run_us = seconds_to_us(f64::from(run_s));
    let period = Duration::from_micros(period_us(tick_hz));
    let clock = MonotonicClock::new();
    let epoch = clock.now();
    let mut last_us = 0u64;
    let mut committed = calibrate_us == 0;
    let mut last_report_s = 0u64;

    info!(tick_hz, run_s, ?source_kind, "pipeline started");
    loop {
        if shutdown.try_recv().is_ok() {
            info!("shutdown requested");
            break;
        }
        let now_us = clock.us_since(epoch);
        let elapsed = now_us.saturating_sub(last_us);
        last_us = now_us;
        engine.tick(elapsed)?;
        let out = pipeline.read();

        if !committed && engine.elapsed_us() >= calibrate_us {
            pipeline.commit_calibration();
            committed = true;
            info!(elapsed_us = engine.elapsed_us(), "calibration committed");
        }
        if print_output {
            let second = engine.elapsed_us() / 1_000_000;
            if second > last_report_s {
                last_report_s = second;
                println!("t={second}s out={out:.3}");
            }
        } else {
            debug!(out, "tick");
        }
        if run_us > 0 && engine.elapsed_us() >= run_us {
            break;
        }
        clock.sleep(period);
    }
    info!(
        steps = engine.n_steps(),
        seconds = engine.seconds(),
        "pipeline stopped"
    );
    Ok(())
}
