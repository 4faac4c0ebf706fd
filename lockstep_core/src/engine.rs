//! Cooperative scheduler driving time-driven entities.
//!
//! An [`Engine`] is a cheap clonable handle over shared state. Entities are
//! registered as weak references in registration order; each tick snapshots
//! the registry and feeds the elapsed interval to every live entity. A
//! dropped entity simply disappears from the next pass.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use lockstep_traits::TimeDriven;

use crate::error::{ConfigError, UsageError};
use crate::stats::{MovingAverage, Window};
use crate::util::{rate_hz, us_to_seconds};

/// Number of inter-tick intervals averaged for the automatic sample rate.
const SAMPLE_RATE_WINDOW: u32 = 32;

type Entity = Weak<RefCell<dyn TimeDriven>>;

thread_local! {
    static PRIMARY: Engine = Engine::new();
    // Maps an entity's allocation address to the id of the engine it is
    // registered with, so double registration is caught across engines.
    static BINDINGS: RefCell<HashMap<usize, u64>> = RefCell::new(HashMap::new());
    static NEXT_ENGINE_ID: std::cell::Cell<u64> = const { std::cell::Cell::new(0) };
}

struct EngineInner {
    id: u64,
    entities: Vec<(usize, Entity)>,
    elapsed_us: u64,
    n_steps: u64,
    in_tick: bool,
    auto_sample_rate: bool,
    sample_rate_hz: f32,
    interval_avg: MovingAverage,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        // Entities still bound to this engine must become registrable again;
        // their allocation addresses may be reused after they drop. The map
        // itself may already be gone during thread teardown.
        let _ = BINDINGS.try_with(|b| {
            let mut bindings = b.borrow_mut();
            for (key, _) in &self.entities {
                bindings.remove(key);
            }
        });
    }
}

/// Handle to a single-threaded scheduler. Clones share state.
#[derive(Clone)]
pub struct Engine {
    inner: Rc<RefCell<EngineInner>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Engine")
            .field("id", &inner.id)
            .field("entities", &inner.entities.len())
            .field("elapsed_us", &inner.elapsed_us)
            .field("n_steps", &inner.n_steps)
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates a fresh engine with no entities and automatic sample rate.
    pub fn new() -> Self {
        let id = NEXT_ENGINE_ID.with(|c| {
            let id = c.get();
            c.set(id + 1);
            id
        });
        Engine {
            inner: Rc::new(RefCell::new(EngineInner {
                id,
                entities: Vec::new(),
                elapsed_us: 0,
                n_steps: 0,
                in_tick: false,
                auto_sample_rate: true,
                sample_rate_hz: 0.0,
                // Statically valid window; the fallback is unreachable.
                interval_avg: MovingAverage::with_window(Window::Samples(SAMPLE_RATE_WINDOW))
                    .unwrap_or_default(),
            })),
        }
    }

    /// The per-thread default engine.
    pub fn primary() -> Engine {
        PRIMARY.with(Engine::clone)
    }

    /// Registers an entity. Ticks reach entities in registration order. An
    /// entity may belong to at most one engine at a time; re-registering it
    /// with the same engine is a no-op.
    pub fn register<T>(&self, entity: &Rc<RefCell<T>>) -> Result<(), UsageError>
    where
        T: TimeDriven + 'static,
    {
        let key = Rc::as_ptr(entity) as *const () as usize;
        let id = self.inner.borrow().id;
        enum Binding {
            New,
            Here,
            Elsewhere,
        }
        let binding = BINDINGS.with(|b| {
            let mut bindings = b.borrow_mut();
            match bindings.get(&key) {
                Some(bound) if *bound == id => Binding::Here,
                Some(_) => Binding::Elsewhere,
                None => {
                    bindings.insert(key, id);
                    Binding::New
                }
            }
        });
        match binding {
            Binding::Here => return Ok(()),
            Binding::Elsewhere => {
                tracing::error!(engine = id, "entity already registered with another engine");
                return Err(UsageError::AlreadyRegistered);
            }
            Binding::New => {}
        }
        let weak = Rc::downgrade(entity);
        let weak: Entity = weak;
        self.inner.borrow_mut().entities.push((key, weak));
        trace!(engine = id, "entity registered");
        Ok(())
    }

    /// Removes an entity; unknown entities are ignored. During a tick the
    /// removal takes effect on the next pass.
    pub fn deregister<T>(&self, entity: &Rc<RefCell<T>>)
    where
        T: TimeDriven + 'static,
    {
        let key = Rc::as_ptr(entity) as *const () as usize;
        let mut inner = self.inner.borrow_mut();
        let before = inner.entities.len();
        inner.entities.retain(|(k, _)| *k != key);
        if inner.entities.len() != before {
            BINDINGS.with(|b| b.borrow_mut().remove(&key));
            trace!(engine = inner.id, "entity deregistered");
        }
    }

    /// Advances the engine by `elapsed_us` and updates every live entity.
    ///
    /// The registry is snapshotted at the start of the pass: entities
    /// registered from inside a callback first see time on the next tick,
    /// and deregistrations from inside a callback take effect next tick.
    /// Calling `tick` from inside a pass is a usage error.
    pub fn tick(&self, elapsed_us: u64) -> Result<(), UsageError> {
        let snapshot: Vec<Entity> = {
            let mut inner = self.inner.borrow_mut();
            if inner.in_tick {
                tracing::error!(engine = inner.id, "tick called from inside a tick");
                return Err(UsageError::ReentrantTick);
            }
            inner.in_tick = true;
            inner.elapsed_us = inner.elapsed_us.wrapping_add(elapsed_us);
            inner.n_steps = inner.n_steps.wrapping_add(1);
            if inner.auto_sample_rate && elapsed_us > 0 {
                let avg_us = inner.interval_avg.apply(elapsed_us as f32, 0.0);
                inner.sample_rate_hz = rate_hz(avg_us.max(1.0) as u64);
            }
            inner.entities.iter().map(|(_, w)| w.clone()).collect()
        };

        // Borrow released: callbacks may register or deregister freely.
        for weak in &snapshot {
            if let Some(entity) = weak.upgrade() {
                entity.borrow_mut().add_time(elapsed_us);
            }
        }

        let mut inner = self.inner.borrow_mut();
        inner.in_tick = false;
        // Prune entities dropped since the last pass and release bindings.
        let dead: Vec<usize> = inner
            .entities
            .iter()
            .filter(|(_, w)| w.strong_count() == 0)
            .map(|(k, _)| *k)
            .collect();
        if !dead.is_empty() {
            debug!(engine = inner.id, pruned = dead.len(), "pruned dropped entities");
            inner.entities.retain(|(_, w)| w.strong_count() > 0);
            BINDINGS.with(|b| {
                let mut bindings = b.borrow_mut();
                for key in dead {
                    bindings.remove(&key);
                }
            });
        }
        Ok(())
    }

    /// Total time fed through `tick`, wrapping on overflow.
    pub fn elapsed_us(&self) -> u64 {
        self.inner.borrow().elapsed_us
    }

    pub fn seconds(&self) -> f64 {
        us_to_seconds(self.elapsed_us())
    }

    /// Number of completed ticks.
    pub fn n_steps(&self) -> u64 {
        self.inner.borrow().n_steps
    }

    pub fn entity_count(&self) -> usize {
        self.inner.borrow().entities.len()
    }

    /// Estimated update frequency in Hz. Zero until enough ticks have been
    /// observed or a fixed rate is set.
    pub fn sample_rate(&self) -> f32 {
        self.inner.borrow().sample_rate_hz
    }

    /// Fixes the sample rate, disabling the automatic estimate.
    pub fn set_sample_rate(&self, hz: f32) -> Result<(), ConfigError> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(hz));
        }
        let mut inner = self.inner.borrow_mut();
        inner.auto_sample_rate = false;
        inner.sample_rate_hz = hz;
        Ok(())
    }

    /// Re-enables the automatic sample rate estimate.
    pub fn enable_auto_sample_rate(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.auto_sample_rate = true;
        inner.interval_avg.reset();
        inner.sample_rate_hz = 0.0;
    }

    pub fn auto_sample_rate(&self) -> bool {
        self.inner.borrow().auto_sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        total_us: u64,
        updates: u32,
    }

    impl TimeDriven for Probe {
        fn add_time(&mut self, micros: u64) {
            self.total_us += micros;
            self.updates += 1;
        }
        fn is_running(&self) -> bool {
            true
        }
    }

    #[test]
    fn tick_updates_registered_entities() {
        let engine = Engine::new();
        let probe = Rc::new(RefCell::new(Probe::default()));
        engine.register(&probe).unwrap();

        engine.tick(10_000).unwrap();
        engine.tick(5_000).unwrap();

        assert_eq!(probe.borrow().total_us, 15_000);
        assert_eq!(probe.borrow().updates, 2);
        assert_eq!(engine.elapsed_us(), 15_000);
        assert_eq!(engine.n_steps(), 2);
    }

    #[test]
    fn cross_engine_registration_is_rejected() {
        let engine = Engine::new();
        let probe = Rc::new(RefCell::new(Probe::default()));
        engine.register(&probe).unwrap();
        // Same engine again: no-op, no duplicate updates.
        engine.register(&probe).unwrap();
        engine.tick(100).unwrap();
        assert_eq!(probe.borrow().updates, 1);

        let other = Engine::new();
        assert_eq!(
            other.register(&probe).unwrap_err(),
            UsageError::AlreadyRegistered
        );
        engine.deregister(&probe);
        assert!(other.register(&probe).is_ok());
        other.deregister(&probe);
    }

    struct Tagged {
        tag: u8,
        log: Rc<RefCell<Vec<u8>>>,
    }

    impl TimeDriven for Tagged {
        fn add_time(&mut self, _micros: u64) {
            self.log.borrow_mut().push(self.tag);
        }
        fn is_running(&self) -> bool {
            true
        }
    }

    #[test]
    fn update_order_follows_registration_order() {
        let engine = Engine::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let tagged = |tag| {
            Rc::new(RefCell::new(Tagged {
                tag,
                log: Rc::clone(&log),
            }))
        };

        let a = tagged(b'a');
        let b = tagged(b'b');
        let c = tagged(b'c');
        engine.register(&a).unwrap();
        engine.register(&b).unwrap();
        engine.register(&c).unwrap();
        engine.tick(1).unwrap();
        assert_eq!(*log.borrow(), b"abc");

        // Removing the middle entity must not disturb the others' order,
        // and a re-registered entity goes to the back.
        engine.deregister(&b);
        engine.register(&b).unwrap();
        log.borrow_mut().clear();
        engine.tick(1).unwrap();
        assert_eq!(*log.borrow(), b"acb");

        engine.deregister(&a);
        engine.deregister(&b);
        engine.deregister(&c);
    }

    #[test]
    fn dropping_an_engine_releases_its_bindings() {
        let probe = Rc::new(RefCell::new(Probe::default()));
        let engine = Engine::new();
        engine.register(&probe).unwrap();
        drop(engine);
        // The entity is no longer bound anywhere.
        let fresh = Engine::new();
        assert!(fresh.register(&probe).is_ok());
        fresh.deregister(&probe);
    }

    #[test]
    fn dropped_entities_are_pruned() {
        let engine = Engine::new();
        let probe = Rc::new(RefCell::new(Probe::default()));
        engine.register(&probe).unwrap();
        assert_eq!(engine.entity_count(), 1);

        drop(probe);
        engine.tick(1_000).unwrap();
        assert_eq!(engine.entity_count(), 0);
    }

    #[test]
    fn deregistered_entity_stops_receiving_time() {
        let engine = Engine::new();
        let probe = Rc::new(RefCell::new(Probe::default()));
        engine.register(&probe).unwrap();
        engine.tick(100).unwrap();
        engine.deregister(&probe);
        engine.tick(100).unwrap();
        assert_eq!(probe.borrow().total_us, 100);
    }

    #[test]
    fn fixed_sample_rate_overrides_estimate() {
        let engine = Engine::new();
        assert!(engine.auto_sample_rate());
        engine.set_sample_rate(50.0).unwrap();
        assert!(!engine.auto_sample_rate());
        assert_eq!(engine.sample_rate(), 50.0);
        engine.tick(1_000).unwrap();
        assert_eq!(engine.sample_rate(), 50.0);

        assert!(engine.set_sample_rate(0.0).is_err());
        assert!(engine.set_sample_rate(f32::NAN).is_err());
    }

    #[test]
    fn auto_sample_rate_tracks_tick_interval() {
        let engine = Engine::new();
        for _ in 0..SAMPLE_RATE_WINDOW {
            engine.tick(10_000).unwrap();
        }
        // 10 ms intervals: 100 Hz.
        assert!((engine.sample_rate() - 100.0).abs() < 1.0);
    }

    #[test]
    fn primary_engine_is_shared_per_thread() {
        let a = Engine::primary();
        let b = Engine::primary();
        let before = a.n_steps();
        a.tick(1).unwrap();
        assert_eq!(b.n_steps(), before + 1);
    }

    #[test]
    fn reentrant_tick_is_rejected() {
        struct Nested {
            engine: Engine,
            seen: Rc<RefCell<Option<UsageError>>>,
        }
        impl TimeDriven for Nested {
            fn add_time(&mut self, _micros: u64) {
                *self.seen.borrow_mut() = self.engine.tick(1).err();
            }
            fn is_running(&self) -> bool {
                true
            }
        }

        let engine = Engine::new();
        let seen = Rc::new(RefCell::new(None));
        let nested = Rc::new(RefCell::new(Nested {
            engine: engine.clone(),
            seen: Rc::clone(&seen),
        }));
        engine.register(&nested).unwrap();
        engine.tick(1).unwrap();
        assert_eq!(*seen.borrow(), Some(UsageError::ReentrantTick));
        // The outer pass completes normally.
        assert_eq!(engine.n_steps(), 1);
        engine.deregister(&nested);
    }

    #[test]
    fn registration_during_tick_takes_effect_next_pass() {
        struct Registrar {
            engine: Engine,
            child: Option<Rc<RefCell<Probe>>>,
            spawned: Option<Rc<RefCell<Probe>>>,
        }
        impl TimeDriven for Registrar {
            fn add_time(&mut self, _micros: u64) {
                if let Some(child) = self.child.take() {
                    self.engine.register(&child).unwrap();
                    self.spawned = Some(child);
                }
            }
            fn is_running(&self) -> bool {
                true
            }
        }

        let engine = Engine::new();
        let child = Rc::new(RefCell::new(Probe::default()));
        let registrar = Rc::new(RefCell::new(Registrar {
            engine: engine.clone(),
            child: Some(Rc::clone(&child)),
            spawned: None,
        }));
        engine.register(&registrar).unwrap();

        engine.tick(100).unwrap();
        // Registered mid-pass: sees no time this tick.
        assert_eq!(child.borrow().total_us, 0);
        engine.tick(100).unwrap();
        assert_eq!(child.borrow().total_us, 100);

        engine.deregister(&child);
        engine.deregister(&registrar);
    }
}
