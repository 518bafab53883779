//! Minimum spacing between consecutive remote calls.
//!
//! A [`Throttle`] records when the previous call *completed* and, before the
//! next call starts, blocks the current thread until `min_interval` has
//! passed since then. The first call through a fresh throttle never waits.
//! The guarantee holds only for calls routed through the same value; share
//! one throttle per API key.

use std::time::{Duration, Instant};

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(250);

pub trait Clock {
  fn now(&self) -> Instant;
  fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Instant {
    Instant::now()
  }

  fn sleep(&self, duration: Duration) {
    std::thread::sleep(duration);
  }
}

#[derive(Debug)]
pub struct Throttle<C: Clock = SystemClock> {
  min_interval: Duration,
  last_call: Option<Instant>,
  clock: C,
}

impl Throttle<SystemClock> {
  pub fn new(min_interval: Duration) -> Self {
    Self::with_clock(min_interval, SystemClock)
  }
}

impl Default for Throttle<SystemClock> {
  fn default() -> Self {
    Self::new(DEFAULT_MIN_INTERVAL)
  }
}

impl<C: Clock> Throttle<C> {
  pub fn with_clock(min_interval: Duration, clock: C) -> Self {
    Self {
      min_interval,
      last_call: None,
      clock,
    }
  }

  pub fn min_interval(&self) -> Duration {
    self.min_interval
  }

  pub fn last_call(&self) -> Option<Instant> {
    self.last_call
  }

  /// Blocks until the next call may start. Returns how long it slept.
  pub fn wait(&self) -> Duration {
    let Some(last) = self.last_call else {
      return Duration::ZERO;
    };

    let elapsed = self.clock.now().saturating_duration_since(last);
    if elapsed >= self.min_interval {
      return Duration::ZERO;
    }

    let remaining = self.min_interval - elapsed;
    tracing::debug!(wait_ms = remaining.as_millis() as u64, "throttling API call");
    self.clock.sleep(remaining);
    remaining
  }

  pub fn record(&mut self) {
    let now = self.clock.now();
    // Instants are monotonic, but a test clock may not be.
    self.last_call = Some(match self.last_call {
      Some(prev) if prev > now => prev,
      _ => now,
    });
  }

  /// Runs `f` once the spacing allows it and records completion afterwards,
  /// whether `f` succeeded or not.
  pub fn call<T>(&mut self, f: impl FnOnce() -> T) -> T {
    self.wait();
    let out = f();
    self.record();
    out
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use super::Clock;
  use std::cell::{Cell, RefCell};
  use std::rc::Rc;
  use std::time::{Duration, Instant};

  /// Clock that only moves when told to; `sleep` advances it instantly.
  #[derive(Debug, Clone)]
  pub struct ManualClock {
    now: Rc<Cell<Instant>>,
    sleeps: Rc<RefCell<Vec<Duration>>>,
  }

  impl ManualClock {
    pub fn new() -> Self {
      Self {
        now: Rc::new(Cell::new(Instant::now())),
        sleeps: Rc::new(RefCell::new(Vec::new())),
      }
    }

    pub fn advance(&self, by: Duration) {
      self.now.set(self.now.get() + by);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
      self.sleeps.borrow().clone()
    }
  }

  impl Clock for ManualClock {
    fn now(&self) -> Instant {
      self.now.get()
    }

    fn sleep(&self, duration: Duration) {
      self.sleeps.borrow_mut().push(duration);
      self.advance(duration);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::testing::ManualClock;
  use super::*;

  const MS: Duration = Duration::from_millis(1);

  #[test]
  fn first_call_never_waits() {
    let clock = ManualClock::new();
    let throttle = Throttle::with_clock(DEFAULT_MIN_INTERVAL, clock.clone());
    assert_eq!(throttle.wait(), Duration::ZERO);
    assert!(clock.sleeps().is_empty());
    assert!(throttle.last_call().is_none());
  }

  #[test]
  fn back_to_back_calls_are_spaced() {
    let clock = ManualClock::new();
    let mut throttle = Throttle::with_clock(DEFAULT_MIN_INTERVAL, clock.clone());

    let mut starts = Vec::new();
    let mut completions = Vec::new();
    for _ in 0..5 {
      throttle.call(|| {
        starts.push(clock.now());
        // simulated network latency
        clock.advance(40 * MS);
        completions.push(clock.now());
      });
    }

    for (done, next_start) in completions.iter().zip(starts.iter().skip(1)) {
      assert!(next_start.duration_since(*done) >= DEFAULT_MIN_INTERVAL);
    }
    assert_eq!(clock.sleeps(), vec![DEFAULT_MIN_INTERVAL; 4]);
  }

  #[test]
  fn waits_only_for_the_remainder() {
    let clock = ManualClock::new();
    let mut throttle = Throttle::with_clock(DEFAULT_MIN_INTERVAL, clock.clone());
    throttle.record();

    clock.advance(100 * MS);
    assert_eq!(throttle.wait(), 150 * MS);
  }

  #[test]
  fn no_wait_once_interval_has_passed() {
    let clock = ManualClock::new();
    let mut throttle = Throttle::with_clock(DEFAULT_MIN_INTERVAL, clock.clone());
    throttle.record();

    clock.advance(300 * MS);
    assert_eq!(throttle.wait(), Duration::ZERO);
    assert!(clock.sleeps().is_empty());
  }

  #[test]
  fn completion_is_recorded_after_the_call() {
    let clock = ManualClock::new();
    let mut throttle = Throttle::with_clock(DEFAULT_MIN_INTERVAL, clock.clone());
    let started = clock.now();

    throttle.call(|| clock.advance(1_000 * MS));

    assert_eq!(throttle.last_call(), Some(started + 1_000 * MS));
  }

  #[test]
  fn failed_calls_still_count() {
    let clock = ManualClock::new();
    let mut throttle = Throttle::with_clock(DEFAULT_MIN_INTERVAL, clock.clone());

    let out: Result<(), &str> = throttle.call(|| Err("timeout"));
    assert!(out.is_err());
    assert!(throttle.last_call().is_some());
    assert_eq!(throttle.wait(), DEFAULT_MIN_INTERVAL);
  }

  #[test]
  fn last_call_never_moves_backwards() {
    let clock = ManualClock::new();
    let mut throttle = Throttle::with_clock(DEFAULT_MIN_INTERVAL, clock.clone());
    let mut previous = None;
    for step in [0u32, 10, 0, 500, 3] {
      clock.advance(step * MS);
      throttle.record();
      let current = throttle.last_call();
      assert!(current >= previous);
      previous = current;
    }
  }
}
