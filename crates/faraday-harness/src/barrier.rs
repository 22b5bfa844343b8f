//! Multi-party rendezvous with bounded waits and poisoning.
//!
//! One instance per test-case row, sized to the row's DUT count. Every
//! party must reach each phase exactly once; a party that cannot (its
//! strategy failed, its host hung) poisons the group instead of leaving
//! the others blocked forever. Reusable across generations: an RvR sweep
//! calls [`Rendezvous::wait`] once per attenuation point.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    #[error("rendezvous timed out after {0:?}")]
    TimedOut(Duration),
    #[error("a partner abandoned the rendezvous")]
    PartnerLost,
}

#[derive(Debug)]
struct State {
    arrived: usize,
    generation: u64,
    poisoned: bool,
}

#[derive(Debug)]
pub struct Rendezvous {
    parties: usize,
    timeout: Duration,
    state: Mutex<State>,
    cvar: Condvar,
}

impl Rendezvous {
    /// `parties` is clamped to at least 1 (a single-DUT row still has a
    /// barrier; its waits return immediately).
    pub fn new(parties: usize, timeout: Duration) -> Self {
        Self {
            parties: parties.max(1),
            timeout,
            state: Mutex::new(State {
                arrived: 0,
                generation: 0,
                poisoned: false,
            }),
            cvar: Condvar::new(),
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Block until all parties arrive for the current phase.
    ///
    /// Returns the caller's arrival index within the phase. The last
    /// arrival releases everyone atomically; nobody observes a release
    /// before the final `wait` of the phase.
    ///
    /// A wait longer than the configured timeout poisons the group and
    /// returns [`SyncError::TimedOut`]; once poisoned, every current and
    /// future waiter gets [`SyncError::PartnerLost`].
    pub fn wait(&self) -> Result<usize, SyncError> {
        let mut state = self.state.lock().unwrap();
        if state.poisoned {
            return Err(SyncError::PartnerLost);
        }

        let index = state.arrived;
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cvar.notify_all();
            return Ok(index);
        }

        let generation = state.generation;
        let deadline = Instant::now() + self.timeout;
        loop {
            if state.generation != generation {
                return Ok(index);
            }
            if state.poisoned {
                return Err(SyncError::PartnerLost);
            }
            let now = Instant::now();
            if now >= deadline {
                state.poisoned = true;
                self.cvar.notify_all();
                return Err(SyncError::TimedOut(self.timeout));
            }
            let (guard, _) = self.cvar.wait_timeout(state, deadline - now).unwrap();
            state = guard;
        }
    }

    /// Mark the group abandoned. Idempotent; wakes every waiter.
    pub fn poison(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.poisoned {
            state.poisoned = true;
            self.cvar.notify_all();
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.state.lock().unwrap().poisoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn single_party_releases_immediately() {
        let barrier = Rendezvous::new(1, Duration::from_secs(1));
        assert_eq!(barrier.wait(), Ok(0));
        assert_eq!(barrier.wait(), Ok(0));
    }

    #[test]
    fn party_count_is_clamped_to_one() {
        let barrier = Rendezvous::new(0, Duration::from_secs(1));
        assert_eq!(barrier.parties(), 1);
        assert!(barrier.wait().is_ok());
    }

    #[test]
    fn release_is_atomic_after_the_nth_arrival() {
        const N: usize = 4;
        let barrier = Arc::new(Rendezvous::new(N, Duration::from_secs(5)));
        let arrived_before_release = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = crossbeam_channel::unbounded();

        let mut handles = Vec::new();
        for _ in 0..N {
            let barrier = Arc::clone(&barrier);
            let counter = Arc::clone(&arrived_before_release);
            let tx = tx.clone();
            handles.push(thread::spawn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                barrier.wait().unwrap();
                // Every thread must see all N arrivals by the time it is released.
                tx.send(counter.load(Ordering::SeqCst)).unwrap();
            }));
        }
        drop(tx);

        for h in handles {
            h.join().unwrap();
        }
        let seen: Vec<usize> = rx.iter().collect();
        assert_eq!(seen.len(), N);
        assert!(seen.into_iter().all(|s| s == N));
    }

    #[test]
    fn reusable_across_generations() {
        const PHASES: usize = 3;
        let barrier = Arc::new(Rendezvous::new(2, Duration::from_secs(5)));
        let other = {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                for _ in 0..PHASES {
                    barrier.wait().unwrap();
                }
            })
        };
        for _ in 0..PHASES {
            barrier.wait().unwrap();
        }
        other.join().unwrap();
    }

    #[test]
    fn straggler_timeout_poisons_the_group() {
        let barrier = Arc::new(Rendezvous::new(2, Duration::from_millis(100)));
        let err = barrier.wait().unwrap_err();
        assert!(matches!(err, SyncError::TimedOut(_)));
        assert!(barrier.is_poisoned());
        // Late arrivals fail fast instead of blocking.
        assert_eq!(barrier.wait(), Err(SyncError::PartnerLost));
    }

    #[test]
    fn poison_wakes_a_blocked_waiter() {
        let barrier = Arc::new(Rendezvous::new(2, Duration::from_secs(30)));
        let waiter = {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || barrier.wait())
        };
        // Give the waiter time to block, then abandon the group.
        thread::sleep(Duration::from_millis(50));
        barrier.poison();
        assert_eq!(waiter.join().unwrap(), Err(SyncError::PartnerLost));
    }
}
