// Copyright 2026 the Cog Authors
// SPDX-License-Identifier: MIT

//! Memoised, lock-guarded support probe.

use std::sync::{Mutex, PoisonError};

/// Runs a fallible initialiser at most once and caches its outcome.
///
/// The first caller of [`get_or_probe`](Self::get_or_probe) runs the
/// initialiser while holding the lock; concurrent callers wait and then see
/// the same cached result. A failed probe is cached as `None` and never
/// retried.
#[derive(Debug)]
pub struct SupportProbe<T> {
    state: Mutex<ProbeState<T>>,
}

#[derive(Debug)]
enum ProbeState<T> {
    Unchecked,
    Checked(Option<T>),
}

impl<T> Default for SupportProbe<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SupportProbe<T> {
    /// Creates an unchecked probe.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(ProbeState::Unchecked),
        }
    }

    /// Returns the cached value, running `probe` first if no check happened
    /// yet.
    pub fn get_or_probe<E>(&self, probe: impl FnOnce() -> Result<T, E>) -> Option<T>
    where
        T: Clone,
        E: std::fmt::Display,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let ProbeState::Unchecked = *state {
            let outcome = match probe() {
                Ok(value) => Some(value),
                Err(err) => {
                    log::debug!("support probe failed: {err}");
                    None
                }
            };
            *state = ProbeState::Checked(outcome);
        }
        match &*state {
            ProbeState::Checked(value) => value.clone(),
            ProbeState::Unchecked => None,
        }
    }

    /// Returns `true` once a probe has run, whatever its outcome.
    #[must_use]
    pub fn is_checked(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*state, ProbeState::Checked(_))
    }
}

#[cfg(test)]
mod tests {
    use super::SupportProbe;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn concurrent_probes_connect_once() {
        let probe = Arc::new(SupportProbe::<u32>::new());
        let attempts = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let probe = Arc::clone(&probe);
                let attempts = Arc::clone(&attempts);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    probe.get_or_probe(|| {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, &str>(7)
                    })
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, [Some(7), Some(7)]);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_is_remembered() {
        let _ = env_logger::builder().is_test(true).try_init();
        let probe = SupportProbe::<u32>::new();
        assert!(!probe.is_checked());

        assert_eq!(probe.get_or_probe(|| Err("no compositor")), None);
        assert!(probe.is_checked());
        assert_eq!(
            probe.get_or_probe(|| -> Result<u32, &str> { panic!("probe must not rerun") }),
            None
        );
    }
}
