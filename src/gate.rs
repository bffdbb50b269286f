//! Bounded admission gate for in-flight classifications.
//!
//! The gate is a counting gate with fixed capacity. It bounds how many
//! frames may be in flight to the classifier at once so that a slow model
//! causes frame drops instead of unbounded queue growth.
//!
//! Slot accounting is structural: `acquire`/`try_acquire` mint a
//! [`GatePermit`], and dropping the permit is the only way to release a
//! slot. A release without a matching acquire cannot be expressed, and a
//! failed classification releases its slot the same way a successful one
//! does.

use std::sync::{Arc, Condvar, Mutex};

struct GateInner {
    slots: Mutex<usize>,
    freed: Condvar,
    capacity: usize,
}

/// Counting admission gate. Cheap to clone; clones share the same slots.
#[derive(Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots. Capacity must be at least 1.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "gate capacity must be at least 1");
        Self {
            inner: Arc::new(GateInner {
                slots: Mutex::new(capacity),
                freed: Condvar::new(),
                capacity,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Currently available slots, in `[0, capacity]`.
    pub fn available(&self) -> usize {
        *lock_slots(&self.inner)
    }

    /// Block until a slot is available, then take it.
    ///
    /// There is no timeout: a permanently stuck classifier call stalls
    /// the caller, which is the poll loop's accepted failure mode.
    pub fn acquire(&self) -> GatePermit {
        let mut slots = lock_slots(&self.inner);
        while *slots == 0 {
            slots = match self.inner.freed.wait(slots) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        *slots -= 1;
        GatePermit {
            gate: Arc::clone(&self.inner),
        }
    }

    /// Take a slot if one is free, without blocking.
    ///
    /// `None` is the expected backpressure signal under load, not an
    /// error: the caller drops the frame.
    pub fn try_acquire(&self) -> Option<GatePermit> {
        let mut slots = lock_slots(&self.inner);
        if *slots == 0 {
            return None;
        }
        *slots -= 1;
        Some(GatePermit {
            gate: Arc::clone(&self.inner),
        })
    }
}

/// An occupied gate slot. Dropping the permit releases the slot.
///
/// Permits are only minted by [`AdmissionGate::acquire`] and
/// [`AdmissionGate::try_acquire`]; they cannot be constructed or
/// duplicated elsewhere, so the slot count can never exceed capacity.
pub struct GatePermit {
    gate: Arc<GateInner>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        let mut slots = lock_slots(&self.gate);
        debug_assert!(*slots < self.gate.capacity, "more releases than acquires");
        *slots += 1;
        drop(slots);
        self.gate.freed.notify_one();
    }
}

fn lock_slots(inner: &GateInner) -> std::sync::MutexGuard<'_, usize> {
    match inner.slots.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn capacity_is_respected() {
        let gate = AdmissionGate::new(2);
        assert_eq!(gate.capacity(), 2);
        assert_eq!(gate.available(), 2);

        let first = gate.try_acquire().expect("first slot");
        let second = gate.try_acquire().expect("second slot");
        assert_eq!(gate.available(), 0);
        assert!(gate.try_acquire().is_none());

        drop(first);
        assert_eq!(gate.available(), 1);
        drop(second);
        assert_eq!(gate.available(), 2);
    }

    #[test]
    fn available_never_exceeds_capacity() {
        let gate = AdmissionGate::new(2);
        for _ in 0..10 {
            let a = gate.try_acquire();
            let b = gate.try_acquire();
            drop(a);
            drop(b);
            assert_eq!(gate.available(), 2);
        }
    }

    #[test]
    fn acquire_blocks_until_a_slot_frees() {
        let gate = AdmissionGate::new(1);
        let held = gate.acquire();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let gate = gate.clone();
            thread::spawn(move || {
                let permit = gate.acquire();
                tx.send(()).unwrap();
                drop(permit);
            })
        };

        // The waiter cannot proceed while the slot is held.
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        drop(held);
        rx.recv_timeout(Duration::from_secs(2))
            .expect("waiter acquired after release");
        waiter.join().unwrap();
        assert_eq!(gate.available(), 1);
    }

    #[test]
    fn permits_release_across_threads() {
        let gate = AdmissionGate::new(2);
        let mut handles = Vec::new();
        for _ in 0..2 {
            let permit = gate.try_acquire().expect("slot");
            handles.push(thread::spawn(move || drop(permit)));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(gate.available(), 2);
    }
}
