//! Per-backend admission gate.
//!
//! # Responsibilities
//! - Cap the number of in-flight proxied requests to one backend
//! - Refuse instantly when the cap is reached (never wait)
//! - Release the slot exactly once, on every exit path
//!
//! # Design Decisions
//! - Lock-free counter with compare-and-swap; the count can never exceed capacity
//! - Release is tied to `Drop` of the permit, so errors, panics and cancelled
//!   futures all give the slot back

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// A bounded, non-blocking counting gate scoped to one backend.
#[derive(Debug)]
pub struct AdmissionGate {
    /// Backend routing key, used as metrics label.
    backend: String,
    /// Maximum number of permits outstanding at once.
    capacity: usize,
    /// Number of permits currently held.
    in_flight: AtomicUsize,
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots for the named backend.
    pub fn new(backend: impl Into<String>, capacity: usize) -> Self {
        Self {
            backend: backend.into(),
            capacity,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Try to take a slot. Returns `None` immediately when the gate is full.
    pub fn try_acquire(self: &Arc<Self>) -> Option<AdmissionPermit> {
        let mut held = self.in_flight.load(Ordering::Acquire);
        loop {
            if held >= self.capacity {
                return None;
            }
            match self.in_flight.compare_exchange_weak(
                held,
                held + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => held = actual,
            }
        }
        metrics::backend_slot_acquired(&self.backend);
        Some(AdmissionPermit {
            gate: Arc::clone(self),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Number of slots still free.
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.in_flight())
    }

    fn release(&self) {
        let previous = self.in_flight.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "admission gate released more than acquired");
        metrics::backend_slot_released(&self.backend);
    }
}

/// A held admission slot. The slot is given back when this is dropped.
#[derive(Debug)]
pub struct AdmissionPermit {
    gate: Arc<AdmissionGate>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
