//! Lease-based checkout of capture devices.
//!
//! The sniffer pool is a fixed arena of device slots. Channels are
//! assigned to devices by position; a checked-out slot is owned by its
//! lease and returns to the pool when the lease drops, so two rows can
//! never double-assign a device.

use std::sync::{Arc, Mutex};

use faraday_common::SnifferDevice;

#[derive(Debug)]
pub struct SnifferPool {
    devices: Vec<SnifferDevice>,
    in_use: Mutex<Vec<bool>>,
}

impl SnifferPool {
    pub fn new(devices: Vec<SnifferDevice>) -> Arc<Self> {
        let in_use = Mutex::new(vec![false; devices.len()]);
        Arc::new(Self { devices, in_use })
    }

    /// Check out the lowest-index free device, or `None` when the pool is
    /// exhausted (the caller logs and skips that channel).
    pub fn checkout(self: &Arc<Self>) -> Option<SnifferLease> {
        let mut in_use = self.in_use.lock().unwrap();
        let index = in_use.iter().position(|used| !used)?;
        in_use[index] = true;
        Some(SnifferLease {
            pool: Arc::clone(self),
            index,
        })
    }

    pub fn available(&self) -> usize {
        self.in_use.lock().unwrap().iter().filter(|u| !**u).count()
    }

    fn checkin(&self, index: usize) {
        self.in_use.lock().unwrap()[index] = false;
    }
}

/// Exclusive ownership of one pool slot for the lease's lifetime.
#[derive(Debug)]
pub struct SnifferLease {
    pool: Arc<SnifferPool>,
    index: usize,
}

impl SnifferLease {
    pub fn device(&self) -> &SnifferDevice {
        &self.pool.devices[self.index]
    }
}

impl Drop for SnifferLease {
    fn drop(&mut self) {
        self.pool.checkin(self.index);
    }
}
