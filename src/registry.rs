//! Capacity-bounded set of running experiment names.
//!
//! The registry itself is not synchronised. The service keeps it behind a
//! single lock so the capacity check and the insert happen together.

use log::error;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ACTIVE_EXPERIMENTS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveExperiments {
    #[serde(default)]
    names: Vec<String>,
    #[serde(default = "default_capacity")]
    capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_MAX_ACTIVE_EXPERIMENTS
}

impl Default for ActiveExperiments {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ACTIVE_EXPERIMENTS)
    }
}

impl ActiveExperiments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            names: Vec::new(),
            capacity,
        }
    }

    /// Idempotent insert. A full registry refuses every add, including names
    /// it already holds, and is left untouched.
    pub fn add(&mut self, name: &str) -> bool {
        if self.names.len() >= self.capacity {
            error!(
                "Can't add experiment '{}': reached max amount of experiments ({})",
                name, self.capacity
            );
            return false;
        }
        if !self.contains(name) {
            self.names.push(name.to_string());
        }
        true
    }

    pub fn remove(&mut self, name: &str) -> bool {
        match self.names.iter().position(|n| n == name) {
            Some(i) => {
                self.names.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.names.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}
