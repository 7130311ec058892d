//! Gateway endpoint pool and the random source used to pick from it.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{GatewayError, Result};

/// Uniform random source for endpoint and route choices.
pub trait RandomSource: Send + Sync + fmt::Debug {
    /// Returns a value in `0..bound`. `bound` is never zero.
    fn next_index(&self, bound: usize) -> usize;
}

/// Draws from the thread-local generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_index(&self, bound: usize) -> usize {
        rand::thread_rng().gen_range(0..bound)
    }
}

/// Deterministic generator for reproducible runs.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_index(&self, bound: usize) -> usize {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(0..bound)
    }
}

/// Ordered, immutable list of equivalent gateway base URIs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointPool {
    endpoints: Arc<[String]>,
}

impl EndpointPool {
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a comma-separated endpoint list, skipping blank entries.
    pub fn parse_list(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|endpoint| !endpoint.is_empty()),
        )
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Picks the endpoint at `index`, or a uniformly random one.
    pub fn select(&self, index: Option<usize>, random: &dyn RandomSource) -> Result<&str> {
        if self.endpoints.is_empty() {
            return Err(GatewayError::InvalidArgument(
                "gateway endpoint pool is empty".to_owned(),
            ));
        }

        let index = index.unwrap_or_else(|| random.next_index(self.endpoints.len()));
        self.endpoints
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                GatewayError::InvalidArgument(format!(
                    "gateway endpoint index {index} out of range for pool of {}",
                    self.endpoints.len()
                ))
            })
    }
}
