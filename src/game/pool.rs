//! Draw Pool
//!
//! Bag of undealt card identifiers for one room. Draws are uniform and
//! without replacement; the pool only ever shrinks during a game.

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;

/// Draw pool errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Nothing left to draw.
    #[error("Draw pool is empty")]
    Empty,

    /// More items requested than remain.
    #[error("Requested {requested} items but only {available} remain")]
    Insufficient {
        /// Items requested.
        requested: usize,
        /// Items remaining.
        available: usize,
    },
}

/// Remaining card identifiers of one kind (regions or sanctuaries).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawPool {
    items: Vec<u32>,
}

impl DrawPool {
    /// Create a pool holding the given identifiers.
    pub fn new(items: impl IntoIterator<Item = u32>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    /// Remove and return one uniformly random identifier.
    pub fn draw(&mut self, rng: &mut DeterministicRng) -> Result<u32, PoolError> {
        if self.items.is_empty() {
            return Err(PoolError::Empty);
        }
        let index = rng.next_index(self.items.len());
        Ok(self.items.remove(index))
    }

    /// Draw `n` distinct identifiers by repeated single draws.
    ///
    /// Each draw samples the already-shrunk pool.
    pub fn draw_many(
        &mut self,
        rng: &mut DeterministicRng,
        n: usize,
    ) -> Result<Vec<u32>, PoolError> {
        if n > self.items.len() {
            return Err(PoolError::Insufficient {
                requested: n,
                available: self.items.len(),
            });
        }
        (0..n).map(|_| self.draw(rng)).collect()
    }

    /// Draw up to `n` identifiers, stopping early when the pool runs dry.
    pub fn draw_up_to(&mut self, rng: &mut DeterministicRng, n: usize) -> Vec<u32> {
        let n = n.min(self.items.len());
        let mut drawn = Vec::with_capacity(n);
        while drawn.len() < n {
            match self.draw(rng) {
                Ok(id) => drawn.push(id),
                Err(_) => break,
            }
        }
        drawn
    }

    /// Remaining item count.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing is left.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `id` is still undealt.
    pub fn contains(&self, id: u32) -> bool {
        self.items.contains(&id)
    }

    /// Remaining identifiers in pool order.
    pub fn as_slice(&self) -> &[u32] {
        &self.items
    }
}
