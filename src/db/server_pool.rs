//! Ordered pool of candidate servers.

use crate::models::ServerDescriptor;
use rand::seq::SliceRandom;

/// The candidate servers for failover, in attempt order.
///
/// The pool never mutates descriptors; only their ordering changes, and
/// only through [`ServerPool::load_balance`]. The order in effect when a
/// connect attempt starts is the order that attempt walks.
#[derive(Debug, Clone)]
pub struct ServerPool {
    servers: Vec<ServerDescriptor>,
}

impl ServerPool {
    /// Create a pool from an ordered descriptor list.
    pub fn new(servers: Vec<ServerDescriptor>) -> Self {
        Self { servers }
    }

    /// Uniform random in-place shuffle of the attempt order.
    ///
    /// Does not touch any live connection; only the next connect attempt
    /// sees the new order.
    pub fn load_balance(&mut self) {
        self.servers.shuffle(&mut rand::thread_rng());
    }

    /// Descriptors in current attempt order.
    pub fn descriptors(&self) -> &[ServerDescriptor] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of(n: usize) -> ServerPool {
        ServerPool::new(
            (0..n)
                .map(|i| ServerDescriptor::local(format!("db{i}"), format!("/data/db{i}.sqlite")))
                .collect(),
        )
    }

    #[test]
    fn test_load_balance_is_a_permutation() {
        let mut pool = pool_of(8);
        let mut before: Vec<_> = pool.descriptors().to_vec();
        pool.load_balance();
        let mut after: Vec<_> = pool.descriptors().to_vec();
        assert_eq!(after.len(), 8);

        let key = |d: &ServerDescriptor| (d.host.clone(), d.database.clone());
        before.sort_by_key(key);
        after.sort_by_key(key);
        assert_eq!(before, after);
    }

    #[test]
    fn test_load_balance_empty_pool() {
        let mut pool = pool_of(0);
        pool.load_balance();
        assert!(pool.is_empty());
    }
}
