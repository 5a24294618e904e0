//! Pattern databases.
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use patsel_task::State;

use crate::cegar::CegarError;
use crate::pattern::Pattern;
use crate::projected::ProjectedTask;

/// Distance assigned to abstract states that cannot reach an abstract goal.
pub const INFINITE_DISTANCE: u64 = u64::MAX;

/// A complete table of abstract goal distances for one pattern.
///
/// Abstract states are ranked with a mixed-radix encoding over the pattern's
/// domains: the first pattern variable is the least significant digit. The
/// table holds, for every abstract state, the cost of a cheapest operator
/// sequence to an abstract goal state, or [`INFINITE_DISTANCE`] if no goal
/// state is reachable.
pub struct PatternDatabase {
    pattern: Pattern,
    domains: Vec<usize>,
    multipliers: Vec<usize>,
    distances: Vec<u64>,
}

impl PatternDatabase {
    /// Computes the distance table for the given projection.
    ///
    /// Fails if the abstract state space is too large to represent, which is
    /// fatal for pattern generation.
    pub fn new(projected: &ProjectedTask) -> Result<PatternDatabase, CegarError> {
        let domains = projected.domains().to_vec();
        let mut multipliers = Vec::with_capacity(domains.len());
        let mut size: usize = 1;
        for &domain in &domains {
            multipliers.push(size);
            size = size
                .checked_mul(domain)
                .ok_or_else(|| CegarError::ResourceLimit {
                    pattern: projected.pattern().clone(),
                })?;
        }

        let mut pdb = PatternDatabase {
            pattern: projected.pattern().clone(),
            domains,
            multipliers,
            distances: vec![INFINITE_DISTANCE; size],
        };
        pdb.compute_distances(projected, size);
        Ok(pdb)
    }

    /// Dijkstra from all abstract goal states over reversed transitions.
    fn compute_distances(&mut self, projected: &ProjectedTask, size: usize) {
        // Forward sweep over all abstract states to materialize the
        // reversed transition relation. Self-loops never improve distances
        // and are skipped.
        let mut predecessors: Vec<Vec<(usize, u32)>> = vec![vec![]; size];
        let mut queue = BinaryHeap::new();

        let mut values = vec![0; self.domains.len()];
        for rank in 0..size {
            for operator in projected.operators() {
                if operator.is_applicable(&values) {
                    let successor = self.rank(&operator.apply(&values));
                    if successor != rank {
                        predecessors[successor].push((rank, operator.cost));
                    }
                }
            }
            if projected.is_goal(&values) {
                self.distances[rank] = 0;
                queue.push(Reverse((0, rank)));
            }
            next_values(&mut values, &self.domains);
        }

        while let Some(Reverse((distance, rank))) = queue.pop() {
            if distance > self.distances[rank] {
                continue;
            }
            for &(predecessor, cost) in &predecessors[rank] {
                let next = distance + cost as u64;
                if next < self.distances[predecessor] {
                    self.distances[predecessor] = next;
                    queue.push(Reverse((next, predecessor)));
                }
            }
        }
    }

    /// The pattern this database belongs to.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Number of abstract states.
    pub fn size(&self) -> u64 {
        self.distances.len() as u64
    }

    /// The rank of the given abstract state values.
    #[inline]
    pub fn rank(&self, values: &[usize]) -> usize {
        debug_assert_eq!(values.len(), self.domains.len());
        values
            .iter()
            .zip(self.multipliers.iter())
            .map(|(&value, &multiplier)| value * multiplier)
            .sum()
    }

    /// Goal distance of the abstract state with the given rank.
    #[inline]
    pub fn distance(&self, rank: usize) -> u64 {
        self.distances[rank]
    }

    /// Goal distance of the given abstract state values.
    pub fn distance_of(&self, values: &[usize]) -> u64 {
        self.distance(self.rank(values))
    }

    /// Goal distance of the abstraction of a concrete state.
    pub fn distance_in(&self, state: &State) -> u64 {
        let rank = self
            .pattern
            .vars()
            .iter()
            .zip(self.multipliers.iter())
            .map(|(&var, &multiplier)| state.value(var) * multiplier)
            .sum();
        self.distance(rank)
    }
}

/// Advance a value vector to the next abstract state in rank order.
fn next_values(values: &mut [usize], domains: &[usize]) {
    for (value, &domain) in values.iter_mut().zip(domains.iter()) {
        *value += 1;
        if *value < domain {
            return;
        }
        *value = 0;
    }
}
