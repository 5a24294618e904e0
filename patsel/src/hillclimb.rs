//! Abstract plan extraction by steepest ascent enforced hill climbing.
use rand::Rng;

use crate::pdb::{PatternDatabase, INFINITE_DISTANCE};
use crate::projected::ProjectedTask;

/// One plan step: operator indices that induce the same abstract transition.
pub type PlanStep = Vec<usize>;

/// An applicable operator together with the state it leads to.
struct Candidate {
    op_index: usize,
    cost: u32,
    successor: Vec<usize>,
    successor_distance: u64,
}

/// Extract a plan for the projected task, guided by its pattern database.
///
/// Starting from the abstract initial state, every step moves to an
/// applicable successor with minimal goal distance, drawing uniformly from
/// the rng when several successors are equally good. With `wildcard_plans`
/// a step contains every operator of the chosen cost that induces the chosen
/// transition; otherwise it contains the drawn operator alone.
///
/// The caller must ensure that the initial state has finite goal distance.
/// If at some state no successor strictly improves the distance (possible
/// with zero-cost operators), the plan built so far is returned; executing
/// it will surface the unreached goals as flaws.
pub fn extract_plan(
    projected: &ProjectedTask,
    pdb: &PatternDatabase,
    wildcard_plans: bool,
    rng: &mut impl Rng,
) -> Vec<PlanStep> {
    let mut values = projected.initial_values().to_vec();
    let mut distance = pdb.distance_of(&values);
    debug_assert_ne!(distance, INFINITE_DISTANCE);

    let mut plan = vec![];
    while distance > 0 {
        let mut candidates = vec![];
        let mut best = INFINITE_DISTANCE;
        for (op_index, operator) in projected.operators().iter().enumerate() {
            if !operator.is_applicable(&values) {
                continue;
            }
            let successor = operator.apply(&values);
            let successor_distance = pdb.distance_of(&successor);
            if successor_distance < best {
                best = successor_distance;
            }
            candidates.push(Candidate {
                op_index,
                cost: operator.cost,
                successor,
                successor_distance,
            });
        }

        if best >= distance {
            break;
        }
        candidates.retain(|candidate| candidate.successor_distance == best);

        let drawn = &candidates[rng.gen_range(0..candidates.len())];
        let step = if wildcard_plans {
            candidates
                .iter()
                .filter(|candidate| {
                    candidate.cost == drawn.cost && candidate.successor == drawn.successor
                })
                .map(|candidate| candidate.op_index)
                .collect()
        } else {
            vec![drawn.op_index]
        };

        values = drawn.successor.clone();
        distance = best;
        plan.push(step);
    }
    plan
}
