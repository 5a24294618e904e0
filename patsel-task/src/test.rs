use proptest::{prelude::*, *};

use rand::Rng;

use crate::task::{Effect, Operator, PlanningTask};
use crate::var::{Fact, Var};

/// Generate a small random axiom-free task.
///
/// Domains, the initial state, a goal subset and the operators are all drawn
/// from the perturbation rng, so every generated task is valid by
/// construction. The task has at least one variable and at least one goal;
/// operators may carry conditional effects. Nothing guarantees that the task
/// is solvable.
pub fn planning_task(
    var_count: impl Strategy<Value = usize>,
    op_count: impl Strategy<Value = usize>,
) -> impl Strategy<Value = PlanningTask> {
    (var_count, op_count).prop_flat_map(|(var_count, op_count)| {
        collection::vec(2..5usize, var_count.max(1)).prop_perturb(move |domains, mut rng| {
            let mut task = PlanningTask::new(domains.clone());

            let initial_values = domains.iter().map(|&domain| rng.gen_range(0..domain)).collect();
            task.set_initial_values(initial_values);

            let mut goals: Vec<Fact> = vec![];
            for (index, &domain) in domains.iter().enumerate() {
                if rng.gen_bool(0.4) {
                    goals.push(Fact::new(Var::from_index(index), rng.gen_range(0..domain)));
                }
            }
            if goals.is_empty() {
                goals.push(Fact::new(Var::from_index(0), rng.gen_range(0..domains[0])));
            }
            task.set_goals(goals);

            for op_index in 0..op_count {
                let mut preconditions: Vec<Fact> = vec![];
                let mut effects: Vec<Effect> = vec![];
                for (index, &domain) in domains.iter().enumerate() {
                    let var = Var::from_index(index);
                    if rng.gen_bool(0.3) {
                        preconditions.push(Fact::new(var, rng.gen_range(0..domain)));
                    }
                    if rng.gen_bool(0.4) {
                        let conditions = if rng.gen_bool(0.2) {
                            let condition_var = Var::from_index(rng.gen_range(0..domains.len()));
                            let condition_domain = domains[condition_var.index()];
                            vec![Fact::new(condition_var, rng.gen_range(0..condition_domain))]
                        } else {
                            vec![]
                        };
                        effects.push(Effect::conditional(
                            conditions,
                            Fact::new(var, rng.gen_range(0..domain)),
                        ));
                    }
                }
                if effects.is_empty() {
                    let var = Var::from_index(rng.gen_range(0..domains.len()));
                    let domain = domains[var.index()];
                    effects.push(Effect::new(Fact::new(var, rng.gen_range(0..domain))));
                }
                task.add_operator(Operator {
                    name: format!("op{}", op_index),
                    cost: rng.gen_range(1..3),
                    preconditions,
                    effects,
                });
            }

            task
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_tasks_are_valid(task in planning_task(1..6usize, 0..8usize)) {
            prop_assert!(task.validate().is_ok());
            prop_assert!(!task.goals().is_empty());
        }
    }
}
