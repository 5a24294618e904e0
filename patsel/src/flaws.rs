//! Plan execution in the concrete task and flaw detection.
use log::{debug, info};
use partial_ref::{partial, PartialRef};

use patsel_task::{Fact, Operator, PlanningTask, State, Var};

use crate::cegar::CegarError;
use crate::context::parts::*;
use crate::context::Context;

/// A variable blocking the execution of a projection's plan.
///
/// Raised for a violated precondition of a plan step or for a goal left
/// unsatisfied after the plan ran to completion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Flaw {
    pub collection_index: usize,
    pub var: Var,
}

pub type FlawList = Vec<Flaw>;

/// Compute the successor of a state under an operator without checking
/// applicability.
///
/// Blacklisting lets plan execution push through operators whose
/// preconditions do not hold, so the regular successor computation cannot be
/// used here. Conditional effects are still evaluated against the current
/// state.
fn unregistered_successor(state: &State, operator: &Operator) -> State {
    let mut values = state.values().to_vec();
    for effect in &operator.effects {
        if state.satisfies(&effect.conditions) {
            values[effect.fact.var.index()] = effect.fact.value;
        }
    }
    State::new(values)
}

/// Try to apply the plan of the projection in the given slot to the concrete
/// task, starting from the given state.
///
/// During application, blacklisted variables are ignored. A step succeeds if
/// any of its equivalent operators has no violated non-blacklisted
/// precondition; the first such operator is applied. If every operator of a
/// step fails, the violated precondition variables of all of them are
/// returned as flaws and execution stops.
///
/// If the plan runs to completion and reaches a concrete goal state, the
/// slot is recorded as a concrete solution when nothing is blacklisted, and
/// marked as solved otherwise. If it completes short of the goal, the
/// unsatisfied non-blacklisted goal variables are returned as flaws; when
/// blacklisting leaves none, the projection is likewise marked as solved.
pub fn apply_wildcard_plan(
    mut ctx: partial!(Context, mut CollectionP, mut SearchStateP, BlacklistP),
    task: &PlanningTask,
    goals: &[Fact],
    collection_index: usize,
    init: &State,
) -> FlawList {
    let mut flaws = FlawList::new();
    let (collection, mut ctx) = ctx.split_part_mut(CollectionP);

    let projection = match collection.get_mut(collection_index) {
        Some(projection) => projection,
        None => return flaws,
    };

    let mut current = init.clone();
    for step in projection.plan() {
        let mut step_failed = true;
        let mut step_flaws = FlawList::new();

        for &op_index in step {
            let operator = task.operator(op_index);

            // Check if the operator is applicable. If not, collect its
            // violated preconditions.
            let mut op_flaws = FlawList::new();
            for &precondition in &operator.preconditions {
                if ctx.part(BlacklistP).contains(precondition.var) {
                    continue;
                }
                if current.value(precondition.var) != precondition.value {
                    op_flaws.push(Flaw {
                        collection_index,
                        var: precondition.var,
                    });
                }
            }

            // An applicable operator settles the step; flaws gathered from
            // the operators tried before it are discarded.
            if op_flaws.is_empty() {
                step_failed = false;
                current = unregistered_successor(&current, operator);
                break;
            }
            step_flaws.append(&mut op_flaws);
        }

        // If all equivalent operators are inapplicable, stop plan execution.
        if step_failed {
            flaws.append(&mut step_flaws);
            break;
        }
    }

    if !flaws.is_empty() {
        debug!("plan of pattern {} failed", projection.pattern());
        return flaws;
    }
    debug!("plan of pattern {} executed successfully", projection.pattern());

    if task.is_goal_state(&current) {
        // Without flaws the plan still only certainly works in the concrete
        // state space if no preconditions were skipped over.
        if ctx.part(BlacklistP).is_empty() {
            debug!("no blacklisted variables, the concrete task is solved");
            ctx.part_mut(SearchStateP).concrete_solution_index = Some(collection_index);
        } else {
            debug!("blacklisted variables may invalidate the plan, marking the projection as solved");
            projection.mark_as_solved();
        }
    } else {
        for &goal in goals {
            if current.value(goal.var) != goal.value && !ctx.part(BlacklistP).contains(goal.var) {
                flaws.push(Flaw {
                    collection_index,
                    var: goal.var,
                });
            }
        }
        if flaws.is_empty() {
            debug!("no non-blacklisted goal variables left, marking the projection as solved");
            projection.mark_as_solved();
        } else {
            debug!("raising goal violation flaws");
        }
    }

    flaws
}

/// Execute every live, unsolved projection's plan in the concrete initial
/// state and collect the observed flaws, in slot order.
///
/// Returns an empty list once a plan solves the concrete task; the slot is
/// recorded in the search state. A projection without abstract solution
/// proves the concrete task unsolvable, since projection distances are
/// lower bounds.
pub fn get_flaws(
    mut ctx: partial!(Context, mut CollectionP, mut SearchStateP, BlacklistP),
    task: &PlanningTask,
    goals: &[Fact],
) -> Result<FlawList, CegarError> {
    let mut flaws = FlawList::new();
    let init = task.initial_state();

    for collection_index in 0..ctx.part(CollectionP).slot_count() {
        match ctx.part(CollectionP).get(collection_index) {
            None => continue,
            Some(projection) => {
                if projection.is_solved() {
                    continue;
                }
                if projection.is_unsolvable() {
                    info!(
                        "pattern {} has no abstract solution, the task is unsolvable",
                        projection.pattern()
                    );
                    return Err(CegarError::Unsolvable);
                }
            }
        }

        let new_flaws = apply_wildcard_plan(ctx.borrow(), task, goals, collection_index, &init);

        if ctx.part(SearchStateP).concrete_solution_index.is_some() {
            // The plan of this projection is valid in the concrete task.
            // Return no flaws to signal terminating.
            debug_assert_eq!(
                ctx.part(SearchStateP).concrete_solution_index,
                Some(collection_index)
            );
            debug_assert!(new_flaws.is_empty());
            debug_assert!(ctx.part(BlacklistP).is_empty());
            return Ok(FlawList::new());
        }
        flaws.extend(new_flaws);
    }

    Ok(flaws)
}
