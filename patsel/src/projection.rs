//! Projections: a pattern database together with an abstract plan.
use std::rc::Rc;

use log::debug;
use partial_ref::{partial, PartialRef};

use patsel_task::PlanningTask;

use crate::cegar::CegarError;
use crate::context::parts::*;
use crate::context::Context;
use crate::hillclimb::extract_plan;
use crate::pattern::Pattern;
use crate::pdb::{PatternDatabase, INFINITE_DISTANCE};
use crate::projected::ProjectedTask;

/// A pattern database bundled with a wildcard plan for its projection.
///
/// Plan steps hold indices into the concrete task's operator table. An
/// `unsolvable` projection has no abstract solution and an empty plan. A
/// projection becomes `solved` when its plan executes in the concrete task
/// as far as blacklisting allows; it is then excluded from flaw detection.
pub struct Projection {
    pdb: Rc<PatternDatabase>,
    plan: Vec<Vec<usize>>,
    unsolvable: bool,
    solved: bool,
}

impl Projection {
    /// Shared handle to the pattern database.
    pub fn pdb(&self) -> &Rc<PatternDatabase> {
        &self.pdb
    }

    /// The pattern of the database.
    pub fn pattern(&self) -> &Pattern {
        self.pdb.pattern()
    }

    /// The wildcard plan, in concrete operator indices.
    pub fn plan(&self) -> &[Vec<usize>] {
        &self.plan
    }

    /// Whether the projected initial state cannot reach an abstract goal.
    pub fn is_unsolvable(&self) -> bool {
        self.unsolvable
    }

    pub fn mark_as_solved(&mut self) {
        self.solved = true;
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }
}

/// Build the projection for a pattern.
///
/// Computes the pattern database and, when the abstract initial state can
/// reach a goal, extracts a wildcard plan whose operator indices are
/// rewritten from the projection's operator numbering to the concrete
/// task's.
pub fn compute_projection(
    mut ctx: partial!(Context, mut RngP, SettingsP),
    task: &PlanningTask,
    pattern: Pattern,
) -> Result<Projection, CegarError> {
    let projected = ProjectedTask::new(task, &pattern);
    let pdb = PatternDatabase::new(&projected)?;

    if pdb.distance_of(projected.initial_values()) == INFINITE_DISTANCE {
        debug!("pattern {} has no abstract solution", pdb.pattern());
        return Ok(Projection {
            pdb: Rc::new(pdb),
            plan: vec![],
            unsolvable: true,
            solved: false,
        });
    }

    debug!("computing plan for pattern {}", pdb.pattern());
    let wildcard_plans = ctx.part(SettingsP).wildcard_plans;
    let abstract_plan = extract_plan(
        &projected,
        &pdb,
        wildcard_plans,
        &mut ctx.part_mut(RngP).rng,
    );

    let plan = abstract_plan
        .into_iter()
        .map(|step| {
            step.into_iter()
                .map(|op_index| projected.operators()[op_index].ancestor_op)
                .collect()
        })
        .collect();

    Ok(Projection {
        pdb: Rc::new(pdb),
        plan,
        unsolvable: false,
        solved: false,
    })
}
