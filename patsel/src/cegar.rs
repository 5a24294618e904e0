//! CEGAR pattern collection generation.
//!
//! The engine seeds one singleton pattern per goal variable, then
//! alternates between flaw detection and refinement: each projection's
//! abstract plan is executed in the concrete task, execution failures
//! become flaws, and one flaw drawn at random is repaired by growing a
//! pattern or merging two patterns within the configured size limits.
//! Variables that cannot be added without breaking a limit are blacklisted.
//! The loop stops on the refinement or time limit, when no flaws remain, or
//! as soon as some plan turns out to solve the concrete task outright.
use log::{debug, info};
use partial_ref::{partial, IntoPartialRefMut, PartialRef};
use thiserror::Error;

use patsel_task::{Fact, PlanningTask, Var};

use crate::context::parts::*;
use crate::context::{Context, Settings};
use crate::flaws::get_flaws;
use crate::limits::CountdownTimer;
use crate::pattern::{Pattern, PatternCollection};
use crate::projection::compute_projection;
use crate::refine::refine;

/// Errors that abort pattern generation.
#[derive(Debug, Error)]
pub enum CegarError {
    /// Some pattern has no abstract solution. Projection distances are
    /// admissible lower bounds, so the concrete task has no solution either.
    #[error("task is unsolvable")]
    Unsolvable,
    /// A pattern database was too large to represent.
    #[error("pattern database for pattern {pattern} is too large to represent")]
    ResourceLimit { pattern: Pattern },
    /// A configured goal fact is not a goal of the task.
    #[error("{fact} is not a goal fact of the task")]
    InvalidGoal { fact: Fact },
}

/// Configuration for [`Cegar`].
pub struct CegarConfig {
    /// Upper bound on the number of refinements. `usize::MAX` disables the
    /// bound.
    pub max_refinements: usize,
    /// Maximum number of abstract states in a single pattern database.
    ///
    /// Not applied to the initial goal-singleton patterns.
    pub max_pdb_size: u64,
    /// Maximum summed number of abstract states across all databases of the
    /// collection. `u64::MAX` disables the bound. Not applied to the initial
    /// goal-singleton patterns.
    pub max_collection_size: u64,
    /// Extract wildcard plans rather than plans with one operator per step.
    pub wildcard_plans: bool,
    /// Wall clock budget in seconds. Non-finite values disable the budget.
    pub max_time: f64,
    /// Seed for the rng driving flaw selection and plan extraction
    /// tie-breaks. Fixing the seed, the task and the limits fixes the
    /// output.
    pub seed: u64,
    /// Variables the engine must never add to a pattern.
    pub blacklist: Vec<Var>,
}

impl Default for CegarConfig {
    fn default() -> CegarConfig {
        CegarConfig {
            max_refinements: usize::MAX,
            max_pdb_size: 1_000_000,
            max_collection_size: u64::MAX,
            wildcard_plans: true,
            max_time: f64::INFINITY,
            seed: 0,
            blacklist: vec![],
        }
    }
}

/// CEGAR pattern collection generator.
pub struct Cegar<'a> {
    task: &'a PlanningTask,
    goals: Vec<Fact>,
    max_refinements: usize,
    max_time: f64,
    ctx: Box<Context>,
}

impl<'a> Cegar<'a> {
    /// Create a generator for the given goal facts of the task.
    ///
    /// `goals` selects the goal facts to seed the collection from and to
    /// check after plan execution; it is usually the task's full goal. In
    /// debug builds, a fact outside of the task's goal is rejected.
    pub fn new(
        task: &'a PlanningTask,
        goals: Vec<Fact>,
        config: CegarConfig,
    ) -> Result<Cegar<'a>, CegarError> {
        if cfg!(debug_assertions) {
            for &fact in &goals {
                if !task.goals().contains(&fact) {
                    return Err(CegarError::InvalidGoal { fact });
                }
            }
        }

        let settings = Settings {
            max_pdb_size: config.max_pdb_size,
            max_collection_size: config.max_collection_size,
            wildcard_plans: config.wildcard_plans,
        };
        let blacklist = config.blacklist.iter().copied().collect();

        Ok(Cegar {
            task,
            goals,
            max_refinements: config.max_refinements,
            max_time: config.max_time,
            ctx: Box::new(Context::new(settings, config.seed, blacklist)),
        })
    }

    /// Run refinement to completion and assemble the final collection.
    ///
    /// Returns a single pattern when some plan solved the concrete task,
    /// and otherwise one pattern per live slot at termination.
    pub fn run(self) -> Result<PatternCollection, CegarError> {
        let Cegar {
            task,
            goals,
            max_refinements,
            max_time,
            mut ctx,
        } = self;
        assert!(!goals.is_empty(), "pattern generation needs at least one goal fact");
        let mut ctx = ctx.into_partial_ref_mut();

        let timer = CountdownTimer::new(max_time);
        log_options(ctx.borrow(), max_refinements, max_time);

        compute_initial_collection(ctx.borrow(), task, &goals)?;

        let mut refinements = 0;
        loop {
            if time_limit_reached(&timer) {
                break;
            }
            if refinements == max_refinements {
                info!("maximum allowed number of refinements reached");
                break;
            }
            debug!("iteration #{}", refinements + 1);

            let flaws = get_flaws(ctx.borrow(), task, &goals)?;
            if flaws.is_empty() {
                if ctx.part(SearchStateP).concrete_solution_index.is_some() {
                    info!("task solved during computation of the collection");
                } else {
                    info!("flaw list is empty, no further refinements possible");
                }
                break;
            }

            if time_limit_reached(&timer) {
                break;
            }

            refine(ctx.borrow(), task, &flaws)?;
            refinements += 1;

            debug!(
                "current collection size: {}",
                ctx.part(CollectionP).collection_size()
            );
            debug!("current collection: {}", ctx.part(CollectionP));
            debug_assert!(ctx.part(CollectionP).is_consistent());
        }

        let collection = ctx.part(CollectionP);
        let mut patterns = vec![];
        let mut pdbs = vec![];
        match ctx.part(SearchStateP).concrete_solution_index {
            Some(index) => {
                if let Some(projection) = collection.get(index) {
                    patterns.push(projection.pattern().clone());
                    pdbs.push(projection.pdb().clone());
                }
            }
            None => {
                for (_, projection) in collection.live() {
                    patterns.push(projection.pattern().clone());
                    pdbs.push(projection.pdb().clone());
                }
            }
        }

        info!("computation time: {:?}", timer.elapsed());
        info!("number of iterations: {}", refinements);
        info!("final collection: {}", collection);
        info!("final collection number of patterns: {}", patterns.len());
        info!(
            "final collection summed PDB sizes: {}",
            collection.collection_size()
        );

        Ok(PatternCollection::from_parts(patterns, pdbs))
    }
}

/// Generate a pattern collection for all goal facts of the task.
pub fn generate_pattern_collection(
    task: &PlanningTask,
    config: CegarConfig,
) -> Result<PatternCollection, CegarError> {
    Cegar::new(task, task.goals().to_vec(), config)?.run()
}

fn log_options(
    ctx: partial!(Context, BlacklistP, SettingsP),
    max_refinements: usize,
    max_time: f64,
) {
    let settings = ctx.part(SettingsP);
    info!("options of the CEGAR pattern collection generator:");
    info!("max refinements: {}", max_refinements);
    info!("max pdb size: {}", settings.max_pdb_size);
    info!("max collection size: {}", settings.max_collection_size);
    info!("wildcard plans: {}", settings.wildcard_plans);
    info!("max time: {}", max_time);
    let blacklist = ctx.part(BlacklistP).sorted_vars();
    if blacklist.is_empty() {
        info!("blacklisted variables: none");
    } else {
        let vars: Vec<String> = blacklist.iter().map(|var| var.to_string()).collect();
        info!("blacklisted variables: {}", vars.join(", "));
    }
}

/// Seed the collection with one singleton pattern per goal variable.
///
/// The size limits are not applied here: goal variables must be
/// representable, however large their domains.
fn compute_initial_collection(
    mut ctx: partial!(Context, mut CollectionP, mut RngP, SettingsP),
    task: &PlanningTask,
    goals: &[Fact],
) -> Result<(), CegarError> {
    debug_assert!(!goals.is_empty());
    for &goal in goals {
        add_pattern_for_var(ctx.borrow(), task, goal.var)?;
    }
    debug!("initial collection: {}", ctx.part(CollectionP));
    Ok(())
}

fn add_pattern_for_var(
    mut ctx: partial!(Context, mut CollectionP, mut RngP, SettingsP),
    task: &PlanningTask,
    var: Var,
) -> Result<(), CegarError> {
    let projection = compute_projection(ctx.borrow(), task, Pattern::singleton(var))?;
    ctx.part_mut(CollectionP).push(projection);
    Ok(())
}

fn time_limit_reached(timer: &CountdownTimer) -> bool {
    if timer.is_expired() {
        info!("time limit reached");
        return true;
    }
    false
}
