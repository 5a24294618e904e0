//! Central engine data structure.
use partial_ref::{part, PartialRefTarget};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashSet;

use patsel_task::Var;

use crate::collection::ProjectionCollection;

/// Part declarations for the [`Context`] struct.
pub mod parts {
    use super::*;

    part!(pub BlacklistP: Blacklist);
    part!(pub CollectionP: ProjectionCollection);
    part!(pub RngP: EngineRng);
    part!(pub SearchStateP: SearchState);
    part!(pub SettingsP: Settings);
}

use parts::*;

/// Central engine data structure.
///
/// This struct contains all data kept by the refinement engine. Functions
/// operating on multiple fields of the context use partial references
/// provided by the `partial_ref` crate. This documents the data dependencies
/// and makes the borrow checker happy without the overhead of passing
/// individual references.
#[derive(PartialRefTarget)]
pub struct Context {
    #[part(BlacklistP)]
    pub blacklist: Blacklist,
    #[part(CollectionP)]
    pub collection: ProjectionCollection,
    #[part(RngP)]
    pub rng: EngineRng,
    #[part(SearchStateP)]
    pub search_state: SearchState,
    #[part(SettingsP)]
    pub settings: Settings,
}

impl Context {
    pub fn new(settings: Settings, seed: u64, blacklist: FxHashSet<Var>) -> Context {
        Context {
            blacklist: Blacklist { vars: blacklist },
            collection: ProjectionCollection::default(),
            rng: EngineRng {
                rng: ChaCha8Rng::seed_from_u64(seed),
            },
            search_state: SearchState::default(),
            settings,
        }
    }
}

/// Variables the engine has given up on adding to any pattern.
///
/// Blacklisted variables are ignored both while checking preconditions
/// during plan execution and while checking goals afterwards.
#[derive(Default)]
pub struct Blacklist {
    vars: FxHashSet<Var>,
}

impl Blacklist {
    pub fn contains(&self, var: Var) -> bool {
        self.vars.contains(&var)
    }

    pub fn insert(&mut self, var: Var) {
        self.vars.insert(var);
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// The blacklisted variables in ascending order.
    pub fn sorted_vars(&self) -> Vec<Var> {
        let mut vars: Vec<Var> = self.vars.iter().copied().collect();
        vars.sort_unstable();
        vars
    }
}

/// The rng threaded through plan extraction and flaw selection.
///
/// A single generator with a fixed call order keeps runs reproducible for a
/// given seed.
pub struct EngineRng {
    pub rng: ChaCha8Rng,
}

/// Fixed limits configured for a run.
///
/// The size limits gate refinements only; the initial goal-singleton
/// patterns are built regardless.
pub struct Settings {
    pub max_pdb_size: u64,
    pub max_collection_size: u64,
    pub wildcard_plans: bool,
}

/// Bookkeeping too small for a part of its own.
#[derive(Default)]
pub struct SearchState {
    /// Slot of a projection whose plan solved the concrete task.
    pub concrete_solution_index: Option<usize>,
}
