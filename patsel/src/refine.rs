//! Refining the collection in response to a flaw.
use log::debug;
use partial_ref::{partial, PartialRef};
use rand::Rng;

use patsel_task::{PlanningTask, Var};

use crate::cegar::CegarError;
use crate::context::parts::*;
use crate::context::Context;
use crate::flaws::Flaw;
use crate::limits::is_product_within_limit;
use crate::projection::compute_projection;

/// Whether merging the projections in the two slots respects both size
/// limits.
///
/// The merged database has the product of the two sizes; the collection
/// grows by the product minus the two sizes it replaces.
fn can_merge_patterns(
    ctx: partial!(Context, CollectionP, SettingsP),
    index1: usize,
    index2: usize,
) -> bool {
    let collection = ctx.part(CollectionP);
    let settings = ctx.part(SettingsP);
    let (size1, size2) = match (collection.get(index1), collection.get(index2)) {
        (Some(projection1), Some(projection2)) => {
            (projection1.pdb().size(), projection2.pdb().size())
        }
        _ => return false,
    };

    if !is_product_within_limit(size1, size2, settings.max_pdb_size) {
        return false;
    }
    let added_size = size1 as i128 * size2 as i128 - size1 as i128 - size2 as i128;
    collection.collection_size() as i128 + added_size <= settings.max_collection_size as i128
}

/// Merge the projection in the second slot into the one in the first.
///
/// The merged projection is rebuilt from scratch for the union pattern. The
/// second slot is tombstoned and its variables are taken over by the first.
fn merge_patterns(
    mut ctx: partial!(Context, mut CollectionP, mut RngP, SettingsP),
    task: &PlanningTask,
    index1: usize,
    index2: usize,
) -> Result<(), CegarError> {
    let new_pattern = {
        let collection = ctx.part(CollectionP);
        match (collection.get(index1), collection.get(index2)) {
            (Some(projection1), Some(projection2)) => {
                projection1.pattern().union(projection2.pattern())
            }
            _ => return Ok(()),
        }
    };

    let merged = compute_projection(ctx.borrow(), task, new_pattern)?;

    let collection = ctx.part_mut(CollectionP);
    collection.tombstone(index2);
    collection.replace(index1, merged);
    Ok(())
}

/// Whether extending the slot's pattern by the variable respects both size
/// limits.
fn can_add_variable_to_pattern(
    ctx: partial!(Context, CollectionP, SettingsP),
    task: &PlanningTask,
    index: usize,
    var: Var,
) -> bool {
    let collection = ctx.part(CollectionP);
    let settings = ctx.part(SettingsP);
    let size = match collection.get(index) {
        Some(projection) => projection.pdb().size(),
        None => return false,
    };
    let domain = task.domain(var) as u64;

    if !is_product_within_limit(size, domain, settings.max_pdb_size) {
        return false;
    }
    let added_size = size as u128 * domain as u128 - size as u128;
    collection.collection_size() as u128 + added_size <= settings.max_collection_size as u128
}

fn add_variable_to_pattern(
    mut ctx: partial!(Context, mut CollectionP, mut RngP, SettingsP),
    task: &PlanningTask,
    index: usize,
    var: Var,
) -> Result<(), CegarError> {
    let new_pattern = {
        match ctx.part(CollectionP).get(index) {
            Some(projection) => projection.pattern().with_var(var),
            None => return Ok(()),
        }
    };

    let projection = compute_projection(ctx.borrow(), task, new_pattern)?;
    ctx.part_mut(CollectionP).replace(index, projection);
    Ok(())
}

/// Repair the given flaw.
///
/// If the flawed variable already belongs to another live pattern, the two
/// patterns are merged; otherwise the variable is added to the flawed
/// pattern. When the size limits forbid either, the variable is blacklisted
/// and the collection is left untouched.
pub fn handle_flaw(
    mut ctx: partial!(Context, mut BlacklistP, mut CollectionP, mut RngP, SettingsP),
    task: &PlanningTask,
    flaw: Flaw,
) -> Result<(), CegarError> {
    let Flaw {
        collection_index,
        var,
    } = flaw;

    let mut added_var = false;
    match ctx.part(CollectionP).projection_of_var(var) {
        Some(other_index) => {
            // The variable is covered by another pattern of the collection.
            debug_assert_ne!(other_index, collection_index);
            debug!("variable {} is already in another pattern", var);
            if can_merge_patterns(ctx.borrow(), collection_index, other_index) {
                debug!("merging the two patterns");
                merge_patterns(ctx.borrow(), task, collection_index, other_index)?;
                added_var = true;
            }
        }
        None => {
            debug!("variable {} is not in the collection yet", var);
            if can_add_variable_to_pattern(ctx.borrow(), task, collection_index, var) {
                debug!("adding it to the pattern");
                add_variable_to_pattern(ctx.borrow(), task, collection_index, var)?;
                added_var = true;
            }
        }
    }

    if !added_var {
        debug!("size limits prevent refining for variable {}, blacklisting it", var);
        ctx.part_mut(BlacklistP).insert(var);
    }
    Ok(())
}

/// Choose one flaw uniformly at random and repair it.
pub fn refine(
    mut ctx: partial!(Context, mut BlacklistP, mut CollectionP, mut RngP, SettingsP),
    task: &PlanningTask,
    flaws: &[Flaw],
) -> Result<(), CegarError> {
    debug_assert!(!flaws.is_empty());
    let chosen = ctx.part_mut(RngP).rng.gen_range(0..flaws.len());
    let flaw = flaws[chosen];
    debug!(
        "chosen flaw: variable {} in the pattern of slot {}",
        flaw.var, flaw.collection_index
    );
    handle_flaw(ctx.borrow(), task, flaw)
}
