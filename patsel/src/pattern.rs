//! Patterns and pattern collections.
use std::fmt;
use std::rc::Rc;

use patsel_task::Var;

use crate::pdb::PatternDatabase;

/// A set of task variables, kept sorted and free of duplicates.
///
/// Projecting a task onto a pattern forgets every variable outside of it.
/// Because the variable sequence is canonical, patterns compare equal iff
/// they contain the same variables.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pattern {
    vars: Vec<Var>,
}

impl Pattern {
    /// Creates a pattern from the given variables, in any order.
    pub fn new(mut vars: Vec<Var>) -> Pattern {
        vars.sort_unstable();
        vars.dedup();
        Pattern { vars }
    }

    /// Creates a pattern containing a single variable.
    pub fn singleton(var: Var) -> Pattern {
        Pattern { vars: vec![var] }
    }

    /// Number of variables in the pattern.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the pattern contains no variables.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// The pattern's variables in ascending order.
    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// Whether the pattern contains the given variable.
    pub fn contains(&self, var: Var) -> bool {
        self.vars.binary_search(&var).is_ok()
    }

    /// Position of the variable within the pattern, if present.
    ///
    /// This is the variable's index in the projected task.
    pub fn position(&self, var: Var) -> Option<usize> {
        self.vars.binary_search(&var).ok()
    }

    /// The union of two patterns.
    pub fn union(&self, other: &Pattern) -> Pattern {
        let mut vars = self.vars.clone();
        vars.extend_from_slice(&other.vars);
        Pattern::new(vars)
    }

    /// The pattern extended by one variable.
    pub fn with_var(&self, var: Var) -> Pattern {
        let mut vars = self.vars.clone();
        vars.push(var);
        Pattern::new(vars)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.vars.iter()).finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The result of pattern generation: patterns paired with their databases.
///
/// The databases are shared handles, so the collection stays valid after the
/// engine that produced it is dropped.
pub struct PatternCollection {
    patterns: Vec<Pattern>,
    pdbs: Vec<Rc<PatternDatabase>>,
}

impl PatternCollection {
    /// Creates a collection from matching pattern and database sequences.
    pub(crate) fn from_parts(
        patterns: Vec<Pattern>,
        pdbs: Vec<Rc<PatternDatabase>>,
    ) -> PatternCollection {
        debug_assert_eq!(patterns.len(), pdbs.len());
        PatternCollection { patterns, pdbs }
    }

    /// Number of patterns in the collection.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the collection contains no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The patterns of the collection.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// The pattern databases, in the same order as the patterns.
    pub fn pdbs(&self) -> &[Rc<PatternDatabase>] {
        &self.pdbs
    }

    /// Iterator over pattern and database pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Pattern, &Rc<PatternDatabase>)> {
        self.patterns.iter().zip(self.pdbs.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use patsel_task::vars;

    #[test]
    fn new_sorts_and_dedups() {
        let pattern = Pattern::new(vars![3, 1, 3, 0].to_vec());
        assert_eq!(pattern.vars(), &vars![0, 1, 3]);
    }

    #[test]
    fn patterns_compare_as_sets() {
        assert_eq!(
            Pattern::new(vars![2, 0].to_vec()),
            Pattern::new(vars![0, 2].to_vec())
        );
    }

    #[test]
    fn position_matches_projected_numbering() {
        let pattern = Pattern::new(vars![1, 4, 6].to_vec());
        assert_eq!(pattern.position(patsel_task::var!(4)), Some(1));
        assert_eq!(pattern.position(patsel_task::var!(5)), None);
    }

    #[test]
    fn union_is_sorted() {
        let left = Pattern::new(vars![5, 0].to_vec());
        let right = Pattern::new(vars![2, 5].to_vec());
        assert_eq!(left.union(&right).vars(), &vars![0, 2, 5]);
    }

    #[test]
    fn display_lists_vars() {
        assert_eq!(Pattern::new(vars![1, 0].to_vec()).to_string(), "[0, 1]");
    }
}
