//! Planning tasks in finite-domain representation.
use std::fmt;

use thiserror::Error;

use crate::state::State;
use crate::var::{Fact, Var};

/// Possible errors for ill-formed tasks.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("initial state assigns {found} variables, task has {expected}")]
    InitialStateLength { expected: usize, found: usize },
    #[error("variable {var} out of range, task has {var_count} variables")]
    VarOutOfRange { var: Var, var_count: usize },
    #[error("value {value} out of range for variable {var} with domain size {domain}")]
    ValueOutOfRange {
        var: Var,
        value: usize,
        domain: usize,
    },
    #[error("operator '{name}' has two preconditions on variable {var}")]
    DuplicatePrecondition { name: String, var: Var },
    #[error("task has two goals on variable {var}")]
    DuplicateGoal { var: Var },
}

/// An effect of an operator, optionally guarded by conditions.
///
/// When the operator is applied in a state, the effect fires iff all of its
/// conditions hold in that state; firing assigns `fact.value` to `fact.var`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Effect {
    pub conditions: Vec<Fact>,
    pub fact: Fact,
}

impl Effect {
    /// Creates an effect that always fires.
    pub fn new(fact: Fact) -> Effect {
        Effect {
            conditions: vec![],
            fact,
        }
    }

    /// Creates an effect guarded by the given conditions.
    pub fn conditional(conditions: Vec<Fact>, fact: Fact) -> Effect {
        Effect { conditions, fact }
    }
}

/// A planning operator.
///
/// Preconditions are a conjunction of facts with at most one fact per
/// variable. Effects may carry conditions, making the operator a conditional
/// effect operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operator {
    pub name: String,
    pub cost: u32,
    pub preconditions: Vec<Fact>,
    pub effects: Vec<Effect>,
}

impl Operator {
    /// Whether every precondition holds in the given state.
    pub fn is_applicable(&self, state: &State) -> bool {
        state.satisfies(&self.preconditions)
    }
}

/// An axiom-free planning task.
///
/// A task consists of finite-domain variables, an initial state, a goal
/// conjunction and a table of operators. Operators are referenced by their
/// index in that table throughout the pattern selection crates.
#[derive(Clone, Debug)]
pub struct PlanningTask {
    domains: Vec<usize>,
    initial_values: Vec<usize>,
    goals: Vec<Fact>,
    operators: Vec<Operator>,
}

impl PlanningTask {
    /// Creates a task with the given domain sizes and no goals or operators.
    ///
    /// The initial state defaults to assigning 0 to every variable.
    pub fn new(domains: Vec<usize>) -> PlanningTask {
        let initial_values = vec![0; domains.len()];
        PlanningTask {
            domains,
            initial_values,
            goals: vec![],
            operators: vec![],
        }
    }

    /// Number of variables in the task.
    pub fn var_count(&self) -> usize {
        self.domains.len()
    }

    /// Domain size of a variable.
    #[inline]
    pub fn domain(&self, var: Var) -> usize {
        self.domains[var.index()]
    }

    /// Replaces the initial state values.
    pub fn set_initial_values(&mut self, values: Vec<usize>) {
        self.initial_values = values;
    }

    /// Replaces the goal conjunction.
    ///
    /// Goals are kept sorted by variable.
    pub fn set_goals(&mut self, mut goals: Vec<Fact>) {
        goals.sort_unstable();
        self.goals = goals;
    }

    /// Appends an operator and returns its index in the operator table.
    pub fn add_operator(&mut self, operator: Operator) -> usize {
        self.operators.push(operator);
        self.operators.len() - 1
    }

    /// The initial state.
    pub fn initial_state(&self) -> State {
        State::new(self.initial_values.clone())
    }

    /// The goal conjunction, sorted by variable.
    pub fn goals(&self) -> &[Fact] {
        &self.goals
    }

    /// All operators of the task.
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// The operator at the given index of the operator table.
    #[inline]
    pub fn operator(&self, index: usize) -> &Operator {
        &self.operators[index]
    }

    /// Whether the state satisfies the full goal conjunction.
    pub fn is_goal_state(&self, state: &State) -> bool {
        state.satisfies(&self.goals)
    }

    /// Checks that all indices and values are within range and that
    /// preconditions and goals mention each variable at most once.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.initial_values.len() != self.domains.len() {
            return Err(TaskError::InitialStateLength {
                expected: self.domains.len(),
                found: self.initial_values.len(),
            });
        }
        for (index, &value) in self.initial_values.iter().enumerate() {
            self.check_fact(Fact::new(Var::from_index(index), value))?;
        }

        let mut previous_goal_var = None;
        for &goal in &self.goals {
            self.check_fact(goal)?;
            if previous_goal_var == Some(goal.var) {
                return Err(TaskError::DuplicateGoal { var: goal.var });
            }
            previous_goal_var = Some(goal.var);
        }

        for operator in &self.operators {
            let mut seen = vec![false; self.domains.len()];
            for &precondition in &operator.preconditions {
                self.check_fact(precondition)?;
                if seen[precondition.var.index()] {
                    return Err(TaskError::DuplicatePrecondition {
                        name: operator.name.clone(),
                        var: precondition.var,
                    });
                }
                seen[precondition.var.index()] = true;
            }
            for effect in &operator.effects {
                self.check_fact(effect.fact)?;
                for &condition in &effect.conditions {
                    self.check_fact(condition)?;
                }
            }
        }
        Ok(())
    }

    fn check_fact(&self, fact: Fact) -> Result<(), TaskError> {
        if fact.var.index() >= self.domains.len() {
            return Err(TaskError::VarOutOfRange {
                var: fact.var,
                var_count: self.domains.len(),
            });
        }
        let domain = self.domains[fact.var.index()];
        if fact.value >= domain {
            return Err(TaskError::ValueOutOfRange {
                var: fact.var,
                value: fact.value,
                domain,
            });
        }
        Ok(())
    }
}

impl fmt::Display for PlanningTask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "task with {} variables and {} operators",
            self.var_count(),
            self.operators.len()
        )
    }
}
