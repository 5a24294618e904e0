//! SAS+ task parser for the patsel pattern selection crates.
//!
//! Reads the translator output format of classical planners (`output.sas`,
//! format version 3): finite-domain variables, mutex groups, an initial
//! state, a goal conjunction and operators with prevail conditions and
//! conditional pre/post effects. Mutex groups are parsed but discarded, as
//! pattern selection has no use for them. Tasks containing axioms or derived
//! variables are rejected, the pattern selection crates require axiom-free
//! tasks.

use std::io;

use anyhow::Error;
use thiserror::Error;

use patsel_task::{Effect, Fact, Operator, PlanningTask, TaskError, Var};

/// Possible errors while parsing a SAS+ task.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("line {line}: expected '{expected}', found '{found}'")]
    UnexpectedInput {
        line: usize,
        expected: String,
        found: String,
    },
    #[error("line {line}: expected an integer, found '{found}'")]
    ExpectedInt { line: usize, found: String },
    #[error("line {line}: unsupported SAS format version {version}, only version 3 is supported")]
    UnsupportedVersion { line: usize, version: String },
    #[error("line {line}: variable '{name}' is derived, axioms are not supported")]
    DerivedVariable { line: usize, name: String },
    #[error("line {line}: axioms are not supported")]
    AxiomsUnsupported { line: usize },
    #[error("line {line}: error reading input: {source}")]
    IoError { line: usize, source: io::Error },
    #[error("unexpected end of input at line {line}")]
    UnexpectedEof { line: usize },
    #[error("invalid task: {0}")]
    InvalidTask(#[from] TaskError),
}

/// Parser for SAS+ task files.
pub struct SasParser;

impl SasParser {
    /// Parse the given input into a validated [`PlanningTask`].
    pub fn parse(input: impl io::Read) -> Result<PlanningTask, Error> {
        let reader = SasReader {
            input: io::BufReader::new(input),
            line_number: 0,
        };
        Ok(reader.parse_task()?)
    }
}

struct SasReader<R> {
    input: R,
    line_number: usize,
}

impl<R: io::BufRead> SasReader<R> {
    fn parse_task(mut self) -> Result<PlanningTask, ParserError> {
        self.expect("begin_version")?;
        let version = self.next_line()?;
        if version != "3" {
            return Err(ParserError::UnsupportedVersion {
                line: self.line_number,
                version,
            });
        }
        self.expect("end_version")?;

        self.expect("begin_metric")?;
        let use_costs = self.read_int()? != 0;
        self.expect("end_metric")?;

        let var_count = self.read_int()?;
        let mut domains = Vec::with_capacity(var_count);
        for _ in 0..var_count {
            domains.push(self.parse_variable()?);
        }
        let mut task = PlanningTask::new(domains);

        let mutex_group_count = self.read_int()?;
        for _ in 0..mutex_group_count {
            self.parse_mutex_group()?;
        }

        self.expect("begin_state")?;
        let mut initial_values = Vec::with_capacity(var_count);
        for _ in 0..var_count {
            initial_values.push(self.read_int()?);
        }
        self.expect("end_state")?;
        task.set_initial_values(initial_values);

        self.expect("begin_goal")?;
        let goal_count = self.read_int()?;
        let mut goals = Vec::with_capacity(goal_count);
        for _ in 0..goal_count {
            goals.push(self.read_fact()?);
        }
        self.expect("end_goal")?;
        task.set_goals(goals);

        let operator_count = self.read_int()?;
        for _ in 0..operator_count {
            let operator = self.parse_operator(use_costs)?;
            task.add_operator(operator);
        }

        let axiom_count = self.read_int()?;
        if axiom_count != 0 {
            return Err(ParserError::AxiomsUnsupported {
                line: self.line_number,
            });
        }

        task.validate()?;
        Ok(task)
    }

    /// Parse one variable section and return its domain size.
    fn parse_variable(&mut self) -> Result<usize, ParserError> {
        self.expect("begin_variable")?;
        let name = self.next_line()?;
        let axiom_layer = self.next_line()?;
        if axiom_layer != "-1" {
            return Err(ParserError::DerivedVariable {
                line: self.line_number,
                name,
            });
        }
        let domain = self.read_int()?;
        // One value name per domain entry, unused here.
        for _ in 0..domain {
            self.next_line()?;
        }
        self.expect("end_variable")?;
        Ok(domain)
    }

    fn parse_mutex_group(&mut self) -> Result<(), ParserError> {
        self.expect("begin_mutex_group")?;
        let fact_count = self.read_int()?;
        for _ in 0..fact_count {
            self.read_fact()?;
        }
        self.expect("end_mutex_group")?;
        Ok(())
    }

    fn parse_operator(&mut self, use_costs: bool) -> Result<Operator, ParserError> {
        self.expect("begin_operator")?;
        let name = self.next_line()?;

        let mut preconditions = vec![];
        let prevail_count = self.read_int()?;
        for _ in 0..prevail_count {
            preconditions.push(self.read_fact()?);
        }

        let mut effects = vec![];
        let effect_count = self.read_int()?;
        for _ in 0..effect_count {
            let line = self.next_line()?;
            let mut fields = line.split_whitespace();
            let condition_count = self.field_int(&mut fields, &line)?;
            let mut conditions = Vec::with_capacity(condition_count);
            for _ in 0..condition_count {
                let var = self.field_int(&mut fields, &line)?;
                let value = self.field_int(&mut fields, &line)?;
                conditions.push(Fact::new(Var::from_index(var), value));
            }
            let var = Var::from_index(self.field_int(&mut fields, &line)?);
            let pre = self.field_int_signed(&mut fields, &line)?;
            let post = self.field_int(&mut fields, &line)?;
            if pre >= 0 {
                preconditions.push(Fact::new(var, pre as usize));
            }
            effects.push(Effect::conditional(conditions, Fact::new(var, post)));
        }

        let cost = self.read_int()?;
        let cost = if use_costs { cost as u32 } else { 1 };
        self.expect("end_operator")?;

        Ok(Operator {
            name,
            cost,
            preconditions,
            effects,
        })
    }

    /// Read the next non-empty line, stripped of surrounding whitespace.
    fn next_line(&mut self) -> Result<String, ParserError> {
        let mut line = String::new();
        loop {
            line.clear();
            self.line_number += 1;
            let read = self
                .input
                .read_line(&mut line)
                .map_err(|source| ParserError::IoError {
                    line: self.line_number,
                    source,
                })?;
            if read == 0 {
                return Err(ParserError::UnexpectedEof {
                    line: self.line_number,
                });
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
    }

    fn expect(&mut self, expected: &str) -> Result<(), ParserError> {
        let found = self.next_line()?;
        if found != expected {
            return Err(ParserError::UnexpectedInput {
                line: self.line_number,
                expected: expected.to_string(),
                found,
            });
        }
        Ok(())
    }

    fn read_int(&mut self) -> Result<usize, ParserError> {
        let line = self.next_line()?;
        line.parse().map_err(|_| ParserError::ExpectedInt {
            line: self.line_number,
            found: line,
        })
    }

    /// Read a `var value` pair from one line.
    fn read_fact(&mut self) -> Result<Fact, ParserError> {
        let line = self.next_line()?;
        let mut fields = line.split_whitespace();
        let var = self.field_int(&mut fields, &line)?;
        let value = self.field_int(&mut fields, &line)?;
        Ok(Fact::new(Var::from_index(var), value))
    }

    fn field_int<'l>(
        &self,
        fields: &mut impl Iterator<Item = &'l str>,
        line: &str,
    ) -> Result<usize, ParserError> {
        fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or_else(|| ParserError::ExpectedInt {
                line: self.line_number,
                found: line.to_string(),
            })
    }

    fn field_int_signed<'l>(
        &self,
        fields: &mut impl Iterator<Item = &'l str>,
        line: &str,
    ) -> Result<isize, ParserError> {
        fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or_else(|| ParserError::ExpectedInt {
                line: self.line_number,
                found: line.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_task() -> String {
        "begin_version\n3\nend_version\n\
         begin_metric\n0\nend_metric\n\
         2\n\
         begin_variable\nvar0\n-1\n2\nAtom at-a\nAtom at-b\nend_variable\n\
         begin_variable\nvar1\n-1\n2\nAtom free\nAtom loaded\nend_variable\n\
         1\n\
         begin_mutex_group\n2\n0 0\n0 1\nend_mutex_group\n\
         begin_state\n0\n0\nend_state\n\
         begin_goal\n2\n0 1\n1 1\nend_goal\n\
         2\n\
         begin_operator\nmove a b\n1\n1 0\n1\n0 0 0 1\n1\nend_operator\n\
         begin_operator\nload\n0\n1\n1 0 1 1 -1 1\n2\nend_operator\n\
         0\n"
            .to_string()
    }

    #[test]
    fn parses_variables_state_and_goal() {
        let task = SasParser::parse(tiny_task().as_bytes()).expect("parse failed");
        assert_eq!(task.var_count(), 2);
        assert_eq!(task.initial_state().values(), &[0, 0]);
        assert_eq!(task.goals().len(), 2);
        assert_eq!(task.operators().len(), 2);
    }

    #[test]
    fn prevail_and_preconditions_are_merged() {
        let task = SasParser::parse(tiny_task().as_bytes()).expect("parse failed");
        let mover = task.operator(0);
        assert_eq!(mover.preconditions.len(), 2);
        assert_eq!(mover.effects.len(), 1);
        assert!(mover.effects[0].conditions.is_empty());
    }

    #[test]
    fn effect_conditions_are_kept() {
        let task = SasParser::parse(tiny_task().as_bytes()).expect("parse failed");
        let loader = task.operator(1);
        assert!(loader.preconditions.is_empty());
        assert_eq!(loader.effects[0].conditions.len(), 1);
        assert_eq!(loader.effects[0].fact, Fact::new(Var::from_index(1), 1));
    }

    #[test]
    fn metric_zero_makes_all_costs_one() {
        let task = SasParser::parse(tiny_task().as_bytes()).expect("parse failed");
        assert!(task.operators().iter().all(|op| op.cost == 1));
    }

    #[test]
    fn metric_one_reads_costs() {
        let input = tiny_task().replace("begin_metric\n0", "begin_metric\n1");
        let task = SasParser::parse(input.as_bytes()).expect("parse failed");
        assert_eq!(task.operator(0).cost, 1);
        assert_eq!(task.operator(1).cost, 2);
    }

    #[test]
    fn rejects_axioms() {
        let base = tiny_task();
        let input = format!("{}1\n", base.trim_end_matches("0\n"));
        let error = SasParser::parse(input.as_bytes()).expect_err("expected axiom error");
        assert!(error.to_string().contains("axioms are not supported"));
    }

    #[test]
    fn rejects_unsupported_version() {
        let input = tiny_task().replace("begin_version\n3", "begin_version\n2");
        let error = SasParser::parse(input.as_bytes()).expect_err("expected version error");
        assert!(error.to_string().contains("unsupported SAS format version"));
    }

    #[test]
    fn rejects_derived_variables() {
        let input = tiny_task().replace("var0\n-1", "var0\n0");
        let error = SasParser::parse(input.as_bytes()).expect_err("expected axiom error");
        assert!(error.to_string().contains("derived"));
    }
}
