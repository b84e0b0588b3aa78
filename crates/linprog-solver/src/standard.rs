//! Conversion of relational constraints into equality form.
//!
//! Every constraint is rewritten as `a·x = b` with `b >= 0`, injecting the slack
//! and artificial columns needed to give the tableau a feasible starting basis.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::problem::{Constraint, ConstraintOp};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariableKind {
    /// Variable from the user's model
    Decision,
    /// Slack or surplus column
    Slack,
    /// Artificial column, only present during phase 1
    Artificial,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn decision(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Decision)
    }
}

/// Trailing decimal digits of a variable name (`x12` -> 12)
pub fn numeric_suffix(name: &str) -> Option<u64> {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    name[name.len() - digits..].parse().ok()
}

/// Column order: decision variables, then slacks, then artificials; within a
/// block by numeric suffix (names without one last), then by name.
pub fn compare_variables(a: &Variable, b: &Variable) -> Ordering {
    let key = |v: &Variable| {
        let suffix = numeric_suffix(&v.name);
        (v.kind, suffix.is_none(), suffix.unwrap_or(0))
    };
    key(a).cmp(&key(b)).then_with(|| a.name.cmp(&b.name))
}

/// Hands out fresh slack and artificial names for one problem.
///
/// Counters are per kind and never go backwards, so names are unique across
/// every constraint compiled with the same generator. Names already used by
/// the model are skipped.
#[derive(Debug, Clone, Default)]
pub struct NameGenerator {
    slacks: usize,
    artificials: usize,
    taken: HashSet<String>,
}

impl NameGenerator {
    pub const SLACK_PREFIX: &'static str = "s";
    pub const ARTIFICIAL_PREFIX: &'static str = "a";

    pub fn new() -> Self {
        Self::default()
    }

    /// A generator that will never produce any of `names`
    pub fn reserving<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taken: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn next_slack(&mut self) -> String {
        Self::fresh(Self::SLACK_PREFIX, &mut self.slacks, &mut self.taken)
    }

    pub fn next_artificial(&mut self) -> String {
        Self::fresh(Self::ARTIFICIAL_PREFIX, &mut self.artificials, &mut self.taken)
    }

    fn fresh(prefix: &str, counter: &mut usize, taken: &mut HashSet<String>) -> String {
        loop {
            *counter += 1;
            let name = format!("{}{}", prefix, counter);
            if taken.insert(name.clone()) {
                return name;
            }
        }
    }
}

/// A constraint in equality form over its own (extended) variable list
#[derive(Debug, Clone, PartialEq)]
pub struct StandardConstraint {
    variables: Vec<Variable>,
    coefficients: Vec<f64>,
    rhs: f64,
    slack: Option<String>,
    artificial: Option<String>,
}

/// Rewriting into equality form.
///
/// Already standardized constraints pass through untouched.
pub trait Standardize {
    fn standardize(&self, names: &mut NameGenerator) -> StandardConstraint;
}

impl Standardize for Constraint {
    fn standardize(&self, names: &mut NameGenerator) -> StandardConstraint {
        StandardConstraint::compile(self, names)
    }
}

impl Standardize for StandardConstraint {
    fn standardize(&self, _names: &mut NameGenerator) -> StandardConstraint {
        self.clone()
    }
}

impl StandardConstraint {
    /// Rewrite `constraint` as an equality with a non-negative right-hand side.
    ///
    /// A zero right-hand side only rewrites the operator. Otherwise:
    ///
    /// | op   | b > 0             | b < 0                       |
    /// |------|-------------------|-----------------------------|
    /// | `=`  | `+a`              | negate, `+a`                |
    /// | `<=` | `+s`              | negate, `-s`, `+a`          |
    /// | `>=` | `-s`, `+a`        | negate, `+s`                |
    pub fn compile(constraint: &Constraint, names: &mut NameGenerator) -> Self {
        let mut variables: Vec<Variable> = constraint
            .expression
            .variables()
            .iter()
            .map(Variable::decision)
            .collect();
        let mut coefficients = constraint.expression.coefficients().to_vec();
        let mut rhs = constraint.rhs;
        let mut slack = None;
        let mut artificial = None;

        let negate = |coefficients: &mut Vec<f64>, rhs: &mut f64| {
            coefficients.iter_mut().for_each(|c| *c = -*c);
            *rhs = -*rhs;
        };

        if rhs != 0.0 {
            let positive = rhs > 0.0;
            let (slack_coef, with_artificial) = match (constraint.op, positive) {
                (ConstraintOp::Eq, _) => {
                    if !positive {
                        negate(&mut coefficients, &mut rhs);
                    }
                    (None, true)
                }
                (ConstraintOp::Le, true) => (Some(1.0), false),
                (ConstraintOp::Le, false) => {
                    negate(&mut coefficients, &mut rhs);
                    (Some(-1.0), true)
                }
                (ConstraintOp::Ge, true) => (Some(-1.0), true),
                (ConstraintOp::Ge, false) => {
                    negate(&mut coefficients, &mut rhs);
                    (Some(1.0), false)
                }
            };

            if let Some(coef) = slack_coef {
                let name = names.next_slack();
                variables.push(Variable::new(name.clone(), VariableKind::Slack));
                coefficients.push(coef);
                slack = Some(name);
            }
            if with_artificial {
                let name = names.next_artificial();
                variables.push(Variable::new(name.clone(), VariableKind::Artificial));
                coefficients.push(1.0);
                artificial = Some(name);
            }
        }

        Self {
            variables,
            coefficients,
            rhs,
            slack,
            artificial,
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    /// Always `=` once standardized
    pub fn op(&self) -> ConstraintOp {
        ConstraintOp::Eq
    }

    /// Name of the injected slack or surplus variable, if any
    pub fn slack(&self) -> Option<&str> {
        self.slack.as_deref()
    }

    /// Name of the injected artificial variable, if any
    pub fn artificial(&self) -> Option<&str> {
        self.artificial.as_deref()
    }

    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.variables
            .iter()
            .position(|v| v.name == name)
            .map(|idx| self.coefficients[idx])
    }
}

impl fmt::Display for StandardConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (var, &coef)) in self.variables.iter().zip(&self.coefficients).enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:+} {}", coef, var.name)?;
        }
        write!(f, " = {}", self.rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Term;

    fn constraint(terms: &[(f64, &str)], op: ConstraintOp, rhs: f64) -> Constraint {
        Constraint::from_terms(terms.iter().map(|&(c, v)| Term::new(c, v)), op, rhs).unwrap()
    }

    fn kinds(c: &StandardConstraint) -> Vec<VariableKind> {
        c.variables().iter().map(|v| v.kind).collect()
    }

    #[test]
    fn test_le_with_positive_rhs_adds_slack() {
        let mut names = NameGenerator::new();
        let std = constraint(&[(1.0, "x1"), (1.0, "x2")], ConstraintOp::Le, 10.0)
            .standardize(&mut names);
        assert_eq!(std.coefficients(), &[1.0, 1.0, 1.0]);
        assert_eq!(std.rhs(), 10.0);
        assert_eq!(std.slack(), Some("s1"));
        assert_eq!(std.artificial(), None);
        assert_eq!(
            kinds(&std),
            vec![VariableKind::Decision, VariableKind::Decision, VariableKind::Slack]
        );
    }

    #[test]
    fn test_ge_with_positive_rhs_adds_surplus_and_artificial() {
        let mut names = NameGenerator::new();
        let std = constraint(&[(1.0, "x1"), (2.0, "x2")], ConstraintOp::Ge, 40.0)
            .standardize(&mut names);
        assert_eq!(std.coefficients(), &[1.0, 2.0, -1.0, 1.0]);
        assert_eq!(std.slack(), Some("s1"));
        assert_eq!(std.artificial(), Some("a1"));
    }

    #[test]
    fn test_negative_rhs_is_flipped() {
        let mut names = NameGenerator::new();

        // -x2 + 5x3 <= -1  ->  x2 - 5x3 - s1 + a1 = 1
        let le = constraint(&[(-1.0, "x2"), (5.0, "x3")], ConstraintOp::Le, -1.0)
            .standardize(&mut names);
        assert_eq!(le.coefficients(), &[1.0, -5.0, -1.0, 1.0]);
        assert_eq!(le.rhs(), 1.0);

        // x1 + x2 >= -1  ->  -x1 - x2 + s2 = 1
        let ge = constraint(&[(1.0, "x1"), (1.0, "x2")], ConstraintOp::Ge, -1.0)
            .standardize(&mut names);
        assert_eq!(ge.coefficients(), &[-1.0, -1.0, 1.0]);
        assert_eq!(ge.rhs(), 1.0);
        assert_eq!(ge.slack(), Some("s2"));
        assert_eq!(ge.artificial(), None);

        // x1 - x2 = -3  ->  -x1 + x2 + a2 = 3
        let eq = constraint(&[(1.0, "x1"), (-1.0, "x2")], ConstraintOp::Eq, -3.0)
            .standardize(&mut names);
        assert_eq!(eq.coefficients(), &[-1.0, 1.0, 1.0]);
        assert_eq!(eq.rhs(), 3.0);
        assert_eq!(eq.artificial(), Some("a2"));
    }

    #[test]
    fn test_zero_rhs_only_rewrites_operator() {
        let mut names = NameGenerator::new();
        let std = constraint(&[(1.0, "x1"), (-1.0, "x2")], ConstraintOp::Le, 0.0)
            .standardize(&mut names);
        assert_eq!(std.op(), ConstraintOp::Eq);
        assert_eq!(std.coefficients(), &[1.0, -1.0]);
        assert_eq!(std.slack(), None);
        assert_eq!(std.artificial(), None);
    }

    #[test]
    fn test_standardizing_twice_is_a_no_op() {
        let mut names = NameGenerator::new();
        let once = constraint(&[(3.0, "x1")], ConstraintOp::Ge, 6.0).standardize(&mut names);
        let twice = once.standardize(&mut names);
        assert_eq!(once, twice);
        assert_eq!(names.next_artificial(), "a2");
    }

    #[test]
    fn test_rhs_non_negative_and_operator_equal() {
        let mut names = NameGenerator::new();
        for op in [ConstraintOp::Le, ConstraintOp::Ge, ConstraintOp::Eq] {
            for rhs in [-7.5, 0.0, 3.0] {
                let std = constraint(&[(2.0, "x1"), (-1.0, "x2")], op, rhs).standardize(&mut names);
                assert!(std.rhs() >= 0.0, "{} {} {}", op, rhs, std);
                assert_eq!(std.op(), ConstraintOp::Eq);
            }
        }
    }

    #[test]
    fn test_names_unique_across_constraints() {
        let mut names = NameGenerator::reserving(["x1", "s2"]);
        let first = constraint(&[(1.0, "x1")], ConstraintOp::Le, 1.0).standardize(&mut names);
        let second = constraint(&[(1.0, "x1")], ConstraintOp::Le, 2.0).standardize(&mut names);
        assert_eq!(first.slack(), Some("s1"));
        assert_eq!(second.slack(), Some("s3"));
    }

    #[test]
    fn test_variable_ordering() {
        let mut vars = vec![
            Variable::new("a1", VariableKind::Artificial),
            Variable::new("s2", VariableKind::Slack),
            Variable::decision("x10"),
            Variable::new("s1", VariableKind::Slack),
            Variable::decision("y"),
            Variable::decision("x2"),
        ];
        vars.sort_by(compare_variables);
        let names: Vec<_> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["x2", "x10", "y", "s1", "s2", "a1"]);
    }

    #[test]
    fn test_numeric_suffix() {
        assert_eq!(numeric_suffix("x12"), Some(12));
        assert_eq!(numeric_suffix("profit"), None);
        assert_eq!(numeric_suffix("7"), Some(7));
    }
}
