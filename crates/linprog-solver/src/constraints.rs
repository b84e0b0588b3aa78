use std::collections::HashMap;
use std::fmt;
use std::ops::Add;

use crate::problem::LpProblem;
use crate::standard::{
    NameGenerator, StandardConstraint, Standardize, Variable, VariableKind, compare_variables,
};

/// Standardized constraints stacked into one coefficient matrix.
///
/// Columns follow the global variable order (see [`compare_variables`]), rows
/// follow the order constraints were combined in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Constraints {
    variables: Vec<Variable>,
    matrix: Vec<Vec<f64>>,
    rhs: Vec<f64>,
    rows: Vec<StandardConstraint>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standardize every constraint of `problem` with a fresh name generator and
    /// stack them. Objective-only variables get an all-zero column.
    pub fn from_problem(problem: &LpProblem) -> Self {
        let mut names = NameGenerator::reserving(problem.decision_variables());
        let constraints: Constraints = problem
            .constraints
            .iter()
            .map(|c| c.standardize(&mut names))
            .collect();
        constraints.with_variables(
            problem
                .objective
                .expression
                .variables()
                .iter()
                .map(Variable::decision),
        )
    }

    /// Union of both aggregates. Rows of `self` come first; every row is
    /// re-expressed over the union of columns with zeros where absent.
    pub fn combine(self, other: Constraints) -> Constraints {
        let mut variables = self.variables.clone();
        for var in &other.variables {
            if !variables.iter().any(|v| v.name == var.name) {
                variables.push(var.clone());
            }
        }
        variables.sort_by(compare_variables);

        let index: HashMap<&str, usize> = variables
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name.as_str(), i))
            .collect();

        let mut matrix = Vec::with_capacity(self.matrix.len() + other.matrix.len());
        for part in [&self, &other] {
            for row in &part.matrix {
                let mut target = vec![0.0; variables.len()];
                for (var, &coef) in part.variables.iter().zip(row) {
                    target[index[var.name.as_str()]] = coef;
                }
                matrix.push(target);
            }
        }

        let mut rhs = self.rhs;
        rhs.extend(other.rhs);
        let mut rows = self.rows;
        rows.extend(other.rows);

        Constraints {
            variables,
            matrix,
            rhs,
            rows,
        }
    }

    pub fn push(&mut self, constraint: StandardConstraint) {
        let this = std::mem::take(self);
        *self = this.combine(constraint.into());
    }

    /// Add columns (with no coefficients in any row) for the given variables
    pub fn with_variables<I>(self, variables: I) -> Constraints
    where
        I: IntoIterator<Item = Variable>,
    {
        let extra = Constraints {
            variables: variables.into_iter().collect(),
            ..Constraints::default()
        };
        self.combine(extra)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn matrix(&self) -> &[Vec<f64>] {
        &self.matrix
    }

    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    /// The standardized constraints in row order
    pub fn rows(&self) -> &[StandardConstraint] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.matrix.len()
    }

    pub fn num_columns(&self) -> usize {
        self.variables.len()
    }

    pub fn column_of(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }

    pub fn slack_columns(&self) -> Vec<usize> {
        self.columns_of_kind(VariableKind::Slack)
    }

    pub fn artificial_columns(&self) -> Vec<usize> {
        self.columns_of_kind(VariableKind::Artificial)
    }

    pub fn has_artificials(&self) -> bool {
        self.variables.iter().any(|v| v.kind == VariableKind::Artificial)
    }

    fn columns_of_kind(&self, kind: VariableKind) -> Vec<usize> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.kind == kind)
            .map(|(i, _)| i)
            .collect()
    }
}

impl From<StandardConstraint> for Constraints {
    fn from(constraint: StandardConstraint) -> Self {
        let columns = constraint.variables();
        let mut order: Vec<usize> = (0..columns.len()).collect();
        order.sort_by(|&a, &b| compare_variables(&columns[a], &columns[b]));

        let variables = order.iter().map(|&i| columns[i].clone()).collect();
        let row = order.iter().map(|&i| constraint.coefficients()[i]).collect();

        Constraints {
            variables,
            matrix: vec![row],
            rhs: vec![constraint.rhs()],
            rows: vec![constraint],
        }
    }
}

impl Add for Constraints {
    type Output = Constraints;

    fn add(self, other: Constraints) -> Constraints {
        self.combine(other)
    }
}

impl Add<StandardConstraint> for Constraints {
    type Output = Constraints;

    fn add(self, other: StandardConstraint) -> Constraints {
        self.combine(other.into())
    }
}

impl FromIterator<StandardConstraint> for Constraints {
    fn from_iter<I: IntoIterator<Item = StandardConstraint>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Constraints::new(), |acc, constraint| acc + constraint)
    }
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Term;
    use crate::problem::{Constraint, ConstraintOp, Direction, Objective};

    fn standard(
        terms: &[(f64, &str)],
        op: ConstraintOp,
        rhs: f64,
        names: &mut NameGenerator,
    ) -> StandardConstraint {
        Constraint::from_terms(terms.iter().map(|&(c, v)| Term::new(c, v)), op, rhs)
            .unwrap()
            .standardize(names)
    }

    fn names(constraints: &Constraints) -> Vec<&str> {
        constraints.variables().iter().map(|v| v.name.as_str()).collect()
    }

    #[test]
    fn test_combine_zero_fills_and_sorts_columns() {
        let mut generator = NameGenerator::new();
        let c1 = standard(
            &[(4.0, "x1"), (5.0, "x2"), (1.0, "x3"), (0.05, "x4")],
            ConstraintOp::Le,
            4.0,
            &mut generator,
        );
        let c2 = standard(
            &[(14.0, "x3"), (12.0, "x2"), (-1.0, "x4")],
            ConstraintOp::Le,
            3.0,
            &mut generator,
        );
        let c3 = standard(
            &[(3.0, "x2"), (2.0, "x3"), (1.0, "x4")],
            ConstraintOp::Ge,
            5.0,
            &mut generator,
        );
        let c4 = standard(&[(-1.0, "x2"), (5.0, "x3")], ConstraintOp::Le, -1.0, &mut generator);

        let all = Constraints::from(c1) + c2 + c3 + c4;
        assert_eq!(
            names(&all),
            vec!["x1", "x2", "x3", "x4", "s1", "s2", "s3", "s4", "a1", "a2"]
        );
        assert_eq!(all.num_rows(), 4);
        assert_eq!(all.rhs(), &[4.0, 3.0, 5.0, 1.0]);
        assert_eq!(all.matrix()[0], vec![4.0, 5.0, 1.0, 0.05, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(all.matrix()[1], vec![0.0, 12.0, 14.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(all.matrix()[2], vec![0.0, 3.0, 2.0, 1.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0]);
        assert_eq!(all.matrix()[3], vec![0.0, 1.0, -5.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0]);
        assert_eq!(all.slack_columns(), vec![4, 5, 6, 7]);
        assert_eq!(all.artificial_columns(), vec![8, 9]);
        assert!(all.has_artificials());
    }

    #[test]
    fn test_combination_grouping_does_not_matter() {
        let mut generator = NameGenerator::new();
        let c1 = standard(&[(1.0, "x1"), (1.0, "x2")], ConstraintOp::Le, 30.0, &mut generator);
        let c2 = standard(&[(1.0, "x1"), (2.0, "x2")], ConstraintOp::Ge, 40.0, &mut generator);
        let c3 = standard(&[(1.0, "x3")], ConstraintOp::Le, 5.0, &mut generator);

        let left = (Constraints::from(c1.clone()) + c2.clone()) + c3.clone();
        let right = Constraints::from(c1) + (Constraints::from(c2) + c3);
        assert_eq!(left.variables(), right.variables());
        assert_eq!(left.matrix(), right.matrix());
        assert_eq!(left.rhs(), right.rhs());
    }

    #[test]
    fn test_coefficients_preserved_at_their_position() {
        let mut generator = NameGenerator::new();
        let rows = vec![
            standard(&[(2.0, "x2"), (7.0, "x1")], ConstraintOp::Le, 1.0, &mut generator),
            standard(&[(3.0, "x3")], ConstraintOp::Eq, 2.0, &mut generator),
            standard(&[(-4.0, "x1"), (1.5, "x3")], ConstraintOp::Ge, 3.0, &mut generator),
        ];
        let all: Constraints = rows.iter().cloned().collect();

        assert_eq!(all.num_rows(), rows.len());
        let mut distinct: Vec<&str> = rows
            .iter()
            .flat_map(|r| r.variables().iter().map(|v| v.name.as_str()))
            .collect();
        distinct.sort();
        distinct.dedup();
        assert_eq!(all.num_columns(), distinct.len());

        for (i, row) in rows.iter().enumerate() {
            for (j, var) in all.variables().iter().enumerate() {
                let expected = row.coefficient(&var.name).unwrap_or(0.0);
                assert_eq!(all.matrix()[i][j], expected, "row {} column {}", i, var.name);
            }
        }
    }

    #[test]
    fn test_from_problem_includes_objective_variables() {
        let objective = Objective::from_terms(
            Direction::Maximize,
            "z",
            vec![Term::new(1.0, "x1"), Term::new(1.0, "x9")],
        )
        .unwrap();
        let constraint =
            Constraint::from_terms(vec![Term::new(1.0, "x1")], ConstraintOp::Le, 4.0).unwrap();
        let problem = LpProblem::new(objective).with_constraint(constraint);

        let constraints = Constraints::from_problem(&problem);
        assert_eq!(names(&constraints), vec!["x1", "x9", "s1"]);
        assert_eq!(constraints.matrix(), &[vec![1.0, 0.0, 1.0]]);
        assert_eq!(constraints.to_string(), "+1 x1 +1 s1 = 4\n");
    }

    #[test]
    fn test_push_appends_rows() {
        let mut generator = NameGenerator::new();
        let mut all = Constraints::new();
        all.push(standard(&[(1.0, "x1")], ConstraintOp::Le, 1.0, &mut generator));
        all.push(standard(&[(1.0, "x2")], ConstraintOp::Le, 2.0, &mut generator));
        assert_eq!(all.rhs(), &[1.0, 2.0]);
        assert_eq!(all.column_of("s2"), Some(3));
    }
}
