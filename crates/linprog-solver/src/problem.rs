use std::fmt;

use crate::expression::{LinearExpression, ModelError, Term};

/// Represents a linear programming problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LpProblem {
    /// Function to optimize
    pub objective: Objective,
    /// Constraints, in the order they were added
    pub constraints: Vec<Constraint>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::Maximize => "max",
            Direction::Minimize => "min",
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Whether to maximize or minimize
    pub direction: Direction,
    /// Name of the objective, e.g. `z` in `max z = 3x + 2y`
    pub name: String,
    /// Cost coefficient for each variable
    pub expression: LinearExpression,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Left-hand side
    pub expression: LinearExpression,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl ConstraintOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ConstraintOp::Le => "<=",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Eq => "=",
        }
    }
}

impl Objective {
    pub fn new(
        direction: Direction,
        name: impl Into<String>,
        expression: LinearExpression,
    ) -> Self {
        Self {
            direction,
            name: name.into(),
            expression,
        }
    }

    pub fn from_terms<I>(
        direction: Direction,
        name: impl Into<String>,
        terms: I,
    ) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = Term>,
    {
        Ok(Self::new(direction, name, LinearExpression::from_terms(terms)?))
    }

    /// Cost of `variable`; variables absent from the objective cost nothing
    pub fn cost(&self, variable: &str) -> f64 {
        self.expression.coefficient(variable).unwrap_or(0.0)
    }
}

impl Constraint {
    pub fn new(expression: LinearExpression, op: ConstraintOp, rhs: f64) -> Self {
        Self { expression, op, rhs }
    }

    pub fn from_terms<I>(terms: I, op: ConstraintOp, rhs: f64) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = Term>,
    {
        if !rhs.is_finite() {
            return Err(ModelError::InvalidRightHandSide(rhs));
        }
        Ok(Self::new(LinearExpression::from_terms(terms)?, op, rhs))
    }
}

impl LpProblem {
    pub fn new(objective: Objective) -> Self {
        Self {
            objective,
            constraints: Vec::new(),
        }
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.add_constraint(constraint);
        self
    }

    /// All variable names referenced by the objective or any constraint, in first-occurrence order
    pub fn decision_variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let exprs = std::iter::once(&self.objective.expression)
            .chain(self.constraints.iter().map(|c| &c.expression));
        for expr in exprs {
            for var in expr.variables() {
                if !names.contains(var) {
                    names.push(var.clone());
                }
            }
        }
        names
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// `<=` and `>=` constraints with a zero right-hand side. They get no
    /// slack column, so the solver holds them as equalities.
    pub fn zero_rhs_inequalities(&self) -> Vec<&Constraint> {
        self.constraints
            .iter()
            .filter(|c| c.op != ConstraintOp::Eq && c.rhs == 0.0)
            .collect()
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} = {}", self.direction.keyword(), self.name, self.expression)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.expression, self.op, self.rhs)
    }
}

impl fmt::Display for LpProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.objective)?;
        for constraint in &self.constraints {
            writeln!(f, "{}", constraint)?;
        }
        Ok(())
    }
}
