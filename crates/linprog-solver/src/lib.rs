mod constraints;
mod expression;
mod problem;
mod simplex;
mod solution;
mod standard;
mod tableau;

pub use constraints::Constraints;
pub use expression::{LinearExpression, ModelError, Term, is_identifier, merge_duplicates};
pub use problem::{Constraint, ConstraintOp, Direction, LpProblem, Objective};
pub use simplex::Solver;
pub use solution::{Assignment, Solution, SolutionStatus, SolveError};
pub use standard::{
    NameGenerator, StandardConstraint, Standardize, Variable, VariableKind, compare_variables,
    numeric_suffix,
};
pub use tableau::{Phase, Pivot, State, Tableau};
