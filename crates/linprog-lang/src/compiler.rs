use crate::ast::*;
use crate::lexer::Span;
use crate::parser::{ParseError, Parser};
use linprog_solver::{Constraint, ConstraintOp, Direction, LpProblem, ModelError, Objective, Term};
use log::debug;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Missing objective function: expected a 'max' or 'min' line")]
    MissingObjective,
    #[error("Duplicate objective function '{name}' at position {span:?}")]
    DuplicateObjective { name: String, span: Span },
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Error from turning source text into an [`LpProblem`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Lowers a parsed [`Program`] to the solver's model
#[derive(Debug, Default)]
pub struct Compiler;

impl Compiler {
    pub fn new() -> Self {
        Self
    }

    /// Parse and compile `source` in one go
    pub fn load(&self, source: &str) -> Result<LpProblem, LoadError> {
        let program = Parser::parse(source)?;
        Ok(self.compile(&program)?)
    }

    pub fn compile(&self, program: &Program) -> Result<LpProblem, CompileError> {
        let mut objectives = program.objectives();
        let decl = objectives.next().ok_or(CompileError::MissingObjective)?;
        if let Some(duplicate) = objectives.next() {
            return Err(CompileError::DuplicateObjective {
                name: duplicate.name.clone(),
                span: duplicate.span,
            });
        }

        let mut problem = LpProblem::new(self.compile_objective(decl)?);
        for constraint in program.constraints() {
            problem.add_constraint(self.compile_constraint(constraint)?);
        }

        debug!(
            "Compiled program: {} {}, {} constraints, {} variables",
            problem.objective.direction.keyword(),
            problem.objective.name,
            problem.num_constraints(),
            problem.decision_variables().len()
        );

        Ok(problem)
    }

    fn compile_objective(&self, decl: &ObjectiveDecl) -> Result<Objective, CompileError> {
        let direction = match decl.sense {
            Sense::Max => Direction::Maximize,
            Sense::Min => Direction::Minimize,
        };
        Ok(Objective::from_terms(direction, decl.name.clone(), terms(&decl.terms))?)
    }

    fn compile_constraint(&self, decl: &ConstraintDecl) -> Result<Constraint, CompileError> {
        let op = match decl.relation {
            Relation::Eq => ConstraintOp::Eq,
            Relation::Le => ConstraintOp::Le,
            Relation::Ge => ConstraintOp::Ge,
        };
        Ok(Constraint::from_terms(terms(&decl.terms), op, decl.rhs)?)
    }
}

fn terms(nodes: &[TermNode]) -> Vec<Term> {
    nodes
        .iter()
        .map(|node| Term::new(node.coefficient, node.variable.clone()))
        .collect()
}
