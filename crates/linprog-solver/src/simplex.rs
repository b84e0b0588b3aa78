use log::{debug, warn};

use crate::constraints::Constraints;
use crate::problem::LpProblem;
use crate::solution::{Solution, SolveError};
use crate::tableau::{Phase, State, Tableau};

/// Tableau simplex solver for linear programming problems
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum iterations, over both phases, before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons against zero
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// `0.0` compares against zero exactly
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Solve the LP problem using the two-phase simplex method
    pub fn solve(&self, problem: &LpProblem) -> Result<Solution, SolveError> {
        self.solve_with(problem, |_| {})
    }

    /// Like [`Solver::solve`], calling `observer` with the start-up tableau and
    /// after every iteration and phase change
    pub fn solve_with<F>(
        &self,
        problem: &LpProblem,
        mut observer: F,
    ) -> Result<Solution, SolveError>
    where
        F: FnMut(&Tableau),
    {
        let constraints = Constraints::from_problem(problem);
        debug!(
            "solving {} constraints over {} columns ({} slack, {} artificial)",
            constraints.num_rows(),
            constraints.num_columns(),
            constraints.slack_columns().len(),
            constraints.artificial_columns().len(),
        );

        let mut tableau = self.tableau(constraints, problem);
        observer(&tableau);
        self.run(&mut tableau, &mut observer);
        tableau.report()
    }

    /// Start-up tableau for `constraints` with this solver's tolerance
    pub fn tableau(&self, constraints: Constraints, problem: &LpProblem) -> Tableau {
        Tableau::new(constraints, &problem.objective, self.tolerance)
    }

    /// Drive `tableau` to a terminal state, through phase 2 if it starts in phase 1
    pub fn run<F>(&self, tableau: &mut Tableau, observer: &mut F)
    where
        F: FnMut(&Tableau),
    {
        self.iterate(tableau, observer);

        if tableau.phase() == Phase::PhaseOne && tableau.state() == State::Optimal {
            self.finish_phase_one(tableau);
            if tableau.state() != State::Infeasible {
                observer(tableau);
            }
            self.iterate(tableau, observer);
        }

        debug!(
            "finished with {:?} after {} iterations, z = {}",
            tableau.state(),
            tableau.iterations(),
            tableau.objective_value()
        );
    }

    fn iterate<F>(&self, tableau: &mut Tableau, observer: &mut F)
    where
        F: FnMut(&Tableau),
    {
        while tableau.state() == State::Iterating {
            if tableau.iterations() >= self.max_iterations {
                warn!("no optimum after {} iterations, giving up", tableau.iterations());
                tableau.set_state(State::NotConverged);
                break;
            }
            tableau.step();
            observer(tableau);
        }
    }

    /// Phase 1 optimum: a non-zero `-Σ artificials` means the original problem
    /// is infeasible, otherwise continue on the real objective.
    fn finish_phase_one(&self, tableau: &mut Tableau) {
        let infeasibility = tableau.objective_value();
        if infeasibility.abs() > self.tolerance {
            debug!("phase 1 stopped at {}, problem is infeasible", infeasibility);
            tableau.set_state(State::Infeasible);
            return;
        }
        debug!(
            "phase 1 feasible after {} iterations, switching to the real objective",
            tableau.iterations()
        );
        tableau.switch_to_phase_two();
    }
}
