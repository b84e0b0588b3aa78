use std::fmt;

use log::trace;

use crate::constraints::Constraints;
use crate::problem::{Direction, Objective};
use crate::solution::{Assignment, Solution, SolutionStatus, SolveError};
use crate::standard::{Variable, VariableKind};

/// Which objective the tableau is currently optimizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No artificial variables, the real objective from the start
    Single,
    /// Maximizing `-Σ artificials`
    PhaseOne,
    /// Real objective after a feasible phase 1
    PhaseTwo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Iterating,
    Optimal,
    Infeasible,
    Unbounded,
    NotConverged,
}

impl State {
    pub fn is_terminal(self) -> bool {
        self != State::Iterating
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pivot {
    pub row: usize,
    pub column: usize,
    pub value: f64,
}

/// Working simplex tableau.
///
/// Owns the constraint matrix and right-hand side and mutates them in place on
/// every pivot. Rows whose constraint had no unit column (zero right-hand side)
/// are pivoted on one of their own columns at start-up; only an all-zero row
/// stays without a basic variable.
#[derive(Debug, Clone)]
pub struct Tableau {
    variables: Vec<Variable>,
    matrix: Vec<Vec<f64>>,
    rhs: Vec<f64>,
    /// Working cost row `cj`
    costs: Vec<f64>,
    /// Costs of the real objective, aligned to `variables`
    objective_costs: Vec<f64>,
    cj_zj: Vec<f64>,
    basis: Vec<Option<usize>>,
    basic_costs: Vec<f64>,
    /// Direction currently optimized (always maximize in phase 1)
    direction: Direction,
    /// Direction of the real objective
    target: Direction,
    z: f64,
    iterations: usize,
    phase: Phase,
    state: State,
    tolerance: f64,
    last_pivot: Option<Pivot>,
}

impl Tableau {
    /// Build the start-up tableau.
    ///
    /// With artificial columns present the tableau starts in phase 1 with cost
    /// `-1` on every artificial and `0` elsewhere; otherwise the real costs are
    /// used directly.
    pub fn new(constraints: Constraints, objective: &Objective, tolerance: f64) -> Self {
        let constraints = constraints.with_variables(
            objective
                .expression
                .variables()
                .iter()
                .map(Variable::decision),
        );
        let variables = constraints.variables().to_vec();
        let objective_costs: Vec<f64> = variables
            .iter()
            .map(|v| match v.kind {
                VariableKind::Decision => objective.cost(&v.name),
                VariableKind::Slack | VariableKind::Artificial => 0.0,
            })
            .collect();

        let (phase, direction, costs) = if constraints.has_artificials() {
            let costs = variables
                .iter()
                .map(|v| if v.kind == VariableKind::Artificial { -1.0 } else { 0.0 })
                .collect();
            (Phase::PhaseOne, Direction::Maximize, costs)
        } else {
            (Phase::Single, objective.direction, objective_costs.clone())
        };

        let rows = constraints.num_rows();
        let mut tableau = Self {
            variables,
            matrix: constraints.matrix().to_vec(),
            rhs: constraints.rhs().to_vec(),
            costs,
            objective_costs,
            cj_zj: Vec::new(),
            basis: vec![None; rows],
            basic_costs: vec![0.0; rows],
            direction,
            target: objective.direction,
            z: 0.0,
            iterations: 0,
            phase,
            state: State::Iterating,
            tolerance,
            last_pivot: None,
        };
        tableau.detect_basis();
        // A `b == 0` row carries no slack or artificial; give it a basic
        // variable so later pivots cannot break its equality.
        for row in 0..rows {
            if tableau.basis[row].is_none() {
                tableau.pivot_in_any(row);
            }
        }
        tableau.last_pivot = None;
        tableau.refresh();
        tableau
    }

    /// A column is basic in row `r` if its only non-zero entry is a 1 in row `r`.
    /// Later columns win, so slacks and artificials take precedence over
    /// decision variables.
    fn detect_basis(&mut self) {
        for j in 0..self.variables.len() {
            let mut nonzero = self
                .matrix
                .iter()
                .enumerate()
                .filter(|(_, row)| row[j] != 0.0);
            let (Some((row, cells)), None) = (nonzero.next(), nonzero.next()) else {
                continue;
            };
            if cells[j] == 1.0 {
                self.basis[row] = Some(j);
                self.basic_costs[row] = self.costs[j];
            }
        }
    }

    /// Recompute `cj - zj`, `z` and the optimality state
    fn refresh(&mut self) {
        self.cj_zj = (0..self.variables.len())
            .map(|j| {
                let zj: f64 = self
                    .matrix
                    .iter()
                    .zip(&self.basic_costs)
                    .map(|(row, &cb)| cb * row[j])
                    .sum();
                self.costs[j] - zj
            })
            .collect();
        self.z = self.basic_costs.iter().zip(&self.rhs).map(|(cb, b)| cb * b).sum();
        self.state = if self.is_optimal() {
            State::Optimal
        } else {
            State::Iterating
        };
    }

    /// No entry of `cj - zj` can still improve the objective.
    ///
    /// An all-zero row counts as optimal.
    pub fn is_optimal(&self) -> bool {
        match self.direction {
            Direction::Maximize => self.cj_zj.iter().all(|&v| v <= self.tolerance),
            Direction::Minimize => self.cj_zj.iter().all(|&v| v >= -self.tolerance),
        }
    }

    fn ratio(&self, b: f64, cell: f64) -> f64 {
        let b = if b.abs() <= self.tolerance { 0.0 } else { b };
        let bounded = cell > self.tolerance || (cell < -self.tolerance && b < 0.0);
        if !bounded {
            return f64::INFINITY;
        }
        let ratio = b / cell;
        if ratio < 0.0 { f64::INFINITY } else { ratio }
    }

    /// `θ` for every row if `column` entered the basis
    pub fn ratio_column(&self, column: usize) -> Vec<f64> {
        self.matrix
            .iter()
            .zip(&self.rhs)
            .map(|(row, &b)| self.ratio(b, row[column]))
            .collect()
    }

    fn min_ratio(&self, column: usize) -> f64 {
        self.ratio_column(column)
            .into_iter()
            .fold(f64::INFINITY, f64::min)
    }

    /// Entering column: the best `cj - zj`. Ties go to the candidate whose ratio
    /// column has the smallest minimum.
    pub fn pivot_column(&self) -> Option<usize> {
        let best = match self.direction {
            Direction::Maximize => self.cj_zj.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Direction::Minimize => self.cj_zj.iter().copied().fold(f64::INFINITY, f64::min),
        };
        let candidates: Vec<usize> = self
            .cj_zj
            .iter()
            .enumerate()
            .filter(|&(_, &v)| (v - best).abs() <= self.tolerance)
            .map(|(j, _)| j)
            .collect();

        let (&first, rest) = candidates.split_first()?;
        if rest.is_empty() {
            return Some(first);
        }

        let mut chosen = first;
        let mut chosen_ratio = self.min_ratio(first);
        for &candidate in rest {
            let ratio = self.min_ratio(candidate);
            if ratio < chosen_ratio {
                chosen = candidate;
                chosen_ratio = ratio;
            }
        }
        Some(chosen)
    }

    /// Leaving row: the minimum ratio. Ties go to the row with the smallest
    /// coefficient sum. `None` if no row bounds the entering column.
    pub fn pivot_row(&self, column: usize) -> Option<usize> {
        let ratios = self.ratio_column(column);
        let min = ratios.iter().copied().fold(f64::INFINITY, f64::min);
        if min.is_infinite() {
            return None;
        }

        let mut chosen: Option<(usize, f64)> = None;
        for (i, &ratio) in ratios.iter().enumerate() {
            if (ratio - min).abs() > self.tolerance {
                continue;
            }
            let row_sum: f64 = self.matrix[i].iter().sum();
            match chosen {
                Some((_, best_sum)) if row_sum >= best_sum => {}
                _ => chosen = Some((i, row_sum)),
            }
        }
        chosen.map(|(i, _)| i)
    }

    /// Next pivot, or `None` when the entering column is unbounded
    pub fn select_pivot(&self) -> Option<Pivot> {
        let column = self.pivot_column()?;
        let row = self.pivot_row(column)?;
        Some(Pivot {
            row,
            column,
            value: self.matrix[row][column],
        })
    }

    /// Run one simplex iteration and return the resulting state
    pub fn step(&mut self) -> State {
        if self.state.is_terminal() {
            return self.state;
        }
        let Some(column) = self.pivot_column() else {
            self.state = State::Optimal;
            return self.state;
        };
        let Some(row) = self.pivot_row(column) else {
            trace!(
                "{} can increase without bound, no row limits it",
                self.variables[column].name
            );
            self.state = State::Unbounded;
            return self.state;
        };

        self.apply_pivot(row, column);
        self.iterations += 1;
        self.refresh();
        self.state
    }

    /// Gauss-Jordan elimination around `matrix[row][column]`.
    ///
    /// The pivot column is set to exactly 1 in the pivot row and 0 elsewhere.
    fn apply_pivot(&mut self, row: usize, column: usize) {
        let pivot = self.matrix[row][column];
        let pivot_row: Vec<f64> = self.matrix[row].iter().map(|v| v / pivot).collect();
        let pivot_b = self.rhs[row] / pivot;

        trace!(
            "after iteration {}: {} enters, {} leaves (row {}, pivot {})",
            self.iterations,
            self.variables[column].name,
            self.basis[row].map_or("-", |j| self.variables[j].name.as_str()),
            row,
            pivot
        );

        for (i, (cells, b)) in self.matrix.iter_mut().zip(self.rhs.iter_mut()).enumerate() {
            if i == row {
                cells.clone_from(&pivot_row);
                cells[column] = 1.0;
                *b = pivot_b;
                continue;
            }
            let factor = cells[column];
            for (cell, &p) in cells.iter_mut().zip(&pivot_row) {
                *cell -= factor * p;
            }
            cells[column] = 0.0;
            *b -= factor * pivot_b;
        }

        self.basis[row] = Some(column);
        self.basic_costs[row] = self.costs[column];
        self.last_pivot = Some(Pivot {
            row,
            column,
            value: pivot,
        });
    }

    /// Pivot `row` on its first non-zero, non-artificial entry. Returns false
    /// when the row has no such entry.
    fn pivot_in_any(&mut self, row: usize) -> bool {
        let column = (0..self.variables.len()).find(|&j| {
            self.variables[j].kind != VariableKind::Artificial
                && self.matrix[row][j].abs() > self.tolerance
        });
        match column {
            Some(j) => {
                self.apply_pivot(row, j);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_state(&mut self, state: State) {
        self.state = state;
    }

    /// Hand over from phase 1 to the real objective.
    ///
    /// Artificials still basic at level zero are pivoted out on any other
    /// non-zero entry of their row (a row with none is redundant and loses its
    /// basic variable). Artificial columns are then dropped, the real costs
    /// and direction restored, and optimality re-evaluated.
    pub(crate) fn switch_to_phase_two(&mut self) {
        for row in 0..self.basis.len() {
            let Some(col) = self.basis[row] else { continue };
            if self.variables[col].kind != VariableKind::Artificial {
                continue;
            }
            if !self.pivot_in_any(row) {
                self.basis[row] = None;
                self.basic_costs[row] = 0.0;
            }
        }

        let keep: Vec<usize> = (0..self.variables.len())
            .filter(|&j| self.variables[j].kind != VariableKind::Artificial)
            .collect();
        let mut remap = vec![None; self.variables.len()];
        for (new, &old) in keep.iter().enumerate() {
            remap[old] = Some(new);
        }

        self.variables = keep.iter().map(|&j| self.variables[j].clone()).collect();
        self.matrix = self
            .matrix
            .iter()
            .map(|row| keep.iter().map(|&j| row[j]).collect())
            .collect();
        self.objective_costs = keep.iter().map(|&j| self.objective_costs[j]).collect();
        self.costs = self.objective_costs.clone();
        self.basis = self.basis.iter().map(|b| b.and_then(|j| remap[j])).collect();
        self.basic_costs = self
            .basis
            .iter()
            .map(|b| b.map_or(0.0, |j| self.costs[j]))
            .collect();

        self.direction = self.target;
        self.phase = Phase::PhaseTwo;
        self.last_pivot = None;
        self.refresh();
    }

    /// Current value of every non-artificial variable
    fn assignment(&self) -> Vec<Assignment> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.kind != VariableKind::Artificial)
            .map(|(j, v)| Assignment {
                variable: v.name.clone(),
                kind: v.kind,
                value: self.value_of_column(j),
            })
            .collect()
    }

    fn value_of_column(&self, column: usize) -> f64 {
        self.basis
            .iter()
            .position(|&b| b == Some(column))
            .map_or(0.0, |row| self.rhs[row])
    }

    /// Current value of `variable` (0 when non-basic or unknown)
    pub fn value(&self, variable: &str) -> f64 {
        self.variables
            .iter()
            .position(|v| v.name == variable)
            .map_or(0.0, |j| self.value_of_column(j))
    }

    /// Build the solution report. Fails while the tableau is still iterating
    /// or has only finished phase 1.
    pub fn report(&self) -> Result<Solution, SolveError> {
        match self.state {
            State::Iterating => Err(SolveError::NotSolution),
            State::Optimal if self.phase == Phase::PhaseOne => Err(SolveError::NotSolution),
            State::Optimal => Ok(Solution {
                status: SolutionStatus::Optimal,
                objective_value: Some(self.z),
                assignment: self.assignment(),
                iterations: self.iterations,
            }),
            State::Infeasible => Ok(Solution::infeasible(self.iterations)),
            State::Unbounded => Ok(Solution::unbounded(self.iterations)),
            State::NotConverged => Ok(Solution {
                status: SolutionStatus::NotConverged,
                objective_value: Some(self.z),
                assignment: self.assignment(),
                iterations: self.iterations,
            }),
        }
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

    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    pub fn cj_zj(&self) -> &[f64] {
        &self.cj_zj
    }

    /// Basic variable name per row, `None` for rows without one
    pub fn basis(&self) -> Vec<Option<&str>> {
        self.basis
            .iter()
            .map(|b| b.map(|j| self.variables[j].name.as_str()))
            .collect()
    }

    pub fn basic_costs(&self) -> &[f64] {
        &self.basic_costs
    }

    /// `z = Σ basic cost × b` for the objective of the current phase
    pub fn objective_value(&self) -> f64 {
        self.z
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn last_pivot(&self) -> Option<Pivot> {
        self.last_pivot
    }
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Phase::Single => String::new(),
            Phase::PhaseOne => " phase 1".to_string(),
            Phase::PhaseTwo => " phase 2".to_string(),
        };
        let direction = match self.direction {
            Direction::Maximize => "maximize",
            Direction::Minimize => "minimize",
        };
        writeln!(f, "Iteration {}{} ({})", self.iterations, phase, direction)?;

        write!(f, "{:>8} {:>6}", "Cj", "")?;
        for cost in &self.costs {
            write!(f, " {:>8.2}", cost)?;
        }
        writeln!(f)?;

        write!(f, "{:>8} {:>6}", "Cb", "VB")?;
        for var in &self.variables {
            write!(f, " {:>8}", var.name)?;
        }
        writeln!(f, " {:>8}", "b")?;

        for (i, row) in self.matrix.iter().enumerate() {
            let name = self.basis[i].map_or("-", |j| self.variables[j].name.as_str());
            write!(f, "{:>8.2} {:>6}", self.basic_costs[i], name)?;
            for (j, cell) in row.iter().enumerate() {
                let marker = match self.last_pivot {
                    Some(p) if p.row == i && p.column == j => "*",
                    _ => " ",
                };
                write!(f, " {:>7.2}{}", cell, marker)?;
            }
            writeln!(f, " {:>8.2}", self.rhs[i])?;
        }

        write!(f, "{:>8} {:>6}", "Cj-Zj", "")?;
        for v in &self.cj_zj {
            write!(f, " {:>8.2}", v)?;
        }
        writeln!(f, " {:>8.2}", self.z)
    }
}
