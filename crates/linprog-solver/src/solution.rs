use thiserror::Error;

use crate::standard::VariableKind;

/// The result of solving an LP problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Objective value at the final tableau; `None` when the problem is
    /// infeasible or unbounded
    pub objective_value: Option<f64>,
    /// Final value of every decision and slack variable; absent variables are 0
    pub assignment: Vec<Assignment>,
    /// Total simplex iterations over both phases
    pub iterations: usize,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (phase 1 could not drive the artificials to zero)
    Infeasible,
    /// The objective can be improved without limit
    Unbounded,
    /// The iteration limit was reached before a terminal state
    NotConverged,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub variable: String,
    pub kind: VariableKind,
    pub value: f64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("Solution not reached yet: the tableau is still iterating")]
    NotSolution,
}

impl Solution {
    pub fn infeasible(iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            objective_value: None,
            assignment: Vec::new(),
            iterations,
        }
    }

    pub fn unbounded(iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Unbounded,
            objective_value: None,
            assignment: Vec::new(),
            iterations,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    /// Value of `variable`; variables missing from the assignment are 0
    pub fn value(&self, variable: &str) -> f64 {
        self.assignment
            .iter()
            .find(|a| a.variable == variable)
            .map(|a| a.value)
            .unwrap_or(0.0)
    }

    /// Decision variable values only, in column order
    pub fn decision_values(&self) -> impl Iterator<Item = (&str, f64)> {
        self.assignment
            .iter()
            .filter(|a| a.kind == VariableKind::Decision)
            .map(|a| (a.variable.as_str(), a.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_variables_are_zero() {
        let solution = Solution {
            status: SolutionStatus::Optimal,
            objective_value: Some(3.0),
            assignment: vec![
                Assignment {
                    variable: "x1".to_string(),
                    kind: VariableKind::Decision,
                    value: 3.0,
                },
                Assignment {
                    variable: "s1".to_string(),
                    kind: VariableKind::Slack,
                    value: 1.0,
                },
            ],
            iterations: 1,
        };
        assert_eq!(solution.value("x1"), 3.0);
        assert_eq!(solution.value("x2"), 0.0);
        assert_eq!(solution.decision_values().collect::<Vec<_>>(), vec![("x1", 3.0)]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&Solution::infeasible(2)).unwrap();
        assert!(json.contains("\"status\":\"infeasible\""), "{}", json);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_round_trip_without_objective_value() {
        for solution in [Solution::infeasible(1), Solution::unbounded(3)] {
            let json = serde_json::to_string(&solution).unwrap();
            assert!(json.contains("\"objective_value\":null"), "{}", json);
            let parsed: Solution = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, solution);
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_round_trip_optimal() {
        let solution = Solution {
            status: SolutionStatus::Optimal,
            objective_value: Some(52.5),
            assignment: vec![Assignment {
                variable: "x2".to_string(),
                kind: VariableKind::Decision,
                value: 8.75,
            }],
            iterations: 1,
        };
        let json = serde_json::to_string(&solution).unwrap();
        let parsed: Solution = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, solution);
    }
}
