use std::fmt;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Malformed term: {0}")]
    MalformedTerm(String),
    #[error("Right-hand side is not a finite number: {0}")]
    InvalidRightHandSide(f64),
}

/// A single `coefficient * variable` term, sign already folded into the coefficient
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub coefficient: f64,
    pub variable: String,
}

impl Term {
    pub fn new(coefficient: f64, variable: impl Into<String>) -> Self {
        Self {
            coefficient,
            variable: variable.into(),
        }
    }
}

/// Returns true if `name` can be used as a variable identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Merge repeated variables by summing their coefficients.
///
/// Variables keep their first-occurrence order, so `3x + y + 2x` becomes
/// `5x + y`.
pub fn merge_duplicates(variables: &[String], coefficients: &[f64]) -> (Vec<String>, Vec<f64>) {
    let mut merged_vars: Vec<String> = Vec::with_capacity(variables.len());
    let mut merged_coefs: Vec<f64> = Vec::with_capacity(coefficients.len());

    for (var, &coef) in variables.iter().zip(coefficients) {
        match merged_vars.iter().position(|v| v == var) {
            Some(idx) => merged_coefs[idx] += coef,
            None => {
                merged_vars.push(var.clone());
                merged_coefs.push(coef);
            }
        }
    }

    (merged_vars, merged_coefs)
}

/// An ordered mapping from variable name to coefficient with no repeated names
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "ExpressionParts"))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearExpression {
    variables: Vec<String>,
    coefficients: Vec<f64>,
}

/// Deserialized form of [`LinearExpression`], checked by `from_terms`
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct ExpressionParts {
    variables: Vec<String>,
    coefficients: Vec<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<ExpressionParts> for LinearExpression {
    type Error = ModelError;

    fn try_from(parts: ExpressionParts) -> Result<Self, Self::Error> {
        if parts.variables.len() != parts.coefficients.len() {
            return Err(ModelError::MalformedTerm(format!(
                "{} variables but {} coefficients",
                parts.variables.len(),
                parts.coefficients.len()
            )));
        }
        let terms = parts
            .coefficients
            .into_iter()
            .zip(parts.variables)
            .map(|(coefficient, variable)| Term::new(coefficient, variable));
        Self::from_terms(terms)
    }
}

impl LinearExpression {
    /// Build an expression from parsed terms, merging repeated variables
    pub fn from_terms<I>(terms: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = Term>,
    {
        let mut variables = Vec::new();
        let mut coefficients = Vec::new();

        for term in terms {
            if !is_identifier(&term.variable) {
                return Err(ModelError::MalformedTerm(format!(
                    "'{}' is not a variable name",
                    term.variable
                )));
            }
            if !term.coefficient.is_finite() {
                return Err(ModelError::MalformedTerm(format!(
                    "coefficient {} of {} is not a finite number",
                    term.coefficient, term.variable
                )));
            }
            variables.push(term.variable);
            coefficients.push(term.coefficient);
        }

        let (variables, coefficients) = merge_duplicates(&variables, &coefficients);
        Ok(Self {
            variables,
            coefficients,
        })
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Coefficient of `variable`, or `None` if the expression does not reference it
    pub fn coefficient(&self, variable: &str) -> Option<f64> {
        self.variables
            .iter()
            .position(|v| v == variable)
            .map(|idx| self.coefficients[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.variables
            .iter()
            .map(String::as_str)
            .zip(self.coefficients.iter().copied())
    }

    pub fn terms(&self) -> Vec<Term> {
        self.iter().map(|(var, coef)| Term::new(coef, var)).collect()
    }
}

impl fmt::Display for LinearExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0");
        }
        for (i, (var, coef)) in self.iter().enumerate() {
            let magnitude = coef.abs();
            match (i, coef < 0.0) {
                (0, false) => {}
                (0, true) => write!(f, "-")?,
                (_, false) => write!(f, " + ")?,
                (_, true) => write!(f, " - ")?,
            }
            if magnitude == 1.0 {
                write!(f, "{}", var)?;
            } else {
                write!(f, "{} {}", magnitude, var)?;
            }
        }
        Ok(())
    }
}
