use crate::lexer::Span;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<Item>,
}

impl Program {
    pub fn objectives(&self) -> impl Iterator<Item = &ObjectiveDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Objective(o) => Some(o),
            Item::Constraint(_) => None,
        })
    }

    pub fn constraints(&self) -> impl Iterator<Item = &ConstraintDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Constraint(c) => Some(c),
            Item::Objective(_) => None,
        })
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Objective(ObjectiveDecl),
    Constraint(ConstraintDecl),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Max,
    Min,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

/// `max z = 5x1 + 6x2`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveDecl {
    pub span: Span,
    pub sense: Sense,
    pub name: String,
    pub terms: Vec<TermNode>,
}

/// `x1 + 2x2 >= 40`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDecl {
    pub span: Span,
    pub terms: Vec<TermNode>,
    pub relation: Relation,
    pub rhs: f64,
}

/// A signed coefficient applied to a variable; the sign is folded into `coefficient`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TermNode {
    pub span: Span,
    pub coefficient: f64,
    pub variable: String,
}
