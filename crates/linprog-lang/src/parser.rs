use crate::ast::*;
use crate::lexer::{Lexer, Span, Token, TokenKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Malformed term '{term}' at position {span:?}")]
    MalformedTerm { term: String, span: Span },
    #[error("Not a valid objective function: {reason} at position {span:?}")]
    NotValidObjectiveFunction { reason: String, span: Span },
    #[error("Not a valid constraint: {reason} at position {span:?}")]
    NotValidConstraint { reason: String, span: Span },
    #[error("Unexpected token: expected {expected}, found {found} at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

impl ParseError {
    /// Source location of the error, when it is known
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::MalformedTerm { span, .. }
            | ParseError::NotValidObjectiveFunction { span, .. }
            | ParseError::NotValidConstraint { span, .. }
            | ParseError::UnexpectedToken { span, .. } => Some(*span),
            ParseError::UnexpectedEof | ParseError::InvalidNumber(_) => None,
        }
    }
}

/// Line-oriented parser: every non-empty line is one objective or one constraint
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .collect();
        Self { tokens, pos: 0 }
    }

    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = Lexer::tokenize(source);
        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    /// Parse a single objective line such as `max z = 3x + 2y`
    pub fn parse_objective(line: &str) -> Result<ObjectiveDecl, ParseError> {
        let mut parser = Parser::new(Lexer::tokenize(line));
        parser.skip_newlines();
        if parser.at_statement_end() {
            return Err(ParseError::UnexpectedEof);
        }
        let objective = parser.parse_objective_decl()?;
        parser.expect_end_of_input()?;
        Ok(objective)
    }

    /// Parse a single constraint line such as `x1 + 2x2 >= 40`
    pub fn parse_constraint(line: &str) -> Result<ConstraintDecl, ParseError> {
        let mut parser = Parser::new(Lexer::tokenize(line));
        parser.skip_newlines();
        if parser.at_statement_end() {
            return Err(ParseError::UnexpectedEof);
        }
        let constraint = parser.parse_constraint_decl()?;
        parser.expect_end_of_input()?;
        Ok(constraint)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn current_span(&self) -> Span {
        match self.current().or(self.tokens.last()) {
            Some(t) => t.span,
            None => Span::new(0, 0),
        }
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn skip_newlines(&mut self) {
        while self.peek_kind() == TokenKind::Newline {
            self.advance();
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Eof)
    }

    fn at_terms_end(&self) -> bool {
        self.at_statement_end() || self.peek_kind().is_relational()
    }

    /// Tokens from the cursor up to the end of the current line
    fn statement(&self) -> &[Token] {
        let rest = self.tokens.get(self.pos..).unwrap_or(&[]);
        let len = rest
            .iter()
            .position(|t| matches!(t.kind, TokenKind::Newline | TokenKind::Eof))
            .unwrap_or(rest.len());
        &rest[..len]
    }

    fn statement_span(&self) -> Span {
        let statement = self.statement();
        match (statement.first(), statement.last()) {
            (Some(first), Some(last)) => first.span.merge(last.span),
            _ => self.current_span(),
        }
    }

    fn expect_end_of_input(&mut self) -> Result<(), ParseError> {
        self.skip_newlines();
        match self.current() {
            Some(t) if t.kind != TokenKind::Eof => Err(ParseError::UnexpectedToken {
                expected: "end of input".to_string(),
                found: t.text.clone(),
                span: t.span,
            }),
            _ => Ok(()),
        }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut items = Vec::new();

        loop {
            self.skip_newlines();

            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Max | TokenKind::Min => {
                    items.push(Item::Objective(self.parse_objective_decl()?))
                }
                _ => items.push(Item::Constraint(self.parse_constraint_decl()?)),
            }
        }

        Ok(Program { items })
    }

    fn parse_objective_decl(&mut self) -> Result<ObjectiveDecl, ParseError> {
        let span = self.statement_span();
        let invalid = |reason: &str| ParseError::NotValidObjectiveFunction {
            reason: reason.to_string(),
            span,
        };

        let statement = self.statement();
        let equals = statement.iter().filter(|t| t.kind == TokenKind::Eq).count();
        if equals != 1 {
            return Err(invalid(&format!("expected exactly one '=', found {}", equals)));
        }
        if statement
            .iter()
            .any(|t| matches!(t.kind, TokenKind::Le | TokenKind::Ge))
        {
            return Err(invalid("an objective cannot contain an inequality"));
        }

        let sense = match self.peek_kind() {
            TokenKind::Max => Sense::Max,
            TokenKind::Min => Sense::Min,
            _ => return Err(invalid("expected 'max' or 'min'")),
        };
        self.advance();

        let name = match self.current() {
            Some(t) if t.kind == TokenKind::Ident => t.text.clone(),
            _ => return Err(invalid("expected the objective name before '='")),
        };
        self.advance();

        if self.peek_kind() != TokenKind::Eq {
            return Err(invalid("expected '=' after the objective name"));
        }
        self.advance();

        let terms = self.parse_terms()?;
        if terms.is_empty() {
            return Err(invalid("the objective has no terms"));
        }

        Ok(ObjectiveDecl {
            span,
            sense,
            name,
            terms,
        })
    }

    fn parse_constraint_decl(&mut self) -> Result<ConstraintDecl, ParseError> {
        let span = self.statement_span();
        let invalid = |reason: &str| ParseError::NotValidConstraint {
            reason: reason.to_string(),
            span,
        };

        let relations = self
            .statement()
            .iter()
            .filter(|t| t.kind.is_relational())
            .count();
        if relations != 1 {
            return Err(invalid(&format!(
                "expected exactly one of '=', '<=', '>=', found {}",
                relations
            )));
        }

        let terms = self.parse_terms()?;
        if terms.is_empty() {
            return Err(invalid("no terms before the relational operator"));
        }

        let relation = match self.peek_kind() {
            TokenKind::Eq => Relation::Eq,
            TokenKind::Le => Relation::Le,
            TokenKind::Ge => Relation::Ge,
            _ => return Err(invalid("expected '=', '<=' or '>='")),
        };
        self.advance();

        let sign = match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                -1.0
            }
            TokenKind::Plus => {
                self.advance();
                1.0
            }
            _ => 1.0,
        };
        if self.peek_kind() != TokenKind::Number {
            return Err(invalid("the right-hand side must be a number"));
        }
        let rhs = sign * self.parse_number()?;
        if !self.at_statement_end() {
            return Err(invalid("the right-hand side must be a single number"));
        }

        Ok(ConstraintDecl {
            span,
            terms,
            relation,
            rhs,
        })
    }

    fn parse_terms(&mut self) -> Result<Vec<TermNode>, ParseError> {
        let mut terms = Vec::new();
        while !self.at_terms_end() {
            let term = self.parse_term(terms.is_empty())?;
            terms.push(term);
        }
        Ok(terms)
    }

    /// `[+|-] [coefficient [*]] identifier`; only the first term may omit its sign
    fn parse_term(&mut self, first: bool) -> Result<TermNode, ParseError> {
        let from = self.pos;
        let start = self.current_span();

        if let Some(t) = self.current() {
            if t.kind == TokenKind::Error {
                return Err(ParseError::UnexpectedToken {
                    expected: "a term".to_string(),
                    found: t.text.clone(),
                    span: t.span,
                });
            }
        }

        let sign = match self.peek_kind() {
            TokenKind::Plus => {
                self.advance();
                1.0
            }
            TokenKind::Minus => {
                self.advance();
                -1.0
            }
            _ if first => 1.0,
            _ => return Err(self.malformed_term(from)),
        };

        let mut coefficient = 1.0;
        if self.peek_kind() == TokenKind::Number {
            coefficient = self.parse_number()?;
            if self.peek_kind() == TokenKind::Star {
                self.advance();
            }
        }

        let variable = match self.current() {
            Some(t) if t.kind == TokenKind::Ident => t.clone(),
            _ => return Err(self.malformed_term(from)),
        };
        self.advance();

        Ok(TermNode {
            span: start.merge(variable.span),
            coefficient: sign * coefficient,
            variable: variable.text,
        })
    }

    /// Error covering the tokens of the term starting at `from`
    fn malformed_term(&self, from: usize) -> ParseError {
        let rest = self.tokens.get(from..).unwrap_or(&[]);
        let mut parts: Vec<&Token> = Vec::new();
        for (i, token) in rest.iter().enumerate() {
            let is_sign = matches!(token.kind, TokenKind::Plus | TokenKind::Minus);
            let is_end = matches!(token.kind, TokenKind::Newline | TokenKind::Eof)
                || token.kind.is_relational();
            if is_end || (is_sign && i > 0) {
                break;
            }
            parts.push(token);
        }

        let span = match (parts.first(), parts.last()) {
            (Some(first), Some(last)) => first.span.merge(last.span),
            _ => self.current_span(),
        };
        let term = parts
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        ParseError::MalformedTerm { term, span }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        let text = match self.current() {
            Some(t) if t.kind == TokenKind::Number => t.text.clone(),
            Some(t) => {
                return Err(ParseError::UnexpectedToken {
                    expected: "number".to_string(),
                    found: t.text.clone(),
                    span: t.span,
                })
            }
            None => return Err(ParseError::UnexpectedEof),
        };
        self.advance();
        text.parse::<f64>()
            .map_err(|_| ParseError::InvalidNumber(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coefficients(terms: &[TermNode]) -> Vec<(f64, &str)> {
        terms
            .iter()
            .map(|t| (t.coefficient, t.variable.as_str()))
            .collect()
    }

    #[test]
    fn test_parse_objective() {
        let objective = Parser::parse_objective("max z = 7t1 + 5t2 + 4t3").unwrap();
        assert_eq!(objective.sense, Sense::Max);
        assert_eq!(objective.name, "z");
        assert_eq!(
            coefficients(&objective.terms),
            vec![(7.0, "t1"), (5.0, "t2"), (4.0, "t3")]
        );
    }

    #[test]
    fn test_parse_objective_long_keyword() {
        let objective = Parser::parse_objective("minimize cost = 0.05x4 - x1").unwrap();
        assert_eq!(objective.sense, Sense::Min);
        assert_eq!(coefficients(&objective.terms), vec![(0.05, "x4"), (-1.0, "x1")]);
    }

    #[test]
    fn test_parse_constraint() {
        let constraint = Parser::parse_constraint("x1 + 2 x2 >= 40").unwrap();
        assert_eq!(constraint.relation, Relation::Ge);
        assert_eq!(constraint.rhs, 40.0);
        assert_eq!(coefficients(&constraint.terms), vec![(1.0, "x1"), (2.0, "x2")]);
    }

    #[test]
    fn test_parse_constraint_signs_and_star() {
        let constraint = Parser::parse_constraint("- x + 3*y - 0.5 z ≤ -2").unwrap();
        assert_eq!(constraint.relation, Relation::Le);
        assert_eq!(constraint.rhs, -2.0);
        assert_eq!(
            coefficients(&constraint.terms),
            vec![(-1.0, "x"), (3.0, "y"), (-0.5, "z")]
        );
    }

    #[test]
    fn test_objective_requires_one_equals() {
        assert!(matches!(
            Parser::parse_objective("max z 3x + 2y"),
            Err(ParseError::NotValidObjectiveFunction { .. })
        ));
        assert!(matches!(
            Parser::parse_objective("max z = 3x = 2y"),
            Err(ParseError::NotValidObjectiveFunction { .. })
        ));
    }

    #[test]
    fn test_objective_requires_direction_and_name() {
        assert!(matches!(
            Parser::parse_objective("z = 3x"),
            Err(ParseError::NotValidObjectiveFunction { .. })
        ));
        assert!(matches!(
            Parser::parse_objective("max = 3x"),
            Err(ParseError::NotValidObjectiveFunction { .. })
        ));
    }

    #[test]
    fn test_constraint_requires_one_relation() {
        assert!(matches!(
            Parser::parse_constraint("x + y 4"),
            Err(ParseError::NotValidConstraint { .. })
        ));
        assert!(matches!(
            Parser::parse_constraint("0 <= x <= 4"),
            Err(ParseError::NotValidConstraint { .. })
        ));
    }

    #[test]
    fn test_constraint_rhs_must_be_number() {
        assert!(matches!(
            Parser::parse_constraint("x + y <= z"),
            Err(ParseError::NotValidConstraint { .. })
        ));
    }

    #[test]
    fn test_malformed_term() {
        let err = Parser::parse_constraint("x1 + 2 3 <= 4").unwrap_err();
        match err {
            ParseError::MalformedTerm { term, .. } => assert_eq!(term, "+ 2 3"),
            other => panic!("unexpected error: {:?}", other),
        }

        let err = Parser::parse_constraint("x1 x2 <= 4").unwrap_err();
        assert!(matches!(err, ParseError::MalformedTerm { ref term, .. } if term == "x2"));
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(Parser::parse_constraint("   "), Err(ParseError::UnexpectedEof));
    }

    #[test]
    fn test_parse_program() {
        let source = r#"
            // production plan
            max z = 3x + 2y
            x + y <= 4   /* capacity */
            x + 3y <= 6

            x >= 0
        "#;
        let program = Parser::parse(source).unwrap();
        assert_eq!(program.items.len(), 4);
        assert_eq!(program.objectives().count(), 1);
        assert_eq!(program.constraints().count(), 3);
    }

    #[test]
    fn test_error_span_points_at_line() {
        let source = "max z = x\nx + <= 3\n";
        let err = Parser::parse(source).unwrap_err();
        let span = err.span().unwrap();
        assert_eq!(&source[span.start..span.end], "+");
    }
}
