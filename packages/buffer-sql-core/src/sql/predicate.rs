//! WHERE-clause tokenizer, expression tree and evaluator.
//!
//! Grammar:
//!
//! ```text
//! expr       := and_expr ( OR and_expr )*
//! and_expr   := primary ( AND primary )*
//! primary    := '(' expr ')' | comparison
//! comparison := operand op operand
//! operand    := identifier | number | quoted string
//! op         := = | <> | != | < | <= | > | >=
//! ```
//!
//! `AND` binds tighter than `OR`. Identifiers name columns. Literals compared
//! with an int column are read as any finite number, so `n < 70000` holds on
//! every row of an `int(2)` column. A doubled quote inside a quoted literal is
//! an escaped quote.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{DbError, Result};
use crate::table::{Column, TableDescriptor};
use crate::types::Comparand;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }

    /// Operator with its operands swapped (`a < b` ⇔ `b > a`).
    pub fn flip(&self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::NotEq => CompareOp::NotEq,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::LtEq => CompareOp::GtEq,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::GtEq => CompareOp::LtEq,
        }
    }

    /// Whether `ordering` (left compared to right) satisfies the operator.
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    /// Literal text as written, quotes included
    Literal(String),
    Op(CompareOp),
    And,
    Or,
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '\'' | '"' | '`' => {
                chars.next();
                // A doubled quote inside the literal is an escaped quote
                let mut end = None;
                while let Some((i, ch)) = chars.next() {
                    if ch == c {
                        if matches!(chars.peek(), Some(&(_, next)) if next == c) {
                            chars.next();
                            continue;
                        }
                        end = Some(i);
                        break;
                    }
                }
                let end = end.ok_or_else(|| {
                    DbError::InvalidPredicate(format!("unclosed quote at byte {}", start))
                })?;
                if c == '`' {
                    tokens.push(Token::Ident(text[start + 1..end].to_string()));
                } else {
                    tokens.push(Token::Literal(text[start..=end].to_string()));
                }
            }
            '=' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                }
                tokens.push(Token::Op(CompareOp::Eq));
            }
            '<' => {
                chars.next();
                let op = match chars.peek() {
                    Some(&(_, '=')) => CompareOp::LtEq,
                    Some(&(_, '>')) => CompareOp::NotEq,
                    _ => CompareOp::Lt,
                };
                if op != CompareOp::Lt {
                    chars.next();
                }
                tokens.push(Token::Op(op));
            }
            '>' => {
                chars.next();
                let op = if matches!(chars.peek(), Some(&(_, '='))) {
                    chars.next();
                    CompareOp::GtEq
                } else {
                    CompareOp::Gt
                };
                tokens.push(Token::Op(op));
            }
            '!' => {
                chars.next();
                match chars.next() {
                    Some((_, '=')) => tokens.push(Token::Op(CompareOp::NotEq)),
                    _ => {
                        return Err(DbError::InvalidPredicate(format!(
                            "expected '=' after '!' at byte {}",
                            start
                        )))
                    }
                }
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let mut end = start;
                while let Some(&(i, ch)) = chars.peek() {
                    if i != start && !(ch.is_ascii_alphanumeric() || ch == '.') {
                        break;
                    }
                    end = i + ch.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Literal(text[start..end].to_string()));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, ch)) = chars.peek() {
                    if !(ch.is_alphanumeric() || ch == '_' || ch == '.') {
                        break;
                    }
                    end = i + ch.len_utf8();
                    chars.next();
                }
                let word = &text[start..end];
                if word.eq_ignore_ascii_case("AND") {
                    tokens.push(Token::And);
                } else if word.eq_ignore_ascii_case("OR") {
                    tokens.push(Token::Or);
                } else {
                    tokens.push(Token::Ident(word.to_string()));
                }
            }
            other => {
                return Err(DbError::InvalidPredicate(format!(
                    "unexpected character '{}' at byte {}",
                    other, start
                )))
            }
        }
    }

    Ok(tokens)
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Column(String),
    /// Literal text as written, quotes included
    Literal(String),
}

/// Parsed, unbound predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(name) | Operand::Literal(name) => f.write_str(name),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { left, op, right } => write!(f, "{} {} {}", left, op.symbol(), right),
            Expr::And(l, r) => write!(f, "({} AND {})", l, r),
            Expr::Or(l, r) => write!(f, "({} OR {})", l, r),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.primary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.primary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.expr()?;
            return match self.next() {
                Some(Token::RParen) => Ok(inner),
                _ => Err(DbError::InvalidPredicate("missing ')'".to_string())),
            };
        }

        let left = self.operand()?;
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            other => {
                return Err(DbError::InvalidPredicate(format!(
                    "expected comparison operator after '{}', found {:?}",
                    left, other
                )))
            }
        };
        let right = self.operand()?;
        Ok(Expr::Compare { left, op, right })
    }

    fn operand(&mut self) -> Result<Operand> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(Operand::Column(name)),
            Some(Token::Literal(text)) => Ok(Operand::Literal(text)),
            other => Err(DbError::InvalidPredicate(format!(
                "expected column or literal, found {:?}",
                other
            ))),
        }
    }
}

/// Parses WHERE-clause text into an expression tree.
pub fn parse(text: &str) -> Result<Expr> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(DbError::InvalidPredicate("empty WHERE clause".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr()?;
    if let Some(extra) = parser.peek() {
        return Err(DbError::InvalidPredicate(format!(
            "unexpected {:?} after complete predicate",
            extra
        )));
    }
    Ok(expr)
}

/// Predicate resolved against a table schema, ready to evaluate on rows.
#[derive(Debug, Clone)]
pub enum BoundExpr {
    /// Column compared to a literal
    ColumnValue {
        column: Column,
        op: CompareOp,
        value: Comparand,
    },
    /// Two columns of the same type compared to each other
    ColumnColumn {
        left: Column,
        op: CompareOp,
        right: Column,
    },
    And(Box<BoundExpr>, Box<BoundExpr>),
    Or(Box<BoundExpr>, Box<BoundExpr>),
}

impl Expr {
    /// Resolves column names and parses literals against `table`.
    ///
    /// # Errors
    /// - `UnknownColumn` for a name the table does not declare
    /// - `InvalidLiteral` for a literal that is not a number on an int column
    /// - `InvalidPredicate` for literal-to-literal comparisons or columns of
    ///   different types
    pub fn bind(&self, table: &TableDescriptor) -> Result<BoundExpr> {
        match self {
            Expr::And(l, r) => Ok(BoundExpr::And(Box::new(l.bind(table)?), Box::new(r.bind(table)?))),
            Expr::Or(l, r) => Ok(BoundExpr::Or(Box::new(l.bind(table)?), Box::new(r.bind(table)?))),
            Expr::Compare { left, op, right } => match (left, right) {
                (Operand::Column(name), Operand::Literal(text)) => {
                    let column = table.get_column(name)?.clone();
                    let value = column.parse_comparand(text)?;
                    Ok(BoundExpr::ColumnValue { column, op: *op, value })
                }
                (Operand::Literal(text), Operand::Column(name)) => {
                    let column = table.get_column(name)?.clone();
                    let value = column.parse_comparand(text)?;
                    Ok(BoundExpr::ColumnValue {
                        column,
                        op: op.flip(),
                        value,
                    })
                }
                (Operand::Column(l), Operand::Column(r)) => {
                    let left = table.get_column(l)?.clone();
                    let right = table.get_column(r)?.clone();
                    if left.column_type.name() != right.column_type.name() {
                        return Err(DbError::InvalidPredicate(format!(
                            "cannot compare {} column '{}' with {} column '{}'",
                            left.column_type, left.name, right.column_type, right.name
                        )));
                    }
                    Ok(BoundExpr::ColumnColumn { left, op: *op, right })
                }
                (Operand::Literal(l), Operand::Literal(r)) => Err(DbError::InvalidPredicate(format!(
                    "comparison '{} {} {}' does not reference a column",
                    l,
                    op.symbol(),
                    r
                ))),
            },
        }
    }
}

impl BoundExpr {
    /// Evaluates the predicate against one row's bytes.
    pub fn evaluate(&self, row: &[u8]) -> bool {
        match self {
            BoundExpr::ColumnValue { column, op, value } => {
                value
                    .compare(&column.decode_from_row(row))
                    .is_some_and(|ordering| op.holds(ordering))
            }
            BoundExpr::ColumnColumn { left, op, right } => {
                op.holds(left.decode_from_row(row).cmp(&right.decode_from_row(row)))
            }
            BoundExpr::And(l, r) => l.evaluate(row) && r.evaluate(row),
            BoundExpr::Or(l, r) => l.evaluate(row) || r.evaluate(row),
        }
    }
}
