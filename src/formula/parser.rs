//! Parser for the textual formula grammar.
//!
//! Supported syntax:
//! - Variables: `match$$fox`, `term$$title:fox`, weight literals `w$$0$4`
//! - Constants: `True`, `False`
//! - Negation: `!x`, `!(x)`
//! - Conjunction and disjunction: `x && y`, `x || y` (`&&` binds tighter)
//! - Parentheses for grouping
//!
//! Variable names run up to the next `(`, `)`, `!`, `&` or `|` and are
//! trimmed, so values containing spaces are accepted. Blank input parses to
//! [`Formula::Empty`].

use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{CqqlError, Result};
use crate::formula::Formula;
use crate::formula::literal::Variable;

/// Parse formula text into a [`Formula`] tree.
pub fn parse_formula(text: &str) -> Result<Formula> {
    if text.trim().is_empty() {
        return Ok(Formula::Empty);
    }

    let mut parser = FormulaParser::new(text);
    let formula = parser.parse_or()?;
    parser.skip_whitespace();
    if let Some((position, ch)) = parser.chars.peek().copied() {
        return Err(CqqlError::syntax(
            position,
            format!("unexpected '{ch}' after complete formula"),
        ));
    }
    Ok(formula)
}

struct FormulaParser<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> FormulaParser<'a> {
    fn new(text: &'a str) -> Self {
        FormulaParser {
            text,
            chars: text.char_indices().peekable(),
        }
    }

    fn parse_or(&mut self) -> Result<Formula> {
        let mut children = vec![self.parse_and()?];
        while self.consume_operator('|')? {
            children.push(self.parse_and()?);
        }
        Ok(collapse(children, Formula::Or))
    }

    fn parse_and(&mut self) -> Result<Formula> {
        let mut children = vec![self.parse_unary()?];
        while self.consume_operator('&')? {
            children.push(self.parse_unary()?);
        }
        Ok(collapse(children, Formula::And))
    }

    fn parse_unary(&mut self) -> Result<Formula> {
        self.skip_whitespace();
        match self.chars.peek().copied() {
            None => Err(CqqlError::syntax(
                self.text.len(),
                "expected an operand but found end of input",
            )),
            Some((_, '!')) => {
                self.chars.next();
                Ok(Formula::not(self.parse_unary()?))
            }
            Some((open, '(')) => {
                self.chars.next();
                let inner = self.parse_or()?;
                self.skip_whitespace();
                match self.chars.next() {
                    Some((_, ')')) => Ok(inner),
                    Some((position, ch)) => Err(CqqlError::syntax(
                        position,
                        format!("expected ')' to close '(' at {open}, found '{ch}'"),
                    )),
                    None => Err(CqqlError::syntax(
                        self.text.len(),
                        format!("unclosed '(' at {open}"),
                    )),
                }
            }
            Some((position, ch)) if is_reserved(ch) => Err(CqqlError::syntax(
                position,
                format!("expected an operand but found '{ch}'"),
            )),
            Some((start, _)) => self.parse_atom(start),
        }
    }

    fn parse_atom(&mut self, start: usize) -> Result<Formula> {
        let mut end = start;
        while let Some((position, ch)) = self.chars.peek().copied() {
            if is_reserved(ch) {
                break;
            }
            end = position + ch.len_utf8();
            self.chars.next();
        }
        let name = self.text[start..end].trim();
        match name {
            "True" => Ok(Formula::True),
            "False" => Ok(Formula::False),
            _ => Variable::from_name(name)
                .map(Formula::Var)
                .map_err(|e| CqqlError::syntax(start, e.to_string())),
        }
    }

    /// Consume a doubled operator such as `&&`. Returns false if the next
    /// token is not that operator.
    fn consume_operator(&mut self, symbol: char) -> Result<bool> {
        self.skip_whitespace();
        match self.chars.peek().copied() {
            Some((position, ch)) if ch == symbol => {
                self.chars.next();
                match self.chars.next() {
                    Some((_, second)) if second == symbol => Ok(true),
                    _ => Err(CqqlError::syntax(
                        position,
                        format!("expected '{symbol}{symbol}'"),
                    )),
                }
            }
            _ => Ok(false),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some((_, ch)) = self.chars.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.chars.next();
        }
    }
}

fn is_reserved(ch: char) -> bool {
    matches!(ch, '(' | ')' | '!' | '&' | '|')
}

fn collapse(mut children: Vec<Formula>, combine: fn(Vec<Formula>) -> Formula) -> Formula {
    if children.len() == 1 {
        children.remove(0)
    } else {
        combine(children)
    }
}
