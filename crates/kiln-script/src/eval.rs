//! Restricted arithmetic evaluation
//!
//! Evaluates expression text extracted from script source against a
//! [`SymbolTable`]. The grammar is deliberately tiny: numeric literals,
//! named parameters, `+ - * /` and parentheses. Anything else is an error,
//! which callers treat as "this site is not evaluable" — a skipped check,
//! never an execution of script content.

use crate::SymbolTable;

/// Errors from restricted expression evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Expression references a name not present in the symbol table
    #[error("unresolved symbol `{0}`")]
    UnresolvedSymbol(String),

    /// Character outside the restricted grammar
    #[error("unexpected character `{0}` in expression")]
    UnexpectedChar(char),

    /// Expression ended where a value or operator was expected
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// Token in an invalid position
    #[error("unexpected token at offset {0}")]
    UnexpectedToken(usize),

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Empty expression text
    #[error("empty expression")]
    Empty,

    /// Result overflowed to a non-finite value
    #[error("expression result is not finite")]
    NonFinite,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();

    while let Some(&(_, c)) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| EvalError::UnexpectedChar('.'))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(EvalError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    symbols: &'a SymbolTable,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Token::Minus => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Token::Slash => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // factor := NUMBER | IDENT | '-' factor | '(' expression ')'
    fn factor(&mut self) -> Result<f64, EvalError> {
        let position = self.pos;
        match self.advance() {
            Some(Token::Number(value)) => Ok(*value),
            Some(Token::Ident(name)) => self
                .symbols
                .get(name)
                .ok_or_else(|| EvalError::UnresolvedSymbol(name.clone())),
            Some(Token::Minus) => Ok(-self.factor()?),
            Some(Token::LParen) => {
                let value = self.expression()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    Some(_) => Err(EvalError::UnexpectedToken(self.pos - 1)),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some(_) => Err(EvalError::UnexpectedToken(position)),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

/// Evaluate an expression against the symbol table
///
/// # Errors
/// Any deviation from the restricted grammar, an unresolved symbol, or a
/// non-finite result. Callers use the error to skip the check at this site.
pub fn evaluate(expr: &str, symbols: &SymbolTable) -> Result<f64, EvalError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        symbols,
    };
    let value = parser.expression()?;
    if parser.pos != tokens.len() {
        return Err(EvalError::UnexpectedToken(parser.pos));
    }
    if !value.is_finite() {
        return Err(EvalError::NonFinite);
    }
    Ok(value)
}

/// Whether the expression text contains a division operator
///
/// Deliberately textual: the caller's contract rejects division regardless of
/// whether the surrounding expression is evaluable.
#[inline]
#[must_use]
pub fn contains_division(expr: &str) -> bool {
    expr.contains('/')
}

/// Count binary arithmetic operators in the expression
///
/// Unary minus is not counted. Falls back to a plain character count when the
/// text does not tokenize, so unparseable expressions still get a complexity
/// estimate.
#[must_use]
pub fn operator_count(expr: &str) -> usize {
    match tokenize(expr) {
        Ok(tokens) => {
            let mut count = 0;
            let mut prev_is_operand = false;
            for token in &tokens {
                match token {
                    Token::Plus | Token::Star | Token::Slash => {
                        count += 1;
                        prev_is_operand = false;
                    }
                    Token::Minus => {
                        if prev_is_operand {
                            count += 1;
                        }
                        prev_is_operand = false;
                    }
                    Token::Number(_) | Token::Ident(_) | Token::RParen => {
                        prev_is_operand = true;
                    }
                    Token::LParen => {
                        prev_is_operand = false;
                    }
                }
            }
            count
        }
        Err(_) => expr.matches(['+', '-', '*', '/']).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Script;

    fn symbols(script: &str) -> SymbolTable {
        SymbolTable::extract(&Script::new(script))
    }

    #[test]
    fn evaluates_literals_and_precedence() {
        let table = SymbolTable::empty();
        assert_eq!(evaluate("2 + 3 * 4", &table).unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4", &table).unwrap(), 20.0);
        assert_eq!(evaluate("10 / 4", &table).unwrap(), 2.5);
    }

    #[test]
    fn resolves_named_parameters() {
        let table = symbols("radius = 10;\nheight = 40;");
        assert_eq!(evaluate("height / radius", &table).unwrap(), 4.0);
        assert_eq!(evaluate("radius + 2", &table).unwrap(), 12.0);
    }

    #[test]
    fn unary_minus() {
        let table = symbols("r = 5;");
        assert_eq!(evaluate("-r", &table).unwrap(), -5.0);
        assert_eq!(evaluate("2 - -3", &table).unwrap(), 5.0);
    }

    #[test]
    fn unresolved_symbol_is_an_error() {
        let table = SymbolTable::empty();
        assert_eq!(
            evaluate("width * 2", &table),
            Err(EvalError::UnresolvedSymbol("width".to_string()))
        );
    }

    #[test]
    fn rejects_non_arithmetic_tokens() {
        let table = SymbolTable::empty();
        assert!(matches!(
            evaluate("max(1, 2)", &table),
            Err(EvalError::UnexpectedChar(','))
        ));
        assert!(matches!(
            evaluate("1 ^ 2", &table),
            Err(EvalError::UnexpectedChar('^'))
        ));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let table = SymbolTable::empty();
        assert_eq!(evaluate("1 / 0", &table), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn empty_and_dangling_input() {
        let table = SymbolTable::empty();
        assert_eq!(evaluate("", &table), Err(EvalError::Empty));
        assert_eq!(evaluate("   ", &table), Err(EvalError::Empty));
        assert_eq!(evaluate("1 +", &table), Err(EvalError::UnexpectedEnd));
        assert!(matches!(
            evaluate("(1 + 2", &table),
            Err(EvalError::UnexpectedEnd)
        ));
    }

    #[test]
    fn trailing_tokens_rejected() {
        let table = SymbolTable::empty();
        assert!(matches!(
            evaluate("1 2", &table),
            Err(EvalError::UnexpectedToken(_))
        ));
    }

    #[test]
    fn contains_division_is_textual() {
        assert!(contains_division("height/radius"));
        assert!(contains_division("1 / 0"));
        assert!(!contains_division("height * radius"));
    }

    #[test]
    fn operator_count_ignores_unary_minus() {
        assert_eq!(operator_count("1 + 2 * 3"), 2);
        assert_eq!(operator_count("-x"), 0);
        assert_eq!(operator_count("a - b"), 1);
        assert_eq!(operator_count("(a + b) - c"), 2);
    }

    #[test]
    fn operator_count_falls_back_on_unparseable_text() {
        // `$` fails tokenization; naive character count still applies.
        assert_eq!(operator_count("$a + $b * $c"), 2);
    }
}
