use indexmap::IndexSet;
use std::fmt;

/// Token used whenever a package declares no usable license.
pub const UNKNOWN_LICENSE: &str = "UNKNOWN";

/// Parsed SPDX license expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseExpr {
    License { id: String, or_later: bool },
    With { license: Box<LicenseExpr>, exception: String },
    And(Box<LicenseExpr>, Box<LicenseExpr>),
    Or(Box<LicenseExpr>, Box<LicenseExpr>),
}

impl LicenseExpr {
    /// Collect every leaf license identifier, in expression order.
    pub fn license_ids(&self) -> IndexSet<String> {
        let mut ids = IndexSet::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut IndexSet<String>) {
        match self {
            LicenseExpr::License { id, .. } => {
                ids.insert(id.clone());
            }
            LicenseExpr::With { license, .. } => license.collect_ids(ids),
            LicenseExpr::And(left, right) | LicenseExpr::Or(left, right) => {
                left.collect_ids(ids);
                right.collect_ids(ids);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionError {
    pub position: usize,
    pub message: String,
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at token {}", self.message, self.position)
    }
}

impl std::error::Error for ExpressionError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Plus,
    And,
    Or,
    With,
    Ident(String),
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == ':'
}

fn lex(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            c if is_ident_char(c) => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_ident_char(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                // Operators are case-sensitive in SPDX.
                tokens.push(match word.as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "WITH" => Token::With,
                    _ => Token::Ident(word),
                });
            }
            other => {
                return Err(ExpressionError {
                    position: pos,
                    message: format!("unexpected character '{}'", other),
                })
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, message: &str) -> ExpressionError {
        ExpressionError {
            position: self.pos,
            message: message.to_string(),
        }
    }

    // OR binds loosest, then AND, then WITH.
    fn parse_or(&mut self) -> Result<LicenseExpr, ExpressionError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = LicenseExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<LicenseExpr, ExpressionError> {
        let mut left = self.parse_with()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.parse_with()?;
            left = LicenseExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_with(&mut self) -> Result<LicenseExpr, ExpressionError> {
        let license = self.parse_simple()?;
        if self.peek() == Some(&Token::With) {
            self.advance();
            return match self.advance() {
                Some(Token::Ident(exception)) => Ok(LicenseExpr::With {
                    license: Box::new(license),
                    exception,
                }),
                _ => Err(self.error("expected exception identifier after WITH")),
            };
        }
        Ok(license)
    }

    fn parse_simple(&mut self) -> Result<LicenseExpr, ExpressionError> {
        match self.advance() {
            Some(Token::Open) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(self.error("expected ')'")),
                }
            }
            Some(Token::Ident(id)) => {
                let or_later = if self.peek() == Some(&Token::Plus) {
                    self.advance();
                    true
                } else {
                    false
                };
                Ok(LicenseExpr::License { id, or_later })
            }
            _ => Err(self.error("expected license identifier or '('")),
        }
    }
}

/// Parse a strict SPDX license expression.
pub fn parse_expression(input: &str) -> Result<LicenseExpr, ExpressionError> {
    let tokens = lex(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

/// Split a non-standard expression on anything that looks like a separator.
fn fallback_split(input: &str) -> IndexSet<String> {
    let mut tokens = IndexSet::new();

    for fragment in input.split([',', ';', '|', '(', ')', '+']) {
        let mut words: Vec<&str> = Vec::new();
        for word in fragment.split_whitespace() {
            let upper = word.to_ascii_uppercase();
            if upper == "OR" || upper == "AND" || upper == "WITH" {
                if !words.is_empty() {
                    tokens.insert(words.join(" "));
                    words.clear();
                }
            } else {
                words.push(word);
            }
        }
        if !words.is_empty() {
            tokens.insert(words.join(" "));
        }
    }

    tokens
}

/// Reduce a license expression to the set of atomic identifiers it references.
///
/// Never fails: a missing expression yields `UNKNOWN`, and anything the
/// SPDX parser rejects is split on common separators instead.
pub fn tokenize(expression: Option<&str>) -> IndexSet<String> {
    let expression = match expression.map(str::trim) {
        Some(e) if !e.is_empty() => e,
        _ => return IndexSet::from([UNKNOWN_LICENSE.to_string()]),
    };

    match parse_expression(expression) {
        Ok(expr) => expr.license_ids(),
        Err(err) => {
            tracing::debug!(expression, %err, "non-standard license expression, splitting on separators");
            let tokens = fallback_split(expression);
            if tokens.is_empty() {
                IndexSet::from([UNKNOWN_LICENSE.to_string()])
            } else {
                tokens
            }
        }
    }
}
