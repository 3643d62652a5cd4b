use shardline_common::ShardingValue;

use crate::lexer::{tokenize, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(ShardingValue),
    Var(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    List(Vec<Expr>),
    Range(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Part {
    Literal(String),
    Segment(Expr),
}

/// A parsed template: literal text interleaved with `${ ... }` segments.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Template {
    pub parts: Vec<Part>,
}

/// Rewrite the alternative `$->{` placeholder opener to `${`.
pub(crate) fn normalize_placeholders(text: &str) -> String {
    text.replace("$->{", "${")
}

/// Split on commas that sit outside any `${ ... }` segment.
pub(crate) fn split_top_level(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' if chars.peek() == Some(&'{') => {
                depth += 1;
                current.push(c);
                if let Some(open) = chars.next() {
                    current.push(open);
                }
            }
            '}' if depth > 0 => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    out.push(current.trim().to_string());
    out.retain(|s| !s.is_empty());
    out
}

pub(crate) fn parse_template(text: &str) -> Result<Template, String> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(pos) = rest.find("${") {
        literal.push_str(&rest[..pos]);
        let body_start = pos + 2;
        let body_len = find_segment_end(&rest[body_start..])
            .ok_or_else(|| "unterminated '${' placeholder".to_string())?;
        let body = &rest[body_start..body_start + body_len];
        if !literal.is_empty() {
            parts.push(Part::Literal(std::mem::take(&mut literal)));
        }
        parts.push(Part::Segment(parse_expr(body)?));
        rest = &rest[body_start + body_len + 1..];
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        parts.push(Part::Literal(literal));
    }
    Ok(Template { parts })
}

// Byte offset of the closing brace, skipping braces inside quotes.
fn find_segment_end(body: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, c) in body.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '}' => return Some(idx),
            _ => {}
        }
    }
    None
}

fn parse_expr(body: &str) -> Result<Expr, String> {
    let toks = tokenize(body)?;
    if toks.is_empty() {
        return Err("empty placeholder".to_string());
    }
    let mut p = Parser { toks, i: 0 };
    let expr = p.parse_range()?;
    if p.i != p.toks.len() {
        return Err("unexpected trailing tokens".to_string());
    }
    Ok(expr)
}

struct Parser {
    toks: Vec<Token>,
    i: usize,
}

impl Parser {
    fn parse_range(&mut self) -> Result<Expr, String> {
        let left = self.parse_additive()?;
        if matches!(self.toks.get(self.i), Some(Token::DotDot)) {
            self.i += 1;
            let right = self.parse_additive()?;
            return Ok(Expr::Range(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.toks.get(self.i) {
                Some(Token::Symbol('+')) => BinaryOp::Add,
                Some(Token::Symbol('-')) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.i += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.toks.get(self.i) {
                Some(Token::Symbol('*')) => BinaryOp::Mul,
                Some(Token::Symbol('/')) => BinaryOp::Div,
                Some(Token::Symbol('%')) => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.i += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if matches!(self.toks.get(self.i), Some(Token::Symbol('-'))) {
            self.i += 1;
            let inner = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        let tok = self
            .toks
            .get(self.i)
            .cloned()
            .ok_or_else(|| "unexpected end of expression".to_string())?;
        self.i += 1;
        match tok {
            Token::Int(v) => Ok(Expr::Literal(ShardingValue::Int(v))),
            Token::Decimal(v) => Ok(Expr::Literal(ShardingValue::Float(v))),
            Token::Str(s) => Ok(Expr::Literal(ShardingValue::Text(s))),
            Token::Ident(name) => Ok(Expr::Var(name)),
            Token::Symbol('(') => {
                let inner = self.parse_range()?;
                self.expect_symbol(')')?;
                Ok(inner)
            }
            Token::Symbol('[') => {
                let mut items = Vec::new();
                if matches!(self.toks.get(self.i), Some(Token::Symbol(']'))) {
                    self.i += 1;
                    return Ok(Expr::List(items));
                }
                loop {
                    items.push(self.parse_range()?);
                    match self.toks.get(self.i) {
                        Some(Token::Symbol(',')) => self.i += 1,
                        Some(Token::Symbol(']')) => {
                            self.i += 1;
                            return Ok(Expr::List(items));
                        }
                        _ => return Err("expected ',' or ']' in list".to_string()),
                    }
                }
            }
            other => Err(format!("unexpected token {:?}", other)),
        }
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<(), String> {
        match self.toks.get(self.i) {
            Some(Token::Symbol(c)) if *c == symbol => {
                self.i += 1;
                Ok(())
            }
            _ => Err(format!("expected symbol {symbol}")),
        }
    }
}
