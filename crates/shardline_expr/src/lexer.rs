#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Decimal(f64),
    Str(String),
    Ident(String),
    Symbol(char),
    DotDot,
}

/// Tokenize the body of one `${ ... }` segment.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut out = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '.' && chars.get(i + 1) == Some(&'.') {
            out.push(Token::DotDot);
            i += 2;
            continue;
        }
        if "+-*/%()[],".contains(c) {
            out.push(Token::Symbol(c));
            i += 1;
            continue;
        }
        if c == '\'' || c == '"' {
            let quote = c;
            i += 1;
            let mut s = String::new();
            let mut closed = false;
            while i < chars.len() {
                if chars[i] == '\\' && i + 1 < chars.len() {
                    s.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
                if chars[i] == quote {
                    i += 1;
                    closed = true;
                    break;
                }
                s.push(chars[i]);
                i += 1;
            }
            if !closed {
                return Err("unterminated string literal".to_string());
            }
            out.push(Token::Str(s));
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            // `1.5` is a decimal, `1..5` is a range.
            let is_decimal = chars.get(i) == Some(&'.')
                && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit());
            if is_decimal {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let v: f64 = text
                    .parse()
                    .map_err(|_| format!("invalid decimal literal {text}"))?;
                out.push(Token::Decimal(v));
            } else {
                let text: String = chars[start..i].iter().collect();
                let v: i64 = text
                    .parse()
                    .map_err(|_| format!("integer literal {text} out of range"))?;
                out.push(Token::Int(v));
            }
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            out.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        return Err(format!("unexpected character '{c}'"));
    }

    Ok(out)
}
