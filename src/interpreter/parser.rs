use super::{Expr, ExprError, Result};

/// Parse expression source text into a single [`Expr`].
///
/// The source must contain exactly one form. Line comments start with `;`.
pub fn parse_expr(source: &str) -> Result<Expr> {
    let mut parser = Parser::new(source);
    parser.skip_ws();
    if parser.eof() {
        return Err(parser.error("empty expression"));
    }
    let expr = parser.parse_expr()?;
    parser.skip_ws();
    if !parser.eof() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    index: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            index: 0,
        }
    }

    fn eof(&self) -> bool {
        self.index >= self.bytes.len()
    }

    fn current(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn peek_char(&self) -> Option<u8> {
        self.bytes.get(self.index + 1).copied()
    }

    fn advance(&mut self) {
        if self.index < self.bytes.len() {
            self.index += 1;
        }
    }

    fn skip_ws(&mut self) {
        loop {
            while let Some(ch) = self.current() {
                if ch.is_ascii_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }
            if self.current() == Some(b';') {
                while let Some(ch) = self.current() {
                    self.advance();
                    if ch == b'\n' {
                        break;
                    }
                }
                continue;
            }
            break;
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.skip_ws();
        match self.current() {
            None => Err(self.error("unexpected end of input")),
            Some(b'(') => self.parse_list(),
            Some(b')') => Err(self.error("unexpected ')'")),
            Some(b'"') => self.parse_string(),
            Some(b'-' | b'+' | b'0'..=b'9') => self.parse_number_or_symbol(),
            Some(_) => self.parse_symbol_or_literal(),
        }
    }

    fn parse_list(&mut self) -> Result<Expr> {
        // consume '('
        self.advance();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eof() {
                return Err(self.error("unterminated list"));
            }
            if self.current() == Some(b')') {
                self.advance();
                break;
            }
            items.push(self.parse_expr()?);
        }
        Ok(Expr::List(items))
    }

    fn parse_string(&mut self) -> Result<Expr> {
        // consume opening quote
        self.advance();
        // Escapes are ASCII, so collecting raw bytes keeps multi-byte
        // characters intact.
        let mut buf = Vec::new();
        while let Some(ch) = self.current() {
            self.advance();
            match ch {
                b'"' => {
                    let text = String::from_utf8(buf)
                        .map_err(|_| self.error("invalid UTF-8 in string literal"))?;
                    return Ok(Expr::String(text));
                }
                b'\\' => {
                    let escaped = self
                        .current()
                        .ok_or_else(|| self.error("incomplete escape"))?;
                    self.advance();
                    let value = match escaped {
                        b'"' => b'"',
                        b'\\' => b'\\',
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        other => {
                            return Err(self.error(&format!("unknown escape: \\{}", other as char)));
                        }
                    };
                    buf.push(value);
                }
                _ => buf.push(ch),
            }
        }
        Err(self.error("unterminated string literal"))
    }

    fn parse_number_or_symbol(&mut self) -> Result<Expr> {
        let start = self.index;
        if self.current() == Some(b'-') || self.current() == Some(b'+') {
            self.advance();
        }
        let mut has_digit = false;
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                has_digit = true;
                self.advance();
            } else {
                break;
            }
        }

        let mut is_float = false;
        if has_digit && self.current() == Some(b'.') {
            if let Some(next) = self.peek_char() {
                if next.is_ascii_digit() {
                    is_float = true;
                    self.advance();
                    while let Some(ch) = self.current() {
                        if ch.is_ascii_digit() {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
            }
        }

        if !has_digit {
            self.index = start;
            return self.parse_symbol_or_literal();
        }

        if let Some(ch) = self.current() {
            if is_symbol_char(ch) {
                return Err(self.error("invalid numeric literal"));
            }
        }

        let text = &self.src[start..self.index];
        if is_float {
            text.parse::<f64>()
                .map(Expr::Float)
                .map_err(|_| self.error("invalid float literal"))
        } else {
            text.parse::<i64>()
                .map(Expr::Integer)
                .map_err(|_| self.error("invalid integer literal"))
        }
    }

    fn parse_symbol_or_literal(&mut self) -> Result<Expr> {
        let start = self.index;
        while let Some(ch) = self.current() {
            if is_symbol_char(ch) {
                self.advance();
            } else {
                break;
            }
        }
        if start == self.index {
            return Err(self.error("unexpected character"));
        }
        let text = &self.src[start..self.index];
        match text {
            "true" => Ok(Expr::Boolean(true)),
            "false" => Ok(Expr::Boolean(false)),
            "null" => Ok(Expr::Null),
            _ => Ok(Expr::Symbol(text.to_string())),
        }
    }

    fn error(&self, message: &str) -> ExprError {
        ExprError::Syntax(format!("{} at byte {}", message, self.index))
    }
}

fn is_symbol_char(ch: u8) -> bool {
    match ch {
        b'(' | b')' | b'"' | b';' => false,
        c if c.is_ascii_whitespace() => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_forms() {
        let expr = parse_expr("(+ value (* 2 3))").expect("parse");
        assert_eq!(
            expr,
            Expr::List(vec![
                Expr::Symbol("+".into()),
                Expr::Symbol("value".into()),
                Expr::List(vec![
                    Expr::Symbol("*".into()),
                    Expr::Integer(2),
                    Expr::Integer(3),
                ]),
            ])
        );
    }

    #[test]
    fn parses_literals() {
        assert_eq!(parse_expr("-4").unwrap(), Expr::Integer(-4));
        assert_eq!(parse_expr("2.5").unwrap(), Expr::Float(2.5));
        assert_eq!(parse_expr("true").unwrap(), Expr::Boolean(true));
        assert_eq!(parse_expr("null").unwrap(), Expr::Null);
        assert_eq!(parse_expr("-").unwrap(), Expr::Symbol("-".into()));
    }

    #[test]
    fn keeps_unicode_and_escapes_in_strings() {
        let expr = parse_expr("\"café\"").unwrap();
        assert_eq!(expr, Expr::String("café".into()));

        let expr = parse_expr(r#""say \"hi\"\n""#).unwrap();
        assert_eq!(expr, Expr::String("say \"hi\"\n".into()));
    }

    #[test]
    fn skips_comments() {
        let src = "; bump the counter\n(+ value 1) ; trailing";
        assert!(parse_expr(src).is_ok());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_expr("").is_err());
        assert!(parse_expr("(+ 1 2").is_err());
        assert!(parse_expr("(+ 1 2))").is_err());
        assert!(parse_expr("1 2").is_err());
        assert!(parse_expr("\"open").is_err());
        assert!(parse_expr("12abc").is_err());
    }
}
