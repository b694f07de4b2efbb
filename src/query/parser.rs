use crate::error::QuerySyntaxError;
use serde::Serialize;
use std::fmt;

/// Compiled query: optional type filter plus a conjunction of predicates
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryAst {
    /// Exact, case-sensitive match against `action_type`
    pub type_filter: Option<String>,
    pub predicates: Vec<Predicate>,
}

/// A single `field op literal` comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    pub literal: Literal,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    Contains,
}

/// Literal on the right-hand side of a predicate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
}

impl QueryAst {
    /// Matches every record
    pub fn is_empty(&self) -> bool {
        self.type_filter.is_none() && self.predicates.is_empty()
    }
}

impl fmt::Display for QueryAst {
    /// Canonical text form, used as the normalized cache key
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(type_name) = &self.type_filter {
            write!(f, "{}", type_name)?;
            if !self.predicates.is_empty() {
                write!(f, " ")?;
            }
        }
        for (i, predicate) in self.predicates.iter().enumerate() {
            let joiner = if i == 0 { "where" } else { " and" };
            write!(f, "{} {}", joiner, predicate)?;
        }
        Ok(())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.literal)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Contains => "contains",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Str(s) => {
                f.write_str("'")?;
                for ch in s.chars() {
                    if ch == '\'' || ch == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{}", ch)?;
                }
                f.write_str("'")
            }
        }
    }
}

/// Parse a query string into a [`QueryAst`]
pub fn parse_query(input: &str) -> Result<QueryAst, QuerySyntaxError> {
    QueryParser::new(input).parse()
}

/// Query parser
struct QueryParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> QueryParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse(&mut self) -> Result<QueryAst, QuerySyntaxError> {
        let mut ast = QueryAst::default();

        self.skip_whitespace();
        if self.is_eof() {
            return Ok(ast);
        }

        let start = self.pos;
        let first = self.read_identifier();
        if first.is_empty() {
            return Err(self.unexpected("expected a type name, `where` or a predicate"));
        }

        if first.eq_ignore_ascii_case("where") {
            return self.parse_predicates(ast);
        }
        self.reject_keyword(first, start)?;
        if first.eq_ignore_ascii_case("and") {
            self.pos = start;
            return Err(self.unexpected("expected a type name, `where` or a predicate"));
        }

        // `field op literal` without a leading type name
        self.skip_whitespace();
        if self.peek_operator().is_some() {
            self.pos = start;
            return self.parse_predicates(ast);
        }

        ast.type_filter = Some(first.to_string());

        self.skip_whitespace();
        if self.is_eof() {
            return Ok(ast);
        }
        let save = self.pos;
        let word = self.read_identifier();
        if word.eq_ignore_ascii_case("where") {
            return self.parse_predicates(ast);
        }
        self.pos = save;
        self.parse_predicates(ast)
    }

    /// `predicate (and predicate)*` up to the end of input
    fn parse_predicates(&mut self, mut ast: QueryAst) -> Result<QueryAst, QuerySyntaxError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(self.unexpected("expected a predicate"));
        }

        loop {
            ast.predicates.push(self.parse_predicate()?);

            self.skip_whitespace();
            if self.is_eof() {
                return Ok(ast);
            }

            let start = self.pos;
            let word = self.read_identifier();
            if word.eq_ignore_ascii_case("and") {
                continue;
            }
            self.pos = start;
            if word.eq_ignore_ascii_case("or") {
                return Err(self.unexpected("`or` is not supported; predicates combine with `and`"));
            }
            return Err(self.unexpected("expected `and` or end of query"));
        }
    }

    fn parse_predicate(&mut self) -> Result<Predicate, QuerySyntaxError> {
        self.skip_whitespace();

        let start = self.pos;
        let field = self.read_identifier();
        if field.is_empty() {
            return Err(self.unexpected("expected a field name"));
        }
        self.reject_keyword(field, start)?;
        if field.eq_ignore_ascii_case("where") || field.eq_ignore_ascii_case("and") {
            self.pos = start;
            return Err(self.unexpected("expected a field name"));
        }

        self.skip_whitespace();
        let operator = match self.peek_operator() {
            Some((op, len)) => {
                self.pos += len;
                op
            }
            None => return Err(self.unexpected("expected an operator")),
        };

        self.skip_whitespace();
        let literal_start = self.pos;
        let literal = self.parse_literal()?;

        // A literal must be followed by whitespace or the end of the query
        if let Some(next) = self.peek_char().filter(|c| !c.is_whitespace()) {
            if matches!(literal, Literal::Number(_)) && is_identifier_char(next) {
                let end = self.input[literal_start..]
                    .find(char::is_whitespace)
                    .map_or(self.input.len(), |i| literal_start + i);
                return Err(QuerySyntaxError::new(
                    &self.input[literal_start..end],
                    literal_start,
                    "invalid number",
                ));
            }
            return Err(self.unexpected("expected whitespace after literal"));
        }

        Ok(Predicate {
            field: field.to_string(),
            operator,
            literal,
        })
    }

    fn parse_literal(&mut self) -> Result<Literal, QuerySyntaxError> {
        match self.peek_char() {
            None => Err(self.unexpected("expected a literal")),
            Some(quote @ ('\'' | '"')) => self.parse_string(quote),
            Some(ch) if ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.') => self.parse_number(),
            Some(_) => {
                let start = self.pos;
                let word = self.read_identifier();
                if word.eq_ignore_ascii_case("true") {
                    Ok(Literal::Bool(true))
                } else if word.eq_ignore_ascii_case("false") {
                    Ok(Literal::Bool(false))
                } else {
                    self.pos = start;
                    Err(self.unexpected("expected a number, quoted string, true or false"))
                }
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<Literal, QuerySyntaxError> {
        let start = self.pos;
        self.advance();

        let mut value = String::new();
        loop {
            match self.peek_char() {
                None => {
                    return Err(QuerySyntaxError::new(
                        &self.input[start..],
                        start,
                        "unterminated string",
                    ));
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        Some(escaped) => {
                            value.push(escaped);
                            self.advance();
                        }
                        None => {
                            return Err(QuerySyntaxError::new(
                                &self.input[start..],
                                start,
                                "unterminated string",
                            ));
                        }
                    }
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    return Ok(Literal::Str(value));
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn parse_number(&mut self) -> Result<Literal, QuerySyntaxError> {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            let exponent_sign = matches!(ch, '-' | '+')
                && self.pos > start
                && matches!(self.input[..self.pos].chars().last(), Some('e' | 'E'));
            if ch.is_ascii_digit()
                || matches!(ch, '.' | 'e' | 'E')
                || (self.pos == start && matches!(ch, '-' | '+'))
                || exponent_sign
            {
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.input[start..self.pos];
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Literal::Number(n)),
            _ => Err(QuerySyntaxError::new(text, start, "invalid number")),
        }
    }

    /// Operator at the cursor and its byte length, without consuming it
    fn peek_operator(&self) -> Option<(Operator, usize)> {
        let rest = self.remaining();
        const SYMBOLS: &[(&str, Operator)] = &[
            (">=", Operator::Ge),
            ("<=", Operator::Le),
            ("==", Operator::Eq),
            ("!=", Operator::Ne),
            (">", Operator::Gt),
            ("<", Operator::Lt),
            ("=", Operator::Eq),
        ];
        for (symbol, op) in SYMBOLS {
            if rest.starts_with(symbol) {
                return Some((*op, symbol.len()));
            }
        }

        let word_len = rest
            .char_indices()
            .find(|(_, c)| !is_identifier_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if rest[..word_len].eq_ignore_ascii_case("contains") {
            return Some((Operator::Contains, word_len));
        }
        None
    }

    /// `or` and parentheses are recognized only to report them clearly
    fn reject_keyword(&mut self, word: &str, start: usize) -> Result<(), QuerySyntaxError> {
        if word.eq_ignore_ascii_case("or") {
            self.pos = start;
            return Err(self.unexpected("`or` is not supported; predicates combine with `and`"));
        }
        Ok(())
    }

    fn read_identifier(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if is_identifier_char(ch) {
                self.advance();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    /// Error pointing at the token under the cursor
    fn unexpected(&self, message: &str) -> QuerySyntaxError {
        let token = self.current_token();
        let message = match token {
            "(" | ")" => "parentheses are not supported",
            _ => message,
        };
        let token = if token.is_empty() { "<end of query>" } else { token };
        QuerySyntaxError::new(token, self.pos, message)
    }

    fn current_token(&self) -> &'a str {
        let rest = &self.input[self.pos..];
        let Some(first) = rest.chars().next() else {
            return "";
        };
        let len = if is_identifier_char(first) {
            rest.char_indices()
                .find(|(_, c)| !is_identifier_char(*c))
                .map(|(i, _)| i)
                .unwrap_or(rest.len())
        } else {
            first.len_utf8()
        };
        &rest[..len]
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '.' | '$')
}
