use crate::error::ParseError;
use crate::query::token::Token;

/// Position in a token slice. Returned tokens borrow the slice, not the cursor.
pub(crate) struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub(crate) fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    pub(crate) fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    pub(crate) fn rest(&self) -> &'a [Token] {
        self.tokens.get(self.pos..).unwrap_or_default()
    }

    pub(crate) fn at_punct(&self, p: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(p))
    }

    pub(crate) fn eat_word(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_word(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_punct(&mut self, p: &str) -> bool {
        if self.at_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_datatype_mark(&mut self) -> bool {
        if matches!(self.peek(), Some(Token::DatatypeMark)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_word(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.eat_word(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword))
        }
    }

    pub(crate) fn expect_punct(&mut self, p: &str) -> Result<(), ParseError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{p}'")))
        }
    }

    pub(crate) fn expect_next(&mut self, expected: &str) -> Result<&'a Token, ParseError> {
        self.next()
            .ok_or_else(|| ParseError::UnexpectedEnd(expected.to_string()))
    }

    pub(crate) fn expect_iri_token(&mut self) -> Result<Token, ParseError> {
        match self.next() {
            Some(t @ (Token::Iri(_) | Token::PrefixedName(_))) => Ok(t.clone()),
            other => Err(self.mismatch("IRI", other)),
        }
    }

    /// Tokens up to (not including) the first one matching `stop`.
    pub(crate) fn take_until(&mut self, stop: impl Fn(&Token) -> bool) -> &'a [Token] {
        let start = self.pos;
        while self.peek().is_some_and(|t| !stop(t)) {
            self.pos += 1;
        }
        &self.tokens[start..self.pos]
    }

    /// Tokens up to the matching `close`, which is consumed. The opening
    /// brace has already been consumed.
    pub(crate) fn take_balanced(&mut self, close: &str) -> Result<Vec<Token>, ParseError> {
        let open = if close == "}" { "{" } else { "(" };
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            match self.next() {
                None => return Err(ParseError::UnexpectedEnd(format!("'{close}'"))),
                Some(t) if t.is_punct(open) => depth += 1,
                Some(t) if t.is_punct(close) => {
                    if depth == 0 {
                        return Ok(self.tokens[start..self.pos - 1].to_vec());
                    }
                    depth -= 1;
                }
                Some(_) => {}
            }
        }
    }

    /// Error for the current position.
    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        self.mismatch(expected, self.peek())
    }

    pub(crate) fn mismatch(&self, expected: &str, found: Option<&Token>) -> ParseError {
        match found {
            Some(token) => ParseError::Unexpected {
                expected: expected.to_string(),
                found: token.to_string(),
            },
            None => ParseError::UnexpectedEnd(expected.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::token::tokenize;

    #[test]
    fn test_take_balanced() {
        let tokens: Vec<Token> = tokenize("?s ?p { ?o } } WHERE")
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect();
        let mut cursor = Cursor::new(&tokens);
        let inner = cursor.take_balanced("}").unwrap();
        assert_eq!(inner.len(), 5);
        assert!(cursor.eat_word("where"));
        assert!(cursor.peek().is_none());
    }
}
