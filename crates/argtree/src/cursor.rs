use thiserror::Error;

/// The cursor ran out of tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no more arguments")]
pub struct Exhausted;

/// Position-tracking view over the argument vector of one parse.
///
/// Tokens are never modified; only the position moves forward. A single
/// token can be pushed back in front of the position, which is how inline
/// values (`--name=value`, `-n5`) are handed to the value consumer.
#[derive(Debug, Clone)]
pub struct Cursor {
    tokens: Vec<String>,
    position: usize,
    pushed: Option<String>,
}

impl Cursor {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            position: 0,
            pushed: None,
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek(&self) -> Option<&str> {
        self.pushed
            .as_deref()
            .or_else(|| self.tokens.get(self.position).map(String::as_str))
    }

    /// Consume the next token.
    pub fn advance(&mut self) -> Result<String, Exhausted> {
        if let Some(token) = self.pushed.take() {
            return Ok(token);
        }
        let token = self.tokens.get(self.position).cloned().ok_or(Exhausted)?;
        self.position += 1;
        Ok(token)
    }

    /// Put one token back in front of the cursor.
    ///
    /// # Panics
    ///
    /// Panics if a pushed-back token has not been consumed yet.
    pub fn push_back(&mut self, token: impl Into<String>) {
        assert!(
            self.pushed.is_none(),
            "Cursor::push_back called twice without an advance in between"
        );
        self.pushed = Some(token.into());
    }

    /// Whether the next token is one that was pushed back.
    pub fn has_pushed_back(&self) -> bool {
        self.pushed.is_some()
    }

    /// Number of tokens left, counting a pushed-back one.
    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.position + usize::from(self.pushed.is_some())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume everything that is left.
    pub fn drain(&mut self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.remaining());
        if let Some(token) = self.pushed.take() {
            out.push(token);
        }
        out.extend(self.tokens.drain(self.position..));
        self.position = self.tokens.len();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_forward_until_exhausted() {
        let mut cursor = Cursor::new(["foo", "bar"]);
        assert_eq!(cursor.peek(), Some("foo"));
        assert_eq!(cursor.advance().unwrap(), "foo");
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.advance().unwrap(), "bar");
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.peek(), None);
        assert_eq!(cursor.advance(), Err(Exhausted));
    }

    #[test]
    fn push_back_is_seen_before_remaining_tokens() {
        let mut cursor = Cursor::new(["--name=value", "rest"]);
        let token = cursor.advance().unwrap();
        let (_, value) = token.split_once('=').unwrap();
        cursor.push_back(value);
        assert!(cursor.has_pushed_back());
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.peek(), Some("value"));
        assert_eq!(cursor.advance().unwrap(), "value");
        assert!(!cursor.has_pushed_back());
        assert_eq!(cursor.advance().unwrap(), "rest");
    }

    #[test]
    #[should_panic(expected = "push_back called twice")]
    fn double_push_back_panics() {
        let mut cursor = Cursor::new(["a"]);
        cursor.push_back("x");
        cursor.push_back("y");
    }

    #[test]
    fn drain_takes_pushed_token_first() {
        let mut cursor = Cursor::new(["a", "b", "c"]);
        cursor.advance().unwrap();
        cursor.push_back("z");
        assert_eq!(cursor.drain(), vec!["z", "b", "c"]);
        assert!(cursor.is_exhausted());
    }
}
