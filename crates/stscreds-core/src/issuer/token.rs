use std::io::{self, BufRead, Write};

use super::Identity;
use crate::error::{Error, Result};

/// Produces one MFA code per call.
pub trait TokenSource {
    fn read_token(&mut self, identity: &Identity) -> Result<String>;
}

impl<S: TokenSource + ?Sized> TokenSource for Box<S> {
    fn read_token(&mut self, identity: &Identity) -> Result<String> {
        (**self).read_token(identity)
    }
}

/// Interactive source: prompts on one stream and reads a line from another.
pub struct PromptTokenSource<R, W> {
    input: R,
    prompt: W,
}

impl PromptTokenSource<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr, read from stdin.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> PromptTokenSource<R, W> {
    pub fn new(input: R, prompt: W) -> Self {
        Self { input, prompt }
    }
}

impl<R: BufRead, W: Write> TokenSource for PromptTokenSource<R, W> {
    fn read_token(&mut self, identity: &Identity) -> Result<String> {
        write!(
            self.prompt,
            "Current user: {}. Please enter MFA token: ",
            identity.user_name
        )
        .and_then(|_| self.prompt.flush())
        .map_err(|e| Error::TokenInput(e.to_string()))?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| Error::TokenInput(e.to_string()))?;
        if read == 0 {
            return Err(Error::TokenInput("no input".into()));
        }

        let token = line.trim_matches([' ', '\r', '\n']);
        if token.is_empty() {
            return Err(Error::TokenInput("empty token".into()));
        }
        Ok(token.to_string())
    }
}

/// Scripted source holding a single code, e.g. from a flag or environment variable.
///
/// A code is only good for one exchange, so a second read fails.
#[derive(Debug, Default)]
pub struct StaticTokenSource {
    token: Option<String>,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

impl TokenSource for StaticTokenSource {
    fn read_token(&mut self, _identity: &Identity) -> Result<String> {
        self.token
            .take()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| Error::TokenInput("scripted mfa token already used".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            user_name: "alice".into(),
            user_id: "AIDAEXAMPLE".into(),
            arn: "arn:aws:iam::123456789012:user/alice".into(),
            created_at: None,
        }
    }

    #[test]
    fn test_prompt_trims_line_endings() {
        let mut prompt = Vec::new();
        let mut source = PromptTokenSource::new(&b" 123456\r\n"[..], &mut prompt);
        assert_eq!(source.read_token(&identity()).unwrap(), "123456");

        let shown = String::from_utf8(prompt).unwrap();
        assert_eq!(shown, "Current user: alice. Please enter MFA token: ");
    }

    #[test]
    fn test_prompt_eof_is_error() {
        let mut source = PromptTokenSource::new(&b""[..], Vec::new());
        let err = source.read_token(&identity()).unwrap_err();
        assert!(matches!(err, Error::TokenInput(_)));
    }

    #[test]
    fn test_prompt_blank_line_is_error() {
        let mut source = PromptTokenSource::new(&b"  \n"[..], Vec::new());
        assert!(source.read_token(&identity()).is_err());
    }

    #[test]
    fn test_boxed_source() {
        let mut source: Box<dyn TokenSource> = Box::new(StaticTokenSource::new(" 111111 "));
        assert_eq!(source.read_token(&identity()).unwrap(), "111111");
    }

    #[test]
    fn test_static_source_single_use() {
        let mut source = StaticTokenSource::new("654321");
        assert_eq!(source.read_token(&identity()).unwrap(), "654321");
        assert!(matches!(
            source.read_token(&identity()),
            Err(Error::TokenInput(_))
        ));
    }
}
