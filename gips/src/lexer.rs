use std::ops::Range;

use logos::Logos;

use crate::token::Token;

/// Pull-based tokenizer over node source text.
///
/// Tokens are produced one at a time with [`Tokenizer::next`]. When the
/// current token opens a comment, the caller may call
/// [`Tokenizer::extend_until`] to grow the token over the whole comment body
/// and then take it with [`Tokenizer::extract`].
pub struct Tokenizer<'src> {
    lexer: logos::Lexer<'src, Token>,
    current: Option<Token>,
}

impl<'src> Tokenizer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            lexer: Token::lexer(source),
            current: None,
        }
    }

    /// Advance to the next token. Returns `false` at end of input.
    ///
    /// Input the lexer cannot classify is reported as [`Token::Punct`];
    /// the scan never stops early.
    pub fn next(&mut self) -> bool {
        self.current = match self.lexer.next() {
            Some(Ok(token)) => Some(token),
            Some(Err(())) => Some(Token::Punct),
            None => None,
        };
        self.current.is_some()
    }

    /// Kind of the current token.
    pub fn token(&self) -> Option<Token> {
        self.current
    }

    /// Text of the current token.
    pub fn text(&self) -> &'src str {
        if self.current.is_some() {
            self.lexer.slice()
        } else {
            ""
        }
    }

    /// Byte offset of the current token in the source.
    pub fn start(&self) -> usize {
        self.lexer.span().start
    }

    /// Byte length of the current token.
    pub fn len(&self) -> usize {
        self.lexer.span().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn span(&self) -> Range<usize> {
        self.lexer.span()
    }

    /// Is the current token exactly `text`?
    pub fn is(&self, text: &str) -> bool {
        self.current.is_some() && self.lexer.slice() == text
    }

    /// Does the current token contain the character `c`?
    pub fn contains(&self, c: char) -> bool {
        self.text().contains(c)
    }

    /// Grow the current token up to and including the next occurrence of
    /// `terminator`, or to the end of input if there is none.
    pub fn extend_until(&mut self, terminator: &str) {
        let rest = self.lexer.remainder();
        let n = match rest.find(terminator) {
            Some(at) => at + terminator.len(),
            None => rest.len(),
        };
        self.lexer.bump(n);
    }

    /// Take the current token's text as an owned string.
    pub fn extract(&self) -> String {
        self.text().to_owned()
    }

    /// Capture a complete comment starting at the current token and return
    /// its body: the comment markers are stripped, as is a leading `!` of
    /// doc-style comments. Returns `None` if the current token is not a
    /// comment start.
    pub fn take_comment(&mut self) -> Option<String> {
        let token = self.current?;
        if !token.is_comment() {
            return None;
        }
        let block = token == Token::BlockComment;
        if block {
            self.extend_until("*/");
        } else {
            self.extend_until("\n");
        }
        let comment = self.extract();
        let mut body = &comment[2..];
        if block {
            body = body.strip_suffix("*/").unwrap_or(body);
        }
        let body = body.strip_prefix('!').unwrap_or(body);
        Some(body.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        let mut tok = Tokenizer::new(source);
        let mut out = Vec::new();
        while tok.next() {
            out.push(tok.text().to_string());
        }
        out
    }

    #[test]
    fn lex_uniform_declaration() {
        let kinds: Vec<_> = {
            let mut tok = Tokenizer::new("uniform vec3 key = vec3(.299, .587, .114);");
            let mut v = Vec::new();
            while tok.next() {
                v.push((tok.token().unwrap(), tok.text()));
            }
            v
        };
        assert_eq!(kinds[0], (Token::Ident, "uniform"));
        assert_eq!(kinds[1], (Token::Ident, "vec3"));
        assert_eq!(kinds[2], (Token::Ident, "key"));
        assert_eq!(kinds[3], (Token::Punct, "="));
        assert_eq!(kinds[4], (Token::Ident, "vec3"));
        assert_eq!(kinds[5], (Token::Punct, "("));
        assert_eq!(kinds[6], (Token::Number, ".299"));
        assert_eq!(kinds[7], (Token::Punct, ","));
        assert_eq!(kinds[10], (Token::Number, ".114"));
        assert_eq!(kinds[11], (Token::Punct, ")"));
        assert_eq!(kinds[12], (Token::Punct, ";"));
        assert_eq!(kinds.len(), 13);
    }

    #[test]
    fn lex_paren_brace_is_one_token() {
        assert_eq!(texts("f(x){"), vec!["f", "(", "x", "){"]);
        assert_eq!(texts("f(x) {"), vec!["f", "(", "x", ")", "{"]);
    }

    #[test]
    fn lex_numbers() {
        assert_eq!(texts("1.0 50 2. 1e5 1.5f"), vec!["1.0", "50", "2.", "1e5", "1.5f"]);
        assert_eq!(texts("a.x"), vec!["a", ".", "x"]);
    }

    #[test]
    fn lex_signed_exponents() {
        assert_eq!(texts("1e-5 2.5E+3f .5e-2 x-1"), vec!["1e-5", "2.5E+3f", ".5e-2", "x", "-", "1"]);
        // a trailing `e` without digits is not an exponent
        assert_eq!(texts("2e-x"), vec!["2e", "-", "x"]);
    }

    #[test]
    fn offsets_point_into_source() {
        let src = "uniform float gain;";
        let mut tok = Tokenizer::new(src);
        tok.next();
        tok.next();
        tok.next();
        assert_eq!(tok.start(), 14);
        assert_eq!(tok.len(), 4);
        assert_eq!(&src[tok.span()], "gain");
        tok.next();
        assert!(tok.contains(';'));
        assert!(!tok.contains('='));
    }

    #[test]
    fn line_comment_runs_to_end_of_line() {
        let mut tok = Tokenizer::new("a // hello @min=0\nb");
        tok.next();
        tok.next();
        assert!(tok.is("//"));
        assert_eq!(tok.take_comment().as_deref(), Some(" hello @min=0\n"));
        tok.next();
        assert_eq!(tok.text(), "b");
    }

    #[test]
    fn block_comment_strips_terminator() {
        let mut tok = Tokenizer::new("/*! doc */ x");
        tok.next();
        assert_eq!(tok.take_comment().as_deref(), Some(" doc "));
        tok.next();
        assert_eq!(tok.text(), "x");
    }

    #[test]
    fn unterminated_comment_takes_the_rest() {
        let mut tok = Tokenizer::new("/* open");
        tok.next();
        assert_eq!(tok.take_comment().as_deref(), Some(" open"));
        assert!(!tok.next());

        let mut tok = Tokenizer::new("// last line");
        tok.next();
        assert_eq!(tok.take_comment().as_deref(), Some(" last line"));
    }

    #[test]
    fn take_comment_on_plain_token_is_none() {
        let mut tok = Tokenizer::new("x");
        tok.next();
        assert_eq!(tok.take_comment(), None);
    }
}
