use logos::Logos;

/// Raw tokens produced by lexing node source.
///
/// Design: the lexer only knows lexical shapes. Keywords such as `uniform`
/// or `run_pass2` are plain `Ident`s; the recognizer gives them meaning.
/// Comments are not skipped: a comment start is a token of its own so the
/// caller can capture the body and feed it to the annotation parser.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // ── Comment starts ─────────────────────────────────────────────────
    #[token("//")]
    LineComment,
    #[token("/*")]
    BlockComment,

    // ── Words ──────────────────────────────────────────────────────────
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    /// Anything that starts like a number. Suffixes and exponents, signed
    /// ones included, are kept in the same token; whether it is a usable
    /// value is decided on parse.
    #[regex(r"[0-9][0-9a-zA-Z_.]*")]
    #[regex(r"\.[0-9][0-9a-zA-Z_.]*")]
    #[regex(r"[0-9]+(\.[0-9]*)?[eE][+-][0-9]+[a-zA-Z]*")]
    #[regex(r"\.[0-9]+[eE][+-][0-9]+[a-zA-Z]*")]
    Number,

    // ── Punctuation ────────────────────────────────────────────────────
    /// Multi-character punctuation that is kept together.
    #[token("){")]
    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("&&")]
    #[token("||")]
    #[token("++")]
    #[token("--")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    Compound,

    /// Any other single non-word character.
    #[regex(r"[^a-zA-Z0-9_ \t\r\n\f]")]
    Punct,
}

impl Token {
    /// Does this token open a comment?
    pub fn is_comment(&self) -> bool {
        matches!(self, Token::LineComment | Token::BlockComment)
    }
}
