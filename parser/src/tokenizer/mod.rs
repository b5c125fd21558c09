/*! Implements the pattern tokenizer.

Tokenization is the first step in parsing a pattern. The tokenizer takes the
pattern source and produces a sequence of tokens that is later processed by
the parser. Each token is represented by a variant of the [`Token`] type.
*/

use logos::Logos;

use crate::Span;

mod tokens;

pub(crate) use tokens::Token;


/// Takes pattern source code and produces a sequence of tokens.
///
/// The tokenizer has two modes of operation: normal mode and check mode.
///
/// In normal mode the tokenizer recognizes the regex-like surface of the
/// language: anchors, group delimiters, alternation, quantifiers and the `<`
/// that opens an instruction check. In check mode it recognizes only the
/// tokens that can appear between `<` and `>`: bare words (opcode names and
/// check prefixes), number and string literals, and `'name'` captures.
///
/// This distinction matters because tokens change meaning with the mode. A
/// `.` is the match-any check outside angle brackets, but inside them it is
/// an ordinary character of an opcode name such as `ldc.i4.5`; likewise `?`
/// is a quantifier outside and nothing at all inside. The tokenizer switches
/// to check mode when it emits `<` and back to normal mode when it emits
/// `>`, so the parser never has to manage modes itself.
///
/// Whitespace, line comments and block comments are skipped in both modes.
pub(crate) struct Tokenizer<'src> {
    mode: Mode<'src>,
}

enum Mode<'src> {
    Normal(logos::Lexer<'src, NormalToken>),
    Check(logos::Lexer<'src, CheckToken>),
}

impl<'src> Tokenizer<'src> {
    /// Creates a new [`Tokenizer`].
    pub fn new(source: &'src str) -> Self {
        // Can't handle patterns larger than the maximum span size.
        assert!(source.len() < Span::MAX);
        Self { mode: Mode::Normal(Logos::lexer(source)) }
    }

    /// Returns the next token, or `None` at the end of the input.
    pub fn next_token(&mut self) -> Option<Token> {
        match &mut self.mode {
            Mode::Normal(lexer) => {
                let token = lexer.next()?;
                let span = Span::from(lexer.span());
                match token {
                    Ok(NormalToken::LAngle) => {
                        self.enter_check_mode();
                        Some(Token::L_ANGLE(span))
                    }
                    Ok(token) => Some(convert_normal_token(token, span)),
                    Err(()) => Some(Token::UNKNOWN(span)),
                }
            }
            Mode::Check(lexer) => {
                let token = lexer.next()?;
                let span = Span::from(lexer.span());
                match token {
                    Ok(CheckToken::RAngle) => {
                        self.leave_check_mode();
                        Some(Token::R_ANGLE(span))
                    }
                    Ok(token) => Some(convert_check_token(token, span)),
                    Err(()) => Some(Token::UNKNOWN(span)),
                }
            }
        }
    }

    /// Switches the tokenizer to check mode.
    ///
    /// Invoked when a `<` is found. The tokenizer goes back to normal mode
    /// automatically when the closing `>` is found.
    fn enter_check_mode(&mut self) {
        let mode = std::mem::replace(
            &mut self.mode,
            Mode::Normal(Logos::lexer("")),
        );
        self.mode = match mode {
            Mode::Normal(lexer) => Mode::Check(lexer.morph()),
            check => check,
        };
    }

    fn leave_check_mode(&mut self) {
        let mode = std::mem::replace(
            &mut self.mode,
            Mode::Normal(Logos::lexer("")),
        );
        self.mode = match mode {
            Mode::Check(lexer) => Mode::Normal(lexer.morph()),
            normal => normal,
        };
    }
}

fn convert_normal_token(token: NormalToken, span: Span) -> Token {
    match token {
        NormalToken::Caret => Token::CARET(span),
        NormalToken::Dollar => Token::DOLLAR(span),
        NormalToken::Dot => Token::DOT(span),
        NormalToken::Pipe => Token::PIPE(span),
        NormalToken::LParen => Token::L_PAREN(span),
        NormalToken::LParenAnon => Token::L_PAREN_ANON(span),
        NormalToken::LParenNamed => Token::L_PAREN_NAMED(span),
        NormalToken::LParenBad => Token::L_PAREN_BAD(span),
        NormalToken::RParen => Token::R_PAREN(span),
        NormalToken::Question => Token::QUESTION(span),
        NormalToken::Star => Token::ASTERISK(span),
        NormalToken::Plus => Token::PLUS(span),
        NormalToken::BraceQuant => Token::BRACE_QUANT(span),
        NormalToken::LAngle => Token::L_ANGLE(span),
    }
}

fn convert_check_token(token: CheckToken, span: Span) -> Token {
    match token {
        CheckToken::Word => Token::WORD(span),
        CheckToken::Number => Token::NUMBER_LIT(span),
        CheckToken::String => Token::STRING_LIT(span),
        CheckToken::Capture => Token::CAPTURE_LIT(span),
        CheckToken::RAngle => Token::R_ANGLE(span),
    }
}

/// Tokens recognized in normal mode.
///
/// The three `(`-family tokens overlap on purpose: logos prefers the longest
/// match, so `(?'name'` wins over `(?`, which in turn wins over a plain `(`.
/// A `(?` that is followed by neither `:` nor a well-formed `'name'` lexes as
/// [`NormalToken::LParenBad`] and becomes a "poorly formed group start"
/// error in the parser.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
enum NormalToken {
    #[token("^")]
    Caret,

    #[token("$")]
    Dollar,

    #[token(".")]
    Dot,

    #[token("|")]
    Pipe,

    #[token("(")]
    LParen,

    #[token("(?:")]
    LParenAnon,

    #[regex(r"\(\?'[A-Za-z_][A-Za-z0-9_]*'")]
    LParenNamed,

    #[token("(?")]
    LParenBad,

    #[token(")")]
    RParen,

    #[regex(r"\?\??")]
    Question,

    #[regex(r"\*\??")]
    Star,

    #[regex(r"\+\??")]
    Plus,

    #[regex(r"\{[^{}\n]*\}\??")]
    BraceQuant,

    #[token("<")]
    LAngle,
}

/// Tokens recognized in check mode, between `<` and `>`.
///
/// Number literals admit an optional one- or two-letter type tag; the tag is
/// validated by the parser so that `5x` produces an "invalid operand
/// literal" error rather than an opaque unknown-token error.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
enum CheckToken {
    #[token(">")]
    RAngle,

    #[regex(r"%?[A-Za-z_][A-Za-z0-9_.]*")]
    Word,

    #[regex(r"[-+]?[0-9]+(\.[0-9]+)?[a-z]{0,2}")]
    Number,

    #[regex(r#""(\\.|[^"\\])*""#)]
    String,

    #[regex(r"'[^'\n]*'")]
    Capture,
}
