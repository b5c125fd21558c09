/*! Converts the token stream into a sequence of checks.

The parser is a single forward pass over the tokens. Instruction checks
(`<...>`) are parsed into their typed form, quantifier tokens are fused onto
the check they follow whenever that is allowed, and group delimiters are
passed through as checks; group pairing is left to the compiler, which
reports unbalanced groups.
*/

use std::borrow::Cow;

use crate::ast::{
    CaptureRef, CheckExpr, CheckKind, Literal, MemberKind, OpCodeName,
    Quantifier,
};
use crate::tokenizer::{Token, Tokenizer};
use crate::Span;

mod errors;

pub use errors::{Error, ErrorKind};

#[cfg(test)]
mod tests;

/// Parses pattern source code into a sequence of checks.
///
/// The returned checks appear in source order, with group delimiters and
/// alternation markers interleaved as they were written. Quantifiers are
/// attached to the preceding check when possible; a quantifier that cannot
/// be attached here (for instance one written right after `(` or `|`) is
/// kept as a floating [`CheckKind::Quantifier`] check for the pattern
/// builder to deal with.
pub fn parse(src: &str) -> Result<Vec<CheckExpr<'_>>, Error> {
    Parser::new(src).parse()
}

struct Parser<'src> {
    source: &'src str,
    tokenizer: Tokenizer<'src>,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Self {
        Self { source, tokenizer: Tokenizer::new(source) }
    }

    fn parse(mut self) -> Result<Vec<CheckExpr<'src>>, Error> {
        let mut checks: Vec<CheckExpr<'src>> = Vec::new();
        while let Some(token) = self.tokenizer.next_token() {
            let span = token.span();
            match token {
                Token::CARET(_) => {
                    checks.push(self.atom(CheckKind::Start, span))
                }
                Token::DOLLAR(_) => {
                    checks.push(self.atom(CheckKind::End, span))
                }
                Token::DOT(_) => checks.push(self.atom(CheckKind::Any, span)),
                Token::PIPE(_) => {
                    checks.push(self.atom(CheckKind::Alternative, span))
                }
                Token::L_PAREN(_) => checks.push(self.atom(
                    CheckKind::GroupStart { capturing: true, name: None },
                    span,
                )),
                Token::L_PAREN_ANON(_) => checks.push(self.atom(
                    CheckKind::GroupStart { capturing: false, name: None },
                    span,
                )),
                Token::L_PAREN_NAMED(_) => {
                    // The token is `(?'name'`; the name sits between the
                    // leading `(?'` and the trailing `'`.
                    let text = &self.source[span.range()];
                    let name = &text[3..text.len() - 1];
                    checks.push(self.atom(
                        CheckKind::GroupStart {
                            capturing: true,
                            name: Some(name),
                        },
                        span,
                    ));
                }
                Token::L_PAREN_BAD(_) => {
                    return Err(self.error(ErrorKind::MalformedGroupStart, &span))
                }
                Token::R_PAREN(_) => {
                    checks.push(self.atom(CheckKind::GroupEnd, span))
                }
                Token::QUESTION(_)
                | Token::ASTERISK(_)
                | Token::PLUS(_)
                | Token::BRACE_QUANT(_) => {
                    let text = &self.source[span.range()];
                    let quantifier: Quantifier =
                        text.parse().map_err(|_| {
                            self.error(
                                ErrorKind::InvalidQuantifier(text.to_string()),
                                &span,
                            )
                        })?;
                    match checks.last_mut() {
                        Some(prev) if prev.accepts_quantifier() => {
                            prev.quantifier = quantifier;
                            prev.span = prev.span.combine(&span);
                        }
                        _ => checks.push(CheckExpr {
                            kind: CheckKind::Quantifier(quantifier),
                            quantifier: Quantifier::ONE,
                            span,
                        }),
                    }
                }
                Token::L_ANGLE(_) => {
                    let check = self.parse_check(span)?;
                    checks.push(check);
                }
                Token::UNKNOWN(_) => {
                    return Err(self.unknown_token_error(&span))
                }
                // Check-mode tokens can't appear here; the tokenizer only
                // produces them between `<` and `>`.
                Token::WORD(_)
                | Token::NUMBER_LIT(_)
                | Token::STRING_LIT(_)
                | Token::CAPTURE_LIT(_)
                | Token::R_ANGLE(_) => {
                    return Err(self.error(
                        ErrorKind::UnexpectedToken(
                            token.description().to_string(),
                        ),
                        &span,
                    ))
                }
            }
        }
        Ok(checks)
    }

    fn atom(&self, kind: CheckKind<'src>, span: Span) -> CheckExpr<'src> {
        CheckExpr { kind, quantifier: Quantifier::ONE, span }
    }

    /// Parses one `<prefix arg*>` check. `l_angle` is the span of the
    /// opening `<`.
    fn parse_check(&mut self, l_angle: Span) -> Result<CheckExpr<'src>, Error> {
        let mut args: Vec<Token> = Vec::new();
        let r_angle = loop {
            match self.tokenizer.next_token() {
                Some(Token::R_ANGLE(span)) => break span,
                Some(Token::UNKNOWN(span)) => {
                    return Err(self.unknown_token_error(&span))
                }
                Some(token) => args.push(token),
                None => {
                    return Err(Error::at_offset(
                        ErrorKind::UnterminatedCheck,
                        self.source,
                        self.source.len(),
                    ))
                }
            }
        };

        let span = l_angle.combine(&r_angle);

        let mut args = args.into_iter();
        let prefix = match args.next() {
            Some(Token::WORD(span)) => span,
            Some(other) => {
                return Err(self.error(
                    ErrorKind::UnexpectedToken(
                        other.description().to_string(),
                    ),
                    &other.span(),
                ))
            }
            None => {
                return Err(self.error(
                    ErrorKind::UnexpectedToken("`>`".to_string()),
                    &r_angle,
                ))
            }
        };
        let args: Vec<Token> = args.collect();

        let kind = match &self.source[prefix.range()] {
            "nop" => {
                self.expect_args("nop", &args, 0, 0, &r_angle)?;
                CheckKind::Nop
            }
            "op" => {
                self.expect_args("op", &args, 1, 2, &r_angle)?;
                let opcode = self.opcode_arg(&args[0])?;
                let operand = match args.get(1) {
                    Some(arg) => Some(self.literal_arg(arg)?),
                    None => None,
                };
                CheckKind::Op { opcode, operand }
            }
            "cap" => {
                self.expect_args("cap", &args, 1, 2, &r_angle)?;
                let opcode = self.opcode_arg(&args[0])?;
                let name = match args.get(1) {
                    Some(arg) => match self.capture_arg(arg)? {
                        CaptureRef::Name(name) => Some(name),
                        CaptureRef::Index(index) => {
                            return Err(self.error(
                                ErrorKind::InvalidCaptureName(
                                    index.to_string(),
                                ),
                                &arg.span(),
                            ))
                        }
                    },
                    None => None,
                };
                CheckKind::Capture { opcode, name }
            }
            "ceq" => {
                self.expect_args("ceq", &args, 2, 2, &r_angle)?;
                let opcode = self.opcode_arg(&args[0])?;
                let capture = self.capture_arg(&args[1])?;
                CheckKind::OperandEquals { opcode, capture }
            }
            prefix @ ("fld" | "mth" | "typ" | "cls") => {
                let kind = match prefix {
                    "fld" => MemberKind::Field,
                    "mth" => MemberKind::Method,
                    "typ" => MemberKind::Type,
                    _ => MemberKind::CallSite,
                };
                self.expect_args(prefix, &args, 2, 2, &r_angle)?;
                let opcode = self.opcode_arg(&args[0])?;
                let pattern = self.string_arg(&args[1])?;
                CheckKind::Member { kind, opcode, pattern }
            }
            other => {
                return Err(self.error(
                    ErrorKind::UnknownCheckPrefix(other.to_string()),
                    &prefix,
                ))
            }
        };

        Ok(CheckExpr { kind, quantifier: Quantifier::ONE, span })
    }

    /// Validates the number of arguments after a check prefix.
    ///
    /// Missing arguments are reported just past the closing `>`, where the
    /// argument was expected; surplus arguments at the first one in excess.
    fn expect_args(
        &self,
        prefix: &str,
        args: &[Token],
        min: usize,
        max: usize,
        r_angle: &Span,
    ) -> Result<(), Error> {
        let expected = match (min, max) {
            (0, 0) => "no arguments",
            (1, 2) => "1 or 2 arguments",
            _ => "2 arguments",
        };
        if args.len() < min {
            return Err(Error::at_offset(
                ErrorKind::WrongArgumentCount {
                    prefix: prefix.to_string(),
                    expected,
                    found: args.len(),
                },
                self.source,
                r_angle.end(),
            ));
        }
        if args.len() > max {
            return Err(self.error(
                ErrorKind::WrongArgumentCount {
                    prefix: prefix.to_string(),
                    expected,
                    found: args.len(),
                },
                &args[max].span(),
            ));
        }
        Ok(())
    }

    fn opcode_arg(&self, arg: &Token) -> Result<OpCodeName<'src>, Error> {
        let span = match arg {
            Token::WORD(span) => span.clone(),
            other => {
                return Err(self.error(
                    ErrorKind::UnexpectedToken(
                        other.description().to_string(),
                    ),
                    &other.span(),
                ))
            }
        };
        let text = &self.source[span.range()];
        match text.strip_prefix('%') {
            Some(name) => Ok(OpCodeName { name, family: true, span }),
            None => Ok(OpCodeName { name: text, family: false, span }),
        }
    }

    fn literal_arg(&self, arg: &Token) -> Result<Literal<'src>, Error> {
        match arg {
            Token::NUMBER_LIT(span) => self.number_literal(span),
            Token::STRING_LIT(span) => {
                Ok(Literal::String(self.string_contents(span)?))
            }
            other => Err(self.error(
                ErrorKind::UnexpectedToken(other.description().to_string()),
                &other.span(),
            )),
        }
    }

    fn string_arg(&self, arg: &Token) -> Result<Cow<'src, str>, Error> {
        match arg {
            Token::STRING_LIT(span) => self.string_contents(span),
            other => Err(self.error(
                ErrorKind::UnexpectedToken(other.description().to_string()),
                &other.span(),
            )),
        }
    }

    fn capture_arg(&self, arg: &Token) -> Result<CaptureRef<'src>, Error> {
        let span = match arg {
            Token::CAPTURE_LIT(span) => span.clone(),
            other => {
                return Err(self.error(
                    ErrorKind::UnexpectedToken(
                        other.description().to_string(),
                    ),
                    &other.span(),
                ))
            }
        };
        // Strip the surrounding quotes.
        let text = &self.source[span.start() + 1..span.end() - 1];
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            let index = text.parse().map_err(|_| {
                self.error(
                    ErrorKind::InvalidCaptureName(text.to_string()),
                    &span,
                )
            })?;
            return Ok(CaptureRef::Index(index));
        }
        if !is_valid_capture_name(text) {
            return Err(self.error(
                ErrorKind::InvalidCaptureName(text.to_string()),
                &span,
            ));
        }
        Ok(CaptureRef::Name(text))
    }

    /// Parses a number literal, honoring the optional trailing type tag.
    fn number_literal(&self, span: &Span) -> Result<Literal<'src>, Error> {
        let text = &self.source[span.range()];
        let err = || {
            self.error(ErrorKind::InvalidOperandLiteral(text.to_string()), span)
        };
        let tag_at =
            text.rfind(|c: char| !c.is_ascii_alphabetic()).map_or(0, |i| i + 1);
        let (num, tag) = text.split_at(tag_at);
        let fractional = num.contains('.');
        match tag {
            "" if fractional => Err(err()),
            "" => Ok(Literal::Int32(num.parse().map_err(|_| err())?)),
            "l" if !fractional => {
                Ok(Literal::Int64(num.parse().map_err(|_| err())?))
            }
            "b" if !fractional => {
                Ok(Literal::UInt8(num.parse().map_err(|_| err())?))
            }
            "sb" if !fractional => {
                Ok(Literal::Int8(num.parse().map_err(|_| err())?))
            }
            "f" => Ok(Literal::Float32(num.parse().map_err(|_| err())?)),
            "d" => Ok(Literal::Float64(num.parse().map_err(|_| err())?)),
            _ => Err(err()),
        }
    }

    /// Returns the contents of a string literal with escape sequences
    /// processed. Borrows from the source when there is nothing to unescape.
    fn string_contents(&self, span: &Span) -> Result<Cow<'src, str>, Error> {
        let inner = &self.source[span.start() + 1..span.end() - 1];
        if !inner.contains('\\') {
            return Ok(Cow::Borrowed(inner));
        }
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('0') => out.push('\0'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('\'') => out.push('\''),
                Some('x') => {
                    let hi = chars.next();
                    let lo = chars.next();
                    let byte = match (hi, lo) {
                        (Some(hi), Some(lo)) => u8::from_str_radix(
                            &format!("{hi}{lo}"),
                            16,
                        )
                        .ok(),
                        _ => None,
                    };
                    match byte {
                        Some(byte) => out.push(byte as char),
                        None => {
                            return Err(self.error(
                                ErrorKind::InvalidEscapeSequence(
                                    inner.to_string(),
                                ),
                                span,
                            ))
                        }
                    }
                }
                _ => {
                    return Err(self.error(
                        ErrorKind::InvalidEscapeSequence(inner.to_string()),
                        span,
                    ))
                }
            }
        }
        Ok(Cow::Owned(out))
    }

    /// Classifies a token the lexer could not recognize.
    fn unknown_token_error(&self, span: &Span) -> Error {
        let rest = &self.source[span.start()..];
        let kind = if rest.starts_with('"') || rest.starts_with('\'') {
            ErrorKind::UnterminatedString
        } else if rest.starts_with("/*") {
            ErrorKind::UnterminatedComment
        } else {
            let c = rest.chars().next().map(String::from).unwrap_or_default();
            ErrorKind::UnexpectedToken(format!("`{c}`"))
        };
        Error::new(kind, self.source, span)
    }

    fn error(&self, kind: ErrorKind, span: &Span) -> Error {
        Error::new(kind, self.source, span)
    }
}

fn is_valid_capture_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
