use crate::{
    algebra::{ops::AlgebraError, Coefficient, Expression, Symbol},
    Symbols,
};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};
use smol_str::SmolStr;
use std::{convert::TryFrom, iter::Peekable, ops::Range};

/// The largest exponent accepted after a `^`.
///
/// Powers are expanded by repeated multiplication when simplifying, so
/// anything larger than this is rejected with [`ParseError::InvalidExponent`].
pub const MAX_EXPONENT: u32 = 256;

/// Parse an [`Expression`] tree from some text.
///
/// Identifiers are resolved against the [`Symbols`] table: `i` is the
/// imaginary unit, calls to a declared function symbol (e.g. `W(x, p)`) are
/// applied functions, and any other identifier is a real parameter.
pub fn parse(s: &str, symbols: &Symbols) -> Result<Expression, ParseError> {
    Parser::new(s, symbols).parse()
}

/// A simple recursive descent parser (`LL(1)`) for converting a string into an
/// expression tree.
///
/// The grammar:
///
/// ```text
/// expression     := term (("+" | "-") term)*
///
/// term           := unary (("*" | "/") unary)*
///
/// unary          := "-" unary
///                 | power
///
/// power          := factor ("^" NUMBER)?
///
/// factor         := variable_or_function_call
///                 | "(" expression ")"
///                 | NUMBER
///
/// variable_or_function_call = IDENTIFIER "(" arguments ")"
///                           | IDENTIFIER
///
/// arguments      := expression ("," expression)*
/// ```
///
/// Binary operators are left-associative, so `1/2*x` means `(1/2)*x`.
#[derive(Debug, Clone)]
pub(crate) struct Parser<'a> {
    tokens: Peekable<Tokens<'a>>,
    symbols: &'a Symbols,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(src: &'a str, symbols: &'a Symbols) -> Self {
        Parser {
            tokens: Tokens::new(src).peekable(),
            symbols,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Expression, ParseError> {
        let expr = self.expression()?;

        match self.tokens.next() {
            None => Ok(expr),
            Some(Ok(token)) => Err(ParseError::UnexpectedToken {
                found: token.kind,
                span: token.span,
                expected: &[
                    TokenKind::Plus,
                    TokenKind::Minus,
                    TokenKind::Times,
                    TokenKind::Divide,
                ],
            }),
            Some(Err(e)) => Err(e),
        }
    }

    fn peek(&mut self) -> Option<TokenKind> {
        self.tokens
            .peek()
            .and_then(|result| result.as_ref().ok())
            .map(|tok| tok.kind)
    }

    fn advance(&mut self) -> Result<Token<'a>, ParseError> {
        match self.tokens.next() {
            Some(result) => result,
            None => Err(ParseError::UnexpectedEndOfInput),
        }
    }

    fn expect(
        &mut self,
        expected: &'static [TokenKind],
    ) -> Result<Token<'a>, ParseError> {
        let token = self.advance()?;

        if expected.contains(&token.kind) {
            Ok(token)
        } else {
            Err(ParseError::UnexpectedToken {
                found: token.kind,
                span: token.span,
                expected,
            })
        }
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.term()?;

        loop {
            match self.peek() {
                Some(TokenKind::Plus) => {
                    let _ = self.advance()?;
                    left = left + self.term()?;
                },
                Some(TokenKind::Minus) => {
                    let _ = self.advance()?;
                    left = left - self.term()?;
                },
                _ => return Ok(left),
            }
        }
    }

    fn term(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.unary()?;

        loop {
            match self.peek() {
                Some(TokenKind::Times) => {
                    let _ = self.advance()?;
                    left = left * self.unary()?;
                },
                Some(TokenKind::Divide) => {
                    let _ = self.advance()?;
                    left = left / self.unary()?;
                },
                _ => return Ok(left),
            }
        }
    }

    fn unary(&mut self) -> Result<Expression, ParseError> {
        if self.peek() == Some(TokenKind::Minus) {
            let _ = self.advance()?;
            let operand = self.unary()?;
            return Ok(-operand);
        }

        self.power()
    }

    fn power(&mut self) -> Result<Expression, ParseError> {
        let base = self.factor()?;

        if self.peek() != Some(TokenKind::Caret) {
            return Ok(base);
        }

        let _ = self.advance()?;
        let token = self.expect(&[TokenKind::Number])?;

        match token.text.parse::<u32>() {
            Ok(exponent) if exponent <= MAX_EXPONENT => Ok(base.pow(exponent)),
            _ => Err(ParseError::InvalidExponent {
                text: token.text.into(),
                span: token.span,
            }),
        }
    }

    fn factor(&mut self) -> Result<Expression, ParseError> {
        const EXPECTED: &[TokenKind] = &[
            TokenKind::Number,
            TokenKind::Identifier,
            TokenKind::Minus,
            TokenKind::OpenParen,
        ];

        match self.peek() {
            Some(TokenKind::Number) => {
                return self.number();
            },
            Some(TokenKind::Identifier) => {
                return self.variable_or_function_call()
            },
            Some(TokenKind::OpenParen) => {
                let _ = self.advance()?;
                let expr = self.expression()?;
                self.expect(&[TokenKind::CloseParen])?;
                return Ok(expr);
            },
            _ => {},
        }

        // we couldn't parse the factor, return a nice error
        match self.tokens.next() {
            Some(Ok(Token { span, kind, .. })) => {
                Err(ParseError::UnexpectedToken {
                    found: kind,
                    expected: EXPECTED,
                    span,
                })
            },
            Some(Err(e)) => Err(e),
            None => Err(ParseError::UnexpectedEndOfInput),
        }
    }

    fn variable_or_function_call(&mut self) -> Result<Expression, ParseError> {
        let ident = self.advance()?;
        debug_assert_eq!(ident.kind, TokenKind::Identifier);

        if self.peek() == Some(TokenKind::OpenParen) {
            return self.function_call(ident);
        }

        if let Some(known) = self.symbols.lookup(ident.text) {
            return Ok(known);
        }

        if self.symbols.function(ident.text).is_some() {
            return Err(ParseError::UnappliedFunction {
                name: ident.text.into(),
                span: ident.span,
            });
        }

        Ok(Expression::Symbol(self.symbols.real(ident.text)))
    }

    fn function_call(
        &mut self,
        identifier: Token<'a>,
    ) -> Result<Expression, ParseError> {
        let open_paren = self.advance()?;
        debug_assert_eq!(open_paren.kind, TokenKind::OpenParen);

        let mut arguments = vec![self.expression()?];

        loop {
            let token = self
                .expect(&[TokenKind::Comma, TokenKind::CloseParen])?;

            if token.kind == TokenKind::CloseParen {
                break;
            }

            arguments.push(self.expression()?);
        }

        let name = identifier.text;
        let span = identifier.span;

        match name {
            "sqrt" => {
                let [operand] = exactly::<1>(name, arguments)?;
                Ok(operand.sqrt())
            },
            "Derivative" => {
                if arguments.len() < 2 {
                    return Err(ParseError::WrongArity {
                        name: name.into(),
                        expected: "at least 2",
                        found: arguments.len(),
                    });
                }

                let mut arguments = arguments.into_iter();
                let mut derivative =
                    arguments.next().unwrap_or_else(Expression::zero);
                for variable in arguments {
                    derivative =
                        derivative.derivative(&as_symbol(variable, &span)?);
                }

                Ok(derivative)
            },
            _ => match self.symbols.function(name) {
                Some(function) => {
                    let [first, second] = exactly::<2>(name, arguments)?;
                    let first = as_symbol(first, &span)?;
                    let second = as_symbol(second, &span)?;

                    Ok(function.apply(&first, &second)?)
                },
                None => Err(ParseError::UnknownFunction {
                    name: name.into(),
                    span,
                }),
            },
        }
    }

    fn number(&mut self) -> Result<Expression, ParseError> {
        let token = self
            .tokens
            .next()
            .ok_or(ParseError::UnexpectedEndOfInput)??;

        debug_assert_eq!(token.kind, TokenKind::Number);

        Ok(Expression::Constant(Coefficient::real(parse_decimal(
            token.text,
        ))))
    }
}

/// Convert something like "3.25" into an exact rational.
fn parse_decimal(text: &str) -> BigRational {
    let mut numerator = BigInt::zero();
    let mut denominator = BigInt::one();
    let mut seen_decimal_point = false;

    for c in text.chars() {
        match c.to_digit(10) {
            Some(digit) => {
                numerator = numerator * 10 + digit;
                if seen_decimal_point {
                    denominator = denominator * 10;
                }
            },
            None => seen_decimal_point = true,
        }
    }

    BigRational::new(numerator, denominator)
}

fn exactly<const N: usize>(
    name: &str,
    arguments: Vec<Expression>,
) -> Result<[Expression; N], ParseError> {
    let found = arguments.len();

    <[Expression; N]>::try_from(arguments).map_err(|_| {
        ParseError::WrongArity {
            name: name.into(),
            expected: if N == 1 { "1" } else { "2" },
            found,
        }
    })
}

fn as_symbol(
    expr: Expression,
    span: &Range<usize>,
) -> Result<Symbol, ParseError> {
    match expr {
        Expression::Symbol(symbol) => Ok(symbol),
        _ => Err(ParseError::ExpectedSymbol { span: span.clone() }),
    }
}

/// Possible errors that may occur while parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid character {character:?} at index {index}")]
    InvalidCharacter { character: char, index: usize },
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    #[error("expected one of {expected:?} at {span:?}, but found {found:?}")]
    UnexpectedToken {
        found: TokenKind,
        span: Range<usize>,
        expected: &'static [TokenKind],
    },
    #[error("exponents must be integers between 0 and {}, found \"{text}\"", MAX_EXPONENT)]
    InvalidExponent { text: SmolStr, span: Range<usize> },
    #[error("unknown function \"{name}\" at {span:?}")]
    UnknownFunction { name: SmolStr, span: Range<usize> },
    #[error("the function \"{name}\" must be applied to coordinates before use")]
    UnappliedFunction { name: SmolStr, span: Range<usize> },
    #[error("{name}() expects {expected} arguments, found {found}")]
    WrongArity {
        name: SmolStr,
        expected: &'static str,
        found: usize,
    },
    #[error("expected a symbol in the arguments at {span:?}")]
    ExpectedSymbol { span: Range<usize> },
    #[error(transparent)]
    Algebra(#[from] AlgebraError),
}

#[derive(Debug, Clone, PartialEq)]
struct Tokens<'a> {
    src: &'a str,
    cursor: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str) -> Self { Tokens { src, cursor: 0 } }

    fn rest(&self) -> &'a str { &self.src[self.cursor..] }

    fn peek(&self) -> Option<char> { self.rest().chars().next() }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cursor += c.len_utf8();
        Some(c)
    }

    fn chomp(
        &mut self,
        kind: TokenKind,
    ) -> Option<Result<Token<'a>, ParseError>> {
        let start = self.cursor;
        self.advance()?;
        let end = self.cursor;

        Some(Ok(Token::from_text(self.src, start..end, kind)))
    }

    fn take_while<P>(&mut self, mut predicate: P) -> Range<usize>
    where
        P: FnMut(char) -> bool,
    {
        let start = self.cursor;

        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }

            self.advance();
        }

        start..self.cursor
    }

    fn chomp_number(&mut self) -> Token<'a> {
        let start = self.cursor;
        self.take_while(|c| c.is_ascii_digit());

        if self.peek() == Some('.') {
            // skip past the decimal
            self.advance();
            self.take_while(|c| c.is_ascii_digit());
        }

        Token::from_text(self.src, start..self.cursor, TokenKind::Number)
    }

    fn chomp_identifier(&mut self) -> Token<'a> {
        let mut seen_first_character = false;

        let span = self.take_while(|c| {
            if seen_first_character {
                c.is_ascii_alphanumeric() || c == '_'
            } else {
                seen_first_character = true;
                c.is_ascii_alphabetic() || c == '_'
            }
        });

        Token::from_text(self.src, span, TokenKind::Identifier)
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match self.peek()? {
                space if space.is_whitespace() => {
                    self.advance();
                    continue;
                },
                '(' => self.chomp(TokenKind::OpenParen),
                ')' => self.chomp(TokenKind::CloseParen),
                '+' => self.chomp(TokenKind::Plus),
                '-' => self.chomp(TokenKind::Minus),
                '*' => self.chomp(TokenKind::Times),
                '/' => self.chomp(TokenKind::Divide),
                '^' => self.chomp(TokenKind::Caret),
                ',' => self.chomp(TokenKind::Comma),
                '_' | 'a'..='z' | 'A'..='Z' => {
                    Some(Ok(self.chomp_identifier()))
                },
                '0'..='9' => Some(Ok(self.chomp_number())),
                other => {
                    let index = self.cursor;
                    self.advance();

                    Some(Err(ParseError::InvalidCharacter {
                        character: other,
                        index,
                    }))
                },
            };
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token<'a> {
    text: &'a str,
    span: Range<usize>,
    kind: TokenKind,
}

impl<'a> Token<'a> {
    fn from_text(
        original_source: &'a str,
        span: Range<usize>,
        kind: TokenKind,
    ) -> Self {
        Token {
            text: &original_source[span.clone()],
            span,
            kind,
        }
    }
}

/// The kinds of token that can appear in an [`Expression`]'s text form.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    Number,
    OpenParen,
    CloseParen,
    Plus,
    Minus,
    Times,
    Divide,
    Caret,
    Comma,
}


#[cfg(test)]
mod parser_tests {
    use super::*;

    macro_rules! parser_test {
        ($name:ident, $src:expr) => {
            parser_test!($name, $src, $src);
        };
        ($name:ident, $src:expr, $should_be:expr) => {
            #[test]
            fn $name() {
                let symbols = Symbols::new();
                let got = Parser::new($src, &symbols).parse().unwrap();

                let round_tripped = got.to_string();
                assert_eq!(round_tripped, $should_be);
            }
        };
    }

    parser_test!(simple_integer, "1");
    parser_test!(decimal_is_exact, "0.25", "1/4");
    parser_test!(one_plus_one, "1 + 1");
    parser_test!(one_plus_one_plus_negative_one, "1 + -1", "1 - 1");
    parser_test!(one_plus_one_times_three, "1 + 1*3");
    parser_test!(one_plus_one_all_times_three, "(1 + 1)*3");
    parser_test!(negative_one, "-1");
    parser_test!(negative_one_plus_x, "-1 + x");
    parser_test!(number_in_parens, "(1)", "1");
    parser_test!(left_associative_division, "1/2*x");
    parser_test!(bimdas, "1*2 + 3*4/(5 - 2)*1 - 3");
    parser_test!(imaginary_unit, "x + i*p");
    parser_test!(powers, "x^2*(x + p)^3");
    parser_test!(negated_power, "-x^2");
    parser_test!(square_root, "sqrt(2)");
    parser_test!(applied_function, "W(x, p)");
    parser_test!(
        derivative_of_an_applied_function,
        "Derivative(W(x, p), x, p)"
    );

    #[test]
    fn unknown_functions_are_rejected() {
        let symbols = Symbols::new();

        let got = parse("sin(x)", &symbols);

        assert_eq!(
            got,
            Err(ParseError::UnknownFunction {
                name: "sin".into(),
                span: 0..3
            })
        );
    }

    #[test]
    fn function_symbols_must_be_applied() {
        let symbols = Symbols::new();

        let got = parse("x*W", &symbols);

        assert!(matches!(got, Err(ParseError::UnappliedFunction { .. })));
    }

    #[test]
    fn function_arguments_are_checked() {
        let symbols = Symbols::new();

        assert!(matches!(
            parse("W(x, x)", &symbols),
            Err(ParseError::Algebra(_))
        ));
        assert!(matches!(
            parse("W(x + 1, p)", &symbols),
            Err(ParseError::ExpectedSymbol { .. })
        ));
        assert!(matches!(
            parse("W(x)", &symbols),
            Err(ParseError::WrongArity { found: 1, .. })
        ));
    }

    #[test]
    fn exponents_must_be_integers() {
        let symbols = Symbols::new();

        assert!(matches!(
            parse("x^0.5", &symbols),
            Err(ParseError::InvalidExponent { .. })
        ));
    }

    #[test]
    fn huge_exponents_are_rejected() {
        let symbols = Symbols::new();
        let inputs = vec!["x^4000000", "(x + p)^257", "x^99999999999"];

        for src in inputs {
            assert!(
                matches!(
                    parse(src, &symbols),
                    Err(ParseError::InvalidExponent { .. })
                ),
                "{}",
                src
            );
        }

        let got = parse("x^256", &symbols).unwrap();
        assert_eq!(got, Expression::from(symbols.x()).pow(MAX_EXPONENT));
    }

    #[test]
    fn trailing_tokens_are_an_error() {
        let symbols = Symbols::new();

        assert!(parse("x p", &symbols).is_err());
    }
}
