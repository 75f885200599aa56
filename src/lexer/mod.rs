use logos::Logos;

use crate::vm::ArithOp;

/// Byte range of a token within the scanned line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl From<std::ops::Range<usize>> for Span {
    fn from(r: std::ops::Range<usize>) -> Self {
        Span { start: r.start, end: r.end }
    }
}

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"\s+")]
pub enum Token {
    #[token("def")]
    Def,

    // A name runs until an operator, a parenthesis or whitespace: `x=5` is one name.
    #[regex(r"[a-zA-Z][^+\-*/()\s]*", |lex| lex.slice().to_string())]
    Ident(String),

    // No validation: `1.2.3` or a lone `.` decode to NaN.
    #[regex(r"[0-9.]+", |lex| lex.slice().parse::<f64>().unwrap_or(f64::NAN))]
    Number(f64),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("=")]
    Equals,

    #[regex(r"[+\-*/]", |lex| lex.slice().chars().next().and_then(ArithOp::from_char))]
    Op(ArithOp),

    /// Sentinel closing every stream; never produced by the lexer itself.
    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Def => write!(f, "def"),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Number(n) => write!(f, "{}", n),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Equals => write!(f, "="),
            Token::Op(op) => write!(f, "{}", op.symbol()),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// Cursor over the tokens of one line. Always ends with `Token::Eof`, so
/// `peek` has something to return even after the last real token.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

impl TokenStream {
    pub fn new(mut tokens: Vec<(Token, Span)>) -> Self {
        let end = tokens.last().map(|(_, s)| s.end).unwrap_or(0);
        tokens.push((Token::Eof, Span { start: end, end }));
        TokenStream { tokens, pos: 0 }
    }

    pub fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    pub fn peek_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    /// Consume the next token. Once the sentinel is reached it is returned
    /// again on every call.
    pub fn pop(&mut self) -> (Token, Span) {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub fn at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    /// Tokens not yet consumed, sentinel included.
    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.pos
    }
}

/// Scan one line of input. Characters that start no token are skipped
/// rather than reported; the parser fails on whatever gap they leave.
pub fn scan(line: &str) -> TokenStream {
    let mut lexer = Token::lexer(line);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, Span::from(lexer.span()))),
            Err(()) => {
                tracing::debug!(snippet = lexer.slice(), position = lexer.span().start, "skipping unrecognized input");
            }
        }
    }

    TokenStream::new(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<Token> {
        let mut stream = scan(line);
        let mut out = Vec::new();
        loop {
            let (tok, _) = stream.pop();
            if tok == Token::Eof {
                break;
            }
            out.push(tok);
        }
        out
    }

    #[test]
    fn scan_definition() {
        assert_eq!(
            kinds("def x = 5"),
            vec![Token::Def, Token::Ident("x".into()), Token::Equals, Token::Number(5.0)]
        );
    }

    #[test]
    fn scan_expression_in_source_order() {
        assert_eq!(
            kinds("(2+3)*4.5"),
            vec![
                Token::LParen,
                Token::Number(2.0),
                Token::Op(ArithOp::Add),
                Token::Number(3.0),
                Token::RParen,
                Token::Op(ArithOp::Mul),
                Token::Number(4.5),
            ]
        );
    }

    #[test]
    fn keyword_prefix_is_an_identifier() {
        assert_eq!(kinds("define"), vec![Token::Ident("define".into())]);
        assert_eq!(kinds("Def"), vec![Token::Ident("Def".into())]);
    }

    #[test]
    fn identifier_swallows_equals_and_digits() {
        assert_eq!(kinds("x=5"), vec![Token::Ident("x=5".into())]);
        assert_eq!(kinds("abc12 "), vec![Token::Ident("abc12".into())]);
    }

    #[test]
    fn identifier_stops_at_operator_and_paren() {
        assert_eq!(
            kinds("a-b)"),
            vec![Token::Ident("a".into()), Token::Op(ArithOp::Sub), Token::Ident("b".into()), Token::RParen]
        );
    }

    #[test]
    fn operators_carry_their_arithmetic() {
        assert_eq!(
            kinds("+-*/"),
            vec![
                Token::Op(ArithOp::Add),
                Token::Op(ArithOp::Sub),
                Token::Op(ArithOp::Mul),
                Token::Op(ArithOp::Div),
            ]
        );
        assert_eq!(Token::Op(ArithOp::Div).to_string(), "/");
    }

    #[test]
    fn malformed_number_is_nan() {
        let toks = kinds("1.2.3");
        assert_eq!(toks.len(), 1);
        match &toks[0] {
            Token::Number(n) => assert!(n.is_nan()),
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn unknown_characters_are_skipped() {
        assert_eq!(kinds("1 % 2"), vec![Token::Number(1.0), Token::Number(2.0)]);
        assert_eq!(kinds("#"), vec![]);
    }

    #[test]
    fn empty_line_is_just_eof() {
        let mut stream = scan("   ");
        assert!(stream.at_end());
        assert_eq!(stream.pop().0, Token::Eof);
        assert_eq!(stream.pop().0, Token::Eof);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut stream = scan("7 )");
        assert_eq!(stream.peek(), &Token::Number(7.0));
        assert_eq!(stream.peek(), &Token::Number(7.0));
        assert_eq!(stream.remaining(), 3);
        stream.pop();
        assert_eq!(stream.peek(), &Token::RParen);
        assert_eq!(stream.peek_span(), Span { start: 2, end: 3 });
    }
}
