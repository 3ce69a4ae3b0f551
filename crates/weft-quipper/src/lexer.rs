//! Lexer for the ASCII circuit format.

use logos::Logos;

use crate::error::{QuipperError, QuipperResult};

/// Tokens of the ASCII circuit format.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    // Keywords
    #[token("Inputs")]
    Inputs,

    #[token("Outputs")]
    Outputs,

    #[token("Subroutine")]
    Subroutine,

    #[token("Shape")]
    Shape,

    #[token("Controllable")]
    Controllable,

    #[token("QGate")]
    QGate,

    #[token("QRot")]
    QRot,

    #[token("QMeas")]
    QMeas,

    #[token("Qbit")]
    Qbit,

    #[token("Cbit")]
    Cbit,

    #[token("with")]
    With,

    #[token("controls")]
    Controls,

    // Literals
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    FloatLiteral(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    IntLiteral(u64),

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        Some(s[1..s.len()-1].to_string())
    })]
    StringLiteral(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Operators and punctuation
    #[token("->")]
    Arrow,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("=")]
    Eq,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Inputs => write!(f, "Inputs"),
            Token::Outputs => write!(f, "Outputs"),
            Token::Subroutine => write!(f, "Subroutine"),
            Token::Shape => write!(f, "Shape"),
            Token::Controllable => write!(f, "Controllable"),
            Token::QGate => write!(f, "QGate"),
            Token::QRot => write!(f, "QRot"),
            Token::QMeas => write!(f, "QMeas"),
            Token::Qbit => write!(f, "Qbit"),
            Token::Cbit => write!(f, "Cbit"),
            Token::With => write!(f, "with"),
            Token::Controls => write!(f, "controls"),
            Token::FloatLiteral(v) => write!(f, "{v}"),
            Token::IntLiteral(v) => write!(f, "{v}"),
            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::Identifier(s) => write!(f, "{s}"),
            Token::Arrow => write!(f, "->"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Eq => write!(f, "="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Colon => write!(f, ":"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// A token with its span information.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: std::ops::Range<usize>,
}

/// Tokenize an ASCII circuit source string.
pub fn tokenize(source: &str) -> QuipperResult<Vec<SpannedToken>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(SpannedToken { token, span }),
            Err(()) => {
                return Err(QuipperError::Lexer {
                    slice: source[span.clone()].to_string(),
                    offset: span.start,
                });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_line() {
        let tokens = tokenize("Inputs: 0:Qbit, 1:Cbit").unwrap();
        assert_eq!(tokens[0].token, Token::Inputs);
        assert_eq!(tokens[1].token, Token::Colon);
        assert!(matches!(tokens[2].token, Token::IntLiteral(0)));
        assert_eq!(tokens[3].token, Token::Colon);
        assert_eq!(tokens[4].token, Token::Qbit);
        assert_eq!(tokens[8].token, Token::Cbit);
    }

    #[test]
    fn test_gate_line_with_controls() {
        let tokens = tokenize(r#"QGate["not"](1) with controls=[+0]"#).unwrap();
        assert_eq!(tokens[0].token, Token::QGate);
        assert!(matches!(tokens[2].token, Token::StringLiteral(ref s) if s == "not"));
        assert!(tokens.iter().any(|t| t.token == Token::With));
        assert!(tokens.iter().any(|t| t.token == Token::Plus));
    }

    #[test]
    fn test_rotation_line() {
        let tokens = tokenize(r#"QRot["exp(-i%Z)",0.785398](0)"#).unwrap();
        assert_eq!(tokens[0].token, Token::QRot);
        assert!(matches!(tokens[2].token, Token::StringLiteral(ref s) if s == "exp(-i%Z)"));
        assert!(matches!(tokens[4].token, Token::FloatLiteral(v) if (v - 0.785398).abs() < 1e-9));
    }

    #[test]
    fn test_invalid_token() {
        assert!(matches!(tokenize("QGate @"), Err(QuipperError::Lexer { .. })));
    }
}
