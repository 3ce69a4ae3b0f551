//! Recursive-descent parser for the ASCII circuit format.
//!
//! Parsing stops at the syntax level. The output is a [`Program`] of wire
//! declarations, statements and subroutine definitions; lowering to a
//! circuit happens in [`crate::translate`].

use crate::error::{QuipperError, QuipperResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// The declared kind of a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    Qbit,
    Cbit,
}

/// A wire declaration `id:Qbit` or `id:Cbit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireDecl {
    pub id: u64,
    pub kind: WireKind,
}

/// A control wire with its polarity (`+n` fires on one, `-n` on zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    pub wire: u64,
    pub positive: bool,
}

/// One statement of a circuit body.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `QGate["name"]*(wires) with controls=[...]`, star and controls
    /// optional.
    Gate {
        name: String,
        inverse: bool,
        wires: Vec<u64>,
        controls: Vec<Control>,
    },
    /// `QRot["exp(-i%A)",timestep](wire)`.
    Rot {
        name: String,
        timestep: f64,
        wire: u64,
    },
    /// `QMeas(wire)`.
    Meas { wire: u64 },
    /// `Subroutine["name"](ins) -> (outs) with controls=[...]`.
    Call {
        name: String,
        inputs: Vec<u64>,
        outputs: Vec<u64>,
        controls: Vec<Control>,
    },
}

/// A named subroutine definition.
#[derive(Debug, Clone, PartialEq)]
pub struct SubroutineDef {
    pub name: String,
    pub shape: String,
    pub controllable: bool,
    pub inputs: Vec<WireDecl>,
    pub body: Vec<Statement>,
    pub outputs: Vec<WireDecl>,
}

/// A parsed source file: the main body plus its subroutine definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub inputs: Vec<WireDecl>,
    pub body: Vec<Statement>,
    pub outputs: Vec<WireDecl>,
    pub subroutines: Vec<SubroutineDef>,
}

/// Parse a source string into a [`Program`].
pub fn parse_program(source: &str) -> QuipperResult<Program> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn advance(&mut self) -> QuipperResult<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .map(|t| t.token.clone())
            .ok_or(QuipperError::UnexpectedEof)?;
        self.pos += 1;
        Ok(token)
    }

    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    fn expect(&mut self, token: &Token) -> QuipperResult<()> {
        match self.peek() {
            Some(t) if std::mem::discriminant(t) == std::mem::discriminant(token) => {
                self.pos += 1;
                Ok(())
            }
            Some(t) => Err(QuipperError::Unexpected {
                expected: format!("'{token}'"),
                found: t.to_string(),
            }),
            None => Err(QuipperError::UnexpectedEof),
        }
    }

    fn integer(&mut self) -> QuipperResult<u64> {
        match self.advance()? {
            Token::IntLiteral(value) => Ok(value),
            other => Err(QuipperError::Unexpected {
                expected: "an integer".into(),
                found: other.to_string(),
            }),
        }
    }

    fn string(&mut self) -> QuipperResult<String> {
        match self.advance()? {
            Token::StringLiteral(value) => Ok(value),
            other => Err(QuipperError::Unexpected {
                expected: "a string literal".into(),
                found: other.to_string(),
            }),
        }
    }

    fn parse_program(mut self) -> QuipperResult<Program> {
        let inputs = self.parse_wire_list(&Token::Inputs)?;
        let body = self.parse_body()?;
        let outputs = self.parse_wire_list(&Token::Outputs)?;
        let mut subroutines = Vec::new();
        while self.peek().is_some() {
            subroutines.push(self.parse_subroutine_def()?);
        }
        Ok(Program {
            inputs,
            body,
            outputs,
            subroutines,
        })
    }

    // `Inputs: 0:Qbit, 1:Cbit` or `Inputs: none`; same shape for Outputs.
    fn parse_wire_list(&mut self, keyword: &Token) -> QuipperResult<Vec<WireDecl>> {
        self.expect(keyword)?;
        self.expect(&Token::Colon)?;
        if let Some(Token::Identifier(word)) = self.peek() {
            if word == "none" {
                self.advance()?;
                return Ok(Vec::new());
            }
        }
        let mut decls = vec![self.parse_wire_decl()?];
        while self.check(&Token::Comma) {
            self.advance()?;
            decls.push(self.parse_wire_decl()?);
        }
        Ok(decls)
    }

    fn parse_wire_decl(&mut self) -> QuipperResult<WireDecl> {
        let id = self.integer()?;
        self.expect(&Token::Colon)?;
        let kind = match self.advance()? {
            Token::Qbit => WireKind::Qbit,
            Token::Cbit => WireKind::Cbit,
            other => {
                return Err(QuipperError::Unexpected {
                    expected: "'Qbit' or 'Cbit'".into(),
                    found: other.to_string(),
                });
            }
        };
        Ok(WireDecl { id, kind })
    }

    // Statements until the next `Outputs` keyword.
    fn parse_body(&mut self) -> QuipperResult<Vec<Statement>> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Outputs) => return Ok(body),
                Some(Token::QGate) => body.push(self.parse_qgate()?),
                Some(Token::QRot) => body.push(self.parse_qrot()?),
                Some(Token::QMeas) => body.push(self.parse_qmeas()?),
                Some(Token::Subroutine) => body.push(self.parse_call()?),
                Some(other) => {
                    return Err(QuipperError::Unexpected {
                        expected: "a statement or 'Outputs'".into(),
                        found: other.to_string(),
                    });
                }
                None => return Err(QuipperError::UnexpectedEof),
            }
        }
    }

    fn parse_qgate(&mut self) -> QuipperResult<Statement> {
        self.advance()?;
        self.expect(&Token::LBracket)?;
        let name = self.string()?;
        self.expect(&Token::RBracket)?;
        let inverse = if self.check(&Token::Star) {
            self.advance()?;
            true
        } else {
            false
        };
        let wires = self.parse_wire_tuple()?;
        let controls = self.parse_controls()?;
        Ok(Statement::Gate {
            name,
            inverse,
            wires,
            controls,
        })
    }

    fn parse_qrot(&mut self) -> QuipperResult<Statement> {
        self.advance()?;
        self.expect(&Token::LBracket)?;
        let name = self.string()?;
        self.expect(&Token::Comma)?;
        let negative = if self.check(&Token::Minus) {
            self.advance()?;
            true
        } else {
            false
        };
        let magnitude = match self.advance()? {
            Token::FloatLiteral(v) => v,
            Token::IntLiteral(v) => v as f64,
            other => {
                return Err(QuipperError::Unexpected {
                    expected: "a timestep".into(),
                    found: other.to_string(),
                });
            }
        };
        let timestep = if negative { -magnitude } else { magnitude };
        self.expect(&Token::RBracket)?;
        self.expect(&Token::LParen)?;
        let wire = self.integer()?;
        self.expect(&Token::RParen)?;
        Ok(Statement::Rot {
            name,
            timestep,
            wire,
        })
    }

    fn parse_qmeas(&mut self) -> QuipperResult<Statement> {
        self.advance()?;
        self.expect(&Token::LParen)?;
        let wire = self.integer()?;
        self.expect(&Token::RParen)?;
        Ok(Statement::Meas { wire })
    }

    fn parse_call(&mut self) -> QuipperResult<Statement> {
        self.advance()?;
        self.expect(&Token::LBracket)?;
        let name = self.string()?;
        self.expect(&Token::RBracket)?;
        let inputs = self.parse_wire_tuple()?;
        self.expect(&Token::Arrow)?;
        let outputs = self.parse_wire_tuple()?;
        let controls = self.parse_controls()?;
        Ok(Statement::Call {
            name,
            inputs,
            outputs,
            controls,
        })
    }

    fn parse_wire_tuple(&mut self) -> QuipperResult<Vec<u64>> {
        self.expect(&Token::LParen)?;
        if self.check(&Token::RParen) {
            self.advance()?;
            return Ok(Vec::new());
        }
        let mut wires = vec![self.integer()?];
        while self.check(&Token::Comma) {
            self.advance()?;
            wires.push(self.integer()?);
        }
        self.expect(&Token::RParen)?;
        Ok(wires)
    }

    // Optional `with controls=[+0, -3]` clause.
    fn parse_controls(&mut self) -> QuipperResult<Vec<Control>> {
        if !self.check(&Token::With) {
            return Ok(Vec::new());
        }
        self.advance()?;
        self.expect(&Token::Controls)?;
        self.expect(&Token::Eq)?;
        self.expect(&Token::LBracket)?;
        let mut controls = vec![self.parse_control()?];
        while self.check(&Token::Comma) {
            self.advance()?;
            controls.push(self.parse_control()?);
        }
        self.expect(&Token::RBracket)?;
        Ok(controls)
    }

    fn parse_control(&mut self) -> QuipperResult<Control> {
        let positive = match self.advance()? {
            Token::Plus => true,
            Token::Minus => false,
            other => {
                return Err(QuipperError::Unexpected {
                    expected: "'+' or '-'".into(),
                    found: other.to_string(),
                });
            }
        };
        let wire = self.integer()?;
        Ok(Control { wire, positive })
    }

    // `Subroutine: "name"` then Shape, Controllable, Inputs, body, Outputs.
    // A definition is told apart from a call by the colon after the keyword.
    fn parse_subroutine_def(&mut self) -> QuipperResult<SubroutineDef> {
        self.expect(&Token::Subroutine)?;
        if !self.check(&Token::Colon) {
            let found = self
                .peek_at(0)
                .map(|t| t.to_string())
                .unwrap_or_else(|| "end of input".into());
            return Err(QuipperError::Unexpected {
                expected: "':'".into(),
                found,
            });
        }
        self.advance()?;
        let name = self.string()?;

        self.expect(&Token::Shape)?;
        self.expect(&Token::Colon)?;
        let shape = self.string()?;

        self.expect(&Token::Controllable)?;
        self.expect(&Token::Colon)?;
        let controllable = match self.advance()? {
            Token::Identifier(word) if word == "yes" => true,
            Token::Identifier(word) if word == "no" => false,
            other => {
                return Err(QuipperError::Unexpected {
                    expected: "'yes' or 'no'".into(),
                    found: other.to_string(),
                });
            }
        };

        let inputs = self.parse_wire_list(&Token::Inputs)?;
        let body = self.parse_body()?;
        let outputs = self.parse_wire_list(&Token::Outputs)?;
        Ok(SubroutineDef {
            name,
            shape,
            controllable,
            inputs,
            body,
            outputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_main_body() {
        let source = "\
Inputs: 0:Qbit, 1:Qbit
QGate[\"H\"](0)
QGate[\"not\"](1) with controls=[+0]
QMeas(1)
Outputs: 0:Qbit, 1:Cbit
";
        let program = parse_program(source).unwrap();
        assert_eq!(program.inputs.len(), 2);
        assert_eq!(program.body.len(), 3);
        assert_eq!(program.outputs[1].kind, WireKind::Cbit);
        assert_eq!(
            program.body[1],
            Statement::Gate {
                name: "not".into(),
                inverse: false,
                wires: vec![1],
                controls: vec![Control {
                    wire: 0,
                    positive: true
                }],
            }
        );
    }

    #[test]
    fn test_parse_inverse_and_rotation() {
        let source = "\
Inputs: 0:Qbit
QGate[\"S\"]*(0)
QRot[\"exp(-i%Z)\",0.5](0)
Outputs: 0:Qbit
";
        let program = parse_program(source).unwrap();
        assert_eq!(
            program.body[0],
            Statement::Gate {
                name: "S".into(),
                inverse: true,
                wires: vec![0],
                controls: vec![],
            }
        );
        assert_eq!(
            program.body[1],
            Statement::Rot {
                name: "exp(-i%Z)".into(),
                timestep: 0.5,
                wire: 0,
            }
        );
    }

    #[test]
    fn test_parse_subroutine_def_and_call() {
        let source = "\
Inputs: 0:Qbit, 1:Qbit
Subroutine[\"bell\"] (0,1) -> (0,1)
Outputs: 0:Qbit, 1:Qbit

Subroutine: \"bell\"
Shape: \"([Q,Q],())\"
Controllable: no
Inputs: 0:Qbit, 1:Qbit
QGate[\"H\"](0)
QGate[\"not\"](1) with controls=[+0]
Outputs: 0:Qbit, 1:Qbit
";
        let program = parse_program(source).unwrap();
        assert_eq!(
            program.body[0],
            Statement::Call {
                name: "bell".into(),
                inputs: vec![0, 1],
                outputs: vec![0, 1],
                controls: vec![],
            }
        );
        assert_eq!(program.subroutines.len(), 1);
        let def = &program.subroutines[0];
        assert_eq!(def.name, "bell");
        assert!(!def.controllable);
        assert_eq!(def.body.len(), 2);
    }

    #[test]
    fn test_parse_empty_inputs() {
        let program = parse_program("Inputs: none\nOutputs: none\n").unwrap();
        assert!(program.inputs.is_empty());
        assert!(program.body.is_empty());
    }

    #[test]
    fn test_parse_negative_timestep() {
        let program = parse_program(
            "Inputs: 0:Qbit\nQRot[\"exp(-i%X)\",-0.25](0)\nOutputs: 0:Qbit\n",
        )
        .unwrap();
        assert_eq!(
            program.body[0],
            Statement::Rot {
                name: "exp(-i%X)".into(),
                timestep: -0.25,
                wire: 0,
            }
        );
    }

    #[test]
    fn test_parse_missing_outputs() {
        let err = parse_program("Inputs: 0:Qbit\nQGate[\"H\"](0)\n");
        assert!(matches!(err, Err(QuipperError::UnexpectedEof)));
    }
}
