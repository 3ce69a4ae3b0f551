//! Recursive-descent parser for the gate-list format.

use weft_ir::{Circuit, Condition, Expr, OpType, Unit, UnitKind};

use crate::error::{QasmError, QasmResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// Parse a gate-list source string into a circuit.
pub fn parse(source: &str) -> QasmResult<Circuit> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_program()
}

/// Build the operation type for a gate name and its parameter list.
fn build_optype(name: &str, mut params: Vec<Expr>) -> QasmResult<OpType> {
    let n_params = params.len();
    let check = |expected: usize| {
        if n_params == expected {
            Ok(())
        } else {
            Err(QasmError::WrongParameterCount {
                gate: name.to_string(),
                expected,
                got: n_params,
            })
        }
    };
    let mut next = || params.remove(0);

    let optype = match name {
        "H" => {
            check(0)?;
            OpType::H
        }
        "X" => {
            check(0)?;
            OpType::X
        }
        "Y" => {
            check(0)?;
            OpType::Y
        }
        "Z" => {
            check(0)?;
            OpType::Z
        }
        "S" => {
            check(0)?;
            OpType::S
        }
        "Sdg" => {
            check(0)?;
            OpType::Sdg
        }
        "T" => {
            check(0)?;
            OpType::T
        }
        "Tdg" => {
            check(0)?;
            OpType::Tdg
        }
        "Rx" => {
            check(1)?;
            OpType::Rx(next())
        }
        "Ry" => {
            check(1)?;
            OpType::Ry(next())
        }
        "Rz" => {
            check(1)?;
            OpType::Rz(next())
        }
        "CX" => {
            check(0)?;
            OpType::CX
        }
        "CY" => {
            check(0)?;
            OpType::CY
        }
        "CZ" => {
            check(0)?;
            OpType::CZ
        }
        "Swap" => {
            check(0)?;
            OpType::Swap
        }
        "CCX" => {
            check(0)?;
            OpType::CCX
        }
        "CRz" => {
            check(1)?;
            OpType::CRz(next())
        }
        "TK1" => {
            check(3)?;
            let a = next();
            let b = next();
            let c = next();
            OpType::TK1(a, b, c)
        }
        "Measure" => {
            check(0)?;
            OpType::Measure
        }
        "Reset" => {
            check(0)?;
            OpType::Reset
        }
        "Barrier" => {
            check(0)?;
            OpType::Barrier
        }
        _ => return Err(QasmError::UnknownGate(name.to_string())),
    };
    Ok(optype)
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

    fn advance(&mut self) -> QasmResult<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .map(|t| t.token.clone())
            .ok_or(QasmError::UnexpectedEof)?;
        self.pos += 1;
        Ok(token)
    }

    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    fn expect(&mut self, token: &Token) -> QasmResult<()> {
        match self.peek() {
            Some(t) if std::mem::discriminant(t) == std::mem::discriminant(token) => {
                self.pos += 1;
                Ok(())
            }
            Some(t) => Err(QasmError::Unexpected {
                expected: format!("'{token}'"),
                found: t.to_string(),
            }),
            None => Err(QasmError::UnexpectedEof),
        }
    }

    fn identifier(&mut self) -> QasmResult<String> {
        match self.advance()? {
            Token::Identifier(name) => Ok(name),
            other => Err(QasmError::Unexpected {
                expected: "an identifier".into(),
                found: other.to_string(),
            }),
        }
    }

    fn integer(&mut self) -> QasmResult<u64> {
        match self.advance()? {
            Token::IntLiteral(value) => Ok(value),
            other => Err(QasmError::Unexpected {
                expected: "an integer".into(),
                found: other.to_string(),
            }),
        }
    }

    fn parse_program(mut self) -> QasmResult<Circuit> {
        let mut circuit = Circuit::new();
        while let Some(token) = self.peek() {
            match token {
                Token::QReg => self.parse_register(&mut circuit, UnitKind::Qubit)?,
                Token::CReg => self.parse_register(&mut circuit, UnitKind::Bit)?,
                Token::If => self.parse_conditional(&mut circuit)?,
                _ => self.parse_gate_line(&mut circuit, None)?,
            }
        }
        Ok(circuit)
    }

    fn parse_register(&mut self, circuit: &mut Circuit, kind: UnitKind) -> QasmResult<()> {
        self.advance()?;
        let name = self.identifier()?;
        self.expect(&Token::LBracket)?;
        let size = self.integer()?;
        self.expect(&Token::RBracket)?;
        self.expect(&Token::Semicolon)?;
        circuit.add_register(name, size as u32, kind)?;
        Ok(())
    }

    // A wire reference `name[index]`; the register must be declared.
    fn parse_unit(&mut self, circuit: &Circuit) -> QasmResult<Unit> {
        let name = self.identifier()?;
        self.expect(&Token::LBracket)?;
        let index = self.integer()?;
        self.expect(&Token::RBracket)?;
        let register = circuit
            .register(&name)
            .ok_or_else(|| QasmError::UndeclaredRegister(name.clone()))?;
        Ok(Unit::with_index(name, vec![index as u32], register.kind))
    }

    fn parse_conditional(&mut self, circuit: &mut Circuit) -> QasmResult<()> {
        self.advance()?;
        self.expect(&Token::LParen)?;
        self.expect(&Token::LBracket)?;
        let mut bits = vec![self.parse_unit(circuit)?];
        while self.check(&Token::Comma) {
            self.advance()?;
            bits.push(self.parse_unit(circuit)?);
        }
        self.expect(&Token::RBracket)?;
        self.expect(&Token::EqEq)?;
        let value = self.integer()?;
        self.expect(&Token::RParen)?;
        self.expect(&Token::Then)?;
        self.parse_gate_line(circuit, Some((bits, value)))
    }

    fn parse_gate_line(
        &mut self,
        circuit: &mut Circuit,
        condition: Option<(Vec<Unit>, u64)>,
    ) -> QasmResult<()> {
        let name = self.identifier()?;
        let mut params = Vec::new();
        if self.check(&Token::LParen) {
            self.advance()?;
            if !self.check(&Token::RParen) {
                params.push(self.parse_expr()?);
                while self.check(&Token::Comma) {
                    self.advance()?;
                    params.push(self.parse_expr()?);
                }
            }
            self.expect(&Token::RParen)?;
        }
        let optype = build_optype(&name, params)?;

        let mut units = vec![self.parse_unit(circuit)?];
        while self.check(&Token::Comma) {
            self.advance()?;
            units.push(self.parse_unit(circuit)?);
        }
        self.expect(&Token::Semicolon)?;

        if let Some(sig) = optype.signature() {
            if units.len() != sig.arity() {
                return Err(QasmError::WrongUnitCount {
                    gate: name,
                    expected: sig.arity(),
                    got: units.len(),
                });
            }
        }
        let condition = condition
            .map(|(bits, value)| Condition::new(bits, value))
            .transpose()?;
        circuit.add_op_with_condition(optype, units, condition)?;
        Ok(())
    }

    // Angle expressions: sums of products over literals, `pi` and symbols.
    // `pi` is the unit, so a bare numeral already denotes a multiple of pi.
    fn parse_expr(&mut self) -> QasmResult<Expr> {
        let mut expr = self.parse_term()?;
        loop {
            if self.check(&Token::Plus) {
                self.advance()?;
                expr = expr + self.parse_term()?;
            } else if self.check(&Token::Minus) {
                self.advance()?;
                expr = expr - self.parse_term()?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_term(&mut self) -> QasmResult<Expr> {
        let mut expr = self.parse_factor()?;
        loop {
            if self.check(&Token::Star) {
                self.advance()?;
                expr = expr * self.parse_factor()?;
            } else if self.check(&Token::Slash) {
                self.advance()?;
                expr = expr / self.parse_factor()?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_factor(&mut self) -> QasmResult<Expr> {
        match self.advance()? {
            Token::Minus => Ok(-self.parse_factor()?),
            Token::LParen => {
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::FloatLiteral(v) => Ok(Expr::constant(v)),
            Token::IntLiteral(v) => Ok(Expr::constant(v as f64)),
            Token::Pi => Ok(Expr::constant(1.0)),
            Token::Identifier(name) => Ok(Expr::symbol(name)),
            other => Err(QasmError::Unexpected {
                expected: "an expression".into(),
                found: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::CircuitError;

    #[test]
    fn test_parse_simple_circuit() {
        let source = "\
qreg q[2];
creg c[1];
H q[0];
CX q[0], q[1];
Measure q[1], c[0];
";
        let circuit = parse(source).unwrap();
        assert_eq!(circuit.n_qubits(), 2);
        assert_eq!(circuit.n_bits(), 1);
        let names: Vec<String> = circuit.commands().map(|op| op.optype.name()).collect();
        assert_eq!(names, ["H", "CX", "Measure"]);
    }

    #[test]
    fn test_parse_parameters_in_units_of_pi() {
        let circuit = parse("qreg q[1];\nRz(0.25*pi) q[0];").unwrap();
        let op = circuit.commands().next().unwrap();
        assert_eq!(op.optype, OpType::Rz(Expr::constant(0.25)));

        // A bare numeral means the same thing.
        let bare = parse("qreg q[1];\nRz(0.25) q[0];").unwrap();
        assert_eq!(circuit, bare);

        let frac = parse("qreg q[1];\nRz(pi/4) q[0];").unwrap();
        assert_eq!(circuit, frac);
    }

    #[test]
    fn test_parse_symbolic_parameter() {
        let circuit = parse("qreg q[1];\nRz((a + 0.5)*pi) q[0];").unwrap();
        let op = circuit.commands().next().unwrap();
        assert_eq!(
            op.optype,
            OpType::Rz(Expr::symbol("a") + Expr::constant(0.5))
        );
    }

    #[test]
    fn test_parse_conditional() {
        let source = "\
qreg q[1];
creg m[2];
IF ([m[0], m[1]] == 3) THEN Rz(0.5*pi) q[0];
";
        let circuit = parse(source).unwrap();
        let op = circuit.commands().next().unwrap();
        let cond = op.condition.as_ref().unwrap();
        assert_eq!(cond.value, 3);
        assert_eq!(cond.bits, vec![Unit::bit("m", 0), Unit::bit("m", 1)]);
    }

    #[test]
    fn test_unknown_gate() {
        let err = parse("qreg q[1];\nQ q[0];");
        assert!(matches!(err, Err(QasmError::UnknownGate(name)) if name == "Q"));
    }

    #[test]
    fn test_wrong_parameter_count() {
        let err = parse("qreg q[1];\nRz q[0];");
        assert!(matches!(
            err,
            Err(QasmError::WrongParameterCount { expected: 1, got: 0, .. })
        ));
    }

    #[test]
    fn test_wrong_unit_count() {
        let err = parse("qreg q[2];\nCX q[0];");
        assert!(matches!(
            err,
            Err(QasmError::WrongUnitCount { expected: 2, got: 1, .. })
        ));
    }

    #[test]
    fn test_undeclared_register() {
        let err = parse("qreg q[1];\nH r[0];");
        assert!(matches!(err, Err(QasmError::UndeclaredRegister(name)) if name == "r"));
    }

    #[test]
    fn test_out_of_range_index() {
        let err = parse("qreg q[1];\nH q[5];");
        assert!(matches!(
            err,
            Err(QasmError::Circuit(CircuitError::UnitNotFound { .. }))
        ));
    }

    #[test]
    fn test_grammar_violation() {
        assert!(matches!(
            parse("qreg q[1];\nH q[0]"),
            Err(QasmError::UnexpectedEof)
        ));
        assert!(matches!(
            parse("qreg q;"),
            Err(QasmError::Unexpected { .. })
        ));
    }
}
