//! String front end for homotopy functions.
//!
//! Equations are parsed into an AST, compiled to a flat bytecode and executed
//! by a small stack VM that is generic over `Scalar`, so the same compiled
//! homotopy evaluates on `f64` and on `Dual`.

use crate::traits::{Homotopy, Scalar};
use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;

/// Unary functions callable from equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Exp,
    Tanh,
    Ln,
    Sqrt,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "exp" => Some(Self::Exp),
            "tanh" => Some(Self::Tanh),
            "ln" => Some(Self::Ln),
            "sqrt" => Some(Self::Sqrt),
            _ => None,
        }
    }

    fn apply<T: Scalar>(self, a: T) -> T {
        match self {
            Self::Sin => a.sin(),
            Self::Cos => a.cos(),
            Self::Exp => a.exp(),
            Self::Tanh => a.tanh(),
            Self::Ln => a.ln(),
            Self::Sqrt => a.sqrt(),
        }
    }
}

/// OpCodes for the stack VM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a literal.
    LoadConst(f64),
    /// Pushes a point component; indices 0..n are state variables, n is λ.
    LoadVar(usize),
    /// Pushes a named constant (by index).
    LoadNamed(usize),
    /// Pops (b, a), pushes a + b.
    Add,
    /// Pops (b, a), pushes a - b.
    Sub,
    /// Pops (b, a), pushes a * b.
    Mul,
    /// Pops (b, a), pushes a / b.
    Div,
    /// Pops (b, a), pushes a ^ b.
    Pow,
    /// Pops a, pushes -a.
    Neg,
    /// Pops a, pushes f(a).
    Call(Function),
}

/// A compiled expression.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
}

/// Stateless executor; the caller owns the stack buffer.
pub struct VM;

impl VM {
    pub fn execute<T: Scalar>(
        bytecode: &Bytecode,
        point: &[T],
        named: &[T],
        stack: &mut Vec<T>,
    ) -> T {
        stack.clear();

        for op in &bytecode.ops {
            match *op {
                OpCode::LoadConst(val) => stack.push(T::from_f64(val).unwrap_or_else(T::nan)),
                OpCode::LoadVar(idx) => stack.push(point[idx]),
                OpCode::LoadNamed(idx) => stack.push(named[idx]),
                OpCode::Add => binary(stack, |a, b| a + b),
                OpCode::Sub => binary(stack, |a, b| a - b),
                OpCode::Mul => binary(stack, |a, b| a * b),
                OpCode::Div => binary(stack, |a, b| a / b),
                OpCode::Pow => binary(stack, |a, b| a.powf(b)),
                OpCode::Neg => unary(stack, |a| -a),
                OpCode::Call(func) => unary(stack, |a| func.apply(a)),
            }
        }

        // Compiled code always leaves exactly one value.
        stack.pop().unwrap_or_else(T::nan)
    }
}

fn binary<T: Scalar>(stack: &mut Vec<T>, f: impl Fn(T, T) -> T) {
    let b = stack.pop().unwrap_or_else(T::nan);
    let a = stack.pop().unwrap_or_else(T::nan);
    stack.push(f(a, b));
}

fn unary<T: Scalar>(stack: &mut Vec<T>, f: impl Fn(T) -> T) {
    let a = stack.pop().unwrap_or_else(T::nan);
    stack.push(f(a));
}

// --- AST & Parser ---

#[derive(Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary(Box<Expr>, char, Box<Expr>),
    Neg(Box<Expr>),
    Call(String, Box<Expr>),
}

/// Resolves names and emits bytecode.
pub struct Compiler {
    pub var_map: HashMap<String, usize>,
    pub named_map: HashMap<String, usize>,
}

impl Compiler {
    /// `var_names` lists the state variables followed by the continuation parameter.
    pub fn new(var_names: &[String], named: &[String]) -> Self {
        let var_map = var_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let named_map = named
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { var_map, named_map }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode> {
        let mut ops = Vec::new();
        self.emit(expr, &mut ops)?;
        Ok(Bytecode { ops })
    }

    fn emit(&self, expr: &Expr, ops: &mut Vec<OpCode>) -> Result<()> {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Variable(name) => {
                if let Some(&idx) = self.var_map.get(name) {
                    ops.push(OpCode::LoadVar(idx));
                } else if let Some(&idx) = self.named_map.get(name) {
                    ops.push(OpCode::LoadNamed(idx));
                } else {
                    bail!("Unknown variable or constant: {}", name);
                }
            }
            Expr::Binary(left, op, right) => {
                self.emit(left, ops)?;
                self.emit(right, ops)?;
                ops.push(match op {
                    '+' => OpCode::Add,
                    '-' => OpCode::Sub,
                    '*' => OpCode::Mul,
                    '/' => OpCode::Div,
                    '^' => OpCode::Pow,
                    _ => bail!("Unknown binary operator: {}", op),
                });
            }
            Expr::Neg(operand) => {
                self.emit(operand, ops)?;
                ops.push(OpCode::Neg);
            }
            Expr::Call(name, arg) => {
                let func =
                    Function::from_name(name).ok_or_else(|| anyhow!("Unknown function: {}", name))?;
                self.emit(arg, ops)?;
                ops.push(OpCode::Call(func));
            }
        }
        Ok(())
    }
}

/// Parses a string expression into an AST.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expression()?;
    if let Some(token) = parser.peek() {
        bail!("Unexpected trailing token {:?} in \"{}\"", token, input);
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut literal = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    literal.push(d);
                    chars.next();
                } else if (d == 'e' || d == 'E') && !literal.contains(|ch: char| ch == 'e' || ch == 'E') {
                    literal.push(d);
                    chars.next();
                    if let Some(&sign) = chars.peek() {
                        if sign == '+' || sign == '-' {
                            literal.push(sign);
                            chars.next();
                        }
                    }
                } else {
                    break;
                }
            }
            let value = literal
                .parse()
                .map_err(|_| anyhow!("Invalid number literal: {}", literal))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            tokens.push(match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                _ => bail!("Unexpected character '{}'", c),
            });
            chars.next();
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_rparen(&mut self) -> Result<()> {
        match self.consume() {
            Some(Token::RParen) => Ok(()),
            _ => bail!("Expected ')'"),
        }
    }

    // expr := term (('+' | '-') term)*
    fn parse_expression(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => '+',
                Some(Token::Minus) => '-',
                _ => break,
            };
            self.consume();
            let right = self.parse_term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    // term := unary (('*' | '/') unary)*
    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => '*',
                Some(Token::Slash) => '/',
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    // unary := '-' unary | power
    fn parse_unary(&mut self) -> Result<Expr> {
        if let Some(Token::Minus) = self.peek() {
            self.consume();
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        self.parse_power()
    }

    // power := primary ('^' unary)?, right associative
    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(base), '^', Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume();
                    let arg = self.parse_expression()?;
                    self.expect_rparen()?;
                    Ok(Expr::Call(name, Box::new(arg)))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_expression()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            _ => bail!("Unexpected token"),
        }
    }
}

// --- EquationHomotopy ---

/// A homotopy H(x, λ) given as one equation string per state variable.
#[derive(Debug, Clone)]
pub struct EquationHomotopy {
    equations: Vec<Bytecode>,
    constant_map: HashMap<String, usize>,
    constants: Vec<f64>,
}

impl EquationHomotopy {
    /// Compiles `equations` (H₀ … Hₙ₋₁) over `var_names` and `param_name`.
    /// `constants` are fixed named values such as circuit gains.
    pub fn compile(
        equations: &[String],
        var_names: &[String],
        param_name: &str,
        constants: &[(String, f64)],
    ) -> Result<Self> {
        if equations.is_empty() {
            bail!("Homotopy has no equations.");
        }
        if equations.len() != var_names.len() {
            bail!(
                "Homotopy must be square: {} equations for {} variables.",
                equations.len(),
                var_names.len()
            );
        }

        let mut point_names = var_names.to_vec();
        point_names.push(param_name.to_string());
        let constant_names: Vec<String> = constants.iter().map(|(name, _)| name.clone()).collect();

        let mut seen = std::collections::HashSet::new();
        for name in point_names.iter().chain(constant_names.iter()) {
            if !seen.insert(name.as_str()) {
                bail!("Duplicate name: {}", name);
            }
        }

        let compiler = Compiler::new(&point_names, &constant_names);
        let mut bytecodes = Vec::with_capacity(equations.len());
        for (i, eq_str) in equations.iter().enumerate() {
            let expr = parse(eq_str).map_err(|e| anyhow!("Equation {}: {}", i, e))?;
            bytecodes.push(compiler.compile(&expr)?);
        }

        Ok(Self {
            equations: bytecodes,
            constant_map: compiler.named_map,
            constants: constants.iter().map(|(_, value)| *value).collect(),
        })
    }

    /// Updates a named constant in place.
    pub fn set_constant(&mut self, name: &str, value: f64) -> Result<()> {
        let idx = *self
            .constant_map
            .get(name)
            .ok_or_else(|| anyhow!("Unknown constant: {}", name))?;
        self.constants[idx] = value;
        Ok(())
    }
}

impl<T: Scalar> Homotopy<T> for EquationHomotopy {
    fn dimension(&self) -> usize {
        self.equations.len()
    }

    fn apply(&self, x: &[T], lambda: T, out: &mut [T]) {
        let mut point = Vec::with_capacity(x.len() + 1);
        point.extend_from_slice(x);
        point.push(lambda);
        let named: Vec<T> = self
            .constants
            .iter()
            .map(|&c| T::from_f64(c).unwrap_or_else(T::nan))
            .collect();

        let mut stack = Vec::with_capacity(16);
        for (slot, eq) in out.iter_mut().zip(&self.equations) {
            *slot = VM::execute(eq, &point, &named, &mut stack);
        }
    }
}
