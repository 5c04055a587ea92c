// src/expression.rs
use crate::context::Context;
use crate::errors::{EvalError, Result};
use crate::parser::{ParseError, Parser};
use serde_json::{Map, Number, Value};

/// Nesting limit for a single unit; deeper input is rejected while parsing.
const MAX_DEPTH: usize = 128;

const RESERVED: [&str; 3] = ["true", "false", "null"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone)]
pub enum ENode {
    Literal(Value),
    Ident(String),
    Call { name: String, args: Vec<ENode> },
    Object(Vec<(String, ENode)>),
    Array(Vec<ENode>),
    Member { target: Box<ENode>, key: String },
    Index { target: Box<ENode>, index: Box<ENode> },
    Neg(Box<ENode>),
    Binary { op: BinOp, lhs: Box<ENode>, rhs: Box<ENode> },
}

/// A parsed unit: global assignments run in order, then the exported expression.
#[derive(Debug, Clone)]
pub struct Program {
    pub assignments: Vec<(String, ENode)>,
    pub export: ENode,
}

pub type EParseErr = ParseError;

pub fn parse_program(input: &str) -> std::result::Result<Program, EParseErr> {
    let mut p = EParser::new(input);
    let mut assignments = Vec::new();
    loop {
        p.skip_ws();
        match p.try_assignment_target()? {
            Some(name) => {
                let value = p.parse_expr()?;
                p.skip_ws();
                p.parser.expect(';')?;
                assignments.push((name, value));
            }
            None => break,
        }
    }
    let export = p.parse_expr()?;
    p.skip_ws();
    p.parser.consume_char(';');
    p.skip_ws();
    if !p.eof() {
        return Err(p.parser.error("trailing input"));
    }
    Ok(Program { assignments, export })
}

struct EParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> EParser<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            parser: Parser::new(s),
            depth: 0,
        }
    }

    /// Consumes `name =` when present; otherwise leaves the cursor untouched.
    fn try_assignment_target(&mut self) -> std::result::Result<Option<String>, EParseErr> {
        let start = self.parser.offset();
        let Ok(name) = self.parser.parse_identifier() else {
            self.parser.rewind(start);
            return Ok(None);
        };
        self.skip_ws();
        if self.parser.peek_char() == Some('=') && !self.parser.peek_str("==") {
            if RESERVED.contains(&name.as_str()) {
                self.parser.rewind(start);
                return Err(self.parser.error(format!("cannot assign to `{name}`")));
            }
            self.parser.advance(1);
            return Ok(Some(name));
        }
        self.parser.rewind(start);
        Ok(None)
    }

    /// Counts one more level of tree nesting against [`MAX_DEPTH`].
    fn descend(&mut self) -> std::result::Result<(), EParseErr> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.parser.error("expression nested too deeply"));
        }
        Ok(())
    }

    fn parse_expr(&mut self) -> std::result::Result<ENode, EParseErr> {
        self.descend()?;
        let node = self.parse_additive();
        self.depth -= 1;
        node
    }

    // Operator and postfix chains are built in loops, but every link nests the
    // tree one level deeper, so each link is counted until the chain ends.
    fn parse_additive(&mut self) -> std::result::Result<ENode, EParseErr> {
        let mut left = self.parse_term()?;
        let mut links = 0;
        loop {
            self.skip_ws();
            let op = if self.parser.consume_char('+') {
                BinOp::Add
            } else if self.parser.consume_char('-') {
                BinOp::Sub
            } else {
                break;
            };
            self.descend()?;
            links += 1;
            let right = self.parse_term()?;
            left = ENode::Binary { op, lhs: Box::new(left), rhs: Box::new(right) };
        }
        self.depth -= links;
        Ok(left)
    }

    fn parse_term(&mut self) -> std::result::Result<ENode, EParseErr> {
        let mut left = self.parse_unary()?;
        let mut links = 0;
        loop {
            self.skip_ws();
            let op = if self.parser.consume_char('*') {
                BinOp::Mul
            } else if self.parser.peek_char() == Some('/')
                && !self.parser.peek_str("//")
                && !self.parser.peek_str("/*")
            {
                self.parser.advance(1);
                BinOp::Div
            } else {
                break;
            };
            self.descend()?;
            links += 1;
            let right = self.parse_unary()?;
            left = ENode::Binary { op, lhs: Box::new(left), rhs: Box::new(right) };
        }
        self.depth -= links;
        Ok(left)
    }

    fn parse_unary(&mut self) -> std::result::Result<ENode, EParseErr> {
        self.skip_ws();
        if self.parser.consume_char('-') {
            self.descend()?;
            let inner = self.parse_unary();
            self.depth -= 1;
            return Ok(ENode::Neg(Box::new(inner?)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> std::result::Result<ENode, EParseErr> {
        let mut node = self.parse_primary()?;
        let mut links = 0;
        loop {
            self.skip_ws();
            if self.parser.peek_char() == Some('.') || self.parser.peek_char() == Some('[') {
                self.descend()?;
                links += 1;
            }
            if self.parser.consume_char('.') {
                self.skip_ws();
                let key = self.parser.parse_identifier()?;
                node = ENode::Member { target: Box::new(node), key };
            } else if self.parser.consume_char('[') {
                let index = self.parse_expr()?;
                self.skip_ws();
                self.parser.expect(']')?;
                node = ENode::Index { target: Box::new(node), index: Box::new(index) };
            } else {
                break;
            }
        }
        self.depth -= links;
        Ok(node)
    }

    fn parse_primary(&mut self) -> std::result::Result<ENode, EParseErr> {
        self.skip_ws();
        match self.parser.peek_char() {
            None => Err(self.parser.error("expression expected")),
            Some('"' | '\'' | '`') => Ok(ENode::Literal(Value::String(self.parser.parse_quoted_string()?))),
            Some(c) if c.is_ascii_digit() => Ok(ENode::Literal(self.parser.parse_number_literal()?)),
            Some('(') => {
                self.parser.advance(1);
                let inner = self.parse_expr()?;
                self.skip_ws();
                self.parser.expect(')')?;
                Ok(inner)
            }
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some(_) => {
                for (word, value) in [("true", Value::Bool(true)), ("false", Value::Bool(false)), ("null", Value::Null)] {
                    if self.parser.peek_keyword(word) {
                        self.parser.advance(word.len());
                        return Ok(ENode::Literal(value));
                    }
                }
                let name = self.parser.parse_identifier()?;
                self.skip_ws();
                if self.parser.consume_char('(') {
                    let args = self.parse_list(')')?;
                    return Ok(ENode::Call { name, args });
                }
                Ok(ENode::Ident(name))
            }
        }
    }

    fn parse_object(&mut self) -> std::result::Result<ENode, EParseErr> {
        self.parser.expect('{')?;
        let mut fields = Vec::new();
        loop {
            self.skip_ws();
            if self.parser.consume_char('}') {
                break;
            }
            let key = match self.parser.peek_char() {
                Some('"' | '\'' | '`') => self.parser.parse_quoted_string()?,
                _ => self.parser.parse_identifier()?,
            };
            self.skip_ws();
            self.parser.expect(':')?;
            let value = self.parse_expr()?;
            fields.push((key, value));
            self.skip_ws();
            if self.parser.consume_char(',') {
                continue;
            }
            self.parser.expect('}')?;
            break;
        }
        Ok(ENode::Object(fields))
    }

    fn parse_array(&mut self) -> std::result::Result<ENode, EParseErr> {
        self.parser.expect('[')?;
        Ok(ENode::Array(self.parse_list(']')?))
    }

    /// Comma separated expressions up to `close`, trailing comma allowed.
    fn parse_list(&mut self, close: char) -> std::result::Result<Vec<ENode>, EParseErr> {
        let mut out = Vec::new();
        loop {
            self.skip_ws();
            if self.parser.consume_char(close) {
                break;
            }
            out.push(self.parse_expr()?);
            self.skip_ws();
            if self.parser.consume_char(',') {
                continue;
            }
            self.parser.expect(close)?;
            break;
        }
        Ok(out)
    }

    fn skip_ws(&mut self) {
        self.parser.skip_ws();
    }

    fn eof(&self) -> bool {
        self.parser.eof()
    }
}

/// Runs the assignments against `ctx`, then evaluates the export.
pub fn eval_program(program: &Program, ctx: &Context) -> Result<Value> {
    for (name, node) in &program.assignments {
        let value = eval_ast(node, ctx)?;
        ctx.set(name.clone(), value);
    }
    eval_ast(&program.export, ctx)
}

/// Evaluate AST node → Value
pub fn eval_ast(node: &ENode, ctx: &Context) -> Result<Value> {
    match node {
        ENode::Literal(v) => Ok(v.clone()),
        ENode::Ident(name) => ctx
            .get(name)
            .ok_or_else(|| EvalError::Runtime(format!("`{name}` is not defined"))),
        ENode::Call { name, args } => {
            let args = args
                .iter()
                .map(|a| eval_ast(a, ctx))
                .collect::<Result<Vec<_>>>()?;
            ctx.registry().call(name, &args)
        }
        ENode::Object(fields) => {
            let mut map = Map::new();
            for (key, value) in fields {
                map.insert(key.clone(), eval_ast(value, ctx)?);
            }
            Ok(Value::Object(map))
        }
        ENode::Array(items) => items
            .iter()
            .map(|i| eval_ast(i, ctx))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        ENode::Member { target, key } => match eval_ast(target, ctx)? {
            Value::Object(map) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
            other => Err(EvalError::Runtime(format!(
                "cannot read `{key}` of {}",
                type_name(&other)
            ))),
        },
        ENode::Index { target, index } => {
            let target = eval_ast(target, ctx)?;
            let index = eval_ast(index, ctx)?;
            match (&target, &index) {
                (Value::Array(arr), Value::Number(n)) => Ok(n
                    .as_u64()
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| arr.get(i))
                    .cloned()
                    .unwrap_or(Value::Null)),
                (Value::Object(map), Value::String(k)) => Ok(map.get(k).cloned().unwrap_or(Value::Null)),
                _ => Err(EvalError::Runtime(format!(
                    "cannot index {} with {}",
                    type_name(&target),
                    type_name(&index)
                ))),
            }
        }
        ENode::Neg(inner) => match eval_ast(inner, ctx)? {
            Value::Number(n) => Ok(match n.as_i64().and_then(i64::checked_neg) {
                Some(i) => Value::from(i),
                None => float(-as_f64(&n)),
            }),
            other => Err(EvalError::Runtime(format!("cannot negate {}", type_name(&other)))),
        },
        ENode::Binary { op, lhs, rhs } => {
            let lhs = eval_ast(lhs, ctx)?;
            let rhs = eval_ast(rhs, ctx)?;
            binary(*op, &lhs, &rhs)
        }
    }
}

fn binary(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    if op == BinOp::Add && (lhs.is_string() || rhs.is_string()) {
        return Ok(Value::String(format!("{}{}", display(lhs), display(rhs))));
    }
    let (Value::Number(a), Value::Number(b)) = (lhs, rhs) else {
        return Err(EvalError::Runtime(format!(
            "unsupported operands {} {} {}",
            type_name(lhs),
            symbol(op),
            type_name(rhs)
        )));
    };
    if op == BinOp::Div && as_f64(b) == 0.0 {
        return Err(EvalError::Runtime("division by zero".into()));
    }
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        let exact = match op {
            BinOp::Add => x.checked_add(y),
            BinOp::Sub => x.checked_sub(y),
            BinOp::Mul => x.checked_mul(y),
            BinOp::Div => x.checked_rem(y).filter(|r| *r == 0).and_then(|_| x.checked_div(y)),
        };
        if let Some(v) = exact {
            return Ok(Value::from(v));
        }
    }
    let (x, y) = (as_f64(a), as_f64(b));
    Ok(float(match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => x / y,
    }))
}

fn as_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or(f64::NAN)
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

fn display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn symbol(op: BinOp) -> char {
    match op {
        BinOp::Add => '+',
        BinOp::Sub => '-',
        BinOp::Mul => '*',
        BinOp::Div => '/',
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
