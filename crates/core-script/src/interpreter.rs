//! Tree-walking evaluator.
//!
//! A script sees its surroundings through three names: `snip` (the result
//! object), `t` (tabstop texts, read-only) and `m` (regex trigger captures).
//! Everything else it needs from the host goes through [`Bindings`].

use crate::ast::{BinaryOp, Expr, Program, Stmt};
use crate::error::{Result, ScriptError};
use crate::value::{Locals, Value};
use core_config::IndentConfig;
use core_text::indent;
use std::collections::HashMap;
use tracing::trace;

/// Deepest expression the evaluator will walk.
const MAX_EVAL_DEPTH: usize = 128;
/// Widest indent, in columns, `shift` may produce.
const MAX_INDENT_COLUMNS: usize = 4096;
/// Longest string a repetition may build, in bytes.
const MAX_REPEAT_BYTES: usize = 1 << 20;

/// Host-side data a script may read.
pub trait Bindings {
    fn tabstop(&self, id: u32) -> Option<String>;

    fn capture(&self, _group: usize) -> Option<String> {
        None
    }

    fn option(&self, _name: &str) -> Option<String> {
        None
    }

    /// Host functions such as `indent(".")`. `None` means "not provided".
    fn call(&self, _name: &str, _args: &[Value]) -> Option<Value> {
        None
    }
}

/// The `snip` object: result text plus the indent state used by `mkline`.
#[derive(Debug, Clone)]
pub struct Snip {
    rv: String,
    rv_touched: bool,
    indent: usize,
    base: usize,
    style: IndentConfig,
}

impl Snip {
    /// `base` is the indent (in columns) of the line the fragment sits on.
    pub fn new(base: usize, style: IndentConfig) -> Self {
        Self {
            rv: String::new(),
            rv_touched: false,
            indent: base,
            base,
            style,
        }
    }

    pub fn rv(&self) -> &str {
        &self.rv
    }

    pub fn mkline(&self, line: &str) -> String {
        let mut out = indent::render(self.indent, self.style.tabstop, self.style.expandtab);
        out.push_str(line);
        out
    }

    pub fn shift(&mut self, times: i64) -> Result<()> {
        self.move_indent(times, true)
    }

    pub fn unshift(&mut self, times: i64) -> Result<()> {
        self.move_indent(times, false)
    }

    fn move_indent(&mut self, times: i64, deeper: bool) -> Result<()> {
        let columns = usize::try_from(times.unsigned_abs())
            .ok()
            .and_then(|n| n.checked_mul(self.style.shift_width()))
            .ok_or_else(|| ScriptError::Overflow(format!("shift by {times}")))?;
        if deeper == (times >= 0) {
            self.indent = self
                .indent
                .checked_add(columns)
                .filter(|c| *c <= MAX_INDENT_COLUMNS)
                .ok_or(ScriptError::Limit {
                    what: "indent",
                    limit: MAX_INDENT_COLUMNS,
                })?;
        } else {
            self.indent = self.indent.saturating_sub(columns);
        }
        Ok(())
    }

    pub fn reset_indent(&mut self) {
        self.indent = self.base;
    }

    fn set_rv(&mut self, text: String) {
        self.rv = text;
        self.rv_touched = true;
    }

    fn append_line(&mut self, line: &str) {
        let line = self.mkline(line);
        self.rv.push('\n');
        self.rv.push_str(&line);
        self.rv_touched = true;
    }
}

struct Interpreter<'a> {
    bindings: &'a dyn Bindings,
    snip: Snip,
    locals: &'a mut Locals,
    vars: HashMap<String, Value>,
    depth: usize,
}

/// Run a program and return the text it produced: `snip.rv` when the script
/// touched it, else the legacy `res` variable, else the empty string.
pub fn run(
    program: &Program,
    bindings: &dyn Bindings,
    snip: Snip,
    locals: &mut Locals,
) -> Result<String> {
    let mut interp = Interpreter {
        bindings,
        snip,
        locals,
        vars: HashMap::new(),
        depth: 0,
    };
    interp.exec_block(&program.body)?;
    trace!(
        target: "interp.script",
        statements = program.body.len(),
        rv_touched = interp.snip.rv_touched,
        "script_finished"
    );
    if interp.snip.rv_touched {
        return Ok(interp.snip.rv);
    }
    Ok(interp
        .vars
        .get("res")
        .map(ToString::to_string)
        .unwrap_or(interp.snip.rv))
}

/// Evaluate a standalone expression (no `snip` state survives).
pub fn evaluate(expr: &Expr, bindings: &dyn Bindings) -> Result<Value> {
    let mut scratch = Locals::new();
    let mut interp = Interpreter {
        bindings,
        snip: Snip::new(0, IndentConfig::default()),
        locals: &mut scratch,
        vars: HashMap::new(),
        depth: 0,
    };
    interp.eval(expr)
}

fn type_error(op: &str, a: &Value, b: &Value) -> ScriptError {
    ScriptError::Type(format!(
        "unsupported operands for {op}: {} and {}",
        a.type_name(),
        b.type_name()
    ))
}

fn int_arg(args: &[Value], idx: usize, default: i64) -> Result<i64> {
    match args.get(idx) {
        None => Ok(default),
        Some(Value::Int(n)) => Ok(*n),
        Some(other) => Err(ScriptError::Type(format!(
            "expected int argument, got {}",
            other.type_name()
        ))),
    }
}

fn str_arg(args: &[Value], idx: usize) -> String {
    args.get(idx).map(ToString::to_string).unwrap_or_default()
}

impl Interpreter<'_> {
    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.exec(stmt)?;
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Expr(e) => {
                self.eval(e)?;
            }
            Stmt::Assign { target, value } => {
                let v = self.eval(value)?;
                self.assign(target, v)?;
            }
            Stmt::AddAssign { target, value } => {
                let v = self.eval(value)?;
                match self.eval(target)? {
                    Value::Snip => self.snip.append_line(&v.to_string()),
                    current => {
                        let sum = self.binary(BinaryOp::Add, current, v)?;
                        self.assign(target, sum)?;
                    }
                }
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.truthy() {
                    self.exec_block(then)?;
                } else {
                    self.exec_block(otherwise)?;
                }
            }
        }
        Ok(())
    }

    fn assign(&mut self, target: &Expr, value: Value) -> Result<()> {
        match target {
            Expr::Ident(name) => {
                self.vars.insert(name.clone(), value);
                Ok(())
            }
            Expr::Field(obj, field) => match (self.eval(obj)?, field.as_str()) {
                (Value::Snip, "rv") => {
                    self.snip.set_rv(value.to_string());
                    Ok(())
                }
                (other, field) => Err(ScriptError::InvalidTarget(format!(
                    "{}.{field}",
                    other.type_name()
                ))),
            },
            Expr::Index(obj, key) => match self.eval(obj)? {
                Value::Locals => {
                    let key = self.eval(key)?.to_string();
                    self.locals.insert(key, value);
                    Ok(())
                }
                other => Err(ScriptError::InvalidTarget(format!(
                    "an element of {}",
                    other.type_name()
                ))),
            },
            other => Err(ScriptError::InvalidTarget(format!("{other:?}"))),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value> {
        if self.depth >= MAX_EVAL_DEPTH {
            return Err(ScriptError::Limit {
                what: "expression depth",
                limit: MAX_EVAL_DEPTH,
            });
        }
        self.depth += 1;
        let value = self.eval_inner(expr);
        self.depth -= 1;
        value
    }

    fn eval_inner(&mut self, expr: &Expr) -> Result<Value> {
        Ok(match expr {
            Expr::Int(n) => Value::Int(*n),
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Nil => Value::Nil,
            Expr::Ident(name) => match self.vars.get(name) {
                Some(v) => v.clone(),
                None => match name.as_str() {
                    "snip" => Value::Snip,
                    "t" => Value::Tabstops,
                    "m" => Value::Matches,
                    _ => return Err(ScriptError::UnknownVariable(name.clone())),
                },
            },
            Expr::Field(obj, field) => match (self.eval(obj)?, field.as_str()) {
                (Value::Snip, "rv") => Value::Str(self.snip.rv.clone()),
                (Value::Snip, "locals") => Value::Locals,
                (other, field) => {
                    return Err(ScriptError::Type(format!(
                        "{} has no field '{field}'",
                        other.type_name()
                    )));
                }
            },
            Expr::Index(obj, key) => {
                let obj = self.eval(obj)?;
                let key = self.eval(key)?;
                self.index(obj, key)?
            }
            Expr::Call(callee, args) => self.call(callee, args)?,
            Expr::Neg(inner) => match self.eval(inner)? {
                Value::Int(n) => Value::Int(
                    n.checked_neg()
                        .ok_or_else(|| ScriptError::Overflow(format!("-({n})")))?,
                ),
                other => {
                    return Err(ScriptError::Type(format!("cannot negate {}", other.type_name())));
                }
            },
            Expr::Not(inner) => Value::Bool(!self.eval(inner)?.truthy()),
            Expr::And(a, b) => {
                let left = self.eval(a)?;
                if !left.truthy() { left } else { self.eval(b)? }
            }
            Expr::Or(a, b) => {
                let left = self.eval(a)?;
                if left.truthy() { left } else { self.eval(b)? }
            }
            Expr::Binary(op, a, b) => {
                let left = self.eval(a)?;
                let right = self.eval(b)?;
                self.binary(*op, left, right)?
            }
        })
    }

    fn index(&mut self, obj: Value, key: Value) -> Result<Value> {
        Ok(match (obj, key) {
            (Value::Tabstops, Value::Int(n)) => {
                let id = u32::try_from(n).map_err(|_| ScriptError::Type(format!("bad tabstop id {n}")))?;
                Value::Str(self.bindings.tabstop(id).unwrap_or_default())
            }
            (Value::Matches, Value::Int(n)) => {
                let group = usize::try_from(n).map_err(|_| ScriptError::Type(format!("bad group {n}")))?;
                Value::Str(self.bindings.capture(group).unwrap_or_default())
            }
            (Value::Locals, key) => self.locals.get(&key.to_string()).cloned().unwrap_or(Value::Nil),
            (Value::Str(s), Value::Int(n)) => {
                let count = s.chars().count() as i64;
                let idx = if n < 0 { count + n } else { n };
                usize::try_from(idx)
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::Str(c.to_string()))
                    .unwrap_or(Value::Str(String::new()))
            }
            (obj, key) => return Err(type_error("[]", &obj, &key)),
        })
    }

    fn call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value> {
        let mut values = Vec::with_capacity(args.len());
        for a in args {
            values.push(self.eval(a)?);
        }
        match callee {
            Expr::Ident(name) => self.call_function(name, &values),
            Expr::Field(obj, method) => {
                let receiver = self.eval(obj)?;
                self.call_method(receiver, method, &values)
            }
            other => Err(ScriptError::Type(format!("{other:?} is not callable"))),
        }
    }

    fn call_function(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let first = args.first().cloned().unwrap_or(Value::Nil);
        Ok(match name {
            "len" => match &first {
                Value::Str(s) => Value::Int(s.chars().count() as i64),
                other => {
                    return Err(ScriptError::Type(format!("len() of {}", other.type_name())));
                }
            },
            "upper" => Value::Str(first.to_string().to_uppercase()),
            "lower" => Value::Str(first.to_string().to_lowercase()),
            "trim" => Value::Str(first.to_string().trim().to_string()),
            "str" => Value::Str(first.to_string()),
            "int" => match &first {
                Value::Int(n) => Value::Int(*n),
                Value::Bool(b) => Value::Int(i64::from(*b)),
                other => Value::Int(other.to_string().trim().parse().map_err(|_| {
                    ScriptError::Type(format!("cannot convert '{other}' to int"))
                })?),
            },
            _ => {
                return self
                    .bindings
                    .call(name, args)
                    .ok_or_else(|| ScriptError::UnknownFunction(name.to_string()));
            }
        })
    }

    fn call_method(&mut self, receiver: Value, method: &str, args: &[Value]) -> Result<Value> {
        match (receiver, method) {
            (Value::Snip, "mkline") => Ok(Value::Str(self.snip.mkline(&str_arg(args, 0)))),
            (Value::Snip, "opt") => {
                let found = self.bindings.option(&str_arg(args, 0));
                Ok(Value::Str(found.unwrap_or_else(|| str_arg(args, 1))))
            }
            (Value::Snip, "shift") => {
                self.snip.shift(int_arg(args, 0, 1)?)?;
                Ok(Value::Nil)
            }
            (Value::Snip, "unshift") => {
                self.snip.unshift(int_arg(args, 0, 1)?)?;
                Ok(Value::Nil)
            }
            (Value::Snip, "reset_indent") => {
                self.snip.reset_indent();
                Ok(Value::Nil)
            }
            (Value::Str(s), "upper") => Ok(Value::Str(s.to_uppercase())),
            (Value::Str(s), "lower") => Ok(Value::Str(s.to_lowercase())),
            (Value::Str(s), "strip") => Ok(Value::Str(s.trim().to_string())),
            (Value::Str(s), "startswith") => Ok(Value::Bool(s.starts_with(&str_arg(args, 0)))),
            (Value::Str(s), "endswith") => Ok(Value::Bool(s.ends_with(&str_arg(args, 0)))),
            (other, method) => Err(ScriptError::UnknownFunction(format!(
                "{}.{method}",
                other.type_name()
            ))),
        }
    }

    fn binary(&mut self, op: BinaryOp, a: Value, b: Value) -> Result<Value> {
        use BinaryOp::*;
        Ok(match (op, a, b) {
            (Shr, Value::Snip, Value::Int(n)) => {
                self.snip.shift(n)?;
                Value::Snip
            }
            (Shl, Value::Snip, Value::Int(n)) => {
                self.snip.unshift(n)?;
                Value::Snip
            }
            (Eq, a, b) => Value::Bool(a == b),
            (Ne, a, b) => Value::Bool(a != b),
            (Add, Value::Int(x), Value::Int(y)) => Value::Int(checked(x.checked_add(y), "+", x, y)?),
            (Add, a @ Value::Str(_), b) | (Add, a, b @ Value::Str(_)) => {
                Value::Str(format!("{a}{b}"))
            }
            (Sub, Value::Int(x), Value::Int(y)) => Value::Int(checked(x.checked_sub(y), "-", x, y)?),
            (Mul, Value::Int(x), Value::Int(y)) => Value::Int(checked(x.checked_mul(y), "*", x, y)?),
            (Mul, Value::Str(s), Value::Int(n)) | (Mul, Value::Int(n), Value::Str(s)) => {
                let times = usize::try_from(n).unwrap_or(0);
                match s.len().checked_mul(times) {
                    Some(len) if len <= MAX_REPEAT_BYTES => Value::Str(s.repeat(times)),
                    _ => {
                        return Err(ScriptError::Limit {
                            what: "string length",
                            limit: MAX_REPEAT_BYTES,
                        });
                    }
                }
            }
            (Div | Rem, Value::Int(_), Value::Int(0)) => return Err(ScriptError::DivisionByZero),
            (Div, Value::Int(x), Value::Int(y)) => Value::Int(checked(x.checked_div(y), "/", x, y)?),
            (Rem, Value::Int(x), Value::Int(y)) => Value::Int(checked(x.checked_rem(y), "%", x, y)?),
            (Shr, Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_shr(y as u32)),
            (Shl, Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_shl(y as u32)),
            (Lt | Le | Gt | Ge, Value::Int(x), Value::Int(y)) => Value::Bool(compare(op, x.cmp(&y))),
            (Lt | Le | Gt | Ge, Value::Str(x), Value::Str(y)) => Value::Bool(compare(op, x.cmp(&y))),
            (op, a, b) => return Err(type_error(&format!("{op:?}"), &a, &b)),
        })
    }
}

fn checked(result: Option<i64>, op: &str, x: i64, y: i64) -> Result<i64> {
    result.ok_or_else(|| ScriptError::Overflow(format!("{x} {op} {y}")))
}

fn compare(op: BinaryOp, ord: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        BinaryOp::Lt => ord == Less,
        BinaryOp::Le => ord != Greater,
        BinaryOp::Gt => ord == Greater,
        _ => ord != Less,
    }
}
