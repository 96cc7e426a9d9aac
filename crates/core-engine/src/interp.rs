//! Code fragment backends.
//!
//! Each `CodeLang` maps to an [`Interpreter`]. The engine hands a backend the
//! fragment source plus an [`EvalContext`] describing the surrounding
//! snippet and gets text back. Output is inserted as is, so backends emit
//! absolute indentation themselves.

use core_config::IndentConfig;
use core_script::{Bindings, Locals, ScriptError, Snip, Value};
use core_text::{grapheme, indent};
use std::collections::BTreeMap;
use std::io::Write;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InterpError {
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("command exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    #[error("shebang line names no interpreter")]
    Shebang,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// What a fragment can see of its snippet and of the host.
pub struct CodeEnv<'a> {
    pub tabstops: BTreeMap<u32, String>,
    pub captures: &'a [Option<String>],
    pub options: &'a BTreeMap<String, String>,
    pub style: IndentConfig,
    /// Line index and byte offset where the fragment starts.
    pub line: usize,
    pub byte: usize,
    pub line_text: String,
}

impl CodeEnv<'_> {
    /// Indent, in columns, of the line the fragment sits on.
    pub fn line_indent(&self) -> usize {
        indent::width(indent::leading(&self.line_text), self.style.tabstop)
    }
}

impl Bindings for CodeEnv<'_> {
    fn tabstop(&self, id: u32) -> Option<String> {
        self.tabstops.get(&id).cloned()
    }

    fn capture(&self, group: usize) -> Option<String> {
        self.captures.get(group).cloned().flatten()
    }

    fn option(&self, name: &str) -> Option<String> {
        self.options.get(name).cloned()
    }

    fn call(&self, name: &str, args: &[Value]) -> Option<Value> {
        let arg = |i: usize| args.get(i).map(ToString::to_string).unwrap_or_default();
        let n = |v: usize| Value::Int(i64::try_from(v).unwrap_or(i64::MAX));
        match name {
            "indent" => Some(n(self.line_indent())),
            "line" => Some(n(self.line + 1)),
            "col" => Some(n(self.byte + 1)),
            "virtcol" => Some(n(grapheme::visual_col(&self.line_text, self.byte) + 1)),
            "exists" => Some(Value::Int(i64::from(self.options.contains_key(&arg(0))))),
            "opt" => Some(Value::Str(self.options.get(&arg(0)).cloned().unwrap_or_else(|| arg(1)))),
            _ => None,
        }
    }
}

pub struct EvalContext<'a> {
    pub env: CodeEnv<'a>,
    /// Store shared by every script of the instance.
    pub locals: &'a mut Locals,
}

pub trait Interpreter {
    fn evaluate(&self, source: &str, ctx: &mut EvalContext<'_>) -> Result<String, InterpError>;
}

/// Untagged fragments: `program -c source`, or the named interpreter of a `#!` script.
pub struct ShellInterpreter {
    pub program: String,
}

impl ShellInterpreter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, source: &str) -> Result<(String, std::process::Output), InterpError> {
        let Some(shebang) = source.strip_prefix("#!") else {
            let output = Command::new(&self.program)
                .arg("-c")
                .arg(source)
                .output()
                .map_err(|source| InterpError::Spawn {
                    program: self.program.clone(),
                    source,
                })?;
            return Ok((self.program.clone(), output));
        };
        let first = shebang.lines().next().unwrap_or_default();
        let mut words = first.split_whitespace();
        let program = words.next().ok_or(InterpError::Shebang)?.to_string();
        let mut script = tempfile::NamedTempFile::new()?;
        script.write_all(source.as_bytes())?;
        script.flush()?;
        let output = Command::new(&program)
            .args(words)
            .arg(script.path())
            .output()
            .map_err(|source| InterpError::Spawn {
                program: program.clone(),
                source,
            })?;
        Ok((program, output))
    }
}

impl Interpreter for ShellInterpreter {
    fn evaluate(&self, source: &str, ctx: &mut EvalContext<'_>) -> Result<String, InterpError> {
        let (program, output) = self.command(source)?;
        if !output.status.success() {
            return Err(InterpError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim_end_matches(['\n', '\r']);
        debug!(target: "interp.shell", program = %program, bytes = stdout.len(), "shell_finished");
        let mut lines = stdout.split('\n');
        let mut out = lines.next().unwrap_or_default().to_string();
        let prefix = indent::render(
            ctx.env.line_indent(),
            ctx.env.style.tabstop,
            ctx.env.style.expandtab,
        );
        for line in lines {
            out.push('\n');
            out.push_str(&prefix);
            out.push_str(line);
        }
        Ok(out)
    }
}

/// `!p` fragments.
#[derive(Default)]
pub struct ScriptInterpreter;

impl Interpreter for ScriptInterpreter {
    fn evaluate(&self, source: &str, ctx: &mut EvalContext<'_>) -> Result<String, InterpError> {
        let program = core_script::parse_program(source)?;
        let snip = Snip::new(ctx.env.line_indent(), ctx.env.style);
        Ok(core_script::run(&program, &ctx.env, snip, ctx.locals)?)
    }
}

/// `!v` fragments: a single expression over the host functions.
#[derive(Default)]
pub struct EditorExprInterpreter;

impl Interpreter for EditorExprInterpreter {
    fn evaluate(&self, source: &str, ctx: &mut EvalContext<'_>) -> Result<String, InterpError> {
        let expr = core_script::parse_expression(source)?;
        Ok(core_script::evaluate(&expr, &ctx.env)?.to_string())
    }
}
