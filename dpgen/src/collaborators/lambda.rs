//! Reference callback compiler.
//!
//! Performs the structural checks that can be made without a C++
//! toolchain: the body is non-empty, braces balance outside string and
//! character literals, and a `void` callback does not `return` a value.

use tracing::debug;

use super::{CallbackCompiler, CallbackHandle, CallbackSignature, ResolveError};

/// Compiles lambdas into callback handles under caller-chosen names.
#[derive(Debug, Default)]
pub struct LambdaCompiler {
    compiled: usize,
}

impl LambdaCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compiled_count(&self) -> usize {
        self.compiled
    }
}

/// Code with string / char literals and comments blanked out.
fn strip_literals(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                let quote = c;
                while let Some(inner) = chars.next() {
                    if inner == '\\' {
                        chars.next();
                    } else if inner == quote {
                        break;
                    }
                }
                out.push(' ');
            }
            '/' if chars.peek() == Some(&'/') => {
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
                out.push(' ');
            }
            other => out.push(other),
        }
    }
    out
}

fn braces_balanced(code: &str) -> bool {
    let mut depth: i64 = 0;
    for c in code.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Whether any `return` statement carries an expression.
fn returns_value(code: &str) -> bool {
    code.match_indices("return").any(|(idx, _)| {
        let before_ok = code[..idx]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
        let rest = &code[idx + "return".len()..];
        let after_ok = rest
            .chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
        before_ok && after_ok && !rest.trim_start().starts_with(';')
    })
}

impl CallbackCompiler for LambdaCompiler {
    fn compile(
        &mut self,
        var: String,
        source: &str,
        signature: &CallbackSignature,
    ) -> Result<CallbackHandle, ResolveError> {
        let code = strip_literals(source);
        if code.trim().is_empty() {
            return Err(ResolveError::EmptyLambda);
        }
        if !braces_balanced(&code) {
            return Err(ResolveError::UnbalancedBraces);
        }
        if signature.returns_void() && returns_value(&code) {
            return Err(ResolveError::UnexpectedReturn {
                return_type: signature.return_type.clone(),
            });
        }

        self.compiled += 1;
        debug!("Compiled {var} ({} bytes)", source.len());
        Ok(CallbackHandle {
            var,
            signature: signature.clone(),
            body: source.trim().to_string(),
        })
    }
}
