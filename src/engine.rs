//! The compile-and-execute seam.
//!
//! Everything else in the crate is agnostic to how dynamic execution is
//! achieved: a [`ModuleEngine`] turns fetched source text into a
//! [`CompiledUnit`] and later runs it against a caller-supplied attribute
//! map, re-entering the import machinery through an [`ImportHost`] when the
//! body imports other modules.
//!
//! The built-in [`ScriptEngine`] understands a small top-level-binding
//! language — literal assignments and imports — which is enough for remote
//! configuration and manifest modules and exercises every lifecycle path.

use crate::error::{EngineError, ImportError};
use crate::module::{AttrMap, Value};

/// Callback into the import machinery, used while a module body executes.
pub trait ImportHost {
    fn import_module(&mut self, full_name: &str) -> Result<(), ImportError>;
}

/// Compiles fetched source text and executes it into a namespace.
pub trait ModuleEngine: Send + Sync {
    /// File extension of artifacts this engine loads, without the dot.
    fn extension(&self) -> &'static str;

    /// Compile source text into an executable unit. `origin` is the URL the
    /// source came from, kept for diagnostics.
    fn compile(&self, source: &str, origin: &str) -> Result<CompiledUnit, EngineError>;

    /// Run a compiled unit, binding top-level declarations into
    /// `attributes`. Bindings made before a runtime error are left in place.
    fn execute(
        &self,
        unit: &CompiledUnit,
        attributes: &mut AttrMap,
        host: &mut dyn ImportHost,
    ) -> Result<(), EngineError>;
}

/// An executable unit scoped to the URL it was compiled from.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    origin: String,
    statements: Vec<Stmt>,
}

impl CompiledUnit {
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

#[derive(Debug, Clone)]
enum Stmt {
    Bind {
        name: String,
        value: Value,
    },
    Import {
        target: String,
    },
    Fail {
        line: usize,
        message: String,
    },
}

/// The built-in engine: one statement per line.
///
/// Supported statements:
/// - `name = <literal>` with integer, float, double-quoted string, `true`
///   or `false` literals;
/// - `import a.b.c`, which loads `a.b.c` through the host and binds `c` to
///   a module reference;
/// - `fail "message"`, which raises at execution time;
/// - blank lines and `#` comments.
///
/// Artifacts use the `.py` extension so remote layouts keep the
/// package-style shape (`pkg/__init__.py`, flat `pkg.py`) the loader's
/// precedence rules are written against.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptEngine;

impl ModuleEngine for ScriptEngine {
    fn extension(&self) -> &'static str {
        "py"
    }

    fn compile(&self, source: &str, origin: &str) -> Result<CompiledUnit, EngineError> {
        let mut statements = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            if let Some(rest) = text.strip_prefix("import ") {
                let target = rest.trim();
                if !is_dotted_name(target) {
                    return Err(EngineError::Syntax {
                        line,
                        text: text.to_string(),
                    });
                }
                statements.push(Stmt::Import {
                    target: target.to_string(),
                });
                continue;
            }
            if let Some(rest) = text.strip_prefix("fail ") {
                let message = parse_string(rest.trim()).ok_or_else(|| EngineError::Literal {
                    line,
                    text: rest.trim().to_string(),
                })?;
                statements.push(Stmt::Fail { line, message });
                continue;
            }
            if let Some((lhs, rhs)) = text.split_once('=') {
                let name = lhs.trim();
                if !is_identifier(name) {
                    return Err(EngineError::Syntax {
                        line,
                        text: text.to_string(),
                    });
                }
                let value = parse_literal(rhs.trim()).ok_or_else(|| EngineError::Literal {
                    line,
                    text: rhs.trim().to_string(),
                })?;
                statements.push(Stmt::Bind {
                    name: name.to_string(),
                    value,
                });
                continue;
            }
            return Err(EngineError::Syntax {
                line,
                text: text.to_string(),
            });
        }
        Ok(CompiledUnit {
            origin: origin.to_string(),
            statements,
        })
    }

    fn execute(
        &self,
        unit: &CompiledUnit,
        attributes: &mut AttrMap,
        host: &mut dyn ImportHost,
    ) -> Result<(), EngineError> {
        for statement in &unit.statements {
            match statement {
                Stmt::Bind { name, value } => {
                    attributes.insert(name.clone(), value.clone());
                }
                Stmt::Import { target } => {
                    host.import_module(target).map_err(|err| EngineError::Import {
                        name: target.clone(),
                        reason: err.to_string(),
                    })?;
                    let binding = target.rsplit('.').next().unwrap_or(target);
                    attributes.insert(binding.to_string(), Value::Module(target.clone()));
                }
                Stmt::Fail { line, message } => {
                    return Err(EngineError::Raised {
                        line: *line,
                        message: message.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty()
        && !text.chars().next().is_some_and(char::is_numeric)
        && text.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn is_dotted_name(text: &str) -> bool {
    !text.is_empty() && text.split('.').all(is_identifier)
}

fn parse_string(text: &str) -> Option<String> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '"' {
            // An unescaped quote means the suffix we stripped was not the
            // real terminator.
            return None;
        }
        if c == '\\' {
            match chars.next()? {
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                'n' => out.push('\n'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

fn parse_literal(text: &str) -> Option<Value> {
    match text {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        _ => {}
    }
    if text.starts_with('"') {
        return parse_string(text).map(Value::Str);
    }
    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::Int(int));
    }
    if let Ok(float) = text.parse::<f64>() {
        return Some(Value::Float(float));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullHost;

    impl ImportHost for NullHost {
        fn import_module(&mut self, _full_name: &str) -> Result<(), ImportError> {
            Ok(())
        }
    }

    struct RecordingHost(Vec<String>);

    impl ImportHost for RecordingHost {
        fn import_module(&mut self, full_name: &str) -> Result<(), ImportError> {
            self.0.push(full_name.to_string());
            Ok(())
        }
    }

    fn run(source: &str) -> AttrMap {
        let engine = ScriptEngine;
        let unit = engine.compile(source, "mem://test").unwrap();
        let mut attributes = AttrMap::new();
        engine.execute(&unit, &mut attributes, &mut NullHost).unwrap();
        attributes
    }

    #[test]
    fn binds_literals() {
        let attrs = run("value = 42\npi = 3.5\ngreet = \"hi\"\nok = true\n");
        assert_eq!(attrs.get("value"), Some(&Value::Int(42)));
        assert_eq!(attrs.get("pi"), Some(&Value::Float(3.5)));
        assert_eq!(attrs.get("greet"), Some(&Value::Str("hi".into())));
        assert_eq!(attrs.get("ok"), Some(&Value::Bool(true)));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let attrs = run("# header\n\n   \nx = 1\n");
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn string_escapes() {
        let attrs = run(r#"s = "a\"b\\c""#);
        assert_eq!(attrs.get("s"), Some(&Value::Str("a\"b\\c".into())));
    }

    #[test]
    fn import_binds_trailing_segment() {
        let engine = ScriptEngine;
        let unit = engine.compile("import pkg.sub.mod\n", "mem://test").unwrap();
        let mut attributes = AttrMap::new();
        let mut host = RecordingHost(Vec::new());
        engine.execute(&unit, &mut attributes, &mut host).unwrap();
        assert_eq!(host.0, vec!["pkg.sub.mod".to_string()]);
        assert_eq!(
            attributes.get("mod"),
            Some(&Value::Module("pkg.sub.mod".into()))
        );
    }

    #[test]
    fn syntax_error_reports_line() {
        let err = ScriptEngine.compile("x = 1\nnot a statement\n", "mem://test");
        assert!(matches!(err, Err(EngineError::Syntax { line: 2, .. })));
    }

    #[test]
    fn malformed_literal_is_rejected() {
        let err = ScriptEngine.compile("x = @@\n", "mem://test");
        assert!(matches!(err, Err(EngineError::Literal { line: 1, .. })));
    }

    #[test]
    fn fail_raises_at_runtime() {
        let engine = ScriptEngine;
        let unit = engine
            .compile("x = 1\nfail \"boom\"\ny = 2\n", "mem://test")
            .unwrap();
        let mut attributes = AttrMap::new();
        let err = engine.execute(&unit, &mut attributes, &mut NullHost);
        assert!(matches!(err, Err(EngineError::Raised { line: 2, .. })));
        assert_eq!(attributes.get("x"), Some(&Value::Int(1)));
        assert!(!attributes.contains_key("y"));
    }

    #[test]
    fn empty_source_compiles_to_nothing() {
        let unit = ScriptEngine.compile("", "mem://test").unwrap();
        assert_eq!(unit.origin(), "mem://test");
        let attrs = run("");
        assert!(attrs.is_empty());
    }
}
