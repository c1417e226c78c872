//! Schema recovery: evaluate a module's top level against the stub
//! environment and collect every public binding whose value is rule-like.
//!
//! Evaluation is structural. Function bodies are never run, calls to user
//! functions and loaded symbols produce opaque values, and a conditional or
//! loop whose control value is opaque is skipped. Loops only iterate over
//! concrete lists, so evaluation always terminates.
//!
//! `b = a` makes `b` share `a`'s dict or list, so later in-place updates
//! through either name are seen by both. Containers nested inside other
//! values are copied.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::stubs::{Builtin, Stub, StubEnvironment, STUB_ENVIRONMENT};
use crate::error::{EvalError, ExtractResult};
use crate::model::AttrType;
use crate::syntax::{
    self,
    ast::{Arg, BinOp, Expr, Module, Stmt, StmtKind, UnaryOp},
};

/// Type and mandatory flag recorded for one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrDescriptor {
    pub attr_type: AttrType,
    pub mandatory: bool,
}

/// Attributes of one rule keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSchema {
    pub attrs: BTreeMap<String, AttrDescriptor>,
}

/// Every public rule of a module, keyed by the name it is bound to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StubSchema {
    pub rules: BTreeMap<String, RuleSchema>,
}

/// Parse and evaluate `source` against the built-in stub catalog.
pub fn recover(source: &str, source_name: &str) -> ExtractResult<StubSchema> {
    let module = syntax::parse(source, source_name)?;
    Ok(recover_module(&module, source_name, &STUB_ENVIRONMENT)?)
}

/// Evaluate an already parsed module against `stubs`.
pub fn recover_module(
    module: &Module,
    source_name: &str,
    stubs: &StubEnvironment,
) -> Result<StubSchema, EvalError> {
    let mut interp = Interpreter {
        stubs,
        source_name,
        globals: BTreeMap::new(),
        aliases: BTreeMap::new(),
    };
    match interp.exec_block(&module.statements)? {
        Flow::Normal => {}
        Flow::Break(line) => return Err(interp.error(line, "'break' outside loop")),
        Flow::Continue(line) => return Err(interp.error(line, "'continue' outside loop")),
    }

    let mut schema = StubSchema::default();
    for (name, value) in interp.globals {
        let Value::Rule(mut rule) = value else { continue };
        if name.starts_with('_') {
            debug!(rule = %name, "skipping private rule");
            continue;
        }
        rule.attrs.insert(
            "name".to_string(),
            AttrDescriptor {
                attr_type: AttrType::Name,
                mandatory: true,
            },
        );
        debug!(rule = %name, attributes = rule.attrs.len(), "recovered rule schema");
        schema.rules.insert(name, rule);
    }
    Ok(schema)
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Insertion-ordered; keys are unique.
    Dict(Vec<(Value, Value)>),
    Attr(AttrDescriptor),
    Rule(RuleSchema),
    /// A user `def` or lambda. Calling it yields [`Value::Opaque`].
    Function,
    Builtin(Builtin),
    /// `receiver.method`, resolved when called.
    Method(Box<Value>, String),
    /// Anything the stubs cannot know.
    Opaque,
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Attr(_) => "attribute",
            Value::Rule(_) => "rule",
            Value::Function => "function",
            Value::Builtin(_) | Value::Method(..) => "builtin_function_or_method",
            Value::Opaque => "unknown",
        }
    }

    /// `None` when the truth value cannot be known.
    fn truth(&self) -> Option<bool> {
        match self {
            Value::None => Some(false),
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Str(s) => Some(!s.is_empty()),
            Value::List(items) | Value::Tuple(items) => Some(!items.is_empty()),
            Value::Dict(entries) => Some(!entries.is_empty()),
            Value::Opaque => None,
            _ => Some(true),
        }
    }

    fn is_opaque(&self) -> bool {
        matches!(self, Value::Opaque)
    }
}

/// Key equality. Two unknown keys are never known to be equal.
fn same_key(a: &Value, b: &Value) -> bool {
    !a.is_opaque() && a == b
}

fn dict_get<'v>(entries: &'v [(Value, Value)], key: &Value) -> Option<&'v Value> {
    entries.iter().find(|(k, _)| same_key(k, key)).map(|(_, v)| v)
}

fn dict_insert(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) {
    match entries.iter_mut().find(|(k, _)| same_key(k, &key)) {
        Some(slot) => slot.1 = value,
        None => entries.push((key, value)),
    }
}

enum Flow {
    Normal,
    Break(usize),
    Continue(usize),
}

/// Evaluated call arguments. `spread_opaque` is set when a `*` or `**`
/// argument could not be expanded.
struct CallArgs {
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
    spread_opaque: bool,
}

impl CallArgs {
    fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

struct Interpreter<'a> {
    stubs: &'a StubEnvironment,
    source_name: &'a str,
    globals: BTreeMap<String, Value>,
    /// Names bound to another global's dict or list, mapped to the global
    /// that holds it.
    aliases: BTreeMap<String, String>,
}

impl Interpreter<'_> {
    fn error(&self, line: usize, message: impl Into<String>) -> EvalError {
        EvalError {
            source_name: self.source_name.to_string(),
            line,
            message: message.into(),
        }
    }

    /// The global that holds `name`'s value.
    fn storage(&self, name: &str) -> String {
        self.aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    fn is_container(&self, name: &str) -> bool {
        matches!(
            self.globals.get(&self.storage(name)),
            Some(Value::Dict(_) | Value::List(_))
        )
    }

    /// Detach `name` from any sharing. If other names share its value, the
    /// value moves to one of them.
    fn release(&mut self, name: &str) {
        if self.aliases.remove(name).is_some() {
            return;
        }
        let sharers: Vec<String> = self
            .aliases
            .iter()
            .filter(|(_, storage)| storage.as_str() == name)
            .map(|(alias, _)| alias.clone())
            .collect();
        let Some((heir, rest)) = sharers.split_first() else {
            return;
        };
        self.aliases.remove(heir);
        if let Some(value) = self.globals.remove(name) {
            self.globals.insert(heir.clone(), value);
        }
        for other in rest {
            self.aliases.insert(other.clone(), heir.clone());
        }
    }

    fn bind(&mut self, name: &str, value: Value) {
        self.release(name);
        self.globals.insert(name.to_string(), value);
    }

    /// `name = source` where `source` holds a dict or list.
    fn share(&mut self, name: &str, source: &str) {
        let storage = self.storage(source);
        if storage == name {
            return;
        }
        self.release(name);
        self.globals.remove(name);
        debug!(binding = name, shares = %storage, "binding shares a container");
        self.aliases.insert(name.to_string(), storage);
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow, EvalError> {
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, EvalError> {
        let line = stmt.line;
        match &stmt.kind {
            StmtKind::Assign {
                target: Expr::Ident(name),
                op: None,
                value: Expr::Ident(source),
            } if self.is_container(source) => self.share(name, source),
            StmtKind::Assign {
                target,
                op: None,
                value,
            } => {
                let value = self.eval(value, line)?;
                self.assign(target, value, line)?;
            }
            StmtKind::Assign {
                target,
                op: Some(op),
                value,
            } => {
                let current = self.eval(target, line)?;
                let rhs = self.eval(value, line)?;
                let value = self.binary(*op, current, rhs, line)?;
                match target {
                    // `x += ...` on a list or dict updates it in place.
                    Expr::Ident(name)
                        if self.is_container(name)
                            && matches!(value, Value::List(_) | Value::Dict(_)) =>
                    {
                        let storage = self.storage(name);
                        self.globals.insert(storage, value);
                    }
                    _ => self.assign(target, value, line)?,
                }
            }
            StmtKind::Expr(expr) => {
                self.eval(expr, line)?;
            }
            StmtKind::Def(def) => self.bind(&def.name, Value::Function),
            StmtKind::If { cond, then, orelse } => match self.eval(cond, line)?.truth() {
                Some(true) => return self.exec_block(then),
                Some(false) => return self.exec_block(orelse),
                None => warn!(
                    source = self.source_name,
                    line,
                    "condition cannot be determined; skipping both branches"
                ),
            },
            StmtKind::For { target, iter, body } => {
                let items = match self.eval(iter, line)? {
                    Value::List(items) | Value::Tuple(items) => items,
                    Value::Dict(entries) => entries.into_iter().map(|(k, _)| k).collect(),
                    Value::Opaque => {
                        debug!(line, "skipping loop over an unknown value");
                        return Ok(Flow::Normal);
                    }
                    other => {
                        return Err(
                            self.error(line, format!("'{}' is not iterable", other.type_name()))
                        )
                    }
                };
                for item in items {
                    self.assign(target, item, line)?;
                    match self.exec_block(body)? {
                        Flow::Break(_) => break,
                        Flow::Continue(_) | Flow::Normal => {}
                    }
                }
            }
            StmtKind::Return(_) => return Err(self.error(line, "'return' outside function")),
            StmtKind::Load { symbols, .. } => {
                for (local, _) in symbols {
                    self.bind(local, Value::Opaque);
                }
            }
            StmtKind::Pass => {}
            StmtKind::Break => return Ok(Flow::Break(line)),
            StmtKind::Continue => return Ok(Flow::Continue(line)),
        }
        Ok(Flow::Normal)
    }

    fn assign(&mut self, target: &Expr, value: Value, line: usize) -> Result<(), EvalError> {
        match target {
            Expr::Ident(name) => self.bind(name, value),
            Expr::Tuple(targets) | Expr::List(targets) => match value {
                Value::List(items) | Value::Tuple(items) if items.len() == targets.len() => {
                    for (target, item) in targets.iter().zip(items) {
                        self.assign(target, item, line)?;
                    }
                }
                Value::List(items) | Value::Tuple(items) => {
                    return Err(self.error(
                        line,
                        format!(
                            "cannot unpack {} values into {} targets",
                            items.len(),
                            targets.len()
                        ),
                    ))
                }
                Value::Opaque => {
                    for target in targets {
                        self.assign(target, Value::Opaque, line)?;
                    }
                }
                other => {
                    return Err(self.error(
                        line,
                        format!("cannot unpack '{}' object", other.type_name()),
                    ))
                }
            },
            Expr::Index { object, index } => {
                let container = self.eval(object, line)?;
                let key = self.eval(index, line)?;
                let Expr::Ident(name) = object.as_ref() else {
                    return Ok(());
                };
                let name = &self.storage(name);
                match (container, key) {
                    (Value::Dict(_), key) => {
                        if let Some(Value::Dict(entries)) = self.globals.get_mut(name) {
                            dict_insert(entries, key, value);
                        }
                    }
                    (Value::List(items), Value::Int(i)) => {
                        let Some(pos) = list_position(items.len(), i) else {
                            return Err(self.error(line, "list index out of range"));
                        };
                        if let Some(Value::List(items)) = self.globals.get_mut(name) {
                            items[pos] = value;
                        }
                    }
                    (Value::Opaque, _) | (_, Value::Opaque) => {}
                    (other, _) => {
                        return Err(self.error(
                            line,
                            format!(
                                "'{}' object does not support item assignment",
                                other.type_name()
                            ),
                        ))
                    }
                }
            }
            Expr::Attr { object, .. } => {
                self.eval(object, line)?;
            }
            _ => return Err(self.error(line, "cannot assign to this expression")),
        }
        Ok(())
    }

    fn lookup(&self, name: &str, line: usize) -> Result<Value, EvalError> {
        if let Some(value) = self.globals.get(&self.storage(name)) {
            return Ok(value.clone());
        }
        match self.stubs.global(name) {
            Some(Stub::Function(builtin)) => Ok(Value::Builtin(builtin)),
            Some(Stub::Bool(b)) => Ok(Value::Bool(b)),
            Some(Stub::None) => Ok(Value::None),
            Some(Stub::Str(s)) => Ok(Value::Str(s.to_string())),
            Some(Stub::Opaque) => Ok(Value::Opaque),
            None => Err(self.error(line, format!("name '{name}' is not defined"))),
        }
    }

    fn eval(&mut self, expr: &Expr, line: usize) -> Result<Value, EvalError> {
        Ok(match expr {
            Expr::Ident(name) => self.lookup(name, line)?,
            Expr::Int(Some(i)) => Value::Int(*i),
            Expr::Int(None) => Value::Opaque,
            Expr::Float(_) => Value::Opaque,
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::List(items) => Value::List(self.eval_all(items, line)?),
            Expr::Tuple(items) => Value::Tuple(self.eval_all(items, line)?),
            Expr::Dict(pairs) => {
                let mut entries = Vec::with_capacity(pairs.len());
                for (k, v) in pairs {
                    let key = self.eval(k, line)?;
                    let value = self.eval(v, line)?;
                    dict_insert(&mut entries, key, value);
                }
                Value::Dict(entries)
            }
            // Comprehension variables are local to the comprehension and
            // their iterables are rarely concrete; not worth evaluating.
            Expr::Comprehension(_) => Value::Opaque,
            Expr::Call { func, args } => self.call(func, args, line)?,
            Expr::Attr { object, name } => {
                let object = self.eval(object, line)?;
                self.get_attr(object, name, line)?
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, line)?;
                let index = self.eval(index, line)?;
                self.index(object, index, line)?
            }
            Expr::Slice {
                object,
                start,
                stop,
                step,
            } => {
                self.eval(object, line)?;
                for bound in [start, stop, step].into_iter().flatten() {
                    self.eval(bound, line)?;
                }
                Value::Opaque
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand, line)?;
                self.unary(*op, operand, line)?
            }
            Expr::Binary {
                op: op @ (BinOp::And | BinOp::Or),
                lhs,
                rhs,
            } => {
                let lhs = self.eval(lhs, line)?;
                match (op, lhs.truth()) {
                    (BinOp::And, Some(false)) | (BinOp::Or, Some(true)) => lhs,
                    (_, Some(_)) => self.eval(rhs, line)?,
                    (_, None) => {
                        self.eval(rhs, line)?;
                        Value::Opaque
                    }
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, line)?;
                let rhs = self.eval(rhs, line)?;
                self.binary(*op, lhs, rhs, line)?
            }
            Expr::Cond { then, cond, orelse } => match self.eval(cond, line)?.truth() {
                Some(true) => self.eval(then, line)?,
                Some(false) => self.eval(orelse, line)?,
                None => Value::Opaque,
            },
            Expr::Lambda { .. } => Value::Function,
        })
    }

    fn eval_all(&mut self, exprs: &[Expr], line: usize) -> Result<Vec<Value>, EvalError> {
        exprs.iter().map(|e| self.eval(e, line)).collect()
    }

    fn eval_args(&mut self, args: &[Arg], line: usize) -> Result<CallArgs, EvalError> {
        let mut out = CallArgs {
            positional: Vec::new(),
            keywords: Vec::new(),
            spread_opaque: false,
        };
        for arg in args {
            match arg {
                Arg::Positional(e) => {
                    let value = self.eval(e, line)?;
                    out.positional.push(value);
                }
                Arg::Keyword(name, e) => {
                    let value = self.eval(e, line)?;
                    out.keywords.push((name.clone(), value));
                }
                Arg::Star(e) => match self.eval(e, line)? {
                    Value::List(items) | Value::Tuple(items) => out.positional.extend(items),
                    Value::Opaque => out.spread_opaque = true,
                    other => {
                        return Err(self.error(
                            line,
                            format!("argument after * must be iterable, not {}", other.type_name()),
                        ))
                    }
                },
                Arg::StarStar(e) => match self.eval(e, line)? {
                    Value::Dict(entries) => {
                        for (k, v) in entries {
                            match k {
                                Value::Str(name) => out.keywords.push((name, v)),
                                Value::Opaque => out.spread_opaque = true,
                                other => {
                                    return Err(self.error(
                                        line,
                                        format!("keywords must be strings, not {}", other.type_name()),
                                    ))
                                }
                            }
                        }
                    }
                    Value::Opaque => out.spread_opaque = true,
                    other => {
                        return Err(self.error(
                            line,
                            format!("argument after ** must be a dict, not {}", other.type_name()),
                        ))
                    }
                },
            }
        }
        Ok(out)
    }

    fn call(&mut self, func: &Expr, args: &[Arg], line: usize) -> Result<Value, EvalError> {
        // In-place updates of module-level dicts and lists, e.g.
        // `COMMON_ATTRS.update(...)`.
        if let Expr::Attr { object, name: method } = func {
            if let Expr::Ident(receiver) = object.as_ref() {
                let receiver = &self.storage(receiver);
                let mutable = matches!(
                    (self.globals.get(receiver), method.as_str()),
                    (Some(Value::Dict(_)), "update" | "setdefault" | "pop" | "clear")
                        | (Some(Value::List(_)), "append" | "extend" | "insert" | "clear")
                );
                if mutable {
                    let args = self.eval_args(args, line)?;
                    return self.mutate(receiver, method, args, line);
                }
            }
        }

        let callee = self.eval(func, line)?;
        let args = self.eval_args(args, line)?;
        match callee {
            Value::Builtin(builtin) => self.call_builtin(builtin, args, line),
            Value::Method(receiver, method) => Ok(call_method(*receiver, &method, args)),
            Value::Function | Value::Opaque => Ok(Value::Opaque),
            other => Err(self.error(
                line,
                format!("'{}' object is not callable", other.type_name()),
            )),
        }
    }

    fn mutate(
        &mut self,
        receiver: &str,
        method: &str,
        args: CallArgs,
        line: usize,
    ) -> Result<Value, EvalError> {
        let Some(target) = self.globals.get_mut(receiver) else {
            return Ok(Value::Opaque);
        };
        match (target, method) {
            (Value::Dict(entries), "update") => {
                for source in args.positional {
                    match source {
                        Value::Dict(pairs) => {
                            for (k, v) in pairs {
                                dict_insert(entries, k, v);
                            }
                        }
                        Value::List(pairs) | Value::Tuple(pairs) => {
                            for pair in pairs {
                                match pair {
                                    Value::List(kv) | Value::Tuple(kv) if kv.len() == 2 => {
                                        let mut kv = kv.into_iter();
                                        if let (Some(k), Some(v)) = (kv.next(), kv.next()) {
                                            dict_insert(entries, k, v);
                                        }
                                    }
                                    _ => debug!(line, "ignoring malformed update entry"),
                                }
                            }
                        }
                        _ => debug!(line, dict = receiver, "update from an unknown value"),
                    }
                }
                for (k, v) in args.keywords {
                    dict_insert(entries, Value::Str(k), v);
                }
                Ok(Value::None)
            }
            (Value::Dict(entries), "setdefault") => {
                let mut positional = args.positional.into_iter();
                let key = positional.next().unwrap_or(Value::Opaque);
                let default = positional.next().unwrap_or(Value::None);
                if key.is_opaque() {
                    entries.push((key, default));
                    return Ok(Value::Opaque);
                }
                if let Some(existing) = dict_get(entries, &key) {
                    return Ok(existing.clone());
                }
                entries.push((key, default.clone()));
                Ok(default)
            }
            (Value::Dict(entries), "pop") => {
                let mut positional = args.positional.into_iter();
                let key = positional.next().unwrap_or(Value::Opaque);
                if key.is_opaque() {
                    return Ok(Value::Opaque);
                }
                match entries.iter().position(|(k, _)| same_key(k, &key)) {
                    Some(pos) => Ok(entries.remove(pos).1),
                    None => Ok(positional.next().unwrap_or(Value::None)),
                }
            }
            (Value::List(items), "append") => {
                items.extend(args.positional);
                Ok(Value::None)
            }
            (Value::List(items), "extend") => {
                for source in args.positional {
                    match source {
                        Value::List(more) | Value::Tuple(more) => items.extend(more),
                        _ => debug!(line, list = receiver, "extend from an unknown value"),
                    }
                }
                Ok(Value::None)
            }
            (Value::List(items), "insert") => {
                let mut positional = args.positional.into_iter();
                if let (Some(Value::Int(i)), Some(value)) = (positional.next(), positional.next()) {
                    let pos = usize::try_from(i).unwrap_or(0).min(items.len());
                    items.insert(pos, value);
                }
                Ok(Value::None)
            }
            (Value::Dict(entries), "clear") => {
                entries.clear();
                Ok(Value::None)
            }
            (Value::List(items), "clear") => {
                items.clear();
                Ok(Value::None)
            }
            _ => Ok(Value::Opaque),
        }
    }

    fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: CallArgs,
        line: usize,
    ) -> Result<Value, EvalError> {
        Ok(match builtin {
            Builtin::AttrModule => return Err(self.error(line, "'attr' is not callable")),
            Builtin::AttrConstructor(attr_type) => Value::Attr(AttrDescriptor {
                attr_type: attr_type.clone(),
                mandatory: args.keyword("mandatory").and_then(Value::truth) == Some(true),
            }),
            Builtin::Rule => Value::Rule(self.rule_schema(&args, line)?),
            Builtin::Dict => {
                let mut entries = match args.positional.into_iter().next() {
                    None => Vec::new(),
                    Some(Value::Dict(entries)) => entries,
                    Some(Value::Opaque) => return Ok(Value::Opaque),
                    Some(other) => {
                        return Err(self.error(
                            line,
                            format!("dict() argument must be a mapping, not {}", other.type_name()),
                        ))
                    }
                };
                if args.spread_opaque {
                    return Ok(Value::Opaque);
                }
                for (k, v) in args.keywords {
                    dict_insert(&mut entries, Value::Str(k), v);
                }
                Value::Dict(entries)
            }
            Builtin::List | Builtin::Tuple => {
                let items = match args.positional.into_iter().next() {
                    None => Vec::new(),
                    Some(Value::List(items)) | Some(Value::Tuple(items)) => items,
                    Some(Value::Dict(entries)) => entries.into_iter().map(|(k, _)| k).collect(),
                    Some(_) => return Ok(Value::Opaque),
                };
                if builtin == Builtin::List {
                    Value::List(items)
                } else {
                    Value::Tuple(items)
                }
            }
            Builtin::Len => match args.positional.first() {
                Some(Value::Str(s)) => Value::Int(s.chars().count() as i64),
                Some(Value::List(items)) | Some(Value::Tuple(items)) => {
                    Value::Int(items.len() as i64)
                }
                Some(Value::Dict(entries)) => Value::Int(entries.len() as i64),
                _ => Value::Opaque,
            },
            Builtin::Fail => {
                let message = match args.positional.first() {
                    Some(Value::Str(s)) => s.clone(),
                    _ => "fail() called".to_string(),
                };
                return Err(self.error(line, message));
            }
            Builtin::Aspect
            | Builtin::Provider
            | Builtin::Label
            | Builtin::FileType
            | Builtin::Select
            | Builtin::Struct
            | Builtin::Opaque(_) => Value::Opaque,
        })
    }

    /// `rule(implementation, test, attrs, ...)`: only `attrs` matters.
    fn rule_schema(&self, args: &CallArgs, line: usize) -> Result<RuleSchema, EvalError> {
        let attrs = args.keyword("attrs").or_else(|| args.positional.get(2));
        let entries = match attrs {
            None | Some(Value::None) => {
                if args.spread_opaque {
                    warn!(
                        source = self.source_name,
                        line, "rule attributes passed indirectly; recording none"
                    );
                }
                return Ok(RuleSchema::default());
            }
            Some(Value::Dict(entries)) => entries,
            Some(Value::Opaque) => {
                warn!(
                    source = self.source_name,
                    line, "rule attributes cannot be determined; recording none"
                );
                return Ok(RuleSchema::default());
            }
            Some(other) => {
                return Err(self.error(
                    line,
                    format!("rule attrs must be a dict, not {}", other.type_name()),
                ))
            }
        };

        let mut schema = RuleSchema::default();
        for (key, value) in entries {
            let name = match key {
                Value::Str(name) => name,
                Value::Opaque => {
                    warn!(
                        source = self.source_name,
                        line, "attribute name cannot be determined; skipping attribute"
                    );
                    continue;
                }
                other => {
                    return Err(self.error(
                        line,
                        format!("attribute names must be strings, not {}", other.type_name()),
                    ))
                }
            };
            let descriptor = match value {
                Value::Attr(descriptor) => descriptor.clone(),
                Value::Opaque => {
                    debug!(attribute = %name, "attribute of unknown type");
                    AttrDescriptor {
                        attr_type: AttrType::Unknown,
                        mandatory: false,
                    }
                }
                other => {
                    return Err(self.error(
                        line,
                        format!(
                            "attribute '{name}' must be declared with attr, not {}",
                            other.type_name()
                        ),
                    ))
                }
            };
            schema.attrs.insert(name.clone(), descriptor);
        }
        Ok(schema)
    }

    fn get_attr(&self, object: Value, name: &str, line: usize) -> Result<Value, EvalError> {
        Ok(match object {
            Value::Builtin(Builtin::AttrModule) => match self.stubs.attr_member(name) {
                Some(attr_type) => Value::Builtin(Builtin::AttrConstructor(attr_type)),
                None => return Err(self.error(line, format!("attr has no member '{name}'"))),
            },
            value @ (Value::Dict(_) | Value::List(_) | Value::Str(_)) => {
                Value::Method(Box::new(value), name.to_string())
            }
            other @ (Value::None | Value::Bool(_) | Value::Int(_)) => {
                return Err(self.error(
                    line,
                    format!("'{}' object has no attribute '{name}'", other.type_name()),
                ))
            }
            _ => Value::Opaque,
        })
    }

    fn index(&self, object: Value, index: Value, line: usize) -> Result<Value, EvalError> {
        match (object, index) {
            (Value::Opaque, _) | (_, Value::Opaque) => Ok(Value::Opaque),
            (Value::Dict(entries), key) => match dict_get(&entries, &key) {
                Some(value) => Ok(value.clone()),
                None => Err(self.error(line, format!("key {} not found in dict", describe(&key)))),
            },
            (Value::List(items) | Value::Tuple(items), Value::Int(i)) => {
                match list_position(items.len(), i) {
                    Some(pos) => Ok(items[pos].clone()),
                    None => Err(self.error(line, "index out of range")),
                }
            }
            (Value::Str(_), Value::Int(_)) => Ok(Value::Opaque),
            (object, index) => Err(self.error(
                line,
                format!(
                    "'{}' object cannot be indexed by {}",
                    object.type_name(),
                    index.type_name()
                ),
            )),
        }
    }

    fn unary(&self, op: UnaryOp, operand: Value, line: usize) -> Result<Value, EvalError> {
        Ok(match (op, operand) {
            (_, Value::Opaque) => Value::Opaque,
            (UnaryOp::Not, v) => v.truth().map_or(Value::Opaque, |b| Value::Bool(!b)),
            (UnaryOp::Neg, Value::Int(i)) => i.checked_neg().map_or(Value::Opaque, Value::Int),
            (UnaryOp::Pos, Value::Int(i)) => Value::Int(i),
            (UnaryOp::Invert, Value::Int(i)) => Value::Int(!i),
            (_, other) => {
                return Err(self.error(
                    line,
                    format!("bad operand type for unary operator: {}", other.type_name()),
                ))
            }
        })
    }

    fn binary(&self, op: BinOp, lhs: Value, rhs: Value, line: usize) -> Result<Value, EvalError> {
        use Value::*;

        if lhs.is_opaque() || rhs.is_opaque() {
            return Ok(Opaque);
        }
        Ok(match (op, lhs, rhs) {
            (BinOp::Eq, l, r) => Bool(l == r),
            (BinOp::NotEq, l, r) => Bool(l != r),
            (BinOp::In, needle, haystack) => contains(&haystack, &needle).map_or(Opaque, Bool),
            (BinOp::NotIn, needle, haystack) => {
                contains(&haystack, &needle).map_or(Opaque, |b| Bool(!b))
            }
            (BinOp::Add, Int(a), Int(b)) => a.checked_add(b).map_or(Opaque, Int),
            (BinOp::Sub, Int(a), Int(b)) => a.checked_sub(b).map_or(Opaque, Int),
            (BinOp::Mul, Int(a), Int(b)) => a.checked_mul(b).map_or(Opaque, Int),
            (BinOp::FloorDiv | BinOp::Mod, Int(_), Int(0)) => {
                return Err(self.error(line, "integer division by zero"))
            }
            (BinOp::FloorDiv, Int(a), Int(b)) => floor_div(a, b).map_or(Opaque, Int),
            (BinOp::Mod, Int(a), Int(b)) => floor_mod(a, b).map_or(Opaque, Int),
            (BinOp::Div | BinOp::Pow, Int(_), Int(_)) => Opaque,
            (BinOp::BitAnd, Int(a), Int(b)) => Int(a & b),
            (BinOp::BitOr, Int(a), Int(b)) => Int(a | b),
            (BinOp::BitXor, Int(a), Int(b)) => Int(a ^ b),
            (BinOp::Shl | BinOp::Shr, Int(_), Int(_)) => Opaque,
            (BinOp::Lt, Int(a), Int(b)) => Bool(a < b),
            (BinOp::Gt, Int(a), Int(b)) => Bool(a > b),
            (BinOp::LtEq, Int(a), Int(b)) => Bool(a <= b),
            (BinOp::GtEq, Int(a), Int(b)) => Bool(a >= b),
            (BinOp::Lt, Str(a), Str(b)) => Bool(a < b),
            (BinOp::Gt, Str(a), Str(b)) => Bool(a > b),
            (BinOp::LtEq, Str(a), Str(b)) => Bool(a <= b),
            (BinOp::GtEq, Str(a), Str(b)) => Bool(a >= b),
            (BinOp::Add, Str(a), Str(b)) => Str(a + &b),
            (BinOp::Add, List(mut a), List(b)) => {
                a.extend(b);
                List(a)
            }
            (BinOp::Add, Tuple(mut a), Tuple(b)) => {
                a.extend(b);
                Tuple(a)
            }
            (BinOp::Add | BinOp::BitOr, Dict(mut a), Dict(b)) => {
                for (k, v) in b {
                    dict_insert(&mut a, k, v);
                }
                Dict(a)
            }
            (BinOp::Mod, Str(_), _) => Opaque,
            (BinOp::Mul, Str(_) | List(_) | Tuple(_), Int(_))
            | (BinOp::Mul, Int(_), Str(_) | List(_) | Tuple(_)) => Opaque,
            (op, l, r) => {
                return Err(self.error(
                    line,
                    format!(
                        "unsupported operand type(s) for {}: '{}' and '{}'",
                        op.symbol(),
                        l.type_name(),
                        r.type_name()
                    ),
                ))
            }
        })
    }
}

/// Non-mutating methods of concrete values.
fn call_method(receiver: Value, method: &str, args: CallArgs) -> Value {
    match (receiver, method) {
        (Value::Dict(entries), "get") => {
            let mut positional = args.positional.into_iter();
            let key = positional.next().unwrap_or(Value::Opaque);
            if key.is_opaque() {
                return Value::Opaque;
            }
            dict_get(&entries, &key)
                .cloned()
                .unwrap_or_else(|| positional.next().unwrap_or(Value::None))
        }
        (Value::Dict(entries), "keys") => Value::List(entries.into_iter().map(|(k, _)| k).collect()),
        (Value::Dict(entries), "values") => {
            Value::List(entries.into_iter().map(|(_, v)| v).collect())
        }
        (Value::Dict(entries), "items") => Value::List(
            entries
                .into_iter()
                .map(|(k, v)| Value::Tuple(vec![k, v]))
                .collect(),
        ),
        (dict @ Value::Dict(_), "copy") => dict,
        _ => Value::Opaque,
    }
}

fn contains(haystack: &Value, needle: &Value) -> Option<bool> {
    match (haystack, needle) {
        (Value::List(items) | Value::Tuple(items), needle) => Some(items.contains(needle)),
        (Value::Dict(entries), key) => Some(dict_get(entries, key).is_some()),
        (Value::Str(s), Value::Str(sub)) => Some(s.contains(sub.as_str())),
        _ => None,
    }
}

/// Integer division rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    let r = a.checked_rem(b)?;
    Some(if r != 0 && (r < 0) != (b < 0) { q - 1 } else { q })
}

/// Remainder taking the sign of the divisor.
fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    Some(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
}

fn list_position(len: usize, index: i64) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let pos = if index < 0 { len + index } else { index };
    (0..len).contains(&pos).then(|| pos as usize)
}

fn describe(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("{s:?}"),
        Value::Int(i) => i.to_string(),
        other => other.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(source: &str) -> StubSchema {
        recover(source, "test.bzl").unwrap()
    }

    fn eval_error(source: &str) -> EvalError {
        match recover(source, "test.bzl") {
            Err(crate::error::ExtractError::Eval(e)) => e,
            other => panic!("expected evaluation error, got {other:?}"),
        }
    }

    fn attr(attr_type: AttrType, mandatory: bool) -> AttrDescriptor {
        AttrDescriptor {
            attr_type,
            mandatory,
        }
    }

    #[test]
    fn recovers_public_rule_with_injected_name() {
        let s = schema(
            r#"
def _impl(ctx):
    return None

my_rule = rule(
    implementation = _impl,
    attrs = {
        "srcs": attr.label_list(mandatory = True),
        "out": attr.output(),
    },
)
"#,
        );
        let rule = &s.rules["my_rule"];
        assert_eq!(rule.attrs["name"], attr(AttrType::Name, true));
        assert_eq!(rule.attrs["srcs"], attr(AttrType::LabelList, true));
        assert_eq!(rule.attrs["out"], attr(AttrType::Output, false));
        assert_eq!(rule.attrs.len(), 3);
    }

    #[test]
    fn private_rules_and_non_rules_are_skipped() {
        let s = schema(
            r#"
_hidden = rule(implementation = None)
visible = rule(implementation = None)
CONSTANT = "x"
"#,
        );
        assert_eq!(s.rules.keys().collect::<Vec<_>>(), vec!["visible"]);
    }

    #[test]
    fn declared_name_attribute_is_overridden() {
        let s = schema(r#"r = rule(attrs = {"name": attr.string()})"#);
        assert_eq!(s.rules["r"].attrs["name"], attr(AttrType::Name, true));
    }

    #[test]
    fn attrs_as_third_positional_argument() {
        let s = schema(r#"r = rule(None, False, {"x": attr.int()})"#);
        assert_eq!(s.rules["r"].attrs["x"], attr(AttrType::Integer, false));
    }

    #[test]
    fn shared_attribute_dicts_compose() {
        let s = schema(
            r#"
COMMON = {"deps": attr.label_list()}
EXTRA = dict(COMMON, flags = attr.string_list())
EXTRA.update({"mode": attr.string(mandatory = True)})
EXTRA["level"] = attr.int()
combined = rule(attrs = EXTRA + {"debug": attr.bool()})
"#,
        );
        let names: Vec<&String> = s.rules["combined"].attrs.keys().collect();
        assert_eq!(names, vec!["debug", "deps", "flags", "level", "mode", "name"]);
        assert!(s.rules["combined"].attrs["mode"].mandatory);
    }

    #[test]
    fn loaded_symbols_and_helper_calls_are_opaque() {
        let s = schema(
            r#"
load("//lib:defs.bzl", "helper", attrs_alias = "shared_attrs")

def _make():
    return {}

r = rule(attrs = {
    "a": helper(),
    "b": attr.string(mandatory = _make()),
})
unknown = rule(attrs = attrs_alias)
"#,
        );
        assert_eq!(s.rules["r"].attrs["a"], attr(AttrType::Unknown, false));
        assert_eq!(s.rules["r"].attrs["b"], attr(AttrType::String, false));
        assert_eq!(s.rules["unknown"].attrs.len(), 1);
    }

    #[test]
    fn conditionals_follow_concrete_values_only() {
        let s = schema(
            r#"
if True:
    taken = rule()
else:
    not_taken = rule()
if helper_flag() if False else PACKAGE_NAME:
    never = rule()
"#,
        );
        assert!(s.rules.contains_key("taken"));
        assert!(!s.rules.contains_key("not_taken"));
        assert!(!s.rules.contains_key("never"));
    }

    #[test]
    fn loops_over_concrete_lists() {
        let s = schema(
            r#"
ATTRS = {}
for kind in ["a", "b", "c"]:
    if kind == "b":
        continue
    ATTRS[kind] = attr.string()
r = rule(attrs = ATTRS)
"#,
        );
        let names: Vec<&String> = s.rules["r"].attrs.keys().collect();
        assert_eq!(names, vec!["a", "c", "name"]);
    }

    #[test]
    fn unknown_attribute_names_are_skipped() {
        let s = schema(
            r#"
load("//x:defs.bzl", "PREFIX")
r = rule(attrs = {
    PREFIX + "_src": attr.label(),
    PREFIX + "_hdr": attr.label(),
    "out": attr.output(),
})
other = rule(attrs = {"x": attr.int()})
"#,
        );
        let names: Vec<&String> = s.rules["r"].attrs.keys().collect();
        assert_eq!(names, vec!["name", "out"]);
        assert!(s.rules.contains_key("other"));
    }

    #[test]
    fn unknown_keys_stay_distinct() {
        let s = schema(
            r#"
load("//x:defs.bzl", "A", "B")
ATTRS = {A: attr.string(), B: attr.int()}
N = len(ATTRS)
if N == 2:
    two = rule()
"#,
        );
        assert!(s.rules.contains_key("two"));
    }

    #[test]
    fn bound_names_share_containers() {
        let s = schema(
            r#"
A = {}
B = A
B["x"] = attr.string()
B.update({"y": attr.int()})
C = B
C |= {"z": attr.bool()}
A = {"fresh": attr.string()}
C["w"] = attr.label()
shared = rule(attrs = B)
rebound = rule(attrs = A)
"#,
        );
        let shared: Vec<&String> = s.rules["shared"].attrs.keys().collect();
        assert_eq!(shared, vec!["name", "w", "x", "y", "z"]);
        let rebound: Vec<&String> = s.rules["rebound"].attrs.keys().collect();
        assert_eq!(rebound, vec!["fresh", "name"]);
    }

    #[test]
    fn copies_are_independent() {
        let s = schema(
            r#"
A = {"a": attr.string()}
B = dict(A)
B["b"] = attr.string()
C = A.copy()
C["c"] = attr.string()
r = rule(attrs = A)
"#,
        );
        let names: Vec<&String> = s.rules["r"].attrs.keys().collect();
        assert_eq!(names, vec!["a", "name"]);
    }

    #[test]
    fn oversized_integers_are_unknown() {
        let s = schema(
            r#"
MAX = 18446744073709551615
if MAX > 0:
    never = rule()
kept = rule(attrs = {"limit": attr.int(default = MAX)})
"#,
        );
        assert!(!s.rules.contains_key("never"));
        assert_eq!(s.rules["kept"].attrs["limit"], attr(AttrType::Integer, false));
    }

    #[test]
    fn rebinding_replaces_rule() {
        let s = schema("r = rule()\nr = 3\n");
        assert!(s.rules.is_empty());
    }

    #[test]
    fn undefined_name_is_fatal() {
        let e = eval_error("x = 1\ny = missing_symbol\n");
        assert_eq!(e.line, 2);
        assert!(e.message.contains("missing_symbol"), "{}", e.message);
    }

    #[test]
    fn unknown_attr_constructor_is_fatal() {
        let e = eval_error(r#"r = rule(attrs = {"x": attr.spaceship()})"#);
        assert!(e.message.contains("spaceship"), "{}", e.message);
    }

    #[test]
    fn non_descriptor_attribute_is_fatal() {
        let e = eval_error(r#"r = rule(attrs = {"x": 42})"#);
        assert!(e.message.contains("'x'"), "{}", e.message);
    }

    #[test]
    fn runtime_errors_are_fatal() {
        assert!(eval_error("x = 1 + 'a'").message.contains("unsupported operand"));
        assert!(eval_error("x = {}['k']").message.contains("not found"));
        assert!(eval_error("x = 1 // 0").message.contains("division by zero"));
        assert!(eval_error("x = 3()").message.contains("not callable"));
        assert!(eval_error("fail('bad config')").message.contains("bad config"));
        assert!(eval_error("return 1").message.contains("outside function"));
    }

    #[test]
    fn syntax_errors_surface_as_such() {
        assert!(matches!(
            recover("r = rule(", "bad.bzl"),
            Err(crate::error::ExtractError::Syntax(_))
        ));
    }

    #[test]
    fn floor_division_rounds_down() {
        assert_eq!(floor_div(-7, 2), Some(-4));
        assert_eq!(floor_mod(-7, 2), Some(1));
        assert_eq!(floor_mod(7, -2), Some(-1));
        assert_eq!(floor_div(i64::MIN, -1), None);
    }

    #[test]
    fn integer_arithmetic() {
        let s = schema(
            r#"
N = 7 // 2 * 2 - -1
if N == 7 and 7 % 3 == 1 and "a" in ["a"] and not "b" in {"a": 1}:
    ok = rule()
"#,
        );
        assert!(s.rules.contains_key("ok"));
    }
}
