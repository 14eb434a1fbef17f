//! Static evaluation of style expressions.
//!
//! Reduces expression trees to constants where every input is known at build time:
//! literals, arithmetic, templates, object and array literals, member access on known
//! values, calls to local or imported single-expression functions and calls to
//! allowlisted pure helpers. Anything else is reported as [`Evaluated::Dynamic`] with
//! the reason, and becomes a CSS custom property set at render time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::ast::{
  BinaryOp, LogicalOp, MemberProp, Node, NodeKind, ObjectProp, PropKey, Span, UnaryOp,
};
use crate::module::{Export, ImportKind, ModuleResolver, SourceUnit};

/// Bound on nested binding lookups and function calls. Stops binding cycles and
/// pathological expansion.
pub const MAX_EVALUATION_DEPTH: usize = 16;

pub type Scope = IndexMap<String, Value>;

/// A constant produced by the evaluator.
#[derive(Clone)]
pub enum Value {
  Undefined,
  Null,
  Bool(bool),
  Num(f64),
  Str(String),
  Array(Vec<Value>),
  Object(IndexMap<String, Value>),
  Function(Arc<Closure>),
  Module(Arc<SourceUnit>),
}

pub struct Closure {
  pub params: Vec<String>,
  pub body: Node,
  pub module: Arc<SourceUnit>,
  pub scope: Scope,
}

impl fmt::Debug for Closure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Closure")
      .field("params", &self.params)
      .field("module", &self.module.path)
      .finish()
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Undefined => f.write_str("Undefined"),
      Value::Null => f.write_str("Null"),
      Value::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
      Value::Num(value) => f.debug_tuple("Num").field(value).finish(),
      Value::Str(value) => f.debug_tuple("Str").field(value).finish(),
      Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
      Value::Object(map) => f.debug_tuple("Object").field(map).finish(),
      Value::Function(closure) => f.debug_tuple("Function").field(closure).finish(),
      Value::Module(unit) => f.debug_tuple("Module").field(&unit.path).finish(),
    }
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Num(a), Value::Num(b)) => a == b,
      (Value::Str(a), Value::Str(b)) => a == b,
      (Value::Array(a), Value::Array(b)) => a == b,
      (Value::Object(a), Value::Object(b)) => a == b,
      (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
      (Value::Module(a), Value::Module(b)) => a.path == b.path,
      _ => false,
    }
  }
}

impl Value {
  pub fn str(value: impl Into<String>) -> Self {
    Value::Str(value.into())
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      Value::Undefined => "undefined",
      Value::Null => "null",
      Value::Bool(_) => "boolean",
      Value::Num(_) => "number",
      Value::Str(_) => "string",
      Value::Array(_) => "array",
      Value::Object(_) => "object",
      Value::Function(_) => "function",
      Value::Module(_) => "module",
    }
  }

  pub fn is_truthy(&self) -> bool {
    match self {
      Value::Undefined | Value::Null => false,
      Value::Bool(value) => *value,
      Value::Num(value) => *value != 0.0 && !value.is_nan(),
      Value::Str(value) => !value.is_empty(),
      _ => true,
    }
  }

  pub fn is_nullish(&self) -> bool {
    matches!(self, Value::Undefined | Value::Null)
  }

  /// String conversion of primitives and arrays of primitives, as `String(value)` does.
  pub fn to_js_string(&self) -> Option<String> {
    match self {
      Value::Undefined => Some("undefined".into()),
      Value::Null => Some("null".into()),
      Value::Bool(value) => Some(value.to_string()),
      Value::Num(value) => Some(number_to_string(*value)),
      Value::Str(value) => Some(value.clone()),
      Value::Array(items) => items
        .iter()
        .map(|item| match item {
          Value::Undefined | Value::Null => Some(String::new()),
          other => other.to_js_string(),
        })
        .collect::<Option<Vec<_>>>()
        .map(|parts| parts.join(",")),
      _ => None,
    }
  }
}

/// Format a number the way JavaScript prints it for integral and plain decimal values.
pub fn number_to_string(value: f64) -> String {
  if value.is_nan() {
    "NaN".into()
  } else if value.is_infinite() {
    let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
    text.into()
  } else if value == 0.0 {
    "0".into()
  } else if value.fract() == 0.0 {
    format!("{value:.0}")
  } else {
    format!("{value}")
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DynamicReason {
  UnboundIdentifier(String),
  UnresolvedImport { specifier: String, local: String },
  UnknownCall,
  RuntimeArgument,
  ComputedKey,
  NonObjectMember,
  DepthExceeded,
  Unsupported(&'static str),
}

impl fmt::Display for DynamicReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DynamicReason::UnboundIdentifier(name) => write!(f, "`{name}` is not statically known"),
      DynamicReason::UnresolvedImport { specifier, local } => {
        write!(f, "`{local}` could not be resolved from `{specifier}`")
      }
      DynamicReason::UnknownCall => f.write_str("call to an unknown function"),
      DynamicReason::RuntimeArgument => f.write_str("call with a runtime argument"),
      DynamicReason::ComputedKey => f.write_str("computed key is not constant"),
      DynamicReason::NonObjectMember => f.write_str("member access on a non-object value"),
      DynamicReason::DepthExceeded => f.write_str("evaluation depth exceeded"),
      DynamicReason::Unsupported(what) => write!(f, "unsupported expression: {what}"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
  Constant(Value),
  Dynamic(DynamicReason),
}

impl From<Result<Value, DynamicReason>> for Evaluated {
  fn from(result: Result<Value, DynamicReason>) -> Self {
    match result {
      Ok(value) => Evaluated::Constant(value),
      Err(reason) => Evaluated::Dynamic(reason),
    }
  }
}

/// Location and text of an expression left for the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceRef {
  pub span: Span,
  pub text: String,
}

impl SourceRef {
  pub fn of(node: &Node, unit: &SourceUnit) -> Self {
    let text = node
      .span
      .slice(&unit.source)
      .map(str::to_string)
      .unwrap_or_else(|| node.to_source());

    Self {
      span: node.span,
      text,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DynamicRef {
  pub source: SourceRef,
  /// Interpolation ordinal within the style site.
  pub slot: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StyleExpression {
  Constant(Value),
  Dynamic(DynamicRef),
}

pub type Helper = Arc<dyn Fn(&[Value]) -> Option<Value> + Send + Sync>;

/// Allowlist of pure functions the evaluator may call with constant arguments.
///
/// Keys are `"<specifier>:<export>"` for imported helpers and plain names such as
/// `"Math.max"` for globals.
#[derive(Clone, Default)]
pub struct HelperRegistry {
  helpers: HashMap<String, Helper>,
}

impl fmt::Debug for HelperRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut keys: Vec<&String> = self.helpers.keys().collect();
    keys.sort();
    f.debug_struct("HelperRegistry").field("helpers", &keys).finish()
  }
}

impl HelperRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry with the pure `Math` and `String` globals.
  pub fn standard() -> Self {
    let mut registry = Self::new();
    registry.register("Math.max", |args| fold_numbers(args, f64::NEG_INFINITY, f64::max));
    registry.register("Math.min", |args| fold_numbers(args, f64::INFINITY, f64::min));
    registry.register("Math.round", |args| unary_number(args, |n| (n + 0.5).floor()));
    registry.register("Math.floor", |args| unary_number(args, f64::floor));
    registry.register("Math.ceil", |args| unary_number(args, f64::ceil));
    registry.register("Math.abs", |args| unary_number(args, f64::abs));
    registry.register("String", |args| {
      args
        .first()
        .unwrap_or(&Value::Str(String::new()))
        .to_js_string()
        .map(Value::Str)
    });
    registry
  }

  pub fn register<F>(&mut self, key: impl Into<String>, helper: F) -> &mut Self
  where
    F: Fn(&[Value]) -> Option<Value> + Send + Sync + 'static,
  {
    self.helpers.insert(key.into(), Arc::new(helper));
    self
  }

  pub fn get(&self, key: &str) -> Option<&Helper> {
    self.helpers.get(key)
  }
}

fn fold_numbers(args: &[Value], init: f64, f: fn(f64, f64) -> f64) -> Option<Value> {
  args
    .iter()
    .try_fold(init, |acc, arg| match arg {
      Value::Num(n) => Some(f(acc, *n)),
      _ => None,
    })
    .map(Value::Num)
}

fn unary_number(args: &[Value], f: fn(f64) -> f64) -> Option<Value> {
  match args.first() {
    Some(Value::Num(n)) => Some(Value::Num(f(*n))),
    _ => None,
  }
}

struct Frame<'f> {
  module: &'f Arc<SourceUnit>,
  scope: &'f Scope,
}

type EvalResult = Result<Value, DynamicReason>;

/// Evaluates expression trees against a unit's bindings, its imports (through the
/// resolver) and the helper allowlist.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
  resolver: &'a dyn ModuleResolver,
  helpers: &'a HelperRegistry,
}

impl<'a> Evaluator<'a> {
  pub fn new(resolver: &'a dyn ModuleResolver, helpers: &'a HelperRegistry) -> Self {
    Self { resolver, helpers }
  }

  pub fn evaluate(&self, node: &Node, unit: &Arc<SourceUnit>) -> Evaluated {
    let scope = Scope::new();
    self.eval(node, &Frame { module: unit, scope: &scope }, 0).into()
  }

  /// Evaluate a style leaf, keeping a reference to the source when it is dynamic.
  pub fn evaluate_style_expression(
    &self,
    node: &Node,
    unit: &Arc<SourceUnit>,
    slot: usize,
  ) -> StyleExpression {
    match self.evaluate(node, unit) {
      Evaluated::Constant(value) => StyleExpression::Constant(value),
      Evaluated::Dynamic(reason) => {
        tracing::trace!(%reason, slot, "Style value is dynamic");
        StyleExpression::Dynamic(DynamicRef {
          source: SourceRef::of(node, unit),
          slot,
        })
      }
    }
  }

  fn eval(&self, node: &Node, frame: &Frame<'_>, depth: usize) -> EvalResult {
    if depth > MAX_EVALUATION_DEPTH {
      return Err(DynamicReason::DepthExceeded);
    }

    match &node.kind {
      NodeKind::Str(value) => Ok(Value::Str(value.clone())),
      NodeKind::Num(value) => Ok(Value::Num(*value)),
      NodeKind::Bool(value) => Ok(Value::Bool(*value)),
      NodeKind::Null => Ok(Value::Null),
      NodeKind::Ident(name) => self.resolve_ident(name, frame, depth),
      NodeKind::Member { object, property } => {
        let object = self.eval(object, frame, depth)?;
        let key = self.property_key(property, frame, depth)?;
        self.member(object, &key, depth)
      }
      NodeKind::Call { callee, args } => self.call(callee, args, frame, depth),
      NodeKind::Binary { op, left, right } => {
        let left = self.eval(left, frame, depth)?;
        let right = self.eval(right, frame, depth)?;
        binary_op(*op, &left, &right)
      }
      NodeKind::Unary { op, arg } => {
        let arg = self.eval(arg, frame, depth)?;
        match (op, arg) {
          (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
          (UnaryOp::Neg, Value::Num(n)) => Ok(Value::Num(-n)),
          (UnaryOp::Plus, Value::Num(n)) => Ok(Value::Num(n)),
          (UnaryOp::Plus, Value::Str(s)) => Ok(Value::Num(s.trim().parse().unwrap_or(f64::NAN))),
          _ => Err(DynamicReason::Unsupported("unary operator on a non-number")),
        }
      }
      NodeKind::Template { quasis, exprs } => {
        let mut out = String::new();
        for (index, quasi) in quasis.iter().enumerate() {
          out.push_str(quasi);
          if let Some(expr) = exprs.get(index) {
            let value = self.eval(expr, frame, depth)?;
            let text = value
              .to_js_string()
              .ok_or(DynamicReason::Unsupported("object inside a template"))?;
            out.push_str(&text);
          }
        }
        Ok(Value::Str(out))
      }
      NodeKind::Object(props) => {
        let mut map = IndexMap::new();
        for prop in props {
          match prop {
            ObjectProp::KeyValue { key, value } => {
              let key = match key {
                PropKey::Named(name) => name.clone(),
                PropKey::Computed(expr) => key_string(self.eval(expr, frame, depth)?)?,
              };
              map.insert(key, self.eval(value, frame, depth)?);
            }
            ObjectProp::Shorthand(name) => {
              map.insert(name.clone(), self.resolve_ident(name, frame, depth)?);
            }
            ObjectProp::Spread(expr) => match self.eval(expr, frame, depth)? {
              Value::Object(spread) => map.extend(spread),
              Value::Undefined | Value::Null => {}
              _ => return Err(DynamicReason::Unsupported("spread of a non-object")),
            },
          }
        }
        Ok(Value::Object(map))
      }
      NodeKind::Array(items) => items
        .iter()
        .map(|item| self.eval(item, frame, depth))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array),
      NodeKind::Function { params, body } => Ok(Value::Function(Arc::new(Closure {
        params: params.clone(),
        body: (**body).clone(),
        module: frame.module.clone(),
        scope: frame.scope.clone(),
      }))),
      NodeKind::Conditional {
        test,
        consequent,
        alternate,
      } => {
        if self.eval(test, frame, depth)?.is_truthy() {
          self.eval(consequent, frame, depth)
        } else {
          self.eval(alternate, frame, depth)
        }
      }
      NodeKind::Logical { op, left, right } => {
        let left = self.eval(left, frame, depth)?;
        let take_left = match op {
          LogicalOp::And => !left.is_truthy(),
          LogicalOp::Or => left.is_truthy(),
          LogicalOp::Nullish => !left.is_nullish(),
        };
        if take_left {
          Ok(left)
        } else {
          self.eval(right, frame, depth)
        }
      }
    }
  }

  fn resolve_ident(&self, name: &str, frame: &Frame<'_>, depth: usize) -> EvalResult {
    if let Some(value) = frame.scope.get(name) {
      return Ok(value.clone());
    }

    let module = frame.module;
    if let Some(init) = module.bindings.get(name) {
      let scope = Scope::new();
      return self.eval(init, &Frame { module, scope: &scope }, depth + 1);
    }

    if let Some(import) = module.import(name) {
      let Some(target) = self.resolver.resolve(module, &import.source) else {
        tracing::debug!(
          specifier = %import.source,
          local = %import.local,
          "Unresolvable import, treating as dynamic"
        );
        return Err(DynamicReason::UnresolvedImport {
          specifier: import.source.clone(),
          local: import.local.clone(),
        });
      };

      return match &import.kind {
        ImportKind::Named(imported) => self.export_value(&target, imported, depth + 1),
        ImportKind::Default => self.export_value(&target, "default", depth + 1),
        ImportKind::Namespace => Ok(Value::Module(target)),
      };
    }

    match name {
      "undefined" => Ok(Value::Undefined),
      "NaN" => Ok(Value::Num(f64::NAN)),
      "Infinity" => Ok(Value::Num(f64::INFINITY)),
      _ => Err(DynamicReason::UnboundIdentifier(name.to_string())),
    }
  }

  fn export_value(&self, unit: &Arc<SourceUnit>, name: &str, depth: usize) -> EvalResult {
    if depth > MAX_EVALUATION_DEPTH {
      return Err(DynamicReason::DepthExceeded);
    }

    let scope = Scope::new();
    let frame = Frame {
      module: unit,
      scope: &scope,
    };

    for export in &unit.exports {
      match export {
        Export::Local { exported, local } if exported == name => {
          return self.resolve_ident(local, &frame, depth + 1);
        }
        Export::ReExport {
          exported,
          imported,
          source,
        } if exported == name => {
          let target = self.resolve_module(unit, source, name)?;
          return self.export_value(&target, imported, depth + 1);
        }
        _ => {}
      }
    }

    for export in &unit.exports {
      if let Export::All { source } = export {
        let target = self.resolve_module(unit, source, name)?;
        if let Ok(value) = self.export_value(&target, name, depth + 1) {
          return Ok(value);
        }
      }
    }

    Err(DynamicReason::UnresolvedImport {
      specifier: unit.display_path(),
      local: name.to_string(),
    })
  }

  fn resolve_module(
    &self,
    from: &SourceUnit,
    specifier: &str,
    name: &str,
  ) -> Result<Arc<SourceUnit>, DynamicReason> {
    self
      .resolver
      .resolve(from, specifier)
      .ok_or_else(|| DynamicReason::UnresolvedImport {
        specifier: specifier.to_string(),
        local: name.to_string(),
      })
  }

  fn property_key(&self, property: &MemberProp, frame: &Frame<'_>, depth: usize) -> Result<String, DynamicReason> {
    match property {
      MemberProp::Named(name) => Ok(name.clone()),
      MemberProp::Computed(expr) => match self.eval(expr, frame, depth) {
        Ok(value) => key_string(value),
        Err(DynamicReason::UnresolvedImport { specifier, local }) => {
          Err(DynamicReason::UnresolvedImport { specifier, local })
        }
        Err(_) => Err(DynamicReason::ComputedKey),
      },
    }
  }

  fn member(&self, object: Value, key: &str, depth: usize) -> EvalResult {
    match object {
      Value::Object(mut map) => Ok(map.swap_remove(key).unwrap_or(Value::Undefined)),
      Value::Array(items) => {
        if key == "length" {
          return Ok(Value::Num(items.len() as f64));
        }
        match key.parse::<usize>() {
          Ok(index) => Ok(items.into_iter().nth(index).unwrap_or(Value::Undefined)),
          Err(_) => Err(DynamicReason::Unsupported("array method")),
        }
      }
      Value::Str(value) if key == "length" => Ok(Value::Num(value.encode_utf16().count() as f64)),
      Value::Module(unit) => self.export_value(&unit, key, depth + 1),
      _ => Err(DynamicReason::NonObjectMember),
    }
  }

  fn call(&self, callee: &Node, args: &[Node], frame: &Frame<'_>, depth: usize) -> EvalResult {
    if let Some(helper) = self
      .helper_key(callee, frame)
      .and_then(|key| self.helpers.get(&key))
    {
      let args = self.eval_args(args, frame, depth)?;
      return helper(&args).ok_or(DynamicReason::UnknownCall);
    }

    let closure = match self.eval(callee, frame, depth) {
      Ok(Value::Function(closure)) => closure,
      Err(reason @ DynamicReason::UnresolvedImport { .. }) => return Err(reason),
      Err(DynamicReason::DepthExceeded) => return Err(DynamicReason::DepthExceeded),
      _ => return Err(DynamicReason::UnknownCall),
    };

    let args = self.eval_args(args, frame, depth)?;
    let mut scope = closure.scope.clone();
    for (index, param) in closure.params.iter().enumerate() {
      scope.insert(
        param.clone(),
        args.get(index).cloned().unwrap_or(Value::Undefined),
      );
    }

    self.eval(
      &closure.body,
      &Frame {
        module: &closure.module,
        scope: &scope,
      },
      depth + 1,
    )
  }

  fn eval_args(&self, args: &[Node], frame: &Frame<'_>, depth: usize) -> Result<Vec<Value>, DynamicReason> {
    args
      .iter()
      .map(|arg| {
        self.eval(arg, frame, depth).map_err(|reason| match reason {
          DynamicReason::UnresolvedImport { .. } => reason,
          _ => DynamicReason::RuntimeArgument,
        })
      })
      .collect()
  }

  /// Registry key of a callee that is not shadowed by a local binding.
  fn helper_key(&self, callee: &Node, frame: &Frame<'_>) -> Option<String> {
    let is_local = |name: &str| frame.scope.contains_key(name) || frame.module.bindings.contains_key(name);

    match &callee.kind {
      NodeKind::Ident(name) if !is_local(name) => match frame.module.import(name) {
        Some(import) => match &import.kind {
          ImportKind::Named(imported) => Some(format!("{}:{}", import.source, imported)),
          ImportKind::Default => Some(format!("{}:default", import.source)),
          ImportKind::Namespace => None,
        },
        None => Some(name.clone()),
      },
      NodeKind::Member {
        object,
        property: MemberProp::Named(property),
      } => match &object.kind {
        NodeKind::Ident(name) if !is_local(name) => match frame.module.import(name) {
          Some(import) if import.kind == ImportKind::Namespace => {
            Some(format!("{}:{}", import.source, property))
          }
          Some(_) => None,
          None => Some(format!("{name}.{property}")),
        },
        _ => None,
      },
      _ => None,
    }
  }
}

fn key_string(value: Value) -> Result<String, DynamicReason> {
  match value {
    Value::Str(key) => Ok(key),
    Value::Num(n) => Ok(number_to_string(n)),
    _ => Err(DynamicReason::ComputedKey),
  }
}

fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
  match op {
    BinaryOp::Add => match (left, right) {
      (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
      (Value::Str(_), _) | (_, Value::Str(_)) => {
        let concat = left
          .to_js_string()
          .zip(right.to_js_string())
          .map(|(a, b)| a + &b)
          .ok_or(DynamicReason::Unsupported("string concatenation with an object"))?;
        Ok(Value::Str(concat))
      }
      _ => Err(DynamicReason::Unsupported("addition of non-numbers")),
    },
    BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
      let (Value::Num(a), Value::Num(b)) = (left, right) else {
        return Err(DynamicReason::Unsupported("arithmetic on non-numbers"));
      };
      Ok(Value::Num(match op {
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => a % b,
      }))
    }
    BinaryOp::StrictEq | BinaryOp::StrictNe => {
      let equal = match (left, right) {
        (Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Module(_), _)
        | (_, Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Module(_)) => {
          return Err(DynamicReason::Unsupported("identity comparison"));
        }
        _ => left == right,
      };
      Ok(Value::Bool(if op == BinaryOp::StrictEq {
        equal
      } else {
        !equal
      }))
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::ast::*;
  use crate::module::{MemoryModuleGraph, NoopResolver};

  fn eval_in(unit: SourceUnit, node: Node) -> Evaluated {
    let helpers = HelperRegistry::standard();
    Evaluator::new(&NoopResolver, &helpers).evaluate(&node, &Arc::new(unit))
  }

  fn eval(node: Node) -> Evaluated {
    eval_in(SourceUnit::default(), node)
  }

  fn constant(value: Value) -> Evaluated {
    Evaluated::Constant(value)
  }

  #[test]
  fn literals_and_arithmetic() {
    assert_eq!(eval(binary(BinaryOp::Mul, num(4.0), num(2.0))), constant(Value::Num(8.0)));
    assert_eq!(
      eval(binary(BinaryOp::Add, num(8.0), str_lit("px"))),
      constant(Value::str("8px"))
    );
    assert_eq!(eval(unary(UnaryOp::Neg, num(2.0))), constant(Value::Num(-2.0)));
    assert_eq!(eval(unary(UnaryOp::Not, str_lit(""))), constant(Value::Bool(true)));
    assert_eq!(
      eval(binary(BinaryOp::StrictEq, str_lit("a"), str_lit("a"))),
      constant(Value::Bool(true))
    );
    assert_eq!(eval(ident("undefined")), constant(Value::Undefined));
  }

  #[test]
  fn formats_numbers_like_javascript() {
    assert_eq!(number_to_string(12.0), "12");
    assert_eq!(number_to_string(-0.0), "0");
    assert_eq!(number_to_string(1.5), "1.5");
    assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
    assert_eq!(number_to_string(f64::NAN), "NaN");
  }

  #[test]
  fn local_bindings_and_templates() {
    let unit = SourceUnit::default()
      .with_const("gutter", num(8.0))
      .with_const(
        "spacing",
        template(&["", "px ", "px"], vec![ident("gutter"), binary(BinaryOp::Mul, ident("gutter"), num(2.0))]),
      );

    assert_eq!(eval_in(unit, ident("spacing")), constant(Value::str("8px 16px")));
  }

  #[test]
  fn member_access_on_known_objects() {
    let unit = SourceUnit::default().with_const(
      "colors",
      object(vec![
        prop("primary", str_lit("blue")),
        prop("list", array(vec![str_lit("red"), str_lit("green")])),
      ]),
    );

    assert_eq!(
      eval_in(unit.clone(), member(ident("colors"), "primary")),
      constant(Value::str("blue"))
    );
    assert_eq!(
      eval_in(unit.clone(), index(member(ident("colors"), "list"), num(1.0))),
      constant(Value::str("green"))
    );
    assert_eq!(
      eval_in(unit.clone(), member(ident("colors"), "missing")),
      constant(Value::Undefined)
    );
    assert_eq!(
      eval_in(unit, index(ident("colors"), ident("key"))),
      Evaluated::Dynamic(DynamicReason::ComputedKey)
    );
  }

  #[test]
  fn runtime_values_are_dynamic() {
    assert_eq!(
      eval(member(ident("props"), "color")),
      Evaluated::Dynamic(DynamicReason::UnboundIdentifier("props".into()))
    );
    assert_eq!(
      eval(call(ident("unknown"), vec![])),
      Evaluated::Dynamic(DynamicReason::UnknownCall)
    );
    assert_eq!(
      eval(member(num(1.0), "x")),
      Evaluated::Dynamic(DynamicReason::NonObjectMember)
    );
  }

  #[test]
  fn calls_local_functions() {
    let unit = SourceUnit::default()
      .with_const("grid", num(8.0))
      .with_const(
        "space",
        arrow(&["n"], template(&["", "px"], vec![binary(BinaryOp::Mul, ident("n"), ident("grid"))])),
      );

    assert_eq!(
      eval_in(unit.clone(), call(ident("space"), vec![num(2.0)])),
      constant(Value::str("16px"))
    );
    assert_eq!(
      eval_in(unit, call(ident("space"), vec![member(ident("props"), "n")])),
      Evaluated::Dynamic(DynamicReason::RuntimeArgument)
    );
  }

  #[test]
  fn closures_capture_parameters() {
    let unit = SourceUnit::default().with_const(
      "scale",
      arrow(&["factor"], arrow(&["n"], binary(BinaryOp::Mul, ident("n"), ident("factor")))),
    );
    let node = call(call(ident("scale"), vec![num(4.0)]), vec![num(3.0)]);
    assert_eq!(eval_in(unit, node), constant(Value::Num(12.0)));
  }

  #[test]
  fn cycles_hit_the_depth_limit() {
    let unit = SourceUnit::default()
      .with_const("a", ident("b"))
      .with_const("b", ident("a"));
    assert_eq!(eval_in(unit, ident("a")), Evaluated::Dynamic(DynamicReason::DepthExceeded));

    let unit = SourceUnit::default().with_const(
      "forever",
      arrow(&["n"], call(ident("forever"), vec![ident("n")])),
    );
    assert_eq!(
      eval_in(unit, call(ident("forever"), vec![num(1.0)])),
      Evaluated::Dynamic(DynamicReason::DepthExceeded)
    );
  }

  #[test]
  fn conditionals_and_logical_operators() {
    let unit = SourceUnit::default().with_const("dark", bool_lit(false));
    assert_eq!(
      eval_in(unit.clone(), conditional(ident("dark"), str_lit("white"), str_lit("black"))),
      constant(Value::str("black"))
    );
    assert_eq!(
      eval_in(unit.clone(), logical(LogicalOp::And, ident("dark"), str_lit("x"))),
      constant(Value::Bool(false))
    );
    assert_eq!(
      eval_in(unit, logical(LogicalOp::Nullish, null(), str_lit("fallback"))),
      constant(Value::str("fallback"))
    );
  }

  #[test]
  fn object_spreads_and_shorthands() {
    let unit = SourceUnit::default()
      .with_const("base", object(vec![prop("color", str_lit("red")), prop("margin", num(0.0))]))
      .with_const("color", str_lit("blue"));

    let node = object(vec![spread(ident("base")), shorthand("color")]);
    let Evaluated::Constant(Value::Object(map)) = eval_in(unit, node) else {
      panic!("expected an object");
    };
    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["color", "margin"]);
    assert_eq!(map["color"], Value::str("blue"));
  }

  #[test]
  fn follows_imports_and_reexports() {
    let mut graph = MemoryModuleGraph::new();
    graph.insert(
      SourceUnit::new("/src/tokens/colors.ts", "")
        .with_export_const("primary", str_lit("#0052cc"))
        .with_export_const("shade", arrow(&["c"], template(&["", "99"], vec![ident("c")]))),
    );
    graph.insert(
      SourceUnit::new("/src/tokens/index.ts", "")
        .with_export(Export::ReExport {
          exported: "brand".into(),
          imported: "primary".into(),
          source: "./colors".into(),
        })
        .with_export(Export::All {
          source: "./colors".into(),
        }),
    );

    let unit = Arc::new(
      SourceUnit::new("/src/button.tsx", "")
        .with_import("brand", ImportKind::Named("brand".into()), "./tokens")
        .with_import("tokens", ImportKind::Namespace, "./tokens/colors")
        .with_import("shade", ImportKind::Named("shade".into()), "./tokens")
        .with_import("missing", ImportKind::Named("x".into()), "./nowhere"),
    );

    let helpers = HelperRegistry::new();
    let evaluator = Evaluator::new(&graph, &helpers);

    assert_eq!(evaluator.evaluate(&ident("brand"), &unit), constant(Value::str("#0052cc")));
    assert_eq!(
      evaluator.evaluate(&member(ident("tokens"), "primary"), &unit),
      constant(Value::str("#0052cc"))
    );
    assert_eq!(
      evaluator.evaluate(&call(ident("shade"), vec![ident("brand")]), &unit),
      constant(Value::str("#0052cc99"))
    );
    assert_eq!(
      evaluator.evaluate(&ident("missing"), &unit),
      Evaluated::Dynamic(DynamicReason::UnresolvedImport {
        specifier: "./nowhere".into(),
        local: "missing".into(),
      })
    );
  }

  #[test]
  fn allowlisted_helpers() {
    let mut helpers = HelperRegistry::standard();
    helpers.register("@design/tokens:token", |args| match args {
      [Value::Str(name)] if name == "color.text" => Some(Value::str("#172b4d")),
      _ => None,
    });

    let unit = Arc::new(
      SourceUnit::default().with_import("token", ImportKind::Named("token".into()), "@design/tokens"),
    );
    let evaluator = Evaluator::new(&NoopResolver, &helpers);

    assert_eq!(
      evaluator.evaluate(&call(ident("token"), vec![str_lit("color.text")]), &unit),
      constant(Value::str("#172b4d"))
    );
    assert_eq!(
      evaluator.evaluate(&call(member(ident("Math"), "max"), vec![num(1.0), num(4.0)]), &unit),
      constant(Value::Num(4.0))
    );
    assert_eq!(
      evaluator.evaluate(&call(ident("token"), vec![ident("runtime")]), &unit),
      Evaluated::Dynamic(DynamicReason::RuntimeArgument)
    );
  }

  #[test]
  fn dynamic_style_expressions_keep_source() {
    let unit = Arc::new(SourceUnit::new("/a.tsx", "const x = props.width;"));
    let node = member(ident("props"), "width").with_span(Span::new(10, 21));
    let helpers = HelperRegistry::new();

    let expression = Evaluator::new(&NoopResolver, &helpers).evaluate_style_expression(&node, &unit, 3);
    assert_eq!(
      expression,
      StyleExpression::Dynamic(DynamicRef {
        source: SourceRef {
          span: Span::new(10, 21),
          text: "props.width".into(),
        },
        slot: 3,
      })
    );
  }
}
