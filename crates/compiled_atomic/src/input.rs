//! Style inputs.
//!
//! A style site can be an object literal, CSS text, a list mixing both, a conditional
//! choosing between styles, or a runtime expression producing class names. Each shape is
//! one [`StyleInput`] arm, resolved from the expression tree by [`InputResolver`].

use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::{LogicalOp, Node, NodeKind, ObjectProp, PropKey, Span};
use crate::errors::{CompileError, CompileWarning};
use crate::evaluate::{
  DynamicReason, DynamicRef, Evaluated, Evaluator, SourceRef, Value, MAX_EVALUATION_DEPTH,
};
use crate::module::SourceUnit;
use crate::parse::{format_scalar, is_selector_key, property_name, slot_placeholder, ValuePart};

#[derive(Debug, Clone, PartialEq)]
pub enum StyleInput {
  Object(Vec<StyleEntry>),
  RawText(RawCss),
  List(Vec<StyleInput>),
  Conditional {
    test: SourceRef,
    consequent: Box<StyleInput>,
    alternate: Option<Box<StyleInput>>,
  },
  /// Runtime class names passed through unchanged.
  Dynamic(SourceRef),
}

impl StyleInput {
  pub fn empty() -> Self {
    StyleInput::List(Vec::new())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleEntry {
  pub key: String,
  pub span: Span,
  pub value: EntryValue,
}

impl StyleEntry {
  pub fn scalar(key: impl Into<String>, value: Value) -> Self {
    Self {
      key: key.into(),
      span: Span::DUMMY,
      value: EntryValue::Scalar(value),
    }
  }

  pub fn block(key: impl Into<String>, entries: Vec<StyleEntry>) -> Self {
    Self {
      key: key.into(),
      span: Span::DUMMY,
      value: EntryValue::Block(entries),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryValue {
  Block(Vec<StyleEntry>),
  Scalar(Value),
  /// Value text with runtime interpolations.
  Interpolated(Vec<ValuePart>),
}

/// CSS text whose dynamic interpolations are replaced by slot placeholders indexing
/// into `slots`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCss {
  pub text: String,
  pub slots: Vec<DynamicRef>,
  pub span: Span,
}

/// Turns the expression of a style site into a [`StyleInput`].
pub struct InputResolver<'a> {
  evaluator: Evaluator<'a>,
  unit: &'a Arc<SourceUnit>,
  next_slot: usize,
  warnings: Vec<CompileWarning>,
}

impl<'a> InputResolver<'a> {
  pub fn new(evaluator: Evaluator<'a>, unit: &'a Arc<SourceUnit>) -> Self {
    Self {
      evaluator,
      unit,
      next_slot: 0,
      warnings: Vec::new(),
    }
  }

  pub fn into_warnings(self) -> Vec<CompileWarning> {
    self.warnings
  }

  pub fn resolve(&mut self, node: &Node) -> Result<StyleInput, CompileError> {
    self.resolve_input(node, 0)
  }

  fn resolve_input(&mut self, node: &Node, depth: usize) -> Result<StyleInput, CompileError> {
    match &node.kind {
      NodeKind::Object(props) => Ok(StyleInput::Object(self.entries(props, depth)?)),
      NodeKind::Template { quasis, exprs } => {
        Ok(StyleInput::RawText(self.raw_css(quasis, exprs, node.span)?))
      }
      NodeKind::Array(items) => items
        .iter()
        .map(|item| self.resolve_input(item, depth))
        .collect::<Result<Vec<_>, _>>()
        .map(StyleInput::List),
      NodeKind::Conditional {
        test,
        consequent,
        alternate,
      } => match self.evaluator.evaluate(test, self.unit) {
        Evaluated::Constant(value) if value.is_truthy() => self.resolve_input(consequent, depth),
        Evaluated::Constant(_) => self.resolve_input(alternate, depth),
        Evaluated::Dynamic(reason) => {
          self.note_dynamic(&reason, test.span);
          Ok(StyleInput::Conditional {
            test: SourceRef::of(test, self.unit),
            consequent: Box::new(self.resolve_input(consequent, depth)?),
            alternate: Some(Box::new(self.resolve_input(alternate, depth)?)),
          })
        }
      },
      NodeKind::Logical {
        op: LogicalOp::And,
        left,
        right,
      } => match self.evaluator.evaluate(left, self.unit) {
        Evaluated::Constant(value) if value.is_truthy() => self.resolve_input(right, depth),
        Evaluated::Constant(_) => Ok(StyleInput::empty()),
        Evaluated::Dynamic(reason) => {
          self.note_dynamic(&reason, left.span);
          Ok(StyleInput::Conditional {
            test: SourceRef::of(left, self.unit),
            consequent: Box::new(self.resolve_input(right, depth)?),
            alternate: None,
          })
        }
      },
      NodeKind::Ident(name) if depth < MAX_EVALUATION_DEPTH => match self.local_style(name) {
        Some(init) => self.resolve_input(&init, depth + 1),
        None => self.evaluated_input(node),
      },
      _ => self.evaluated_input(node),
    }
  }

  /// Local bindings initialized with object or template literals are resolved
  /// structurally so that runtime values inside them become CSS variables.
  fn local_style(&self, name: &str) -> Option<Node> {
    self
      .unit
      .bindings
      .get(name)
      .filter(|init| matches!(init.kind, NodeKind::Object(_) | NodeKind::Template { .. }))
      .cloned()
  }

  fn evaluated_input(&mut self, node: &Node) -> Result<StyleInput, CompileError> {
    match self.evaluator.evaluate(node, self.unit) {
      Evaluated::Constant(value) => input_from_value(value, node.span),
      Evaluated::Dynamic(reason) => {
        self.note_dynamic(&reason, node.span);
        Ok(StyleInput::Dynamic(SourceRef::of(node, self.unit)))
      }
    }
  }

  fn entries(&mut self, props: &[ObjectProp], depth: usize) -> Result<Vec<StyleEntry>, CompileError> {
    let mut entries = Vec::new();

    for prop in props {
      match prop {
        ObjectProp::KeyValue { key, value } => {
          let key = self.key(key, value.span)?;
          let value = self.entry_value(value, depth)?;
          entries.push(StyleEntry {
            key,
            span: value_span(prop),
            value,
          });
        }
        ObjectProp::Shorthand(name) => {
          let value = self.entry_value(&Node::new(NodeKind::Ident(name.clone())), depth)?;
          entries.push(StyleEntry {
            key: name.clone(),
            span: Span::DUMMY,
            value,
          });
        }
        ObjectProp::Spread(expr) => entries.extend(self.spread(expr, depth)?),
      }
    }

    Ok(entries)
  }

  fn key(&self, key: &PropKey, span: Span) -> Result<String, CompileError> {
    let expr = match key {
      PropKey::Named(name) => return Ok(name.clone()),
      PropKey::Computed(expr) => expr,
    };
    let span = if expr.span.is_dummy() { span } else { expr.span };

    match self.evaluator.evaluate(expr, self.unit) {
      Evaluated::Constant(Value::Str(key)) => Ok(key),
      Evaluated::Constant(Value::Num(n)) => Ok(crate::evaluate::number_to_string(n)),
      Evaluated::Dynamic(DynamicReason::UnresolvedImport { specifier, local }) => {
        Err(CompileError::UnresolvableImport {
          specifier,
          local,
          span,
        })
      }
      _ => Err(CompileError::DynamicSelectorKey { span }),
    }
  }

  fn spread(&mut self, expr: &Node, depth: usize) -> Result<Vec<StyleEntry>, CompileError> {
    if let NodeKind::Object(props) = &expr.kind {
      return self.entries(props, depth);
    }
    if let NodeKind::Ident(name) = &expr.kind {
      if depth < MAX_EVALUATION_DEPTH {
        if let Some(Node {
          kind: NodeKind::Object(props),
          ..
        }) = self.local_style(name)
        {
          return self.entries(&props, depth + 1);
        }
      }
    }

    match self.evaluator.evaluate(expr, self.unit) {
      Evaluated::Constant(Value::Object(map)) => Ok(entries_from_map(map)),
      Evaluated::Constant(Value::Undefined | Value::Null | Value::Bool(false)) => Ok(Vec::new()),
      Evaluated::Constant(other) => Err(CompileError::unsupported(
        format!("cannot spread a {} into styles", other.type_name()),
        expr.span,
      )),
      Evaluated::Dynamic(reason) => Err(CompileError::unsupported(
        format!("cannot spread a runtime value into styles ({reason})"),
        expr.span,
      )),
    }
  }

  fn entry_value(&mut self, node: &Node, depth: usize) -> Result<EntryValue, CompileError> {
    match &node.kind {
      NodeKind::Object(props) => return Ok(EntryValue::Block(self.entries(props, depth)?)),
      NodeKind::Template { quasis, exprs } => return self.template_value(quasis, exprs),
      _ => {}
    }

    match self.evaluator.evaluate(node, self.unit) {
      Evaluated::Constant(Value::Object(map)) => Ok(EntryValue::Block(entries_from_map(map))),
      Evaluated::Constant(Value::Function(_)) => Ok(EntryValue::Interpolated(vec![
        ValuePart::Dynamic(self.dynamic_ref(node)),
      ])),
      Evaluated::Constant(value) => Ok(EntryValue::Scalar(value)),
      Evaluated::Dynamic(reason) => {
        self.note_dynamic(&reason, node.span);
        Ok(EntryValue::Interpolated(vec![ValuePart::Dynamic(
          self.dynamic_ref(node),
        )]))
      }
    }
  }

  fn template_value(&mut self, quasis: &[String], exprs: &[Node]) -> Result<EntryValue, CompileError> {
    let mut parts: Vec<ValuePart> = Vec::new();
    let mut text = String::new();

    for (index, quasi) in quasis.iter().enumerate() {
      text.push_str(quasi);
      let Some(expr) = exprs.get(index) else {
        continue;
      };

      match self.evaluator.evaluate(expr, self.unit) {
        Evaluated::Constant(value) => match value.to_js_string() {
          Some(piece) => text.push_str(&piece),
          None => {
            return Err(CompileError::unsupported(
              format!("cannot interpolate a {} into a value", value.type_name()),
              expr.span,
            ))
          }
        },
        Evaluated::Dynamic(reason) => {
          self.note_dynamic(&reason, expr.span);
          if !text.is_empty() {
            parts.push(ValuePart::Text(std::mem::take(&mut text)));
          }
          parts.push(ValuePart::Dynamic(self.dynamic_ref(expr)));
        }
      }
    }

    if parts.is_empty() {
      return Ok(EntryValue::Scalar(Value::Str(text)));
    }
    if !text.is_empty() {
      parts.push(ValuePart::Text(text));
    }
    Ok(EntryValue::Interpolated(parts))
  }

  fn raw_css(&mut self, quasis: &[String], exprs: &[Node], span: Span) -> Result<RawCss, CompileError> {
    let mut text = String::new();
    let mut slots = Vec::new();

    for (index, quasi) in quasis.iter().enumerate() {
      text.push_str(quasi);
      let Some(expr) = exprs.get(index) else {
        continue;
      };

      match self.evaluator.evaluate(expr, self.unit) {
        Evaluated::Constant(Value::Object(map)) => text.push_str(&object_to_css(&map, expr.span)?),
        Evaluated::Constant(Value::Undefined | Value::Null | Value::Bool(false)) => {}
        Evaluated::Constant(Value::Function(_)) => {
          text.push_str(&slot_placeholder(slots.len()));
          slots.push(self.dynamic_ref(expr));
        }
        Evaluated::Constant(value) => match value.to_js_string() {
          Some(piece) => text.push_str(&piece),
          None => {
            return Err(CompileError::unsupported(
              format!("cannot interpolate a {} into CSS", value.type_name()),
              expr.span,
            ))
          }
        },
        Evaluated::Dynamic(reason) => {
          self.note_dynamic(&reason, expr.span);
          text.push_str(&slot_placeholder(slots.len()));
          slots.push(self.dynamic_ref(expr));
        }
      }
    }

    Ok(RawCss { text, slots, span })
  }

  fn dynamic_ref(&mut self, node: &Node) -> DynamicRef {
    let slot = self.next_slot;
    self.next_slot += 1;
    DynamicRef {
      source: SourceRef::of(node, self.unit),
      slot,
    }
  }

  fn note_dynamic(&mut self, reason: &DynamicReason, span: Span) {
    if let DynamicReason::UnresolvedImport { specifier, local } = reason {
      let warning = CompileWarning::DegradedImport {
        specifier: specifier.clone(),
        local: local.clone(),
        span,
      };
      if !self.warnings.contains(&warning) {
        self.warnings.push(warning);
      }
    }
  }
}

fn value_span(prop: &ObjectProp) -> Span {
  match prop {
    ObjectProp::KeyValue { value, .. } => value.span,
    ObjectProp::Spread(expr) => expr.span,
    ObjectProp::Shorthand(_) => Span::DUMMY,
  }
}

fn input_from_value(value: Value, span: Span) -> Result<StyleInput, CompileError> {
  match value {
    Value::Object(map) => Ok(StyleInput::Object(entries_from_map(map))),
    Value::Str(text) => Ok(StyleInput::RawText(RawCss {
      text,
      slots: Vec::new(),
      span,
    })),
    Value::Array(items) => items
      .into_iter()
      .map(|item| input_from_value(item, span))
      .collect::<Result<Vec<_>, _>>()
      .map(StyleInput::List),
    Value::Undefined | Value::Null | Value::Bool(false) => Ok(StyleInput::empty()),
    other => Err(CompileError::unsupported(
      format!("a {} is not a valid style", other.type_name()),
      span,
    )),
  }
}

fn entries_from_map(map: IndexMap<String, Value>) -> Vec<StyleEntry> {
  map
    .into_iter()
    .map(|(key, value)| match value {
      Value::Object(children) => StyleEntry::block(key, entries_from_map(children)),
      value => StyleEntry::scalar(key, value),
    })
    .collect()
}

/// CSS text of a constant style object interpolated into a template.
fn object_to_css(map: &IndexMap<String, Value>, span: Span) -> Result<String, CompileError> {
  let mut css = String::new();

  for (key, value) in map {
    match value {
      Value::Object(children) => {
        css.push_str(key);
        css.push('{');
        css.push_str(&object_to_css(children, span)?);
        css.push('}');
      }
      _ if key.starts_with('@') || is_selector_key(key) => {
        return Err(CompileError::unsupported(
          format!("`{key}` needs an object value"),
          span,
        ));
      }
      value => {
        let property = property_name(key);
        let text = format_scalar(&property, value)
          .map_err(|message| CompileError::unsupported(format!("{message} (`{key}`)"), span))?;
        if let Some(text) = text {
          css.push_str(&format!("{property}:{text};"));
        }
      }
    }
  }

  Ok(css)
}
