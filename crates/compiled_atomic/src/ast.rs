//! Minimal expression tree the compiler works on.
//!
//! Front-end parsers map their syntax trees into [`Node`] at the boundary, so the
//! evaluator and the style parser never see a third-party AST. The builder functions at
//! the bottom of this module construct trees directly, which is how tests and simple
//! hosts produce input.

use std::fmt::Write as _;

/// Byte range into the source of a [`crate::SourceUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub struct Span {
  pub lo: u32,
  pub hi: u32,
}

impl Span {
  /// Span of nodes that were not parsed from source.
  pub const DUMMY: Span = Span { lo: 0, hi: 0 };

  pub fn new(lo: u32, hi: u32) -> Self {
    Self { lo, hi }
  }

  pub fn is_dummy(&self) -> bool {
    self.lo == 0 && self.hi == 0
  }

  /// Span of the first occurrence of `needle` in `source`.
  pub fn find(source: &str, needle: &str) -> Option<Span> {
    let lo = source.find(needle)?;
    Some(Span::new(lo as u32, (lo + needle.len()) as u32))
  }

  /// The text covered by this span, if it lies within `source`.
  pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
    if self.is_dummy() || self.lo > self.hi {
      return None;
    }
    source.get(self.lo as usize..self.hi as usize)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
  pub kind: NodeKind,
  pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
  Str(String),
  Num(f64),
  Bool(bool),
  Null,
  Ident(String),
  Member {
    object: Box<Node>,
    property: MemberProp,
  },
  Call {
    callee: Box<Node>,
    args: Vec<Node>,
  },
  Binary {
    op: BinaryOp,
    left: Box<Node>,
    right: Box<Node>,
  },
  Unary {
    op: UnaryOp,
    arg: Box<Node>,
  },
  /// `quasis` always has one more element than `exprs`.
  Template {
    quasis: Vec<String>,
    exprs: Vec<Node>,
  },
  Object(Vec<ObjectProp>),
  Array(Vec<Node>),
  /// Arrow or function expression with a single expression body.
  Function {
    params: Vec<String>,
    body: Box<Node>,
  },
  Conditional {
    test: Box<Node>,
    consequent: Box<Node>,
    alternate: Box<Node>,
  },
  Logical {
    op: LogicalOp,
    left: Box<Node>,
    right: Box<Node>,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
  Named(String),
  Computed(Box<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectProp {
  KeyValue { key: PropKey, value: Node },
  Shorthand(String),
  Spread(Node),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
  Named(String),
  Computed(Node),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Rem,
  StrictEq,
  StrictNe,
}

impl BinaryOp {
  pub fn as_str(self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Rem => "%",
      BinaryOp::StrictEq => "===",
      BinaryOp::StrictNe => "!==",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Neg,
  Plus,
  Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
  And,
  Or,
  Nullish,
}

impl LogicalOp {
  pub fn as_str(self) -> &'static str {
    match self {
      LogicalOp::And => "&&",
      LogicalOp::Or => "||",
      LogicalOp::Nullish => "??",
    }
  }
}

impl Node {
  pub fn new(kind: NodeKind) -> Self {
    Self {
      kind,
      span: Span::DUMMY,
    }
  }

  pub fn with_span(mut self, span: Span) -> Self {
    self.span = span;
    self
  }

  /// Print the node back as JavaScript.
  pub fn to_source(&self) -> String {
    let mut out = String::new();
    print(self, &mut out);
    out
  }
}

fn print(node: &Node, out: &mut String) {
  match &node.kind {
    NodeKind::Str(value) => print_string(value, out),
    NodeKind::Num(value) => out.push_str(&crate::evaluate::number_to_string(*value)),
    NodeKind::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
    NodeKind::Null => out.push_str("null"),
    NodeKind::Ident(name) => out.push_str(name),
    NodeKind::Member { object, property } => {
      print_operand(object, out);
      match property {
        MemberProp::Named(name) => {
          out.push('.');
          out.push_str(name);
        }
        MemberProp::Computed(expr) => {
          out.push('[');
          print(expr, out);
          out.push(']');
        }
      }
    }
    NodeKind::Call { callee, args } => {
      print_operand(callee, out);
      out.push('(');
      print_list(args, out);
      out.push(')');
    }
    NodeKind::Binary { op, left, right } => {
      print_operand(left, out);
      let _ = write!(out, " {} ", op.as_str());
      print_operand(right, out);
    }
    NodeKind::Unary { op, arg } => {
      out.push(match op {
        UnaryOp::Neg => '-',
        UnaryOp::Plus => '+',
        UnaryOp::Not => '!',
      });
      print_operand(arg, out);
    }
    NodeKind::Template { quasis, exprs } => {
      out.push('`');
      for (index, quasi) in quasis.iter().enumerate() {
        out.push_str(&quasi.replace('`', "\\`"));
        if let Some(expr) = exprs.get(index) {
          out.push_str("${");
          print(expr, out);
          out.push('}');
        }
      }
      out.push('`');
    }
    NodeKind::Object(props) => {
      if props.is_empty() {
        out.push_str("{}");
        return;
      }
      out.push_str("{ ");
      for (index, prop) in props.iter().enumerate() {
        if index > 0 {
          out.push_str(", ");
        }
        match prop {
          ObjectProp::KeyValue { key, value } => {
            match key {
              PropKey::Named(name) if is_identifier(name) => out.push_str(name),
              PropKey::Named(name) => print_string(name, out),
              PropKey::Computed(expr) => {
                out.push('[');
                print(expr, out);
                out.push(']');
              }
            }
            out.push_str(": ");
            print(value, out);
          }
          ObjectProp::Shorthand(name) => out.push_str(name),
          ObjectProp::Spread(expr) => {
            out.push_str("...");
            print(expr, out);
          }
        }
      }
      out.push_str(" }");
    }
    NodeKind::Array(items) => {
      out.push('[');
      print_list(items, out);
      out.push(']');
    }
    NodeKind::Function { params, body } => {
      out.push('(');
      out.push_str(&params.join(", "));
      out.push_str(") => ");
      if matches!(body.kind, NodeKind::Object(_)) {
        out.push('(');
        print(body, out);
        out.push(')');
      } else {
        print(body, out);
      }
    }
    NodeKind::Conditional {
      test,
      consequent,
      alternate,
    } => {
      print_operand(test, out);
      out.push_str(" ? ");
      print_operand(consequent, out);
      out.push_str(" : ");
      print_operand(alternate, out);
    }
    NodeKind::Logical { op, left, right } => {
      print_operand(left, out);
      let _ = write!(out, " {} ", op.as_str());
      print_operand(right, out);
    }
  }
}

/// Parenthesize compound expressions used as operands.
fn print_operand(node: &Node, out: &mut String) {
  let compound = matches!(
    node.kind,
    NodeKind::Binary { .. }
      | NodeKind::Conditional { .. }
      | NodeKind::Logical { .. }
      | NodeKind::Function { .. }
  );
  if compound {
    out.push('(');
    print(node, out);
    out.push(')');
  } else {
    print(node, out);
  }
}

fn print_list(nodes: &[Node], out: &mut String) {
  for (index, node) in nodes.iter().enumerate() {
    if index > 0 {
      out.push_str(", ");
    }
    print(node, out);
  }
}

fn print_string(value: &str, out: &mut String) {
  // JSON string syntax is valid JavaScript.
  match serde_json::to_string(value) {
    Ok(quoted) => out.push_str(&quoted),
    Err(_) => {
      out.push('"');
      out.push_str(value);
      out.push('"');
    }
  }
}

fn is_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

pub fn str_lit(value: impl Into<String>) -> Node {
  Node::new(NodeKind::Str(value.into()))
}

pub fn num(value: f64) -> Node {
  Node::new(NodeKind::Num(value))
}

pub fn bool_lit(value: bool) -> Node {
  Node::new(NodeKind::Bool(value))
}

pub fn null() -> Node {
  Node::new(NodeKind::Null)
}

pub fn ident(name: impl Into<String>) -> Node {
  Node::new(NodeKind::Ident(name.into()))
}

pub fn member(object: Node, property: impl Into<String>) -> Node {
  Node::new(NodeKind::Member {
    object: Box::new(object),
    property: MemberProp::Named(property.into()),
  })
}

pub fn index(object: Node, property: Node) -> Node {
  Node::new(NodeKind::Member {
    object: Box::new(object),
    property: MemberProp::Computed(Box::new(property)),
  })
}

pub fn call(callee: Node, args: Vec<Node>) -> Node {
  Node::new(NodeKind::Call {
    callee: Box::new(callee),
    args,
  })
}

pub fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
  Node::new(NodeKind::Binary {
    op,
    left: Box::new(left),
    right: Box::new(right),
  })
}

pub fn unary(op: UnaryOp, arg: Node) -> Node {
  Node::new(NodeKind::Unary {
    op,
    arg: Box::new(arg),
  })
}

pub fn logical(op: LogicalOp, left: Node, right: Node) -> Node {
  Node::new(NodeKind::Logical {
    op,
    left: Box::new(left),
    right: Box::new(right),
  })
}

pub fn conditional(test: Node, consequent: Node, alternate: Node) -> Node {
  Node::new(NodeKind::Conditional {
    test: Box::new(test),
    consequent: Box::new(consequent),
    alternate: Box::new(alternate),
  })
}

/// Template literal from its string pieces and the expressions between them.
pub fn template(quasis: &[&str], exprs: Vec<Node>) -> Node {
  Node::new(NodeKind::Template {
    quasis: quasis.iter().map(|quasi| quasi.to_string()).collect(),
    exprs,
  })
}

pub fn object(props: Vec<ObjectProp>) -> Node {
  Node::new(NodeKind::Object(props))
}

pub fn array(items: Vec<Node>) -> Node {
  Node::new(NodeKind::Array(items))
}

pub fn arrow(params: &[&str], body: Node) -> Node {
  Node::new(NodeKind::Function {
    params: params.iter().map(|param| param.to_string()).collect(),
    body: Box::new(body),
  })
}

pub fn prop(key: impl Into<String>, value: Node) -> ObjectProp {
  ObjectProp::KeyValue {
    key: PropKey::Named(key.into()),
    value,
  }
}

pub fn computed_prop(key: Node, value: Node) -> ObjectProp {
  ObjectProp::KeyValue {
    key: PropKey::Computed(key),
    value,
  }
}

pub fn shorthand(name: impl Into<String>) -> ObjectProp {
  ObjectProp::Shorthand(name.into())
}

pub fn spread(expr: Node) -> ObjectProp {
  ObjectProp::Spread(expr)
}
