//! Compile entry point: style sites of a unit become class name expressions and rules.

use std::sync::Arc;

use compiled_atomic_runtime::class_name::is_css_identifier;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;

use crate::ast::Span;
use crate::atomize::{Atomizer, CssVariable, RuleGroup};
use crate::cache::{CacheKey, RuleGroupCache};
use crate::compress::unused_entries;
use crate::config::CompileOptions;
use crate::errors::{CompileError, CompileWarning};
use crate::evaluate::{Evaluator, HelperRegistry, SourceRef};
use crate::input::{InputResolver, StyleInput};
use crate::module::{ModuleResolver, NoopResolver, SourceUnit, StyleSite};
use crate::parse::{block_from_entries, parse_css, Block};
use crate::sheet::{sort_atomic_style_sheet, SheetReport, StyleSheet};

/// Module the runtime helpers are imported from.
pub const RUNTIME_MODULE: &str = "@compiled/react/runtime";

/// Compiled form of one style site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteOutput {
  pub span: Span,
  /// Expression replacing the site in the transformed source.
  pub replacement: String,
  /// Class names applied unconditionally, in runtime form.
  pub class_names: Vec<String>,
  pub variables: Vec<CssVariable>,
  /// Rule texts the site needs inserted at runtime.
  pub rules: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
  pub transformed_source: String,
  pub emitted_rules: Vec<RuleGroup>,
  /// Self-contained CSS rule texts of the unit in stylesheet order.
  pub css_rules: Vec<String>,
  pub sites: Vec<SiteOutput>,
  pub errors: Vec<CompileError>,
  pub warnings: Vec<CompileWarning>,
}

impl CompileOutput {
  pub fn is_ok(&self) -> bool {
    self.errors.is_empty()
  }
}

/// Stylesheet aggregated from several compiled units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
  pub sheet: StyleSheet,
  pub css: String,
  pub report: SheetReport,
  /// Compression map keys no emitted rule used.
  pub unused_compression_entries: Vec<String>,
}

pub struct Compiler {
  options: CompileOptions,
  resolver: Arc<dyn ModuleResolver>,
  helpers: Arc<HelperRegistry>,
  cache: Option<Arc<RuleGroupCache>>,
}

impl Compiler {
  pub fn new(options: CompileOptions) -> Self {
    let cache = options.cache.then(|| Arc::new(RuleGroupCache::new()));
    Self {
      options,
      resolver: Arc::new(NoopResolver),
      helpers: Arc::new(HelperRegistry::standard()),
      cache,
    }
  }

  pub fn with_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
    self.resolver = resolver;
    self
  }

  pub fn with_helpers(mut self, helpers: Arc<HelperRegistry>) -> Self {
    self.helpers = helpers;
    self
  }

  /// Share a rule group cache with other compilers. Ignored when caching is disabled.
  pub fn with_cache(mut self, cache: Arc<RuleGroupCache>) -> Self {
    if self.options.cache {
      self.cache = Some(cache);
    }
    self
  }

  pub fn options(&self) -> &CompileOptions {
    &self.options
  }

  /// Compile one unit. A fatal error leaves the source unchanged and emits no rules.
  #[tracing::instrument(level = "debug", skip_all, fields(path = %unit.display_path()))]
  pub fn compile(&self, unit: &Arc<SourceUnit>) -> CompileOutput {
    let mut warnings = self.compression_warnings();

    match self.compile_unit(unit, &mut warnings) {
      Ok(mut output) => {
        output.warnings = warnings;
        tracing::debug!(
          sites = output.sites.len(),
          rules = output.css_rules.len(),
          "Compiled unit"
        );
        output
      }
      Err(error) => {
        tracing::debug!(%error, "Failed to compile unit");
        CompileOutput {
          transformed_source: unit.source.clone(),
          errors: vec![error],
          warnings,
          ..Default::default()
        }
      }
    }
  }

  /// Compile units in parallel. Outputs are in input order.
  #[tracing::instrument(level = "debug", skip_all, fields(units = units.len()))]
  pub fn compile_all(&self, units: &[Arc<SourceUnit>]) -> Vec<CompileOutput> {
    units.par_iter().map(|unit| self.compile(unit)).collect()
  }

  /// Merge the rules of compiled units into one stylesheet. Groups repeated across
  /// units are emitted once.
  #[tracing::instrument(level = "debug", skip_all)]
  pub fn extract(&self, outputs: &[CompileOutput]) -> Extraction {
    let sheet = sort_atomic_style_sheet(
      outputs.iter().flat_map(|output| &output.emitted_rules),
      &self.options.sort_options(),
    );
    let css = sheet.to_css(&self.options.render_options());
    let report = sheet.report();

    let unused_compression_entries = match &self.options.class_name_compression_map {
      Some(map) => unused_entries(
        map,
        sheet.rules().into_iter().map(|rule| rule.class_name.as_str()),
      ),
      None => Vec::new(),
    };
    if !unused_compression_entries.is_empty() {
      tracing::debug!(
        count = unused_compression_entries.len(),
        "Compression map entries were not used"
      );
    }

    Extraction {
      sheet,
      css,
      report,
      unused_compression_entries,
    }
  }

  fn compression_warnings(&self) -> Vec<CompileWarning> {
    self
      .options
      .class_name_compression_map
      .iter()
      .flat_map(|map| map.invalid_entries().iter().cloned())
      .map(CompileWarning::InvalidCompressionEntry)
      .collect()
  }

  fn compile_unit(
    &self,
    unit: &Arc<SourceUnit>,
    warnings: &mut Vec<CompileWarning>,
  ) -> Result<CompileOutput, CompileError> {
    let prefix = self.options.class_hash_prefix.as_deref();
    if let Some(prefix) = prefix {
      if !is_css_identifier(prefix) {
        return Err(CompileError::InvalidClassHashPrefix {
          prefix: prefix.to_string(),
        });
      }
    }

    let atomizer = Atomizer::new(prefix);
    let evaluator = Evaluator::new(self.resolver.as_ref(), &self.helpers);

    let mut sites = Vec::with_capacity(unit.style_sites.len());
    for site in &unit.style_sites {
      let mut resolver = InputResolver::new(evaluator, unit);
      let input = resolver.resolve(&site.input)?;
      for warning in resolver.into_warnings() {
        if !warnings.contains(&warning) {
          warnings.push(warning);
        }
      }

      let items = self.lower(input, &atomizer)?;
      sites.push((site, items));
    }

    let emitted_rules: Vec<RuleGroup> = sites
      .iter()
      .flat_map(|(_, items)| items.iter().flat_map(ClassItem::groups))
      .cloned()
      .collect();

    let render = self.options.render_options();
    let sheet = sort_atomic_style_sheet(&emitted_rules, &self.options.sort_options());
    let css_rules = sheet.rule_texts(&render);

    // Hoisted rule constants, `_0`, `_1`, ..., in stylesheet order.
    let hoisted: IndexMap<&str, usize> = css_rules
      .iter()
      .enumerate()
      .map(|(index, rule)| (rule.as_str(), index))
      .collect();

    let site_outputs: Vec<SiteOutput> = sites
      .iter()
      .map(|(site, items)| self.site_output(site, items, &hoisted))
      .collect();

    let transformed_source = self.transform_source(unit, &site_outputs, &css_rules);

    Ok(CompileOutput {
      transformed_source,
      emitted_rules,
      css_rules,
      sites: site_outputs,
      errors: Vec::new(),
      warnings: Vec::new(),
    })
  }

  /// Class items of a site. Adjacent static inputs of a list share one rule group so
  /// later declarations override earlier ones.
  fn lower(&self, input: StyleInput, atomizer: &Atomizer) -> Result<Vec<ClassItem>, CompileError> {
    let inputs = match input {
      StyleInput::List(inputs) => inputs,
      input => vec![input],
    };

    let mut items = Vec::new();
    let mut pending: Option<Block> = None;

    for input in inputs {
      match input {
        StyleInput::Object(entries) => {
          pending
            .get_or_insert_with(Block::new)
            .extend(block_from_entries(&entries)?);
        }
        StyleInput::RawText(raw) => {
          pending
            .get_or_insert_with(Block::new)
            .extend(parse_css(&raw.text, &raw.slots, raw.span)?);
        }
        other => {
          if let Some(block) = pending.take() {
            items.extend(self.group(&block, atomizer));
          }
          match other {
            StyleInput::List(_) => items.extend(self.lower(other, atomizer)?),
            StyleInput::Conditional {
              test,
              consequent,
              alternate,
            } => items.push(ClassItem::Conditional {
              test,
              consequent: self.lower(*consequent, atomizer)?,
              alternate: alternate
                .map(|alternate| self.lower(*alternate, atomizer))
                .transpose()?,
            }),
            StyleInput::Dynamic(source) => items.push(ClassItem::Passthrough(source)),
            StyleInput::Object(_) | StyleInput::RawText(_) => {}
          }
        }
      }
    }

    if let Some(block) = pending {
      items.extend(self.group(&block, atomizer));
    }
    Ok(items)
  }

  fn group(&self, block: &Block, atomizer: &Atomizer) -> Option<ClassItem> {
    if block.is_empty() {
      return None;
    }

    let group = match &self.cache {
      Some(cache) => cache.get_or_insert_with(
        CacheKey::new(
          self.options.cache_namespace.as_deref(),
          self.options.class_hash_prefix.as_deref(),
          block,
        ),
        || atomizer.atomize(block),
      ),
      None => atomizer.atomize(block),
    };

    (!group.is_empty()).then_some(ClassItem::Group(group))
  }

  fn site_output(
    &self,
    site: &StyleSite,
    items: &[ClassItem],
    hoisted: &IndexMap<&str, usize>,
  ) -> SiteOutput {
    let render = self.options.render_options();
    let compression = render.compression;

    let mut variables: IndexMap<&str, &CssVariable> = IndexMap::new();
    let mut rule_indices = Vec::new();
    for group in items.iter().flat_map(ClassItem::groups) {
      for variable in &group.variables {
        variables.insert(&variable.name, variable);
      }
      for rule in &group.rules {
        if let Some(&index) = hoisted.get(rule.to_css(&render).as_str()) {
          rule_indices.push(index);
        }
      }
    }
    rule_indices.sort_unstable();
    rule_indices.dedup();

    let class_names = items
      .iter()
      .filter_map(|item| match item {
        ClassItem::Group(group) => Some(group),
        _ => None,
      })
      .flat_map(|group| &group.rules)
      .map(|rule| rule.runtime_class(compression))
      .collect();

    let mut fields = vec![format!(
      "className: ax([{}])",
      items
        .iter()
        .map(|item| item.render(&render))
        .collect::<Vec<_>>()
        .join(", ")
    )];

    if !variables.is_empty() {
      let style = variables
        .values()
        .map(|variable| format!("{}: {}", js_string(&variable.name), ix_call(variable)))
        .collect::<Vec<_>>()
        .join(", ");
      fields.push(format!("style: {{ {style} }}"));
    }

    if !self.options.extract && !rule_indices.is_empty() {
      let sheets = rule_indices
        .iter()
        .map(|index| format!("_{index}"))
        .collect::<Vec<_>>()
        .join(", ");
      fields.push(format!("sheets: [{sheets}]"));
      if let Some(nonce) = &self.options.nonce {
        fields.push(format!("nonce: {}", js_string(nonce)));
      }
    }

    SiteOutput {
      span: site.span,
      replacement: format!("{{ {} }}", fields.join(", ")),
      class_names,
      variables: variables.into_values().cloned().collect(),
      rules: rule_indices
        .iter()
        .filter_map(|&index| hoisted.get_index(index).map(|(rule, _)| rule.to_string()))
        .collect(),
    }
  }

  fn transform_source(&self, unit: &SourceUnit, sites: &[SiteOutput], css_rules: &[String]) -> String {
    let mut header = String::new();
    if !sites.is_empty() {
      if self.options.import_framework_runtime {
        header.push_str(&format!("import {{ ax, ix }} from {};\n", js_string(RUNTIME_MODULE)));
      }
      if !self.options.extract {
        for (index, rule) in css_rules.iter().enumerate() {
          header.push_str(&format!("const _{index} = {};\n", js_string(rule)));
        }
      }
    }

    let mut ordered: Vec<&SiteOutput> = sites.iter().collect();
    ordered.sort_by_key(|site| site.span.lo);

    let source = &unit.source;
    let mut body = String::with_capacity(source.len());
    let mut last = 0usize;
    for site in ordered {
      let (lo, hi) = (site.span.lo as usize, site.span.hi as usize);
      if site.span.is_dummy() || lo < last || hi > source.len() || lo > hi {
        tracing::debug!(span = ?site.span, "Style site has no source location to replace");
        continue;
      }
      if !source.is_char_boundary(lo) || !source.is_char_boundary(hi) {
        continue;
      }
      body.push_str(&source[last..lo]);
      body.push_str(&site.replacement);
      last = hi;
    }
    body.push_str(&source[last..]);

    header + &body
  }
}

/// Compile `unit` with a fresh [`Compiler`].
pub fn compile(unit: &Arc<SourceUnit>, options: &CompileOptions) -> CompileOutput {
  Compiler::new(options.clone()).compile(unit)
}

#[derive(Debug, Clone)]
enum ClassItem {
  Group(RuleGroup),
  Conditional {
    test: SourceRef,
    consequent: Vec<ClassItem>,
    alternate: Option<Vec<ClassItem>>,
  },
  /// Runtime class names, kept as written.
  Passthrough(SourceRef),
}

impl ClassItem {
  fn groups(&self) -> Box<dyn Iterator<Item = &RuleGroup> + '_> {
    match self {
      ClassItem::Group(group) => Box::new(std::iter::once(group)),
      ClassItem::Conditional {
        consequent,
        alternate,
        ..
      } => Box::new(
        consequent
          .iter()
          .chain(alternate.iter().flatten())
          .flat_map(ClassItem::groups),
      ),
      ClassItem::Passthrough(_) => Box::new(std::iter::empty()),
    }
  }

  fn render(&self, render: &crate::sheet::RenderOptions) -> String {
    match self {
      ClassItem::Group(group) => js_string(&runtime_classes(group, render)),
      ClassItem::Conditional {
        test,
        consequent,
        alternate,
      } => {
        let test = parenthesize(&test.text);
        let consequent = render_branch(consequent, render);
        match alternate {
          Some(alternate) => format!("{test} ? {consequent} : {}", render_branch(alternate, render)),
          None => format!("{test} && {consequent}"),
        }
      }
      ClassItem::Passthrough(source) => source.text.clone(),
    }
  }
}

fn runtime_classes(group: &RuleGroup, render: &crate::sheet::RenderOptions) -> String {
  group
    .rules
    .iter()
    .map(|rule| rule.runtime_class(render.compression))
    .collect::<Vec<_>>()
    .join(" ")
}

/// A string literal when every item is static, otherwise a nested `ax` call.
fn render_branch(items: &[ClassItem], render: &crate::sheet::RenderOptions) -> String {
  let mut classes = Vec::new();
  for item in items {
    match item {
      ClassItem::Group(group) => classes.push(runtime_classes(group, render)),
      _ => {
        let inner = items
          .iter()
          .map(|item| item.render(render))
          .collect::<Vec<_>>()
          .join(", ");
        return format!("ax([{inner}])");
      }
    }
  }
  js_string(&classes.join(" "))
}

fn parenthesize(expression: &str) -> String {
  let simple = expression
    .chars()
    .all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '!'));
  if simple {
    expression.to_string()
  } else {
    format!("({expression})")
  }
}

fn ix_call(variable: &CssVariable) -> String {
  let expression = &variable.expression.text;
  match (variable.suffix.is_empty(), variable.prefix.is_empty()) {
    (true, true) => format!("ix({expression})"),
    (false, true) => format!("ix({expression}, {})", js_string(&variable.suffix)),
    _ => format!(
      "ix({expression}, {}, {})",
      js_string(&variable.suffix),
      js_string(&variable.prefix)
    ),
  }
}

fn js_string(value: &str) -> String {
  serde_json::Value::from(value).to_string()
}
