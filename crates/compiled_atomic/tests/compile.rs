use std::io::Write;
use std::sync::Arc;

use compiled_atomic::ast::*;
use compiled_atomic::{
  compile, CompileError, CompileOptions, CompileOutput, CompileWarning, Compiler, HelperRegistry,
  ImportKind, MemoryModuleGraph, RuleGroupCache, SourceUnit, Value,
};
use compiled_atomic_runtime::{ax, DocumentContext, MemoryDocument, SheetOptions, StyleSheetManager};
use pretty_assertions::assert_eq;

fn extract_options() -> CompileOptions {
  CompileOptions {
    extract: true,
    import_framework_runtime: false,
    ..CompileOptions::default()
  }
}

fn site(path: &str, input: Node) -> Arc<SourceUnit> {
  Arc::new(SourceUnit::new(path, "css(STYLES)").with_style_site_at("STYLES", input))
}

fn classes(output: &CompileOutput) -> Vec<String> {
  output
    .emitted_rules
    .iter()
    .flat_map(|group| group.class_names())
    .map(str::to_string)
    .collect()
}

#[test]
fn class_names_and_rules_are_deterministic() {
  let input = || {
    object(vec![
      prop("color", str_lit("red")),
      prop("fontSize", num(12.0)),
      prop(
        "@media (min-width: 30rem)",
        object(vec![prop(":hover", object(vec![prop("userSelect", str_lit("none"))]))]),
      ),
    ])
  };

  let first = compile(&site("src/a.tsx", input()), &CompileOptions::default());
  let second = Compiler::new(CompileOptions::default()).compile(&site("src/a.tsx", input()));

  assert!(first.is_ok());
  assert_eq!(first, second);
  let class_names = classes(&first);
  assert_eq!(class_names[0], "_syaz5scu");
  assert_eq!(class_names[1], "_1wyb1fwx");
}

#[test]
fn hover_follows_link_regardless_of_source_order() {
  let input = object(vec![
    prop(":hover", object(vec![prop("color", str_lit("blue"))])),
    prop(":link", object(vec![prop("color", str_lit("green"))])),
    prop(":active", object(vec![prop("color", str_lit("red"))])),
  ]);
  let compiler = Compiler::new(extract_options());
  let extraction = compiler.extract(&[compiler.compile(&site("src/a.tsx", input))]);

  let lines: Vec<&str> = extraction.css.lines().collect();
  assert_eq!(lines.len(), 3);
  assert!(lines[0].contains(":link{"));
  assert!(lines[1].contains(":hover{"));
  assert!(lines[2].contains(":active{"));
}

#[test]
fn column_rule_spellings_share_a_class() {
  let a = compile(
    &site("src/a.tsx", object(vec![prop("columnRule", str_lit("thick inset blue"))])),
    &extract_options(),
  );
  let b = compile(
    &site("src/b.tsx", template(&["column-rule: blue inset thick;"], vec![])),
    &extract_options(),
  );

  assert_eq!(classes(&a), classes(&b));
}

#[test]
fn same_style_in_two_files_is_extracted_once() {
  let input = || object(vec![prop("display", str_lit("block")), prop("color", str_lit("red"))]);
  let compiler = Compiler::new(extract_options());
  let outputs = compiler.compile_all(&[site("src/a.tsx", input()), site("src/b.tsx", input())]);
  let extraction = compiler.extract(&outputs);

  assert_eq!(classes(&outputs[0]), classes(&outputs[1]));
  assert_eq!(extraction.report.total_rules, 2);
  assert_eq!(extraction.css.lines().count(), 2);
}

#[test]
fn quoted_whitespace_survives_in_both_input_forms() {
  let text = compile(
    &site("src/a.tsx", template(&["content:  \"a   b\" ;"], vec![])),
    &extract_options(),
  );
  let object_form = compile(
    &site("src/b.tsx", object(vec![prop("content", str_lit("\"a   b\""))])),
    &extract_options(),
  );

  assert_eq!(classes(&text), classes(&object_form));
  assert_eq!(text.emitted_rules[0].rules[0].value, "\"a   b\"");
  assert_eq!(text.css_rules, object_form.css_rules);
}

#[test]
fn orphan_pseudo_selectors_attach_to_the_element() {
  let with_self = compile(
    &site("src/a.tsx", object(vec![prop("&:hover", object(vec![prop("color", str_lit("red"))]))])),
    &extract_options(),
  );
  let orphan = compile(
    &site("src/b.tsx", object(vec![prop(":hover", object(vec![prop("color", str_lit("red"))]))])),
    &extract_options(),
  );

  assert_eq!(classes(&with_self), classes(&orphan));
  assert_eq!(with_self.css_rules, orphan.css_rules);
}

#[test]
fn later_group_wins_between_static_and_dynamic_values() {
  let input = array(vec![
    object(vec![prop("color", str_lit("red"))]),
    logical(
      LogicalOp::And,
      ident("isActive"),
      object(vec![prop("color", member(ident("props"), "color"))]),
    ),
  ]);
  let output = compile(&site("src/a.tsx", input), &extract_options());

  let static_class = output.emitted_rules[0].class_list();
  let dynamic_class = output.emitted_rules[1].class_list();
  assert_eq!(&static_class[..5], &dynamic_class[..5]);

  assert_eq!(ax([static_class.as_str(), dynamic_class.as_str()]), dynamic_class);
  assert_eq!(ax([dynamic_class.as_str(), static_class.as_str()]), static_class);
  assert_eq!(
    output.sites[0].replacement,
    format!(
      "{{ className: ax([\"{static_class}\", isActive && \"{dynamic_class}\"]), style: {{ \"{}\": ix(props.color) }} }}",
      output.sites[0].variables[0].name
    )
  );
}

#[test]
fn each_dynamic_group_keeps_its_own_expression() {
  let input = array(vec![
    object(vec![prop("color", member(ident("props"), "base"))]),
    logical(
      LogicalOp::And,
      ident("isActive"),
      object(vec![prop("color", member(ident("props"), "active"))]),
    ),
  ]);
  let output = compile(&site("src/a.tsx", input), &extract_options());

  let variables = &output.sites[0].variables;
  assert_eq!(variables.len(), 2);
  assert_eq!(variables[0].expression.text, "props.base");
  assert_eq!(variables[1].expression.text, "props.active");
  assert_ne!(variables[0].name, variables[1].name);

  let base_class = output.emitted_rules[0].class_list();
  let active_class = output.emitted_rules[1].class_list();
  assert_ne!(base_class, active_class);
  assert_eq!(&base_class[..5], &active_class[..5]);
  assert_eq!(
    output.sites[0].replacement,
    format!(
      "{{ className: ax([\"{base_class}\", isActive && \"{active_class}\"]), style: {{ \"{}\": ix(props.base), \"{}\": ix(props.active) }} }}",
      variables[0].name, variables[1].name
    )
  );
}

#[test]
fn overridden_dynamic_value_sets_no_variable() {
  let input = object(vec![
    prop("width", member(ident("props"), "w")),
    prop("width", str_lit("10px")),
  ]);
  let output = compile(&site("src/a.tsx", input), &extract_options());

  assert!(output.sites[0].variables.is_empty());
  assert_eq!(
    output.sites[0].replacement,
    format!("{{ className: ax([\"{}\"]) }}", output.emitted_rules[0].class_list())
  );
}

#[test]
fn compression_map_from_options_file() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  write!(
    file,
    r#"{{
      "extract": true,
      "importFrameworkRuntime": false,
      "classNameCompressionMap": {{ "syaz5scu": "a", "1e0c1ule": "b", "bogus": "c" }}
    }}"#
  )
  .unwrap();

  let options = CompileOptions::from_path(file.path()).unwrap();
  let compiler = Compiler::new(options);
  let output = compiler.compile(&site("src/a.tsx", object(vec![prop("color", str_lit("red"))])));
  let extraction = compiler.extract(std::slice::from_ref(&output));

  assert_eq!(output.sites[0].class_names, vec!["_syaz_a"]);
  assert_eq!(ax(["_syaz_a"]), "a");
  assert_eq!(extraction.css, ".a{color:red}");
  assert_eq!(extraction.unused_compression_entries, vec!["1e0c1ule"]);
  assert!(matches!(
    output.warnings.as_slice(),
    [CompileWarning::InvalidCompressionEntry(entry)] if entry.key == "bogus"
  ));
}

#[test]
fn imported_constants_compile_statically() {
  let mut graph = MemoryModuleGraph::new();
  graph.insert(
    SourceUnit::new("/src/tokens.ts", "")
      .with_export_const("colors", object(vec![prop("primary", str_lit("blue"))])),
  );
  let unit = Arc::new(
    SourceUnit::new("/src/button.tsx", "css(STYLES)")
      .with_import("colors", ImportKind::Named("colors".into()), "./tokens")
      .with_style_site_at(
        "STYLES",
        object(vec![prop("color", member(ident("colors"), "primary"))]),
      ),
  );

  let output = Compiler::new(extract_options())
    .with_resolver(Arc::new(graph))
    .compile(&unit);

  assert!(output.warnings.is_empty());
  assert_eq!(classes(&output), vec!["_syaz13q2"]);
  assert!(output.sites[0].variables.is_empty());
}

#[test]
fn registered_helpers_run_at_compile_time() {
  let mut helpers = HelperRegistry::standard();
  helpers.register("token", |args| match args.first() {
    Some(Value::Str(name)) if name == "color.text" => Some(Value::Str("blue".into())),
    _ => None,
  });
  let input = object(vec![prop(
    "color",
    call(ident("token"), vec![str_lit("color.text")]),
  )]);

  let output = Compiler::new(extract_options())
    .with_helpers(Arc::new(helpers))
    .compile(&site("src/a.tsx", input));

  assert_eq!(classes(&output), vec!["_syaz13q2"]);
  assert!(output.sites[0].variables.is_empty());
}

#[test]
fn compilers_share_a_rule_group_cache() {
  let input = || object(vec![prop("color", str_lit("red"))]);
  let cache = Arc::new(RuleGroupCache::new());

  let first = Compiler::new(extract_options()).with_cache(cache.clone());
  let second = Compiler::new(extract_options()).with_cache(cache.clone());
  let a = first.compile(&site("src/a.tsx", input()));
  let b = second.compile(&site("src/b.tsx", input()));

  assert_eq!(classes(&a), classes(&b));
  assert_eq!(cache.len(), 1);

  let uncached = Compiler::new(CompileOptions {
    cache: false,
    ..extract_options()
  })
  .with_cache(cache.clone());
  uncached.compile(&site("src/c.tsx", object(vec![prop("color", str_lit("blue"))])));
  assert_eq!(cache.len(), 1);
}

#[test]
fn syntax_errors_abort_the_unit() {
  let source = "css(STYLES)";
  let unit = Arc::new(
    SourceUnit::new("src/a.tsx", source)
      .with_style_site_at("STYLES", template(&["color: red;\n  font-size 12px;"], vec![])),
  );
  let output = compile(&unit, &CompileOptions::default());

  assert_eq!(output.transformed_source, source);
  assert!(output.emitted_rules.is_empty());
  assert!(matches!(
    output.errors.as_slice(),
    [CompileError::Syntax { line: 2, .. }]
  ));
}

#[test]
fn emitted_rules_insert_once_at_runtime() {
  let output = compile(
    &site("src/a.tsx", object(vec![prop("color", str_lit("red")), prop("fontSize", num(12.0))])),
    &CompileOptions::default(),
  );

  let document = DocumentContext::new();
  let mut sheet =
    StyleSheetManager::new(&document, MemoryDocument::new(), SheetOptions::default()).unwrap();
  assert_eq!(sheet.ensure_inserted(&output.css_rules).unwrap(), 2);
  assert_eq!(sheet.ensure_inserted(&output.sites[0].rules).unwrap(), 0);
  assert_eq!(
    sheet.into_target().css_text(),
    "._syaz5scu{color:red}._1wyb1fwx{font-size:12px}"
  );
}
