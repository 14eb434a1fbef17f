use compiled_atomic_runtime::{
  Bucket, DocumentContext, InsertionPoint, MemoryDocument, SheetOptions, StyleSheetManager,
  StylesheetInsertionState,
};
use pretty_assertions::assert_eq;

const RULES: [&str; 3] = [
  "._syaz5scu{color:red}",
  "._1wyb1fwx{font-size:12px}",
  "._180hglyw:hover{user-select:none}",
];

fn server_render() -> String {
  let document = DocumentContext::new();
  let mut sheet = StyleSheetManager::new(
    &document,
    MemoryDocument::new(),
    SheetOptions {
      nonce: Some("n0nce".into()),
    },
  )
  .unwrap();

  sheet.ensure_inserted(RULES).unwrap();
  sheet.into_target().to_html()
}

#[test]
fn server_output_is_grouped_by_bucket() {
  let html = server_render();

  assert_eq!(
    html,
    concat!(
      "<style data-cmpld=\"c\" nonce=\"n0nce\">._syaz5scu{color:red}._1wyb1fwx{font-size:12px}</style>",
      "<style data-cmpld=\"h\" nonce=\"n0nce\">._180hglyw:hover{user-select:none}</style>",
    )
  );
}

#[test]
fn hydrated_client_does_not_insert_server_rules_again() {
  let html = server_render();
  let state = StylesheetInsertionState::from_server_html(&html).unwrap();
  assert_eq!(state.len(), 3);

  let document = DocumentContext::new();
  let mut sheet =
    StyleSheetManager::hydrate(&document, MemoryDocument::new(), SheetOptions::default(), state)
      .unwrap();

  assert_eq!(sheet.ensure_inserted(RULES).unwrap(), 0);
  assert_eq!(
    sheet
      .ensure_inserted(["._syaz13q2{color:blue}", "._syaz5scu{color:red}"])
      .unwrap(),
    1
  );
  assert_eq!(sheet.target().css_text(), "._syaz13q2{color:blue}");
}

#[test]
fn at_rule_buckets_survive_server_rendering() {
  let document = DocumentContext::new();
  let mut server =
    StyleSheetManager::new(&document, MemoryDocument::new(), SheetOptions::default()).unwrap();
  server
    .ensure_inserted([
      "@media (min-width:500px){._a:hover{color:red}}",
      "@media (min-width:500px){._b:link{color:blue}}",
    ])
    .unwrap();
  let html = server.into_target().to_html();

  assert_eq!(
    html,
    concat!(
      "<style data-cmpld=\"ml\">@media (min-width:500px){._b:link{color:blue}}</style>",
      "<style data-cmpld=\"mh\">@media (min-width:500px){._a:hover{color:red}}</style>",
    )
  );

  let state = StylesheetInsertionState::from_server_html(&html).unwrap();
  let mut client =
    StyleSheetManager::hydrate(&document, MemoryDocument::new(), SheetOptions::default(), state)
      .unwrap();
  assert_eq!(
    client
      .ensure_inserted(["@media (min-width:500px){._b:link{color:blue}}"])
      .unwrap(),
    0
  );
  assert!(client.target().elements().is_empty());
  assert!(!client.state().has_insertion_point(InsertionPoint::new(true, Bucket::Link)));
}

#[test]
fn late_buckets_still_land_in_priority_order() {
  let document = DocumentContext::new();
  let mut sheet =
    StyleSheetManager::new(&document, MemoryDocument::new(), SheetOptions::default()).unwrap();

  sheet.ensure_inserted(["._a:active{color:red}"]).unwrap();
  sheet.ensure_inserted(["._b:focus{color:red}"]).unwrap();
  sheet.ensure_inserted(["._c:visited{color:red}"]).unwrap();
  sheet.ensure_inserted(["._d:focus-visible{color:red}"]).unwrap();

  let buckets: Vec<Bucket> = sheet
    .target()
    .elements()
    .iter()
    .map(|element| element.point.bucket)
    .collect();

  assert_eq!(
    buckets,
    vec![
      Bucket::Visited,
      Bucket::Focus,
      Bucket::FocusVisible,
      Bucket::Active
    ]
  );
}
