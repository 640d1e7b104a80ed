use std::collections::BTreeMap;

use proptest::prelude::*;
use yamlet_node::{Node, NodeKind, Style};
use yamlet_parse::{EventHandler, Mark};
use yamlet_parse::resolver::is_null;

use super::*;

fn floats(values: [f64; 3]) -> Node {
    Node::from(values)
}

fn flow(node: Node) -> Node {
    node.set_style(Style::Flow);
    node
}

#[test]
fn flow_sequence() {
    yamlet_testhelpers::init_tracing();
    let node = flow(floats([1.01, 2.01, 3.01]));
    assert_eq!(to_string(&node), "[1.01, 2.01, 3.01]");
}

#[test]
fn flow_and_block_sequences_nested() {
    let root = Node::with_kind(NodeKind::Sequence);
    root.push_back(flow(floats([1.01, 2.01, 3.01]))).unwrap();
    root.push_back(floats([4.01, 5.01, 6.01])).unwrap();
    insta::assert_snapshot!(to_string(&root), @r"
    - [1.01, 2.01, 3.01]
    -
      - 4.01
      - 5.01
      - 6.01
    ");
}

#[test]
fn block_sequence_under_a_key() {
    let root = Node::new();
    root.insert("position", floats([1.01, 2.01, 3.01])).unwrap();
    insta::assert_snapshot!(to_string(&root), @r"
    position:
      - 1.01
      - 2.01
      - 3.01
    ");
    let options = EmitterOptions::new().indentless_sequences();
    insta::assert_snapshot!(to_string_with(&root, &options), @r"
    position:
    - 1.01
    - 2.01
    - 3.01
    ");
}

#[test]
fn flow_map_makes_its_contents_flow() {
    let root = flow(Node::new());
    root.insert("position", floats([1.01, 2.01, 3.01])).unwrap();
    assert_eq!(to_string(&root), "{position: [1.01, 2.01, 3.01]}");

    let list = Node::with_kind(NodeKind::Sequence);
    list.push_back(1.01).unwrap();
    list.push_back(&root).unwrap();
    insta::assert_snapshot!(to_string(&list), @r"
    - 1.01
    - {position: [1.01, 2.01, 3.01]}
    ");
}

#[test]
fn maps_in_sequences_start_on_the_dash_line() {
    let entry = Node::new();
    entry.insert("a", 1).unwrap();
    entry.insert("b", ()).unwrap();
    let root = Node::with_kind(NodeKind::Sequence);
    root.push_back(&entry).unwrap();
    root.push_back(&entry.clone_node(yamlet_node::CloneMode::Deep).unwrap()).unwrap();
    insta::assert_snapshot!(to_string(&root), @r"
    - a: 1
      b: ~
    - a: 1
      b: ~
    ");
}

#[test]
fn nested_maps_follow_the_indent_option() {
    let root = Node::new();
    root.get_or_create("a").unwrap().insert("b", "c").unwrap();
    insta::assert_snapshot!(to_string(&root), @r"
    a:
      b: c
    ");
    insta::assert_snapshot!(to_string_with(&root, &EmitterOptions::new().indent(4)), @r"
    a:
        b: c
    ");
}

#[test]
fn forced_styles() {
    let root = Node::new();
    root.insert("a", [1]).unwrap();
    root.insert("b", ()).unwrap();
    let options = EmitterOptions::new().flow().null_repr("null");
    assert_eq!(to_string_with(&root, &options), "{a: [1], b: null}");

    let list = flow(Node::from([1, 2]));
    assert_eq!(to_string_with(&list, &EmitterOptions::new().block()), "- 1\n- 2");
    let options = EmitterOptions::new().flow_separator(",");
    assert_eq!(to_string_with(&list, &options), "[1,2]");
}

#[test]
fn empty_collections() {
    let root = Node::new();
    root.insert("a", Node::with_kind(NodeKind::Sequence)).unwrap();
    root.insert("b", Node::with_kind(NodeKind::Map)).unwrap();
    insta::assert_snapshot!(to_string(&root), @r"
    a: []
    b: {}
    ");
    assert_eq!(to_string(&Node::with_kind(NodeKind::Sequence)), "[]");
}

#[test]
fn multi_line_text_becomes_a_literal_block() {
    let root = Node::new();
    root.insert("text", "line one\nline two\n").unwrap();
    assert_eq!(to_string(&root), "text: |\n  line one\n  line two\n");

    let list = Node::with_kind(NodeKind::Sequence);
    list.push_back("x\ny").unwrap();
    insta::assert_snapshot!(to_string(&list), @r"
    - |-
      x
      y
    ");

    let inline = flow(Node::from(["one\ntwo"]));
    assert_eq!(to_string(&inline), r#"["one\ntwo"]"#);
}

#[test]
fn trailing_literal_keeps_its_last_line_break() {
    let map = Node::new();
    map.insert("k", "line\n").unwrap();
    let text = to_string(&map);
    assert_eq!(text, "k: |\n  line\n");
    assert_eq!(yamlet_node::load(&text).unwrap().get("k").unwrap().unwrap().scalar(), "line\n");

    let list = Node::from(["a\nb\n"]);
    let text = to_string(&list);
    assert_eq!(text, "- |\n  a\n  b\n");
    assert_eq!(yamlet_node::load(&text).unwrap().get(0).unwrap().unwrap().scalar(), "a\nb\n");

    assert_eq!(reformat("k: |\n  line\n").unwrap(), "k: |\n  line\n");

    let mut out = Vec::new();
    dump(&[map, Node::from("x")], &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "k: |\n  line\n---\nx\n");
}

#[test]
fn collection_keys_are_complex() {
    let root = Node::new();
    root.insert([1, 2], "x").unwrap();
    insta::assert_snapshot!(to_string(&root), @r"
    ? [1, 2]
    : x
    ");
}

#[test]
fn shared_nodes_are_anchored() {
    let shared = Node::from("shared");
    let root = Node::with_kind(NodeKind::Sequence);
    root.push_back(&shared).unwrap();
    root.push_back(&shared).unwrap();
    insta::assert_snapshot!(to_string(&root), @r"
    - &1 shared
    - *1
    ");
}

#[test]
fn cycles_are_written_as_aliases() {
    let root = Node::with_kind(NodeKind::Sequence);
    root.push_back("x").unwrap();
    root.push_back(&root).unwrap();
    insta::assert_snapshot!(to_string(&root), @r"
    &1
    - x
    - *1
    ");
}

#[test]
fn scalars_that_would_change_type_are_quoted() {
    let root = Node::from(["12", "~", "", " lead", "it's", "#c", "tab\t"]);
    insta::assert_snapshot!(to_string(&root), @r#"
    - 12
    - '~'
    - ''
    - ' lead'
    - it's
    - '#c'
    - "tab\t"
    "#);
}

#[test]
fn reformat_keeps_tags_that_matter() {
    let source = "- !!str 1\n- !local x\n- 'quoted'\n- \"7\"";
    insta::assert_snapshot!(reformat(source).unwrap(), @r"
    - '1'
    - !local x
    - quoted
    - '7'
    ");
}

#[test]
fn reformat_keeps_anchor_names() {
    insta::assert_snapshot!(reformat("a: &x [1, 2]\nb: *x").unwrap(), @r"
    a: &x [1, 2]
    b: *x
    ");
}

#[test]
fn reformat_separates_documents() {
    assert_eq!(reformat("a\n---\nb\n").unwrap(), "a\n---\nb");
}

#[test]
fn reformat_reports_parse_errors() {
    assert!(matches!(reformat("[1, 2"), Err(EmitError::Parse(_))));
}

#[test]
fn dump_writes_a_document_stream() {
    let mut out = Vec::new();
    dump(&[Node::from("a"), Node::from([1])], &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "a\n---\n- 1\n");
}

#[test]
fn tagged_root_collection_starts_on_the_next_line() {
    let mut emitter = Emitter::new();
    emitter.on_map_start(Mark::default(), "!custom", None, Style::Block);
    emitter.on_scalar(Mark::default(), "?", None, "a");
    emitter.on_scalar(Mark::default(), "?", None, "1");
    emitter.on_map_end();
    insta::assert_snapshot!(emitter.finish().unwrap(), @r"
    !custom
    a: 1
    ");
}

#[test]
fn unbalanced_events_are_errors() {
    let mut emitter = Emitter::new();
    emitter.on_sequence_end();
    assert!(matches!(emitter.finish(), Err(EmitError::UnbalancedEnd)));

    let mut emitter = Emitter::new();
    emitter.on_map_start(Mark::default(), "?", None, Style::Block);
    emitter.on_scalar(Mark::default(), "?", None, "key");
    emitter.on_map_end();
    assert!(matches!(emitter.finish(), Err(EmitError::MissingValue)));

    let mut emitter = Emitter::new();
    emitter.on_sequence_start(Mark::default(), "?", None, Style::Block);
    assert!(matches!(emitter.finish(), Err(EmitError::Unclosed(1))));
}

#[derive(Debug, Clone)]
enum Value {
    Null,
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    fn to_node(&self) -> Node {
        match self {
            Value::Null => Node::new(),
            Value::Text(text) => Node::from(text.as_str()),
            Value::List(items) => {
                let node = Node::with_kind(NodeKind::Sequence);
                for item in items {
                    node.push_back(item.to_node()).unwrap();
                }
                node
            }
            Value::Map(entries) => {
                let node = Node::with_kind(NodeKind::Map);
                for (key, value) in entries {
                    node.insert(key.as_str(), value.to_node()).unwrap();
                }
                node
            }
        }
    }
}

/// Structure and text of a node, with untagged null-like scalars read as
/// null.
fn shape(node: &Node) -> String {
    match node.kind() {
        NodeKind::Undefined | NodeKind::Null => "null".to_string(),
        NodeKind::Scalar if node.tag() == "?" && is_null(&node.scalar()) => "null".to_string(),
        NodeKind::Scalar => format!("{:?}", node.scalar()),
        NodeKind::Sequence => {
            let items: Vec<String> = node.iter().map(|item| shape(&item)).collect();
            format!("[{}]", items.join(", "))
        }
        NodeKind::Map => {
            let entries: Vec<String> = node
                .entries()
                .map(|(key, value)| format!("{}: {}", shape(&key), shape(&value)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

fn text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z ]{0,6}",
        prop::sample::select(vec![
            "~", "true", "12", "- x", "a: b", "#c", "'q'", "x\ny", "tab\t", " lead", "[a]", "é",
            "a\n", "x\ny\n", "x\n\n",
        ])
        .prop_map(String::from),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![Just(Value::Null), text().prop_map(Value::Text)];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::btree_map("[a-z]{1,5}", inner, 0..4).prop_map(Value::Map),
        ]
    })
}

proptest! {
    #[test]
    fn emitted_text_loads_back(value in value()) {
        let node = value.to_node();
        let text = to_string(&node);
        let loaded = yamlet_node::load(&text).unwrap();
        prop_assert_eq!(shape(&loaded), shape(&node), "emitted:\n{}", text);
    }
}
