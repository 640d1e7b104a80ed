use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;
use yamlet_scanner::ScannerOptions;
use yamlet_testhelpers::init_tracing;

use super::*;

fn value(node: &Node, key: &str) -> Node {
    node.get(key).unwrap().unwrap()
}

#[test]
fn appending_builds_a_sequence() {
    let node = Node::new();
    node.push_back("a").unwrap();
    node.push_back(1).unwrap();
    assert!(node.is_sequence());
    assert_eq!(node.size(), 2);
    assert_eq!(node.get(1).unwrap().unwrap().decode::<i32>(), Ok(1));
    assert_eq!(Node::from("x").push_back(1), Err(Error::BadPushback));
}

#[test]
fn assigning_by_index() {
    let node = Node::new();
    node.get_or_create(0).unwrap().set(10);
    node.get_or_create(1).unwrap().set(3);
    assert!(node.is_sequence());
    assert_eq!(node.decode::<Vec<i32>>(), Ok(vec![10, 3]));

    // Skipping a position turns the sequence into a map.
    node.get_or_create(3).unwrap().set(5);
    assert!(node.is_map());
    assert_eq!(node.size(), 3);
    assert_eq!(node.get(0).unwrap().unwrap().decode::<i32>(), Ok(10));
    assert_eq!(value(&node, "3").decode::<i32>(), Ok(5));
}

#[test]
fn sequence_with_a_gap_becomes_a_map() {
    let node = Node::new();
    node.get_or_create(0).unwrap().set("test");
    node.get_or_create(1).unwrap();
    assert_eq!(node.size(), 1);
    assert_eq!(node.iter().count(), 1);

    node.get_or_create(2).unwrap().set("value");
    assert!(node.is_map());
    assert_eq!(node.size(), 2);
}

#[test]
fn undefined_values_are_not_counted() {
    let node = Node::new();
    let pending = node.get_or_create("key").unwrap();
    assert!(!pending.is_defined());
    assert_eq!(pending.kind(), NodeKind::Undefined);
    assert!(node.is_map());
    assert_eq!(node.size(), 0);

    pending.set("value");
    assert_eq!(node.size(), 1);
    assert_eq!(value(&node, "key").decode::<String>(), Ok("value".to_string()));
}

#[test]
fn nested_lookups_define_their_parents() {
    let node = Node::new();
    node.get_or_create("a").unwrap().get_or_create("b").unwrap().set(1);
    let a = value(&node, "a");
    assert!(a.is_map());
    assert_eq!(a.size(), 1);
    assert_eq!(value(&a, "b").decode::<i32>(), Ok(1));
}

#[test]
fn insert_replaces_and_force_insert_appends() {
    let node = Node::new();
    node.insert("x", "y").unwrap();
    node.insert("x", "z").unwrap();
    assert_eq!(node.size(), 1);
    assert_eq!(value(&node, "x").scalar(), "z");

    node.force_insert("x", "w").unwrap();
    node.force_insert("y", 2).unwrap();
    assert_eq!(node.size(), 3);
    assert_eq!(value(&node, "x").scalar(), "z");
    assert_eq!(Node::from("s").insert("a", "b"), Err(Error::BadInsert));
}

#[test]
fn lookups_on_scalars_fail() {
    let node = Node::from("text");
    assert_eq!(
        node.get("a"),
        Err(Error::BadSubscript {
            mark: Mark::default(),
            key: "a".to_string(),
        })
    );
    assert!(node.get_or_create(0).is_err());
    assert_eq!(node.remove("a"), Ok(false));
}

#[test]
fn missing_entries_read_as_none() {
    let node = load("{a: 1}").unwrap();
    assert!(node.get("b").unwrap().is_none());
    assert!(Node::new().get("b").unwrap().is_none());
    assert!(load("[1]").unwrap().get(5).unwrap().is_none());
    assert_eq!(node.size(), 1);
}

#[test]
fn owned_string_keys() {
    let node = load("{a: 1}").unwrap();
    let key = String::from("a");
    assert_eq!(node.get(&key).unwrap().unwrap().decode::<i32>(), Ok(1));
    assert!(node.get(String::from("b")).unwrap().is_none());
    node.get_or_create(String::from("b")).unwrap().set(2);
    assert_eq!(node.size(), 2);
}

#[test]
fn undefined_items_read_as_none() {
    let node = Node::new();
    node.get_or_create(0).unwrap().set(1);
    let pending = node.get_or_create(1).unwrap();
    assert!(node.is_sequence());
    assert!(node.get(1).unwrap().is_none());

    pending.set(2);
    assert_eq!(node.get(1).unwrap().unwrap().decode::<i32>(), Ok(2));

    let map = Node::new();
    map.get_or_create("later").unwrap();
    assert!(map.get("later").unwrap().is_none());
}

#[test]
fn removing_entries() {
    let seq = load("[a, b, c]").unwrap();
    assert_eq!(seq.remove(1), Ok(true));
    assert_eq!(seq.remove(7), Ok(false));
    assert_eq!(seq.decode::<Vec<String>>(), Ok(vec!["a".to_string(), "c".to_string()]));

    let map = load("{a: 1, b: 2}").unwrap();
    assert_eq!(map.remove("a"), Ok(true));
    assert_eq!(map.remove("a"), Ok(false));
    assert_eq!(map.size(), 1);
    assert!(map.get("a").unwrap().is_none());
}

#[test]
fn assign_shares_identity() {
    let node = Node::new();
    node.get_or_create("A").unwrap().set("value");
    let a = value(&node, "A");
    let mut b = node.get_or_create("B").unwrap();
    b.assign(&a);
    assert!(b.is(&a));
    assert!(value(&node, "B").is(&a));

    a.set("changed");
    assert_eq!(value(&node, "B").scalar(), "changed");
}

#[test]
fn assign_through_a_temporary() {
    let node = Node::new();
    let mut tmp = node.get_or_create("key").unwrap();
    tmp.assign(&node.get_or_create("other").unwrap());
    node.get_or_create("other").unwrap().set("value");
    assert_eq!(node.size(), 2);
    assert!(value(&node, "key").is(&value(&node, "other")));
    assert_eq!(value(&node, "key").scalar(), "value");
}

#[test]
fn set_keeps_identity() {
    let node = Node::from("x");
    let alias = node.clone();
    node.set("y");
    assert_eq!(alias.scalar(), "y");

    node.set(vec![1, 2]);
    assert!(alias.is_sequence());
    assert_eq!(alias.size(), 2);
}

#[test]
fn reset_only_rebinds_the_handle() {
    let root = load("{a: 1, b: 2}").unwrap();
    let mut handle = value(&root, "a");
    handle.reset(&value(&root, "b"));
    assert_eq!(handle.scalar(), "2");
    assert_eq!(value(&root, "a").scalar(), "1");
}

#[test]
fn alias_as_key() {
    let node = Node::new();
    node.get_or_create("foo").unwrap().set("value");
    let key = value(&node, "foo");
    node.get_or_create(&key).unwrap().set("foo");
    assert_eq!(node.size(), 2);
    assert_eq!(value(&node, "value").scalar(), "foo");
}

#[test]
fn bool_keys() {
    let node = Node::new();
    node.get_or_create(true).unwrap().set(false);
    assert_eq!(node.get(true).unwrap().unwrap().decode::<bool>(), Ok(false));
    assert_eq!(value(&node, "true").scalar(), "false");
}

#[test]
fn self_referencing_sequence() {
    let node = Node::new();
    node.push_back(&node).unwrap();
    assert_eq!(node.size(), 1);
    assert!(node.get(0).unwrap().unwrap().is(&node));
    assert_eq!(format!("{:?}", node), "[<cycle>]");
}

#[test]
fn self_referencing_map_value_and_key() {
    let node = Node::new();
    node.insert("self", &node).unwrap();
    node.insert(&node, "value").unwrap();
    assert_eq!(node.size(), 2);
    assert!(value(&node, "self").is(&node));
    assert_eq!(node.get(&node).unwrap().unwrap().scalar(), "value");
}

#[test]
fn anchors_alias_the_same_node() {
    init_tracing();
    let root = load("first: &a [1, 2, 3]\nsecond: *a").unwrap();
    let first = value(&root, "first");
    let second = value(&root, "second");
    assert!(first.is(&second));
    assert_eq!(first, second);

    first.push_back(4).unwrap();
    assert_eq!(second.size(), 4);
}

#[test]
fn anchored_collection_can_contain_itself() {
    let root = load("&a [*a]").unwrap();
    assert!(root.get(0).unwrap().unwrap().is(&root));
}

#[test]
fn merge_keys_defer_to_explicit_entries() {
    init_tracing();
    let root = load("{<<: {a: 1, b: 2}, a: 99}").unwrap();
    assert_eq!(root.size(), 2);
    assert_eq!(value(&root, "a").decode::<i32>(), Ok(99));
    assert_eq!(value(&root, "b").decode::<i32>(), Ok(2));
    assert!(root.get("<<").unwrap().is_none());
}

#[test]
fn resolved_merge_tag_still_merges() {
    let options = LoadOptions::new().parser(ParserOptions::new().resolve_tags(true));
    let root = load_with("base: &b {x: 1}\nderived:\n  <<: *b\n  y: 2\n", &options).unwrap();
    let derived = value(&root, "derived");
    assert_eq!(derived.size(), 2);
    assert_eq!(value(&derived, "x").tag(), "tag:yaml.org,2002:int");
}

#[test]
fn shallow_clone_shares_children() {
    let root = load("a: [1]").unwrap();
    let copy = root.clone_node(CloneMode::Shallow).unwrap();
    assert!(!copy.is(&root));
    assert!(value(&copy, "a").is(&value(&root, "a")));
}

#[test]
fn deep_clone_copies_everything_and_keeps_marks() {
    let root = load("a: [1]\nb: x").unwrap();
    let copy = root.clone_node(CloneMode::Deep).unwrap();
    let (a, copied) = (value(&root, "a"), value(&copy, "a"));
    assert!(!copied.is(&a));
    assert_eq!(copied.mark(), a.mark());
    assert_eq!(copied.style(), a.style());

    copied.push_back(2).unwrap();
    assert_eq!(a.size(), 1);
}

#[test]
fn deep_clone_of_a_cycle_fails() {
    let root = load("&a [*a]").unwrap();
    let error = root.clone_node(CloneMode::Deep).unwrap_err();
    assert!(matches!(error, Error::DeepRecursion { limit: MAX_CLONE_DEPTH, .. }));
}

#[test]
fn unsharing_clone_terminates_on_cycles() {
    let root = load("&a [*a]").unwrap();
    let copy = root.clone_node(CloneMode::UnshareSubtrees).unwrap();
    assert!(!copy.is(&root));
    // The back edge repeats the source, so it gets its own cycle.
    let inner = copy.get(0).unwrap().unwrap();
    assert!(!inner.is(&root));
    assert!(inner.get(0).unwrap().unwrap().is(&inner));
    assert!(root.get(0).unwrap().unwrap().is(&root));
}

#[test]
fn unsharing_clone_keeps_first_occurrences_shared() {
    let root = load("a: &x [1]\nb: *x").unwrap();
    let copy = root.clone_node(CloneMode::UnshareSubtrees).unwrap();
    let (a, b) = (value(&copy, "a"), value(&copy, "b"));
    assert!(a.is(&value(&root, "a")));
    assert!(!b.is(&a));

    a.push_back(2).unwrap();
    assert_eq!(value(&root, "a").size(), 2);
    assert_eq!(b.size(), 1);
}

#[test]
fn unshare_in_place() {
    let root = load("a: &x [1]\nb: *x").unwrap();
    root.unshare_subtrees();
    let (a, b) = (value(&root, "a"), value(&root, "b"));
    assert!(!a.is(&b));
    a.push_back(2).unwrap();
    assert_eq!(a.size(), 2);
    assert_eq!(b.size(), 1);
}

#[test]
fn own_data_detaches_the_handle() {
    let root = load("a: &x [1]\nb: *x").unwrap();
    let mut handle = value(&root, "a");
    handle.own_data();
    assert!(!handle.is(&value(&root, "a")));
    assert!(handle.get(0).unwrap().unwrap().is(&value(&root, "b").get(0).unwrap().unwrap()));

    handle.push_back(2).unwrap();
    assert_eq!(handle.size(), 2);
    assert_eq!(value(&root, "b").size(), 1);
}

#[test]
fn aliases_hash_as_one_node() {
    let root = load("a: &x [1]\nb: *x\nc: [1]").unwrap();
    let nodes: HashSet<Node> = root.entries().map(|(_, value)| value).collect();
    assert_eq!(nodes.len(), 2);
    assert_eq!(value(&root, "a").id(), value(&root, "b").id());
    assert_ne!(value(&root, "a").id(), value(&root, "c").id());
}

#[test]
fn modify_values_replaces_and_drops() {
    let seq = load("[1, 2, 3]").unwrap();
    seq.modify_values(|item| match item.decode::<i32>() {
        Ok(2) => None,
        Ok(number) => Some(Node::from(number * 10)),
        Err(_) => Some(item.clone()),
    });
    assert_eq!(seq.decode::<Vec<i32>>(), Ok(vec![10, 30]));

    let shared = Node::from("shared");
    let map = load("{a: 1, b: 2}").unwrap();
    map.modify_values(|_| Some(shared.clone()));
    assert!(value(&map, "a").is(&shared));
    assert!(value(&map, "b").is(&shared));

    let scalar = Node::from("x");
    scalar.modify_values(|_| None);
    assert_eq!(scalar.scalar(), "x");
}

#[test]
fn modify_key_values_sees_scalar_keys() {
    let map = load("{a: 1, b: 2}").unwrap();
    map.insert([1], 3).unwrap();
    let mut keys = Vec::new();
    map.modify_key_values(|key, value| {
        keys.push(key.map(str::to_string));
        (key != Some("a")).then(|| value.clone())
    });
    assert_eq!(keys, [Some("a".to_string()), Some("b".to_string()), None]);
    assert!(map.get("a").unwrap().is_none());
    assert_eq!(value(&map, "b").decode::<i32>(), Ok(2));
    assert_eq!(map.size(), 2);
}

#[test]
fn clone_of_null() {
    let copy = Node::new().clone_node(CloneMode::Deep).unwrap();
    assert!(copy.is_null());
}

#[test]
fn default_style() {
    assert_eq!(Node::new().style(), Style::Default);
    assert_eq!(load("[1]").unwrap().style(), Style::Flow);
    let node = Node::with_kind(NodeKind::Map);
    node.set_style(Style::Flow);
    assert_eq!(node.style(), Style::Flow);
}

#[test]
fn comparisons_by_value() {
    let node = Node::from("5");
    assert_eq!(node.equals(&5), Ok(true));
    assert_eq!(node.equals(&6), Ok(false));
    assert_eq!(Node::from("x").equals(&5), Ok(false));
    assert_eq!(Node::from("x").decode_or(7), 7);
}

#[test]
fn tags_are_kept() {
    let root = load("!!map {a: !x b}").unwrap();
    assert_eq!(root.tag(), "tag:yaml.org,2002:map");
    assert_eq!(value(&root, "a").tag(), "!x");
    root.set_tag("!changed");
    assert_eq!(root.tag(), "!changed");
}

#[test]
fn debug_output() {
    let root = load("{a: [1, ~], b: 'x'}").unwrap();
    insta::assert_snapshot!(format!("{:?}", root), @r#"{"a": ["1", ~], "b": "x"}"#);
}

#[test]
fn loading_streams() {
    assert!(load("").unwrap().is_null());
    let documents = load_all("a\n---\nb\n---\nc\n").unwrap();
    let texts: Vec<String> = documents.iter().map(Node::scalar).collect();
    assert_eq!(texts, ["a", "b", "c"]);

    let error = load("a: [1").unwrap_err();
    assert!(matches!(error, LoadError::Parse(_)));
}

#[test]
fn loading_from_a_reader() {
    let options = LoadOptions::new().scanner(ScannerOptions::new().prefetch_size(1));
    let root = load_reader("a: 1\nb: [x, y]\n".as_bytes(), &options).unwrap();
    assert_eq!(value(&root, "a").decode::<i32>(), Ok(1));
    assert_eq!(value(&root, "b").size(), 2);

    let error = load_file("/nonexistent/yamlet/test.yaml").unwrap_err();
    assert!(matches!(error, LoadError::Io(_)));
    assert!(error.to_string().starts_with("bad file: "));
}

#[test]
fn encoded_collections() {
    let node = Node::from(vec!["a", "b"]);
    assert_eq!(node.size(), 2);
    let squares: BTreeMap<String, i32> = [("one".to_string(), 1), ("two".to_string(), 4)].into_iter().collect();
    let node = Node::from(squares);
    assert_eq!(value(&node, "two").decode::<i32>(), Ok(4));
}

proptest! {
    #[test]
    fn last_insert_wins(keys in proptest::collection::vec("[a-c]{1,2}", 0..24)) {
        let node = Node::new();
        let mut expected = BTreeMap::new();
        for (index, key) in keys.iter().enumerate() {
            node.insert(key.as_str(), index).unwrap();
            expected.insert(key.clone(), index);
        }
        if keys.is_empty() {
            prop_assert!(node.is_null());
        } else {
            prop_assert_eq!(node.size(), expected.len());
        }
        for (key, index) in &expected {
            prop_assert_eq!(node.get(key.as_str()).unwrap().unwrap().decode::<usize>(), Ok(*index));
        }
    }
}
