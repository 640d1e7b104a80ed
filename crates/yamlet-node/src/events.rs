//! Replaying a node graph as parser events.

use std::collections::HashMap;

use yamlet_parse::{AnchorId, EventHandler, Mark};

use crate::memory::{Arena, CellId, Slot};
use crate::{Node, NodeBuilder, NodeKind};

/// Sends a node graph to an [`EventHandler`] as a single document.
///
/// A node reachable more than once is anchored at its first occurrence
/// and sent as an alias afterwards. Anchors are numbered from 1 in the
/// order they are first met; cycles come out as aliases to an enclosing
/// anchor.
#[derive(Debug)]
pub struct NodeEvents {
    root: Node,
    ref_counts: HashMap<CellId, usize>,
}

impl NodeEvents {
    pub fn new(node: &Node) -> Self {
        let (memory, slot) = node.at();
        let mut ref_counts = HashMap::new();
        memory.read(|arena| count_refs(arena, slot, &mut ref_counts));
        Self {
            root: node.clone(),
            ref_counts,
        }
    }

    pub fn emit<H: EventHandler + ?Sized>(&self, handler: &mut H) {
        handler.on_document_start(Mark::default());
        let mut anchors = HashMap::new();
        let (memory, slot) = self.root.at();
        memory.read(|arena| self.emit_node(arena, slot, handler, &mut anchors));
        handler.on_document_end();
    }

    fn is_aliased(&self, cell: CellId) -> bool {
        self.ref_counts.get(&cell).is_some_and(|&count| count > 1)
    }

    fn emit_node<H: EventHandler + ?Sized>(
        &self,
        arena: &Arena,
        slot: Slot,
        handler: &mut H,
        anchors: &mut HashMap<CellId, AnchorId>,
    ) {
        let cell = arena.cell(slot);
        if let Some(&anchor) = anchors.get(&cell) {
            handler.on_alias(Mark::default(), anchor);
            return;
        }
        let anchor = self.is_aliased(cell).then(|| {
            let anchor = anchors.len() + 1;
            anchors.insert(cell, anchor);
            anchor
        });

        let data = arena.data(slot);
        match data.kind() {
            NodeKind::Undefined | NodeKind::Null => handler.on_null(data.mark, anchor),
            NodeKind::Scalar => handler.on_scalar(data.mark, &data.tag, anchor, &data.scalar),
            NodeKind::Sequence => {
                handler.on_sequence_start(data.mark, &data.tag, anchor, data.style);
                for item in arena.defined_items(slot) {
                    self.emit_node(arena, item, handler, anchors);
                }
                handler.on_sequence_end();
            }
            NodeKind::Map => {
                handler.on_map_start(data.mark, &data.tag, anchor, data.style);
                for (key, value) in arena.defined_pairs(slot) {
                    self.emit_node(arena, key, handler, anchors);
                    self.emit_node(arena, value, handler, anchors);
                }
                handler.on_map_end();
            }
        }
    }
}

fn count_refs(arena: &Arena, slot: Slot, counts: &mut HashMap<CellId, usize>) {
    let count = counts.entry(arena.cell(slot)).or_default();
    *count += 1;
    if *count > 1 {
        return;
    }
    for item in arena.defined_items(slot) {
        count_refs(arena, item, counts);
    }
    for (key, value) in arena.defined_pairs(slot) {
        count_refs(arena, key, counts);
        count_refs(arena, value, counts);
    }
}

/// Copy a graph by replaying it through a [`NodeBuilder`]. Shared nodes
/// stay shared in the copy, cycles included.
pub fn clone_via_events(node: &Node) -> Node {
    let mut builder = NodeBuilder::new();
    NodeEvents::new(node).emit(&mut builder);
    builder.into_documents().into_iter().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use yamlet_parse::Event;

    fn dump(node: &Node) -> String {
        let mut events: Vec<Event> = Vec::new();
        NodeEvents::new(node).emit(&mut events);
        events.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn shared_nodes_are_anchored_once() {
        let root = crate::load("a: &x [1]\nb: *x\nc: *x").unwrap();
        insta::assert_snapshot!(dump(&root), @r#"
        +DOC
        +MAP
        =VAL "a"
        +SEQ [] &1
        =VAL "1"
        -SEQ
        =VAL "b"
        =ALI *1
        =VAL "c"
        =ALI *1
        -MAP
        -DOC
        "#);
    }

    #[test]
    fn cycles_become_aliases() {
        let root = crate::load("&a [*a, x]").unwrap();
        insta::assert_snapshot!(dump(&root), @r#"
        +DOC
        +SEQ [] &1
        =ALI *1
        =VAL "x"
        -SEQ
        -DOC
        "#);
    }

    #[test]
    fn undefined_entries_are_skipped() {
        let root = Node::new();
        root.get_or_create("pending").unwrap();
        root.insert("k", "v").unwrap();
        insta::assert_snapshot!(dump(&root), @r#"
        +DOC
        +MAP
        =VAL "k"
        =VAL "v"
        -MAP
        -DOC
        "#);
    }

    #[test]
    fn clone_keeps_sharing_but_not_identity() {
        let root = crate::load("a: &x [1]\nb: *x").unwrap();
        let copy = clone_via_events(&root);
        assert!(!copy.is(&root));
        let a = copy.get("a").unwrap().unwrap();
        let b = copy.get("b").unwrap().unwrap();
        assert!(a.is(&b));
        assert!(!a.is(&root.get("a").unwrap().unwrap()));
    }

    #[test]
    fn clone_of_null() {
        assert!(clone_via_events(&Node::new()).is_null());
    }
}
