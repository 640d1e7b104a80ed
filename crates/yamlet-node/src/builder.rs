//! Building node graphs from parser events.

use std::collections::HashMap;

use tracing::{trace, warn};
use yamlet_parse::{AnchorId, CORE_TAG_PREFIX, EventHandler, Mark, Style};

use crate::memory::{Memory, NodeData, Slot};
use crate::{Node, NodeKind};

/// Turns parser events into one [`Node`] per document.
///
/// Aliases become the very node their anchor names, so an anchored
/// collection that refers to itself yields a cyclic graph. Merge keys
/// (`<<`) are expanded when the map that holds them ends: entries of the
/// merged maps are added for keys the map does not already have, earlier
/// sources first.
#[derive(Debug, Default)]
pub struct NodeBuilder {
    memory: Memory,
    stack: Vec<Slot>,
    /// Keys waiting for their value; the flag is set once the key is
    /// complete.
    keys: Vec<(Slot, bool)>,
    map_depth: usize,
    /// Merge sources per open map.
    merges: Vec<Vec<Slot>>,
    anchors: HashMap<AnchorId, Slot>,
    documents: Vec<Node>,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root of the first finished document.
    pub fn root(&self) -> Option<&Node> {
        self.documents.first()
    }

    pub fn into_documents(self) -> Vec<Node> {
        self.documents
    }

    fn reset(&mut self) {
        self.memory = Memory::new();
        self.stack.clear();
        self.keys.clear();
        self.map_depth = 0;
        self.merges.clear();
        self.anchors.clear();
    }

    fn push(&mut self, mark: Mark, anchor: Option<AnchorId>) -> Slot {
        let slot = self.memory.write(|arena| {
            let slot = arena.alloc(NodeData::default());
            arena.set_mark(slot, mark);
            slot
        });
        if let Some(anchor) = anchor {
            self.anchors.insert(anchor, slot);
        }
        self.push_slot(slot);
        slot
    }

    fn push_slot(&mut self, slot: Slot) {
        let in_map = self
            .stack
            .last()
            .is_some_and(|&top| self.memory.read(|arena| arena.data(top).kind == NodeKind::Map));
        let needs_key = in_map && self.keys.len() < self.map_depth;
        self.stack.push(slot);
        if needs_key {
            self.keys.push((slot, false));
        }
    }

    /// Finish the top node and attach it to its parent. The document root
    /// stays on the stack.
    fn pop(&mut self) {
        let &[.., parent, node] = self.stack.as_slice() else {
            return;
        };
        self.stack.pop();
        match self.memory.read(|arena| arena.data(parent).kind) {
            NodeKind::Sequence => self.memory.write(|arena| arena.push_item(parent, node)),
            NodeKind::Map => {
                let Some(entry) = self.keys.last_mut() else {
                    return;
                };
                if !entry.1 {
                    entry.1 = true;
                    return;
                }
                let key = entry.0;
                self.keys.pop();
                self.add_pair(parent, key, node);
            }
            _ => {}
        }
    }

    fn add_pair(&mut self, map: Slot, key: Slot, value: Slot) {
        if let Some(sources) = self.merge_sources(key, value) {
            if let Some(pending) = self.merges.last_mut() {
                pending.extend(sources);
                return;
            }
        }
        self.memory.write(|arena| arena.insert_pair(map, key, value));
    }

    /// The maps a `<<` entry merges, or `None` if this is a regular entry.
    fn merge_sources(&self, key: Slot, value: Slot) -> Option<Vec<Slot>> {
        self.memory.read(|arena| {
            let key = arena.data(key);
            let merge_tag = key.tag == "?" || key.tag.strip_prefix(CORE_TAG_PREFIX) == Some("merge");
            if key.kind() != NodeKind::Scalar || key.scalar != "<<" || !merge_tag {
                return None;
            }
            match arena.data(value).kind() {
                NodeKind::Map => Some(vec![value]),
                NodeKind::Sequence => {
                    let items = arena.defined_items(value);
                    items
                        .iter()
                        .all(|&item| arena.data(item).kind() == NodeKind::Map)
                        .then_some(items)
                }
                _ => None,
            }
        })
    }

    fn expand_merges(&mut self, map: Slot, sources: Vec<Slot>) {
        if sources.is_empty() {
            return;
        }
        trace!(sources = sources.len(), "expanding merge keys");
        self.memory.write(|arena| {
            for source in sources {
                for (key, value) in arena.defined_pairs(source) {
                    if arena.find_key(map, key).is_none() {
                        arena.insert_pair(map, key, value);
                    }
                }
            }
        });
    }

    fn start_collection(
        &mut self,
        mark: Mark,
        tag: &str,
        anchor: Option<AnchorId>,
        style: Style,
        kind: NodeKind,
    ) {
        let slot = self.push(mark, anchor);
        self.memory.write(|arena| {
            arena.set_kind(slot, kind);
            arena.set_tag(slot, tag);
            arena.set_style(slot, style);
        });
    }
}

impl EventHandler for NodeBuilder {
    fn on_document_start(&mut self, _mark: Mark) {
        self.reset();
    }

    fn on_document_end(&mut self) {
        if let Some(&root) = self.stack.first() {
            self.documents.push(Node::from_parts(self.memory.clone(), root));
        }
        self.reset();
    }

    fn on_null(&mut self, mark: Mark, anchor: Option<AnchorId>) {
        let slot = self.push(mark, anchor);
        self.memory.write(|arena| arena.set_null(slot));
        self.pop();
    }

    fn on_alias(&mut self, mark: Mark, anchor: AnchorId) {
        match self.anchors.get(&anchor).copied() {
            Some(slot) => self.push_slot(slot),
            None => {
                warn!(anchor, %mark, "alias to an unknown anchor, using null");
                let slot = self.push(mark, None);
                self.memory.write(|arena| arena.set_null(slot));
            }
        }
        self.pop();
    }

    fn on_scalar(&mut self, mark: Mark, tag: &str, anchor: Option<AnchorId>, value: &str) {
        let slot = self.push(mark, anchor);
        self.memory.write(|arena| {
            arena.set_scalar(slot, value);
            arena.set_tag(slot, tag);
        });
        self.pop();
    }

    fn on_sequence_start(&mut self, mark: Mark, tag: &str, anchor: Option<AnchorId>, style: Style) {
        self.start_collection(mark, tag, anchor, style, NodeKind::Sequence);
    }

    fn on_sequence_end(&mut self) {
        self.pop();
    }

    fn on_map_start(&mut self, mark: Mark, tag: &str, anchor: Option<AnchorId>, style: Style) {
        self.start_collection(mark, tag, anchor, style, NodeKind::Map);
        self.map_depth += 1;
        self.merges.push(Vec::new());
    }

    fn on_map_end(&mut self) {
        let sources = self.merges.pop().unwrap_or_default();
        if let Some(&map) = self.stack.last() {
            self.expand_merges(map, sources);
        }
        self.map_depth = self.map_depth.saturating_sub(1);
        self.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yamlet_parse::{Parser, Scanner};

    fn build(source: &str) -> Vec<Node> {
        let mut builder = NodeBuilder::new();
        Parser::new(Scanner::new(source)).parse_all(&mut builder).unwrap();
        builder.into_documents()
    }

    #[test]
    fn one_root_per_document() {
        let documents = build("a\n--- [b]\n--- {c: d}\n");
        let kinds: Vec<NodeKind> = documents.iter().map(Node::kind).collect();
        assert_eq!(kinds, [NodeKind::Scalar, NodeKind::Sequence, NodeKind::Map]);
    }

    #[test]
    fn tags_marks_and_styles_are_kept() {
        let documents = build("x: !t [1]\ny: {}\n");
        let root = &documents[0];
        let x = root.get("x").unwrap().unwrap();
        assert_eq!(x.tag(), "!t");
        assert_eq!(x.style(), Style::Flow);
        assert_eq!(x.mark(), Mark::new(3, 0, 3));
        assert_eq!(root.style(), Style::Block);
        assert_eq!(root.get("y").unwrap().unwrap().size(), 0);
        assert_eq!(root.get("x").unwrap().unwrap().get(0).unwrap().unwrap().tag(), "?");
    }

    #[test]
    fn merge_keys_fill_in_missing_entries() {
        let documents = build("base: &b {a: 1, b: 2}\nmore: &m {b: 3, c: 4}\nmerged:\n  <<: [*b, *m]\n  a: 99\n");
        let merged = documents[0].get("merged").unwrap().unwrap();
        let entries: Vec<(String, String)> = merged
            .entries()
            .map(|(key, value)| (key.scalar(), value.scalar()))
            .collect();
        assert_eq!(
            entries,
            [("a", "99"), ("b", "2"), ("c", "4")].map(|(k, v)| (k.to_string(), v.to_string()))
        );
    }

    #[test]
    fn quoted_merge_key_is_an_ordinary_key() {
        let documents = build("'<<': {a: 1}\n");
        let root = &documents[0];
        assert_eq!(root.size(), 1);
        assert!(root.get("<<").unwrap().unwrap().is_map());
        assert!(root.get("a").unwrap().is_none());
    }

    #[test]
    fn merge_of_a_scalar_is_kept_as_an_entry() {
        let documents = build("<<: x\n");
        assert_eq!(documents[0].get("<<").unwrap().unwrap().scalar(), "x");
    }

    #[test]
    fn unknown_alias_becomes_null() {
        let mut builder = NodeBuilder::new();
        builder.on_document_start(Mark::default());
        builder.on_sequence_start(Mark::default(), "?", None, Style::Block);
        builder.on_alias(Mark::default(), 7);
        builder.on_sequence_end();
        builder.on_document_end();
        let root = builder.root().unwrap();
        assert_eq!(root.size(), 1);
        assert!(root.get(0).unwrap().unwrap().is_null());
    }
}
