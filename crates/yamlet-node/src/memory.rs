//! Arena storage behind [`Node`](crate::Node) handles.
//!
//! A node handle names a *slot*. Slots point at *cells*, which hold the node
//! data. Two slots pointing at one cell are the same node: that is how an
//! alias or `a.assign(&b)` shares identity while parents keep their own
//! child slots.
//!
//! Arenas are joined whenever nodes from two of them are linked. The smaller
//! arena moves into the larger and keeps a forwarding entry so that old
//! handles still resolve; forwarding chains are compressed on lookup.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use tracing::trace;
use yamlet_parse::{Mark, Style};

use crate::{Error, NodeKind};

/// Nesting limit for [`Arena::deep_copy`].
pub const MAX_CLONE_DEPTH: usize = 512;

pub(crate) type Slot = usize;
pub(crate) type CellId = usize;

#[derive(Debug, Clone, Default)]
pub(crate) struct NodeData {
    pub defined: bool,
    pub kind: NodeKind,
    pub mark: Mark,
    pub tag: String,
    pub style: Style,
    pub scalar: String,
    pub items: Vec<Slot>,
    pub pairs: Vec<(Slot, Slot)>,
}

impl NodeData {
    pub fn null() -> Self {
        Self {
            defined: true,
            ..Self::default()
        }
    }

    pub fn scalar(text: impl Into<String>) -> Self {
        Self {
            defined: true,
            kind: NodeKind::Scalar,
            scalar: text.into(),
            ..Self::default()
        }
    }

    pub fn collection(kind: NodeKind) -> Self {
        Self {
            defined: true,
            kind,
            ..Self::default()
        }
    }

    /// The kind as seen from outside: undefined data has no kind.
    pub fn kind(&self) -> NodeKind {
        if self.defined { self.kind } else { NodeKind::Undefined }
    }

    /// Whether the data can be copied without joining arenas.
    pub fn is_leaf(&self) -> bool {
        self.items.is_empty() && self.pairs.is_empty()
    }
}

#[derive(Debug, Default)]
struct Cell {
    data: NodeData,
    /// Slots to mark defined once this cell is.
    dependents: Vec<Slot>,
}

#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<CellId>,
    cells: Vec<Cell>,
}

impl Arena {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn alloc(&mut self, data: NodeData) -> Slot {
        self.cells.push(Cell {
            data,
            dependents: Vec::new(),
        });
        self.slots.push(self.cells.len() - 1);
        self.slots.len() - 1
    }

    pub fn cell(&self, slot: Slot) -> CellId {
        self.slots[slot]
    }

    pub fn data(&self, slot: Slot) -> &NodeData {
        &self.cells[self.slots[slot]].data
    }

    pub fn data_mut(&mut self, slot: Slot) -> &mut NodeData {
        let cell = self.slots[slot];
        &mut self.cells[cell].data
    }

    /// Mark the node defined, then everything that was waiting on it.
    pub fn mark_defined(&mut self, slot: Slot) {
        let mut pending = vec![slot];
        while let Some(slot) = pending.pop() {
            let cell = self.slots[slot];
            let cell = &mut self.cells[cell];
            if cell.data.defined {
                continue;
            }
            cell.data.defined = true;
            pending.append(&mut cell.dependents);
        }
    }

    /// `dependent` becomes defined as soon as `slot` is.
    pub fn add_dependency(&mut self, slot: Slot, dependent: Slot) {
        if self.data(slot).defined {
            self.mark_defined(dependent);
        } else {
            let cell = self.slots[slot];
            self.cells[cell].dependents.push(dependent);
        }
    }

    /// Point `slot` at the node behind `target`.
    pub fn set_ref(&mut self, slot: Slot, target: Slot) {
        if self.data(target).defined {
            self.mark_defined(slot);
        }
        self.slots[slot] = self.slots[target];
    }

    /// Replace the node's data, keeping its identity.
    pub fn set_data(&mut self, slot: Slot, data: NodeData) {
        if data.defined {
            self.mark_defined(slot);
        }
        *self.data_mut(slot) = data;
    }

    pub fn set_kind(&mut self, slot: Slot, kind: NodeKind) {
        if kind == NodeKind::Undefined {
            let data = self.data_mut(slot);
            data.kind = kind;
            data.defined = false;
            return;
        }
        self.mark_defined(slot);
        let data = self.data_mut(slot);
        if data.kind == kind {
            return;
        }
        data.kind = kind;
        data.scalar.clear();
        data.items.clear();
        data.pairs.clear();
    }

    pub fn set_null(&mut self, slot: Slot) {
        self.mark_defined(slot);
        self.data_mut(slot).kind = NodeKind::Null;
    }

    pub fn set_scalar(&mut self, slot: Slot, text: &str) {
        self.mark_defined(slot);
        let data = self.data_mut(slot);
        data.kind = NodeKind::Scalar;
        data.scalar = text.to_string();
    }

    pub fn set_tag(&mut self, slot: Slot, tag: &str) {
        self.mark_defined(slot);
        self.data_mut(slot).tag = tag.to_string();
    }

    pub fn set_style(&mut self, slot: Slot, style: Style) {
        self.mark_defined(slot);
        self.data_mut(slot).style = style;
    }

    pub fn set_mark(&mut self, slot: Slot, mark: Mark) {
        self.data_mut(slot).mark = mark;
    }

    /// Sequence items up to the first undefined one.
    pub fn defined_items(&self, slot: Slot) -> Vec<Slot> {
        let data = self.data(slot);
        if data.kind() != NodeKind::Sequence {
            return Vec::new();
        }
        data.items
            .iter()
            .copied()
            .take_while(|&item| self.data(item).defined)
            .collect()
    }

    /// Map pairs whose key and value are both defined.
    pub fn defined_pairs(&self, slot: Slot) -> Vec<(Slot, Slot)> {
        let data = self.data(slot);
        if data.kind() != NodeKind::Map {
            return Vec::new();
        }
        data.pairs
            .iter()
            .copied()
            .filter(|&(key, value)| self.data(key).defined && self.data(value).defined)
            .collect()
    }

    pub fn size(&self, slot: Slot) -> usize {
        match self.data(slot).kind() {
            NodeKind::Sequence => self.defined_items(slot).len(),
            NodeKind::Map => self.defined_pairs(slot).len(),
            _ => 0,
        }
    }

    pub fn push_back(&mut self, seq: Slot, item: Slot) -> Result<(), Error> {
        let data = self.data_mut(seq);
        match data.kind {
            NodeKind::Undefined | NodeKind::Null => {
                data.kind = NodeKind::Sequence;
                data.items.clear();
            }
            NodeKind::Sequence => {}
            NodeKind::Scalar | NodeKind::Map => return Err(Error::BadPushback),
        }
        self.push_item(seq, item);
        Ok(())
    }

    /// Append to a node already known to be a sequence.
    pub fn push_item(&mut self, seq: Slot, item: Slot) {
        self.data_mut(seq).items.push(item);
        self.add_dependency(item, seq);
    }

    /// The sequence item at `index`, appending a fresh undefined item when
    /// `index` is one past the end. `None` if `index` cannot address the
    /// node as a sequence.
    pub fn sequence_slot(&mut self, seq: Slot, index: usize) -> Option<Slot> {
        let data = self.data(seq);
        let len = if data.kind == NodeKind::Sequence { data.items.len() } else { 0 };
        if index > len || (index > 0 && !self.data(data.items[index - 1]).defined) {
            return None;
        }
        let data = self.data_mut(seq);
        if data.kind != NodeKind::Sequence {
            data.kind = NodeKind::Sequence;
            data.items.clear();
        }
        let item = if index == len {
            let item = self.alloc(NodeData::default());
            self.data_mut(seq).items.push(item);
            item
        } else {
            self.data(seq).items[index]
        };
        self.add_dependency(item, seq);
        Some(item)
    }

    pub fn remove_item(&mut self, seq: Slot, index: usize) -> bool {
        let items = &mut self.data_mut(seq).items;
        if index < items.len() {
            items.remove(index);
            true
        } else {
            false
        }
    }

    /// Turn the node into a map. Sequence items are keyed by position.
    ///
    /// Returns `false` for scalars, which cannot be converted.
    pub fn convert_to_map(&mut self, slot: Slot) -> bool {
        let data = self.data_mut(slot);
        match data.kind {
            NodeKind::Map => return true,
            NodeKind::Scalar => return false,
            NodeKind::Undefined | NodeKind::Null => {
                data.kind = NodeKind::Map;
                data.items.clear();
                data.pairs.clear();
                return true;
            }
            NodeKind::Sequence => {}
        }
        let items = std::mem::take(&mut data.items);
        data.kind = NodeKind::Map;
        data.pairs.clear();
        trace!(len = items.len(), "converting sequence to map");
        for (index, item) in items.into_iter().enumerate() {
            let key = self.alloc(NodeData::scalar(index.to_string()));
            self.data_mut(slot).pairs.push((key, item));
        }
        true
    }

    /// Append a pair, even if an equal key is already present.
    pub fn insert_pair(&mut self, map: Slot, key: Slot, value: Slot) {
        self.data_mut(map).pairs.push((key, value));
        self.add_dependency(key, map);
        self.add_dependency(value, map);
    }

    /// Set the value for `key`, replacing the value of an equal key.
    pub fn insert(&mut self, map: Slot, key: Slot, value: Slot) {
        match self.find_key(map, key) {
            Some(index) => {
                self.data_mut(map).pairs[index].1 = value;
                self.add_dependency(value, map);
            }
            None => self.insert_pair(map, key, value),
        }
    }

    /// Position of the first pair whose key equals `key`.
    pub fn find_key(&self, map: Slot, key: Slot) -> Option<usize> {
        self.data(map)
            .pairs
            .iter()
            .position(|&(candidate, _)| self.same_key(candidate, key))
    }

    /// Key equality: identity, then scalar text, then structure.
    pub fn same_key(&self, a: Slot, b: Slot) -> bool {
        self.structurally_equal(a, b, &mut HashSet::new())
    }

    fn structurally_equal(&self, a: Slot, b: Slot, seen: &mut HashSet<(CellId, CellId)>) -> bool {
        let (cell_a, cell_b) = (self.cell(a), self.cell(b));
        if cell_a == cell_b || !seen.insert((cell_a, cell_b)) {
            return true;
        }
        let (data_a, data_b) = (self.data(a), self.data(b));
        if data_a.kind() != data_b.kind() {
            return false;
        }
        match data_a.kind() {
            NodeKind::Undefined | NodeKind::Null => true,
            NodeKind::Scalar => data_a.scalar == data_b.scalar,
            NodeKind::Sequence => {
                let (items_a, items_b) = (self.defined_items(a), self.defined_items(b));
                items_a.len() == items_b.len()
                    && items_a
                        .iter()
                        .zip(&items_b)
                        .all(|(&x, &y)| self.structurally_equal(x, y, seen))
            }
            NodeKind::Map => {
                let (pairs_a, pairs_b) = (self.defined_pairs(a), self.defined_pairs(b));
                pairs_a.len() == pairs_b.len()
                    && pairs_a.iter().zip(&pairs_b).all(|(&(ka, va), &(kb, vb))| {
                        self.structurally_equal(ka, kb, seen) && self.structurally_equal(va, vb, seen)
                    })
            }
        }
    }

    /// New node with a copy of the data; children stay shared.
    pub fn shallow_copy(&mut self, slot: Slot) -> Slot {
        let data = self.data(slot).clone();
        self.alloc(data)
    }

    /// Copy the node and, recursively, its sequence items and map values.
    /// Map keys are copied shallowly. On failure nothing stays allocated.
    pub fn deep_copy(&mut self, slot: Slot) -> Result<Slot, Error> {
        let (slots, cells) = (self.slots.len(), self.cells.len());
        self.deep_copy_at(slot, 0).inspect_err(|_| {
            self.slots.truncate(slots);
            self.cells.truncate(cells);
        })
    }

    fn deep_copy_at(&mut self, slot: Slot, depth: usize) -> Result<Slot, Error> {
        let mut data = self.data(slot).clone();
        if depth >= MAX_CLONE_DEPTH {
            return Err(Error::DeepRecursion {
                mark: data.mark,
                limit: MAX_CLONE_DEPTH,
            });
        }
        data.items = data
            .items
            .iter()
            .map(|&item| self.deep_copy_at(item, depth + 1))
            .collect::<Result<_, _>>()?;
        data.pairs = data
            .pairs
            .iter()
            .map(|&(key, value)| Ok((self.shallow_copy(key), self.deep_copy_at(value, depth + 1)?)))
            .collect::<Result<_, Error>>()?;
        Ok(self.alloc(data))
    }

    /// Shallow copy of `slot`, then unshared in place.
    ///
    /// The first occurrence of each child stays shared with the source and
    /// is unshared in place as well, so the source sees that part. A back
    /// edge to the source itself counts as a repeat and is copied.
    pub fn unshared_copy(&mut self, slot: Slot) -> Slot {
        let copy = self.shallow_copy(slot);
        let mut seen = HashSet::from([self.cell(slot), self.cell(copy)]);
        self.unshare_children(copy, &mut seen);
        copy
    }

    /// Replace every second and later occurrence of a shared child below
    /// `root` with an independent copy. Works in place.
    pub fn unshare(&mut self, root: Slot) {
        let mut seen = HashSet::new();
        seen.insert(self.cell(root));
        self.unshare_children(root, &mut seen);
    }

    /// Replace the defined sequence items or map values of `slot`, in
    /// order. `None` drops the entry. Undefined entries are left alone.
    pub fn replace_children(&mut self, slot: Slot, values: &[Option<Slot>]) {
        match self.data(slot).kind() {
            NodeKind::Sequence => {
                let defined = self.defined_items(slot).len().min(values.len());
                let rest = self.data(slot).items[defined..].to_vec();
                let items: Vec<Slot> = values[..defined].iter().flatten().copied().collect();
                for &item in &items {
                    self.add_dependency(item, slot);
                }
                let data = self.data_mut(slot);
                data.items = items;
                data.items.extend(rest);
            }
            NodeKind::Map => {
                let pairs = self.data(slot).pairs.clone();
                let mut values = values.iter();
                let mut kept = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let defined = self.data(key).defined && self.data(value).defined;
                    match defined.then(|| values.next()).flatten() {
                        None => kept.push((key, value)),
                        Some(None) => {}
                        Some(&Some(replacement)) => kept.push((key, replacement)),
                    }
                }
                self.data_mut(slot).pairs = kept;
            }
            _ => {}
        }
    }

    fn unshare_children(&mut self, slot: Slot, seen: &mut HashSet<CellId>) {
        let items = self.data(slot).items.clone();
        for (index, item) in items.into_iter().enumerate() {
            if let Some(copy) = self.unshare_child(item, seen) {
                self.data_mut(slot).items[index] = copy;
            }
        }
        let pairs = self.data(slot).pairs.clone();
        for (index, (_, value)) in pairs.into_iter().enumerate() {
            if let Some(copy) = self.unshare_child(value, seen) {
                self.data_mut(slot).pairs[index].1 = copy;
            }
        }
    }

    fn unshare_child(&mut self, child: Slot, seen: &mut HashSet<CellId>) -> Option<Slot> {
        if seen.insert(self.cell(child)) {
            self.unshare_children(child, seen);
            None
        } else {
            Some(self.copy_guarded(child, &mut HashMap::new()))
        }
    }

    /// Deep copy that maps back edges onto the copy of their target, so
    /// cycles are copied as cycles.
    fn copy_guarded(&mut self, slot: Slot, path: &mut HashMap<CellId, Slot>) -> Slot {
        let cell = self.cell(slot);
        if let Some(&copy) = path.get(&cell) {
            return copy;
        }
        let data = self.data(slot).clone();
        let copy = self.alloc(NodeData::default());
        path.insert(cell, copy);
        let items = data
            .items
            .iter()
            .map(|&item| self.copy_guarded(item, path))
            .collect();
        let pairs = data
            .pairs
            .iter()
            .map(|&(key, value)| (self.shallow_copy(key), self.copy_guarded(value, path)))
            .collect();
        path.remove(&cell);
        *self.data_mut(copy) = NodeData { items, pairs, ..data };
        copy
    }

    /// Move every node of `other` into this arena. Returns the slot offset.
    fn absorb(&mut self, other: Arena) -> usize {
        let slot_offset = self.slots.len();
        let cell_offset = self.cells.len();
        self.slots
            .extend(other.slots.into_iter().map(|cell| cell + cell_offset));
        self.cells.extend(other.cells.into_iter().map(|mut cell| {
            for item in &mut cell.data.items {
                *item += slot_offset;
            }
            for (key, value) in &mut cell.data.pairs {
                *key += slot_offset;
                *value += slot_offset;
            }
            for dependent in &mut cell.dependents {
                *dependent += slot_offset;
            }
            cell
        }));
        slot_offset
    }
}

#[derive(Default)]
struct Pool {
    arena: Arena,
    /// Set once the arena has moved: where to, and at which slot offset.
    forward: Option<(Memory, usize)>,
}

/// Shared handle to an arena.
#[derive(Clone, Default)]
pub(crate) struct Memory(Rc<RefCell<Pool>>);

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory holding a single node.
    pub fn with_node(data: NodeData) -> (Self, Slot) {
        let memory = Self::new();
        let slot = memory.write(|arena| arena.alloc(data));
        (memory, slot)
    }

    /// The live arena this memory forwards to, with the slot offset.
    fn root(&self) -> (Memory, usize) {
        let (target, offset) = match &self.0.borrow().forward {
            None => return (self.clone(), 0),
            Some((target, offset)) => (target.clone(), *offset),
        };
        let (root, further) = target.root();
        let total = offset + further;
        if !Rc::ptr_eq(&root.0, &target.0) {
            self.0.borrow_mut().forward = Some((root.clone(), total));
        }
        (root, total)
    }

    /// Where a slot of this memory lives now.
    pub fn resolve(&self, slot: Slot) -> (Memory, Slot) {
        let (root, offset) = self.root();
        (root, slot + offset)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Arena) -> R) -> R {
        let (root, _) = self.root();
        let pool = root.0.borrow();
        f(&pool.arena)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut Arena) -> R) -> R {
        let (root, _) = self.root();
        let mut pool = root.0.borrow_mut();
        f(&mut pool.arena)
    }

    /// Address of the live arena; equal for memories that have merged.
    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.root().0.0).cast::<()>() as usize
    }

    pub fn same(&self, other: &Memory) -> bool {
        Rc::ptr_eq(&self.root().0.0, &other.root().0.0)
    }

    /// Join two arenas so their nodes can reference each other.
    pub fn merge(&self, other: &Memory) {
        let (a, _) = self.root();
        let (b, _) = other.root();
        if Rc::ptr_eq(&a.0, &b.0) {
            return;
        }
        let (into, from) = if a.read(Arena::len) >= b.read(Arena::len) {
            (a, b)
        } else {
            (b, a)
        };
        let moved = std::mem::take(&mut from.0.borrow_mut().arena);
        let moved_len = moved.len();
        let offset = into.0.borrow_mut().arena.absorb(moved);
        from.0.borrow_mut().forward = Some((into, offset));
        trace!(moved = moved_len, offset, "merged node arenas");
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory")
            .field("nodes", &self.read(Arena::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_cascades_to_dependents() {
        let mut arena = Arena::default();
        let map = arena.alloc(NodeData::collection(NodeKind::Map));
        let key = arena.alloc(NodeData::scalar("k"));
        let value = arena.alloc(NodeData::default());
        arena.insert_pair(map, key, value);
        assert_eq!(arena.size(map), 0);

        arena.set_scalar(value, "v");
        assert_eq!(arena.size(map), 1);
    }

    #[test]
    fn set_ref_shares_identity() {
        let mut arena = Arena::default();
        let a = arena.alloc(NodeData::scalar("a"));
        let b = arena.alloc(NodeData::scalar("b"));
        arena.set_ref(a, b);
        assert_eq!(arena.cell(a), arena.cell(b));
        arena.set_scalar(b, "c");
        assert_eq!(arena.data(a).scalar, "c");
    }

    #[test]
    fn merged_handles_still_resolve() {
        let (small, small_slot) = Memory::with_node(NodeData::scalar("small"));
        let (big, _) = Memory::with_node(NodeData::scalar("first"));
        big.write(|arena| arena.alloc(NodeData::scalar("second")));

        small.merge(&big);
        assert!(small.same(&big));
        let (root, slot) = small.resolve(small_slot);
        assert_eq!(slot, 2);
        assert_eq!(root.read(|arena| arena.data(slot).scalar.clone()), "small");
    }

    #[test]
    fn forwarding_chains_compress() {
        let (a, a_slot) = Memory::with_node(NodeData::scalar("a"));
        let (b, _) = Memory::with_node(NodeData::scalar("b"));
        let (c, _) = Memory::with_node(NodeData::scalar("c"));
        c.write(|arena| arena.alloc(NodeData::null()));
        c.write(|arena| arena.alloc(NodeData::null()));

        // b moves into a, then a moves into c.
        a.merge(&b);
        b.merge(&c);
        let (root, slot) = b.resolve(0);
        assert!(root.same(&c));
        assert_eq!(root.read(|arena| arena.data(slot).scalar.clone()), "b");
        assert!(matches!(&b.0.borrow().forward, Some((target, _)) if Rc::ptr_eq(&target.0, &root.0)));
        let (_, slot) = a.resolve(a_slot);
        assert_eq!(c.read(|arena| arena.data(slot).scalar.clone()), "a");
    }

    #[test]
    fn structural_key_equality_survives_cycles() {
        let mut arena = Arena::default();
        let a = arena.alloc(NodeData::collection(NodeKind::Sequence));
        let b = arena.alloc(NodeData::collection(NodeKind::Sequence));
        arena.push_back(a, a).unwrap();
        arena.push_back(b, b).unwrap();
        assert!(arena.same_key(a, b));
    }

    #[test]
    fn failed_deep_copy_leaves_nothing_behind() {
        let mut arena = Arena::default();
        let list = arena.alloc(NodeData::collection(NodeKind::Sequence));
        arena.push_back(list, list).unwrap();
        let len = arena.len();
        assert!(matches!(arena.deep_copy(list), Err(Error::DeepRecursion { .. })));
        assert_eq!(arena.len(), len);
        assert_eq!(arena.cells.len(), len);
    }
}
