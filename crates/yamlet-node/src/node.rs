//! The [`Node`] handle.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use yamlet_parse::{Mark, Style};

use crate::memory::{Arena, Memory, NodeData, Slot};
use crate::{Decode, Encode, Error};

/// What a node holds.
///
/// `Undefined` is what a lookup hands out for a key or index that does not
/// exist yet: the node springs into existence once something is written to
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeKind {
    Undefined,
    #[default]
    Null,
    Scalar,
    Sequence,
    Map,
}

/// How [`Node::clone_node`] copies a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneMode {
    /// A new node with the same content; children stay shared.
    Shallow,
    /// Copy the whole subtree. Fails with [`Error::DeepRecursion`] on graphs
    /// that contain themselves.
    Deep,
    /// A shallow copy, then [`Node::unshare_subtrees`] on it: the first
    /// occurrence of each child stays shared with the source, repeats get
    /// their own copies.
    UnshareSubtrees,
}

/// Identity of a node, as compared by [`Node::is`].
///
/// Ids stay stable until the node's arena is merged with another one, which
/// happens when nodes from separate graphs are linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    memory: usize,
    cell: usize,
}

/// A handle to a node in a YAML graph.
///
/// Handles are cheap to clone and compare by identity: two handles are equal
/// when they name the same node, as with an anchor and its aliases. Writes
/// through any handle are visible through all of them.
#[derive(Clone)]
pub struct Node {
    memory: Memory,
    slot: Slot,
}

impl Node {
    /// A new null node.
    pub fn new() -> Self {
        Self::from_data(NodeData::null())
    }

    /// A new empty node of the given kind.
    pub fn with_kind(kind: NodeKind) -> Self {
        let data = match kind {
            NodeKind::Undefined => NodeData::default(),
            NodeKind::Null => NodeData::null(),
            NodeKind::Scalar => NodeData::scalar(""),
            NodeKind::Sequence | NodeKind::Map => NodeData::collection(kind),
        };
        Self::from_data(data)
    }

    pub(crate) fn new_scalar(text: impl Into<String>) -> Self {
        Self::from_data(NodeData::scalar(text))
    }

    pub(crate) fn from_data(data: NodeData) -> Self {
        let (memory, slot) = Memory::with_node(data);
        Self { memory, slot }
    }

    pub(crate) fn from_parts(memory: Memory, slot: Slot) -> Self {
        Self { memory, slot }
    }

    /// The live arena and slot behind this handle.
    pub(crate) fn at(&self) -> (Memory, Slot) {
        self.memory.resolve(self.slot)
    }

    fn read<R>(&self, f: impl FnOnce(&Arena, Slot) -> R) -> R {
        let (memory, slot) = self.at();
        memory.read(|arena| f(arena, slot))
    }

    fn write<R>(&self, f: impl FnOnce(&mut Arena, Slot) -> R) -> R {
        let (memory, slot) = self.at();
        memory.write(|arena| f(arena, slot))
    }

    pub fn kind(&self) -> NodeKind {
        self.read(|arena, slot| arena.data(slot).kind())
    }

    pub fn is_defined(&self) -> bool {
        self.read(|arena, slot| arena.data(slot).defined)
    }

    pub fn is_null(&self) -> bool {
        self.kind() == NodeKind::Null
    }

    pub fn is_scalar(&self) -> bool {
        self.kind() == NodeKind::Scalar
    }

    pub fn is_sequence(&self) -> bool {
        self.kind() == NodeKind::Sequence
    }

    pub fn is_map(&self) -> bool {
        self.kind() == NodeKind::Map
    }

    /// Where the node was loaded from. Built nodes have the default mark.
    pub fn mark(&self) -> Mark {
        self.read(|arena, slot| arena.data(slot).mark)
    }

    pub fn tag(&self) -> String {
        self.read(|arena, slot| arena.data(slot).tag.clone())
    }

    pub fn set_tag(&self, tag: &str) {
        self.write(|arena, slot| arena.set_tag(slot, tag));
    }

    pub fn style(&self) -> Style {
        self.read(|arena, slot| arena.data(slot).style)
    }

    pub fn set_style(&self, style: Style) {
        self.write(|arena, slot| arena.set_style(slot, style));
    }

    /// The scalar text; empty for anything that is not a scalar.
    pub fn scalar(&self) -> String {
        self.read(|arena, slot| {
            let data = arena.data(slot);
            if data.kind() == NodeKind::Scalar {
                data.scalar.clone()
            } else {
                String::new()
            }
        })
    }

    /// Number of defined items or entries. Zero for scalars and nulls.
    pub fn size(&self) -> usize {
        self.read(|arena, slot| arena.size(slot))
    }

    /// The sequence items, stopping at the first undefined one.
    pub fn iter(&self) -> std::vec::IntoIter<Node> {
        let (memory, slot) = self.at();
        let items = memory.read(|arena| arena.defined_items(slot));
        items
            .into_iter()
            .map(|item| Node::from_parts(memory.clone(), item))
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// The map entries whose key and value are both defined.
    pub fn entries(&self) -> std::vec::IntoIter<(Node, Node)> {
        let (memory, slot) = self.at();
        let pairs = memory.read(|arena| arena.defined_pairs(slot));
        pairs
            .into_iter()
            .map(|(key, value)| {
                (
                    Node::from_parts(memory.clone(), key),
                    Node::from_parts(memory.clone(), value),
                )
            })
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Whether both handles name the same node.
    pub fn is(&self, other: &Node) -> bool {
        let (memory, slot) = self.at();
        let (other_memory, other_slot) = other.at();
        memory.same(&other_memory)
            && memory.read(|arena| arena.cell(slot) == arena.cell(other_slot))
    }

    pub fn id(&self) -> NodeId {
        let (memory, slot) = self.at();
        NodeId {
            memory: memory.address(),
            cell: memory.read(|arena| arena.cell(slot)),
        }
    }

    /// Make this handle's node the same node as `other`.
    ///
    /// Every handle and parent that reached the old node through this slot
    /// now reaches `other`.
    pub fn assign(&mut self, other: &Node) {
        self.memory.merge(&other.memory);
        let (memory, slot) = self.at();
        let (_, target) = other.at();
        memory.write(|arena| arena.set_ref(slot, target));
        self.reset(other);
    }

    /// Overwrite the node's content with `value`, keeping its identity.
    pub fn set(&self, value: impl Encode) {
        let source = value.encode();
        let leaf = source.read(|arena, slot| arena.data(slot).is_leaf());
        if !leaf {
            self.memory.merge(&source.memory);
        }
        let data = source.read(|arena, slot| arena.data(slot).clone());
        self.write(|arena, slot| arena.set_data(slot, data));
    }

    /// Rebind this handle to `other` without touching either node.
    pub fn reset(&mut self, other: &Node) {
        self.memory = other.memory.clone();
        self.slot = other.slot;
    }

    pub fn decode<T: Decode>(&self) -> Result<T, Error> {
        T::decode(self)
    }

    /// Decode, or return `fallback` if the node does not convert.
    pub fn decode_or<T: Decode>(&self, fallback: T) -> T {
        T::decode(self).unwrap_or(fallback)
    }

    /// Whether the node decodes to `value`. A node that does not convert is
    /// simply unequal.
    pub fn equals<T: Decode + PartialEq>(&self, value: &T) -> Result<bool, Error> {
        match T::decode(self) {
            Ok(decoded) => Ok(decoded == *value),
            Err(error) if error.is_conversion() => Ok(false),
            Err(error) => Err(error),
        }
    }

    pub fn clone_node(&self, mode: CloneMode) -> Result<Node, Error> {
        let (memory, slot) = self.at();
        let copy = match mode {
            CloneMode::Shallow => memory.write(|arena| arena.shallow_copy(slot)),
            CloneMode::Deep => memory.write(|arena| arena.deep_copy(slot))?,
            CloneMode::UnshareSubtrees => memory.write(|arena| arena.unshared_copy(slot)),
        };
        Ok(Node::from_parts(memory, copy))
    }

    /// Give every shared child below this node its own copy, so that each
    /// node is reachable along one path only. Cycles are kept as cycles.
    pub fn unshare_subtrees(&self) {
        self.write(|arena, slot| arena.unshare(slot));
    }

    /// Detach this handle onto a fresh copy of its node's data. Other
    /// handles keep the old node; children stay shared.
    pub fn own_data(&mut self) {
        let (memory, slot) = self.at();
        let copy = memory.write(|arena| arena.shallow_copy(slot));
        *self = Node::from_parts(memory, copy);
    }

    /// Replace each sequence item or map value with what `f` returns, or
    /// drop it when `f` returns `None`.
    pub fn modify_values(&self, mut f: impl FnMut(&Node) -> Option<Node>) {
        self.modify_key_values(|_, value| f(value));
    }

    /// Like [`Node::modify_values`], also passing the key text of map
    /// entries with scalar keys.
    pub fn modify_key_values(&self, mut f: impl FnMut(Option<&str>, &Node) -> Option<Node>) {
        let replacements: Vec<Option<Node>> = match self.kind() {
            NodeKind::Sequence => self.iter().map(|item| f(None, &item)).collect(),
            NodeKind::Map => self
                .entries()
                .map(|(key, value)| {
                    let text = key.is_scalar().then(|| key.scalar());
                    f(text.as_deref(), &value)
                })
                .collect(),
            _ => return,
        };
        for node in replacements.iter().flatten() {
            self.memory.merge(&node.memory);
        }
        let slots: Vec<Option<Slot>> = replacements
            .iter()
            .map(|node| node.as_ref().map(|node| node.at().1))
            .collect();
        self.write(|arena, slot| arena.replace_children(slot, &slots));
    }

    /// Look up a sequence item or map value without changing anything.
    /// Entries that are still undefined read as missing.
    pub fn get(&self, key: impl NodeIndex) -> Result<Option<Node>, Error> {
        let (memory, slot) = self.at();
        let (kind, mark) = memory.read(|arena| (arena.data(slot).kind(), arena.data(slot).mark));
        match kind {
            NodeKind::Scalar => Err(Error::BadSubscript {
                mark,
                key: key.describe(),
            }),
            NodeKind::Undefined | NodeKind::Null => Ok(None),
            NodeKind::Sequence => {
                let items = memory.read(|arena| arena.defined_items(slot));
                Ok(key
                    .position()
                    .and_then(|index| items.get(index).copied())
                    .map(|item| Node::from_parts(memory, item)))
            }
            NodeKind::Map => {
                let pairs = memory.read(|arena| arena.defined_pairs(slot));
                for (candidate, value) in pairs {
                    if key.matches(&Node::from_parts(memory.clone(), candidate))? {
                        return Ok(Some(Node::from_parts(memory, value)));
                    }
                }
                Ok(None)
            }
        }
    }

    /// Look up a sequence item or map value, creating an undefined node for
    /// it when missing.
    ///
    /// Indexing one past the end of a sequence extends it. Any other key on
    /// a sequence, null or undefined node turns the node into a map.
    pub fn get_or_create(&self, key: impl NodeIndex) -> Result<Node, Error> {
        let (kind, mark) = self.read(|arena, slot| (arena.data(slot).kind, arena.data(slot).mark));
        match kind {
            NodeKind::Scalar => {
                return Err(Error::BadSubscript {
                    mark,
                    key: key.describe(),
                });
            }
            NodeKind::Map => {}
            NodeKind::Undefined | NodeKind::Null | NodeKind::Sequence => {
                if let Some(index) = key.position() {
                    let (memory, slot) = self.at();
                    if let Some(item) = memory.write(|arena| arena.sequence_slot(slot, index)) {
                        return Ok(Node::from_parts(memory, item));
                    }
                }
                self.write(|arena, slot| arena.convert_to_map(slot));
            }
        }

        let (memory, slot) = self.at();
        let pairs = memory.read(|arena| arena.data(slot).pairs.clone());
        for (candidate, value) in pairs {
            if key.matches(&Node::from_parts(memory.clone(), candidate))? {
                let value = Node::from_parts(memory.clone(), value);
                let (memory, value_slot) = value.at();
                let (_, map_slot) = self.at();
                memory.write(|arena| arena.add_dependency(value_slot, map_slot));
                return Ok(value);
            }
        }

        let key = key.to_node();
        self.memory.merge(&key.memory);
        let (memory, slot) = self.at();
        let (_, key_slot) = key.at();
        let value = memory.write(|arena| {
            let value = arena.alloc(NodeData::default());
            arena.insert_pair(slot, key_slot, value);
            value
        });
        Ok(Node::from_parts(memory, value))
    }

    /// Remove a sequence item or the first matching map entry. Returns
    /// whether anything was removed.
    pub fn remove(&self, key: impl NodeIndex) -> Result<bool, Error> {
        let (memory, slot) = self.at();
        let data = memory.read(|arena| arena.data(slot).clone());
        match data.kind {
            NodeKind::Sequence => Ok(key
                .position()
                .is_some_and(|index| self.write(|arena, slot| arena.remove_item(slot, index)))),
            NodeKind::Map => {
                for (index, (candidate, _)) in data.pairs.into_iter().enumerate() {
                    if key.matches(&Node::from_parts(memory.clone(), candidate))? {
                        self.write(|arena, slot| {
                            arena.data_mut(slot).pairs.remove(index);
                        });
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    /// Append to a sequence; a null or undefined node becomes one.
    pub fn push_back(&self, value: impl Encode) -> Result<(), Error> {
        let item = value.encode();
        self.memory.merge(&item.memory);
        let (memory, slot) = self.at();
        let (_, item_slot) = item.at();
        memory.write(|arena| arena.push_back(slot, item_slot))
    }

    /// Set the value for `key`, replacing the value of an equal key.
    pub fn insert(&self, key: impl Encode, value: impl Encode) -> Result<(), Error> {
        self.insert_with(key.encode(), value.encode(), Arena::insert)
    }

    /// Append an entry even if an equal key is already present.
    pub fn force_insert(&self, key: impl Encode, value: impl Encode) -> Result<(), Error> {
        self.insert_with(key.encode(), value.encode(), Arena::insert_pair)
    }

    fn insert_with(
        &self,
        key: Node,
        value: Node,
        insert: fn(&mut Arena, Slot, Slot, Slot),
    ) -> Result<(), Error> {
        self.memory.merge(&key.memory);
        self.memory.merge(&value.memory);
        let (memory, slot) = self.at();
        let (_, key_slot) = key.at();
        let (_, value_slot) = value.at();
        memory.write(|arena| {
            if !arena.convert_to_map(slot) {
                return Err(Error::BadInsert);
            }
            insert(arena, slot, key_slot, value_slot);
            Ok(())
        })
    }

    /// Append to a node known to be a sequence.
    pub(crate) fn append(&self, item: Node) {
        self.memory.merge(&item.memory);
        let (memory, slot) = self.at();
        let (_, item_slot) = item.at();
        memory.write(|arena| arena.push_item(slot, item_slot));
    }

    /// Append an entry to a node known to be a map.
    pub(crate) fn append_pair(&self, key: Node, value: Node) {
        self.memory.merge(&key.memory);
        self.memory.merge(&value.memory);
        let (memory, slot) = self.at();
        let (_, key_slot) = key.at();
        let (_, value_slot) = value.at();
        memory.write(|arena| arena.insert_pair(slot, key_slot, value_slot));
    }

    /// Key equality as maps use it: identity, then structure.
    pub(crate) fn same_key(&self, other: &Node) -> bool {
        self.memory.merge(&other.memory);
        let (memory, slot) = self.at();
        let (_, other_slot) = other.at();
        memory.read(|arena| arena.same_key(slot, other_slot))
    }

    fn debug_into(&self, f: &mut fmt::Formatter<'_>, path: &mut Vec<Node>) -> fmt::Result {
        if path.iter().any(|ancestor| ancestor.is(self)) {
            return write!(f, "<cycle>");
        }
        match self.kind() {
            NodeKind::Undefined => write!(f, "<undefined>"),
            NodeKind::Null => write!(f, "~"),
            NodeKind::Scalar => write!(f, "{:?}", self.scalar()),
            NodeKind::Sequence => {
                path.push(self.clone());
                write!(f, "[")?;
                for (index, item) in self.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    item.debug_into(f, path)?;
                }
                path.pop();
                write!(f, "]")
            }
            NodeKind::Map => {
                path.push(self.clone());
                write!(f, "{{")?;
                for (index, (key, value)) in self.entries().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    key.debug_into(f, path)?;
                    write!(f, ": ")?;
                    value.debug_into(f, path)?;
                }
                path.pop();
                write!(f, "}}")
            }
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.is(other)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.debug_into(f, &mut Vec::new())
    }
}

impl IntoIterator for &Node {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

macro_rules! impl_from {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Node {
            fn from(value: $ty) -> Self {
                value.encode()
            }
        }
    )*};
}

impl_from!(
    &str, String, bool, char, (), i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64
);

impl<T: Encode> From<Vec<T>> for Node {
    fn from(value: Vec<T>) -> Self {
        value.encode()
    }
}

impl<T: Encode, const N: usize> From<[T; N]> for Node {
    fn from(value: [T; N]) -> Self {
        value.encode()
    }
}

impl<K: Encode, V: Encode> From<BTreeMap<K, V>> for Node {
    fn from(value: BTreeMap<K, V>) -> Self {
        value.encode()
    }
}

/// Something that can address a node's children: a sequence position, a
/// map key, or both.
pub trait NodeIndex {
    /// The sequence position this index names, if it names one.
    fn position(&self) -> Option<usize> {
        None
    }

    /// Whether `key`, a key already present in a map, is this key.
    fn matches(&self, key: &Node) -> Result<bool, Error>;

    /// The key node to store when a lookup creates an entry.
    fn to_node(&self) -> Node;

    /// How the index reads in an error message.
    fn describe(&self) -> String;
}

impl<T: NodeIndex + ?Sized> NodeIndex for &T {
    fn position(&self) -> Option<usize> {
        (**self).position()
    }

    fn matches(&self, key: &Node) -> Result<bool, Error> {
        (**self).matches(key)
    }

    fn to_node(&self) -> Node {
        (**self).to_node()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl NodeIndex for str {
    fn matches(&self, key: &Node) -> Result<bool, Error> {
        Ok(key.is_scalar() && key.scalar() == self)
    }

    fn to_node(&self) -> Node {
        self.encode()
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl NodeIndex for String {
    fn matches(&self, key: &Node) -> Result<bool, Error> {
        NodeIndex::matches(self.as_str(), key)
    }

    fn to_node(&self) -> Node {
        self.encode()
    }

    fn describe(&self) -> String {
        self.clone()
    }
}

macro_rules! impl_index {
    ($($ty:ty),*) => {$(
        impl NodeIndex for $ty {
            fn position(&self) -> Option<usize> {
                usize::try_from(*self).ok()
            }

            fn matches(&self, key: &Node) -> Result<bool, Error> {
                key.equals(self)
            }

            fn to_node(&self) -> Node {
                self.encode()
            }

            fn describe(&self) -> String {
                self.to_string()
            }
        }
    )*};
}

impl_index!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl NodeIndex for bool {
    fn matches(&self, key: &Node) -> Result<bool, Error> {
        key.equals(self)
    }

    fn to_node(&self) -> Node {
        self.encode()
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl NodeIndex for char {
    fn matches(&self, key: &Node) -> Result<bool, Error> {
        key.equals(self)
    }

    fn to_node(&self) -> Node {
        self.encode()
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl NodeIndex for Node {
    fn matches(&self, key: &Node) -> Result<bool, Error> {
        Ok(key.same_key(self))
    }

    fn to_node(&self) -> Node {
        self.clone()
    }

    fn describe(&self) -> String {
        match self.kind() {
            NodeKind::Scalar => self.scalar(),
            _ => format!("{:?}", self),
        }
    }
}
