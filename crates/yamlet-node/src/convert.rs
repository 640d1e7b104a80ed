//! Conversions between nodes and Rust values.

use std::collections::BTreeMap;

use crate::{Error, Node, NodeKind};

/// Build a node from a value.
pub trait Encode {
    fn encode(&self) -> Node;
}

/// Read a value back out of a node.
///
/// Implementations report a shape or text mismatch as
/// [`Error::BadConversion`].
pub trait Decode: Sized {
    fn decode(node: &Node) -> Result<Self, Error>;
}

fn bad_conversion(node: &Node) -> Error {
    Error::BadConversion { mark: node.mark() }
}

fn scalar_text(node: &Node) -> Result<String, Error> {
    if node.is_scalar() {
        Ok(node.scalar())
    } else {
        Err(bad_conversion(node))
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self) -> Node {
        (**self).encode()
    }
}

impl Encode for Node {
    fn encode(&self) -> Node {
        self.clone()
    }
}

impl Decode for Node {
    fn decode(node: &Node) -> Result<Self, Error> {
        Ok(node.clone())
    }
}

impl Encode for str {
    fn encode(&self) -> Node {
        Node::new_scalar(self)
    }
}

impl Encode for String {
    fn encode(&self) -> Node {
        Node::new_scalar(self)
    }
}

impl Decode for String {
    fn decode(node: &Node) -> Result<Self, Error> {
        scalar_text(node)
    }
}

impl Encode for () {
    fn encode(&self) -> Node {
        Node::new()
    }
}

impl Decode for () {
    fn decode(node: &Node) -> Result<Self, Error> {
        if node.is_null() { Ok(()) } else { Err(bad_conversion(node)) }
    }
}

impl Encode for bool {
    fn encode(&self) -> Node {
        Node::new_scalar(if *self { "true" } else { "false" })
    }
}

/// Lowercase, UPPERCASE or Capitalized.
fn is_flexible_case(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    let rest = chars.as_str();
    if text.chars().all(|c| c.is_ascii_lowercase()) {
        return true;
    }
    first.is_ascii_uppercase()
        && (rest.chars().all(|c| c.is_ascii_lowercase()) || rest.chars().all(|c| c.is_ascii_uppercase()))
}

impl Decode for bool {
    fn decode(node: &Node) -> Result<Self, Error> {
        const NAMES: [(&str, &str); 4] = [("y", "n"), ("yes", "no"), ("true", "false"), ("on", "off")];

        let text = scalar_text(node)?;
        if !is_flexible_case(&text) {
            return Err(bad_conversion(node));
        }
        let lower = text.to_ascii_lowercase();
        for (yes, no) in NAMES {
            if lower == yes {
                return Ok(true);
            }
            if lower == no {
                return Ok(false);
            }
        }
        Err(bad_conversion(node))
    }
}

impl Encode for char {
    fn encode(&self) -> Node {
        Node::new_scalar(self.to_string())
    }
}

impl Decode for char {
    fn decode(node: &Node) -> Result<Self, Error> {
        let text = scalar_text(node)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(bad_conversion(node)),
        }
    }
}

/// Split an integer literal into sign, radix and digits.
///
/// Accepts an optional sign, then `0x`/`0X` hex, `0o` octal or decimal
/// digits. Trailing whitespace is ignored.
fn split_int(text: &str) -> Option<(bool, u32, &str)> {
    let text = text.trim_end();
    let (negative, rest) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (radix, digits) = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        (16, hex)
    } else if let Some(octal) = rest.strip_prefix("0o") {
        (8, octal)
    } else {
        (10, rest)
    };
    let valid = !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix));
    valid.then_some((negative, radix, digits))
}

macro_rules! impl_int {
    ($($ty:ty),*) => {$(
        impl Encode for $ty {
            fn encode(&self) -> Node {
                Node::new_scalar(self.to_string())
            }
        }

        impl Decode for $ty {
            fn decode(node: &Node) -> Result<Self, Error> {
                let text = scalar_text(node)?;
                let (negative, radix, digits) = split_int(&text).ok_or_else(|| bad_conversion(node))?;
                let magnitude = i128::from_str_radix(digits, radix).map_err(|_| bad_conversion(node))?;
                let value = if negative { -magnitude } else { magnitude };
                <$ty>::try_from(value).map_err(|_| bad_conversion(node))
            }
        }
    )*};
}

impl_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Reject words a float parser would accept but YAML does not, like `inf`.
fn is_float_text(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

macro_rules! impl_float {
    ($($ty:ty),*) => {$(
        impl Encode for $ty {
            fn encode(&self) -> Node {
                let text = if self.is_nan() {
                    ".nan".to_string()
                } else if self.is_infinite() {
                    if self.is_sign_negative() { "-.inf" } else { ".inf" }.to_string()
                } else {
                    self.to_string()
                };
                Node::new_scalar(text)
            }
        }

        impl Decode for $ty {
            fn decode(node: &Node) -> Result<Self, Error> {
                let text = scalar_text(node)?;
                let trimmed = text.trim_end();
                match trimmed {
                    ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => return Ok(<$ty>::INFINITY),
                    "-.inf" | "-.Inf" | "-.INF" => return Ok(<$ty>::NEG_INFINITY),
                    ".nan" | ".NaN" | ".NAN" => return Ok(<$ty>::NAN),
                    _ => {}
                }
                if !is_float_text(trimmed) {
                    return Err(bad_conversion(node));
                }
                trimmed.parse().map_err(|_| bad_conversion(node))
            }
        }
    )*};
}

impl_float!(f32, f64);

impl<T: Encode> Encode for [T] {
    fn encode(&self) -> Node {
        let node = Node::with_kind(NodeKind::Sequence);
        for item in self {
            node.append(item.encode());
        }
        node
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self) -> Node {
        self.as_slice().encode()
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(node: &Node) -> Result<Self, Error> {
        if !node.is_sequence() {
            return Err(bad_conversion(node));
        }
        node.iter().map(|item| T::decode(&item)).collect()
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self) -> Node {
        self.as_slice().encode()
    }
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode(node: &Node) -> Result<Self, Error> {
        if !node.is_sequence() || node.size() != N {
            return Err(bad_conversion(node));
        }
        let items: Vec<T> = Vec::decode(node)?;
        items.try_into().map_err(|_| bad_conversion(node))
    }
}

impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self) -> Node {
        let node = Node::with_kind(NodeKind::Map);
        for (key, value) in self {
            node.append_pair(key.encode(), value.encode());
        }
        node
    }
}

impl<K: Decode + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn decode(node: &Node) -> Result<Self, Error> {
        if !node.is_map() {
            return Err(bad_conversion(node));
        }
        node.entries()
            .map(|(key, value)| Ok((K::decode(&key)?, V::decode(&value)?)))
            .collect()
    }
}
