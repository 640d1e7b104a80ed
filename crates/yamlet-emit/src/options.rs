//! Emitter options.

/// Options for [`Emitter`](crate::Emitter).
#[derive(Debug, Clone)]
pub struct EmitterOptions {
    /// Columns per nesting level in block layout (default: 2, at least 2)
    pub indent: usize,

    /// How null nodes are written (default: "~")
    pub null_repr: &'static str,

    /// Written between entries of flow collections (default: ", ")
    pub flow_separator: &'static str,

    /// Indent a block sequence that is a map value (default: true).
    /// When false the `-` lines up with the key.
    pub sequence_in_map_indent: bool,

    /// Write every collection in flow style (default: false)
    pub force_flow: bool,

    /// Write every collection in block style, ignoring flow styles recorded
    /// on nodes (default: false). Keys that are collections stay flow.
    pub force_block: bool,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            null_repr: "~",
            flow_separator: ", ",
            sequence_in_map_indent: true,
            force_flow: false,
            force_block: false,
        }
    }
}

impl EmitterOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block indentation width.
    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = indent.max(2);
        self
    }

    /// Set the text written for null nodes.
    pub fn null_repr(mut self, null_repr: &'static str) -> Self {
        self.null_repr = null_repr;
        self
    }

    /// Set the separator between flow entries.
    pub fn flow_separator(mut self, separator: &'static str) -> Self {
        self.flow_separator = separator;
        self
    }

    /// Line sequences that are map values up with their key.
    pub fn indentless_sequences(mut self) -> Self {
        self.sequence_in_map_indent = false;
        self
    }

    /// Force all collections into flow style.
    pub fn flow(mut self) -> Self {
        self.force_flow = true;
        self.force_block = false;
        self
    }

    /// Force all collections into block style.
    pub fn block(mut self) -> Self {
        self.force_block = true;
        self.force_flow = false;
        self
    }
}
