use std::sync::{Arc, Weak};

use serde::Serialize;

use crate::node::DescriptorNode;

/// Address of a cell: the blob's own property locator.
///
/// Tokens are compared for equality only. They are not byte offsets of the
/// value and carry no arithmetic.
pub type CellToken = nvfdt_format::PropertyToken;

/// One named, fixed-length unit exposed by a translation layer.
#[derive(Clone, Debug, Serialize)]
pub struct Cell {
    /// Property name, verbatim.
    pub name: String,
    /// Locator of the property inside the blob.
    pub token: CellToken,
    /// Exact stored value length in bytes.
    pub length: usize,
    #[serde(skip)]
    node: Option<Weak<DescriptorNode>>,
}

impl Cell {
    pub fn new(name: impl Into<String>, token: CellToken, length: usize) -> Self {
        Self {
            name: name.into(),
            token,
            length,
            node: None,
        }
    }

    /// Associate the host descriptor node without taking ownership.
    pub fn with_node(mut self, node: &Arc<DescriptorNode>) -> Self {
        self.node = Some(Arc::downgrade(node));
        self
    }

    /// The associated descriptor node, if one was found and still exists.
    pub fn node(&self) -> Option<Arc<DescriptorNode>> {
        self.node.as_ref().and_then(Weak::upgrade)
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        let same_node = match (&self.node, &other.node) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        self.name == other.name
            && self.token == other.token
            && self.length == other.length
            && same_node
    }
}

impl Eq for Cell {}

/// Ordered cell directory, in blob order.
///
/// Built once; nothing mutates it afterwards, so lookups need no locking.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CellTable {
    cells: Vec<Cell>,
}

impl CellTable {
    pub(crate) fn from_cells(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cell> {
        self.cells.iter()
    }

    pub fn as_slice(&self) -> &[Cell] {
        &self.cells
    }

    /// First cell, in table order, at `token` holding at least `length`
    /// bytes.
    pub fn find(&self, token: CellToken, length: usize) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|cell| cell.token == token && cell.length >= length)
    }

    /// First cell named `name`.
    pub fn by_name(&self, name: &str) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.name == name)
    }
}

impl<'a> IntoIterator for &'a CellTable {
    type Item = &'a Cell;
    type IntoIter = std::slice::Iter<'a, Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}
