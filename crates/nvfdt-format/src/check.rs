use serde::{Deserialize, Serialize};

use crate::error::{FormatError, FormatResult};
use crate::fdt::{Fdt, Tag};

/// Size of one memory reservation entry: big-endian u64 address and size.
const RSVMAP_ENTRY_SIZE: usize = 16;

/// Shape of a tree that passed [`Fdt::check_full`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Nodes, root included.
    pub nodes: usize,
    /// Properties across all nodes.
    pub properties: usize,
    /// Deepest nesting level; the root is level 1.
    pub max_depth: usize,
    /// Memory reservation entries, terminator excluded.
    pub reservations: usize,
}

impl Fdt<'_> {
    /// Walk the whole blob and reject any structural defect.
    ///
    /// Checks that the memory reservation map terminates inside the blob,
    /// that every tag is known and stays inside the struct block, that the
    /// root node is unnamed and unique, that nodes nest and close properly,
    /// that properties precede subnodes, that every property name resolves in
    /// the strings block, and that the block ends with `END` at depth 0.
    pub fn check_full(&self) -> FormatResult<TreeStats> {
        let mut stats = TreeStats {
            reservations: self.count_reservations()?,
            ..TreeStats::default()
        };

        // One entry per open node: has a subnode been seen yet?
        let mut open: Vec<bool> = Vec::new();
        let mut expect_end = false;
        let mut offset = 0u32;

        loop {
            let (tag, next) = self.next_tag(offset)?;
            if expect_end && tag != Tag::End && tag != Tag::Nop {
                return Err(structure(offset, "data after the root node"));
            }
            match tag {
                Tag::Nop => {}
                Tag::End => {
                    if !open.is_empty() {
                        return Err(structure(offset, "END with unclosed nodes"));
                    }
                    if !expect_end {
                        return Err(structure(offset, "struct block has no root node"));
                    }
                    return Ok(stats);
                }
                Tag::BeginNode => {
                    let name = self.node_name(offset)?;
                    if open.is_empty() && !name.is_empty() {
                        return Err(structure(offset, "root node must be unnamed"));
                    }
                    if !open.is_empty() && name.is_empty() {
                        return Err(structure(offset, "subnode without a name"));
                    }
                    if let Some(parent_has_subnode) = open.last_mut() {
                        *parent_has_subnode = true;
                    }
                    open.push(false);
                    stats.nodes += 1;
                    stats.max_depth = stats.max_depth.max(open.len());
                }
                Tag::EndNode => {
                    if open.pop().is_none() {
                        return Err(structure(offset, "END_NODE without an open node"));
                    }
                    if open.is_empty() {
                        expect_end = true;
                    }
                }
                Tag::Prop => {
                    match open.last() {
                        None => return Err(structure(offset, "property outside any node")),
                        Some(true) => {
                            return Err(structure(offset, "property after a subnode"))
                        }
                        Some(false) => {}
                    }
                    self.property(crate::PropertyToken::new(offset))?;
                    stats.properties += 1;
                }
            }
            offset = next;
        }
    }

    fn count_reservations(&self) -> FormatResult<usize> {
        let data = self.as_bytes();
        let mut at = self.header().off_mem_rsvmap as usize;
        let mut count = 0;
        loop {
            let entry = data.get(at..at + RSVMAP_ENTRY_SIZE).ok_or_else(|| {
                FormatError::Truncated("memory reservation map is not terminated".into())
            })?;
            if entry.iter().all(|&b| b == 0) {
                return Ok(count);
            }
            count += 1;
            at += RSVMAP_ENTRY_SIZE;
        }
    }
}

fn structure(offset: u32, reason: &str) -> FormatError {
    FormatError::BadStructure {
        offset,
        reason: reason.into(),
    }
}
