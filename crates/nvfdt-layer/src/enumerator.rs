use std::sync::Arc;

use tracing::debug;

use crate::cell::{Cell, CellTable};
use crate::error::{LayerError, LayerResult};
use crate::loader::Blob;
use crate::node::DescriptorNode;

/// Build the cell table from the blob's root properties.
///
/// One cell per property, in blob order. When `descriptor` is given, each
/// cell is weakly linked to the first descendant node sharing the
/// property's name; no match leaves the cell unlinked.
pub fn enumerate_cells(
    blob: &Blob,
    descriptor: Option<&Arc<DescriptorNode>>,
) -> LayerResult<CellTable> {
    let fdt = blob.fdt()?;

    let count = fdt
        .root_properties()
        .try_fold(0usize, |count, prop| prop.map(|_| count + 1))?;

    let mut cells = Vec::new();
    cells
        .try_reserve_exact(count)
        .map_err(|_| LayerError::OutOfMemory {
            what: "cell table",
            requested: count.saturating_mul(std::mem::size_of::<Cell>()),
        })?;

    let mut linked = 0usize;
    for prop in fdt.root_properties() {
        let prop = prop?;
        let mut cell = Cell::new(prop.name, prop.token, prop.len());
        if let Some(node) = descriptor.and_then(|d| d.find_by_name(prop.name)) {
            cell = cell.with_node(node);
            linked += 1;
        }
        cells.push(cell);
    }

    debug!(cells = cells.len(), linked, "enumerated root properties");
    Ok(CellTable::from_cells(cells))
}
