use std::collections::HashMap;
use std::path::Path;

use crate::fdt::{align4, Tag};
use crate::header::{FdtHeader, BUILD_LAST_COMP_VERSION, BUILD_VERSION, FDT_MAGIC, HEADER_SIZE};

/// One node of a tree under construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeBuilder {
    name: String,
    properties: Vec<(String, Vec<u8>)>,
    children: Vec<NodeBuilder>,
}

impl NodeBuilder {
    /// Create a node. Subnode names may carry a unit address (`cpu@0`).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a property with a raw value.
    pub fn property(mut self, name: impl Into<String>, value: &[u8]) -> Self {
        self.properties.push((name.into(), value.to_vec()));
        self
    }

    /// Append a big-endian u32 property.
    pub fn property_u32(self, name: impl Into<String>, value: u32) -> Self {
        self.property(name, &value.to_be_bytes())
    }

    /// Append a NUL-terminated string property.
    pub fn property_str(self, name: impl Into<String>, value: &str) -> Self {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        self.property(name, &bytes)
    }

    /// Append a subnode after every property of this node.
    pub fn child(mut self, node: NodeBuilder) -> Self {
        self.children.push(node);
        self
    }

    /// Number of properties queued on this node.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Builds a version 17 FDT blob.
///
/// Layout: header, memory reservation map, struct block, strings block.
/// Property names are deduplicated in the strings block.
#[derive(Clone, Debug, Default)]
pub struct FdtBuilder {
    root: NodeBuilder,
    reservations: Vec<(u64, u64)>,
    boot_cpuid_phys: u32,
}

impl FdtBuilder {
    /// Start with an empty, unnamed root node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a root property with a raw value.
    pub fn property(mut self, name: impl Into<String>, value: &[u8]) -> Self {
        self.root = self.root.property(name, value);
        self
    }

    /// Append a big-endian u32 root property.
    pub fn property_u32(mut self, name: impl Into<String>, value: u32) -> Self {
        self.root = self.root.property_u32(name, value);
        self
    }

    /// Append a NUL-terminated string root property.
    pub fn property_str(mut self, name: impl Into<String>, value: &str) -> Self {
        self.root = self.root.property_str(name, value);
        self
    }

    /// Append a subnode of the root.
    pub fn child(mut self, node: NodeBuilder) -> Self {
        self.root = self.root.child(node);
        self
    }

    /// Add a memory reservation entry.
    pub fn reserve(mut self, address: u64, size: u64) -> Self {
        self.reservations.push((address, size));
        self
    }

    pub fn boot_cpuid(mut self, cpuid: u32) -> Self {
        self.boot_cpuid_phys = cpuid;
        self
    }

    /// Serialize the tree.
    pub fn finish(&self) -> Vec<u8> {
        let mut strings = StringTable::default();
        let mut structure = Vec::new();
        write_node(&mut structure, &mut strings, &self.root, true);
        structure.extend_from_slice(&Tag::END.to_be_bytes());

        let off_mem_rsvmap = HEADER_SIZE;
        let off_dt_struct = off_mem_rsvmap + (self.reservations.len() + 1) * 16;
        let off_dt_strings = off_dt_struct + structure.len();
        let totalsize = off_dt_strings + strings.bytes.len();

        let header = FdtHeader {
            magic: FDT_MAGIC,
            totalsize: totalsize as u32,
            off_dt_struct: off_dt_struct as u32,
            off_dt_strings: off_dt_strings as u32,
            off_mem_rsvmap: off_mem_rsvmap as u32,
            version: BUILD_VERSION,
            last_comp_version: BUILD_LAST_COMP_VERSION,
            boot_cpuid_phys: self.boot_cpuid_phys,
            size_dt_strings: strings.bytes.len() as u32,
            size_dt_struct: structure.len() as u32,
        };

        let mut out = Vec::with_capacity(totalsize);
        out.extend_from_slice(&header.to_bytes());
        for &(address, size) in &self.reservations {
            out.extend_from_slice(&address.to_be_bytes());
            out.extend_from_slice(&size.to_be_bytes());
        }
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&structure);
        out.extend_from_slice(&strings.bytes);
        out
    }

    /// Serialize the tree into an image file.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.finish())
    }
}

#[derive(Default)]
struct StringTable {
    bytes: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringTable {
    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&offset) = self.offsets.get(name) {
            return offset;
        }
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(name.as_bytes());
        self.bytes.push(0);
        self.offsets.insert(name.to_owned(), offset);
        offset
    }
}

fn write_node(out: &mut Vec<u8>, strings: &mut StringTable, node: &NodeBuilder, root: bool) {
    out.extend_from_slice(&Tag::BEGIN_NODE.to_be_bytes());
    if !root {
        out.extend_from_slice(node.name.as_bytes());
    }
    out.push(0);
    pad(out);

    for (name, value) in &node.properties {
        out.extend_from_slice(&Tag::PROP.to_be_bytes());
        out.extend_from_slice(&(value.len() as u32).to_be_bytes());
        out.extend_from_slice(&strings.intern(name).to_be_bytes());
        out.extend_from_slice(value);
        pad(out);
    }
    for child in &node.children {
        write_node(out, strings, child, false);
    }
    out.extend_from_slice(&Tag::END_NODE.to_be_bytes());
}

fn pad(out: &mut Vec<u8>) {
    out.resize(align4(out.len()), 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fdt::{Fdt, ROOT_NODE};
    use crate::FormatResult;
    use proptest::prelude::*;

    #[test]
    fn empty_tree_layout() {
        let blob = FdtBuilder::new().finish();
        // header + terminator entry + BEGIN_NODE, name, END_NODE, END
        assert_eq!(blob.len(), 40 + 16 + 16);
        let fdt = Fdt::new(&blob).unwrap();
        assert_eq!(fdt.header().off_dt_struct, 56);
        assert_eq!(fdt.header().size_dt_strings, 0);
        assert_eq!(fdt.header().version, 17);
    }

    #[test]
    fn strings_are_deduplicated() {
        let blob = FdtBuilder::new()
            .property_u32("reg", 1)
            .child(NodeBuilder::new("a").property_u32("reg", 2))
            .child(NodeBuilder::new("b").property_u32("reg", 3))
            .finish();
        let fdt = Fdt::new(&blob).unwrap();
        assert_eq!(fdt.header().size_dt_strings, 4);
    }

    #[test]
    fn reservations_and_cpuid() {
        let blob = FdtBuilder::new()
            .reserve(0x1000, 0x200)
            .reserve(0x4000, 0x100)
            .boot_cpuid(3)
            .finish();
        let fdt = Fdt::new(&blob).unwrap();
        assert_eq!(fdt.header().boot_cpuid_phys, 3);
        assert_eq!(fdt.check_full().unwrap().reservations, 2);
        assert_eq!(&blob[40..48], &0x1000u64.to_be_bytes());
    }

    #[test]
    fn write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.dtb");
        FdtBuilder::new().property("x", &[9]).write_to(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(Fdt::new(&bytes).unwrap().root_properties().count(), 1);
    }

    #[test]
    fn node_builder_counts() {
        let node = NodeBuilder::new("n");
        assert!(node.is_empty());
        let node = node.property("a", &[]).property_str("b", "x");
        assert_eq!(node.len(), 2);
    }

    fn property_strategy() -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
        prop::collection::vec(
            ("[a-z][a-z0-9,#-]{0,15}", prop::collection::vec(any::<u8>(), 0..48)),
            0..24,
        )
    }

    proptest! {
        #[test]
        fn built_properties_iterate_back(props in property_strategy(), with_child in any::<bool>()) {
            let mut builder = FdtBuilder::new();
            for (name, value) in &props {
                builder = builder.property(name.clone(), value);
            }
            if with_child {
                builder = builder.child(NodeBuilder::new("child").property("inner", &[1, 2]));
            }
            let blob = builder.finish();

            let fdt = Fdt::new(&blob).unwrap();
            let stats = fdt.check_full().unwrap();
            prop_assert_eq!(stats.properties, props.len() + usize::from(with_child));

            let read: Vec<_> = fdt.properties(ROOT_NODE).collect::<FormatResult<_>>().unwrap();
            prop_assert_eq!(read.len(), props.len());
            for (got, (name, value)) in read.iter().zip(&props) {
                prop_assert_eq!(got.name, name.as_str());
                prop_assert_eq!(got.value, value.as_slice());
                prop_assert_eq!(fdt.property(got.token).unwrap(), *got);
            }
        }
    }
}
