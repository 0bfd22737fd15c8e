use crate::error::{FormatError, FormatResult};
use crate::header::FdtHeader;
use crate::token::PropertyToken;

/// Struct-block offset of the root node.
pub const ROOT_NODE: u32 = 0;

pub(crate) const TAG_SIZE: u32 = 4;
/// Tag, value length and name offset preceding every property value.
pub(crate) const PROP_HEADER_SIZE: u32 = 12;

/// Struct-block tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    BeginNode,
    EndNode,
    Prop,
    Nop,
    End,
}

impl Tag {
    pub const BEGIN_NODE: u32 = 0x1;
    pub const END_NODE: u32 = 0x2;
    pub const PROP: u32 = 0x3;
    pub const NOP: u32 = 0x4;
    pub const END: u32 = 0x9;

    pub fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            Self::BEGIN_NODE => Some(Self::BeginNode),
            Self::END_NODE => Some(Self::EndNode),
            Self::PROP => Some(Self::Prop),
            Self::NOP => Some(Self::Nop),
            Self::END => Some(Self::End),
            _ => None,
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            Self::BeginNode => Self::BEGIN_NODE,
            Self::EndNode => Self::END_NODE,
            Self::Prop => Self::PROP,
            Self::Nop => Self::NOP,
            Self::End => Self::END,
        }
    }
}

/// One property: its locator, name, and raw value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Property<'a> {
    pub token: PropertyToken,
    pub name: &'a str,
    pub value: &'a [u8],
}

impl Property<'_> {
    /// Stored value length in bytes.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Borrowed view over an FDT blob whose header has been checked.
///
/// The view is cut to the header's `totalsize`; all walking happens inside
/// it with explicit bounds checks.
#[derive(Clone, Copy, Debug)]
pub struct Fdt<'a> {
    data: &'a [u8],
    header: FdtHeader,
}

impl<'a> Fdt<'a> {
    /// Parse and check the header, then wrap `data`.
    pub fn new(data: &'a [u8]) -> FormatResult<Self> {
        let header = FdtHeader::parse(data)?;
        header.check()?;
        Self::with_header(data, header)
    }

    /// Wrap `data` using a header that was already checked.
    pub fn with_header(data: &'a [u8], header: FdtHeader) -> FormatResult<Self> {
        let total = header.total_size();
        if data.len() < total {
            return Err(FormatError::Truncated(format!(
                "header declares {total} bytes, buffer holds {}",
                data.len()
            )));
        }
        Ok(Self {
            data: &data[..total],
            header,
        })
    }

    pub fn header(&self) -> &FdtHeader {
        &self.header
    }

    /// The blob bytes, `totalsize` long.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub(crate) fn struct_block(&self) -> &'a [u8] {
        let start = self.header.off_dt_struct as usize;
        let end = start.saturating_add(self.header.struct_size() as usize);
        &self.data[start..end.min(self.data.len())]
    }

    pub(crate) fn strings_block(&self) -> &'a [u8] {
        let start = self.header.off_dt_strings as usize;
        let end = start.saturating_add(self.header.size_dt_strings as usize);
        &self.data[start..end.min(self.data.len())]
    }

    fn struct_u32(&self, offset: u32) -> FormatResult<u32> {
        let block = self.struct_block();
        let at = offset as usize;
        block
            .get(at..at + 4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or_else(|| {
                FormatError::Truncated(format!("struct block ends before offset {offset:#x}"))
            })
    }

    /// Decode the tag at `offset` and return it with the offset of the tag
    /// that follows, 4-byte aligned.
    pub fn next_tag(&self, offset: u32) -> FormatResult<(Tag, u32)> {
        if offset % TAG_SIZE != 0 {
            return Err(FormatError::BadOffset {
                offset,
                reason: "tag offset not 4-byte aligned".into(),
            });
        }
        let raw = self.struct_u32(offset)?;
        let tag = Tag::from_u32(raw).ok_or(FormatError::BadTag { tag: raw, offset })?;
        let mut next = offset as usize + TAG_SIZE as usize;

        match tag {
            Tag::BeginNode => {
                let block = self.struct_block();
                let nul = block
                    .get(next..)
                    .and_then(|rest| rest.iter().position(|&b| b == 0))
                    .ok_or_else(|| {
                        FormatError::Truncated(format!("unterminated node name at {offset:#x}"))
                    })?;
                next += nul + 1;
            }
            Tag::Prop => {
                let len = self.struct_u32(next as u32)? as usize;
                // Length and name offset, then the value.
                next += 8 + len;
            }
            Tag::EndNode | Tag::Nop | Tag::End => {}
        }

        let aligned = align4(next);
        if next > self.struct_block().len() || aligned > u32::MAX as usize {
            return Err(FormatError::Truncated(format!(
                "{tag:?} at {offset:#x} runs past the struct block"
            )));
        }
        Ok((tag, aligned as u32))
    }

    /// Name of the node whose `BEGIN_NODE` tag sits at `node`.
    pub fn node_name(&self, node: u32) -> FormatResult<&'a str> {
        let (tag, _) = self.next_tag(node)?;
        if tag != Tag::BeginNode {
            return Err(FormatError::BadOffset {
                offset: node,
                reason: format!("expected node, found {tag:?}"),
            });
        }
        let block = self.struct_block();
        let start = (node + TAG_SIZE) as usize;
        // next_tag already proved the terminator exists.
        let len = block[start..].iter().position(|&b| b == 0).unwrap_or(0);
        std::str::from_utf8(&block[start..start + len])
            .map_err(|_| FormatError::BadName { offset: node })
    }

    /// First property of the node at `node`, or `None` if it has none.
    pub fn first_property(&self, node: u32) -> FormatResult<Option<PropertyToken>> {
        let (tag, next) = self.next_tag(node)?;
        if tag != Tag::BeginNode {
            return Err(FormatError::BadOffset {
                offset: node,
                reason: format!("expected node, found {tag:?}"),
            });
        }
        self.property_from(next)
    }

    /// Property following `token` within the same node.
    pub fn next_property(&self, token: PropertyToken) -> FormatResult<Option<PropertyToken>> {
        let next = self.expect_property(token)?;
        self.property_from(next)
    }

    fn property_from(&self, mut offset: u32) -> FormatResult<Option<PropertyToken>> {
        loop {
            let (tag, next) = self.next_tag(offset)?;
            match tag {
                Tag::Prop => return Ok(Some(PropertyToken::new(offset))),
                Tag::Nop => offset = next,
                // Properties end where subnodes or the node's end begin.
                Tag::BeginNode | Tag::EndNode => return Ok(None),
                Tag::End => {
                    return Err(FormatError::BadStructure {
                        offset,
                        reason: "END tag inside a node".into(),
                    })
                }
            }
        }
    }

    fn expect_property(&self, token: PropertyToken) -> FormatResult<u32> {
        let offset = token.offset();
        let (tag, next) = self.next_tag(offset)?;
        if tag != Tag::Prop {
            return Err(FormatError::BadOffset {
                offset,
                reason: format!("expected property, found {tag:?}"),
            });
        }
        Ok(next)
    }

    /// Look up the property located by `token`.
    pub fn property(&self, token: PropertyToken) -> FormatResult<Property<'a>> {
        self.expect_property(token)?;
        let offset = token.offset();
        let len = self.struct_u32(offset + 4)? as usize;
        let nameoff = self.struct_u32(offset + 8)?;
        let start = (offset + PROP_HEADER_SIZE) as usize;
        let value = &self.struct_block()[start..start + len];
        Ok(Property {
            token,
            name: self.string_at(nameoff)?,
            value,
        })
    }

    /// NUL-terminated string at `offset` in the strings block.
    pub fn string_at(&self, offset: u32) -> FormatResult<&'a str> {
        let block = self.strings_block();
        let rest = block.get(offset as usize..).ok_or_else(|| FormatError::BadOffset {
            offset,
            reason: format!("name offset outside strings block of {} bytes", block.len()),
        })?;
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| FormatError::Truncated(format!("unterminated name at {offset:#x}")))?;
        std::str::from_utf8(&rest[..len]).map_err(|_| FormatError::BadName { offset })
    }

    /// Iterate the properties of the node at `node` in stored order.
    pub fn properties(&self, node: u32) -> Properties<'a> {
        Properties {
            fdt: *self,
            cursor: Cursor::Node(node),
        }
    }

    /// Iterate the root node's properties in stored order.
    pub fn root_properties(&self) -> Properties<'a> {
        self.properties(ROOT_NODE)
    }
}

pub(crate) fn align4(n: usize) -> usize {
    (n + 3) & !3
}

#[derive(Clone, Copy, Debug)]
enum Cursor {
    Node(u32),
    After(PropertyToken),
    Done,
}

/// Iterator over one node's properties. Stops after the first error.
#[derive(Clone, Debug)]
pub struct Properties<'a> {
    fdt: Fdt<'a>,
    cursor: Cursor,
}

impl<'a> Iterator for Properties<'a> {
    type Item = FormatResult<Property<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = match self.cursor {
            Cursor::Node(node) => self.fdt.first_property(node),
            Cursor::After(token) => self.fdt.next_property(token),
            Cursor::Done => return None,
        };
        match step.and_then(|token| token.map(|t| self.fdt.property(t)).transpose()) {
            Ok(Some(prop)) => {
                self.cursor = Cursor::After(prop.token);
                Some(Ok(prop))
            }
            Ok(None) => {
                self.cursor = Cursor::Done;
                None
            }
            Err(e) => {
                self.cursor = Cursor::Done;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Properties<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{FdtBuilder, NodeBuilder};

    fn sample() -> Vec<u8> {
        FdtBuilder::new()
            .property_str("model", "acme,board-v2")
            .property("serial-number", b"SN000042")
            .property("mac-address", &[0x02, 0, 0, 0xaa, 0xbb, 0xcc])
            .property("empty", &[])
            .child(NodeBuilder::new("serial-number").property_u32("reg", 7))
            .finish()
    }

    #[test]
    fn root_properties_in_order() {
        let blob = sample();
        let fdt = Fdt::new(&blob).unwrap();
        let props: Vec<_> = fdt.root_properties().collect::<FormatResult<_>>().unwrap();
        let names: Vec<_> = props.iter().map(|p| p.name).collect();
        assert_eq!(names, ["model", "serial-number", "mac-address", "empty"]);
        assert_eq!(props[0].value, b"acme,board-v2\0");
        assert_eq!(props[1].value, b"SN000042");
        assert_eq!(props[2].len(), 6);
        assert!(props[3].is_empty());
    }

    #[test]
    fn tokens_locate_prop_tags() {
        let blob = sample();
        let fdt = Fdt::new(&blob).unwrap();
        // Root BEGIN_NODE with empty name takes 8 bytes.
        let first = fdt.first_property(ROOT_NODE).unwrap().unwrap();
        assert_eq!(first.as_raw(), 8);
        assert_eq!(fdt.next_tag(first.as_raw()).unwrap().0, Tag::Prop);

        let again = fdt.property(first).unwrap();
        assert_eq!(again.name, "model");
    }

    #[test]
    fn subnode_properties_are_not_root_properties() {
        let blob = sample();
        let fdt = Fdt::new(&blob).unwrap();
        assert!(fdt.root_properties().all(|p| p.unwrap().name != "reg"));
    }

    #[test]
    fn property_at_non_prop_offset_is_rejected() {
        let blob = sample();
        let fdt = Fdt::new(&blob).unwrap();
        let err = fdt.property(PropertyToken::from_raw(0)).unwrap_err();
        assert!(matches!(err, FormatError::BadOffset { offset: 0, .. }));

        let err = fdt.property(PropertyToken::from_raw(9)).unwrap_err();
        assert!(matches!(err, FormatError::BadOffset { offset: 9, .. }));

        let err = fdt.property(PropertyToken::from_raw(0x10_0000)).unwrap_err();
        assert!(matches!(err, FormatError::Truncated(_)));
    }

    #[test]
    fn root_node_name_is_empty() {
        let blob = sample();
        let fdt = Fdt::new(&blob).unwrap();
        assert_eq!(fdt.node_name(ROOT_NODE).unwrap(), "");
    }

    #[test]
    fn node_without_properties() {
        let blob = FdtBuilder::new().child(NodeBuilder::new("chosen")).finish();
        let fdt = Fdt::new(&blob).unwrap();
        assert!(fdt.first_property(ROOT_NODE).unwrap().is_none());
        assert_eq!(fdt.root_properties().count(), 0);
    }

    #[test]
    fn nop_tags_are_skipped() {
        let mut blob = FdtBuilder::new()
            .property("a", &[1])
            .property("b", &[2])
            .finish();
        let fdt = Fdt::new(&blob).unwrap();
        let first = fdt.first_property(ROOT_NODE).unwrap().unwrap();
        let struct_off = fdt.header().off_dt_struct as usize;

        // Overwrite the first property (12 + 4 padded bytes) with NOPs.
        let at = struct_off + first.as_raw() as usize;
        for word in blob[at..at + 16].chunks_exact_mut(4) {
            word.copy_from_slice(&Tag::NOP.to_be_bytes());
        }
        let fdt = Fdt::new(&blob).unwrap();
        let names: Vec<_> = fdt.root_properties().map(|p| p.unwrap().name).collect();
        assert_eq!(names, ["b"]);
    }

    #[test]
    fn unknown_tag_stops_iteration() {
        let mut blob = FdtBuilder::new().property("a", &[1]).finish();
        let fdt = Fdt::new(&blob).unwrap();
        let at = fdt.header().off_dt_struct as usize + 8;
        blob[at..at + 4].copy_from_slice(&0x7u32.to_be_bytes());

        let fdt = Fdt::new(&blob).unwrap();
        let mut props = fdt.root_properties();
        assert!(matches!(props.next(), Some(Err(FormatError::BadTag { tag: 7, offset: 8 }))));
        assert!(props.next().is_none());
    }

    #[test]
    fn bad_name_offset() {
        let mut blob = FdtBuilder::new().property("a", &[1]).finish();
        let fdt = Fdt::new(&blob).unwrap();
        // nameoff field of the first property
        let at = fdt.header().off_dt_struct as usize + 16;
        blob[at..at + 4].copy_from_slice(&0xffffu32.to_be_bytes());

        let fdt = Fdt::new(&blob).unwrap();
        let err = fdt.root_properties().next().unwrap().unwrap_err();
        assert!(matches!(err, FormatError::BadOffset { offset: 0xffff, .. }));
    }

    #[test]
    fn oversized_value_length_is_truncated() {
        let mut blob = FdtBuilder::new().property("a", &[1]).finish();
        let fdt = Fdt::new(&blob).unwrap();
        let at = fdt.header().off_dt_struct as usize + 12;
        blob[at..at + 4].copy_from_slice(&0x1000u32.to_be_bytes());

        let fdt = Fdt::new(&blob).unwrap();
        let err = fdt.root_properties().next().unwrap().unwrap_err();
        assert!(matches!(err, FormatError::Truncated(_)));
    }

    #[test]
    fn buffer_shorter_than_totalsize() {
        let blob = sample();
        let err = Fdt::new(&blob[..blob.len() - 1]).unwrap_err();
        assert!(matches!(err, FormatError::Truncated(_)));
    }

    #[test]
    fn view_is_cut_to_totalsize() {
        let mut blob = sample();
        let len = blob.len();
        blob.extend_from_slice(&[0xee; 16]);
        let fdt = Fdt::new(&blob).unwrap();
        assert_eq!(fdt.as_bytes().len(), len);
    }

    #[test]
    fn tag_roundtrip() {
        for tag in [Tag::BeginNode, Tag::EndNode, Tag::Prop, Tag::Nop, Tag::End] {
            assert_eq!(Tag::from_u32(tag.to_u32()), Some(tag));
        }
        assert_eq!(Tag::from_u32(0x5), None);
    }
}
