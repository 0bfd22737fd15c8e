use std::sync::Arc;

/// A node of the host's own device tree.
///
/// The host owns these nodes; cells only hold weak references to them, so
/// a descriptor tree can be torn down independently of any layer.
#[derive(Debug, Default)]
pub struct DescriptorNode {
    name: String,
    children: Vec<Arc<DescriptorNode>>,
}

impl DescriptorNode {
    /// Create a node. The name may carry a unit address (`mac@0`).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Append a child node.
    pub fn with_child(mut self, child: DescriptorNode) -> Self {
        self.children.push(Arc::new(child));
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Full node name, unit address included.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node name without its unit address.
    pub fn base_name(&self) -> &str {
        self.name.split('@').next().unwrap_or(&self.name)
    }

    pub fn children(&self) -> &[Arc<DescriptorNode>] {
        &self.children
    }

    /// First descendant, in depth-first pre-order, whose base name equals
    /// `name`. The node itself is not considered.
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<DescriptorNode>> {
        for child in &self.children {
            if child.base_name() == name {
                return Some(child);
            }
            if let Some(found) = child.find_by_name(name) {
                return Some(found);
            }
        }
        None
    }
}
