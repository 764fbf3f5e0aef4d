use phylotree::tree::{Node as PhyloNode, Tree as PhyloTree};

pub mod layout;
pub mod painter;
pub mod style;

use style::NodeStyle;

pub type NodeId = phylotree::tree::NodeId;

/// Representation of a phylogenetic tree with an explicit node list.
///
/// Node ids index directly into `nodes`.
#[derive(Debug, Clone)]
pub struct Tree {
    pub id: usize,
    pub label: Option<String>,
    pub newick: String,
    pub root: Option<NodeId>,
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn new(id: usize, label: Option<String>, newick: String, phylo: &PhyloTree) -> Self {
        let root = phylo.get_root().ok();
        let nodes = Self::build_nodes_from_phylo(phylo);
        Self {
            id,
            label,
            newick,
            root,
            nodes,
        }
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.and_then(|id| self.nodes.get(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    pub fn external_nodes(&self) -> Vec<&TreeNode> {
        self.nodes.iter().filter(|node| node.is_leaf()).collect()
    }

    /// Leaves in drawing order (depth-first from the root).
    pub fn leaves_in_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let Some(root_id) = self.root else {
            return order;
        };

        let mut stack = vec![root_id];
        while let Some(node_id) = stack.pop() {
            let node = &self.nodes[node_id];
            if node.is_leaf() {
                order.push(node_id);
            } else {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        order
    }

    /// Largest root-to-tip distance, counting missing branch lengths as 1.
    pub fn height(&self) -> f64 {
        fn walk(node_id: NodeId, nodes: &[TreeNode], current: f64) -> f64 {
            nodes[node_id]
                .children
                .iter()
                .map(|&child| walk(child, nodes, current + nodes[child].length.unwrap_or(1.0)))
                .fold(current, f64::max)
        }

        self.root
            .map(|root_id| walk(root_id, &self.nodes, 0.0))
            .unwrap_or(0.0)
    }

    fn build_nodes_from_phylo(phylo: &PhyloTree) -> Vec<TreeNode> {
        let mut nodes = Vec::with_capacity(phylo.size());
        for idx in 0..phylo.size() {
            match phylo.get(&idx) {
                Ok(node) => nodes.push(TreeNode::from_phylo(node)),
                Err(_) => nodes.push(TreeNode::new(idx, None, None)),
            }
        }
        nodes
    }
}

/// Node within a phylogenetic tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: Option<String>,
    pub length: Option<f64>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub style: NodeStyle,
}

impl TreeNode {
    pub fn new(id: NodeId, name: Option<String>, length: Option<f64>) -> Self {
        Self {
            id,
            name,
            length,
            parent: None,
            children: Vec::new(),
            style: NodeStyle::default(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub(crate) fn from_phylo(node: &PhyloNode) -> Self {
        let name = node
            .name
            .as_ref()
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty());
        let mut tree_node = TreeNode::new(node.id, name, node.parent_edge);
        tree_node.parent = node.parent;
        tree_node.children = node.children.clone();
        tree_node
    }
}

/// Container for the full contents of an imported file.
#[derive(Debug, Clone)]
pub struct TreeBundle {
    pub format: TreeFileFormat,
    pub trees: Vec<Tree>,
}

impl TreeBundle {
    pub fn new(format: TreeFileFormat, trees: Vec<Tree>) -> Self {
        Self { format, trees }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TreeFileFormat {
    Newick,
    Nexus,
}

#[cfg(test)]
pub(crate) fn tree_from_newick(newick: &str) -> Tree {
    let phylo = PhyloTree::from_newick(newick).expect("valid test newick");
    Tree::new(0, None, newick.to_string(), &phylo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_node_list_with_links() {
        let tree = tree_from_newick("((A:0.1,B:0.2)AB:0.3,C:0.4);");
        assert_eq!(tree.nodes.len(), 5);
        assert_eq!(tree.leaf_count(), 3);

        let root = tree.root().unwrap();
        assert!(root.is_root());
        assert_eq!(root.children.len(), 2);

        for node in &tree.nodes {
            for &child in &node.children {
                assert_eq!(tree.nodes[child].parent, Some(node.id));
            }
        }
    }

    #[test]
    fn keeps_internal_names_and_lengths() {
        let tree = tree_from_newick("((A:0.1,B:0.2)AB:0.3,C:0.4);");
        let ab = tree
            .nodes
            .iter()
            .find(|node| node.name.as_deref() == Some("AB"))
            .unwrap();
        assert!(!ab.is_leaf());
        assert_eq!(ab.length, Some(0.3));
    }

    #[test]
    fn leaves_follow_newick_order() {
        let tree = tree_from_newick("((A:1,B:1):1,(C:1,D:1):1);");
        let names: Vec<_> = tree
            .leaves_in_order()
            .into_iter()
            .filter_map(|id| tree.nodes[id].name.clone())
            .collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn height_uses_longest_path() {
        let tree = tree_from_newick("((A:1,B:2):1,C:0.5);");
        assert!((tree.height() - 3.0).abs() < 1e-9);

        let unit = tree_from_newick("((A,B),C);");
        assert!((unit.height() - 2.0).abs() < 1e-9);
    }
}
