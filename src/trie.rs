use rustfst::Label;
use std::collections::HashMap;

/// Symbol carried by the root of a prefix tree.
pub const ROOT_SYMBOL: Label = Label::MAX;

/// When to stop walking back towards the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// Stop on the `count`-th occurrence of a boundary symbol.  With no
    /// boundary symbol, walk all the way to the root.
    Boundary { symbol: Option<Label>, count: usize },
    /// Stop after collecting this many symbols.
    Steps(usize),
}

/// Read-only view of the hypothesis tree shared by a beam search.
/// Children point to their parents, so walking up a path reads the
/// hypothesis backwards.
pub trait PrefixTree {
    type Node: Copy;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn symbol(&self, node: Self::Node) -> Label;

    fn is_root(&self, node: Self::Node) -> bool {
        self.symbol(node) == ROOT_SYMBOL
    }

    /// Collect symbols from `node` towards the root, nearest first.
    ///
    /// Returns the collected symbols along with the node where
    /// collection stopped: the root, the boundary node (whose symbol
    /// is not collected), or the first node past the step limit.
    fn collect_path(&self, node: Self::Node, stop: Stop) -> (Vec<Label>, Self::Node) {
        let mut path = Vec::new();
        let mut node = node;
        let mut boundaries = 0;
        while !self.is_root(node) {
            let symbol = self.symbol(node);
            match stop {
                Stop::Steps(n) if path.len() >= n => break,
                Stop::Boundary {
                    symbol: Some(boundary),
                    count,
                } if symbol == boundary => {
                    boundaries += 1;
                    if boundaries >= count {
                        break;
                    }
                }
                _ => {}
            }
            path.push(symbol);
            match self.parent(node) {
                Some(parent) => node = parent,
                None => break,
            }
        }
        (path, node)
    }
}

/// Index of a node in a `PrefixTrie`.
pub type NodeId = usize;

#[derive(Debug, Clone)]
struct TrieNode {
    symbol: Label,
    parent: Option<NodeId>,
    children: HashMap<Label, NodeId>,
}

/// Arena-backed prefix tree.  Node 0 is the root.
#[derive(Debug, Clone)]
pub struct PrefixTrie {
    nodes: Vec<TrieNode>,
}

impl Default for PrefixTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode {
                symbol: ROOT_SYMBOL,
                parent: None,
                children: HashMap::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn child(&self, parent: NodeId, symbol: Label) -> Option<NodeId> {
        self.nodes.get(parent)?.children.get(&symbol).copied()
    }

    /// Extend `parent` with `symbol`, reusing an existing child.
    pub fn insert(&mut self, parent: NodeId, symbol: Label) -> NodeId {
        if let Some(child) = self.child(parent, symbol) {
            return child;
        }
        let child = self.nodes.len();
        self.nodes.push(TrieNode {
            symbol,
            parent: Some(parent),
            children: HashMap::new(),
        });
        self.nodes[parent].children.insert(symbol, child);
        child
    }

    /// Insert a whole hypothesis from the root, returning its last node.
    pub fn insert_path(&mut self, symbols: &[Label]) -> NodeId {
        symbols
            .iter()
            .fold(self.root(), |node, &symbol| self.insert(node, symbol))
    }
}

impl PrefixTree for PrefixTrie {
    type Node = NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].parent
    }

    fn symbol(&self, node: NodeId) -> Label {
        self.nodes[node].symbol
    }
}
