//! Arena automaton representation.
//!
//! Nodes and outputs live in flat arenas and reference each other by
//! stable integer index (`NodeId`, `OutputId`), never by pointer. The
//! graph may be a DAG or cyclic; shared subgraphs are the common case
//! after suffix merging, and the breadth-first visited set is what keeps
//! traversal finite.

use indexmap::IndexMap;

use crate::edge::Edge;

/// Index of a node in the automaton arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// Index of an output in the automaton arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputId(pub u32);

/// Target node plus whether reaching it consumes the input byte.
pub type TargetInfo = (NodeId, bool);

/// One automaton state.
///
/// The default target is an implicit extra transition taken when no edge
/// matches the input byte.
#[derive(Debug, Clone)]
pub struct Node {
    pub edges: Vec<Edge>,
    pub default_target: Option<NodeId>,
    /// Whether the default transition consumes the input byte.
    pub advance_on_default: bool,
    /// Head of the output chain fired when this node is reached.
    pub first_output: Option<OutputId>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            edges: Vec::new(),
            default_target: None,
            advance_on_default: true,
            first_output: None,
        }
    }
}

/// An emitted payload. Outputs chain through `next_output` so one match
/// point can fire several payloads, and may be shared between nodes.
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub content: Vec<u8>,
    pub next_output: Option<OutputId>,
}

/// The automaton graph handed to the compiler.
#[derive(Debug, Clone, Default)]
pub struct Automata {
    nodes: Vec<Node>,
    outputs: Vec<Output>,
    start: Option<NodeId>,
    /// Free-form key/value annotations, serialized verbatim into the
    /// compiled buffer in insertion order.
    pub metadata: IndexMap<String, Vec<u8>>,
    /// If true, targets of non-advancing edges produce no output, which
    /// permits the non-advancing translator to collapse through nodes
    /// that carry outputs.
    pub no_advance_no_output: bool,
}

impl Automata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fresh node and return its id.
    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::default());
        id
    }

    /// Append an output with the given content and return its id.
    pub fn add_output(&mut self, content: impl Into<Vec<u8>>) -> OutputId {
        let id = OutputId(self.outputs.len() as u32);
        self.outputs.push(Output {
            content: content.into(),
            next_output: None,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn output(&self, id: OutputId) -> &Output {
        &self.outputs[id.0 as usize]
    }

    pub fn output_mut(&mut self, id: OutputId) -> &mut Output {
        &mut self.outputs[id.0 as usize]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn start(&self) -> Option<NodeId> {
        self.start
    }

    pub fn set_start(&mut self, id: NodeId) {
        self.start = Some(id);
    }

    /// All (target, advance) pairs reached from `node` on input `c`.
    ///
    /// Edges are consulted in list order; the default target applies only
    /// when no edge matches. More than one entry means the node is
    /// non-deterministic for `c`.
    pub fn targets_for(&self, node: NodeId, c: u8) -> Vec<TargetInfo> {
        let node = self.node(node);
        let mut result: Vec<TargetInfo> = node
            .edges
            .iter()
            .filter(|edge| edge.matches(c))
            .map(|edge| (edge.target, edge.advance))
            .collect();
        if result.is_empty()
            && let Some(default) = node.default_target
        {
            result.push((default, node.advance_on_default));
        }
        result
    }

    /// `targets_for` over every input byte at once; one bulk scan of the
    /// edge list instead of 256.
    pub fn targets_by_input(&self, node: NodeId) -> Vec<Vec<TargetInfo>> {
        let node = self.node(node);
        let mut result: Vec<Vec<TargetInfo>> = vec![Vec::new(); 256];
        for edge in &node.edges {
            let info = (edge.target, edge.advance);
            if edge.is_epsilon() {
                for targets in result.iter_mut() {
                    targets.push(info);
                }
            } else {
                for c in edge.iter() {
                    result[c as usize].push(info);
                }
            }
        }
        if let Some(default) = node.default_target {
            let info = (default, node.advance_on_default);
            for targets in result.iter_mut() {
                if targets.is_empty() {
                    targets.push(info);
                }
            }
        }
        result
    }

    /// Nodes reachable from the start node, in breadth-first order.
    ///
    /// Each node appears exactly once; edge targets are queued in list
    /// order, the default target last. Empty when no start node is set.
    pub fn breadth_first(&self) -> Vec<NodeId> {
        let Some(start) = self.start else {
            return Vec::new();
        };

        let mut order = Vec::new();
        let mut queued = vec![false; self.nodes.len()];
        let mut todo = std::collections::VecDeque::new();
        todo.push_back(start);
        queued[start.0 as usize] = true;

        while let Some(id) = todo.pop_front() {
            order.push(id);
            let node = self.node(id);
            for target in node
                .edges
                .iter()
                .map(|edge| edge.target)
                .chain(node.default_target)
            {
                if !queued[target.0 as usize] {
                    queued[target.0 as usize] = true;
                    todo.push_back(target);
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breadth_first_visits_each_reachable_node_once() {
        let mut a = Automata::new();
        let root = a.add_node();
        let left = a.add_node();
        let right = a.add_node();
        let shared = a.add_node();
        let _orphan = a.add_node();
        a.set_start(root);
        a.node_mut(root).edges.push(Edge::from_values(left, true, vec![b'l']));
        a.node_mut(root).edges.push(Edge::from_values(right, true, vec![b'r']));
        a.node_mut(left).edges.push(Edge::from_values(shared, true, vec![b'x']));
        a.node_mut(right).edges.push(Edge::from_values(shared, true, vec![b'x']));
        // Cycle back to the root must not loop.
        a.node_mut(shared).default_target = Some(root);

        assert_eq!(a.breadth_first(), vec![root, left, right, shared]);
    }

    #[test]
    fn breadth_first_without_start_is_empty() {
        let mut a = Automata::new();
        a.add_node();
        assert!(a.breadth_first().is_empty());
    }

    #[test]
    fn targets_for_prefers_edges_over_default() {
        let mut a = Automata::new();
        let n = a.add_node();
        let t = a.add_node();
        let d = a.add_node();
        a.node_mut(n).edges.push(Edge::from_values(t, true, vec![b'a']));
        a.node_mut(n).default_target = Some(d);
        a.node_mut(n).advance_on_default = false;

        assert_eq!(a.targets_for(n, b'a'), vec![(t, true)]);
        assert_eq!(a.targets_for(n, b'b'), vec![(d, false)]);
    }

    #[test]
    fn targets_by_input_matches_targets_for() {
        let mut a = Automata::new();
        let n = a.add_node();
        let t = a.add_node();
        let e = a.add_node();
        let d = a.add_node();
        a.node_mut(n).edges.push(Edge::from_values(t, true, vec![1, 2, 3]));
        a.node_mut(n).edges.push(Edge::new(e, false)); // epsilon
        a.node_mut(n).default_target = Some(d);

        let by_input = a.targets_by_input(n);
        for c in 0..=255u8 {
            assert_eq!(by_input[c as usize], a.targets_for(n, c), "input {c}");
        }
        // Epsilon edge everywhere means the default never applies.
        assert!(by_input.iter().all(|targets| !targets.contains(&(d, true))));
    }
}
