//! Search tree with arena allocation and transposition merging.
//!
//! Nodes live in a contiguous `Vec` and are referenced by [`NodeId`]
//! indices. Edges belong to their origin node and store the id of their
//! destination, so several edges may share one destination node when two
//! move sequences reach the same position. A hash index maps each
//! position's canonical id to its node.

use std::collections::{HashMap, VecDeque};

use crate::{Game, Player};

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Statistics of one action taken from a node.
#[derive(Debug, Clone)]
pub struct Edge {
    action: usize,
    /// Player who made the move, used to orient values during back-propagation.
    player: Player,
    n: u32,
    w: f64,
    q: f64,
    /// Prior from the evaluator; absent in rollout mode.
    prior: Option<f32>,
    target: NodeId,
}

impl Edge {
    fn new(action: usize, player: Player, target: NodeId, prior: Option<f32>) -> Self {
        Edge { action, player, n: 0, w: 0.0, q: 0.0, prior, target }
    }

    #[inline]
    pub fn action(&self) -> usize {
        self.action
    }

    #[inline]
    pub fn player(&self) -> Player {
        self.player
    }

    /// Visit count.
    #[inline]
    pub fn n(&self) -> u32 {
        self.n
    }

    /// Accumulated value.
    #[inline]
    pub fn w(&self) -> f64 {
        self.w
    }

    /// Mean value `W / N`, or `0.0` before the first visit.
    #[inline]
    pub fn q(&self) -> f64 {
        self.q
    }

    #[inline]
    pub fn prior(&self) -> Option<f32> {
        self.prior
    }

    /// Destination node.
    #[inline]
    pub fn target(&self) -> NodeId {
        self.target
    }

    #[inline]
    fn update(&mut self, value: f64) {
        self.n += 1;
        self.w += value;
        self.q = self.w / self.n as f64;
    }
}

/// A position in the tree and its outgoing edges (empty until expanded).
#[derive(Debug)]
pub struct Node<G: Game> {
    state: G,
    key: G::Id,
    edges: Vec<Edge>,
}

impl<G: Game> Node<G> {
    fn new(state: G) -> Self {
        let key = state.canonical_id();
        Node { state, key, edges: Vec::new() }
    }

    #[inline]
    pub fn state(&self) -> &G {
        &self.state
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[inline]
    pub fn is_expanded(&self) -> bool {
        !self.edges.is_empty()
    }

    /// Number of times a descent passed through this node.
    pub fn visits(&self) -> u32 {
        self.edges.iter().map(Edge::n).sum()
    }
}

/// Summary of a tree, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub max_depth: usize,
}

/// Search tree keyed by canonical position identity.
#[derive(Debug)]
pub struct SearchTree<G: Game> {
    nodes: Vec<Node<G>>,
    index: HashMap<G::Id, NodeId>,
    root: NodeId,
}

impl<G: Game> SearchTree<G> {
    /// Creates a tree holding only `state` as its root.
    pub fn new(state: G) -> Self {
        let root = Node::new(state);
        let mut index = HashMap::new();
        index.insert(root.key.clone(), NodeId(0));

        SearchTree { nodes: vec![root], index, root: NodeId(0) }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn root_node(&self) -> &Node<G> {
        self.get(self.root)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node<G> {
        &self.nodes[id.index()]
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree holds at least its root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up the node of a position by canonical id.
    #[inline]
    pub fn find(&self, key: &G::Id) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    /// Canonical ids of every node in the tree.
    pub fn keys(&self) -> impl Iterator<Item = &G::Id> {
        self.index.keys()
    }

    /// Returns the node for `state`, creating it if the position is new.
    pub fn insert(&mut self, state: G) -> NodeId {
        let key = state.canonical_id();
        if let Some(id) = self.index.get(&key) {
            return *id;
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { state, key: key.clone(), edges: Vec::new() });
        self.index.insert(key, id);
        id
    }

    /// Moves the root to the node matching `state`.
    ///
    /// When the position is already in the tree, its subtree is kept with its
    /// statistics and every node unreachable from it is dropped. Otherwise the
    /// tree is replaced by a fresh one rooted at `state`.
    ///
    /// A node with the same canonical id is only reused when it holds the
    /// same position, so a board reached with another player to move or
    /// under other rules starts a fresh tree.
    ///
    /// # Returns
    /// `true` if an existing subtree was reused.
    pub fn reroot(&mut self, state: &G) -> bool {
        match self.find(&state.canonical_id()) {
            Some(id) if self.get(id).state == *state => {
                self.prune(id);
                true
            }
            _ => {
                *self = SearchTree::new(state.clone());
                false
            }
        }
    }

    /// Node ids reachable from `from` through edges, `from` first.
    pub fn reachable(&self, from: NodeId) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut stack = vec![from];

        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            order.push(id);
            stack.extend(
                self.get(id)
                    .edges
                    .iter()
                    .map(Edge::target)
                    .filter(|target| !seen[target.index()]),
            );
        }

        order
    }

    /// Keeps only the subtree reachable from `new_root`, which becomes the root.
    ///
    /// Surviving nodes are compacted to the front of the arena and edge
    /// targets are renumbered.
    pub fn prune(&mut self, new_root: NodeId) {
        let order = self.reachable(new_root);
        let mut remap: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        for (new_index, old) in order.iter().enumerate() {
            remap[old.index()] = Some(NodeId(new_index as u32));
        }

        let mut kept: Vec<(NodeId, Node<G>)> = std::mem::take(&mut self.nodes)
            .into_iter()
            .enumerate()
            .filter_map(|(old, node)| remap[old].map(|new| (new, node)))
            .collect();
        kept.sort_unstable_by_key(|(id, _)| id.0);

        self.nodes = kept.into_iter().map(|(_, node)| node).collect();
        for node in &mut self.nodes {
            for edge in &mut node.edges {
                // Targets of reachable nodes are reachable.
                if let Some(target) = remap[edge.target.index()] {
                    edge.target = target;
                }
            }
        }

        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.key.clone(), NodeId(i as u32)))
            .collect();
        self.root = NodeId(0);
    }

    /// Creates one edge per valid action of a non-expanded, non-terminal node.
    ///
    /// Child positions already in the tree are linked rather than duplicated.
    ///
    /// # Parameters
    /// - `id`: the node to expand.
    /// - `priors`: policy indexed by action (guided mode), `None` for rollouts.
    ///   Must cover every valid action.
    ///
    /// # Returns
    /// The number of edges created.
    pub fn expand(&mut self, id: NodeId, priors: Option<&[f32]>) -> usize {
        let node = self.get(id);
        if node.is_expanded() || node.state.is_terminal() {
            return 0;
        }

        let player = node.state.player();
        let children: Vec<(usize, G)> = node
            .state
            .valid_actions()
            .iter()
            .map(|&action| (action, node.state.apply_action(action)))
            .collect();

        let edges: Vec<Edge> = children
            .into_iter()
            .map(|(action, child)| {
                let target = self.insert(child);
                Edge::new(action, player, target, priors.map(|p| p[action]))
            })
            .collect();

        let count = edges.len();
        self.nodes[id.index()].edges = edges;
        count
    }

    /// Adds a simulation result to every edge of a descent path.
    ///
    /// # Parameters
    /// - `path`: `(node, edge index)` pairs from the root to the frontier.
    /// - `leaf_player`: the player to move at the frontier.
    /// - `value`: the result seen from `leaf_player`; edges whose move was made
    ///   by the other player receive its negation.
    pub fn backpropagate(&mut self, path: &[(NodeId, usize)], leaf_player: Player, value: f64) {
        for &(id, edge) in path {
            let edge = &mut self.nodes[id.index()].edges[edge];
            let signed = if edge.player == leaf_player { value } else { -value };
            edge.update(signed);
        }
    }

    /// Visit count of each root action, indexed by action; unexplored actions are 0.
    pub fn root_visits(&self) -> Vec<u32> {
        let root = self.root_node();
        let mut visits = vec![0; root.state.action_count()];
        for edge in &root.edges {
            visits[edge.action] = edge.n;
        }
        visits
    }

    /// Node count, root visits and the deepest level reachable from the root.
    pub fn stats(&self) -> TreeStats {
        let mut depth = vec![None; self.nodes.len()];
        let mut queue = VecDeque::from([self.root]);
        depth[self.root.index()] = Some(0);
        let mut max_depth = 0;

        while let Some(id) = queue.pop_front() {
            let d = depth[id.index()].unwrap_or(0);
            max_depth = max_depth.max(d);
            for edge in &self.get(id).edges {
                if depth[edge.target.index()].is_none() {
                    depth[edge.target.index()] = Some(d + 1);
                    queue.push_back(edge.target);
                }
            }
        }

        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: self.root_node().visits(),
            max_depth,
        }
    }
}
