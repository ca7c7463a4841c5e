// Copyright 2026 The haplotype-network developers.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Maximum flow and minimum s-t cut with Dinic's algorithm.
//!
//! Nodes are identified by [`NodeRef`]: a caller-supplied id, or one of the
//! two synthetic terminals. Capacities are floating point; anything at or
//! above [`INFINITE_CAPACITY`] encodes a hard constraint.
//!
//! ```
//! use haplotype_network::flow::{FlowNetwork, NodeRef};
//!
//! let mut net = FlowNetwork::new();
//! net.add_capacity(NodeRef::Source, NodeRef::Real('a'), 3.0);
//! net.add_capacity(NodeRef::Real('a'), NodeRef::Sink, 2.0);
//! assert_eq!(net.max_flow(), 2.0);
//! assert!(net.min_cut_source_side().contains(&NodeRef::Real('a')));
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

/// Capacities at or above this value are treated as infinite.
pub const INFINITE_CAPACITY: f64 = 1e12;

const EPSILON: f64 = 1e-9;

/// A node of a flow network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef<N> {
    Real(N),
    Source,
    Sink,
}

pub fn is_infinite(capacity: f64) -> bool {
    capacity >= INFINITE_CAPACITY
}

#[derive(Debug, Clone)]
struct Arc {
    to: usize,
    residual: f64,
    capacity: f64,
    reverse: usize,
}

/// A directed residual network with a source and a sink.
#[derive(Debug, Clone)]
pub struct FlowNetwork<N: Eq + Hash + Clone> {
    index: HashMap<NodeRef<N>, usize>,
    refs: Vec<NodeRef<N>>,
    arcs: Vec<Arc>,
    outgoing: Vec<Vec<usize>>,
}

impl<N: Eq + Hash + Clone> Default for FlowNetwork<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Eq + Hash + Clone> FlowNetwork<N> {
    /// Create a network holding only the source and the sink.
    pub fn new() -> Self {
        let mut net = FlowNetwork {
            index: HashMap::new(),
            refs: Vec::new(),
            arcs: Vec::new(),
            outgoing: Vec::new(),
        };
        net.intern(NodeRef::Source);
        net.intern(NodeRef::Sink);
        net
    }

    fn intern(&mut self, node: NodeRef<N>) -> usize {
        if let Some(&i) = self.index.get(&node) {
            return i;
        }
        let i = self.refs.len();
        self.index.insert(node.clone(), i);
        self.refs.push(node);
        self.outgoing.push(Vec::new());
        i
    }

    pub fn add_node(&mut self, node: N) {
        self.intern(NodeRef::Real(node));
    }

    /// Number of nodes, including source and sink.
    pub fn node_count(&self) -> usize {
        self.refs.len()
    }

    /// Add an arc `a -> b` and its zero-capacity reverse arc.
    pub fn add_capacity(&mut self, a: NodeRef<N>, b: NodeRef<N>, capacity: f64) {
        let (ia, ib) = (self.intern(a), self.intern(b));
        self.push_pair(ia, ib, capacity, 0.0);
    }

    /// Add two opposed arcs of equal capacity.
    pub fn add_undirected_capacity(&mut self, a: NodeRef<N>, b: NodeRef<N>, capacity: f64) {
        let (ia, ib) = (self.intern(a), self.intern(b));
        self.push_pair(ia, ib, capacity, capacity);
    }

    fn push_pair(&mut self, a: usize, b: usize, forward: f64, backward: f64) {
        let fa = self.arcs.len();
        self.arcs.push(Arc {
            to: b,
            residual: forward,
            capacity: forward,
            reverse: fa + 1,
        });
        self.arcs.push(Arc {
            to: a,
            residual: backward,
            capacity: backward,
            reverse: fa,
        });
        self.outgoing[a].push(fa);
        self.outgoing[b].push(fa + 1);
    }

    fn levels(&self, source: usize) -> Vec<Option<usize>> {
        let mut level = vec![None; self.refs.len()];
        level[source] = Some(0);
        let mut queue = VecDeque::new();
        queue.push_back(source);
        while let Some(u) = queue.pop_front() {
            let next = level[u].map(|l| l + 1);
            for &a in &self.outgoing[u] {
                let arc = &self.arcs[a];
                if arc.residual > EPSILON && level[arc.to].is_none() {
                    level[arc.to] = next;
                    queue.push_back(arc.to);
                }
            }
        }
        level
    }

    /// Push flow along one source-sink path of the level graph, walking it
    /// with an explicit arc stack. Dead ends advance the cursor of their tail.
    fn augment(
        &mut self,
        source: usize,
        sink: usize,
        level: &[Option<usize>],
        cursor: &mut [usize],
    ) -> f64 {
        let mut path: Vec<usize> = Vec::new();
        let mut u = source;
        loop {
            if u == sink {
                let pushed = path
                    .iter()
                    .map(|&a| self.arcs[a].residual)
                    .fold(f64::INFINITY, f64::min);
                for &a in &path {
                    let rev = self.arcs[a].reverse;
                    self.arcs[a].residual -= pushed;
                    self.arcs[rev].residual += pushed;
                }
                return pushed;
            }
            let mut next = None;
            while cursor[u] < self.outgoing[u].len() {
                let a = self.outgoing[u][cursor[u]];
                let arc = &self.arcs[a];
                let forward = match (level[u], level[arc.to]) {
                    (Some(lu), Some(lt)) => lt == lu + 1,
                    _ => false,
                };
                if forward && arc.residual > EPSILON {
                    next = Some((a, arc.to));
                    break;
                }
                cursor[u] += 1;
            }
            match next {
                Some((a, to)) => {
                    path.push(a);
                    u = to;
                }
                None => match path.pop() {
                    Some(a) => {
                        u = self.arcs[self.arcs[a].reverse].to;
                        cursor[u] += 1;
                    }
                    None => return 0.0,
                },
            }
        }
    }

    /// Saturate the network and return the total flow from source to sink.
    pub fn max_flow(&mut self) -> f64 {
        let (source, sink) = (self.index[&NodeRef::Source], self.index[&NodeRef::Sink]);
        let mut total = 0.0;
        loop {
            let level = self.levels(source);
            if level[sink].is_none() {
                return total;
            }
            let mut cursor = vec![0; self.refs.len()];
            loop {
                let pushed = self.augment(source, sink, &level, &mut cursor);
                if pushed <= EPSILON {
                    break;
                }
                total += pushed;
            }
        }
    }

    fn reachable(&self) -> Vec<bool> {
        self.levels(self.index[&NodeRef::Source])
            .into_iter()
            .map(|l| l.is_some())
            .collect()
    }

    /// Nodes reachable from the source through arcs with residual capacity.
    /// After [`max_flow`](Self::max_flow) this is the source side of a
    /// minimum cut.
    pub fn min_cut_source_side(&self) -> HashSet<NodeRef<N>> {
        self.reachable()
            .into_iter()
            .zip(self.refs.iter())
            .filter(|(r, _)| *r)
            .map(|(_, n)| n.clone())
            .collect()
    }

    /// Total capacity of arcs leaving `side`.
    pub fn cut_capacity(&self, side: &HashSet<NodeRef<N>>) -> f64 {
        let inside: Vec<bool> = self.refs.iter().map(|n| side.contains(n)).collect();
        self.outgoing
            .iter()
            .enumerate()
            .filter(|(u, _)| inside[*u])
            .flat_map(|(_, arcs)| arcs.iter())
            .map(|&a| &self.arcs[a])
            .filter(|arc| !inside[arc.to])
            .map(|arc| arc.capacity)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use NodeRef::{Real, Sink, Source};

    #[test]
    fn classic_network() {
        // CLRS figure 26.1
        let mut net = FlowNetwork::new();
        let arcs = [
            (Source, Real(1), 16.0),
            (Source, Real(2), 13.0),
            (Real(1), Real(3), 12.0),
            (Real(2), Real(1), 4.0),
            (Real(2), Real(4), 14.0),
            (Real(3), Real(2), 9.0),
            (Real(3), Sink, 20.0),
            (Real(4), Real(3), 7.0),
            (Real(4), Sink, 4.0),
        ];
        for &(a, b, c) in arcs.iter() {
            net.add_capacity(a, b, c);
        }
        assert_eq!(net.max_flow(), 23.0);
        let side = net.min_cut_source_side();
        assert!(side.contains(&Source));
        assert!(!side.contains(&Sink));
        assert_eq!(net.cut_capacity(&side), 23.0);
    }

    #[test]
    fn undirected_arcs_carry_flow_both_ways() {
        let mut net = FlowNetwork::new();
        net.add_capacity(Source, Real("b"), 5.0);
        net.add_undirected_capacity(Real("a"), Real("b"), 2.0);
        net.add_capacity(Real("a"), Sink, 5.0);
        assert_eq!(net.max_flow(), 2.0);
        let side = net.min_cut_source_side();
        assert!(side.contains(&Real("b")));
        assert!(!side.contains(&Real("a")));
    }

    #[test]
    fn isolated_nodes_are_on_the_sink_side() {
        let mut net: FlowNetwork<u32> = FlowNetwork::new();
        net.add_node(7);
        assert_eq!(net.node_count(), 3);
        assert_eq!(net.max_flow(), 0.0);
        assert_eq!(net.min_cut_source_side().len(), 1);
    }

    #[test]
    fn long_chain() {
        let n = 200_000u32;
        let mut net = FlowNetwork::new();
        net.add_capacity(Source, Real(0), 3.0);
        for i in 1..n {
            let capacity = if i == n / 2 { 1.5 } else { 2.0 };
            net.add_capacity(Real(i - 1), Real(i), capacity);
        }
        net.add_capacity(Real(n - 1), Sink, 4.0);
        assert!((net.max_flow() - 1.5).abs() < 1e-9);
        let side = net.min_cut_source_side();
        assert!(side.contains(&Real(n / 2 - 1)));
        assert!(!side.contains(&Real(n / 2)));
    }

    #[test]
    fn infinite_arcs() {
        let mut net = FlowNetwork::new();
        net.add_capacity(Source, Real(0), INFINITE_CAPACITY);
        net.add_undirected_capacity(Real(0), Real(1), 1.0);
        net.add_capacity(Real(1), Sink, INFINITE_CAPACITY);
        assert_eq!(net.max_flow(), 1.0);
        assert!(is_infinite(INFINITE_CAPACITY));
        assert!(!is_infinite(1.0));
    }

    proptest! {
        #[test]
        fn max_flow_equals_min_cut(arcs in proptest::collection::vec((0usize..8, 0usize..8, 1u32..20), 1..40)) {
            let mut net = FlowNetwork::new();
            let node = |i: usize| match i {
                0 => Source,
                7 => Sink,
                i => Real(i),
            };
            for (a, b, c) in arcs {
                if a != b {
                    net.add_capacity(node(a), node(b), c as f64);
                }
            }
            let flow = net.max_flow();
            let side = net.min_cut_source_side();
            prop_assert!(!side.contains(&Sink));
            prop_assert!((net.cut_capacity(&side) - flow).abs() < 1e-6);
        }
    }
}
