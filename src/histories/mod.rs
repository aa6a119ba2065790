// src/histories/mod.rs

//! Defines the tree of measurement events whose leaves (counters) receive
//! probabilities.
//!
//! A [`History`] is an arena: nodes live in one `Vec` and refer to each other
//! through [`NodeId`]s. The root is the source and carries no event; every
//! other node carries the [`Event`] on the edge leading into it. A root-to-leaf
//! path is one history of the particle, and its ordered events define the
//! class operator used by the engine.
//!
//! Trees are grown in place with [`HistoryBuilder`] and changed afterwards
//! only through the copy-on-write edits in [`edit`], which leave the input
//! untouched and return a new tree.

pub mod edit;
pub mod record;

pub use edit::Angle;
pub use record::{BasisLabel, EventLabel, HistoryRecord};

use crate::core::{HistoryError, MAX_HISTORY_DEPTH, NodeId, Spin};
use crate::events::{Axis, Event};
use std::fmt;

/// One node of the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryNode {
    /// Event on the incoming edge; `None` only for the source.
    event: Option<Event>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Leaf excluded by post-selection.
    ignored: bool,
    /// Particles tallied by this counter.
    count: u64,
}

impl HistoryNode {
    fn new(event: Option<Event>, parent: Option<NodeId>) -> Self {
        Self { event, parent, children: Vec::new(), ignored: false, count: 0 }
    }

    pub fn event(&self) -> Option<&Event> {
        self.event.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// The device a node stands for, read off its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The root.
    Source,
    /// Children are one complete set of analyzer ports on a shared axis.
    Analyzer,
    /// Exactly one magnet child.
    Magnet,
    /// Exactly one identity child: an analyzer with all but one port blocked.
    Transparent,
    /// A leaf.
    Counter,
    /// Any other child arrangement. The engine still evaluates it.
    Irregular,
}

/// A tree of measurement histories for one spin multiplicity.
#[derive(Clone, PartialEq)]
pub struct History {
    spin: Spin,
    nodes: Vec<HistoryNode>,
}

impl History {
    /// A tree holding only the source, which is then itself a counter.
    pub fn new(spin: Spin) -> Self {
        Self { spin, nodes: vec![HistoryNode::new(None, None)] }
    }

    /// The canonical starting experiment: source into one z analyzer with a
    /// counter on every port.
    pub fn single_analyzer(spin: Spin, axis: Axis) -> Self {
        let mut history = Self::new(spin);
        let root = history.root();
        for outcome in spin.outcomes() {
            history.push_child(root, Event::spin(axis, *outcome));
        }
        history
    }

    pub fn spin(&self) -> Spin {
        self.spin
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, source included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: the source is always present.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&HistoryNode> {
        self.nodes.get(id.0)
    }

    /// Like [`History::node`] but reports a missing id as an error.
    pub fn get(&self, id: NodeId) -> Result<&HistoryNode, HistoryError> {
        self.nodes.get(id.0).ok_or(HistoryError::UnknownNode { node: id })
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], HistoryError> {
        Ok(self.get(id)?.children())
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, HistoryError> {
        Ok(self.get(id)?.parent)
    }

    pub fn event(&self, id: NodeId) -> Result<Option<&Event>, HistoryError> {
        Ok(self.get(id)?.event())
    }

    pub fn is_leaf(&self, id: NodeId) -> Result<bool, HistoryError> {
        Ok(self.get(id)?.is_leaf())
    }

    /// Number of events between the source and `id`.
    pub fn depth(&self, id: NodeId) -> Result<usize, HistoryError> {
        let mut depth = 0;
        let mut current = self.get(id)?.parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent)?.parent;
        }
        Ok(depth)
    }

    /// Events from the source down to `id`, in time order.
    pub fn path(&self, id: NodeId) -> Result<Vec<Event>, HistoryError> {
        let mut events = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get(node_id)?;
            if let Some(event) = node.event {
                events.push(event);
            }
            current = node.parent;
        }
        events.reverse();
        Ok(events)
    }

    /// Leaves reachable from the source, in depth-first order with children
    /// visited top port first.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.leaves_under(self.root())
    }

    /// Leaves of the subtree rooted at `id` (the node itself if it is a leaf).
    pub fn leaves_under(&self, id: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            let Some(node) = self.node(node_id) else { continue };
            if node.is_leaf() {
                leaves.push(node_id);
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
        leaves
    }

    /// Classifies the device at `id` from its children.
    pub fn kind(&self, id: NodeId) -> Result<NodeKind, HistoryError> {
        let node = self.get(id)?;
        if node.parent.is_none() && !node.is_leaf() {
            return Ok(NodeKind::Source);
        }
        let events: Vec<Event> = node
            .children
            .iter()
            .map(|c| self.get(*c).map(|n| n.event))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect();
        Ok(match events.as_slice() {
            [] => NodeKind::Counter,
            [Event::Magnet { .. }] => NodeKind::Magnet,
            [Event::Identity { .. }] => NodeKind::Transparent,
            _ if self.is_complete_analyzer(&events) => NodeKind::Analyzer,
            _ => NodeKind::Irregular,
        })
    }

    /// Whether `events` are exactly one port per outcome of this spin, all on
    /// one axis.
    fn is_complete_analyzer(&self, events: &[Event]) -> bool {
        let outcomes = self.spin.outcomes();
        if events.len() != outcomes.len() {
            return false;
        }
        let axis = events[0].axis();
        events.iter().all(|e| e.axis() == axis && e.outcome().is_some())
            && outcomes.iter().all(|o| events.iter().any(|e| e.outcome() == Some(*o)))
    }

    /// Whether the children of `id` (the source included) form a complete
    /// analyzer.
    pub fn is_analyzer(&self, id: NodeId) -> Result<bool, HistoryError> {
        let node = self.get(id)?;
        let events: Vec<Event> = node.children.iter().filter_map(|c| self.node(*c).and_then(|n| n.event)).collect();
        Ok(!events.is_empty() && self.is_complete_analyzer(&events))
    }

    /// Deepest path length in the tree.
    pub fn max_depth(&self) -> usize {
        self.leaves().into_iter().filter_map(|leaf| self.depth(leaf).ok()).max().unwrap_or(0)
    }

    // --- Crate-internal mutation used by the builder, the edits and record conversion ---

    pub(crate) fn push_child(&mut self, parent: NodeId, event: Event) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(HistoryNode::new(Some(event), Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Checks that `parent` may receive children without exceeding the depth
    /// bound.
    pub(crate) fn ensure_room_below(&self, parent: NodeId) -> Result<(), HistoryError> {
        let depth = self.depth(parent)? + 1;
        if depth > MAX_HISTORY_DEPTH {
            return Err(HistoryError::DepthExceeded { node: parent, depth, limit: MAX_HISTORY_DEPTH });
        }
        Ok(())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut HistoryNode, HistoryError> {
        self.nodes.get_mut(id.0).ok_or(HistoryError::UnknownNode { node: id })
    }

    pub(crate) fn set_event(&mut self, id: NodeId, event: Event) -> Result<(), HistoryError> {
        self.node_mut(id)?.event = Some(event);
        Ok(())
    }

    pub(crate) fn set_ignored(&mut self, id: NodeId, ignored: bool) -> Result<(), HistoryError> {
        self.node_mut(id)?.ignored = ignored;
        Ok(())
    }

    pub(crate) fn set_count(&mut self, id: NodeId, count: u64) -> Result<(), HistoryError> {
        self.node_mut(id)?.count = count;
        Ok(())
    }

    /// Detaches the children of `id`. Their subtrees become unreachable until
    /// [`History::compact`] drops them.
    pub(crate) fn clear_children(&mut self, id: NodeId) -> Result<(), HistoryError> {
        let node = self.node_mut(id)?;
        node.children.clear();
        Ok(())
    }

    pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) -> Result<(), HistoryError> {
        self.node_mut(id)?.children = children;
        Ok(())
    }

    /// Rebuilds the arena with only the nodes reachable from the source.
    /// Each node's children get consecutive ids, then the first child's
    /// subtree is numbered before its siblings' subtrees.
    pub(crate) fn compact(&self) -> History {
        let mut out = History::new(self.spin);
        let root = self.root();
        out.nodes[0].count = self.nodes[0].count;
        out.nodes[0].ignored = self.nodes[0].ignored;
        let mut stack = vec![(root, out.root())];
        while let Some((old, new)) = stack.pop() {
            let children = self.nodes[old.0].children.clone();
            let mut pairs = Vec::with_capacity(children.len());
            for child in children {
                let src = &self.nodes[child.0];
                let Some(event) = src.event else { continue };
                let id = out.push_child(new, event);
                out.nodes[id.0].ignored = src.ignored;
                out.nodes[id.0].count = src.count;
                pairs.push((child, id));
            }
            stack.extend(pairs.into_iter().rev());
        }
        out
    }
}

impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn draw(history: &History, id: NodeId, prefix: &str, last: bool, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let Some(node) = history.node(id) else { return Ok(()) };
            let connector = if last { "└─" } else { "├─" };
            let label = node.event.map(|e| e.to_string()).unwrap_or_default();
            write!(f, "{}{}{}", prefix, connector, label)?;
            if node.is_leaf() {
                write!(f, " ▣")?;
                if node.ignored {
                    write!(f, " (ignored)")?;
                }
                if node.count > 0 {
                    write!(f, " count={}", node.count)?;
                }
            }
            writeln!(f)?;
            let child_prefix = format!("{}{}", prefix, if last { "  " } else { "│ " });
            for (i, child) in node.children.iter().enumerate() {
                draw(history, *child, &child_prefix, i + 1 == node.children.len(), f)?;
            }
            Ok(())
        }

        writeln!(f, "History[{} leaves, {}]", self.leaves().len(), self.spin)?;
        writeln!(f, "source")?;
        let root = &self.nodes[0];
        for (i, child) in root.children.iter().enumerate() {
            draw(self, *child, "", i + 1 == root.children.len(), f)?;
        }
        Ok(())
    }
}

// Keep the Debug impl delegating to Display
impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

//-------------------------------------------------------------------------
// History Builder
//-------------------------------------------------------------------------

/// Grows a [`History`] in place, one device at a time.
///
/// ```
/// use spin_histories::{HistoryBuilder, Axis, Spin};
///
/// let mut builder = HistoryBuilder::new(Spin::Half);
/// let ports = builder.analyzer(builder.root(), Axis::X).unwrap();
/// builder.analyzer(ports[0], Axis::Z).unwrap();
/// let history = builder.build();
/// assert_eq!(history.leaves().len(), 3);
/// ```
pub struct HistoryBuilder {
    history: History,
}

impl HistoryBuilder {
    /// Creates a builder holding only the source.
    pub fn new(spin: Spin) -> Self {
        Self { history: History::new(spin) }
    }

    pub fn root(&self) -> NodeId {
        self.history.root()
    }

    /// Appends one child carrying `event` below `parent`.
    pub fn add_event(&mut self, parent: NodeId, event: Event) -> Result<NodeId, HistoryError> {
        self.history.get(parent)?;
        self.history.ensure_room_below(parent)?;
        if let Some(outcome) = event.outcome() {
            if !self.history.spin.supports(outcome) {
                return Err(HistoryError::Structural {
                    message: format!("{} analyzers have no {} port", self.history.spin, outcome),
                });
            }
        }
        // A counter that receives children stops being post-selected.
        self.history.set_ignored(parent, false)?;
        Ok(self.history.push_child(parent, event))
    }

    /// Puts a complete analyzer on `parent`, returning its port nodes in
    /// outcome order (up, [zero,] down).
    pub fn analyzer(&mut self, parent: NodeId, axis: Axis) -> Result<Vec<NodeId>, HistoryError> {
        let outcomes = self.history.spin.outcomes();
        outcomes.iter().map(|o| self.add_event(parent, Event::spin(axis, *o))).collect()
    }

    /// Puts a magnet on `parent`, returning the node after it.
    pub fn magnet(&mut self, parent: NodeId, axis: Axis, magnitude: f64) -> Result<NodeId, HistoryError> {
        self.add_event(parent, Event::Magnet { axis, magnitude })
    }

    /// Marks a counter as ignored.
    pub fn ignore(&mut self, leaf: NodeId) -> Result<&mut Self, HistoryError> {
        if !self.history.is_leaf(leaf)? {
            return Err(HistoryError::InvalidEdit { node: leaf, message: "only counters can be ignored".to_string() });
        }
        self.history.set_ignored(leaf, true)?;
        Ok(self)
    }

    /// Finalizes the construction process and returns the built `History`.
    pub fn build(self) -> History {
        self.history
    }
}
