// src/histories/edit.rs

//! Copy-on-write edits of a [`History`].
//!
//! Every edit borrows the current tree and returns a new one, so a caller can
//! keep the previous tree around (for undo or animated transitions) without
//! aliasing. Edits that only add leaves below a counter or relabel nodes keep
//! existing `NodeId`s; edits that drop subtrees or reorder ports compact the
//! arena and renumber.

use super::History;
use crate::core::{HistoryError, NodeId, Orientation, Outcome};
use crate::events::{Axis, Event};
use tracing::debug;

/// Which Bloch-sphere angle a slider edit changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Angle {
    Theta,
    Phi,
}

impl History {
    /// Turns the counter `leaf` into a complete analyzer along `axis`, with a
    /// fresh counter on every port.
    pub fn with_analyzer(&self, leaf: NodeId, axis: Axis) -> Result<History, HistoryError> {
        if !self.is_leaf(leaf)? {
            return Err(HistoryError::InvalidEdit { node: leaf, message: "analyzers can only replace counters".to_string() });
        }
        self.ensure_room_below(leaf)?;
        let mut next = self.clone();
        next.set_ignored(leaf, false)?;
        next.set_count(leaf, 0)?;
        for outcome in self.spin().outcomes() {
            next.push_child(leaf, Event::spin(axis, *outcome));
        }
        debug!(node = %leaf, %axis, "placed analyzer");
        Ok(next)
    }

    /// Replaces whatever follows `node` with a single magnet and a counter
    /// behind it.
    pub fn with_magnet(&self, node: NodeId, axis: Axis, magnitude: f64) -> Result<History, HistoryError> {
        self.ensure_room_below(node)?;
        let mut next = self.clone();
        next.clear_children(node)?;
        next.set_ignored(node, false)?;
        next.set_count(node, 0)?;
        next.push_child(node, Event::Magnet { axis, magnitude });
        debug!(%node, %axis, magnitude, "placed magnet");
        Ok(next.compact())
    }

    /// Drops every descendant of `node`, leaving a counter.
    pub fn with_counter(&self, node: NodeId) -> Result<History, HistoryError> {
        let mut next = self.clone();
        next.clear_children(node)?;
        debug!(%node, "placed counter");
        Ok(next.compact())
    }

    /// Cycles the device behind `node`: counter → analyzer → magnet → counter.
    /// New devices start on the z axis, magnets with magnitude 1.
    pub fn cycle_device(&self, node: NodeId) -> Result<History, HistoryError> {
        let children = self.children(node)?;
        let behind_magnet = matches!(
            children,
            [only] if self.node(*only).and_then(|n| n.event()).is_some_and(Event::is_magnet)
        );
        if children.is_empty() {
            self.with_analyzer(node, Axis::Z)
        } else if behind_magnet {
            self.with_counter(node)
        } else {
            self.with_magnet(node, Axis::Z, 1.0)
        }
    }

    /// Advances the basis of every child of `node` along z → x → y → n → z,
    /// starting from the first child's basis. Entering `n` resets the angles
    /// to `(0, 0)`.
    pub fn cycle_basis(&self, node: NodeId) -> Result<History, HistoryError> {
        let first = self.first_child_event(node)?;
        self.with_axis(node, first.axis().cycled())
    }

    /// Sets the axis of every child of `node`.
    pub fn with_axis(&self, node: NodeId, axis: Axis) -> Result<History, HistoryError> {
        self.first_child_event(node)?;
        let mut next = self.clone();
        for child in self.children(node)? {
            if let Some(event) = self.get(*child)?.event() {
                next.set_event(*child, event.with_axis(axis))?;
            }
        }
        debug!(%node, %axis, "changed basis");
        Ok(next)
    }

    /// Sets one Bloch angle on every child of `node`. A named basis is first
    /// turned into the explicit `n` basis at its canonical angles.
    pub fn with_angle(&self, node: NodeId, angle: Angle, value: f64) -> Result<History, HistoryError> {
        let current = self.first_child_event(node)?.axis().orientation();
        let orientation = match angle {
            Angle::Theta => Orientation::new(value, current.phi),
            Angle::Phi => Orientation::new(current.theta, value),
        };
        self.with_axis(node, Axis::N(orientation))
    }

    /// Sets the rotation magnitude of the magnet behind `node`.
    pub fn with_magnitude(&self, node: NodeId, magnitude: f64) -> Result<History, HistoryError> {
        let children = self.children(node)?;
        let [only] = children else {
            return Err(HistoryError::InvalidEdit { node, message: "no magnet follows this node".to_string() });
        };
        let Some(Event::Magnet { axis, .. }) = self.get(*only)?.event().copied() else {
            return Err(HistoryError::InvalidEdit { node, message: "no magnet follows this node".to_string() });
        };
        let mut next = self.clone();
        next.set_event(*only, Event::Magnet { axis, magnitude })?;
        Ok(next)
    }

    /// Marks or unmarks a counter as ignored (post-selected away).
    pub fn with_ignored(&self, leaf: NodeId, ignored: bool) -> Result<History, HistoryError> {
        if !self.is_leaf(leaf)? {
            return Err(HistoryError::InvalidEdit { node: leaf, message: "only counters can be ignored".to_string() });
        }
        let mut next = self.clone();
        next.set_ignored(leaf, ignored)?;
        Ok(next)
    }

    /// Removes the analyzer port `leaf`, leaving the analyzer transparent.
    ///
    /// The first remaining port (in outcome order) keeps its subtree but its
    /// event becomes `Identity` on the same axis. The third port of a spin-1
    /// analyzer is dropped, so it must be a counter as well.
    pub fn make_transparent(&self, leaf: NodeId) -> Result<History, HistoryError> {
        if !self.is_leaf(leaf)? {
            return Err(HistoryError::InvalidEdit { node: leaf, message: "only a counter port can be removed".to_string() });
        }
        let parent = self.parent(leaf)?.ok_or(HistoryError::InvalidEdit {
            node: leaf,
            message: "the source has no analyzer port to remove".to_string(),
        })?;
        if !self.is_analyzer(parent)? {
            return Err(HistoryError::InvalidEdit {
                node: leaf,
                message: "ports can only be removed from a complete analyzer".to_string(),
            });
        }
        let survivor = self
            .children(parent)?
            .iter()
            .copied()
            .find(|c| *c != leaf)
            .ok_or(HistoryError::InvalidEdit { node: leaf, message: "cannot remove an only child".to_string() })?;
        for dropped in self.children(parent)? {
            if *dropped != leaf && *dropped != survivor && !self.is_leaf(*dropped)? {
                return Err(HistoryError::InvalidEdit {
                    node: *dropped,
                    message: "the port that would be dropped still has devices behind it".to_string(),
                });
            }
        }
        let axis = self.first_child_event(parent)?.axis();

        let mut next = self.clone();
        next.set_event(survivor, Event::Identity { axis })?;
        next.set_children(parent, vec![survivor])?;
        debug!(node = %leaf, "removed analyzer port");
        Ok(next.compact())
    }

    /// Turns the transparent analyzer behind `node` back into a complete one.
    /// The existing subtree continues on the `kept` port; every other port
    /// gets a fresh counter. Ids below `node` are renumbered.
    pub fn restore_analyzer(&self, node: NodeId, kept: Outcome) -> Result<History, HistoryError> {
        let children = self.children(node)?;
        let [only] = children else {
            return Err(HistoryError::InvalidEdit { node, message: "no transparent analyzer follows this node".to_string() });
        };
        let only = *only;
        let Some(Event::Identity { axis }) = self.get(only)?.event().copied() else {
            return Err(HistoryError::InvalidEdit { node, message: "no transparent analyzer follows this node".to_string() });
        };
        if !self.spin().supports(kept) {
            return Err(HistoryError::InvalidEdit { node, message: format!("{} analyzers have no {} port", self.spin(), kept) });
        }

        let mut next = self.clone();
        next.set_event(only, Event::spin(axis, kept))?;
        let mut ports = Vec::with_capacity(self.spin().dim());
        for outcome in self.spin().outcomes() {
            if *outcome == kept {
                ports.push(only);
            } else {
                let id = next.push_child(node, Event::spin(axis, *outcome));
                ports.push(id);
            }
        }
        next.set_children(node, ports)?;
        debug!(%node, "restored analyzer");
        Ok(next.compact())
    }

    fn first_child_event(&self, node: NodeId) -> Result<Event, HistoryError> {
        self.children(node)?
            .first()
            .and_then(|c| self.node(*c))
            .and_then(|n| n.event().copied())
            .ok_or(HistoryError::InvalidEdit { node, message: "no device follows this node".to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Spin;
    use crate::histories::NodeKind;

    fn ports(history: &History, node: NodeId) -> Vec<NodeId> {
        history.children(node).map(|c| c.to_vec()).unwrap_or_default()
    }

    #[test]
    fn edits_leave_the_input_untouched() -> Result<(), HistoryError> {
        let before = History::single_analyzer(Spin::Half, Axis::Z);
        let up = ports(&before, before.root())[0];
        let after = before.with_analyzer(up, Axis::X)?;
        assert_eq!(before.leaves().len(), 2);
        assert_eq!(after.leaves().len(), 3);
        Ok(())
    }

    #[test]
    fn cycle_device_goes_counter_analyzer_magnet_counter() -> Result<(), HistoryError> {
        let start = History::single_analyzer(Spin::Half, Axis::Z);
        let up = ports(&start, start.root())[0];

        let analyzer = start.cycle_device(up)?;
        assert_eq!(analyzer.kind(up)?, NodeKind::Analyzer);

        let magnet = analyzer.cycle_device(up)?;
        assert_eq!(magnet.kind(up)?, NodeKind::Magnet);
        let field = magnet.children(up)?[0];
        assert_eq!(magnet.event(field)?, Some(&Event::Magnet { axis: Axis::Z, magnitude: 1.0 }));

        let counter = magnet.cycle_device(up)?;
        assert_eq!(counter.kind(up)?, NodeKind::Counter);
        assert_eq!(counter.len(), start.len());
        Ok(())
    }

    #[test]
    fn cycle_basis_relabels_all_ports() -> Result<(), HistoryError> {
        let history = History::single_analyzer(Spin::Half, Axis::Z);
        let root = history.root();
        let x = history.cycle_basis(root)?;
        let y = x.cycle_basis(root)?;
        let n = y.cycle_basis(root)?;
        for child in ports(&n, root) {
            assert_eq!(n.event(child)?.map(|e| e.axis()), Some(Axis::N(Orientation::z())));
        }
        let z = n.cycle_basis(root)?;
        assert_eq!(z, history);
        Ok(())
    }

    #[test]
    fn angle_edit_switches_to_explicit_basis() -> Result<(), HistoryError> {
        let history = History::single_analyzer(Spin::Half, Axis::X);
        let root = history.root();
        let tilted = history.with_angle(root, Angle::Phi, 1.0)?;
        let axis = tilted.event(ports(&tilted, root)[1])?.map(|e| e.axis());
        assert_eq!(axis, Some(Axis::N(Orientation::new(std::f64::consts::FRAC_PI_2, 1.0))));
        Ok(())
    }

    #[test]
    fn magnitude_edit_requires_a_magnet() -> Result<(), HistoryError> {
        let history = History::single_analyzer(Spin::Half, Axis::Z);
        let err = history.with_magnitude(history.root(), 2.0);
        assert!(matches!(err, Err(HistoryError::InvalidEdit { .. })));

        let with_magnet = history.with_magnet(history.root(), Axis::Y, 1.0)?;
        let updated = with_magnet.with_magnitude(with_magnet.root(), 2.0)?;
        let field = updated.children(updated.root())?[0];
        assert_eq!(updated.event(field)?, Some(&Event::Magnet { axis: Axis::Y, magnitude: 2.0 }));
        Ok(())
    }

    #[test]
    fn ignoring_an_analyzer_is_rejected() {
        let history = History::single_analyzer(Spin::Half, Axis::Z);
        let err = history.with_ignored(history.root(), true);
        assert!(matches!(err, Err(HistoryError::InvalidEdit { .. })));
    }

    #[test]
    fn transparent_round_trip_restores_ports() -> Result<(), HistoryError> {
        let history = History::single_analyzer(Spin::Half, Axis::Y);
        let root = history.root();
        let down = ports(&history, root)[1];

        let transparent = history.make_transparent(down)?;
        assert_eq!(transparent.kind(root)?, NodeKind::Source);
        let survivor = ports(&transparent, root);
        assert_eq!(survivor.len(), 1);
        assert_eq!(transparent.event(survivor[0])?, Some(&Event::Identity { axis: Axis::Y }));

        let restored = transparent.restore_analyzer(root, Outcome::Up)?;
        assert!(restored.is_analyzer(root)?);
        let events: Vec<Event> = ports(&restored, root)
            .into_iter()
            .filter_map(|c| restored.event(c).ok().flatten().copied())
            .collect();
        assert_eq!(events, vec![Event::SpinUp { axis: Axis::Y }, Event::SpinDown { axis: Axis::Y }]);
        Ok(())
    }

    #[test]
    fn restored_tree_survives_json_round_trip() -> Result<(), HistoryError> {
        let history = History::single_analyzer(Spin::Half, Axis::Z);
        let root = history.root();
        let up = ports(&history, root)[0];
        let down = ports(&history, root)[1];
        let grown = history.with_analyzer(up, Axis::X)?;

        let restored = grown.make_transparent(down)?.restore_analyzer(root, Outcome::Up)?;
        let back = History::from_json(&restored.to_json()?)?;
        assert_eq!(back, restored);
        assert_eq!(restored.leaves().len(), 3);
        Ok(())
    }

    #[test]
    fn spin_one_transparent_keeps_occupied_ports() -> Result<(), HistoryError> {
        let history = History::single_analyzer(Spin::One, Axis::Z);
        let root = history.root();
        let three = ports(&history, root);
        let (up, zero, down) = (three[0], three[1], three[2]);
        let occupied = history.with_analyzer(down, Axis::X)?;

        // Removing the zero port would drop the analyzer behind the down port.
        let err = occupied.make_transparent(zero);
        assert!(matches!(err, Err(HistoryError::InvalidEdit { node, .. }) if node == down));

        // With only counters behind the ports any of them can go.
        let transparent = history.make_transparent(up)?;
        assert_eq!(ports(&transparent, root).len(), 1);
        Ok(())
    }

    #[test]
    fn transparent_needs_a_counter_port() -> Result<(), HistoryError> {
        let history = History::single_analyzer(Spin::Half, Axis::Z);
        let up = ports(&history, history.root())[0];
        let deeper = history.with_analyzer(up, Axis::X)?;
        assert!(matches!(deeper.make_transparent(up), Err(HistoryError::InvalidEdit { .. })));
        assert!(matches!(deeper.make_transparent(deeper.root()), Err(HistoryError::InvalidEdit { .. })));
        Ok(())
    }
}
