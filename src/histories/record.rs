// src/histories/record.rs

//! The persisted shape of a history tree and its conversion to and from the
//! arena representation.
//!
//! ```json
//! { "children": [
//!     { "basis": "z", "event": "spinUp", "children": [] },
//!     { "basis": "n", "event": "spinDown", "theta": 1.2, "phi": 0.0, "ignored": true, "children": [] }
//! ] }
//! ```
//!
//! The record keeps every field optional the way the editing layer writes
//! it; [`History::from_record`] is where missing angles or magnitudes become
//! errors instead of silently defaulting to zero.

use super::History;
use crate::core::{HistoryError, NodeId, Orientation, Spin};
use crate::events::{Axis, Event};
use crate::simulation::ProbabilityResult;
use serde::{Deserialize, Serialize};

/// Basis letter as written in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasisLabel {
    X,
    Y,
    Z,
    N,
}

/// Event discriminator as written in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventLabel {
    SpinUp,
    SpinZero,
    SpinDown,
    Magnet,
    Identity,
}

/// One node of the persisted tree. The root omits `basis` and `event`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Root only; absent means spin-1/2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin: Option<Spin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basis: Option<BasisLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignored: bool,
    /// Written by the engine on leaves; never read back as input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default)]
    pub children: Vec<HistoryRecord>,
}

impl HistoryRecord {
    /// A root record with the given children.
    pub fn root(children: Vec<HistoryRecord>) -> Self {
        Self { children, ..Self::default() }
    }

    /// A childless record for `basis`/`event`.
    pub fn leaf(basis: BasisLabel, event: EventLabel) -> Self {
        Self { basis: Some(basis), event: Some(event), ..Self::default() }
    }

    /// Resolves the measurement axis. Explicit angles override the canonical
    /// ones of a named basis field by field; the `n` basis needs both.
    fn axis(&self) -> Result<Axis, HistoryError> {
        let basis = match (self.basis, self.event) {
            (Some(basis), _) => basis,
            (None, Some(EventLabel::Identity)) => BasisLabel::Z,
            (None, _) => {
                return Err(HistoryError::Structural { message: "event is missing its basis".to_string() });
            }
        };
        let named = match basis {
            BasisLabel::X => Axis::X,
            BasisLabel::Y => Axis::Y,
            BasisLabel::Z => Axis::Z,
            BasisLabel::N => {
                let (Some(theta), Some(phi)) = (self.theta, self.phi) else {
                    return Err(HistoryError::Structural {
                        message: "basis 'n' requires both theta and phi".to_string(),
                    });
                };
                return Ok(Axis::N(Orientation::new(theta, phi)));
            }
        };
        if self.theta.is_none() && self.phi.is_none() {
            return Ok(named);
        }
        let canonical = named.orientation();
        Ok(Axis::N(Orientation::new(
            self.theta.unwrap_or(canonical.theta),
            self.phi.unwrap_or(canonical.phi),
        )))
    }

    /// The event on the edge into this (non-root) record.
    pub fn to_event(&self) -> Result<Event, HistoryError> {
        let Some(label) = self.event else {
            return Err(HistoryError::Structural { message: "non-root node is missing its event".to_string() });
        };
        let axis = self.axis()?;
        Ok(match label {
            EventLabel::SpinUp => Event::SpinUp { axis },
            EventLabel::SpinZero => Event::SpinZero { axis },
            EventLabel::SpinDown => Event::SpinDown { axis },
            EventLabel::Identity => Event::Identity { axis },
            EventLabel::Magnet => {
                let magnitude = self.magnitude.ok_or(HistoryError::Structural {
                    message: "magnet event requires a magnitude".to_string(),
                })?;
                Event::Magnet { axis, magnitude }
            }
        })
    }

    /// Record fields for `event`.
    fn from_event(event: &Event) -> Self {
        let axis = event.axis();
        let basis = match axis {
            Axis::X => BasisLabel::X,
            Axis::Y => BasisLabel::Y,
            Axis::Z => BasisLabel::Z,
            Axis::N(_) => BasisLabel::N,
        };
        let (theta, phi) = match axis {
            Axis::N(o) => (Some(o.theta), Some(o.phi)),
            _ => (None, None),
        };
        let (label, magnitude) = match *event {
            Event::SpinUp { .. } => (EventLabel::SpinUp, None),
            Event::SpinZero { .. } => (EventLabel::SpinZero, None),
            Event::SpinDown { .. } => (EventLabel::SpinDown, None),
            Event::Identity { .. } => (EventLabel::Identity, None),
            Event::Magnet { magnitude, .. } => (EventLabel::Magnet, Some(magnitude)),
        };
        Self { basis: Some(basis), event: Some(label), theta, phi, magnitude, ..Self::default() }
    }

    /// Number of leaves in this record tree.
    pub fn leaf_count(&self) -> usize {
        if self.children.is_empty() {
            1
        } else {
            self.children.iter().map(HistoryRecord::leaf_count).sum()
        }
    }
}

impl History {
    /// Builds the arena from a persisted record.
    ///
    /// # Errors
    /// `Structural` for a root carrying an event, a non-root without event or
    /// basis, an `n` basis without both angles, a magnet without magnitude,
    /// an outcome the spin multiplicity does not have, or `ignored` on a node
    /// with children. `DepthExceeded` for paths longer than the depth bound.
    pub fn from_record(record: &HistoryRecord) -> Result<History, HistoryError> {
        if record.event.is_some() || record.basis.is_some() {
            return Err(HistoryError::Structural { message: "the source carries no event of its own".to_string() });
        }
        let mut history = History::new(record.spin.unwrap_or_default());
        let root = history.root();
        apply_leaf_fields(&mut history, root, record)?;

        let mut stack: Vec<(NodeId, &HistoryRecord)> = vec![(root, record)];
        while let Some((parent, parent_record)) = stack.pop() {
            let mut pushed = Vec::with_capacity(parent_record.children.len());
            for child in &parent_record.children {
                history.ensure_room_below(parent)?;
                let event = child.to_event()?;
                if let Some(outcome) = event.outcome() {
                    if !history.spin().supports(outcome) {
                        return Err(HistoryError::Structural {
                            message: format!("{} analyzers have no {} port", history.spin(), outcome),
                        });
                    }
                }
                let id = history.push_child(parent, event);
                apply_leaf_fields(&mut history, id, child)?;
                pushed.push((id, child));
            }
            // Siblings numbered as a block, then descend; matches `compact`.
            stack.extend(pushed.into_iter().rev());
        }
        Ok(history)
    }

    /// The persisted shape of this tree, without probabilities.
    pub fn to_record(&self) -> HistoryRecord {
        self.record_at(self.root(), None)
    }

    /// The persisted shape with every leaf carrying its probability from
    /// `result`.
    pub fn annotated_record(&self, result: &ProbabilityResult) -> HistoryRecord {
        self.record_at(self.root(), Some(result))
    }

    fn record_at(&self, id: NodeId, result: Option<&ProbabilityResult>) -> HistoryRecord {
        let Some(node) = self.node(id) else { return HistoryRecord::default() };
        let mut record = match node.event() {
            Some(event) => HistoryRecord::from_event(event),
            None => HistoryRecord {
                spin: (self.spin() != Spin::Half).then_some(self.spin()),
                ..HistoryRecord::default()
            },
        };
        record.ignored = node.is_ignored();
        record.count = (node.count() > 0).then_some(node.count());
        if node.is_leaf() {
            record.probability = result.and_then(|r| r.probability(id));
        }
        record.children = node.children().iter().map(|c| self.record_at(*c, result)).collect();
        record
    }

    /// Parses the JSON form.
    pub fn from_json(json: &str) -> Result<History, HistoryError> {
        let record: HistoryRecord = serde_json::from_str(json)?;
        History::from_record(&record)
    }

    /// Pretty-printed JSON form, without probabilities.
    pub fn to_json(&self) -> Result<String, HistoryError> {
        Ok(serde_json::to_string_pretty(&self.to_record())?)
    }
}

fn apply_leaf_fields(history: &mut History, id: NodeId, record: &HistoryRecord) -> Result<(), HistoryError> {
    if record.ignored {
        if !record.children.is_empty() {
            return Err(HistoryError::Structural { message: "only leaves can be ignored".to_string() });
        }
        history.set_ignored(id, true)?;
    }
    if let Some(count) = record.count {
        history.set_count(id, count)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histories::HistoryBuilder;

    #[test]
    fn parses_the_editor_json_shape() -> Result<(), HistoryError> {
        let json = r#"{
            "children": [
                { "basis": "x", "event": "spinUp", "children": [
                    { "basis": "z", "event": "spinUp", "children": [] },
                    { "basis": "z", "event": "spinDown", "ignored": true, "children": [] }
                ] },
                { "basis": "x", "event": "spinDown", "children": [] }
            ]
        }"#;
        let history = History::from_json(json)?;
        assert_eq!(history.leaves().len(), 3);
        let ignored: Vec<bool> = history
            .leaves()
            .into_iter()
            .map(|l| history.node(l).is_some_and(|n| n.is_ignored()))
            .collect();
        assert_eq!(ignored, vec![false, true, false]);
        Ok(())
    }

    #[test]
    fn n_basis_without_angles_is_structural() {
        let record = HistoryRecord::root(vec![HistoryRecord {
            theta: Some(0.3),
            ..HistoryRecord::leaf(BasisLabel::N, EventLabel::SpinUp)
        }]);
        assert!(matches!(History::from_record(&record), Err(HistoryError::Structural { .. })));
    }

    #[test]
    fn magnet_without_magnitude_is_structural() {
        let record = HistoryRecord::root(vec![HistoryRecord::leaf(BasisLabel::Z, EventLabel::Magnet)]);
        assert!(matches!(History::from_record(&record), Err(HistoryError::Structural { .. })));
    }

    #[test]
    fn explicit_angles_override_named_basis() -> Result<(), HistoryError> {
        let magnet = HistoryRecord {
            phi: Some(0.25),
            magnitude: Some(1.0),
            ..HistoryRecord::leaf(BasisLabel::X, EventLabel::Magnet)
        };
        let event = magnet.to_event()?;
        assert_eq!(
            event,
            Event::Magnet { axis: Axis::N(Orientation::new(std::f64::consts::FRAC_PI_2, 0.25)), magnitude: 1.0 }
        );
        Ok(())
    }

    #[test]
    fn root_with_event_is_structural() {
        let record = HistoryRecord { event: Some(EventLabel::SpinUp), ..HistoryRecord::root(Vec::new()) };
        assert!(matches!(History::from_record(&record), Err(HistoryError::Structural { .. })));
    }

    #[test]
    fn ignored_analyzer_is_structural() {
        let mut port = HistoryRecord::leaf(BasisLabel::Z, EventLabel::SpinUp);
        port.ignored = true;
        port.children = vec![HistoryRecord::leaf(BasisLabel::X, EventLabel::SpinUp)];
        let record = HistoryRecord::root(vec![port]);
        assert!(matches!(History::from_record(&record), Err(HistoryError::Structural { .. })));
    }

    #[test]
    fn record_round_trip_preserves_tree() -> Result<(), HistoryError> {
        let mut builder = HistoryBuilder::new(Spin::One);
        let ports = builder.analyzer(builder.root(), Axis::N(Orientation::new(0.4, 1.3)))?;
        builder.magnet(ports[1], Axis::Y, 0.8)?;
        builder.ignore(ports[2])?;
        let history = builder.build();

        let json = history.to_json()?;
        let back = History::from_json(&json)?;
        assert_eq!(back, history);
        Ok(())
    }
}
