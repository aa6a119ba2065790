// src/events/mod.rs

//! Measurement and evolution events that label the nodes of a history tree.
//!
//! Each variant carries exactly the data it needs: analyzer outcomes carry an
//! [`Axis`], magnets carry an axis and a rotation magnitude. Invalid field
//! combinations from the persisted record shape are rejected when the record
//! is converted, not here.

use crate::core::{Orientation, Outcome};
use std::fmt;

/// Measurement axis of an analyzer, or field direction of a magnet.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
    /// Arbitrary direction given by explicit Bloch-sphere angles.
    N(Orientation),
}

impl Axis {
    /// The Bloch-sphere direction, supplying the canonical angle pair for
    /// the named bases.
    pub fn orientation(&self) -> Orientation {
        match self {
            Axis::X => Orientation::x(),
            Axis::Y => Orientation::y(),
            Axis::Z => Orientation::z(),
            Axis::N(orientation) => *orientation,
        }
    }

    /// Next basis in the editing cycle z → x → y → n → z.
    /// Entering `n` starts from `(0, 0)`.
    pub fn cycled(&self) -> Axis {
        match self {
            Axis::Z => Axis::X,
            Axis::X => Axis::Y,
            Axis::Y => Axis::N(Orientation::z()),
            Axis::N(_) => Axis::Z,
        }
    }

    /// Single-letter basis label.
    pub fn label(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
            Axis::N(_) => "n",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::N(orientation) => write!(f, "n{}", orientation),
            named => write!(f, "{}", named.label()),
        }
    }
}

/// What happens to the particle on the edge leading into a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// Left an analyzer through its up port.
    SpinUp { axis: Axis },
    /// Left a spin-1 analyzer through its middle port.
    SpinZero { axis: Axis },
    /// Left an analyzer through its down port.
    SpinDown { axis: Axis },
    /// Precessed in a uniform field along `axis`; `magnitude` is the
    /// dimensionless rotation angle ω·t.
    Magnet { axis: Axis, magnitude: f64 },
    /// Passed an unconfigured analyzer without being measured. The axis is
    /// kept so the analyzer can be restored on the same basis.
    Identity { axis: Axis },
}

impl Event {
    /// The analyzer-port event for `outcome` along `axis`.
    pub fn spin(axis: Axis, outcome: Outcome) -> Self {
        match outcome {
            Outcome::Up => Event::SpinUp { axis },
            Outcome::Zero => Event::SpinZero { axis },
            Outcome::Down => Event::SpinDown { axis },
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            Event::SpinUp { axis }
            | Event::SpinZero { axis }
            | Event::SpinDown { axis }
            | Event::Magnet { axis, .. }
            | Event::Identity { axis } => *axis,
        }
    }

    /// Same event with a different axis.
    pub fn with_axis(&self, axis: Axis) -> Self {
        match *self {
            Event::SpinUp { .. } => Event::SpinUp { axis },
            Event::SpinZero { .. } => Event::SpinZero { axis },
            Event::SpinDown { .. } => Event::SpinDown { axis },
            Event::Magnet { magnitude, .. } => Event::Magnet { axis, magnitude },
            Event::Identity { .. } => Event::Identity { axis },
        }
    }

    /// The measured outcome, for analyzer-port events.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Event::SpinUp { .. } => Some(Outcome::Up),
            Event::SpinZero { .. } => Some(Outcome::Zero),
            Event::SpinDown { .. } => Some(Outcome::Down),
            Event::Magnet { .. } | Event::Identity { .. } => None,
        }
    }

    pub fn is_magnet(&self) -> bool {
        matches!(self, Event::Magnet { .. })
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Event::Identity { .. })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Magnet { axis, magnitude } => write!(f, "B[{} ωt={:.2}]", axis, magnitude),
            Event::Identity { axis } => write!(f, "I[{}]", axis),
            spin => {
                // Only analyzer ports remain.
                let outcome = spin.outcome().map(|o| o.to_string()).unwrap_or_default();
                write!(f, "{}{}", spin.axis(), outcome)
            }
        }
    }
}
