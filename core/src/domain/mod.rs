//! Domain types shared across the backtesting engine.

pub mod bar;
pub mod candidate;
pub mod decision_event;
pub mod direction;
pub mod exit_spec;
pub mod ids;
pub mod outcome_label;
pub mod position;

pub use bar::Bar;
pub use candidate::Candidate;
pub use decision_event::{CircuitStateLabel, DecisionEvent};
pub use direction::Direction;
pub use exit_spec::{ExitSpec, ExitSpecError};
pub use ids::{CandidateId, ConfigHash, IdGen, PositionId, RunId};
pub use outcome_label::OutcomeLabel;
pub use position::{ExitReason, ExitState, Position, TrailingState};

/// Symbol type alias.
pub type Symbol = String;
