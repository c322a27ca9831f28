#![warn(missing_docs)]

//! Engine-agnostic feature contract for tether physics plugins.
//!
//! A physics engine plugin exposes its capabilities as a set of feature
//! traits (see [`features`]). Callers never hold engine objects; they hold
//! [`Identity`] values which the engine resolves through its
//! [`IdentityTable`].
//!
//! # Threading
//!
//! Engines perform no internal synchronization. Each engine instance (and
//! every world inside it) must be driven from a single thread of control.
//! All mutating operations take `&mut self`, so sharing an engine across
//! threads requires the caller to provide exclusion.
//!
//! # Example
//!
//! ```ignore
//! use tether_core::{ConstructEmptyWorld, ForwardStep, GetEntities};
//! use tether_core::{StepInput, StepOutput, StepState};
//!
//! fn run<E: ConstructEmptyWorld + ForwardStep + GetEntities>(engine: &mut E) {
//!     let world = engine.construct_empty_world(engine.engine(), "default");
//!     let (mut output, mut state) = (StepOutput::default(), StepState::default());
//!     engine.world_forward_step(world, &mut output, &mut state, &StepInput::default());
//! }
//! ```

pub mod features;
mod frame;
mod identity;
mod step;

pub use features::*;
pub use frame::FrameData;
pub use identity::{EntityKey, EntityKind, Identity, IdentityTable};
pub use step::{ContactRecord, ExternalWrench, LinkPose, StepInput, StepOutput, StepState};
