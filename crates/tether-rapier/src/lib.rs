#![warn(missing_docs)]

//! tether feature adapters over the Rapier3d rigid-body engine.
//!
//! [`RapierEngine`] implements every feature trait of `tether-core`. Worlds,
//! models, links, shapes and joints are Rapier sets and handles underneath;
//! callers only ever see [`tether_core::Identity`] values.
//!
//! # Features
//!
//! - Entity management: empty worlds, model removal by index, name or identity
//! - Construction from `tether-ir` descriptions (box, sphere, cylinder,
//!   capsule and plane shapes; fixed, revolute, prismatic and ball joints)
//! - Friction-pyramid slip compliance on shapes
//! - Joint state, velocity servos and runtime fixed joints
//! - Forward stepping with contact and pose reporting
//!
//! # Example
//!
//! ```ignore
//! use tether_core::{ConstructFromDescription, ForwardStep, GetEntities};
//! use tether_core::{StepInput, StepOutput, StepState};
//! use tether_rapier::RapierEngine;
//!
//! let root = tether_ir::Root::from_json(&json_str).unwrap();
//! let mut engine = RapierEngine::new();
//! let world = engine.construct_world(engine.engine(), &root.worlds[0]).unwrap();
//!
//! let (mut output, mut state) = (StepOutput::default(), StepState::default());
//! for _ in 0..1000 {
//!     engine.world_forward_step(world, &mut output, &mut state, &StepInput::default());
//! }
//! ```

mod colliders;
mod config;
mod construct;
mod contact;
mod convert;
mod engine;
mod entities;
mod error;
mod joint_features;
mod joints;
mod links;
mod shapes;
mod simulation;
mod world;

pub use colliders::SlipCompliance;
pub use config::EngineConfig;
pub use engine::{RapierEngine, WorldKey};
pub use error::{ConfigError, ConstructError};
pub use joints::JointType;
pub use world::{JointData, LinkData, ModelData, ModelKey, PhysicsWorld, RemovedModel, ShapeData};
