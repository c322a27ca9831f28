//! Error types for engine construction and configuration.

use tether_core::Identity;
use tether_ir::DescriptionError;
use thiserror::Error;

/// Errors that can occur while building entities from descriptions.
#[derive(Error, Debug)]
pub enum ConstructError {
    /// The description failed validation.
    #[error(transparent)]
    Description(#[from] DescriptionError),

    /// The target entity does not resolve.
    #[error("{0} does not refer to a live entity of the expected kind")]
    UnknownEntity(Identity),

    /// A joint names a link that is not part of the model.
    #[error("link '{link}' not found in model '{model}'")]
    MissingLink {
        /// Model name.
        model: String,
        /// Link name.
        link: String,
    },

    /// A link name is already taken within the model.
    #[error("link '{link}' already exists in model '{model}'")]
    DuplicateLink {
        /// Model name.
        model: String,
        /// Link name.
        link: String,
    },

    /// Invalid joint configuration.
    #[error("invalid joint '{name}': {reason}")]
    InvalidJoint {
        /// Joint name.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to create collision shape.
    #[error("failed to create collision shape for {name}: {reason}")]
    CollisionShape {
        /// Collision name.
        name: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Errors raised while loading an engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for [`EngineConfig`](crate::EngineConfig).
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
}
