//! Errors raised while loading or validating a description.

use thiserror::Error;

/// Errors that can occur while reading a world description.
#[derive(Error, Debug)]
pub enum DescriptionError {
    /// JSON could not be parsed.
    #[error("invalid JSON description: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML could not be parsed.
    #[error("invalid TOML description: {0}")]
    Toml(#[from] toml::de::Error),

    /// Two siblings share a name where names must be unique.
    #[error("duplicate {kind} name '{name}' in {scope}")]
    DuplicateName {
        /// Entity kind ("model", "link", ...).
        kind: &'static str,
        /// The repeated name.
        name: String,
        /// Name of the enclosing entity.
        scope: String,
    },

    /// A joint refers to a link that is not part of its model.
    #[error("joint '{joint}' references unknown link '{link}'")]
    UnknownLink {
        /// Joint name.
        joint: String,
        /// Missing link name.
        link: String,
    },

    /// A numeric field is outside its valid range.
    #[error("invalid value for {field} of '{name}': {value}")]
    InvalidValue {
        /// Owning entity name.
        name: String,
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A link or model has an empty name.
    #[error("{0} with empty name")]
    EmptyName(&'static str),
}

/// Result type for description operations.
pub type Result<T> = std::result::Result<T, DescriptionError>;
