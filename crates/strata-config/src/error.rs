//! Configuration error types.

/// Errors that can occur when loading, saving, parsing, or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to write the config file to disk.
    #[error("failed to write config: {0}")]
    WriteError(#[source] std::io::Error),

    /// Failed to parse RON content.
    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// Failed to serialize config to RON.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),

    /// The archetype list is empty.
    #[error("at least one terrain archetype is required")]
    NoArchetypes,

    /// An archetype has a negative or non-finite weight.
    #[error("archetype `{name}` has invalid weight {weight}")]
    InvalidWeight {
        /// Archetype name.
        name: String,
        /// Offending weight.
        weight: f64,
    },

    /// All archetype weights sum to zero.
    #[error("archetype weights sum to zero")]
    ZeroTotalWeight,

    /// Two archetypes share a name.
    #[error("duplicate archetype name: {0}")]
    DuplicateArchetype(String),

    /// Continent control points are not strictly increasing.
    #[error("continent control points must satisfy deep_ocean < ocean < inland, got {deep_ocean}, {ocean}, {inland}")]
    InvalidControlPoints {
        /// Deep-ocean threshold.
        deep_ocean: f64,
        /// Ocean threshold.
        ocean: f64,
        /// Inland threshold.
        inland: f64,
    },

    /// A numeric field is outside its allowed range.
    #[error("`{field}` is out of range: {value}")]
    OutOfRange {
        /// Dotted path of the field.
        field: &'static str,
        /// Offending value.
        value: f64,
    },

    /// River carving profiles are not nested valley > bank > bed.
    #[error("river profiles must nest valley > bank > bed at {end} end ({valley}, {bank}, {bed})")]
    UnnestedRiverProfile {
        /// `"start"` or `"end"` of the segment.
        end: &'static str,
        /// Valley width.
        valley: f64,
        /// Bank width.
        bank: f64,
        /// Bed width.
        bed: f64,
    },
}
