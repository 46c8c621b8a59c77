//! # Engine Primitives
//!
//! Fixed constants of the rules engine. They are compiled in and immutable at
//! runtime.

/// Separator between a namespace and a local role or stencil name.
///
/// A role token that already contains it belongs to a foreign namespace and
/// is used verbatim.
pub const NAMESPACE_SEPARATOR: char = '#';

/// Layout weight of any side no rule mentions.
pub const DEFAULT_WEIGHT: u32 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a namespace or role token.
///
/// Longer tokens are skipped during compilation.
pub const MAX_TOKEN_LENGTH: usize = 1024;

/// Maximum number of stencils in a single stencil set or extension.
pub const MAX_STENCILS_PER_SET: usize = 10_000;
