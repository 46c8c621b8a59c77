//! # stencil-rules-core
//!
//! The Stencil Set Rules Engine - THE LOGIC.
//!
//! A diagram editor describes its model with typed *stencils* (node and edge
//! kinds) that carry namespaced *roles*. Stencil sets declare rules over
//! those roles. This crate answers, on every interactive gesture, whether a
//! connection, a containment, a cardinality limit or a morph is legal.
//!
//! ## Pipeline
//!
//! ```text
//! StencilSetSource + ExtensionSource (JSON)
//!          │  compile (full rebuild on every load)
//!          ▼
//!     RuleTables (immutable snapshot, RoleId-keyed)
//!          │  miss
//!          ▼
//!     RuleCache (composite-key memo tables)  ◄── RuleEngine queries
//! ```
//!
//! ## Architectural Constraints
//!
//! - Synchronous and single-threaded; no I/O
//! - Deterministic: `BTreeMap`/`BTreeSet` only
//! - Rule content never fails a compile; bad entries are skipped and logged

// =============================================================================
// MODULES
// =============================================================================

pub mod cache;
pub mod catalog;
pub mod compiler;
pub mod engine;
pub mod formats;
pub mod layout;
pub mod morphing;
pub mod primitives;
pub mod query;
pub mod shape;
pub mod symbols;
pub mod tables;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{Layout, Limit, RoleId, RulesError, ShapeId, StencilId, StencilKind, Weights};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use cache::CacheStats;
pub use catalog::{Stencil, StencilCatalog};
pub use engine::RuleEngine;
pub use query::ConnectQuery;
pub use shape::{DiagramShape, Element, ShapeSnapshot};
pub use symbols::{Symbols, qualify};
pub use tables::RuleTables;

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{ExtensionSource, RuleSpec, StencilDescriptor, StencilSetSource};
