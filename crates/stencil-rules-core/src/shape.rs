//! # Shape View
//!
//! The interaction layer owns the live diagram. Cardinality checks need a
//! little of its instance state: which edges are docked on a shape and which
//! children it holds. `DiagramShape` exposes exactly that.

use crate::{ShapeId, StencilId};
use std::fmt;

/// Read-only view of a live shape instance.
pub trait DiagramShape {
    /// Identity of this instance.
    fn shape_id(&self) -> ShapeId;

    /// The stencil this instance was created from.
    fn stencil(&self) -> StencilId;

    /// Edges whose source end is docked on this shape, as (edge instance, edge stencil).
    fn outgoing_edges(&self) -> Vec<(ShapeId, StencilId)>;

    /// Edges whose target end is docked on this shape, as (edge instance, edge stencil).
    fn incoming_edges(&self) -> Vec<(ShapeId, StencilId)>;

    /// Stencils of the direct children of this shape.
    fn child_stencils(&self) -> Vec<StencilId>;
}

/// A query argument: either a bare stencil or a live shape.
///
/// Rules are evaluated on the stencil either way; cardinality limits are
/// only checked against live shapes.
#[derive(Clone, Copy)]
pub enum Element<'a> {
    Stencil(StencilId),
    Shape(&'a dyn DiagramShape),
}

impl<'a> Element<'a> {
    /// The stencil of this element.
    #[must_use]
    pub fn stencil(&self) -> StencilId {
        match self {
            Self::Stencil(id) => *id,
            Self::Shape(shape) => shape.stencil(),
        }
    }

    /// The live shape, if this element is one.
    #[must_use]
    pub fn shape(&self) -> Option<&'a dyn DiagramShape> {
        match self {
            Self::Stencil(_) => None,
            Self::Shape(shape) => Some(*shape),
        }
    }
}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stencil(id) => f.debug_tuple("Stencil").field(id).finish(),
            Self::Shape(shape) => f
                .debug_struct("Shape")
                .field("id", &shape.shape_id())
                .field("stencil", &shape.stencil())
                .finish(),
        }
    }
}

impl From<StencilId> for Element<'_> {
    fn from(id: StencilId) -> Self {
        Self::Stencil(id)
    }
}

impl<'a, S: DiagramShape> From<&'a S> for Element<'a> {
    fn from(shape: &'a S) -> Self {
        Self::Shape(shape)
    }
}

// =============================================================================
// SHAPE SNAPSHOT
// =============================================================================

/// Plain-data `DiagramShape` for hosts that copy instance state out of their
/// own model, and for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeSnapshot {
    pub id: ShapeId,
    pub stencil: StencilId,
    pub outgoing: Vec<(ShapeId, StencilId)>,
    pub incoming: Vec<(ShapeId, StencilId)>,
    pub children: Vec<StencilId>,
}

impl ShapeSnapshot {
    /// Create a shape with no docked edges and no children.
    #[must_use]
    pub fn new(id: ShapeId, stencil: StencilId) -> Self {
        Self {
            id,
            stencil,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Record an edge leaving this shape.
    #[must_use]
    pub fn with_outgoing(mut self, edge: ShapeId, edge_stencil: StencilId) -> Self {
        self.outgoing.push((edge, edge_stencil));
        self
    }

    /// Record an edge arriving at this shape.
    #[must_use]
    pub fn with_incoming(mut self, edge: ShapeId, edge_stencil: StencilId) -> Self {
        self.incoming.push((edge, edge_stencil));
        self
    }

    /// Record a child.
    #[must_use]
    pub fn with_child(mut self, child_stencil: StencilId) -> Self {
        self.children.push(child_stencil);
        self
    }

    /// Record a child in place.
    pub fn add_child(&mut self, child_stencil: StencilId) {
        self.children.push(child_stencil);
    }
}

impl DiagramShape for ShapeSnapshot {
    fn shape_id(&self) -> ShapeId {
        self.id
    }

    fn stencil(&self) -> StencilId {
        self.stencil
    }

    fn outgoing_edges(&self) -> Vec<(ShapeId, StencilId)> {
        self.outgoing.clone()
    }

    fn incoming_edges(&self) -> Vec<(ShapeId, StencilId)> {
        self.incoming.clone()
    }

    fn child_stencils(&self) -> Vec<StencilId> {
        self.children.clone()
    }
}
