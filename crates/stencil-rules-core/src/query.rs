//! # Query Module
//!
//! Argument types for connection queries.

use crate::shape::Element;

/// "Can `edge` connect `source` to `target`?"
///
/// Either endpoint may be omitted, but not both.
#[derive(Debug, Clone, Copy)]
pub struct ConnectQuery<'a> {
    pub source: Option<Element<'a>>,
    pub edge: Element<'a>,
    pub target: Option<Element<'a>>,
}

impl<'a> ConnectQuery<'a> {
    /// A query with no endpoints yet.
    #[must_use]
    pub fn new(edge: impl Into<Element<'a>>) -> Self {
        Self {
            source: None,
            edge: edge.into(),
            target: None,
        }
    }

    /// Set the source endpoint.
    #[must_use]
    pub fn from(mut self, source: impl Into<Element<'a>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the target endpoint.
    #[must_use]
    pub fn to(mut self, target: impl Into<Element<'a>>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Both endpoints helper.
    #[must_use]
    pub fn between(
        source: impl Into<Element<'a>>,
        edge: impl Into<Element<'a>>,
        target: impl Into<Element<'a>>,
    ) -> Self {
        Self::new(edge).from(source).to(target)
    }
}
