//! # Symbol Table
//!
//! Append-only interning of namespaced role and stencil names.
//!
//! Every rule table keys on `RoleId` instead of strings. The table is owned by
//! the engine and survives recompiles, so ids handed out to callers remain
//! meaningful after an extension is loaded.

use crate::primitives::NAMESPACE_SEPARATOR;
use crate::{RoleId, StencilId};
use std::collections::BTreeMap;

/// Qualify a role or stencil token with a namespace.
///
/// Tokens containing `#` already name a role in some namespace and are
/// returned verbatim. Otherwise the namespace is prefixed, adding the
/// separator only when the namespace does not already end with it.
#[must_use]
pub fn qualify(namespace: &str, token: &str) -> String {
    if token.contains(NAMESPACE_SEPARATOR) {
        token.to_string()
    } else if namespace.ends_with(NAMESPACE_SEPARATOR) {
        format!("{}{}", namespace, token)
    } else {
        format!("{}{}{}", namespace, NAMESPACE_SEPARATOR, token)
    }
}

/// Interning table for namespaced names.
#[derive(Debug, Clone, Default)]
pub struct Symbols {
    by_name: BTreeMap<String, u32>,
    names: Vec<String>,
}

impl Symbols {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a fully qualified name, returning its existing id if known.
    pub fn intern(&mut self, name: &str) -> RoleId {
        if let Some(&id) = self.by_name.get(name) {
            return RoleId(id);
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        RoleId(id)
    }

    /// Intern `token` qualified by `namespace`.
    pub fn intern_qualified(&mut self, namespace: &str, token: &str) -> RoleId {
        self.intern(&qualify(namespace, token))
    }

    /// Look up a fully qualified name without interning it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<RoleId> {
        self.by_name.get(name).copied().map(RoleId)
    }

    /// Look up a stencil by its fully qualified id.
    #[must_use]
    pub fn stencil(&self, name: &str) -> Option<StencilId> {
        self.get(name).map(StencilId::from)
    }

    /// The qualified name of an interned role.
    #[must_use]
    pub fn name(&self, role: RoleId) -> Option<&str> {
        self.names.get(role.0 as usize).map(String::as_str)
    }

    /// The qualified name of an interned stencil id.
    #[must_use]
    pub fn stencil_name(&self, stencil: StencilId) -> Option<&str> {
        self.name(stencil.as_role())
    }

    /// Number of interned names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
