// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stack of organizations opened by nested `connect` scopes.
//!
//! Open scopes form an arena of organization snapshots addressed by [`OrganizationId`]. Entries
//! are reference counted and copied on first write, so a scope can work on a snapshot of another
//! organization without its mutations leaking back. Closing a scope releases its entry.
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use kernelscript_core::Address;
use tracing::trace;

use crate::error::AclError;
use crate::identifier::{AppRef, Entity};
use crate::organization::Organization;

/// Position of an open scope in a [`ContextStack`], counted from the outermost one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrganizationId(usize);

impl OrganizationId {
    /// Depth of the context stack the organization was opened at, usable as a DAO prefix.
    pub fn nesting_index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct ContextStack {
    scopes: Vec<Arc<Organization>>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a scope for the given organization, it becomes the top of the stack.
    pub fn push(&mut self, organization: Organization) -> OrganizationId {
        self.open(Arc::new(organization))
    }

    /// Open a scope on a copy-on-write snapshot of an organization of an open scope.
    pub fn push_snapshot(&mut self, source: OrganizationId) -> Result<OrganizationId, AclError> {
        let snapshot = self
            .scopes
            .get(source.0)
            .cloned()
            .ok_or_else(|| AclError::not_found("organization", source.0))?;

        Ok(self.open(snapshot))
    }

    fn open(&mut self, organization: Arc<Organization>) -> OrganizationId {
        let id = OrganizationId(self.scopes.len());
        trace!(
            kernel = %organization.kernel(),
            nesting_index = id.0,
            "enter organization scope"
        );
        self.scopes.push(organization);
        id
    }

    /// Close the innermost scope and release its organization.
    pub fn pop(&mut self) -> Option<OrganizationId> {
        self.scopes.pop()?;
        let id = OrganizationId(self.scopes.len());
        trace!(nesting_index = id.0, "leave organization scope");
        Some(id)
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn current_id(&self) -> Option<OrganizationId> {
        self.scopes.len().checked_sub(1).map(OrganizationId)
    }

    /// Organization of the innermost scope.
    pub fn current(&self) -> Option<&Organization> {
        self.scopes.last().map(Arc::as_ref)
    }

    pub fn current_mut(&mut self) -> Option<&mut Organization> {
        self.scopes.last_mut().map(Arc::make_mut)
    }

    pub fn get(&self, id: OrganizationId) -> Option<&Organization> {
        self.scopes.get(id.0).map(Arc::as_ref)
    }

    /// Mutable access to an organization, copying it first if it is shared with a snapshot.
    pub fn get_mut(&mut self, id: OrganizationId) -> Option<&mut Organization> {
        self.scopes.get_mut(id.0).map(Arc::make_mut)
    }

    /// Find an open organization by name, kernel address or nesting index, searching from the
    /// innermost scope outwards.
    pub fn find(&self, prefix: &str) -> Option<OrganizationId> {
        self.scopes
            .iter()
            .enumerate()
            .rev()
            .find(|(index, organization)| organization.matches(prefix, *index))
            .map(|(index, _)| OrganizationId(index))
    }

    /// Organization selected by an optional DAO prefix, the innermost one without prefix.
    pub fn select(&self, prefix: Option<&str>) -> Result<OrganizationId, AclError> {
        match prefix {
            Some(prefix) => self
                .find(prefix)
                .ok_or_else(|| AclError::not_found("organization", prefix)),
            None => self
                .current_id()
                .ok_or_else(|| AclError::not_found("organization", "in current scope")),
        }
    }

    /// Resolve an entity to an address. Addresses are returned unchanged.
    pub fn resolve_entity(&self, entity: &Entity) -> Result<Address, AclError> {
        match entity {
            Entity::Address(address) => Ok(*address),
            Entity::App { dao, app } => {
                let id = self.select(dao.as_deref())?;
                Ok(self.scopes[id.0].resolve(app)?.address)
            }
        }
    }

    /// Resolve an entity to an installed app and the organization it belongs to.
    pub fn resolve_app(&self, entity: &Entity) -> Result<(OrganizationId, AppRef), AclError> {
        match entity {
            Entity::Address(address) => self
                .scopes
                .iter()
                .enumerate()
                .rev()
                .find_map(|(index, organization)| {
                    organization
                        .key_of(address)
                        .map(|key| (OrganizationId(index), key.clone()))
                })
                .ok_or_else(|| AclError::not_found("app", address)),
            Entity::App { dao, app } => {
                let id = self.select(dao.as_deref())?;
                self.scopes[id.0].resolve(app)?;
                Ok((id, app.clone()))
            }
        }
    }

    /// Enter a scope which is left again when the returned guard is dropped, including when
    /// the code running inside the scope fails.
    pub fn enter(&mut self, organization: Organization) -> ScopeGuard<'_> {
        let id = self.push(organization);
        ScopeGuard { stack: self, id }
    }

    /// Run `f` inside a scope for the given organization. The scope is always left before the
    /// result is returned.
    pub fn with_scope<T, F>(&mut self, organization: Organization, f: F) -> Result<T, AclError>
    where
        F: FnOnce(&mut ContextStack) -> Result<T, AclError>,
    {
        let mut guard = self.enter(organization);
        f(&mut *guard)
    }
}

/// Open scope on a [`ContextStack`], closed on drop.
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    stack: &'a mut ContextStack,
    id: OrganizationId,
}

impl Deref for ScopeGuard<'_> {
    type Target = ContextStack;

    fn deref(&self) -> &Self::Target {
        self.stack
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.stack
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        // Scopes opened inside this one and never closed are closed as well.
        while self.stack.depth() > self.id.0 {
            self.stack.pop();
        }
    }
}
