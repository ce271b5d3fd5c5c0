//! Spec resolver: expands image groups into concrete, uniquely named images.
//!
//! Structural groups expand over labels × filesystems; installer groups
//! expand over their release → arch map, with symbolic release keys
//! (`branched`, negative offsets from the next release) resolved through
//! the release discovery port. Discovery is consulted lazily and at most
//! once per query kind for the lifetime of a [`Resolver`].

mod installer;
mod structural;

use std::cell::Cell;

use tracing::debug;

use crate::catalog::{Catalog, GroupRef, ReleaseKey};
use crate::context::ServiceContext;
use crate::error::CatalogError;
use crate::image::ConcreteImage;

/// Caller-supplied narrowing of a single group's expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Build only this disk label.
    pub label: Option<String>,
    /// Build only this filesystem.
    pub filesystem: Option<String>,
    /// Build only this release (arch defaults to `x86_64`).
    pub release: Option<ReleaseKey>,
    /// Build only this arch.
    pub arch: Option<String>,
}

/// Expands catalog groups into [`ConcreteImage`]s.
pub struct Resolver<'a> {
    ctx: &'a ServiceContext,
    next_hint: Option<u32>,
    next_cache: Cell<Option<u32>>,
    branched_cache: Cell<Option<Option<u32>>>,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver. A `next_release` hint of `Some(0)` counts as unset.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, next_release: Option<u32>) -> Self {
        Self {
            ctx,
            next_hint: next_release.filter(|n| *n > 0),
            next_cache: Cell::new(None),
            branched_cache: Cell::new(None),
        }
    }

    /// Resolves every group in the catalog with no overrides, structural
    /// groups first, each group in catalog order.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if any group cannot be resolved.
    pub fn resolve_all(&self, catalog: &Catalog) -> Result<Vec<ConcreteImage>, CatalogError> {
        let mut images = Vec::new();
        for group in &catalog.structural {
            images.extend(structural::expand(group, &Overrides::default())?);
        }
        for group in &catalog.installer {
            images.extend(installer::expand(self, group, &Overrides::default())?);
        }
        Ok(images)
    }

    /// Resolves one group, applying overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if an override is invalid for the group or
    /// a symbolic release cannot be resolved.
    pub fn resolve_group(
        &self,
        group: GroupRef<'_>,
        overrides: &Overrides,
    ) -> Result<Vec<ConcreteImage>, CatalogError> {
        match group {
            GroupRef::Structural(g) => structural::expand(g, overrides),
            GroupRef::Installer(g) => installer::expand(self, g, overrides),
        }
    }

    /// The next release: the hint if one was given, otherwise asked of
    /// release discovery once and cached.
    fn next_release(&self, group: &str) -> Result<u32, CatalogError> {
        if let Some(next) = self.next_hint {
            return Ok(next);
        }
        if let Some(next) = self.next_cache.get() {
            return Ok(next);
        }
        let next = self.ctx.releases.next_release().map_err(|e| CatalogError::ReleaseDiscovery {
            group: group.to_string(),
            reason: e.to_string(),
        })?;
        debug!(next, "discovered next release");
        self.next_cache.set(Some(next));
        Ok(next)
    }

    /// The current branched release, asked of release discovery once and cached.
    fn branched_release(&self, group: &str) -> Result<Option<u32>, CatalogError> {
        if let Some(branched) = self.branched_cache.get() {
            return Ok(branched);
        }
        let branched =
            self.ctx.releases.branched_release().map_err(|e| CatalogError::ReleaseDiscovery {
                group: group.to_string(),
                reason: e.to_string(),
            })?;
        debug!(?branched, "discovered branched release");
        self.branched_cache.set(Some(branched));
        Ok(branched)
    }
}
