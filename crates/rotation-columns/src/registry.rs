//! The shared, atomically replaced current column set.
//!
//! [`ColumnRegistry`] owns the base schema and the currently effective
//! column set. Readers take a cheap [`Arc`] clone of the whole set;
//! [`reload`](ColumnRegistry::reload) resolves a new set off to the side
//! and swaps the pointer in one step, so concurrent readers see either
//! the old set or the new set in full, never a partial merge. A failed
//! reload leaves the previous set in place.

use std::sync::{Arc, PoisonError, RwLock};

use rotation_types::ColumnDefinition;
use tracing::{info, warn};

use crate::config::{ExtensionColumn, ExtensionSource};
use crate::error::ColumnConfigError;
use crate::resolve::{EffectiveColumnSet, resolve};

/// The current column set together with its generation number.
#[derive(Debug, Clone)]
struct Current {
    generation: u64,
    columns: Arc<EffectiveColumnSet>,
}

/// Shared holder of the effective column set.
#[derive(Debug)]
pub struct ColumnRegistry {
    base: Vec<ColumnDefinition>,
    current: RwLock<Current>,
}

impl ColumnRegistry {
    /// Resolve the initial column set and build a registry around it.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnConfigError`] if the initial resolution fails.
    pub fn new(
        base: Vec<ColumnDefinition>,
        extensions: &[ExtensionColumn],
    ) -> Result<Self, ColumnConfigError> {
        let columns = resolve(&base, extensions)?;
        info!(
            generation = 0_u64,
            columns = columns.len(),
            extensions = extensions.len(),
            "Effective column set resolved"
        );
        Ok(Self {
            base,
            current: RwLock::new(Current {
                generation: 0,
                columns: Arc::new(columns),
            }),
        })
    }

    /// Build a registry from an extension source.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnConfigError`] if loading or resolving fails.
    pub fn from_source(
        base: Vec<ColumnDefinition>,
        source: &dyn ExtensionSource,
    ) -> Result<Self, ColumnConfigError> {
        let extensions = source.load()?;
        Self::new(base, &extensions)
    }

    /// The base schema this registry merges extensions into.
    pub fn base(&self) -> &[ColumnDefinition] {
        &self.base
    }

    /// The current effective column set.
    pub fn current(&self) -> Arc<EffectiveColumnSet> {
        Arc::clone(&self.read().columns)
    }

    /// The current set and its generation, read together.
    pub fn current_versioned(&self) -> (u64, Arc<EffectiveColumnSet>) {
        let current = self.read();
        (current.generation, Arc::clone(&current.columns))
    }

    /// Generation of the current set. Starts at 0 and increases by one on
    /// every successful reload.
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Re-resolve with a new extension list and swap it in.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnConfigError`] if resolution fails; the current set
    /// is left untouched.
    pub fn reload(
        &self,
        extensions: &[ExtensionColumn],
    ) -> Result<Arc<EffectiveColumnSet>, ColumnConfigError> {
        let resolved = match resolve(&self.base, extensions) {
            Ok(set) => Arc::new(set),
            Err(e) => {
                warn!(error = %e, "Column reload rejected, keeping previous set");
                return Err(e);
            }
        };

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.generation = current.generation.saturating_add(1);
        current.columns = Arc::clone(&resolved);
        info!(
            generation = current.generation,
            columns = resolved.len(),
            extensions = extensions.len(),
            "Effective column set reloaded"
        );
        Ok(resolved)
    }

    /// Reload from an extension source.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnConfigError`] if loading or resolving fails.
    pub fn reload_from(
        &self,
        source: &dyn ExtensionSource,
    ) -> Result<Arc<EffectiveColumnSet>, ColumnConfigError> {
        let extensions = source.load().inspect_err(|e| {
            warn!(error = %e, "Failed to load extension columns, keeping previous set");
        })?;
        self.reload(&extensions)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Current> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}
