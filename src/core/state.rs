use crate::core::pricing::Catalog;
use crate::domain::model::WizardState;
use crate::utils::error::Result;

/// Owns the wizard state. `mutate` is the only way to change it.
#[derive(Debug)]
pub struct StateStore {
    state: WizardState,
    catalog: Catalog,
    revision: u64,
}

impl StateStore {
    pub fn new(initial: WizardState, catalog: Catalog) -> Result<Self> {
        catalog.check(&initial)?;
        Ok(Self {
            state: initial,
            catalog,
            revision: 0,
        })
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// Number of committed mutations so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Applies `f` to a working copy and commits it if the invariants hold.
    ///
    /// A rejected mutation leaves the committed state untouched.
    pub fn mutate<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WizardState) -> T,
    {
        let mut next = self.state.clone();
        let output = f(&mut next);

        if let Err(e) = self.catalog.check(&next) {
            tracing::warn!("Rejected mutation: {}", e);
            return Err(e);
        }

        self.state = next;
        self.revision += 1;
        tracing::debug!("Committed state revision {}", self.revision);
        Ok(output)
    }
}
