//! Select-or-create protocol
//!
//! Most steps follow the same shape: list what already exists, let the
//! operator pick one of those or ask for a new one, and record the outcome
//! in [`ProvisioningState`]. [`ResourceKind`] captures the parts that differ
//! per kind; [`select_or_create`] is the shared driver.

use crate::context::Context;
use crate::error::{ProvisionError, Result};
use crate::state::ProvisioningState;
use async_trait::async_trait;
use runway_gcloud::{Describe, ResourceDescriptor};

#[async_trait]
pub trait ResourceKind: Send + Sync {
    type Item: Describe + Send + Sync;

    /// Noun used in menus, e.g. "project"
    fn noun(&self) -> &'static str;

    /// Enumerate existing resources in the current scope
    async fn list(
        &self,
        ctx: &Context,
        state: &ProvisioningState,
    ) -> runway_gcloud::Result<Vec<Self::Item>>;

    /// Prompt for fields and create a new resource
    ///
    /// `Ok(None)` means the operator declined the creation.
    async fn create(&self, ctx: &Context, state: &mut ProvisioningState)
    -> Result<Option<Self::Item>>;

    /// Record a listed or created item in state. Must not call the cloud.
    fn bind(&self, item: &Self::Item, state: &mut ProvisioningState) -> Result<()>;
}

/// How a select-or-create round ended
#[derive(Debug, Clone)]
pub enum Selection<T> {
    Existing(T),
    Created(T),
    Skipped,
}

impl<T> Selection<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Selection::Created(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Selection::Skipped)
    }
}

/// Menu label for a resource
pub fn menu_label(descriptor: &ResourceDescriptor) -> String {
    if descriptor.display_name == descriptor.native_id {
        descriptor.display_name.clone()
    } else {
        format!("{} ({})", descriptor.display_name, descriptor.native_id)
    }
}

pub async fn select_or_create<K: ResourceKind>(
    kind: &K,
    ctx: &Context,
    state: &mut ProvisioningState,
) -> Result<Selection<K::Item>> {
    let items = match kind.list(ctx, state).await {
        Ok(items) => items,
        // listing is refused until the API is enabled; nothing can exist yet
        Err(e) if e.is_execution_failure() => {
            tracing::warn!("Could not list {}s, assuming none exist: {}", kind.noun(), e);
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };

    if !items.is_empty() {
        let mut options: Vec<String> = items
            .iter()
            .map(|item| menu_label(&item.describe()))
            .collect();
        options.push(format!("Create a new {}", kind.noun()));

        let message = format!("Select an existing {} or create a new one", kind.noun());
        let choice = ctx.prompter.select(&message, &options)?;
        if choice > items.len() {
            return Err(ProvisionError::Prompt(format!(
                "selection {} is out of range for {} options",
                choice,
                options.len()
            )));
        }

        // the synthetic entry sits at index == len and falls through to create
        if let Some(item) = items.into_iter().nth(choice) {
            tracing::debug!("Using existing {} {}", kind.noun(), item.describe().native_id);
            kind.bind(&item, state)?;
            return Ok(Selection::Existing(item));
        }
    }

    match kind.create(ctx, state).await? {
        Some(item) => {
            tracing::debug!("Created {} {}", kind.noun(), item.describe().native_id);
            kind.bind(&item, state)?;
            Ok(Selection::Created(item))
        }
        None => Ok(Selection::Skipped),
    }
}
