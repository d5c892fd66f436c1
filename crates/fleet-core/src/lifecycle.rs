//! Component lifecycle.
//!
//! Long-running parts of the service implement [`Component`] and are driven
//! by [`Components`]: activated in ascending [`Component::order`], stopped in
//! reverse.

use crate::FleetResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Order used by components that do not override [`Component::order`].
pub const DEFAULT_COMPONENT_ORDER: i32 = 100;

/// A unit the service bootstrap starts and stops.
#[async_trait]
pub trait Component: Send + Sync {
    /// Unique identifier.
    fn id(&self) -> &str;

    /// Activation order, lower first.
    fn order(&self) -> i32 {
        DEFAULT_COMPONENT_ORDER
    }

    /// Starts the component. Background work must observe `ctx`.
    async fn activate(&self, ctx: &CancellationToken) -> FleetResult<()>;

    /// Stops the component. `ctx` bounds how long the caller is willing to
    /// wait.
    async fn stop(&self, ctx: &CancellationToken) -> FleetResult<()>;
}

/// Ordered set of components with unique ids.
#[derive(Default)]
pub struct Components {
    components: Vec<Arc<dyn Component>>,
}

impl Components {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a component. A component whose id is already registered is
    /// ignored and `false` is returned.
    pub fn register(&mut self, component: Arc<dyn Component>) -> bool {
        if self.get(component.id()).is_some() {
            return false;
        }
        self.components.push(component);
        self.components.sort_by_key(|c| c.order());
        true
    }

    /// Looks up a component by id.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Component>> {
        self.components.iter().find(|c| c.id() == id)
    }

    /// Component ids in activation order.
    pub fn ids(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.id()).collect()
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Activates every component in order, stopping at the first failure.
    pub async fn activate_all(&self, ctx: &CancellationToken) -> FleetResult<()> {
        for component in &self.components {
            component.activate(ctx).await?;
            info!(component = component.id(), order = component.order(), "Component activated");
        }
        Ok(())
    }

    /// Stops every component in reverse order. Failures are logged and do
    /// not prevent the remaining components from stopping.
    pub async fn stop_all(&self, ctx: &CancellationToken) {
        for component in self.components.iter().rev() {
            match component.stop(ctx).await {
                Ok(()) => info!(component = component.id(), "Component stopped"),
                Err(e) => error!(component = component.id(), error = %e, "Component failed to stop"),
            }
        }
    }
}
