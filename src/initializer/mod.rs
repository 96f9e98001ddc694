mod direction;
mod managed;
mod types;


pub use direction::Direction;
pub use managed::{ManagedInitializer, UnitHandler, UnitPhase};
pub use types::{Placement, UnitDeclaration, UnitDeclarationBuilder, UnitId};

use crate::error::UnitError;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A unit that is started on boot and stopped on shutdown
///
/// Implementations expose their ordering declaration and two asynchronous
/// actions. The cancel token is cooperative: actions decide themselves when to
/// observe it.
#[async_trait]
pub trait Initializer: Send + Sync + 'static {
    /// Ordering declaration of this unit
    fn declaration(&self) -> &UnitDeclaration;

    /// Identifier other units use to depend on this one
    fn id(&self) -> &UnitId {
        self.declaration().id()
    }

    /// Start the unit
    async fn start(&self, cancel: &CancellationToken) -> Result<(), UnitError>;

    /// Stop the unit
    async fn stop(&self, cancel: &CancellationToken) -> Result<(), UnitError>;
}
