pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod hosting;
pub mod initializer;
pub mod process;
pub mod registry;
pub mod simulated;
pub mod validation;

pub use app::{Bootstrapper, BootstrapperState, DEFAULT_ADDITIONAL_TIME};
pub use config::{BootstrapperConfig, UnitConfig};
pub use error::{unit_error, BootstrapError, ProcessError, Result, UnitError, UnitStateError};
pub use events::{BootstrapperEvent, EventBus, EventReceiver};
pub use hosting::{shutdown_signal, HostedBootstrapper, ShutdownReason};
pub use initializer::{
    Direction, Initializer, ManagedInitializer, Placement, UnitDeclaration, UnitHandler,
    UnitId, UnitPhase,
};
pub use process::{
    CompositeProcess, DefaultProcessConstructor, DefaultProcessOptimizer, EmptyProcess,
    ParallelProcess, Process, ProcessConstructor, ProcessOptimizer, ProcessShape,
    SequentialProcess, SingleProcess,
};
pub use registry::{BootstrapperBuilder, InitializerModule, InitializerRegistry};
pub use simulated::{ActivityJournal, SimulatedHandler, SimulatedUnit};
pub use validation::{
    DefaultInitializersValidator, InitializersValidator, ValidationIssue, ValidationReport,
};
