//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Telemetry → Application → Database → Cache → Supervisor
//!
//! Serving (supervisor.rs):
//!     Bind listener → forward OS signals (signals.rs) → serve
//!
//! Shutdown (supervisor.rs + shutdown.rs):
//!     First signal → stop accepting → drain → teardown steps → exit
//!     Later signals → logged and ignored (state.rs guards the transition)
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: stop accept, drain, application, telemetry, cache, database
//! - Shutdown has timeout: forced exit after deadline

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;
pub mod supervisor;

pub use shutdown::{ShutdownOptions, ShutdownOutcome, TeardownReport, FORCED_EXIT_CODE};
pub use signals::{Shutdown, ShutdownReceiver, ShutdownSignal};
pub use startup::{start, StartupError, STARTUP_FAILURE_EXIT_CODE};
pub use state::{LifecycleState, Phase};
pub use supervisor::{Resources, ShutdownTrigger, Supervisor};
