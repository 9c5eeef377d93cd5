#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for observer decoupling in pakt
//!
//! All observation of the execution and capture components flows through
//! the bus defined here - observers (loggers, auditors, hook scripts) never
//! call into those components directly, which keeps them free of logging
//! and telemetry concerns.
//!
//! ## Architecture
//!
//! - **Typed routing**: any `'static` value can be published; its concrete
//!   type is the routing key
//! - **Synchronous fan-out**: `publish` delivers inline, in registration
//!   order, against a snapshot of the subscriber list
//! - **Failure isolation**: one subscriber's error never aborts delivery to
//!   the others or reaches the publisher

pub mod bus;
pub mod messages;

pub use bus::{EventBus, SubscriptionToken};
pub use messages::{AfterExecution, BeforeExecution, LockedFileWarning};
