//! Workspace umbrella crate.
//!
//! Re-exports the service façade so host applications can depend on
//! `clipsync-workspace` alone. The individual crates remain available under
//! their own names for hosts that only need part of the core.

#[cfg(feature = "service")]
pub use core_service::*;
