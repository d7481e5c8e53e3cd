//! core
//!
//! Domain primitives shared by every layer: the destructive-operation
//! policy, platform predicates, package specifications and path routing.

pub mod options;
pub mod paths;
pub mod platform;
pub mod spec;

pub use options::{Options, Strategy};
pub use platform::Platform;
pub use spec::PackageSpec;
