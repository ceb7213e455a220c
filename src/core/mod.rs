//! Core data structures for keg.
//!
//! This module contains the foundational types used throughout keg:
//! - Formulas and their dependencies
//! - Keg/cellar layout and placeholder variables
//! - Typed configure arguments and service descriptors
//! - Host platform and version handling

pub mod configure;
pub mod dependency;
pub mod formula;
pub mod layout;
pub mod platform;
pub mod service;
pub mod version;

pub use configure::{ConfigureArg, ConfigureOptions};
pub use dependency::{DepKind, Dependency};
pub use formula::{Formula, FormulaError, PostInstallAction, TestStep};
pub use layout::KegLayout;
pub use platform::{Arch, Os, Platform};
pub use service::{ResolvedService, ServiceSpec};
pub use version::FormulaVersion;
