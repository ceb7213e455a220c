//! High-level operations behind the CLI commands.

pub mod keg_fetch;
pub mod keg_info;
pub mod keg_install;
pub mod keg_livecheck;
pub mod keg_post_install;
pub mod keg_service;
pub mod link;
pub mod receipt;

pub use keg_fetch::{downloader, fetch_source};
pub use keg_info::{formula_info, FormulaInfo};
pub use keg_install::{install, plan_install, InstallOptions, InstallSummary};
pub use keg_livecheck::{livecheck, LivecheckResult};
pub use keg_post_install::{post_install, run_post_install, ActionOutcome, PostInstallReport};
pub use keg_service::{render, resolve_service, ServiceFormat};
pub use keg_test::{test_formula, TestOutcome, TestReport};
pub use link::{link_bins, link_opt};
pub use receipt::{installed_keg, installed_names, is_installed, InstallReceipt};
