use thiserror::Error;

use crate::config::ConfigError;
use crate::platform::PlatformError;
use crate::store::StoreError;
use crate::RuleError;

/// Unified error type covering rule editing, storage, platform calls and
/// configuration.
///
/// Returned by [`Reconciler::run_pass()`](crate::Reconciler::run_pass) and the
/// [`Manager`](crate::Manager) command methods.
#[derive(Debug, Error)]
pub enum ExtwakeError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
