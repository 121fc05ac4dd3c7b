use std::sync::Arc;

use async_trait::async_trait;

use crate::error::InputError;

use super::Measurement;

/// Pull source invoked on every sampling tick.
///
/// `init` runs once at registration and `deinit` once when the collector
/// stops; both default to no-ops.
#[async_trait]
pub trait Input: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the source cannot be prepared; the input is
    /// then not registered.
    async fn init(&self) -> Result<(), InputError> {
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error when no measurement could be taken this tick.
    async fn gather(&self) -> Result<Measurement, InputError>;

    /// # Errors
    ///
    /// Returns an error when releasing the source fails.
    async fn deinit(&self) -> Result<(), InputError> {
        Ok(())
    }
}

pub type SharedInput = Arc<dyn Input>;

/// Adapts a plain function into an [`Input`].
pub struct InputFn<F> {
    gather: F,
}

impl<F> InputFn<F>
where
    F: Fn() -> Result<Measurement, InputError> + Send + Sync,
{
    pub const fn new(gather: F) -> Self {
        Self { gather }
    }
}

#[async_trait]
impl<F> Input for InputFn<F>
where
    F: Fn() -> Result<Measurement, InputError> + Send + Sync,
{
    async fn gather(&self) -> Result<Measurement, InputError> {
        (self.gather)()
    }
}
