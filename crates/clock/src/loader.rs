//! Load-once state for third-party player APIs.
//!
//! The hosted player's API must be initialized once per process and
//! shared by every player instance. [`ApiLoader`] makes that explicit:
//!
//! - **init**: the first [`ensure_loaded`](ApiLoader::ensure_loaded)
//!   call runs its initializer; concurrent callers wait on that same
//!   attempt instead of starting their own.
//! - **failure**: a failed attempt stores nothing; the next caller runs
//!   its initializer again.
//! - **teardown**: [`teardown`](ApiLoader::teardown) takes the loaded
//!   value out so the next `ensure_loaded` reloads. A loader in a
//!   `static` cannot be torn down and lives for the whole process.

use std::future::Future;

use tokio::sync::OnceCell;

pub struct ApiLoader<T> {
    cell: OnceCell<T>,
}

impl<T> Default for ApiLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ApiLoader<T> {
    /// An unloaded loader. Usable in a `static`.
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// Return the loaded API, running `init` only if nothing is loaded
    /// and no other caller is already loading it.
    pub async fn ensure_loaded<F, Fut, E>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell.get_or_try_init(init).await
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Unload, returning the previously loaded value.
    pub fn teardown(&mut self) -> Option<T> {
        self.cell.take()
    }
}
