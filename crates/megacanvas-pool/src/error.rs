use thiserror::Error;

/// Result type local to megacanvas-pool.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("surface allocation failed for {width}x{height} in pool '{pool}': {source}")]
    Alloc {
        pool: String,
        width: u32,
        height: u32,
        #[source]
        source: megacanvas_core::Error,
    },

    #[error(transparent)]
    Core(#[from] megacanvas_core::Error),
}

impl Error {
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Error::Core(megacanvas_core::Error::Invariant(msg.into()))
    }
}
