use bsync_api::ApiError;
use bsync_store::StoreError;
use thiserror::Error;

/// Anything that can abort a task body. All of these are fatal to the
/// process: the runner logs them and initiates shutdown.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
