use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Backend(#[from] pocketbase::PocketBaseError),
    #[error("store row malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}
