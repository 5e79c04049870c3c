#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid container id: `{0}`")]
    InvalidContainerID(String),
    #[error("invalid process id: `{0}`")]
    InvalidProcessID(String),
}
pub type Result<T> = std::result::Result<T, Error>;
