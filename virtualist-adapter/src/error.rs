use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] virtualist::Error),

    /// A pass was run explicitly while no host was attached.
    #[error("coordinator is not attached to a host")]
    Detached,
}
