use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Controller error: {0}")]
    Controller(#[from] reconnect_controller::ControllerError),

    #[error("Session builder is missing a transport")]
    MissingTransport,

    #[error("Session builder is missing an application host")]
    MissingHost,

    #[error("Controller task failed: {0}")]
    WorkerJoin(String),

    #[error("Session has ended")]
    Ended,
}

pub type Result<T> = std::result::Result<T, SessionError>;
