use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("adc frame is empty")]
    EmptyFrame,
    #[error("sensor disconnected")]
    Disconnected,
    #[error("counts {0} outside the 14-bit range")]
    OutOfRange(i64),
}

pub type Result<T> = std::result::Result<T, HwError>;
