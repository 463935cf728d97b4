use thiserror::Error;

#[derive(Error, Debug)]
pub enum BmtError {
    #[error("payload of {len} bytes exceeds maximum of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("section index {index} out of range (max {max})")]
    SectionIndexOutOfRange { index: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, BmtError>;
