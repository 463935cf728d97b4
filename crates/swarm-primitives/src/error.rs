use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrimitivesError {
    #[error("payload length {0} out of range (0, CHUNK_SIZE]")]
    PayloadLength(usize),

    #[error("invalid address encoding")]
    InvalidAddress,
}
