use thiserror::Error;

#[derive(Error, Debug)]
pub enum KademliaError {
    #[error("swap callback asked to insert at an already-occupied proximity order")]
    TreeDuplicate,
}

pub type Result<T> = std::result::Result<T, KademliaError>;
