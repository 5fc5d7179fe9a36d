use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("source object {0} has no foreground pixels")]
    EmptyObject(usize),

    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("grid region {region} is outside 1..={count}")]
    RegionOutOfRange { region: u32, count: u32 },

    #[error("source set is empty")]
    NoSources,

    #[error("export cancelled after {0} samples")]
    Cancelled(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ComposeError>;
