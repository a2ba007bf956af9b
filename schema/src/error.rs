use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("{file}: package must be declared before \"{name}\"")]
    MissingPackage {
        file: String,
        name: String,
    },

    #[error("{file}: \"{name}\" is defined twice")]
    DuplicateDefinition {
        file: String,
        name: String,
    },
}
