use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Duplicate type: {0} is already registered")]
    DuplicateType(String),

    #[error("Generics not assignable to {base} from {requested}")]
    IncompatibleGenerics { base: String, requested: String },

    #[error("Duplicate prop in {block}: {key}")]
    DuplicateProperty { block: String, key: String },

    #[error("Prop in {block} has no direction (input, output or control): {key}")]
    UndirectedProperty { block: String, key: String },

    #[error("Duplicate block name: {0}")]
    DuplicateBlock(String),

    #[error("Unknown block: {0}")]
    UnknownBlock(String),

    #[error("Node does not exist: {0}")]
    UnknownNode(String),

    #[error("Prop not found on {block}: {key}")]
    PropertyNotFound { block: String, key: String },

    #[error("Unknown input on {block}: {key}")]
    UnknownInput { block: String, key: String },

    #[error("Cycle detected while compiling {node}.{key}")]
    CycleDetected { node: String, key: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
