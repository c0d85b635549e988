use std::path::PathBuf;

/// Reasons a simulated action cannot produce a valid next state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("unknown piece shape id {0}")]
    UnknownShape(u8),

    #[error("piece cell ({row}, {col}) is outside the {width}x{height} board")]
    OutOfBounds {
        row: i32,
        col: i32,
        width: usize,
        height: usize,
    },

    #[error("piece overlaps occupied cell ({row}, {col})")]
    Collision { row: i32, col: i32 },

    #[error("piece is already resting and cannot soft-drop")]
    PieceResting,

    #[error("special action '{0}' is not in the catalog")]
    UnknownSpecialAction(String),

    #[error("special action '{id}' costs {cost} but only {available} resource is available")]
    InsufficientResource { id: String, cost: f32, available: f32 },

    #[error("special action '{0}' targets an opponent but none is present")]
    NoOpponent(String),

    #[error("special action '{id}' cannot target agent '{target}'")]
    InvalidTarget { id: String, target: String },
}

/// Errors raised while a strategy evaluates a snapshot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionError {
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("model unavailable for {0} strategy")]
    ModelUnavailable(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("no candidate action survived simulation")]
    NoCandidates,
}

impl DecisionError {
    /// Whether the caller may recover by substituting a safe default action.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DecisionError::InvalidSnapshot(_) | DecisionError::NoCandidates
        )
    }
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("no 'latest' symlink found in {0}")]
    NoLatestSymlink(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to save model: {0}")]
    ModelSave(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("insufficient training data: need at least {needed} examples, got {available}")]
    InsufficientTrainingData { needed: usize, available: usize },

    #[error("malformed training example {index}: {reason}")]
    MalformedExample { index: usize, reason: String },

    #[error("failed to read dataset from {path}: {source}")]
    DatasetRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse dataset from {path}: {source}")]
    DatasetParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("training cancelled")]
    Cancelled,

    #[error("environment error: {0}")]
    Environment(String),

    #[error("inference failed during training: {0}")]
    Inference(String),

    #[error("data does not fit the model: {0}")]
    ArchitectureMismatch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("decision error: {0}")]
    Decision(#[from] DecisionError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Errors surfaced by the engine facade.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown agent '{0}'")]
    UnknownAgent(String),

    #[error("agent '{0}' already exists")]
    DuplicateAgent(String),

    #[error("decision error: {0}")]
    Decision(#[from] DecisionError),

    #[error("training error: {0}")]
    Training(#[from] TrainingError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("model architecture mismatch: {0}")]
    ArchitectureMismatch(String),
}
