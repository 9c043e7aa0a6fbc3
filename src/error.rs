use thiserror::Error;

/// Everything the dashboard core can fail with.
#[derive(Debug, Error)]
pub enum DashError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("parse error at line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("no rows match job filter {0:?}")]
    EmptyFilterResult(String),

    #[error("division by zero while computing {0}")]
    DivisionByZero(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

pub type DashResult<T> = Result<T, DashError>;

impl DashError {
    /// Short stable tag used as the `kind` field in log records.
    pub fn kind(&self) -> &'static str {
        match self {
            DashError::Io(_) => "io",
            DashError::Fetch(_) => "fetch",
            DashError::Parse { .. } => "parse",
            DashError::MissingColumns(_) => "missing_columns",
            DashError::EmptyFilterResult(_) => "empty_filter_result",
            DashError::DivisionByZero(_) => "division_by_zero",
            DashError::InvalidConfig(_) => "invalid_config",
            DashError::Render(_) => "render",
            DashError::Invariant(_) => "invariant",
        }
    }
}
