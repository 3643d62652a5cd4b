use thiserror::Error;

/// Convenience alias for `Result<T, ShardingError>`.
pub type ShardingResult<T> = Result<T, ShardingError>;

/// Error classification for the layer that receives the error.
///
/// - `Configuration`: raised while building or altering a rule; the whole
///   new topology is rejected and the previous one keeps serving.
/// - `Query`: raised while routing one statement; scoped to that
///   statement only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Query,
}

/// Top-level error type that all crate-specific errors convert into.
#[derive(Error, Debug)]
pub enum ShardingError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Routing error: {0}")]
    Query(#[from] QueryError),

    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),
}

/// Configuration-time errors. Terminal for the rule-load operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse rule configuration: {reason}")]
    Parse { reason: String },

    #[error("Failed to read rule configuration '{path}': {reason}")]
    Io { path: String, reason: String },

    #[error("Algorithm '{algorithm}' initialization failed: {reason}")]
    AlgorithmInitialization { algorithm: String, reason: String },

    #[error("Sharding algorithm '{name}' has unknown type '{algorithm_type}'")]
    UnknownAlgorithmType { name: String, algorithm_type: String },

    #[error("Table '{table}' binds algorithm '{algorithm}' but the strategy needs a {expected} algorithm")]
    AlgorithmKindMismatch {
        table: String,
        algorithm: String,
        expected: &'static str,
    },

    #[error("Sharding rule '{rule}' has an empty logic table name")]
    EmptyLogicTable { rule: String },

    #[error("Logic table '{table}' is configured more than once")]
    DuplicateLogicTable { table: String },

    #[error("Sharding algorithm '{algorithm}' referenced by '{table}' does not exist")]
    MissingShardingAlgorithm { table: String, algorithm: String },

    #[error("Key generator '{key_generator}' referenced by '{table}' does not exist")]
    MissingKeyGenerator { table: String, key_generator: String },

    #[error("Auditor '{auditor}' referenced by '{table}' does not exist")]
    MissingAuditor { table: String, auditor: String },

    #[error("Key generate strategy of '{table}' has no column")]
    MissingKeyGenerateColumn { table: String },

    #[error("Complex sharding strategy of '{table}' has no sharding columns")]
    MissingShardingColumns { table: String },

    #[error("Standard sharding strategy of '{table}' has no sharding column and no default is set")]
    MissingShardingColumn { table: String },

    #[error("Invalid data node '{text}': expected 'data_source.table' or 'data_source.schema.table'")]
    InvalidDataNode { text: String },

    #[error("Invalid inline expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("Binding table group '{group}' references unknown sharding table '{table}'")]
    UnknownBindingTable { group: String, table: String },

    #[error("Actual data node '{data_source}.{table}' of '{logic_table}' is already owned by '{existing_logic_table}'")]
    DuplicatePhysicalTable {
        logic_table: String,
        existing_logic_table: String,
        data_source: String,
        table: String,
    },

    #[error("Binding table group '{group}' has actual table names without a numeric suffix")]
    NonNumericBindingSuffix { group: String },

    #[error("Invalid binding table configuration in group '{group}'")]
    InvalidBindingGroup { group: String },

    #[error("Inline expression of algorithm '{algorithm}' on '{table}' does not match the actual data nodes")]
    InlineExpressionMismatch { table: String, algorithm: String },
}

/// Query-time errors. Scoped to one statement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Sharding value of column '{column}' must not be null")]
    NullShardingValue { column: String },

    #[error("Complex sharding expects {expected} sharding columns, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("Range query is not supported by inline sharding; set '{property}' to true to route it to all targets")]
    UnsupportedRangeQuery { property: String },

    #[error("Inline expression '{expression}' does not match sharding column '{column}'")]
    ExpressionColumnMismatch { expression: String, column: String },

    #[error("Failed to evaluate inline expression '{expression}': {reason}")]
    ExpressionEvaluation { expression: String, reason: String },

    #[error("Unknown sharding table: {table}")]
    UnknownShardingTable { table: String },

    #[error("Table '{table}' exists in more than one data source: {data_sources:?}")]
    DuplicateTable {
        table: String,
        data_sources: Vec<String>,
    },

    #[error("No actual table for '{logic_table}' in data source '{data_source}'")]
    ActualTableNotFound {
        data_source: String,
        logic_table: String,
    },
}

/// Errors reported by an expression evaluator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("No binding for '{name}'")]
    UnresolvedBinding { name: String },

    #[error("Syntax error in '{expression}': {reason}")]
    Syntax { expression: String, reason: String },

    #[error("Evaluation of '{expression}' failed: {reason}")]
    Evaluation { expression: String, reason: String },
}

// ── ShardingError classification ────────────────────────────────────────────

impl ShardingError {
    /// Classify this error by the phase that raised it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShardingError::Config(_) => ErrorKind::Configuration,
            ShardingError::Query(_) => ErrorKind::Query,
            // Expressions are parsed at rule load; a raw evaluator error that
            // escapes to the top level is a configuration problem.
            ShardingError::Expression(_) => ErrorKind::Configuration,
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration)
    }

    pub fn is_query_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Query)
    }
}

impl ExpressionError {
    /// Wrap into a configuration error for the given expression text.
    pub fn into_config_error(self, expression: &str) -> ConfigError {
        ConfigError::InvalidExpression {
            expression: expression.to_string(),
            reason: self.to_string(),
        }
    }
}
