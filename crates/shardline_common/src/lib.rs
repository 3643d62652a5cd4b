pub mod config;
pub mod error;
pub mod value;

pub use error::{ConfigError, ErrorKind, ExpressionError, QueryError, ShardingError, ShardingResult};
pub use value::ShardingValue;
