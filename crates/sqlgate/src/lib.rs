#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod models;
pub mod policy;
pub mod resolver;
pub mod sql;
pub mod utils;

pub use cli::app::{Cli, Command};
pub use engine::{QueryOutput, ReadOnlyEngine, Row, parse_params};
pub use error::{ErrorKind, GatewayError, ValidationError};
pub use gateway::{Gateway, PreparedQuery};
pub use policy::{Policy, ValidationVerdict, validate};
pub use resolver::{
    CacheStats, Clock, MappingSource, ProjectMapping, ProjectResolver, SqliteMappingSource,
    SystemClock,
};
