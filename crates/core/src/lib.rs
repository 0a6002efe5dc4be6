pub mod config;
pub mod domain;
pub mod errors;
pub mod statement;

pub use domain::catalog::{ColumnSpec, CATALOG_COLUMNS, CATEGORIES, SEARCHABLE_COLUMNS};
pub use domain::message::{ConversationHistory, Message, Role};
pub use domain::recommendation::{Recommendation, RecommendationError, ReplyShape};
pub use domain::result::{QueryOutcome, QueryResult, ResultSource, Row, StageContext};
pub use errors::InterfaceError;
pub use statement::{is_executable, GuardViolation, StatementGuard};
