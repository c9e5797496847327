//! TemplateTx Core - Voxel Template Transactions
//!
//! # Transaction Rules
//! 1. Templates Are Immutable
//! 2. Phases Run In Fixed Order: create, data, position, header
//! 3. Submission Order Is Preserved Within A Phase
//! 4. `None` Drops, `Err` Aborts
//! 5. A Transaction Executes Once

pub mod block;
pub mod context;
pub mod hashing;
pub mod header;
pub mod operator;
pub mod operators;
pub mod ordering;
pub mod storage;
pub mod templates;
pub mod transaction;

pub use block::{BlockData, BlockKind, Payload, Position};
pub use context::{BuildContext, ExecutionContext, Phase};
pub use hashing::template_digest;
pub use header::{MaterialList, Region, TemplateHeader};
pub use operator::{Characteristic, Characteristics, Operator, OperatorError, OperatorResult};
pub use ordering::OperatorOrdering;
pub use storage::{MapStorage, TemplateStorage};
pub use templates::{BlockMap, Template, TemplateDocument, TemplateError};
pub use transaction::{begin, Transaction, TransactionConfig, TransactionError, TransactionState};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
