//! Template Transactions - Single Execution Entry Point
//!
//! A transaction applies its operators in four fixed phases:
//! create-data, transform-data, transform-position, transform-header.
//! It executes at most once. Any operator failure aborts it and no
//! template is emitted.
//!
//! Iteration order over entries in the transform phases is the snapshot's
//! hash order: stable within one execution, unspecified across executions.
//! When position transformers map two entries to one position, the entry
//! processed last wins.

use thiserror::Error;
use tracing::{debug, debug_span, trace, warn};

use crate::block::{BlockData, Position};
use crate::context::{BuildContext, ExecutionContext, Phase};
use crate::operator::{Operator, OperatorError};
use crate::ordering::OperatorOrdering;
use crate::storage::{MapStorage, TemplateStorage};
use crate::templates::{BlockMap, Template};

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Failed to execute transaction operator {operator} during {phase}: {source}")]
    OperatorFailed {
        operator: String,
        phase: Phase,
        #[source]
        source: OperatorError,
    },

    #[error("Operator {operator} violated its contract during {phase}: {message}")]
    ContractViolation {
        operator: String,
        phase: Phase,
        message: String,
    },

    #[error("Cannot execute TemplateTransaction twice")]
    DoubleExecute,

    #[error("Cannot add operators to a transaction that has already executed")]
    Closed,

    #[error("Invalid operator ordering: {0}")]
    InvalidOrdering(String),

    #[error("Operator {operator} exceeded the limit of {limit} created positions")]
    PositionLimitExceeded { operator: String, limit: usize },
}

impl TransactionError {
    /// Name of the operator the failure is attributed to, if any.
    pub fn operator(&self) -> Option<&str> {
        match self {
            TransactionError::OperatorFailed { operator, .. }
            | TransactionError::ContractViolation { operator, .. }
            | TransactionError::PositionLimitExceeded { operator, .. } => Some(operator),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransactionConfig {
    /// Maximum positions a single creator may yield. `None` means unbounded.
    pub position_limit: Option<usize>,
    /// Return the base template itself when no operator is bucketed.
    pub skip_unchanged: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            position_limit: None,
            skip_unchanged: true,
        }
    }
}

impl TransactionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position_limit(mut self, limit: usize) -> Self {
        self.position_limit = Some(limit);
        self
    }

    pub fn with_skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Ready,
    Running,
    Done,
    Failed,
}

/// Start a transaction over `base` using in-memory storage.
pub fn begin(base: &Template) -> Transaction<MapStorage> {
    Transaction::new(base)
}

pub struct Transaction<S: TemplateStorage = MapStorage> {
    base: Template,
    storage: Option<S>,
    operators: Vec<Box<dyn Operator>>,
    config: TransactionConfig,
    state: TransactionState,
}

impl Transaction<MapStorage> {
    pub fn new(base: &Template) -> Self {
        Self::with_storage(MapStorage::new(base))
    }
}

impl<S: TemplateStorage> Transaction<S> {
    /// Transaction over whatever template `storage` was opened on.
    pub fn with_storage(storage: S) -> Self {
        Self {
            base: storage.base().clone(),
            storage: Some(storage),
            operators: Vec::new(),
            config: TransactionConfig::default(),
            state: TransactionState::Ready,
        }
    }

    pub fn with_config(mut self, config: TransactionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn base(&self) -> &Template {
        &self.base
    }

    /// Number of submitted operators.
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Append an operator. Rejected once the transaction has executed.
    pub fn operate<O>(&mut self, operator: O) -> Result<&mut Self, TransactionError>
    where
        O: Operator + 'static,
    {
        self.operate_boxed(Box::new(operator))
    }

    pub fn operate_boxed(
        &mut self,
        operator: Box<dyn Operator>,
    ) -> Result<&mut Self, TransactionError> {
        if self.state != TransactionState::Ready {
            return Err(TransactionError::Closed);
        }
        self.operators.push(operator);
        Ok(self)
    }

    /// Run every phase and emit the resulting template.
    ///
    /// The transaction is spent as soon as this is entered; a second call
    /// fails with [`TransactionError::DoubleExecute`] without running anything.
    pub fn execute(
        &mut self,
        context: Option<&BuildContext>,
    ) -> Result<Template, TransactionError> {
        if self.state != TransactionState::Ready {
            return Err(TransactionError::DoubleExecute);
        }
        self.state = TransactionState::Running;

        let result = self.run(context);
        self.state = match result {
            Ok(_) => TransactionState::Done,
            Err(_) => TransactionState::Failed,
        };
        result
    }

    fn run(&mut self, context: Option<&BuildContext>) -> Result<Template, TransactionError> {
        let mut storage = self.storage.take().ok_or(TransactionError::DoubleExecute)?;
        let mut operators = std::mem::take(&mut self.operators);

        let span = debug_span!(
            "template_transaction",
            operators = operators.len(),
            build = ?context.map(|c| c.id)
        );
        let _guard = span.enter();

        let ordering = OperatorOrdering::new(&operators);

        let ctx = snapshot(Phase::CreateData, &self.base, &storage);
        let created = create_data(&ctx, &ordering, &mut operators, self.config.position_limit)?;
        debug!(created = created.len(), "merging created entries");
        storage.merge(created);

        transform_data(&self.base, &mut storage, &ordering, &mut operators)?;
        transform_positions(&self.base, &mut storage, &ordering, &mut operators)?;
        transform_header(&self.base, &mut storage, &ordering, &mut operators)?;

        let changed = !ordering.is_empty() || !self.config.skip_unchanged;
        debug!(changed, "finalizing template");
        Ok(storage.finalize(changed, context))
    }
}

/// Outcome of one entry's trip through a transformer chain. `None` drops it.
type ChainResult<T> = Result<Option<T>, TransactionError>;

fn snapshot<S: TemplateStorage>(phase: Phase, base: &Template, storage: &S) -> ExecutionContext {
    ExecutionContext::new(phase, base.clone(), storage.blocks(), storage.header())
}

fn operator_failed(
    operator: &dyn Operator,
    phase: Phase,
    source: OperatorError,
) -> TransactionError {
    warn!(operator = operator.name(), %phase, error = %source, "transaction operator failed");
    TransactionError::OperatorFailed {
        operator: operator.name().to_string(),
        phase,
        source,
    }
}

fn contract_violation(operator: &dyn Operator, phase: Phase, message: &str) -> TransactionError {
    warn!(
        operator = operator.name(),
        %phase,
        detail = message,
        "transaction operator violated its contract"
    );
    TransactionError::ContractViolation {
        operator: operator.name().to_string(),
        phase,
        message: message.to_string(),
    }
}

fn create_data(
    ctx: &ExecutionContext,
    ordering: &OperatorOrdering,
    operators: &mut [Box<dyn Operator>],
    position_limit: Option<usize>,
) -> Result<BlockMap, TransactionError> {
    let mut created = BlockMap::new();

    for &index in ordering.data_creators() {
        let operator = &mut operators[index];

        let mut positions: Vec<Position> = Vec::new();
        while let Some(pos) = operator
            .create_pos(ctx)
            .map_err(|e| operator_failed(&**operator, Phase::CreateData, e))?
        {
            if let Some(limit) = position_limit {
                if positions.len() >= limit {
                    warn!(operator = operator.name(), limit, "creator exceeded position limit");
                    return Err(TransactionError::PositionLimitExceeded {
                        operator: operator.name().to_string(),
                        limit,
                    });
                }
            }
            positions.push(pos);
        }

        trace!(operator = operator.name(), positions = positions.len(), "creator exhausted");

        for pos in positions {
            let data = operator
                .create_data_for_pos(ctx, &pos)
                .map_err(|e| operator_failed(&**operator, Phase::CreateData, e))?
                .ok_or_else(|| {
                    contract_violation(
                        &**operator,
                        Phase::CreateData,
                        &format!("returned no data for position {pos} which it created itself"),
                    )
                })?;
            created.insert(pos, data);
        }
    }

    debug!(
        creators = ordering.data_creators().len(),
        created = created.len(),
        "data creation finished"
    );
    Ok(created)
}

fn transform_data<S: TemplateStorage>(
    base: &Template,
    storage: &mut S,
    ordering: &OperatorOrdering,
    operators: &mut [Box<dyn Operator>],
) -> Result<(), TransactionError> {
    if ordering.data_transformers().is_empty() {
        trace!("no data transformers, skipping phase");
        return Ok(());
    }
    let ctx = snapshot(Phase::TransformData, base, storage);

    let mut chain = |data: BlockData| -> ChainResult<BlockData> {
        let mut current = data;
        for &index in ordering.data_transformers() {
            let operator = &mut operators[index];
            match operator
                .transform_data(&ctx, current)
                .map_err(|e| operator_failed(&**operator, Phase::TransformData, e))?
            {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    };

    let mut transformed = BlockMap::with_capacity(ctx.len());
    let mut dropped = 0usize;
    for (pos, data) in ctx.blocks() {
        match chain(data.clone())? {
            Some(data) => {
                transformed.insert(*pos, data);
            }
            None => dropped += 1,
        }
    }

    debug!(
        transformers = ordering.data_transformers().len(),
        kept = transformed.len(),
        dropped,
        "data transformation finished"
    );
    storage.store_blocks(transformed);
    Ok(())
}

fn transform_positions<S: TemplateStorage>(
    base: &Template,
    storage: &mut S,
    ordering: &OperatorOrdering,
    operators: &mut [Box<dyn Operator>],
) -> Result<(), TransactionError> {
    if ordering.position_transformers().is_empty() {
        trace!("no position transformers, skipping phase");
        return Ok(());
    }
    let ctx = snapshot(Phase::TransformPosition, base, storage);

    let mut chain = |pos: Position, data: &BlockData| -> ChainResult<Position> {
        let mut current = pos;
        for &index in ordering.position_transformers() {
            let operator = &mut operators[index];
            match operator
                .transform_pos(&ctx, current, data)
                .map_err(|e| operator_failed(&**operator, Phase::TransformPosition, e))?
            {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    };

    let mut transformed = BlockMap::with_capacity(ctx.len());
    let mut dropped = 0usize;
    let mut collisions = 0usize;
    for (pos, data) in ctx.blocks() {
        match chain(*pos, data)? {
            Some(target) => {
                if transformed.insert(target, data.clone()).is_some() {
                    collisions += 1;
                }
            }
            None => dropped += 1,
        }
    }

    if collisions > 0 {
        debug!(collisions, "position transformers produced colliding entries, last one kept");
    }
    debug!(
        transformers = ordering.position_transformers().len(),
        kept = transformed.len(),
        dropped,
        "position transformation finished"
    );
    storage.store_blocks(transformed);
    Ok(())
}

fn transform_header<S: TemplateStorage>(
    base: &Template,
    storage: &mut S,
    ordering: &OperatorOrdering,
    operators: &mut [Box<dyn Operator>],
) -> Result<(), TransactionError> {
    let ctx = snapshot(Phase::TransformHeader, base, storage);

    let mut header = ctx.header().clone();
    for &index in ordering.header_transformers() {
        let operator = &mut operators[index];
        header = operator
            .transform_header(&ctx, header)
            .map_err(|e| operator_failed(&**operator, Phase::TransformHeader, e))?
            .ok_or_else(|| {
                contract_violation(
                    &**operator,
                    Phase::TransformHeader,
                    "returned no TemplateHeader",
                )
            })?;
    }

    debug!(
        transformers = ordering.header_transformers().len(),
        "header transformation finished"
    );
    storage.store_header(header);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{Characteristic, Characteristics, OperatorResult};

    struct Creates(Vec<Position>);

    impl Operator for Creates {
        fn characteristics(&self) -> Characteristics {
            Characteristic::CreateData.into()
        }

        fn create_pos(&mut self, _ctx: &ExecutionContext) -> OperatorResult<Option<Position>> {
            Ok(self.0.pop())
        }

        fn create_data_for_pos(
            &mut self,
            _ctx: &ExecutionContext,
            _pos: &Position,
        ) -> OperatorResult<Option<BlockData>> {
            Ok(Some(BlockData::new("stone")))
        }
    }

    struct Endless;

    impl Operator for Endless {
        fn characteristics(&self) -> Characteristics {
            Characteristic::CreateData.into()
        }

        fn create_pos(&mut self, _ctx: &ExecutionContext) -> OperatorResult<Option<Position>> {
            Ok(Some(Position::ORIGIN))
        }
    }

    #[test]
    fn test_state_transitions() {
        let base = Template::empty("base");
        let mut tx = begin(&base);
        assert_eq!(tx.state(), TransactionState::Ready);
        tx.operate(Creates(vec![Position::ORIGIN])).unwrap();
        assert_eq!(tx.len(), 1);

        tx.execute(None).unwrap();
        assert_eq!(tx.state(), TransactionState::Done);
        assert!(matches!(tx.execute(None), Err(TransactionError::DoubleExecute)));
        assert_eq!(tx.state(), TransactionState::Done);
    }

    #[test]
    fn test_operate_after_execute_rejected() {
        let base = Template::empty("base");
        let mut tx = begin(&base);
        tx.execute(None).unwrap();
        let err = tx.operate(Creates(vec![])).err().unwrap();
        assert!(matches!(err, TransactionError::Closed));
    }

    #[test]
    fn test_position_limit_stops_endless_creator() {
        let base = Template::empty("base");
        let mut tx = begin(&base).with_config(TransactionConfig::new().with_position_limit(16));
        tx.operate(Endless).unwrap();

        let err = tx.execute(None).unwrap_err();
        assert!(matches!(err, TransactionError::PositionLimitExceeded { limit: 16, .. }));
        assert!(err.operator().unwrap().ends_with("Endless"));
        assert_eq!(tx.state(), TransactionState::Failed);
    }

    #[test]
    fn test_limit_allows_exactly_limit_positions() {
        let base = Template::empty("base");
        let positions = (0..4).map(|x| Position::new(x, 0, 0)).collect();
        let mut tx = begin(&base).with_config(TransactionConfig::new().with_position_limit(4));
        tx.operate(Creates(positions)).unwrap();
        assert_eq!(tx.execute(None).unwrap().len(), 4);
    }

    #[test]
    fn test_with_storage_takes_base_from_storage() {
        let base = Template::from_blocks("stored", vec![(Position::ORIGIN, BlockData::new("a"))]);
        let mut tx = Transaction::with_storage(MapStorage::new(&base));
        assert_eq!(tx.base(), &base);

        let out = tx.execute(None).unwrap();
        assert!(out.shares_storage(&base));
    }

    #[test]
    fn test_skip_unchanged_disabled_builds_new_template() {
        let base = Template::empty("base");
        let mut tx = begin(&base).with_config(TransactionConfig::new().with_skip_unchanged(false));
        let out = tx.execute(None).unwrap();
        assert_eq!(out, base);
        assert!(!out.shares_storage(&base));
    }
}
