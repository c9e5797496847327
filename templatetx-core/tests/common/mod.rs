//! Shared fixtures: recording operators and template builders.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use templatetx_core::{
    BlockData, Characteristic, Characteristics, ExecutionContext, Operator, OperatorError,
    OperatorResult, Position, Template, TemplateHeader,
};

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::default()
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn record(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

pub fn pos(x: i32, y: i32, z: i32) -> Position {
    Position::new(x, y, z)
}

pub fn block(kind: &str) -> BlockData {
    BlockData::new(kind)
}

pub fn template(entries: &[((i32, i32, i32), &str)]) -> Template {
    Template::new(
        TemplateHeader::new("fixture"),
        entries
            .iter()
            .map(|(p, kind)| (Position::from(*p), block(kind)))
            .collect(),
    )
}

/// Creator yielding fixed entries. A `None` data entry makes
/// `create_data_for_pos` return no data for that position.
pub struct Creator {
    label: String,
    positions: VecDeque<Position>,
    data: VecDeque<Option<BlockData>>,
    log: Log,
}

impl Creator {
    pub fn new(label: &str, entries: Vec<(Position, BlockData)>, log: &Log) -> Self {
        let (positions, data): (Vec<_>, Vec<_>) =
            entries.into_iter().map(|(p, d)| (p, Some(d))).unzip();
        Self {
            label: label.to_string(),
            positions: positions.into(),
            data: data.into(),
            log: Arc::clone(log),
        }
    }

    pub fn without_data(label: &str, positions: Vec<Position>, log: &Log) -> Self {
        let data = positions.iter().map(|_| None).collect();
        Self {
            label: label.to_string(),
            positions: positions.into(),
            data,
            log: Arc::clone(log),
        }
    }
}

impl Operator for Creator {
    fn characteristics(&self) -> Characteristics {
        Characteristic::CreateData.into()
    }

    fn name(&self) -> &str {
        &self.label
    }

    fn create_pos(&mut self, _ctx: &ExecutionContext) -> OperatorResult<Option<Position>> {
        let next = self.positions.pop_front();
        match next {
            Some(p) => record(&self.log, format!("{}:pos:{}", self.label, p)),
            None => record(&self.log, format!("{}:exhausted", self.label)),
        }
        Ok(next)
    }

    fn create_data_for_pos(
        &mut self,
        _ctx: &ExecutionContext,
        pos: &Position,
    ) -> OperatorResult<Option<BlockData>> {
        record(&self.log, format!("{}:data:{}", self.label, pos));
        Ok(self.data.pop_front().flatten())
    }
}

/// Participates in every phase as an identity transform and records the
/// phase of the context each callback receives.
pub struct Tracer {
    label: String,
    characteristics: Characteristics,
    log: Log,
}

impl Tracer {
    pub fn new(label: &str, characteristics: Characteristics, log: &Log) -> Self {
        Self {
            label: label.to_string(),
            characteristics,
            log: Arc::clone(log),
        }
    }

    pub fn all(label: &str, log: &Log) -> Self {
        Self::new(label, Characteristic::ALL.into_iter().collect(), log)
    }
}

impl Operator for Tracer {
    fn characteristics(&self) -> Characteristics {
        self.characteristics
    }

    fn name(&self) -> &str {
        &self.label
    }

    fn create_pos(&mut self, ctx: &ExecutionContext) -> OperatorResult<Option<Position>> {
        record(&self.log, format!("{}:{}", self.label, ctx.phase()));
        Ok(None)
    }

    fn transform_data(
        &mut self,
        ctx: &ExecutionContext,
        data: BlockData,
    ) -> OperatorResult<Option<BlockData>> {
        record(&self.log, format!("{}:{}", self.label, ctx.phase()));
        Ok(Some(data))
    }

    fn transform_pos(
        &mut self,
        ctx: &ExecutionContext,
        pos: Position,
        _data: &BlockData,
    ) -> OperatorResult<Option<Position>> {
        record(&self.log, format!("{}:{}", self.label, ctx.phase()));
        Ok(Some(pos))
    }

    fn transform_header(
        &mut self,
        ctx: &ExecutionContext,
        header: TemplateHeader,
    ) -> OperatorResult<Option<TemplateHeader>> {
        record(&self.log, format!("{}:{}", self.label, ctx.phase()));
        Ok(Some(header))
    }
}

/// Where a [`FailingCreator`] returns its error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    FirstPosition,
    Data,
}

/// Creator that yields `(0, 0, 0)` once and fails at `fail_at`.
pub struct FailingCreator {
    label: String,
    fail_at: FailAt,
    yielded: bool,
}

impl FailingCreator {
    pub fn new(label: &str, fail_at: FailAt) -> Self {
        Self {
            label: label.to_string(),
            fail_at,
            yielded: false,
        }
    }
}

impl Operator for FailingCreator {
    fn characteristics(&self) -> Characteristics {
        Characteristic::CreateData.into()
    }

    fn name(&self) -> &str {
        &self.label
    }

    fn create_pos(&mut self, _ctx: &ExecutionContext) -> OperatorResult<Option<Position>> {
        if self.fail_at == FailAt::FirstPosition {
            return Err(OperatorError::msg("no positions available"));
        }
        if self.yielded {
            return Ok(None);
        }
        self.yielded = true;
        Ok(Some(Position::ORIGIN))
    }

    fn create_data_for_pos(
        &mut self,
        _ctx: &ExecutionContext,
        _pos: &Position,
    ) -> OperatorResult<Option<BlockData>> {
        Err(OperatorError::msg("palette missing"))
    }
}
