//! Execution Contexts
//!
//! [`ExecutionContext`] is the read-only snapshot handed to operator
//! callbacks. [`BuildContext`] is the caller's opaque handle, passed through
//! to the storage adapter untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::block::{BlockData, Position};
use crate::header::TemplateHeader;
use crate::templates::{BlockMap, Template};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    CreateData,
    TransformData,
    TransformPosition,
    TransformHeader,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::CreateData => "create-data",
            Phase::TransformData => "transform-data",
            Phase::TransformPosition => "transform-position",
            Phase::TransformHeader => "transform-header",
        })
    }
}

/// Snapshot of the in-progress template at the start of a phase.
///
/// Mutations made by the running phase are not visible through it.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    phase: Phase,
    base: Template,
    blocks: Arc<BlockMap>,
    header: Arc<TemplateHeader>,
}

impl ExecutionContext {
    pub(crate) fn new(
        phase: Phase,
        base: Template,
        blocks: Arc<BlockMap>,
        header: Arc<TemplateHeader>,
    ) -> Self {
        Self {
            phase,
            base,
            blocks,
            header,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The template the transaction started from.
    pub fn base(&self) -> &Template {
        &self.base
    }

    pub fn blocks(&self) -> &BlockMap {
        &self.blocks
    }

    pub fn header(&self) -> &TemplateHeader {
        &self.header
    }

    pub fn get(&self, pos: &Position) -> Option<&BlockData> {
        self.blocks.get(pos)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Caller-provided handle for a build. The engine never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildContext {
    pub id: Uuid,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub requested_by: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            requested_at: Utc::now(),
            requested_by: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn requested_by(mut self, who: impl Into<String>) -> Self {
        self.requested_by = Some(who.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new()
    }
}
