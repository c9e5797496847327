//! Template System - Immutable Voxel Payloads
//!
//! A template is a `Position -> BlockData` mapping plus a header. Both live
//! behind `Arc`, so cloning a template (or snapshotting it for an operator)
//! never copies entries.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::{BlockData, Position};
use crate::header::TemplateHeader;

pub type BlockMap = HashMap<Position, BlockData>;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Duplicate position in template document: {0}")]
    DuplicatePosition(Position),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    blocks: Arc<BlockMap>,
    header: Arc<TemplateHeader>,
}

impl Template {
    pub fn new(header: TemplateHeader, blocks: BlockMap) -> Self {
        Self::from_shared(Arc::new(header), Arc::new(blocks))
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(TemplateHeader::new(name), BlockMap::new())
    }

    /// Builds a template whose header bounds/requirements match the entries.
    pub fn from_blocks<I>(name: impl Into<String>, blocks: I) -> Self
    where
        I: IntoIterator<Item = (Position, BlockData)>,
    {
        let blocks: BlockMap = blocks.into_iter().collect();
        let header = TemplateHeader::new(name).derive(&blocks);
        Self::new(header, blocks)
    }

    pub(crate) fn from_shared(header: Arc<TemplateHeader>, blocks: Arc<BlockMap>) -> Self {
        Self { blocks, header }
    }

    pub fn header(&self) -> &TemplateHeader {
        &self.header
    }

    pub fn blocks(&self) -> &BlockMap {
        &self.blocks
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

    /// True when both templates share the same underlying storage.
    pub fn shares_storage(&self, other: &Template) -> bool {
        Arc::ptr_eq(&self.blocks, &other.blocks) && Arc::ptr_eq(&self.header, &other.header)
    }

    pub(crate) fn shared_blocks(&self) -> Arc<BlockMap> {
        Arc::clone(&self.blocks)
    }

    pub(crate) fn shared_header(&self) -> Arc<TemplateHeader> {
        Arc::clone(&self.header)
    }

    /// Entries sorted by position.
    pub fn sorted_entries(&self) -> Vec<(&Position, &BlockData)> {
        let mut entries: Vec<_> = self.blocks.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn to_document(&self) -> TemplateDocument {
        TemplateDocument {
            header: (*self.header).clone(),
            blocks: self
                .sorted_entries()
                .into_iter()
                .map(|(pos, data)| BlockEntry {
                    pos: *pos,
                    data: data.clone(),
                })
                .collect(),
        }
    }

    pub fn from_document(document: TemplateDocument) -> Result<Self, TemplateError> {
        let mut blocks = BlockMap::with_capacity(document.blocks.len());
        for entry in document.blocks {
            if blocks.insert(entry.pos, entry.data).is_some() {
                return Err(TemplateError::DuplicatePosition(entry.pos));
            }
        }
        Ok(Self::new(document.header, blocks))
    }

    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        let document: TemplateDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    pub fn to_json(&self) -> Result<String, TemplateError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }
}

/// Interchange shape of a template. Entries are a list because JSON maps
/// cannot carry structured keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub header: TemplateHeader,
    #[serde(default)]
    pub blocks: Vec<BlockEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockEntry {
    pub pos: Position,
    pub data: BlockData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_blocks_derives_header() {
        let template = Template::from_blocks(
            "pillar",
            (0..3).map(|y| (Position::new(0, y, 0), BlockData::new("stone"))),
        );
        assert_eq!(template.len(), 3);
        assert_eq!(template.header().bounds.unwrap().size(), [1, 3, 1]);
        assert_eq!(template.header().requirements.total(), 3);
    }

    #[test]
    fn test_clone_shares_storage() {
        let template = Template::empty("x");
        let copy = template.clone();
        assert!(copy.shares_storage(&template));
        assert!(!Template::empty("x").shares_storage(&template));
    }

    #[test]
    fn test_document_roundtrip_preserves_entries() {
        let template = Template::from_blocks(
            "floor",
            vec![
                (Position::new(1, 0, 0), BlockData::new("oak")),
                (Position::new(0, 0, 0), BlockData::new("birch")),
            ],
        );
        let json = template.to_json().unwrap();
        let back = Template::from_json(&json).unwrap();
        assert_eq!(back, template);
    }

    #[test]
    fn test_document_entries_sorted() {
        let template = Template::from_blocks(
            "floor",
            vec![
                (Position::new(2, 0, 0), BlockData::new("a")),
                (Position::new(0, 0, 0), BlockData::new("b")),
            ],
        );
        let doc = template.to_document();
        assert_eq!(doc.blocks[0].pos, Position::new(0, 0, 0));
        assert_eq!(doc.blocks[1].pos, Position::new(2, 0, 0));
    }

    #[test]
    fn test_duplicate_position_rejected() {
        let json = r#"{
            "header": {"name": "dup"},
            "blocks": [
                {"pos": {"x": 0, "y": 0, "z": 0}, "data": {"kind": "a"}},
                {"pos": {"x": 0, "y": 0, "z": 0}, "data": {"kind": "b"}}
            ]
        }"#;
        let err = Template::from_json(json).unwrap_err();
        assert!(matches!(err, TemplateError::DuplicatePosition(p) if p == Position::ORIGIN));
    }
}
