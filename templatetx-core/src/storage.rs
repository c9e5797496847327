//! Storage Adapters
//!
//! The transaction driver never touches a template representation directly.
//! It reads and writes the in-progress state through a [`TemplateStorage`]
//! and asks it to build the final template.

use std::sync::Arc;

use crate::context::BuildContext;
use crate::header::TemplateHeader;
use crate::templates::{BlockMap, Template};

pub trait TemplateStorage {
    /// Template the storage was opened on. Operators see it as the context base.
    fn base(&self) -> &Template;

    /// Current mapping. Returned as a shared snapshot; later writes replace it.
    fn blocks(&self) -> Arc<BlockMap>;

    fn header(&self) -> Arc<TemplateHeader>;

    fn store_blocks(&mut self, blocks: BlockMap);

    fn store_header(&mut self, header: TemplateHeader);

    /// Created entries override existing ones at the same position.
    fn merge(&mut self, created: BlockMap) {
        if created.is_empty() {
            return;
        }
        let mut merged = (*self.blocks()).clone();
        merged.extend(created);
        self.store_blocks(merged);
    }

    /// Builds the emitted template. `changed` is false when no operator ran.
    fn finalize(self, changed: bool, context: Option<&BuildContext>) -> Template
    where
        Self: Sized;
}

/// In-memory adapter over a base [`Template`].
#[derive(Debug, Clone)]
pub struct MapStorage {
    base: Template,
    blocks: Arc<BlockMap>,
    header: Arc<TemplateHeader>,
}

impl MapStorage {
    pub fn new(base: &Template) -> Self {
        Self {
            base: base.clone(),
            blocks: base.shared_blocks(),
            header: base.shared_header(),
        }
    }
}

impl TemplateStorage for MapStorage {
    fn base(&self) -> &Template {
        &self.base
    }

    fn blocks(&self) -> Arc<BlockMap> {
        Arc::clone(&self.blocks)
    }

    fn header(&self) -> Arc<TemplateHeader> {
        Arc::clone(&self.header)
    }

    fn store_blocks(&mut self, blocks: BlockMap) {
        self.blocks = Arc::new(blocks);
    }

    fn store_header(&mut self, header: TemplateHeader) {
        self.header = Arc::new(header);
    }

    fn finalize(self, changed: bool, _context: Option<&BuildContext>) -> Template {
        if !changed {
            return self.base;
        }
        Template::from_shared(self.header, self.blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockData, Position};

    fn base() -> Template {
        Template::from_blocks(
            "base",
            vec![
                (Position::new(0, 0, 0), BlockData::new("a")),
                (Position::new(1, 0, 0), BlockData::new("b")),
            ],
        )
    }

    #[test]
    fn test_merge_overrides_and_keeps_rest() {
        let base = base();
        let mut storage = MapStorage::new(&base);

        let mut created = BlockMap::new();
        created.insert(Position::new(0, 0, 0), BlockData::new("c"));
        created.insert(Position::new(5, 0, 0), BlockData::new("d"));
        storage.merge(created);

        let blocks = storage.blocks();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[&Position::new(0, 0, 0)], BlockData::new("c"));
        assert_eq!(blocks[&Position::new(1, 0, 0)], BlockData::new("b"));
        // base untouched
        assert_eq!(base.get(&Position::new(0, 0, 0)), Some(&BlockData::new("a")));
    }

    #[test]
    fn test_unchanged_finalize_returns_base() {
        let base = base();
        let storage = MapStorage::new(&base);
        let out = storage.finalize(false, None);
        assert!(out.shares_storage(&base));
    }

    #[test]
    fn test_changed_finalize_uses_stored_state() {
        let base = base();
        let mut storage = MapStorage::new(&base);
        storage.store_header(TemplateHeader::new("renamed"));
        let out = storage.finalize(true, None);
        assert_eq!(out.header().name, "renamed");
        assert_eq!(out.blocks(), base.blocks());
    }
}
