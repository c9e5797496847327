//! Template Header - Metadata Record
//!
//! Name, author, bounding region and material requirements. Headers are
//! replaced wholesale by header transformers, never edited in place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::block::{BlockData, BlockKind, Position};

/// Inclusive axis-aligned box of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub min: Position,
    pub max: Position,
}

impl Region {
    /// Corners may be given in any order.
    pub fn new(a: Position, b: Position) -> Self {
        Self {
            min: a.component_min(b),
            max: a.component_max(b),
        }
    }

    pub fn single(pos: Position) -> Self {
        Self { min: pos, max: pos }
    }

    /// Smallest region containing every position, `None` when empty.
    pub fn enclosing<'a, I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Position>,
    {
        positions.into_iter().fold(None, |acc: Option<Region>, pos| {
            Some(match acc {
                Some(region) => region.include(*pos),
                None => Region::single(*pos),
            })
        })
    }

    pub fn include(self, pos: Position) -> Self {
        Self {
            min: self.min.component_min(pos),
            max: self.max.component_max(pos),
        }
    }

    pub fn contains(&self, pos: &Position) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// Extent along each axis, in blocks.
    pub fn size(&self) -> [u64; 3] {
        [
            u64::from(self.max.x.abs_diff(self.min.x)) + 1,
            u64::from(self.max.y.abs_diff(self.min.y)) + 1,
            u64::from(self.max.z.abs_diff(self.min.z)) + 1,
        ]
    }

    /// Number of positions inside. Exact for any region, up to 2^96 blocks.
    pub fn volume(&self) -> u128 {
        self.size().iter().map(|s| u128::from(*s)).product()
    }
}

/// Required block counts per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialList {
    counts: BTreeMap<BlockKind, u64>,
}

impl MaterialList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks<'a, I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = &'a BlockData>,
    {
        let mut list = Self::new();
        for data in blocks {
            list.add(data.kind.clone(), 1);
        }
        list
    }

    pub fn add(&mut self, kind: BlockKind, count: u64) {
        *self.counts.entry(kind).or_insert(0) += count;
    }

    pub fn count(&self, kind: &BlockKind) -> u64 {
        self.counts.get(kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlockKind, u64)> {
        self.counts.iter().map(|(kind, count)| (kind, *count))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateHeader {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Region>,
    #[serde(default)]
    pub requirements: MaterialList,
}

impl TemplateHeader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_bounds(mut self, bounds: Option<Region>) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_requirements(mut self, requirements: MaterialList) -> Self {
        self.requirements = requirements;
        self
    }

    /// Copy of this header with bounds and requirements recomputed from `blocks`.
    pub fn derive<'a, I>(&self, blocks: I) -> Self
    where
        I: IntoIterator<Item = (&'a Position, &'a BlockData)> + Clone,
    {
        Self {
            name: self.name.clone(),
            author: self.author.clone(),
            bounds: Region::enclosing(blocks.clone().into_iter().map(|(pos, _)| pos)),
            requirements: MaterialList::from_blocks(blocks.into_iter().map(|(_, data)| data)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_region_normalizes_corners() {
        let region = Region::new(Position::new(3, -1, 2), Position::new(0, 4, 2));
        assert_eq!(region.min, Position::new(0, -1, 2));
        assert_eq!(region.max, Position::new(3, 4, 2));
        assert_eq!(region.size(), [4, 6, 1]);
        assert_eq!(region.volume(), 24);
    }

    #[test]
    fn test_size_spans_whole_i32_range() {
        let line = Region::new(Position::new(i32::MIN, 0, 0), Position::new(i32::MAX, 0, 0));
        assert_eq!(line.size(), [1 << 32, 1, 1]);
        assert_eq!(line.volume(), 1 << 32);

        let everything = Region::new(
            Position::new(i32::MIN, i32::MIN, i32::MIN),
            Position::new(i32::MAX, i32::MAX, i32::MAX),
        );
        assert_eq!(everything.volume(), 1u128 << 96);
    }

    #[test]
    fn test_enclosing_empty_is_none() {
        let none: Vec<Position> = vec![];
        assert_eq!(Region::enclosing(&none), None);
    }

    #[test]
    fn test_enclosing_covers_all() {
        let positions = vec![Position::new(1, 1, 1), Position::new(-2, 0, 5)];
        let region = Region::enclosing(&positions).unwrap();
        assert!(positions.iter().all(|p| region.contains(p)));
        assert!(!region.contains(&Position::new(2, 0, 0)));
    }

    #[test]
    fn test_derive_counts_materials() {
        let mut blocks = HashMap::new();
        blocks.insert(Position::new(0, 0, 0), BlockData::new("stone"));
        blocks.insert(Position::new(1, 0, 0), BlockData::new("stone"));
        blocks.insert(Position::new(0, 2, 0), BlockData::new("glass"));

        let header = TemplateHeader::new("house").with_author("steve").derive(&blocks);
        assert_eq!(header.name, "house");
        assert_eq!(header.author.as_deref(), Some("steve"));
        assert_eq!(header.requirements.count(&BlockKind::new("stone")), 2);
        assert_eq!(header.requirements.count(&BlockKind::new("glass")), 1);
        assert_eq!(header.requirements.total(), 3);
        assert_eq!(header.bounds.unwrap().size(), [2, 3, 1]);
    }

    #[test]
    fn test_header_json_shape() {
        let header = TemplateHeader::new("wall");
        let json = serde_json::to_value(&header).unwrap();
        assert_eq!(json, serde_json::json!({"name": "wall", "requirements": {}}));
    }
}
