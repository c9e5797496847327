//! Built-in Operators
//!
//! The edits a building gadget performs on a copied template, expressed as
//! transaction operators, plus closure adapters for one-off transforms.

use serde::{Deserialize, Serialize};

use crate::block::{BlockData, BlockKind, Position};
use crate::context::ExecutionContext;
use crate::header::{Region, TemplateHeader};
use crate::operator::{Characteristic, Characteristics, Operator, OperatorError, OperatorResult};

/// Creates `data` at every position of `region`.
///
/// Positions are yielded x fastest, then z, then y (bottom layer first).
#[derive(Debug, Clone)]
pub struct Fill {
    region: Region,
    data: BlockData,
    keep_existing: bool,
    cursor: Option<Position>,
}

impl Fill {
    pub fn new(region: Region, data: BlockData) -> Self {
        Self {
            region,
            data,
            keep_existing: false,
            cursor: Some(region.min),
        }
    }

    /// Skip positions that already hold a block.
    pub fn keep_existing(mut self) -> Self {
        self.keep_existing = true;
        self
    }

    fn advance(&self, current: Position) -> Option<Position> {
        let Region { min, max } = self.region;
        if current.x < max.x {
            Some(Position::new(current.x + 1, current.y, current.z))
        } else if current.z < max.z {
            Some(Position::new(min.x, current.y, current.z + 1))
        } else if current.y < max.y {
            Some(Position::new(min.x, current.y + 1, min.z))
        } else {
            None
        }
    }
}

impl Operator for Fill {
    fn characteristics(&self) -> Characteristics {
        Characteristic::CreateData.into()
    }

    fn name(&self) -> &str {
        "Fill"
    }

    fn create_pos(&mut self, ctx: &ExecutionContext) -> OperatorResult<Option<Position>> {
        while let Some(current) = self.cursor {
            self.cursor = self.advance(current);
            if !(self.keep_existing && ctx.get(&current).is_some()) {
                return Ok(Some(current));
            }
        }
        Ok(None)
    }

    fn create_data_for_pos(
        &mut self,
        _ctx: &ExecutionContext,
        _pos: &Position,
    ) -> OperatorResult<Option<BlockData>> {
        Ok(Some(self.data.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translate {
    pub offset: Position,
}

impl Translate {
    pub fn new(offset: Position) -> Self {
        Self { offset }
    }
}

impl Operator for Translate {
    fn characteristics(&self) -> Characteristics {
        Characteristic::TransformPosition.into()
    }

    fn name(&self) -> &str {
        "Translate"
    }

    fn transform_pos(
        &mut self,
        _ctx: &ExecutionContext,
        pos: Position,
        _data: &BlockData,
    ) -> OperatorResult<Option<Position>> {
        pos.checked_add(self.offset).map(Some).ok_or_else(|| {
            let offset = self.offset;
            OperatorError::msg(format!("translating {pos} by {offset} leaves the i32 range"))
        })
    }
}

/// Rotation about the vertical axis through `origin`, clockwise seen from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotate {
    pub origin: Position,
    pub quarter_turns: i32,
}

impl Rotate {
    pub fn new(origin: Position, quarter_turns: i32) -> Self {
        Self {
            origin,
            quarter_turns,
        }
    }

    /// `None` when the rotated position is not representable.
    pub fn apply(&self, pos: Position) -> Option<Position> {
        let rel_x = i64::from(pos.x) - i64::from(self.origin.x);
        let rel_z = i64::from(pos.z) - i64::from(self.origin.z);
        let (x, z) = match self.quarter_turns.rem_euclid(4) {
            0 => (rel_x, rel_z),
            1 => (-rel_z, rel_x),
            2 => (-rel_x, -rel_z),
            _ => (rel_z, -rel_x),
        };
        Some(Position::new(
            i32::try_from(x + i64::from(self.origin.x)).ok()?,
            pos.y,
            i32::try_from(z + i64::from(self.origin.z)).ok()?,
        ))
    }
}

impl Operator for Rotate {
    fn characteristics(&self) -> Characteristics {
        Characteristic::TransformPosition.into()
    }

    fn name(&self) -> &str {
        "Rotate"
    }

    fn transform_pos(
        &mut self,
        _ctx: &ExecutionContext,
        pos: Position,
        _data: &BlockData,
    ) -> OperatorResult<Option<Position>> {
        self.apply(pos).map(Some).ok_or_else(|| {
            let origin = self.origin;
            OperatorError::msg(format!("rotating {pos} about {origin} leaves the i32 range"))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Reflection across the plane through `origin` perpendicular to `axis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mirror {
    pub axis: Axis,
    pub origin: Position,
}

impl Mirror {
    pub fn new(axis: Axis, origin: Position) -> Self {
        Self { axis, origin }
    }

    /// `None` when the reflected position is not representable.
    pub fn apply(&self, pos: Position) -> Option<Position> {
        let reflect =
            |origin: i32, v: i32| i32::try_from(2 * i64::from(origin) - i64::from(v)).ok();
        Some(match self.axis {
            Axis::X => Position::new(reflect(self.origin.x, pos.x)?, pos.y, pos.z),
            Axis::Y => Position::new(pos.x, reflect(self.origin.y, pos.y)?, pos.z),
            Axis::Z => Position::new(pos.x, pos.y, reflect(self.origin.z, pos.z)?),
        })
    }
}

impl Operator for Mirror {
    fn characteristics(&self) -> Characteristics {
        Characteristic::TransformPosition.into()
    }

    fn name(&self) -> &str {
        "Mirror"
    }

    fn transform_pos(
        &mut self,
        _ctx: &ExecutionContext,
        pos: Position,
        _data: &BlockData,
    ) -> OperatorResult<Option<Position>> {
        self.apply(pos).map(Some).ok_or_else(|| {
            let origin = self.origin;
            OperatorError::msg(format!("mirroring {pos} through {origin} leaves the i32 range"))
        })
    }
}

/// Drops every entry whose position falls outside `region`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    pub region: Region,
}

impl Crop {
    pub fn new(region: Region) -> Self {
        Self { region }
    }
}

impl Operator for Crop {
    fn characteristics(&self) -> Characteristics {
        Characteristic::TransformPosition.into()
    }

    fn name(&self) -> &str {
        "Crop"
    }

    fn transform_pos(
        &mut self,
        _ctx: &ExecutionContext,
        pos: Position,
        _data: &BlockData,
    ) -> OperatorResult<Option<Position>> {
        Ok(self.region.contains(&pos).then_some(pos))
    }
}

#[derive(Debug, Clone)]
pub struct Replace {
    pub from: BlockKind,
    pub to: BlockData,
}

impl Replace {
    pub fn new(from: impl Into<BlockKind>, to: BlockData) -> Self {
        Self {
            from: from.into(),
            to,
        }
    }
}

impl Operator for Replace {
    fn characteristics(&self) -> Characteristics {
        Characteristic::TransformData.into()
    }

    fn name(&self) -> &str {
        "Replace"
    }

    fn transform_data(
        &mut self,
        _ctx: &ExecutionContext,
        data: BlockData,
    ) -> OperatorResult<Option<BlockData>> {
        if data.is(&self.from) {
            Ok(Some(self.to.clone()))
        } else {
            Ok(Some(data))
        }
    }
}

#[derive(Debug, Clone)]
pub struct Remove {
    pub kind: BlockKind,
}

impl Remove {
    pub fn new(kind: impl Into<BlockKind>) -> Self {
        Self { kind: kind.into() }
    }
}

impl Operator for Remove {
    fn characteristics(&self) -> Characteristics {
        Characteristic::TransformData.into()
    }

    fn name(&self) -> &str {
        "Remove"
    }

    fn transform_data(
        &mut self,
        _ctx: &ExecutionContext,
        data: BlockData,
    ) -> OperatorResult<Option<BlockData>> {
        Ok((!data.is(&self.kind)).then_some(data))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Rename {
    pub name: Option<String>,
    pub author: Option<String>,
}

impl Rename {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            author: None,
        }
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

impl Operator for Rename {
    fn characteristics(&self) -> Characteristics {
        Characteristic::TransformHeader.into()
    }

    fn name(&self) -> &str {
        "Rename"
    }

    fn transform_header(
        &mut self,
        _ctx: &ExecutionContext,
        mut header: TemplateHeader,
    ) -> OperatorResult<Option<TemplateHeader>> {
        if let Some(name) = &self.name {
            header.name = name.clone();
        }
        if let Some(author) = &self.author {
            header.author = Some(author.clone());
        }
        Ok(Some(header))
    }
}

/// Rebuilds bounds and material requirements from the final mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecomputeHeader;

impl Operator for RecomputeHeader {
    fn characteristics(&self) -> Characteristics {
        Characteristic::TransformHeader.into()
    }

    fn name(&self) -> &str {
        "RecomputeHeader"
    }

    fn transform_header(
        &mut self,
        ctx: &ExecutionContext,
        header: TemplateHeader,
    ) -> OperatorResult<Option<TemplateHeader>> {
        Ok(Some(header.derive(ctx.blocks())))
    }
}

/// TRANSFORM_DATA operator backed by a closure.
pub struct DataMapper<F> {
    name: String,
    f: F,
}

impl<F> DataMapper<F>
where
    F: FnMut(&ExecutionContext, BlockData) -> OperatorResult<Option<BlockData>>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Operator for DataMapper<F>
where
    F: FnMut(&ExecutionContext, BlockData) -> OperatorResult<Option<BlockData>>,
{
    fn characteristics(&self) -> Characteristics {
        Characteristic::TransformData.into()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn transform_data(
        &mut self,
        ctx: &ExecutionContext,
        data: BlockData,
    ) -> OperatorResult<Option<BlockData>> {
        (self.f)(ctx, data)
    }
}

/// TRANSFORM_POSITION operator backed by a closure.
pub struct PositionMapper<F> {
    name: String,
    f: F,
}

impl<F> PositionMapper<F>
where
    F: FnMut(&ExecutionContext, Position, &BlockData) -> OperatorResult<Option<Position>>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Operator for PositionMapper<F>
where
    F: FnMut(&ExecutionContext, Position, &BlockData) -> OperatorResult<Option<Position>>,
{
    fn characteristics(&self) -> Characteristics {
        Characteristic::TransformPosition.into()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn transform_pos(
        &mut self,
        ctx: &ExecutionContext,
        pos: Position,
        data: &BlockData,
    ) -> OperatorResult<Option<Position>> {
        (self.f)(ctx, pos, data)
    }
}

/// TRANSFORM_HEADER operator backed by a closure.
pub struct HeaderMapper<F> {
    name: String,
    f: F,
}

impl<F> HeaderMapper<F>
where
    F: FnMut(&ExecutionContext, TemplateHeader) -> OperatorResult<Option<TemplateHeader>>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Operator for HeaderMapper<F>
where
    F: FnMut(&ExecutionContext, TemplateHeader) -> OperatorResult<Option<TemplateHeader>>,
{
    fn characteristics(&self) -> Characteristics {
        Characteristic::TransformHeader.into()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn transform_header(
        &mut self,
        ctx: &ExecutionContext,
        header: TemplateHeader,
    ) -> OperatorResult<Option<TemplateHeader>> {
        (self.f)(ctx, header)
    }
}
