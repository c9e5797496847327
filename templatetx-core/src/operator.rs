//! Transaction Operators
//!
//! An operator declares which phases it takes part in through its
//! [`Characteristics`] and overrides the matching callbacks. Callbacks for
//! undeclared characteristics are never invoked.

use std::fmt;
use std::ops::BitOr;

use thiserror::Error;

use crate::block::{BlockData, Position};
use crate::context::ExecutionContext;
use crate::header::TemplateHeader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    CreateData,
    TransformData,
    TransformPosition,
    TransformHeader,
}

impl Characteristic {
    pub const ALL: [Characteristic; 4] = [
        Characteristic::CreateData,
        Characteristic::TransformData,
        Characteristic::TransformPosition,
        Characteristic::TransformHeader,
    ];

    const fn bit(self) -> u8 {
        match self {
            Characteristic::CreateData => 1,
            Characteristic::TransformData => 1 << 1,
            Characteristic::TransformPosition => 1 << 2,
            Characteristic::TransformHeader => 1 << 3,
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Characteristic::CreateData => "CREATE_DATA",
            Characteristic::TransformData => "TRANSFORM_DATA",
            Characteristic::TransformPosition => "TRANSFORM_POSITION",
            Characteristic::TransformHeader => "TRANSFORM_HEADER",
        })
    }
}

/// Set of [`Characteristic`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Characteristics(u8);

impl Characteristics {
    pub const NONE: Characteristics = Characteristics(0);

    pub const fn of(characteristic: Characteristic) -> Self {
        Self(characteristic.bit())
    }

    pub const fn with(self, characteristic: Characteristic) -> Self {
        Self(self.0 | characteristic.bit())
    }

    pub const fn contains(self, characteristic: Characteristic) -> bool {
        self.0 & characteristic.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Characteristic> {
        Characteristic::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl From<Characteristic> for Characteristics {
    fn from(characteristic: Characteristic) -> Self {
        Self::of(characteristic)
    }
}

impl BitOr for Characteristic {
    type Output = Characteristics;

    fn bitor(self, rhs: Characteristic) -> Characteristics {
        Characteristics::of(self).with(rhs)
    }
}

impl BitOr<Characteristic> for Characteristics {
    type Output = Characteristics;

    fn bitor(self, rhs: Characteristic) -> Characteristics {
        self.with(rhs)
    }
}

impl FromIterator<Characteristic> for Characteristics {
    fn from_iter<I: IntoIterator<Item = Characteristic>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

/// Failure raised by an operator callback.
#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Source(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl OperatorError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

pub type OperatorResult<T> = Result<T, OperatorError>;

/// A pluggable unit of a template transaction.
///
/// `None` returns are sentinels, never errors: exhaustion for
/// [`create_pos`](Operator::create_pos), "drop this entry" for the data and
/// position transforms. [`create_data_for_pos`](Operator::create_data_for_pos)
/// and [`transform_header`](Operator::transform_header) must not return
/// `None`; the transaction fails with a contract violation if they do.
pub trait Operator {
    /// Read once, when the transaction builds its ordering.
    fn characteristics(&self) -> Characteristics;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Next position to create, `None` once exhausted.
    fn create_pos(&mut self, _ctx: &ExecutionContext) -> OperatorResult<Option<Position>> {
        Ok(None)
    }

    fn create_data_for_pos(
        &mut self,
        _ctx: &ExecutionContext,
        _pos: &Position,
    ) -> OperatorResult<Option<BlockData>> {
        Ok(None)
    }

    fn transform_data(
        &mut self,
        _ctx: &ExecutionContext,
        data: BlockData,
    ) -> OperatorResult<Option<BlockData>> {
        Ok(Some(data))
    }

    fn transform_pos(
        &mut self,
        _ctx: &ExecutionContext,
        pos: Position,
        _data: &BlockData,
    ) -> OperatorResult<Option<Position>> {
        Ok(Some(pos))
    }

    fn transform_header(
        &mut self,
        _ctx: &ExecutionContext,
        header: TemplateHeader,
    ) -> OperatorResult<Option<TemplateHeader>> {
        Ok(Some(header))
    }
}

impl<O: Operator + ?Sized> Operator for Box<O> {
    fn characteristics(&self) -> Characteristics {
        (**self).characteristics()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn create_pos(&mut self, ctx: &ExecutionContext) -> OperatorResult<Option<Position>> {
        (**self).create_pos(ctx)
    }

    fn create_data_for_pos(
        &mut self,
        ctx: &ExecutionContext,
        pos: &Position,
    ) -> OperatorResult<Option<BlockData>> {
        (**self).create_data_for_pos(ctx, pos)
    }

    fn transform_data(
        &mut self,
        ctx: &ExecutionContext,
        data: BlockData,
    ) -> OperatorResult<Option<BlockData>> {
        (**self).transform_data(ctx, data)
    }

    fn transform_pos(
        &mut self,
        ctx: &ExecutionContext,
        pos: Position,
        data: &BlockData,
    ) -> OperatorResult<Option<Position>> {
        (**self).transform_pos(ctx, pos, data)
    }

    fn transform_header(
        &mut self,
        ctx: &ExecutionContext,
        header: TemplateHeader,
    ) -> OperatorResult<Option<TemplateHeader>> {
        (**self).transform_header(ctx, header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_characteristics_set_operations() {
        let set = Characteristic::CreateData | Characteristic::TransformHeader;
        assert!(set.contains(Characteristic::CreateData));
        assert!(set.contains(Characteristic::TransformHeader));
        assert!(!set.contains(Characteristic::TransformData));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Characteristic::CreateData, Characteristic::TransformHeader]
        );
    }

    #[test]
    fn test_characteristics_from_iter() {
        let set: Characteristics = vec![Characteristic::TransformPosition].into_iter().collect();
        assert_eq!(set, Characteristics::of(Characteristic::TransformPosition));
        assert!(Characteristics::NONE.is_empty());
    }

    struct Named;

    impl Operator for Named {
        fn characteristics(&self) -> Characteristics {
            Characteristics::NONE
        }
    }

    #[test]
    fn test_default_name_is_type_name() {
        assert!(Named.name().ends_with("Named"));
        let boxed: Box<dyn Operator> = Box::new(Named);
        assert!(boxed.name().ends_with("Named"));
    }
}
