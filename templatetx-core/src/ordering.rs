//! Operator Ordering - Phase Buckets
//!
//! Partitions the submitted operators into one bucket per characteristic.
//! Buckets hold indices into the submission list, in submission order, so an
//! operator that declares several characteristics appears in several buckets.

use tracing::warn;

use crate::operator::{Characteristic, Characteristics, Operator};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorOrdering {
    data_creators: Vec<usize>,
    data_transformers: Vec<usize>,
    position_transformers: Vec<usize>,
    header_transformers: Vec<usize>,
}

impl OperatorOrdering {
    /// Reads each operator's characteristics exactly once.
    pub fn new<O: Operator>(operators: &[O]) -> Self {
        let declared: Vec<Characteristics> =
            operators.iter().map(Operator::characteristics).collect();

        for (index, characteristics) in declared.iter().enumerate() {
            if characteristics.is_empty() {
                warn!(
                    operator = operators[index].name(),
                    index, "operator declares no characteristics and will never run"
                );
            }
        }

        let bucket = |characteristic: Characteristic| -> Vec<usize> {
            declared
                .iter()
                .enumerate()
                .filter(|(_, c)| c.contains(characteristic))
                .map(|(index, _)| index)
                .collect()
        };

        Self {
            data_creators: bucket(Characteristic::CreateData),
            data_transformers: bucket(Characteristic::TransformData),
            position_transformers: bucket(Characteristic::TransformPosition),
            header_transformers: bucket(Characteristic::TransformHeader),
        }
    }

    pub fn bucket(&self, characteristic: Characteristic) -> &[usize] {
        match characteristic {
            Characteristic::CreateData => &self.data_creators,
            Characteristic::TransformData => &self.data_transformers,
            Characteristic::TransformPosition => &self.position_transformers,
            Characteristic::TransformHeader => &self.header_transformers,
        }
    }

    pub fn data_creators(&self) -> &[usize] {
        &self.data_creators
    }

    pub fn data_transformers(&self) -> &[usize] {
        &self.data_transformers
    }

    pub fn position_transformers(&self) -> &[usize] {
        &self.position_transformers
    }

    pub fn header_transformers(&self) -> &[usize] {
        &self.header_transformers
    }

    /// True when no bucket holds an operator.
    pub fn is_empty(&self) -> bool {
        Characteristic::ALL
            .iter()
            .all(|c| self.bucket(*c).is_empty())
    }
}
