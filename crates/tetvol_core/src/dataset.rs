//! Input datasets: named flat numeric arrays

use std::collections::HashMap;

use crate::channel::Dtype;

/// One flat numeric field
///
/// Length is `element_count * item_size` of the channel the field is bound to.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldData {
    Float32(Vec<f32>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
}

impl FieldData {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            FieldData::Float32(v) => v.len(),
            FieldData::Int32(v) => v.len(),
            FieldData::Uint32(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            FieldData::Float32(_) => Dtype::Float32,
            FieldData::Int32(_) => Dtype::Int32,
            FieldData::Uint32(_) => Dtype::Uint32,
        }
    }

    /// Values converted to `f32`, the only texel type the backends accept
    ///
    /// Integers above 2^24 lose precision here. That is a limit of float
    /// textures, not of the mapping.
    pub fn iter_f32(&self) -> Box<dyn Iterator<Item = f32> + '_> {
        match self {
            FieldData::Float32(v) => Box::new(v.iter().copied()),
            FieldData::Int32(v) => Box::new(v.iter().map(|&x| x as f32)),
            FieldData::Uint32(v) => Box::new(v.iter().map(|&x| x as f32)),
        }
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            FieldData::Float32(v) => v.clone(),
            _ => self.iter_f32().collect(),
        }
    }
}

impl From<Vec<f32>> for FieldData {
    fn from(v: Vec<f32>) -> Self {
        FieldData::Float32(v)
    }
}

impl From<Vec<i32>> for FieldData {
    fn from(v: Vec<i32>) -> Self {
        FieldData::Int32(v)
    }
}

impl From<Vec<u32>> for FieldData {
    fn from(v: Vec<u32>) -> Self {
        FieldData::Uint32(v)
    }
}

/// A mapping from field name to flat numeric data
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    fields: HashMap<String, FieldData>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insert
    pub fn with_field(mut self, name: impl Into<String>, data: impl Into<FieldData>) -> Self {
        self.insert(name, data);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<FieldData>) {
        self.fields.insert(name.into(), data.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldData> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_conversion() {
        let ints = FieldData::from(vec![1i32, -2, 3]);
        assert_eq!(ints.dtype(), Dtype::Int32);
        assert_eq!(ints.to_f32_vec(), vec![1.0, -2.0, 3.0]);

        let uints = FieldData::from(vec![7u32]);
        assert_eq!(uints.to_f32_vec(), vec![7.0]);
    }

    #[test]
    fn test_dataset_builder() {
        let data = Dataset::new()
            .with_field("density", vec![0.5f32, 1.0])
            .with_field("cells", vec![0i32, 1, 2, 3]);
        assert_eq!(data.len(), 2);
        assert!(data.contains("density"));
        assert_eq!(data.get("cells").unwrap().len(), 4);
        assert!(data.get("emission").is_none());
    }
}
