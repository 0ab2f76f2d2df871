//! Static channel schema
//!
//! A channel is a named semantic data slot. Its association decides what kind
//! of GPU resource backs it, its dtype and item size decide the texel layout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a channel's value is bound to a GPU resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Association {
    /// A single scalar or vector uniform
    Uniform,
    /// One item per mesh vertex, packed into a vertex-extent texture
    Vertex,
    /// One item per tetrahedron, packed into a cell-extent texture
    Cell,
    /// Single-row lookup table whose width follows the uploaded data
    Lut,
}

impl Association {
    pub const ALL: [Association; 4] = [
        Association::Uniform,
        Association::Vertex,
        Association::Cell,
        Association::Lut,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Association::Uniform => "uniform",
            Association::Vertex => "vertex",
            Association::Cell => "cell",
            Association::Lut => "lut",
        }
    }

    /// Prefix of the shader binding name for resources of this association
    pub fn binding_prefix(&self) -> &'static str {
        match self {
            Association::Uniform => "u_",
            Association::Vertex | Association::Cell | Association::Lut => "t_",
        }
    }
}

impl fmt::Display for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for association names that are not part of the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAssociation(pub String);

impl fmt::Display for UnknownAssociation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown association '{}'", self.0)
    }
}

impl std::error::Error for UnknownAssociation {}

impl FromStr for Association {
    type Err = UnknownAssociation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Association::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAssociation(s.to_string()))
    }
}

/// Element type of the source data for a channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Float32,
    Int32,
    Uint32,
}

impl Dtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dtype::Float32 => "float32",
            Dtype::Int32 => "int32",
            Dtype::Uint32 => "uint32",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of one semantic data channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Channel {
    pub name: &'static str,
    pub association: Association,
    pub dtype: Dtype,
    /// Components per element (1..=4)
    pub item_size: usize,
    /// Whether the data is expected to change between uploads
    pub dynamic: bool,
}

impl Channel {
    const fn new(
        name: &'static str,
        association: Association,
        dtype: Dtype,
        item_size: usize,
        dynamic: bool,
    ) -> Self {
        Self { name, association, dtype, item_size, dynamic }
    }
}

/// Tetrahedron connectivity, four vertex indices per cell
pub const CELLS: Channel = Channel::new("cells", Association::Cell, Dtype::Int32, 4, false);
/// Vertex positions
pub const COORDINATES: Channel =
    Channel::new("coordinates", Association::Vertex, Dtype::Float32, 3, false);
/// Scalar density per vertex
pub const DENSITY: Channel = Channel::new("density", Association::Vertex, Dtype::Float32, 1, true);
/// Scalar emission per vertex
pub const EMISSION: Channel = Channel::new("emission", Association::Vertex, Dtype::Float32, 1, true);
/// Density transfer function
pub const DENSITY_LUT: Channel =
    Channel::new("density_lut", Association::Lut, Dtype::Float32, 1, true);
/// Emission color map (RGB)
pub const EMISSION_LUT: Channel =
    Channel::new("emission_lut", Association::Lut, Dtype::Float32, 3, true);

/// An ordered, named set of channels shared by reference between methods
#[derive(Debug, PartialEq, Eq)]
pub struct ChannelSet {
    channels: &'static [Channel],
}

impl ChannelSet {
    pub const fn new(channels: &'static [Channel]) -> Self {
        Self { channels }
    }

    /// Look up a channel description by name
    pub fn get(&self, name: &str) -> Option<&'static Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static Channel> {
        self.channels.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        self.channels.iter().map(|c| c.name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// The channel set every built-in method renders from
pub static DEFAULT_CHANNELS: ChannelSet =
    ChannelSet::new(&[CELLS, COORDINATES, DENSITY, EMISSION, DENSITY_LUT, EMISSION_LUT]);

/// Channels with a `u_<name>_range` uniform in the shaders
pub const RANGE_TRACKED: [&str; 2] = ["density", "emission"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_channel_table() {
        assert_eq!(DEFAULT_CHANNELS.len(), 6);
        let cells = DEFAULT_CHANNELS.get("cells").unwrap();
        assert_eq!(cells.association, Association::Cell);
        assert_eq!(cells.dtype, Dtype::Int32);
        assert_eq!(cells.item_size, 4);
        assert!(!cells.dynamic);

        let lut = DEFAULT_CHANNELS.get("emission_lut").unwrap();
        assert_eq!(lut.association, Association::Lut);
        assert_eq!(lut.item_size, 3);
        assert!(lut.dynamic);
    }

    #[test]
    fn test_item_sizes_in_bounds() {
        for channel in DEFAULT_CHANNELS.iter() {
            assert!((1..=4).contains(&channel.item_size), "{}", channel.name);
        }
    }

    #[test]
    fn test_unknown_channel() {
        assert!(DEFAULT_CHANNELS.get("velocity").is_none());
    }

    #[test]
    fn test_association_parse() {
        assert_eq!("lut".parse::<Association>().unwrap(), Association::Lut);
        assert_eq!("vertex".parse::<Association>().unwrap(), Association::Vertex);
        let err = "instanced".parse::<Association>().unwrap_err();
        assert_eq!(err.0, "instanced");
    }

    #[test]
    fn test_binding_prefix() {
        assert_eq!(Association::Uniform.binding_prefix(), "u_");
        assert_eq!(Association::Cell.binding_prefix(), "t_");
    }

    #[test]
    fn test_range_tracked_channels_exist() {
        for name in RANGE_TRACKED {
            assert!(DEFAULT_CHANNELS.get(name).is_some());
        }
    }
}
