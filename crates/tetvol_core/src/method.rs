//! Catalog of rendering methods
//!
//! Every method renders the same channels with the same shaders. What differs
//! is the set of compile-time defines, the blend rule, which faces are drawn,
//! and whether the primitives need a view-dependent ordering.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelSet, DEFAULT_CHANNELS};
use crate::encoding::Encoding;

bitflags! {
    /// Shader defines, used as presence flags
    ///
    /// A define is either present or absent; shaders only test whether it is
    /// set, never its value.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DefineFlags: u8 {
        /// Read the cell index through the ordering instance attribute
        const ENABLE_CELL_ORDERING = 1 << 0;
        /// Shade faces as an opaque surface
        const ENABLE_SURFACE_MODEL = 1 << 1;
        /// Use the emission channel
        const ENABLE_EMISSION = 1 << 2;
        /// Use the density channel
        const ENABLE_DENSITY = 1 << 3;
    }
}

impl DefineFlags {
    /// Defines shared by every method
    pub const BASE: Self = Self::ENABLE_CELL_ORDERING;

    /// Shader-facing names of all known defines
    pub const NAMES: [(&'static str, DefineFlags); 4] = [
        ("ENABLE_CELL_ORDERING", DefineFlags::ENABLE_CELL_ORDERING),
        ("ENABLE_SURFACE_MODEL", DefineFlags::ENABLE_SURFACE_MODEL),
        ("ENABLE_EMISSION", DefineFlags::ENABLE_EMISSION),
        ("ENABLE_DENSITY", DefineFlags::ENABLE_DENSITY),
    ];

    /// Names of the defines present in this set
    pub fn define_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        Self::NAMES
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
    }
}

/// Blend equation applied between fragment and framebuffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Blend factor for either side of the blend equation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Custom blend configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendConfig {
    pub equation: BlendEquation,
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendConfig {
    pub const fn new(equation: BlendEquation, src: BlendFactor, dst: BlendFactor) -> Self {
        Self { equation, src, dst }
    }
}

/// Which faces of each tetrahedron get rasterized
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Back,
    Double,
}

/// A named rendering technique
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Opaque surface of the mesh
    Surface,
    /// Maximum intensity projection
    Mip,
    /// Density attenuation
    Xray,
    /// Additive emission
    Splat,
    /// Sorted translucent point cloud
    Cloud,
}

impl Method {
    pub const ALL: [Method; 5] =
        [Method::Surface, Method::Mip, Method::Xray, Method::Splat, Method::Cloud];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Surface => "surface",
            Method::Mip => "mip",
            Method::Xray => "xray",
            Method::Splat => "splat",
            Method::Cloud => "cloud",
        }
    }

    /// Catalog entry for this method
    pub fn properties(&self) -> &'static MethodProperties {
        match self {
            Method::Surface => &SURFACE,
            Method::Mip => &MIP,
            Method::Xray => &XRAY,
            Method::Splat => &SPLAT,
            Method::Cloud => &CLOUD,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for method names missing from the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown rendering method '{}'", self.0)
    }
}

impl std::error::Error for UnknownMethod {}

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// Static description of a rendering method
#[derive(Debug)]
pub struct MethodProperties {
    pub transparent: bool,
    /// `None` means the backend's normal blending
    pub blend: Option<BlendConfig>,
    pub side: Side,
    /// Whether translucent blending depends on primitive order
    pub sorted: bool,
    /// Method-specific defines, merged with [`DefineFlags::BASE`]
    pub defines: DefineFlags,
    pub channels: &'static ChannelSet,
}

impl MethodProperties {
    /// Effective define set passed to the shader compiler
    pub fn effective_defines(&self) -> DefineFlags {
        DefineFlags::BASE | self.defines
    }

    /// Encoding used when `configure` is called without one
    pub fn default_encoding(&self) -> Encoding {
        Encoding::identity(self.channels)
    }
}

static SURFACE: MethodProperties = MethodProperties {
    transparent: false,
    blend: None,
    side: Side::Double,
    sorted: false,
    defines: DefineFlags::ENABLE_SURFACE_MODEL.union(DefineFlags::ENABLE_EMISSION),
    channels: &DEFAULT_CHANNELS,
};

// Max/min equations ignore the factors, but backends require them to be one
static MIP: MethodProperties = MethodProperties {
    transparent: true,
    blend: Some(BlendConfig::new(BlendEquation::Max, BlendFactor::One, BlendFactor::One)),
    side: Side::Double,
    sorted: false,
    defines: DefineFlags::ENABLE_EMISSION,
    channels: &DEFAULT_CHANNELS,
};

static XRAY: MethodProperties = MethodProperties {
    transparent: true,
    blend: Some(BlendConfig::new(
        BlendEquation::Add,
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusDstAlpha,
    )),
    side: Side::Back,
    sorted: false,
    defines: DefineFlags::ENABLE_DENSITY,
    channels: &DEFAULT_CHANNELS,
};

static SPLAT: MethodProperties = MethodProperties {
    transparent: true,
    blend: Some(BlendConfig::new(BlendEquation::Add, BlendFactor::One, BlendFactor::One)),
    side: Side::Back,
    sorted: false,
    defines: DefineFlags::ENABLE_EMISSION,
    channels: &DEFAULT_CHANNELS,
};

static CLOUD: MethodProperties = MethodProperties {
    transparent: true,
    blend: Some(BlendConfig::new(
        BlendEquation::Add,
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusDstAlpha,
    )),
    side: Side::Back,
    sorted: true,
    defines: DefineFlags::ENABLE_DENSITY.union(DefineFlags::ENABLE_EMISSION),
    channels: &DEFAULT_CHANNELS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_roundtrip_names() {
        for method in Method::ALL {
            assert_eq!(method.as_str().parse::<Method>().unwrap(), method);
        }
        assert!("volume".parse::<Method>().is_err());
    }

    #[test]
    fn test_base_defines_always_present() {
        for method in Method::ALL {
            let defines = method.properties().effective_defines();
            assert!(defines.contains(DefineFlags::ENABLE_CELL_ORDERING), "{}", method);
        }
    }

    #[test]
    fn test_surface_defines() {
        let defines = Method::Surface.properties().effective_defines();
        let names: Vec<_> = defines.define_names().collect();
        assert_eq!(
            names,
            vec!["ENABLE_CELL_ORDERING", "ENABLE_SURFACE_MODEL", "ENABLE_EMISSION"]
        );
    }

    #[test]
    fn test_only_cloud_is_sorted() {
        for method in Method::ALL {
            assert_eq!(method.properties().sorted, method == Method::Cloud);
        }
    }

    #[test]
    fn test_surface_is_opaque() {
        let props = Method::Surface.properties();
        assert!(!props.transparent);
        assert!(props.blend.is_none());
        assert_eq!(props.side, Side::Double);
    }

    #[test]
    fn test_mip_uses_max_blending() {
        let blend = Method::Mip.properties().blend.unwrap();
        assert_eq!(blend.equation, BlendEquation::Max);
        assert_eq!(blend.src, BlendFactor::One);
        assert_eq!(blend.dst, BlendFactor::One);
    }

    #[test]
    fn test_methods_share_channel_set() {
        let first = Method::Surface.properties().channels as *const ChannelSet;
        for method in Method::ALL {
            assert!(std::ptr::eq(method.properties().channels, first));
        }
    }

    #[test]
    fn test_default_encoding_covers_channels() {
        let props = Method::Xray.properties();
        let encoding = props.default_encoding();
        for name in props.channels.names() {
            assert_eq!(encoding.get(name).unwrap().field, name);
        }
    }
}
