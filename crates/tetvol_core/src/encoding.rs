//! Per-method mapping from channels to dataset fields

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::channel::{Association, ChannelSet, UnknownAssociation};

/// Where one channel reads its data from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingEntry {
    /// Name of the dataset field backing the channel
    pub field: String,
    /// Overrides the channel's default association when set
    ///
    /// Kept as text so encodings read from configuration files can carry
    /// names the schema does not know; those are rejected per channel at
    /// resolution time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association: Option<String>,
}

impl EncodingEntry {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into(), association: None }
    }

    pub fn with_association(mut self, association: Association) -> Self {
        self.association = Some(association.as_str().to_string());
        self
    }

    /// Effective association: the override if present, else `default`
    pub fn resolve_association(
        &self,
        default: Association,
    ) -> Result<Association, UnknownAssociation> {
        match &self.association {
            Some(name) => name.parse(),
            None => Ok(default),
        }
    }
}

/// Mapping from channel name to encoding entry
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding {
    entries: BTreeMap<String, EncodingEntry>,
}

impl Encoding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity encoding: every channel reads the field of the same name
    pub fn identity(channels: &ChannelSet) -> Self {
        let mut encoding = Self::new();
        for name in channels.names() {
            encoding.insert(name, EncodingEntry::new(name));
        }
        encoding
    }

    /// Builder-style insert
    pub fn with(mut self, channel: impl Into<String>, entry: EncodingEntry) -> Self {
        self.insert(channel, entry);
        self
    }

    pub fn insert(&mut self, channel: impl Into<String>, entry: EncodingEntry) {
        self.entries.insert(channel.into(), entry);
    }

    pub fn remove(&mut self, channel: &str) -> Option<EncodingEntry> {
        self.entries.remove(channel)
    }

    pub fn get(&self, channel: &str) -> Option<&EncodingEntry> {
        self.entries.get(channel)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EncodingEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay `other` on top of this encoding, replacing matching channels
    pub fn merged(mut self, other: &Encoding) -> Self {
        for (channel, entry) in other.iter() {
            self.insert(channel, entry.clone());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::DEFAULT_CHANNELS;

    #[test]
    fn test_identity_encoding() {
        let encoding = Encoding::identity(&DEFAULT_CHANNELS);
        assert_eq!(encoding.len(), 6);
        assert_eq!(encoding.get("density").unwrap().field, "density");
        assert!(encoding.get("density").unwrap().association.is_none());
    }

    #[test]
    fn test_resolve_association() {
        let plain = EncodingEntry::new("rho");
        assert_eq!(plain.resolve_association(Association::Vertex), Ok(Association::Vertex));

        let overridden = EncodingEntry::new("rho").with_association(Association::Uniform);
        assert_eq!(
            overridden.resolve_association(Association::Vertex),
            Ok(Association::Uniform)
        );

        let bogus = EncodingEntry { field: "rho".into(), association: Some("voxel".into()) };
        assert!(bogus.resolve_association(Association::Vertex).is_err());
    }

    #[test]
    fn test_merged_overrides_entries() {
        let base = Encoding::identity(&DEFAULT_CHANNELS);
        let overlay = Encoding::new().with("density", EncodingEntry::new("pressure"));
        let merged = base.merged(&overlay);
        assert_eq!(merged.get("density").unwrap().field, "pressure");
        assert_eq!(merged.get("emission").unwrap().field, "emission");
    }

    #[test]
    fn test_remove_entry() {
        let mut encoding = Encoding::identity(&DEFAULT_CHANNELS);
        assert!(encoding.remove("cells").is_some());
        assert!(encoding.get("cells").is_none());
        assert_eq!(encoding.len(), 5);
    }
}
