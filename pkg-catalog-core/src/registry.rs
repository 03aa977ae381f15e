//! Static registry of the tools tracked by the catalog.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace layout a tool's builds follow in the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolShape {
    /// `{tool}/{build}/metadata.json`
    Simple,
    /// `{tool}/{os_version}/{build}/metadata.json`
    OsVersioned,
}

impl fmt::Display for ToolShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolShape::Simple => f.write_str("simple"),
            ToolShape::OsVersioned => f.write_str("os_versioned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub shape: ToolShape,
    pub description: String,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, shape: ToolShape, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape,
            description: description.into(),
        }
    }
}

/// The tools published to the CDN, in catalog order.
pub fn default_registry() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("bintools", ToolShape::Simple, "Go binary package manager"),
        ToolDescriptor::new("snaptools", ToolShape::Simple, "Snap package bundler"),
        ToolDescriptor::new("rpmtools", ToolShape::OsVersioned, "RPM package bundler"),
        ToolDescriptor::new("debtools", ToolShape::OsVersioned, "DEB package bundler"),
        ToolDescriptor::new(
            "nvidia-rpmtools",
            ToolShape::OsVersioned,
            "NVIDIA B200 NVSwitch package bundler (RPM)",
        ),
    ]
}
