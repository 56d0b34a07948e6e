// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declarative configuration-source descriptors.
//!
//! A [`Descriptor`] asks for one or more remote documents together with the metadata
//! that controls how they are loaded and layered. Descriptors are attached to
//! [`DeclarationSite`]s, either one at a time or bundled in a [`DescriptorGroup`].

use crate::domain::config_type::ConfigType;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Property overrides and merged store properties.
///
/// A sorted map so that iteration, hashing and naming are deterministic.
pub type Properties = BTreeMap<String, String>;

/// Group used when a descriptor does not name one.
pub const DEFAULT_GROUP: &str = "DEFAULT_GROUP";

/// Store property selecting the document namespace.
///
/// Documents with the same data id and group in different namespaces are distinct.
pub const NAMESPACE_PROPERTY: &str = "namespace";

/// Stable identity of the place a descriptor was declared.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::Origin;
///
/// let origin = Origin::from("billing::BootConfig");
/// assert_eq!(origin.as_str(), "billing::BootConfig");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    /// Creates an origin from any string-like identity.
    pub fn new(origin: impl Into<String>) -> Self {
        Origin(origin.into())
    }

    /// Returns the origin as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Origin {
    fn from(s: &str) -> Self {
        Origin(s.to_string())
    }
}

impl From<String> for Origin {
    fn from(s: String) -> Self {
        Origin(s)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relative placement hints for a source in the final layer order.
///
/// `before`/`after` name another source, either by its source name or by its
/// document identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingHints {
    /// Place ahead of every source that is not marked `first`.
    pub first: bool,
    /// Must precede the named source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Must follow the named source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl OrderingHints {
    /// Returns `true` when no hint is set.
    pub fn is_empty(&self) -> bool {
        !self.first && self.before.is_none() && self.after.is_none()
    }
}

/// A raw, unresolved request for remote configuration documents.
///
/// Identifier, group and property values may contain `${key:default}` placeholders;
/// they are resolved when the descriptor is built into sources.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::{ConfigType, Descriptor};
///
/// let descriptor = Descriptor::new(["test-1.yml", "test-2", "test-3.json"])
///     .group("${app.group:DEFAULT_GROUP}")
///     .property("namespace", "${tenant}")
///     .auto_refresh(true);
///
/// assert_eq!(descriptor.data_ids.len(), 3);
/// assert!(descriptor.auto_refresh);
/// assert_eq!(descriptor.config_type, None::<ConfigType>);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Remote document identifiers, loaded in the listed order.
    #[serde(alias = "data_id", deserialize_with = "one_or_many")]
    pub data_ids: Vec<String>,
    /// Grouping key; the registry default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Explicit content type; inferred from the identifier when absent.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub config_type: Option<ConfigType>,
    /// Store property overrides, merged over the global properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    /// Subscribe for change notifications once loaded.
    #[serde(default)]
    pub auto_refresh: bool,
    /// Placement hints shared by every document of this descriptor.
    #[serde(default, flatten)]
    pub hints: OrderingHints,
    /// Explicit source name instead of the derived one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Descriptor {
    /// Creates a descriptor for the given document identifiers.
    pub fn new<I, S>(data_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data_ids: data_ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the group key.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets an explicit content type.
    pub fn config_type(mut self, config_type: ConfigType) -> Self {
        self.config_type = Some(config_type);
        self
    }

    /// Adds a store property override.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Enables or disables change subscriptions.
    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    /// Marks the sources as `first`.
    pub fn first(mut self) -> Self {
        self.hints.first = true;
        self
    }

    /// Places the sources before `target`.
    pub fn before(mut self, target: impl Into<String>) -> Self {
        self.hints.before = Some(target.into());
        self
    }

    /// Places the sources after `target`.
    pub fn after(mut self, target: impl Into<String>) -> Self {
        self.hints.after = Some(target.into());
        self
    }

    /// Sets an explicit source name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Several descriptors declared together on one site, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorGroup {
    /// The bundled descriptors.
    pub sources: Vec<Descriptor>,
}

/// One declaration attached to a site: a single descriptor or a group of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Declaration {
    /// A repeated-group wrapper.
    Group(DescriptorGroup),
    /// A lone descriptor.
    Single(Descriptor),
}

impl From<Descriptor> for Declaration {
    fn from(descriptor: Descriptor) -> Self {
        Declaration::Single(descriptor)
    }
}

impl From<Vec<Descriptor>> for Declaration {
    fn from(sources: Vec<Descriptor>) -> Self {
        Declaration::Group(DescriptorGroup { sources })
    }
}

/// A place that declares configuration sources, identified by its origin.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::{DeclarationSite, Descriptor};
///
/// let site = DeclarationSite::new("app::Boot")
///     .declare(Descriptor::new(["a.yml"]))
///     .declare(vec![Descriptor::new(["b"]), Descriptor::new(["c.json"])]);
///
/// assert_eq!(site.declarations.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationSite {
    /// Stable identity of the site.
    pub origin: Origin,
    /// Declarations attached to the site.
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

impl DeclarationSite {
    /// Creates a site with no declarations.
    pub fn new(origin: impl Into<Origin>) -> Self {
        Self {
            origin: origin.into(),
            declarations: Vec::new(),
        }
    }

    /// Attaches a declaration to the site.
    pub fn declare(mut self, declaration: impl Into<Declaration>) -> Self {
        self.declarations.push(declaration.into());
        self
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(id) => vec![id],
        OneOrMany::Many(ids) => ids,
    })
}
