// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loaded configuration sources.
//!
//! A [`ConfigurationSource`] is the resolved, fetched representation of one remote
//! document. Everything about it is fixed at build time except its current content,
//! which lives in an atomically swapped [`SourceSnapshot`] so auto-refresh can replace
//! it while other threads read.

use crate::domain::config_type::ConfigType;
use crate::domain::descriptor::{OrderingHints, Origin, Properties};
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// The current content of a source and the store properties it was read with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceSnapshot {
    /// Raw document payload.
    pub content: String,
    /// Resolved store properties in effect for this content.
    pub properties: Properties,
    /// Starts at 0 and increases by one on every refresh.
    pub revision: u64,
}

/// A loaded configuration document ready for layering.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::{ConfigType, ConfigurationSource};
///
/// let source = ConfigurationSource::new("test-2", "DEFAULT_GROUP", ConfigType::Properties, "KEY=V")
///     .with_auto_refresh(true);
///
/// assert_eq!(source.content(), "KEY=V");
/// assert_eq!(source.snapshot().revision, 0);
/// assert!(source.is_auto_refresh());
/// ```
pub struct ConfigurationSource {
    name: String,
    data_id: String,
    group: String,
    config_type: ConfigType,
    auto_refresh: bool,
    hints: OrderingHints,
    origin: Origin,
    property_templates: Properties,
    current: ArcSwap<SourceSnapshot>,
    update_lock: Mutex<()>,
}

impl ConfigurationSource {
    /// Creates a source whose name is derived from identifier and group.
    pub fn new(
        data_id: impl Into<String>,
        group: impl Into<String>,
        config_type: ConfigType,
        content: impl Into<String>,
    ) -> Self {
        let data_id = data_id.into();
        let group = group.into();
        let properties = Properties::new();
        Self {
            name: derive_name(&data_id, &group, &properties),
            data_id,
            group,
            config_type,
            auto_refresh: false,
            hints: OrderingHints::default(),
            origin: Origin::new("<unknown>"),
            property_templates: Properties::new(),
            current: ArcSwap::from_pointee(SourceSnapshot {
                content: content.into(),
                properties,
                revision: 0,
            }),
            update_lock: Mutex::new(()),
        }
    }

    /// Overrides the source name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the auto-refresh flag.
    pub fn with_auto_refresh(mut self, auto_refresh: bool) -> Self {
        self.auto_refresh = auto_refresh;
        self
    }

    /// Sets the ordering hints.
    pub fn with_hints(mut self, hints: OrderingHints) -> Self {
        self.hints = hints;
        self
    }

    /// Sets the declaring origin.
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Records the raw property templates and the values they resolved to.
    ///
    /// Templates are re-resolved against the environment on every refresh.
    pub fn with_properties(mut self, templates: Properties, resolved: Properties) -> Self {
        self.property_templates = templates;
        let snapshot = self.current.load_full();
        self.current.store(Arc::new(SourceSnapshot {
            content: snapshot.content.clone(),
            properties: resolved,
            revision: snapshot.revision,
        }));
        self
    }

    /// Unique name of this document instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved remote document identifier.
    pub fn data_id(&self) -> &str {
        &self.data_id
    }

    /// Resolved group key.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Content type of the document.
    pub fn config_type(&self) -> ConfigType {
        self.config_type
    }

    /// Whether the source follows remote changes.
    pub fn is_auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    /// Ordering hints carried over from the descriptor.
    pub fn hints(&self) -> &OrderingHints {
        &self.hints
    }

    /// Declaration site that produced the source.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Unresolved property templates (global properties merged with overrides).
    pub fn property_templates(&self) -> &Properties {
        &self.property_templates
    }

    /// Current content snapshot; cheap to clone and safe to hold across refreshes.
    pub fn snapshot(&self) -> Arc<SourceSnapshot> {
        self.current.load_full()
    }

    /// Current content as an owned string.
    pub fn content(&self) -> String {
        self.current.load().content.clone()
    }

    /// Swaps in new content and properties, returning the new snapshot.
    ///
    /// Callers serialize through [`ConfigurationSource::lock_updates`]; readers never block.
    pub(crate) fn replace(&self, content: String, properties: Properties) -> Arc<SourceSnapshot> {
        let revision = self.current.load().revision + 1;
        let snapshot = Arc::new(SourceSnapshot {
            content,
            properties,
            revision,
        });
        self.current.store(Arc::clone(&snapshot));
        snapshot
    }

    /// Takes the per-source update lock.
    pub(crate) fn lock_updates(&self) -> MutexGuard<'_, ()> {
        self.update_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for ConfigurationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.current.load();
        f.debug_struct("ConfigurationSource")
            .field("name", &self.name)
            .field("data_id", &self.data_id)
            .field("group", &self.group)
            .field("config_type", &self.config_type)
            .field("auto_refresh", &self.auto_refresh)
            .field("hints", &self.hints)
            .field("origin", &self.origin)
            .field("revision", &snapshot.revision)
            .field("content_len", &snapshot.content.len())
            .finish()
    }
}

/// Derives the stable name `<data_id>|<group>|<hash>` of a source.
///
/// The hash is 64-bit FNV-1a over the sorted `key=value` pairs, so identical inputs
/// always collide and the name survives process restarts.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::{derive_name, Properties};
///
/// let mut props = Properties::new();
/// props.insert("namespace".into(), "dev".into());
///
/// assert_eq!(derive_name("b", "G", &props), derive_name("b", "G", &props.clone()));
/// assert_ne!(derive_name("b", "G", &props), derive_name("b", "G", &Properties::new()));
/// ```
pub fn derive_name(data_id: &str, group: &str, properties: &Properties) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET;
    for (key, value) in properties {
        for byte in key
            .bytes()
            .chain(std::iter::once(b'='))
            .chain(value.bytes())
            .chain(std::iter::once(b'\n'))
        {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(PRIME);
        }
    }
    format!("{}|{}|{:016x}", data_id, group, hash)
}
