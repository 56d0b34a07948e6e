// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered-configuration consumer trait definition.

use crate::domain::ConfigurationSource;
use std::sync::Arc;

/// Receives the ordered sources and later content-change notifications.
///
/// Index 0 of the installed slice is the highest-priority source. `source_changed`
/// may be called from a store's notification thread.
pub trait LayeredConfigConsumer: Send + Sync {
    /// Replaces the installed sources with `sources`, in priority order.
    fn install(&self, sources: &[Arc<ConfigurationSource>]);

    /// Signals that `source` has new current content.
    fn source_changed(&self, source: &ConfigurationSource);
}

impl<C: LayeredConfigConsumer + ?Sized> LayeredConfigConsumer for Arc<C> {
    fn install(&self, sources: &[Arc<ConfigurationSource>]) {
        (**self).install(sources)
    }

    fn source_changed(&self, source: &ConfigurationSource) {
        (**self).source_changed(source)
    }
}
