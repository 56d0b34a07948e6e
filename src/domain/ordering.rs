// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns partial ordering hints into one total layer order.
//!
//! Sources are kept in insertion order. `first` sources form a leading tier; `before`
//! and `after` hints add edges to a precedence graph, and a stable topological sort
//! emits the ready source with the lowest `(tier, insertion index)` at each step.

use crate::domain::errors::{ConfigError, Result};
use crate::domain::source::ConfigurationSource;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Accumulates loaded sources and computes their resolved order.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::{ConfigType, ConfigurationSource, OrderingHints, OrderingResolver};
/// use std::sync::Arc;
///
/// let source = |id: &str, hints: OrderingHints| {
///     Arc::new(ConfigurationSource::new(id, "G", ConfigType::Properties, "k=v").with_name(id).with_hints(hints))
/// };
///
/// let mut resolver = OrderingResolver::new();
/// resolver.add(source("A", OrderingHints { before: Some("C".into()), ..Default::default() }));
/// resolver.add(source("B", OrderingHints { first: true, ..Default::default() }));
/// resolver.add(source("C", OrderingHints { after: Some("A".into()), ..Default::default() }));
///
/// let names: Vec<_> = resolver.resolve().unwrap().iter().map(|s| s.name().to_string()).collect();
/// assert_eq!(names, ["B", "A", "C"]);
/// ```
#[derive(Debug, Default)]
pub struct OrderingResolver {
    sources: Vec<Arc<ConfigurationSource>>,
}

impl OrderingResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source.
    ///
    /// A source whose name is already present replaces the earlier one at its original
    /// insertion position. Returns `true` when the name was new.
    pub fn add(&mut self, source: Arc<ConfigurationSource>) -> bool {
        match self.sources.iter().position(|s| s.name() == source.name()) {
            Some(index) => {
                debug!(name = source.name(), "replacing source with the same name");
                self.sources[index] = source;
                false
            }
            None => {
                self.sources.push(source);
                true
            }
        }
    }

    /// Number of accumulated sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns `true` if no source has been added.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Looks up a source by name.
    pub fn get(&self, name: &str) -> Option<&Arc<ConfigurationSource>> {
        self.sources.iter().find(|s| s.name() == name)
    }

    /// Sources in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ConfigurationSource>> {
        self.sources.iter()
    }

    /// Computes the total order over every accumulated source.
    ///
    /// Calling this repeatedly over the same set gives the same answer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OrderingConflict`] when a hint refers to no known source,
    /// refers to its own source, places a non-`first` source ahead of a `first` one,
    /// or when the hints form a cycle.
    pub fn resolve(&self) -> Result<Vec<Arc<ConfigurationSource>>> {
        let count = self.sources.len();
        let tiers: Vec<u8> = self
            .sources
            .iter()
            .map(|s| if s.hints().first { 0 } else { 1 })
            .collect();

        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (index, source) in self.sources.iter().enumerate() {
            let hints = source.hints();
            if let Some(target) = hints.before.as_deref() {
                for other in self.targets(index, target)? {
                    self.check_tiers(&tiers, index, other)?;
                    successors[index].push(other);
                    predecessors[other].push(index);
                }
            }
            if let Some(target) = hints.after.as_deref() {
                for other in self.targets(index, target)? {
                    self.check_tiers(&tiers, other, index)?;
                    successors[other].push(index);
                    predecessors[index].push(other);
                }
            }
        }

        let mut pending: Vec<usize> = predecessors.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<(u8, usize)>> = (0..count)
            .filter(|&i| pending[i] == 0)
            .map(|i| Reverse((tiers[i], i)))
            .collect();

        let mut ordered = Vec::with_capacity(count);
        while let Some(Reverse((_, index))) = ready.pop() {
            ordered.push(Arc::clone(&self.sources[index]));
            for &next in &successors[index] {
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.push(Reverse((tiers[next], next)));
                }
            }
        }

        if ordered.len() < count {
            let cycle = find_cycle(&pending, &predecessors);
            return Err(ConfigError::ordering_conflict(
                cycle.into_iter().map(|i| self.sources[i].name().to_string()),
                "before/after hints form a cycle",
            ));
        }

        debug!(sources = count, "resolved source order");
        Ok(ordered)
    }

    /// Indices matched by a hint target: the source with that name, or else every
    /// source with that document identifier.
    fn targets(&self, index: usize, target: &str) -> Result<Vec<usize>> {
        let referrer = self.sources[index].name();

        if let Some(found) = self.sources.iter().position(|s| s.name() == target) {
            if found == index {
                return Err(ConfigError::ordering_conflict(
                    [referrer],
                    format!("source refers to itself via '{target}'"),
                ));
            }
            return Ok(vec![found]);
        }

        let by_id: Vec<usize> = self
            .sources
            .iter()
            .enumerate()
            .filter(|(_, s)| s.data_id() == target)
            .map(|(i, _)| i)
            .collect();

        let others: Vec<usize> = by_id.iter().copied().filter(|&i| i != index).collect();
        if !others.is_empty() {
            return Ok(others);
        }
        let message = if by_id.is_empty() {
            format!("hint target '{target}' does not name a known source")
        } else {
            format!("source refers to itself via '{target}'")
        };
        Err(ConfigError::ordering_conflict([referrer], message))
    }

    /// Rejects an edge `ahead -> behind` that would lift a source over the `first` tier.
    fn check_tiers(&self, tiers: &[u8], ahead: usize, behind: usize) -> Result<()> {
        if tiers[ahead] > tiers[behind] {
            return Err(ConfigError::ordering_conflict(
                [self.sources[ahead].name(), self.sources[behind].name()],
                "hint places a source ahead of a `first` source",
            ));
        }
        Ok(())
    }
}

/// Walks unemitted predecessors until a node repeats and returns that cycle,
/// sorted by insertion index.
fn find_cycle(pending: &[usize], predecessors: &[Vec<usize>]) -> Vec<usize> {
    let Some(start) = pending.iter().position(|&p| p > 0) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut current = start;
    loop {
        let Some(&previous) = predecessors[current].iter().find(|&&p| pending[p] > 0) else {
            return path;
        };
        if let Some(at) = path.iter().position(|&n| n == previous) {
            let mut cycle = path.split_off(at);
            cycle.sort_unstable();
            return cycle;
        }
        path.push(previous);
        current = previous;
    }
}
