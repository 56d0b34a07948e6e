// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flattens the declarations of a site into one descriptor sequence.

use crate::domain::{Declaration, DeclarationSite, Descriptor};

/// Returns the descriptors attached to `site` in declaration order.
///
/// Single descriptors and groups are flattened the same way; a site with nothing
/// attached yields an empty vector.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::{DeclarationSite, Descriptor};
/// use cfgweave::service::extract;
///
/// let site = DeclarationSite::new("app::Boot")
///     .declare(Descriptor::new(["a"]))
///     .declare(vec![Descriptor::new(["b"]), Descriptor::new(["c"])]);
///
/// let ids: Vec<_> = extract(&site).iter().map(|d| d.data_ids[0].as_str()).collect();
/// assert_eq!(ids, ["a", "b", "c"]);
/// ```
pub fn extract(site: &DeclarationSite) -> Vec<&Descriptor> {
    site.declarations
        .iter()
        .flat_map(|declaration| match declaration {
            Declaration::Single(descriptor) => std::slice::from_ref(descriptor),
            Declaration::Group(group) => group.sources.as_slice(),
        })
        .collect()
}
