// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declaration-site provider trait definition.

use crate::domain::{DeclarationSite, Result};

/// Enumerates the declaration sites known to the application.
///
/// Any declaration mechanism can implement this: code-based registration, a structured
/// file (see `YamlDescriptorProvider`), or generated code.
///
/// # Examples
///
/// ```rust
/// use cfgweave::domain::{DeclarationSite, Descriptor};
/// use cfgweave::ports::DescriptorProvider;
///
/// let sites = vec![DeclarationSite::new("app::Boot").declare(Descriptor::new(["a.yml"]))];
/// assert_eq!(sites.sites().unwrap().len(), 1);
/// ```
pub trait DescriptorProvider {
    /// Returns every declaration site, in discovery order.
    fn sites(&self) -> Result<Vec<DeclarationSite>>;
}

impl DescriptorProvider for Vec<DeclarationSite> {
    fn sites(&self) -> Result<Vec<DeclarationSite>> {
        Ok(self.clone())
    }
}

impl DescriptorProvider for [DeclarationSite] {
    fn sites(&self) -> Result<Vec<DeclarationSite>> {
        Ok(self.to_vec())
    }
}
