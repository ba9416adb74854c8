//! Symbolic, redefinable font names

use std::collections::HashMap;

use tracing::{info, trace};

use crate::attributes::FontAttributes;
use crate::error::{FontError, FontResult};

#[derive(Debug, Clone, PartialEq)]
pub struct NamedFont {
    pub attributes: FontAttributes,
    /// Font objects currently built from this name.
    pub ref_count: usize,
    pub delete_pending: bool,
}

/// What `create` did with the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Created {
    New,
    /// A delete-pending entry came back to life. Its dependents must be
    /// rebuilt.
    Revived,
}

/// Per-environment table of named fonts.
///
/// An entry deleted while font objects still use it stays behind as
/// delete-pending: it keeps serving those objects but is invisible to
/// lookups, and disappears when the last one is released.
#[derive(Debug, Default)]
pub struct NamedFontRegistry {
    entries: HashMap<String, NamedFont>,
}

impl NamedFontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, name: &str, attributes: FontAttributes) -> FontResult<Created> {
        if let Some(entry) = self.entries.get_mut(name) {
            if !entry.delete_pending {
                return Err(FontError::NamedFontExists {
                    name: name.to_string(),
                });
            }
            info!("Named font {:?} revived as {}", name, attributes);
            entry.attributes = attributes;
            entry.delete_pending = false;
            return Ok(Created::Revived);
        }
        info!("Named font {:?} created as {}", name, attributes);
        self.entries.insert(
            name.to_string(),
            NamedFont {
                attributes,
                ref_count: 0,
                delete_pending: false,
            },
        );
        Ok(Created::New)
    }

    pub fn delete(&mut self, name: &str) -> FontResult<()> {
        let entry = self.live_mut(name)?;
        if entry.ref_count > 0 {
            trace!("Named font {:?} still has {} users", name, entry.ref_count);
            entry.delete_pending = true;
        } else {
            self.entries.remove(name);
        }
        Ok(())
    }

    /// Applies option-form updates to a live name.
    pub fn configure<S: AsRef<str>>(&mut self, name: &str, options: &[S]) -> FontResult<()> {
        let entry = self.live_mut(name)?;
        let mut attributes = entry.attributes.clone();
        attributes.apply_options(options)?;
        info!("Named font {:?} reconfigured as {}", name, attributes);
        entry.attributes = attributes;
        Ok(())
    }

    /// Attributes of a live (not delete-pending) name.
    pub fn lookup(&self, name: &str) -> Option<&FontAttributes> {
        self.entries
            .get(name)
            .filter(|e| !e.delete_pending)
            .map(|e| &e.attributes)
    }

    /// Attributes of any entry, pending or not. Used to rebuild existing
    /// dependents.
    pub fn attributes(&self, name: &str) -> Option<&FontAttributes> {
        self.entries.get(name).map(|e| &e.attributes)
    }

    pub fn get(&self, name: &str) -> Option<&NamedFont> {
        self.entries.get(name)
    }

    /// Live names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.delete_pending)
            .map(|(n, _)| n.clone())
            .collect();
        names.sort();
        names
    }

    pub fn retain(&mut self, name: &str) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.ref_count += 1;
        }
    }

    /// Drops one user. Returns true when a pending entry was purged.
    pub fn release(&mut self, name: &str) -> bool {
        let Some(entry) = self.entries.get_mut(name) else {
            return false;
        };
        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count == 0 && entry.delete_pending {
            self.entries.remove(name);
            return true;
        }
        false
    }

    fn live_mut(&mut self, name: &str) -> FontResult<&mut NamedFont> {
        self.entries
            .get_mut(name)
            .filter(|e| !e.delete_pending)
            .ok_or_else(|| FontError::UnknownNamedFont {
                name: name.to_string(),
            })
    }
}
