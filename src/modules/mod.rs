//! Built-in modules.
//!
//! - [`core`] - prefix handling, command routing and the `help`/`reload` commands
//! - [`permissions`] - the `grant`/`revoke` commands
//!
//! Registration order matters: command lookup prefers later modules, so a
//! descriptor appended after these can shadow their commands.

pub mod core;
pub mod permissions;

use crate::bot::registry::ModuleDescriptor;

pub fn default_descriptors() -> Vec<ModuleDescriptor> {
    vec![self::core::descriptor(), self::permissions::descriptor()]
}
