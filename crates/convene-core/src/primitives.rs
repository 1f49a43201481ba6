//! # Engine Primitives
//!
//! Fixed constants for the Convene engine.
//!
//! These values are compiled into the binary. The denylist can be replaced
//! per call through `ResolverOptions`; the limits cannot.

/// Module name prefixes that are never candidates.
///
/// These cover runtime-internal namespaces whose dependency closure is large
/// and never carries components. Matching is case-insensitive; see
/// [`prefix_matches`] for the separator rules.
///
/// Short crate names are listed with their `::` path separator so that user
/// modules such as `Core` or `std-extras` stay eligible.
pub const DEFAULT_DENIED_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "proc_macro::",
    "compiler_builtins",
    "system.",
    "microsoft.",
    "runtime.",
];

/// Characters that may follow a bare prefix for it to match.
pub const PREFIX_SEPARATORS: &[char] = &['.', ':', '-', '_'];

/// Maximum size of a manifest file accepted before parsing (4 MB).
pub const MAX_MANIFEST_SIZE: u64 = 4 * 1024 * 1024;

/// File name looked up in each subdirectory by `DirectorySource`.
pub const MODULE_MANIFEST_FILE: &str = "module.toml";

/// Seed for the plan fingerprint.
pub const FINGERPRINT_SEED: u64 = 0xcbf2_9ce4_8422_2325;

/// Multiplier for the plan fingerprint.
pub const FINGERPRINT_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Check a (lower-cased) module name against one denylist prefix.
///
/// A prefix ending in `.` or `:` matches any name that starts with it.
/// Any other prefix matches the exact name, or the name followed by one of
/// [`PREFIX_SEPARATORS`], so `core` denies `core::fmt` but not `corelib`.
#[must_use]
pub fn prefix_matches(folded_name: &str, prefix: &str) -> bool {
    let prefix = prefix.to_lowercase();
    if prefix.is_empty() {
        return false;
    }
    if prefix.ends_with('.') || prefix.ends_with(':') {
        return folded_name.starts_with(&prefix);
    }
    match folded_name.strip_prefix(prefix.as_str()) {
        Some("") => true,
        Some(rest) => rest.starts_with(PREFIX_SEPARATORS),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_prefix_needs_separator() {
        assert!(prefix_matches("core", "core"));
        assert!(prefix_matches("core::fmt", "core"));
        assert!(prefix_matches("std-extras", "std"));
        assert!(!prefix_matches("corelib", "core"));
        assert!(!prefix_matches("acme.core", "core"));
    }

    #[test]
    fn dotted_prefix_matches_namespace() {
        assert!(prefix_matches("system.runtime", "system."));
        assert!(prefix_matches("microsoft.extensions.logging", "Microsoft."));
        assert!(!prefix_matches("systemd", "system."));
    }

    #[test]
    fn default_list_spares_user_modules() {
        let denied = |name: &str| {
            DEFAULT_DENIED_PREFIXES
                .iter()
                .any(|prefix| prefix_matches(name, prefix))
        };

        assert!(denied("std::io"));
        assert!(denied("core::fmt"));
        assert!(denied("compiler_builtins"));
        assert!(denied("system.runtime"));
        assert!(!denied("core"));
        assert!(!denied("core-utils"));
        assert!(!denied("core_lib"));
        assert!(!denied("std-extras"));
        assert!(!denied("alloc.pool"));
    }

    #[test]
    fn empty_prefix_never_matches() {
        assert!(!prefix_matches("anything", ""));
    }
}
