// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for state lookups and event handlers.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

/// Look up by exact id or, failing that, by a unique id prefix.
///
/// Prefixes match either the hyphenated or the simple (dashless) form.
pub(crate) fn find_by_prefix<'a, K, V>(map: &'a HashMap<K, V>, prefix: &str) -> Option<&'a V>
where
    K: Display + Eq + Hash,
{
    let needle = prefix.replace('-', "");
    if needle.is_empty() {
        return None;
    }
    let mut matches = map.iter().filter(|(k, _)| k.to_string().replace('-', "").starts_with(&needle));
    match (matches.next(), matches.next()) {
        (Some((_, v)), None) => Some(v),
        _ => None,
    }
}

/// Insert `value` unless `key` is already present.
pub(crate) fn insert_absent<K: Eq + Hash, V>(map: &mut HashMap<K, V>, key: K, value: V) {
    map.entry(key).or_insert(value);
}
