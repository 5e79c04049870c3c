//! Generic traits for parsing cgroup v1 accounting files into structured types.
//!
//! - [`KeyValueStat`]: multi-line `key value` files such as `cpuacct.stat`.
//!   Reading stops as soon as every known key has been seen.
//! - [`SingleLineStat`]: files holding one number, such as `memory.usage_in_bytes`.
//!
//! # Example: Implementing `KeyValueStat`
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::LazyLock;
//! use yarn_cgroup_usage::cgroup::stats::KeyValueStat;
//!
//! #[derive(Default)]
//! struct MyStat {
//!     foo: u64,
//! }
//!
//! static HANDLERS: LazyLock<HashMap<&'static str, fn(&mut MyStat, u64)>> =
//!     LazyLock::new(|| {
//!         let mut map: HashMap<&'static str, fn(&mut MyStat, u64)> = HashMap::new();
//!         map.insert("foo", |stat, v| stat.foo = v);
//!         map
//!     });
//!
//! impl KeyValueStat for MyStat {
//!     const ALLOW_DUPLICATE_KEYS: bool = false;
//!
//!     fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
//!         &HANDLERS
//!     }
//! }
//!
//! let stat = MyStat::from_reader(&mut "bar 1\nfoo 2\n".as_bytes()).unwrap();
//! assert_eq!(stat.foo, 2);
//! ```

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::ops::ControlFlow;

use super::StatParseError;
use crate::fsutil;

/// A trait for parsing `key value` style accounting files.
///
/// Implementors define the set of known keys and how to apply their values.
/// Lines with unknown keys, and lines that are not `key value` pairs, are
/// ignored.
pub trait KeyValueStat: Default
where
    Self: 'static,
{
    /// If `false`, a key appearing twice is an error.
    const ALLOW_DUPLICATE_KEYS: bool;

    /// Known field names and the functions applying a parsed value to `Self`.
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)>;

    /// Parses a key-value formatted buffer.
    ///
    /// When duplicates are not allowed, reading stops once every known key
    /// has been seen, leaving the rest of the input unread.
    ///
    /// # Errors
    ///
    /// Returns [`StatParseError::InvalidKeyValue`] if a known key has a value
    /// that is not a `u64`, [`StatParseError::DuplicateField`] for a repeated
    /// key, and [`StatParseError::Io`] if reading fails.
    fn from_reader<R: BufRead>(buf: &mut R) -> Result<Self, StatParseError> {
        let mut stat = Self::default();
        let handlers = Self::field_handlers();
        let mut seen_keys = HashSet::with_capacity(handlers.len());

        // Break(None) ends early once all keys are known, Break(Some) fails.
        let stopped = fsutil::for_each_line(buf, |line, lineno| {
            let mut parts = line.split_whitespace();
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                return ControlFlow::Continue(());
            };
            if let Err(err) = Self::parse_and_set(key, val, &mut stat, lineno, &mut seen_keys) {
                return ControlFlow::Break(Some(err));
            }
            if !Self::ALLOW_DUPLICATE_KEYS && seen_keys.len() == handlers.len() {
                return ControlFlow::Break(None);
            }
            ControlFlow::Continue(())
        })?;

        match stopped.flatten() {
            Some(err) => Err(err),
            None => Ok(stat),
        }
    }

    /// Parses a single key-value pair and applies it through the field handler.
    ///
    /// Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StatParseError::InvalidKeyValue`] if the value cannot be parsed
    /// as `u64`, or [`StatParseError::DuplicateField`] if the key appears more
    /// than once and duplicates are disallowed.
    fn parse_and_set(
        key: &str,
        val: &str,
        stat: &mut Self,
        lineno: usize,
        seen_keys: &mut HashSet<&'static str>,
    ) -> Result<(), StatParseError> {
        let Some((k, handler)) = Self::field_handlers().get_key_value(key) else {
            return Ok(());
        };
        let parsed = val
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidKeyValue {
                key: key.to_string(),
                value: val.to_string(),
                line: lineno,
                source,
            })?;
        if !seen_keys.insert(*k) && !Self::ALLOW_DUPLICATE_KEYS {
            return Err(StatParseError::DuplicateField {
                field: key.to_string(),
                line: lineno,
            });
        }
        handler(stat, parsed);
        Ok(())
    }
}

/// A trait for parsing single-value statistics such as `memory.usage_in_bytes`.
pub trait SingleLineStat: Sized {
    /// Builds `Self` from the value on the first line.
    fn from_value(value: u64) -> Self;

    /// Parses the first line of `buf`; any further lines are not read.
    ///
    /// # Errors
    ///
    /// Returns [`StatParseError::MissingValue`] for empty input,
    /// [`StatParseError::InvalidValue`] if the first line is not a `u64`, and
    /// [`StatParseError::Io`] if reading fails.
    fn from_reader<R: BufRead>(buf: &mut R) -> Result<Self, StatParseError> {
        let first =
            fsutil::for_each_line(buf, |line, _| ControlFlow::Break(line.trim().to_owned()))?;
        let value = first.ok_or(StatParseError::MissingValue)?;
        let parsed = value
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidValue {
                value: value.clone(),
                line: 1,
                source,
            })?;
        Ok(Self::from_value(parsed))
    }
}
