//! Mapping between logical snapshot names and their on-disk and on-object variants.

use crate::constants::naming::{
    COMPRESSED_EXTENSION, NAME_PREFIX_PATTERN, RECURRING_PATTERN, SCHEDULED_KEY_PATTERN,
    SCHEDULED_SUFFIX, TIMESTAMP_SEPARATOR,
};
use crate::errors::{BackupError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static NAME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NAME_PREFIX_PATTERN).expect("valid name prefix pattern"));
static RECURRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(RECURRING_PATTERN).expect("valid recurring pattern"));
static SCHEDULED_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SCHEDULED_KEY_PATTERN).expect("valid scheduled key pattern"));

/// Strip the last extension segment, if the final path component has one
pub fn decompressed_name(name: &str) -> &str {
    let tail_start = name.rfind('/').map(|i| i + 1).unwrap_or(0);
    match name[tail_start..].rfind('.') {
        Some(dot) => &name[..tail_start + dot],
        None => name,
    }
}

pub fn is_compressed(name: &str) -> bool {
    name.strip_suffix(COMPRESSED_EXTENSION)
        .is_some_and(|rest| rest.ends_with('.'))
}

pub fn compressed_name(name: &str) -> String {
    format!("{}.{}", name, COMPRESSED_EXTENSION)
}

/// Candidate transformations applied, in order, to a listed key
const KEY_TRANSFORMS: [KeyTransform; 2] = [KeyTransform::Literal, KeyTransform::PercentDecoded];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransform {
    Literal,
    PercentDecoded,
}

impl KeyTransform {
    fn apply<'a>(&self, key: &'a str) -> Option<Cow<'a, str>> {
        match self {
            KeyTransform::Literal => Some(Cow::Borrowed(key)),
            KeyTransform::PercentDecoded => query_unescape(key),
        }
    }
}

/// Query-string unescaping: `+` becomes a space, `%XX` is decoded
fn query_unescape(key: &str) -> Option<Cow<'_, str>> {
    let plus_decoded: Cow<'_, str> = if key.contains('+') {
        Cow::Owned(key.replace('+', " "))
    } else {
        Cow::Borrowed(key)
    };
    let decoded = percent_decode_str(&plus_decoded).decode_utf8().ok()?;
    Some(Cow::Owned(decoded.into_owned()))
}

/// A listed key matched against a requested logical name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    /// Key to pass to a GET (decoded form when matched after unescaping)
    pub key: String,
    pub transform: KeyTransform,
}

impl ResolvedKey {
    pub fn is_compressed(&self) -> bool {
        is_compressed(&self.key)
    }
}

/// Match one listed key against `requested` (`folder/name`, no extension)
pub fn match_key(candidate: &str, requested: &str) -> Option<ResolvedKey> {
    KEY_TRANSFORMS.iter().find_map(|transform| {
        let key = transform.apply(candidate)?;
        (decompressed_name(&key) == requested).then(|| ResolvedKey {
            key: key.into_owned(),
            transform: *transform,
        })
    })
}

/// First candidate whose decompressed name equals `requested`, literally or unescaped
pub fn resolve_ambiguous_prefix<I, S>(candidates: I, requested: &str) -> Result<ResolvedKey>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidates
        .into_iter()
        .find_map(|candidate| match_key(candidate.as_ref(), requested))
        .ok_or_else(|| BackupError::NotFound(format!("snapshot [{}]", requested)))
}

/// Leading cluster identifier (`c-<id>-`), or `None` when the name has none
pub fn name_prefix(name: &str) -> Option<&str> {
    NAME_PREFIX.find(name).map(|m| m.as_str())
}

/// Whether the name carries the scheduler's recurring marker
pub fn is_recurring_snapshot(name: &str) -> bool {
    RECURRING.is_match(name)
}

/// Whether an object key looks like a scheduler-produced snapshot
pub fn is_scheduled_key(key: &str) -> bool {
    SCHEDULED_KEY.is_match(key)
}

/// `<RFC3339>_etcd` for a scheduled tick
pub fn scheduled_name(tick: DateTime<Utc>) -> String {
    format!(
        "{}{}",
        tick.to_rfc3339_opts(SecondsFormat::Secs, true),
        SCHEDULED_SUFFIX
    )
}

/// Timestamp embedded before the first `_` of a snapshot name
pub fn parse_snapshot_time(name: &str) -> Result<DateTime<Utc>> {
    let (stamp, _) = name
        .split_once(TIMESTAMP_SEPARATOR)
        .ok_or_else(|| BackupError::Parse {
            name: name.to_string(),
            reason: "missing timestamp separator".to_string(),
        })?;

    DateTime::parse_from_rfc3339(stamp)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| BackupError::Parse {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

/// Object key for `file_name` under an optional folder
pub fn object_key(folder: &str, file_name: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", folder, file_name)
    }
}

/// Key with the folder prefix removed
pub fn strip_folder<'a>(folder: &str, key: &'a str) -> &'a str {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() {
        return key;
    }
    key.strip_prefix(folder)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(key)
}

/// Final path component of a key
pub fn base_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Snapshot name reduced to its final path component
///
/// Every local path is derived from this, so it never points outside the
/// backup directory. Empty names and `.`, `..`, `/` are rejected.
pub fn snapshot_name(requested: &str) -> Result<&str> {
    let name = base_name(requested.trim_end_matches('/'));
    if name.is_empty() || name == "." || name == ".." {
        return Err(BackupError::config(format!(
            "invalid snapshot name [{}]",
            requested
        )));
    }
    Ok(name)
}
