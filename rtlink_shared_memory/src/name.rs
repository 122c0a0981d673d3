//! Segment naming.
//!
//! A segment is identified by one flat POSIX shared memory name composed from
//! an optional namespace, a module and an interface:
//!
//! ```text
//! /<module>__<interface>
//! /<namespace>__<module>__<interface>
//! ```
//!
//! The composed name has exactly one `/` (the leading one) and is at most
//! [`SEGMENT_NAME_MAX_LEN`] bytes long.

use crate::error::{ShmError, ShmResult};
use rtlink_common::consts::{SEGMENT_NAME_MAX_LEN, SEGMENT_NAME_PREFIX, SEGMENT_NAME_SEPARATOR};
use std::fmt;

/// Validated shared memory segment name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentName(String);

impl SegmentName {
    /// Compose a name from its parts. An empty `namespace` is omitted.
    pub fn new(namespace: &str, module: &str, interface: &str) -> ShmResult<Self> {
        let raw = if namespace.is_empty() {
            format!("{SEGMENT_NAME_PREFIX}{module}{SEGMENT_NAME_SEPARATOR}{interface}")
        } else {
            format!(
                "{SEGMENT_NAME_PREFIX}{namespace}{SEGMENT_NAME_SEPARATOR}{module}{SEGMENT_NAME_SEPARATOR}{interface}"
            )
        };
        Self::parse(raw)
    }

    /// Validate an already composed name.
    pub fn parse(raw: impl Into<String>) -> ShmResult<Self> {
        let raw = raw.into();
        validate(&raw)?;
        Ok(Self(raw))
    }

    /// The composed name, including the leading `/`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a trusted, system-internal suffix in place.
    ///
    /// The suffix is not re-validated.
    pub fn append(&mut self, suffix: &str) {
        self.0.push_str(suffix);
    }

    /// Copy of this name with `suffix` appended. See [`SegmentName::append`].
    pub fn with_suffix(&self, suffix: &str) -> Self {
        let mut derived = self.clone();
        derived.append(suffix);
        derived
    }

    /// Interface component (text after the last separator).
    pub fn interface_name(&self) -> ShmResult<&str> {
        interface_name_from_segment_name(&self.0)
    }
}

fn validate(raw: &str) -> ShmResult<()> {
    let malformed = |reason| ShmError::MalformedName {
        name: raw.to_string(),
        reason,
    };

    if raw.len() > SEGMENT_NAME_MAX_LEN {
        return Err(malformed("longer than 255 bytes"));
    }
    let Some(body) = raw.strip_prefix(SEGMENT_NAME_PREFIX) else {
        return Err(malformed("must start with '/'"));
    };
    if body.is_empty() {
        return Err(malformed("empty name"));
    }
    if body.contains(SEGMENT_NAME_PREFIX) {
        return Err(malformed("only the leading '/' is allowed"));
    }
    if body.contains('\0') {
        return Err(malformed("contains NUL"));
    }
    Ok(())
}

/// Decode the interface component of a raw `/<module>__<interface>` name.
///
/// Namespaced names resolve to their last component as well.
pub fn interface_name_from_segment_name(raw: &str) -> ShmResult<&str> {
    let decode = |reason| ShmError::Decode {
        record: raw.to_string(),
        reason,
    };

    let body = raw
        .strip_prefix(SEGMENT_NAME_PREFIX)
        .ok_or_else(|| decode("missing leading '/'"))?;
    let (prefix, interface) = body
        .rsplit_once(SEGMENT_NAME_SEPARATOR)
        .ok_or_else(|| decode("expected '/<module>__<segment>'"))?;
    if prefix.is_empty() || interface.is_empty() {
        return Err(decode("expected '/<module>__<segment>'"));
    }
    Ok(interface)
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SegmentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
