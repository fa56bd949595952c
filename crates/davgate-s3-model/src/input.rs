//! Typed parameters parsed out of S3 requests.

use crate::error::{S3Error, S3ErrorCode};

/// A parsed `Range` header, before the object size is known.
///
/// Resolution against the size happens at read time: the window is clamped
/// to the object's end, and a start at or beyond the size is `InvalidRange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// `bytes=start-` or `bytes=start-end` (inclusive end).
    FromTo { start: u64, end: Option<u64> },
    /// `bytes=-n`: the last `n` bytes.
    Suffix { length: u64 },
}

impl RangeRequest {
    /// Parse a `Range` header value. Only single-range requests are
    /// supported, matching S3.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` for malformed or multi-range headers.
    pub fn parse(header: &str) -> Result<Self, S3Error> {
        let invalid = || S3Error::new(S3ErrorCode::InvalidRange);
        let spec = header.strip_prefix("bytes=").ok_or_else(invalid)?;
        if spec.contains(',') {
            return Err(invalid());
        }

        if let Some(suffix) = spec.strip_prefix('-') {
            let length: u64 = suffix.parse().map_err(|_| invalid())?;
            if length == 0 {
                return Err(invalid());
            }
            return Ok(Self::Suffix { length });
        }

        let (start_str, end_str) = spec.split_once('-').ok_or_else(invalid)?;
        let start: u64 = start_str.parse().map_err(|_| invalid())?;
        let end = if end_str.is_empty() {
            None
        } else {
            let end: u64 = end_str.parse().map_err(|_| invalid())?;
            if end < start {
                return Err(invalid());
            }
            Some(end)
        };
        Ok(Self::FromTo { start, end })
    }

    /// Resolve against the object size into a half-open `(start, length)`
    /// window, clamping the end to the object's last byte.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` when the window starts at or past the size.
    pub fn resolve(&self, size: u64) -> Result<(u64, u64), S3Error> {
        let invalid = || S3Error::new(S3ErrorCode::InvalidRange);
        match *self {
            Self::FromTo { start, end } => {
                if start >= size {
                    return Err(invalid());
                }
                let end = end.map_or(size - 1, |e| e.min(size - 1));
                Ok((start, end - start + 1))
            }
            Self::Suffix { length } => {
                if length >= size {
                    // AWS serves the whole object for an oversized suffix.
                    if size == 0 {
                        return Err(invalid());
                    }
                    return Ok((0, size));
                }
                Ok((size - length, length))
            }
        }
    }
}

/// Listing controls shared by v1 and v2.
///
/// An empty `delimiter` means a fully recursive listing. `"/"` groups one
/// directory level into common prefixes. Any other delimiter disables
/// grouping and falls back to a recursive walk filtered by the raw prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prefix {
    pub prefix: String,
    pub delimiter: String,
}

impl Prefix {
    /// Whether delimiter-based grouping is in effect.
    #[must_use]
    pub fn grouped(&self) -> bool {
        self.delimiter == "/"
    }

    /// Split the prefix at its last `/` into the directory path to read and
    /// the leading name fragment entries must match.
    ///
    /// `photos/2024/im` splits into (`photos/2024`, `im`); `im` splits into
    /// (``, `im`); a trailing slash yields an empty name fragment.
    #[must_use]
    pub fn split_path(&self) -> (&str, &str) {
        match self.prefix.rfind('/') {
            Some(idx) => (&self.prefix[..idx], &self.prefix[idx + 1..]),
            None => ("", self.prefix.as_str()),
        }
    }
}

/// Pagination window applied after the listing walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Exclusive lower bound: the decoded v1 marker, v2 start-after, or the
    /// key recovered from a continuation token.
    pub marker: Option<String>,
    /// Maximum number of contents + common prefixes to return.
    pub max_keys: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            marker: None,
            max_keys: 1000,
        }
    }
}

/// Which listing dialect the client spoke; controls the reply shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListDialect {
    V1,
    V2,
}
