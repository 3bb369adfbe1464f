//! CDN path patterns.
//!
//! Only three shapes exist in a plan:
//!
//! ```text
//! favicon.ico   Exact   one file at the assets root
//! assets/*      Prefix  everything below a top-level directory
//! *             CatchAll the default behavior
//! ```
//!
//! Names are stored decoded. [`PathPattern::to_cdn`] percent-encodes each
//! segment with the `encodeURIComponent` character set used by the static
//! request transform, so a file named `a b.txt` is matched as `a%20b.txt`.

use std::fmt;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Serialize, Serializer};

/// Characters `encodeURIComponent` leaves untouched are the only ones kept.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathPattern {
    /// A single file at the assets root.
    Exact(String),
    /// A top-level directory and everything below it.
    Prefix(String),
    /// Matches every request.
    CatchAll,
}

impl PathPattern {
    pub fn file(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self::Prefix(name.into())
    }

    #[inline]
    pub const fn is_catch_all(&self) -> bool {
        matches!(self, Self::CatchAll)
    }

    /// The decoded name (`""` for the catch-all).
    pub fn name(&self) -> &str {
        match self {
            Self::Exact(name) | Self::Prefix(name) => name,
            Self::CatchAll => "",
        }
    }

    /// Whether a request path (decoded, with or without leading `/`) matches.
    pub fn matches(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        match self {
            Self::Exact(name) => path == name,
            Self::Prefix(dir) => path
                .strip_prefix(dir.as_str())
                .is_some_and(|rest| rest.starts_with('/')),
            Self::CatchAll => true,
        }
    }

    /// Whether `self`, evaluated first, accepts every path `later` accepts.
    ///
    /// When true, `later` can never be selected under first-match-wins.
    pub fn shadows(&self, later: &Self) -> bool {
        match (self, later) {
            (Self::CatchAll, _) => true,
            (_, Self::CatchAll) => false,
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Exact(_), Self::Prefix(_)) => false,
            (Self::Prefix(_), Self::Exact(name)) => self.matches(name),
            (Self::Prefix(a), Self::Prefix(b)) => a == b || self.matches(b),
        }
    }

    /// Pattern as sent to the CDN, each segment percent-encoded.
    pub fn to_cdn(&self) -> String {
        let encode = |name: &str| {
            name.split('/')
                .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
                .collect::<Vec<_>>()
                .join("/")
        };
        match self {
            Self::Exact(name) => encode(name),
            Self::Prefix(dir) => format!("{}/*", encode(dir)),
            Self::CatchAll => "*".to_string(),
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::Prefix(dir) => write!(f, "{dir}/*"),
            Self::CatchAll => f.write_str("*"),
        }
    }
}

impl Serialize for PathPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(PathPattern::file("favicon.ico").to_string(), "favicon.ico");
        assert_eq!(PathPattern::dir("assets").to_string(), "assets/*");
        assert_eq!(PathPattern::CatchAll.to_string(), "*");
    }

    #[test]
    fn test_matches() {
        let assets = PathPattern::dir("assets");
        assert!(assets.matches("/assets/app.js"));
        assert!(assets.matches("assets/img/logo.png"));
        assert!(!assets.matches("/assets"));
        assert!(!assets.matches("/assets-old/app.js"));

        let favicon = PathPattern::file("favicon.ico");
        assert!(favicon.matches("/favicon.ico"));
        assert!(!favicon.matches("/favicon.ico.map"));

        assert!(PathPattern::CatchAll.matches("/anything/at/all"));
    }

    #[test]
    fn test_shadows() {
        let assets = PathPattern::dir("assets");
        let img = PathPattern::dir("assets/img");
        let logo = PathPattern::file("assets/logo.png");

        // broad before specific: specific is unreachable
        assert!(assets.shadows(&img));
        assert!(assets.shadows(&logo));
        assert!(assets.shadows(&assets));

        // specific before broad: intentional ordering
        assert!(!img.shadows(&assets));
        assert!(!logo.shadows(&assets));

        // siblings never collide
        assert!(!assets.shadows(&PathPattern::dir("assets-old")));
        assert!(!PathPattern::file("assets").shadows(&assets));

        assert!(PathPattern::CatchAll.shadows(&logo));
        assert!(!assets.shadows(&PathPattern::CatchAll));
    }

    #[test]
    fn test_to_cdn_encodes_segments() {
        assert_eq!(PathPattern::file("a b.txt").to_cdn(), "a%20b.txt");
        assert_eq!(PathPattern::dir("_next").to_cdn(), "_next/*");
        assert_eq!(PathPattern::file("100%.html").to_cdn(), "100%25.html");
        assert_eq!(PathPattern::CatchAll.to_cdn(), "*");
    }
}
