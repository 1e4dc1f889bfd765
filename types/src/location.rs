//! Source spans and Kakoune selection descriptors.

use std::str::FromStr;

/// A span in a source file as reported by `:loc-at` and `:uses`.
///
/// A "go to definition" result is a degenerate range (a single point);
/// `:uses` yields many, possibly across files. All coordinates are
/// 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationRange {
    pub filename: String,
    pub line1: u32,
    pub col1: u32,
    pub line2: u32,
    pub col2: u32,
}

/// A Kakoune selection descriptor: `line1.col1,line2.col2`.
///
/// This is the shape of `$kak_selection_desc`, used to address a point
/// or span in the current buffer when querying GHCi.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub line1: u32,
    pub col1: u32,
    pub line2: u32,
    pub col2: u32,
}

impl From<&LocationRange> for Selection {
    fn from(range: &LocationRange) -> Self {
        Self {
            line1: range.line1,
            col1: range.col1,
            line2: range.line2,
            col2: range.col2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("malformed selection descriptor: {0:?}")]
pub struct ParseSelectionError(pub String);

impl FromStr for Selection {
    type Err = ParseSelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSelectionError(s.to_string());

        let (anchor, cursor) = s.split_once(',').ok_or_else(err)?;
        let (line1, col1) = anchor.split_once('.').ok_or_else(err)?;
        let (line2, col2) = cursor.split_once('.').ok_or_else(err)?;

        Ok(Self {
            line1: line1.parse().map_err(|_| err())?,
            col1: col1.parse().map_err(|_| err())?,
            line2: line2.parse().map_err(|_| err())?,
            col2: col2.parse().map_err(|_| err())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection_desc() {
        let sel: Selection = "3.17,3.18".parse().unwrap();
        assert_eq!(
            sel,
            Selection {
                line1: 3,
                col1: 17,
                line2: 3,
                col2: 18
            }
        );
    }

    #[test]
    fn test_parse_selection_point() {
        let sel: Selection = "10.1,10.1".parse().unwrap();
        assert_eq!(sel.line1, 10);
        assert_eq!(sel.col2, 1);
    }

    #[test]
    fn test_parse_selection_rejects_garbage() {
        assert!("".parse::<Selection>().is_err());
        assert!("3.17".parse::<Selection>().is_err());
        assert!("3,17".parse::<Selection>().is_err());
        assert!("a.b,c.d".parse::<Selection>().is_err());
        assert!("3.17,3.".parse::<Selection>().is_err());
    }

    #[test]
    fn test_parse_selection_error_carries_input() {
        let err = "bogus".parse::<Selection>().unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }
}
