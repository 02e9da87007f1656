//! Centralized filename handling for listing entries.
//!
//! Every document in a listing is identified two ways: its full file name
//! (`Apple.txt`) is the display text of the link, and its basename (`Apple`)
//! is the sort key. This module splits names into those parts and provides
//! the collation used to order them.
//!
//! ## Collation
//!
//! Basenames are compared with the Unicode Collation Algorithm using the
//! CLDR root order ([`feruca`]), not by raw code points:
//! - `Apple` < `banana` < `cherry` (case only matters on otherwise equal names)
//! - `apple` < `Apple` (on such a tie, lowercase sorts first)
//! - `Ärger` < `éclair` < `zebra` (accented letters sort with their base letter)
//! - `a` < `ab` (a prefix sorts before its extensions)

use feruca::Collator;
use std::cell::RefCell;
use std::cmp::Ordering;

thread_local! {
    static COLLATOR: RefCell<Collator> = RefCell::new(Collator::default());
}

/// A file name split at its final dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitName<'a> {
    /// Everything before the final dot. The full name when there is no extension.
    pub basename: &'a str,
    /// Lowercased suffix after the final dot. Empty when there is none.
    pub extension: String,
}

/// Split a file name into basename and lowercased extension.
///
/// - `"banana.md"` → basename `"banana"`, extension `"md"`
/// - `"Report.PDF"` → basename `"Report"`, extension `"pdf"`
/// - `"archive.tar.gz"` → basename `"archive.tar"`, extension `"gz"`
/// - `"README"` → basename `"README"`, extension `""`
/// - `".hidden"` → basename `".hidden"`, extension `""` (a leading dot is not a separator)
/// - `"trailing."` → basename `"trailing"`, extension `""`
pub fn split_name(name: &str) -> SplitName<'_> {
    match name.rfind('.') {
        Some(0) | None => SplitName {
            basename: name,
            extension: String::new(),
        },
        Some(dot) => SplitName {
            basename: &name[..dot],
            extension: name[dot + 1..].to_lowercase(),
        },
    }
}

/// Compare two names in human-facing ascending order.
pub fn collate(a: &str, b: &str) -> Ordering {
    COLLATOR.with(|collator| collator.borrow_mut().collate(a, b))
}
