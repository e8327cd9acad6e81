use std::path::Path;

use snaprestore_castore::Node;

use crate::sanitize::has_path_prefix;

/// The answer of a selection filter for a single snapshot entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// The entry itself is restored.
    pub selected: bool,
    /// Children of this entry may be selected, so the walker descends into it.
    pub may_descend: bool,
}

impl Selection {
    pub const ALL: Selection = Selection {
        selected: true,
        may_descend: true,
    };

    pub const NONE: Selection = Selection {
        selected: false,
        may_descend: false,
    };
}

/// Decides for each location, candidate target path and node whether it is
/// restored.
pub type SelectFilter = Box<dyn Fn(&str, &Path, &Node) -> Selection + Send + Sync>;

pub fn select_all() -> SelectFilter {
    Box::new(|_, _, _| Selection::ALL)
}

/// Selects everything at or below one of the given locations.
/// Their parents are descended into, but not selected themselves.
pub fn include_prefixes(prefixes: Vec<String>) -> SelectFilter {
    Box::new(move |location, _, _| {
        if prefixes.iter().any(|p| has_path_prefix(p, location)) {
            Selection::ALL
        } else if prefixes.iter().any(|p| has_path_prefix(location, p)) {
            Selection {
                selected: false,
                may_descend: true,
            }
        } else {
            Selection::NONE
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{include_prefixes, Selection};
    use rstest::rstest;
    use snaprestore_castore::{fixtures::DUMMY_DIGEST, Attributes, Node};
    use std::path::Path;

    #[rstest]
    #[case::prefix_itself("/dir/sub", Selection::ALL)]
    #[case::below_prefix("/dir/sub/file", Selection::ALL)]
    #[case::parent(
        "/dir",
        Selection {
            selected: false,
            may_descend: true
        }
    )]
    #[case::sibling("/dir/other", Selection::NONE)]
    #[case::name_prefix_only("/dir/subway", Selection::NONE)]
    fn include(#[case] location: &str, #[case] expected: Selection) {
        let filter = include_prefixes(vec!["/dir/sub".to_string(), "/top".to_string()]);
        let node = Node::Directory {
            subtree: DUMMY_DIGEST.clone(),
            attrs: Attributes::with_mode(0o755),
        };
        assert_eq!(expected, filter(location, Path::new("/target"), &node));
    }
}
