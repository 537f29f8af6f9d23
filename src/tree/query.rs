//! Datalog templates for tree roots and children.
//!
//! Relations are read from page properties: page P relates to page Q through
//! property `rel` when P's property block lists Q's display name under `rel`.
//! Nothing is escaped; a relation or parent name that breaks the query syntax
//! surfaces as a query error from the store.

use super::Direction;

/// Which set of pages a tree query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind<'a> {
    /// Pages that start a tree in the given direction.
    Roots,
    /// Pages one step below `parent` (a display name).
    Children { parent: &'a str },
}

/// Builds the query for a direction, kind and relation property.
pub fn build_query(direction: Direction, kind: QueryKind<'_>, relation: &str) -> String {
    match (direction, kind) {
        (Direction::From, QueryKind::Roots) => roots_from(relation),
        (Direction::To, QueryKind::Roots) => roots_to(relation),
        (Direction::From, QueryKind::Children { parent }) => children_from(relation, parent),
        (Direction::To, QueryKind::Children { parent }) => children_to(relation, parent),
    }
}

/// Pages referenced through `relation` that carry no `relation` of their own.
pub fn roots_from(relation: &str) -> String {
    format!(
        r#"[:find (pull ?root [*])
 :where
   [?block :block/properties ?props]
   [(get ?props :{relation}) ?refs]
   [?root :block/original-name ?root-name]
   [(contains? ?refs ?root-name)]
   (not
     [?root-block :block/page ?root]
     [?root-block :block/properties ?root-props]
     [(get ?root-props :{relation}) ?root-refs])]"#
    )
}

/// Pages carrying `relation` that no other page references through it.
pub fn roots_to(relation: &str) -> String {
    format!(
        r#"[:find (pull ?root [*])
 :where
   [?root-block :block/page ?root]
   [?root-block :block/properties ?root-props]
   [(get ?root-props :{relation}) ?root-refs]
   [?root :block/original-name ?root-name]
   (not
     [?block :block/properties ?props]
     [(get ?props :{relation}) ?refs]
     [(contains? ?refs ?root-name)])]"#
    )
}

/// Pages whose `relation` lists `parent`.
pub fn children_from(relation: &str, parent: &str) -> String {
    format!(
        r#"[:find (pull ?child [*])
 :where
   [?child-block :block/page ?child]
   [?child-block :block/properties ?child-props]
   [(get ?child-props :{relation}) ?child-refs]
   [?parent :block/name "{parent}"]
   [?parent :block/original-name ?parent-name]
   [(contains? ?child-refs ?parent-name)]]"#,
        parent = parent.to_lowercase()
    )
}

/// Pages listed in `parent`'s own `relation`.
pub fn children_to(relation: &str, parent: &str) -> String {
    format!(
        r#"[:find (pull ?child [*])
 :where
   [?parent :block/name "{parent}"]
   [?parent-block :block/page ?parent]
   [?parent-block :block/properties ?parent-props]
   [(get ?parent-props :{relation}) ?parent-refs]
   [?child :block/original-name ?child-name]
   [(contains? ?parent-refs ?child-name)]]"#,
        parent = parent.to_lowercase()
    )
}
