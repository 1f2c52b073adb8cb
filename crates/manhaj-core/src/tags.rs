//! # Curriculum Tag Index
//!
//! Binds nodes to (country, grade, subject) slots. Storage and lookup only;
//! no matching or ranking.

use crate::primitives::ALL_COUNTRIES;
use crate::store::ContentStore;
use crate::validation;
use crate::{CurriculumTag, ManhajError, Node, NodeId};
use std::collections::BTreeSet;

/// Filter for [`CurriculumTagIndex::nodes_tagged`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagQuery {
    /// Matches tags for this country and tags for `ALL`.
    pub country: Option<String>,
    pub grade: Option<u8>,
    /// Case-insensitive.
    pub subject: Option<String>,
}

impl TagQuery {
    fn matches(&self, tag: &CurriculumTag) -> bool {
        let country_ok = self.country.as_deref().is_none_or(|c| {
            tag.country == ALL_COUNTRIES || tag.country.eq_ignore_ascii_case(c.trim())
        });
        let grade_ok = self.grade.is_none_or(|g| tag.grade == g);
        let subject_ok = self
            .subject
            .as_deref()
            .is_none_or(|s| tag.subject.to_lowercase() == s.trim().to_lowercase());
        country_ok && grade_ok && subject_ok
    }
}

#[derive(Clone, Copy)]
pub struct CurriculumTagIndex<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> CurriculumTagIndex<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    /// Tags of `node_id`, sorted by (country, grade, subject).
    pub fn tags_for(&self, node_id: &NodeId) -> Result<Vec<CurriculumTag>, ManhajError> {
        if self.store.node(node_id)?.is_none() {
            return Err(ManhajError::NodeNotFound(node_id.clone()));
        }
        self.store.tags_for(node_id)
    }

    /// Attach a curriculum slot to an existing node. Duplicates conflict.
    pub fn add_tag(
        &self,
        node_id: &NodeId,
        country: &str,
        grade: u8,
        subject: &str,
    ) -> Result<CurriculumTag, ManhajError> {
        let (country, grade, subject) = validation::curriculum(country, grade, subject)?;
        let tag = CurriculumTag::new(node_id.clone(), country, grade, subject);
        if !self.store.insert_tag(&tag)? {
            return Err(ManhajError::Conflict(format!(
                "node {node_id} is already tagged {}/{}/{}",
                tag.country, tag.grade, tag.subject
            )));
        }
        tracing::debug!(node_id = %node_id, country = %tag.country, grade = tag.grade, subject = %tag.subject, "tagged node");
        Ok(tag)
    }

    /// Drop every tag of `node_id`. Returns how many were removed.
    pub fn remove_all_for(&self, node_id: &NodeId) -> Result<usize, ManhajError> {
        let removed = self.store.remove_tags_for(node_id)?;
        tracing::debug!(node_id = %node_id, removed, "cleared tags");
        Ok(removed)
    }

    /// Nodes carrying at least one tag that matches `query`, sorted by title
    /// then id.
    pub fn nodes_tagged(&self, query: &TagQuery) -> Result<Vec<Node>, ManhajError> {
        let ids: BTreeSet<NodeId> = self
            .store
            .tags()?
            .into_iter()
            .filter(|tag| query.matches(tag))
            .map(|tag| tag.node_id)
            .collect();

        let mut nodes = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(node) = self.store.node(id)? {
                nodes.push(node);
            }
        }
        nodes.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::{NodeKind, Status};

    fn store_with(ids: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for id in ids {
            let node = Node::new(NodeId::new(*id), NodeKind::Article, id.to_uppercase(), Status::Published);
            store.insert_node(&node, None).expect("insert");
        }
        store
    }

    #[test]
    fn tags_sorted_and_unique() {
        let store = store_with(&["a"]);
        let index = CurriculumTagIndex::new(&store);
        let a = NodeId::new("a");
        index.add_tag(&a, "SA", 4, "Math").expect("tag");
        index.add_tag(&a, "EG", 8, "Math").expect("tag");
        index.add_tag(&a, "jo", 3, "Math").expect("tag");

        let err = index.add_tag(&a, "SA", 4, "Math").expect_err("duplicate");
        assert!(matches!(err, ManhajError::Conflict(_)));

        let countries: Vec<_> = index
            .tags_for(&a)
            .expect("tags")
            .into_iter()
            .map(|t| t.country)
            .collect();
        assert_eq!(countries, vec!["EG", "JO", "SA"]);
    }

    #[test]
    fn tagging_missing_node_is_not_found() {
        let store = store_with(&[]);
        let index = CurriculumTagIndex::new(&store);
        assert!(matches!(
            index.add_tag(&NodeId::new("ghost"), "SA", 4, "Math"),
            Err(ManhajError::NodeNotFound(_))
        ));
        assert!(matches!(
            index.tags_for(&NodeId::new("ghost")),
            Err(ManhajError::NodeNotFound(_))
        ));
    }

    #[test]
    fn invalid_slot_is_rejected() {
        let store = store_with(&["a"]);
        let index = CurriculumTagIndex::new(&store);
        assert!(matches!(
            index.add_tag(&NodeId::new("a"), "SA", 13, "Math"),
            Err(ManhajError::Validation(_))
        ));
    }

    #[test]
    fn remove_all_for_clears_node() {
        let store = store_with(&["a", "b"]);
        let index = CurriculumTagIndex::new(&store);
        index.add_tag(&NodeId::new("a"), "SA", 4, "Math").expect("tag");
        index.add_tag(&NodeId::new("a"), "SA", 5, "Math").expect("tag");
        index.add_tag(&NodeId::new("b"), "SA", 4, "Math").expect("tag");

        assert_eq!(index.remove_all_for(&NodeId::new("a")).expect("remove"), 2);
        assert!(index.tags_for(&NodeId::new("a")).expect("tags").is_empty());
        assert_eq!(index.tags_for(&NodeId::new("b")).expect("tags").len(), 1);
    }

    #[test]
    fn lookup_by_country_includes_all_wildcard() {
        let store = store_with(&["sa", "eg", "all"]);
        let index = CurriculumTagIndex::new(&store);
        index.add_tag(&NodeId::new("sa"), "SA", 4, "Math").expect("tag");
        index.add_tag(&NodeId::new("eg"), "EG", 4, "Math").expect("tag");
        index.add_tag(&NodeId::new("all"), "ALL", 4, "Math").expect("tag");

        let query = TagQuery {
            country: Some("sa".to_string()),
            grade: Some(4),
            subject: Some("math".to_string()),
        };
        let ids: Vec<_> = index
            .nodes_tagged(&query)
            .expect("lookup")
            .into_iter()
            .map(|n| n.id.0)
            .collect();
        assert_eq!(ids, vec!["all", "sa"]);
    }

    #[test]
    fn lookup_by_grade_only() {
        let store = store_with(&["a", "b"]);
        let index = CurriculumTagIndex::new(&store);
        index.add_tag(&NodeId::new("a"), "SA", 4, "Math").expect("tag");
        index.add_tag(&NodeId::new("b"), "SA", 5, "Math").expect("tag");

        let query = TagQuery {
            grade: Some(5),
            ..TagQuery::default()
        };
        let found = index.nodes_tagged(&query).expect("lookup");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, NodeId::new("b"));
    }
}
