use std::collections::HashMap;

use crate::{
    component::Incidence,
    warning::{Warning, WarningKind, Warnings},
};

/// Parent/child links among the incidences of one parse, by index.
///
/// A `RELATED-TO` naming a UID outside the document is left dangling: the
/// incidence keeps the reference but has no parent here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relations {
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

impl Relations {
    /// Links every incidence to its parent. `index` maps each UID to its
    /// position in `incidences`.
    ///
    /// Links are made in document order. A link that would close a cycle is
    /// skipped and recorded as a warning.
    pub(crate) fn build(
        incidences: &[Incidence],
        index: &HashMap<String, usize>,
        warnings: &mut Warnings,
    ) -> Self {
        let mut relations = Self {
            parents: vec![None; incidences.len()],
            children: vec![vec![]; incidences.len()],
        };

        for (child, incidence) in incidences.iter().enumerate() {
            let Some(parent_uid) = &incidence.related_to else {
                continue;
            };
            let Some(&parent) = index.get(parent_uid) else {
                tracing::debug!(uid = %incidence.uid, parent = %parent_uid, "dangling RELATED-TO");
                continue;
            };
            if relations.is_ancestor(child, parent) {
                warnings.push(Warning {
                    uid: Some(incidence.uid.clone()),
                    ..Warning::new(None, WarningKind::RelationCycle(parent_uid.clone()))
                });
                continue;
            }
            relations.parents[child] = Some(parent);
            relations.children[parent].push(child);
        }
        relations
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    fn is_ancestor(&self, ancestor: usize, mut node: usize) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.parents.get(node).copied().flatten() {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    pub fn children_of(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    /// Incidences without a linked parent, in document order.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.parents
            .iter()
            .enumerate()
            .filter(|(_, parent)| parent.is_none())
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todos(links: &[(&str, Option<&str>)]) -> (Vec<Incidence>, HashMap<String, usize>) {
        let incidences: Vec<_> = links
            .iter()
            .map(|(uid, parent)| {
                let mut todo = Incidence::new_todo(*uid);
                todo.related_to = parent.map(str::to_owned);
                todo
            })
            .collect();
        let index = incidences
            .iter()
            .enumerate()
            .map(|(position, todo)| (todo.uid.clone(), position))
            .collect();
        (incidences, index)
    }

    #[test]
    fn tree() {
        let (incidences, index) = todos(&[
            ("child", Some("root")),
            ("root", None),
            ("grandchild", Some("child")),
            ("orphan", Some("elsewhere")),
        ]);
        let mut warnings = Warnings::default();
        let relations = Relations::build(&incidences, &index, &mut warnings);

        assert!(warnings.is_empty());
        assert_eq!(relations.children_of(1), &[0]);
        assert_eq!(relations.children_of(0), &[2]);
        assert_eq!(relations.parent_of(2), Some(0));
        assert_eq!(relations.parent_of(3), None);
        assert_eq!(relations.roots().collect::<Vec<_>>(), vec![1, 3]);
        assert!(relations.children_of(42).is_empty());
    }

    #[test_log::test]
    fn cycle_is_broken_at_second_link() {
        let (incidences, index) = todos(&[
            ("a", Some("b")),
            ("b", Some("c")),
            ("c", Some("a")),
            ("self", Some("self")),
        ]);
        let mut warnings = Warnings::default();
        let relations = Relations::build(&incidences, &index, &mut warnings);

        assert_eq!(relations.parent_of(0), Some(1));
        assert_eq!(relations.parent_of(1), Some(2));
        assert_eq!(relations.parent_of(2), None);
        assert_eq!(relations.parent_of(3), None);

        let warnings = warnings.into_vec();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].uid.as_deref(), Some("c"));
        assert_eq!(warnings[0].kind, WarningKind::RelationCycle("a".to_owned()));
    }
}
