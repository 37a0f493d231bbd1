//! Identity & Ownership Layer
//!
//! Entities live in per-kind arenas keyed by id. Ownership is a separate
//! adjacency index (parent id -> ordered child ids), so re-parenting is an
//! index update and no entity holds a pointer to another.
//!
//! Lookups never fail loudly: a missing id is `None`.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::{QreError, QreResult};
use crate::ids::{
    EntityKind, IdAllocator, ModuleId, QuestionId, QuestionnaireId, ResponseId, SectionId,
};
use crate::model::{Entity, Module, QuestionBlock, Questionnaire, Response, Section};

/// Entities of one kind plus the ordered child lists of their parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arena<T: Entity> {
    items: BTreeMap<T::Id, T>,
    children: BTreeMap<T::ParentId, Vec<T::Id>>,
}

impl<T: Entity> Default for Arena<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }
}

impl<T: Entity> Arena<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.items.contains_key(&id)
    }

    /// Child ids of `parent` in display order.
    pub fn child_ids(&self, parent: T::ParentId) -> &[T::Id] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children_of(&self, parent: T::ParentId) -> impl Iterator<Item = &T> + '_ {
        self.child_ids(parent)
            .iter()
            .filter_map(move |id| self.items.get(id))
    }

    fn get_mut(&mut self, id: T::Id) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    fn ids(&self) -> impl Iterator<Item = T::Id> + '_ {
        self.items.keys().copied()
    }

    fn insert(&mut self, entity: T, position: usize) -> QreResult<T::Id> {
        let id = entity.id();
        if self.items.contains_key(&id) {
            return Err(QreError::AlreadyAttached {
                kind: T::KIND,
                id: id.into(),
            });
        }
        let len = self.child_ids(entity.parent_id()).len();
        if position > len {
            return Err(QreError::range(
                "position",
                position,
                format!("must be between 0 and {len}"),
            ));
        }
        self.children
            .entry(entity.parent_id())
            .or_default()
            .insert(position, id);
        self.items.insert(id, entity);
        Ok(id)
    }

    fn unlink(&mut self, parent: T::ParentId, id: T::Id) {
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|child| *child != id);
            if siblings.is_empty() {
                self.children.remove(&parent);
            }
        }
    }

    fn remove(&mut self, id: T::Id) -> Option<T> {
        let entity = self.items.remove(&id)?;
        self.unlink(entity.parent_id(), id);
        Some(entity)
    }

    /// Drops the child list of a removed parent, returning the orphaned ids.
    fn take_children(&mut self, parent: T::ParentId) -> Vec<T::Id> {
        self.children.remove(&parent).unwrap_or_default()
    }
}

/// Entities that can be attached to a [`Document`].
pub trait Member: Entity + Sized {
    fn arena(doc: &Document) -> &Arena<Self>;
    fn arena_mut(doc: &mut Document) -> &mut Arena<Self>;
    fn parent_exists(doc: &Document, parent: Self::ParentId) -> bool;
}

impl Member for Module {
    fn arena(doc: &Document) -> &Arena<Self> {
        &doc.modules
    }

    fn arena_mut(doc: &mut Document) -> &mut Arena<Self> {
        &mut doc.modules
    }

    fn parent_exists(doc: &Document, parent: QuestionnaireId) -> bool {
        doc.questionnaire.id() == parent
    }
}

impl Member for Section {
    fn arena(doc: &Document) -> &Arena<Self> {
        &doc.sections
    }

    fn arena_mut(doc: &mut Document) -> &mut Arena<Self> {
        &mut doc.sections
    }

    fn parent_exists(doc: &Document, parent: ModuleId) -> bool {
        doc.modules.contains(parent)
    }
}

impl Member for QuestionBlock {
    fn arena(doc: &Document) -> &Arena<Self> {
        &doc.questions
    }

    fn arena_mut(doc: &mut Document) -> &mut Arena<Self> {
        &mut doc.questions
    }

    fn parent_exists(doc: &Document, parent: SectionId) -> bool {
        doc.sections.contains(parent)
    }
}

impl Member for Response {
    fn arena(doc: &Document) -> &Arena<Self> {
        &doc.responses
    }

    fn arena_mut(doc: &mut Document) -> &mut Arena<Self> {
        &mut doc.responses
    }

    fn parent_exists(doc: &Document, parent: QuestionId) -> bool {
        doc.questions.contains(parent)
    }
}

/// A whole questionnaire: the root record, four arenas and the id allocator.
#[derive(Debug, Clone)]
pub struct Document {
    questionnaire: Questionnaire,
    ids: IdAllocator,
    modules: Arena<Module>,
    sections: Arena<Section>,
    questions: Arena<QuestionBlock>,
    responses: Arena<Response>,
}

// The allocator is bookkeeping; two trees with the same content are equal.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.questionnaire == other.questionnaire
            && self.modules == other.modules
            && self.sections == other.sections
            && self.questions == other.questions
            && self.responses == other.responses
    }
}

impl Eq for Document {}

impl Document {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        client: impl Into<String>,
    ) -> Self {
        let mut ids = IdAllocator::new();
        let questionnaire = Questionnaire::new(&mut ids, title, description, client);
        Self {
            questionnaire,
            ids,
            modules: Arena::default(),
            sections: Arena::default(),
            questions: Arena::default(),
            responses: Arena::default(),
        }
    }

    /// Rebuilds a document from already-formed records without deriving
    /// anything. Each list must be in display order within its parent.
    pub fn hydrate(
        questionnaire: Questionnaire,
        modules: Vec<Module>,
        sections: Vec<Section>,
        questions: Vec<QuestionBlock>,
        responses: Vec<Response>,
    ) -> QreResult<Self> {
        let mut ids = IdAllocator::new();
        ids.reserve(EntityKind::Questionnaire, questionnaire.id().raw());
        let mut doc = Self {
            questionnaire,
            ids,
            modules: Arena::default(),
            sections: Arena::default(),
            questions: Arena::default(),
            responses: Arena::default(),
        };
        doc.attach_all(modules)?;
        doc.attach_all(sections)?;
        doc.attach_all(questions)?;
        doc.attach_all(responses)?;
        Ok(doc)
    }

    fn attach_all<T: Member>(&mut self, entities: Vec<T>) -> QreResult<()> {
        for entity in entities {
            self.ids.reserve(T::KIND, entity.id().into());
            let end = T::arena(self).child_ids(entity.parent_id()).len();
            self.attach(entity, end)?;
        }
        Ok(())
    }

    fn attach<T: Member>(&mut self, entity: T, position: usize) -> QreResult<T::Id> {
        let parent = entity.parent_id();
        if !T::parent_exists(self, parent) {
            return Err(QreError::UnknownParent {
                kind: T::PARENT_KIND,
                id: parent.into(),
            });
        }
        T::arena_mut(self).insert(entity, position)
    }

    pub fn questionnaire(&self) -> &Questionnaire {
        &self.questionnaire
    }

    pub fn questionnaire_mut(&mut self) -> &mut Questionnaire {
        &mut self.questionnaire
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// Allocator for building new entities against this document.
    pub fn ids_mut(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    /// Inserts `entity` into its declared parent's child list at `position`,
    /// shifting later siblings right.
    pub fn add_child<T: Member>(&mut self, entity: T, position: usize) -> QreResult<T::Id> {
        let id = self.attach(entity, position)?;
        debug!(entity = %T::KIND, id = ?id, position, "child attached");
        Ok(id)
    }

    /// Appends `entity` after its last sibling.
    pub fn push_child<T: Member>(&mut self, entity: T) -> QreResult<T::Id> {
        let end = self.child_ids::<T>(entity.parent_id()).len();
        self.add_child(entity, end)
    }

    /// Applies inserts in order; each sees the list as left by the previous one.
    /// Stops at the first failure, keeping the inserts already made.
    pub fn add_children<T: Member>(&mut self, batch: Vec<(T, usize)>) -> QreResult<Vec<T::Id>> {
        batch
            .into_iter()
            .map(|(entity, position)| self.add_child(entity, position))
            .collect()
    }

    pub fn child_ids<'a, T: Member + 'a>(&'a self, parent: T::ParentId) -> &'a [T::Id] {
        T::arena(self).child_ids(parent)
    }

    pub fn get<T: Member>(&self, id: T::Id) -> Option<&T> {
        T::arena(self).get(id)
    }

    pub fn get_mut<T: Member>(&mut self, id: T::Id) -> Option<&mut T> {
        T::arena_mut(self).get_mut(id)
    }

    pub fn get_module_by_id(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id)
    }

    pub fn get_section_by_id(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(id)
    }

    pub fn get_question_by_id(&self, id: QuestionId) -> Option<&QuestionBlock> {
        self.questions.get(id)
    }

    pub fn get_response_by_id(&self, id: ResponseId) -> Option<&Response> {
        self.responses.get(id)
    }

    pub fn get_module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id)
    }

    pub fn get_section_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        self.sections.get_mut(id)
    }

    pub fn get_question_mut(&mut self, id: QuestionId) -> Option<&mut QuestionBlock> {
        self.questions.get_mut(id)
    }

    pub fn get_response_mut(&mut self, id: ResponseId) -> Option<&mut Response> {
        self.responses.get_mut(id)
    }

    /// Every live id of `kind`.
    pub fn get_ids(&self, kind: EntityKind) -> BTreeSet<u32> {
        match kind {
            EntityKind::Questionnaire => BTreeSet::from([self.questionnaire.id().raw()]),
            EntityKind::Module => self.modules.ids().map(u32::from).collect(),
            EntityKind::Section => self.sections.ids().map(u32::from).collect(),
            EntityKind::Question => self.questions.ids().map(u32::from).collect(),
            EntityKind::Response => self.responses.ids().map(u32::from).collect(),
        }
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> + '_ {
        self.modules.children_of(self.questionnaire.id())
    }

    pub fn sections_of(&self, module: ModuleId) -> impl Iterator<Item = &Section> + '_ {
        self.sections.children_of(module)
    }

    pub fn questions_of(&self, section: SectionId) -> impl Iterator<Item = &QuestionBlock> + '_ {
        self.questions.children_of(section)
    }

    pub fn responses_of(&self, question: QuestionId) -> impl Iterator<Item = &Response> + '_ {
        self.responses.children_of(question)
    }

    /// All questions in document order.
    pub fn all_questions(&self) -> impl Iterator<Item = &QuestionBlock> + '_ {
        self.modules()
            .flat_map(move |m| self.sections_of(m.id()))
            .flat_map(move |s| self.questions_of(s.id()))
    }

    pub fn all_responses(&self) -> impl Iterator<Item = &Response> + '_ {
        self.all_questions()
            .flat_map(move |q| self.responses_of(q.id()))
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Questionnaire => 1,
            EntityKind::Module => self.modules.len(),
            EntityKind::Section => self.sections.len(),
            EntityKind::Question => self.questions.len(),
            EntityKind::Response => self.responses.len(),
        }
    }

    // --- Removal ---

    /// Detaches a module and everything under it.
    pub fn remove_module(&mut self, id: ModuleId) -> QreResult<Module> {
        let module = self.modules.remove(id).ok_or(QreError::NotFound {
            kind: EntityKind::Module,
            id: id.raw(),
        })?;
        for section in self.sections.take_children(id) {
            self.drop_section(section);
        }
        Ok(module)
    }

    pub fn remove_section(&mut self, id: SectionId) -> QreResult<Section> {
        let section = self.sections.remove(id).ok_or(QreError::NotFound {
            kind: EntityKind::Section,
            id: id.raw(),
        })?;
        self.drop_questions_of(id);
        Ok(section)
    }

    pub fn remove_question(&mut self, id: QuestionId) -> QreResult<QuestionBlock> {
        let question = self.questions.remove(id).ok_or(QreError::NotFound {
            kind: EntityKind::Question,
            id: id.raw(),
        })?;
        self.drop_responses_of(id);
        Ok(question)
    }

    pub fn remove_response(&mut self, id: ResponseId) -> QreResult<Response> {
        self.responses.remove(id).ok_or(QreError::NotFound {
            kind: EntityKind::Response,
            id: id.raw(),
        })
    }

    fn drop_section(&mut self, id: SectionId) {
        self.sections.items.remove(&id);
        self.drop_questions_of(id);
    }

    fn drop_questions_of(&mut self, section: SectionId) {
        for question in self.questions.take_children(section) {
            self.questions.items.remove(&question);
            self.drop_responses_of(question);
        }
    }

    fn drop_responses_of(&mut self, question: QuestionId) {
        for response in self.responses.take_children(question) {
            self.responses.items.remove(&response);
        }
    }

    // --- Re-parenting ---

    /// Moves an entity under `new_parent` at `position`. Its id is unchanged.
    pub fn move_child<T: Member>(
        &mut self,
        id: T::Id,
        new_parent: T::ParentId,
        position: usize,
    ) -> QreResult<()> {
        if !T::parent_exists(self, new_parent) {
            return Err(QreError::UnknownParent {
                kind: T::PARENT_KIND,
                id: new_parent.into(),
            });
        }
        let arena = T::arena_mut(self);
        let old_parent = match arena.get(id) {
            Some(entity) => entity.parent_id(),
            None => {
                return Err(QreError::NotFound {
                    kind: T::KIND,
                    id: id.into(),
                })
            }
        };

        let mut target_len = arena.child_ids(new_parent).len();
        if old_parent == new_parent {
            target_len -= 1;
        }
        if position > target_len {
            return Err(QreError::range(
                "position",
                position,
                format!("must be between 0 and {target_len}"),
            ));
        }

        arena.unlink(old_parent, id);
        arena.children.entry(new_parent).or_default().insert(position, id);
        if let Some(entity) = arena.get_mut(id) {
            entity.set_parent_id(new_parent);
        }
        debug!(entity = %T::KIND, id = ?id, parent = ?new_parent, position, "child moved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{ResponseCode, ResponseFlag};
    use crate::model::NewQuestion;

    fn doc_with_section() -> (Document, ModuleId, SectionId) {
        let mut doc = Document::new("Brand tracker", "", "Acme");
        let qid = doc.questionnaire().id();
        let module = Module::new(doc.ids_mut(), qid, 1, "Screener");
        let module_id = doc.add_child(module, 0).unwrap();
        let section = Section::new(doc.ids_mut(), module_id, "A", "Demographics");
        let section_id = doc.add_child(section, 0).unwrap();
        (doc, module_id, section_id)
    }

    fn question(doc: &mut Document, section: SectionId, qnum: &str) -> QuestionBlock {
        QuestionBlock::new(
            doc.ids_mut(),
            section,
            NewQuestion {
                qnum: qnum.into(),
                ..NewQuestion::default()
            },
        )
    }

    fn qnums(doc: &Document, section: SectionId) -> Vec<String> {
        doc.questions_of(section).map(|q| q.qnum().to_string()).collect()
    }

    #[test]
    fn positional_insert_shifts_siblings_right() {
        let (mut doc, _, section) = doc_with_section();
        let q1 = question(&mut doc, section, "Q1");
        let q2 = question(&mut doc, section, "Q2");
        let q3 = question(&mut doc, section, "Q3");
        doc.add_child(q1, 0).unwrap();
        doc.add_child(q2, 1).unwrap();
        doc.add_child(q3, 0).unwrap();
        assert_eq!(qnums(&doc, section), ["Q3", "Q1", "Q2"]);
    }

    #[test]
    fn insert_past_end_is_range_error() {
        let (mut doc, _, section) = doc_with_section();
        let q = question(&mut doc, section, "Q1");
        match doc.add_child(q, 1) {
            Err(QreError::Range { argument, .. }) => assert_eq!(argument, "position"),
            other => panic!("expected range error, got {other:?}"),
        }
        assert!(doc.questions_of(section).next().is_none());
    }

    #[test]
    fn batch_sees_prior_inserts() {
        let (mut doc, _, section) = doc_with_section();
        let batch = vec![
            (question(&mut doc, section, "Q1"), 0),
            (question(&mut doc, section, "Q2"), 1),
            (question(&mut doc, section, "Q0"), 0),
        ];
        let ids = doc.add_children(batch).unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(qnums(&doc, section), ["Q0", "Q1", "Q2"]);
    }

    #[test]
    fn batch_stops_at_first_failure() {
        let (mut doc, _, section) = doc_with_section();
        let batch = vec![
            (question(&mut doc, section, "Q1"), 0),
            (question(&mut doc, section, "Q2"), 5),
            (question(&mut doc, section, "Q3"), 0),
        ];
        assert!(doc.add_children(batch).is_err());
        assert_eq!(qnums(&doc, section), ["Q1"]);
    }

    #[test]
    fn unknown_parent_and_double_attach() {
        let (mut doc, _, section) = doc_with_section();
        let orphan = Section::new(doc.ids_mut(), ModuleId(99), "Z", "Nowhere");
        assert_eq!(
            doc.add_child(orphan, 0),
            Err(QreError::UnknownParent {
                kind: EntityKind::Module,
                id: 99
            })
        );

        let q = question(&mut doc, section, "Q1");
        let copy = q.clone();
        doc.add_child(q, 0).unwrap();
        assert!(matches!(
            doc.add_child(copy, 0),
            Err(QreError::AlreadyAttached { .. })
        ));
    }

    #[test]
    fn lookups_return_none_for_missing_ids() {
        let (doc, module, section) = doc_with_section();
        assert!(doc.get_module_by_id(module).is_some());
        assert!(doc.get_section_by_id(section).is_some());
        assert!(doc.get_question_by_id(QuestionId(42)).is_none());
        assert!(doc.get_module_by_id(ModuleId(42)).is_none());
        assert!(doc.get_response_by_id(ResponseId(1)).is_none());
    }

    #[test]
    fn get_ids_lists_live_identities() {
        let (mut doc, _, section) = doc_with_section();
        let q = question(&mut doc, section, "Q1");
        let qid = doc.add_child(q, 0).unwrap();
        let r = Response::new(doc.ids_mut(), qid, 1, "Yes", &[]).unwrap();
        doc.add_child(r, 0).unwrap();

        assert_eq!(doc.get_ids(EntityKind::Question), BTreeSet::from([1]));
        assert_eq!(doc.get_ids(EntityKind::Response), BTreeSet::from([1]));
        assert_eq!(doc.get_ids(EntityKind::Questionnaire), BTreeSet::from([1]));
    }

    #[test]
    fn removal_cascades_and_orphans_are_unreachable() {
        let (mut doc, module, section) = doc_with_section();
        let q = question(&mut doc, section, "Q1");
        let qid = doc.add_child(q, 0).unwrap();
        let r = Response::new(
            doc.ids_mut(),
            qid,
            ResponseCode::BLANK,
            "",
            &[ResponseFlag::OpenEnd],
        )
        .unwrap();
        let rid = doc.add_child(r, 0).unwrap();

        doc.remove_module(module).unwrap();
        assert!(doc.get_section_by_id(section).is_none());
        assert!(doc.get_question_by_id(qid).is_none());
        assert!(doc.get_response_by_id(rid).is_none());
        assert!(doc.get_ids(EntityKind::Response).is_empty());
        assert!(doc.remove_module(module).is_err());
    }

    #[test]
    fn move_keeps_identity_and_updates_both_lists() {
        let (mut doc, module, section_a) = doc_with_section();
        let section_b = Section::new(doc.ids_mut(), module, "B", "Usage");
        let section_b = doc.add_child(section_b, 1).unwrap();
        let q1 = question(&mut doc, section_a, "Q1");
        let q2 = question(&mut doc, section_a, "Q2");
        let q1 = doc.add_child(q1, 0).unwrap();
        doc.add_child(q2, 1).unwrap();

        doc.move_child::<QuestionBlock>(q1, section_b, 0).unwrap();
        assert_eq!(qnums(&doc, section_a), ["Q2"]);
        assert_eq!(qnums(&doc, section_b), ["Q1"]);
        assert_eq!(doc.get_question_by_id(q1).map(|q| q.parent_id()), Some(section_b));
    }

    #[test]
    fn move_within_parent_reorders() {
        let (mut doc, _, section) = doc_with_section();
        let q1 = question(&mut doc, section, "Q1");
        let q2 = question(&mut doc, section, "Q2");
        let q1 = doc.add_child(q1, 0).unwrap();
        doc.add_child(q2, 1).unwrap();
        doc.move_child::<QuestionBlock>(q1, section, 1).unwrap();
        assert_eq!(qnums(&doc, section), ["Q2", "Q1"]);
        assert!(doc.move_child::<QuestionBlock>(q1, section, 2).is_err());
    }

    #[test]
    fn all_questions_follows_document_order() {
        let (mut doc, module, section_a) = doc_with_section();
        let section_b = Section::new(doc.ids_mut(), module, "B", "Usage");
        let section_b = doc.add_child(section_b, 0).unwrap();
        let qa = question(&mut doc, section_a, "QA");
        let qb = question(&mut doc, section_b, "QB");
        doc.push_child(qa).unwrap();
        doc.push_child(qb).unwrap();
        let order: Vec<_> = doc.all_questions().map(|q| q.qnum().to_string()).collect();
        assert_eq!(order, ["QB", "QA"]);
    }
}
