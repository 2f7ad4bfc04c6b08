//! Step registry: which steps a workflow instance contains.
//!
//! The registry decides the concrete step sequence from the inputs that are
//! present. Optional steps whose input is missing are left out entirely
//! rather than being disabled, and prerequisites pointing at them count as
//! satisfied.

use std::collections::HashMap;

use crate::error::{StepwiseError, Result};
use crate::profile::{LegacyLists, ProfileDraft};
use crate::steps::{Step, StepId, WorkflowKind};

use super::dependency;
use super::store::StepStore;

/// A step as declared in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDecl {
    /// Step identifier.
    pub id: StepId,
    /// Steps that must succeed before this one may start.
    pub prerequisites: Vec<StepId>,
}

/// The static description of a workflow instance's steps.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    kind: WorkflowKind,
    steps: Vec<StepDecl>,
}

impl StepRegistry {
    /// Create a new registry builder.
    pub fn builder(kind: WorkflowKind) -> StepRegistryBuilder {
        StepRegistryBuilder::new(kind)
    }

    /// Steps for a profile edit: `[UploadPicture?, UploadBanner?, UpdateRecord]`.
    ///
    /// ```
    /// use stepwise::profile::ProfileDraft;
    /// use stepwise::runner::StepRegistry;
    /// use stepwise::steps::StepId;
    ///
    /// let registry = StepRegistry::for_update(&ProfileDraft::named("Ana").with_banner("sky.jpg")).unwrap();
    /// assert_eq!(registry.ids(), vec![StepId::UploadBanner, StepId::UpdateRecord]);
    /// ```
    pub fn for_update(draft: &ProfileDraft) -> Result<Self> {
        Self::builder(WorkflowKind::Update)
            .step_if(draft.picture.is_some(), StepId::UploadPicture, vec![])
            .step_if(draft.banner.is_some(), StepId::UploadBanner, vec![])
            .step(
                StepId::UpdateRecord,
                vec![StepId::UploadPicture, StepId::UploadBanner],
            )
            .build()
    }

    /// Steps for a legacy-record migration: one topic per non-empty list,
    /// then the record update.
    pub fn for_migration(lists: &LegacyLists) -> Result<Self> {
        Self::builder(WorkflowKind::Migration)
            .step_if(!lists.channels.is_empty(), StepId::CreateChannelsTopic, vec![])
            .step_if(!lists.groups.is_empty(), StepId::CreateGroupsTopic, vec![])
            .step_if(
                !lists.following_channels.is_empty(),
                StepId::CreateFollowingChannelsTopic,
                vec![],
            )
            .step_if(
                !lists.following_groups.is_empty(),
                StepId::CreateFollowingGroupsTopic,
                vec![],
            )
            .step(
                StepId::UpdateRecord,
                vec![
                    StepId::CreateChannelsTopic,
                    StepId::CreateGroupsTopic,
                    StepId::CreateFollowingChannelsTopic,
                    StepId::CreateFollowingGroupsTopic,
                ],
            )
            .build()
    }

    /// The workflow kind.
    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    /// Declared steps in execution order.
    pub fn steps(&self) -> &[StepDecl] {
        &self.steps
    }

    /// Step identifiers in execution order.
    pub fn ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|s| s.id).collect()
    }

    /// Check if a step is part of this instance.
    pub fn contains(&self, step: StepId) -> bool {
        self.steps.iter().any(|s| s.id == step)
    }

    /// Get the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Build the steps with their initial statuses.
    ///
    /// Every step starts `Idle`; it is enabled only if none of its
    /// prerequisites is present in this instance.
    pub fn build_steps(&self) -> Vec<Step> {
        self.seed_store().all().to_vec()
    }

    /// Seed a state store with the initial steps.
    pub fn seed_store(&self) -> StepStore {
        let mut store = StepStore::new(
            self.steps
                .iter()
                .map(|decl| Step::new(decl.id, decl.prerequisites.clone(), false))
                .collect(),
        );
        dependency::refresh_enablement(&mut store);
        store
    }

    /// Find a prerequisite cycle among present steps, returning its path.
    fn find_cycle(&self) -> Option<Vec<StepId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            Visiting,
            Visited,
        }

        let prerequisites: HashMap<StepId, &[StepId]> = self
            .steps
            .iter()
            .map(|s| (s.id, s.prerequisites.as_slice()))
            .collect();
        let mut state: HashMap<StepId, State> =
            self.steps.iter().map(|s| (s.id, State::Unvisited)).collect();
        let mut path: Vec<StepId> = Vec::new();

        fn dfs(
            node: StepId,
            prerequisites: &HashMap<StepId, &[StepId]>,
            state: &mut HashMap<StepId, State>,
            path: &mut Vec<StepId>,
        ) -> Option<Vec<StepId>> {
            state.insert(node, State::Visiting);
            path.push(node);

            for dep in prerequisites.get(&node).copied().unwrap_or_default() {
                match state.get(dep) {
                    Some(State::Visiting) => {
                        let start = path.iter().position(|s| s == dep).unwrap_or(0);
                        let mut cycle = path[start..].to_vec();
                        cycle.push(*dep);
                        return Some(cycle);
                    }
                    Some(State::Unvisited) => {
                        if let Some(cycle) = dfs(*dep, prerequisites, state, path) {
                            return Some(cycle);
                        }
                    }
                    // Absent from this instance, or already explored.
                    Some(State::Visited) | None => {}
                }
            }

            path.pop();
            state.insert(node, State::Visited);
            None
        }

        for decl in &self.steps {
            if state.get(&decl.id) == Some(&State::Unvisited) {
                if let Some(cycle) = dfs(decl.id, &prerequisites, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }

        None
    }
}

/// Builder for constructing a [`StepRegistry`].
#[derive(Debug)]
pub struct StepRegistryBuilder {
    kind: WorkflowKind,
    steps: Vec<StepDecl>,
}

impl StepRegistryBuilder {
    /// Create a new builder.
    pub fn new(kind: WorkflowKind) -> Self {
        Self {
            kind,
            steps: Vec::new(),
        }
    }

    /// Add a step with its prerequisites.
    pub fn step(mut self, id: StepId, prerequisites: Vec<StepId>) -> Self {
        match self.steps.iter_mut().find(|s| s.id == id) {
            Some(existing) => existing.prerequisites.extend(prerequisites),
            None => self.steps.push(StepDecl { id, prerequisites }),
        }
        self
    }

    /// Add a step only when `include` holds.
    pub fn step_if(self, include: bool, id: StepId, prerequisites: Vec<StepId>) -> Self {
        if include {
            self.step(id, prerequisites)
        } else {
            self
        }
    }

    /// Build the registry.
    ///
    /// Returns an error if a step or prerequisite does not belong to the
    /// workflow kind, or if prerequisites form a cycle.
    pub fn build(self) -> Result<StepRegistry> {
        let catalogue = self.kind.catalogue();

        for decl in &self.steps {
            if !catalogue.contains(&decl.id) {
                return Err(StepwiseError::ForeignStep {
                    step: decl.id,
                    kind: self.kind,
                });
            }
            for prerequisite in &decl.prerequisites {
                if !catalogue.contains(prerequisite) {
                    return Err(StepwiseError::UnknownPrerequisite {
                        step: decl.id,
                        prerequisite: *prerequisite,
                    });
                }
            }
        }

        let registry = StepRegistry {
            kind: self.kind,
            steps: self.steps,
        };

        if let Some(cycle) = registry.find_cycle() {
            let path: Vec<&str> = cycle.iter().map(StepId::key).collect();
            return Err(StepwiseError::CircularDependency {
                cycle: path.join(" -> "),
            });
        }

        Ok(registry)
    }
}
