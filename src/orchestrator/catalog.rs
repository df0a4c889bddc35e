//! Caller-supplied asset pools: workflows, templates, prompt templates, and
//! the card deck. Read-only at runtime.

use std::collections::HashMap;

use crate::domain::Gender;
use crate::fallback::{TemplateAsset, WorkflowOption};
use crate::registry::MissionKind;
use crate::stage::{CardFace, PromptTemplate, DEFAULT_INSTRUCTION};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TemplateKey {
    kind: MissionKind,
    gender: Option<Gender>,
}

/// Static configuration consumed by the orchestrator. Built once by the
/// caller; the orchestrator never mutates it.
pub struct AssetCatalog {
    workflows: HashMap<MissionKind, Vec<WorkflowOption>>,
    templates: HashMap<TemplateKey, Vec<TemplateAsset>>,
    prompts: HashMap<Gender, PromptTemplate>,
    cards: Vec<CardFace>,
    feature_instruction: String,
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self {
            workflows: HashMap::new(),
            templates: HashMap::new(),
            prompts: HashMap::new(),
            cards: Vec::new(),
            feature_instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflow(mut self, kind: MissionKind, workflow: WorkflowOption) -> Self {
        self.workflows.entry(kind).or_default().push(workflow);
        self
    }

    pub fn with_templates(
        mut self,
        kind: MissionKind,
        gender: Option<Gender>,
        templates: Vec<TemplateAsset>,
    ) -> Self {
        self.templates
            .entry(TemplateKey { kind, gender })
            .or_default()
            .extend(templates);
        self
    }

    pub fn with_prompt(mut self, gender: Gender, prompt: PromptTemplate) -> Self {
        self.prompts.insert(gender, prompt);
        self
    }

    pub fn with_cards(mut self, cards: Vec<CardFace>) -> Self {
        self.cards = cards;
        self
    }

    pub fn with_feature_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.feature_instruction = instruction.into();
        self
    }

    pub fn workflows(&self, kind: MissionKind) -> &[WorkflowOption] {
        self.workflows.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Lowest-priority enabled workflow, for missions without a fallback
    /// space.
    pub fn primary_workflow(&self, kind: MissionKind) -> Option<&WorkflowOption> {
        self.workflows(kind)
            .iter()
            .filter(|w| w.enabled)
            .min_by_key(|w| w.priority)
    }

    /// Template pool for a mission category, falling back to the
    /// gender-neutral pool when no gendered pool exists.
    pub fn templates(&self, kind: MissionKind, gender: Option<Gender>) -> &[TemplateAsset] {
        let keyed = self.templates.get(&TemplateKey { kind, gender });
        match keyed {
            Some(pool) if !pool.is_empty() => pool,
            _ if gender.is_some() => self
                .templates
                .get(&TemplateKey { kind, gender: None })
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            _ => &[],
        }
    }

    pub fn prompt(&self, gender: Gender) -> Option<&PromptTemplate> {
        self.prompts.get(&gender)
    }

    pub fn cards(&self) -> &[CardFace] {
        &self.cards
    }

    pub fn feature_instruction(&self) -> &str {
        &self.feature_instruction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_workflow_picks_enabled_lowest_priority() {
        let catalog = AssetCatalog::new()
            .with_workflow(
                MissionKind::FestiveTransform,
                WorkflowOption::new("late", "wf-late").with_priority(9),
            )
            .with_workflow(
                MissionKind::FestiveTransform,
                WorkflowOption::new("off", "wf-off").disabled(),
            )
            .with_workflow(
                MissionKind::FestiveTransform,
                WorkflowOption::new("early", "wf-early").with_priority(1),
            );

        let primary = catalog
            .primary_workflow(MissionKind::FestiveTransform)
            .unwrap();
        assert_eq!(primary.id, "early");
    }

    #[test]
    fn test_gendered_pool_falls_back_to_neutral() {
        let catalog = AssetCatalog::new().with_templates(
            MissionKind::CouplePortrait,
            None,
            vec![TemplateAsset::remote("t", "https://cdn.example/t.png")],
        );

        assert_eq!(
            catalog
                .templates(MissionKind::CouplePortrait, Some(Gender::Male))
                .len(),
            1
        );
        assert!(catalog
            .templates(MissionKind::FestiveTransform, Some(Gender::Male))
            .is_empty());
    }
}
