//! Workflow and template pools plus the fallback resolver that searches
//! their cross product for a moderation-safe combination.

mod resolver;

use serde::{Deserialize, Serialize};

pub use resolver::{FallbackResolver, Resolution, ResolverEvent};

use crate::error::{ForgeError, Result};
use crate::provider::{AssetPublisher, SlotBinding};

/// One configured provider workflow. Static, read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOption {
    pub id: String,
    /// Lower priority is tried first.
    pub priority: u32,
    pub enabled: bool,
    /// Provider-side workflow/graph identifier.
    pub external_workflow_id: String,
    pub slot_mapping: SlotMapping,
}

impl WorkflowOption {
    pub fn new(id: impl Into<String>, external_workflow_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            enabled: true,
            external_workflow_id: external_workflow_id.into(),
            slot_mapping: SlotMapping::default(),
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_slot_mapping(mut self, slot_mapping: SlotMapping) -> Self {
        self.slot_mapping = slot_mapping;
        self
    }
}

/// Which provider-side input slots receive which logical inputs. A workflow
/// may feed the same image into several slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotMapping {
    pub subject_slots: Vec<String>,
    pub template_slots: Vec<String>,
}

impl SlotMapping {
    pub fn new(
        subject_slots: Vec<impl Into<String>>,
        template_slots: Vec<impl Into<String>>,
    ) -> Self {
        Self {
            subject_slots: subject_slots.into_iter().map(Into::into).collect(),
            template_slots: template_slots.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the request bindings. A single subject photo is bound to every
    /// subject slot; multiple photos are bound pairwise in slot order.
    pub fn bind(
        &self,
        subject_urls: &[String],
        template_url: Option<&str>,
    ) -> Result<Vec<SlotBinding>> {
        let mut bindings = Vec::new();

        match subject_urls {
            [] => {}
            [single] => {
                for slot in &self.subject_slots {
                    bindings.push(SlotBinding {
                        slot: slot.clone(),
                        image_url: single.clone(),
                    });
                }
            }
            many => {
                if many.len() != self.subject_slots.len() {
                    return Err(ForgeError::InvalidInput(format!(
                        "{} subject photos for {} subject slots",
                        many.len(),
                        self.subject_slots.len()
                    )));
                }
                for (slot, url) in self.subject_slots.iter().zip(many) {
                    bindings.push(SlotBinding {
                        slot: slot.clone(),
                        image_url: url.clone(),
                    });
                }
            }
        }

        if let Some(url) = template_url {
            for slot in &self.template_slots {
                bindings.push(SlotBinding {
                    slot: slot.clone(),
                    image_url: url.to_string(),
                });
            }
        }

        Ok(bindings)
    }
}

/// A reusable visual asset combined with user input during generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateAsset {
    pub id: String,
    pub location: TemplateLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateLocation {
    /// Already provider-consumable.
    Remote(String),
    /// Local payload that must be published first.
    Local(String),
}

impl TemplateAsset {
    pub fn remote(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: TemplateLocation::Remote(url.into()),
        }
    }

    pub fn local(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: TemplateLocation::Local(payload.into()),
        }
    }

    /// Provider-consumable reference, publishing local payloads on demand.
    pub async fn resolve(&self, publisher: &dyn AssetPublisher) -> Result<String> {
        match &self.location {
            TemplateLocation::Remote(url) => Ok(url.clone()),
            TemplateLocation::Local(payload) => Ok(publisher.publish(payload).await?.url),
        }
    }
}
