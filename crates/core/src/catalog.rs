//! CRM portal identifiers used by the deal router.
//!
//! Pipelines, stages and the device schema are defined per CRM portal. The
//! defaults match the production portal; a sandbox portal supplies its own
//! set through the `[catalog]` config section.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmCatalog {
    pub hardware: HardwarePipeline,
    pub subscription: SubscriptionPipeline,
    pub device: DeviceSchema,
    /// HUBSPOT_DEFINED association type for deal -> contact.
    pub deal_to_contact_association_id: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwarePipeline {
    pub id: String,
    pub stage_purchase_completed: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPipeline {
    pub id: String,
    pub stage_trial_started: String,
    pub stage_purchased: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSchema {
    pub type_id: String,
    pub model_property: String,
    pub descriptor_property: String,
    /// USER_DEFINED association type for device -> contact.
    pub association_type_id: u32,
}

impl Default for CrmCatalog {
    fn default() -> Self {
        Self {
            hardware: HardwarePipeline {
                id: "t_e8a621a61c7c37dfce7425e0b9ea755e".to_string(),
                stage_purchase_completed: "1232748376".to_string(),
            },
            subscription: SubscriptionPipeline {
                id: "t_9be7681e91998954b36b31b52a29aba6".to_string(),
                stage_trial_started: "1232706850".to_string(),
                stage_purchased: "1232706853".to_string(),
            },
            device: DeviceSchema {
                type_id: "2-53614619".to_string(),
                model_property: "model".to_string(),
                descriptor_property: "thermostat".to_string(),
                association_type_id: 37,
            },
            deal_to_contact_association_id: 3,
        }
    }
}

impl CrmCatalog {
    pub fn apply_patch(&mut self, patch: CatalogPatch) {
        if let Some(value) = patch.hardware_pipeline_id {
            self.hardware.id = value;
        }
        if let Some(value) = patch.hardware_stage_purchase_completed {
            self.hardware.stage_purchase_completed = value;
        }
        if let Some(value) = patch.subscription_pipeline_id {
            self.subscription.id = value;
        }
        if let Some(value) = patch.subscription_stage_trial_started {
            self.subscription.stage_trial_started = value;
        }
        if let Some(value) = patch.subscription_stage_purchased {
            self.subscription.stage_purchased = value;
        }
        if let Some(value) = patch.device_type_id {
            self.device.type_id = value;
        }
        if let Some(value) = patch.device_model_property {
            self.device.model_property = value;
        }
        if let Some(value) = patch.device_descriptor_property {
            self.device.descriptor_property = value;
        }
        if let Some(value) = patch.device_association_type_id {
            self.device.association_type_id = value;
        }
        if let Some(value) = patch.deal_to_contact_association_id {
            self.deal_to_contact_association_id = value;
        }
    }

    /// Returns the first identifier that is blank, as a dotted config key.
    pub fn first_blank_field(&self) -> Option<&'static str> {
        let fields = [
            ("catalog.hardware_pipeline_id", &self.hardware.id),
            ("catalog.hardware_stage_purchase_completed", &self.hardware.stage_purchase_completed),
            ("catalog.subscription_pipeline_id", &self.subscription.id),
            ("catalog.subscription_stage_trial_started", &self.subscription.stage_trial_started),
            ("catalog.subscription_stage_purchased", &self.subscription.stage_purchased),
            ("catalog.device_type_id", &self.device.type_id),
            ("catalog.device_model_property", &self.device.model_property),
            ("catalog.device_descriptor_property", &self.device.descriptor_property),
        ];
        fields.into_iter().find(|(_, value)| value.trim().is_empty()).map(|(key, _)| key)
    }
}

/// Flat `[catalog]` section of the config file.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogPatch {
    pub hardware_pipeline_id: Option<String>,
    pub hardware_stage_purchase_completed: Option<String>,
    pub subscription_pipeline_id: Option<String>,
    pub subscription_stage_trial_started: Option<String>,
    pub subscription_stage_purchased: Option<String>,
    pub device_type_id: Option<String>,
    pub device_model_property: Option<String>,
    pub device_descriptor_property: Option<String>,
    pub device_association_type_id: Option<u32>,
    pub deal_to_contact_association_id: Option<u32>,
}
