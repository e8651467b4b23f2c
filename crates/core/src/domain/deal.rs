use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Properties requested when reading a contact's deals.
pub const DEAL_READ_PROPERTIES: [&str; 5] =
    ["dealname", "amount", "dealstage", "createdate", "pipeline"];

/// Deal fields as the browser submits them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestedDeal {
    pub dealname: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// The browser always sends `closedwon`; the router picks the real stage.
    #[serde(default)]
    pub dealstage: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssociationCategory {
    HubspotDefined,
    UserDefined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationSpec {
    #[serde(rename = "associationCategory")]
    pub category: AssociationCategory,
    #[serde(rename = "associationTypeId")]
    pub type_id: u32,
}

impl AssociationSpec {
    pub fn hubspot_defined(type_id: u32) -> Self {
        Self { category: AssociationCategory::HubspotDefined, type_id }
    }

    pub fn user_defined(type_id: u32) -> Self {
        Self { category: AssociationCategory::UserDefined, type_id }
    }
}

/// CRM deal properties written on creation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DealProperties {
    pub dealname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    pub pipeline: String,
    pub dealstage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closedate: Option<String>,
}

/// A deal to create, already placed in a pipeline and linked to one contact.
#[derive(Clone, Debug, PartialEq)]
pub struct NewDeal {
    pub properties: DealProperties,
    pub contact_id: String,
    pub association: AssociationSpec,
}

/// Reads the `id` of a CRM object response.
pub fn object_id(response: &Value) -> Option<String> {
    match response.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{object_id, AssociationSpec, DealProperties, RequestedDeal};

    #[test]
    fn requested_deal_accepts_string_or_number_amounts() {
        let from_string: RequestedDeal = serde_json::from_value(json!({
            "dealname": "Breezy Premium (Monthly)",
            "amount": "9.99",
            "dealstage": "closedwon"
        }))
        .expect("string amount should parse");
        assert_eq!(from_string.amount, Some(Decimal::new(999, 2)));

        let from_number: RequestedDeal =
            serde_json::from_value(json!({ "dealname": "Breezy Premium (Annually)", "amount": 99 }))
                .expect("numeric amount should parse");
        assert_eq!(from_number.amount, Some(Decimal::new(99, 0)));
        assert_eq!(from_number.dealstage, None);
    }

    #[test]
    fn deal_properties_serialize_amount_as_string_and_skip_missing_fields() {
        let properties = DealProperties {
            dealname: "Thermostat Hardware Purchase".to_string(),
            amount: Some(Decimal::new(29900, 2)),
            pipeline: "hw".to_string(),
            dealstage: "done".to_string(),
            closedate: None,
        };

        assert_eq!(
            serde_json::to_value(&properties).expect("serialize"),
            json!({
                "dealname": "Thermostat Hardware Purchase",
                "amount": "299.00",
                "pipeline": "hw",
                "dealstage": "done"
            })
        );
    }

    #[test]
    fn association_spec_uses_crm_field_names() {
        assert_eq!(
            serde_json::to_value(AssociationSpec::user_defined(37)).expect("serialize"),
            json!({ "associationCategory": "USER_DEFINED", "associationTypeId": 37 })
        );
    }

    #[test]
    fn object_id_reads_string_and_numeric_ids() {
        assert_eq!(object_id(&json!({ "id": "42" })), Some("42".to_string()));
        assert_eq!(object_id(&json!({ "id": 42 })), Some("42".to_string()));
        assert_eq!(object_id(&json!({ "status": "ok" })), None);
    }
}
