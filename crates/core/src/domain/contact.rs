use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Properties requested from the CRM when listing contacts.
pub const CONTACT_LIST_PROPERTIES: [&str; 7] =
    ["firstname", "lastname", "email", "phone", "address", "jobtitle", "company"];

pub const CONTACT_LIST_LIMIT: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    #[serde(default)]
    pub properties: ContactProperties,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactProperties {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub jobtitle: Option<String>,
    pub company: Option<String>,
}

/// A contact as the list page shows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContactRow {
    pub id: String,
    pub display_name: String,
    pub initials: String,
    pub subtitle: String,
    pub email: String,
}

impl From<&Contact> for ContactRow {
    fn from(contact: &Contact) -> Self {
        let props = &contact.properties;
        Self {
            id: contact.id.clone(),
            display_name: display_name(props.firstname.as_deref(), props.lastname.as_deref()),
            initials: initials(props.firstname.as_deref(), props.lastname.as_deref()),
            subtitle: first_present(&[props.jobtitle.as_deref(), props.company.as_deref()])
                .to_string(),
            email: props.email.clone().unwrap_or_default(),
        }
    }
}

pub fn display_name(first: Option<&str>, last: Option<&str>) -> String {
    let joined = format!("{} {}", first.unwrap_or(""), last.unwrap_or(""));
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        "Unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn initials(first: Option<&str>, last: Option<&str>) -> String {
    [first, last]
        .into_iter()
        .flatten()
        .filter_map(|name| name.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

fn first_present<'a>(candidates: &[Option<&'a str>]) -> &'a str {
    candidates.iter().flatten().copied().find(|value| !value.is_empty()).unwrap_or("")
}

/// Drops blank string values so the CRM never receives `""` for a field the
/// user left empty.
pub fn without_blank_properties(properties: Map<String, Value>) -> Map<String, Value> {
    properties
        .into_iter()
        .filter(|(_, value)| match value {
            Value::Null => false,
            Value::String(text) => !text.trim().is_empty(),
            _ => true,
        })
        .collect()
}

/// Extracts the `results` array of a CRM search response as typed contacts,
/// skipping entries that do not carry an id.
pub fn contacts_from_search(response: &Value) -> Vec<Contact> {
    response
        .get("results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|entry| serde_json::from_value::<Contact>(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::{
        contacts_from_search, display_name, initials, without_blank_properties, Contact,
        ContactProperties, ContactRow,
    };

    #[test]
    fn missing_names_fall_back_to_unknown_and_empty_initials() {
        let contact = Contact { id: "101".to_string(), properties: ContactProperties::default() };
        let row = ContactRow::from(&contact);

        assert_eq!(row.display_name, "Unknown");
        assert_eq!(row.initials, "");
        assert_eq!(row.subtitle, "");
        assert_eq!(row.email, "");
    }

    #[test]
    fn partial_names_degrade_gracefully() {
        assert_eq!(display_name(Some("ada"), None), "ada");
        assert_eq!(initials(Some("ada"), None), "A");
        assert_eq!(display_name(None, Some("Lovelace")), "Lovelace");
        assert_eq!(initials(Some(""), Some("lovelace")), "L");
        assert_eq!(display_name(Some("  "), Some("")), "Unknown");
    }

    #[test]
    fn job_title_is_preferred_over_company() {
        let contact = Contact {
            id: "7".to_string(),
            properties: ContactProperties {
                firstname: Some("Grace".to_string()),
                lastname: Some("Hopper".to_string()),
                email: Some("grace@example.com".to_string()),
                jobtitle: Some("Rear Admiral".to_string()),
                company: Some("US Navy".to_string()),
            },
        };
        let row = ContactRow::from(&contact);

        assert_eq!(row.display_name, "Grace Hopper");
        assert_eq!(row.initials, "GH");
        assert_eq!(row.subtitle, "Rear Admiral");

        let company_only = Contact {
            properties: ContactProperties { jobtitle: None, ..contact.properties.clone() },
            ..contact
        };
        assert_eq!(ContactRow::from(&company_only).subtitle, "US Navy");
    }

    #[test]
    fn blank_form_fields_are_omitted() {
        let mut properties = Map::new();
        properties.insert("email".to_string(), json!("only@example.com"));
        properties.insert("firstname".to_string(), json!(""));
        properties.insert("lastname".to_string(), json!("   "));
        properties.insert("phone".to_string(), Value::Null);

        let cleaned = without_blank_properties(properties);

        assert_eq!(Value::Object(cleaned), json!({ "email": "only@example.com" }));
    }

    #[test]
    fn search_results_without_properties_still_parse() {
        let response = json!({
            "total": 2,
            "results": [
                { "id": "1", "properties": { "firstname": "Lin", "email": "lin@example.com" } },
                { "id": "2" },
                { "properties": {} }
            ]
        });

        let contacts = contacts_from_search(&response);

        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].properties.firstname.as_deref(), Some("Lin"));
        assert_eq!(contacts[1].properties, ContactProperties::default());
    }
}
