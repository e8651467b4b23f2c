//! Server-rendered contact list at `GET /`.
//!
//! Rows are rendered here from the CRM search; the deal panels, upsell scan
//! and the sync form are driven by the page script against `/api`.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Html, routing::get, Router};
use breezy_core::crm::{ContactSearch, CrmGateway};
use breezy_core::domain::contact::{contacts_from_search, ContactRow};
use breezy_core::errors::Operation;
use tera::{Context, Tera};
use tracing::{error, warn};

const CONTACTS_TEMPLATE: &str = "contacts.html";

#[derive(Clone)]
pub struct PageState {
    crm: Arc<dyn CrmGateway>,
    templates: Arc<Tera>,
}

fn init_templates() -> Result<Arc<Tera>, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template(CONTACTS_TEMPLATE, include_str!("../templates/contacts.html"))?;
    Ok(Arc::new(tera))
}

pub fn router(crm: Arc<dyn CrmGateway>) -> Result<Router, tera::Error> {
    let templates = init_templates()?;
    Ok(Router::new().route("/", get(contacts_page)).with_state(PageState { crm, templates }))
}

async fn contacts_page(
    State(state): State<PageState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let search = state.crm.search_contacts(&ContactSearch::newest_first()).await;
    let (rows, load_error) = match search {
        Ok(response) => {
            let rows: Vec<ContactRow> =
                contacts_from_search(&response).iter().map(ContactRow::from).collect();
            (rows, None)
        }
        Err(error) => {
            warn!(
                event_name = "page.contacts.fetch_failed",
                operation = Operation::FetchContacts.as_str(),
                error = %error,
                "rendering contact page without rows"
            );
            (Vec::new(), Some(Operation::FetchContacts.user_message()))
        }
    };

    let mut context = Context::new();
    context.insert("rows", &rows);
    context.insert("load_error", &load_error);

    state.templates.render(CONTACTS_TEMPLATE, &context).map(Html).map_err(|error| {
        error!(event_name = "page.render_failed", error = ?error, "contact page render failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Html("<h1>Template Error</h1>".to_string()))
    })
}
