//! Client registration commands.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use slotwise_domain::{ClientId, ClientProfile, Result};
use tracing::instrument;

use crate::context::AppContext;

/// Intake data collected by the conversation flow.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterClientRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientView {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub reminders_enabled: bool,
}

impl From<&ClientProfile> for ClientView {
    fn from(profile: &ClientProfile) -> Self {
        Self {
            id: profile.id.0,
            name: profile.display_name(),
            phone: profile.phone.clone(),
            reminders_enabled: profile.reminders_enabled,
        }
    }
}

/// Register or update a client profile. Idempotent; repeating the command
/// refreshes contact details.
#[instrument(skip(context, request))]
pub fn register_client(
    context: &AppContext,
    client_id: i64,
    request: RegisterClientRequest,
) -> Result<ClientView> {
    let profile = ClientProfile {
        id: ClientId(client_id),
        first_name: request.first_name,
        last_name: request.last_name,
        phone: request.phone,
        reminders_enabled: true,
        registered_at: Utc::now(),
    };
    context.clients.upsert(&profile)?;
    Ok(ClientView::from(&profile))
}

/// Fetch a profile, if one exists.
pub fn get_client(context: &AppContext, client_id: i64) -> Result<Option<ClientView>> {
    Ok(context.clients.get(ClientId(client_id))?.as_ref().map(ClientView::from))
}

/// Turn appointment reminders on or off for a client. The reminder pass
/// consults this flag before delivering.
#[instrument(skip(context))]
pub fn set_reminders(context: &AppContext, client_id: i64, enabled: bool) -> Result<()> {
    context.clients.set_reminders_enabled(ClientId(client_id), enabled)
}
