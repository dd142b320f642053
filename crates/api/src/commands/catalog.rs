//! Service catalog commands.

use serde::Serialize;
use slotwise_domain::Service;

use crate::context::AppContext;

/// One service as shown in the chat menu.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceView {
    pub id: String,
    pub name: String,
    pub duration_minutes: u32,
}

impl From<&Service> for ServiceView {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id.to_string(),
            name: service.name.clone(),
            duration_minutes: service.duration_minutes,
        }
    }
}

/// Services in configured display order.
pub fn list_services(context: &AppContext) -> Vec<ServiceView> {
    context.catalog.services().iter().map(ServiceView::from).collect()
}
