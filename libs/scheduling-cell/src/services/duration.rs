use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use directory_cell::services::ServiceCatalog;

use crate::models::{PlannedServiceLine, SchedulingError, ServicePlan};

/// Resolves a requested service list into total occupied time and the set of
/// rooms able to host every service in the visit.
pub struct DurationCalculator {
    catalog: Arc<ServiceCatalog>,
}

impl DurationCalculator {
    pub fn new(catalog: Arc<ServiceCatalog>) -> Self {
        Self { catalog }
    }

    /// Total duration = sum of (duration + buffer) over all requested
    /// services. Room compatibility is the intersection across services,
    /// restricted to active rooms. An empty intersection is a valid plan;
    /// slot search reports it, booking rejects the chosen room.
    pub async fn plan(
        &self,
        service_codes: &[String],
        auth_token: &str,
    ) -> Result<ServicePlan, SchedulingError> {
        if service_codes.is_empty() {
            return Err(SchedulingError::EmptyServiceList);
        }

        let mut service_lines = Vec::with_capacity(service_codes.len());
        let mut total_duration_minutes = 0i64;
        let mut compatible: Option<HashSet<String>> = None;

        for code in service_codes {
            let service = self.catalog.find_by_code(code, auth_token).await?;
            if !service.is_active {
                return Err(SchedulingError::ServiceInactive(code.clone()));
            }

            total_duration_minutes +=
                service.default_duration_minutes + service.default_buffer_minutes;

            let rooms: HashSet<String> = self
                .catalog
                .room_codes_for_service(code, auth_token)
                .await?
                .into_iter()
                .collect();

            compatible = Some(match compatible {
                Some(acc) => intersect_room_codes(&acc, &rooms),
                None => rooms,
            });

            service_lines.push(PlannedServiceLine {
                service_id: service.id,
                service_code: service.service_code,
                duration_minutes: service.default_duration_minutes,
                buffer_minutes: service.default_buffer_minutes,
                specialization_id: service.specialization_id,
            });
        }

        let active: HashSet<String> = self
            .catalog
            .active_room_codes(auth_token)
            .await?
            .into_iter()
            .collect();

        let mut compatible_room_codes: Vec<String> = compatible
            .unwrap_or_default()
            .intersection(&active)
            .cloned()
            .collect();
        compatible_room_codes.sort();

        debug!(
            "Planned {} services, {} min total, {} compatible rooms",
            service_lines.len(),
            total_duration_minutes,
            compatible_room_codes.len()
        );

        Ok(ServicePlan {
            total_duration_minutes,
            service_lines,
            compatible_room_codes,
        })
    }
}

fn intersect_room_codes(a: &HashSet<String>, b: &HashSet<String>) -> HashSet<String> {
    a.intersection(b).cloned().collect()
}
