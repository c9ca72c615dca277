//! Startup provisioning of stations, EVSEs and connectors

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::info;

use crate::config::StationSeed;
use crate::domain::topology::{Connector, Evse, Station, TopologyRepository};
use crate::domain::{DomainError, DomainResult};

/// Upserts every seeded station with its EVSEs and connectors.
/// Returns the number of EVSEs written.
pub async fn provision_topology(
    topology: &dyn TopologyRepository,
    seeds: &[StationSeed],
) -> DomainResult<usize> {
    let mut evses = 0;
    for seed in seeds {
        if seed.id.trim().is_empty() {
            return Err(DomainError::DomainViolation(
                "station id must not be blank".into(),
            ));
        }
        let station = match topology.find_station(&seed.id).await? {
            Some(existing) => existing,
            None => Station::new(seed.id.as_str()),
        };
        topology.save_station(station).await?;

        for evse_seed in &seed.evses {
            let max_power = Decimal::from_f64(evse_seed.max_power).ok_or_else(|| {
                DomainError::DomainViolation(format!(
                    "EVSE {} of {}: max_power is not a finite number",
                    evse_seed.id, seed.id
                ))
            })?;
            let evse = Evse::new(evse_seed.id, seed.id.as_str(), max_power);
            topology.save_evse(evse.clone()).await?;
            for connector_id in 1..=evse_seed.connectors {
                topology
                    .save_connector(Connector::new(&evse, connector_id))
                    .await?;
            }
            evses += 1;
        }
        info!(station_id = %seed.id, evses = seed.evses.len(), "Station provisioned");
    }
    Ok(evses)
}
