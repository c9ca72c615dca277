//! Topology repository interface

use async_trait::async_trait;

use super::model::{Connector, Evse, Station};
use crate::domain::DomainResult;

#[async_trait]
pub trait TopologyRepository: Send + Sync {
    async fn save_station(&self, station: Station) -> DomainResult<()>;
    async fn find_station(&self, station_id: &str) -> DomainResult<Option<Station>>;
    /// Removes the station together with its EVSEs, connectors and transactions.
    async fn delete_station(&self, station_id: &str) -> DomainResult<()>;

    async fn save_evse(&self, evse: Evse) -> DomainResult<()>;
    async fn find_evse(&self, evse_id: i32, station_id: &str) -> DomainResult<Option<Evse>>;
    async fn find_evses_by_station(&self, station_id: &str) -> DomainResult<Vec<Evse>>;

    async fn save_connector(&self, connector: Connector) -> DomainResult<()>;
    async fn find_connectors_by_evse(
        &self,
        evse_id: i32,
        station_id: &str,
    ) -> DomainResult<Vec<Connector>>;
}
