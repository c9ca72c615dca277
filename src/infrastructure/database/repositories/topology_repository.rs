//! SeaORM implementation of TopologyRepository

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use super::conversions::{decimal_from_db, decimal_to_db, parse_column};
use crate::domain::topology::{Connector, Evse, Station, TopologyRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{connector, evse, meter_value, station, transaction};

pub struct SeaOrmTopologyRepository {
    db: DatabaseConnection,
}

impl SeaOrmTopologyRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn station_to_domain(m: station::Model) -> DomainResult<Station> {
    Ok(Station {
        station_id: m.station_id,
        power_grid_capacity: decimal_from_db(m.power_grid_capacity)?,
        max_price_limit: decimal_from_db(m.max_price_limit)?,
        algorithm_mode: m.algorithm_mode,
        time_extension_factor: decimal_from_db(m.time_extension_factor)?,
        max_iteration_count: m.max_iteration_count,
        billing_power_id: m.billing_power_id,
        created_at: m.created_at,
    })
}

pub(super) fn evse_to_domain(m: evse::Model) -> DomainResult<Evse> {
    Ok(Evse {
        evse_id: m.evse_id,
        station_id: m.station_id,
        max_power: decimal_from_db(m.max_power)?,
        operational_status: parse_column(&m.operational_status)?,
    })
}

fn connector_to_domain(m: connector::Model) -> DomainResult<Connector> {
    Ok(Connector {
        connector_id: m.connector_id,
        evse_id: m.evse_id,
        station_id: m.station_id,
        max_power: decimal_from_db(m.max_power)?,
        min_power: decimal_from_db(m.min_power)?,
        status: parse_column(m.status.as_str())?,
    })
}

// ── TopologyRepository impl ─────────────────────────────────────

#[async_trait]
impl TopologyRepository for SeaOrmTopologyRepository {
    async fn save_station(&self, s: Station) -> DomainResult<()> {
        debug!(station_id = %s.station_id, "Saving station");
        let model = station::ActiveModel {
            station_id: Set(s.station_id),
            power_grid_capacity: Set(decimal_to_db(s.power_grid_capacity)),
            max_price_limit: Set(decimal_to_db(s.max_price_limit)),
            algorithm_mode: Set(s.algorithm_mode),
            time_extension_factor: Set(decimal_to_db(s.time_extension_factor)),
            max_iteration_count: Set(s.max_iteration_count),
            billing_power_id: Set(s.billing_power_id),
            created_at: Set(s.created_at),
        };
        station::Entity::insert(model)
            .on_conflict(
                OnConflict::column(station::Column::StationId)
                    .update_columns([
                        station::Column::PowerGridCapacity,
                        station::Column::MaxPriceLimit,
                        station::Column::AlgorithmMode,
                        station::Column::TimeExtensionFactor,
                        station::Column::MaxIterationCount,
                        station::Column::BillingPowerId,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn find_station(&self, station_id: &str) -> DomainResult<Option<Station>> {
        station::Entity::find_by_id(station_id.to_string())
            .one(&self.db)
            .await?
            .map(station_to_domain)
            .transpose()
    }

    async fn delete_station(&self, station_id: &str) -> DomainResult<()> {
        let txn = self.db.begin().await?;

        let removed = station::Entity::find_by_id(station_id.to_string())
            .one(&txn)
            .await?;
        if removed.is_none() {
            return Err(DomainError::not_found("Station", "stationId", station_id));
        }

        let transaction_ids: Vec<String> = transaction::Entity::find()
            .filter(transaction::Column::StationId.eq(station_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|t| t.transaction_id)
            .collect();

        meter_value::Entity::delete_many()
            .filter(meter_value::Column::TransactionId.is_in(transaction_ids.clone()))
            .exec(&txn)
            .await?;
        transaction::Entity::delete_many()
            .filter(transaction::Column::StationId.eq(station_id))
            .exec(&txn)
            .await?;
        connector::Entity::delete_many()
            .filter(connector::Column::StationId.eq(station_id))
            .exec(&txn)
            .await?;
        evse::Entity::delete_many()
            .filter(evse::Column::StationId.eq(station_id))
            .exec(&txn)
            .await?;
        station::Entity::delete_by_id(station_id.to_string())
            .exec(&txn)
            .await?;

        txn.commit().await?;
        debug!(station_id, transactions = transaction_ids.len(), "Station deleted");
        Ok(())
    }

    async fn save_evse(&self, e: Evse) -> DomainResult<()> {
        if self.find_station(&e.station_id).await?.is_none() {
            return Err(DomainError::not_found("Station", "stationId", &e.station_id));
        }
        debug!(evse_id = e.evse_id, station_id = %e.station_id, "Saving EVSE");
        let model = evse::ActiveModel {
            evse_id: Set(e.evse_id),
            station_id: Set(e.station_id),
            max_power: Set(decimal_to_db(e.max_power)),
            operational_status: Set(e.operational_status.as_str().to_string()),
        };
        evse::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([evse::Column::EvseId, evse::Column::StationId])
                    .update_columns([evse::Column::MaxPower, evse::Column::OperationalStatus])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn find_evse(&self, evse_id: i32, station_id: &str) -> DomainResult<Option<Evse>> {
        evse::Entity::find_by_id((evse_id, station_id.to_string()))
            .one(&self.db)
            .await?
            .map(evse_to_domain)
            .transpose()
    }

    async fn find_evses_by_station(&self, station_id: &str) -> DomainResult<Vec<Evse>> {
        evse::Entity::find()
            .filter(evse::Column::StationId.eq(station_id))
            .order_by_asc(evse::Column::EvseId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(evse_to_domain)
            .collect()
    }

    async fn save_connector(&self, c: Connector) -> DomainResult<()> {
        if self.find_evse(c.evse_id, &c.station_id).await?.is_none() {
            return Err(DomainError::not_found(
                "EVSE",
                "evseId-stationId",
                format!("{}-{}", c.evse_id, c.station_id),
            ));
        }
        let model = connector::ActiveModel {
            connector_id: Set(c.connector_id),
            evse_id: Set(c.evse_id),
            station_id: Set(c.station_id),
            max_power: Set(decimal_to_db(c.max_power)),
            min_power: Set(decimal_to_db(c.min_power)),
            status: Set(c.status.as_str().to_string()),
        };
        connector::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    connector::Column::ConnectorId,
                    connector::Column::EvseId,
                    connector::Column::StationId,
                ])
                .update_columns([
                    connector::Column::MaxPower,
                    connector::Column::MinPower,
                    connector::Column::Status,
                ])
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn find_connectors_by_evse(
        &self,
        evse_id: i32,
        station_id: &str,
    ) -> DomainResult<Vec<Connector>> {
        connector::Entity::find()
            .filter(connector::Column::EvseId.eq(evse_id))
            .filter(connector::Column::StationId.eq(station_id))
            .order_by_asc(connector::Column::ConnectorId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(connector_to_domain)
            .collect()
    }
}
