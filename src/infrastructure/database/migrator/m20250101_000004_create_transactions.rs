//! Create transactions table

use sea_orm_migration::prelude::*;

use super::m20250101_000002_create_evses::Evses;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::TransactionId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::EvseId).integer().not_null())
                    .col(ColumnDef::new(Transactions::StationId).string().not_null())
                    .col(ColumnDef::new(Transactions::ConnectorId).integer().not_null())
                    .col(ColumnDef::new(Transactions::IdToken).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::EventType)
                            .string()
                            .not_null()
                            .default("STARTED"),
                    )
                    .col(ColumnDef::new(Transactions::ChargingState).string())
                    .col(
                        ColumnDef::new(Transactions::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::StopTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(Transactions::StartMeterValue).double())
                    .col(ColumnDef::new(Transactions::StopMeterValue).double())
                    .col(ColumnDef::new(Transactions::TotalEnergy).double())
                    .col(ColumnDef::new(Transactions::StopReason).string())
                    .col(
                        ColumnDef::new(Transactions::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_evse")
                            .from(
                                Transactions::Table,
                                (Transactions::EvseId, Transactions::StationId),
                            )
                            .to(Evses::Table, (Evses::EvseId, Evses::StationId))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Active-list lookups filter on station and open state
        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_station_stop")
                    .table(Transactions::Table)
                    .col(Transactions::StationId)
                    .col(Transactions::StopTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Transactions {
    Table,
    TransactionId,
    EvseId,
    StationId,
    ConnectorId,
    IdToken,
    EventType,
    ChargingState,
    StartTime,
    StopTime,
    StartMeterValue,
    StopMeterValue,
    TotalEnergy,
    StopReason,
    Version,
    CreatedAt,
    UpdatedAt,
}
