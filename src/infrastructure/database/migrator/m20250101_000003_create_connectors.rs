//! Create connectors table

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
                    .table(Connectors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Connectors::ConnectorId).integer().not_null())
                    .col(ColumnDef::new(Connectors::EvseId).integer().not_null())
                    .col(ColumnDef::new(Connectors::StationId).string().not_null())
                    .col(
                        ColumnDef::new(Connectors::MaxPower)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Connectors::MinPower)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Connectors::Status)
                            .string()
                            .not_null()
                            .default("Available"),
                    )
                    .primary_key(
                        Index::create()
                            .col(Connectors::ConnectorId)
                            .col(Connectors::EvseId)
                            .col(Connectors::StationId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_connectors_evse")
                            .from(Connectors::Table, (Connectors::EvseId, Connectors::StationId))
                            .to(Evses::Table, (Evses::EvseId, Evses::StationId))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Connectors::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Connectors {
    Table,
    ConnectorId,
    EvseId,
    StationId,
    MaxPower,
    MinPower,
    Status,
}
