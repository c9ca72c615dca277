//! Create evses table

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_stations::Stations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Evses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Evses::EvseId).integer().not_null())
                    .col(ColumnDef::new(Evses::StationId).string().not_null())
                    .col(
                        ColumnDef::new(Evses::MaxPower)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Evses::OperationalStatus)
                            .string()
                            .not_null()
                            .default("Operative"),
                    )
                    .primary_key(Index::create().col(Evses::EvseId).col(Evses::StationId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_evses_station")
                            .from(Evses::Table, Evses::StationId)
                            .to(Stations::Table, Stations::StationId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Evses::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Evses {
    Table,
    EvseId,
    StationId,
    MaxPower,
    OperationalStatus,
}
