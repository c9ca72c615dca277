//! Create meter_values table

use sea_orm_migration::prelude::*;

use super::m20250101_000004_create_transactions::Transactions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MeterValues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MeterValues::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MeterValues::TransactionId).string().not_null())
                    .col(
                        ColumnDef::new(MeterValues::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MeterValues::Measurand).string().not_null())
                    .col(ColumnDef::new(MeterValues::Value).double().not_null())
                    .col(ColumnDef::new(MeterValues::Unit).string())
                    .col(ColumnDef::new(MeterValues::Phase).string())
                    .col(ColumnDef::new(MeterValues::Location).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meter_values_transaction")
                            .from(MeterValues::Table, MeterValues::TransactionId)
                            .to(Transactions::Table, Transactions::TransactionId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meter_values_tx_time")
                    .table(MeterValues::Table)
                    .col(MeterValues::TransactionId)
                    .col(MeterValues::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MeterValues::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum MeterValues {
    Table,
    Id,
    TransactionId,
    Timestamp,
    Measurand,
    Value,
    Unit,
    Phase,
    Location,
}
