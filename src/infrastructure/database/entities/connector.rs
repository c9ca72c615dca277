//! Connector entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "connectors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub connector_id: i32,

    #[sea_orm(primary_key, auto_increment = false)]
    pub evse_id: i32,

    #[sea_orm(primary_key, auto_increment = false)]
    pub station_id: String,

    pub max_power: f64,

    pub min_power: f64,

    /// Available, Occupied, Reserved, Unavailable, Faulted
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::evse::Entity",
        from = "(Column::EvseId, Column::StationId)",
        to = "(super::evse::Column::EvseId, super::evse::Column::StationId)"
    )]
    Evse,
}

impl Related<super::evse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Evse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
