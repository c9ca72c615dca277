//! EVSE entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "evses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub evse_id: i32,

    #[sea_orm(primary_key, auto_increment = false)]
    pub station_id: String,

    /// kW
    pub max_power: f64,

    /// Operative, Inoperative
    pub operational_status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::station::Entity",
        from = "Column::StationId",
        to = "super::station::Column::StationId"
    )]
    Station,
}

impl Related<super::station::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Station.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
