//! Station entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub station_id: String,

    /// kW
    pub power_grid_capacity: f64,

    pub max_price_limit: f64,

    pub algorithm_mode: i32,

    pub time_extension_factor: f64,

    pub max_iteration_count: i32,

    pub billing_power_id: i64,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::evse::Entity")]
    Evse,
}

impl Related<super::evse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Evse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
