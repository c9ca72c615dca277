//! Transaction entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub transaction_id: String,

    pub evse_id: i32,

    pub station_id: String,

    pub connector_id: i32,

    pub id_token: String,

    /// STARTED, UPDATED, ENDED
    pub event_type: String,

    /// CHARGING, SUSPENDED_EV, SUSPENDED_EVSE, IDLE
    #[sea_orm(nullable)]
    pub charging_state: Option<String>,

    pub start_time: DateTimeUtc,

    #[sea_orm(nullable)]
    pub stop_time: Option<DateTimeUtc>,

    /// Wh
    #[sea_orm(nullable)]
    pub start_meter_value: Option<f64>,

    /// Wh
    #[sea_orm(nullable)]
    pub stop_meter_value: Option<f64>,

    /// kWh
    #[sea_orm(nullable)]
    pub total_energy: Option<f64>,

    #[sea_orm(nullable)]
    pub stop_reason: Option<String>,

    pub version: i32,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::evse::Entity",
        from = "(Column::EvseId, Column::StationId)",
        to = "(super::evse::Column::EvseId, super::evse::Column::StationId)"
    )]
    Evse,
    #[sea_orm(has_many = "super::meter_value::Entity")]
    MeterValue,
}

impl Related<super::evse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Evse.def()
    }
}

impl Related<super::meter_value::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MeterValue.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
