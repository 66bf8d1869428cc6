//! `SeaORM` Entity for reconciliations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reconciliations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub bank_account_id: Uuid,
    pub as_of: Date,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub statement_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub book_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub difference: Decimal,
    pub is_balanced: bool,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub cleared_balance: Decimal,
    #[sea_orm(column_type = "JsonBinary")]
    pub marked_ids: Json,
    pub uncleared_count: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bank_accounts::Entity",
        from = "Column::BankAccountId",
        to = "super::bank_accounts::Column::Id"
    )]
    BankAccounts,
}

impl Related<super::bank_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
