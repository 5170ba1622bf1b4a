//! `SeaORM` Entity for transactions table (ledger entries).

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub type_transaction: String,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub montant: Decimal,
    pub date_transaction: DateTime,
    pub description: Option<String>,
    pub compte_destination: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub solde_avant: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub solde_apres: Decimal,
    pub account_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
