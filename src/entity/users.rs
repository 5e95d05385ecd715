use sea_orm::entity::prelude::*;

use super::json::{AddressList, StringList};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub fullname: Option<String>,
    pub profile: Option<String>,
    pub profile_image_id: Option<String>,
    pub bio: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub joining_reasons: StringList,
    #[sea_orm(column_type = "JsonBinary")]
    pub addresses: AddressList,
    pub is_admin: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::user_interests::Entity")]
    UserInterests,
    #[sea_orm(has_many = "super::user_favourites::Entity")]
    UserFavourites,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_interests::Relation::Categories.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::user_interests::Relation::Users.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
