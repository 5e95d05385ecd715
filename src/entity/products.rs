use sea_orm::entity::prelude::*;

use super::json::{ImageList, SlideColorList, SpecificationList, StringList};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub discount: i32,
    pub quantity: i32,
    #[sea_orm(column_type = "JsonBinary")]
    pub images: ImageList,
    #[sea_orm(column_type = "JsonBinary")]
    pub sizes: StringList,
    #[sea_orm(column_type = "JsonBinary")]
    pub key_features: StringList,
    #[sea_orm(column_type = "JsonBinary")]
    pub specifications: SpecificationList,
    pub care_instructions: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub slide_colors: SlideColorList,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub variants: Option<Json>,
    pub is_featured: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_categories::Entity")]
    ProductCategories,
    #[sea_orm(has_many = "super::user_favourites::Entity")]
    UserFavourites,
}

impl Related<super::product_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductCategories.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        super::product_categories::Relation::Categories.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::product_categories::Relation::Products.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
