pub mod audit_logs;
pub mod categories;
pub mod json;
pub mod product_categories;
pub mod products;
pub mod transactions;
pub mod user_favourites;
pub mod user_interests;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use categories::Entity as Categories;
pub use product_categories::Entity as ProductCategories;
pub use products::Entity as Products;
pub use transactions::Entity as Transactions;
pub use user_favourites::Entity as UserFavourites;
pub use user_interests::Entity as UserInterests;
pub use users::Entity as Users;
