pub mod auth_service;
pub mod category_service;
pub mod payment_service;
pub mod product_service;
pub mod transaction_service;
