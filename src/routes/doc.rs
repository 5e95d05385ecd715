use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthPayload, LoginRequest, RegisterRequest},
        categories::{CategoryList, CreateCategoryRequest},
        payments::{
            CheckoutRequest, CheckoutResponse, PaymentSuccessRequest, SavedCard, SavedCardList,
            VerifyPaymentRequest, VerifyPaymentResponse, WebhookAck,
        },
        products::{DeleteImageRequest, DeletedProduct, ProductFormSchema, ProductList},
        transactions::{RefundRequest, RefundResponse, TransactionList, UpdateOrderStatusRequest},
    },
    error::{ErrorData, FieldError},
    models::{
        Address, CartLine, Category, CategoryRef, OrderStatus, PaymentStatus, Product,
        ProductImage, Specification, Transaction, User,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, categories, health, payments, products, transactions},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        categories::list_categories,
        categories::create_category,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product_image,
        products::delete_product,
        payments::checkout,
        payments::verify_payment,
        payments::payment_success,
        payments::saved_cards,
        payments::webhook,
        transactions::list_transactions,
        transactions::get_transaction,
        admin::list_all_transactions,
        admin::update_order_status,
        admin::refund_transaction
    ),
    components(
        schemas(
            User,
            Address,
            Category,
            CategoryRef,
            Product,
            ProductImage,
            Specification,
            Transaction,
            CartLine,
            PaymentStatus,
            OrderStatus,
            RegisterRequest,
            LoginRequest,
            AuthPayload,
            CreateCategoryRequest,
            CategoryList,
            ProductFormSchema,
            ProductList,
            DeleteImageRequest,
            DeletedProduct,
            CheckoutRequest,
            CheckoutResponse,
            VerifyPaymentRequest,
            VerifyPaymentResponse,
            PaymentSuccessRequest,
            SavedCard,
            SavedCardList,
            WebhookAck,
            TransactionList,
            UpdateOrderStatusRequest,
            RefundRequest,
            RefundResponse,
            FieldError,
            ErrorData,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Transaction>,
            ApiResponse<TransactionList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and sessions"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Products", description = "Product catalog and admin management"),
        (name = "Payments", description = "Checkout and gateway callbacks"),
        (name = "Transactions", description = "Purchase history"),
        (name = "Admin", description = "Order administration"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/auth/login",
            "/api/products/images/{image_id}",
            "/api/payments/webhook",
            "/api/admin/transactions/{id}/refund",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn raw_body_routes_document_their_payload() {
        let doc = ApiDoc::openapi();
        for path in ["/api/payments/webhook", "/api/admin/transactions/{id}/refund"] {
            let body = doc.paths.paths[path]
                .post
                .as_ref()
                .and_then(|op| op.request_body.as_ref())
                .unwrap_or_else(|| panic!("no request body for {path}"));
            assert!(body.content.contains_key("application/json"), "{path}");
        }
    }
}
