use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    /// Overrides the scheme/host used for pagination links.
    pub public_base_url: Option<String>,
    pub max_body_bytes: usize,
    pub payment: PaymentConfig,
    pub images: ImageConfig,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    pub api_url: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub private_key: String,
    pub upload_url: String,
    pub api_url: String,
    pub folder: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let jwt_ttl_hours = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(24);
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        let max_body_bytes = env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10 * 1024 * 1024);

        let payment = PaymentConfig {
            key_id: env::var("RAZORPAY_KEY_ID").unwrap_or_default(),
            key_secret: env::var("RAZORPAY_KEY_SECRET").unwrap_or_default(),
            webhook_secret: env::var("RAZORPAY_WEBHOOK_SECRET").unwrap_or_default(),
            api_url: env::var("RAZORPAY_API_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string()),
            currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
        };

        let images = ImageConfig {
            private_key: env::var("IMAGEKIT_PRIVATE_KEY").unwrap_or_default(),
            upload_url: env::var("IMAGEKIT_UPLOAD_URL")
                .unwrap_or_else(|_| "https://upload.imagekit.io/api/v1/files/upload".to_string()),
            api_url: env::var("IMAGEKIT_API_URL")
                .unwrap_or_else(|_| "https://api.imagekit.io/v1".to_string()),
            folder: env::var("IMAGEKIT_FOLDER").unwrap_or_else(|_| "/products".to_string()),
        };

        if payment.key_id.is_empty() || payment.key_secret.is_empty() {
            tracing::warn!("RAZORPAY_KEY_ID / RAZORPAY_KEY_SECRET not set, payments will fail");
        }
        if images.private_key.is_empty() {
            tracing::warn!("IMAGEKIT_PRIVATE_KEY not set, image uploads will fail");
        }

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            jwt_ttl_hours,
            public_base_url,
            max_body_bytes,
            payment,
            images,
        })
    }
}
