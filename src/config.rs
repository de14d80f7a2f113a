use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base that relative object keys are joined onto when building image URLs.
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NutritionConfig {
    pub api_url: String,
    pub app_id: String,
    pub app_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagingConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub nutrition: NutritionConfig,
    pub paging: PagingConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse_or(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "recipeshare"),
            audience: env_or("JWT_AUDIENCE", "recipeshare-users"),
            ttl_minutes: env_parse_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_parse_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };

        let endpoint = env_or("S3_ENDPOINT", "http://localhost:9000");
        let bucket = env_or("S3_BUCKET", "recipe-images");
        let storage = StorageConfig {
            public_url: std::env::var("STORAGE_PUBLIC_URL")
                .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket)),
            endpoint,
            bucket,
            access_key: std::env::var("S3_ACCESS_KEY")?,
            secret_key: std::env::var("S3_SECRET_KEY")?,
            region: env_or("S3_REGION", "us-east-1"),
        };

        let nutrition = NutritionConfig {
            api_url: env_or(
                "EDAMAM_API_URL",
                "https://api.edamam.com/api/nutrition-details",
            ),
            app_id: env_or("EDAMAM_APP_ID", ""),
            app_key: env_or("EDAMAM_APP_KEY", ""),
        };

        let defaults = PagingConfig::default();
        let paging = PagingConfig {
            default_page_size: env_parse_or("DEFAULT_PAGE_SIZE", defaults.default_page_size),
            max_page_size: env_parse_or("MAX_PAGE_SIZE", defaults.max_page_size),
        };

        Ok(Self {
            database_url,
            jwt,
            storage,
            nutrition,
            paging,
        })
    }
}
