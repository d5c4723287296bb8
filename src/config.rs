// config.rs
use std::str::FromStr;

use bigdecimal::BigDecimal;

/// Tariff constants injected into the pricing engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    pub base_fee: BigDecimal,
    pub base_distance_km: BigDecimal,
    pub cost_per_km: BigDecimal,
    pub markup_percentage: BigDecimal,
    pub overweight_threshold_kg: BigDecimal,
    pub minutes_per_km: BigDecimal,
    pub driver_earnings_percentage: BigDecimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_fee: BigDecimal::from(500),
            base_distance_km: BigDecimal::from(5),
            cost_per_km: BigDecimal::from(50),
            markup_percentage: BigDecimal::from(20),
            overweight_threshold_kg: BigDecimal::from(2000),
            minutes_per_km: BigDecimal::from_str("2.5").unwrap_or_else(|_| BigDecimal::from(2)),
            driver_earnings_percentage: BigDecimal::from(70),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MpesaConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub business_short_code: String,
    pub passkey: String,
    pub callback_url: String,
    pub environment: String,
}

impl MpesaConfig {
    pub fn base_url(&self) -> &'static str {
        if self.environment == "production" {
            "https://api.safaricom.co.ke"
        } else {
            "https://sandbox.safaricom.co.ke"
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub url: String,
    pub bucket: String,
    pub service_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub log_level: String,
    pub allowed_origins: Vec<String>,
    pub pricing: PricingConfig,
    pub mpesa: MpesaConfig,
    pub storage: StorageConfig,
    pub gateway_timeout_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn decimal_env(key: &str, default: BigDecimal) -> BigDecimal {
    match std::env::var(key) {
        Ok(raw) => BigDecimal::from_str(raw.trim()).unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value {:?} for {}", raw, key);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");

        let port = env_or("PORT", "8000").parse::<u16>().unwrap_or(8000);
        let gateway_timeout_secs = env_or("GATEWAY_TIMEOUT_SECS", "15")
            .parse::<u64>()
            .unwrap_or(15);

        let defaults = PricingConfig::default();
        let pricing = PricingConfig {
            base_fee: decimal_env("BASE_FEE_AMOUNT", defaults.base_fee),
            base_distance_km: decimal_env("BASE_FEE_DISTANCE_KM", defaults.base_distance_km),
            cost_per_km: decimal_env("COST_PER_KM", defaults.cost_per_km),
            markup_percentage: decimal_env("PLATFORM_MARKUP_PERCENTAGE", defaults.markup_percentage),
            overweight_threshold_kg: decimal_env("OVERWEIGHT_THRESHOLD_KG", defaults.overweight_threshold_kg),
            minutes_per_km: decimal_env("MINUTES_PER_KM", defaults.minutes_per_km),
            driver_earnings_percentage: decimal_env("DRIVER_EARNINGS_PERCENTAGE", defaults.driver_earnings_percentage),
        };

        // M-Pesa Daraja credentials (sandbox defaults)
        let mpesa = MpesaConfig {
            consumer_key: env_or("MPESA_CONSUMER_KEY", ""),
            consumer_secret: env_or("MPESA_CONSUMER_SECRET", ""),
            business_short_code: env_or("MPESA_BUSINESS_SHORTCODE", ""),
            passkey: env_or("MPESA_PASSKEY", ""),
            callback_url: env_or("MPESA_CALLBACK_URL", ""),
            environment: env_or("MPESA_ENVIRONMENT", "sandbox"),
        };

        let storage = StorageConfig {
            url: env_or("STORAGE_URL", ""),
            bucket: env_or("STORAGE_BUCKET", "delivery-photos"),
            service_key: env_or("STORAGE_SERVICE_KEY", ""),
        };

        let allowed_origins = env_or("ALLOWED_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Config {
            database_url,
            jwt_secret,
            port,
            log_level: env_or("LOG_LEVEL", "debug"),
            allowed_origins,
            pricing,
            mpesa,
            storage,
            gateway_timeout_secs,
        }
    }
}
