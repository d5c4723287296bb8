// service/pricing_service.rs
use std::collections::HashMap;

use bigdecimal::BigDecimal;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::PricingConfig,
    models::materialmodel::Material,
    service::error::ServiceError,
    utils::currency::{ceil_to_integer, format_kes, format_one_decimal},
};

/// Loads more than this far over capacity cannot be booked at all.
const OVERWEIGHT_BLOCK_KG: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialSelection {
    pub material_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialLine {
    pub material_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_weight_kg: BigDecimal,
    pub handling_fee_per_unit: BigDecimal,
    pub total_weight_kg: BigDecimal,
    pub handling_fee: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBreakdown {
    pub base_fee_details: String,
    pub distance_fee_details: String,
    pub handling_fee_details: String,
    pub platform_fee_details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub total_distance_km: BigDecimal,
    pub estimated_duration_minutes: i64,

    pub total_weight_kg: BigDecimal,
    pub is_overweight: bool,
    pub requires_straps: bool,
    pub requires_tarp: bool,
    pub has_fragile_items: bool,

    pub base_fee: BigDecimal,
    pub distance_fee: BigDecimal,
    pub handling_fee: BigDecimal,
    pub subtotal: BigDecimal,
    pub platform_fee: BigDecimal,
    pub total_amount: BigDecimal,

    pub materials: Vec<MaterialLine>,
    pub breakdown: PriceBreakdown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeightAdvisory {
    WithinCapacity,
    /// Over capacity but within tolerance; the client must acknowledge it.
    Overweight,
    Blocked,
}

#[derive(Debug, Clone)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Quote a trip. `catalog` must contain every selected material; inactive or
    /// missing entries reject the whole quote rather than under-charging.
    pub fn compute_price(
        &self,
        distance_km: &BigDecimal,
        selections: &[MaterialSelection],
        catalog: &[Material],
    ) -> Result<PriceQuote, ServiceError> {
        if distance_km <= &BigDecimal::zero() {
            return Err(ServiceError::Validation("Valid distance is required".to_string()));
        }
        if selections.is_empty() {
            return Err(ServiceError::Validation(
                "At least one material is required".to_string(),
            ));
        }

        let by_id: HashMap<Uuid, &Material> = catalog
            .iter()
            .filter(|m| m.is_active)
            .map(|m| (m.id, m))
            .collect();

        let mut total_weight_kg = BigDecimal::zero();
        let mut total_handling_fee = BigDecimal::zero();
        let mut requires_straps = false;
        let mut requires_tarp = false;
        let mut has_fragile_items = false;
        let mut materials = Vec::with_capacity(selections.len());

        for selected in selections {
            if selected.quantity <= 0 {
                return Err(ServiceError::Validation(
                    "Quantity must be a positive number".to_string(),
                ));
            }

            let material = by_id
                .get(&selected.material_id)
                .ok_or(ServiceError::MaterialNotFound(selected.material_id))?;

            let quantity = BigDecimal::from(selected.quantity);
            let item_weight = &material.unit_weight_kg * &quantity;
            let item_handling = &material.handling_fee_per_unit * &quantity;

            total_weight_kg += &item_weight;
            total_handling_fee += &item_handling;

            requires_straps |= material.requires_straps;
            requires_tarp |= material.requires_tarp;
            has_fragile_items |= material.is_fragile;

            materials.push(MaterialLine {
                material_id: material.id,
                name: material.name.clone(),
                quantity: selected.quantity,
                unit_weight_kg: material.unit_weight_kg.clone(),
                handling_fee_per_unit: material.handling_fee_per_unit.clone(),
                total_weight_kg: item_weight,
                handling_fee: item_handling,
            });
        }

        let cfg = &self.config;
        let base_fee = cfg.base_fee.clone();

        let extra_km = distance_km - &cfg.base_distance_km;
        let extra_km = if extra_km > BigDecimal::zero() {
            extra_km
        } else {
            BigDecimal::zero()
        };
        let distance_fee = &extra_km * &cfg.cost_per_km;

        let subtotal = &base_fee + &distance_fee + &total_handling_fee;
        let platform_fee = &subtotal * &cfg.markup_percentage / BigDecimal::from(100);
        let total_amount = &subtotal + &platform_fee;

        let is_overweight = total_weight_kg > cfg.overweight_threshold_kg;
        let estimated_duration_minutes = ceil_to_integer(&(distance_km * &cfg.minutes_per_km))
            .to_i64()
            .unwrap_or(0);

        let breakdown = PriceBreakdown {
            base_fee_details: format!(
                "Base fee: {} (covers first {}km)",
                format_kes(&base_fee),
                cfg.base_distance_km
            ),
            distance_fee_details: if distance_km <= &cfg.base_distance_km {
                format!(
                    "Distance: {}km (within base distance)",
                    format_one_decimal(distance_km)
                )
            } else {
                format!(
                    "Distance: {}km × {}/km after first {}km = {}",
                    format_one_decimal(distance_km),
                    format_kes(&cfg.cost_per_km),
                    cfg.base_distance_km,
                    format_kes(&distance_fee)
                )
            },
            handling_fee_details: if total_handling_fee > BigDecimal::zero() {
                format!(
                    "Handling fees: {} ({} material type(s))",
                    format_kes(&total_handling_fee),
                    selections.len()
                )
            } else {
                "No special handling required".to_string()
            },
            platform_fee_details: format!(
                "Platform fee: {}% of {} = {}",
                cfg.markup_percentage,
                format_kes(&subtotal),
                format_kes(&platform_fee)
            ),
        };

        Ok(PriceQuote {
            total_distance_km: distance_km.clone(),
            estimated_duration_minutes,
            total_weight_kg,
            is_overweight,
            requires_straps,
            requires_tarp,
            has_fragile_items,
            base_fee,
            distance_fee,
            handling_fee: total_handling_fee,
            subtotal,
            platform_fee,
            total_amount,
            materials,
            breakdown,
        })
    }

    pub fn weight_advisory(&self, total_weight_kg: &BigDecimal) -> WeightAdvisory {
        let capacity = &self.config.overweight_threshold_kg;
        let block_at = capacity + BigDecimal::from(OVERWEIGHT_BLOCK_KG);

        if total_weight_kg > &block_at {
            WeightAdvisory::Blocked
        } else if total_weight_kg > capacity {
            WeightAdvisory::Overweight
        } else {
            WeightAdvisory::WithinCapacity
        }
    }

    /// Driver share of a delivered job's total.
    pub fn driver_earnings(&self, total_amount: &BigDecimal) -> BigDecimal {
        total_amount * &self.config.driver_earnings_percentage / BigDecimal::from(100)
    }
}
