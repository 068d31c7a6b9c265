//! Investment plan catalog
//!
//! Admin-managed plan entries and their persistence. Plans carry the rate,
//! duration, and compounding inputs the accrual calculator projects from.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Amount, CompoundFrequency, DurationUnit};
use crate::error::AppError;

/// An investment plan catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct InvestmentPlan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    /// Annualized ROI percentage
    pub roi_percentage: Decimal,
    pub duration_value: u32,
    pub duration_unit: DurationUnit,
    pub compound_frequency: CompoundFrequency,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl InvestmentPlan {
    /// Check a funding amount against the plan's limits.
    pub fn check_amount(&self, amount: &Amount) -> Result<(), AppError> {
        let value = amount.value();
        if value < self.min_amount || value > self.max_amount {
            return Err(AppError::InvestmentAmountOutOfRange {
                min: self.min_amount,
                max: self.max_amount,
            });
        }
        Ok(())
    }
}

/// Input for creating a new catalog entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlan {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub roi_percentage: Decimal,
    pub duration_value: u32,
    pub duration_unit: DurationUnit,
    #[serde(default)]
    pub compound_frequency: Option<CompoundFrequency>,
}

impl NewPlan {
    /// Validate catalog-entry invariants before any store interaction.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidRequest("Plan name is required".to_string()));
        }
        if self.min_amount <= Decimal::ZERO || self.max_amount <= Decimal::ZERO {
            return Err(AppError::InvalidRequest(
                "Plan amounts must be positive".to_string(),
            ));
        }
        if self.min_amount > self.max_amount {
            return Err(AppError::InvalidRequest(
                "Minimum amount cannot be greater than maximum amount".to_string(),
            ));
        }
        if self.roi_percentage <= Decimal::ZERO {
            return Err(AppError::InvalidRequest(
                "ROI percentage must be positive".to_string(),
            ));
        }
        if self.duration_value == 0 {
            return Err(AppError::InvalidRequest(
                "Duration value must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

type PlanRow = (
    Uuid,
    String,
    Option<String>,
    Decimal,
    Decimal,
    Decimal,
    i32,
    String,
    String,
    bool,
    DateTime<Utc>,
);

fn plan_from_row(row: PlanRow) -> Result<InvestmentPlan, AppError> {
    let (
        id,
        name,
        description,
        min_amount,
        max_amount,
        roi_percentage,
        duration_value,
        duration_unit,
        compound_frequency,
        is_active,
        created_at,
    ) = row;

    let duration_unit: DurationUnit = duration_unit
        .parse()
        .map_err(AppError::Internal)?;
    // Unknown frequencies in storage fall back to the monthly default.
    let compound_frequency: CompoundFrequency =
        compound_frequency.parse().unwrap_or_default();

    Ok(InvestmentPlan {
        id,
        name,
        description,
        min_amount,
        max_amount,
        roi_percentage,
        duration_value: duration_value.max(0) as u32,
        duration_unit,
        compound_frequency,
        is_active,
        created_at,
    })
}

/// Catalog repository over the backing pool.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    pool: PgPool,
}

impl PlanCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch an active plan by id.
    pub async fn get_active(&self, plan_id: Uuid) -> Result<InvestmentPlan, AppError> {
        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, min_amount, max_amount, roi_percentage,
                   duration_value, duration_unit, compound_frequency, is_active, created_at
            FROM investment_plans
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(plan_from_row)
            .transpose()?
            .ok_or_else(|| AppError::PlanNotFound(plan_id.to_string()))
    }

    /// All active plans, cheapest entry point first.
    pub async fn list_active(&self) -> Result<Vec<InvestmentPlan>, AppError> {
        let rows: Vec<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, min_amount, max_amount, roi_percentage,
                   duration_value, duration_unit, compound_frequency, is_active, created_at
            FROM investment_plans
            WHERE is_active = TRUE
            ORDER BY min_amount ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(plan_from_row).collect()
    }

    /// Create a catalog entry.
    pub async fn create(&self, plan: NewPlan) -> Result<InvestmentPlan, AppError> {
        plan.validate()?;

        let frequency = plan.compound_frequency.unwrap_or_default();

        let row: PlanRow = sqlx::query_as(
            r#"
            INSERT INTO investment_plans (
                name, description, min_amount, max_amount, roi_percentage,
                duration_value, duration_unit, compound_frequency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, description, min_amount, max_amount, roi_percentage,
                      duration_value, duration_unit, compound_frequency, is_active, created_at
            "#,
        )
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.min_amount)
        .bind(plan.max_amount)
        .bind(plan.roi_percentage)
        .bind(plan.duration_value as i32)
        .bind(plan.duration_unit.as_str())
        .bind(frequency.as_str())
        .fetch_one(&self.pool)
        .await?;

        plan_from_row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_plan() -> InvestmentPlan {
        InvestmentPlan {
            id: Uuid::new_v4(),
            name: "Growth Fund".to_string(),
            description: None,
            min_amount: dec!(100),
            max_amount: dec!(10000),
            roi_percentage: dec!(12),
            duration_value: 12,
            duration_unit: DurationUnit::Months,
            compound_frequency: CompoundFrequency::Monthly,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_check_amount_in_range() {
        let plan = sample_plan();
        let amount = Amount::from_integer(500).unwrap();
        assert!(plan.check_amount(&amount).is_ok());

        // Boundaries are inclusive.
        assert!(plan.check_amount(&Amount::from_integer(100).unwrap()).is_ok());
        assert!(plan.check_amount(&Amount::from_integer(10000).unwrap()).is_ok());
    }

    #[test]
    fn test_check_amount_out_of_range() {
        let plan = sample_plan();

        let too_small = Amount::from_integer(99).unwrap();
        assert!(matches!(
            plan.check_amount(&too_small),
            Err(AppError::InvestmentAmountOutOfRange { .. })
        ));

        let too_large = Amount::from_integer(10001).unwrap();
        assert!(matches!(
            plan.check_amount(&too_large),
            Err(AppError::InvestmentAmountOutOfRange { .. })
        ));
    }

    #[test]
    fn test_new_plan_validation() {
        let valid = NewPlan {
            name: "Starter".to_string(),
            description: None,
            min_amount: dec!(50),
            max_amount: dec!(500),
            roi_percentage: dec!(8),
            duration_value: 6,
            duration_unit: DurationUnit::Months,
            compound_frequency: None,
        };
        assert!(valid.validate().is_ok());

        let inverted = NewPlan {
            min_amount: dec!(500),
            max_amount: dec!(50),
            ..valid.clone()
        };
        assert!(inverted.validate().is_err());

        let zero_duration = NewPlan {
            duration_value: 0,
            ..valid.clone()
        };
        assert!(zero_duration.validate().is_err());

        let negative_roi = NewPlan {
            roi_percentage: dec!(-1),
            ..valid
        };
        assert!(negative_roi.validate().is_err());
    }

    #[test]
    fn test_unknown_frequency_falls_back_to_monthly() {
        let row: PlanRow = (
            Uuid::new_v4(),
            "Legacy".to_string(),
            None,
            dec!(10),
            dec!(100),
            dec!(5),
            30,
            "days".to_string(),
            "fortnightly".to_string(),
            true,
            Utc::now(),
        );

        let plan = plan_from_row(row).unwrap();
        assert_eq!(plan.compound_frequency, CompoundFrequency::Monthly);
    }
}
