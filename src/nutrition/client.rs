//! External macro-calculation service.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::NutritionConfig;

/// Whole-recipe totals as reported by the service (not per serving).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
    pub sugar: f64,
}

#[async_trait]
pub trait NutritionClient: Send + Sync {
    async fn analyze(&self, lines: &[String], servings: i32) -> anyhow::Result<MacroTotals>;
}

pub struct EdamamClient {
    config: NutritionConfig,
    http: reqwest::Client,
}

impl EdamamClient {
    pub fn new(config: NutritionConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnalysisRequest<'a> {
    ingr: &'a [String],
    #[serde(rename = "yield")]
    servings: i32,
}

#[derive(Debug, Default, Deserialize)]
struct Quantity {
    #[serde(default)]
    quantity: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct TotalNutrients {
    #[serde(default)]
    procnt: Quantity,
    #[serde(default)]
    fat: Quantity,
    #[serde(default)]
    chocdf: Quantity,
    #[serde(default)]
    fibtg: Quantity,
    #[serde(default)]
    sugar: Quantity,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    #[serde(default)]
    calories: f64,
    #[serde(default, rename = "totalNutrients")]
    total_nutrients: TotalNutrients,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

impl From<AnalysisResponse> for MacroTotals {
    fn from(r: AnalysisResponse) -> Self {
        let n = r.total_nutrients;
        MacroTotals {
            calories: r.calories,
            protein: n.procnt.quantity,
            fat: n.fat.quantity,
            carbs: n.chocdf.quantity,
            fiber: n.fibtg.quantity,
            sugar: n.sugar.quantity,
        }
    }
}

#[async_trait]
impl NutritionClient for EdamamClient {
    async fn analyze(&self, lines: &[String], servings: i32) -> anyhow::Result<MacroTotals> {
        debug!(lines = lines.len(), servings, "requesting nutrition analysis");
        let response = self
            .http
            .post(&self.config.api_url)
            .query(&[
                ("app_id", self.config.app_id.as_str()),
                ("app_key", self.config.app_key.as_str()),
            ])
            .json(&AnalysisRequest { ingr: lines, servings })
            .send()
            .await
            .context("nutrition request failed")?;

        let status = response.status();
        let body = response.text().await.context("reading nutrition response")?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Failed to calculate nutrition".to_string());
            return Err(anyhow!("nutrition service returned {status}: {message}"));
        }

        let parsed: AnalysisResponse =
            serde_json::from_str(&body).context("decoding nutrition response")?;
        Ok(parsed.into())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_with_missing_nutrients_defaults_to_zero() {
        let body = r#"{
            "calories": 820,
            "totalNutrients": {
                "PROCNT": {"label": "Protein", "quantity": 30.5, "unit": "g"},
                "FAT": {"label": "Fat", "quantity": 12.0, "unit": "g"}
            }
        }"#;
        let totals: MacroTotals = serde_json::from_str::<AnalysisResponse>(body).unwrap().into();
        assert_eq!(totals.calories, 820.0);
        assert_eq!(totals.protein, 30.5);
        assert_eq!(totals.fat, 12.0);
        assert_eq!(totals.carbs, 0.0);
        assert_eq!(totals.sugar, 0.0);
    }

    #[test]
    fn request_uses_yield_key() {
        let lines = vec!["1 cup flour".to_string()];
        let json = serde_json::to_value(AnalysisRequest { ingr: &lines, servings: 4 }).unwrap();
        assert_eq!(json["yield"], 4);
        assert_eq!(json["ingr"][0], "1 cup flour");
    }
}
