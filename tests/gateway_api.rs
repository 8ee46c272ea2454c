//! Gateway behavior against a mocked provider

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use teamtrade::config::ProviderConfig;
use teamtrade::gateway::types::{ChartPeriod, RankDirection};
use teamtrade::gateway::{GatewayError, MarketGateway};

fn test_config(base_url: &str) -> ProviderConfig {
    ProviderConfig {
        app_key: "test-app-key".to_string(),
        app_secret: "test-app-secret".to_string(),
        base_url: base_url.to_string(),
        ws_url: "ws://localhost:1".to_string(),
    }
}

fn gateway_for(server: &MockServer) -> MarketGateway {
    MarketGateway::new(test_config(&server.uri())).unwrap()
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/tokenP"))
        .and(body_partial_json(json!({"grant_type": "client_credentials"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-1",
            "expires_in": 86400,
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn quote_parses_comma_grouped_provider_fields() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/uapi/domestic-stock/v1/quotations/inquire-price"))
        .and(header("tr_id", "FHKST01010100"))
        .and(header("custtype", "P"))
        .and(header("appkey", "test-app-key"))
        .and(query_param("FID_COND_MRKT_DIV_CODE", "J"))
        .and(query_param("FID_INPUT_ISCD", "005930"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rt_cd": "0",
            "output": {
                "stck_prpr": "71,500",
                "prdy_vrss": "-300",
                "prdy_ctrt": "-0.42",
                "acml_vol": "1,234,567",
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let quote = gateway.quote("005930").await.unwrap();

    assert_eq!(quote.code, "005930");
    // No usable name in the payload, so the code-derived fallback shows.
    assert_eq!(quote.name, "#005930");
    assert_eq!(quote.price, dec!(71500));
    assert_eq!(quote.change, dec!(-300));
    assert_eq!(quote.change_rate, dec!(-0.42));
    assert_eq!(quote.volume, 1_234_567);
}

#[tokio::test]
async fn concurrent_calls_share_one_token_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/tokenP"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "token-1", "expires_in": 86400}))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/uapi/domestic-stock/v1/quotations/inquire-price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rt_cd": "0",
            "output": {"stck_prpr": "1000"}
        })))
        .mount(&server)
        .await;

    let gateway = Arc::new(gateway_for(&server));
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let gateway = gateway.clone();
        tasks.push(tokio::spawn(async move { gateway.quote("005930").await }));
    }
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }
}

#[tokio::test]
async fn provider_rejection_surfaces_its_detail() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/uapi/domestic-stock/v1/quotations/inquire-price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rt_cd": "1",
            "msg_cd": "EGW00123",
            "msg1": "token expired",
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let err = gateway.quote("005930").await.unwrap_err();
    match err {
        GatewayError::Protocol(detail) => {
            assert!(detail.contains("EGW00123"), "detail was: {detail}");
            assert!(detail.contains("token expired"));
        }
        other => panic!("expected Protocol, got {other:?}"),
    }
}

#[tokio::test]
async fn search_filters_the_volume_pool_and_caps_results() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    let mut rows: Vec<serde_json::Value> = (0..25)
        .map(|i| {
            json!({
                "mksc_shrn_iscd": format!("{:06}", 100_000 + i),
                "hts_kor_isnm": format!("Alpha Corp {i}"),
                "stck_prpr": "1000",
            })
        })
        .collect();
    rows.push(json!({
        "mksc_shrn_iscd": "005930",
        "hts_kor_isnm": "Samsung Electronics",
        "stck_prpr": "71500",
    }));

    Mock::given(method("GET"))
        .and(path("/uapi/domestic-stock/v1/quotations/volume-rank"))
        .and(header("tr_id", "FHPST01710000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rt_cd": "0",
            "output": rows,
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);

    let samsung = gateway.search("samsung").await.unwrap();
    assert_eq!(samsung.len(), 1);
    assert_eq!(samsung[0].code, "005930");

    let alphas = gateway.search("Alpha").await.unwrap();
    assert_eq!(alphas.len(), 20);

    assert!(gateway.search("   ").await.unwrap().is_empty());
}

#[tokio::test]
async fn search_degrades_to_empty_when_the_ranking_fails() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/uapi/domestic-stock/v1/quotations/volume-rank"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"rt_cd": "9"})))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    assert!(gateway.search("samsung").await.unwrap().is_empty());
}

#[tokio::test]
async fn revoking_forces_a_fresh_token_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/tokenP"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-1",
            "expires_in": 86400,
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/uapi/domestic-stock/v1/quotations/inquire-price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rt_cd": "0",
            "output": {"stck_prpr": "1000"}
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    gateway.quote("005930").await.unwrap();

    // The revoke endpoint is not mounted; the 404 is swallowed and the
    // cache is cleared regardless.
    gateway.revoke_token().await;

    gateway.quote("005930").await.unwrap();
}

#[tokio::test]
async fn missing_index_section_degrades_to_a_placeholder() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/uapi/domestic-stock/v1/quotations/inquire-index-price"))
        .and(header("tr_id", "FHPUP02100000"))
        .and(query_param("FID_INPUT_ISCD", "0001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rt_cd": "0"})))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let index = gateway.market_index("KOSPI").await.unwrap();

    assert_eq!(index.name, "KOSPI");
    assert_eq!(index.value, dec!(2500));
    assert_eq!(index.change, dec!(0));
}

#[tokio::test]
async fn falling_movers_send_the_descending_sort_code() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/uapi/domestic-stock/v1/ranking/fluctuation"))
        .and(header("tr_id", "FHPST01700000"))
        .and(query_param("FID_RANK_SORT_CLS_CODE", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rt_cd": "0",
            "output": [{
                "stck_shrn_iscd": "005930",
                "hts_kor_isnm": "Samsung Electronics",
                "stck_prpr": "71500",
                "prdy_ctrt": "-3.1",
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let movers = gateway.fluctuation_rank(RankDirection::Falling).await.unwrap();
    assert_eq!(movers.len(), 1);
    assert_eq!(movers[0].change_rate, dec!(-3.1));
}

#[tokio::test]
async fn approval_key_comes_from_the_handshake_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/Approval"))
        .and(body_partial_json(json!({"secretkey": "test-app-secret"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"approval_key": "approval-1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    assert_eq!(gateway.ws_approval_key().await.unwrap(), "approval-1");
}

#[tokio::test]
async fn wall_clock_expiry_keeps_the_token_cached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/tokenP"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-1",
            "access_token_token_expired": "2099-01-01 00:00:00",
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/uapi/domestic-stock/v1/quotations/inquire-price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rt_cd": "0",
            "output": {"stck_prpr": "1000"}
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    gateway.quote("005930").await.unwrap();
    gateway.quote("000660").await.unwrap();
}

#[tokio::test]
async fn index_chart_posts_fids_and_skips_dateless_rows() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("POST"))
        .and(path("/uapi/domestic-stock/v1/quotations/inquire-daily-indexchartprice"))
        .and(header("tr_id", "FHKUP03500100"))
        .and(body_partial_json(json!({
            "FID_INPUT_ISCD": "1001",
            "FID_PERIOD_DIV_CODE": "D",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rt_cd": "0",
            "output2": [
                {
                    "stck_bsop_date": "20260102",
                    "bstp_nmix_oprc": "850.10",
                    "bstp_nmix_hgpr": "861.00",
                    "bstp_nmix_lwpr": "848.25",
                    "bstp_nmix_prpr": "860.55",
                },
                {"bstp_nmix_prpr": "870.00"},
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let candles = gateway
        .index_chart("KOSDAQ", "20260101", "20260131", ChartPeriod::Daily)
        .await
        .unwrap();

    assert_eq!(candles.len(), 1);
    assert_eq!(candles[0].date, "20260102");
    assert_eq!(candles[0].open, dec!(850.10));
    assert_eq!(candles[0].high, dec!(861.00));
    assert_eq!(candles[0].low, dec!(848.25));
    assert_eq!(candles[0].close, dec!(860.55));
}
