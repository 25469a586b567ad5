//! End-to-end tool calls through the MCP dispatcher against a mock backend.

mod common;

use std::sync::Arc;

use ethers::utils::to_checksum;
use ethers_core::types::U256;
use ethers_core::utils::rlp::Rlp;
use serde_json::{json, Value};

use common::*;

fn transactions(text: &str) -> Vec<Value> {
    let parsed: Value = serde_json::from_str(text).unwrap();
    parsed["transactions"].as_array().unwrap().clone()
}

fn detail<'a>(tx: &'a Value, key: &str) -> &'a str {
    tx["tx_details"][key].as_str().unwrap()
}

fn usdc_backend() -> Arc<MockBackend> {
    Arc::new(MockBackend::default().with_token(USDC, "USDC", 6))
}

#[tokio::test]
async fn deposit_builds_approve_then_supply() {
    let backend = usdc_backend();
    let state = app_state(backend.clone());

    let resp = call_tool(
        &state,
        "default",
        "aave_v3_deposit",
        json!({"asset": USDC, "amount": "100.5", "address": USER}),
    )
    .await;
    let txs = transactions(&ok_text(&resp));
    assert_eq!(txs.len(), 2);

    let approve = &txs[0];
    assert_eq!(approve["sequence"], 1);
    assert_eq!(approve["action"], "approve");
    assert_eq!(approve["chain"], "ethereum");
    assert_eq!(approve["chain_id"], "1");
    assert_eq!(approve["signing_mode"], "ecdsa_secp256k1");
    assert_eq!(detail(approve, "to"), to_checksum(&addr(USDC), None));
    assert_eq!(detail(approve, "nonce"), "5");
    // 50000 estimate plus the 20% margin
    assert_eq!(detail(approve, "gas_limit"), "60000");
    assert_eq!(detail(approve, "gas_price"), "20000000000");
    assert_eq!(detail(approve, "value"), "0");
    assert_eq!(detail(approve, "tx_encoding"), "legacy_rlp");
    assert_eq!(detail(approve, "contract_name"), "USDC Token");
    assert_eq!(detail(approve, "description"), "Approve USDC spending for Aave V3 Pool");
    assert!(detail(approve, "data").starts_with("0x095ea7b3"));
    assert!(detail(approve, "data")
        .contains(&MAINNET_POOL.trim_start_matches("0x").to_lowercase()));

    let supply = &txs[1];
    assert_eq!(supply["sequence"], 2);
    assert_eq!(supply["action"], "supply");
    assert_eq!(detail(supply, "to"), to_checksum(&addr(MAINNET_POOL), None));
    assert_eq!(detail(supply, "nonce"), "6");
    assert_eq!(detail(supply, "gas_limit"), "300000");
    assert_eq!(detail(supply, "contract_name"), "Aave V3 Pool");
    assert_eq!(detail(supply, "description"), "Supply USDC to Aave V3");
    assert!(detail(supply, "data").starts_with("0x617ba037"));

    for tx in &txs {
        assert_eq!(detail(tx, "token_symbol"), "USDC");
        assert_eq!(detail(tx, "token_address"), to_checksum(&addr(USDC), None));
        assert_eq!(detail(tx, "amount_human"), "100.5");
        assert_eq!(detail(tx, "amount_wei"), "100500000");
        assert_eq!(detail(tx, "decimals"), "6");
    }

    // One nonce read, one estimate (the approval), one gas price per tx.
    assert_eq!(backend.nonce_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(backend.estimates(), 1);
    assert_eq!(backend.gas_prices(), 2);
}

#[tokio::test]
async fn unsigned_hex_is_eip155_preimage() {
    let state = app_state(usdc_backend());
    let resp = call_tool(
        &state,
        "default",
        "aave_v3_withdraw",
        json!({"asset": USDC, "amount": "1", "address": USER}),
    )
    .await;
    let txs = transactions(&ok_text(&resp));
    let hex_str = txs[0]["unsigned_tx_hex"].as_str().unwrap();
    assert!(!hex_str.starts_with("0x"));

    let raw = hex::decode(hex_str).unwrap();
    let rlp = Rlp::new(&raw);
    assert_eq!(rlp.item_count().unwrap(), 9);
    assert_eq!(rlp.val_at::<u64>(0).unwrap(), 5);
    assert_eq!(rlp.val_at::<u64>(2).unwrap(), 60_000);
    assert_eq!(rlp.val_at::<u64>(6).unwrap(), 1);
    assert_eq!(rlp.val_at::<u64>(7).unwrap(), 0);
    assert_eq!(rlp.val_at::<u64>(8).unwrap(), 0);
}

#[tokio::test]
async fn repay_max_uses_uint256_max() {
    let backend = usdc_backend();
    let state = app_state(backend.clone());
    let resp = call_tool(
        &state,
        "default",
        "aave_v3_repay",
        json!({"asset": USDC, "amount": "MAX", "address": USER}),
    )
    .await;
    let txs = transactions(&ok_text(&resp));
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0]["action"], "approve");
    assert_eq!(txs[1]["action"], "repay");
    assert_eq!(detail(&txs[1], "description"), "Repay USDC to Aave V3 (variable rate)");
    assert_eq!(detail(&txs[1], "amount_wei"), U256::MAX.to_string());
    assert!(detail(&txs[1], "data").starts_with("0x573ade81"));
    assert_eq!(detail(&txs[1], "gas_limit"), "300000");
    assert_eq!(backend.estimates(), 1);
}

#[tokio::test]
async fn withdraw_and_borrow_are_single_transactions() {
    let backend = usdc_backend();
    let state = app_state(backend.clone());

    let resp = call_tool(
        &state,
        "default",
        "aave_v3_withdraw",
        json!({"asset": USDC, "amount": "max", "address": USER}),
    )
    .await;
    let txs = transactions(&ok_text(&resp));
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0]["sequence"], 1);
    assert_eq!(txs[0]["action"], "withdraw");
    assert_eq!(detail(&txs[0], "nonce"), "5");
    assert_eq!(detail(&txs[0], "gas_limit"), "60000");
    assert!(detail(&txs[0], "data").starts_with("0x69328dec"));

    let resp = call_tool(
        &state,
        "default",
        "aave_v3_borrow",
        json!({"asset": USDC, "amount": "250", "address": USER}),
    )
    .await;
    let txs = transactions(&ok_text(&resp));
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0]["action"], "borrow");
    assert_eq!(detail(&txs[0], "description"), "Borrow USDC from Aave V3 (variable rate)");
    assert_eq!(detail(&txs[0], "amount_wei"), "250000000");
    assert!(detail(&txs[0], "data").starts_with("0xa415bcad"));

    assert_eq!(backend.estimates(), 2);
}

#[tokio::test]
async fn failed_second_build_returns_no_transactions() {
    let backend = Arc::new(MockBackend {
        gas_price_ok_calls: Some(1),
        ..MockBackend::default()
    }
    .with_token(USDC, "USDC", 6));
    let state = app_state(backend.clone());

    let resp = call_tool(
        &state,
        "default",
        "aave_v3_deposit",
        json!({"asset": USDC, "amount": "1", "address": USER}),
    )
    .await;
    let text = err_text(&resp);
    assert!(text.contains("get gas price"), "{}", text);
    assert!(!text.contains("transactions"));
    assert_eq!(backend.gas_prices(), 2);
}

#[tokio::test]
async fn estimate_failure_is_reported() {
    let backend = Arc::new(MockBackend {
        estimate: None,
        ..MockBackend::default()
    }
    .with_token(USDC, "USDC", 6));
    let state = app_state(backend);

    let resp = call_tool(
        &state,
        "default",
        "aave_v3_borrow",
        json!({"asset": USDC, "amount": "1", "address": USER}),
    )
    .await;
    assert!(err_text(&resp).contains("estimate gas"));
}

#[tokio::test]
async fn missing_address_without_session_fails() {
    let state = app_state(usdc_backend());
    let resp = call_tool(
        &state,
        "nobody",
        "aave_v3_withdraw",
        json!({"asset": USDC, "amount": "1"}),
    )
    .await;
    assert!(err_text(&resp).contains("call set_account_info first"));
}

#[tokio::test]
async fn session_key_material_supplies_the_address() {
    let backend = usdc_backend();
    let state = app_state(backend);

    let resp = call_tool(
        &state,
        "s1",
        "set_account_info",
        json!({
            "ecdsa_public_key": SESSION_PUBKEY,
            "eddsa_public_key": "00".repeat(32),
            "chain_code": SESSION_CHAIN_CODE,
        }),
    )
    .await;
    assert_eq!(ok_text(&resp), "account info stored for session");

    let text = ok_text(&call_tool(&state, "s1", "get_address", json!({})).await);
    assert!(text.starts_with("Chain: Ethereum\n"));
    assert!(text.to_lowercase().contains(SESSION_ADDRESS));
    assert!(text.ends_with("Key Type: ECDSA"));

    let resp = call_tool(
        &state,
        "s1",
        "aave_v3_deposit",
        json!({"asset": USDC, "amount": "1"}),
    )
    .await;
    let txs = transactions(&ok_text(&resp));
    // onBehalfOf is the derived address
    assert!(detail(&txs[1], "data").contains(SESSION_ADDRESS.trim_start_matches("0x")));

    // Another session sees nothing.
    let resp = call_tool(&state, "s2", "get_eth_balance", json!({})).await;
    err_text(&resp);
}

#[tokio::test]
async fn malformed_arguments() {
    let state = app_state(usdc_backend());

    let resp = call_tool(&state, "default", "aave_v3_deposit", json!({"amount": "1"})).await;
    assert_eq!(resp["error"]["code"], -32602);

    let resp = call_tool(
        &state,
        "default",
        "aave_v3_deposit",
        json!({"asset": "0x1234", "amount": "1", "address": USER}),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);

    let resp = call_tool(
        &state,
        "default",
        "aave_v3_deposit",
        json!({"asset": USDC, "amount": "1.2.3", "address": USER}),
    )
    .await;
    assert!(err_text(&resp).contains("invalid amount"));
}

#[tokio::test]
async fn account_summary_text() {
    let backend = usdc_backend();
    backend.respond(
        addr(MAINNET_POOL),
        [0xbf, 0x92, 0x85, 0x7c],
        words(&[
            U256::from(123_450_000_000u64),
            U256::from(50_000_000_000u64),
            U256::from(30_000_000_000u64),
            U256::from(8250),
            U256::from(8000),
            U256::from(1_500_000_000_000_000_000u64),
        ]),
    );
    let state = app_state(backend);

    let text = ok_text(
        &call_tool(&state, "default", "aave_v3_get_balances", json!({"address": USER})).await,
    );
    assert_eq!(
        text,
        format!(
            "Aave V3 Account Summary\n\
             Address: {}\n\
             \n\
             Total Collateral: $1234.5 USD\n\
             Total Debt: $500 USD\n\
             Available to Borrow: $300 USD\n\
             Liquidation Threshold: 82.50%\n\
             Loan-to-Value (LTV): 80.00%\n\
             Health Factor: 1.5",
            to_checksum(&addr(USER), None)
        )
    );
}

#[tokio::test]
async fn account_without_debt_has_infinite_health() {
    let backend = usdc_backend();
    backend.respond(
        addr(MAINNET_POOL),
        [0xbf, 0x92, 0x85, 0x7c],
        words(&[
            U256::from(100_000_000u64),
            U256::zero(),
            U256::from(80_000_000u64),
            U256::from(8250),
            U256::from(8000),
            U256::MAX,
        ]),
    );
    let state = app_state(backend);
    let text = ok_text(
        &call_tool(&state, "default", "aave_v3_get_balances", json!({"address": USER})).await,
    );
    assert!(text.ends_with("Health Factor: ∞ (no debt)"));
}

#[tokio::test]
async fn reserve_rates_text() {
    let backend = usdc_backend();
    let ray = |hundredths: u64| U256::from(hundredths) * U256::exp10(23);
    backend.respond(
        addr(MAINNET_DATA_PROVIDER),
        [0x35, 0xea, 0x6a, 0x75],
        words(&[
            U256::zero(),
            U256::zero(),
            U256::from(1_000_000u64),
            U256::zero(),
            U256::from(500_000u64),
            ray(325),
            // 5.6749% rounds down
            ray(567) + U256::from(49) * U256::exp10(21),
            U256::zero(),
            U256::zero(),
        ]),
    );
    backend.respond(
        addr(MAINNET_DATA_PROVIDER),
        [0x3e, 0x15, 0x01, 0x41],
        words(&[
            U256::from(6),
            U256::from(7500),
            U256::from(7800),
            U256::from(10450),
            U256::from(1000),
            U256::one(),
            U256::one(),
            U256::one(),
            U256::zero(),
        ]),
    );
    let state = app_state(backend);

    let text = ok_text(&call_tool(&state, "default", "aave_v3_get_rates", json!({"asset": USDC})).await);
    let expected = format!(
        "Aave V3 Reserve Info: USDC ({})\n\
         \n\
         Supply APY: 3.25%\n\
         Variable Borrow APY: 5.67%\n\
         \n\
         Reserve Configuration:\n\
         \x20 Decimals: 6\n\
         \x20 LTV: 75.00%\n\
         \x20 Liquidation Threshold: 78.00%\n\
         \x20 Liquidation Bonus: 4.50%\n\
         \x20 Can be Collateral: true\n\
         \x20 Borrowing Enabled: true\n\
         \x20 Active: true\n\
         \x20 Frozen: false",
        to_checksum(&addr(USDC), None)
    );
    assert_eq!(text, expected);
}

#[tokio::test]
async fn reserve_query_failure_is_a_tool_error() {
    // symbol() answers but the data provider reverts
    let state = app_state(usdc_backend());
    let resp = call_tool(&state, "default", "aave_v3_get_rates", json!({"asset": USDC})).await;
    assert!(err_text(&resp).contains("failed to get reserve info"));
}

#[tokio::test]
async fn token_and_eth_balances() {
    let backend = usdc_backend();
    backend.respond(
        addr(USDC),
        [0x70, 0xa0, 0x82, 0x31],
        words(&[U256::from(1_234_560_000u64)]),
    );
    let state = app_state(backend);

    let text = ok_text(
        &call_tool(
            &state,
            "default",
            "get_token_balance",
            json!({"contract_address": USDC, "address": USER}),
        )
        .await,
    );
    assert!(text.contains("Token: USDC"));
    assert!(text.contains("Balance: 1234.56\n"));
    assert!(text.ends_with("Decimals: 6"));

    let text = ok_text(&call_tool(&state, "default", "get_eth_balance", json!({"address": USER})).await);
    assert!(text.ends_with("Balance: 1 ETH"));
}
