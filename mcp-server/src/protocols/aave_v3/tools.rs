// src/protocols/aave_v3/tools.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ethers::utils::to_checksum;
use ethers_core::types::{Address, Bytes, U256};
use rust_decimal::Decimal;
use serde_json::Value;

use super::abi::{
    bps_to_percentage, encode_approve, encode_borrow, encode_repay, encode_supply,
    encode_withdraw, ray_to_percentage,
};
use super::client::ProtocolClient;
use crate::{
    blockchain::{
        models::{evm_chain_name, Transaction, TransactionResult, SIGNING_MODE_ECDSA, TX_ENCODING_LEGACY_RLP},
        services::transactions::{ContractCall, TxBuilder, UnsignedTx},
        units::{format_units, parse_amount},
    },
    mcp::{
        resolve::resolve_address,
        session_store::SessionStore,
        tools::{string_schema, ToolDefinition, ToolError, ToolHandler, ToolOutput, ToolRegistry},
    },
    utils::{get_optional_str, get_required_arg, parse_address, strip_hex_prefix},
};

const POOL_NAME: &str = "Aave V3 Pool";
// Base currency values are 8-decimal USD.
const BASE_CURRENCY_DECIMALS: u32 = 8;
const WAD_DECIMALS: u32 = 18;

/// One market on the connected chain, shared by all Aave tools.
pub struct Market {
    pub client: ProtocolClient,
    pub builder: TxBuilder,
    pub sessions: SessionStore,
    pub chain_id: u64,
}

pub fn register_tools(registry: &mut ToolRegistry, market: Arc<Market>) {
    for action in [
        LendingAction::Deposit,
        LendingAction::Withdraw,
        LendingAction::Borrow,
        LendingAction::Repay,
    ] {
        registry.register(Arc::new(LendingTool {
            market: market.clone(),
            action,
        }));
    }
    registry.register(Arc::new(GetBalancesTool {
        market: market.clone(),
    }));
    registry.register(Arc::new(GetRatesTool { market }));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LendingAction {
    Deposit,
    Withdraw,
    Borrow,
    Repay,
}

impl LendingAction {
    pub fn tool_name(self) -> &'static str {
        match self {
            LendingAction::Deposit => "aave_v3_deposit",
            LendingAction::Withdraw => "aave_v3_withdraw",
            LendingAction::Borrow => "aave_v3_borrow",
            LendingAction::Repay => "aave_v3_repay",
        }
    }

    /// `action` field of the pool transaction.
    pub fn verb(self) -> &'static str {
        match self {
            LendingAction::Deposit => "supply",
            LendingAction::Withdraw => "withdraw",
            LendingAction::Borrow => "borrow",
            LendingAction::Repay => "repay",
        }
    }

    /// Deposits and repayments pull tokens from the caller, so the pool needs
    /// an allowance first.
    pub fn needs_approval(self) -> bool {
        matches!(self, LendingAction::Deposit | LendingAction::Repay)
    }

    fn encode(self, asset: Address, amount: U256, user: Address) -> Bytes {
        match self {
            LendingAction::Deposit => encode_supply(asset, amount, user),
            LendingAction::Withdraw => encode_withdraw(asset, amount, user),
            LendingAction::Borrow => encode_borrow(asset, amount, user),
            LendingAction::Repay => encode_repay(asset, amount, user),
        }
    }

    fn summary(self, symbol: &str) -> String {
        match self {
            LendingAction::Deposit => format!("Supply {} to Aave V3", symbol),
            LendingAction::Withdraw => format!("Withdraw {} from Aave V3", symbol),
            LendingAction::Borrow => format!("Borrow {} from Aave V3 (variable rate)", symbol),
            LendingAction::Repay => format!("Repay {} to Aave V3 (variable rate)", symbol),
        }
    }

    fn tool_description(self) -> &'static str {
        match self {
            LendingAction::Deposit => "Build unsigned transactions to deposit (supply) tokens into Aave V3. Returns an approve tx and a supply tx, both fully populated and ready to sign.",
            LendingAction::Withdraw => "Build an unsigned transaction to withdraw tokens from Aave V3. Returns a fully populated transaction ready to sign. Use amount \"max\" for full withdrawal.",
            LendingAction::Borrow => "Build an unsigned transaction to borrow tokens from Aave V3 at variable rate. Returns a fully populated transaction ready to sign.",
            LendingAction::Repay => "Build unsigned transactions to repay a borrow on Aave V3. Returns an approve tx and a repay tx, both fully populated and ready to sign. Use amount \"max\" to repay entire debt.",
        }
    }

    fn amount_description(self) -> &'static str {
        match self {
            LendingAction::Deposit => "Amount to deposit in human-readable units (e.g. \"100.5\") or \"max\" for full balance",
            LendingAction::Withdraw => "Amount to withdraw in human-readable units or \"max\"",
            LendingAction::Borrow => "Amount to borrow in human-readable units",
            LendingAction::Repay => "Amount to repay in human-readable units or \"max\"",
        }
    }

    fn address_description(self) -> &'static str {
        match self {
            LendingAction::Deposit => "Depositor's Ethereum address (0x-prefixed). Optional if account info is set.",
            LendingAction::Withdraw => "Withdrawer's Ethereum address (0x-prefixed). Optional if account info is set.",
            LendingAction::Borrow => "Borrower's Ethereum address (0x-prefixed). Optional if account info is set.",
            LendingAction::Repay => "Repayer's Ethereum address (0x-prefixed). Optional if account info is set.",
        }
    }
}

/// Token metadata repeated into every tx_details map of a flow.
struct TokenMeta {
    symbol: String,
    address: Address,
    amount_human: String,
    amount_wei: U256,
    decimals: u8,
}

impl Market {
    #[allow(clippy::too_many_arguments)]
    fn transaction(
        &self,
        sequence: u32,
        action: &str,
        call: &ContractCall,
        tx: &UnsignedTx,
        description: String,
        contract_name: String,
        token: &TokenMeta,
    ) -> Transaction {
        let details: BTreeMap<String, String> = [
            ("to", to_checksum(&call.to, None)),
            ("value", call.value.to_string()),
            ("nonce", tx.nonce.to_string()),
            ("gas_limit", tx.gas_limit.to_string()),
            ("gas_price", tx.gas_price.to_string()),
            ("data", format!("0x{}", hex::encode(&call.data))),
            ("tx_encoding", TX_ENCODING_LEGACY_RLP.to_string()),
            ("description", description),
            ("contract_name", contract_name),
            ("token_symbol", token.symbol.clone()),
            ("token_address", to_checksum(&token.address, None)),
            ("amount_human", token.amount_human.clone()),
            ("amount_wei", token.amount_wei.to_string()),
            ("decimals", token.decimals.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Transaction {
            sequence,
            chain: evm_chain_name(self.chain_id),
            chain_id: self.chain_id.to_string(),
            action: action.to_string(),
            signing_mode: SIGNING_MODE_ECDSA.to_string(),
            unsigned_tx_hex: strip_hex_prefix(&tx.raw_hex).to_string(),
            tx_details: details,
        }
    }
}

pub struct LendingTool {
    market: Arc<Market>,
    action: LendingAction,
}

#[async_trait]
impl ToolHandler for LendingTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            self.action.tool_name(),
            self.action.tool_description(),
            string_schema(
                &[
                    ("asset", "ERC-20 token contract address (0x-prefixed)"),
                    ("amount", self.action.amount_description()),
                    ("address", self.action.address_description()),
                ],
                &["asset", "amount"],
            ),
        )
    }

    async fn call(&self, session_id: &str, args: &Value) -> Result<ToolOutput, ToolError> {
        let market = &self.market;
        let asset_arg: String = get_required_arg(args, "asset")?;
        let amount_arg: String = get_required_arg(args, "amount")?;
        let asset = parse_address(&asset_arg)?;
        let user = resolve_address(get_optional_str(args, "address")?, session_id, &market.sessions)?;
        let pool = market.client.pool_address();

        let decimals = market
            .client
            .get_token_decimals(asset)
            .await
            .map_err(|e| ToolError::failed("failed to get token decimals", e))?;
        let symbol = market
            .client
            .get_token_symbol(asset)
            .await
            .map_err(|e| ToolError::failed("failed to get token symbol", e))?;
        let amount = parse_amount(&amount_arg, decimals.into())?;

        let token = TokenMeta {
            symbol: symbol.clone(),
            address: asset,
            amount_human: amount_arg,
            amount_wei: amount,
            decimals,
        };
        let action_call = ContractCall::new(user, pool, self.action.encode(asset, amount, user));
        let verb = self.action.verb();

        let transactions = if self.action.needs_approval() {
            let approve_call = ContractCall::new(user, asset, encode_approve(pool, amount));
            let (approve_tx, action_tx) = market
                .builder
                .build_approve_then(&approve_call, &action_call, market.chain_id)
                .await
                .map_err(|e| ToolError::failed(&format!("failed to build approve and {} txs", verb), e))?;
            vec![
                market.transaction(
                    1,
                    "approve",
                    &approve_call,
                    &approve_tx,
                    format!("Approve {} spending for Aave V3 Pool", symbol),
                    format!("{} Token", symbol),
                    &token,
                ),
                market.transaction(
                    2,
                    verb,
                    &action_call,
                    &action_tx,
                    self.action.summary(&symbol),
                    POOL_NAME.to_string(),
                    &token,
                ),
            ]
        } else {
            let tx = market
                .builder
                .build_single(&action_call, market.chain_id)
                .await
                .map_err(|e| ToolError::failed(&format!("failed to build {} tx", verb), e))?;
            vec![market.transaction(
                1,
                verb,
                &action_call,
                &tx,
                self.action.summary(&symbol),
                POOL_NAME.to_string(),
                &token,
            )]
        };

        ToolOutput::json(&TransactionResult { transactions })
    }
}

pub struct GetBalancesTool {
    market: Arc<Market>,
}

#[async_trait]
impl ToolHandler for GetBalancesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "aave_v3_get_balances",
            "Query Aave V3 account summary: total collateral, total debt, available borrows (all in USD), liquidation threshold, LTV, and health factor.",
            string_schema(
                &[("address", "Ethereum address (0x-prefixed). Optional if account info is set.")],
                &[],
            ),
        )
    }

    async fn call(&self, session_id: &str, args: &Value) -> Result<ToolOutput, ToolError> {
        let user = resolve_address(get_optional_str(args, "address")?, session_id, &self.market.sessions)?;
        let acct = self
            .market
            .client
            .get_user_account_data(user)
            .await
            .map_err(|e| ToolError::failed("failed to get account data", e))?;

        let health_factor = if acct.total_debt_base.is_zero() {
            "∞ (no debt)".to_string()
        } else {
            format_units(acct.health_factor, WAD_DECIMALS)
        };

        Ok(ToolOutput::text(format!(
            "Aave V3 Account Summary\n\
             Address: {}\n\
             \n\
             Total Collateral: ${} USD\n\
             Total Debt: ${} USD\n\
             Available to Borrow: ${} USD\n\
             Liquidation Threshold: {:.2}%\n\
             Loan-to-Value (LTV): {:.2}%\n\
             Health Factor: {}",
            to_checksum(&user, None),
            format_units(acct.total_collateral_base, BASE_CURRENCY_DECIMALS),
            format_units(acct.total_debt_base, BASE_CURRENCY_DECIMALS),
            format_units(acct.available_borrows_base, BASE_CURRENCY_DECIMALS),
            bps_to_percentage(acct.current_liquidation_threshold),
            bps_to_percentage(acct.ltv),
            health_factor,
        )))
    }
}

pub struct GetRatesTool {
    market: Arc<Market>,
}

#[async_trait]
impl ToolHandler for GetRatesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "aave_v3_get_rates",
            "Query Aave V3 supply APY, variable borrow APY, and reserve configuration for a given token.",
            string_schema(&[("asset", "ERC-20 token contract address (0x-prefixed)")], &["asset"]),
        )
    }

    async fn call(&self, _session_id: &str, args: &Value) -> Result<ToolOutput, ToolError> {
        let asset_arg: String = get_required_arg(args, "asset")?;
        let asset = parse_address(&asset_arg)?;
        let client = &self.market.client;

        // Independent reads.
        let (symbol, reserve, config) = tokio::try_join!(
            client.get_token_symbol(asset),
            client.get_reserve_data(asset),
            client.get_reserve_config_data(asset),
        )
        .map_err(|e| ToolError::failed("failed to get reserve info", e))?;

        let liquidation_bonus = bps_to_percentage(config.liquidation_bonus) - Decimal::ONE_HUNDRED;

        Ok(ToolOutput::text(format!(
            "Aave V3 Reserve Info: {} ({})\n\
             \n\
             Supply APY: {:.2}%\n\
             Variable Borrow APY: {:.2}%\n\
             \n\
             Reserve Configuration:\n\
             \x20 Decimals: {}\n\
             \x20 LTV: {:.2}%\n\
             \x20 Liquidation Threshold: {:.2}%\n\
             \x20 Liquidation Bonus: {:.2}%\n\
             \x20 Can be Collateral: {}\n\
             \x20 Borrowing Enabled: {}\n\
             \x20 Active: {}\n\
             \x20 Frozen: {}",
            symbol,
            to_checksum(&asset, None),
            ray_to_percentage(reserve.liquidity_rate),
            ray_to_percentage(reserve.variable_borrow_rate),
            config.decimals,
            bps_to_percentage(config.ltv),
            bps_to_percentage(config.liquidation_threshold),
            liquidation_bonus,
            config.usage_as_collateral_enabled,
            config.borrowing_enabled,
            config.is_active,
            config.is_frozen,
        )))
    }
}
