// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values and
//! builds the explicit [`AppConfig`] value handed to each component at
//! startup. Nothing else in the crate reads the environment.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PRIVATE_KEY` | Requester signing key (hex or PEM) | Required |
//! | `RPC_URL` | JSON-RPC endpoint of the chain | Required |
//! | `TRACKING_API_KEY` | Tracking API key, sent as inline secret `dhlKey` | Optional |
//! | `SECRETS_URLS` | Space-separated remote secrets URLs; overrides inline secrets | Optional |
//! | `GITHUB_API_TOKEN` | Secret store access token (inline secrets only) | Optional |
//! | `SECRET_STORE_API_URL` | Secret store API base URL | `https://api.github.com` |
//! | `ORACLE_ADDRESS` | Oracle contract address | `0xeA6721aC65BCeD841B8ec3fc5fEdeA6141a0aDE4` |
//! | `CONSUMER_ADDRESS` | Consumer contract address | `0x6266530eCC40E53d20Fd22C50fcF2a08DBD78B95` |
//! | `SUBSCRIPTION_ID` | Oracle billing subscription | `1305` |
//! | `REQUEST_GAS_LIMIT` | Gas for the fulfillment callback | `12000000` |
//! | `TX_GAS_LIMIT` | Gas limit of the request transaction | `12000000` |
//! | `CONFIRMATIONS` | Blocks to wait after submission | `2` |
//! | `TRACKING_NUMBER` | Shipment tracking number passed to the source | `00340434726200036723` |
//! | `FUNCTIONS_SOURCE_PATH` | JavaScript executed by the oracle network | `functions/tracking_source.js` |
//! | `POLL_INTERVAL_MS` | Fulfillment poll interval | `1000` |
//! | `FULFILLMENT_TIMEOUT_SECS` | Fulfillment deadline | `300` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;

use crate::error::{WorkflowError, WorkflowResult};
use crate::store::gist::DEFAULT_API_BASE_URL;
use crate::types::{RequestParams, SecretsInput};
use crate::watcher::WatchSettings;

pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const TRACKING_API_KEY_ENV: &str = "TRACKING_API_KEY";
pub const SECRETS_URLS_ENV: &str = "SECRETS_URLS";
pub const GITHUB_API_TOKEN_ENV: &str = "GITHUB_API_TOKEN";
pub const SECRET_STORE_API_URL_ENV: &str = "SECRET_STORE_API_URL";
pub const ORACLE_ADDRESS_ENV: &str = "ORACLE_ADDRESS";
pub const CONSUMER_ADDRESS_ENV: &str = "CONSUMER_ADDRESS";
pub const SUBSCRIPTION_ID_ENV: &str = "SUBSCRIPTION_ID";
pub const REQUEST_GAS_LIMIT_ENV: &str = "REQUEST_GAS_LIMIT";
pub const TX_GAS_LIMIT_ENV: &str = "TX_GAS_LIMIT";
pub const CONFIRMATIONS_ENV: &str = "CONFIRMATIONS";
pub const TRACKING_NUMBER_ENV: &str = "TRACKING_NUMBER";
pub const FUNCTIONS_SOURCE_PATH_ENV: &str = "FUNCTIONS_SOURCE_PATH";
pub const POLL_INTERVAL_MS_ENV: &str = "POLL_INTERVAL_MS";
pub const FULFILLMENT_TIMEOUT_SECS_ENV: &str = "FULFILLMENT_TIMEOUT_SECS";

/// Environment variable name for the log output format.
///
/// `json` for machine-readable lines, anything else for human-readable output.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_ORACLE_ADDRESS: &str = "0xeA6721aC65BCeD841B8ec3fc5fEdeA6141a0aDE4";
pub const DEFAULT_CONSUMER_ADDRESS: &str = "0x6266530eCC40E53d20Fd22C50fcF2a08DBD78B95";
pub const DEFAULT_SUBSCRIPTION_ID: u64 = 1305;
pub const DEFAULT_GAS_LIMIT: u32 = 12_000_000;
pub const DEFAULT_CONFIRMATIONS: u64 = 2;
pub const DEFAULT_TRACKING_NUMBER: &str = "00340434726200036723";
pub const DEFAULT_FUNCTIONS_SOURCE_PATH: &str = "functions/tracking_source.js";

/// Inline secret name the tracking source reads its API key from.
pub const TRACKING_SECRET_NAME: &str = "dhlKey";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        })
    }
}

impl LogFormat {
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

/// Process configuration, read once at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub private_key: String,
    pub rpc_url: String,
    pub secrets: Option<SecretsInput>,
    pub store_token: Option<String>,
    pub store_api_url: String,
    pub oracle_address: Address,
    pub consumer_address: Address,
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
    pub tx_gas_limit: u64,
    pub confirmations: u64,
    pub tracking_number: String,
    pub source_path: String,
    pub watch: WatchSettings,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("private_key", &"<redacted>")
            .field("rpc_url", &self.rpc_url)
            .field("secrets", &self.secrets.as_ref().map(|_| "<redacted>"))
            .field("store_token", &self.store_token.as_ref().map(|_| "<redacted>"))
            .field("store_api_url", &self.store_api_url)
            .field("oracle_address", &self.oracle_address)
            .field("consumer_address", &self.consumer_address)
            .field("subscription_id", &self.subscription_id)
            .field("callback_gas_limit", &self.callback_gas_limit)
            .field("tx_gas_limit", &self.tx_gas_limit)
            .field("confirmations", &self.confirmations)
            .field("tracking_number", &self.tracking_number)
            .field("source_path", &self.source_path)
            .field("watch", &self.watch)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> WorkflowResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> WorkflowResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        // PEM keys are often passed with literal `\n` separators.
        let private_key = env.required(PRIVATE_KEY_ENV)?.replace("\\n", "\n");
        let rpc_url = env.required(RPC_URL_ENV)?;

        let secrets = match env.optional(SECRETS_URLS_ENV) {
            Some(urls) => Some(SecretsInput::Remote(
                urls.split_whitespace().map(str::to_string).collect(),
            )),
            None => env.optional(TRACKING_API_KEY_ENV).map(|key| {
                SecretsInput::Inline(BTreeMap::from([(TRACKING_SECRET_NAME.to_string(), key)]))
            }),
        };

        let watch = WatchSettings {
            poll_interval: Duration::from_millis(env.parsed_or(POLL_INTERVAL_MS_ENV, 1000u64)?),
            timeout: Duration::from_secs(env.parsed_or(FULFILLMENT_TIMEOUT_SECS_ENV, 300u64)?),
        };
        if watch.poll_interval.is_zero() {
            return Err(WorkflowError::Config(format!(
                "{POLL_INTERVAL_MS_ENV} must be greater than zero"
            )));
        }

        Ok(Self {
            private_key,
            rpc_url,
            secrets,
            store_token: env.optional(GITHUB_API_TOKEN_ENV),
            store_api_url: env.or_default(SECRET_STORE_API_URL_ENV, DEFAULT_API_BASE_URL),
            oracle_address: env.address(ORACLE_ADDRESS_ENV, DEFAULT_ORACLE_ADDRESS)?,
            consumer_address: env.address(CONSUMER_ADDRESS_ENV, DEFAULT_CONSUMER_ADDRESS)?,
            subscription_id: env.parsed_or(SUBSCRIPTION_ID_ENV, DEFAULT_SUBSCRIPTION_ID)?,
            callback_gas_limit: env.parsed_or(REQUEST_GAS_LIMIT_ENV, DEFAULT_GAS_LIMIT)?,
            tx_gas_limit: env.parsed_or(TX_GAS_LIMIT_ENV, u64::from(DEFAULT_GAS_LIMIT))?,
            confirmations: env.parsed_or(CONFIRMATIONS_ENV, DEFAULT_CONFIRMATIONS)?,
            tracking_number: env.or_default(TRACKING_NUMBER_ENV, DEFAULT_TRACKING_NUMBER),
            source_path: env.or_default(FUNCTIONS_SOURCE_PATH_ENV, DEFAULT_FUNCTIONS_SOURCE_PATH),
            watch,
        })
    }

    /// Request parameters for `source`, the JavaScript the oracle network runs.
    pub fn request_params(&self, source: String) -> RequestParams {
        RequestParams {
            source,
            args: vec![self.tracking_number.clone()],
            subscription_id: self.subscription_id,
            callback_gas_limit: self.callback_gas_limit,
            tx_gas_limit: self.tx_gas_limit,
            confirmations: self.confirmations,
        }
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> WorkflowResult<String> {
        self.optional(name)
            .ok_or_else(|| WorkflowError::Config(format!("{name} environment variable not set")))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or<T>(&self, name: &str, default: T) -> WorkflowResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(raw) => raw
                .parse()
                .map_err(|e| WorkflowError::Config(format!("invalid {name} {raw:?}: {e}"))),
            None => Ok(default),
        }
    }

    fn address(&self, name: &str, default: &str) -> WorkflowResult<Address> {
        self.parsed_or(name, default.to_string())?
            .parse()
            .map_err(|e| WorkflowError::Config(format!("invalid {name}: {e}")))
    }
}
