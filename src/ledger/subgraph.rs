use alloy::primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::StakingQuery;
use crate::model::amount::{de_amount, de_opt_amount, sum};
use crate::model::{OperatorSnapshot, Pool, StakeMap};

const PAGE_SIZE: usize = 1000;

const OPERATOR_QUERY: &str = r#"
query Operator($operator: ID!) {
  operator(id: $operator) {
    dataTokenBalanceWei
    stakes(first: 1000) { sponsorship { id } amountWei }
    queueEntries(first: 1000) { amount }
  }
  networks(first: 1) { minimumStakeWei }
}
"#;

const SPONSORSHIPS_QUERY: &str = r#"
query Sponsorships($first: Int!, $after: ID!) {
  sponsorships(first: $first, where: { id_gt: $after, isRunning: true }, orderBy: id) {
    id
    totalPayoutWeiPerSec
    operatorCount
    maxOperators
    minOperators
    remainingWei
    projectedInsolvency
    minimumStakingPeriodSeconds
  }
}
"#;

// ── API response types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GraphResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphError>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct OperatorData {
    operator: Option<OperatorEntity>,
    networks: Vec<NetworkEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperatorEntity {
    #[serde(deserialize_with = "de_amount")]
    data_token_balance_wei: U256,
    stakes: Vec<StakeEntity>,
    queue_entries: Vec<QueueEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StakeEntity {
    sponsorship: IdRef,
    #[serde(deserialize_with = "de_amount")]
    amount_wei: U256,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct QueueEntity {
    #[serde(deserialize_with = "de_amount")]
    amount: U256,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkEntity {
    #[serde(deserialize_with = "de_amount")]
    minimum_stake_wei: U256,
}

#[derive(Debug, Deserialize)]
struct SponsorshipsData {
    sponsorships: Vec<SponsorshipEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SponsorshipEntity {
    id: String,
    #[serde(deserialize_with = "de_amount")]
    total_payout_wei_per_sec: U256,
    operator_count: u32,
    max_operators: Option<u32>,
    min_operators: u32,
    #[serde(deserialize_with = "de_amount")]
    remaining_wei: U256,
    #[serde(default, deserialize_with = "de_opt_amount")]
    projected_insolvency: Option<U256>,
    #[serde(deserialize_with = "de_amount")]
    minimum_staking_period_seconds: U256,
}

impl SponsorshipEntity {
    fn into_pool(self) -> Result<Pool> {
        Ok(Pool {
            id: parse_id(&self.id)?,
            payout_per_second: self.total_payout_wei_per_sec,
            operator_count: self.operator_count,
            max_operators: self.max_operators,
            min_operators: self.min_operators,
            remaining_balance: self.remaining_wei,
            projected_insolvency: self.projected_insolvency.map(saturating_u64),
            min_staking_period_secs: saturating_u64(self.minimum_staking_period_seconds),
        })
    }
}

// ── Query adapter ────────────────────────────────────────────────────

/// [`StakingQuery`] backed by the network's subgraph indexer.
pub struct SubgraphQuery {
    client: reqwest::Client,
    url: String,
    operator: Address,
}

impl SubgraphQuery {
    pub fn new(url: impl Into<String>, operator: Address) -> Self {
        SubgraphQuery {
            client: reqwest::Client::new(),
            url: url.into(),
            operator,
        }
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let resp: GraphResponse<T> = self
            .client
            .post(&self.url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .context("subgraph request failed")?
            .error_for_status()
            .context("subgraph returned an error status")?
            .json()
            .await
            .context("parsing subgraph response")?;

        if !resp.errors.is_empty() {
            let msgs: Vec<&str> = resp.errors.iter().map(|e| e.message.as_str()).collect();
            bail!("subgraph query failed: {}", msgs.join("; "));
        }
        resp.data.context("subgraph response has no data")
    }

    async fn fetch_pools(&self) -> Result<Vec<Pool>> {
        let mut pools = Vec::new();
        let mut after = String::new();
        loop {
            let page: SponsorshipsData = self
                .post(
                    SPONSORSHIPS_QUERY,
                    json!({ "first": PAGE_SIZE, "after": after }),
                )
                .await
                .context("fetching sponsorships")?;
            let n = page.sponsorships.len();
            if let Some(last) = page.sponsorships.last() {
                after = last.id.clone();
            }
            for entity in page.sponsorships {
                pools.push(entity.into_pool()?);
            }
            if n < PAGE_SIZE {
                return Ok(pools);
            }
        }
    }
}

#[async_trait]
impl StakingQuery for SubgraphQuery {
    async fn snapshot(&self) -> Result<OperatorSnapshot> {
        let id = format!("{:#x}", self.operator);
        let data: OperatorData = self
            .post(OPERATOR_QUERY, json!({ "operator": id }))
            .await
            .context("fetching operator state")?;

        let operator = data
            .operator
            .with_context(|| format!("operator {id} not found in subgraph"))?;
        let min_stake_per_pool = data
            .networks
            .first()
            .map(|n| n.minimum_stake_wei)
            .context("subgraph has no network entity")?;

        let mut stakes = StakeMap::new();
        for s in operator.stakes {
            if !s.amount_wei.is_zero() {
                stakes.insert(parse_id(&s.sponsorship.id)?, s.amount_wei);
            }
        }
        let undelegation_queue = sum(operator.queue_entries.iter().map(|q| &q.amount));

        let pools = self.fetch_pools().await?;
        debug!(
            pools = pools.len(),
            stakes = stakes.len(),
            "subgraph snapshot loaded"
        );

        Ok(OperatorSnapshot {
            operator: self.operator,
            stakes,
            free_balance: operator.data_token_balance_wei,
            pools,
            undelegation_queue,
            min_stake_per_pool,
            timestamp: unix_seconds(chrono::Utc::now().timestamp()),
        })
    }
}

/// Seconds since the epoch, with pre-epoch clocks reading as zero.
pub fn unix_seconds(secs: i64) -> u64 {
    u64::try_from(secs).unwrap_or(0)
}

fn parse_id(id: &str) -> Result<Address> {
    id.parse()
        .with_context(|| format!("invalid sponsorship id '{id}'"))
}

fn saturating_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.to::<u64>()
    }
}
