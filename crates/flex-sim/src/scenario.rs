//! Scenario files.
//!
//! A scenario is an ordered list of steps:
//!
//! ```toml
//! [[step]]
//! action = "stake"
//! account = "alice"
//! flex = 10
//!
//! [[step]]
//! action = "mine"
//! blocks = 30
//! ```
//!
//! Accounts are referred to by label; amounts are whole FLEX.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// A parsed scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// One scenario step. Each step except `mine` is a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Mine empty blocks.
    Mine { blocks: u64 },
    /// Admin sends FLEX to an account.
    Fund { account: String, flex: u64 },
    /// Admin sends FLEX to the distributor.
    FundDistributor { flex: u64 },
    /// Token transfer between accounts.
    Transfer { from: String, to: String, flex: u64 },
    /// Set an account's voting balance from the next block on.
    Stake { account: String, flex: u64 },
    /// Trigger the distributor, by the admin unless `caller` is given.
    Distribute {
        #[serde(default)]
        caller: Option<String>,
    },
    /// Admin deposits directly into the payout engine.
    DirectDistribute { flex: u64 },
    /// Claim on behalf of `account`.
    Claim {
        account: String,
        #[serde(default)]
        caller: Option<String>,
    },
    /// Queue an epoch length change.
    SetNextEpochLength { length: u64 },
    /// Correct the queued epoch length change.
    UpdateLastEpochLength { length: u64 },
    /// Allow an account to trigger the distributor.
    AddDelegatee { account: String },
    /// Grant operator status on the payout engine.
    AddOperator { account: String },
    /// Return distributor funds.
    RevertTransfer {
        to: String,
        #[serde(default)]
        flex: Option<u64>,
    },
}

impl Step {
    /// Short name used in logs and the revert list.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Mine { .. } => "mine",
            Self::Fund { .. } => "fund",
            Self::FundDistributor { .. } => "fund_distributor",
            Self::Transfer { .. } => "transfer",
            Self::Stake { .. } => "stake",
            Self::Distribute { .. } => "distribute",
            Self::DirectDistribute { .. } => "direct_distribute",
            Self::Claim { .. } => "claim",
            Self::SetNextEpochLength { .. } => "set_next_epoch_length",
            Self::UpdateLastEpochLength { .. } => "update_last_epoch_length",
            Self::AddDelegatee { .. } => "add_delegatee",
            Self::AddOperator { .. } => "add_operator",
            Self::RevertTransfer { .. } => "revert_transfer",
        }
    }
}

impl Scenario {
    /// Read a scenario file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid scenario {}", path.display()))
    }

    /// Parse scenario TOML.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        if let Some(step) = scenario.steps.iter().find(|s| s.has_empty_label()) {
            anyhow::bail!("step `{}` has an empty account label", step.action());
        }
        Ok(scenario)
    }
}

impl Step {
    fn has_empty_label(&self) -> bool {
        let labels: Vec<&str> = match self {
            Self::Fund { account, .. }
            | Self::Stake { account, .. }
            | Self::AddDelegatee { account }
            | Self::AddOperator { account } => vec![account.as_str()],
            Self::Transfer { from, to, .. } => vec![from.as_str(), to.as_str()],
            Self::Distribute { caller } => caller.iter().map(String::as_str).collect(),
            Self::Claim { account, caller } => std::iter::once(account.as_str())
                .chain(caller.iter().map(String::as_str))
                .collect(),
            Self::RevertTransfer { to, .. } => vec![to.as_str()],
            Self::Mine { .. }
            | Self::FundDistributor { .. }
            | Self::DirectDistribute { .. }
            | Self::SetNextEpochLength { .. }
            | Self::UpdateLastEpochLength { .. } => Vec::new(),
        };
        labels.iter().any(|l| l.trim().is_empty())
    }
}
