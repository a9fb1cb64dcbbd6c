//! Settle state of a promise, observed at one instant.

use deno_core::v8;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleState {
    Pending,
    Fulfilled,
    Rejected,
}

impl SettleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettleState::Pending => "pending",
            SettleState::Fulfilled => "fulfilled",
            SettleState::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SettleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SettleState::Pending),
            "fulfilled" => Ok(SettleState::Fulfilled),
            "rejected" => Ok(SettleState::Rejected),
            other => Err(format!("unknown settle state: {}", other)),
        }
    }
}

impl From<v8::PromiseState> for SettleState {
    fn from(state: v8::PromiseState) -> Self {
        match state {
            v8::PromiseState::Pending => SettleState::Pending,
            v8::PromiseState::Fulfilled => SettleState::Fulfilled,
            v8::PromiseState::Rejected => SettleState::Rejected,
        }
    }
}

/// Probes the settle state of anything by racing it against a fresh
/// sentinel: an already settled value wins the race, a pending one loses.
pub(crate) const PROBE_JS: &str = r#"
  const settleState = (p) => {
    const sentinel = {};
    return Promise.race([p, sentinel]).then(
      (v) => (v === sentinel ? "pending" : "fulfilled"),
      () => "rejected",
    );
  };
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_states() {
        assert_eq!("pending".parse::<SettleState>(), Ok(SettleState::Pending));
        assert_eq!("rejected".parse::<SettleState>(), Ok(SettleState::Rejected));
        assert!("settled".parse::<SettleState>().is_err());
        assert_eq!(SettleState::Fulfilled.to_string(), "fulfilled");
    }
}
