use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::ticket::Step;

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// What a caller is allowed to do at the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Teller-Step1")]
    TellerStep1,
    #[serde(rename = "Teller-Step2")]
    TellerStep2,
    #[serde(rename = "Administrator")]
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::TellerStep1 => "Teller-Step1",
            Role::TellerStep2 => "Teller-Step2",
            Role::Administrator => "Administrator",
        }
    }

    /// Whether this role may perform teller actions at `step`.
    pub fn may_serve(&self, step: Step) -> bool {
        match self {
            Role::TellerStep1 => step == Step::One,
            Role::TellerStep2 => step == Step::Two,
            Role::Administrator => true,
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "teller-step1" => Ok(Role::TellerStep1),
            "teller-step2" => Ok(Role::TellerStep2),
            "administrator" => Ok(Role::Administrator),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
    pub method: String,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            role: Role::Administrator,
            method: "none".to_string(),
        }
    }
}
