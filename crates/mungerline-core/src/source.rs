use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical provider identifiers used in records and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Eastmoney,
    Yahoo,
}

impl ProviderId {
    pub const ALL: [Self; 2] = [Self::Eastmoney, Self::Yahoo];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eastmoney => "eastmoney",
            Self::Yahoo => "yahoo",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "eastmoney" => Ok(Self::Eastmoney),
            "yahoo" => Ok(Self::Yahoo),
            other => Err(format!(
                "invalid provider '{other}', expected one of eastmoney, yahoo"
            )),
        }
    }
}
