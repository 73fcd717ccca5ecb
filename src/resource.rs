use serde::Serialize;

use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceRole {
    Master,
    Core,
}

impl InstanceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceRole::Master => "MASTER",
            InstanceRole::Core => "CORE",
        }
    }
}

/// How the instances of a group are paid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "market", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Market {
    OnDemand,
    Spot {
        #[serde(rename = "bidPrice")]
        bid_price: String,
    },
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::OnDemand => "ON_DEMAND",
            Market::Spot { .. } => "SPOT",
        }
    }

    pub fn bid_price(&self) -> Option<&str> {
        match self {
            Market::OnDemand => None,
            Market::Spot { bid_price } => Some(bid_price),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceGroup {
    pub role: InstanceRole,
    pub instance_type: String,
    pub instance_count: u32,
    #[serde(flatten)]
    pub market: Market,
}

/// The instance layout of a cluster: always one master, plus a core group
/// holding the rest of the instances when there are more than one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstancePlan {
    master: InstanceGroup,
    core: Option<InstanceGroup>,
}

impl InstancePlan {
    pub fn from_settings(settings: &Settings) -> Self {
        let market = match &settings.instance_bid_price {
            Some(bid_price) => Market::Spot {
                bid_price: bid_price.clone(),
            },
            None => Market::OnDemand,
        };

        let group = |role, instance_count| InstanceGroup {
            role,
            instance_type: settings.instance_type.clone(),
            instance_count,
            market: market.clone(),
        };

        let master = group(InstanceRole::Master, 1);
        let core = if settings.instance_count > 1 {
            Some(group(InstanceRole::Core, settings.instance_count - 1))
        } else {
            None
        };

        Self { master, core }
    }

    pub fn master(&self) -> &InstanceGroup {
        &self.master
    }

    pub fn core(&self) -> Option<&InstanceGroup> {
        self.core.as_ref()
    }

    pub fn into_groups(self) -> Vec<InstanceGroup> {
        std::iter::once(self.master).chain(self.core).collect()
    }
}
