use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DataError, Result};

/// Wire form accepted for closed enums: the canonical name or its stable tag.
#[derive(Deserialize)]
#[serde(untagged)]
enum EnumRepr {
    Name(String),
    Tag(u64),
}

/// Decode a nullable string field, treating `null` the same as absent.
fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reachability of a node as last reported.
///
/// Stable integer tags: ONLINE = 0, OFFLINE = 1, UNKNOWN = 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "EnumRepr")]
#[repr(u8)]
pub enum NodeStatus {
    Online = 0,
    Offline = 1,
    Unknown = 2,
}

impl NodeStatus {
    pub const ALL: [NodeStatus; 3] = [NodeStatus::Online, NodeStatus::Offline, NodeStatus::Unknown];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Online => "ONLINE",
            NodeStatus::Offline => "OFFLINE",
            NodeStatus::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeStatus {
    type Err = DataError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        NodeStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DataError::InvalidNodeStatus(s.to_string()))
    }
}

impl TryFrom<u8> for NodeStatus {
    type Error = DataError;

    fn try_from(tag: u8) -> std::result::Result<Self, Self::Error> {
        NodeStatus::ALL
            .get(tag as usize)
            .copied()
            .ok_or(DataError::UnknownTag {
                kind: "node status",
                tag: tag.into(),
            })
    }
}

impl TryFrom<EnumRepr> for NodeStatus {
    type Error = DataError;

    fn try_from(repr: EnumRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            EnumRepr::Name(name) => name.parse(),
            EnumRepr::Tag(tag) => u8::try_from(tag)
                .map_err(|_| DataError::UnknownTag {
                    kind: "node status",
                    tag,
                })
                .and_then(NodeStatus::try_from),
        }
    }
}

/// Lifecycle stage of an instance.
///
/// The orchestrator owns the transition rules; this type only names the
/// stages. Stable integer tags run from REQUESTED = 0 to FAILED = 8 in the
/// order listed here and are pinned by explicit discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "EnumRepr")]
#[repr(u8)]
pub enum InstanceState {
    Requested = 0,
    Preparing = 1,
    Prepared = 2,
    Starting = 3,
    Running = 4,
    Stopping = 5,
    Stopped = 6,
    Destroyed = 7,
    Failed = 8,
}

impl InstanceState {
    pub const ALL: [InstanceState; 9] = [
        InstanceState::Requested,
        InstanceState::Preparing,
        InstanceState::Prepared,
        InstanceState::Starting,
        InstanceState::Running,
        InstanceState::Stopping,
        InstanceState::Stopped,
        InstanceState::Destroyed,
        InstanceState::Failed,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InstanceState::Requested => "REQUESTED",
            InstanceState::Preparing => "PREPARING",
            InstanceState::Prepared => "PREPARED",
            InstanceState::Starting => "STARTING",
            InstanceState::Running => "RUNNING",
            InstanceState::Stopping => "STOPPING",
            InstanceState::Stopped => "STOPPED",
            InstanceState::Destroyed => "DESTROYED",
            InstanceState::Failed => "FAILED",
        }
    }

    /// DESTROYED and FAILED; nothing leaves these states.
    pub fn is_terminal(self) -> bool {
        matches!(self, InstanceState::Destroyed | InstanceState::Failed)
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InstanceState {
    type Err = DataError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        InstanceState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| DataError::InvalidInstanceState(s.to_string()))
    }
}

impl TryFrom<u8> for InstanceState {
    type Error = DataError;

    fn try_from(tag: u8) -> std::result::Result<Self, Self::Error> {
        InstanceState::ALL
            .get(tag as usize)
            .copied()
            .ok_or(DataError::UnknownTag {
                kind: "instance state",
                tag: tag.into(),
            })
    }
}

impl TryFrom<EnumRepr> for InstanceState {
    type Error = DataError;

    fn try_from(repr: EnumRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            EnumRepr::Name(name) => name.parse(),
            EnumRepr::Tag(tag) => u8::try_from(tag)
                .map_err(|_| DataError::UnknownTag {
                    kind: "instance state",
                    tag,
                })
                .and_then(InstanceState::try_from),
        }
    }
}

/// A worker machine in the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub name: String,
    pub region: String,
    pub status: NodeStatus,
    pub dev_mode: bool,
    pub capacity_slots: u32,
    pub used_slots: u32,
    pub last_heartbeat_at: DateTime<Utc>,
    pub node_version: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub tags: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub base_url: String,
}

impl Node {
    /// Check the slot invariant the producer is expected to uphold.
    pub fn validate(&self) -> Result<()> {
        if self.used_slots > self.capacity_slots {
            return Err(DataError::SlotsExceedCapacity {
                node_id: self.id.clone(),
                used: self.used_slots,
                capacity: self.capacity_slots,
            });
        }
        Ok(())
    }

    pub fn free_slots(&self) -> u32 {
        self.capacity_slots.saturating_sub(self.used_slots)
    }

    pub fn is_online(&self) -> bool {
        self.status == NodeStatus::Online
    }

    /// Time since the last heartbeat, clamped at zero for clocks that disagree.
    pub fn heartbeat_age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_heartbeat_at).max(Duration::zero())
    }

    pub fn is_heartbeat_stale(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.heartbeat_age(now) > timeout
    }
}

/// A workload unit assigned (or pending assignment) to a node.
///
/// `node` is a copy taken when the record was produced, not a handle to the
/// live node record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub state: InstanceState,
    pub requested_by_user_id: String,
    pub node: Node,
    pub region: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub tags: String,
    pub dev_mode_allowed: bool,
    pub ports_json: String,
    pub variables_json: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Instance {
    pub fn validate(&self) -> Result<()> {
        self.node.validate()?;
        if self.failure_reason.is_some() && self.state != InstanceState::Failed {
            return Err(DataError::UnexpectedFailureReason {
                instance_id: self.id.clone(),
                state: self.state.to_string(),
            });
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }
}
