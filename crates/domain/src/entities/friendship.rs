use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }
}

impl fmt::Display for FriendshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FriendshipStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            other => Err(DomainError::parse(format!(
                "Unknown friendship status: {}",
                other
            ))),
        }
    }
}

/// A friendship row. Lookups treat it as undirected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    pub user_id: UserId,
    pub friend_id: UserId,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    pub fn accepted(
        user_id: UserId,
        friend_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if user_id == friend_id {
            return Err(DomainError::validation("Users cannot befriend themselves"));
        }
        Ok(Self {
            user_id,
            friend_id,
            status: FriendshipStatus::Accepted,
            created_at: now,
        })
    }

    pub fn is_accepted(&self) -> bool {
        self.status == FriendshipStatus::Accepted
    }

    /// The other side of the friendship as seen from `user_id`.
    pub fn other(&self, user_id: UserId) -> UserId {
        if self.user_id == user_id {
            self.friend_id
        } else {
            self.user_id
        }
    }
}
