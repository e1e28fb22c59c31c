//! Account, subscription, and identity session types

use super::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile row from the `users` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub id: UserId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Billing status as mirrored from the payment provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    Canceled,
    Incomplete,
    IncompleteExpired,
    PastDue,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    /// Statuses that grant paid entitlement
    pub const ENTITLED: [SubscriptionStatus; 2] = [Self::Trialing, Self::Active];

    /// Whether this status grants paid entitlement
    pub fn is_entitled(self) -> bool {
        Self::ENTITLED.contains(&self)
    }

    /// Wire name used in the `subscriptions` table
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::PastDue => "past_due",
            Self::Unpaid => "unpaid",
            Self::Paused => "paused",
        }
    }
}

/// Subscription row from the `subscriptions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: UserId,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub price_id: Option<String>,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
}

/// An authenticated session issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    pub access_token: String,
}

/// Identity provider state
///
/// `Loading` is distinct from `SignedOut`: the provider has not yet decided.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Loading,
    SignedOut,
    SignedIn(AuthSession),
}

impl SessionState {
    /// The signed-in session, if any
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            Self::SignedIn(session) => Some(session),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_trialing_and_active_are_entitled() {
        assert!(SubscriptionStatus::Active.is_entitled());
        assert!(SubscriptionStatus::Trialing.is_entitled());
        assert!(!SubscriptionStatus::PastDue.is_entitled());
        assert!(!SubscriptionStatus::Canceled.is_entitled());
    }

    #[test]
    fn status_wire_names_match_serde() {
        let json = serde_json::to_string(&SubscriptionStatus::IncompleteExpired).unwrap();
        assert_eq!(json, format!("\"{}\"", SubscriptionStatus::IncompleteExpired.as_str()));
    }

    #[test]
    fn loading_has_no_session() {
        assert!(SessionState::Loading.session().is_none());
        assert!(SessionState::SignedOut.session().is_none());
    }
}
