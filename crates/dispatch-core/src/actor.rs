//! # Actors
//!
//! The identity attached to a transition: who performed it and in which
//! role. Several independent actors operate on the same request (admins,
//! the assigned partner, the customer, and automated jobs), so every
//! timeline entry records the actor when it is known.

use serde::{Deserialize, Serialize};

/// Role of the actor performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Portal administrator.
    Admin,
    /// Partner staff acting for their own branches.
    Partner,
    /// The customer who submitted the request.
    Customer,
    /// An automated process (scheduled job, integration).
    System,
}

impl ActorRole {
    /// The canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Partner => "partner",
            Self::Customer => "customer",
            Self::System => "system",
        }
    }

    /// Parse the canonical string form.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "admin" => Some(Self::Admin),
            "partner" => Some(Self::Partner),
            "customer" => Some(Self::Customer),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The actor behind an operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Actor {
    /// Opaque actor identity (user id, job name).
    pub id: Option<String>,
    /// Actor role, when known.
    pub role: Option<ActorRole>,
}

impl Actor {
    /// An actor with a known identity and role.
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: Some(id.into()),
            role: Some(role),
        }
    }

    /// An unidentified actor.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The actor used by automated processes.
    pub fn system(job: impl Into<String>) -> Self {
        Self::new(job, ActorRole::System)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip() {
        for role in [
            ActorRole::Admin,
            ActorRole::Partner,
            ActorRole::Customer,
            ActorRole::System,
        ] {
            assert_eq!(ActorRole::from_name(role.as_str()), Some(role));
        }
        assert_eq!(ActorRole::from_name("root"), None);
    }

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ActorRole::Partner).unwrap(),
            "\"partner\""
        );
    }

    #[test]
    fn system_actor_has_role() {
        let a = Actor::system("sla-reclaim");
        assert_eq!(a.role, Some(ActorRole::System));
        assert_eq!(a.id.as_deref(), Some("sla-reclaim"));
        assert_eq!(Actor::anonymous().role, None);
    }
}
