//! Per-session view of the lifecycle state of managed objects.
//!
//! The server is authoritative. The table only lets the client reject calls
//! that cannot succeed before any byte is sent; it is refreshed from the
//! server through `GetAttributes` whenever the two disagree.
use std::{collections::HashMap, fmt};

use kmip_proto::{
    kmip_attributes::Attributes,
    kmip_operations::RequestPayload,
    kmip_types::{CryptographicAlgorithm, CryptographicUsageMask, ObjectType, State},
};
use tracing::trace;

use crate::{ClientError, error::result::ClientResult};

/// An event moving an object between lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Activate,
    Revoke { compromise: bool },
    Destroy,
}

impl LifecycleEvent {
    /// The transition a request asks for, if any
    #[must_use]
    pub fn of(payload: &RequestPayload) -> Option<Self> {
        match payload {
            RequestPayload::Activate(_) => Some(Self::Activate),
            RequestPayload::Revoke(r) => Some(Self::Revoke {
                compromise: r.revocation_reason.revocation_reason_code.is_compromise(),
            }),
            RequestPayload::Destroy(_) => Some(Self::Destroy),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activate => write!(f, "Activate"),
            Self::Revoke { compromise: true } => write!(f, "Revoke (compromise)"),
            Self::Revoke { compromise: false } => write!(f, "Revoke"),
            Self::Destroy => write!(f, "Destroy"),
        }
    }
}

/// The state reached from `state` on `event`, if the transition is allowed.
#[must_use]
pub const fn next_state(state: State, event: LifecycleEvent) -> Option<State> {
    match (event, state) {
        (LifecycleEvent::Activate, State::PreActive) => Some(State::Active),
        (
            LifecycleEvent::Revoke { compromise: true },
            State::PreActive | State::Active | State::Deactivated,
        ) => Some(State::Compromised),
        (LifecycleEvent::Revoke { compromise: false }, State::Active) => Some(State::Deactivated),
        (LifecycleEvent::Destroy, State::PreActive | State::Deactivated) => Some(State::Destroyed),
        (LifecycleEvent::Destroy, State::Compromised) => Some(State::Destroyed_Compromised),
        _ => None,
    }
}

/// Cryptographic use of a key, checked against state and usage mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUse {
    Encrypt,
    Decrypt,
}

impl KeyUse {
    #[must_use]
    pub const fn of(payload: &RequestPayload) -> Option<Self> {
        match payload {
            RequestPayload::Encrypt(_) => Some(Self::Encrypt),
            RequestPayload::Decrypt(_) => Some(Self::Decrypt),
            _ => None,
        }
    }

    const fn usage_mask(self) -> CryptographicUsageMask {
        match self {
            Self::Encrypt => CryptographicUsageMask::Encrypt,
            Self::Decrypt => CryptographicUsageMask::Decrypt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectView {
    pub object_type: Option<ObjectType>,
    pub state: State,
    pub usage_mask: CryptographicUsageMask,
    pub cryptographic_algorithm: Option<CryptographicAlgorithm>,
    pub cryptographic_length: Option<i32>,
}

impl ObjectView {
    fn update(&mut self, attributes: &Attributes) {
        if let Some(state) = attributes.state() {
            self.state = state;
        }
        if let Some(mask) = attributes.cryptographic_usage_mask() {
            self.usage_mask = mask;
        }
        if let Some(object_type) = attributes.object_type() {
            self.object_type = Some(object_type);
        }
        if let Some(algorithm) = attributes.cryptographic_algorithm() {
            self.cryptographic_algorithm = Some(algorithm);
        }
        if let Some(length) = attributes.cryptographic_length() {
            self.cryptographic_length = Some(length);
        }
    }
}

/// Cached lifecycle view of the objects this session touched, keyed by unique identifier.
#[derive(Debug, Default, Clone)]
pub struct ObjectStateTable {
    objects: HashMap<String, ObjectView>,
}

impl ObjectStateTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, unique_identifier: &str) -> Option<&ObjectView> {
        self.objects.get(unique_identifier)
    }

    #[must_use]
    pub fn contains(&self, unique_identifier: &str) -> bool {
        self.objects.contains_key(unique_identifier)
    }

    /// Record an object the server just created; it starts `PreActive`.
    pub fn insert_created(
        &mut self,
        unique_identifier: &str,
        object_type: ObjectType,
        attributes: &Attributes,
    ) {
        let mut view = ObjectView {
            object_type: Some(object_type),
            state: State::PreActive,
            usage_mask: CryptographicUsageMask::empty(),
            cryptographic_algorithm: None,
            cryptographic_length: None,
        };
        view.update(attributes);
        view.state = State::PreActive;
        trace!("cached new object {unique_identifier}: {view:?}");
        self.objects.insert(unique_identifier.to_owned(), view);
    }

    /// Merge attributes returned by the server.
    ///
    /// An object absent from the table is only cached when the attributes
    /// carry its state.
    pub fn observe(&mut self, unique_identifier: &str, attributes: &Attributes) {
        if let Some(view) = self.objects.get_mut(unique_identifier) {
            view.update(attributes);
            return
        }
        if let Some(state) = attributes.state() {
            let mut view = ObjectView {
                object_type: None,
                state,
                usage_mask: CryptographicUsageMask::empty(),
                cryptographic_algorithm: None,
                cryptographic_length: None,
            };
            view.update(attributes);
            trace!("cached object {unique_identifier}: {view:?}");
            self.objects.insert(unique_identifier.to_owned(), view);
        }
    }

    /// Drop the cached view so the next use reads through to the server.
    pub fn invalidate(&mut self, unique_identifier: &str) {
        self.objects.remove(unique_identifier);
    }

    /// The state `event` leads to, or `InvalidStateTransition`.
    ///
    /// An object missing from the table is not checked.
    pub fn check_transition(
        &self,
        unique_identifier: &str,
        event: LifecycleEvent,
    ) -> ClientResult<Option<State>> {
        let Some(view) = self.objects.get(unique_identifier) else {
            return Ok(None)
        };
        next_state(view.state, event)
            .map(Some)
            .ok_or_else(|| ClientError::InvalidStateTransition {
                unique_identifier: unique_identifier.to_owned(),
                state: view.state,
                event: event.to_string(),
            })
    }

    /// Apply a transition the server confirmed.
    pub fn apply(&mut self, unique_identifier: &str, event: LifecycleEvent) {
        if let Some(view) = self.objects.get_mut(unique_identifier) {
            match next_state(view.state, event) {
                Some(state) => view.state = state,
                // the cache disagrees with the server: read through next time
                None => {
                    self.objects.remove(unique_identifier);
                }
            }
        }
    }

    /// Encrypt and Decrypt need an `Active` key whose usage mask allows the use.
    pub fn check_use(&self, unique_identifier: &str, key_use: KeyUse) -> ClientResult<()> {
        let Some(view) = self.objects.get(unique_identifier) else {
            return Ok(())
        };
        if view.state != State::Active {
            return Err(ClientError::PermissionDenied(format!(
                "{key_use:?} with key {unique_identifier} in state {}",
                view.state
            )))
        }
        if !view.usage_mask.contains(key_use.usage_mask()) {
            return Err(ClientError::PermissionDenied(format!(
                "{key_use:?} with key {unique_identifier} whose usage mask is [{}]",
                view.usage_mask
            )))
        }
        Ok(())
    }

    /// Check the items of a batch in request order, each against the state
    /// the earlier items lead to.
    pub fn check_batch(&self, payloads: &[RequestPayload]) -> ClientResult<()> {
        let mut expected = self.clone();
        for payload in payloads {
            let Some(unique_identifier) = payload.unique_identifier() else {
                continue
            };
            if let Some(key_use) = KeyUse::of(payload) {
                expected.check_use(unique_identifier, key_use)?;
            }
            if let Some(event) = LifecycleEvent::of(payload) {
                expected.check_transition(unique_identifier, event)?;
                expected.apply(unique_identifier, event);
            }
        }
        Ok(())
    }
}
