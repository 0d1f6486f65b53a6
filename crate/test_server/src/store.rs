use kmip_proto::{
    KmipError, KmipResult,
    kmip_attributes::{
        ACTIVATION_DATE, AttributeValue, Attributes, COMPROMISE_DATE, DEACTIVATION_DATE,
        DESTROY_DATE, LAST_CHANGE_DATE, STATE,
    },
    kmip_types::{CryptographicUsageMask, ObjectType, ResultReason, State},
};
use time::OffsetDateTime;
use zeroize::Zeroizing;

/// Current time at the one second precision of KMIP date-times
pub(crate) fn now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(0).unwrap_or(now)
}

pub(crate) struct StoredObject {
    pub unique_identifier: String,
    pub object_type: ObjectType,
    state: State,
    /// Every attribute of the object, `State` included
    pub attributes: Attributes,
    /// Removed on Destroy
    pub key_material: Option<Zeroizing<Vec<u8>>>,
}

impl StoredObject {
    pub(crate) fn new(
        unique_identifier: String,
        object_type: ObjectType,
        mut attributes: Attributes,
        key_material: Zeroizing<Vec<u8>>,
    ) -> Self {
        attributes.set(STATE, AttributeValue::enumeration(State::PreActive));
        Self {
            unique_identifier,
            object_type,
            state: State::PreActive,
            attributes,
            key_material: Some(key_material),
        }
    }

    pub(crate) const fn state(&self) -> State {
        self.state
    }

    /// Move to `state` and stamp the matching date attribute.
    pub(crate) fn set_state(&mut self, state: State) {
        let now = now();
        let date = match state {
            State::Active => Some(ACTIVATION_DATE),
            State::Deactivated => Some(DEACTIVATION_DATE),
            State::Compromised => Some(COMPROMISE_DATE),
            State::Destroyed | State::Destroyed_Compromised => Some(DESTROY_DATE),
            State::PreActive => None,
        };
        if let Some(date) = date {
            self.attributes.set(date, now);
        }
        self.attributes
            .set(STATE, AttributeValue::enumeration(state))
            .set(LAST_CHANGE_DATE, now);
        self.state = state;
    }

    /// Cryptographic use requires an active key allowed by its usage mask.
    pub(crate) fn check_use(&self, usage: CryptographicUsageMask) -> KmipResult<&[u8]> {
        if self.state != State::Active {
            return Err(KmipError::Kmip(
                ResultReason::Wrong_Key_Lifecycle_State,
                format!("object {} is {}", self.unique_identifier, self.state),
            ))
        }
        let mask = self
            .attributes
            .cryptographic_usage_mask()
            .unwrap_or_default();
        if !mask.contains(usage) {
            return Err(KmipError::Kmip(
                ResultReason::Incompatible_Cryptographic_Usage_Mask,
                format!(
                    "object {} does not allow {usage}, usage mask is [{mask}]",
                    self.unique_identifier
                ),
            ))
        }
        self.key_material
            .as_ref()
            .map(|k| k.as_slice())
            .ok_or_else(|| {
                KmipError::Kmip(
                    ResultReason::Object_Destroyed,
                    format!("object {} was destroyed", self.unique_identifier),
                )
            })
    }
}

/// Objects in creation order
#[derive(Default)]
pub(crate) struct ObjectStore {
    objects: Vec<StoredObject>,
}

impl ObjectStore {
    pub(crate) fn insert(&mut self, object: StoredObject) {
        self.objects.push(object);
    }

    pub(crate) fn get(&self, unique_identifier: &str) -> KmipResult<&StoredObject> {
        self.objects
            .iter()
            .find(|o| o.unique_identifier == unique_identifier)
            .ok_or_else(|| not_found(unique_identifier))
    }

    pub(crate) fn get_mut(&mut self, unique_identifier: &str) -> KmipResult<&mut StoredObject> {
        self.objects
            .iter_mut()
            .find(|o| o.unique_identifier == unique_identifier)
            .ok_or_else(|| not_found(unique_identifier))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &StoredObject> {
        self.objects.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }
}

fn not_found(unique_identifier: &str) -> KmipError {
    KmipError::Kmip(
        ResultReason::Item_Not_Found,
        format!("no object with unique identifier {unique_identifier}"),
    )
}
