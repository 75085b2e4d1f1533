use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Reference role row (`user`, `mentor`, `admin`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub phone_number: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub user_id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub photo_url: Option<String>,
}

impl Profile {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }
}

/// Partial profile update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub photo_url: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.contact.is_none()
            && self.photo_url.is_none()
    }

    pub fn apply(self, profile: &mut Profile) {
        if let Some(v) = self.first_name {
            profile.first_name = Some(v);
        }
        if let Some(v) = self.last_name {
            profile.last_name = Some(v);
        }
        if let Some(v) = self.email {
            profile.email = Some(v);
        }
        if let Some(v) = self.contact {
            profile.contact = Some(v);
        }
        if let Some(v) = self.photo_url {
            profile.photo_url = Some(v);
        }
    }
}

/// Public face of a user: what other users see in participant lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Direction {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub mentor_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewDirection {
    pub name: String,
    pub description: String,
    pub mentor_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct DirectionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub mentor_id: Option<Uuid>,
}

impl DirectionPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.mentor_id.is_none()
    }

    pub fn apply(self, direction: &mut Direction) {
        if let Some(v) = self.name {
            direction.name = v;
        }
        if let Some(v) = self.description {
            direction.description = v;
        }
        if let Some(v) = self.mentor_id {
            direction.mentor_id = v;
        }
    }
}

/// Pending join request. The row only exists until it is approved or declined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: Uuid,
    pub user_id: Uuid,
    pub direction_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rating {
    pub id: Uuid,
    pub user_id: Uuid,
    pub direction_id: i32,
    pub value: i32,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    /// Fresh zero-value rating created when an application is approved.
    pub fn opening(user_id: Uuid, direction_id: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            direction_id,
            value: 0,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingTransaction {
    pub id: Uuid,
    pub rating_id: Uuid,
    pub author_id: Uuid,
    pub value_change: i32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

/// Maximum number of stored refresh tokens per user. The oldest is dropped on overflow.
pub const MAX_REFRESH_TOKENS: u64 = 10;

/// Which flow an SMS code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationPurpose {
    Registration,
    PasswordReset,
    PhoneChange,
}

impl VerificationPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::PasswordReset => "password_reset",
            Self::PhoneChange => "phone_change",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registration" => Some(Self::Registration),
            "password_reset" => Some(Self::PasswordReset),
            "phone_change" => Some(Self::PhoneChange),
            _ => None,
        }
    }
}

/// Outstanding SMS code for `(purpose, phone_number)`.
#[derive(Debug, Clone)]
pub struct PhoneVerification {
    pub id: Uuid,
    pub purpose: VerificationPurpose,
    /// Phone the record is keyed on; for phone changes this is the caller's current phone.
    pub phone_number: String,
    /// Target number of a phone change.
    pub new_phone: Option<String>,
    pub code: String,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A code request about to be recorded.
#[derive(Debug, Clone)]
pub struct CodeRequest {
    pub purpose: VerificationPurpose,
    pub phone_number: String,
    pub new_phone: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Achievement {
    pub id: i32,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAchievement {
    pub achievement: Achievement,
    pub granted_at: DateTime<Utc>,
}

/// Verification codes are five-digit numbers drawn from this range.
pub const CODE_RANGE: std::ops::RangeInclusive<u32> = 10_000..=99_999;
