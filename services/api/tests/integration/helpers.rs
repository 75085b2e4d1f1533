use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use cohort_api::domain::authz::{AccessPolicy, MentorAdminRule, Subject};
use cohort_api::domain::rate_limit::{AttemptState, next_attempt};
use cohort_api::domain::repository::{
    AchievementRepository, ApplicationRepository, DirectionRepository, PasswordHasher,
    RatingRepository, RefreshTokenRepository, RoleRepository, SmsSender, UserRepository,
    VerificationRepository,
};
use cohort_api::domain::types::{
    Achievement, Application, CodeRequest, Direction, DirectionPatch, MAX_REFRESH_TOKENS,
    NewDirection, PhoneVerification, Profile, ProfilePatch, Rating, RatingTransaction,
    RefreshTokenRecord, Role, User, UserAchievement, UserSummary, VerificationPurpose,
};
use cohort_api::error::ApiError;
use cohort_domain::pagination::Window;
use cohort_domain::role::RoleName;

pub use cohort_testing::auth::TEST_JWT_SECRET;

// ── In-memory tables ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Tables {
    pub roles: Vec<Role>,
    pub users: Vec<User>,
    pub user_roles: Vec<(Uuid, i32)>,
    pub profiles: Vec<Profile>,
    pub directions: Vec<Direction>,
    /// `(direction_id, user_id)`
    pub members: Vec<(i32, Uuid)>,
    pub applications: Vec<Application>,
    pub ratings: Vec<Rating>,
    pub transactions: Vec<RatingTransaction>,
    pub refresh_tokens: Vec<RefreshTokenRecord>,
    pub verifications: Vec<PhoneVerification>,
    pub achievements: Vec<Achievement>,
    /// `(user_id, achievement_id, granted_at)`
    pub grants: Vec<(Uuid, i32, DateTime<Utc>)>,
    /// `(phone, message)`
    pub sent_sms: Vec<(String, String)>,
}

/// Shared store behind every mock port. Each operation takes the lock once, so
/// multi-row operations are atomic the way the database transaction makes them.
#[derive(Clone)]
pub struct World {
    pub tables: Arc<Mutex<Tables>>,
    pub clock: Arc<Mutex<DateTime<Utc>>>,
}

impl World {
    /// Empty store with the three reference roles seeded.
    pub fn new() -> Self {
        let mut tables = Tables::default();
        for (i, name) in RoleName::ALL.iter().enumerate() {
            tables.roles.push(Role {
                id: i as i32 + 1,
                name: name.as_str().to_owned(),
            });
        }
        Self {
            tables: Arc::new(Mutex::new(tables)),
            clock: Arc::new(Mutex::new(Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap())),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.clock.lock().unwrap()
    }

    pub fn advance(&self, secs: i64) {
        *self.clock.lock().unwrap() += Duration::seconds(secs);
    }

    pub fn add_user(&self, phone: &str, roles: &[RoleName]) -> Uuid {
        let id = Uuid::now_v7();
        let now = self.now();
        let mut t = self.lock();
        t.users.push(User {
            id,
            phone_number: phone.to_owned(),
            password_hash: PlainHasher::digest("password1"),
            created_at: now,
            updated_at: now,
        });
        t.profiles.push(Profile::empty(id));
        for role in roles {
            let role_id = t.roles.iter().find(|r| r.name == role.as_str()).unwrap().id;
            t.user_roles.push((id, role_id));
        }
        id
    }

    pub fn add_direction(&self, name: &str, mentor_id: Uuid) -> Direction {
        let mut t = self.lock();
        let direction = Direction {
            id: t.directions.len() as i32 + 1,
            name: name.to_owned(),
            description: format!("{name} track"),
            mentor_id,
        };
        t.directions.push(direction.clone());
        direction
    }

    pub fn add_application(&self, user_id: Uuid, direction_id: i32) -> Application {
        let application = Application {
            id: Uuid::now_v7(),
            user_id,
            direction_id,
            created_at: self.now(),
        };
        self.lock().applications.push(application.clone());
        application
    }

    /// Member of `direction_id` holding a rating of `value`.
    pub fn add_rating(&self, user_id: Uuid, direction_id: i32, value: i32) -> Rating {
        let rating = Rating {
            id: Uuid::now_v7(),
            user_id,
            direction_id,
            value,
            created_at: self.now(),
        };
        let mut t = self.lock();
        t.members.push((direction_id, user_id));
        t.ratings.push(rating.clone());
        rating
    }

    pub fn add_achievement(&self, name: &str) -> Achievement {
        let mut t = self.lock();
        let achievement = Achievement {
            id: t.achievements.len() as i32 + 1,
            name: name.to_owned(),
            description: format!("awarded for {name}"),
        };
        t.achievements.push(achievement.clone());
        achievement
    }

    pub fn policy(&self, rule: MentorAdminRule) -> AccessPolicy<MemRoles> {
        AccessPolicy::new(MemRoles(self.clone()), rule)
    }

    pub fn users(&self) -> MemUsers {
        MemUsers(self.clone())
    }

    pub fn directions(&self) -> MemDirections {
        MemDirections(self.clone())
    }

    pub fn applications(&self) -> MemApplications {
        MemApplications(self.clone())
    }

    pub fn ratings(&self) -> MemRatings {
        MemRatings(self.clone())
    }

    pub fn tokens(&self) -> MemTokens {
        MemTokens(self.clone())
    }

    pub fn verifications(&self) -> MemVerifications {
        MemVerifications(self.clone())
    }

    pub fn achievements(&self) -> MemAchievements {
        MemAchievements(self.clone())
    }

    pub fn sms(&self) -> MemSms {
        MemSms(self.clone())
    }

    /// Code most recently texted to `phone`.
    pub fn last_code(&self, phone: &str) -> String {
        let t = self.lock();
        let (_, message) = t
            .sent_sms
            .iter()
            .rev()
            .find(|(to, _)| to == phone)
            .expect("no sms sent to phone");
        message.rsplit(' ').next().unwrap().to_owned()
    }
}

// ── Roles ────────────────────────────────────────────────────────────────────

pub struct MemRoles(pub World);

impl RoleRepository for MemRoles {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, ApiError> {
        Ok(self.0.lock().roles.iter().find(|r| r.name == name).cloned())
    }

    async fn create(&self, name: &str) -> Result<Role, ApiError> {
        let mut t = self.0.lock();
        if let Some(role) = t.roles.iter().find(|r| r.name == name) {
            return Ok(role.clone());
        }
        let role = Role {
            id: t.roles.len() as i32 + 1,
            name: name.to_owned(),
        };
        t.roles.push(role.clone());
        Ok(role)
    }

    async fn grant(&self, user_id: Uuid, role_id: i32) -> Result<(), ApiError> {
        let mut t = self.0.lock();
        if !t.user_roles.contains(&(user_id, role_id)) {
            t.user_roles.push((user_id, role_id));
        }
        Ok(())
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

pub struct MemUsers(pub World);

impl UserRepository for MemUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        Ok(self.0.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, ApiError> {
        Ok(self
            .0
            .lock()
            .users
            .iter()
            .find(|u| u.phone_number == phone)
            .cloned())
    }

    async fn create_with_profile(&self, user: &User, role_id: i32) -> Result<(), ApiError> {
        let mut t = self.0.lock();
        if t.users.iter().any(|u| u.phone_number == user.phone_number) {
            return Err(ApiError::UserExists);
        }
        t.users.push(user.clone());
        t.profiles.push(Profile::empty(user.id));
        t.user_roles.push((user.id, role_id));
        Ok(())
    }

    async fn update_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let mut t = self.0.lock();
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(ApiError::NotFound("user"))?;
        user.password_hash = password_hash.to_owned();
        user.updated_at = changed_at;
        t.refresh_tokens.retain(|r| r.user_id != user_id);
        Ok(())
    }

    async fn change_phone(
        &self,
        user_id: Uuid,
        new_phone: &str,
        verification_id: Uuid,
    ) -> Result<(), ApiError> {
        let mut t = self.0.lock();
        if t.users.iter().any(|u| u.phone_number == new_phone) {
            return Err(ApiError::UserExists);
        }
        if !t.verifications.iter().any(|v| v.id == verification_id) {
            return Err(ApiError::VerificationNotFound);
        }
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(ApiError::NotFound("user"))?;
        user.phone_number = new_phone.to_owned();
        t.verifications.retain(|v| v.id != verification_id);
        Ok(())
    }

    async fn load_subject(&self, user_id: Uuid) -> Result<Option<Subject>, ApiError> {
        let t = self.0.lock();
        if !t.users.iter().any(|u| u.id == user_id) {
            return Ok(None);
        }
        let roles = t
            .user_roles
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, rid)| t.roles.iter().find(|r| r.id == *rid).cloned())
            .collect();
        let mentored = t
            .directions
            .iter()
            .filter(|d| d.mentor_id == user_id)
            .cloned()
            .collect();
        Ok(Some(Subject {
            user_id,
            roles,
            mentored,
        }))
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, ApiError> {
        Ok(self
            .0
            .lock()
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        patch: ProfilePatch,
    ) -> Result<Profile, ApiError> {
        let mut t = self.0.lock();
        let profile = t
            .profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or(ApiError::NotFound("profile"))?;
        patch.apply(profile);
        Ok(profile.clone())
    }

    async fn summaries(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>, ApiError> {
        let t = self.0.lock();
        Ok(ids
            .iter()
            .filter_map(|id| t.profiles.iter().find(|p| p.user_id == *id))
            .map(|p| UserSummary {
                id: p.user_id,
                first_name: p.first_name.clone(),
                last_name: p.last_name.clone(),
                photo_url: p.photo_url.clone(),
            })
            .collect())
    }
}

// ── Directions ───────────────────────────────────────────────────────────────

pub struct MemDirections(pub World);

impl DirectionRepository for MemDirections {
    async fn list(&self) -> Result<Vec<Direction>, ApiError> {
        Ok(self.0.lock().directions.clone())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Direction>, ApiError> {
        Ok(self.0.lock().directions.iter().find(|d| d.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Direction>, ApiError> {
        Ok(self
            .0
            .lock()
            .directions
            .iter()
            .find(|d| d.name == name)
            .cloned())
    }

    async fn create(&self, direction: &NewDirection) -> Result<Direction, ApiError> {
        let mut t = self.0.lock();
        if t.directions.iter().any(|d| d.name == direction.name) {
            return Err(ApiError::DirectionExists);
        }
        let created = Direction {
            id: t.directions.len() as i32 + 1,
            name: direction.name.clone(),
            description: direction.description.clone(),
            mentor_id: direction.mentor_id,
        };
        t.directions.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, patch: DirectionPatch) -> Result<Direction, ApiError> {
        let mut t = self.0.lock();
        if let Some(name) = &patch.name {
            if t.directions.iter().any(|d| d.id != id && &d.name == name) {
                return Err(ApiError::DirectionExists);
            }
        }
        let direction = t
            .directions
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(ApiError::NotFound("direction"))?;
        patch.apply(direction);
        Ok(direction.clone())
    }

    async fn joined_by(&self, user_id: Uuid) -> Result<Vec<Direction>, ApiError> {
        let t = self.0.lock();
        Ok(t.members
            .iter()
            .filter(|(_, uid)| *uid == user_id)
            .filter_map(|(did, _)| t.directions.iter().find(|d| d.id == *did).cloned())
            .collect())
    }

    async fn participant_ids(&self, direction_id: i32) -> Result<Vec<Uuid>, ApiError> {
        Ok(self
            .0
            .lock()
            .members
            .iter()
            .filter(|(did, _)| *did == direction_id)
            .map(|(_, uid)| *uid)
            .collect())
    }

    async fn is_member(&self, direction_id: i32, user_id: Uuid) -> Result<bool, ApiError> {
        Ok(self.0.lock().members.contains(&(direction_id, user_id)))
    }
}

// ── Applications ─────────────────────────────────────────────────────────────

pub struct MemApplications(pub World);

impl ApplicationRepository for MemApplications {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Application>, ApiError> {
        Ok(self
            .0
            .lock()
            .applications
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn find_pending(
        &self,
        user_id: Uuid,
        direction_id: i32,
    ) -> Result<Option<Application>, ApiError> {
        Ok(self
            .0
            .lock()
            .applications
            .iter()
            .find(|a| a.user_id == user_id && a.direction_id == direction_id)
            .cloned())
    }

    async fn create(&self, application: &Application) -> Result<(), ApiError> {
        let mut t = self.0.lock();
        if t.applications.iter().any(|a| {
            a.user_id == application.user_id && a.direction_id == application.direction_id
        }) {
            return Err(ApiError::AlreadyApplied);
        }
        t.applications.push(application.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Application>, ApiError> {
        Ok(self.0.lock().applications.clone())
    }

    async fn list_for_directions(
        &self,
        direction_ids: &[i32],
    ) -> Result<Vec<Application>, ApiError> {
        Ok(self
            .0
            .lock()
            .applications
            .iter()
            .filter(|a| direction_ids.contains(&a.direction_id))
            .cloned()
            .collect())
    }

    async fn approve(&self, application: &Application, rating: &Rating) -> Result<(), ApiError> {
        let mut t = self.0.lock();
        let before = t.applications.len();
        t.applications.retain(|a| a.id != application.id);
        if t.applications.len() == before {
            return Err(ApiError::NotFound("application"));
        }
        let membership = (application.direction_id, application.user_id);
        if !t.members.contains(&membership) {
            t.members.push(membership);
        }
        t.ratings.push(rating.clone());
        Ok(())
    }

    async fn decline(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut t = self.0.lock();
        let before = t.applications.len();
        t.applications.retain(|a| a.id != id);
        Ok(t.applications.len() < before)
    }
}

// ── Ratings ──────────────────────────────────────────────────────────────────

pub struct MemRatings(pub World);

impl RatingRepository for MemRatings {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Rating>, ApiError> {
        Ok(self.0.lock().ratings.iter().find(|r| r.id == id).cloned())
    }

    async fn transactions(&self, rating_id: Uuid) -> Result<Vec<RatingTransaction>, ApiError> {
        Ok(self
            .0
            .lock()
            .transactions
            .iter()
            .filter(|t| t.rating_id == rating_id)
            .cloned()
            .collect())
    }

    async fn add_delta(&self, entry: &RatingTransaction) -> Result<Rating, ApiError> {
        let mut t = self.0.lock();
        let rating = t
            .ratings
            .iter_mut()
            .find(|r| r.id == entry.rating_id)
            .ok_or(ApiError::NotFound("rating"))?;
        rating.value += entry.value_change;
        let updated = rating.clone();
        t.transactions.push(entry.clone());
        Ok(updated)
    }

    async fn list_for_direction(
        &self,
        direction_id: i32,
        window: Window,
    ) -> Result<Vec<Rating>, ApiError> {
        let mut ratings: Vec<Rating> = self
            .0
            .lock()
            .ratings
            .iter()
            .filter(|r| r.direction_id == direction_id)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| b.value.cmp(&a.value));
        Ok(ratings
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Rating>, ApiError> {
        Ok(self
            .0
            .lock()
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn authored_by(&self, author_id: Uuid) -> Result<Vec<RatingTransaction>, ApiError> {
        Ok(self
            .0
            .lock()
            .transactions
            .iter()
            .filter(|t| t.author_id == author_id)
            .cloned()
            .collect())
    }
}

// ── Refresh tokens ───────────────────────────────────────────────────────────

pub struct MemTokens(pub World);

fn insert_capped(t: &mut Tables, record: &RefreshTokenRecord) {
    t.refresh_tokens.push(record.clone());
    let mut owned: Vec<(DateTime<Utc>, Uuid)> = t
        .refresh_tokens
        .iter()
        .filter(|r| r.user_id == record.user_id)
        .map(|r| (r.created_at, r.id))
        .collect();
    owned.sort();
    let overflow = owned.len().saturating_sub(MAX_REFRESH_TOKENS as usize);
    let dropped: Vec<Uuid> = owned.iter().take(overflow).map(|(_, id)| *id).collect();
    t.refresh_tokens.retain(|r| !dropped.contains(&r.id));
}

impl RefreshTokenRepository for MemTokens {
    async fn store(&self, record: &RefreshTokenRecord) -> Result<(), ApiError> {
        insert_capped(&mut self.0.lock(), record);
        Ok(())
    }

    async fn find(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, ApiError> {
        Ok(self
            .0
            .lock()
            .refresh_tokens
            .iter()
            .find(|r| r.user_id == user_id && r.token == token)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        self.0.lock().refresh_tokens.retain(|r| r.id != id);
        Ok(())
    }

    async fn rotate(&self, old_id: Uuid, next: &RefreshTokenRecord) -> Result<(), ApiError> {
        let mut t = self.0.lock();
        let before = t.refresh_tokens.len();
        t.refresh_tokens.retain(|r| r.id != old_id);
        if t.refresh_tokens.len() == before {
            return Err(ApiError::BadRefreshToken);
        }
        insert_capped(&mut t, next);
        Ok(())
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let mut t = self.0.lock();
        let before = t.refresh_tokens.len();
        t.refresh_tokens.retain(|r| r.user_id != user_id);
        Ok((before - t.refresh_tokens.len()) as u64)
    }
}

// ── Verifications ────────────────────────────────────────────────────────────

/// Applies the production rate-limit policy against the world clock.
pub struct MemVerifications(pub World);

impl VerificationRepository for MemVerifications {
    async fn record_request(&self, request: &CodeRequest) -> Result<PhoneVerification, ApiError> {
        let now = self.0.now();
        let mut t = self.0.lock();
        let existing = t
            .verifications
            .iter_mut()
            .find(|v| v.purpose == request.purpose && v.phone_number == request.phone_number);

        let attempts = next_attempt(
            existing.as_ref().map(|v| AttemptState {
                attempts: v.attempts,
                updated_at: v.updated_at,
            }),
            now,
        )?;

        match existing {
            Some(record) => {
                record.code = request.code.clone();
                record.new_phone = request.new_phone.clone();
                record.attempts = attempts;
                record.updated_at = now;
                Ok(record.clone())
            }
            None => {
                let record = PhoneVerification {
                    id: Uuid::now_v7(),
                    purpose: request.purpose,
                    phone_number: request.phone_number.clone(),
                    new_phone: request.new_phone.clone(),
                    code: request.code.clone(),
                    attempts,
                    created_at: now,
                    updated_at: now,
                };
                t.verifications.push(record.clone());
                Ok(record)
            }
        }
    }

    async fn find(
        &self,
        purpose: VerificationPurpose,
        phone: &str,
    ) -> Result<Option<PhoneVerification>, ApiError> {
        Ok(self
            .0
            .lock()
            .verifications
            .iter()
            .find(|v| v.purpose == purpose && v.phone_number == phone)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut t = self.0.lock();
        let before = t.verifications.len();
        t.verifications.retain(|v| v.id != id);
        Ok(t.verifications.len() < before)
    }
}

// ── Achievements ─────────────────────────────────────────────────────────────

pub struct MemAchievements(pub World);

impl AchievementRepository for MemAchievements {
    async fn list(&self) -> Result<Vec<Achievement>, ApiError> {
        Ok(self.0.lock().achievements.clone())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Achievement>, ApiError> {
        Ok(self
            .0
            .lock()
            .achievements
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn give(&self, user_id: Uuid, achievement_id: i32) -> Result<(), ApiError> {
        let now = self.0.now();
        let mut t = self.0.lock();
        if !t
            .grants
            .iter()
            .any(|(uid, aid, _)| *uid == user_id && *aid == achievement_id)
        {
            t.grants.push((user_id, achievement_id, now));
        }
        Ok(())
    }

    async fn of_user(&self, user_id: Uuid) -> Result<Vec<UserAchievement>, ApiError> {
        let t = self.0.lock();
        Ok(t.grants
            .iter()
            .filter(|(uid, _, _)| *uid == user_id)
            .filter_map(|(_, aid, at)| {
                t.achievements
                    .iter()
                    .find(|a| a.id == *aid)
                    .map(|a| UserAchievement {
                        achievement: a.clone(),
                        granted_at: *at,
                    })
            })
            .collect())
    }
}

// ── SMS / hashing ────────────────────────────────────────────────────────────

pub struct MemSms(pub World);

impl SmsSender for MemSms {
    async fn send(&self, phone: &str, message: &str) -> Result<(), ApiError> {
        self.0
            .lock()
            .sent_sms
            .push((phone.to_owned(), message.to_owned()));
        Ok(())
    }
}

/// Reversible stand-in for Argon2 so tests stay fast.
#[derive(Clone, Copy)]
pub struct PlainHasher;

impl PlainHasher {
    pub fn digest(password: &str) -> String {
        format!("plain:{password}")
    }
}

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, ApiError> {
        Ok(Self::digest(password))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, ApiError> {
        Ok(Self::digest(password) == hash)
    }
}
