use std::collections::HashMap;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use cohort_api_schema::{
    achievements, applications, direction_users, directions, phone_verifications, profiles,
    rating_transactions, ratings, refresh_tokens, roles, user_achievements, user_roles, users,
};
use cohort_domain::pagination::Window;

use crate::domain::authz::Subject;
use crate::domain::rate_limit::{AttemptState, next_attempt};
use crate::domain::repository::{
    AchievementRepository, ApplicationRepository, DirectionRepository, RatingRepository,
    RefreshTokenRepository, RoleRepository, UserRepository, VerificationRepository,
};
use crate::domain::types::{
    Achievement, Application, CodeRequest, Direction, DirectionPatch, MAX_REFRESH_TOKENS,
    NewDirection, PhoneVerification, Profile, ProfilePatch, Rating, RatingTransaction,
    RefreshTokenRecord, Role, User, UserAchievement, UserSummary, VerificationPurpose,
};
use crate::error::ApiError;

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// ── Role repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRoleRepository {
    pub db: DatabaseConnection,
}

impl RoleRepository for DbRoleRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, ApiError> {
        let model = roles::Entity::find()
            .filter(roles::Column::Name.eq(name))
            .one(&self.db)
            .await
            .context("find role by name")?;
        Ok(model.map(role_from_model))
    }

    async fn create(&self, name: &str) -> Result<Role, ApiError> {
        roles::Entity::insert(roles::ActiveModel {
            name: Set(name.to_owned()),
            ..Default::default()
        })
        .on_conflict(OnConflict::column(roles::Column::Name).do_nothing().to_owned())
        .exec_without_returning(&self.db)
        .await
        .context("create role")?;
        self.find_by_name(name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("role {name} vanished after insert").into())
    }

    async fn grant(&self, user_id: Uuid, role_id: i32) -> Result<(), ApiError> {
        insert_user_role(&self.db, user_id, role_id)
            .await
            .context("grant role")?;
        Ok(())
    }
}

async fn insert_user_role<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    role_id: i32,
) -> Result<u64, DbErr> {
    user_roles::Entity::insert(user_roles::ActiveModel {
        user_id: Set(user_id),
        role_id: Set(role_id),
    })
    .on_conflict(
        OnConflict::columns([user_roles::Column::UserId, user_roles::Column::RoleId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await
}

fn role_from_model(model: roles::Model) -> Role {
    Role {
        id: model.id,
        name: model.name,
    }
}

// ── User repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl UserRepository for DbUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user by id")?;
        Ok(model.map(user_from_model))
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, ApiError> {
        let model = users::Entity::find()
            .filter(users::Column::PhoneNumber.eq(phone))
            .one(&self.db)
            .await
            .context("find user by phone")?;
        Ok(model.map(user_from_model))
    }

    async fn create_with_profile(&self, user: &User, role_id: i32) -> Result<(), ApiError> {
        let txn = self.db.begin().await.context("begin registration")?;

        let inserted = users::ActiveModel {
            id: Set(user.id),
            phone_number: Set(user.phone_number.clone()),
            password_hash: Set(user.password_hash.clone()),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        }
        .insert(&txn)
        .await;
        match inserted {
            Err(e) if is_unique_violation(&e) => return Err(ApiError::UserExists),
            other => other.context("insert user")?,
        };

        profiles::ActiveModel {
            user_id: Set(user.id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("insert empty profile")?;
        insert_user_role(&txn, user.id, role_id)
            .await
            .context("grant initial role")?;

        txn.commit().await.context("commit registration")?;
        Ok(())
    }

    async fn update_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let txn = self.db.begin().await.context("begin password change")?;
        users::ActiveModel {
            id: Set(user_id),
            password_hash: Set(password_hash.to_owned()),
            updated_at: Set(changed_at),
            ..Default::default()
        }
        .update(&txn)
        .await
        .context("update password hash")?;
        refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .context("drop refresh tokens")?;
        txn.commit().await.context("commit password change")?;
        Ok(())
    }

    async fn change_phone(
        &self,
        user_id: Uuid,
        new_phone: &str,
        verification_id: Uuid,
    ) -> Result<(), ApiError> {
        let txn = self.db.begin().await.context("begin phone change")?;
        let updated = users::ActiveModel {
            id: Set(user_id),
            phone_number: Set(new_phone.to_owned()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&txn)
        .await;
        match updated {
            Err(e) if is_unique_violation(&e) => return Err(ApiError::UserExists),
            other => other.context("update phone number")?,
        };
        let consumed = phone_verifications::Entity::delete_by_id(verification_id)
            .exec(&txn)
            .await
            .context("consume phone verification")?;
        if consumed.rows_affected == 0 {
            return Err(ApiError::VerificationNotFound);
        }
        txn.commit().await.context("commit phone change")?;
        Ok(())
    }

    async fn load_subject(&self, user_id: Uuid) -> Result<Option<Subject>, ApiError> {
        let exists = users::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .context("find subject user")?
            .is_some();
        if !exists {
            return Ok(None);
        }

        let roles = user_roles::Entity::find()
            .filter(user_roles::Column::UserId.eq(user_id))
            .find_also_related(roles::Entity)
            .all(&self.db)
            .await
            .context("load subject roles")?
            .into_iter()
            .filter_map(|(_, role)| role.map(role_from_model))
            .collect();
        let mentored = directions::Entity::find()
            .filter(directions::Column::MentorId.eq(user_id))
            .order_by_asc(directions::Column::Id)
            .all(&self.db)
            .await
            .context("load mentored directions")?
            .into_iter()
            .map(direction_from_model)
            .collect();

        Ok(Some(Subject {
            user_id,
            roles,
            mentored,
        }))
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, ApiError> {
        let model = profiles::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .context("find profile")?;
        Ok(model.map(profile_from_model))
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        patch: ProfilePatch,
    ) -> Result<Profile, ApiError> {
        let mut profile = self
            .find_profile(user_id)
            .await?
            .unwrap_or_else(|| Profile::empty(user_id));
        patch.apply(&mut profile);

        profiles::Entity::insert(profiles::ActiveModel {
            user_id: Set(user_id),
            first_name: Set(profile.first_name.clone()),
            last_name: Set(profile.last_name.clone()),
            email: Set(profile.email.clone()),
            contact: Set(profile.contact.clone()),
            photo_url: Set(profile.photo_url.clone()),
        })
        .on_conflict(
            OnConflict::column(profiles::Column::UserId)
                .update_columns([
                    profiles::Column::FirstName,
                    profiles::Column::LastName,
                    profiles::Column::Email,
                    profiles::Column::Contact,
                    profiles::Column::PhotoUrl,
                ])
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .context("upsert profile")?;
        Ok(profile)
    }

    async fn summaries(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut by_id: HashMap<Uuid, profiles::Model> = profiles::Entity::find()
            .filter(profiles::Column::UserId.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .context("load user summaries")?
            .into_iter()
            .map(|m| (m.user_id, m))
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(|m| UserSummary {
                id: m.user_id,
                first_name: m.first_name,
                last_name: m.last_name,
                photo_url: m.photo_url,
            })
            .collect())
    }
}

fn user_from_model(model: users::Model) -> User {
    User {
        id: model.id,
        phone_number: model.phone_number,
        password_hash: model.password_hash,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn profile_from_model(model: profiles::Model) -> Profile {
    Profile {
        user_id: model.user_id,
        first_name: model.first_name,
        last_name: model.last_name,
        email: model.email,
        contact: model.contact,
        photo_url: model.photo_url,
    }
}

// ── Direction repository ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbDirectionRepository {
    pub db: DatabaseConnection,
}

impl DirectionRepository for DbDirectionRepository {
    async fn list(&self) -> Result<Vec<Direction>, ApiError> {
        let models = directions::Entity::find()
            .order_by_asc(directions::Column::Id)
            .all(&self.db)
            .await
            .context("list directions")?;
        Ok(models.into_iter().map(direction_from_model).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Direction>, ApiError> {
        let model = directions::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find direction by id")?;
        Ok(model.map(direction_from_model))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Direction>, ApiError> {
        let model = directions::Entity::find()
            .filter(directions::Column::Name.eq(name))
            .one(&self.db)
            .await
            .context("find direction by name")?;
        Ok(model.map(direction_from_model))
    }

    async fn create(&self, direction: &NewDirection) -> Result<Direction, ApiError> {
        let inserted = directions::ActiveModel {
            name: Set(direction.name.clone()),
            description: Set(direction.description.clone()),
            mentor_id: Set(direction.mentor_id),
            ..Default::default()
        }
        .insert(&self.db)
        .await;
        match inserted {
            Err(e) if is_unique_violation(&e) => Err(ApiError::DirectionExists),
            other => Ok(direction_from_model(other.context("insert direction")?)),
        }
    }

    async fn update(&self, id: i32, patch: DirectionPatch) -> Result<Direction, ApiError> {
        let mut direction = self
            .find_by_id(id)
            .await?
            .ok_or(ApiError::NotFound("direction"))?;
        patch.apply(&mut direction);

        let updated = directions::ActiveModel {
            id: Set(id),
            name: Set(direction.name),
            description: Set(direction.description),
            mentor_id: Set(direction.mentor_id),
        }
        .update(&self.db)
        .await;
        match updated {
            Err(e) if is_unique_violation(&e) => Err(ApiError::DirectionExists),
            other => Ok(direction_from_model(other.context("update direction")?)),
        }
    }

    async fn joined_by(&self, user_id: Uuid) -> Result<Vec<Direction>, ApiError> {
        let rows = direction_users::Entity::find()
            .filter(direction_users::Column::UserId.eq(user_id))
            .order_by_asc(direction_users::Column::JoinedAt)
            .find_also_related(directions::Entity)
            .all(&self.db)
            .await
            .context("list joined directions")?;
        Ok(rows
            .into_iter()
            .filter_map(|(_, direction)| direction.map(direction_from_model))
            .collect())
    }

    async fn participant_ids(&self, direction_id: i32) -> Result<Vec<Uuid>, ApiError> {
        let rows = direction_users::Entity::find()
            .filter(direction_users::Column::DirectionId.eq(direction_id))
            .order_by_asc(direction_users::Column::JoinedAt)
            .all(&self.db)
            .await
            .context("list direction participants")?;
        Ok(rows.into_iter().map(|m| m.user_id).collect())
    }

    async fn is_member(&self, direction_id: i32, user_id: Uuid) -> Result<bool, ApiError> {
        let row = direction_users::Entity::find_by_id((direction_id, user_id))
            .one(&self.db)
            .await
            .context("check direction membership")?;
        Ok(row.is_some())
    }
}

fn direction_from_model(model: directions::Model) -> Direction {
    Direction {
        id: model.id,
        name: model.name,
        description: model.description,
        mentor_id: model.mentor_id,
    }
}

// ── Application repository ───────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbApplicationRepository {
    pub db: DatabaseConnection,
}

impl ApplicationRepository for DbApplicationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Application>, ApiError> {
        let model = applications::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find application by id")?;
        Ok(model.map(application_from_model))
    }

    async fn find_pending(
        &self,
        user_id: Uuid,
        direction_id: i32,
    ) -> Result<Option<Application>, ApiError> {
        let model = applications::Entity::find()
            .filter(applications::Column::UserId.eq(user_id))
            .filter(applications::Column::DirectionId.eq(direction_id))
            .one(&self.db)
            .await
            .context("find pending application")?;
        Ok(model.map(application_from_model))
    }

    async fn create(&self, application: &Application) -> Result<(), ApiError> {
        let inserted = applications::ActiveModel {
            id: Set(application.id),
            user_id: Set(application.user_id),
            direction_id: Set(application.direction_id),
            created_at: Set(application.created_at),
        }
        .insert(&self.db)
        .await;
        match inserted {
            Err(e) if is_unique_violation(&e) => Err(ApiError::AlreadyApplied),
            other => {
                other.context("insert application")?;
                Ok(())
            }
        }
    }

    async fn list_all(&self) -> Result<Vec<Application>, ApiError> {
        let models = applications::Entity::find()
            .order_by_asc(applications::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list applications")?;
        Ok(models.into_iter().map(application_from_model).collect())
    }

    async fn list_for_directions(
        &self,
        direction_ids: &[i32],
    ) -> Result<Vec<Application>, ApiError> {
        if direction_ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = applications::Entity::find()
            .filter(applications::Column::DirectionId.is_in(direction_ids.iter().copied()))
            .order_by_asc(applications::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list applications for directions")?;
        Ok(models.into_iter().map(application_from_model).collect())
    }

    async fn approve(&self, application: &Application, rating: &Rating) -> Result<(), ApiError> {
        let txn = self.db.begin().await.context("begin approval")?;

        let consumed = applications::Entity::delete_by_id(application.id)
            .exec(&txn)
            .await
            .context("consume application")?;
        if consumed.rows_affected == 0 {
            return Err(ApiError::NotFound("application"));
        }

        direction_users::Entity::insert(direction_users::ActiveModel {
            direction_id: Set(application.direction_id),
            user_id: Set(application.user_id),
            joined_at: Set(rating.created_at),
        })
        .on_conflict(
            OnConflict::columns([
                direction_users::Column::DirectionId,
                direction_users::Column::UserId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&txn)
        .await
        .context("add direction member")?;

        ratings::ActiveModel {
            id: Set(rating.id),
            user_id: Set(rating.user_id),
            direction_id: Set(rating.direction_id),
            value: Set(rating.value),
            created_at: Set(rating.created_at),
        }
        .insert(&txn)
        .await
        .context("open rating")?;

        txn.commit().await.context("commit approval")?;
        Ok(())
    }

    async fn decline(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = applications::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .context("decline application")?;
        Ok(result.rows_affected > 0)
    }
}

fn application_from_model(model: applications::Model) -> Application {
    Application {
        id: model.id,
        user_id: model.user_id,
        direction_id: model.direction_id,
        created_at: model.created_at,
    }
}

// ── Rating repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRatingRepository {
    pub db: DatabaseConnection,
}

impl RatingRepository for DbRatingRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Rating>, ApiError> {
        let model = ratings::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find rating by id")?;
        Ok(model.map(rating_from_model))
    }

    async fn transactions(&self, rating_id: Uuid) -> Result<Vec<RatingTransaction>, ApiError> {
        let models = rating_transactions::Entity::find()
            .filter(rating_transactions::Column::RatingId.eq(rating_id))
            .order_by_asc(rating_transactions::Column::CreatedAt)
            .order_by_asc(rating_transactions::Column::Id)
            .all(&self.db)
            .await
            .context("list rating transactions")?;
        Ok(models.into_iter().map(transaction_from_model).collect())
    }

    async fn add_delta(&self, entry: &RatingTransaction) -> Result<Rating, ApiError> {
        let txn = self.db.begin().await.context("begin rating change")?;

        rating_transactions::ActiveModel {
            id: Set(entry.id),
            rating_id: Set(entry.rating_id),
            author_id: Set(entry.author_id),
            value_change: Set(entry.value_change),
            reason: Set(entry.reason.clone()),
            created_at: Set(entry.created_at),
        }
        .insert(&txn)
        .await
        .context("append rating transaction")?;

        let result = ratings::Entity::update_many()
            .col_expr(
                ratings::Column::Value,
                Expr::col(ratings::Column::Value).add(entry.value_change),
            )
            .filter(ratings::Column::Id.eq(entry.rating_id))
            .exec(&txn)
            .await
            .context("apply rating delta")?;
        if result.rows_affected == 0 {
            return Err(ApiError::NotFound("rating"));
        }
        let model = ratings::Entity::find_by_id(entry.rating_id)
            .one(&txn)
            .await
            .context("reload rating")?
            .ok_or(ApiError::NotFound("rating"))?;

        txn.commit().await.context("commit rating change")?;
        Ok(rating_from_model(model))
    }

    async fn list_for_direction(
        &self,
        direction_id: i32,
        window: Window,
    ) -> Result<Vec<Rating>, ApiError> {
        let models = ratings::Entity::find()
            .filter(ratings::Column::DirectionId.eq(direction_id))
            .order_by_desc(ratings::Column::Value)
            .order_by_asc(ratings::Column::CreatedAt)
            .offset(window.offset)
            .limit(window.limit)
            .all(&self.db)
            .await
            .context("list direction ratings")?;
        Ok(models.into_iter().map(rating_from_model).collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Rating>, ApiError> {
        let models = ratings::Entity::find()
            .filter(ratings::Column::UserId.eq(user_id))
            .order_by_asc(ratings::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list user ratings")?;
        Ok(models.into_iter().map(rating_from_model).collect())
    }

    async fn authored_by(&self, author_id: Uuid) -> Result<Vec<RatingTransaction>, ApiError> {
        let models = rating_transactions::Entity::find()
            .filter(rating_transactions::Column::AuthorId.eq(author_id))
            .order_by_desc(rating_transactions::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list authored rating transactions")?;
        Ok(models.into_iter().map(transaction_from_model).collect())
    }
}

fn rating_from_model(model: ratings::Model) -> Rating {
    Rating {
        id: model.id,
        user_id: model.user_id,
        direction_id: model.direction_id,
        value: model.value,
        created_at: model.created_at,
    }
}

fn transaction_from_model(model: rating_transactions::Model) -> RatingTransaction {
    RatingTransaction {
        id: model.id,
        rating_id: model.rating_id,
        author_id: model.author_id,
        value_change: model.value_change,
        reason: model.reason,
        created_at: model.created_at,
    }
}

// ── Refresh token repository ─────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRefreshTokenRepository {
    pub db: DatabaseConnection,
}

/// Insert `record` and drop the user's tokens beyond the newest `MAX_REFRESH_TOKENS`.
async fn insert_capped<C: ConnectionTrait>(
    conn: &C,
    record: &RefreshTokenRecord,
) -> anyhow::Result<()> {
    refresh_tokens::ActiveModel {
        id: Set(record.id),
        user_id: Set(record.user_id),
        token: Set(record.token.clone()),
        created_at: Set(record.created_at),
    }
    .insert(conn)
    .await
    .context("insert refresh token")?;

    let overflow: Vec<Uuid> = refresh_tokens::Entity::find()
        .filter(refresh_tokens::Column::UserId.eq(record.user_id))
        .order_by_desc(refresh_tokens::Column::CreatedAt)
        .order_by_desc(refresh_tokens::Column::Id)
        .offset(MAX_REFRESH_TOKENS)
        .all(conn)
        .await
        .context("find overflowing refresh tokens")?
        .into_iter()
        .map(|m| m.id)
        .collect();
    if !overflow.is_empty() {
        refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::Id.is_in(overflow))
            .exec(conn)
            .await
            .context("drop oldest refresh tokens")?;
    }
    Ok(())
}

impl RefreshTokenRepository for DbRefreshTokenRepository {
    async fn store(&self, record: &RefreshTokenRecord) -> Result<(), ApiError> {
        let txn = self.db.begin().await.context("begin token store")?;
        insert_capped(&txn, record).await?;
        txn.commit().await.context("commit token store")?;
        Ok(())
    }

    async fn find(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, ApiError> {
        let model = refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .filter(refresh_tokens::Column::Token.eq(token))
            .one(&self.db)
            .await
            .context("find refresh token")?;
        Ok(model.map(refresh_token_from_model))
    }

    async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        refresh_tokens::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .context("delete refresh token")?;
        Ok(())
    }

    async fn rotate(&self, old_id: Uuid, next: &RefreshTokenRecord) -> Result<(), ApiError> {
        let txn = self.db.begin().await.context("begin token rotation")?;
        let removed = refresh_tokens::Entity::delete_by_id(old_id)
            .exec(&txn)
            .await
            .context("delete rotated refresh token")?;
        // Lost a race with another refresh of the same token.
        if removed.rows_affected == 0 {
            return Err(ApiError::BadRefreshToken);
        }
        insert_capped(&txn, next).await?;
        txn.commit().await.context("commit token rotation")?;
        Ok(())
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let result = refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .context("delete all refresh tokens")?;
        Ok(result.rows_affected)
    }
}

fn refresh_token_from_model(model: refresh_tokens::Model) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id: model.id,
        user_id: model.user_id,
        token: model.token,
        created_at: model.created_at,
    }
}

// ── Verification repository ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbVerificationRepository {
    pub db: DatabaseConnection,
}

impl VerificationRepository for DbVerificationRepository {
    async fn record_request(&self, request: &CodeRequest) -> Result<PhoneVerification, ApiError> {
        let txn = self.db.begin().await.context("begin code request")?;
        let now = Utc::now();

        let existing = phone_verifications::Entity::find()
            .filter(phone_verifications::Column::Purpose.eq(request.purpose.as_str()))
            .filter(phone_verifications::Column::PhoneNumber.eq(request.phone_number.as_str()))
            .lock_exclusive()
            .one(&txn)
            .await
            .context("lock phone verification")?;

        let attempts = next_attempt(
            existing.as_ref().map(|m| AttemptState {
                attempts: m.attempts,
                updated_at: m.updated_at,
            }),
            now,
        )?;

        let stored = match existing {
            Some(model) => phone_verifications::ActiveModel {
                id: Set(model.id),
                new_phone: Set(request.new_phone.clone()),
                code: Set(request.code.clone()),
                attempts: Set(attempts),
                updated_at: Set(now),
                ..Default::default()
            }
            .update(&txn)
            .await
            .context("update phone verification")?,
            None => {
                let inserted = phone_verifications::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    purpose: Set(request.purpose.as_str().to_owned()),
                    phone_number: Set(request.phone_number.clone()),
                    new_phone: Set(request.new_phone.clone()),
                    code: Set(request.code.clone()),
                    attempts: Set(attempts),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await;
                match inserted {
                    // A concurrent first request for the same phone got there first.
                    Err(e) if is_unique_violation(&e) => return Err(ApiError::SmsMinuteLimit),
                    other => other.context("insert phone verification")?,
                }
            }
        };

        txn.commit().await.context("commit code request")?;
        verification_from_model(stored)
    }

    async fn find(
        &self,
        purpose: VerificationPurpose,
        phone: &str,
    ) -> Result<Option<PhoneVerification>, ApiError> {
        let model = phone_verifications::Entity::find()
            .filter(phone_verifications::Column::Purpose.eq(purpose.as_str()))
            .filter(phone_verifications::Column::PhoneNumber.eq(phone))
            .one(&self.db)
            .await
            .context("find phone verification")?;
        model.map(verification_from_model).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        let res = phone_verifications::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .context("delete phone verification")?;
        Ok(res.rows_affected > 0)
    }
}

fn verification_from_model(
    model: phone_verifications::Model,
) -> Result<PhoneVerification, ApiError> {
    let purpose = VerificationPurpose::parse(&model.purpose)
        .with_context(|| format!("unknown verification purpose {:?}", model.purpose))?;
    Ok(PhoneVerification {
        id: model.id,
        purpose,
        phone_number: model.phone_number,
        new_phone: model.new_phone,
        code: model.code,
        attempts: model.attempts,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Achievement repository ───────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAchievementRepository {
    pub db: DatabaseConnection,
}

impl AchievementRepository for DbAchievementRepository {
    async fn list(&self) -> Result<Vec<Achievement>, ApiError> {
        let models = achievements::Entity::find()
            .order_by_asc(achievements::Column::Id)
            .all(&self.db)
            .await
            .context("list achievements")?;
        Ok(models.into_iter().map(achievement_from_model).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Achievement>, ApiError> {
        let model = achievements::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find achievement by id")?;
        Ok(model.map(achievement_from_model))
    }

    async fn give(&self, user_id: Uuid, achievement_id: i32) -> Result<(), ApiError> {
        user_achievements::Entity::insert(user_achievements::ActiveModel {
            user_id: Set(user_id),
            achievement_id: Set(achievement_id),
            granted_at: Set(Utc::now()),
        })
        .on_conflict(
            OnConflict::columns([
                user_achievements::Column::UserId,
                user_achievements::Column::AchievementId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .context("give achievement")?;
        Ok(())
    }

    async fn of_user(&self, user_id: Uuid) -> Result<Vec<UserAchievement>, ApiError> {
        let rows = user_achievements::Entity::find()
            .filter(user_achievements::Column::UserId.eq(user_id))
            .order_by_asc(user_achievements::Column::GrantedAt)
            .find_also_related(achievements::Entity)
            .all(&self.db)
            .await
            .context("list user achievements")?;
        Ok(rows
            .into_iter()
            .filter_map(|(grant, achievement)| {
                achievement.map(|a| UserAchievement {
                    achievement: achievement_from_model(a),
                    granted_at: grant.granted_at,
                })
            })
            .collect())
    }
}

fn achievement_from_model(model: achievements::Model) -> Achievement {
    Achievement {
        id: model.id,
        name: model.name,
        description: model.description,
    }
}
