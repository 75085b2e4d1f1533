use sea_orm::DatabaseConnection;

use crate::domain::authz::{AccessPolicy, MentorAdminRule};
use crate::infra::db::{
    DbAchievementRepository, DbApplicationRepository, DbDirectionRepository, DbRatingRepository,
    DbRefreshTokenRepository, DbRoleRepository, DbUserRepository, DbVerificationRepository,
};
use crate::infra::hasher::Argon2Hasher;
use crate::infra::sms::HttpSmsGateway;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt_secret: String,
    pub sms: HttpSmsGateway,
    pub hasher: Argon2Hasher,
    pub rule: MentorAdminRule,
}

impl AppState {
    pub fn role_repo(&self) -> DbRoleRepository {
        DbRoleRepository {
            db: self.db.clone(),
        }
    }

    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn direction_repo(&self) -> DbDirectionRepository {
        DbDirectionRepository {
            db: self.db.clone(),
        }
    }

    pub fn application_repo(&self) -> DbApplicationRepository {
        DbApplicationRepository {
            db: self.db.clone(),
        }
    }

    pub fn rating_repo(&self) -> DbRatingRepository {
        DbRatingRepository {
            db: self.db.clone(),
        }
    }

    pub fn refresh_token_repo(&self) -> DbRefreshTokenRepository {
        DbRefreshTokenRepository {
            db: self.db.clone(),
        }
    }

    pub fn verification_repo(&self) -> DbVerificationRepository {
        DbVerificationRepository {
            db: self.db.clone(),
        }
    }

    pub fn achievement_repo(&self) -> DbAchievementRepository {
        DbAchievementRepository {
            db: self.db.clone(),
        }
    }

    pub fn policy(&self) -> AccessPolicy<DbRoleRepository> {
        AccessPolicy::new(self.role_repo(), self.rule)
    }
}
