use uuid::Uuid;

use crate::domain::authz::{AccessPolicy, Action, Resource};
use crate::domain::repository::{AchievementRepository, RoleRepository, UserRepository};
use crate::domain::types::Achievement;
use crate::error::{ApiError, Operation};
use crate::usecase::subject_of;

pub struct ListAchievementsUseCase<Ac: AchievementRepository> {
    pub achievements: Ac,
}

impl<Ac: AchievementRepository> ListAchievementsUseCase<Ac> {
    pub async fn execute(&self) -> Result<Vec<Achievement>, ApiError> {
        self.achievements.list().await
    }
}

pub struct GetAchievementUseCase<Ac: AchievementRepository> {
    pub achievements: Ac,
}

impl<Ac: AchievementRepository> GetAchievementUseCase<Ac> {
    pub async fn execute(&self, id: i32) -> Result<Achievement, ApiError> {
        self.achievements
            .find_by_id(id)
            .await?
            .ok_or(ApiError::NotFound("achievement"))
    }
}

pub struct GiveAchievementUseCase<U, R, Ac>
where
    U: UserRepository,
    R: RoleRepository,
    Ac: AchievementRepository,
{
    pub users: U,
    pub policy: AccessPolicy<R>,
    pub achievements: Ac,
}

impl<U, R, Ac> GiveAchievementUseCase<U, R, Ac>
where
    U: UserRepository,
    R: RoleRepository,
    Ac: AchievementRepository,
{
    /// Grant `achievement_id` to `recipient`. Granting a held achievement succeeds unchanged.
    pub async fn execute(
        &self,
        caller: Uuid,
        achievement_id: i32,
        recipient: Uuid,
    ) -> Result<Achievement, ApiError> {
        let subject = subject_of(&self.users, caller).await?;
        self.policy
            .ensure(&subject, Resource::User(recipient), Action::GrantAchievement)
            .await?;

        let achievement = self
            .achievements
            .find_by_id(achievement_id)
            .await?
            .ok_or(ApiError::NotFound("achievement"))?;
        self.users
            .find_by_id(recipient)
            .await?
            .ok_or(ApiError::NotFound("user"))?;

        self.achievements
            .give(recipient, achievement.id)
            .await
            .map_err(|e| e.during(Operation::AchievementGive))?;
        tracing::info!(
            achievement_id,
            user_id = %recipient,
            granted_by = %caller,
            "achievement granted"
        );
        Ok(achievement)
    }
}
