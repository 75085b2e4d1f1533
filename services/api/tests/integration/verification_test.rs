use cohort_api::domain::rate_limit::{DAILY_WINDOW_SECS, MINUTE_WINDOW_SECS};
use cohort_api::domain::repository::VerificationRepository;
use cohort_api::domain::types::{
    CodeRequest, PhoneVerification, RefreshTokenRecord, VerificationPurpose,
};
use cohort_api::error::ApiError;
use cohort_api::usecase::verification::{
    ConfirmPasswordResetCodeUseCase, ConfirmPhoneChangeUseCase, ConfirmRegistrationCodeUseCase,
    RequestPasswordResetUseCase, RequestPhoneChangeUseCase, RequestRegistrationCodeUseCase,
    SetNewPasswordInput, SetNewPasswordUseCase,
};
use cohort_auth_types::token::{self, TokenKind};
use cohort_domain::role::RoleName;
use uuid::Uuid;

use crate::helpers::{
    MemSms, MemUsers, MemVerifications, PlainHasher, TEST_JWT_SECRET, World,
};

const PHONE: &str = "+71234567890";

/// Verification store where another confirm of the same code wins the race: every
/// record handed out by `find` is already gone by the time the caller deletes it.
struct ConsumedElsewhere(World);

impl VerificationRepository for ConsumedElsewhere {
    async fn record_request(&self, request: &CodeRequest) -> Result<PhoneVerification, ApiError> {
        self.0.verifications().record_request(request).await
    }

    async fn find(
        &self,
        purpose: VerificationPurpose,
        phone: &str,
    ) -> Result<Option<PhoneVerification>, ApiError> {
        let found = self.0.verifications().find(purpose, phone).await?;
        if let Some(record) = &found {
            self.0.verifications().delete(record.id).await?;
        }
        Ok(found)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        self.0.verifications().delete(id).await
    }
}

fn requester(world: &World) -> RequestRegistrationCodeUseCase<MemUsers, MemVerifications, MemSms> {
    RequestRegistrationCodeUseCase {
        users: world.users(),
        verifications: world.verifications(),
        sms: world.sms(),
    }
}

fn confirmer(world: &World) -> ConfirmRegistrationCodeUseCase<MemVerifications> {
    ConfirmRegistrationCodeUseCase {
        verifications: world.verifications(),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    }
}

fn attempts(world: &World) -> i32 {
    world
        .lock()
        .verifications
        .iter()
        .find(|v| v.purpose == VerificationPurpose::Registration && v.phone_number == PHONE)
        .map(|v| v.attempts)
        .unwrap()
}

// ── Rate limits ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_cap_code_requests_per_day_and_reset_after_window() {
    let world = World::new();
    let usecase = requester(&world);

    usecase.execute(PHONE).await.unwrap();
    assert_eq!(attempts(&world), 1);

    world.advance(MINUTE_WINDOW_SECS + 1);
    usecase.execute(PHONE).await.unwrap();
    assert_eq!(attempts(&world), 2);

    world.advance(MINUTE_WINDOW_SECS + 1);
    let err = usecase.execute(PHONE).await.unwrap_err();
    assert!(matches!(err, ApiError::SmsDailyLimit), "got {err:?}");
    assert_eq!(err.code(), 112);
    assert_eq!(attempts(&world), 2);

    world.advance(DAILY_WINDOW_SECS);
    usecase.execute(PHONE).await.unwrap();
    assert_eq!(attempts(&world), 1);
    assert_eq!(world.lock().sent_sms.len(), 3);
}

#[tokio::test]
async fn should_refuse_second_request_within_a_minute() {
    let world = World::new();
    let usecase = requester(&world);

    usecase.execute(PHONE).await.unwrap();
    world.advance(MINUTE_WINDOW_SECS - 1);
    let err = usecase.execute(PHONE).await.unwrap_err();

    assert_eq!(err.code(), 113);
    assert_eq!(world.lock().sent_sms.len(), 1);
}

#[tokio::test]
async fn should_reject_code_request_for_bad_or_taken_phone() {
    let world = World::new();
    world.add_user(PHONE, &[RoleName::User]);
    let usecase = requester(&world);

    assert_eq!(usecase.execute("12345").await.unwrap_err().code(), 109);
    assert!(matches!(
        usecase.execute(PHONE).await.unwrap_err(),
        ApiError::UserExists
    ));
    assert!(world.lock().sent_sms.is_empty());
}

// ── Code confirmation ────────────────────────────────────────────────────────

#[tokio::test]
async fn should_confirm_code_once() {
    let world = World::new();
    requester(&world).execute(PHONE).await.unwrap();
    let code = world.last_code(PHONE);
    let usecase = confirmer(&world);

    let phone_token = usecase.execute(PHONE, &code).await.unwrap();
    let claims = token::validate(&phone_token, TEST_JWT_SECRET, TokenKind::Phone).unwrap();
    assert_eq!(claims.phone.as_deref(), Some(PHONE));

    let err = usecase.execute(PHONE, &code).await.unwrap_err();
    assert!(matches!(err, ApiError::VerificationNotFound), "got {err:?}");
    assert_eq!(err.code(), 111);
}

#[tokio::test]
async fn should_reject_wrong_and_malformed_codes() {
    let world = World::new();
    requester(&world).execute(PHONE).await.unwrap();
    let code = world.last_code(PHONE);
    let wrong = if code == "11111" { "22222" } else { "11111" };
    let usecase = confirmer(&world);

    assert_eq!(usecase.execute(PHONE, "12ab5").await.unwrap_err().code(), 108);
    assert_eq!(usecase.execute(PHONE, wrong).await.unwrap_err().code(), 110);
    // A miss leaves the record in place.
    assert!(usecase.execute(PHONE, &code).await.is_ok());
}

#[tokio::test]
async fn should_refuse_code_consumed_by_concurrent_confirm() {
    let world = World::new();
    requester(&world).execute(PHONE).await.unwrap();
    let code = world.last_code(PHONE);

    let err = ConfirmRegistrationCodeUseCase {
        verifications: ConsumedElsewhere(world.clone()),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    }
    .execute(PHONE, &code)
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::VerificationNotFound), "got {err:?}");
    assert_eq!(err.code(), 111);
}

// ── Password reset ───────────────────────────────────────────────────────────

#[tokio::test]
async fn should_reset_password_and_drop_sessions() {
    let world = World::new();
    let user_id = world.add_user(PHONE, &[RoleName::User]);
    world.lock().refresh_tokens.push(RefreshTokenRecord {
        id: Uuid::now_v7(),
        user_id,
        token: "old-refresh".to_owned(),
        created_at: world.now(),
    });

    RequestPasswordResetUseCase {
        users: world.users(),
        verifications: world.verifications(),
        sms: world.sms(),
    }
    .execute(PHONE)
    .await
    .unwrap();
    let code = world.last_code(PHONE);

    let reset_token = ConfirmPasswordResetCodeUseCase {
        users: world.users(),
        verifications: world.verifications(),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    }
    .execute(PHONE, &code)
    .await
    .unwrap();

    SetNewPasswordUseCase {
        users: world.users(),
        hasher: PlainHasher,
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    }
    .execute(SetNewPasswordInput {
        reset_token,
        password: "brand-new-pass".to_owned(),
    })
    .await
    .unwrap();

    let t = world.lock();
    assert_eq!(t.users[0].password_hash, PlainHasher::digest("brand-new-pass"));
    assert!(t.refresh_tokens.is_empty());
    assert!(t.verifications.is_empty());
}

#[tokio::test]
async fn should_spend_reset_token_on_first_use() {
    let world = World::new();
    world.add_user(PHONE, &[RoleName::User]);
    RequestPasswordResetUseCase {
        users: world.users(),
        verifications: world.verifications(),
        sms: world.sms(),
    }
    .execute(PHONE)
    .await
    .unwrap();
    let reset_token = ConfirmPasswordResetCodeUseCase {
        users: world.users(),
        verifications: world.verifications(),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    }
    .execute(PHONE, &world.last_code(PHONE))
    .await
    .unwrap();
    let usecase = SetNewPasswordUseCase {
        users: world.users(),
        hasher: PlainHasher,
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    };
    let set = |password: &str| SetNewPasswordInput {
        reset_token: reset_token.clone(),
        password: password.to_owned(),
    };

    usecase.execute(set("first-choice")).await.unwrap();
    let err = usecase.execute(set("second-choice")).await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized), "got {err:?}");
    assert_eq!(
        world.lock().users[0].password_hash,
        PlainHasher::digest("first-choice")
    );
}

#[tokio::test]
async fn should_refuse_reset_code_consumed_by_concurrent_confirm() {
    let world = World::new();
    world.add_user(PHONE, &[RoleName::User]);
    RequestPasswordResetUseCase {
        users: world.users(),
        verifications: world.verifications(),
        sms: world.sms(),
    }
    .execute(PHONE)
    .await
    .unwrap();

    let err = ConfirmPasswordResetCodeUseCase {
        users: world.users(),
        verifications: ConsumedElsewhere(world.clone()),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    }
    .execute(PHONE, &world.last_code(PHONE))
    .await
    .unwrap_err();

    assert_eq!(err.code(), 111);
}

#[tokio::test]
async fn should_refuse_reset_for_unknown_phone() {
    let world = World::new();
    let err = RequestPasswordResetUseCase {
        users: world.users(),
        verifications: world.verifications(),
        sms: world.sms(),
    }
    .execute(PHONE)
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::NotFound("user")));
}

// ── Phone change ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_move_user_to_confirmed_number() {
    let world = World::new();
    let user_id = world.add_user(PHONE, &[RoleName::User]);
    let new_phone = "+79995550000";

    RequestPhoneChangeUseCase {
        users: world.users(),
        verifications: world.verifications(),
        sms: world.sms(),
    }
    .execute(user_id, new_phone)
    .await
    .unwrap();
    // The code goes to the new number; the record is keyed on the current one.
    let code = world.last_code(new_phone);

    let changed = ConfirmPhoneChangeUseCase {
        users: world.users(),
        verifications: world.verifications(),
    }
    .execute(user_id, &code)
    .await
    .unwrap();

    assert_eq!(changed, new_phone);
    let t = world.lock();
    assert_eq!(t.users[0].phone_number, new_phone);
    assert!(t.verifications.is_empty());
}

#[tokio::test]
async fn should_refuse_change_to_taken_number() {
    let world = World::new();
    let user_id = world.add_user(PHONE, &[RoleName::User]);
    world.add_user("+79995550000", &[RoleName::User]);

    let err = RequestPhoneChangeUseCase {
        users: world.users(),
        verifications: world.verifications(),
        sms: world.sms(),
    }
    .execute(user_id, "+79995550000")
    .await
    .unwrap_err();
    assert_eq!(err.code(), 105);
}

#[tokio::test]
async fn should_keep_number_when_change_code_consumed_concurrently() {
    let world = World::new();
    let user_id = world.add_user(PHONE, &[RoleName::User]);
    let new_phone = "+79995550000";
    RequestPhoneChangeUseCase {
        users: world.users(),
        verifications: world.verifications(),
        sms: world.sms(),
    }
    .execute(user_id, new_phone)
    .await
    .unwrap();

    let err = ConfirmPhoneChangeUseCase {
        users: world.users(),
        verifications: ConsumedElsewhere(world.clone()),
    }
    .execute(user_id, &world.last_code(new_phone))
    .await
    .unwrap_err();

    assert_eq!(err.code(), 111);
    assert_eq!(world.lock().users[0].phone_number, PHONE);
}
