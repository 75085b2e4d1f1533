use serde_json::json;
use uuid::Uuid;

use cohort_api::domain::authz::MentorAdminRule;
use cohort_api::error::ApiError;
use cohort_api::usecase::rating::{AddRatingDeltaInput, AddRatingDeltaUseCase, GetRatingUseCase};
use cohort_domain::role::RoleName;

use crate::helpers::{MemDirections, MemRatings, MemRoles, MemUsers, World};

fn adder(world: &World) -> AddRatingDeltaUseCase<MemUsers, MemRoles, MemDirections, MemRatings> {
    AddRatingDeltaUseCase {
        users: world.users(),
        policy: world.policy(MentorAdminRule::Either),
        directions: world.directions(),
        ratings: world.ratings(),
    }
}

fn reader(world: &World) -> GetRatingUseCase<MemUsers, MemRoles, MemDirections, MemRatings> {
    GetRatingUseCase {
        users: world.users(),
        policy: world.policy(MentorAdminRule::Either),
        directions: world.directions(),
        ratings: world.ratings(),
    }
}

fn delta(value_change: serde_json::Value, reason: &str) -> AddRatingDeltaInput {
    AddRatingDeltaInput {
        value_change,
        reason: Some(reason.to_owned()),
    }
}

struct Fixture {
    world: World,
    mentor: Uuid,
    student: Uuid,
    rating_id: Uuid,
}

fn fixture(start: i32) -> Fixture {
    let world = World::new();
    let mentor = world.add_user("+79990000001", &[RoleName::User, RoleName::Mentor]);
    let student = world.add_user("+79990000002", &[RoleName::User]);
    let direction = world.add_direction("backend", mentor);
    let rating_id = world.add_rating(student, direction.id, start).id;
    Fixture {
        world,
        mentor,
        student,
        rating_id,
    }
}

#[tokio::test]
async fn should_record_late_penalty_from_direction_mentor() {
    let f = fixture(10);

    let (rating, entry) = adder(&f.world)
        .execute(f.mentor, f.rating_id, delta(json!(-5), "late"))
        .await
        .unwrap();

    assert_eq!(rating.value, 5);
    assert_eq!(entry.author_id, f.mentor);
    assert_eq!(entry.value_change, -5);
    assert_eq!(entry.reason, "late");
    let t = f.world.lock();
    assert_eq!(t.transactions, vec![entry]);
    assert_eq!(t.ratings[0].value, 5);
}

#[tokio::test]
async fn should_append_exactly_one_transaction_per_delta() {
    let f = fixture(0);
    let usecase = adder(&f.world);

    let mut expected = 0;
    for (i, d) in [3, -1, 7, 0, -12].into_iter().enumerate() {
        let before = f.world.lock().transactions.len();
        let (rating, _) = usecase
            .execute(f.mentor, f.rating_id, delta(json!(d), "weekly review"))
            .await
            .unwrap();
        expected += d;
        assert_eq!(rating.value, expected);
        let t = f.world.lock();
        assert_eq!(t.transactions.len(), before + 1);
        assert_eq!(t.transactions[i].value_change, d);
    }
}

#[tokio::test]
async fn should_accept_numeric_string_delta() {
    let f = fixture(0);
    let (rating, _) = adder(&f.world)
        .execute(f.mentor, f.rating_id, delta(json!("4"), "helped a peer"))
        .await
        .unwrap();
    assert_eq!(rating.value, 4);
}

#[tokio::test]
async fn should_refuse_delta_from_other_user() {
    let f = fixture(10);
    let stranger = f.world.add_user("+79990000003", &[RoleName::Mentor]);

    for caller in [stranger, f.student] {
        let err = adder(&f.world)
            .execute(caller, f.rating_id, delta(json!(100), "bribe"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized), "got {err:?}");
    }
    let t = f.world.lock();
    assert!(t.transactions.is_empty());
    assert_eq!(t.ratings[0].value, 10);
}

#[tokio::test]
async fn should_reject_bad_delta_input() {
    let f = fixture(0);
    let usecase = adder(&f.world);

    let err = usecase
        .execute(f.mentor, f.rating_id, delta(json!("five"), "late"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), 119);

    let err = usecase
        .execute(f.mentor, f.rating_id, delta(json!(-5), "   "))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MissingField("reason")));

    let err = usecase
        .execute(
            f.mentor,
            f.rating_id,
            AddRatingDeltaInput {
                value_change: json!(-5),
                reason: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), 120);
    assert!(f.world.lock().transactions.is_empty());
}

#[tokio::test]
async fn should_report_unknown_rating() {
    let f = fixture(0);
    let err = adder(&f.world)
        .execute(f.mentor, Uuid::now_v7(), delta(json!(1), "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound("rating")));
}

#[tokio::test]
async fn should_show_history_to_owner_and_mentors_only() {
    let f = fixture(0);
    adder(&f.world)
        .execute(f.mentor, f.rating_id, delta(json!(2), "demo day"))
        .await
        .unwrap();
    let peer = f.world.add_user("+79990000003", &[RoleName::User]);
    let usecase = reader(&f.world);

    for caller in [f.student, f.mentor] {
        let view = usecase.execute(caller, f.rating_id).await.unwrap();
        assert_eq!(view.rating.value, 2);
        assert_eq!(view.transactions.map(|ts| ts.len()), Some(1));
    }

    let view = usecase.execute(peer, f.rating_id).await.unwrap();
    assert_eq!(view.rating.value, 2);
    assert!(view.transactions.is_none());
}
