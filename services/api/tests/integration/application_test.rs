use cohort_api::domain::authz::MentorAdminRule;
use cohort_api::error::ApiError;
use cohort_api::usecase::application::{
    ApplyUseCase, ListApplicationsUseCase, Resolution, ResolveApplicationUseCase,
};
use cohort_domain::role::RoleName;
use uuid::Uuid;

use crate::helpers::{MemApplications, MemDirections, MemRoles, MemUsers, World};

type Resolve = ResolveApplicationUseCase<MemUsers, MemRoles, MemDirections, MemApplications>;

fn resolver(world: &World, rule: MentorAdminRule) -> Resolve {
    ResolveApplicationUseCase {
        users: world.users(),
        policy: world.policy(rule),
        directions: world.directions(),
        applications: world.applications(),
    }
}

fn applier(world: &World) -> ApplyUseCase<MemUsers, MemRoles, MemDirections, MemApplications> {
    ApplyUseCase {
        users: world.users(),
        policy: world.policy(MentorAdminRule::Either),
        directions: world.directions(),
        applications: world.applications(),
    }
}

struct Fixture {
    world: World,
    mentor: Uuid,
    student: Uuid,
    direction_id: i32,
}

fn fixture() -> Fixture {
    let world = World::new();
    let mentor = world.add_user("+79990000001", &[RoleName::User, RoleName::Mentor]);
    let student = world.add_user("+79990000002", &[RoleName::User]);
    let direction_id = world.add_direction("backend", mentor).id;
    Fixture {
        world,
        mentor,
        student,
        direction_id,
    }
}

// ── Apply ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_pending_application() {
    let f = fixture();
    let application = applier(&f.world)
        .execute(f.student, f.direction_id)
        .await
        .unwrap();

    assert_eq!(application.user_id, f.student);
    assert_eq!(application.direction_id, f.direction_id);
    assert_eq!(f.world.lock().applications, vec![application]);
}

#[tokio::test]
async fn should_reject_second_apply_without_new_row() {
    let f = fixture();
    let usecase = applier(&f.world);
    usecase.execute(f.student, f.direction_id).await.unwrap();

    let err = usecase.execute(f.student, f.direction_id).await.unwrap_err();
    assert!(matches!(err, ApiError::AlreadyApplied), "got {err:?}");
    assert_eq!(err.code(), 117);
    assert_eq!(f.world.lock().applications.len(), 1);
}

#[tokio::test]
async fn should_reject_apply_from_member() {
    let f = fixture();
    f.world.add_rating(f.student, f.direction_id, 0);

    let err = applier(&f.world)
        .execute(f.student, f.direction_id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), 116);
    assert!(f.world.lock().applications.is_empty());
}

#[tokio::test]
async fn should_reject_apply_to_unknown_direction() {
    let f = fixture();
    let err = applier(&f.world).execute(f.student, 999).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound("direction")));
}

#[tokio::test]
async fn should_require_user_role_to_apply() {
    let f = fixture();
    let outsider = f.world.add_user("+79990000003", &[]);
    let err = applier(&f.world)
        .execute(outsider, f.direction_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}

// ── Approve / Decline ────────────────────────────────────────────────────────

#[tokio::test]
async fn should_turn_approved_application_into_membership_and_zero_rating() {
    let f = fixture();
    let application = f.world.add_application(f.student, f.direction_id);

    let rating = resolver(&f.world, MentorAdminRule::Either)
        .execute(f.mentor, application.id, Resolution::Approve)
        .await
        .unwrap()
        .expect("approval opens a rating");

    let t = f.world.lock();
    assert!(t.applications.is_empty());
    let memberships = t
        .members
        .iter()
        .filter(|m| **m == (f.direction_id, f.student))
        .count();
    assert_eq!(memberships, 1);
    let ratings: Vec<_> = t
        .ratings
        .iter()
        .filter(|r| r.user_id == f.student && r.direction_id == f.direction_id)
        .collect();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0].value, 0);
    assert_eq!(ratings[0].id, rating.id);
}

#[tokio::test]
async fn should_leave_no_trace_on_decline() {
    let f = fixture();
    let application = f.world.add_application(f.student, f.direction_id);

    let rating = resolver(&f.world, MentorAdminRule::Either)
        .execute(f.mentor, application.id, Resolution::Decline)
        .await
        .unwrap();

    assert!(rating.is_none());
    let t = f.world.lock();
    assert!(t.applications.is_empty());
    assert!(t.members.is_empty());
    assert!(t.ratings.is_empty());
}

#[tokio::test]
async fn should_consume_application_exactly_once() {
    let f = fixture();
    let application = f.world.add_application(f.student, f.direction_id);
    let usecase = resolver(&f.world, MentorAdminRule::Either);

    usecase
        .execute(f.mentor, application.id, Resolution::Approve)
        .await
        .unwrap();
    let err = usecase
        .execute(f.mentor, application.id, Resolution::Decline)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::NotFound("application")));
    assert_eq!(f.world.lock().ratings.len(), 1);
}

#[tokio::test]
async fn should_refuse_approve_by_non_mentor_without_state_change() {
    let f = fixture();
    let other_mentor = f.world.add_user("+79990000004", &[RoleName::Mentor]);
    f.world.add_direction("frontend", other_mentor);
    let application = f.world.add_application(f.student, f.direction_id);

    let err = resolver(&f.world, MentorAdminRule::Either)
        .execute(other_mentor, application.id, Resolution::Approve)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized), "got {err:?}");
    assert_eq!(err.code(), 401);
    let t = f.world.lock();
    assert_eq!(t.applications, vec![application]);
    assert!(t.members.is_empty());
    assert!(t.ratings.is_empty());
}

#[tokio::test]
async fn should_let_admin_approve_under_either_rule() {
    let f = fixture();
    let admin = f.world.add_user("+79990000005", &[RoleName::Admin]);
    let application = f.world.add_application(f.student, f.direction_id);

    let rating = resolver(&f.world, MentorAdminRule::Either)
        .execute(admin, application.id, Resolution::Approve)
        .await
        .unwrap();
    assert!(rating.is_some());
}

#[tokio::test]
async fn should_require_mentor_and_admin_under_both_rule() {
    let f = fixture();
    let admin = f.world.add_user("+79990000005", &[RoleName::Admin]);
    let application = f.world.add_application(f.student, f.direction_id);
    let usecase = resolver(&f.world, MentorAdminRule::Both);

    for caller in [admin, f.mentor] {
        let err = usecase
            .execute(caller, application.id, Resolution::Decline)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    // Promote the direction mentor to admin.
    f.world.lock().user_roles.push((f.mentor, 3));
    usecase
        .execute(f.mentor, application.id, Resolution::Decline)
        .await
        .unwrap();
    assert!(f.world.lock().applications.is_empty());
}

// ── List ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_scope_application_list_by_role() {
    let f = fixture();
    let other_mentor = f.world.add_user("+79990000004", &[RoleName::Mentor]);
    let other_direction = f.world.add_direction("frontend", other_mentor).id;
    let admin = f.world.add_user("+79990000005", &[RoleName::Admin]);
    let mine = f.world.add_application(f.student, f.direction_id);
    f.world.add_application(f.student, other_direction);

    let usecase = ListApplicationsUseCase {
        users: f.world.users(),
        policy: f.world.policy(MentorAdminRule::Either),
        applications: f.world.applications(),
    };

    assert_eq!(usecase.execute(f.mentor).await.unwrap(), vec![mine]);
    assert_eq!(usecase.execute(admin).await.unwrap().len(), 2);
    let err = usecase.execute(f.student).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}
