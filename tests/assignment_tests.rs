//! 角色分配生命周期集成测试

use access_admin::{
    error::{AppError, ConflictReason, NotFound},
    middleware::AppState,
    models::{
        environment_permission::{CreateEnvironmentPermissionRequest, PermittedAction},
        role::CreateRoleRequest,
        role_assignment::{
            AssignmentState, CreateRoleAssignmentRequest, UpdateRoleAssignmentRequest,
        },
        user::UserRole,
        EnvironmentPermission, Role,
    },
};
use chrono::{TimeZone, Utc};
use uuid::Uuid;

mod common;
use common::{create_test_app_state, create_test_user};

async fn reviewer_role(state: &AppState) -> Role {
    state
        .role_service
        .create(CreateRoleRequest {
            name: "Reviewer".to_string(),
            description: "Reviews merge requests".to_string(),
            access_areas: vec!["code".to_string()],
            active: None,
        })
        .await
        .unwrap()
}

async fn dev_permission(state: &AppState) -> EnvironmentPermission {
    state
        .environment_permission_service
        .create(CreateEnvironmentPermissionRequest {
            name: "@DEV".to_string(),
            permitted_actions: vec![PermittedAction::Read, PermittedAction::Write],
            profile: "development".to_string(),
            purpose: "Day to day development access".to_string(),
        })
        .await
        .unwrap()
}

fn request(
    user_id: Uuid,
    granted_by: Uuid,
    roles: Vec<Uuid>,
    environments: Vec<Uuid>,
    start: &str,
    end: Option<&str>,
) -> CreateRoleAssignmentRequest {
    CreateRoleAssignmentRequest {
        user_id,
        roles,
        access_environments: environments,
        start_date: start.to_string(),
        end_date: end.map(str::to_string),
        state: None,
        notes: None,
        granted_by,
    }
}

#[tokio::test]
async fn test_assignment_active_only_inside_window() {
    let state = create_test_app_state();
    let user = create_test_user(&state, "u1@example.com", UserRole::User).await;
    let admin = create_test_user(&state, "a1@example.com", UserRole::Admin).await;
    let role = reviewer_role(&state).await;
    let permission = dev_permission(&state).await;

    let assignment = state
        .role_assignment_service
        .create(request(
            user.id,
            admin.id,
            vec![role.id],
            vec![permission.id],
            "2025-01-01",
            Some("2025-12-31"),
        ))
        .await
        .unwrap();

    assert_eq!(assignment.state, AssignmentState::Active);
    assert_eq!(assignment.roles, vec![role.id]);
    assert_eq!(assignment.access_environments, vec![permission.id]);

    let service = &state.role_assignment_service;
    let at = |y, m, d| Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap();

    let mid = service.find_active_by_user_id_at(user.id, at(2025, 6, 1)).await.unwrap();
    assert_eq!(mid.len(), 1);
    assert_eq!(mid[0].id, assignment.id);

    // 边界包含
    let first = service.find_active_by_user_id_at(user.id, at(2025, 1, 1)).await.unwrap();
    assert_eq!(first.len(), 1);
    let last = service.find_active_by_user_id_at(user.id, at(2025, 12, 31)).await.unwrap();
    assert_eq!(last.len(), 1);

    let before = service.find_active_by_user_id_at(user.id, at(2024, 12, 31)).await.unwrap();
    assert!(before.is_empty());
    let after = service.find_active_by_user_id_at(user.id, at(2026, 1, 1)).await.unwrap();
    assert!(after.is_empty());
}

#[tokio::test]
async fn test_inactive_or_deleted_assignment_not_active() {
    let state = create_test_app_state();
    let user = create_test_user(&state, "u1@example.com", UserRole::User).await;
    let admin = create_test_user(&state, "a1@example.com", UserRole::Admin).await;
    let role = reviewer_role(&state).await;
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

    let mut suspended = request(user.id, admin.id, vec![role.id], vec![], "2025-01-01", None);
    suspended.state = Some(AssignmentState::Suspended);
    state.role_assignment_service.create(suspended).await.unwrap();

    let open_ended = state
        .role_assignment_service
        .create(request(user.id, admin.id, vec![role.id], vec![], "2025-01-01", None))
        .await
        .unwrap();

    let active = state
        .role_assignment_service
        .find_active_by_user_id_at(user.id, now)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, open_ended.id);

    state.role_assignment_service.soft_delete(open_ended.id).await.unwrap();
    let active = state
        .role_assignment_service
        .find_active_by_user_id_at(user.id, now)
        .await
        .unwrap();
    assert!(active.is_empty());
}

#[tokio::test]
async fn test_create_reports_all_missing_references() {
    let state = create_test_app_state();
    let user = create_test_user(&state, "u1@example.com", UserRole::User).await;
    let admin = create_test_user(&state, "a1@example.com", UserRole::Admin).await;
    let role = reviewer_role(&state).await;
    let missing_role = Uuid::new_v4();
    let missing_env = Uuid::new_v4();

    let err = state
        .role_assignment_service
        .create(request(
            user.id,
            admin.id,
            vec![role.id, missing_role],
            vec![missing_env],
            "2025-01-01",
            None,
        ))
        .await
        .unwrap_err();

    match err {
        AppError::NotFound(NotFound::References {
            role_ids,
            environment_ids,
        }) => {
            assert_eq!(role_ids, vec![missing_role]);
            assert_eq!(environment_ids, vec![missing_env]);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let all = state.role_assignment_service.find_all(true).await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn test_create_checks_user_then_grantor() {
    let state = create_test_app_state();
    let admin = create_test_user(&state, "a1@example.com", UserRole::Admin).await;
    let role = reviewer_role(&state).await;

    let err = state
        .role_assignment_service
        .create(request(Uuid::new_v4(), Uuid::new_v4(), vec![role.id], vec![], "2025-01-01", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(NotFound::User)));

    let err = state
        .role_assignment_service
        .create(request(admin.id, Uuid::new_v4(), vec![role.id], vec![], "2025-01-01", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(NotFound::Grantor)));
}

#[tokio::test]
async fn test_soft_deleted_role_counts_as_missing() {
    let state = create_test_app_state();
    let user = create_test_user(&state, "u1@example.com", UserRole::User).await;
    let admin = create_test_user(&state, "a1@example.com", UserRole::Admin).await;
    let role = reviewer_role(&state).await;
    state.role_service.soft_delete(role.id).await.unwrap();

    let err = state
        .role_assignment_service
        .create(request(user.id, admin.id, vec![role.id], vec![], "2025-01-01", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(NotFound::References { .. })));
}

#[tokio::test]
async fn test_end_date_must_follow_start_date() {
    let state = create_test_app_state();
    let user = create_test_user(&state, "u1@example.com", UserRole::User).await;
    let admin = create_test_user(&state, "a1@example.com", UserRole::Admin).await;
    let role = reviewer_role(&state).await;

    for end in ["2025-01-01", "2024-06-01"] {
        let err = state
            .role_assignment_service
            .create(request(user.id, admin.id, vec![role.id], vec![], "2025-01-01", Some(end)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidDateRange), "end {}", end);
    }

    let err = state
        .role_assignment_service
        .create(request(user.id, admin.id, vec![role.id], vec![], "not-a-date", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_update_merges_dates_before_checking_window() {
    let state = create_test_app_state();
    let user = create_test_user(&state, "u1@example.com", UserRole::User).await;
    let admin = create_test_user(&state, "a1@example.com", UserRole::Admin).await;
    let role = reviewer_role(&state).await;

    let assignment = state
        .role_assignment_service
        .create(request(
            user.id,
            admin.id,
            vec![role.id],
            vec![],
            "2025-01-01",
            Some("2025-12-31"),
        ))
        .await
        .unwrap();

    // 新开始日期晚于已存的结束日期
    let err = state
        .role_assignment_service
        .update(
            assignment.id,
            UpdateRoleAssignmentRequest {
                start_date: Some("2026-01-01".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidDateRange));

    // 只改结束日期，落在已存的开始日期之前或当天
    for end in ["2025-01-01", "2024-12-01"] {
        let err = state
            .role_assignment_service
            .update(
                assignment.id,
                UpdateRoleAssignmentRequest {
                    end_date: Some(end.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidDateRange), "end {}", end);
    }

    let updated = state
        .role_assignment_service
        .update(
            assignment.id,
            UpdateRoleAssignmentRequest {
                notes: Some("extended".to_string()),
                end_date: Some("2026-06-30".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.notes, "extended");
    assert_eq!(updated.roles, vec![role.id]);
    assert_eq!(
        updated.end_date,
        Some(Utc.with_ymd_and_hms(2026, 6, 30, 0, 0, 0).unwrap())
    );

    let err = state
        .role_assignment_service
        .update(
            assignment.id,
            UpdateRoleAssignmentRequest {
                roles: Some(vec![Uuid::new_v4()]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(NotFound::References { .. })));
}

#[tokio::test]
async fn test_assignment_restore_and_hard_delete() {
    let state = create_test_app_state();
    let user = create_test_user(&state, "u1@example.com", UserRole::User).await;
    let admin = create_test_user(&state, "a1@example.com", UserRole::Admin).await;
    let role = reviewer_role(&state).await;
    let service = &state.role_assignment_service;

    let assignment = service
        .create(request(user.id, admin.id, vec![role.id], vec![], "2025-01-01", None))
        .await
        .unwrap();

    let err = service.restore(assignment.id).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Conflict(ConflictReason::NotDeleted { .. })
    ));

    service.soft_delete(assignment.id).await.unwrap();
    assert!(service.find_by_id(assignment.id, false).await.is_err());
    assert!(service.find_by_id(assignment.id, true).await.is_ok());
    assert!(service.find_by_user_id(user.id, false).await.unwrap().is_empty());
    assert_eq!(service.find_by_granted_by(admin.id, true).await.unwrap().len(), 1);

    let restored = service.restore(assignment.id).await.unwrap();
    assert!(restored.deleted_at.is_none());

    service.hard_delete(assignment.id).await.unwrap();
    assert!(service.find_by_id(assignment.id, true).await.is_err());
}
