mod common;

use common::*;
use eduid_core::attributes::{AttributePatch, keys};
use eduid_core::error::{EduIdError, ValidationError};
use eduid_core::gateway::IdentityGateway;
use eduid_core::models::notification::NotificationKind;
use eduid_core::models::profile::{PasswordStatus, UserProfile};

const EMAIL: &str = "mquispe@school.edu";

async fn staff(h: &Harness) -> UserProfile {
    h.svc
        .create_staff(&director_of(INSTITUTION), input("mquispe", "12345678", &[]))
        .await
        .unwrap()
}

async fn welcome_token(h: &Harness) -> String {
    wait_for_outbox(&h.outbox, 1).await;
    latest_token(&h.outbox, NotificationKind::TemporaryCredentials, EMAIL).await
}

fn is_password_field(err: &EduIdError) -> bool {
    matches!(
        err,
        EduIdError::Validation(ValidationError::InvalidField {
            field: "new_password",
            ..
        })
    )
}

#[tokio::test]
async fn forced_change_happens_exactly_once() {
    let h = setup();
    let profile = staff(&h).await;

    let changed = h
        .svc
        .force_password_change(&profile.id, "12345678", "Secreto2024")
        .await
        .unwrap();
    assert_eq!(changed.password_status, Some(PasswordStatus::Permanent));
    assert_eq!(changed.reset_token, None);
    assert!(changed.password_created_at >= profile.password_created_at);
    assert!(h.idp.verify_credential(&profile.id, "Secreto2024").await.unwrap());
    assert!(!h.idp.verify_credential(&profile.id, "12345678").await.unwrap());
    assert!(!h.svc.is_password_temporary(&profile.id).await.unwrap());

    let err = h
        .svc
        .force_password_change(&profile.id, "Secreto2024", "OtraClave2024")
        .await
        .unwrap_err();
    assert!(matches!(err, EduIdError::PasswordAlreadyPermanent));
    assert!(h.idp.verify_credential(&profile.id, "Secreto2024").await.unwrap());

    let sent = wait_for_outbox(&h.outbox, 2).await;
    assert!(sent.iter().any(|n| n.kind == NotificationKind::PasswordChanged));
}

#[tokio::test]
async fn forced_change_requires_the_current_password() {
    let h = setup();
    let profile = staff(&h).await;

    let err = h
        .svc
        .force_password_change(&profile.id, "00000000", "Secreto2024")
        .await
        .unwrap_err();
    assert!(matches!(err, EduIdError::AuthenticationFailed { .. }));
    assert!(h.svc.is_password_temporary(&profile.id).await.unwrap());
}

#[tokio::test]
async fn forced_change_enforces_the_password_policy() {
    let h = setup();
    let profile = staff(&h).await;

    let err = h
        .svc
        .force_password_change(&profile.id, "12345678", "short")
        .await
        .unwrap_err();
    assert!(is_password_field(&err));

    let err = h
        .svc
        .force_password_change(&profile.id, "12345678", "12345678")
        .await
        .unwrap_err();
    assert!(is_password_field(&err));
    assert!(h.svc.is_password_temporary(&profile.id).await.unwrap());
}

#[tokio::test]
async fn unknown_password_state_is_reported() {
    let h = setup();
    let profile = staff(&h).await;
    let mut patch = AttributePatch::new();
    patch.set(keys::PASSWORD_STATUS, "SOMETHING_ELSE");
    h.idp.patch_attributes(&profile.id, &patch).await.unwrap();

    let err = h
        .svc
        .force_password_change(&profile.id, "12345678", "Secreto2024")
        .await
        .unwrap_err();
    assert!(matches!(err, EduIdError::PasswordStateUnknown { .. }));
    assert!(!h.svc.is_password_temporary(&profile.id).await.unwrap());
}

#[tokio::test]
async fn welcome_token_redeems_once() {
    let h = setup();
    let profile = staff(&h).await;
    let token = welcome_token(&h).await;

    let redeemed = h.svc.redeem_reset_token(&token, "Secreto2024").await.unwrap();
    assert_eq!(redeemed.id, profile.id);
    assert_eq!(redeemed.password_status, Some(PasswordStatus::Permanent));
    assert_eq!(redeemed.reset_token, None);
    assert!(h.idp.verify_credential(&profile.id, "Secreto2024").await.unwrap());

    let err = h
        .svc
        .redeem_reset_token(&token, "OtraClave2024")
        .await
        .unwrap_err();
    assert!(matches!(err, EduIdError::TokenInvalidOrExpired));
    assert!(h.idp.verify_credential(&profile.id, "Secreto2024").await.unwrap());

    let err = h
        .svc
        .force_password_change(&profile.id, "Secreto2024", "OtraClave2024")
        .await
        .unwrap_err();
    assert!(matches!(err, EduIdError::PasswordAlreadyPermanent));
}

#[tokio::test]
async fn wrong_token_leaves_the_live_token_redeemable() {
    let h = setup();
    let profile = staff(&h).await;
    let token = welcome_token(&h).await;

    for bogus in ["", "   ", "not-a-token", &token[1..]] {
        let err = h
            .svc
            .redeem_reset_token(bogus, "Secreto2024")
            .await
            .unwrap_err();
        assert!(matches!(err, EduIdError::TokenInvalidOrExpired), "{bogus:?}");
    }
    assert!(h.svc.is_password_temporary(&profile.id).await.unwrap());

    h.svc.redeem_reset_token(&token, "Secreto2024").await.unwrap();
}

#[tokio::test]
async fn rejected_password_does_not_consume_the_token() {
    let h = setup();
    staff(&h).await;
    let token = welcome_token(&h).await;

    let err = h.svc.redeem_reset_token(&token, "short").await.unwrap_err();
    assert!(is_password_field(&err));

    h.svc.redeem_reset_token(&token, "Secreto2024").await.unwrap();
}

#[tokio::test]
async fn requesting_a_reset_replaces_the_previous_token() {
    let h = setup();
    let profile = staff(&h).await;
    let welcome = welcome_token(&h).await;

    h.svc.request_password_reset("MQUISPE@School.edu").await.unwrap();
    wait_for_outbox(&h.outbox, 2).await;
    let fresh = latest_token(&h.outbox, NotificationKind::PasswordReset, EMAIL).await;
    assert_ne!(fresh, welcome);

    let err = h
        .svc
        .redeem_reset_token(&welcome, "Secreto2024")
        .await
        .unwrap_err();
    assert!(matches!(err, EduIdError::TokenInvalidOrExpired));

    let redeemed = h.svc.redeem_reset_token(&fresh, "Secreto2024").await.unwrap();
    assert_eq!(redeemed.id, profile.id);
}

#[tokio::test]
async fn reset_for_username_and_admin_issue() {
    let h = setup();
    let profile = staff(&h).await;
    welcome_token(&h).await;

    h.svc.request_password_reset("  mquispe ").await.unwrap();
    wait_for_outbox(&h.outbox, 2).await;

    h.svc.issue_reset_token(&admin(), &profile.id).await.unwrap();
    let sent = wait_for_outbox(&h.outbox, 3).await;
    let resets = sent
        .iter()
        .filter(|n| n.kind == NotificationKind::PasswordReset)
        .count();
    assert_eq!(resets, 2);

    let err = h
        .svc
        .issue_reset_token(&director_of(OTHER_INSTITUTION), &profile.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EduIdError::NotFound { .. }));
}

#[tokio::test]
async fn reset_request_for_unknown_login_is_silent() {
    let h = setup();
    staff(&h).await;
    welcome_token(&h).await;

    h.svc.request_password_reset("nobody").await.unwrap();
    h.svc.request_password_reset("nobody@school.edu").await.unwrap();
    h.svc.request_password_reset("   ").await.unwrap();

    h.svc.shutdown().await;
    assert_eq!(h.outbox.sent().await.len(), 1);
}

#[tokio::test]
async fn password_stays_permanent_after_a_later_reset() {
    let h = setup();
    let profile = staff(&h).await;
    h.svc
        .force_password_change(&profile.id, "12345678", "Secreto2024")
        .await
        .unwrap();

    h.svc.request_password_reset(EMAIL).await.unwrap();
    wait_for_outbox(&h.outbox, 3).await;
    let token = latest_token(&h.outbox, NotificationKind::PasswordReset, EMAIL).await;

    let redeemed = h.svc.redeem_reset_token(&token, "OtraClave2024").await.unwrap();
    assert_eq!(redeemed.password_status, Some(PasswordStatus::Permanent));
    assert!(h.idp.verify_credential(&profile.id, "OtraClave2024").await.unwrap());
    assert!(!h.svc.is_password_temporary(&profile.id).await.unwrap());
}

#[tokio::test]
async fn concurrent_redemptions_have_a_single_winner() {
    let h = setup();
    let profile = staff(&h).await;
    let token = welcome_token(&h).await;

    let (first, second) = tokio::join!(
        h.svc.redeem_reset_token(&token, "PrimeraClave1"),
        h.svc.redeem_reset_token(&token, "SegundaClave2"),
    );

    let winners = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(loser, Err(EduIdError::TokenInvalidOrExpired)));

    let a = h.idp.verify_credential(&profile.id, "PrimeraClave1").await.unwrap();
    let b = h.idp.verify_credential(&profile.id, "SegundaClave2").await.unwrap();
    assert!(a ^ b);
}

#[tokio::test]
async fn unknown_identity_is_not_temporary() {
    let h = setup();
    assert!(!h.svc.is_password_temporary("missing").await.unwrap());

    let err = h
        .svc
        .force_password_change("missing", "12345678", "Secreto2024")
        .await
        .unwrap_err();
    assert!(matches!(err, EduIdError::NotFound { .. }));
}

#[tokio::test]
async fn failed_credential_write_keeps_the_token_redeemable() {
    let h = setup_flaky();
    let profile = h
        .svc
        .create_staff(&director_of(INSTITUTION), input("mquispe", "12345678", &[]))
        .await
        .unwrap();
    wait_for_outbox(&h.outbox, 1).await;
    let token = latest_token(&h.outbox, NotificationKind::TemporaryCredentials, EMAIL).await;

    h.idp.fail_credential_writes(1);
    let err = h.svc.redeem_reset_token(&token, "Secreto2024").await.unwrap_err();
    assert!(matches!(err, EduIdError::Upstream { .. }));
    assert!(!h.idp.verify_credential(&profile.id, "Secreto2024").await.unwrap());
    assert!(h.svc.is_password_temporary(&profile.id).await.unwrap());

    let redeemed = h.svc.redeem_reset_token(&token, "Secreto2024").await.unwrap();
    assert_eq!(redeemed.password_status, Some(PasswordStatus::Permanent));
    assert_eq!(redeemed.reset_token, None);
    assert!(h.idp.verify_credential(&profile.id, "Secreto2024").await.unwrap());
}
