//! tests for the outcome codes handed to transport layers

mod common;

use coffer::{GenericResponse, GrantRequest, NewVault};
use coffer_types::{IdentityType, Permission, Pid, PidKind, ResourceType};
use common::Fixture;

#[tokio::test]
async fn test_outcome_codes_from_real_operations() {
    let fx = Fixture::new().await;
    let alice = fx.user("alice").await;
    let bob = fx.user("bob").await;
    let vault = fx.vault(&alice, "V").await;

    let result = fx
        .coffer
        .grant_permissions(
            &alice,
            vec![GrantRequest::new(
                ResourceType::Vault,
                vault.pid.clone(),
                IdentityType::User,
                bob.user_pid.clone(),
                Permission::View,
            )],
        )
        .await;
    let response = GenericResponse::from_result(&result, "permissions granted");
    assert_eq!(response, GenericResponse::ok("permissions granted"));

    let denied = fx.coffer.delete_vault(&bob, &vault.pid).await;
    assert_eq!(GenericResponse::from_result(&denied, "deleted").code, 403);

    let missing = fx
        .coffer
        .get_vault(&alice, &Pid::generate(PidKind::Vault))
        .await;
    let response = GenericResponse::from_result(&missing, "ok");
    assert!(!response.success);
    assert_eq!(response.code, 404);

    let invalid = fx
        .coffer
        .create_vault(&alice, NewVault::default())
        .await;
    assert_eq!(GenericResponse::from_result(&invalid, "created").code, 400);
}
