//! integration tests for all-or-nothing writes
//!
//! a failed operation must leave no payload rows, envelopes, links,
//! assignments or blobs behind.

mod common;

use coffer::{Error, GrantRequest, NewCredential};
use coffer_types::{
    CredentialPayload, FileSecret, IdentityType, Permission, Pid, PidKind, ResourceType,
};
use common::Fixture;

fn file(contents: &[u8]) -> CredentialPayload {
    CredentialPayload::File(FileSecret {
        file_name: "id_ed25519".to_string(),
        contents: contents.to_vec(),
        expires_at: None,
    })
}

#[tokio::test]
async fn test_create_into_missing_vault_leaves_nothing() {
    let fx = Fixture::new().await;
    let alice = fx.user("alice").await;

    let new = NewCredential::new("ssh", file(b"-----BEGIN KEY-----"))
        .in_vault(Pid::generate(PidKind::Vault));
    assert!(matches!(
        fx.coffer.create_credential(&alice, new).await,
        Err(Error::NotFound(_))
    ));

    assert!(fx.blobs.is_empty());
    assert!(fx.report().await.is_clean());
    // only the personal vault ownership from registration remains
    let held = fx.coffer.permissions_held(&alice).await.unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].resource.resource_type(), ResourceType::Vault);
}

#[tokio::test]
async fn test_create_into_foreign_vault_is_rolled_back() {
    let fx = Fixture::new().await;
    let alice = fx.user("alice").await;
    let bob = fx.user("bob").await;
    let bobs_vault = fx.vault(&bob, "bob's stuff").await;

    let new = NewCredential::new("ssh", file(b"key")).in_vault(bobs_vault.pid.clone());
    assert!(matches!(
        fx.coffer.create_credential(&alice, new).await,
        Err(Error::NotAuthorized)
    ));

    assert!(fx.blobs.is_empty());
    assert!(fx.report().await.is_clean());
    assert!(fx
        .coffer
        .list_vault_credentials(&bob, &bobs_vault.pid)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_grant_batch_is_all_or_nothing() {
    let fx = Fixture::new().await;
    let alice = fx.user("alice").await;
    let bob = fx.user("bob").await;
    let vault = fx.vault(&alice, "V").await;

    let requests = vec![
        GrantRequest::new(
            ResourceType::Vault,
            vault.pid.clone(),
            IdentityType::User,
            bob.user_pid.clone(),
            Permission::View,
        )
        .with_key_share(bob.user_pid.clone(), vec![1, 2, 3]),
        // alice already owns the vault
        GrantRequest::new(
            ResourceType::Vault,
            vault.pid.clone(),
            IdentityType::User,
            alice.user_pid.clone(),
            Permission::View,
        ),
    ];
    assert!(matches!(
        fx.coffer.grant_permissions(&alice, requests).await,
        Err(Error::Validation(_))
    ));

    assert!(fx.actions(&bob, ResourceType::Vault, &vault.pid).await.is_empty());
    let personal = fx.coffer.personal_vault(&bob).await.unwrap();
    assert!(fx
        .coffer
        .list_vault_credentials(&bob, &personal.pid)
        .await
        .unwrap()
        .is_empty());
    assert!(fx.blobs.is_empty());
    assert!(fx.report().await.is_clean());
}

#[tokio::test]
async fn test_key_share_lands_in_recipients_personal_vault() {
    let fx = Fixture::new().await;
    let alice = fx.user("alice").await;
    let bob = fx.user("bob").await;
    let vault = fx.vault(&alice, "V").await;

    fx.coffer
        .grant_permissions(
            &alice,
            vec![GrantRequest::new(
                ResourceType::Vault,
                vault.pid.clone(),
                IdentityType::User,
                bob.user_pid.clone(),
                Permission::Edit,
            )
            .with_key_share(bob.user_pid.clone(), b"wrapped key".to_vec())],
        )
        .await
        .unwrap();

    let personal = fx.coffer.personal_vault(&bob).await.unwrap();
    let shares = fx
        .coffer
        .list_vault_credentials(&bob, &personal.pid)
        .await
        .unwrap();
    assert_eq!(shares.len(), 1);
    assert_eq!(shares[0].name, vault.pid.as_str());

    let view = fx.coffer.get_credential(&bob, &shares[0].pid).await.unwrap();
    let CredentialPayload::File(share) = view.payload else {
        panic!("key share should be stored as a file");
    };
    assert_eq!(share.contents, b"wrapped key");

    // the sharer cannot read it
    assert!(matches!(
        fx.coffer.get_credential(&alice, &shares[0].pid).await,
        Err(Error::NotAuthorized)
    ));
    // stored encrypted
    assert_eq!(fx.blobs.len(), 1);
}

#[tokio::test]
async fn test_delete_vault_keeps_store_consistent() {
    let fx = Fixture::new().await;
    let alice = fx.user("alice").await;
    let doomed = fx.vault(&alice, "doomed").await;
    let keeper = fx.vault(&alice, "keeper").await;

    let only_here = fx
        .coffer
        .create_credential(
            &alice,
            NewCredential::new("cert", file(b"pem")).in_vault(doomed.pid.clone()),
        )
        .await
        .unwrap();
    let shared = fx.password(&alice, "db", "pw", Some(&doomed.pid)).await;
    fx.coffer
        .add_credential_to_vault(&alice, &shared.pid, &keeper.pid)
        .await
        .unwrap();
    assert_eq!(fx.blobs.len(), 1);

    fx.coffer.delete_vault(&alice, &doomed.pid).await.unwrap();

    assert!(matches!(
        fx.coffer.get_credential(&alice, &only_here.pid).await,
        Err(Error::NotFound(_))
    ));
    assert!(fx.coffer.get_credential(&alice, &shared.pid).await.is_ok());
    assert!(fx.blobs.is_empty());
    assert!(fx.report().await.is_clean());
}

#[tokio::test]
async fn test_personal_vault_cannot_be_deleted() {
    let fx = Fixture::new().await;
    let alice = fx.user("alice").await;
    let personal = fx.coffer.personal_vault(&alice).await.unwrap();

    assert!(matches!(
        fx.coffer.delete_vault(&alice, &personal.pid).await,
        Err(Error::Validation(_))
    ));
    assert!(fx.coffer.get_vault(&alice, &personal.pid).await.is_ok());
}
