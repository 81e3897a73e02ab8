//! Connection lifecycle and host key tests

use sshclient::error::{Error, SshError};
use sshclient::{HostKeyPolicy, RemoteSession, SessionConfig};

use super::fixtures::SshTestEnvironment;

#[tokio::test]
async fn test_password_auth_success() {
    skip_if_no_docker!();
    let _guard = super::fixtures::acquire_test_lock().await;

    let env = SshTestEnvironment::new()
        .await
        .expect("Failed to create test environment");

    let mut session = env.connect().await;
    assert!(!session.is_closed());
    session.close().await;
    assert!(session.is_closed());
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    skip_if_no_docker!();
    let _guard = super::fixtures::acquire_test_lock().await;

    let env = SshTestEnvironment::new()
        .await
        .expect("Failed to create test environment");

    let mut config = env.session_config();
    config.password = "definitely-wrong".to_string().into();

    let result = RemoteSession::connect_with(config).await;
    assert!(
        matches!(result, Err(Error::Ssh(SshError::AuthenticationFailed(_)))),
        "Wrong password should fail authentication: {:?}",
        result.err()
    );
}

#[tokio::test]
async fn test_auto_add_persists_host_key() {
    skip_if_no_docker!();
    let _guard = super::fixtures::acquire_test_lock().await;

    let env = SshTestEnvironment::new()
        .await
        .expect("Failed to create test environment");
    assert!(!env.known_hosts_path.exists());

    let mut first = env.connect().await;
    first.close().await;

    let content = std::fs::read_to_string(&env.known_hosts_path).expect("known_hosts written");
    assert!(content.contains("[127.0.0.1]:2222"));

    // Second connection must match the stored key
    let mut second = env.connect().await;
    second.close().await;
    let after = std::fs::read_to_string(&env.known_hosts_path).unwrap();
    assert_eq!(content, after, "Known key must not be appended twice");
}

#[tokio::test]
async fn test_strict_policy_rejects_unknown_host() {
    skip_if_no_docker!();
    let _guard = super::fixtures::acquire_test_lock().await;

    let env = SshTestEnvironment::new()
        .await
        .expect("Failed to create test environment");

    let config = env
        .session_config()
        .with_host_key_policy(HostKeyPolicy::Strict);
    let result = RemoteSession::connect_with(config).await;
    assert!(matches!(
        result,
        Err(Error::Ssh(SshError::HostKeyVerification(_)))
    ));
}

#[tokio::test]
async fn test_strict_policy_accepts_learned_host() {
    skip_if_no_docker!();
    let _guard = super::fixtures::acquire_test_lock().await;

    let env = SshTestEnvironment::new()
        .await
        .expect("Failed to create test environment");

    env.connect().await.close().await;

    let config = env
        .session_config()
        .with_host_key_policy(HostKeyPolicy::Strict);
    let mut session = RemoteSession::connect_with(config)
        .await
        .expect("Learned host should pass strict checking");
    session.close().await;
}

#[tokio::test]
async fn test_close_is_idempotent_and_blocks_further_use() {
    skip_if_no_docker!();
    let _guard = super::fixtures::acquire_test_lock().await;

    let env = SshTestEnvironment::new()
        .await
        .expect("Failed to create test environment");

    let mut session = env.connect().await;
    session.close().await;
    session.close().await;

    let result = session.exec("true").await;
    assert!(matches!(result, Err(Error::Ssh(SshError::Closed))));
    let result = session.delete("/tmp/anything").await;
    assert!(matches!(result, Err(Error::Ssh(SshError::Closed))));
}

#[test]
fn test_blocking_session_runs_commands() {
    skip_if_no_docker!();

    let server = super::fixtures::TestSshServer::default();
    let scratch = tempfile::tempdir().unwrap();
    let config = SessionConfig::new(
        server.host.clone(),
        server.port,
        server.username.clone(),
        server.password.clone(),
    )
    .with_known_hosts_path(scratch.path().join("known_hosts"));

    let mut session =
        sshclient::blocking::RemoteSession::connect_with(config).expect("blocking connect");
    session.exec("echo blocking").expect("blocking exec");
    assert_eq!(session.last_output(), "blocking\n");
    session.close();
    assert!(session.is_closed());
}
