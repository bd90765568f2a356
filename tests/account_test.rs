mod common;

use acme_core::prelude::*;
use common::MockAcmeServer;

#[tokio::test]
async fn test_full_account_lifecycle() -> Result<()> {
    let mut mock_server = MockAcmeServer::new().await;
    let _m_dir = mock_server.mock_directory().await;
    let _m_nonce = mock_server.mock_new_nonce().await;
    let _m_account = mock_server.mock_new_account().await;

    let config = AcmeConfig::new(format!("{}/directory", mock_server.url()))
        .with_contact(Contact::email("admin@example.com"))
        .with_tos_agreed(true);

    let mut client = AcmeClient::new(config).await?;
    let account_id = client.register_account().await?;

    assert!(account_id.ends_with("/account/1"));
    assert_eq!(client.account_id(), Some(account_id.as_str()));

    Ok(())
}
