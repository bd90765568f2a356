mod common;

use acme_core::order::{NewOrderRequest, OrderManager};
use acme_core::prelude::*;
use common::MockAcmeServer;

const LEAF_PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

#[tokio::test]
async fn test_certificate_order_flow() -> Result<()> {
    let mut mock_server = MockAcmeServer::new().await;
    let url = mock_server.url();

    let _m_dir = mock_server.mock_directory().await;
    let _m_nonce = mock_server.mock_new_nonce().await;
    let _m_account = mock_server.mock_new_account().await;
    let _m_order = mock_server.mock_new_order().await;
    let _m_authz = mock_server.mock_authorization_valid().await;
    let (_m_finalize, _m_poll) = mock_server.mock_finalize_and_poll_valid().await;
    let _m_cert = mock_server.mock_certificate(LEAF_PEM).await;

    let config = AcmeConfig::new(format!("{}/directory", url))
        .with_contact(Contact::email("admin@example.com"))
        .with_tos_agreed(true);

    let mut client = AcmeClient::new(config).await?;
    client.register_account().await?;

    let order_manager = OrderManager::new(client.session().transport().clone());
    let request = NewOrderRequest::new(vec!["example.com".to_string()]);
    let (order_url, order) = order_manager
        .create_order(&format!("{}/new-order", url), &request)
        .await?;
    assert_eq!(order.status, "ready");
    assert_eq!(order_url, format!("{}/order/1", url));

    let authorization = order_manager.get_authorization(&order.authorizations[0]).await?;
    assert_eq!(authorization.status, "valid");

    let (csr_der, _private_key_pem) =
        acme_core::order::CsrGenerator::new(vec!["example.com".to_string()]).generate()?;
    let finalized = order_manager.finalize_order(&order.finalize, &csr_der).await?;
    assert_eq!(finalized.status, "valid");

    let certificate_url = finalized.certificate.expect("valid order has a certificate URL");
    let cert_pem = order_manager.download_certificate(&certificate_url).await?;
    assert_eq!(cert_pem, LEAF_PEM);

    Ok(())
}
