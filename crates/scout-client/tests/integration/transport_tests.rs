use axum::http::StatusCode;
use scout_client::{FileCredentialStore, HtmlPage, ReqwestTransport};
use scout_core::dispatch::{ScrapeReply, ScrapeStatus};
use scout_core::heartbeat::{HEARTBEAT_PATH, Heartbeat, LivenessReporter};
use scout_core::ingest::{
    FollowUp, INGEST_PATH, IngestionClient, classify_response, follow_up_channel,
};
use scout_core::models::ConnectionStatus;
use scout_core::monitor::{ConnectionMonitor, TracingIndicator};
use scout_core::scrape::ScoutPipeline;
use scout_core::testutil::make_test_record;
use scout_core::traits::Transport;
use scout_core::{ScoutError, save_credential};
use tempfile::TempDir;

use crate::integration::common::{FakeHq, TEST_API_KEY, start_fake_hq, start_truncating_server};

const BOARD: &str = r#"<html><body><table>
    <tr><th>Origin</th><th>Destination</th><th>Rate</th><th>Equipment</th></tr>
    <tr><td>Dallas, TX</td><td>Atlanta, GA</td><td>$3,000</td><td>V</td></tr>
    <tr><td>Reno, NV</td><td>Boise, ID</td><td>$1,200</td><td>V</td></tr>
</table></body></html>"#;

struct Harness {
    hq: FakeHq,
    transport: ReqwestTransport,
    store: FileCredentialStore,
    _dir: TempDir,
}

async fn harness(api_key: Option<&str>) -> anyhow::Result<Harness> {
    let hq = start_fake_hq().await?;
    let transport = ReqwestTransport::new(hq.base_url.clone())?;
    let dir = tempfile::tempdir()?;
    let store = FileCredentialStore::new(dir.path());
    if let Some(key) = api_key {
        save_credential(&store, key).await?;
    }
    Ok(Harness {
        hq,
        transport,
        store,
        _dir: dir,
    })
}

#[tokio::test]
async fn batch_is_delivered_with_api_key_header() -> anyhow::Result<()> {
    let h = harness(Some(TEST_API_KEY)).await?;
    let client = IngestionClient::new(h.transport.clone(), h.store.clone());

    let ack = client
        .send(&[
            make_test_record("Dallas, TX", "Atlanta, GA", "$3,000"),
            make_test_record("Reno, NV", "Boise, ID", "$1,200"),
        ])
        .await?;

    assert_eq!(ack.status_code, 200);
    assert_eq!(ack.new_loads(), 2);
    assert_eq!(ack.hot(), 1);

    let received = h.hq.received_on(INGEST_PATH);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].api_key.as_deref(), Some(TEST_API_KEY));
    assert_eq!(received[0].body[0]["origin"], "Dallas, TX");
    assert_eq!(received[0].body[1]["price"], "$1,200");
    assert_eq!(received[0].body[0]["equipment_type"], "Van");
    Ok(())
}

#[tokio::test]
async fn wrong_key_is_invalid_credential_and_queues_recheck() -> anyhow::Result<()> {
    let h = harness(Some("stale-key")).await?;
    let (tx, mut rx) = follow_up_channel();
    let client = IngestionClient::new(h.transport.clone(), h.store.clone()).with_follow_ups(tx);

    let err = client
        .send(&[make_test_record("A", "B", "$100")])
        .await
        .unwrap_err();

    assert!(matches!(err, ScoutError::InvalidCredential));
    assert_eq!(rx.try_recv().ok(), Some(FollowUp::Recheck));
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn missing_key_never_reaches_the_network() -> anyhow::Result<()> {
    let h = harness(None).await?;
    let client = IngestionClient::new(h.transport.clone(), h.store.clone());

    let err = client
        .send(&[make_test_record("A", "B", "$100")])
        .await
        .unwrap_err();

    assert!(matches!(err, ScoutError::MissingCredential));
    assert!(h.hq.received().is_empty());
    Ok(())
}

#[tokio::test]
async fn server_error_is_remote_rejected() -> anyhow::Result<()> {
    let h = harness(Some(TEST_API_KEY)).await?;
    h.hq.fail_ingest_with(StatusCode::SERVICE_UNAVAILABLE);
    let client = IngestionClient::new(h.transport.clone(), h.store.clone());

    let err = client
        .send(&[make_test_record("A", "B", "$100")])
        .await
        .unwrap_err();

    match err {
        ScoutError::RemoteRejected {
            status_code,
            message,
        } => {
            assert_eq!(status_code, 503);
            assert!(message.contains("ingest unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn heartbeat_posts_defaults() -> anyhow::Result<()> {
    let h = harness(None).await?;
    let reporter = LivenessReporter::new(h.transport.clone(), Heartbeat::default());

    reporter.report(TEST_API_KEY, reporter.defaults()).await;

    let received = h.hq.received_on(HEARTBEAT_PATH);
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0].body,
        serde_json::json!({"lanes": [], "min_rpm": 2.45, "active": true})
    );
    Ok(())
}

#[tokio::test]
async fn probe_classifies_live_service() -> anyhow::Result<()> {
    let good = harness(Some(TEST_API_KEY)).await?;
    let monitor = ConnectionMonitor::new(
        IngestionClient::new(good.transport.clone(), good.store.clone()),
        LivenessReporter::new(good.transport.clone(), Heartbeat::default()),
        TracingIndicator,
    );
    assert_eq!(monitor.probe().await, ConnectionStatus::Connected);
    let probe = good.hq.received_on(INGEST_PATH);
    assert_eq!(probe[0].body, serde_json::json!([]));
    good.hq.wait_for(HEARTBEAT_PATH, 1).await;

    let bad = harness(Some("nope")).await?;
    let monitor = ConnectionMonitor::new(
        IngestionClient::new(bad.transport.clone(), bad.store.clone()),
        LivenessReporter::new(bad.transport.clone(), Heartbeat::default()),
        TracingIndicator,
    );
    assert_eq!(monitor.probe().await, ConnectionStatus::Unauthorized);
    Ok(())
}

#[tokio::test]
async fn scrape_html_page_end_to_end() -> anyhow::Result<()> {
    let h = harness(Some(TEST_API_KEY)).await?;
    let pipeline = ScoutPipeline::new(IngestionClient::new(h.transport.clone(), h.store.clone()));
    let mut page = HtmlPage::parse(BOARD)?;

    let reply = pipeline.scrape_now(&mut page).await;

    assert_eq!(reply, ScrapeReply::success(2));
    assert_eq!(page.badge_count(), 1);
    assert!(page.to_html().contains("GC: +$60.00 (15.0 gal)"));

    let received = h.hq.received_on(INGEST_PATH);
    assert_eq!(received.len(), 1);
    let origins: Vec<_> = received[0]
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["origin"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(origins, vec!["Dallas, TX", "Reno, NV"]);

    // A second scrape sends again but does not stack badges.
    let again = pipeline.scrape_now(&mut page).await;
    assert_eq!(again.status, ScrapeStatus::Success);
    assert_eq!(page.badge_count(), 1);
    Ok(())
}

#[tokio::test]
async fn truncated_401_body_is_still_invalid_credential() -> anyhow::Result<()> {
    let base = start_truncating_server("HTTP/1.1 401 Unauthorized").await?;
    let transport = ReqwestTransport::new(base)?;

    let response = transport
        .post_json(INGEST_PATH, "stale-key", &serde_json::json!([]))
        .await?;

    assert_eq!(response.status, 401);
    assert!(response.body.is_empty());
    assert!(matches!(
        classify_response(response),
        Err(ScoutError::InvalidCredential)
    ));
    Ok(())
}

#[tokio::test]
async fn truncated_5xx_body_is_remote_rejected() -> anyhow::Result<()> {
    let base = start_truncating_server("HTTP/1.1 502 Bad Gateway").await?;
    let dir = tempfile::tempdir()?;
    let store = FileCredentialStore::new(dir.path());
    save_credential(&store, TEST_API_KEY).await?;
    let client = IngestionClient::new(ReqwestTransport::new(base)?, store);

    let err = client
        .send(&[make_test_record("A", "B", "$100")])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScoutError::RemoteRejected {
            status_code: 502,
            ..
        }
    ));
    Ok(())
}
