use detailing_booking_api::routes::health::health_check;

#[tokio::test]
async fn health_check_reports_ok_status() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");

    let meta = response.0.meta.expect("meta");
    assert!(meta.page.is_none());
    assert!(meta.total.is_none());
}
