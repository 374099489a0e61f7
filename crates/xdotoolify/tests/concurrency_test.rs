// Integration tests for independent concurrent chains
//
// Each top-level execute owns its mode stack and run bookkeeping, so chains on
// different pages (or on the same page) must not observe each other.

mod common;

use std::time::Duration;
use xdotoolify::{DoOptions, Value, Xdotoolify, XdotoolifyOptions};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unsafe_chain_unaffected_by_concurrent_safe_chain() {
    common::init_tracing();
    let xdo = Xdotoolify::default();
    let (_, first) = common::attached_page(&xdo);
    let (second_driver, second) = common::attached_page(&xdo);

    let slow = xdo.setup_with_page(|page, _| async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        page.x().click().check_nothing().execute(None).await?;
        Ok(Value::Null)
    });

    let safe = tokio::spawn(async move { first.x().run(slow).execute(None).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // The safe chain above is still inside its run callback here.
    second
        .x()
        .click()
        .execute(Some(DoOptions::new().unsafe_mode(true)))
        .await
        .expect("a safe chain on another page must not block unsafe execution");

    safe.await.expect("task panicked").unwrap();
    assert_eq!(second_driver.interactions().len(), 1);
}

#[tokio::test]
async fn test_concurrent_chains_on_same_page() {
    common::init_tracing();
    let xdo = Xdotoolify::default();
    let (driver, page) = common::attached_page(&xdo);

    let forgetful = xdo.setup_with_page(|page, _| async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _never_executed = page.x().click();
        Ok(Value::Null)
    });
    let diligent = xdo.setup_with_page(|page, _| async move {
        page.x().click().check_nothing().execute(None).await?;
        Ok(Value::Null)
    });

    let (forgot, fine) = tokio::join!(
        page.x().run(forgetful).execute(None),
        page.x().run(diligent).execute(None),
    );

    assert!(forgot.is_err());
    fine.expect("the other chain's missing execute must not leak");
    assert_eq!(driver.interactions().len(), 1);
}

#[tokio::test]
async fn test_instances_keep_separate_timeouts() {
    common::init_tracing();
    let quick = Xdotoolify::new(XdotoolifyOptions::new().check_until_timeout_ms(10));
    let patient = Xdotoolify::new(XdotoolifyOptions::new().check_until_timeout_ms(4000));
    let (_, quick_page) = common::attached_page(&quick);
    let (_, patient_page) = common::attached_page(&patient);

    quick.set_default_check_until_timeout(Duration::from_millis(15));

    assert_eq!(quick.default_check_until_timeout(), Duration::from_millis(15));
    assert_eq!(patient.default_check_until_timeout(), Duration::from_millis(4000));

    let never = common::constant(&quick, 0);
    let err = quick_page
        .x()
        .check_until(never, common::identity, 1)
        .execute(None)
        .await
        .unwrap_err();
    assert!(matches!(err, xdotoolify::Error::CheckUntilTimeout(ref t) if t.timeout == Duration::from_millis(15)));

    let ready = common::constant(&patient, 1);
    patient_page
        .x()
        .check_until(ready, common::identity, 1)
        .execute(None)
        .await
        .unwrap();
}
