use std::time::Duration;

use leave_desk::notify::{Notice, NoticeKind, Notifier};

#[tokio::test(start_paused = true)]
async fn test_notification_expires_after_ttl() {
    let mut notifier = Notifier::new(Duration::from_secs(3));
    notifier.show(Notice::Submitted);

    tokio::time::advance(Duration::from_millis(2900)).await;
    assert_eq!(notifier.current().map(|n| n.notice.clone()), Some(Notice::Submitted));

    tokio::time::advance(Duration::from_millis(200)).await;
    assert!(notifier.current().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_newer_notification_replaces_older() {
    let mut notifier = Notifier::new(Duration::from_secs(3));
    notifier.show(Notice::SignedIn);
    tokio::time::advance(Duration::from_secs(2)).await;

    notifier.show(Notice::SubmitFailed);
    tokio::time::advance(Duration::from_secs(2)).await;

    let current = notifier.current().expect("second notice still live");
    assert_eq!(current.notice, Notice::SubmitFailed);
    assert_eq!(current.notice.kind(), NoticeKind::Error);
}
