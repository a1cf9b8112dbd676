use bite_core::model::{ItemId, Rating};
use bite_core::time::fixed_now;
use services::{AppServices, Clock};

fn id(raw: &str) -> ItemId {
    ItemId::new(raw).unwrap()
}

#[tokio::test]
async fn likes_and_feedback_show_up_in_analytics() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now())).await;
    let engagement = app.engagement();
    assert!(engagement.enabled());

    assert!(engagement.like(&id("intro")).await);
    assert!(engagement.like(&id("intro")).await);
    assert!(
        engagement
            .submit_feedback(&id("intro"), Rating::new(5).unwrap(), Some("clear".into()))
            .await
    );
    assert!(
        engagement
            .submit_feedback(&id("next"), Rating::new(3).unwrap(), Some("  ".into()))
            .await
    );

    let report = app.analytics().unwrap().report().await.unwrap();
    assert_eq!(report.total_likes, 1);
    assert_eq!(report.total_feedback, 2);
    assert_eq!(report.unique_viewers, 1);
    assert_eq!(report.items[0].item_id, id("intro"));
    assert_eq!(report.recent_comments.len(), 1);

    assert!(engagement.unlike(&id("intro")).await);
    assert_eq!(engagement.like_count(&id("intro")).await, Some(0));
}

#[tokio::test]
async fn notes_and_layout_share_the_store() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now())).await;
    app.notes().save(&id("intro"), "# Key idea").await.unwrap();
    let html = app.notes().render_html(&id("intro")).unwrap();
    assert!(html.contains("<h1>Key idea</h1>"));

    let mut layout = app.layout().load().await;
    layout.notes_open = true;
    app.layout().save(layout).await;
    assert!(app.layout().load().await.notes_open);
}
