mod common;

use std::collections::HashSet;

use peaklife::application::guests::ProvisionGuestCommand;
use peaklife::application::identity::Session;
use peaklife::application::publication::CreatePostCommand;
use peaklife::application::repos::PostsRepo;
use peaklife::application::submissions::{SubmissionError, SubmitPostCommand};
use peaklife::domain::types::{CategoryRef, PendingStatus};

use common::app;

fn submission(title: &str, category_id: &str, content: &str) -> SubmitPostCommand {
    SubmitPostCommand {
        title: title.to_string(),
        content: content.to_string(),
        category_id: category_id.to_string(),
        image: None,
    }
}

fn post(title: &str, category_id: &str) -> CreatePostCommand {
    CreatePostCommand {
        title: title.to_string(),
        content: format!("{title} body"),
        category_id: category_id.to_string(),
        author_id: None,
        image: None,
    }
}

#[tokio::test]
async fn sleep_science_submission_is_reviewed_and_published() {
    let app = app();
    let state = &app.state;

    let provisioned = state
        .guests
        .provision(ProvisionGuestCommand {
            name: "Dr. Rest".into(),
            email: "rest@peaklife.test".into(),
            password: "hunter22".into(),
            image_url: Some("https://img.test/rest.png".into()),
        })
        .await
        .unwrap();
    let session = Session::guest(provisioned.uid.clone());

    let sleep = state.categories.create("Sleep").await.unwrap();
    let pending = state
        .submissions
        .submit(
            &session,
            submission("Sleep Science", &sleep.id.to_string(), "# Hi"),
        )
        .await
        .unwrap();

    assert_eq!(pending.status, PendingStatus::Pending);
    assert_eq!(pending.category_name, "Sleep");
    assert_eq!(pending.content_html.trim_end(), "<h1>Hi</h1>");
    assert_eq!(pending.author_name, "Dr. Rest");
    assert_eq!(
        pending.author_image.as_deref(),
        Some("https://img.test/rest.png")
    );

    let queue = state
        .submissions
        .review_queue(Some(PendingStatus::Pending), None, 10)
        .await
        .unwrap();
    assert_eq!(queue.items.len(), 1);
    assert_eq!(queue.items[0].id, pending.id);

    let published = state.submissions.approve(pending.id, None).await.unwrap();
    assert_eq!(published.title, "Sleep Science");
    assert_eq!(published.content, "# Hi");
    assert_eq!(published.category_id, CategoryRef::Known(sleep.id));

    let listing = state.publication.list_paginated(None, 10).await.unwrap();
    assert_eq!(listing.items.len(), 1);
    assert_eq!(listing.items[0].id, published.id);

    assert!(matches!(
        state.submissions.get(pending.id).await,
        Err(SubmissionError::NotFound)
    ));
    let queue = state
        .submissions
        .review_queue(Some(PendingStatus::Pending), None, 10)
        .await
        .unwrap();
    assert!(queue.items.is_empty());

    let dashboard = state.dashboard.guest_dashboard(&session).await.unwrap();
    assert_eq!(dashboard.counts.approved, 1);
    assert_eq!(dashboard.counts.pending, 0);
}

#[tokio::test]
async fn edited_approval_publishes_the_edit_once() {
    let app = app();
    let state = &app.state;
    let session = Session::guest("guest-1");
    let topic = state.categories.create("Movement").await.unwrap();

    let pending = state
        .submissions
        .submit(
            &session,
            submission("Walk more", &topic.id.to_string(), "draft"),
        )
        .await
        .unwrap();

    let published = state
        .submissions
        .approve(pending.id, Some("**final**".into()))
        .await
        .unwrap();
    assert_eq!(published.content, "**final**");
    assert!(published.content_html.contains("<strong>final</strong>"));

    let again = state.submissions.approve(pending.id, None).await;
    assert!(matches!(again, Err(SubmissionError::NotFound)));
    assert_eq!(app.repos.count_posts().await.unwrap(), 1);
}

#[tokio::test]
async fn rejection_is_terminal_and_publishes_nothing() {
    let app = app();
    let state = &app.state;
    let session = Session::guest("guest-2");
    let topic = state.categories.create("Nutrition").await.unwrap();

    let pending = state
        .submissions
        .submit(&session, submission("Sugar", &topic.id.to_string(), "less"))
        .await
        .unwrap();

    let rejected = state.submissions.reject(pending.id).await.unwrap();
    assert_eq!(rejected.status, PendingStatus::Rejected);
    assert!(rejected.rejected_at.is_some());
    assert_eq!(app.repos.count_posts().await.unwrap(), 0);

    assert!(matches!(
        state.submissions.approve(pending.id, None).await,
        Err(SubmissionError::Domain(_))
    ));
    assert!(state.submissions.reject(pending.id).await.is_err());

    let dashboard = state.dashboard.guest_dashboard(&session).await.unwrap();
    assert_eq!(dashboard.counts.rejected, 1);
    assert_eq!(dashboard.entries[0].status, PendingStatus::Rejected);
}

#[tokio::test]
async fn deleting_wellness_moves_its_posts_to_unknown() {
    let app = app();
    let state = &app.state;

    let wellness = state.categories.create("Wellness").await.unwrap();
    let other = state.categories.create("Mindset").await.unwrap();
    let wellness_id = wellness.id.to_string();

    let first = state.publication.create(post("Breathe", &wellness_id)).await.unwrap();
    let second = state.publication.create(post("Stretch", &wellness_id)).await.unwrap();
    let untouched = state
        .publication
        .create(post("Focus", &other.id.to_string()))
        .await
        .unwrap();

    // Prime the cached listings so the delete has to invalidate them.
    assert_eq!(state.categories.list().await.unwrap().len(), 2);
    assert_eq!(
        state.publication.list_by_category(&wellness_id).await.unwrap().len(),
        2
    );

    let reassigned = state.categories.delete(wellness.id).await.unwrap();
    assert_eq!(reassigned, 2);

    let names: Vec<String> = state
        .categories
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|category| category.name)
        .collect();
    assert_eq!(names, vec!["Mindset".to_string()]);

    for id in [first.id, second.id] {
        let post = state.publication.get(id).await.unwrap();
        assert_eq!(post.category_id, CategoryRef::Unknown);
        assert_eq!(post.category_name, "Unknown");
    }
    let kept = state.publication.get(untouched.id).await.unwrap();
    assert_eq!(kept.category_name, "Mindset");

    assert!(
        state
            .publication
            .list_by_category(&wellness_id)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        state.publication.list_by_category("unknown").await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn paging_through_posts_has_no_gaps_or_repeats() {
    let app = app();
    let state = &app.state;
    let topic = state.categories.create("Recovery").await.unwrap();

    let mut created = HashSet::new();
    for n in 0..7 {
        let record = state
            .publication
            .create(post(&format!("Post {n}"), &topic.id.to_string()))
            .await
            .unwrap();
        created.insert(record.id);
    }

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = state
            .publication
            .list_paginated(cursor.as_deref(), 3)
            .await
            .unwrap();
        seen.extend(page.items.iter().map(|post| post.id));
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(seen.len(), 7);
    let unique: HashSet<_> = seen.iter().copied().collect();
    assert_eq!(unique, created);
}

#[tokio::test]
async fn duplicate_emails_leave_no_orphaned_guest() {
    let app = app();
    let state = &app.state;
    let command = ProvisionGuestCommand {
        name: "Coach".into(),
        email: "coach@peaklife.test".into(),
        password: "secret-1".into(),
        image_url: None,
    };

    state.guests.provision(command.clone()).await.unwrap();
    assert!(state.guests.provision(command).await.is_err());

    assert_eq!(app.identity.count(), 1);
    let page = state.guests.list(None).await.unwrap();
    assert_eq!(page.items.len(), 1);
}
