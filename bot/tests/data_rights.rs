mod common;

use common::*;
use kahukura_bot::{BotCommand, Invoker};
use kahukura_nullables::{NullCodeSource, NullConfirmationPrompt};
use kahukura_platform::ConfirmationChoice;
use kahukura_store::IdentityStore;

#[tokio::test]
async fn export_without_data_generates_nothing() {
    let h = harness();
    h.membership.join(&member("1"));
    h.bot
        .handle_event(kahukura_bot::PlatformEvent::MemberJoined { member: member("1") })
        .await
        .unwrap();
    let reply = h.run(&Invoker::member(member("1")), BotCommand::MyData).await;
    assert_eq!(reply.content, "We do not hold any data about you.");
    assert!(h.mailer.exports_sent().is_empty());
    assert!(h.prompt.asked().is_empty());
}

#[tokio::test]
async fn export_is_sent_once_a_week() {
    let h = harness();
    h.verify("1", "a@uni.edu").await;
    let me = Invoker::member(member("1"));
    let reply = h.run(&me, BotCommand::MyData).await;
    assert_eq!(reply.content, "Your data has been emailed to you.");
    let (to, export) = h.mailer.exports_sent().remove(0);
    assert_eq!(to.as_str(), "a@uni.edu");
    assert_eq!(export.file_name, format!("1_data_{START}.json"));

    h.clock.advance(3 * 24 * 3600);
    let reply = h.run(&me, BotCommand::MyData).await;
    assert!(reply.content.contains("once a week"));
    assert_eq!(h.mailer.exports_sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unanswered_export_prompt_cancels_after_a_minute() {
    let h = harness_with(config(), NullConfirmationPrompt::silent(), NullCodeSource::constant(123_456));
    h.verify("1", "a@uni.edu").await;
    let reply = h.run(&Invoker::member(member("1")), BotCommand::MyData).await;
    assert!(reply.content.contains("No answer"));
    assert!(h.mailer.exports_sent().is_empty());
    assert!(h.identity.get(&member("1")).unwrap().unwrap().last_export_request_at.is_none());
}

#[tokio::test]
async fn delete_of_joined_member_deletes_and_evicts() {
    let h = harness();
    h.membership.join(&member("1"));
    h.verify("1", "a@uni.edu").await;
    let records_before = h.bot.metrics().records.get();

    let reply = h
        .run(&steward(), BotCommand::DeleteData { target: member("1") })
        .await;
    assert!(reply.content.contains("has been deleted"));
    assert!(reply.content.contains("removed from the server"));
    assert!(h.identity.get(&member("1")).unwrap().is_none());
    assert!(!h.membership.contains(&member("1")));
    assert_eq!(h.bot.metrics().records.get(), records_before - 1);
    assert_eq!(
        h.membership.evictions(),
        vec![member("1")]
    );
}

#[tokio::test]
async fn delete_reports_failed_eviction_separately() {
    let h = harness();
    h.membership.join(&member("1"));
    h.membership.fail_evictions_of(&member("1"));
    h.verify("1", "a@uni.edu").await;
    let reply = h
        .run(&steward(), BotCommand::DeleteData { target: member("1") })
        .await;
    assert!(reply.content.contains("has been deleted"));
    assert!(reply.content.contains("could not be removed"));
    assert!(h.identity.get(&member("1")).unwrap().is_none());
    assert_eq!(h.bot.metrics().eviction_failures.get(), 1);
}

#[tokio::test]
async fn cancelled_delete_keeps_record() {
    let h = harness_with(
        config(),
        NullConfirmationPrompt::new(vec![Ok(ConfirmationChoice::Cancel)]),
        NullCodeSource::constant(123_456),
    );
    h.verify("1", "a@uni.edu").await;
    let reply = h
        .run(&steward(), BotCommand::DeleteData { target: member("1") })
        .await;
    assert_eq!(reply.content, "Cancelled. Nothing was deleted.");
    assert!(h.identity.get(&member("1")).unwrap().is_some());
    assert_eq!(h.prompt.asked()[0].0, member("902"));
}
