mod common;

use common::*;
use kahukura_bot::{BotCommand, Invoker, PlatformEvent};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Step {
    Claim { member: u8, email: u8 },
    Manual { member: u8, email: u8 },
    Ban { member: u8 },
    Unban { member: u8 },
    Join { member: u8 },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (0u8..4, 0u8..2).prop_map(|(member, email)| Step::Claim { member, email }),
        2 => (0u8..4, 0u8..2).prop_map(|(member, email)| Step::Manual { member, email }),
        1 => (0u8..4).prop_map(|member| Step::Ban { member }),
        1 => (0u8..4).prop_map(|member| Step::Unban { member }),
        2 => (0u8..4).prop_map(|member| Step::Join { member }),
    ]
}

fn address(n: u8) -> String {
    format!("student{n}@uni.edu")
}

async fn apply(h: &Harness, step: &Step) {
    match step {
        Step::Claim { member: m, email: e } => {
            let invoker = Invoker::member(member(&m.to_string()));
            h.run(&invoker, BotCommand::Verify { email: address(*e) }).await;
            if let Some((_, code)) = h.mailer.codes_sent().into_iter().last() {
                h.run(&invoker, BotCommand::Code { code: code.to_string() }).await;
            }
        }
        Step::Manual { member: m, email: e } => {
            h.run(
                &admin(),
                BotCommand::ManualVerify {
                    target: member(&m.to_string()),
                    email: address(*e),
                    reason: "checked by hand".into(),
                },
            )
            .await;
        }
        Step::Ban { member: m } => {
            h.bot
                .handle_event(PlatformEvent::MemberBanned { member: member(&m.to_string()) })
                .await
                .unwrap();
        }
        Step::Unban { member: m } => {
            h.bot
                .handle_event(PlatformEvent::MemberUnbanned { member: member(&m.to_string()) })
                .await
                .unwrap();
        }
        Step::Join { member: m } => {
            let id = member(&m.to_string());
            h.membership.join(&id);
            h.bot
                .handle_event(PlatformEvent::MemberJoined { member: id })
                .await
                .unwrap();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn at_most_one_verified_record_per_email(steps in prop::collection::vec(step(), 1..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let h = harness();
            for step in &steps {
                apply(&h, step).await;
                for n in 0..2u8 {
                    let holders = h.identity.verified_with_email(&email(&address(n)));
                    assert!(holders.len() <= 1, "after {step:?}: {holders:?} all verified with {}", address(n));
                }
            }
        });
    }

    #[test]
    fn verified_records_never_keep_a_pending_code(steps in prop::collection::vec(step(), 1..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let h = harness();
            for step in &steps {
                apply(&h, step).await;
            }
            for record in h.identity.all() {
                if record.verified {
                    assert!(record.pending_code.is_none(), "{record:?}");
                }
            }
        });
    }
}
