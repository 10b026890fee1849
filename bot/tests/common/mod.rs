#![allow(dead_code)]

use std::sync::Arc;

use kahukura_bot::{Bot, BotCommand, BotConfig, Collaborators, CommandReply, Invoker};
use kahukura_nullables::{
    NullClock, NullCodeSource, NullConfirmationPrompt, NullIdentityStore, NullMailer,
    NullMembership, NullModerationLogStore, NullNotifier,
};
use kahukura_types::{Email, MemberId};

pub const START: u64 = 1_700_000_000;

pub struct Harness {
    pub identity: Arc<NullIdentityStore>,
    pub log: Arc<NullModerationLogStore>,
    pub membership: Arc<NullMembership>,
    pub notifier: Arc<NullNotifier>,
    pub mailer: Arc<NullMailer>,
    pub prompt: Arc<NullConfirmationPrompt>,
    pub clock: Arc<NullClock>,
    pub bot: Bot,
}

pub fn config() -> BotConfig {
    BotConfig {
        accepted_domains: vec!["uni.edu".to_string()],
        admin_ids: vec![member("900")],
        moderator_ids: vec![member("901")],
        data_steward_ids: vec![member("902")],
        ..BotConfig::default()
    }
}

pub fn harness() -> Harness {
    harness_with(config(), NullConfirmationPrompt::always_confirm(), NullCodeSource::new(vec![111_111, 222_222, 333_333, 444_444]))
}

pub fn harness_with(config: BotConfig, prompt: NullConfirmationPrompt, codes: NullCodeSource) -> Harness {
    let identity = Arc::new(NullIdentityStore::new());
    let log = Arc::new(NullModerationLogStore::new());
    let membership = Arc::new(NullMembership::new());
    let notifier = Arc::new(NullNotifier::new());
    let mailer = Arc::new(NullMailer::new());
    let prompt = Arc::new(prompt);
    let clock = Arc::new(NullClock::new(START));
    let bot = Bot::new(
        &config,
        Collaborators {
            identity: identity.clone(),
            moderation_log: log.clone(),
            membership: membership.clone(),
            notifier: notifier.clone(),
            mailer: mailer.clone(),
            prompt: prompt.clone(),
            clock: clock.clone(),
            codes: Arc::new(codes),
        },
    )
    .unwrap();
    Harness {
        identity,
        log,
        membership,
        notifier,
        mailer,
        prompt,
        clock,
        bot,
    }
}

pub fn member(id: &str) -> MemberId {
    MemberId::new(id).unwrap()
}

pub fn email(raw: &str) -> Email {
    Email::parse(raw).unwrap()
}

pub fn admin() -> Invoker {
    Invoker::member(member("900"))
}

pub fn moderator() -> Invoker {
    Invoker::member(member("901"))
}

pub fn steward() -> Invoker {
    Invoker::member(member("902"))
}

impl Harness {
    pub async fn run(&self, invoker: &Invoker, command: BotCommand) -> CommandReply {
        self.bot.dispatch(invoker, command).await
    }

    /// Request a code and submit whatever was mailed.
    pub async fn verify(&self, id: &str, address: &str) -> CommandReply {
        let invoker = Invoker::member(member(id));
        self.run(
            &invoker,
            BotCommand::Verify {
                email: address.to_string(),
            },
        )
        .await;
        let (_, code) = self
            .mailer
            .codes_sent()
            .into_iter()
            .last()
            .expect("a code was mailed");
        self.run(
            &invoker,
            BotCommand::Code {
                code: code.to_string(),
            },
        )
        .await
    }
}
