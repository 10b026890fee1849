//! Text sent to members outside of command replies.

use kahukura_types::MemberId;

#[derive(Clone, Debug)]
pub struct Messages {
    verify_command: String,
    domains: String,
}

impl Messages {
    pub fn new(verify_command: &str, accepted_domains: &[String]) -> Self {
        let domains = accepted_domains
            .iter()
            .map(|d| format!("@{d}"))
            .collect::<Vec<_>>()
            .join(" or ");
        Self {
            verify_command: verify_command.to_string(),
            domains,
        }
    }

    pub fn verify_command(&self) -> &str {
        &self.verify_command
    }

    pub fn verification_instructions(&self) -> String {
        format!(
            "Kia ora! Before you can take part in the server you need to verify your account.\n\n\
             Run the {} command with your {} email address, then enter the code we email you with /code.",
            self.verify_command, self.domains
        )
    }

    pub fn verification_instructions_fallback(&self, member: &MemberId) -> String {
        format!(
            "Kia ora {}, I couldn't message you directly. To get access, please run the {} command with your {} email address.",
            member.mention(),
            self.verify_command,
            self.domains
        )
    }

    pub fn banned_on_join(&self) -> String {
        "You are banned from this server, so you have been removed again.".to_string()
    }

    pub fn banned_for_evasion(&self) -> String {
        "That email belongs to a banned member, so you have been banned as well.".to_string()
    }

    pub fn warning(&self, reason: &str) -> String {
        format!("You have received a warning from the moderators: {reason}")
    }
}
