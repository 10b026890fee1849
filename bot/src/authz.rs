//! Role checks for administrative and moderation commands.

use std::collections::HashSet;

use kahukura_types::MemberId;
use serde::{Deserialize, Serialize};

/// The member invoking a command, with the role flags the platform reports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoker {
    pub id: MemberId,
    #[serde(default)]
    pub is_administrator: bool,
    #[serde(default)]
    pub is_moderator: bool,
}

impl Invoker {
    /// A member with no platform roles.
    pub fn member(id: MemberId) -> Self {
        Self {
            id,
            is_administrator: false,
            is_moderator: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Administrator,
    /// Implied by [`Role::Administrator`].
    Moderator,
    /// May hard-delete records. Granted only by configuration.
    DataSteward,
}

#[derive(Clone, Debug, Default)]
pub struct Authorizer {
    admins: HashSet<MemberId>,
    moderators: HashSet<MemberId>,
    data_stewards: HashSet<MemberId>,
}

impl Authorizer {
    pub fn new(
        admins: impl IntoIterator<Item = MemberId>,
        moderators: impl IntoIterator<Item = MemberId>,
        data_stewards: impl IntoIterator<Item = MemberId>,
    ) -> Self {
        Self {
            admins: admins.into_iter().collect(),
            moderators: moderators.into_iter().collect(),
            data_stewards: data_stewards.into_iter().collect(),
        }
    }

    pub fn has_role(&self, invoker: &Invoker, role: Role) -> bool {
        match role {
            Role::Administrator => self.is_admin(invoker),
            Role::Moderator => {
                invoker.is_moderator
                    || self.moderators.contains(&invoker.id)
                    || self.is_admin(invoker)
            }
            Role::DataSteward => self.data_stewards.contains(&invoker.id),
        }
    }

    fn is_admin(&self, invoker: &Invoker) -> bool {
        invoker.is_administrator || self.admins.contains(&invoker.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> MemberId {
        MemberId::new(raw).unwrap()
    }

    fn authorizer() -> Authorizer {
        Authorizer::new([id("1")], [id("2")], [id("3")])
    }

    #[test]
    fn configured_admin_is_moderator_too() {
        let authz = authorizer();
        let admin = Invoker::member(id("1"));
        assert!(authz.has_role(&admin, Role::Administrator));
        assert!(authz.has_role(&admin, Role::Moderator));
        assert!(!authz.has_role(&admin, Role::DataSteward));
    }

    #[test]
    fn platform_flags_grant_roles() {
        let authz = authorizer();
        let flagged = Invoker {
            id: id("9"),
            is_administrator: true,
            is_moderator: false,
        };
        assert!(authz.has_role(&flagged, Role::Moderator));
        assert!(!authz.has_role(&flagged, Role::DataSteward));
    }

    #[test]
    fn plain_member_has_no_roles() {
        let authz = authorizer();
        let member = Invoker::member(id("9"));
        for role in [Role::Administrator, Role::Moderator, Role::DataSteward] {
            assert!(!authz.has_role(&member, role));
        }
        assert!(authz.has_role(&Invoker::member(id("3")), Role::DataSteward));
        assert!(!authz.has_role(&Invoker::member(id("2")), Role::Administrator));
    }
}
