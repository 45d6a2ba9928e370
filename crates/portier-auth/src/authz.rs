//! Group-membership authorization

use portier_core::config::{GroupMatch, LdapConfigSection};
use portier_core::types::UserRecord;
use tracing::debug;

/// Allow-list of group name substrings
#[derive(Debug, Clone, Default)]
pub struct GroupPolicy {
    groups: Vec<String>,
    mode: GroupMatch,
}

impl GroupPolicy {
    pub fn new(groups: Vec<String>, mode: GroupMatch) -> Self {
        Self { groups, mode }
    }

    pub fn from_config(config: &LdapConfigSection) -> Self {
        Self::new(config.groups.clone(), config.group_match)
    }

    pub fn authorize(&self, user: &UserRecord) -> bool {
        authorize(user, &self.groups, self.mode)
    }
}

/// Whether any of the user's memberships contains one of `allowed_groups`.
///
/// Both sides compare lowercased. An empty allow-list admits every
/// authenticated user, and a user without memberships is matched as
/// `NO_GROUPS`. In [`GroupMatch::Legacy`] mode the first occurrence of a
/// group name must not start at offset 0, so `admins` does not match a
/// membership of exactly `admins` but does match `cn=admins,...`.
pub fn authorize(user: &UserRecord, allowed_groups: &[String], mode: GroupMatch) -> bool {
    let allowed: Vec<String> = if allowed_groups.is_empty() {
        vec![String::new()]
    } else {
        allowed_groups.iter().map(|g| g.to_lowercase()).collect()
    };

    for membership in user.memberships() {
        let membership = membership.to_lowercase();
        for group in &allowed {
            if contains(&membership, group, mode) {
                debug!("AUTHZ: Success for {}", user.username);
                return true;
            }
        }
    }

    debug!("AUTHZ: Fail for {}", user.username);
    false
}

fn contains(membership: &str, group: &str, mode: GroupMatch) -> bool {
    if group.is_empty() {
        return true;
    }

    match mode {
        GroupMatch::Legacy => membership.find(group).map_or(false, |offset| offset > 0),
        GroupMatch::Anywhere => membership.contains(group),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn member_of(memberships: &[&str]) -> UserRecord {
        UserRecord::new("cn=jdoe,dc=example,dc=local")
            .with_login_name("jdoe")
            .with_groups(memberships.iter().copied())
    }

    #[test]
    fn test_match_inside_dn() {
        let user = member_of(&["CN=Portal Users,OU=Groups,DC=example,DC=local"]);

        assert!(authorize(&user, &groups(&["portal users"]), GroupMatch::Legacy));
        assert!(authorize(&user, &groups(&["PORTAL USERS"]), GroupMatch::Anywhere));
        assert!(!authorize(&user, &groups(&["admins"]), GroupMatch::Legacy));
    }

    #[test]
    fn test_legacy_mode_rejects_match_at_offset_zero() {
        // Preserved quirk: a membership that begins with the group name is
        // not a match in legacy mode.
        let user = member_of(&["Admins"]);
        assert!(!authorize(&user, &groups(&["admins"]), GroupMatch::Legacy));

        // Only the first occurrence counts.
        let user = member_of(&["admins-admins"]);
        assert!(!authorize(&user, &groups(&["admins"]), GroupMatch::Legacy));

        let user = member_of(&["CN=Admins"]);
        assert!(authorize(&user, &groups(&["admins"]), GroupMatch::Legacy));
    }

    #[test]
    fn test_anywhere_mode_accepts_prefix_match() {
        let user = member_of(&["Admins"]);
        assert!(authorize(&user, &groups(&["admins"]), GroupMatch::Anywhere));
    }

    #[test]
    fn test_empty_allow_list_admits_any_user() {
        let user = member_of(&["CN=Staff,DC=example,DC=local"]);
        assert!(authorize(&user, &[], GroupMatch::Legacy));
        assert!(authorize(&user, &[], GroupMatch::Anywhere));

        let user = member_of(&[]);
        assert!(authorize(&user, &[], GroupMatch::Legacy));
    }

    #[test]
    fn test_user_without_groups() {
        let user = member_of(&[]);
        assert!(!authorize(&user, &groups(&["staff"]), GroupMatch::Legacy));
        assert!(!authorize(&user, &groups(&["staff"]), GroupMatch::Anywhere));

        // The sentinel itself is matchable
        assert!(authorize(&user, &groups(&["groups"]), GroupMatch::Legacy));
    }

    #[test]
    fn test_any_of_several_groups() {
        let user = member_of(&["CN=Staff,OU=Groups", "CN=VPN Users,OU=Groups"]);
        let policy = GroupPolicy::new(groups(&["admins", "vpn users"]), GroupMatch::Legacy);
        assert!(policy.authorize(&user));

        let policy = GroupPolicy::new(groups(&["admins", "finance"]), GroupMatch::Legacy);
        assert!(!policy.authorize(&user));
    }
}
