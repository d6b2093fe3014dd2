use bitflags::bitflags;

bitflags! {
    /// OAuth scopes granted to an access token.
    ///
    /// The umbrella scopes `read`, `write` and the legacy `follow` expand to
    /// the granular bits they cover, so checks only ever test granular bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Scopes: u64 {
        const READ_ACCOUNTS       = 1 << 0;
        const READ_BLOCKS         = 1 << 1;
        const READ_BOOKMARKS      = 1 << 2;
        const READ_FAVOURITES     = 1 << 3;
        const READ_FILTERS        = 1 << 4;
        const READ_FOLLOWS        = 1 << 5;
        const READ_LISTS          = 1 << 6;
        const READ_MUTES          = 1 << 7;
        const READ_NOTIFICATIONS  = 1 << 8;
        const READ_SEARCH         = 1 << 9;
        const READ_STATUSES       = 1 << 10;

        const WRITE_ACCOUNTS      = 1 << 16;
        const WRITE_BLOCKS        = 1 << 17;
        const WRITE_BOOKMARKS     = 1 << 18;
        const WRITE_CONVERSATIONS = 1 << 19;
        const WRITE_FAVOURITES    = 1 << 20;
        const WRITE_FILTERS       = 1 << 21;
        const WRITE_FOLLOWS       = 1 << 22;
        const WRITE_LISTS         = 1 << 23;
        const WRITE_MEDIA         = 1 << 24;
        const WRITE_MUTES         = 1 << 25;
        const WRITE_NOTIFICATIONS = 1 << 26;
        const WRITE_REPORTS       = 1 << 27;
        const WRITE_STATUSES      = 1 << 28;

        const PUSH                = 1 << 32;
    }
}

impl Scopes {
    pub const READ: Scopes = Self::READ_ACCOUNTS
        .union(Self::READ_BLOCKS)
        .union(Self::READ_BOOKMARKS)
        .union(Self::READ_FAVOURITES)
        .union(Self::READ_FILTERS)
        .union(Self::READ_FOLLOWS)
        .union(Self::READ_LISTS)
        .union(Self::READ_MUTES)
        .union(Self::READ_NOTIFICATIONS)
        .union(Self::READ_SEARCH)
        .union(Self::READ_STATUSES);

    pub const WRITE: Scopes = Self::WRITE_ACCOUNTS
        .union(Self::WRITE_BLOCKS)
        .union(Self::WRITE_BOOKMARKS)
        .union(Self::WRITE_CONVERSATIONS)
        .union(Self::WRITE_FAVOURITES)
        .union(Self::WRITE_FILTERS)
        .union(Self::WRITE_FOLLOWS)
        .union(Self::WRITE_LISTS)
        .union(Self::WRITE_MEDIA)
        .union(Self::WRITE_MUTES)
        .union(Self::WRITE_NOTIFICATIONS)
        .union(Self::WRITE_REPORTS)
        .union(Self::WRITE_STATUSES);

    /// Legacy `follow` scope.
    pub const FOLLOW: Scopes = Self::READ_BLOCKS
        .union(Self::READ_FOLLOWS)
        .union(Self::READ_MUTES)
        .union(Self::WRITE_BLOCKS)
        .union(Self::WRITE_FOLLOWS)
        .union(Self::WRITE_MUTES);

    /// Look up a single scope name. Unknown names return `None`.
    pub fn from_scope_name(name: &str) -> Option<Scopes> {
        let scope = match name {
            "read" => Self::READ,
            "write" => Self::WRITE,
            "follow" => Self::FOLLOW,
            "push" => Self::PUSH,
            "read:accounts" => Self::READ_ACCOUNTS,
            "read:blocks" => Self::READ_BLOCKS,
            "read:bookmarks" => Self::READ_BOOKMARKS,
            "read:favourites" => Self::READ_FAVOURITES,
            "read:filters" => Self::READ_FILTERS,
            "read:follows" => Self::READ_FOLLOWS,
            "read:lists" => Self::READ_LISTS,
            "read:mutes" => Self::READ_MUTES,
            "read:notifications" => Self::READ_NOTIFICATIONS,
            "read:search" => Self::READ_SEARCH,
            "read:statuses" => Self::READ_STATUSES,
            "write:accounts" => Self::WRITE_ACCOUNTS,
            "write:blocks" => Self::WRITE_BLOCKS,
            "write:bookmarks" => Self::WRITE_BOOKMARKS,
            "write:conversations" => Self::WRITE_CONVERSATIONS,
            "write:favourites" => Self::WRITE_FAVOURITES,
            "write:filters" => Self::WRITE_FILTERS,
            "write:follows" => Self::WRITE_FOLLOWS,
            "write:lists" => Self::WRITE_LISTS,
            "write:media" => Self::WRITE_MEDIA,
            "write:mutes" => Self::WRITE_MUTES,
            "write:notifications" => Self::WRITE_NOTIFICATIONS,
            "write:reports" => Self::WRITE_REPORTS,
            "write:statuses" => Self::WRITE_STATUSES,
            _ => return None,
        };
        Some(scope)
    }

    /// Parse a space-separated scope string as stored on a token.
    pub fn parse(raw: &str) -> Scopes {
        raw.split_whitespace()
            .filter_map(Self::from_scope_name)
            .fold(Scopes::empty(), |acc, scope| acc | scope)
    }

    /// True when every bit in `required` is granted.
    pub fn grants(self, required: Scopes) -> bool {
        self.contains(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_umbrella_grants_read_statuses() {
        assert!(Scopes::parse("read").grants(Scopes::READ_STATUSES));
        assert!(Scopes::parse("read:statuses").grants(Scopes::READ_STATUSES));
    }

    #[test]
    fn write_scopes_do_not_grant_reads() {
        let scopes = Scopes::parse("write write:statuses");
        assert!(!scopes.grants(Scopes::READ_STATUSES));
        assert!(scopes.grants(Scopes::WRITE_STATUSES));
    }

    #[test]
    fn single_names_resolve_to_their_bits() {
        assert_eq!(Scopes::from_scope_name("read:statuses"), Some(Scopes::READ_STATUSES));
        assert_eq!(Scopes::from_scope_name("write"), Some(Scopes::WRITE));
        assert_eq!(Scopes::from_scope_name("READ_STATUSES"), None);
    }

    #[test]
    fn unknown_names_are_ignored() {
        let scopes = Scopes::parse("admin:read  read:accounts bogus");
        assert_eq!(scopes, Scopes::READ_ACCOUNTS);
        assert!(Scopes::parse("").is_empty());
    }

    #[test]
    fn follow_is_a_subset_of_read_and_write() {
        assert!(Scopes::READ.union(Scopes::WRITE).contains(Scopes::FOLLOW));
        assert!(!Scopes::FOLLOW.grants(Scopes::READ_STATUSES));
    }
}
