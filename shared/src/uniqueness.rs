use crate::model::{StoredProfile, UserId};

/// `true` if any document other than `excluding` came back from the email query.
/// The editing account's own document never counts, so saving an unchanged email is
/// not a conflict.
///
/// The answer is advisory: nothing stops a second editor from claiming the same
/// address between the query and the write.
#[must_use]
pub fn is_email_taken(matches: &[StoredProfile], excluding: &UserId) -> bool {
    matches.iter().any(|m| &m.id != excluding)
}
