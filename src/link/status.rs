use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Phase of a link session.
///
/// The string form (`idle`, `fetching`, ...) is what hosts read through the
/// `getLinkStatus` reporter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LinkStatus {
    /// No code requested yet.
    #[default]
    Idle,
    /// A new link code is being requested.
    Fetching,
    /// A code is held and the user has not linked yet.
    Waiting,
    /// A status check is in flight.
    Checking,
    /// A token was issued.
    Linked,
    /// The last request failed.
    Error,
}
