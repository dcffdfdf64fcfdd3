//! User-facing message texts.

use coffeemate_types::session::Group;

pub const INTRO: &str = "Hi! I run daily random coffee in this chat. Every day I post an \
invitation; press the button to join, and when signup closes I split everyone into \
groups of two or three.";

pub const DAILY_INVITE: &str = "Random coffee today? Press the button to join.";

pub const JOIN_BUTTON: &str = "I'm in";

pub const JOINED_ACK: &str = "You're in! Groups are announced when signup closes.";

pub const ALREADY_JOINED_ACK: &str = "You've already joined today.";

pub const SIGNUP_CLOSED_ACK: &str = "Signup is already closed.";

pub const UNKNOWN_ACTION_ACK: &str = "This invitation is no longer valid.";

pub const TRY_AGAIN_ACK: &str = "Something went wrong, please try again.";

pub const NO_PARTICIPANTS: &str = "Nobody signed up for random coffee today.";

/// Display names of the in-memory participants added in test mode.
pub const PLACEHOLDER_NAMES: [&str; 4] = [
    "Test participant 1",
    "Test participant 2",
    "Test participant 3",
    "Test participant 4",
];

/// Render the numbered group announcement.
pub fn format_groups(groups: &[Group]) -> String {
    let mut out = String::from("Today's random coffee groups:\n");
    for (i, group) in groups.iter().enumerate() {
        let names = group
            .members
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("Group {}: {names}\n", i + 1));
    }
    out
}
