//! Subscriber alerting.
//!
//! Everything between a fresh forecast and a message in a subscriber's chat:
//! deciding whether the change is worth a message, wording it, and
//! delivering it.
//!
//! Submodules:
//! - `change`   — anchoring to wall-clock time and the substantial-change policy.
//! - `format`   — message wording.
//! - `telegram` — Bot API client and command parsing.

pub mod change;
pub mod format;
pub mod telegram;
