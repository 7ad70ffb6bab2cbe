//! Telegram implementations of the relay's collaborator seams.

mod config;
mod publisher;
mod source;

use teloxide::adaptors::throttle::Limits;
use teloxide::adaptors::Throttle;
use teloxide::prelude::*;

pub(crate) use config::*;
pub(crate) use publisher::TgPublisher;
pub(crate) use source::TgSource;

pub(crate) type Bot = Throttle<teloxide::Bot>;

pub(crate) fn bot_from_config(cfg: &Config) -> Bot {
    teloxide::Bot::new(cfg.token.clone()).throttle(Limits::default())
}
