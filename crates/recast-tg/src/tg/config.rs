use serde::Deserialize;
use teloxide::types::{ChatId, Recipient};

#[derive(Deserialize, Clone)]
pub(crate) struct Config {
    pub(crate) token: String,

    /// The channel posts are relayed to, either `@channelusername`
    /// or a numeric chat id
    pub(crate) destination: String,
}

pub(crate) fn recipient(destination: &str) -> Recipient {
    destination
        .parse::<i64>()
        .map(|id| Recipient::Id(ChatId(id)))
        .unwrap_or_else(|_| Recipient::ChannelUsername(destination.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_destination_is_a_chat_id() {
        assert_eq!(recipient("-1001234"), Recipient::Id(ChatId(-1001234)));
    }

    #[test]
    fn username_destination_stays_a_username() {
        assert_eq!(
            recipient("@mychan"),
            Recipient::ChannelUsername("@mychan".to_owned())
        );
    }
}
