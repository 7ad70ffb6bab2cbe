use super::Bot;
use crate::prelude::*;
use crate::relay::{channel_slug, RawPost, Source, TransportError};
use async_trait::async_trait;
use teloxide::payloads::GetUpdatesSetters;
use teloxide::prelude::*;
use teloxide::types::UpdateKind;

/// Draws candidates from the update feed, the same way the bot API exposes
/// recent channel posts. The bot must be a member of the source channels.
pub(crate) struct TgSource {
    bot: Bot,
}

impl TgSource {
    pub(crate) fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Source for TgSource {
    async fn fetch_recent(&self, channel: &str, limit: u8) -> Result<Vec<RawPost>, TransportError> {
        let updates = self
            .bot
            .get_updates()
            .limit(limit)
            .await
            .map_err(|source| TransportError {
                channel: channel.to_owned(),
                source: Box::new(source),
            })?;

        let slug = channel_slug(channel);

        let posts: Vec<_> = updates
            .into_iter()
            .filter_map(|update| match update.kind {
                UpdateKind::ChannelPost(msg) => Some(msg),
                _ => None,
            })
            .filter(|msg| msg.chat.username() == Some(slug))
            .map(|msg| RawPost {
                text: msg.text().map(ToOwned::to_owned),
                caption: msg.caption().map(ToOwned::to_owned),
                // The last photo size is the largest one
                photo_id: msg
                    .photo()
                    .and_then(|sizes| sizes.last())
                    .map(|photo| photo.file.id.clone()),
                video_id: msg.video().map(|video| video.file.id.clone()),
                document_id: msg.document().map(|document| document.file.id.clone()),
            })
            .collect();

        debug!(%channel, posts = posts.len(), "Collected channel posts from the update feed");

        Ok(posts)
    }
}
