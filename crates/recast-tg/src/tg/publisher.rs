use super::{recipient, Bot};
use crate::relay::{PublishError, Publisher};
use async_trait::async_trait;
use teloxide::payloads::{SendDocumentSetters, SendPhotoSetters, SendVideoSetters};
use teloxide::prelude::*;
use teloxide::types::InputFile;

#[derive(Clone)]
pub(crate) struct TgPublisher {
    bot: Bot,
}

impl TgPublisher {
    pub(crate) fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn publish_err(source: teloxide::RequestError) -> PublishError {
    PublishError {
        source: Box::new(source),
    }
}

#[async_trait]
impl Publisher for TgPublisher {
    async fn send_text(&self, destination: &str, text: &str) -> Result<(), PublishError> {
        self.bot
            .send_message(recipient(destination), text)
            .await
            .map_err(publish_err)?;
        Ok(())
    }

    async fn send_photo(
        &self,
        destination: &str,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<(), PublishError> {
        let mut request = self
            .bot
            .send_photo(recipient(destination), InputFile::file_id(file_id));
        if let Some(caption) = caption {
            request = request.caption(caption.to_owned());
        }
        request.await.map_err(publish_err)?;
        Ok(())
    }

    async fn send_video(
        &self,
        destination: &str,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<(), PublishError> {
        let mut request = self
            .bot
            .send_video(recipient(destination), InputFile::file_id(file_id));
        if let Some(caption) = caption {
            request = request.caption(caption.to_owned());
        }
        request.await.map_err(publish_err)?;
        Ok(())
    }

    async fn send_document(
        &self,
        destination: &str,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<(), PublishError> {
        let mut request = self
            .bot
            .send_document(recipient(destination), InputFile::file_id(file_id));
        if let Some(caption) = caption {
            request = request.caption(caption.to_owned());
        }
        request.await.map_err(publish_err)?;
        Ok(())
    }
}
