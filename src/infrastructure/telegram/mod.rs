//! Telegram long-polling front end: decodes updates into [`InboundEvent`]s
//! and hands them to the controller.

mod events;
mod transport;

pub use events::{classify_text, from_callback, parse_command};
pub use transport::TelegramTransport;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::net::Download;
use teloxide::prelude::*;
use tracing::{debug, info, warn};

use crate::application::ConversationController;
use crate::domain::{EventKind, InboundEvent};

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Where downloaded photos are written before OCR.
#[derive(Debug, Clone)]
pub struct PhotoDir(pub PathBuf);

impl PhotoDir {
    fn path_for(&self, chat_id: i64) -> PathBuf {
        self.0.join(format!("{chat_id}_image.jpg"))
    }

    /// Writes a fully downloaded photo; a failed download never reaches disk.
    async fn store(&self, chat_id: i64, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path_for(chat_id);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

/// Polls Telegram until ctrl-c. Updates from one chat are handled in order;
/// a failed turn is logged by the dispatcher's default error handler.
pub async fn run(bot: Bot, controller: Arc<ConversationController>, images_dir: PathBuf) {
    let photos = Arc::new(PhotoDir(images_dir));

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    info!("bot polling started");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![controller, photos])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    info!("bot stopped");
}

async fn on_message(
    bot: Bot,
    msg: Message,
    controller: Arc<ConversationController>,
    photos: Arc<PhotoDir>,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let chat_id = msg.chat.id.0;

    let kind = if let Some(sizes) = msg.photo() {
        let Some(largest) = sizes.iter().max_by_key(|p| p.width * p.height) else {
            return Ok(());
        };
        let file = bot.get_file(largest.file.id.clone()).await?;
        let mut bytes = Vec::new();
        bot.download_file(&file.path, &mut bytes).await?;
        let image = photos.store(chat_id, &bytes).await?;
        debug!(chat_id, path = %image.display(), "photo downloaded");
        EventKind::Photo {
            image,
            caption: msg.caption().map(str::to_string),
        }
    } else if let Some(text) = msg.text() {
        classify_text(text)
    } else {
        return Ok(());
    };

    controller
        .handle(InboundEvent::new(chat_id, user.id.0, kind))
        .await?;
    Ok(())
}

async fn on_callback(
    bot: Bot,
    q: CallbackQuery,
    controller: Arc<ConversationController>,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(kind) = from_callback(data, Some(message.id().0)) else {
        warn!(data, "unknown callback payload");
        return Ok(());
    };

    controller
        .handle(InboundEvent::new(message.chat().id.0, q.from.id.0, kind))
        .await?;
    Ok(())
}
