use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::application::services::{extract_text_from_image, format_response, IngestionService, RagService};
use crate::domain::{
    ports::{ChatTransport, OcrEngine, StateStore},
    ButtonAction, ChatState, DomainError, EventKind, InboundEvent, PromptRef, Reply,
};

/// Who may ingest documents, and which chat is the project's own group.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    pub admins: HashSet<u64>,
    pub home_chat: Option<i64>,
}

impl AccessPolicy {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admins.contains(&user_id)
    }

    pub fn is_home_chat(&self, chat_id: i64) -> bool {
        self.home_chat == Some(chat_id)
    }
}

/// User-facing texts of the conversation flows.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotTexts {
    pub welcome: String,
    pub admin_menu: String,
    pub begin_ingestion_button: String,
    /// HTML; `{channel_url}` is replaced with [`channel_url`](Self::channel_url).
    pub subscribe_prompt: String,
    pub channel_url: String,
    pub check_subscription_button: String,
    pub subscribed: String,
    pub ask_url: String,
    pub cancel_button: String,
    pub loading: String,
    pub ingest_succeeded: String,
    pub ingest_failed: String,
}

impl Default for BotTexts {
    fn default() -> Self {
        Self {
            welcome: "Добро пожаловать в Noderunner AI бот! Я помогу вам с вопросами по установке нод."
                .into(),
            admin_menu: "Вы можете загрузить новую документацию с сайта.".into(),
            begin_ingestion_button: "Загрузить новые данные".into(),
            subscribe_prompt:
                "Пожалуйста, подпишитесь на канал <a href=\"{channel_url}\">NodeRunner</a>, чтобы получить доступ."
                    .into(),
            channel_url: "https://t.me/+lhbVZpGDE8c0YTY6".into(),
            check_subscription_button: "Проверить подписку".into(),
            subscribed: "Спасибо за подписку! Вы можете задать вопрос.".into(),
            ask_url: "Пожалуйста, предоставьте URL сайта, с которого хотите загрузить данные.".into(),
            cancel_button: "Cancel".into(),
            loading: "Загружаю данные, пожалуйста, подождите...".into(),
            ingest_succeeded: "Готово! Теперь я стал умнее 👀".into(),
            ingest_failed: "Не удалось загрузить данные. Попробуйте другой URL.".into(),
        }
    }
}

impl BotTexts {
    fn subscribe_prompt(&self) -> String {
        self.subscribe_prompt.replace("{channel_url}", &self.channel_url)
    }
}

/// Per-chat state machine deciding what each inbound event does.
///
/// States: `Idle` (no stored record), `AwaitingUrl` after an administrator
/// asked to ingest a page, `AwaitingSubscriptionConfirmation` after a
/// regular user was shown the subscription prompt.
pub struct ConversationController {
    states: Arc<dyn StateStore>,
    transport: Arc<dyn ChatTransport>,
    ingestion: Arc<IngestionService>,
    rag: Arc<RagService>,
    ocr: Arc<dyn OcrEngine>,
    access: AccessPolicy,
    texts: BotTexts,
}

impl ConversationController {
    pub fn new(
        states: Arc<dyn StateStore>,
        transport: Arc<dyn ChatTransport>,
        ingestion: Arc<IngestionService>,
        rag: Arc<RagService>,
        ocr: Arc<dyn OcrEngine>,
        access: AccessPolicy,
    ) -> Self {
        Self {
            states,
            transport,
            ingestion,
            rag,
            ocr,
            access,
            texts: BotTexts::default(),
        }
    }

    pub fn with_texts(mut self, texts: BotTexts) -> Self {
        self.texts = texts;
        self
    }

    /// Current state of a chat; no record means `Idle`.
    pub async fn state_of(&self, chat_id: i64) -> Result<ChatState, DomainError> {
        Ok(self.states.load(chat_id).await?.unwrap_or_default())
    }

    #[instrument(skip(self, event), fields(chat_id = event.chat_id, user_id = event.user_id))]
    pub async fn handle(&self, event: InboundEvent) -> Result<(), DomainError> {
        let InboundEvent {
            chat_id,
            user_id,
            kind,
        } = event;

        match kind {
            EventKind::Command(name) if name == "start" => self.start(chat_id, user_id).await,
            EventKind::Command(name) => {
                debug!(command = %name, "ignoring command");
                Ok(())
            }
            EventKind::Button { action, prompt } => match action {
                ButtonAction::BeginIngestion => self.begin_ingestion(chat_id, user_id, prompt).await,
                ButtonAction::CheckSubscription => self.confirm_subscription(chat_id).await,
                ButtonAction::Cancel => self.cancel(chat_id, user_id, prompt).await,
            },
            EventKind::Text(text) => {
                if self.state_of(chat_id).await? == ChatState::AwaitingUrl {
                    self.receive_url(chat_id, &text).await
                } else {
                    self.answer(chat_id, &text, None).await
                }
            }
            EventKind::Photo { image, caption } => {
                let text = caption.unwrap_or_default();
                self.answer(chat_id, &text, Some(image)).await
            }
        }
    }

    async fn start(&self, chat_id: i64, user_id: u64) -> Result<(), DomainError> {
        if self.access.is_home_chat(chat_id) {
            self.states.clear(chat_id).await?;
            return self
                .transport
                .send(chat_id, Reply::plain(&self.texts.welcome))
                .await;
        }

        if self.access.is_admin(user_id) {
            self.states.clear(chat_id).await?;
            let menu = Reply::html(&self.texts.admin_menu)
                .with_button(&self.texts.begin_ingestion_button, ButtonAction::BeginIngestion);
            return self.transport.send(chat_id, menu).await;
        }

        let prompt = Reply::html(self.texts.subscribe_prompt())
            .with_button(&self.texts.check_subscription_button, ButtonAction::CheckSubscription);
        self.transport.send(chat_id, prompt).await?;
        self.states
            .save(chat_id, ChatState::AwaitingSubscriptionConfirmation)
            .await?;
        info!(chat_id, "awaiting subscription confirmation");
        Ok(())
    }

    async fn begin_ingestion(
        &self,
        chat_id: i64,
        user_id: u64,
        prompt: Option<PromptRef>,
    ) -> Result<(), DomainError> {
        if !self.access.is_admin(user_id) {
            warn!(chat_id, user_id, "ingestion requested by non-administrator");
            return Ok(());
        }

        self.states.save(chat_id, ChatState::AwaitingUrl).await?;
        let reply =
            Reply::plain(&self.texts.ask_url).with_button(&self.texts.cancel_button, ButtonAction::Cancel);
        match prompt {
            Some(prompt) => self.transport.edit(chat_id, prompt, reply).await?,
            None => self.transport.send(chat_id, reply).await?,
        }
        info!(chat_id, "awaiting url");
        Ok(())
    }

    async fn receive_url(&self, chat_id: i64, url: &str) -> Result<(), DomainError> {
        self.states.clear(chat_id).await?;
        self.transport
            .send(chat_id, Reply::plain(&self.texts.loading))
            .await?;

        let outcome = if self.ingestion.load_and_store(url).await {
            info!(chat_id, url, "documentation ingested");
            &self.texts.ingest_succeeded
        } else {
            &self.texts.ingest_failed
        };
        self.transport.send(chat_id, Reply::plain(outcome)).await
    }

    async fn confirm_subscription(&self, chat_id: i64) -> Result<(), DomainError> {
        if self.state_of(chat_id).await? != ChatState::AwaitingSubscriptionConfirmation {
            debug!(chat_id, "subscription check outside of the prompt flow");
            return Ok(());
        }

        self.transport
            .send(chat_id, Reply::plain(&self.texts.subscribed))
            .await?;
        self.states.clear(chat_id).await
    }

    async fn cancel(
        &self,
        chat_id: i64,
        user_id: u64,
        prompt: Option<PromptRef>,
    ) -> Result<(), DomainError> {
        if let Some(prompt) = prompt {
            self.transport.delete(chat_id, prompt).await?;
        }
        self.states.clear(chat_id).await?;
        self.start(chat_id, user_id).await
    }

    async fn answer(
        &self,
        chat_id: i64,
        text: &str,
        image: Option<PathBuf>,
    ) -> Result<(), DomainError> {
        // A link while a URL is expected is not treated as a question.
        let ignored = text.starts_with('/')
            || (text.starts_with("http") && self.state_of(chat_id).await? == ChatState::AwaitingUrl);
        if ignored {
            if let Some(image) = &image {
                remove_image(image).await;
            }
            debug!(chat_id, "ignoring message");
            return Ok(());
        }

        self.transport.typing(chat_id).await?;

        let image_text = match &image {
            Some(path) => {
                let text = extract_text_from_image(self.ocr.as_ref(), path).await;
                remove_image(path).await;
                text
            }
            None => String::new(),
        };

        let response = self.rag.answer(text, &image_text).await?;
        self.transport
            .send(chat_id, Reply::markdown(format_response(&response)))
            .await
    }
}

async fn remove_image(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        error!(path = %path.display(), error = %e, "Error removing image");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TextFormat;
    use crate::infrastructure::LocalVectorStore;
    use crate::test_support::{
        FakeEmbedding, FakeFetcher, FakeLlm, FakeOcr, FakeTransport, MemoryStateStore, Sent,
    };

    const ADMIN: u64 = 7;
    const USER: u64 = 42;
    const HOME_CHAT: i64 = -100;
    const DOC_URL: &str = "https://example.com/doc";

    struct Harness {
        controller: ConversationController,
        transport: Arc<FakeTransport>,
        states: Arc<MemoryStateStore>,
        fetcher: Arc<FakeFetcher>,
        llm: Arc<FakeLlm>,
    }

    fn harness_with_ocr(ocr: FakeOcr) -> Harness {
        let transport = Arc::new(FakeTransport::default());
        let states = Arc::new(MemoryStateStore::default());
        let fetcher = Arc::new(FakeFetcher::with_page(
            DOC_URL,
            "To check the node run gaianet info.\n\nIt prints the node id.",
        ));
        let llm = Arc::new(FakeLlm::replying("Run `gaianet info`."));
        let store = Arc::new(LocalVectorStore::in_memory());

        let ingestion = Arc::new(IngestionService::new(
            fetcher.clone(),
            Arc::new(FakeEmbedding),
            store.clone(),
        ));
        let rag = Arc::new(RagService::new(Arc::new(FakeEmbedding), store, llm.clone()));
        let access = AccessPolicy {
            admins: HashSet::from([ADMIN]),
            home_chat: Some(HOME_CHAT),
        };

        let controller = ConversationController::new(
            states.clone(),
            transport.clone(),
            ingestion,
            rag,
            Arc::new(ocr),
            access,
        );

        Harness {
            controller,
            transport,
            states,
            fetcher,
            llm,
        }
    }

    fn harness() -> Harness {
        harness_with_ocr(FakeOcr::returning(&[]))
    }

    fn command(chat_id: i64, user_id: u64, name: &str) -> InboundEvent {
        InboundEvent::new(chat_id, user_id, EventKind::Command(name.into()))
    }

    fn text(chat_id: i64, user_id: u64, body: &str) -> InboundEvent {
        InboundEvent::new(chat_id, user_id, EventKind::Text(body.into()))
    }

    fn button(chat_id: i64, user_id: u64, action: ButtonAction, prompt: i32) -> InboundEvent {
        InboundEvent::new(
            chat_id,
            user_id,
            EventKind::Button {
                action,
                prompt: Some(PromptRef(prompt)),
            },
        )
    }

    fn temp_image() -> PathBuf {
        let file = tempfile::Builder::new()
            .suffix(".jpg")
            .tempfile()
            .unwrap();
        let (_, path) = file.keep().unwrap();
        path
    }

    #[tokio::test]
    async fn test_unknown_chat_behaves_as_idle() {
        let h = harness();
        assert_eq!(h.controller.state_of(5).await.unwrap(), ChatState::Idle);

        h.controller.handle(text(5, USER, "how to install?")).await.unwrap();

        let sent = h.transport.sent();
        assert_eq!(sent[0], Sent::Typing { chat_id: 5 });
        assert_eq!(
            sent[1],
            Sent::Message {
                chat_id: 5,
                reply: Reply::markdown(r"No relevant information found\."),
            }
        );
        assert!(h.fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_admin_ingestion_flow() {
        let h = harness();

        h.controller.handle(command(1, ADMIN, "start")).await.unwrap();
        let menu = h.transport.last_reply(1).unwrap();
        assert_eq!(menu.format, TextFormat::Html);
        assert_eq!(menu.buttons[0].action, ButtonAction::BeginIngestion);
        assert_eq!(h.states.get(1), None);

        h.controller
            .handle(button(1, ADMIN, ButtonAction::BeginIngestion, 10))
            .await
            .unwrap();
        assert_eq!(h.states.get(1), Some(ChatState::AwaitingUrl));
        match h.transport.sent().last().unwrap() {
            Sent::Edited { prompt, reply, .. } => {
                assert_eq!(*prompt, PromptRef(10));
                assert_eq!(reply.buttons[0].action, ButtonAction::Cancel);
            }
            other => panic!("expected an edited prompt, got {other:?}"),
        }

        h.controller.handle(text(1, ADMIN, DOC_URL)).await.unwrap();

        assert_eq!(h.fetcher.requested(), vec![DOC_URL.to_string()]);
        let replies = h.transport.replies(1);
        let n = replies.len();
        assert_eq!(replies[n - 2].text, BotTexts::default().loading);
        assert_eq!(replies[n - 1].text, BotTexts::default().ingest_succeeded);
        assert_eq!(h.states.get(1), None);
    }

    #[tokio::test]
    async fn test_failed_ingestion_still_clears_state() {
        let h = harness();
        h.states.put(1, ChatState::AwaitingUrl);

        h.controller
            .handle(text(1, ADMIN, "https://missing.example"))
            .await
            .unwrap();

        assert_eq!(
            h.transport.last_reply(1).unwrap().text,
            BotTexts::default().ingest_failed
        );
        assert_eq!(h.states.get(1), None);
    }

    #[tokio::test]
    async fn test_subscription_flow() {
        let h = harness();

        h.controller.handle(command(2, USER, "start")).await.unwrap();
        let prompt = h.transport.last_reply(2).unwrap();
        assert_eq!(prompt.format, TextFormat::Html);
        assert!(prompt.text.contains("https://t.me/+lhbVZpGDE8c0YTY6"));
        assert_eq!(prompt.buttons[0].action, ButtonAction::CheckSubscription);
        assert_eq!(
            h.states.get(2),
            Some(ChatState::AwaitingSubscriptionConfirmation)
        );

        h.controller
            .handle(button(2, USER, ButtonAction::CheckSubscription, 11))
            .await
            .unwrap();

        assert_eq!(
            h.transport.last_reply(2).unwrap().text,
            BotTexts::default().subscribed
        );
        assert_eq!(h.states.get(2), None);
    }

    #[tokio::test]
    async fn test_subscription_check_outside_prompt_is_ignored() {
        let h = harness();

        h.controller
            .handle(button(2, USER, ButtonAction::CheckSubscription, 11))
            .await
            .unwrap();

        assert!(h.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_non_admin_cannot_begin_ingestion() {
        let h = harness();

        h.controller
            .handle(button(3, USER, ButtonAction::BeginIngestion, 12))
            .await
            .unwrap();

        assert_eq!(h.states.get(3), None);
        assert!(h.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_deletes_prompt_and_restarts() {
        let h = harness();
        h.states.put(1, ChatState::AwaitingUrl);

        h.controller
            .handle(button(1, ADMIN, ButtonAction::Cancel, 13))
            .await
            .unwrap();

        let sent = h.transport.sent();
        assert_eq!(
            sent[0],
            Sent::Deleted {
                chat_id: 1,
                prompt: PromptRef(13)
            }
        );
        assert_eq!(
            h.transport.last_reply(1).unwrap().buttons[0].action,
            ButtonAction::BeginIngestion
        );
        assert_eq!(h.states.get(1), None);
    }

    #[tokio::test]
    async fn test_home_chat_start_only_greets() {
        let h = harness();

        h.controller.handle(command(HOME_CHAT, USER, "start")).await.unwrap();

        let reply = h.transport.last_reply(HOME_CHAT).unwrap();
        assert_eq!(reply.text, BotTexts::default().welcome);
        assert!(reply.buttons.is_empty());
        assert_eq!(h.states.get(HOME_CHAT), None);
    }

    #[tokio::test]
    async fn test_other_commands_are_ignored() {
        let h = harness();

        h.controller.handle(command(4, USER, "help")).await.unwrap();

        assert!(h.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_question_is_answered_from_ingested_docs() {
        let h = harness();
        h.states.put(1, ChatState::AwaitingUrl);
        h.controller.handle(text(1, ADMIN, DOC_URL)).await.unwrap();

        h.controller
            .handle(text(9, USER, "how do I check the node"))
            .await
            .unwrap();

        let calls = h.llm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][1].content, "how do I check the node");
        assert!(calls[0][2].content.contains("gaianet info"));
        assert_eq!(
            h.transport.last_reply(9).unwrap(),
            Reply::markdown(r"Run \`gaianet info\`\.")
        );
    }

    #[tokio::test]
    async fn test_photo_without_caption_uses_ocr_text_and_removes_file() {
        let h = harness_with_ocr(FakeOcr::returning(&[]));
        let image = temp_image();

        h.controller
            .handle(InboundEvent::new(
                9,
                USER,
                EventKind::Photo {
                    image: image.clone(),
                    caption: None,
                },
            ))
            .await
            .unwrap();

        assert!(!image.exists());
        assert_eq!(h.transport.sent()[0], Sent::Typing { chat_id: 9 });
        assert_eq!(
            h.transport.last_reply(9).unwrap(),
            Reply::markdown(r"No relevant information found\.")
        );
    }

    #[tokio::test]
    async fn test_photo_text_reaches_the_model() {
        let h = harness_with_ocr(FakeOcr::returning(&["gaianet info", "node id missing"]));
        h.states.put(1, ChatState::AwaitingUrl);
        h.controller.handle(text(1, ADMIN, DOC_URL)).await.unwrap();
        let image = temp_image();

        h.controller
            .handle(InboundEvent::new(
                9,
                USER,
                EventKind::Photo {
                    image,
                    caption: Some("what is wrong?".into()),
                },
            ))
            .await
            .unwrap();

        assert_eq!(
            h.llm.calls()[0][1].content,
            "what is wrong?\ngaianet info\nnode id missing"
        );
    }

    #[tokio::test]
    async fn test_link_caption_while_awaiting_url_is_ignored() {
        let h = harness();
        h.states.put(1, ChatState::AwaitingUrl);
        let image = temp_image();

        h.controller
            .handle(InboundEvent::new(
                1,
                ADMIN,
                EventKind::Photo {
                    image: image.clone(),
                    caption: Some("https://example.com/screenshot".into()),
                },
            ))
            .await
            .unwrap();

        assert!(h.transport.sent().is_empty());
        assert!(!image.exists());
        assert_eq!(h.states.get(1), Some(ChatState::AwaitingUrl));
        assert!(h.fetcher.requested().is_empty());
    }
}
