use std::path::PathBuf;
use std::str::FromStr;

/// A chat event delivered by the transport, already decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub chat_id: i64,
    pub user_id: u64,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn new(chat_id: i64, user_id: u64, kind: EventKind) -> Self {
        Self {
            chat_id,
            user_id,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A `/command`, name without the slash, bot mention or arguments.
    Command(String),
    Text(String),
    /// A photo already saved to a local file.
    Photo {
        image: PathBuf,
        caption: Option<String>,
    },
    Button {
        action: ButtonAction,
        prompt: Option<PromptRef>,
    },
}

/// Inline-keyboard actions the bot offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    BeginIngestion,
    CheckSubscription,
    Cancel,
}

impl ButtonAction {
    /// Callback payload attached to the button.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeginIngestion => "train",
            Self::CheckSubscription => "check_subscription",
            Self::Cancel => "cancel",
        }
    }
}

impl FromStr for ButtonAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Self::BeginIngestion),
            "check_subscription" => Ok(Self::CheckSubscription),
            "cancel" => Ok(Self::Cancel),
            other => Err(format!("unknown button action: {other}")),
        }
    }
}

/// Identifies the bot message a button was attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptRef(pub i32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
    MarkdownV2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

/// Outbound message: text, its markup flavour and an optional one-column keyboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub format: TextFormat,
    pub buttons: Vec<Button>,
}

impl Reply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Html,
            buttons: Vec::new(),
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::MarkdownV2,
            buttons: Vec::new(),
        }
    }

    pub fn with_button(mut self, label: impl Into<String>, action: ButtonAction) -> Self {
        self.buttons.push(Button {
            label: label.into(),
            action,
        });
        self
    }
}
