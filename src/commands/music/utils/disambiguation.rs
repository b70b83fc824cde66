//! The timed local-vs-remote disambiguation prompt.
//!
//! `PromptGate` is the seam the decision engine talks through; the
//! production implementation sends two buttons to the request's text channel
//! and only accepts the original requester's interaction. Everyone else's
//! clicks are ignored, and no answer within the timeout degrades to the
//! online path.

use std::time::Duration;

use poise::serenity_prelude as serenity;
use serenity::all::{
    ButtonStyle, ComponentInteractionCollector, CreateActionRow, CreateButton,
    CreateInteractionResponse, CreateMessage, EditMessage,
};
use serenity::async_trait;
use serenity::model::id::{ChannelId, UserId};
use tracing::{info, warn};

/// Default window the requester has to answer before the online path wins.
pub const PROMPT_TIMEOUT: Duration = Duration::from_secs(30);

const LOCAL_BUTTON_ID: &str = "playback_local";
const ONLINE_BUTTON_ID: &str = "playback_online";

/// Ephemeral prompt state, alive only for the bounded wait.
#[derive(Debug, Clone)]
pub struct DisambiguationPrompt {
    pub local_title: String,
    pub remote_title: Option<String>,
    /// Changes the online button label to "Use URL Content".
    pub from_url: bool,
    pub requester_id: UserId,
    pub text_channel: ChannelId,
    pub timeout: Duration,
}

impl DisambiguationPrompt {
    /// Label of the non-local choice, varying with the query's origin.
    pub fn online_label(&self) -> &'static str {
        if self.from_url {
            "Use URL Content"
        } else {
            "Search Online Instead"
        }
    }

    /// Full prompt text. The queue-clearing side effect of choosing the
    /// local file is destructive, so it is spelled out before the user
    /// decides.
    pub fn content(&self) -> String {
        let mut content = format!(
            "🎵 Found a local file matching your request: **{}**",
            self.local_title
        );
        if let Some(remote) = &self.remote_title {
            content.push_str(&format!("\nOnline candidate: **{}**", remote));
        }
        content.push_str(
            "\n\n⚠️ Choosing the local file stops online playback and clears the current queue.",
        );
        content
    }
}

/// The user's resolution of the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    LocalFile,
    Online,
    TimedOut,
}

/// Seam between the decision engine and whatever UI asks the question.
#[async_trait]
pub trait PromptGate: Send + Sync {
    async fn ask(&self, prompt: &DisambiguationPrompt) -> PromptChoice;
}

/// Production prompt: two buttons in the request's text channel.
pub struct ButtonPrompt {
    ctx: serenity::Context,
}

impl ButtonPrompt {
    pub fn new(ctx: serenity::Context) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl PromptGate for ButtonPrompt {
    async fn ask(&self, prompt: &DisambiguationPrompt) -> PromptChoice {
        let buttons = CreateActionRow::Buttons(vec![
            CreateButton::new(LOCAL_BUTTON_ID)
                .label("Play Local File")
                .style(ButtonStyle::Success),
            CreateButton::new(ONLINE_BUTTON_ID)
                .label(prompt.online_label())
                .style(ButtonStyle::Primary),
        ]);

        let message = match prompt
            .text_channel
            .send_message(
                &self.ctx.http,
                CreateMessage::new()
                    .content(prompt.content())
                    .components(vec![buttons]),
            )
            .await
        {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to send disambiguation prompt: {}", e);
                return PromptChoice::TimedOut;
            }
        };

        // Only the original requester may resolve the prompt; the author
        // filter drops everyone else's interactions without ending the wait.
        let interaction = ComponentInteractionCollector::new(&self.ctx.shard)
            .message_id(message.id)
            .author_id(prompt.requester_id)
            .timeout(prompt.timeout)
            .await;

        let choice = match &interaction {
            Some(i) if i.data.custom_id == LOCAL_BUTTON_ID => PromptChoice::LocalFile,
            Some(_) => PromptChoice::Online,
            None => {
                info!("Disambiguation prompt timed out, defaulting to online path");
                PromptChoice::TimedOut
            }
        };

        if let Some(i) = interaction {
            if let Err(e) = i
                .create_response(&self.ctx.http, CreateInteractionResponse::Acknowledge)
                .await
            {
                warn!("Failed to acknowledge prompt interaction: {}", e);
            }
        }

        // Retire the buttons either way; the prompt is single-use.
        let mut message = message;
        if let Err(e) = message
            .edit(&self.ctx.http, EditMessage::new().components(vec![]))
            .await
        {
            warn!("Failed to retire disambiguation prompt buttons: {}", e);
        }

        choice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(from_url: bool) -> DisambiguationPrompt {
        DisambiguationPrompt {
            local_title: "Never Gonna Give You Up".to_string(),
            remote_title: Some("Sample Song".to_string()),
            from_url,
            requester_id: UserId::new(42),
            text_channel: ChannelId::new(7),
            timeout: PROMPT_TIMEOUT,
        }
    }

    #[test]
    fn online_label_varies_with_origin() {
        assert_eq!(prompt(false).online_label(), "Search Online Instead");
        assert_eq!(prompt(true).online_label(), "Use URL Content");
    }

    #[test]
    fn content_warns_about_queue_clearing() {
        let content = prompt(false).content();
        assert!(content.contains("Never Gonna Give You Up"));
        assert!(content.contains("clears the current queue"));
    }
}
