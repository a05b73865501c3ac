use crate::calculator::MetricsCalculator;
use crate::conversation::{ChatMessage, Role};
use crate::error::{CampaignMetricsError, Result};
use crate::llm::client::AnthropicClient;
use crate::llm::prompts::persona_prompt;
use crate::llm::types::*;
use crate::report::ReportRenderer;
use crate::router::{AgentClassifier, AgentKind, KeywordClassifier};
use crate::schema::CampaignVariables;
use log::{debug, info};
use tokio::sync::mpsc::Sender;

/// Routes each chat turn to a persona and asks the model for the reply.
///
/// When the caller already holds campaign variables, the metrics analyst gets
/// the calculated tables (or the list of inputs still missing) as system context,
/// so figures come from the calculator rather than from the model.
pub struct Coordinator<C = KeywordClassifier> {
    client: AnthropicClient,
    classifier: C,
    calculator: MetricsCalculator,
    renderer: ReportRenderer,
}

impl Coordinator<KeywordClassifier> {
    pub fn new(client: AnthropicClient) -> Self {
        Self::with_classifier(client, KeywordClassifier::default())
    }
}

impl<C: AgentClassifier> Coordinator<C> {
    pub fn with_classifier(client: AnthropicClient, classifier: C) -> Self {
        Self {
            client,
            classifier,
            calculator: MetricsCalculator::default(),
            renderer: ReportRenderer::default(),
        }
    }

    pub fn with_calculator(mut self, calculator: MetricsCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    pub fn with_renderer(mut self, renderer: ReportRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn route(&self, message: &str, history: &[ChatMessage]) -> AgentKind {
        self.classifier.classify(message, history)
    }

    /// Persona prompt, then any `system` turns from the history, then metrics context.
    pub fn system_prompt(
        &self,
        agent: AgentKind,
        history: &[ChatMessage],
        variables: Option<&CampaignVariables>,
    ) -> String {
        let mut sections = vec![persona_prompt(agent).to_string()];

        let extra: Vec<&str> = history
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        if !extra.is_empty() {
            sections.push(extra.join("\n\n"));
        }

        if agent == AgentKind::MetricsAnalyst {
            if let Some(variables) = variables {
                if let Some(context) = self.metrics_context(variables) {
                    sections.push(context);
                }
            }
        }

        sections.join("\n\n")
    }

    fn metrics_context(&self, variables: &CampaignVariables) -> Option<String> {
        match self.calculator.calculate_variables(variables) {
            Ok(result) => Some(format!(
                "## CALCULATED METRICS\n\n{}",
                self.renderer.render(&result)
            )),
            Err(CampaignMetricsError::Validation(failure)) => Some(format!(
                "## INPUTS STILL NEEDED\n\n{}",
                self.renderer.render_failure(&failure)
            )),
            Err(_) => None,
        }
    }

    /// History without `system` turns, followed by the new user message.
    pub fn conversation(&self, message: &str, history: &[ChatMessage]) -> Vec<ApiMessage> {
        history
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| ApiMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .chain(std::iter::once(ApiMessage {
                role: Role::User,
                content: message.to_string(),
            }))
            .collect()
    }

    pub async fn process(
        &self,
        message: &str,
        history: &[ChatMessage],
        variables: Option<&CampaignVariables>,
    ) -> Result<AgentReply> {
        let agent = self.route(message, history);
        info!("Handling message with the {}", agent);

        let system = self.system_prompt(agent, history, variables);
        let messages = self.conversation(message, history);
        let content = self.client.create_message(&system, &messages).await?;

        Ok(AgentReply { agent, content })
    }

    /// Like [`Coordinator::process`], but forwards progress and text deltas to `events`.
    pub async fn process_stream(
        &self,
        message: &str,
        history: &[ChatMessage],
        variables: Option<&CampaignVariables>,
        events: Sender<ChatEvent>,
    ) -> Result<AgentReply> {
        let agent = self.route(message, history);
        info!("Streaming reply from the {}", agent);
        send_event(&events, ChatEvent::Routed { agent }).await;

        let system = self.system_prompt(agent, history, variables);
        let messages = self.conversation(message, history);

        match self.client.stream_message(&system, &messages, &events).await {
            Ok(content) => {
                debug!("Streamed {} characters", content.chars().count());
                send_event(&events, ChatEvent::Done).await;
                Ok(AgentReply { agent, content })
            }
            Err(e) => {
                send_event(
                    &events,
                    ChatEvent::Failed {
                        reason: e.to_string(),
                    },
                )
                .await;
                Err(e)
            }
        }
    }
}

async fn send_event(sender: &Sender<ChatEvent>, event: ChatEvent) {
    let _ = sender.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::LlmConfig;
    use crate::schema::InputField;

    fn coordinator() -> Coordinator {
        Coordinator::new(AnthropicClient::new(LlmConfig::new("test-key")))
    }

    fn complete_variables() -> CampaignVariables {
        CampaignVariables::new()
            .with(InputField::Budget, 10_000.0)
            .with(InputField::AllocatedShare, 1.0)
            .with(InputField::DisplayShare, 0.4)
            .with(InputField::SearchShare, 0.6)
            .with(InputField::DisplayImpressionsPerUnit, 500.0)
            .with(InputField::SearchImpressionsPerUnit, 50.0)
            .with(InputField::DisplayCtr, 0.02)
            .with(InputField::SearchCtr, 0.05)
            .with(InputField::SessionsPerUser, 1.2)
            .with(InputField::ConversionRate, 0.03)
            .with(InputField::AverageTicket, 150.0)
            .with(InputField::CogsShare, 0.4)
            .with(InputField::CustomerLifespan, 3.0)
    }

    #[test]
    fn test_system_prompt_includes_history_system_turns() {
        let history = vec![
            ChatMessage::system("Workspace: ACME"),
            ChatMessage::user("oi"),
        ];
        let prompt = coordinator().system_prompt(AgentKind::KeywordStrategist, &history, None);
        assert!(prompt.starts_with("You are a search-marketing strategist"));
        assert!(prompt.ends_with("Workspace: ACME"));
    }

    #[test]
    fn test_metrics_context_with_complete_inputs() {
        let variables = complete_variables();
        let prompt =
            coordinator().system_prompt(AgentKind::MetricsAnalyst, &[], Some(&variables));
        assert!(prompt.contains("## CALCULATED METRICS"));
        assert!(prompt.contains("R$ 247.500,00"));
    }

    #[test]
    fn test_metrics_context_with_missing_inputs() {
        let mut variables = complete_variables();
        variables.set(InputField::AverageTicket, None);
        let prompt =
            coordinator().system_prompt(AgentKind::MetricsAnalyst, &[], Some(&variables));
        assert!(prompt.contains("## INPUTS STILL NEEDED"));
        assert!(prompt.contains("`ticketMedio`"));
    }

    #[test]
    fn test_keyword_strategist_gets_no_metrics_context() {
        let variables = complete_variables();
        let prompt =
            coordinator().system_prompt(AgentKind::KeywordStrategist, &[], Some(&variables));
        assert!(!prompt.contains("CALCULATED METRICS"));
    }

    #[test]
    fn test_conversation_drops_system_turns_and_appends_message() {
        let history = vec![
            ChatMessage::system("ctx"),
            ChatMessage::user("Qual o orçamento ideal?"),
            ChatMessage::assistant("Qual o orçamento disponível?"),
        ];
        let messages = coordinator().conversation("R$ 10.000", &history);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[2].content, "R$ 10.000");
    }

    #[test]
    fn test_route_uses_classifier() {
        struct Always(AgentKind);
        impl AgentClassifier for Always {
            fn classify(&self, _: &str, _: &[ChatMessage]) -> AgentKind {
                self.0
            }
        }

        let coordinator = Coordinator::with_classifier(
            AnthropicClient::new(LlmConfig::new("k")),
            Always(AgentKind::MetricsAnalyst),
        );
        assert_eq!(coordinator.route("SEO", &[]), AgentKind::MetricsAnalyst);
    }
}
