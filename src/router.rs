use crate::conversation::{ChatMessage, Role};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The personas a message can be handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Budget, funnel and ROI analysis backed by the metrics calculator.
    MetricsAnalyst,
    /// Keyword research and campaign strategy.
    #[default]
    KeywordStrategist,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::MetricsAnalyst => f.write_str("metrics analyst"),
            AgentKind::KeywordStrategist => f.write_str("keyword strategist"),
        }
    }
}

/// Picks the persona that should answer `message`.
pub trait AgentClassifier {
    fn classify(&self, message: &str, history: &[ChatMessage]) -> AgentKind;
}

const METRICS_TERMS: &[&str] = &[
    "orçamento", "orcamento", "budget", "roi", "roas", "cac", "ltv", "métricas", "metricas",
    "calcular", "campanha", "conversão", "conversao", "vendas", "receita", "lucro",
];

/// Phrases the metrics analyst uses when it is collecting inputs.
const METRICS_FLOW_MARKERS: &[&str] = &["orçamento", "setor do negócio"];

/// Routes on whole-word vocabulary matches.
///
/// Messages are split into lowercase words, so `roi` no longer matches inside
/// `heroic`. A conversation stays with the metrics analyst once one of its
/// assistant turns has started collecting inputs. Everything else, including
/// keyword and SEO requests, goes to the keyword strategist.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    metrics_terms: HashSet<String>,
    flow_markers: Vec<String>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self {
            metrics_terms: METRICS_TERMS.iter().map(|t| t.to_string()).collect(),
            flow_markers: METRICS_FLOW_MARKERS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics_term(mut self, term: &str) -> Self {
        self.metrics_terms.insert(term.to_lowercase());
        self
    }

    fn in_metrics_flow(&self, history: &[ChatMessage]) -> bool {
        history
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .any(|m| {
                let content = m.content.to_lowercase();
                self.flow_markers.iter().any(|marker| content.contains(marker))
            })
    }
}

impl AgentClassifier for KeywordClassifier {
    fn classify(&self, message: &str, history: &[ChatMessage]) -> AgentKind {
        let words = tokenize(message);
        let has_metrics = words.iter().any(|w| self.metrics_terms.contains(w));
        let in_flow = self.in_metrics_flow(history);

        let agent = if in_flow || has_metrics {
            AgentKind::MetricsAnalyst
        } else {
            AgentKind::KeywordStrategist
        };

        debug!(
            "Routing to {} (metrics terms: {}, metrics flow: {})",
            agent, has_metrics, in_flow
        );

        agent
    }
}

/// Lowercase words; hyphens stay inside words so `palavras-chave` survives.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .map(|w| w.trim_matches('-'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}
