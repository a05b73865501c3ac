use campaign_metrics::llm::{AnthropicClient, ChatEvent, Coordinator, LlmConfig};
use campaign_metrics::{CampaignVariables, ChatMessage, InputField};
use dotenv::dotenv;
use std::error::Error;
use std::io::{self, Write};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let config = LlmConfig::from_env()?;
    let coordinator = Coordinator::new(AnthropicClient::new(config));

    // Values a form or an earlier extraction step already collected.
    let variables = CampaignVariables::new()
        .with(InputField::Budget, 10_000.0)
        .with(InputField::AllocatedShare, 1.0)
        .with(InputField::DisplayShare, 0.4)
        .with(InputField::SearchShare, 0.6);

    let mut history: Vec<ChatMessage> = Vec::new();

    println!("🤖 Ready! Ask about your campaign (type 'quit' to exit).");
    println!("------------------------------------------------------------------");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let prompt = input.trim();

        if prompt.eq_ignore_ascii_case("quit") || prompt.eq_ignore_ascii_case("exit") {
            break;
        }

        if prompt.is_empty() {
            continue;
        }

        let (tx, mut rx) = mpsc::channel(64);
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    ChatEvent::Routed { agent } => println!("\n[{}]", agent),
                    ChatEvent::Delta { text } => {
                        print!("{}", text);
                        let _ = io::stdout().flush();
                    }
                    ChatEvent::Done => println!("\n"),
                    ChatEvent::Failed { reason } => eprintln!("\n❌ Error: {}", reason),
                }
            }
        });

        let reply = coordinator
            .process_stream(prompt, &history, Some(&variables), tx)
            .await;
        let _ = printer.await;

        if let Ok(reply) = reply {
            history.push(ChatMessage::user(prompt).stamped_now());
            history.push(ChatMessage::assistant(reply.content).stamped_now());
        }
        println!("------------------------------------------------------------------");
    }

    Ok(())
}
