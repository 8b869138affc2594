use bloodhound_mcp::adapters::health_handler::HealthHandler;
use bloodhound_mcp::agents::error::AgentError;
use bloodhound_mcp::agents::llm::{installed_models, resolve_model, LlmProvider, OllamaProvider};
use bloodhound_mcp::agents::{AgentSession, Interrupts, SessionEvent};
use bloodhound_mcp::bloodhound::BloodhoundClient;
use bloodhound_mcp::cli::{Cli, Command};
use bloodhound_mcp::config::Settings;
use bloodhound_mcp::domain::ToolPort;
use clap::Parser;
use rmcp::ServiceExt;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let command = cli.command();

    // stdout belongs to the MCP transport or the chat; logs go to stderr
    let default_level = match command {
        Command::Serve { .. } => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::new_with_cli(&cli)?;

    match command {
        Command::Serve { http, .. } => serve(&settings, http).await,
        Command::Chat => chat(&settings).await,
        Command::Ask { query } => ask(&settings, &query).await,
        Command::Models => models(&settings).await,
        Command::Check => check(&settings).await,
        Command::Tools => tools(&settings),
    }
}

async fn serve(settings: &Settings, http: bool) -> anyhow::Result<()> {
    let (client, router) = bloodhound_mcp::build_tool_router(settings)?;
    let tool_count = router.catalog().len();

    match client.version().await {
        Ok(_) => info!(url = %settings.bloodhound.base_url(), tools = tool_count, "Connected to BloodHound"),
        Err(e) => warn!(kind = %e.kind, error = %e, "BloodHound is not reachable yet; tools will report errors until it is"),
    }

    let server = bloodhound_mcp::build_server(router);

    if !http {
        info!("Serving MCP over stdio");
        let service = server.serve(rmcp::transport::stdio()).await?;
        service.waiting().await?;
        return Ok(());
    }

    let health = Arc::new(HealthHandler::new(client, tool_count));
    let app = bloodhound_mcp::create_app(server, health);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

/// Pick the model: the configured one resolved against what is installed,
/// otherwise the only one installed, otherwise ask.
async fn select_model(settings: &Settings) -> anyhow::Result<String> {
    let installed = installed_models(&settings.agent.ollama_url).await?;
    if installed.is_empty() {
        anyhow::bail!(
            "no models installed on {}; pull one with `ollama pull <model>`",
            settings.agent.ollama_url
        );
    }

    if let Some(requested) = &settings.agent.model {
        return Ok(resolve_model(requested, &installed)?);
    }
    if installed.len() == 1 {
        return Ok(installed[0].name.clone());
    }

    println!("Available models:");
    for (i, model) in installed.iter().enumerate() {
        println!("  {}. {}", i + 1, model.name);
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Select a model [1-{}]: ", installed.len());
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            anyhow::bail!("no model selected");
        };
        match line.trim().parse::<usize>() {
            Ok(n) if (1..=installed.len()).contains(&n) => return Ok(installed[n - 1].name.clone()),
            _ => println!("Enter a number between 1 and {}", installed.len()),
        }
    }
}

async fn build_session(settings: &Settings) -> anyhow::Result<AgentSession> {
    let (_client, router) = bloodhound_mcp::build_tool_router(settings)?;
    let model = select_model(settings).await?;
    let provider = OllamaProvider::new(&settings.agent, model)?;
    info!(model = %provider.model(), timeout_secs = provider.timeout().as_secs(), "Model selected");
    let llm: Arc<dyn LlmProvider> = Arc::new(provider);
    let tools: Arc<dyn ToolPort> = router;
    Ok(AgentSession::new(llm, tools, &settings.agent))
}

/// Run one turn; an interrupt while it runs cancels it.
async fn run_turn(
    session: &mut AgentSession,
    input: &str,
    interrupts: &Interrupts,
) -> Result<String, AgentError> {
    let cancel = interrupts.begin_turn();
    let result = session.run_turn(input, &cancel).await;
    interrupts.end_turn();
    result.map(|outcome| outcome.answer)
}

async fn chat(settings: &Settings) -> anyhow::Result<()> {
    let (events, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut session = build_session(settings).await?.with_events(events);

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                SessionEvent::ToolStarted(call) => eprintln!("  -> {}", call.name),
                SessionEvent::ToolFinished(record) if !record.success => eprintln!(
                    "  !! {} failed ({})",
                    record.tool_name,
                    record.error_kind.map(|k| format!("{k:?}")).unwrap_or_default()
                ),
                _ => {}
            }
        }
    });

    let interrupts = Interrupts::ctrl_c();
    println!("Chatting with {} about BloodHound. Type 'help' for commands.", session.model());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = interrupts.quit().cancelled() => {
                println!();
                session.close();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "quit" | "exit" | "q" => {
                session.close();
                break;
            }
            "help" => {
                println!("Commands: tools, clear, help, quit. Anything else is sent to the model.");
                println!("Press ctrl-c during an answer to cancel it, or at the prompt to leave.");
                continue;
            }
            "clear" => {
                session.reset();
                println!("Conversation cleared.");
                continue;
            }
            "tools" => {
                tools(settings)?;
                continue;
            }
            _ => {}
        }

        match run_turn(&mut session, input, &interrupts).await {
            Ok(answer) => println!("\n{answer}"),
            Err(AgentError::Cancelled) => println!("Cancelled."),
            Err(e) if e.is_fatal() => {
                error!(error = %e, "Session closed");
                println!("Session closed: {e}");
                break;
            }
            Err(e) => println!("Error: {e}"),
        }
    }
    Ok(())
}

async fn ask(settings: &Settings, query: &str) -> anyhow::Result<()> {
    let mut session = build_session(settings).await?;
    let interrupts = Interrupts::ctrl_c();
    let answer = run_turn(&mut session, query, &interrupts).await?;
    println!("{answer}");
    Ok(())
}

async fn models(settings: &Settings) -> anyhow::Result<()> {
    let installed = installed_models(&settings.agent.ollama_url).await?;
    if installed.is_empty() {
        println!("No models installed on {}", settings.agent.ollama_url);
    }
    for model in installed {
        println!("{:<40} {:>8.1} GB", model.name, model.size as f64 / 1e9);
    }
    Ok(())
}

async fn check(settings: &Settings) -> anyhow::Result<()> {
    let client = BloodhoundClient::from_settings(&settings.bloodhound)?;
    println!("BloodHound at {}", settings.bloodhound.base_url());

    let version = client.version().await?;
    let data = version.get("data").unwrap_or(&version);
    println!("  server version: {}", data.get("server_version").unwrap_or(data));

    let me = client.self_info().await?;
    let me = me.get("data").unwrap_or(&me);
    let name = me
        .get("principal_name")
        .or_else(|| me.get("name"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    println!("  authenticated as: {name}");
    Ok(())
}

fn tools(settings: &Settings) -> anyhow::Result<()> {
    let (_client, router) = bloodhound_mcp::build_tool_router(settings)?;
    for tool in router.list_tools() {
        let summary = tool.description.lines().next().unwrap_or_default();
        println!("{:<40} {}", tool.name, summary);
    }
    println!("\n{} tools", router.catalog().len());
    Ok(())
}
