use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use todo_stack::client::command::HELP;
use todo_stack::client::{Command, HttpTodoApi, TodoApp, render};
use tracing_subscriber::EnvFilter;

/// Terminal frontend for the todo service.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Root URL of the todo service.
    #[arg(long, env = "TODO_API_URL", default_value = "http://localhost:3001")]
    api_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut app = TodoApp::new(HttpTodoApi::new(&args.api_url)?);

    let _ = app.refresh().await;
    print!("{}", render(&app));
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        match command {
            Command::Quit => break,
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            command => {
                // Service failures land in the app's error line; local ones are printed.
                if let Err(e) = command.apply(&mut app).await {
                    tracing::debug!(error = %e, "Command failed");
                    let message = e.to_string();
                    if !app.error().contains(&message) {
                        println!("{message}");
                    }
                }
            }
        }
        print!("{}", render(&app));
    }
    Ok(())
}
