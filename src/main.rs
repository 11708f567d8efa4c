use clap::{CommandFactory, Parser};
use colored::*;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use dsa_assistant::cli::{resolve_config, Args, ReplCommand};
use dsa_assistant::conversation::{ChatMessage, Role};
use dsa_assistant::{ChatAssistant, ChatError, Connectivity, HttpTransport, SendOutcome};

fn init_tracing() {
    // Logs go to stderr so they never interleave with the streamed reply.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn print_message(msg: &ChatMessage) {
    match msg.role {
        Role::User => println!("{} {}", "you>".bright_green().bold(), msg.content),
        Role::Assistant if msg.notice => println!("{} {}", "bot>".bright_cyan().bold(), msg.content.bright_yellow()),
        Role::Assistant => println!("{} {}", "bot>".bright_cyan().bold(), msg.content),
        Role::System => println!("{} {}", "sys>".bright_magenta(), msg.content),
    }
}

fn print_help() {
    println!("{}", "Commands:".bright_yellow());
    println!("  /clear    start a new conversation");
    println!("  /history  show the conversation so far");
    println!("  /offline  pretend the network is down");
    println!("  /online   back online");
    println!("  /quit     exit");
}

async fn ask(assistant: &mut ChatAssistant<HttpTransport>, text: &str) -> Result<(), ChatError> {
    print!("{} ", "bot>".bright_cyan().bold());
    let _ = io::stdout().flush();
    match assistant.send_message(text).await? {
        SendOutcome::Completed { reply, .. } if reply.is_empty() => {
            println!("{}", "(no reply)".dimmed());
        }
        SendOutcome::Completed { interrupted: true, .. } => {
            eprintln!("{}", "[stream interrupted, reply may be incomplete]".bright_red());
        }
        _ => {}
    }
    Ok(())
}

async fn repl(assistant: &mut ChatAssistant<HttpTransport>) -> Result<(), ChatError> {
    println!("{}", "DSA ASSISTANT".bright_cyan().bold());
    println!("{}: {}", "Endpoint".bright_yellow(), assistant.transport().endpoint());
    println!("{}", "=".repeat(50).bright_blue());
    if let Some(greeting) = assistant.conversation().last() {
        print_message(greeting);
    }
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "you>".bright_green().bold());
        let _ = io::stdout().flush();
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        match ReplCommand::parse(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Clear => {
                assistant.conversation_mut().clear()?;
                if let Some(greeting) = assistant.conversation().last() {
                    print_message(greeting);
                }
            }
            ReplCommand::History => assistant.conversation().messages().iter().for_each(print_message),
            ReplCommand::Offline => {
                assistant.connectivity = Connectivity::Offline;
                println!("{}", "⚠️ You're offline".bright_red());
            }
            ReplCommand::Online => {
                assistant.connectivity = Connectivity::Online;
                println!("{}", "Back online".bright_green());
            }
            ReplCommand::Help => print_help(),
            ReplCommand::Unknown(cmd) => println!("{} /{}", "Unknown command:".bright_red(), cmd),
            ReplCommand::Message(text) if text.is_empty() => continue,
            ReplCommand::Message(text) => ask(assistant, &text).await?,
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        let mut cmd = Args::command();
        clap_complete::generate(shell, &mut cmd, "dsa-assistant", &mut io::stdout());
        return Ok(());
    }

    init_tracing();
    if args.plain {
        colored::control::set_override(false);
    }

    let config = resolve_config(&args)?;
    let transport = HttpTransport::new(&config)?;
    let mut assistant = ChatAssistant::new(transport);
    assistant.system_prompt = config.system_prompt.clone();
    assistant.echo = true;
    if args.offline {
        assistant.connectivity = Connectivity::Offline;
    }

    match args.prompt.as_deref() {
        Some(prompt) => ask(&mut assistant, prompt).await?,
        None => repl(&mut assistant).await?,
    }
    Ok(())
}
