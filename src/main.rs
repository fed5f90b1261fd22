mod auth;
mod backend;
mod config;
mod history;
mod media;
mod output;
mod session;
mod tdjson;
mod types;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::auth::{ConsolePrompt, Terminal};
use crate::backend::Backend;
use crate::config::Config;
use crate::session::{Gated, Session};
use crate::tdjson::TdJsonClient;
use crate::types::ChatList;

const FAILURE_EXIT_CODE: i32 = -1;

#[derive(Parser)]
#[command(
    name = "tdarchive",
    version,
    about = "Read Telegram chat history and download its media",
    after_help = "Examples:\n  tdarchive login --phone-number +639197134060\n  tdarchive chat\n  tdarchive message --chat-id 123 --max-messages 50\n  tdarchive message --chat-id 123 --download\n  tdarchive logout"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true, help = "Output JSON instead of text")]
    json: bool,

    #[arg(short, long, global = true, action = ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Login using phone number and an authorization code sent to the app")]
    Login(LoginArgs),
    #[command(about = "Log out and delete the local session")]
    Logout,
    #[command(about = "Show all chats")]
    Chat(ChatArgs),
    #[command(about = "Show the messages of a chat")]
    Message(MessageArgs),
}

#[derive(Args)]
struct LoginArgs {
    #[arg(short = 'n', long, help = "Phone number in international format, e.g. +639197134060")]
    phone_number: Option<String>,

    #[arg(short, long, help = "Two-step verification password")]
    password: Option<String>,
}

#[derive(Args)]
struct ChatArgs {
    #[arg(long, help = "List archived chats instead of the main list")]
    archive: bool,
}

#[derive(Args)]
struct MessageArgs {
    #[arg(short, long, help = "Chat id")]
    chat_id: i64,

    #[arg(short = 'n', long, default_value_t = 25, help = "Maximum number of messages to read")]
    max_messages: usize,

    #[arg(short, long, help = "Download photos, videos and video notes")]
    download: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(error) = run(cli).await {
        println!("Error {error}");
        std::process::exit(FAILURE_EXIT_CODE);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(format!("tdarchive={level}")))
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut credentials = config.credentials.clone();
    if let Command::Login(args) = &cli.command {
        credentials = credentials.overridden(args.phone_number.clone(), args.password.clone());
    }

    let mut backend = TdJsonClient::connect(&config.bridge_url).await?;
    backend.set_log_verbosity(config.tdlib_verbosity).await?;

    let mut session = Session::new(
        backend,
        config.connection_parameters(),
        credentials,
        config.data_dir.clone(),
        ConsolePrompt,
    );

    match cli.command {
        Command::Login(_) => {
            let terminal = session.login().await?;
            report_terminal(terminal);
        }
        Command::Logout => match session.logout().await? {
            Gated::Ready(()) => println!("Logged out."),
            Gated::Halted(terminal) => report_terminal(terminal),
        },
        Command::Chat(args) => {
            let list = if args.archive { ChatList::Archive } else { ChatList::Main };
            match session.list_chats(list).await? {
                Gated::Ready(chats) => output::print_chat_list(&chats, cli.json)?,
                Gated::Halted(terminal) => report_terminal(terminal),
            }
        }
        Command::Message(args) => {
            if !cli.json {
                println!("Downloading messages from {}", args.chat_id);
            }
            let json = cli.json;
            let mut output_error = None;
            let outcome = session
                .list_messages(args.chat_id, args.max_messages, args.download, |visit| {
                    if output_error.is_none() {
                        output_error = output::print_visit(visit, json).err();
                    }
                })
                .await?;
            if let Some(error) = output_error {
                return Err(error.into());
            }
            match outcome {
                Gated::Ready(report) => output::print_report(&report, json)?,
                Gated::Halted(terminal) => report_terminal(terminal),
            }
        }
    }

    Ok(())
}

fn report_terminal(terminal: Terminal) {
    println!("Authentication {terminal}");
}
