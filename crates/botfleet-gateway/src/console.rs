use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::sync::Arc;

use uuid::Uuid;

use crate::app::AppState;

type Handler = Box<dyn Fn(&AppState, &[&str]) + Send + Sync>;

/// A line-oriented stdin admin console — a thin Rust take on the original
/// `CConsole`/`CConsoleCommands` pair. Registered commands are looked up by
/// name and handed the remaining whitespace-split tokens; unknown input
/// prints the command list instead of failing silently.
struct Console {
    commands: HashMap<&'static str, Handler>,
}

impl Console {
    fn new() -> Self {
        Self { commands: HashMap::new() }
    }

    fn register(&mut self, name: &'static str, handler: Handler) {
        self.commands.insert(name, handler);
    }

    fn print_help(&self) {
        println!("available commands: {}", {
            let mut names: Vec<_> = self.commands.keys().copied().collect();
            names.sort_unstable();
            names.join(", ")
        });
    }

    fn dispatch(&self, state: &AppState, line: &str) {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else { return };
        let args: Vec<&str> = parts.collect();

        match self.commands.get(name) {
            Some(handler) => handler(state, &args),
            None => self.print_help(),
        }
    }
}

fn register_bot_commands(console: &mut Console) {
    console.register(
        "bots",
        Box::new(|state, _args| {
            for id in state.bot_order.lock().unwrap().iter() {
                let Some(bot_lock) = state.bots.get(id) else { continue };
                let bot = bot_lock.lock().unwrap();
                println!("{id}  {:<8} {}", format!("{:?}", bot.status), bot.nickname);
            }
        }),
    );

    console.register(
        "reconnect",
        Box::new(|state, args| {
            let Some(raw) = args.first() else {
                println!("usage: reconnect <uuid>");
                return;
            };
            let Ok(id) = Uuid::parse_str(raw) else {
                println!("invalid uuid: {raw}");
                return;
            };
            match state.bots.get(&id) {
                Some(entry) => {
                    entry.lock().unwrap().force_reconnect();
                    println!("reconnecting {id}");
                }
                None => println!("no such bot: {id}"),
            }
        }),
    );
}

fn register_system_commands(console: &mut Console) {
    console.register(
        "servers",
        Box::new(|state, _args| {
            let Ok(conn) = state.db.try_lock() else {
                println!("database busy, try again");
                return;
            };
            match botfleet_store::models::list_servers(&conn) {
                Ok(rows) => {
                    for s in rows {
                        println!("{}  {}:{}  players={}/{}", s.id, s.host, s.port, s.players, s.max_players);
                    }
                }
                Err(e) => println!("error: {e}"),
            }
        }),
    );

    console.register(
        "uptime",
        Box::new(|state, _args| println!("{}s", state.uptime_secs())),
    );

    console.register(
        "shutdown",
        Box::new(|state, _args| {
            println!("shutting down...");
            state.shutdown_tx.send(true).ok();
        }),
    );
}

fn register_llm_commands(console: &mut Console) {
    console.register(
        "sessions",
        Box::new(|state, _args| {
            for id in state.bot_order.lock().unwrap().iter() {
                if let Some(session_id) = state.sessions.session_id_for_bot(*id) {
                    println!("{id}  session={session_id}");
                }
            }
        }),
    );
}

/// Blocks the calling (dedicated) thread reading lines from stdin until EOF
/// or a `shutdown` command. Meant to be spawned on its own `std::thread`,
/// never inside the Tokio runtime — `stdin().lock()` is a blocking read.
pub fn run(state: Arc<AppState>) {
    let mut console = Console::new();
    register_bot_commands(&mut console);
    register_system_commands(&mut console);
    register_llm_commands(&mut console);
    console.print_help();

    let stdin = std::io::stdin();
    let mut shutdown = state.shutdown_rx();
    for line in stdin.lock().lines() {
        if *shutdown.borrow() {
            break;
        }
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        console.dispatch(&state, line.trim());
        print!("> ");
        let _ = std::io::stdout().flush();
    }
}
